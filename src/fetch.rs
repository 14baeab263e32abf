use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

use crate::domain::{CanonicalId, FetchProfile, FullRecord, Identified, SlimRecord};
use crate::error::KiraError;
use crate::openalex::{MAX_PAGE_SIZE, MetadataApi};
use crate::progress::ProgressTracker;

/// OpenAlex caps an `openalex:`/`cites:` filter at this many alternatives.
pub const MAX_FILTER_IDS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub concurrency: usize,
    pub batch_size: usize,
    pub citers_batch_size: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 10,
            batch_size: MAX_FILTER_IDS,
            citers_batch_size: 50,
        }
    }
}

pub fn group_ids<'a, I>(ids: I, size: usize) -> Vec<Vec<CanonicalId>>
where
    I: IntoIterator<Item = &'a CanonicalId>,
{
    let unique = ids
        .into_iter()
        .filter(|id| id.is_work())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    unique
        .chunks(size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

pub struct BatchFetcher<'a, A: MetadataApi> {
    api: &'a A,
    settings: FetchSettings,
}

impl<'a, A: MetadataApi> BatchFetcher<'a, A> {
    pub fn new(api: &'a A, settings: FetchSettings) -> Self {
        Self { api, settings }
    }

    pub async fn fetch_one(
        &self,
        id: &CanonicalId,
        progress: &mut ProgressTracker<'_>,
    ) -> Option<FullRecord> {
        progress.record_calls(1);
        let result = self.api.work(id).await;
        progress.advance();
        match result {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%id, error = %err, "record lookup failed");
                None
            }
        }
    }

    pub async fn fetch_bulk_slim<'i, I>(
        &self,
        ids: I,
        progress: &mut ProgressTracker<'_>,
    ) -> BTreeMap<CanonicalId, SlimRecord>
    where
        I: IntoIterator<Item = &'i CanonicalId>,
    {
        let groups = group_ids(ids, self.settings.batch_size);
        let records = self
            .run_waves(FetchProfile::Slim, &groups, progress, |group| {
                self.api.works_slim(group)
            })
            .await;
        key_by_id(records)
    }

    pub async fn fetch_bulk_full<'i, I>(
        &self,
        ids: I,
        progress: &mut ProgressTracker<'_>,
    ) -> BTreeMap<CanonicalId, FullRecord>
    where
        I: IntoIterator<Item = &'i CanonicalId>,
    {
        let groups = group_ids(ids, self.settings.batch_size);
        let records = self
            .run_waves(FetchProfile::Full, &groups, progress, |group| {
                self.api.works_full(group)
            })
            .await;
        key_by_id(records)
    }

    pub fn group_count<'i, I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'i CanonicalId>,
    {
        group_ids(ids, self.settings.batch_size).len()
    }

    pub async fn fetch_citing_ids(
        &self,
        id: &CanonicalId,
        limit: usize,
        progress: &mut ProgressTracker<'_>,
    ) -> Vec<CanonicalId> {
        if limit == 0 {
            progress.advance();
            return Vec::new();
        }
        progress.record_calls(1);
        let result = self
            .api
            .citing_ids(std::slice::from_ref(id), limit.min(MAX_PAGE_SIZE))
            .await;
        progress.advance();
        match result {
            Ok(ids) => ids,
            Err(err) => {
                warn!(%id, error = %err, "citing lookup failed");
                Vec::new()
            }
        }
    }

    pub async fn fetch_citers_of<'i, I>(
        &self,
        ids: I,
        progress: &mut ProgressTracker<'_>,
    ) -> BTreeSet<CanonicalId>
    where
        I: IntoIterator<Item = &'i CanonicalId>,
    {
        let groups = group_ids(ids, self.settings.citers_batch_size);
        self.run_waves(FetchProfile::Slim, &groups, progress, |group| {
            self.api.citing_ids(group, MAX_PAGE_SIZE)
        })
        .await
        .into_iter()
        .collect()
    }

    /// Issues `groups` in waves of `concurrency` requests. Each wave settles
    /// completely before the next starts; a failed group contributes nothing.
    async fn run_waves<'g, T, F, Fut>(
        &self,
        profile: FetchProfile,
        groups: &'g [Vec<CanonicalId>],
        progress: &mut ProgressTracker<'_>,
        request: F,
    ) -> Vec<T>
    where
        F: Fn(&'g [CanonicalId]) -> Fut,
        Fut: Future<Output = Result<Vec<T>, KiraError>>,
    {
        let mut merged = Vec::new();
        for (wave_index, wave) in groups.chunks(self.settings.concurrency.max(1)).enumerate() {
            debug!(%profile, wave = wave_index, requests = wave.len(), "issuing wave");
            progress.record_calls(wave.len());
            let mut pending = wave
                .iter()
                .map(|group| {
                    let response = request(group.as_slice());
                    async move { (group, response.await) }
                })
                .collect::<FuturesUnordered<_>>();

            while let Some((group, result)) = pending.next().await {
                match result {
                    Ok(records) => merged.extend(records),
                    Err(err) => warn!(
                        %profile,
                        ids = group.len(),
                        first = %group[0],
                        error = %err,
                        "batch request failed; continuing without it"
                    ),
                }
                progress.group_done(group.len());
            }
        }
        merged
    }
}

fn key_by_id<T: Identified>(records: Vec<T>) -> BTreeMap<CanonicalId, T> {
    let mut keyed = BTreeMap::new();
    for record in records {
        keyed.entry(record.id().clone()).or_insert(record);
    }
    keyed
}
