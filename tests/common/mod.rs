#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use kira_citegraph::domain::{CanonicalId, DisplayMetadata, FullRecord, SlimRecord};
use kira_citegraph::error::KiraError;
use kira_citegraph::openalex::MetadataApi;

pub fn id(value: &str) -> CanonicalId {
    CanonicalId::normalized(value).unwrap()
}

/// In-memory corpus; "cites" lookups are answered from reference lists.
#[derive(Default)]
pub struct InMemoryApi {
    works: BTreeMap<CanonicalId, FullRecord>,
    /// Full-profile groups containing any of these ids fail.
    failing_full: BTreeSet<CanonicalId>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work(mut self, value: &str, year: i32, citations: u64, references: &[&str]) -> Self {
        let record = FullRecord {
            record: SlimRecord {
                id: id(value),
                year,
                citation_count: citations,
                references: references.iter().map(|r| id(r)).collect(),
            },
            metadata: DisplayMetadata {
                title: Some(format!("Work {value}")),
                ..DisplayMetadata::default()
            },
        };
        self.works.insert(id(value), record);
        self
    }

    pub fn fail_full_batch_containing(mut self, value: &str) -> Self {
        self.failing_full.insert(id(value));
        self
    }

    fn log(&self, kind: &str, size: usize) {
        self.calls.lock().unwrap().push((kind.to_string(), size));
    }

    pub fn calls_of(&self, kind: &str) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, size)| *size)
            .collect()
    }
}

#[async_trait]
impl MetadataApi for InMemoryApi {
    async fn work(&self, id: &CanonicalId) -> Result<FullRecord, KiraError> {
        self.log("work", 1);
        self.works.get(id).cloned().ok_or(KiraError::OpenAlexStatus {
            status: 404,
            message: format!("{id} not found"),
        })
    }

    async fn works_slim(&self, ids: &[CanonicalId]) -> Result<Vec<SlimRecord>, KiraError> {
        self.log("slim", ids.len());
        Ok(ids
            .iter()
            .filter_map(|id| self.works.get(id))
            .map(|work| work.record.clone())
            .collect())
    }

    async fn works_full(&self, ids: &[CanonicalId]) -> Result<Vec<FullRecord>, KiraError> {
        self.log("full", ids.len());
        if ids.iter().any(|id| self.failing_full.contains(id)) {
            return Err(KiraError::OpenAlexStatus {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.works.get(id))
            .cloned()
            .collect())
    }

    async fn citing_ids(
        &self,
        subjects: &[CanonicalId],
        limit: usize,
    ) -> Result<Vec<CanonicalId>, KiraError> {
        self.log("cites", subjects.len());
        Ok(self
            .works
            .values()
            .filter(|work| {
                work.record
                    .references
                    .iter()
                    .any(|reference| subjects.contains(reference))
            })
            .map(|work| work.record.id.clone())
            .take(limit)
            .collect())
    }
}
