use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::domain::{CanonicalId, SlimRecord};
use crate::fetch::BatchFetcher;
use crate::openalex::MetadataApi;
use crate::progress::ProgressTracker;
use crate::rank::{Ranked, distinct, select_top};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RootRank {
    pub cited: u32,
    pub co_cited: u32,
    pub co_citing: u32,
}

impl Ranked for RootRank {
    fn rank(&self) -> f64 {
        f64::from(self.cited + self.co_cited + self.co_citing)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RootExpansion {
    pub seeds: BTreeMap<CanonicalId, SlimRecord>,
    pub candidates: BTreeMap<CanonicalId, SlimRecord>,
    pub ranks: BTreeMap<CanonicalId, RootRank>,
    pub top: Vec<CanonicalId>,
}

pub fn root_candidate_ids(
    seed_id: &CanonicalId,
    root_seed_ids: &BTreeSet<CanonicalId>,
    seeds: &BTreeMap<CanonicalId, SlimRecord>,
) -> BTreeSet<CanonicalId> {
    seeds
        .values()
        .flat_map(|record| record.references.iter())
        .filter(|id| *id != seed_id && !root_seed_ids.contains(*id))
        .cloned()
        .collect()
}

pub fn rank_roots(
    root_seed_ids: &BTreeSet<CanonicalId>,
    seeds: &BTreeMap<CanonicalId, SlimRecord>,
    candidates: &BTreeMap<CanonicalId, SlimRecord>,
) -> BTreeMap<CanonicalId, RootRank> {
    let mut ranks = candidates
        .keys()
        .map(|id| (id.clone(), RootRank::default()))
        .collect::<BTreeMap<_, _>>();

    for seed in seeds.values() {
        for reference in distinct(&seed.references) {
            if let Some(rank) = ranks.get_mut(reference) {
                rank.cited += 1;
            }
        }
    }

    for record in seeds.values().chain(candidates.values()) {
        let references = distinct(&record.references);
        let shared = references
            .iter()
            .filter(|id| root_seed_ids.contains(**id))
            .count() as u32;
        if shared == 0 {
            continue;
        }
        for reference in references {
            if reference == &record.id {
                continue;
            }
            if let Some(rank) = ranks.get_mut(reference) {
                rank.co_cited += shared;
            }
        }
    }

    let seed_reference_union = seeds
        .values()
        .flat_map(|record| record.references.iter())
        .collect::<BTreeSet<_>>();
    for (id, candidate) in candidates {
        let co_citing = distinct(&candidate.references)
            .iter()
            .filter(|reference| seed_reference_union.contains(**reference))
            .count() as u32;
        if let Some(rank) = ranks.get_mut(id) {
            rank.co_citing = co_citing;
        }
    }

    ranks
}

pub async fn expand_roots<A: MetadataApi>(
    fetcher: &BatchFetcher<'_, A>,
    seed: &SlimRecord,
    n_roots: usize,
    progress: &mut ProgressTracker<'_>,
) -> RootExpansion {
    let root_seed_ids = seed.references.iter().cloned().collect::<BTreeSet<_>>();

    progress.set_stage("Fetching the seed's references");
    let seeds = fetcher.fetch_bulk_slim(&root_seed_ids, progress).await;

    let candidate_ids = root_candidate_ids(&seed.id, &root_seed_ids, &seeds);
    progress.reestimate(|plan| {
        plan.root_seeds = root_seed_ids.len();
        plan.root_candidates = candidate_ids.len();
    });

    progress.set_stage("Fetching works cited by the references");
    let candidates = fetcher.fetch_bulk_slim(&candidate_ids, progress).await;

    let ranks = rank_roots(&root_seed_ids, &seeds, &candidates);
    let top = select_top(&ranks, n_roots);
    info!(
        seeds = seeds.len(),
        candidates = candidates.len(),
        selected = top.len(),
        "root expansion ranked"
    );

    RootExpansion {
        seeds,
        candidates,
        ranks,
        top,
    }
}
