use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::domain::{CanonicalId, SlimRecord};
use crate::fetch::BatchFetcher;
use crate::openalex::MetadataApi;
use crate::progress::ProgressTracker;
use crate::rank::{Ranked, distinct, recency_weight, round2, select_top};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BranchOptions {
    pub n_branches: usize,
    pub branch_seeds_limit: usize,
    pub min_branch_ref_frequency: usize,
    pub half_life: f64,
    pub current_year: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BranchRank {
    pub citing: u32,
    pub co_citing: u32,
    pub co_cited: f64,
}

impl Ranked for BranchRank {
    fn rank(&self) -> f64 {
        f64::from(self.citing + self.co_citing) + round2(self.co_cited)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BranchExpansion {
    pub citing_ids: Vec<CanonicalId>,
    pub seeds: BTreeMap<CanonicalId, SlimRecord>,
    pub candidates: BTreeMap<CanonicalId, SlimRecord>,
    pub ranks: BTreeMap<CanonicalId, BranchRank>,
    pub top: Vec<CanonicalId>,
}

pub fn is_viable_branch(record: &SlimRecord, seed_year: i32) -> bool {
    record.citation_count > 0 && record.year > seed_year
}

pub fn frequent_references(
    seed_id: &CanonicalId,
    branch_seeds: &BTreeMap<CanonicalId, SlimRecord>,
    min_frequency: usize,
) -> BTreeSet<CanonicalId> {
    let mut frequency = BTreeMap::<&CanonicalId, usize>::new();
    for record in branch_seeds.values() {
        for reference in distinct(&record.references) {
            *frequency.entry(reference).or_default() += 1;
        }
    }
    frequency
        .into_iter()
        .filter(|(id, count)| {
            *count >= min_frequency && *id != seed_id && !branch_seeds.contains_key(*id)
        })
        .map(|(id, _)| id.clone())
        .collect()
}

pub fn rank_branches(
    seed: &SlimRecord,
    branch_seeds: &BTreeMap<CanonicalId, SlimRecord>,
    candidates: &BTreeMap<CanonicalId, SlimRecord>,
    half_life: f64,
    current_year: i32,
) -> BTreeMap<CanonicalId, BranchRank> {
    let seed_references = distinct(&seed.references);
    let mut ranks = BTreeMap::new();

    for (id, candidate) in candidates {
        let references = distinct(&candidate.references);
        let citing = references
            .iter()
            .filter(|reference| branch_seeds.contains_key(**reference))
            .count() as u32;
        let co_citing = references
            .iter()
            .filter(|reference| seed_references.contains(**reference))
            .count() as u32;
        ranks.insert(
            id.clone(),
            BranchRank {
                citing,
                co_citing,
                co_cited: 0.0,
            },
        );
    }

    for record in branch_seeds.values().chain(candidates.values()) {
        let references = distinct(&record.references);
        if !references.contains(&seed.id) {
            continue;
        }
        let weight = recency_weight(record.year, current_year, half_life);
        for reference in references {
            if reference == &seed.id || reference == &record.id {
                continue;
            }
            if let Some(rank) = ranks.get_mut(reference) {
                rank.co_cited += weight;
            }
        }
    }

    ranks
}

pub async fn expand_branches<A: MetadataApi>(
    fetcher: &BatchFetcher<'_, A>,
    seed: &SlimRecord,
    options: &BranchOptions,
    progress: &mut ProgressTracker<'_>,
) -> BranchExpansion {
    progress.set_stage("Looking up works citing the seed");
    let citing_ids = fetcher
        .fetch_citing_ids(&seed.id, options.branch_seeds_limit, progress)
        .await;
    progress.reestimate(|plan| plan.branch_seeds = citing_ids.len());

    progress.set_stage("Fetching citing works");
    let mut seeds = fetcher.fetch_bulk_slim(&citing_ids, progress).await;
    seeds.retain(|_, record| is_viable_branch(record, seed.year));

    let candidate_ids =
        frequent_references(&seed.id, &seeds, options.min_branch_ref_frequency);
    progress.reestimate(|plan| plan.branch_candidates = candidate_ids.len());

    progress.set_stage("Fetching works co-cited by citing works");
    let mut candidates = fetcher.fetch_bulk_slim(&candidate_ids, progress).await;
    candidates.retain(|_, record| is_viable_branch(record, seed.year));

    let ranks = rank_branches(
        seed,
        &seeds,
        &candidates,
        options.half_life,
        options.current_year,
    );
    let top = select_top(&ranks, options.n_branches);
    info!(
        citing = citing_ids.len(),
        seeds = seeds.len(),
        candidates = candidates.len(),
        selected = top.len(),
        "branch expansion ranked"
    );

    BranchExpansion {
        citing_ids,
        seeds,
        candidates,
        ranks,
        top,
    }
}
