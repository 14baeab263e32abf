use std::collections::{BTreeMap, BTreeSet};

use crate::domain::CanonicalId;

pub trait Ranked {
    fn rank(&self) -> f64;
}

/// Top `n` ids by rank, highest first. Equal ranks fall back to ascending id
/// so repeated builds over the same data select the same papers.
pub fn select_top<R: Ranked>(ranks: &BTreeMap<CanonicalId, R>, n: usize) -> Vec<CanonicalId> {
    let mut ordered = ranks.iter().collect::<Vec<_>>();
    ordered.sort_by(|(left_id, left), (right_id, right)| {
        right
            .rank()
            .total_cmp(&left.rank())
            .then_with(|| left_id.cmp(right_id))
    });
    ordered
        .into_iter()
        .take(n)
        .map(|(id, _)| id.clone())
        .collect()
}

/// `1 + ln(1 + half_life / max(1, current_year - year))`
pub fn recency_weight(year: i32, current_year: i32, half_life: f64) -> f64 {
    let age = (current_year - year).max(1) as f64;
    1.0 + (half_life / age).ln_1p()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn distinct(references: &[CanonicalId]) -> BTreeSet<&CanonicalId> {
    references.iter().collect()
}
