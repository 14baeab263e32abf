use serde::Serialize;

const ESTIMATED_REFERENCES_PER_WORK: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEstimate {
    pub message: String,
    pub percent: f64,
    pub completed: usize,
    pub total: usize,
}

pub trait ProgressSink {
    fn event(&self, estimate: ProgressEstimate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEstimate),
{
    fn event(&self, estimate: ProgressEstimate) {
        self(estimate)
    }
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn event(&self, _estimate: ProgressEstimate) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    PerRecord,
    PerBatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    pub seed: usize,
    pub root_seeds: usize,
    pub root_candidates: usize,
    pub citing_lookup: usize,
    pub branch_seeds: usize,
    pub branch_candidates: usize,
    pub full_records: usize,
}

impl BuildPlan {
    pub fn initial(
        seed_references: usize,
        branch_seeds_limit: usize,
        n_roots: usize,
        n_branches: usize,
    ) -> Self {
        Self {
            seed: 1,
            root_seeds: seed_references,
            root_candidates: seed_references * ESTIMATED_REFERENCES_PER_WORK,
            citing_lookup: 1,
            branch_seeds: branch_seeds_limit,
            branch_candidates: branch_seeds_limit,
            full_records: seed_references + branch_seeds_limit + n_roots + n_branches,
        }
    }

    pub fn total(&self) -> usize {
        self.seed
            + self.root_seeds
            + self.root_candidates
            + self.citing_lookup
            + self.branch_seeds
            + self.branch_candidates
            + self.full_records
    }
}

pub struct ProgressTracker<'s> {
    sink: &'s dyn ProgressSink,
    granularity: Granularity,
    stage: String,
    plan: BuildPlan,
    completed: usize,
    total: usize,
    calls: usize,
}

impl<'s> ProgressTracker<'s> {
    pub fn new(sink: &'s dyn ProgressSink, granularity: Granularity) -> Self {
        Self {
            sink,
            granularity,
            stage: String::new(),
            plan: BuildPlan::default(),
            completed: 0,
            total: 0,
            calls: 0,
        }
    }

    pub fn set_stage(&mut self, stage: &str) {
        self.stage = stage.to_string();
    }

    pub fn set_total(&mut self, total: usize) {
        self.total = total.max(self.completed);
    }

    pub fn reestimate<F>(&mut self, update: F)
    where
        F: FnOnce(&mut BuildPlan),
    {
        update(&mut self.plan);
        let total = self.plan.total();
        self.set_total(total);
    }

    pub fn record_calls(&mut self, calls: usize) {
        self.calls += calls;
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn advance(&mut self) {
        self.completed += 1;
        if self.completed > self.total {
            self.total = self.completed;
        }
        self.sink.event(ProgressEstimate {
            message: self.stage.clone(),
            percent: percent(self.completed, self.total),
            completed: self.completed,
            total: self.total,
        });
    }

    pub fn group_done(&mut self, ids: usize) {
        match self.granularity {
            Granularity::PerRecord => {
                for _ in 0..ids {
                    self.advance();
                }
            }
            Granularity::PerBatch => self.advance(),
        }
    }
}

fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
