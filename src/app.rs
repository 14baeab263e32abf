use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::{Datelike, Utc};
use tracing::info;

use crate::assemble::{Graph, GraphMeta, GraphParts, NodeRole, TopPaper, assemble};
use crate::branches::{BranchOptions, expand_branches};
use crate::domain::{CanonicalId, DisplayMetadata};
use crate::edges::build_edges;
use crate::error::KiraError;
use crate::fetch::{BatchFetcher, FetchSettings};
use crate::hydrate;
use crate::openalex::MetadataApi;
use crate::progress::{BuildPlan, Granularity, ProgressSink, ProgressTracker};
use crate::rank::Ranked;
use crate::roots::expand_roots;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub n_roots: usize,
    pub n_branches: usize,
    pub branch_seeds_limit: usize,
    pub min_branch_ref_frequency: usize,
    pub half_life: f64,
    pub current_year: Option<i32>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            n_roots: 25,
            n_branches: 25,
            branch_seeds_limit: 200,
            min_branch_ref_frequency: 2,
            half_life: 4.0,
            current_year: None,
        }
    }
}

#[derive(Clone)]
pub struct App<A: MetadataApi> {
    api: A,
    fetch: FetchSettings,
}

impl<A: MetadataApi> App<A> {
    pub fn new(api: A, fetch: FetchSettings) -> Self {
        Self { api, fetch }
    }

    /// Builds the citation graph around `source`. Only an invalid identifier
    /// or an unavailable seed record fails the build.
    pub async fn build_graph(
        &self,
        source: &str,
        options: &BuildOptions,
        sink: &dyn ProgressSink,
    ) -> Result<Graph, KiraError> {
        let started = Instant::now();
        let source_id: CanonicalId = source.parse()?;
        if source_id.is_author() {
            return Err(KiraError::InvalidIdentifier(format!(
                "{source} is an author id; graphs are built around works"
            )));
        }

        let fetcher = BatchFetcher::new(&self.api, self.fetch);
        let mut progress = ProgressTracker::new(sink, Granularity::PerRecord);
        progress.reestimate(|plan| {
            *plan = BuildPlan::initial(
                0,
                options.branch_seeds_limit,
                options.n_roots,
                options.n_branches,
            )
        });

        progress.set_stage("Fetching seed publication");
        let seed = fetcher
            .fetch_one(&source_id, &mut progress)
            .await
            .ok_or_else(|| KiraError::SeedUnavailable(source_id.to_string()))?;
        info!(seed = %seed.id(), references = seed.record.references.len(), "seed fetched");
        progress.reestimate(|plan| {
            *plan = BuildPlan::initial(
                seed.record.references.len(),
                options.branch_seeds_limit,
                options.n_roots,
                options.n_branches,
            )
        });

        let roots = expand_roots(&fetcher, &seed.record, options.n_roots, &mut progress).await;

        let branch_options = BranchOptions {
            n_branches: options.n_branches,
            branch_seeds_limit: options.branch_seeds_limit,
            min_branch_ref_frequency: options.min_branch_ref_frequency,
            half_life: options.half_life,
            current_year: options.current_year.unwrap_or_else(|| Utc::now().year()),
        };
        let branches = expand_branches(&fetcher, &seed.record, &branch_options, &mut progress).await;

        let full_ids = roots
            .seeds
            .keys()
            .chain(branches.seeds.keys())
            .chain(roots.top.iter())
            .chain(branches.top.iter())
            .filter(|id| *id != seed.id())
            .cloned()
            .collect::<BTreeSet<_>>();
        progress.reestimate(|plan| plan.full_records = full_ids.len());
        progress.set_stage("Fetching metadata for selected works");
        let full = fetcher.fetch_bulk_full(&full_ids, &mut progress).await;

        let root_seeds = roots
            .seeds
            .keys()
            .filter_map(|id| full.get(id))
            .collect::<Vec<_>>();
        let branch_seeds = branches
            .seeds
            .keys()
            .filter_map(|id| full.get(id))
            .collect::<Vec<_>>();
        let mut top_papers = Vec::new();
        for id in &roots.top {
            if let (Some(record), Some(rank)) = (full.get(id), roots.ranks.get(id)) {
                top_papers.push(TopPaper {
                    record,
                    role: NodeRole::Root,
                    rank: rank.rank(),
                });
            }
        }
        for id in &branches.top {
            if let (Some(record), Some(rank)) = (full.get(id), branches.ranks.get(id)) {
                top_papers.push(TopPaper {
                    record,
                    role: NodeRole::Branch,
                    rank: rank.rank(),
                });
            }
        }

        let parts = GraphParts {
            seed: &seed,
            root_seeds,
            branch_seeds,
            top_papers,
        };
        let edges = build_edges(
            &seed.record,
            &parts
                .root_seeds
                .iter()
                .chain(parts.branch_seeds.iter())
                .map(|record| &record.record)
                .collect::<Vec<_>>(),
            &parts
                .top_papers
                .iter()
                .map(|top| &top.record.record)
                .collect::<Vec<_>>(),
        );
        let (nodes, edges) = assemble(&parts, edges);

        let meta = GraphMeta {
            source_id: seed.id().clone(),
            root_seeds: roots.seeds.len(),
            root_candidates: roots.candidates.len(),
            citing_ids: branches.citing_ids.len(),
            branch_seeds: branches.seeds.len(),
            branch_candidates: branches.candidates.len(),
            selected_roots: roots.top.len(),
            selected_branches: branches.top.len(),
            nodes: nodes.len(),
            edges: edges.len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            api_calls: progress.calls(),
            built_at: Utc::now(),
        };
        info!(
            nodes = meta.nodes,
            edges = meta.edges,
            api_calls = meta.api_calls,
            duration_ms = meta.duration_ms,
            "graph built"
        );

        Ok(Graph { nodes, edges, meta })
    }

    pub async fn hydrate_metadata(
        &self,
        ids: &[CanonicalId],
        sink: &dyn ProgressSink,
    ) -> BTreeMap<CanonicalId, DisplayMetadata> {
        let fetcher = BatchFetcher::new(&self.api, self.fetch);
        let mut progress = ProgressTracker::new(sink, Granularity::PerBatch);
        hydrate::hydrate_metadata(&fetcher, ids, &mut progress).await
    }
}
