use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalId, DisplayMetadata, FullRecord};
use crate::edges::Edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Source,
    RootSeed,
    BranchSeed,
    Root,
    Branch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: CanonicalId,
    pub order: i32,
    pub connections: Vec<CanonicalId>,
    pub cited_by: Vec<CanonicalId>,
    pub is_source: bool,
    pub role: NodeRole,
    pub rank: Option<f64>,
    pub citation_count: u64,
    pub metadata: DisplayMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMeta {
    pub source_id: CanonicalId,
    pub root_seeds: usize,
    pub root_candidates: usize,
    pub citing_ids: usize,
    pub branch_seeds: usize,
    pub branch_candidates: usize,
    pub selected_roots: usize,
    pub selected_branches: usize,
    pub nodes: usize,
    pub edges: usize,
    pub duration_ms: u64,
    pub api_calls: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
    pub meta: GraphMeta,
}

#[derive(Debug, Clone)]
pub struct TopPaper<'a> {
    pub record: &'a FullRecord,
    pub role: NodeRole,
    pub rank: f64,
}

#[derive(Debug, Clone)]
pub struct GraphParts<'a> {
    pub seed: &'a FullRecord,
    pub root_seeds: Vec<&'a FullRecord>,
    pub branch_seeds: Vec<&'a FullRecord>,
    pub top_papers: Vec<TopPaper<'a>>,
}

/// Merges `parts` into nodes (first write wins), resolves connections against
/// the final node set, builds the reverse index and drops edges that leave it.
pub fn assemble(parts: &GraphParts<'_>, edges: Vec<Edge>) -> (Vec<GraphNode>, Vec<Edge>) {
    let mut merged = BTreeMap::<&CanonicalId, (&FullRecord, NodeRole, Option<f64>)>::new();
    merged.insert(parts.seed.id(), (parts.seed, NodeRole::Source, None));
    for record in &parts.root_seeds {
        merged
            .entry(record.id())
            .or_insert((*record, NodeRole::RootSeed, None));
    }
    for record in &parts.branch_seeds {
        merged
            .entry(record.id())
            .or_insert((*record, NodeRole::BranchSeed, None));
    }
    for top in &parts.top_papers {
        merged
            .entry(top.record.id())
            .or_insert((top.record, top.role, Some(top.rank)));
    }

    let node_ids = merged.keys().copied().collect::<BTreeSet<_>>();

    let mut nodes = merged
        .values()
        .map(|(record, role, rank)| {
            let mut seen = BTreeSet::new();
            let connections = record
                .record
                .references
                .iter()
                .filter(|reference| {
                    *reference != record.id()
                        && node_ids.contains(*reference)
                        && seen.insert(*reference)
                })
                .cloned()
                .collect();
            GraphNode {
                id: record.id().clone(),
                order: record.record.year,
                connections,
                cited_by: Vec::new(),
                is_source: *role == NodeRole::Source,
                role: *role,
                rank: *rank,
                citation_count: record.record.citation_count,
                metadata: record.metadata.clone(),
            }
        })
        .collect::<Vec<_>>();

    nodes.sort_by(|left, right| {
        right
            .order
            .cmp(&left.order)
            .then_with(|| left.id.cmp(&right.id))
    });

    let position = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.clone(), index))
        .collect::<BTreeMap<_, _>>();
    let reverse = nodes
        .iter()
        .flat_map(|node| {
            node.connections
                .iter()
                .map(move |target| (target.clone(), node.id.clone()))
        })
        .collect::<Vec<_>>();
    for (target, citer) in reverse {
        if let Some(index) = position.get(&target) {
            nodes[*index].cited_by.push(citer);
        }
    }

    let edges = edges
        .into_iter()
        .filter(|edge| node_ids.contains(&edge.source) && node_ids.contains(&edge.target))
        .collect();

    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SlimRecord;
    use crate::edges::build_edges;

    fn id(value: &str) -> CanonicalId {
        CanonicalId::normalized(value).unwrap()
    }

    fn full(value: &str, year: i32, references: &[&str]) -> FullRecord {
        FullRecord {
            record: SlimRecord {
                id: id(value),
                year,
                citation_count: 1,
                references: references.iter().map(|r| id(r)).collect(),
            },
            metadata: DisplayMetadata {
                title: Some(format!("title {value}")),
                ..DisplayMetadata::default()
            },
        }
    }

    #[test]
    fn first_write_wins_and_order_is_stable() {
        let seed = full("W1", 2020, &["W2", "W3", "W404"]);
        let root_seed = full("W2", 2018, &["W5"]);
        let root_seed_dup = full("W3", 2019, &[]);
        let top = full("W3", 2019, &["W2"]);
        let root = full("W5", 2018, &[]);
        let parts = GraphParts {
            seed: &seed,
            root_seeds: vec![&root_seed, &root_seed_dup],
            branch_seeds: vec![],
            top_papers: vec![
                TopPaper {
                    record: &top,
                    role: NodeRole::Branch,
                    rank: 3.0,
                },
                TopPaper {
                    record: &root,
                    role: NodeRole::Root,
                    rank: 2.0,
                },
            ],
        };

        let (nodes, _) = assemble(&parts, Vec::new());
        let ids = nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["W1", "W3", "W2", "W5"]);

        let w3 = &nodes[1];
        assert_eq!(w3.role, NodeRole::RootSeed);
        assert!(w3.connections.is_empty());
        assert!(nodes[0].is_source);
        assert_eq!(nodes[0].connections, vec![id("W2"), id("W3")]);
        assert_eq!(nodes[3].rank, Some(2.0));
    }

    #[test]
    fn reverse_index_mirrors_connections() {
        let seed = full("W1", 2020, &["W2", "W3"]);
        let a = full("W2", 2018, &["W3", "W3"]);
        let b = full("W3", 2017, &[]);
        let parts = GraphParts {
            seed: &seed,
            root_seeds: vec![&a, &b],
            branch_seeds: vec![],
            top_papers: vec![],
        };
        let edges = build_edges(&seed.record, &[&a.record, &b.record], &[]);
        let (nodes, edges) = assemble(&parts, edges);

        for node in &nodes {
            for target in &node.connections {
                let other = nodes.iter().find(|n| &n.id == target).unwrap();
                assert!(other.cited_by.contains(&node.id));
            }
            for citer in &node.cited_by {
                let other = nodes.iter().find(|n| &n.id == citer).unwrap();
                assert!(other.connections.contains(&node.id));
            }
        }
        let b_node = nodes.iter().find(|n| n.id == id("W3")).unwrap();
        assert_eq!(b_node.cited_by, vec![id("W1"), id("W2")]);
        // duplicate reference yields a parallel edge but a single connection
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn edges_outside_the_node_set_are_stripped() {
        let seed = full("W1", 2020, &[]);
        let parts = GraphParts {
            seed: &seed,
            root_seeds: vec![],
            branch_seeds: vec![],
            top_papers: vec![],
        };
        let (_, edges) = assemble(&parts, vec![Edge::cites(&id("W1"), &id("W9"))]);
        assert!(edges.is_empty());
    }
}
