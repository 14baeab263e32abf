use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalId, SlimRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Cites,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: CanonicalId,
    pub target: CanonicalId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn cites(source: &CanonicalId, target: &CanonicalId) -> Self {
        Self {
            source: source.clone(),
            target: target.clone(),
            kind: EdgeKind::Cites,
        }
    }
}

/// One `cites` edge per reference from any of `seed`, `seeds`, `top` to a
/// member of the same set. Parallel edges are kept; self-references are not.
pub fn build_edges(seed: &SlimRecord, seeds: &[&SlimRecord], top: &[&SlimRecord]) -> Vec<Edge> {
    let members = std::iter::once(seed)
        .chain(seeds.iter().copied())
        .chain(top.iter().copied())
        .map(|record| &record.id)
        .collect::<BTreeSet<_>>();

    let mut edges = Vec::new();
    for record in std::iter::once(seed)
        .chain(seeds.iter().copied())
        .chain(top.iter().copied())
    {
        for reference in &record.references {
            if reference != &record.id && members.contains(reference) {
                edges.push(Edge::cites(&record.id, reference));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> CanonicalId {
        CanonicalId::normalized(value).unwrap()
    }

    fn record(value: &str, references: &[&str]) -> SlimRecord {
        SlimRecord {
            id: id(value),
            year: 2020,
            citation_count: 1,
            references: references.iter().map(|r| id(r)).collect(),
        }
    }

    #[test]
    fn seed_and_members_produce_three_edges() {
        let s = record("W1", &["W2", "W3", "W999"]);
        let a = record("W2", &["W3", "W888"]);
        let b = record("W3", &[]);

        let edges = build_edges(&s, &[&a, &b], &[]);
        assert_eq!(
            edges,
            vec![
                Edge::cites(&id("W1"), &id("W2")),
                Edge::cites(&id("W1"), &id("W3")),
                Edge::cites(&id("W2"), &id("W3")),
            ]
        );
    }

    #[test]
    fn self_references_are_dropped() {
        let s = record("W1", &["W1", "W2"]);
        let a = record("W2", &["W2"]);
        let edges = build_edges(&s, &[], &[&a]);
        assert_eq!(edges, vec![Edge::cites(&id("W1"), &id("W2"))]);
    }

    #[test]
    fn edge_serializes_with_type_tag() {
        let json = serde_json::to_value(Edge::cites(&id("W1"), &id("W2"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"source": "W1", "target": "W2", "type": "cites"})
        );
    }
}
