// orgscan-core/src/domain/dependency.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::ids::id15;

/// One "component uses ref-component" edge, as returned by the dependency API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ref_id: String,
    pub ref_name: String,
    pub ref_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Bulk edge list for a whole dataset. Records only keep the fragment that
/// concerns their own id (see [`DependencyGraph::fragment`]).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: Vec<DependencyEdge>,
    had_error: bool,
}

impl DependencyGraph {
    pub fn new(edges: Vec<DependencyEdge>, had_error: bool) -> Self {
        Self { edges, had_error }
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn fragment<'a, I>(&self, ids: I) -> Dependencies
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: HashSet<&str> = ids.into_iter().map(id15).collect();
        let mut fragment = Dependencies {
            had_error: self.had_error,
            ..Dependencies::default()
        };

        for edge in &self.edges {
            if wanted.contains(id15(&edge.id)) {
                fragment.using.push(DependencyItem {
                    id: id15(&edge.ref_id).to_string(),
                    name: edge.ref_name.clone(),
                    kind: edge.ref_type.clone(),
                });
            }
            if wanted.contains(id15(&edge.ref_id)) {
                fragment.referenced.push(DependencyItem {
                    id: id15(&edge.id).to_string(),
                    name: edge.name.clone(),
                    kind: edge.kind.clone(),
                });
                *fragment
                    .referenced_by_type
                    .entry(edge.kind.clone())
                    .or_insert(0) += 1;
            }
        }

        fragment
    }
}

/// Dependency Graph Fragment attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    pub had_error: bool,
    pub using: Vec<DependencyItem>,
    pub referenced: Vec<DependencyItem>,
    pub referenced_by_type: BTreeMap<String, usize>,
}

impl Dependencies {
    /// True only when the lookup succeeded and nothing points at the record.
    /// A failed lookup says nothing about usage.
    pub fn is_unreferenced(&self) -> bool {
        !self.had_error && self.referenced.is_empty()
    }
}
