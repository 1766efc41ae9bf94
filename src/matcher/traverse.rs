//! Traversal operators
//!
//! A [`Traversal`] walks the declarations below a root (the global namespace
//! unless told otherwise) and returns matches in pre-order, which is the
//! order declarations were first met while building. The root itself is
//! never a candidate.

use super::Matcher;
use crate::error::{QueryError, QueryResult};
use crate::graph::DeclGraph;
use crate::types::DeclId;
use tracing::trace;

/// Qualified names listed in an ambiguity error.
const MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct Traversal<'g> {
    graph: &'g DeclGraph,
    root: DeclId,
    recursive: bool,
    name_index: bool,
}

impl<'g> Traversal<'g> {
    pub fn new(graph: &'g DeclGraph) -> Self {
        Self {
            graph,
            root: graph.global_namespace(),
            recursive: true,
            name_index: true,
        }
    }

    /// Search below `root` instead of the global namespace.
    pub fn within(mut self, root: DeclId) -> Self {
        self.root = root;
        self
    }

    /// Only look at the root's direct members.
    pub fn direct_only(mut self) -> Self {
        self.recursive = false;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Seed candidates from the by-name index when the matcher pins a name.
    pub fn use_name_index(mut self, enabled: bool) -> Self {
        self.name_index = enabled;
        self
    }

    pub fn root(&self) -> DeclId {
        self.root
    }

    /// Every match, in pre-order.
    pub fn find_all(&self, matcher: &Matcher) -> Vec<DeclId> {
        let graph = self.graph;

        if self.name_index {
            if let Some(name) = matcher.name_hint() {
                // by-name lists are already in pre-order
                let found: Vec<DeclId> = graph
                    .find_by_name(name)
                    .iter()
                    .copied()
                    .filter(|&id| self.in_scope(id) && matcher.matches(graph, id))
                    .collect();
                trace!(name, matches = found.len(), "index-seeded traversal");
                return found;
            }
        }

        self.candidates()
            .iter()
            .copied()
            .filter(|&id| matcher.matches(graph, id))
            .collect()
    }

    /// The single match.
    ///
    /// Fails with [`QueryError::NotFound`] when nothing matches and with
    /// [`QueryError::AmbiguousMatch`] when more than one declaration does.
    pub fn find_one(&self, matcher: &Matcher) -> QueryResult<DeclId> {
        let found = self.find_all(matcher);
        match found.as_slice() {
            [] => Err(QueryError::NotFound {
                matcher: matcher.to_string(),
            }),
            [id] => Ok(*id),
            _ => Err(QueryError::AmbiguousMatch {
                matcher: matcher.to_string(),
                count: found.len(),
                candidates: found
                    .iter()
                    .take(MAX_CANDIDATES)
                    .map(|id| self.graph.qualified_name(*id).to_string())
                    .collect(),
            }),
        }
    }

    pub fn count(&self, matcher: &Matcher) -> usize {
        self.find_all(matcher).len()
    }

    pub fn exists(&self, matcher: &Matcher) -> bool {
        let graph = self.graph;
        self.candidates()
            .iter()
            .any(|&id| matcher.matches(graph, id))
    }

    fn candidates(&self) -> &'g [DeclId] {
        if self.recursive {
            &self.graph.subtree(self.root)[1..]
        } else {
            self.graph.decl(self.root).members()
        }
    }

    fn in_scope(&self, id: DeclId) -> bool {
        if id == self.root {
            return false;
        }
        if self.recursive {
            self.graph.contains(self.root, id)
        } else {
            self.graph.decl(id).parent == Some(self.root)
        }
    }
}
