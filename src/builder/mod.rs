//! Declaration Graph Builder
//!
//! Units are built independently ([`UnitBuilder`] through [`ResolvedUnit`])
//! and merged one at a time into a [`GraphBuilder`]. Merging is the only step
//! that touches the shared forest, so it takes `&mut self`; freezing hands the
//! forest over to an immutable [`DeclGraph`].
//!
//! ```text
//! Created -> NodesAllocated -> FieldsResolved -> Merged -> Frozen
//! ```

mod merge;
mod unit;

pub use merge::MergeSummary;
pub(crate) use merge::MergeKey;
pub use unit::{AllocatedUnit, ResolvedUnit, UnitBuilder};

use crate::Settings;
use crate::config::BuilderConfig;
use crate::decl::Declaration;
use crate::error::GraphResult;
use crate::graph::DeclGraph;
use crate::record::RecordStream;
use crate::registry::NodeRegistry;
use crate::ty::Type;
use crate::types::{CompactString, DeclId, FileId, IdCounter, UnitId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Lifecycle stage of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildStage {
    Created,
    NodesAllocated,
    FieldsResolved,
    Merged,
    Frozen,
}

/// The shared forest that resolved units are merged into.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    pub(crate) config: BuilderConfig,
    pub(crate) decls: Vec<Declaration>,
    pub(crate) types: Vec<Type>,
    pub(crate) files: Vec<CompactString>,
    pub(crate) file_index: HashMap<CompactString, FileId>,
    pub(crate) registries: Vec<NodeRegistry>,
    pub(crate) merge_index: HashMap<MergeKey, DeclId>,
    pub(crate) global: Option<DeclId>,
}

impl GraphBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            decls: Vec::new(),
            types: Vec::new(),
            files: Vec::new(),
            file_index: HashMap::new(),
            registries: Vec::new(),
            merge_index: HashMap::new(),
            global: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.builder.clone())
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn stage(&self) -> BuildStage {
        if self.registries.is_empty() {
            BuildStage::Created
        } else {
            BuildStage::Merged
        }
    }

    /// Id the next merged unit must carry.
    pub fn next_unit_id(&self) -> UnitId {
        IdCounter::<UnitId>::after(self.registries.len()).next_id()
    }

    /// Start a unit that will merge next.
    pub fn unit_builder(&self, records: RecordStream) -> UnitBuilder {
        UnitBuilder::new(self.next_unit_id(), records, self.config.clone())
    }

    /// Build and merge one unit. On error the builder is left as it was.
    pub fn add_unit(&mut self, records: RecordStream) -> GraphResult<UnitId> {
        let resolved = self.unit_builder(records).build()?;
        Ok(self.merge(resolved)?.unit)
    }

    /// Build several units in parallel and merge them in the given order.
    ///
    /// Allocation and resolution run on a pool of `parallel_threads`
    /// workers. Merging stops at the first unit that failed to build; the
    /// units before it stay merged.
    pub fn add_units(&mut self, streams: Vec<RecordStream>) -> GraphResult<Vec<UnitId>> {
        let mut counter = IdCounter::<UnitId>::after(self.registries.len());
        let builders: Vec<UnitBuilder> = streams
            .into_iter()
            .map(|records| UnitBuilder::new(counter.next_id(), records, self.config.clone()))
            .collect();

        debug!(
            units = builders.len(),
            threads = self.config.parallel_threads,
            "building units in parallel"
        );

        let build_all = |builders: Vec<UnitBuilder>| -> Vec<GraphResult<ResolvedUnit>> {
            builders.into_par_iter().map(UnitBuilder::build).collect()
        };
        let resolved = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallel_threads)
            .thread_name(|i| format!("declgraph-unit-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| build_all(builders)),
            Err(e) => {
                warn!("Failed to configure thread pool, using the global pool: {e}");
                build_all(builders)
            }
        };

        let mut merged = Vec::with_capacity(resolved.len());
        for unit in resolved {
            merged.push(self.merge(unit?)?.unit);
        }
        Ok(merged)
    }

    pub fn unit_count(&self) -> usize {
        self.registries.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Stop accepting units and index the forest for queries.
    pub fn freeze(self) -> DeclGraph {
        DeclGraph::from_builder(self)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::record::{Record, RecordKind, fields};

    fn unit_with_namespace(name: &str) -> RecordStream {
        vec![
            Record::new(RecordKind::Namespace, "_1").with_literal(fields::NAME, "::"),
            Record::new(RecordKind::Namespace, "_2")
                .with_literal(fields::NAME, name)
                .with_ref(fields::CONTEXT, "_1"),
        ]
        .into()
    }

    #[test]
    fn test_stage_progression() {
        let mut builder = GraphBuilder::default();
        assert_eq!(builder.stage(), BuildStage::Created);

        let unit = builder.unit_builder(unit_with_namespace("a"));
        assert_eq!(unit.stage(), BuildStage::Created);
        let allocated = unit.allocate().unwrap();
        assert_eq!(allocated.stage(), BuildStage::NodesAllocated);
        let resolved = allocated.resolve().unwrap();
        assert_eq!(resolved.stage(), BuildStage::FieldsResolved);

        builder.merge(resolved).unwrap();
        assert_eq!(builder.stage(), BuildStage::Merged);
        assert_eq!(builder.freeze().stage(), BuildStage::Frozen);
    }

    #[test]
    fn test_units_merge_in_order() {
        let mut builder = GraphBuilder::default();
        let early = builder.unit_builder(unit_with_namespace("a")).build().unwrap();
        // a second builder created before the first unit merged carries the same id
        let twin = builder.unit_builder(unit_with_namespace("b")).build().unwrap();

        builder.merge(early).unwrap();
        let err = builder.merge(twin).unwrap_err();
        assert!(matches!(err, GraphError::UnitOutOfOrder { .. }));
        assert_eq!(builder.unit_count(), 1);
    }

    #[test]
    fn test_failed_unit_leaves_builder_untouched() {
        let mut builder = GraphBuilder::default();
        builder.add_unit(unit_with_namespace("a")).unwrap();
        let decls = builder.decl_count();

        let broken: RecordStream = vec![
            Record::new(RecordKind::Namespace, "_1").with_literal(fields::NAME, "::"),
            Record::new(RecordKind::Typedef, "_2")
                .with_literal(fields::NAME, "T")
                .with_ref(fields::CONTEXT, "_1")
                .with_ref(fields::TYPE, "_404"),
        ]
        .into();
        assert!(builder.add_unit(broken).is_err());
        assert_eq!(builder.decl_count(), decls);
        assert_eq!(builder.next_unit_id(), UnitId::new(2).unwrap());
    }

    #[test]
    fn test_parallel_units_merge_deterministically() {
        let mut config = BuilderConfig::default();
        config.parallel_threads = 4;
        let mut builder = GraphBuilder::new(config);

        let names = ["a", "b", "c", "d", "e", "f"];
        let ids = builder
            .add_units(names.iter().map(|name| unit_with_namespace(name)).collect())
            .unwrap();
        assert_eq!(ids.len(), names.len());

        let graph = builder.freeze();
        let members: Vec<&str> = graph
            .decl(graph.global_namespace())
            .members()
            .iter()
            .map(|id| &*graph.decl(*id).name)
            .collect();
        assert_eq!(members, names);
    }
}
