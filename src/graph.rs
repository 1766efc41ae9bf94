//! Frozen declaration graph
//!
//! [`DeclGraph`] is what [`GraphBuilder::freeze`] produces: the merged
//! forest plus the indexes queries need (pre-order positions and subtree
//! intervals, a by-name index, memoized qualified names). Nothing mutates a
//! frozen graph, so it can be shared freely across threads.

use crate::builder::{BuildStage, GraphBuilder, MergeKey};
use crate::config::BuilderConfig;
use crate::decl::{DeclDetails, Declaration};
use crate::error::{GraphError, GraphResult};
use crate::registry::{NodeRef, NodeRegistry};
use crate::ty::{self, NodeStore, Type};
use crate::types::{CompactString, DeclId, DeclKind, ExternalId, FileId, TypeId, UnitId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct DeclGraph {
    decls: Vec<Declaration>,
    types: Vec<Type>,
    files: Vec<CompactString>,
    file_index: HashMap<CompactString, FileId>,
    registries: Vec<NodeRegistry>,
    merge_index: HashMap<MergeKey, DeclId>,
    config: BuilderConfig,
    global: DeclId,

    /// Declarations in pre-order from the global namespace.
    preorder: Vec<DeclId>,
    /// Per declaration: `preorder[start..end]` is its subtree.
    intervals: Vec<(usize, usize)>,
    by_name: HashMap<CompactString, Vec<DeclId>>,
    qualified_names: DashMap<DeclId, Arc<str>>,
}

impl DeclGraph {
    pub(crate) fn from_builder(builder: GraphBuilder) -> Self {
        let GraphBuilder {
            config,
            mut decls,
            types,
            files,
            file_index,
            mut registries,
            merge_index,
            global,
        } = builder;

        let global = match global {
            Some(global) => global,
            None => {
                // no unit was merged: the graph is a lone global namespace
                let id = DeclId(1);
                decls.push(Declaration {
                    id,
                    kind: DeclKind::Namespace,
                    name: "::".into(),
                    unit: UnitId(1),
                    external_id: ExternalId::new("::"),
                    parent: None,
                    access: None,
                    location: None,
                    anonymous: None,
                    details: DeclDetails::Namespace(Default::default()),
                });
                id
            }
        };

        for registry in &mut registries {
            registry.freeze();
        }

        let (preorder, intervals) = preorder(&decls, global);
        let mut by_name: HashMap<CompactString, Vec<DeclId>> = HashMap::new();
        for id in &preorder {
            by_name
                .entry(decls[id.index()].name.clone())
                .or_default()
                .push(*id);
        }

        let mut graph = Self {
            decls,
            types,
            files,
            file_index,
            registries,
            merge_index,
            config,
            global,
            preorder,
            intervals,
            by_name,
            qualified_names: DashMap::new(),
        };

        if graph.config.bind_aliases {
            graph.bind_aliases();
        }

        debug!(
            decls = graph.decls.len(),
            types = graph.types.len(),
            units = graph.registries.len(),
            "graph frozen"
        );
        graph
    }

    /// Record on every class the typedefs that name it.
    fn bind_aliases(&mut self) {
        let mut bindings = Vec::new();
        for &id in &self.preorder {
            let Some(typedef) = self.decls[id.index()].as_typedef() else {
                continue;
            };
            let Ok(target) = ty::strip_aliases(&*self, typedef.aliased) else {
                continue;
            };
            if let Type::Declared(class) = self.ty(target) {
                if self.decls[class.index()].as_class().is_some() {
                    bindings.push((*class, id));
                }
            }
        }

        for (class, typedef) in bindings {
            if let DeclDetails::Class(data) = &mut self.decls[class.index()].details {
                data.aliases.push(typedef);
            }
        }
    }

    /// Reopen the graph to merge more units.
    pub fn into_builder(self) -> GraphBuilder {
        let mut decls = self.decls;
        for decl in &mut decls {
            if let DeclDetails::Class(data) = &mut decl.details {
                data.aliases.clear();
            }
        }

        GraphBuilder {
            config: self.config,
            decls,
            types: self.types,
            files: self.files,
            file_index: self.file_index,
            registries: self.registries,
            merge_index: self.merge_index,
            global: Some(self.global),
        }
    }

    pub fn stage(&self) -> BuildStage {
        BuildStage::Frozen
    }

    pub fn global_namespace(&self) -> DeclId {
        self.global
    }

    /// # Panics
    /// Panics if `id` does not belong to this graph; see [`get`](Self::get).
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        id.value()
            .checked_sub(1)
            .and_then(|index| self.decls.get(index as usize))
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn decls(&self) -> impl Iterator<Item = &Declaration> + '_ {
        self.decls.iter()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn unit_count(&self) -> usize {
        self.registries.len()
    }

    pub fn registry(&self, unit: UnitId) -> Option<&NodeRegistry> {
        self.registries.get(unit.index())
    }

    /// Node bound to `id` in `unit`'s registry.
    pub fn resolve(&self, unit: UnitId, id: &ExternalId) -> GraphResult<NodeRef> {
        match self.registry(unit) {
            Some(registry) => registry.resolve(id),
            None => Err(GraphError::UnresolvedReference {
                unit,
                id: id.clone(),
                referenced_by: id.clone(),
            }),
        }
    }

    pub fn resolve_decl(&self, unit: UnitId, id: &ExternalId) -> Option<&Declaration> {
        self.resolve(unit, id)
            .ok()
            .and_then(|node| node.as_decl())
            .map(|decl| self.decl(decl))
    }

    /// Qualified name, computed once per declaration.
    pub fn qualified_name(&self, id: DeclId) -> Arc<str> {
        if let Some(name) = self.qualified_names.get(&id) {
            return name.clone();
        }
        let name: Arc<str> = match ty::qualified_name(self, id) {
            Ok(name) => name.into(),
            Err(_) => Arc::from(&*self.decl(id).name),
        };
        self.qualified_names.insert(id, name.clone());
        name
    }

    /// Last qualified-name segment: the name, with specializations spelled
    /// from their canonical arguments.
    pub fn display_name(&self, id: DeclId) -> String {
        ty::decl_name(self, id).unwrap_or_else(|_| self.decl(id).name.to_string())
    }

    pub fn find_by_name(&self, name: &str) -> &[DeclId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declarations in pre-order, starting with the global namespace.
    pub fn preorder(&self) -> &[DeclId] {
        &self.preorder
    }

    pub fn preorder_position(&self, id: DeclId) -> usize {
        self.intervals[id.index()].0
    }

    /// `root` followed by everything declared inside it, in pre-order.
    pub fn subtree(&self, root: DeclId) -> &[DeclId] {
        let (start, end) = self.intervals[root.index()];
        &self.preorder[start..end]
    }

    /// True if `descendant` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: DeclId, descendant: DeclId) -> bool {
        let (start, end) = self.intervals[ancestor.index()];
        let position = self.intervals[descendant.index()].0;
        start <= position && position < end
    }

    pub fn file_path(&self, file: FileId) -> Option<&str> {
        self.files.get(file.index()).map(|path| &**path)
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.file_index.get(path).copied()
    }

    /// Decl string of `ty` as written, typedef names kept.
    pub fn render_type(&self, id: TypeId) -> GraphResult<String> {
        ty::render_type(self, id, false)
    }

    /// Canonical decl string of `ty`: typedefs expanded, qualifiers normalized.
    pub fn decl_string(&self, id: TypeId) -> GraphResult<String> {
        ty::render_type(self, id, true)
    }

    pub fn types_equal(&self, left: TypeId, right: TypeId) -> GraphResult<bool> {
        ty::structural_equals(self, left, right)
    }
}

impl NodeStore for DeclGraph {
    fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    fn global_namespace(&self) -> DeclId {
        self.global
    }
}

fn preorder(decls: &[Declaration], root: DeclId) -> (Vec<DeclId>, Vec<(usize, usize)>) {
    let mut order = Vec::with_capacity(decls.len());
    let mut intervals = vec![(0, 0); decls.len()];
    let mut stack = vec![(root, false)];

    while let Some((id, exit)) = stack.pop() {
        if exit {
            intervals[id.index()].1 = order.len();
            continue;
        }
        intervals[id.index()].0 = order.len();
        order.push(id);
        stack.push((id, true));
        stack.extend(decls[id.index()].members().iter().rev().map(|member| (*member, false)));
    }

    (order, intervals)
}
