//! Node Registry
//!
//! Maps the opaque reference ids of one translation unit to the arena ids of
//! the nodes built for them. Bindings are write-once while a unit is being
//! allocated; merging may redirect them onto nodes of the shared graph, and
//! freezing makes the registry read-only for good.

use crate::error::{GraphError, GraphResult};
use crate::types::{DeclId, ExternalId, TypeId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle of a node bound in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Decl(DeclId),
    Type(TypeId),
}

impl NodeRef {
    pub fn as_decl(&self) -> Option<DeclId> {
        match self {
            NodeRef::Decl(id) => Some(*id),
            NodeRef::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<TypeId> {
        match self {
            NodeRef::Type(id) => Some(*id),
            NodeRef::Decl(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistry {
    unit: UnitId,
    bindings: HashMap<ExternalId, NodeRef>,
    frozen: bool,
}

impl NodeRegistry {
    pub fn new(unit: UnitId) -> Self {
        Self {
            unit,
            bindings: HashMap::new(),
            frozen: false,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Bind `id` to `node`.
    ///
    /// Fails with [`GraphError::DuplicateId`] when `id` is already bound in
    /// this unit and with [`GraphError::RegistryFrozen`] after [`freeze`](Self::freeze).
    pub fn register(&mut self, id: ExternalId, node: NodeRef) -> GraphResult<()> {
        if self.frozen {
            return Err(GraphError::RegistryFrozen { unit: self.unit });
        }
        if self.bindings.contains_key(&id) {
            return Err(GraphError::DuplicateId {
                unit: self.unit,
                id,
            });
        }
        self.bindings.insert(id, node);
        Ok(())
    }

    pub fn get(&self, id: &ExternalId) -> Option<NodeRef> {
        self.bindings.get(id).copied()
    }

    pub fn contains(&self, id: &ExternalId) -> bool {
        self.bindings.contains_key(id)
    }

    /// Look up `id`, failing with [`GraphError::UnresolvedReference`] if it
    /// was never bound.
    pub fn resolve(&self, id: &ExternalId) -> GraphResult<NodeRef> {
        self.resolve_from(id, id)
    }

    /// Like [`resolve`](Self::resolve), naming the record that holds the reference.
    pub fn resolve_from(&self, id: &ExternalId, referenced_by: &ExternalId) -> GraphResult<NodeRef> {
        self.get(id).ok_or_else(|| GraphError::UnresolvedReference {
            unit: self.unit,
            id: id.clone(),
            referenced_by: referenced_by.clone(),
        })
    }

    pub fn resolve_decl(&self, id: &ExternalId, referenced_by: &ExternalId) -> GraphResult<DeclId> {
        self.resolve_from(id, referenced_by)?
            .as_decl()
            .ok_or_else(|| GraphError::UnexpectedNodeKind {
                unit: self.unit,
                id: id.clone(),
                expected: "declaration",
            })
    }

    pub fn resolve_type(&self, id: &ExternalId, referenced_by: &ExternalId) -> GraphResult<TypeId> {
        self.resolve_from(id, referenced_by)?
            .as_type()
            .ok_or_else(|| GraphError::UnexpectedNodeKind {
                unit: self.unit,
                id: id.clone(),
                expected: "type",
            })
    }

    /// Redirect every binding through `remap`. Merging uses this to move a
    /// unit's bindings from its local arena onto the shared graph.
    pub(crate) fn rebind_all(&mut self, mut remap: impl FnMut(NodeRef) -> NodeRef) -> GraphResult<()> {
        if self.frozen {
            return Err(GraphError::RegistryFrozen { unit: self.unit });
        }
        for node in self.bindings.values_mut() {
            *node = remap(*node);
        }
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExternalId, NodeRef)> + '_ {
        self.bindings.iter().map(|(id, node)| (id, *node))
    }
}
