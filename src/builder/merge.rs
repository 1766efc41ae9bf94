//! Cross-unit merge
//!
//! Two declarations denote the same entity when they share the parent scope
//! (after merging), the kind, the name and, for function-like declarations,
//! the overload key. The first-seen node survives; later units have their
//! reference ids redirected onto it, and member and base lists are unioned.
//! Anonymous declarations never merge.

use super::GraphBuilder;
use super::unit::{ResolvedUnit, UnitArena};
use crate::decl::{BaseSpec, DeclDetails, Declaration};
use crate::error::{GraphError, GraphResult};
use crate::record::fields;
use crate::registry::NodeRef;
use crate::ty::{Signature, TemplateArg, Type, merge_name};
use crate::types::{CompactString, DeclId, DeclKind, FileId, IdCounter, Location, TypeId, UnitId};
use std::collections::HashSet;
use tracing::info;

/// Identity under which declarations from different units are joined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MergeKey {
    parent: DeclId,
    kind: DeclKind,
    name: CompactString,
    signature: Option<String>,
}

/// What a merge did to the shared forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub unit: UnitId,
    /// Declarations that became new nodes.
    pub added: usize,
    /// Declarations folded into an existing node.
    pub joined: usize,
    pub types: usize,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    New(DeclId),
    Joined(DeclId),
}

impl Target {
    fn id(&self) -> DeclId {
        match self {
            Target::New(id) | Target::Joined(id) => *id,
        }
    }
}

/// Local-to-shared id translation for one unit.
struct Remap {
    decls: Vec<DeclId>,
    type_offset: u32,
    files: Vec<FileId>,
}

impl Remap {
    fn decl(&self, id: DeclId) -> DeclId {
        self.decls[id.index()]
    }

    fn ty(&self, id: TypeId) -> TypeId {
        TypeId(id.value() + self.type_offset)
    }

    fn location(&self, location: Option<Location>) -> Option<Location> {
        location.map(|loc| Location::new(self.files[loc.file.index()], loc.line))
    }

    fn signature(&self, signature: &Signature) -> Signature {
        Signature {
            return_type: self.ty(signature.return_type),
            parameters: signature.parameters.iter().map(|p| self.ty(*p)).collect(),
            has_ellipsis: signature.has_ellipsis,
            is_const: signature.is_const,
            is_volatile: signature.is_volatile,
        }
    }

    fn type_node(&self, ty: &Type) -> Type {
        match ty {
            Type::Fundamental(name) => Type::Fundamental(name.clone()),
            Type::Declared(decl) => Type::Declared(self.decl(*decl)),
            Type::Pointer(inner) => Type::Pointer(self.ty(*inner)),
            Type::Reference(inner) => Type::Reference(self.ty(*inner)),
            Type::Const(inner) => Type::Const(self.ty(*inner)),
            Type::Volatile(inner) => Type::Volatile(self.ty(*inner)),
            Type::Array { element, size } => Type::Array {
                element: self.ty(*element),
                size: size.clone(),
            },
            Type::Function(signature) => Type::Function(self.signature(signature)),
            Type::MemberFunctionPointer { class, signature } => Type::MemberFunctionPointer {
                class: self.decl(*class),
                signature: self.signature(signature),
            },
            Type::MemberPointer { class, pointee } => Type::MemberPointer {
                class: self.decl(*class),
                pointee: self.ty(*pointee),
            },
            Type::Instantiation { template, args } => Type::Instantiation {
                template: self.decl(*template),
                args: args
                    .iter()
                    .map(|arg| match arg {
                        TemplateArg::Type(ty) => TemplateArg::Type(self.ty(*ty)),
                        TemplateArg::Value(value) => TemplateArg::Value(value.clone()),
                    })
                    .collect(),
            },
        }
    }

    /// Kind-specific data with ids translated and member lists emptied;
    /// members are re-linked as the merge walks the unit.
    fn details(&self, details: &DeclDetails) -> DeclDetails {
        let mut details = details.clone();
        match &mut details {
            DeclDetails::Namespace(scope) => scope.members.clear(),
            DeclDetails::Class(class) => {
                class.members.clear();
                class.aliases.clear();
                for base in &mut class.bases {
                    base.class = self.decl(base.class);
                }
                class.instantiates = class.instantiates.map(|ty| self.ty(ty));
            }
            DeclDetails::Enum(data) => data.values.clear(),
            DeclDetails::EnumValue(_) => {}
            DeclDetails::Callable(callable) => {
                callable.return_type = callable.return_type.map(|ty| self.ty(ty));
                for parameter in &mut callable.parameters {
                    parameter.ty = self.ty(parameter.ty);
                }
            }
            DeclDetails::Variable(variable) => variable.ty = self.ty(variable.ty),
            DeclDetails::Typedef(typedef) => typedef.aliased = self.ty(typedef.aliased),
        }
        details
    }
}

impl GraphBuilder {
    /// Fold a resolved unit into the shared forest.
    ///
    /// Units must be merged in the order their ids were handed out by
    /// [`unit_builder`](Self::unit_builder).
    pub fn merge(&mut self, unit: ResolvedUnit) -> GraphResult<MergeSummary> {
        let expected = self.next_unit_id();
        if unit.unit != expected {
            return Err(GraphError::UnitOutOfOrder {
                expected,
                found: unit.unit,
            });
        }

        let ResolvedUnit {
            unit: unit_id,
            arena,
            mut registry,
            files,
            signature_keys,
        } = unit;

        let (order, targets, keys) = self.plan(&arena, &signature_keys, unit_id)?;

        let remap = Remap {
            decls: targets.iter().map(Target::id).collect(),
            type_offset: self.types.len() as u32,
            files: files.iter().map(|path| self.intern_file(path)).collect(),
        };

        self.types.extend(arena.types.iter().map(|ty| remap.type_node(ty)));

        let mut summary = MergeSummary {
            unit: unit_id,
            added: 0,
            joined: 0,
            types: arena.types.len(),
        };

        for local in order {
            let source = &arena.decls[local.index()];
            match targets[local.index()] {
                Target::New(id) => {
                    debug_assert_eq!(id.index(), self.decls.len());
                    let parent = source.parent.map(|parent| remap.decl(parent));
                    self.decls.push(Declaration {
                        id,
                        parent,
                        location: remap.location(source.location),
                        details: remap.details(&source.details),
                        ..source.clone()
                    });
                    if let Some(members) = parent.and_then(|p| self.decls[p.index()].members_mut()) {
                        members.push(id);
                    }
                    if let Some(key) = keys[local.index()].clone() {
                        self.merge_index.entry(key).or_insert(id);
                    }
                    if parent.is_none() {
                        self.global = Some(id);
                    }
                    summary.added += 1;
                }
                Target::Joined(id) => {
                    join_into(&mut self.decls[id.index()], source, &remap);
                    summary.joined += 1;
                }
            }
        }

        registry.rebind_all(|node| match node {
            NodeRef::Decl(decl) => NodeRef::Decl(remap.decl(decl)),
            NodeRef::Type(ty) => NodeRef::Type(remap.ty(ty)),
        })?;
        self.registries.push(registry);

        info!(
            unit = unit_id.value(),
            added = summary.added,
            joined = summary.joined,
            types = summary.types,
            "merged translation unit"
        );
        Ok(summary)
    }

    /// Decide, without touching the forest, where every declaration of the
    /// unit goes. Returns the pre-order walk of the unit, one target and one
    /// optional merge key per local declaration.
    fn plan(
        &self,
        arena: &UnitArena,
        signature_keys: &[Option<String>],
        unit: UnitId,
    ) -> GraphResult<(Vec<DeclId>, Vec<Target>, Vec<Option<MergeKey>>)> {
        let mut order = Vec::with_capacity(arena.decls.len());
        let mut stack = vec![arena.global];
        while let Some(local) = stack.pop() {
            order.push(local);
            stack.extend(arena.decls[local.index()].members().iter().rev());
        }

        let mut next_new = IdCounter::<DeclId>::after(self.decls.len());
        let mut targets: Vec<Option<Target>> = vec![None; arena.decls.len()];
        let mut keys: Vec<Option<MergeKey>> = vec![None; arena.decls.len()];
        let mut claimed = HashSet::new();

        for &local in &order {
            let decl = &arena.decls[local.index()];
            let parent = match decl.parent {
                None => None,
                Some(parent) => match targets[parent.index()] {
                    Some(target) => Some(target.id()),
                    None => continue,
                },
            };

            let target = match parent {
                None => match self.global {
                    Some(global) => Target::Joined(global),
                    None => Target::New(next_new.next_id()),
                },
                Some(parent) => {
                    let key = if self.config.join_declarations && !decl.is_anonymous() {
                        Some(MergeKey {
                            parent,
                            kind: decl.kind,
                            name: key_name(arena, decl)?,
                            signature: signature_keys[local.index()].clone(),
                        })
                    } else {
                        None
                    };
                    // a node already claimed by this unit is a distinct overload
                    let existing = key
                        .as_ref()
                        .and_then(|key| self.merge_index.get(key))
                        .filter(|id| !claimed.contains(*id))
                        .copied();
                    keys[local.index()] = key;
                    match existing {
                        Some(id) => {
                            claimed.insert(id);
                            Target::Joined(id)
                        }
                        None => Target::New(next_new.next_id()),
                    }
                }
            };
            targets[local.index()] = Some(target);
        }

        let targets = targets
            .into_iter()
            .zip(&arena.decls)
            .map(|(target, decl)| {
                target.ok_or_else(|| GraphError::InvalidField {
                    unit,
                    id: decl.external_id.clone(),
                    field: fields::CONTEXT,
                    value: String::new(),
                })
            })
            .collect::<GraphResult<Vec<_>>>()?;

        Ok((order, targets, keys))
    }

    fn intern_file(&mut self, path: &CompactString) -> FileId {
        if let Some(id) = self.file_index.get(path) {
            return *id;
        }
        self.files.push(path.clone());
        let id = IdCounter::<FileId>::after(self.files.len() - 1).next_id();
        self.file_index.insert(path.clone(), id);
        id
    }
}

/// Fold a later sighting of an entity into the surviving node.
/// Specializations are keyed by their canonical spelling so that
/// `vector<Int>` and `vector<int>` land on one node.
fn key_name(arena: &UnitArena, decl: &Declaration) -> GraphResult<CompactString> {
    match &decl.details {
        DeclDetails::Class(class) if class.instantiates.is_some() => {
            Ok(merge_name(arena, decl.id)?.into())
        }
        _ => Ok(decl.name.clone()),
    }
}

fn join_into(existing: &mut Declaration, source: &Declaration, remap: &Remap) {
    if existing.location.is_none() {
        existing.location = remap.location(source.location);
    }

    let (DeclDetails::Class(kept), DeclDetails::Class(seen)) = (&mut existing.details, &source.details)
    else {
        return;
    };

    for base in &seen.bases {
        let base = BaseSpec {
            class: remap.decl(base.class),
            ..*base
        };
        if !kept.bases.iter().any(|b| b.class == base.class) {
            kept.bases.push(base);
        }
    }

    // a forward declaration takes over the definition it meets
    if !kept.is_complete && seen.is_complete {
        kept.key = seen.key;
        kept.is_complete = true;
        kept.is_abstract = seen.is_abstract;
        kept.size = seen.size;
        kept.instantiates = seen.instantiates.map(|ty| remap.ty(ty));
        existing.location = remap.location(source.location).or(existing.location);
    }
}
