//! Per-unit staged building
//!
//! A translation unit moves through [`UnitBuilder`] (records accepted),
//! [`AllocatedUnit`] (one bare node per record, every id registered) and
//! [`ResolvedUnit`] (all fields filled in and validated). Each stage consumes
//! the previous one, so a unit can only be resolved after it was allocated.
//! Nothing here touches shared state: units build independently and only meet
//! in [`GraphBuilder::merge`](super::GraphBuilder::merge).

use super::BuildStage;
use crate::config::BuilderConfig;
use crate::decl::{
    BaseSpec, CallableData, CallableFlags, ClassData, ClassKey, DeclDetails, Declaration,
    EnumData, EnumValueData, Parameter, ScopeData, TypedefData, VariableData, VariableFlags,
};
use crate::error::{GraphError, GraphResult};
use crate::record::{Attributes, ChildKind, Record, RecordKind, RecordStream, fields};
use crate::registry::{NodeRef, NodeRegistry};
use crate::ty::{ArraySize, NodeStore, Signature, TemplateArg, Type, signature_key};
use crate::types::{
    Access, CompactString, DeclId, DeclKind, ExternalId, FileId, IdCounter, Location, TypeId,
    UnitId,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Declaration and type nodes of a single unit, indexed by local ids.
#[derive(Debug, Clone)]
pub(crate) struct UnitArena {
    pub(crate) decls: Vec<Declaration>,
    pub(crate) types: Vec<Type>,
    pub(crate) global: DeclId,
}

impl NodeStore for UnitArena {
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

/// A unit whose records were accepted but not yet looked at.
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    unit: UnitId,
    records: Vec<Record>,
    config: BuilderConfig,
}

impl UnitBuilder {
    pub fn new(unit: UnitId, records: RecordStream, config: BuilderConfig) -> Self {
        Self {
            unit,
            records: records.into_iter().collect(),
            config,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn stage(&self) -> BuildStage {
        BuildStage::Created
    }

    /// Run both passes.
    pub fn build(self) -> GraphResult<ResolvedUnit> {
        self.allocate()?.resolve()
    }

    /// First pass: give every record a node id and bind its external id.
    pub fn allocate(self) -> GraphResult<AllocatedUnit> {
        let mut allocator = Allocator {
            unit: self.unit,
            registry: NodeRegistry::new(self.unit),
            decl_ids: IdCounter::new(),
            type_ids: IdCounter::new(),
            decl_slots: Vec::new(),
            type_slots: Vec::new(),
            declared_types: HashMap::new(),
            record_index: HashMap::with_capacity(self.records.len()),
            files: Vec::new(),
            file_ids: HashMap::new(),
            global: None,
            explicit_global: self.records.iter().any(names_global_namespace),
        };

        for (index, record) in self.records.iter().enumerate() {
            allocator.allocate(index, record)?;
        }

        let Allocator {
            registry,
            decl_slots,
            type_slots,
            declared_types,
            record_index,
            files,
            file_ids,
            global,
            ..
        } = allocator;

        let global = global.ok_or(GraphError::MissingGlobalNamespace { unit: self.unit })?;

        debug!(
            unit = self.unit.value(),
            records = self.records.len(),
            decls = decl_slots.len(),
            types = type_slots.len(),
            "nodes allocated"
        );

        Ok(AllocatedUnit {
            unit: self.unit,
            records: self.records,
            config: self.config,
            registry,
            decl_slots,
            type_slots,
            declared_types,
            record_index,
            files,
            file_ids,
            global,
        })
    }
}

/// Where a bare declaration node comes from.
#[derive(Debug, Clone, Copy)]
enum DeclSource {
    Record(usize),
    /// Enumerator `child` of the enumeration record `record`.
    EnumValue { record: usize, child: usize },
}

#[derive(Debug, Clone)]
struct DeclSlot {
    source: DeclSource,
    kind: DeclKind,
    external_id: ExternalId,
    /// Class key for class and union slots.
    class_key: Option<ClassKey>,
}

#[derive(Debug, Clone, Copy)]
enum TypeSource {
    Record(usize),
    /// `const volatile T` record: the bound outer `Const` node wraps `inner`.
    ConstVolatile { record: usize, inner: TypeId },
    /// The unbound `volatile T` half of a `const volatile T` record.
    VolatileHalf(usize),
    /// Type naming a class, union, enum or typedef declaration.
    Declared(DeclId),
}

struct Allocator {
    unit: UnitId,
    registry: NodeRegistry,
    decl_ids: IdCounter<DeclId>,
    type_ids: IdCounter<TypeId>,
    decl_slots: Vec<DeclSlot>,
    type_slots: Vec<TypeSource>,
    declared_types: HashMap<DeclId, TypeId>,
    record_index: HashMap<ExternalId, usize>,
    files: Vec<CompactString>,
    file_ids: HashMap<ExternalId, FileId>,
    global: Option<DeclId>,
    /// The unit spells its root as `::`; context-less namespaces are then
    /// ordinary orphans.
    explicit_global: bool,
}

impl Allocator {
    fn allocate(&mut self, index: usize, record: &Record) -> GraphResult<()> {
        if self.record_index.contains_key(&record.id) {
            return Err(GraphError::DuplicateId {
                unit: self.unit,
                id: record.id.clone(),
            });
        }
        self.record_index.insert(record.id.clone(), index);

        if record.kind == RecordKind::File {
            let name = record.literal(fields::NAME).ok_or(GraphError::MissingField {
                unit: self.unit,
                id: record.id.clone(),
                field: fields::NAME,
            })?;
            self.files.push(name.into());
            let file = IdCounter::<FileId>::after(self.files.len() - 1).next_id();
            self.file_ids.insert(record.id.clone(), file);
            return Ok(());
        }

        if let Some(kind) = record.kind.decl_kind() {
            let id = self.push_decl(DeclSource::Record(index), kind, record.id.clone(), class_key(record.kind))?;

            if self.claims_global(record) {
                if let Some(first) = self.global {
                    return Err(GraphError::MultipleGlobalNamespaces {
                        unit: self.unit,
                        first: self.decl_slots[first.index()].external_id.clone(),
                        second: record.id.clone(),
                    });
                }
                self.global = Some(id);
            }

            if kind.is_type_declaration() {
                let ty = self.push_type(TypeSource::Declared(id));
                self.declared_types.insert(id, ty);
            }

            if kind == DeclKind::Enum {
                let enumerators = record
                    .children
                    .iter()
                    .enumerate()
                    .filter(|(_, child)| child.kind == ChildKind::EnumValue)
                    .map(|(child, _)| child);
                for (position, child) in enumerators.enumerate() {
                    let external_id = ExternalId::new(format!("{}#{position}", record.id));
                    self.push_decl(
                        DeclSource::EnumValue { record: index, child },
                        DeclKind::EnumValue,
                        external_id,
                        None,
                    )?;
                }
            }
            return Ok(());
        }

        if record.kind.is_type() {
            if record.kind == RecordKind::CvQualifiedType
                && record.flag(fields::CONST)
                && record.flag(fields::VOLATILE)
            {
                // outer node first so it keeps the lower id
                let outer = self.type_ids.next_id();
                let inner = self.type_ids.next_id();
                self.type_slots.push(TypeSource::ConstVolatile { record: index, inner });
                self.type_slots.push(TypeSource::VolatileHalf(index));
                self.registry.register(record.id.clone(), NodeRef::Type(outer))?;
            } else {
                let ty = self.push_type(TypeSource::Record(index));
                self.registry.register(record.id.clone(), NodeRef::Type(ty))?;
            }
        }
        Ok(())
    }

    fn claims_global(&self, record: &Record) -> bool {
        if record.kind != RecordKind::Namespace {
            return false;
        }
        if self.explicit_global {
            names_global_namespace(record)
        } else {
            record.reference(fields::CONTEXT).is_none() && self.global.is_none()
        }
    }

    fn push_decl(
        &mut self,
        source: DeclSource,
        kind: DeclKind,
        external_id: ExternalId,
        class_key: Option<ClassKey>,
    ) -> GraphResult<DeclId> {
        let id = self.decl_ids.next_id();
        self.registry.register(external_id.clone(), NodeRef::Decl(id))?;
        self.decl_slots.push(DeclSlot {
            source,
            kind,
            external_id,
            class_key,
        });
        Ok(id)
    }

    fn push_type(&mut self, source: TypeSource) -> TypeId {
        let id = self.type_ids.next_id();
        self.type_slots.push(source);
        id
    }
}

fn class_key(kind: RecordKind) -> Option<ClassKey> {
    match kind {
        RecordKind::Class => Some(ClassKey::Class),
        RecordKind::Struct => Some(ClassKey::Struct),
        RecordKind::Union => Some(ClassKey::Union),
        _ => None,
    }
}

fn names_global_namespace(record: &Record) -> bool {
    record.kind == RecordKind::Namespace && record.literal(fields::NAME) == Some("::")
}

/// A unit whose nodes exist but whose fields are still empty.
#[derive(Debug)]
pub struct AllocatedUnit {
    unit: UnitId,
    records: Vec<Record>,
    config: BuilderConfig,
    registry: NodeRegistry,
    decl_slots: Vec<DeclSlot>,
    type_slots: Vec<TypeSource>,
    declared_types: HashMap<DeclId, TypeId>,
    record_index: HashMap<ExternalId, usize>,
    files: Vec<CompactString>,
    file_ids: HashMap<ExternalId, FileId>,
    global: DeclId,
}

impl AllocatedUnit {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn stage(&self) -> BuildStage {
        BuildStage::NodesAllocated
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Second pass: resolve every reference and validate the result.
    pub fn resolve(self) -> GraphResult<ResolvedUnit> {
        self.check_references()?;

        let mut types = Vec::with_capacity(self.type_slots.len());
        for source in &self.type_slots {
            types.push(self.build_type(*source)?);
        }

        let mut decls = Vec::with_capacity(self.decl_slots.len());
        for (index, slot) in self.decl_slots.iter().enumerate() {
            let id = IdCounter::<DeclId>::after(index).next_id();
            decls.push(self.build_decl(id, slot)?);
        }

        let mut arena = UnitArena {
            decls,
            types,
            global: self.global,
        };
        self.link_members(&mut arena)?;
        self.check_reachable(&arena)?;
        self.check_acyclic(&arena)?;

        let mut signature_keys = Vec::with_capacity(arena.decls.len());
        for index in 0..arena.decls.len() {
            let id = IdCounter::<DeclId>::after(index).next_id();
            signature_keys.push(signature_key(&arena, id)?);
        }

        debug!(
            unit = self.unit.value(),
            decls = arena.decls.len(),
            types = arena.types.len(),
            files = self.files.len(),
            "fields resolved"
        );

        Ok(ResolvedUnit {
            unit: self.unit,
            arena,
            registry: self.registry,
            files: self.files,
            signature_keys,
        })
    }

    /// Every id a record mentions must name a record of this unit, including
    /// attributes that no later step reads.
    fn check_references(&self) -> GraphResult<()> {
        for record in &self.records {
            for id in record.references() {
                if !self.record_index.contains_key(id) && self.registry.get(id).is_none() {
                    return Err(GraphError::UnresolvedReference {
                        unit: self.unit,
                        id: id.clone(),
                        referenced_by: record.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn build_type(&self, source: TypeSource) -> GraphResult<Type> {
        let record = match source {
            TypeSource::Declared(decl) => return Ok(Type::Declared(decl)),
            TypeSource::VolatileHalf(index) => {
                let record = &self.records[index];
                let inner = self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?;
                return Ok(Type::Volatile(inner));
            }
            TypeSource::ConstVolatile { inner, .. } => return Ok(Type::Const(inner)),
            TypeSource::Record(index) => &self.records[index],
        };

        let ty = match record.kind {
            RecordKind::FundamentalType => {
                Type::Fundamental(self.required_literal(record, fields::NAME)?.into())
            }
            RecordKind::PointerType => {
                let target = self.required_ref(record, fields::TYPE)?;
                match self.record(target) {
                    // pointer to member function is spelled as a pointer to a method type
                    Some(method) if method.kind == RecordKind::MethodType => {
                        self.member_function_pointer(method)?
                    }
                    _ => Type::Pointer(self.type_ref(target, &record.id)?),
                }
            }
            RecordKind::ReferenceType => {
                Type::Reference(self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?)
            }
            RecordKind::ArrayType => Type::Array {
                element: self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?,
                size: array_size(record.literal(fields::SIZE)),
            },
            RecordKind::CvQualifiedType => {
                let inner = self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?;
                match (record.flag(fields::CONST), record.flag(fields::VOLATILE)) {
                    (true, _) => Type::Const(inner),
                    (false, true) => Type::Volatile(inner),
                    (false, false) => {
                        return Err(GraphError::MissingField {
                            unit: self.unit,
                            id: record.id.clone(),
                            field: fields::CONST,
                        });
                    }
                }
            }
            RecordKind::FunctionType => Type::Function(self.signature(record)?),
            RecordKind::MethodType => self.member_function_pointer(record)?,
            RecordKind::OffsetType => Type::MemberPointer {
                class: self.class_ref(self.required_ref(record, fields::BASETYPE)?, &record.id)?,
                pointee: self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?,
            },
            RecordKind::TemplateInstantiation => {
                let template = self
                    .registry
                    .resolve_decl(self.required_ref(record, fields::TEMPLATE)?, &record.id)?;
                let mut args = Vec::new();
                for child in record.children_of(ChildKind::TemplateArgument) {
                    let arg = if let Some(ty) = child.reference(fields::TYPE) {
                        TemplateArg::Type(self.type_ref(ty, &record.id)?)
                    } else if let Some(value) = child.literal(fields::VALUE) {
                        TemplateArg::Value(value.into())
                    } else {
                        return Err(self.missing(record, fields::TYPE));
                    };
                    args.push(arg);
                }
                Type::Instantiation { template, args }
            }
            _ => {
                return Err(GraphError::UnexpectedNodeKind {
                    unit: self.unit,
                    id: record.id.clone(),
                    expected: "type",
                });
            }
        };
        Ok(ty)
    }

    fn member_function_pointer(&self, method: &Record) -> GraphResult<Type> {
        Ok(Type::MemberFunctionPointer {
            class: self.class_ref(self.required_ref(method, fields::BASETYPE)?, &method.id)?,
            signature: self.signature(method)?,
        })
    }

    fn signature(&self, record: &Record) -> GraphResult<Signature> {
        let return_type = self.type_ref(self.required_ref(record, fields::RETURNS)?, &record.id)?;
        let mut parameters = Vec::new();
        for argument in record.children_of(ChildKind::Argument) {
            let ty = argument
                .reference(fields::TYPE)
                .ok_or_else(|| self.missing(record, fields::TYPE))?;
            parameters.push(self.type_ref(ty, &record.id)?);
        }

        Ok(Signature {
            return_type,
            parameters,
            has_ellipsis: record.children_of(ChildKind::Ellipsis).next().is_some(),
            is_const: record.flag(fields::CONST),
            is_volatile: record.flag(fields::VOLATILE),
        })
    }

    fn build_decl(&self, id: DeclId, slot: &DeclSlot) -> GraphResult<Declaration> {
        let (record, child) = match slot.source {
            DeclSource::Record(index) => (&self.records[index], None),
            DeclSource::EnumValue { record, child } => {
                (&self.records[record], Some(&self.records[record].children[child]))
            }
        };

        if let Some(enumerator) = child {
            let name = enumerator
                .literal(fields::NAME)
                .ok_or_else(|| self.missing(record, fields::NAME))?;
            let value = enumerator
                .literal(fields::INIT)
                .or_else(|| enumerator.literal(fields::VALUE))
                .unwrap_or_default();
            return Ok(Declaration {
                id,
                kind: DeclKind::EnumValue,
                name: name.into(),
                unit: self.unit,
                external_id: slot.external_id.clone(),
                parent: Some(self.registry.resolve_decl(&record.id, &slot.external_id)?),
                access: None,
                location: None,
                anonymous: None,
                details: DeclDetails::EnumValue(EnumValueData {
                    value: value.into(),
                }),
            });
        }

        let is_global = id == self.global;
        let name = if is_global {
            "::"
        } else {
            record.literal(fields::NAME).unwrap_or_default()
        };
        let anonymous: Option<CompactString> = (!is_global && name.is_empty() && slot.kind.is_scope()).then(|| {
            format!(
                "{}{}_{}",
                self.config.anonymous_prefix,
                self.unit.value(),
                record.id
            )
            .into()
        });

        let parent = if is_global { None } else { Some(self.scope_of(record)?) };
        let access = match parent.and_then(|parent| self.decl_slots[parent.index()].class_key) {
            Some(key) => Some(self.access(record, key)?),
            None => None,
        };

        Ok(Declaration {
            id,
            kind: slot.kind,
            name: name.into(),
            unit: self.unit,
            external_id: slot.external_id.clone(),
            parent,
            access,
            location: self.location(record)?,
            anonymous,
            details: self.details(record, slot)?,
        })
    }

    fn details(&self, record: &Record, slot: &DeclSlot) -> GraphResult<DeclDetails> {
        let details = match slot.kind {
            DeclKind::Namespace => DeclDetails::Namespace(ScopeData::default()),
            DeclKind::Class | DeclKind::Union => {
                let key = slot.class_key.unwrap_or(ClassKey::Class);
                let mut class = ClassData::new(key);
                class.is_complete = !record.flag(fields::INCOMPLETE);
                class.is_abstract = record.flag(fields::ABSTRACT);
                class.size = self.parse_literal(record, fields::SIZE)?;
                class.instantiates = record
                    .reference(fields::INSTANTIATES)
                    .map(|ty| self.type_ref(ty, &record.id))
                    .transpose()?;
                for base in record.children_of(ChildKind::Base) {
                    let base_class = base
                        .reference(fields::TYPE)
                        .ok_or_else(|| self.missing(record, fields::TYPE))?;
                    let access = match base.literal(fields::ACCESS) {
                        Some(value) => self.parse_access(record, value)?,
                        None => key.default_access(),
                    };
                    class.bases.push(BaseSpec {
                        class: self.class_ref(base_class, &record.id)?,
                        access,
                        is_virtual: base.flag(fields::VIRTUAL),
                    });
                }
                DeclDetails::Class(class)
            }
            DeclKind::Enum => DeclDetails::Enum(EnumData::default()),
            DeclKind::Variable => {
                let mut flags = VariableFlags::empty();
                flags.set(VariableFlags::STATIC, record.flag(fields::STATIC));
                flags.set(VariableFlags::EXTERN, record.flag(fields::EXTERN));
                flags.set(VariableFlags::MUTABLE, record.flag(fields::MUTABLE));
                flags.set(VariableFlags::MEMBER, record.kind == RecordKind::Field);
                DeclDetails::Variable(VariableData {
                    ty: self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?,
                    flags,
                    bits: self.parse_literal(record, fields::BITS)?,
                    init: record.literal(fields::INIT).map(Into::into),
                })
            }
            DeclKind::Typedef => DeclDetails::Typedef(TypedefData {
                aliased: self.type_ref(self.required_ref(record, fields::TYPE)?, &record.id)?,
            }),
            DeclKind::EnumValue => DeclDetails::EnumValue(EnumValueData::default()),
            DeclKind::Function
            | DeclKind::MemberFunction
            | DeclKind::Constructor
            | DeclKind::Destructor
            | DeclKind::Operator => DeclDetails::Callable(self.callable(record)?),
        };
        Ok(details)
    }

    fn callable(&self, record: &Record) -> GraphResult<CallableData> {
        let mut parameters = Vec::new();
        for argument in record.children_of(ChildKind::Argument) {
            let ty = argument
                .reference(fields::TYPE)
                .ok_or_else(|| self.missing(record, fields::TYPE))?;
            parameters.push(Parameter {
                name: argument.literal(fields::NAME).unwrap_or_default().into(),
                ty: self.type_ref(ty, &record.id)?,
                default_value: argument.literal(fields::DEFAULT).map(Into::into),
            });
        }

        let mut flags = CallableFlags::empty();
        for (field, flag) in [
            (fields::VIRTUAL, CallableFlags::VIRTUAL),
            (fields::PURE_VIRTUAL, CallableFlags::PURE_VIRTUAL),
            (fields::STATIC, CallableFlags::STATIC),
            (fields::CONST, CallableFlags::CONST),
            (fields::VOLATILE, CallableFlags::VOLATILE),
            (fields::INLINE, CallableFlags::INLINE),
            (fields::EXPLICIT, CallableFlags::EXPLICIT),
            (fields::EXTERN, CallableFlags::EXTERN),
            (fields::ARTIFICIAL, CallableFlags::ARTIFICIAL),
            (fields::NOEXCEPT, CallableFlags::NOEXCEPT),
        ] {
            flags.set(flag, record.flag(field));
        }
        flags.set(
            CallableFlags::ELLIPSIS,
            record.children_of(ChildKind::Ellipsis).next().is_some(),
        );
        flags.set(CallableFlags::MEMBER, record.kind.is_member_only());

        Ok(CallableData {
            return_type: record
                .reference(fields::RETURNS)
                .map(|ty| self.type_ref(ty, &record.id))
                .transpose()?,
            parameters,
            flags,
        })
    }

    /// Owning scope of `record`. Declarations local to a function body are
    /// moved up to the function's own scope.
    fn scope_of(&self, record: &Record) -> GraphResult<DeclId> {
        let mut current = record;
        for _ in 0..=self.decl_slots.len() {
            let Some(context) = current.reference(fields::CONTEXT) else {
                if !self.config.lenient_context {
                    return Err(self.missing(current, fields::CONTEXT));
                }
                warn!(
                    unit = self.unit.value(),
                    id = %current.id,
                    "declaration has no context, attaching it to the global namespace"
                );
                return Ok(self.global);
            };

            let scope = self.registry.resolve_decl(context, &current.id)?;
            let slot = &self.decl_slots[scope.index()];
            if slot.kind.is_scope() {
                return Ok(scope);
            }
            if !slot.kind.is_callable() {
                return Err(GraphError::UnexpectedNodeKind {
                    unit: self.unit,
                    id: context.clone(),
                    expected: "scope",
                });
            }

            debug!(id = %record.id, function = %context, "re-homing function-local declaration");
            current = match slot.source {
                DeclSource::Record(index) => &self.records[index],
                DeclSource::EnumValue { record, .. } => &self.records[record],
            };
        }

        Err(self.invalid(record, fields::CONTEXT, record.id.as_str()))
    }

    fn access(&self, record: &Record, key: ClassKey) -> GraphResult<Access> {
        match record.literal(fields::ACCESS) {
            Some(value) => self.parse_access(record, value),
            None => Ok(key.default_access()),
        }
    }

    fn parse_access(&self, record: &Record, value: &str) -> GraphResult<Access> {
        value
            .parse()
            .map_err(|_| self.invalid(record, fields::ACCESS, value))
    }

    fn location(&self, record: &Record) -> GraphResult<Option<Location>> {
        let Some(file) = record.reference(fields::FILE) else {
            return Ok(None);
        };
        let file = *self
            .file_ids
            .get(file)
            .ok_or_else(|| GraphError::UnresolvedReference {
                unit: self.unit,
                id: file.clone(),
                referenced_by: record.id.clone(),
            })?;
        let line = self.parse_literal(record, fields::LINE)?.unwrap_or(0);
        Ok(Some(Location::new(file, line)))
    }

    fn parse_literal<T: std::str::FromStr>(
        &self,
        record: &Record,
        field: &'static str,
    ) -> GraphResult<Option<T>> {
        match record.literal(field) {
            None | Some("") => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(record, field, value)),
        }
    }

    /// Resolve a reference used in type position. References to class,
    /// enum and typedef records stand for the type they declare.
    fn type_ref(&self, id: &ExternalId, referenced_by: &ExternalId) -> GraphResult<TypeId> {
        match self.registry.resolve_from(id, referenced_by)? {
            NodeRef::Type(ty) => Ok(ty),
            NodeRef::Decl(decl) => {
                self.declared_types
                    .get(&decl)
                    .copied()
                    .ok_or_else(|| GraphError::UnexpectedNodeKind {
                        unit: self.unit,
                        id: id.clone(),
                        expected: "type",
                    })
            }
        }
    }

    fn class_ref(&self, id: &ExternalId, referenced_by: &ExternalId) -> GraphResult<DeclId> {
        let decl = self.registry.resolve_decl(id, referenced_by)?;
        match self.decl_slots[decl.index()].kind {
            DeclKind::Class | DeclKind::Union => Ok(decl),
            _ => Err(GraphError::UnexpectedNodeKind {
                unit: self.unit,
                id: id.clone(),
                expected: "class",
            }),
        }
    }

    fn record(&self, id: &ExternalId) -> Option<&Record> {
        self.record_index.get(id).map(|index| &self.records[*index])
    }

    fn required_ref<'r>(&self, record: &'r Record, field: &'static str) -> GraphResult<&'r ExternalId> {
        record
            .reference(field)
            .ok_or_else(|| self.missing(record, field))
    }

    fn required_literal<'r>(&self, record: &'r Record, field: &'static str) -> GraphResult<&'r str> {
        record
            .literal(field)
            .ok_or_else(|| self.missing(record, field))
    }

    fn missing(&self, record: &Record, field: &'static str) -> GraphError {
        GraphError::MissingField {
            unit: self.unit,
            id: record.id.clone(),
            field,
        }
    }

    fn invalid(&self, record: &Record, field: &'static str, value: &str) -> GraphError {
        GraphError::InvalidField {
            unit: self.unit,
            id: record.id.clone(),
            field,
            value: value.to_string(),
        }
    }

    /// Append every declaration to its parent's member list, in record order.
    fn link_members(&self, arena: &mut UnitArena) -> GraphResult<()> {
        for index in 0..arena.decls.len() {
            let Some(parent) = arena.decls[index].parent else {
                continue;
            };
            let id = arena.decls[index].id;
            let members = arena.decls[parent.index()].members_mut().ok_or_else(|| {
                GraphError::UnexpectedNodeKind {
                    unit: self.unit,
                    id: self.decl_slots[parent.index()].external_id.clone(),
                    expected: "scope",
                }
            })?;
            members.push(id);
        }
        Ok(())
    }

    /// Every declaration must reach the global namespace through its parents.
    fn check_reachable(&self, arena: &UnitArena) -> GraphResult<()> {
        for decl in &arena.decls {
            let mut current = decl.parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if steps > arena.decls.len() {
                    return Err(GraphError::InvalidField {
                        unit: self.unit,
                        id: decl.external_id.clone(),
                        field: fields::CONTEXT,
                        value: arena.decls[parent.index()].external_id.to_string(),
                    });
                }
                current = arena.decls[parent.index()].parent;
            }
        }
        Ok(())
    }

    /// Reject types that contain themselves once typedefs and
    /// specializations are expanded.
    fn check_acyclic(&self, arena: &UnitArena) -> GraphResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let expansions = |ty: TypeId| -> Vec<TypeId> {
            let mut next = arena.types[ty.index()].children();
            if let Type::Declared(decl) = &arena.types[ty.index()] {
                match &arena.decls[decl.index()].details {
                    DeclDetails::Typedef(typedef) => next.push(typedef.aliased),
                    DeclDetails::Class(class) => next.extend(class.instantiates),
                    _ => {}
                }
            }
            next
        };

        let mut marks = vec![Mark::New; arena.types.len()];
        for start in 0..arena.types.len() {
            if marks[start] != Mark::New {
                continue;
            }
            let start = IdCounter::<TypeId>::after(start).next_id();
            marks[start.index()] = Mark::Active;
            let mut stack = vec![(start, expansions(start), 0usize)];

            while let Some((node, edges, next)) = stack.last_mut() {
                if *next == edges.len() {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                    continue;
                }
                let child = edges[*next];
                *next += 1;

                match marks[child.index()] {
                    Mark::Done => {}
                    Mark::New => {
                        marks[child.index()] = Mark::Active;
                        stack.push((child, expansions(child), 0));
                    }
                    Mark::Active => {
                        let cycle = stack.iter().map(|(ty, _, _)| *ty).skip_while(|ty| *ty != child);
                        return Err(self.cycle_error(arena, cycle.collect()));
                    }
                }
            }
        }
        Ok(())
    }

    fn cycle_error(&self, arena: &UnitArena, cycle: Vec<TypeId>) -> GraphError {
        let typedef = cycle.iter().find_map(|ty| match &arena.types[ty.index()] {
            Type::Declared(decl) if arena.decls[decl.index()].kind == DeclKind::Typedef => {
                Some(arena.decls[decl.index()].external_id.clone())
            }
            _ => None,
        });
        if let Some(id) = typedef {
            return GraphError::CyclicAlias { id };
        }

        let id = cycle
            .first()
            .map(|ty| self.type_external_id(*ty))
            .unwrap_or_else(|| ExternalId::new("?"));
        GraphError::CyclicType {
            unit: self.unit,
            id,
        }
    }

    fn type_external_id(&self, ty: TypeId) -> ExternalId {
        match self.type_slots[ty.index()] {
            TypeSource::Record(index)
            | TypeSource::VolatileHalf(index)
            | TypeSource::ConstVolatile { record: index, .. } => self.records[index].id.clone(),
            TypeSource::Declared(decl) => self.decl_slots[decl.index()].external_id.clone(),
        }
    }
}

fn array_size(size: Option<&str>) -> ArraySize {
    match size.map(str::trim) {
        None | Some("") => ArraySize::Unknown,
        Some(text) => match text.parse() {
            Ok(n) => ArraySize::Known(n),
            Err(_) => ArraySize::Dependent(text.into()),
        },
    }
}

/// A fully resolved unit, ready to merge.
#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    pub(crate) unit: UnitId,
    pub(crate) arena: UnitArena,
    pub(crate) registry: NodeRegistry,
    pub(crate) files: Vec<CompactString>,
    /// Overload key per declaration, `None` for non-callables.
    pub(crate) signature_keys: Vec<Option<String>>,
}

impl ResolvedUnit {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn stage(&self) -> BuildStage {
        BuildStage::FieldsResolved
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn decl_count(&self) -> usize {
        self.arena.decls.len()
    }

    pub fn type_count(&self) -> usize {
        self.arena.types.len()
    }

    /// Read-only view of the unit's local nodes.
    pub fn store(&self) -> &impl NodeStore {
        &self.arena
    }
}
