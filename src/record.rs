//! Input record model
//!
//! The front-end dump arrives here already tokenized: one [`Record`] per
//! element, tagged with its kind and external id, carrying named attributes
//! whose values are literals or references to other records. Argument lists,
//! base-class specifiers, enumerators and template arguments are nested
//! [`ChildRecord`]s without ids of their own.

use crate::ExternalId;
use crate::error::{GraphError, GraphResult};
use crate::types::DeclKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute names understood by the builder.
pub mod fields {
    pub const NAME: &str = "name";
    pub const CONTEXT: &str = "context";
    pub const ACCESS: &str = "access";
    pub const FILE: &str = "file";
    pub const LINE: &str = "line";
    pub const TYPE: &str = "type";
    pub const RETURNS: &str = "returns";
    pub const BASETYPE: &str = "basetype";
    pub const SIZE: &str = "size";
    pub const INIT: &str = "init";
    pub const DEFAULT: &str = "default";
    pub const VALUE: &str = "value";
    pub const BITS: &str = "bits";
    pub const TEMPLATE: &str = "template";
    pub const INSTANTIATES: &str = "instantiates";
    pub const CONST: &str = "const";
    pub const VOLATILE: &str = "volatile";
    pub const VIRTUAL: &str = "virtual";
    pub const PURE_VIRTUAL: &str = "pure_virtual";
    pub const STATIC: &str = "static";
    pub const INLINE: &str = "inline";
    pub const EXPLICIT: &str = "explicit";
    pub const EXTERN: &str = "extern";
    pub const MUTABLE: &str = "mutable";
    pub const ARTIFICIAL: &str = "artificial";
    pub const NOEXCEPT: &str = "noexcept";
    pub const INCOMPLETE: &str = "incomplete";
    pub const ABSTRACT: &str = "abstract";
}

/// Element tags emitted by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    File,
    Namespace,
    Class,
    Struct,
    Union,
    Enumeration,
    Function,
    Method,
    Constructor,
    Destructor,
    OperatorFunction,
    OperatorMethod,
    Converter,
    Variable,
    Field,
    Typedef,
    FundamentalType,
    PointerType,
    ReferenceType,
    ArrayType,
    CvQualifiedType,
    FunctionType,
    MethodType,
    OffsetType,
    TemplateInstantiation,
}

impl RecordKind {
    /// Declaration kind this record produces, if it is a declaration.
    pub fn decl_kind(&self) -> Option<DeclKind> {
        let kind = match self {
            RecordKind::Namespace => DeclKind::Namespace,
            RecordKind::Class | RecordKind::Struct => DeclKind::Class,
            RecordKind::Union => DeclKind::Union,
            RecordKind::Enumeration => DeclKind::Enum,
            RecordKind::Function => DeclKind::Function,
            RecordKind::Method => DeclKind::MemberFunction,
            RecordKind::Constructor => DeclKind::Constructor,
            RecordKind::Destructor => DeclKind::Destructor,
            RecordKind::OperatorFunction | RecordKind::OperatorMethod | RecordKind::Converter => {
                DeclKind::Operator
            }
            RecordKind::Variable | RecordKind::Field => DeclKind::Variable,
            RecordKind::Typedef => DeclKind::Typedef,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            RecordKind::FundamentalType
                | RecordKind::PointerType
                | RecordKind::ReferenceType
                | RecordKind::ArrayType
                | RecordKind::CvQualifiedType
                | RecordKind::FunctionType
                | RecordKind::MethodType
                | RecordKind::OffsetType
                | RecordKind::TemplateInstantiation
        )
    }

    /// Member records that only exist inside a class scope.
    pub fn is_member_only(&self) -> bool {
        matches!(
            self,
            RecordKind::Method
                | RecordKind::Constructor
                | RecordKind::Destructor
                | RecordKind::OperatorMethod
                | RecordKind::Converter
                | RecordKind::Field
        )
    }
}

/// Value of a record attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    Literal(String),
    Ref(ExternalId),
    Refs(Vec<ExternalId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildKind {
    Argument,
    Ellipsis,
    Base,
    EnumValue,
    TemplateArgument,
}

/// Read access shared by records and their children.
pub trait Attributes {
    fn attrs(&self) -> &BTreeMap<String, AttrValue>;

    fn literal(&self, field: &str) -> Option<&str> {
        match self.attrs().get(field) {
            Some(AttrValue::Literal(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    fn reference(&self, field: &str) -> Option<&ExternalId> {
        match self.attrs().get(field) {
            Some(AttrValue::Ref(id)) => Some(id),
            _ => None,
        }
    }

    /// Boolean attribute; the front-end writes `"1"` for true.
    fn flag(&self, field: &str) -> bool {
        matches!(self.literal(field), Some("1" | "true"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,
    pub id: ExternalId,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub children: Vec<ChildRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub kind: ChildKind,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Attributes for Record {
    fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }
}

impl Attributes for ChildRecord {
    fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }
}

impl Record {
    pub fn new(kind: RecordKind, id: impl Into<ExternalId>) -> Self {
        Self {
            kind,
            id: id.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_literal(mut self, field: &str, value: impl Into<String>) -> Self {
        self.attrs
            .insert(field.to_string(), AttrValue::Literal(value.into()));
        self
    }

    pub fn with_ref(mut self, field: &str, id: impl Into<ExternalId>) -> Self {
        self.attrs.insert(field.to_string(), AttrValue::Ref(id.into()));
        self
    }

    pub fn with_refs<I>(mut self, field: &str, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ExternalId>,
    {
        let ids = ids.into_iter().map(Into::into).collect();
        self.attrs.insert(field.to_string(), AttrValue::Refs(ids));
        self
    }

    pub fn with_flag(self, field: &str) -> Self {
        self.with_literal(field, "1")
    }

    pub fn with_child(mut self, child: ChildRecord) -> Self {
        self.children.push(child);
        self
    }

    pub fn children_of(&self, kind: ChildKind) -> impl Iterator<Item = &ChildRecord> {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    /// Every id this record or its children refer to.
    pub fn references(&self) -> impl Iterator<Item = &ExternalId> {
        let own = self.attrs.values();
        let nested = self.children.iter().flat_map(|child| child.attrs.values());
        own.chain(nested).flat_map(|value| match value {
            AttrValue::Ref(id) => std::slice::from_ref(id).iter(),
            AttrValue::Refs(ids) => ids.iter(),
            AttrValue::Literal(_) => Default::default(),
        })
    }
}

impl ChildRecord {
    pub fn new(kind: ChildKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_literal(mut self, field: &str, value: impl Into<String>) -> Self {
        self.attrs
            .insert(field.to_string(), AttrValue::Literal(value.into()));
        self
    }

    pub fn with_ref(mut self, field: &str, id: impl Into<ExternalId>) -> Self {
        self.attrs.insert(field.to_string(), AttrValue::Ref(id.into()));
        self
    }

    pub fn with_flag(self, field: &str) -> Self {
        self.with_literal(field, "1")
    }
}

/// Ordered records of one translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStream {
    records: Vec<Record>,
}

impl RecordStream {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Decode a JSON array of records.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::RecordStream {
            reason: e.to_string(),
        })
    }

    pub fn from_reader(reader: impl std::io::Read) -> GraphResult<Self> {
        serde_json::from_reader(reader).map_err(|e| GraphError::RecordStream {
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string(self).map_err(|e| GraphError::RecordStream {
            reason: e.to_string(),
        })
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for RecordStream {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for RecordStream {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecordStream {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
