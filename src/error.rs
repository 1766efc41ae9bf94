//! Error types for the declaration graph
//!
//! Input malformation (dangling or duplicate ids, alias cycles) surfaces as
//! [`GraphError`] and is fatal to the translation unit being built. Query
//! misuse (zero or several matches where exactly one was required) surfaces as
//! [`QueryError`]. Both carry the offending external id where one exists.

use crate::{DeclId, ExternalId, UnitId};
use thiserror::Error;

/// Errors raised while building or merging a translation unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Reference id '{id}' is bound twice in unit {unit:?}")]
    DuplicateId { unit: UnitId, id: ExternalId },

    #[error("Reference id '{id}' used by '{referenced_by}' in unit {unit:?} has no defining record")]
    UnresolvedReference {
        unit: UnitId,
        id: ExternalId,
        referenced_by: ExternalId,
    },

    #[error("Typedef '{id}' aliases itself through a cycle")]
    CyclicAlias { id: ExternalId },

    #[error("Type '{id}' in unit {unit:?} contains itself")]
    CyclicType { unit: UnitId, id: ExternalId },

    #[error("Record '{id}' in unit {unit:?} is missing required field '{field}'")]
    MissingField {
        unit: UnitId,
        id: ExternalId,
        field: &'static str,
    },

    #[error("Record '{id}' in unit {unit:?} has invalid value '{value}' for field '{field}'")]
    InvalidField {
        unit: UnitId,
        id: ExternalId,
        field: &'static str,
        value: String,
    },

    #[error("Reference id '{id}' in unit {unit:?} does not name a {expected}")]
    UnexpectedNodeKind {
        unit: UnitId,
        id: ExternalId,
        expected: &'static str,
    },

    #[error("Unit {unit:?} has no global namespace record")]
    MissingGlobalNamespace { unit: UnitId },

    #[error("Unit {unit:?} declares more than one global namespace ('{first}' and '{second}')")]
    MultipleGlobalNamespaces {
        unit: UnitId,
        first: ExternalId,
        second: ExternalId,
    },

    #[error("Registry of unit {unit:?} is frozen and cannot accept new bindings")]
    RegistryFrozen { unit: UnitId },

    #[error("Unit {found:?} cannot be merged yet, the graph expects unit {expected:?} next")]
    UnitOutOfOrder { expected: UnitId, found: UnitId },

    #[error("Failed to read record stream: {reason}")]
    RecordStream { reason: String },
}

impl GraphError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "DUPLICATE_ID",
            Self::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            Self::CyclicAlias { .. } => "CYCLIC_ALIAS",
            Self::CyclicType { .. } => "CYCLIC_TYPE",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::UnexpectedNodeKind { .. } => "UNEXPECTED_NODE_KIND",
            Self::MissingGlobalNamespace { .. } => "MISSING_GLOBAL_NAMESPACE",
            Self::MultipleGlobalNamespaces { .. } => "MULTIPLE_GLOBAL_NAMESPACES",
            Self::RegistryFrozen { .. } => "REGISTRY_FROZEN",
            Self::UnitOutOfOrder { .. } => "UNIT_OUT_OF_ORDER",
            Self::RecordStream { .. } => "RECORD_STREAM",
        }
    }

    /// The external id the error is about, when there is one.
    pub fn external_id(&self) -> Option<&ExternalId> {
        match self {
            Self::DuplicateId { id, .. }
            | Self::UnresolvedReference { id, .. }
            | Self::CyclicAlias { id }
            | Self::CyclicType { id, .. }
            | Self::MissingField { id, .. }
            | Self::InvalidField { id, .. }
            | Self::UnexpectedNodeKind { id, .. } => Some(id),
            Self::MultipleGlobalNamespaces { second, .. } => Some(second),
            Self::MissingGlobalNamespace { .. }
            | Self::RegistryFrozen { .. }
            | Self::UnitOutOfOrder { .. }
            | Self::RecordStream { .. } => None,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::DuplicateId { .. } | Self::MultipleGlobalNamespaces { .. } => vec![
                "Each translation unit must be fed as its own record stream",
                "Check that the dump was not concatenated with another unit",
            ],
            Self::UnresolvedReference { .. } => vec![
                "The dump is truncated or was filtered after generation",
                "Regenerate the dump for this translation unit",
            ],
            Self::CyclicAlias { .. } | Self::CyclicType { .. } => {
                vec!["The front-end emitted a type that refers back to itself"]
            }
            Self::UnitOutOfOrder { .. } => vec![
                "Create unit builders through GraphBuilder::unit_builder()",
                "Merge resolved units in the order their ids were handed out",
            ],
            Self::RegistryFrozen { .. } => vec![
                "Reopen the graph with DeclGraph::into_builder() before adding units",
            ],
            _ => vec![],
        }
    }
}

/// Errors returned by the query facade
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No declaration matches {matcher}")]
    NotFound { matcher: String },

    #[error("{count} declarations match {matcher}, expected exactly one: {candidates:?}")]
    AmbiguousMatch {
        matcher: String,
        count: usize,
        candidates: Vec<String>,
    },

    #[error("Declaration {id:?} does not exist in this graph")]
    NoSuchDeclaration { id: DeclId },
}

impl QueryError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AmbiguousMatch { .. } => "AMBIGUOUS_MATCH",
            Self::NoSuchDeclaration { .. } => "NO_SUCH_DECLARATION",
        }
    }
}

/// Crate-level error for callers that mix building, querying and configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}

/// Result type alias for build operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type alias for query operations
pub type QueryResult<T> = Result<T, QueryError>;
