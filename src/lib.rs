//! Declaration graph for C++ front-end dumps.
//!
//! Records describing one translation unit are resolved into declaration and
//! type nodes, merged with other units into a single forest, frozen, and then
//! queried with composable matchers.

pub mod builder;
pub mod config;
pub mod decl;
pub mod error;
pub mod graph;
pub mod logging;
pub mod matcher;
pub mod query;
pub mod record;
pub mod registry;
pub mod ty;
pub mod types;

// Explicit exports for better API clarity
pub use builder::{BuildStage, GraphBuilder, MergeSummary, ResolvedUnit, UnitBuilder};
pub use config::Settings;
pub use decl::{ClassKey, Declaration, DeclDetails};
pub use error::{Error, GraphError, GraphResult, QueryError, QueryResult};
pub use graph::DeclGraph;
pub use matcher::{Matcher, Traversal, TypeMatcher};
pub use query::Query;
pub use record::{Record, RecordKind, RecordStream};
pub use registry::{NodeRef, NodeRegistry};
pub use ty::{NodeStore, Type};
pub use types::{Access, DeclId, DeclKind, ExternalId, FileId, Location, TypeId, UnitId};
