//! Type model
//!
//! Types form a closed tagged union. Composite nodes hold the id of their
//! immediate sub-type in the same arena; `Declared` and the member-pointer
//! variants refer to declarations without owning them. Type nodes are created
//! once while a unit is built and never change afterwards.

pub mod algebra;
pub mod render;

pub use algebra::{
    Decomposition, Layer, TypeClass, base_declaration, classify, decompose, decompose_canonical,
    raw_equals, strip_aliases, strip_qualifiers, structural_equals,
};
pub use render::{
    decl_name, merge_name, qualified_name, qualified_path, render_type, signature_key,
};

use crate::decl::Declaration;
use crate::types::{CompactString, DeclId, TypeId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// Built-in type such as `int` or `void`.
    Fundamental(CompactString),
    /// A class, union, enum or typedef declaration.
    Declared(DeclId),
    Pointer(TypeId),
    Reference(TypeId),
    Array { element: TypeId, size: ArraySize },
    Const(TypeId),
    Volatile(TypeId),
    Function(Signature),
    MemberFunctionPointer { class: DeclId, signature: Signature },
    /// Pointer to data member (`int A::*`).
    MemberPointer { class: DeclId, pointee: TypeId },
    Instantiation { template: DeclId, args: Vec<TemplateArg> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArraySize {
    Known(u64),
    /// `T[]`
    Unknown,
    /// Size given by an expression the front-end could not evaluate.
    Dependent(CompactString),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub return_type: TypeId,
    pub parameters: Vec<TypeId>,
    pub has_ellipsis: bool,
    pub is_const: bool,
    pub is_volatile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateArg {
    Type(TypeId),
    /// Non-type argument, compared by its exact spelling.
    Value(CompactString),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Qualifiers: u8 {
        const CONST    = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

impl Type {
    /// Immediate sub-types, in a fixed order.
    pub fn children(&self) -> Vec<TypeId> {
        match self {
            Type::Fundamental(_) | Type::Declared(_) => Vec::new(),
            Type::Pointer(inner)
            | Type::Reference(inner)
            | Type::Const(inner)
            | Type::Volatile(inner) => vec![*inner],
            Type::Array { element, .. } => vec![*element],
            Type::MemberPointer { pointee, .. } => vec![*pointee],
            Type::Function(signature) | Type::MemberFunctionPointer { signature, .. } => {
                let mut ids = Vec::with_capacity(signature.parameters.len() + 1);
                ids.push(signature.return_type);
                ids.extend(signature.parameters.iter().copied());
                ids
            }
            Type::Instantiation { args, .. } => args
                .iter()
                .filter_map(|arg| match arg {
                    TemplateArg::Type(id) => Some(*id),
                    TemplateArg::Value(_) => None,
                })
                .collect(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Fundamental(name) if &**name == "void")
    }
}

/// Read access to a declaration/type arena.
///
/// Implemented by the per-unit node arena while a unit is being resolved and
/// by the frozen [`DeclGraph`](crate::DeclGraph), so the type algebra and
/// rendering work the same on both.
pub trait NodeStore {
    /// # Panics
    /// Panics if `id` was not issued by this store.
    fn decl(&self, id: DeclId) -> &Declaration;

    /// # Panics
    /// Panics if `id` was not issued by this store.
    fn ty(&self, id: TypeId) -> &Type;

    /// Root of the declaration forest.
    fn global_namespace(&self) -> DeclId;
}
