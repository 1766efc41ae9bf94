//! Type algebra
//!
//! Pure operations over a [`NodeStore`]: alias stripping, qualifier
//! stripping, decomposition into wrapper layers and structural equality.
//!
//! Canonical form: typedefs are transparent, cv-qualifiers collapse into a
//! set at every level, and a class that specializes a template is identified
//! with its `Instantiation`. Declarations are compared by identity, never by
//! name.

use super::{ArraySize, NodeStore, Qualifiers, Signature, TemplateArg, Type};
use crate::decl::DeclDetails;
use crate::error::{GraphError, GraphResult};
use crate::types::{DeclId, TypeId};
use std::collections::HashSet;

/// One wrapper peeled off by [`decompose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Pointer,
    Reference,
    Array(ArraySize),
    Const,
    Volatile,
}

/// Wrapper chain of a type, outermost first, and the type underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub layers: Vec<Layer>,
    pub base: TypeId,
}

impl Decomposition {
    pub fn is_pointer(&self) -> bool {
        self.first_shape() == Some(&Layer::Pointer)
    }

    pub fn is_reference(&self) -> bool {
        self.first_shape() == Some(&Layer::Reference)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.first_shape(), Some(Layer::Array(_)))
    }

    /// Outermost non-cv layer.
    fn first_shape(&self) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|layer| !matches!(layer, Layer::Const | Layer::Volatile))
    }
}

/// Coarse classification of a canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Fundamental,
    Declared,
    Pointer,
    Reference,
    Array,
    Function,
    MemberFunctionPointer,
    MemberPointer,
    Instantiation,
}

/// Unwrap typedef-declared types until a non-typedef is reached.
pub fn strip_aliases<S: NodeStore + ?Sized>(store: &S, ty: TypeId) -> GraphResult<TypeId> {
    let mut current = ty;
    let mut seen = HashSet::new();

    while let Type::Declared(decl) = store.ty(current) {
        let DeclDetails::Typedef(typedef) = &store.decl(*decl).details else {
            break;
        };
        if !seen.insert(*decl) {
            return Err(cyclic_alias(store, *decl));
        }
        current = typedef.aliased;
    }

    Ok(current)
}

/// Remove the outer const/volatile wrappers, returning the inner type and the
/// qualifiers removed. Typedefs are not looked through.
pub fn strip_qualifiers<S: NodeStore + ?Sized>(store: &S, ty: TypeId) -> (TypeId, Qualifiers) {
    let mut current = ty;
    let mut qualifiers = Qualifiers::empty();

    loop {
        match store.ty(current) {
            Type::Const(inner) => {
                qualifiers |= Qualifiers::CONST;
                current = *inner;
            }
            Type::Volatile(inner) => {
                qualifiers |= Qualifiers::VOLATILE;
                current = *inner;
            }
            _ => return (current, qualifiers),
        }
    }
}

/// Peel pointer, reference, array and cv wrappers down to the base type.
/// Typedefs are left in place; see [`decompose_canonical`].
pub fn decompose<S: NodeStore + ?Sized>(store: &S, ty: TypeId) -> Decomposition {
    let mut layers = Vec::new();
    let mut current = ty;

    loop {
        let (layer, inner) = match store.ty(current) {
            Type::Pointer(inner) => (Layer::Pointer, *inner),
            Type::Reference(inner) => (Layer::Reference, *inner),
            Type::Array { element, size } => (Layer::Array(size.clone()), *element),
            Type::Const(inner) => (Layer::Const, *inner),
            Type::Volatile(inner) => (Layer::Volatile, *inner),
            _ => break,
        };
        layers.push(layer);
        current = inner;
    }

    Decomposition {
        layers,
        base: current,
    }
}

/// Like [`decompose`], but looks through typedefs at every level and emits
/// cv layers in normalized order (const before volatile).
pub fn decompose_canonical<S: NodeStore + ?Sized>(
    store: &S,
    ty: TypeId,
) -> GraphResult<Decomposition> {
    let mut layers = Vec::new();
    let mut current = ty;

    loop {
        let (head, qualifiers) = canonical_head(store, current)?;
        if qualifiers.contains(Qualifiers::CONST) {
            layers.push(Layer::Const);
        }
        if qualifiers.contains(Qualifiers::VOLATILE) {
            layers.push(Layer::Volatile);
        }

        let (layer, inner) = match store.ty(head) {
            Type::Pointer(inner) => (Layer::Pointer, *inner),
            Type::Reference(inner) => (Layer::Reference, *inner),
            Type::Array { element, size } => (Layer::Array(size.clone()), *element),
            _ => {
                return Ok(Decomposition {
                    layers,
                    base: head,
                });
            }
        };
        layers.push(layer);
        current = inner;
    }
}

/// Classify the canonical form of `ty`.
pub fn classify<S: NodeStore + ?Sized>(store: &S, ty: TypeId) -> GraphResult<TypeClass> {
    let (head, _) = canonical_head(store, ty)?;
    Ok(match store.ty(head) {
        Type::Fundamental(_) => TypeClass::Fundamental,
        Type::Declared(_) => TypeClass::Declared,
        Type::Pointer(_) => TypeClass::Pointer,
        Type::Reference(_) => TypeClass::Reference,
        Type::Array { .. } => TypeClass::Array,
        Type::Function(_) => TypeClass::Function,
        Type::MemberFunctionPointer { .. } => TypeClass::MemberFunctionPointer,
        Type::MemberPointer { .. } => TypeClass::MemberPointer,
        Type::Instantiation { .. } => TypeClass::Instantiation,
        Type::Const(_) | Type::Volatile(_) => unreachable!("canonical head never starts with cv"),
    })
}

/// Declaration at the bottom of the canonical wrapper chain: the class, union
/// or enum a `Foo const * &` ultimately names.
pub fn base_declaration<S: NodeStore + ?Sized>(
    store: &S,
    ty: TypeId,
) -> GraphResult<Option<DeclId>> {
    let decomposition = decompose_canonical(store, ty)?;
    Ok(match store.ty(decomposition.base) {
        Type::Declared(decl) => Some(*decl),
        Type::Instantiation { template, .. } => Some(*template),
        _ => None,
    })
}

/// Structural equality of two types in canonical form.
pub fn structural_equals<S: NodeStore + ?Sized>(
    store: &S,
    left: TypeId,
    right: TypeId,
) -> GraphResult<bool> {
    if left == right {
        return Ok(true);
    }

    let (left, left_quals) = canonical_head(store, left)?;
    let (right, right_quals) = canonical_head(store, right)?;
    if left_quals != right_quals {
        return Ok(false);
    }

    let equal = match (store.ty(left), store.ty(right)) {
        (Type::Fundamental(a), Type::Fundamental(b)) => a == b,
        (Type::Declared(a), Type::Declared(b)) => a == b,
        (Type::Pointer(a), Type::Pointer(b)) | (Type::Reference(a), Type::Reference(b)) => {
            structural_equals(store, *a, *b)?
        }
        (
            Type::Array {
                element: a,
                size: size_a,
            },
            Type::Array {
                element: b,
                size: size_b,
            },
        ) => size_a == size_b && structural_equals(store, *a, *b)?,
        (Type::Function(a), Type::Function(b)) => signatures_equal(store, a, b)?,
        (
            Type::MemberFunctionPointer {
                class: class_a,
                signature: a,
            },
            Type::MemberFunctionPointer {
                class: class_b,
                signature: b,
            },
        ) => class_a == class_b && signatures_equal(store, a, b)?,
        (
            Type::MemberPointer {
                class: class_a,
                pointee: a,
            },
            Type::MemberPointer {
                class: class_b,
                pointee: b,
            },
        ) => class_a == class_b && structural_equals(store, *a, *b)?,
        (
            Type::Instantiation {
                template: template_a,
                args: a,
            },
            Type::Instantiation {
                template: template_b,
                args: b,
            },
        ) => template_a == template_b && template_args_equal(store, a, b)?,
        _ => false,
    };

    Ok(equal)
}

/// Exact comparison without any normalization: same variant tree, same
/// declarations, typedefs compared as themselves.
pub fn raw_equals<S: NodeStore + ?Sized>(store: &S, left: TypeId, right: TypeId) -> bool {
    if left == right {
        return true;
    }

    match (store.ty(left), store.ty(right)) {
        (Type::Fundamental(a), Type::Fundamental(b)) => a == b,
        (Type::Declared(a), Type::Declared(b)) => a == b,
        (Type::Pointer(a), Type::Pointer(b))
        | (Type::Reference(a), Type::Reference(b))
        | (Type::Const(a), Type::Const(b))
        | (Type::Volatile(a), Type::Volatile(b)) => raw_equals(store, *a, *b),
        (
            Type::Array {
                element: a,
                size: size_a,
            },
            Type::Array {
                element: b,
                size: size_b,
            },
        ) => size_a == size_b && raw_equals(store, *a, *b),
        (Type::Function(a), Type::Function(b)) => raw_signatures_equal(store, a, b),
        (
            Type::MemberFunctionPointer {
                class: class_a,
                signature: a,
            },
            Type::MemberFunctionPointer {
                class: class_b,
                signature: b,
            },
        ) => class_a == class_b && raw_signatures_equal(store, a, b),
        (
            Type::MemberPointer {
                class: class_a,
                pointee: a,
            },
            Type::MemberPointer {
                class: class_b,
                pointee: b,
            },
        ) => class_a == class_b && raw_equals(store, *a, *b),
        (
            Type::Instantiation {
                template: template_a,
                args: a,
            },
            Type::Instantiation {
                template: template_b,
                args: b,
            },
        ) => {
            template_a == template_b
                && a.len() == b.len()
                && a.iter().zip(b).all(|pair| match pair {
                    (TemplateArg::Type(x), TemplateArg::Type(y)) => raw_equals(store, *x, *y),
                    (TemplateArg::Value(x), TemplateArg::Value(y)) => x == y,
                    _ => false,
                })
        }
        _ => false,
    }
}

/// Strip typedefs and cv wrappers off the top of `ty` until neither applies,
/// returning the head node and the accumulated qualifiers. A class that
/// specializes a template continues as its instantiation.
pub(crate) fn canonical_head<S: NodeStore + ?Sized>(
    store: &S,
    ty: TypeId,
) -> GraphResult<(TypeId, Qualifiers)> {
    let mut current = ty;
    let mut qualifiers = Qualifiers::empty();
    let mut seen = HashSet::new();

    loop {
        match store.ty(current) {
            Type::Const(inner) => {
                qualifiers |= Qualifiers::CONST;
                current = *inner;
            }
            Type::Volatile(inner) => {
                qualifiers |= Qualifiers::VOLATILE;
                current = *inner;
            }
            Type::Declared(decl) => {
                let next = match &store.decl(*decl).details {
                    DeclDetails::Typedef(typedef) => typedef.aliased,
                    DeclDetails::Class(class) => match class.instantiates {
                        Some(instantiation) => instantiation,
                        None => return Ok((current, qualifiers)),
                    },
                    _ => return Ok((current, qualifiers)),
                };
                if !seen.insert(*decl) {
                    return Err(cyclic_alias(store, *decl));
                }
                current = next;
            }
            _ => return Ok((current, qualifiers)),
        }
    }
}

fn signatures_equal<S: NodeStore + ?Sized>(
    store: &S,
    a: &Signature,
    b: &Signature,
) -> GraphResult<bool> {
    if a.has_ellipsis != b.has_ellipsis
        || a.is_const != b.is_const
        || a.is_volatile != b.is_volatile
        || a.parameters.len() != b.parameters.len()
    {
        return Ok(false);
    }
    if !structural_equals(store, a.return_type, b.return_type)? {
        return Ok(false);
    }
    for (x, y) in a.parameters.iter().zip(&b.parameters) {
        if !structural_equals(store, *x, *y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn raw_signatures_equal<S: NodeStore + ?Sized>(store: &S, a: &Signature, b: &Signature) -> bool {
    a.has_ellipsis == b.has_ellipsis
        && a.is_const == b.is_const
        && a.is_volatile == b.is_volatile
        && a.parameters.len() == b.parameters.len()
        && raw_equals(store, a.return_type, b.return_type)
        && a
            .parameters
            .iter()
            .zip(&b.parameters)
            .all(|(x, y)| raw_equals(store, *x, *y))
}

fn template_args_equal<S: NodeStore + ?Sized>(
    store: &S,
    a: &[TemplateArg],
    b: &[TemplateArg],
) -> GraphResult<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for pair in a.iter().zip(b) {
        let equal = match pair {
            (TemplateArg::Type(x), TemplateArg::Type(y)) => structural_equals(store, *x, *y)?,
            (TemplateArg::Value(x), TemplateArg::Value(y)) => x == y,
            _ => false,
        };
        if !equal {
            return Ok(false);
        }
    }
    Ok(true)
}

fn cyclic_alias<S: NodeStore + ?Sized>(store: &S, decl: DeclId) -> GraphError {
    GraphError::CyclicAlias {
        id: store.decl(decl).external_id.clone(),
    }
}
