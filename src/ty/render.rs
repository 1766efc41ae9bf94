//! Decl strings and qualified names
//!
//! Types render in postfix-cv form (`int const *`), which keeps the spelling
//! of a canonical type unique: qualifiers always follow what they qualify and
//! appear as `const` before `volatile`. Qualified names join scope names with
//! `::`, omit the global namespace and anonymous scopes, and spell template
//! specializations from their canonical arguments.

use super::algebra::canonical_head;
use super::{ArraySize, NodeStore, Qualifiers, Signature, TemplateArg, Type};
use crate::decl::{CallableFlags, DeclDetails};
use crate::error::GraphResult;
use crate::types::{DeclId, TypeId};

/// Name of a single declaration as it appears in a qualified name.
pub fn decl_name<S: NodeStore + ?Sized>(store: &S, id: DeclId) -> GraphResult<String> {
    let decl = store.decl(id);
    if let DeclDetails::Class(class) = &decl.details {
        if let Some(instantiation) = class.instantiates {
            if let Type::Instantiation { template, args } = store.ty(instantiation) {
                return Ok(format!(
                    "{}<{}>",
                    store.decl(*template).name,
                    render_args(store, args)?
                ));
            }
        }
    }
    Ok(decl.name.to_string())
}

/// Scope names from the outermost named scope down to `id` itself.
pub fn qualified_path<S: NodeStore + ?Sized>(store: &S, id: DeclId) -> GraphResult<Vec<String>> {
    let mut path = Vec::new();
    let mut current = Some(id);

    while let Some(decl_id) = current {
        let decl = store.decl(decl_id);
        if decl.parent.is_none() {
            break;
        }
        if !decl.is_anonymous() {
            path.push(decl_name(store, decl_id)?);
        }
        current = decl.parent;
    }

    path.reverse();
    Ok(path)
}

/// `::`-separated qualified name, without a leading `::`.
pub fn qualified_name<S: NodeStore + ?Sized>(store: &S, id: DeclId) -> GraphResult<String> {
    Ok(qualified_path(store, id)?.join("::"))
}

/// Render `ty` as a C++ decl string. With `canonical` set, typedefs are
/// replaced by what they alias and qualifiers are normalized.
pub fn render_type<S: NodeStore + ?Sized>(
    store: &S,
    ty: TypeId,
    canonical: bool,
) -> GraphResult<String> {
    if !canonical {
        return render_node(store, ty, false);
    }

    let (head, qualifiers) = canonical_head(store, ty)?;
    let mut out = render_node(store, head, true)?;
    if qualifiers.contains(Qualifiers::CONST) {
        out.push_str(" const");
    }
    if qualifiers.contains(Qualifiers::VOLATILE) {
        out.push_str(" volatile");
    }
    Ok(out)
}

/// Overload key of a function-like declaration: canonical parameter types
/// plus the qualifiers that distinguish otherwise identical overloads.
pub fn signature_key<S: NodeStore + ?Sized>(
    store: &S,
    id: DeclId,
) -> GraphResult<Option<String>> {
    let Some(callable) = store.decl(id).as_callable() else {
        return Ok(None);
    };

    let mut params = Vec::with_capacity(callable.parameters.len() + 1);
    for parameter in &callable.parameters {
        params.push(render_type(store, parameter.ty, true)?);
    }
    if callable.flags.contains(CallableFlags::ELLIPSIS) {
        params.push("...".to_string());
    }

    let mut key = format!("({})", params.join(", "));
    if callable.flags.contains(CallableFlags::CONST) {
        key.push_str(" const");
    }
    if callable.flags.contains(CallableFlags::VOLATILE) {
        key.push_str(" volatile");
    }
    if callable.flags.contains(CallableFlags::NOEXCEPT) {
        key.push_str(" noexcept");
    }

    let mut anonymous = Vec::new();
    for parameter in &callable.parameters {
        anonymous_scopes(store, parameter.ty, &mut anonymous)?;
    }
    push_anonymous_tag(&mut key, &anonymous);
    Ok(Some(key))
}

/// Name part of a declaration's merge identity: the canonical spelling from
/// [`decl_name`], tagged with the unit-local anonymous scopes that the
/// arguments of a specialization reach.
pub fn merge_name<S: NodeStore + ?Sized>(store: &S, id: DeclId) -> GraphResult<String> {
    let mut name = decl_name(store, id)?;
    if let DeclDetails::Class(class) = &store.decl(id).details {
        if let Some(instantiation) = class.instantiates {
            let mut anonymous = Vec::new();
            anonymous_scopes(store, instantiation, &mut anonymous)?;
            push_anonymous_tag(&mut name, &anonymous);
        }
    }
    Ok(name)
}

fn push_anonymous_tag(key: &mut String, anonymous: &[String]) {
    if !anonymous.is_empty() {
        key.push_str(" [");
        key.push_str(&anonymous.join(", "));
        key.push(']');
    }
}

/// Collect the internal names of anonymous scopes enclosing any declaration
/// that `ty` refers to once aliases are stripped. Rendering omits those
/// scopes, so two units' distinct anonymous entities spell the same.
fn anonymous_scopes<S: NodeStore + ?Sized>(
    store: &S,
    ty: TypeId,
    found: &mut Vec<String>,
) -> GraphResult<()> {
    let (head, _) = canonical_head(store, ty)?;
    let node = store.ty(head);
    let owner = match node {
        Type::Declared(decl) => Some(*decl),
        Type::Instantiation { template, .. } => Some(*template),
        Type::MemberPointer { class, .. } | Type::MemberFunctionPointer { class, .. } => {
            Some(*class)
        }
        _ => None,
    };

    if let Some(owner) = owner {
        let mut current = Some(owner);
        while let Some(id) = current {
            let decl = store.decl(id);
            if let Some(name) = &decl.anonymous {
                if !found.iter().any(|seen| **seen == **name) {
                    found.push(name.to_string());
                }
            }
            current = decl.parent;
        }
        if let DeclDetails::Class(class) = &store.decl(owner).details {
            if let Some(instantiation) = class.instantiates {
                anonymous_scopes(store, instantiation, found)?;
            }
        }
    }

    for child in node.children() {
        anonymous_scopes(store, child, found)?;
    }
    Ok(())
}

fn render_node<S: NodeStore + ?Sized>(
    store: &S,
    ty: TypeId,
    canonical: bool,
) -> GraphResult<String> {
    let rendered = match store.ty(ty) {
        Type::Fundamental(name) => name.to_string(),
        Type::Declared(decl) => qualified_name(store, *decl)?,
        Type::Pointer(inner) => pointer_like(store, *inner, "*", canonical)?,
        Type::Reference(inner) => pointer_like(store, *inner, "&", canonical)?,
        Type::Const(inner) => format!("{} const", render_type(store, *inner, canonical)?),
        Type::Volatile(inner) => format!("{} volatile", render_type(store, *inner, canonical)?),
        Type::Array { element, size } => {
            let size = match size {
                ArraySize::Known(n) => n.to_string(),
                ArraySize::Unknown => String::new(),
                ArraySize::Dependent(expr) => expr.to_string(),
            };
            format!("{}[{}]", render_type(store, *element, canonical)?, size)
        }
        Type::Function(signature) => format!(
            "{} ({}){}",
            render_type(store, signature.return_type, canonical)?,
            render_params(store, signature, canonical)?,
            cv_suffix(signature)
        ),
        Type::MemberFunctionPointer { class, signature } => format!(
            "{} ({}::*)({}){}",
            render_type(store, signature.return_type, canonical)?,
            qualified_name(store, *class)?,
            render_params(store, signature, canonical)?,
            cv_suffix(signature)
        ),
        Type::MemberPointer { class, pointee } => format!(
            "{} {}::*",
            render_type(store, *pointee, canonical)?,
            qualified_name(store, *class)?
        ),
        Type::Instantiation { template, args } => format!(
            "{}<{}>",
            qualified_name(store, *template)?,
            render_args(store, args)?
        ),
    };
    Ok(rendered)
}

/// Pointers and references to functions use the declarator syntax
/// `ret (*)(params)`; everything else is postfix.
fn pointer_like<S: NodeStore + ?Sized>(
    store: &S,
    inner: TypeId,
    sigil: &str,
    canonical: bool,
) -> GraphResult<String> {
    let target = if canonical {
        canonical_head(store, inner)?.0
    } else {
        inner
    };

    if let Type::Function(signature) = store.ty(target) {
        return Ok(format!(
            "{} ({})({}){}",
            render_type(store, signature.return_type, canonical)?,
            sigil,
            render_params(store, signature, canonical)?,
            cv_suffix(signature)
        ));
    }

    Ok(format!("{} {}", render_type(store, inner, canonical)?, sigil))
}

fn render_params<S: NodeStore + ?Sized>(
    store: &S,
    signature: &Signature,
    canonical: bool,
) -> GraphResult<String> {
    let mut params = Vec::with_capacity(signature.parameters.len() + 1);
    for parameter in &signature.parameters {
        params.push(render_type(store, *parameter, canonical)?);
    }
    if signature.has_ellipsis {
        params.push("...".to_string());
    }
    Ok(params.join(", "))
}

/// Template arguments are always spelled canonically.
fn render_args<S: NodeStore + ?Sized>(store: &S, args: &[TemplateArg]) -> GraphResult<String> {
    let mut rendered = Vec::with_capacity(args.len());
    for arg in args {
        rendered.push(match arg {
            TemplateArg::Type(ty) => render_type(store, *ty, true)?,
            TemplateArg::Value(value) => value.to_string(),
        });
    }
    Ok(rendered.join(", "))
}

fn cv_suffix(signature: &Signature) -> &'static str {
    match (signature.is_const, signature.is_volatile) {
        (true, true) => " const volatile",
        (true, false) => " const",
        (false, true) => " volatile",
        (false, false) => "",
    }
}
