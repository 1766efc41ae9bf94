//! Evaluation of matchers against a frozen graph.

use super::{Matcher, TypeMatcher, last_segment_start};
use crate::graph::DeclGraph;
use crate::ty::{self, Qualifiers, Type};
use crate::types::{DeclId, TypeId};
use std::collections::{HashSet, VecDeque};

impl Matcher {
    /// True if the declaration `id` satisfies this matcher.
    pub fn matches(&self, graph: &DeclGraph, id: DeclId) -> bool {
        let decl = graph.decl(id);
        match self {
            Matcher::Anything => true,
            Matcher::NameEquals(name) => name_equals(graph, id, name),
            Matcher::NameMatches(pattern) => {
                if pattern.as_str().contains("::") {
                    pattern.is_match(&graph.qualified_name(id))
                } else {
                    pattern.is_match(&decl.name) || pattern.is_match(&graph.display_name(id))
                }
            }
            Matcher::QualifiedNameEquals(name) => {
                *graph.qualified_name(id) == *name.strip_prefix("::").unwrap_or(name)
            }
            Matcher::KindIs(kind) => decl.kind == *kind,
            Matcher::AccessIs(access) => decl.access == Some(*access),
            Matcher::IsVirtual => decl.is_virtual(),
            Matcher::IsPureVirtual => decl.is_pure_virtual(),
            Matcher::IsStatic => decl.is_static(),
            Matcher::IsConst => decl.is_const(),
            Matcher::TypeMatches(matcher) => decl
                .value_type()
                .is_some_and(|ty| matcher.matches(graph, ty)),
            Matcher::ReturnType(matcher) => decl
                .as_callable()
                .and_then(|callable| callable.return_type)
                .is_some_and(|ty| matcher.matches(graph, ty)),
            Matcher::HasParameter(matcher) => decl.as_callable().is_some_and(|callable| {
                callable
                    .parameters
                    .iter()
                    .any(|parameter| matcher.matches(graph, parameter.ty))
            }),
            Matcher::ParameterCount(count) => decl
                .as_callable()
                .is_some_and(|callable| callable.parameters.len() == *count),
            Matcher::HasBaseClass(base) => has_base_class(graph, id, base),
            Matcher::ParentIs(parent) => decl.parent.is_some_and(|p| parent.matches(graph, p)),
            Matcher::And(all) => all.iter().all(|m| m.matches(graph, id)),
            Matcher::Or(any) => any.iter().any(|m| m.matches(graph, id)),
            Matcher::Not(inner) => !inner.matches(graph, id),
        }
    }
}

fn name_equals(graph: &DeclGraph, id: DeclId, name: &str) -> bool {
    let name = name.strip_prefix("::").unwrap_or(name);
    if last_segment_start(name).is_some() {
        return *graph.qualified_name(id) == *name;
    }
    let decl = graph.decl(id);
    if *decl.name == *name {
        return true;
    }
    // a specialization may be asked for by its canonical spelling
    name.contains('<') && decl.as_class().is_some_and(|c| c.instantiates.is_some())
        && graph.display_name(id) == name
}

/// Breadth-first over all direct and indirect bases. Each class is visited
/// once, so diamonds and malformed cyclic hierarchies terminate.
fn has_base_class(graph: &DeclGraph, id: DeclId, matcher: &Matcher) -> bool {
    let mut visited = HashSet::new();
    let mut queue: VecDeque<DeclId> = graph.decl(id).bases().iter().map(|b| b.class).collect();

    while let Some(class) = queue.pop_front() {
        if !visited.insert(class) {
            continue;
        }
        if matcher.matches(graph, class) {
            return true;
        }
        queue.extend(graph.decl(class).bases().iter().map(|b| b.class));
    }
    false
}

impl TypeMatcher {
    /// True if type `ty` satisfies this matcher. Types whose alias chain is
    /// malformed match nothing.
    pub fn matches(&self, graph: &DeclGraph, ty: TypeId) -> bool {
        self.eval(graph, ty, Qualifiers::empty())
    }

    /// `consumed` holds the top-level qualifiers an enclosing `Const` or
    /// `Volatile` has already accounted for.
    fn eval(&self, graph: &DeclGraph, ty: TypeId, consumed: Qualifiers) -> bool {
        let Some((head, qualifiers)) = view(graph, ty) else {
            return false;
        };
        let qualifiers = qualifiers.difference(consumed);

        match self {
            TypeMatcher::Any => true,
            TypeMatcher::Fundamental(expected) => match graph.ty(head) {
                Type::Fundamental(name) => expected.as_deref().is_none_or(|e| e == &**name),
                _ => false,
            },
            TypeMatcher::Void => graph.ty(head).is_void(),
            TypeMatcher::PointerTo(inner) => match graph.ty(head) {
                Type::Pointer(pointee) => inner.matches(graph, *pointee),
                _ => false,
            },
            TypeMatcher::ReferenceTo(inner) => match graph.ty(head) {
                Type::Reference(referent) => inner.matches(graph, *referent),
                _ => false,
            },
            TypeMatcher::ArrayOf(inner) => match graph.ty(head) {
                Type::Array { element, .. } => inner.matches(graph, *element),
                _ => false,
            },
            TypeMatcher::Const(inner) => {
                qualifiers.contains(Qualifiers::CONST)
                    && inner.eval(graph, ty, consumed | Qualifiers::CONST)
            }
            TypeMatcher::Volatile(inner) => {
                qualifiers.contains(Qualifiers::VOLATILE)
                    && inner.eval(graph, ty, consumed | Qualifiers::VOLATILE)
            }
            TypeMatcher::Declared(matcher) => match graph.ty(head) {
                Type::Declared(decl) => matcher.matches(graph, *decl),
                Type::Instantiation { template, .. } => matcher.matches(graph, *template),
                _ => false,
            },
            TypeMatcher::EqualTo(other) => graph.types_equal(ty, *other).unwrap_or(false),
            TypeMatcher::Rendered(text) => graph
                .decl_string(ty)
                .is_ok_and(|rendered| rendered == *text),
            TypeMatcher::All(all) => all.iter().all(|m| m.eval(graph, ty, consumed)),
            TypeMatcher::AnyOf(any) => any.iter().any(|m| m.eval(graph, ty, consumed)),
            TypeMatcher::Not(inner) => !inner.eval(graph, ty, consumed),
        }
    }
}

/// Look through typedefs and cv wrappers, collecting the qualifiers met on
/// the way. Unlike the canonical head, a specialized class stays a class.
fn view(graph: &DeclGraph, ty: TypeId) -> Option<(TypeId, Qualifiers)> {
    let mut current = ty;
    let mut qualifiers = Qualifiers::empty();
    loop {
        let unaliased = ty::strip_aliases(graph, current).ok()?;
        let (inner, found) = ty::strip_qualifiers(graph, unaliased);
        qualifiers |= found;
        if inner == current {
            return Some((current, qualifiers));
        }
        current = inner;
    }
}
