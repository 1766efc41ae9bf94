//! Matcher Engine
//!
//! A [`Matcher`] is a predicate over one declaration of a frozen graph; a
//! [`TypeMatcher`] is a predicate over one type. Both are plain data: they
//! can be built, compared, printed and serialized without a graph, and are
//! only evaluated against one in [`Matcher::matches`] or a [`Traversal`].
//!
//! ```ignore
//! use declgraph::{Matcher, TypeMatcher, DeclKind, Access};
//!
//! let getters = Matcher::kind(DeclKind::MemberFunction)
//!     & Matcher::access(Access::Public)
//!     & !Matcher::IsVirtual
//!     & Matcher::ReturnType(TypeMatcher::pointer_to(TypeMatcher::declared(Matcher::name("Y"))));
//! ```

mod eval;
mod traverse;

pub use traverse::Traversal;

use crate::types::{Access, DeclKind, TypeId};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Predicate over a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Anything,
    /// Simple name, or the qualified name when the argument contains `::`.
    NameEquals(String),
    /// Regex over the same name [`NameEquals`](Self::NameEquals) would compare.
    NameMatches(NamePattern),
    QualifiedNameEquals(String),
    KindIs(DeclKind),
    AccessIs(Access),
    IsVirtual,
    IsPureVirtual,
    IsStatic,
    /// `const` member function.
    IsConst,
    /// Variable type, typedef target or function return type.
    TypeMatches(TypeMatcher),
    ReturnType(TypeMatcher),
    HasParameter(TypeMatcher),
    ParameterCount(usize),
    /// Some direct or indirect base class matches.
    HasBaseClass(Box<Matcher>),
    ParentIs(Box<Matcher>),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
}

/// Predicate over a type. Typedefs are looked through everywhere; `Const`
/// and `Volatile` inspect top-level qualifiers, which every other variant
/// ignores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMatcher {
    Any,
    Fundamental(Option<String>),
    Void,
    PointerTo(Box<TypeMatcher>),
    ReferenceTo(Box<TypeMatcher>),
    ArrayOf(Box<TypeMatcher>),
    Const(Box<TypeMatcher>),
    Volatile(Box<TypeMatcher>),
    /// Class, union or enum type whose declaration matches.
    Declared(Box<Matcher>),
    /// Structurally equal to a type of the same graph.
    EqualTo(TypeId),
    /// Canonical decl string, e.g. `int const *`.
    Rendered(String),
    All(Vec<TypeMatcher>),
    AnyOf(Vec<TypeMatcher>),
    Not(Box<TypeMatcher>),
}

/// A compiled name regex that serializes as its source.
#[derive(Debug, Clone)]
pub struct NamePattern(Regex);

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for NamePattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        NamePattern::new(&source).map_err(serde::de::Error::custom)
    }
}

impl Matcher {
    pub fn name(name: impl Into<String>) -> Self {
        Matcher::NameEquals(name.into())
    }

    pub fn qualified_name(name: impl Into<String>) -> Self {
        Matcher::QualifiedNameEquals(name.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        NamePattern::new(pattern).map(Matcher::NameMatches)
    }

    pub fn kind(kind: DeclKind) -> Self {
        Matcher::KindIs(kind)
    }

    pub fn access(access: Access) -> Self {
        Matcher::AccessIs(access)
    }

    pub fn of_type(matcher: TypeMatcher) -> Self {
        Matcher::TypeMatches(matcher)
    }

    pub fn has_base(matcher: Matcher) -> Self {
        Matcher::HasBaseClass(Box::new(matcher))
    }

    pub fn parent(matcher: Matcher) -> Self {
        Matcher::ParentIs(Box::new(matcher))
    }

    /// A name that every match must carry, usable to seed a traversal from
    /// the by-name index.
    pub(crate) fn name_hint(&self) -> Option<&str> {
        match self {
            Matcher::NameEquals(name) | Matcher::QualifiedNameEquals(name) => {
                let simple = &name[last_segment_start(name).unwrap_or(0)..];
                // specializations are indexed under the front-end's spelling
                (!simple.is_empty() && !simple.contains('<')).then_some(simple)
            }
            Matcher::And(all) => all.iter().find_map(Matcher::name_hint),
            _ => None,
        }
    }
}

/// Byte offset of the last `::`-separated segment of `name`, or `None` when
/// the name is unqualified. Separators inside template arguments are skipped.
pub(crate) fn last_segment_start(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    let mut depth = 0usize;
    let mut start = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                start = Some(i + 2);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    start
}

impl TypeMatcher {
    pub fn fundamental(name: impl Into<String>) -> Self {
        TypeMatcher::Fundamental(Some(name.into()))
    }

    pub fn pointer_to(inner: TypeMatcher) -> Self {
        TypeMatcher::PointerTo(Box::new(inner))
    }

    pub fn reference_to(inner: TypeMatcher) -> Self {
        TypeMatcher::ReferenceTo(Box::new(inner))
    }

    pub fn array_of(inner: TypeMatcher) -> Self {
        TypeMatcher::ArrayOf(Box::new(inner))
    }

    pub fn constant(inner: TypeMatcher) -> Self {
        TypeMatcher::Const(Box::new(inner))
    }

    pub fn declared(matcher: Matcher) -> Self {
        TypeMatcher::Declared(Box::new(matcher))
    }
}

impl BitAnd for Matcher {
    type Output = Matcher;

    fn bitand(self, rhs: Matcher) -> Matcher {
        match self {
            Matcher::And(mut all) => {
                all.push(rhs);
                Matcher::And(all)
            }
            lhs => Matcher::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Matcher {
    type Output = Matcher;

    fn bitor(self, rhs: Matcher) -> Matcher {
        match self {
            Matcher::Or(mut any) => {
                any.push(rhs);
                Matcher::Or(any)
            }
            lhs => Matcher::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for Matcher {
    type Output = Matcher;

    fn not(self) -> Matcher {
        Matcher::Not(Box::new(self))
    }
}

impl BitAnd for TypeMatcher {
    type Output = TypeMatcher;

    fn bitand(self, rhs: TypeMatcher) -> TypeMatcher {
        match self {
            TypeMatcher::All(mut all) => {
                all.push(rhs);
                TypeMatcher::All(all)
            }
            lhs => TypeMatcher::All(vec![lhs, rhs]),
        }
    }
}

impl BitOr for TypeMatcher {
    type Output = TypeMatcher;

    fn bitor(self, rhs: TypeMatcher) -> TypeMatcher {
        match self {
            TypeMatcher::AnyOf(mut any) => {
                any.push(rhs);
                TypeMatcher::AnyOf(any)
            }
            lhs => TypeMatcher::AnyOf(vec![lhs, rhs]),
        }
    }
}

impl Not for TypeMatcher {
    type Output = TypeMatcher;

    fn not(self) -> TypeMatcher {
        TypeMatcher::Not(Box::new(self))
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
    empty: &str,
) -> fmt::Result {
    if items.is_empty() {
        return f.write_str(empty);
    }
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Anything => f.write_str("*"),
            Matcher::NameEquals(name) => write!(f, "name == {name:?}"),
            Matcher::NameMatches(pattern) => write!(f, "name =~ /{}/", pattern.as_str()),
            Matcher::QualifiedNameEquals(name) => write!(f, "qualified_name == {name:?}"),
            Matcher::KindIs(kind) => write!(f, "kind == {kind}"),
            Matcher::AccessIs(access) => write!(f, "access == {access}"),
            Matcher::IsVirtual => f.write_str("virtual"),
            Matcher::IsPureVirtual => f.write_str("pure_virtual"),
            Matcher::IsStatic => f.write_str("static"),
            Matcher::IsConst => f.write_str("const"),
            Matcher::TypeMatches(ty) => write!(f, "type({ty})"),
            Matcher::ReturnType(ty) => write!(f, "returns({ty})"),
            Matcher::HasParameter(ty) => write!(f, "has_parameter({ty})"),
            Matcher::ParameterCount(n) => write!(f, "parameters == {n}"),
            Matcher::HasBaseClass(base) => write!(f, "has_base({base})"),
            Matcher::ParentIs(parent) => write!(f, "parent({parent})"),
            Matcher::And(all) => write_joined(f, all, " && ", "*"),
            Matcher::Or(any) => write_joined(f, any, " || ", "!*"),
            Matcher::Not(inner) => write!(f, "!{inner}"),
        }
    }
}

impl fmt::Display for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeMatcher::Any => f.write_str("*"),
            TypeMatcher::Fundamental(None) => f.write_str("fundamental"),
            TypeMatcher::Fundamental(Some(name)) => f.write_str(name),
            TypeMatcher::Void => f.write_str("void"),
            TypeMatcher::PointerTo(inner) => write!(f, "{inner} *"),
            TypeMatcher::ReferenceTo(inner) => write!(f, "{inner} &"),
            TypeMatcher::ArrayOf(inner) => write!(f, "{inner}[]"),
            TypeMatcher::Const(inner) => write!(f, "{inner} const"),
            TypeMatcher::Volatile(inner) => write!(f, "{inner} volatile"),
            TypeMatcher::Declared(decl) => write!(f, "decl({decl})"),
            TypeMatcher::EqualTo(ty) => write!(f, "type#{}", ty.value()),
            TypeMatcher::Rendered(text) => write!(f, "{text:?}"),
            TypeMatcher::All(all) => write_joined(f, all, " && ", "*"),
            TypeMatcher::AnyOf(any) => write_joined(f, any, " || ", "!*"),
            TypeMatcher::Not(inner) => write!(f, "!{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators_flatten() {
        let m = Matcher::name("f") & Matcher::IsVirtual & Matcher::IsConst;
        assert!(matches!(&m, Matcher::And(all) if all.len() == 3));

        let m = Matcher::kind(DeclKind::Class) | Matcher::kind(DeclKind::Union);
        assert!(matches!(&m, Matcher::Or(any) if any.len() == 2));

        let m = !Matcher::IsStatic;
        assert_eq!(m, Matcher::Not(Box::new(Matcher::IsStatic)));
    }

    #[test]
    fn test_display() {
        let m = Matcher::name("n::A") & !Matcher::access(Access::Private);
        assert_eq!(m.to_string(), "(name == \"n::A\" && !access == private)");

        let t = TypeMatcher::pointer_to(TypeMatcher::constant(TypeMatcher::fundamental("int")));
        assert_eq!(t.to_string(), "int const *");
    }

    #[test]
    fn test_name_hint() {
        assert_eq!(Matcher::name("n::A").name_hint(), Some("A"));
        assert_eq!(Matcher::name("::A").name_hint(), Some("A"));
        assert_eq!(Matcher::name("std::vector<int>").name_hint(), None);
        assert_eq!(Matcher::name("std::vector<std::string>").name_hint(), None);
        assert_eq!(Matcher::name("n::vector<int>::size").name_hint(), Some("size"));
        assert_eq!(
            (Matcher::kind(DeclKind::Class) & Matcher::name("B")).name_hint(),
            Some("B")
        );
        assert_eq!((Matcher::name("A") | Matcher::name("B")).name_hint(), None);
    }

    #[test]
    fn test_last_segment_skips_template_arguments() {
        assert_eq!(last_segment_start("A"), None);
        assert_eq!(last_segment_start("vector<std::string>"), None);
        assert_eq!(last_segment_start("std::vector<std::string>"), Some(5));
        assert_eq!(last_segment_start("a::b::c"), Some(6));
    }

    #[test]
    fn test_serde_round_trip_keeps_pattern_source() {
        let m = Matcher::pattern("^get_").unwrap()
            & Matcher::ReturnType(TypeMatcher::pointer_to(TypeMatcher::Any))
            & Matcher::has_base(Matcher::name("Base"));

        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"^get_\""));

        let back: Matcher = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        assert!(Matcher::pattern("(").is_err());
        assert!(serde_json::from_str::<Matcher>(r#"{"name_matches":"("}"#).is_err());
    }
}
