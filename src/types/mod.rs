mod id_counter;

pub use id_counter::IdCounter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Common behaviour of the dense, 1-based arena ids.
pub trait ArenaId: Copy {
    fn from_raw(raw: NonZeroU32) -> Self;
    fn value(&self) -> u32;

    /// Slot of this id in its arena.
    fn index(&self) -> usize {
        (self.value() - 1) as usize
    }
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(value: u32) -> Option<Self> {
                if value == 0 { None } else { Some(Self(value)) }
            }

            pub fn value(&self) -> u32 {
                self.0
            }

            /// Slot of this id in its arena.
            pub fn index(&self) -> usize {
                (self.0 - 1) as usize
            }

            /// Convert to the underlying u32 value
            pub fn to_u32(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(raw: NonZeroU32) -> Self {
                Self(raw.get())
            }

            fn value(&self) -> u32 {
                self.0
            }

            fn index(&self) -> usize {
                (self.0 - 1) as usize
            }
        }
    };
}

arena_id!(
    /// Handle of a declaration node in a graph arena.
    DeclId
);
arena_id!(
    /// Handle of a type node in a graph arena.
    TypeId
);
arena_id!(
    /// Translation unit number, in merge order.
    UnitId
);
arena_id!(FileId);

/// Opaque reference id assigned by the front-end (`_1`, `_42`, ...).
///
/// Only stable within the translation unit that produced it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(CompactString);

impl ExternalId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(compact_string(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self(s.into_boxed_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Namespace,
    Class,
    Union,
    Enum,
    Function,
    MemberFunction,
    Constructor,
    Destructor,
    Operator,
    Variable,
    Typedef,
    EnumValue,
}

impl DeclKind {
    /// Kinds that own member declarations.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            DeclKind::Namespace | DeclKind::Class | DeclKind::Union | DeclKind::Enum
        )
    }

    /// Kinds that carry a call signature.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            DeclKind::Function
                | DeclKind::MemberFunction
                | DeclKind::Constructor
                | DeclKind::Destructor
                | DeclKind::Operator
        )
    }

    /// Kinds a `Declared` type may point at.
    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            DeclKind::Class | DeclKind::Union | DeclKind::Enum | DeclKind::Typedef
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Namespace => "Namespace",
            DeclKind::Class => "Class",
            DeclKind::Union => "Union",
            DeclKind::Enum => "Enum",
            DeclKind::Function => "Function",
            DeclKind::MemberFunction => "MemberFunction",
            DeclKind::Constructor => "Constructor",
            DeclKind::Destructor => "Destructor",
            DeclKind::Operator => "Operator",
            DeclKind::Variable => "Variable",
            DeclKind::Typedef => "Typedef",
            DeclKind::EnumValue => "EnumValue",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Namespace" => Ok(DeclKind::Namespace),
            "Class" => Ok(DeclKind::Class),
            "Union" => Ok(DeclKind::Union),
            "Enum" => Ok(DeclKind::Enum),
            "Function" => Ok(DeclKind::Function),
            "MemberFunction" => Ok(DeclKind::MemberFunction),
            "Constructor" => Ok(DeclKind::Constructor),
            "Destructor" => Ok(DeclKind::Destructor),
            "Operator" => Ok(DeclKind::Operator),
            "Variable" => Ok(DeclKind::Variable),
            "Typedef" => Ok(DeclKind::Typedef),
            "EnumValue" => Ok(DeclKind::EnumValue),
            _ => Err("Unknown declaration kind"),
        }
    }
}

/// C++ access specifier of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl FromStr for Access {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" | "Public" => Ok(Access::Public),
            "protected" | "Protected" => Ok(Access::Protected),
            "private" | "Private" => Ok(Access::Private),
            _ => Err("Unknown access specifier"),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        })
    }
}

/// Where a declaration was written, as reported by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: FileId,
    pub line: u32,
}

impl Location {
    pub fn new(file: FileId, line: u32) -> Self {
        Self { file, line }
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        assert!(DeclId::new(0).is_none());

        let id = DeclId::new(42).unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.index(), 41);
        assert_eq!(TypeId::new(7).unwrap().to_u32(), 7);
    }

    #[test]
    fn test_decl_kind_round_trips_through_str() {
        let kinds = [
            DeclKind::Namespace,
            DeclKind::Class,
            DeclKind::Union,
            DeclKind::Enum,
            DeclKind::Function,
            DeclKind::MemberFunction,
            DeclKind::Constructor,
            DeclKind::Destructor,
            DeclKind::Operator,
            DeclKind::Variable,
            DeclKind::Typedef,
            DeclKind::EnumValue,
        ];

        for kind in kinds {
            assert_eq!(kind.as_str().parse::<DeclKind>(), Ok(kind));
        }
        assert!("Struct".parse::<DeclKind>().is_err());
    }

    #[test]
    fn test_kind_classification() {
        assert!(DeclKind::Class.is_scope());
        assert!(!DeclKind::Function.is_scope());
        assert!(DeclKind::Operator.is_callable());
        assert!(DeclKind::Typedef.is_type_declaration());
        assert!(!DeclKind::Variable.is_type_declaration());
    }

    #[test]
    fn test_access_parsing() {
        assert_eq!("public".parse::<Access>(), Ok(Access::Public));
        assert_eq!("protected".parse::<Access>(), Ok(Access::Protected));
        assert_eq!("private".parse::<Access>(), Ok(Access::Private));
        assert!("friend".parse::<Access>().is_err());
        assert_eq!(Access::Protected.to_string(), "protected");
    }

    #[test]
    fn test_external_id_display() {
        let id = ExternalId::new("_42");
        assert_eq!(id.to_string(), "_42");
        assert_eq!(id, ExternalId::from("_42"));
    }
}
