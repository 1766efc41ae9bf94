//! Declaration nodes
//!
//! A [`Declaration`] is one named C++ program element. Kind-specific data lives
//! in [`DeclDetails`]; scopes hold their members as ordered id lists, and every
//! declaration except the global namespace points back at its owning scope.
//! Qualified names are never stored: they are derived by walking `parent`.

use crate::types::{Access, CompactString, DeclId, DeclKind, ExternalId, Location, TypeId, UnitId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclKind,
    /// Spelling as written; empty for anonymous entities.
    pub name: CompactString,
    /// Unit whose registry first bound this declaration.
    pub unit: UnitId,
    pub external_id: ExternalId,
    pub parent: Option<DeclId>,
    /// Access of a class member; `None` outside classes.
    pub access: Option<Access>,
    pub location: Option<Location>,
    /// Internal name synthesized for anonymous namespaces, classes, unions
    /// and enums. Never part of qualified-name output.
    pub anonymous: Option<CompactString>,
    pub details: DeclDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeclDetails {
    Namespace(ScopeData),
    Class(ClassData),
    Enum(EnumData),
    EnumValue(EnumValueData),
    Callable(CallableData),
    Variable(VariableData),
    Typedef(TypedefData),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeData {
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

impl ClassKey {
    /// Access of members declared without an explicit specifier.
    pub fn default_access(&self) -> Access {
        match self {
            ClassKey::Class => Access::Private,
            ClassKey::Struct | ClassKey::Union => Access::Public,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseSpec {
    pub class: DeclId,
    pub access: Access,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassData {
    pub key: ClassKey,
    pub members: Vec<DeclId>,
    pub bases: Vec<BaseSpec>,
    /// False for a forward declaration.
    pub is_complete: bool,
    pub is_abstract: bool,
    pub size: Option<u64>,
    /// Set when the class is a template specialization.
    pub instantiates: Option<TypeId>,
    /// Typedefs whose alias-stripped type names this class.
    pub aliases: Vec<DeclId>,
}

impl ClassData {
    pub fn new(key: ClassKey) -> Self {
        Self {
            key,
            members: Vec::new(),
            bases: Vec::new(),
            is_complete: true,
            is_abstract: false,
            size: None,
            instantiates: None,
            aliases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumData {
    pub values: Vec<DeclId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumValueData {
    /// Initializer exactly as the front-end printed it.
    pub value: CompactString,
}

bitflags! {
    /// Specifiers of a function-like declaration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CallableFlags: u16 {
        const VIRTUAL      = 1 << 0;
        const PURE_VIRTUAL = 1 << 1;
        const STATIC       = 1 << 2;
        const CONST        = 1 << 3;
        const VOLATILE     = 1 << 4;
        const INLINE       = 1 << 5;
        const EXPLICIT     = 1 << 6;
        const EXTERN       = 1 << 7;
        const ARTIFICIAL   = 1 << 8;
        const NOEXCEPT     = 1 << 9;
        const ELLIPSIS     = 1 << 10;
        /// Declared inside a class (operators and conversions).
        const MEMBER       = 1 << 11;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Empty for unnamed parameters.
    pub name: CompactString,
    pub ty: TypeId,
    pub default_value: Option<CompactString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallableData {
    /// `None` for constructors and destructors.
    pub return_type: Option<TypeId>,
    pub parameters: Vec<Parameter>,
    pub flags: CallableFlags,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct VariableFlags: u8 {
        const STATIC  = 1 << 0;
        const EXTERN  = 1 << 1;
        const MUTABLE = 1 << 2;
        /// Came from a data member (`Field`) record.
        const MEMBER  = 1 << 3;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableData {
    pub ty: TypeId,
    pub flags: VariableFlags,
    pub bits: Option<u32>,
    pub init: Option<CompactString>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefData {
    pub aliased: TypeId,
}

impl Declaration {
    pub fn is_anonymous(&self) -> bool {
        self.anonymous.is_some()
    }

    /// Ordered member list of a scope; empty for non-scopes.
    pub fn members(&self) -> &[DeclId] {
        match &self.details {
            DeclDetails::Namespace(scope) => &scope.members,
            DeclDetails::Class(class) => &class.members,
            DeclDetails::Enum(data) => &data.values,
            _ => &[],
        }
    }

    pub(crate) fn members_mut(&mut self) -> Option<&mut Vec<DeclId>> {
        match &mut self.details {
            DeclDetails::Namespace(scope) => Some(&mut scope.members),
            DeclDetails::Class(class) => Some(&mut class.members),
            DeclDetails::Enum(data) => Some(&mut data.values),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.details {
            DeclDetails::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&CallableData> {
        match &self.details {
            DeclDetails::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableData> {
        match &self.details {
            DeclDetails::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_typedef(&self) -> Option<&TypedefData> {
        match &self.details {
            DeclDetails::Typedef(typedef) => Some(typedef),
            _ => None,
        }
    }

    /// Base-class specifiers in declaration order.
    pub fn bases(&self) -> &[BaseSpec] {
        self.as_class().map(|class| class.bases.as_slice()).unwrap_or(&[])
    }

    /// Typedefs bound to this class.
    pub fn aliases(&self) -> &[DeclId] {
        self.as_class().map(|class| class.aliases.as_slice()).unwrap_or(&[])
    }

    /// The type most naturally associated with the declaration: a variable's
    /// type, a typedef's aliased type or a function's return type.
    pub fn value_type(&self) -> Option<TypeId> {
        match &self.details {
            DeclDetails::Variable(variable) => Some(variable.ty),
            DeclDetails::Typedef(typedef) => Some(typedef.aliased),
            DeclDetails::Callable(callable) => callable.return_type,
            _ => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.as_callable()
            .is_some_and(|c| c.flags.intersects(CallableFlags::VIRTUAL | CallableFlags::PURE_VIRTUAL))
    }

    pub fn is_pure_virtual(&self) -> bool {
        self.as_callable()
            .is_some_and(|c| c.flags.contains(CallableFlags::PURE_VIRTUAL))
    }

    pub fn is_static(&self) -> bool {
        match &self.details {
            DeclDetails::Callable(c) => c.flags.contains(CallableFlags::STATIC),
            DeclDetails::Variable(v) => v.flags.contains(VariableFlags::STATIC),
            _ => false,
        }
    }

    pub fn is_const(&self) -> bool {
        self.as_callable()
            .is_some_and(|c| c.flags.contains(CallableFlags::CONST))
    }
}
