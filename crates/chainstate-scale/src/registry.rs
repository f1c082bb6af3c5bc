//! Type descriptors: the schema the dynamic codec walks.
//!
//! A [`TypeRegistry`] maps numeric [`TypeId`]s to [`TypeInfo`] entries. Child
//! types are referenced by id rather than owned, so recursive runtime types
//! (a call enum containing a `Vec` of itself) are representable.

use chainstate_core::error::DecodeError;
use std::collections::HashMap;

/// Index of a type within a [`TypeRegistry`].
pub type TypeId = u32;

/// Primitive types with a fixed (or length-prefixed, for `Str`) layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Char,
    Str,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    I8,
    I16,
    I32,
    I64,
    I128,
    I256,
}

impl Primitive {
    /// Map the metadata discriminant of a primitive to its variant.
    pub fn from_discriminant(d: u8) -> Option<Self> {
        Some(match d {
            0 => Self::Bool,
            1 => Self::Char,
            2 => Self::Str,
            3 => Self::U8,
            4 => Self::U16,
            5 => Self::U32,
            6 => Self::U64,
            7 => Self::U128,
            8 => Self::U256,
            9 => Self::I8,
            10 => Self::I16,
            11 => Self::I32,
            12 => Self::I64,
            13 => Self::I128,
            14 => Self::I256,
            _ => return None,
        })
    }

    /// Inverse of [`Primitive::from_discriminant`].
    pub fn discriminant(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Char => 1,
            Self::Str => 2,
            Self::U8 => 3,
            Self::U16 => 4,
            Self::U32 => 5,
            Self::U64 => 6,
            Self::U128 => 7,
            Self::U256 => 8,
            Self::I8 => 9,
            Self::I16 => 10,
            Self::I32 => 11,
            Self::I64 => 12,
            Self::I128 => 13,
            Self::I256 => 14,
        }
    }

    /// Encoded width in bytes; `None` for the length-prefixed `Str`.
    pub fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::Char | Self::U32 | Self::I32 => Some(4),
            Self::U64 | Self::I64 => Some(8),
            Self::U128 | Self::I128 => Some(16),
            Self::U256 | Self::I256 => Some(32),
            Self::Str => None,
        }
    }

    /// Returns `true` for unsigned integer types (valid `Compact` payloads).
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::U128 | Self::U256
        )
    }
}

/// A named or positional field of a composite or variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub ty: TypeId,
    /// Source-level type name, e.g. `T::AccountId`. Informational only.
    pub type_name: Option<String>,
    pub docs: Vec<String>,
}

impl Field {
    pub fn named(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            type_name: None,
            docs: Vec::new(),
        }
    }

    pub fn unnamed(ty: TypeId) -> Self {
        Self {
            name: None,
            ty,
            type_name: None,
            docs: Vec::new(),
        }
    }
}

/// One case of an enum type, selected on the wire by `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub fields: Vec<Field>,
    pub index: u8,
    pub docs: Vec<String>,
}

impl Variant {
    pub fn new(index: u8, name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            index,
            docs: Vec::new(),
        }
    }
}

/// The shape of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    /// Struct: fields in declaration order.
    Composite(Vec<Field>),
    /// Enum: one-byte discriminant, then the fields of the selected variant.
    Variant(Vec<Variant>),
    /// Compact length prefix followed by that many elements.
    Sequence(TypeId),
    /// Exactly `len` elements, no prefix.
    Array { len: u32, elem: TypeId },
    Tuple(Vec<TypeId>),
    Primitive(Primitive),
    /// Compact-encoded unsigned integer (or a single-field wrapper of one).
    Compact(TypeId),
    /// Compact bit count followed by the backing store words.
    BitSequence { store: TypeId, order: TypeId },
}

/// A generic parameter of a type, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub ty: Option<TypeId>,
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub id: TypeId,
    /// Fully qualified path, e.g. `["frame_system", "AccountInfo"]`.
    pub path: Vec<String>,
    pub params: Vec<TypeParam>,
    pub def: TypeDef,
    pub docs: Vec<String>,
}

impl TypeInfo {
    pub fn new(id: TypeId, def: TypeDef) -> Self {
        Self {
            id,
            path: Vec::new(),
            params: Vec::new(),
            def,
            docs: Vec::new(),
        }
    }

    /// `::`-joined path, or `None` for anonymous types.
    pub fn path_string(&self) -> Option<String> {
        (!self.path.is_empty()).then(|| self.path.join("::"))
    }
}

/// Lookup table from type id to descriptor. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_id: HashMap<TypeId, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from entries carrying their own ids.
    /// A later entry with a duplicate id replaces the earlier one.
    pub fn from_types(types: impl IntoIterator<Item = TypeInfo>) -> Self {
        let mut registry = Self::new();
        for info in types {
            registry.insert(info);
        }
        registry
    }

    pub fn insert(&mut self, info: TypeInfo) {
        match self.by_id.get(&info.id) {
            Some(&pos) => self.types[pos] = info,
            None => {
                self.by_id.insert(info.id, self.types.len());
                self.types.push(info);
            }
        }
    }

    /// Append `def` under the next free id and return that id.
    pub fn push(&mut self, def: TypeDef) -> TypeId {
        let id = self.next_id();
        self.insert(TypeInfo::new(id, def));
        id
    }

    /// Like [`TypeRegistry::push`] but with a type path.
    pub fn push_named(&mut self, path: &[&str], def: TypeDef) -> TypeId {
        let id = self.next_id();
        let mut info = TypeInfo::new(id, def);
        info.path = path.iter().map(|s| s.to_string()).collect();
        self.insert(info);
        id
    }

    fn next_id(&self) -> TypeId {
        self.by_id.keys().max().map_or(0, |max| max + 1)
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.by_id.get(&id).map(|&pos| &self.types[pos])
    }

    /// Like [`TypeRegistry::get`] but fails with `TypeNotFound`.
    pub fn resolve(&self, id: TypeId) -> Result<&TypeInfo, DecodeError> {
        self.get(id).ok_or(DecodeError::TypeNotFound { id })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    /// Returns `true` if `id` is the `u8` primitive.
    pub fn is_byte(&self, id: TypeId) -> bool {
        matches!(
            self.get(id).map(|t| &t.def),
            Some(TypeDef::Primitive(Primitive::U8))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_sequential_ids() {
        let mut reg = TypeRegistry::new();
        let u8_id = reg.push(TypeDef::Primitive(Primitive::U8));
        let vec_id = reg.push(TypeDef::Sequence(u8_id));
        assert_eq!((u8_id, vec_id), (0, 1));
        assert!(reg.is_byte(u8_id));
        assert!(!reg.is_byte(vec_id));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn resolve_missing_type() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.resolve(42), Err(DecodeError::TypeNotFound { id: 42 }));
    }

    #[test]
    fn primitive_discriminants_roundtrip() {
        for d in 0..=14u8 {
            let p = Primitive::from_discriminant(d).unwrap();
            assert_eq!(p.discriminant(), d);
        }
        assert!(Primitive::from_discriminant(15).is_none());
        assert_eq!(Primitive::U256.width(), Some(32));
        assert_eq!(Primitive::Str.width(), None);
    }

    #[test]
    fn sparse_ids_and_paths() {
        let mut info = TypeInfo::new(7, TypeDef::Primitive(Primitive::U32));
        info.path = vec!["sp_core".into(), "BlockNumber".into()];
        let reg = TypeRegistry::from_types([info]);
        assert_eq!(reg.resolve(7).unwrap().path_string().unwrap(), "sp_core::BlockNumber");
        assert!(reg.get(0).is_none());
    }
}
