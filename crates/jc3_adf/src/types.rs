//! Base types for the structure of an ADF container and its embedded schema.

use binrw::{BinRead, BinWrite, Endian, NullString};
use derive_more::derive::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result, UnsupportedTypeError};
use crate::hash::hash_jenkins;
use crate::string_hash::StringHashes;

/// Container signature, `'ADF '` when read as a little endian word
pub const SIGNATURE: u32 = 0x41444620;

/// The only container version this library understands
pub const VERSION: u32 = 4;

/// Size of the fixed part of the header, the comment follows it
pub const FIXED_HEADER_SIZE: u64 = 64;

/// Type hashes of the built-in types that never appear as a [`TypeDefinition`]
pub mod type_hashes {
    /// signed 8 bit integer
    pub const INT8: u32 = 0x580D0A62;
    /// unsigned 8 bit integer
    pub const UINT8: u32 = 0x0CA2821D;
    /// signed 16 bit integer
    pub const INT16: u32 = 0xD13FCF93;
    /// unsigned 16 bit integer
    pub const UINT16: u32 = 0x86D152BD;
    /// signed 32 bit integer
    pub const INT32: u32 = 0x192FE633;
    /// unsigned 32 bit integer
    pub const UINT32: u32 = 0x075E4E4F;
    /// signed 64 bit integer
    pub const INT64: u32 = 0xAF41354F;
    /// unsigned 64 bit integer
    pub const UINT64: u32 = 0xA139E01F;
    /// IEEE single precision float
    pub const FLOAT32: u32 = 0x7515A207;
    /// IEEE double precision float
    pub const FLOAT64: u32 = 0xC609F663;
    /// 64 bit offset to a null terminated UTF-8 string
    pub const STRING: u32 = 0x8955583E;
}

/// Built-in scalar types addressed by a fixed type hash
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    #[display("int8")]
    Int8,
    #[display("uint8")]
    UInt8,
    #[display("int16")]
    Int16,
    #[display("uint16")]
    UInt16,
    #[display("int32")]
    Int32,
    #[display("uint32")]
    UInt32,
    #[display("int64")]
    Int64,
    #[display("uint64")]
    UInt64,
    #[display("float")]
    Float32,
    #[display("double")]
    Float64,
}

impl Primitive {
    /// Look up the primitive identified by `type_hash`
    pub fn from_type_hash(type_hash: u32) -> Option<Primitive> {
        Some(match type_hash {
            type_hashes::INT8 => Primitive::Int8,
            type_hashes::UINT8 => Primitive::UInt8,
            type_hashes::INT16 => Primitive::Int16,
            type_hashes::UINT16 => Primitive::UInt16,
            type_hashes::INT32 => Primitive::Int32,
            type_hashes::UINT32 => Primitive::UInt32,
            type_hashes::INT64 => Primitive::Int64,
            type_hashes::UINT64 => Primitive::UInt64,
            type_hashes::FLOAT32 => Primitive::Float32,
            type_hashes::FLOAT64 => Primitive::Float64,
            _ => return None,
        })
    }

    /// The type hash members use to refer to this primitive
    pub const fn type_hash(self) -> u32 {
        match self {
            Primitive::Int8 => type_hashes::INT8,
            Primitive::UInt8 => type_hashes::UINT8,
            Primitive::Int16 => type_hashes::INT16,
            Primitive::UInt16 => type_hashes::UINT16,
            Primitive::Int32 => type_hashes::INT32,
            Primitive::UInt32 => type_hashes::UINT32,
            Primitive::Int64 => type_hashes::INT64,
            Primitive::UInt64 => type_hashes::UINT64,
            Primitive::Float32 => type_hashes::FLOAT32,
            Primitive::Float64 => type_hashes::FLOAT64,
        }
    }

    /// Size of one value in bytes
    pub const fn size(self) -> u32 {
        match self {
            Primitive::Int8 | Primitive::UInt8 => 1,
            Primitive::Int16 | Primitive::UInt16 => 2,
            Primitive::Int32 | Primitive::UInt32 | Primitive::Float32 => 4,
            Primitive::Int64 | Primitive::UInt64 | Primitive::Float64 => 8,
        }
    }
}

/// Kind of a [`TypeDefinition`]
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum TypeKind {
    Primitive = 0,
    Structure = 1,
    Pointer = 2,
    Array = 3,
    InlineArray = 4,
    String = 5,
    BitField = 7,
    Enumeration = 8,
    StringHash = 9,
}

impl TryFrom<u32> for TypeKind {
    type Error = UnsupportedTypeError;

    fn try_from(value: u32) -> core::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => TypeKind::Primitive,
            1 => TypeKind::Structure,
            2 => TypeKind::Pointer,
            3 => TypeKind::Array,
            4 => TypeKind::InlineArray,
            5 => TypeKind::String,
            7 => TypeKind::BitField,
            8 => TypeKind::Enumeration,
            9 => TypeKind::StringHash,
            _ => return Err(UnsupportedTypeError::Kind(value)),
        })
    }
}

/// Schema entry describing how to interpret the bytes of one type
///
/// Identity is [`TypeDefinition::name_hash`], the name only exists for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeDefinition {
    pub kind: TypeKind,
    /// Bytes occupied by one value, used as the stride inside arrays
    pub size: u32,
    pub alignment: u32,
    pub name_hash: u32,
    pub name: String,
    pub flags: u32,
    /// Element type of an array or inline array
    pub element_type_hash: u32,
    /// Fixed element count of an inline array
    pub element_length: u32,
    /// Members of a structure, in declaration order
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub members: Vec<MemberDefinition>,
}

impl TypeDefinition {
    fn new(kind: TypeKind, name: impl Into<String>, size: u32, alignment: u32) -> Self {
        let name = name.into();
        TypeDefinition {
            kind,
            size,
            alignment,
            name_hash: hash_jenkins(&name),
            name,
            flags: 0,
            element_type_hash: 0,
            element_length: 0,
            members: Vec::new(),
        }
    }

    /// Define a structure made of `members`
    pub fn structure(
        name: impl Into<String>,
        size: u32,
        alignment: u32,
        members: Vec<MemberDefinition>,
    ) -> Self {
        TypeDefinition {
            members,
            ..Self::new(TypeKind::Structure, name, size, alignment)
        }
    }

    /// Define an out of line array, stored as a 64 bit offset followed by a 64 bit count
    pub fn array(name: impl Into<String>, element_type_hash: u32) -> Self {
        TypeDefinition {
            element_type_hash,
            ..Self::new(TypeKind::Array, name, 16, 8)
        }
    }

    /// Define an array of `element_length` elements stored in place
    pub fn inline_array(
        name: impl Into<String>,
        element_type_hash: u32,
        element_length: u32,
        element_size: u32,
        alignment: u32,
    ) -> Self {
        TypeDefinition {
            element_type_hash,
            element_length,
            ..Self::new(
                TypeKind::InlineArray,
                name,
                element_size * element_length,
                alignment,
            )
        }
    }

    /// Define a 32 bit string hash
    pub fn string_hash(name: impl Into<String>) -> Self {
        Self::new(TypeKind::StringHash, name, 4, 4)
    }

    /// Replace the hash derived from the name
    pub fn with_name_hash(mut self, name_hash: u32) -> Self {
        self.name_hash = name_hash;
        self
    }

    /// Check that structure members are ordered and stay inside the structure
    pub fn validate(&self) -> Result<()> {
        if self.kind != TypeKind::Structure {
            return Ok(());
        }

        let mut previous = 0u64;
        for member in &self.members {
            let offset = member.offset as u64;
            if offset < previous || offset + member.size as u64 > self.size as u64 {
                return Err(FormatError::MemberOutOfRange {
                    type_name: self.name.clone(),
                    member: member.name.clone(),
                }
                .into());
            }
            previous = offset;
        }

        Ok(())
    }
}

/// A field of a structure
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemberDefinition {
    pub name: String,
    /// A primitive hash from [`type_hashes`] or the hash of another [`TypeDefinition`]
    pub type_hash: u32,
    pub size: u32,
    /// Byte offset from the start of the owning structure
    pub offset: u32,
    pub default_type: u32,
    pub default_value: u64,
}

impl MemberDefinition {
    pub fn new(name: impl Into<String>, type_hash: u32, size: u32, offset: u32) -> Self {
        MemberDefinition {
            name: name.into(),
            type_hash,
            size,
            offset,
            default_type: 0,
            default_value: 0,
        }
    }

    /// Member holding a built-in scalar
    pub fn primitive(name: impl Into<String>, primitive: Primitive, offset: u32) -> Self {
        Self::new(name, primitive.type_hash(), primitive.size(), offset)
    }

    /// Member holding a string offset
    pub fn string(name: impl Into<String>, offset: u32) -> Self {
        Self::new(name, type_hashes::STRING, 8, offset)
    }

    /// Member holding a value of `definition`
    pub fn of(name: impl Into<String>, definition: &TypeDefinition, offset: u32) -> Self {
        Self::new(name, definition.name_hash, definition.size, offset)
    }
}

/// Directory entry locating one named payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub name: String,
    pub name_hash: u32,
    /// Root type of the payload
    pub type_hash: u32,
    /// Offset of the payload from the start of the header
    pub offset: u32,
    pub size: u32,
}

impl InstanceInfo {
    pub fn new(name: impl Into<String>, type_hash: u32, offset: u32, size: u32) -> Self {
        let name = name.into();
        InstanceInfo {
            name_hash: hash_jenkins(&name),
            name,
            type_hash,
            offset,
            size,
        }
    }
}

/// A string recoverable from its hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringHashInfo {
    pub value: String,
    pub value_hash: u32,
    /// Reserved word kept as found
    pub unknown: u32,
}

impl StringHashInfo {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        StringHashInfo {
            value_hash: hash_jenkins(&value),
            value,
            unknown: 0,
        }
    }
}

/// An ADF container: schema, instance directory and string hashes
///
/// The payload bytes are not owned by the container, instances point into the source buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub endian: Endian,
    pub comment: String,
    pub type_definitions: Vec<TypeDefinition>,
    pub instances: Vec<InstanceInfo>,
    pub string_hashes: StringHashes,
}

impl Default for Container {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            comment: Default::default(),
            type_definitions: Default::default(),
            instances: Default::default(),
            string_hashes: Default::default(),
        }
    }
}

impl Container {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            ..Default::default()
        }
    }

    /// Bytes taken by the header including the comment and its terminator
    pub fn header_size(&self) -> u64 {
        FIXED_HEADER_SIZE + self.comment.len() as u64 + 1
    }

    /// Find an instance by name
    pub fn instance(&self, name: &str) -> Option<&InstanceInfo> {
        self.instances.iter().find(|i| i.name == name)
    }
}

/// Container header as stored on disk
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct RawHeader {
    pub signature: u32,
    pub version: u32,
    pub instance_count: u32,
    pub instance_offset: u32,
    pub type_count: u32,
    pub type_offset: u32,
    pub string_hash_count: u32,
    pub string_hash_offset: u32,
    pub name_count: u32,
    pub name_offset: u32,
    pub total_size: u32,
    pub reserved: [u32; 5],
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct RawInstanceInfo {
    pub name_hash: u32,
    pub type_hash: u32,
    pub offset: u32,
    pub size: u32,
    pub name_index: i64,
}

/// Fixed part of a type definition, followed by a kind specific tail
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct RawTypeDefinition {
    pub kind: u32,
    pub size: u32,
    pub alignment: u32,
    pub name_hash: u32,
    pub name_index: i64,
    pub flags: u32,
    pub element_type_hash: u32,
    pub element_length: u32,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct RawMemberDefinition {
    pub name_index: i64,
    pub type_hash: u32,
    pub size: u32,
    pub offset: u32,
    pub default_type: u32,
    pub default_value: u64,
}

#[derive(BinRead, BinWrite, Debug, Clone, Default, PartialEq)]
pub(crate) struct RawStringHashInfo {
    pub value: NullString,
    pub value_hash: u32,
    pub unknown: u32,
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite, Endian};
    use pretty_assertions::assert_eq;

    use crate::error::{Error, FormatError, Result, UnsupportedTypeError};
    use crate::types::{
        MemberDefinition, Primitive, RawInstanceInfo, TypeDefinition, TypeKind, type_hashes,
    };

    #[test]
    fn kind_from_raw() {
        assert_eq!(TypeKind::try_from(1u32), Ok(TypeKind::Structure));
        assert_eq!(TypeKind::try_from(9u32), Ok(TypeKind::StringHash));
        assert_eq!(TypeKind::try_from(6u32), Err(UnsupportedTypeError::Kind(6)));
        assert_eq!(TypeKind::try_from(42u32), Err(UnsupportedTypeError::Kind(42)));
    }

    #[test]
    fn primitive_hashes() {
        for primitive in [
            Primitive::Int8,
            Primitive::UInt8,
            Primitive::Int16,
            Primitive::UInt16,
            Primitive::Int32,
            Primitive::UInt32,
            Primitive::Int64,
            Primitive::UInt64,
            Primitive::Float32,
            Primitive::Float64,
        ] {
            assert_eq!(
                Primitive::from_type_hash(primitive.type_hash()),
                Some(primitive)
            );
        }
        assert_eq!(Primitive::from_type_hash(type_hashes::STRING), None);
    }

    #[test]
    fn validate_members() {
        let ok = TypeDefinition::structure(
            "Pair",
            8,
            4,
            vec![
                MemberDefinition::primitive("a", Primitive::Int32, 0),
                MemberDefinition::primitive("b", Primitive::Float32, 4),
            ],
        );
        assert!(ok.validate().is_ok());

        let overflow = TypeDefinition::structure(
            "Pair",
            6,
            4,
            vec![
                MemberDefinition::primitive("a", Primitive::Int32, 0),
                MemberDefinition::primitive("b", Primitive::Float32, 4),
            ],
        );
        assert!(matches!(
            overflow.validate(),
            Err(Error::Format(FormatError::MemberOutOfRange { .. }))
        ));

        let unordered = TypeDefinition::structure(
            "Pair",
            8,
            4,
            vec![
                MemberDefinition::primitive("b", Primitive::Float32, 4),
                MemberDefinition::primitive("a", Primitive::Int32, 0),
            ],
        );
        assert!(unordered.validate().is_err());
    }

    #[test]
    fn instance_record_endianness() -> Result<()> {
        #[rustfmt::skip]
        let little = vec![
            0x91, 0x38, 0xB4, 0x3E,
            0x33, 0xE6, 0x2F, 0x19,
            0x50, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let record = RawInstanceInfo::read_options(&mut Cursor::new(&little), Endian::Little, ())?;
        assert_eq!(record.name_hash, 0x3EB43891);
        assert_eq!(record.type_hash, type_hashes::INT32);
        assert_eq!(record.offset, 0x50);
        assert_eq!(record.size, 8);

        let mut big = Vec::new();
        record.write_options(&mut Cursor::new(&mut big), Endian::Big, ())?;
        assert_eq!(&big[0..4], &[0x3E, 0xB4, 0x38, 0x91]);
        assert_eq!(
            RawInstanceInfo::read_options(&mut Cursor::new(&big), Endian::Big, ())?,
            record
        );

        Ok(())
    }
}
