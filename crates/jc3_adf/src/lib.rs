//! This library handles reading from and creating **ADF** containers used by *Just Cause 3*.
//!
//! # ADF Container Format Documentation
//!
//! ADF files are self describing: besides the data itself a container can carry the schema
//! needed to interpret it. Every name and string in the format is identified by its 32 bit
//! Jenkins one-at-a-time hash, see [`hash::hash_jenkins`].
//!
//! ## File Structure
//!
//! A container consists of a fixed header and a comment, followed by instance payloads and four
//! tables located through header relative offsets. The byte order of the whole container is
//! selected by the signature: when it reads as `0x41444620` in little endian the container is
//! little endian, when it reads byte swapped the container is big endian.
//!
//! | Offset (bytes) | Field              | Description                                        |
//! |----------------|--------------------|----------------------------------------------------|
//! | 0x0000         | Magic number       | 4 bytes: 0x41444620 ("ADF ")                       |
//! | 0x0004         | Version            | 4 bytes: Fixed value 4                             |
//! | 0x0008         | Instance Count     | 4 bytes: Number of instances                       |
//! | 0x000C         | Instance Offset    | 4 bytes: Offset to the instance table              |
//! | 0x0010         | Type Count         | 4 bytes: Number of embedded type definitions       |
//! | 0x0014         | Type Offset        | 4 bytes: Offset to the type definition table       |
//! | 0x0018         | String Hash Count  | 4 bytes: Number of string hash entries             |
//! | 0x001C         | String Hash Offset | 4 bytes: Offset to the string hash table           |
//! | 0x0020         | Name Count         | 4 bytes: Number of names                           |
//! | 0x0024         | Name Offset        | 4 bytes: Offset to the name table                  |
//! | 0x0028         | Total Size         | 4 bytes: Size of the whole container               |
//! | 0x002C         | Reserved           | 20 bytes: Five words that must be zero             |
//! | 0x0040         | Comment            | Null terminated string                             |
//!
//! ### Instance Table
//!
//! | Offset (bytes) | Field      | Description                                            |
//! |----------------|------------|--------------------------------------------------------|
//! | 0x0000         | Name Hash  | 4 bytes: Hash of the instance name                     |
//! | 0x0004         | Type Hash  | 4 bytes: Hash of the root type of the payload          |
//! | 0x0008         | Offset     | 4 bytes: Offset of the payload from the header         |
//! | 0x000C         | Size       | 4 bytes: Size of the payload                           |
//! | 0x0010         | Name       | 8 bytes: Index into the name table                     |
//!
//! ### Type Definition Table
//!
//! Each definition starts with its kind, size, alignment, name hash, name index, flags, element
//! type hash and element length, followed by a word that holds the member count of a
//! structure and must be zero for every other kind. Members are stored as name index, type hash,
//! size, offset, default type and default value.
//!
//! ### String Hash Table
//!
//! Null terminated strings, each followed by its hash and a reserved word. The table is written
//! in ascending hash order.
//!
//! ### Name Table
//!
//! One length byte per name, then every name followed by a null terminator.
//!
//! ## Instances
//!
//! A payload starts with its root value. Strings are stored as a 64 bit offset to a null
//! terminated string, out of line arrays as a 64 bit offset followed by a 64 bit element count,
//! all relative to the start of the payload. [`InstanceDecoder`] turns a payload into a
//! [`Document`] and [`InstanceEncoder`] builds a payload back from one.
//!

pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod hash;
pub mod library;
pub mod read;
pub mod string_hash;
pub mod string_table;
pub mod types;
pub mod write;

pub use decode::{DecoderOptions, InstanceDecoder};
pub use document::Document;
pub use encode::{InstanceEncoder, PayloadWriter};
pub use hash::hash_jenkins;
pub use library::{RuntimeTypeLibrary, TypeLibrary};
pub use types::Container;
pub use write::ContainerWriter;
