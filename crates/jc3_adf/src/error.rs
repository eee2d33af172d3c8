//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// file is not a valid adf container
    #[error("file is not a valid adf container")]
    Format(#[from] FormatError),

    /// type is not supported
    #[error("type is not supported")]
    UnsupportedType(#[from] UnsupportedTypeError),

    /// unable to resolve type {0:#010X}
    #[error("unable to resolve type {0:#010X}")]
    UnresolvedType(u32),

    /// unable to encode instance
    #[error("unable to encode instance")]
    Encode(#[from] EncodeError),
}

/// Error type to provide further information when the container bytes are malformed
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// signature {0:#010X} does not match in either byte order
    #[error("signature {0:#010X} does not match in either byte order")]
    Signature(u32),

    /// version {0} is not supported
    #[error("version {0} is not supported")]
    Version(u32),

    /// reserved header word at {offset:#X} is {value:#X}
    #[error("reserved header word at {offset:#X} is {value:#X}")]
    ReservedField {
        /// offset of the word from the start of the header
        offset: u64,
        /// value that was found
        value: u32,
    },

    /// container claims {expected} bytes but only {available} are available
    #[error("container claims {expected} bytes but only {available} are available")]
    Truncated {
        /// size stored in the header
        expected: u64,
        /// bytes left in the stream
        available: u64,
    },

    /// {section} table at {offset:#X} lies outside of the container
    #[error("{section} table at {offset:#X} lies outside of the container")]
    SectionOutOfRange {
        /// name of the section
        section: &'static str,
        /// header relative offset
        offset: u32,
    },

    /// name index {0} is out of range
    #[error("name index {0} is out of range")]
    NameIndexOutOfRange(i64),

    /// name {0:?} is longer than 255 bytes
    #[error("name {0:?} is longer than 255 bytes")]
    NameTooLong(String),

    /// unexpected trailing value {value:#X} for type {type_hash:#010X}
    #[error("unexpected trailing value {value:#X} for type {type_hash:#010X}")]
    UnexpectedTypeData {
        /// hash of the type being read
        type_hash: u32,
        /// value that was found
        value: u32,
    },

    /// member {member} of {type_name} does not fit the structure
    #[error("member {member} of {type_name} does not fit the structure")]
    MemberOutOfRange {
        /// structure name
        type_name: String,
        /// member name
        member: String,
    },

    /// instance {name} does not fit the container
    #[error("instance {name} does not fit the container")]
    InstanceOutOfRange {
        /// instance name
        name: String,
    },

    /// string hash {hash:#010X} registered as both {existing:?} and {value:?}
    #[error("string hash {hash:#010X} registered as both {existing:?} and {value:?}")]
    StringHashConflict {
        /// conflicting hash
        hash: u32,
        /// text already registered
        existing: String,
        /// text that was rejected
        value: String,
    },

    /// type {0:#010X} registered twice with different definitions
    #[error("type {0:#010X} registered twice with different definitions")]
    TypeConflict(u32),

    /// {0:?} is not a valid hash literal
    #[error("{0:?} is not a valid hash literal")]
    HashLiteral(String),

    /// array at {offset:#X} with {count} elements is invalid
    #[error("array at {offset:#X} with {count} elements is invalid")]
    InvalidArray {
        /// element offset relative to the instance
        offset: i64,
        /// element count
        count: i64,
    },

    /// array of {count} elements exceeds the limit of {limit}
    #[error("array of {count} elements exceeds the limit of {limit}")]
    ArrayTooLarge {
        /// element count
        count: u64,
        /// configured limit
        limit: u64,
    },

    /// string offset {0:#X} lies outside of the instance
    #[error("string offset {0:#X} lies outside of the instance")]
    StringOutOfRange(i64),

    /// more than {0} work items were queued
    #[error("more than {0} work items were queued")]
    WorkLimitExceeded(usize),

    /// type {0:#010X} contains itself inline
    #[error("type {0:#010X} contains itself inline")]
    RecursiveType(u32),

    /// structures are nested deeper than {0}
    #[error("structures are nested deeper than {0}")]
    DepthExceeded(usize),

    /// header needs {required} bytes but only {available} were reserved
    #[error("header needs {required} bytes but only {available} were reserved")]
    HeaderOverlap {
        /// bytes the header needs
        required: u64,
        /// bytes between the header position and the first section
        available: u64,
    },
}

/// Error type to provide further information when a type cannot be handled
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum UnsupportedTypeError {
    /// unknown type kind {0}
    #[error("unknown type kind {0}")]
    Kind(u32),

    /// type {name} ({hash:#010X}) of kind {kind} cannot be used here
    #[error("type {name} ({hash:#010X}) of kind {kind} cannot be used here")]
    Usage {
        /// debug name of the type
        name: String,
        /// hash of the type
        hash: u32,
        /// kind of the type
        kind: crate::types::TypeKind,
    },
}

/// Error type to provide further information when a document cannot be encoded
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// member {0} is missing from the document
    #[error("member {0} is missing from the document")]
    MissingMember(String),

    /// member {member} holds a value of the wrong shape
    #[error("member {member} holds a value of the wrong shape")]
    UnexpectedValue {
        /// member name
        member: String,
    },

    /// {value:?} is not a valid value for {member}
    #[error("{value:?} is not a valid value for {member}")]
    InvalidScalar {
        /// member name
        member: String,
        /// text that failed to parse
        value: String,
    },

    /// array #{0} is not part of the document
    #[error("array #{0} is not part of the document")]
    UnknownArray(u64),

    /// array #{0} appears more than once in the document
    #[error("array #{0} appears more than once in the document")]
    DuplicateArray(u64),

    /// expected {expected} elements but found {actual}
    #[error("expected {expected} elements but found {actual}")]
    ElementCount {
        /// fixed element count of the inline array
        expected: u64,
        /// elements present in the document
        actual: u64,
    },

    /// document has no root node
    #[error("document has no root node")]
    EmptyDocument,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
