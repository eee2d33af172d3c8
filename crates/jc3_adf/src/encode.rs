//! Building instance payloads, either by hand or from a [`Document`]

use binrw::{BinWrite, Endian};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::str::FromStr;
use tracing::{instrument, trace};

use crate::document::{ArrayItems, ArrayNode, Document, Node, StructNode, Value};
use crate::error::{EncodeError, Error, Result, UnsupportedTypeError};
use crate::library::TypeLibrary;
use crate::string_hash::StringHashes;
use crate::types::{type_hashes, MemberDefinition, Primitive, TypeDefinition, TypeKind};

/// Growable payload buffer that writes values in a fixed byte order
///
/// Offsets are relative to the start of the payload, which is how members refer to strings and
/// array elements.
///
/// ```
/// # fn doit() -> jc3_adf::error::Result<()> {
/// use jc3_adf::encode::PayloadWriter;
///
/// let mut payload = PayloadWriter::new(binrw::Endian::Little);
/// let root = payload.alloc(16, 8);
/// let name = payload.append_string("hello");
/// payload.write_at(root, &(name as i64))?;
///
/// assert_eq!(&payload.into_inner()[16..], b"hello\0");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PayloadWriter {
    endian: Endian,
    data: Cursor<Vec<u8>>,
}

impl PayloadWriter {
    pub fn new(endian: Endian) -> Self {
        PayloadWriter {
            endian,
            data: Cursor::new(Vec::new()),
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn len(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }

    /// Reserve `size` zeroed bytes on an `alignment` boundary and return their offset
    pub fn alloc(&mut self, size: u64, alignment: u64) -> u64 {
        let offset = self.len().next_multiple_of(alignment.max(1));
        self.data.get_mut().resize((offset + size) as usize, 0);
        offset
    }

    /// Append raw bytes on an `alignment` boundary and return their offset
    pub fn append_bytes(&mut self, bytes: &[u8], alignment: u64) -> u64 {
        let offset = self.alloc(0, alignment);
        self.data.get_mut().extend_from_slice(bytes);
        offset
    }

    /// Append a null terminated string and return its offset
    pub fn append_string(&mut self, text: &str) -> u64 {
        let offset = self.append_bytes(text.as_bytes(), 1);
        self.data.get_mut().push(0);
        offset
    }

    /// Overwrite the bytes at `offset` with `value`
    pub fn write_at<T>(&mut self, offset: u64, value: &T) -> Result<()>
    where
        T: BinWrite,
        for<'x> T::Args<'x>: Default,
    {
        self.data.set_position(offset);
        value.write_options(&mut self.data, self.endian, Default::default())?;
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

/// Encodes documents back into payloads
///
/// Text stored in string hash members is hashed through `string_hashes`, so the entries needed to
/// decode the payload again end up in the container being built.
pub struct InstanceEncoder<'a, L: TypeLibrary + ?Sized> {
    library: &'a L,
    string_hashes: &'a mut StringHashes,
    endian: Endian,
}

impl<'a, L: TypeLibrary + ?Sized> InstanceEncoder<'a, L> {
    pub fn new(library: &'a L, string_hashes: &'a mut StringHashes, endian: Endian) -> Self {
        InstanceEncoder {
            library,
            string_hashes,
            endian,
        }
    }

    /// Lay out `document` as a value of `root_type`
    ///
    /// The root node is placed at offset 0, arrays follow in the order they are referenced.
    #[instrument(skip(self, document), err)]
    pub fn encode(&mut self, root_type: u32, document: &Document) -> Result<Vec<u8>> {
        let library: &'a L = self.library;
        let root = library.resolve(root_type)?;

        let mut arrays = HashMap::new();
        for node in &document.nodes {
            if let Node::Array(array @ ArrayNode { id: Some(id), .. }) = node {
                if arrays.insert(*id, array).is_some() {
                    return Err(EncodeError::DuplicateArray(*id).into());
                }
            }
        }

        let mut layout = Layout {
            library,
            string_hashes: &mut *self.string_hashes,
            arrays,
            payload: PayloadWriter::new(self.endian),
            queue: VecDeque::new(),
        };

        let position = layout.payload.alloc(root.size as u64, root.alignment as u64);
        match (root.kind, document.nodes.first()) {
            (_, None) => return Err(EncodeError::EmptyDocument.into()),
            (TypeKind::Structure, Some(Node::Struct(node))) => {
                layout.encode_struct(root, position, node)?
            }
            (TypeKind::Array, Some(Node::Array(node))) => layout.queue.push_back(PendingArray {
                position,
                definition: root,
                node,
                member: root.name.clone(),
            }),
            (TypeKind::Structure | TypeKind::Array, Some(_)) => {
                return Err(EncodeError::UnexpectedValue {
                    member: root.name.clone(),
                }
                .into())
            }
            (kind, _) => return Err(unsupported(root, kind)),
        }

        while let Some(pending) = layout.queue.pop_front() {
            layout.encode_array(pending)?;
        }

        Ok(layout.payload.into_inner())
    }
}

struct PendingArray<'a, 'doc> {
    position: u64,
    definition: &'a TypeDefinition,
    node: &'doc ArrayNode,
    member: String,
}

struct Layout<'e, 'a, 'doc, L: TypeLibrary + ?Sized> {
    library: &'a L,
    string_hashes: &'e mut StringHashes,
    /// Out of line arrays of the document by id
    arrays: HashMap<u64, &'doc ArrayNode>,
    payload: PayloadWriter,
    queue: VecDeque<PendingArray<'a, 'doc>>,
}

impl<'a, 'doc, L: TypeLibrary + ?Sized> Layout<'_, 'a, 'doc, L> {
    fn encode_struct(
        &mut self,
        definition: &'a TypeDefinition,
        base: u64,
        node: &'doc StructNode,
    ) -> Result<()> {
        for member in &definition.members {
            let value = &node
                .member(&member.name)
                .ok_or_else(|| EncodeError::MissingMember(member.name.clone()))?
                .value;
            self.encode_member(member, base + member.offset as u64, value)?;
        }
        Ok(())
    }

    fn encode_member(
        &mut self,
        member: &MemberDefinition,
        position: u64,
        value: &'doc Value,
    ) -> Result<()> {
        let name = member.name.as_str();

        if let Some(primitive) = Primitive::from_type_hash(member.type_hash) {
            return self.write_scalar(primitive, position, name, scalar(name, value)?);
        }

        if member.type_hash == type_hashes::STRING {
            return self.write_string(position, scalar(name, value)?);
        }

        let library: &'a L = self.library;
        let definition = library.resolve(member.type_hash)?;
        match (definition.kind, value) {
            (TypeKind::Structure, Value::Struct(node)) => {
                self.encode_struct(definition, position, node)
            }
            (TypeKind::Array, Value::Reference(id)) => {
                let node = *self
                    .arrays
                    .get(id)
                    .ok_or(EncodeError::UnknownArray(*id))?;
                trace!(id, member = name, "queued array");
                self.queue.push_back(PendingArray {
                    position,
                    definition,
                    node,
                    member: member.name.clone(),
                });
                Ok(())
            }
            (TypeKind::InlineArray, Value::Array(node)) => {
                let expected = definition.element_length as u64;
                let actual = node.items.len() as u64;
                if expected != actual {
                    return Err(EncodeError::ElementCount { expected, actual }.into());
                }
                self.encode_elements(definition.element_type_hash, position, &node.items, name)
            }
            (TypeKind::StringHash, Value::Scalar(text)) => self.write_string_hash(position, text),
            (
                TypeKind::Structure
                | TypeKind::Array
                | TypeKind::InlineArray
                | TypeKind::StringHash,
                _,
            ) => Err(EncodeError::UnexpectedValue {
                member: member.name.clone(),
            }
            .into()),
            (kind, _) => Err(unsupported(definition, kind)),
        }
    }

    fn encode_array(&mut self, pending: PendingArray<'a, 'doc>) -> Result<()> {
        let (stride, alignment) = self.element_layout(pending.definition.element_type_hash)?;
        let count = pending.node.items.len() as u64;
        let offset = self.payload.alloc(count * stride, alignment);

        self.payload.write_at(pending.position, &(offset as i64))?;
        self.payload.write_at(pending.position + 8, &(count as i64))?;

        self.encode_elements(
            pending.definition.element_type_hash,
            offset,
            &pending.node.items,
            &pending.member,
        )
    }

    fn element_layout(&self, element_type_hash: u32) -> Result<(u64, u64)> {
        if let Some(primitive) = Primitive::from_type_hash(element_type_hash) {
            let size = primitive.size() as u64;
            return Ok((size, size));
        }
        if element_type_hash == type_hashes::STRING {
            return Ok((8, 8));
        }

        let definition = self.library.resolve(element_type_hash)?;
        Ok((definition.size as u64, definition.alignment as u64))
    }

    fn encode_elements(
        &mut self,
        element_type_hash: u32,
        base: u64,
        items: &'doc ArrayItems,
        member: &str,
    ) -> Result<()> {
        let unexpected = || -> Error {
            EncodeError::UnexpectedValue {
                member: member.to_owned(),
            }
            .into()
        };

        if let Some(primitive) = Primitive::from_type_hash(element_type_hash) {
            let ArrayItems::Scalars(values) = items else {
                return Err(unexpected());
            };
            let stride = primitive.size() as u64;
            for (i, text) in values.iter().enumerate() {
                self.write_scalar(primitive, base + i as u64 * stride, member, text)?;
            }
            return Ok(());
        }

        if element_type_hash == type_hashes::STRING {
            let ArrayItems::Scalars(values) = items else {
                return Err(unexpected());
            };
            for (i, text) in values.iter().enumerate() {
                self.write_string(base + i as u64 * 8, text)?;
            }
            return Ok(());
        }

        let library: &'a L = self.library;
        let definition = library.resolve(element_type_hash)?;
        let stride = definition.size as u64;
        match (definition.kind, items) {
            (TypeKind::Structure, ArrayItems::Structs(nodes)) => {
                for (i, node) in nodes.iter().enumerate() {
                    self.encode_struct(definition, base + i as u64 * stride, node)?;
                }
                Ok(())
            }
            (TypeKind::StringHash, ArrayItems::Scalars(values)) => {
                for (i, text) in values.iter().enumerate() {
                    self.write_string_hash(base + i as u64 * stride, text)?;
                }
                Ok(())
            }
            (TypeKind::Structure | TypeKind::StringHash, _) => Err(unexpected()),
            (kind, _) => Err(unsupported(definition, kind)),
        }
    }

    fn write_scalar(
        &mut self,
        primitive: Primitive,
        position: u64,
        member: &str,
        text: &str,
    ) -> Result<()> {
        let payload = &mut self.payload;
        match primitive {
            Primitive::Int8 => payload.write_at(position, &parse::<i8>(member, text)?),
            Primitive::UInt8 => payload.write_at(position, &parse::<u8>(member, text)?),
            Primitive::Int16 => payload.write_at(position, &parse::<i16>(member, text)?),
            Primitive::UInt16 => payload.write_at(position, &parse::<u16>(member, text)?),
            Primitive::Int32 => payload.write_at(position, &parse::<i32>(member, text)?),
            Primitive::UInt32 => payload.write_at(position, &parse::<u32>(member, text)?),
            Primitive::Int64 => payload.write_at(position, &parse::<i64>(member, text)?),
            Primitive::UInt64 => payload.write_at(position, &parse::<u64>(member, text)?),
            Primitive::Float32 => payload.write_at(position, &parse_float::<f32>(member, text)?),
            Primitive::Float64 => payload.write_at(position, &parse_float::<f64>(member, text)?),
        }
    }

    fn write_string(&mut self, position: u64, text: &str) -> Result<()> {
        let offset = self.payload.append_string(text);
        self.payload.write_at(position, &(offset as i64))
    }

    fn write_string_hash(&mut self, position: u64, text: &str) -> Result<()> {
        let hash = self.string_hashes.compute(text)?;
        self.payload.write_at(position, &hash)
    }
}

fn scalar<'v>(member: &str, value: &'v Value) -> Result<&'v str> {
    match value {
        Value::Scalar(text) => Ok(text),
        _ => Err(EncodeError::UnexpectedValue {
            member: member.to_owned(),
        }
        .into()),
    }
}

fn parse<T: FromStr>(member: &str, text: &str) -> Result<T> {
    text.trim().parse().map_err(|_| {
        EncodeError::InvalidScalar {
            member: member.to_owned(),
            value: text.to_owned(),
        }
        .into()
    })
}

fn parse_float<T: FromStr + From<f32>>(member: &str, text: &str) -> Result<T> {
    match text.trim() {
        "NaN" => Ok(T::from(f32::NAN)),
        "Infinity" => Ok(T::from(f32::INFINITY)),
        "-Infinity" => Ok(T::from(f32::NEG_INFINITY)),
        _ => parse(member, text),
    }
}

fn unsupported(definition: &TypeDefinition, kind: TypeKind) -> Error {
    UnsupportedTypeError::Usage {
        name: definition.name.clone(),
        hash: definition.name_hash,
        kind,
    }
    .into()
}
