//! Turning instance payloads into [`Document`]s
//!
//! Structures are decoded in place as they are met, out of line arrays are deferred to a FIFO
//! work queue and linked back to the member that referenced them through a decode local id.

use binrw::BinRead;
use bon::Builder;
use std::collections::VecDeque;
use std::fmt::Display;
use std::io::Cursor;
use tracing::{instrument, trace};

use crate::document::{ArrayItems, ArrayNode, Document, MemberNode, Node, StructNode, Value};
use crate::error::{Error, FormatError, Result, UnsupportedTypeError};
use crate::library::TypeLibrary;
use crate::types::{
    type_hashes, Container, InstanceInfo, MemberDefinition, Primitive, TypeDefinition, TypeKind,
};

/// Ceilings applied before anything is allocated on behalf of the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct DecoderOptions {
    /// Largest element count accepted for a single array
    #[builder(default = 1 << 24)]
    pub max_array_length: u64,

    /// Largest number of work items queued while decoding one instance
    #[builder(default = 1 << 20)]
    pub max_work_items: usize,

    /// Deepest nesting of inline structures
    #[builder(default = 128)]
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Render a float as the shortest decimal that reads back to the same value
pub fn format_float<T: Into<f64> + Display + Copy>(value: T) -> String {
    let wide: f64 = value.into();
    if wide.is_nan() {
        "NaN".to_owned()
    } else if wide.is_infinite() {
        let text = if wide > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_owned()
    } else {
        value.to_string()
    }
}

/// Decodes the instances of one container
///
/// Types are looked up in `library` first and then in the container's own definitions.
///
/// ```no_run
/// # fn doit(data: &[u8]) -> jc3_adf::error::Result<()> {
/// use jc3_adf::{Container, InstanceDecoder, RuntimeTypeLibrary};
///
/// let adf = Container::from_bytes(data)?;
/// let library = RuntimeTypeLibrary::new();
/// let decoder = InstanceDecoder::new(&adf, &library, Default::default());
///
/// for document in decoder.decode_all(data)? {
///     println!("{:?}", document.root());
/// }
/// # Ok(())
/// # }
/// ```
pub struct InstanceDecoder<'a, L: TypeLibrary + ?Sized> {
    container: &'a Container,
    library: &'a L,
    options: DecoderOptions,
}

impl<'a, L: TypeLibrary + ?Sized> InstanceDecoder<'a, L> {
    pub fn new(container: &'a Container, library: &'a L, options: DecoderOptions) -> Self {
        InstanceDecoder {
            container,
            library,
            options,
        }
    }

    fn resolve(&self, type_hash: u32) -> Result<&'a TypeDefinition> {
        let library: &'a L = self.library;
        match library.resolve(type_hash) {
            Err(Error::UnresolvedType(_)) => self.container.resolve(type_hash),
            other => other,
        }
    }

    /// Decode `data` as a value of `root_type`, with every offset relative to the start of `data`
    #[instrument(skip(self, data), fields(size = data.len()), err)]
    pub fn decode(&self, root_type: u32, name: &str, data: &[u8]) -> Result<Document> {
        let root = self.resolve(root_type)?;

        let mut walk = Walk {
            decoder: self,
            cursor: Cursor::new(data),
            size: data.len() as u64,
            queue: VecDeque::new(),
            next_id: 0,
            open: Vec::new(),
        };
        walk.enqueue(0, root, Some(name.to_owned()))?;

        let mut nodes = Vec::new();
        while let Some(item) = walk.queue.pop_front() {
            trace!(id = item.id, offset = item.offset, ty = %item.definition.name, "work item");
            let node = match item.definition.kind {
                TypeKind::Structure => Node::Struct(walk.decode_struct(
                    item.definition,
                    item.offset,
                    item.name,
                    Some(item.id),
                )?),
                TypeKind::Array => {
                    Node::Array(walk.decode_array(item.definition, item.offset, item.id)?)
                }
                kind => return Err(unsupported(item.definition, kind)),
            };
            nodes.push(node);
        }

        Ok(Document::new(nodes))
    }

    /// Decode one instance out of the bytes of the whole container
    pub fn decode_instance(&self, info: &InstanceInfo, container_bytes: &[u8]) -> Result<Document> {
        let start = info.offset as usize;
        let data = start
            .checked_add(info.size as usize)
            .and_then(|end| container_bytes.get(start..end))
            .ok_or_else(|| FormatError::InstanceOutOfRange {
                name: info.name.clone(),
            })?;

        self.decode(info.type_hash, &info.name, data)
    }

    /// Decode every instance in directory order
    pub fn decode_all(&self, container_bytes: &[u8]) -> Result<Vec<Document>> {
        self.container
            .instances
            .iter()
            .map(|info| self.decode_instance(info, container_bytes))
            .collect()
    }
}

struct WorkItem<'a> {
    offset: u64,
    definition: &'a TypeDefinition,
    name: Option<String>,
    id: u64,
}

/// State of a single decode call
struct Walk<'d, 'a, L: TypeLibrary + ?Sized> {
    decoder: &'d InstanceDecoder<'a, L>,
    cursor: Cursor<&'d [u8]>,
    size: u64,
    queue: VecDeque<WorkItem<'a>>,
    next_id: u64,
    /// Structures currently being decoded inline, outermost first
    open: Vec<u32>,
}

impl<'a, L: TypeLibrary + ?Sized> Walk<'_, 'a, L> {
    fn enqueue(
        &mut self,
        offset: u64,
        definition: &'a TypeDefinition,
        name: Option<String>,
    ) -> Result<u64> {
        let limit = self.decoder.options.max_work_items;
        if self.next_id as usize >= limit {
            return Err(FormatError::WorkLimitExceeded(limit).into());
        }

        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(WorkItem {
            offset,
            definition,
            name,
            id,
        });
        Ok(id)
    }

    fn read<T>(&mut self, offset: u64) -> Result<T>
    where
        T: BinRead,
        for<'x> T::Args<'x>: Default,
    {
        self.cursor.set_position(offset);
        Ok(T::read_options(
            &mut self.cursor,
            self.decoder.container.endian,
            Default::default(),
        )?)
    }

    fn decode_struct(
        &mut self,
        definition: &'a TypeDefinition,
        base: u64,
        name: Option<String>,
        id: Option<u64>,
    ) -> Result<StructNode> {
        if self.open.contains(&definition.name_hash) {
            return Err(FormatError::RecursiveType(definition.name_hash).into());
        }
        let limit = self.decoder.options.max_depth;
        if self.open.len() >= limit {
            return Err(FormatError::DepthExceeded(limit).into());
        }

        self.open.push(definition.name_hash);
        let members = definition
            .members
            .iter()
            .map(|member| {
                let value = self.decode_member(member, base + member.offset as u64)?;
                Ok(MemberNode::new(member.name.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;
        self.open.pop();

        Ok(StructNode {
            type_name: definition.name.clone(),
            name,
            id,
            members,
        })
    }

    fn decode_member(&mut self, member: &MemberDefinition, position: u64) -> Result<Value> {
        if let Some(primitive) = Primitive::from_type_hash(member.type_hash) {
            return Ok(Value::Scalar(self.read_scalar(primitive, position)?));
        }

        if member.type_hash == type_hashes::STRING {
            return Ok(Value::Scalar(self.read_string(position)?));
        }

        let definition = self.decoder.resolve(member.type_hash)?;
        Ok(match definition.kind {
            TypeKind::Structure => {
                Value::Struct(self.decode_struct(definition, position, None, None)?)
            }
            TypeKind::Array => Value::Reference(self.enqueue(position, definition, None)?),
            TypeKind::InlineArray => {
                let count = definition.element_length as u64;
                self.check_length(count)?;
                Value::Array(ArrayNode {
                    id: None,
                    items: self.decode_elements(definition.element_type_hash, position, count)?,
                })
            }
            TypeKind::StringHash => Value::Scalar(self.read_string_hash(position)?),
            kind => return Err(unsupported(definition, kind)),
        })
    }

    fn decode_array(
        &mut self,
        definition: &TypeDefinition,
        position: u64,
        id: u64,
    ) -> Result<ArrayNode> {
        let offset = self.read::<i64>(position)?;
        let count = self.read::<i64>(position + 8)?;
        if offset < 0 || count < 0 {
            return Err(FormatError::InvalidArray { offset, count }.into());
        }
        self.check_length(count as u64)?;

        Ok(ArrayNode {
            id: Some(id),
            items: self.decode_elements(
                definition.element_type_hash,
                offset as u64,
                count as u64,
            )?,
        })
    }

    fn decode_elements(
        &mut self,
        element_type_hash: u32,
        base: u64,
        count: u64,
    ) -> Result<ArrayItems> {
        if let Some(primitive) = Primitive::from_type_hash(element_type_hash) {
            let stride = primitive.size() as u64;
            self.check_range(base, count, stride)?;
            return Ok(ArrayItems::Scalars(
                (0..count)
                    .map(|i| self.read_scalar(primitive, base + i * stride))
                    .collect::<Result<_>>()?,
            ));
        }

        if element_type_hash == type_hashes::STRING {
            self.check_range(base, count, 8)?;
            return Ok(ArrayItems::Scalars(
                (0..count)
                    .map(|i| self.read_string(base + i * 8))
                    .collect::<Result<_>>()?,
            ));
        }

        let definition = self.decoder.resolve(element_type_hash)?;
        let stride = definition.size as u64;
        match definition.kind {
            TypeKind::Structure => {
                self.check_range(base, count, stride)?;
                Ok(ArrayItems::Structs(
                    (0..count)
                        .map(|i| self.decode_struct(definition, base + i * stride, None, None))
                        .collect::<Result<_>>()?,
                ))
            }
            TypeKind::StringHash => {
                self.check_range(base, count, stride)?;
                Ok(ArrayItems::Scalars(
                    (0..count)
                        .map(|i| self.read_string_hash(base + i * stride))
                        .collect::<Result<_>>()?,
                ))
            }
            kind => Err(unsupported(definition, kind)),
        }
    }

    fn check_length(&self, count: u64) -> Result<()> {
        let limit = self.decoder.options.max_array_length;
        if count > limit {
            return Err(FormatError::ArrayTooLarge { count, limit }.into());
        }
        Ok(())
    }

    /// Elements must lie inside the payload, empty element types still count one byte each
    fn check_range(&self, base: u64, count: u64, stride: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        match count.checked_mul(stride.max(1)).and_then(|n| n.checked_add(base)) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(FormatError::InvalidArray {
                offset: base as i64,
                count: count as i64,
            }
            .into()),
        }
    }

    fn read_scalar(&mut self, primitive: Primitive, position: u64) -> Result<String> {
        Ok(match primitive {
            Primitive::Int8 => self.read::<i8>(position)?.to_string(),
            Primitive::UInt8 => self.read::<u8>(position)?.to_string(),
            Primitive::Int16 => self.read::<i16>(position)?.to_string(),
            Primitive::UInt16 => self.read::<u16>(position)?.to_string(),
            Primitive::Int32 => self.read::<i32>(position)?.to_string(),
            Primitive::UInt32 => self.read::<u32>(position)?.to_string(),
            Primitive::Int64 => self.read::<i64>(position)?.to_string(),
            Primitive::UInt64 => self.read::<u64>(position)?.to_string(),
            Primitive::Float32 => format_float(self.read::<f32>(position)?),
            Primitive::Float64 => format_float(self.read::<f64>(position)?),
        })
    }

    fn read_string(&mut self, position: u64) -> Result<String> {
        let offset = self.read::<i64>(position)?;
        let data = *self.cursor.get_ref();

        let bytes = usize::try_from(offset)
            .ok()
            .and_then(|start| data.get(start..))
            .and_then(|rest| rest.iter().position(|&c| c == b'\0').map(|end| &rest[..end]))
            .ok_or(FormatError::StringOutOfRange(offset))?;

        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn read_string_hash(&mut self, position: u64) -> Result<String> {
        let hash = self.read::<u32>(position)?;
        Ok(self.decoder.container.string_hashes.resolve(hash))
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

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use crate::decode::{format_float, DecoderOptions, InstanceDecoder};
    use crate::document::{ArrayItems, Value};
    use crate::error::{Error, FormatError, Result};
    use crate::library::RuntimeTypeLibrary;
    use crate::types::{type_hashes, Container, MemberDefinition, Primitive, TypeDefinition};

    #[test]
    fn float_text() {
        assert_eq!(format_float(3.5f32), "3.5");
        assert_eq!(format_float(0.1f32), "0.1");
        assert_eq!(format_float(42.0f32), "42");
        assert_eq!(format_float(-0.25f64), "-0.25");
        assert_eq!(format_float(f32::NAN), "NaN");
        assert_eq!(format_float(f32::INFINITY), "Infinity");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn default_options() {
        let options = DecoderOptions::default();
        assert_eq!(options.max_array_length, 1 << 24);
        assert_eq!(options.max_work_items, 1 << 20);
        assert_eq!(options.max_depth, 128);
    }

    fn list_library() -> (RuntimeTypeLibrary, u32) {
        let counts = TypeDefinition::array("Counts", type_hashes::UINT16);
        let root = TypeDefinition::structure(
            "Root",
            16,
            8,
            vec![MemberDefinition::of("Counts", &counts, 0)],
        );
        let root_hash = root.name_hash;
        (RuntimeTypeLibrary::from_iter([counts, root]), root_hash)
    }

    #[rustfmt::skip]
    fn list_payload(offset: i64, count: i64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&offset.to_le_bytes());
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&[0x01, 0x00, 0x02, 0x00, 0xFF, 0xFF]);
        data
    }

    #[test]
    fn decode_out_of_line_array() -> Result<()> {
        let (library, root) = list_library();
        let container = Container::new(Endian::Little);
        let decoder = InstanceDecoder::new(&container, &library, DecoderOptions::default());

        let document = decoder.decode(root, "List", &list_payload(16, 3))?;
        assert_eq!(document.len(), 2);

        let member = document.root().unwrap().member("Counts").unwrap();
        assert_eq!(member.value, Value::Reference(1));
        assert_eq!(
            document.array(1).unwrap().items,
            ArrayItems::Scalars(vec!["1".into(), "2".into(), "65535".into()])
        );

        Ok(())
    }

    #[test]
    fn decode_rejects_bad_arrays() {
        let (library, root) = list_library();
        let container = Container::new(Endian::Little);
        let decoder = InstanceDecoder::new(&container, &library, DecoderOptions::default());

        for (offset, count) in [(-1, 1), (16, -1), (16, 4), (i64::MAX, 2)] {
            assert!(matches!(
                decoder.decode(root, "List", &list_payload(offset, count)),
                Err(Error::Format(FormatError::InvalidArray { .. }))
            ));
        }

        let strict = InstanceDecoder::new(
            &container,
            &library,
            DecoderOptions::builder().max_array_length(2).build(),
        );
        assert!(matches!(
            strict.decode(root, "List", &list_payload(16, 3)),
            Err(Error::Format(FormatError::ArrayTooLarge { count: 3, limit: 2 }))
        ));

        let single = InstanceDecoder::new(
            &container,
            &library,
            DecoderOptions::builder().max_work_items(1).build(),
        );
        assert!(matches!(
            single.decode(root, "List", &list_payload(16, 3)),
            Err(Error::Format(FormatError::WorkLimitExceeded(1)))
        ));
    }

    #[test]
    fn decode_unresolved_root() {
        let library = RuntimeTypeLibrary::new();
        let container = Container::new(Endian::Little);
        let decoder = InstanceDecoder::new(&container, &library, DecoderOptions::default());

        assert!(matches!(
            decoder.decode(0xDEADBEEF, "Missing", &[]),
            Err(Error::UnresolvedType(0xDEADBEEF))
        ));
    }

    #[test]
    fn container_types_are_consulted() -> Result<()> {
        let pair = TypeDefinition::structure(
            "Pair",
            2,
            1,
            vec![
                MemberDefinition::primitive("a", Primitive::Int8, 0),
                MemberDefinition::primitive("b", Primitive::UInt8, 1),
            ],
        );
        let mut container = Container::new(Endian::Big);
        container.type_definitions.push(pair.clone());

        let library = RuntimeTypeLibrary::new();
        let decoder = InstanceDecoder::new(&container, &library, DecoderOptions::default());
        let document = decoder.decode(pair.name_hash, "Pair", &[0xFF, 0xFF])?;

        let root = document.root().unwrap();
        assert_eq!(root.member("a").unwrap().value, Value::scalar("-1"));
        assert_eq!(root.member("b").unwrap().value, Value::scalar("255"));

        Ok(())
    }
}
