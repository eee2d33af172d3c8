//! Types for writing ADF containers
//!

use binrw::{BinWrite, Endian, NullString};
use bon::Builder;
use byteorder::WriteBytesExt;
use std::io::{self, Seek, SeekFrom, Write};
use tracing::{debug, instrument};

use crate::error::{FormatError, Result};
use crate::string_hash::StringHashes;
use crate::string_table::StringTable;
use crate::types::{
    Container, InstanceInfo, RawHeader, RawInstanceInfo, RawMemberDefinition, RawStringHashInfo,
    RawTypeDefinition, TypeDefinition, SIGNATURE, VERSION,
};

/// Instance payloads start on this boundary
pub const INSTANCE_ALIGNMENT: u64 = 16;

impl Container {
    /// Write every table at the current position of `writer` and back-patch the header at
    /// `header_position`.
    ///
    /// The bytes between `header_position` and the current position are left alone apart from
    /// the header itself, so instance payloads can be written there first. Returns the total size
    /// of the container.
    #[instrument(skip(self, writer), err)]
    pub fn write<W: Write + Seek>(&self, writer: &mut W, header_position: u64) -> Result<u64> {
        let endian = self.endian;
        let start = writer.stream_position()?;
        let required = self.header_size();
        let available = start.saturating_sub(header_position);
        if start < header_position || available < required {
            return Err(FormatError::HeaderOverlap {
                required,
                available,
            }
            .into());
        }

        let mut names = StringTable::new();
        let mut header = RawHeader {
            signature: SIGNATURE,
            version: VERSION,
            ..Default::default()
        };

        if !self.instances.is_empty() {
            header.instance_count = self.instances.len() as u32;
            header.instance_offset = relative_position(writer, header_position)?;
            for instance in &self.instances {
                write_instance(writer, endian, instance, &mut names)?;
            }
        }

        if !self.type_definitions.is_empty() {
            header.type_count = self.type_definitions.len() as u32;
            header.type_offset = relative_position(writer, header_position)?;
            for definition in &self.type_definitions {
                write_type_definition(writer, endian, definition, &mut names)?;
            }
        }

        if !self.string_hashes.is_empty() {
            header.string_hash_count = self.string_hashes.len() as u32;
            header.string_hash_offset = relative_position(writer, header_position)?;
            write_string_hashes(writer, endian, &self.string_hashes)?;
        }

        if !names.is_empty() {
            header.name_count = names.len() as u32;
            header.name_offset = relative_position(writer, header_position)?;
            write_names(writer, &names)?;
        }

        let end = writer.stream_position()?;
        let total_size = end - header_position;
        header.total_size = u32::try_from(total_size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "container exceeds 4 GiB")
        })?;

        writer.seek(SeekFrom::Start(header_position))?;
        header.write_options(writer, endian, ())?;
        NullString::from(self.comment.as_str()).write_options(writer, endian, ())?;
        writer.seek(SeekFrom::Start(end))?;

        debug!(?header, "wrote container");
        Ok(total_size)
    }

    /// Serialize the container alone, with no instance payloads, into a new buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = io::Cursor::new(vec![0u8; self.header_size() as usize]);
        cursor.seek(SeekFrom::End(0))?;
        self.write(&mut cursor, 0)?;
        Ok(cursor.into_inner())
    }
}

fn relative_position<W: Seek>(writer: &mut W, header_position: u64) -> Result<u32> {
    let offset = writer.stream_position()? - header_position;
    Ok(u32::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "table offset exceeds 4 GiB"))?)
}

fn write_instance<W: Write + Seek>(
    writer: &mut W,
    endian: Endian,
    instance: &InstanceInfo,
    names: &mut StringTable,
) -> Result<()> {
    RawInstanceInfo {
        name_hash: instance.name_hash,
        type_hash: instance.type_hash,
        offset: instance.offset,
        size: instance.size,
        name_index: names.put(&instance.name),
    }
    .write_options(writer, endian, ())?;
    Ok(())
}

fn write_type_definition<W: Write + Seek>(
    writer: &mut W,
    endian: Endian,
    definition: &TypeDefinition,
    names: &mut StringTable,
) -> Result<()> {
    RawTypeDefinition {
        kind: definition.kind as u32,
        size: definition.size,
        alignment: definition.alignment,
        name_hash: definition.name_hash,
        name_index: names.put(&definition.name),
        flags: definition.flags,
        element_type_hash: definition.element_type_hash,
        element_length: definition.element_length,
    }
    .write_options(writer, endian, ())?;

    // member count for structures, a zero word for everything else
    (definition.members.len() as u32).write_options(writer, endian, ())?;
    for member in &definition.members {
        RawMemberDefinition {
            name_index: names.put(&member.name),
            type_hash: member.type_hash,
            size: member.size,
            offset: member.offset,
            default_type: member.default_type,
            default_value: member.default_value,
        }
        .write_options(writer, endian, ())?;
    }

    Ok(())
}

fn write_string_hashes<W: Write + Seek>(
    writer: &mut W,
    endian: Endian,
    string_hashes: &StringHashes,
) -> Result<()> {
    for info in string_hashes {
        RawStringHashInfo {
            value: NullString::from(info.value.as_str()),
            value_hash: info.value_hash,
            unknown: info.unknown,
        }
        .write_options(writer, endian, ())?;
    }
    Ok(())
}

fn write_names<W: Write>(writer: &mut W, names: &StringTable) -> Result<()> {
    for name in names.iter() {
        let length =
            u8::try_from(name.len()).map_err(|_| FormatError::NameTooLong(name.to_owned()))?;
        writer.write_u8(length)?;
    }
    for name in names.iter() {
        writer.write_all(name.as_bytes())?;
        writer.write_u8(0)?;
    }
    Ok(())
}

/// Options for how the container should be written
#[derive(Debug, Clone, Builder)]
pub struct ContainerWriterOptions {
    /// Byte order of every header field, table and payload
    #[builder(default = Endian::Little)]
    pub endian: Endian,

    /// Free text stored after the fixed header
    #[builder(default, into)]
    pub comment: String,
}

impl Default for ContainerWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// ADF container generator
///
/// ```
/// # fn doit() -> jc3_adf::error::Result<()>
/// # {
/// use jc3_adf::write::{ContainerWriter, ContainerWriterOptions};
/// use jc3_adf::types::type_hashes;
///
/// let mut adf = ContainerWriter::new(
///     std::io::Cursor::new(Vec::new()),
///     ContainerWriterOptions::builder().comment("hello").build(),
/// );
///
/// adf.add_instance("Answer", type_hashes::INT32, &42i32.to_le_bytes())?;
///
/// let bytes = adf.finish()?.into_inner();
/// assert_eq!(&bytes[0..4], b" FDA");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct ContainerWriter<W: Write + Seek> {
    inner: W,
    container: Container,
    data: Vec<u8>,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Prepare a container that will be written at the current position of `inner`
    pub fn new(inner: W, options: ContainerWriterOptions) -> ContainerWriter<W> {
        ContainerWriter {
            inner,
            container: Container {
                comment: options.comment,
                ..Container::new(options.endian)
            },
            data: Vec::new(),
        }
    }

    /// Byte order payloads must be encoded in
    pub fn endian(&self) -> Endian {
        self.container.endian
    }

    /// The container as built so far
    pub fn container(&self) -> &Container {
        &self.container
    }

    fn data_start(&self) -> u64 {
        self.container.header_size().next_multiple_of(INSTANCE_ALIGNMENT)
    }

    /// Append an instance payload, aligned to [`INSTANCE_ALIGNMENT`]
    #[instrument(skip(self, payload), fields(size = payload.len()), err)]
    pub fn add_instance(
        &mut self,
        name: impl Into<String> + std::fmt::Debug,
        type_hash: u32,
        payload: &[u8],
    ) -> Result<&InstanceInfo> {
        let aligned = (self.data.len() as u64).next_multiple_of(INSTANCE_ALIGNMENT);
        self.data.resize(aligned as usize, 0);

        let too_large =
            || io::Error::new(io::ErrorKind::InvalidInput, "instance data exceeds 4 GiB");
        let offset = u32::try_from(self.data_start() + aligned).map_err(|_| too_large())?;
        let size = u32::try_from(payload.len()).map_err(|_| too_large())?;

        self.data.extend_from_slice(payload);
        self.container
            .instances
            .push(InstanceInfo::new(name, type_hash, offset, size));

        Ok(&self.container.instances[self.container.instances.len() - 1])
    }

    /// Embed a type definition so readers can decode without an external library
    pub fn add_type_definition(&mut self, definition: TypeDefinition) -> Result<()> {
        definition.validate()?;
        self.container.type_definitions.push(definition);
        Ok(())
    }

    /// String hashes that will be written, typically filled while encoding payloads
    pub fn string_hashes_mut(&mut self) -> &mut StringHashes {
        &mut self.container.string_hashes
    }

    /// Write the header, payloads and tables
    ///
    /// This will return the writer positioned after the container.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        let header_position = self.inner.stream_position()?;
        let data_start = self.data_start();

        self.inner.write_all(&vec![0u8; data_start as usize])?;
        self.inner.write_all(&self.data)?;
        self.container.write(&mut self.inner, header_position)?;

        Ok(self.inner)
    }
}
