//! Types for reading ADF containers
//!

use binrw::{BinRead, Endian, NullString};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, instrument};

use crate::{
    error::{FormatError, Result, UnsupportedTypeError},
    string_hash::StringHashes,
    string_table::StringTable,
    types::{
        Container, InstanceInfo, MemberDefinition, RawHeader, RawInstanceInfo,
        RawMemberDefinition, RawStringHashInfo, RawTypeDefinition, TypeDefinition, TypeKind,
        FIXED_HEADER_SIZE, SIGNATURE, VERSION,
    },
};

/// Smallest on-disk record of each section, used to reject counts that cannot fit
const MIN_INSTANCE_SIZE: u64 = 24;
const MIN_TYPE_SIZE: u64 = 36;
const MIN_STRING_HASH_SIZE: u64 = 9;
const MIN_NAME_SIZE: u64 = 2;

impl Container {
    /// Read a container starting at the current position of `reader`.
    ///
    /// ```no_run
    /// use std::io::prelude::*;
    ///
    /// fn list_instances(reader: impl Read + Seek) -> jc3_adf::error::Result<()> {
    ///     let adf = jc3_adf::Container::read(reader)?;
    ///
    ///     for instance in &adf.instances {
    ///         println!("{}: {:#010X}", instance.name, instance.type_hash);
    ///     }
    ///
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(mut reader: R) -> Result<Container> {
        let base = reader.stream_position()?;
        let length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(base))?;

        let magic = reader.read_u32::<LittleEndian>()?;
        let endian = if magic == SIGNATURE {
            Endian::Little
        } else if magic.swap_bytes() == SIGNATURE {
            Endian::Big
        } else {
            return Err(FormatError::Signature(magic).into());
        };

        reader.seek(SeekFrom::Start(base))?;
        let header = RawHeader::read_options(&mut reader, endian, ())?;
        if header.version != VERSION {
            return Err(FormatError::Version(header.version).into());
        }

        if let Some((i, &value)) = header.reserved.iter().enumerate().find(|(_, &v)| v != 0) {
            return Err(FormatError::ReservedField {
                offset: 44 + 4 * i as u64,
                value,
            }
            .into());
        }

        let comment = String::from_utf8(NullString::read_options(&mut reader, endian, ())?.0)?;

        let available = length.saturating_sub(base);
        if header.total_size as u64 > available {
            return Err(FormatError::Truncated {
                expected: header.total_size as u64,
                available,
            }
            .into());
        }

        debug!(?endian, comment, ?header, "read header");

        check_section(
            &header,
            "instance",
            header.instance_count,
            header.instance_offset,
            MIN_INSTANCE_SIZE,
        )?;
        check_section(
            &header,
            "type definition",
            header.type_count,
            header.type_offset,
            MIN_TYPE_SIZE,
        )?;
        check_section(
            &header,
            "string hash",
            header.string_hash_count,
            header.string_hash_offset,
            MIN_STRING_HASH_SIZE,
        )?;
        check_section(&header, "name", header.name_count, header.name_offset, MIN_NAME_SIZE)?;

        let names = Self::get_names(&mut reader, base, &header)?;
        let type_definitions =
            Self::get_type_definitions(&mut reader, base, endian, &header, &names)?;
        let instances = Self::get_instances(&mut reader, base, endian, &header, &names)?;
        let string_hashes = Self::get_string_hashes(&mut reader, base, endian, &header)?;

        Ok(Container {
            endian,
            comment,
            type_definitions,
            instances,
            string_hashes,
        })
    }

    /// Read a container from an in-memory buffer
    pub fn from_bytes(data: &[u8]) -> Result<Container> {
        Self::read(Cursor::new(data))
    }

    fn get_names<R: Read + Seek>(
        reader: &mut R,
        base: u64,
        header: &RawHeader,
    ) -> Result<StringTable> {
        if header.name_count == 0 {
            return Ok(StringTable::new());
        }

        reader.seek(SeekFrom::Start(base + header.name_offset as u64))?;
        let mut lengths = vec![0u8; header.name_count as usize];
        reader.read_exact(&mut lengths)?;

        let names = lengths
            .into_iter()
            .map(|length| {
                let mut raw = vec![0u8; length as usize];
                reader.read_exact(&mut raw)?;
                reader.seek(SeekFrom::Current(1))?;
                if let Some(end) = raw.iter().position(|&c| c == b'\0') {
                    raw.truncate(end);
                }
                Ok(String::from_utf8(raw)?)
            })
            .collect::<Result<StringTable>>()?;

        debug!(count = names.len(), "read names");
        Ok(names)
    }

    fn get_type_definitions<R: Read + Seek>(
        reader: &mut R,
        base: u64,
        endian: Endian,
        header: &RawHeader,
        names: &StringTable,
    ) -> Result<Vec<TypeDefinition>> {
        if header.type_count == 0 {
            return Ok(Vec::new());
        }

        reader.seek(SeekFrom::Start(base + header.type_offset as u64))?;
        let definitions = (0..header.type_count)
            .map(|_| read_type_definition(reader, endian, names))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = definitions.len(), "read type definitions");
        Ok(definitions)
    }

    fn get_instances<R: Read + Seek>(
        reader: &mut R,
        base: u64,
        endian: Endian,
        header: &RawHeader,
        names: &StringTable,
    ) -> Result<Vec<InstanceInfo>> {
        if header.instance_count == 0 {
            return Ok(Vec::new());
        }

        reader.seek(SeekFrom::Start(base + header.instance_offset as u64))?;
        let instances = (0..header.instance_count)
            .map(|_| {
                let raw = RawInstanceInfo::read_options(reader, endian, ())?;
                Ok(InstanceInfo {
                    name: names.get(raw.name_index)?.to_owned(),
                    name_hash: raw.name_hash,
                    type_hash: raw.type_hash,
                    offset: raw.offset,
                    size: raw.size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(count = instances.len(), "read instances");
        Ok(instances)
    }

    fn get_string_hashes<R: Read + Seek>(
        reader: &mut R,
        base: u64,
        endian: Endian,
        header: &RawHeader,
    ) -> Result<StringHashes> {
        let mut string_hashes = StringHashes::new();
        if header.string_hash_count == 0 {
            return Ok(string_hashes);
        }

        reader.seek(SeekFrom::Start(base + header.string_hash_offset as u64))?;
        for _ in 0..header.string_hash_count {
            let raw = RawStringHashInfo::read_options(reader, endian, ())?;
            string_hashes.insert(crate::types::StringHashInfo {
                value: String::from_utf8(raw.value.0)?,
                value_hash: raw.value_hash,
                unknown: raw.unknown,
            })?;
        }

        debug!(count = string_hashes.len(), "read string hashes");
        Ok(string_hashes)
    }
}

fn check_section(
    header: &RawHeader,
    section: &'static str,
    count: u32,
    offset: u32,
    record_size: u64,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }

    let end = offset as u64 + count as u64 * record_size;
    if (offset as u64) < FIXED_HEADER_SIZE || end > header.total_size as u64 {
        return Err(FormatError::SectionOutOfRange { section, offset }.into());
    }

    Ok(())
}

fn read_type_definition<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    names: &StringTable,
) -> Result<TypeDefinition> {
    let raw = RawTypeDefinition::read_options(reader, endian, ())?;
    let kind = TypeKind::try_from(raw.kind)?;
    let name = names.get(raw.name_index)?.to_owned();
    let tail = u32::read_options(reader, endian, ())?;

    let members = match kind {
        TypeKind::Structure => (0..tail)
            .map(|_| {
                let member = RawMemberDefinition::read_options(reader, endian, ())?;
                Ok(MemberDefinition {
                    name: names.get(member.name_index)?.to_owned(),
                    type_hash: member.type_hash,
                    size: member.size,
                    offset: member.offset,
                    default_type: member.default_type,
                    default_value: member.default_value,
                })
            })
            .collect::<Result<Vec<_>>>()?,
        TypeKind::Array | TypeKind::InlineArray | TypeKind::Pointer | TypeKind::StringHash => {
            if tail != 0 {
                return Err(FormatError::UnexpectedTypeData {
                    type_hash: raw.name_hash,
                    value: tail,
                }
                .into());
            }
            Vec::new()
        }
        _ => {
            return Err(UnsupportedTypeError::Usage {
                name,
                hash: raw.name_hash,
                kind,
            }
            .into())
        }
    };

    let definition = TypeDefinition {
        kind,
        size: raw.size,
        alignment: raw.alignment,
        name_hash: raw.name_hash,
        name,
        flags: raw.flags,
        element_type_hash: raw.element_type_hash,
        element_length: raw.element_length,
        members,
    };
    definition.validate()?;
    Ok(definition)
}
