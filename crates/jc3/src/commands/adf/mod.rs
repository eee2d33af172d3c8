pub mod export;
pub mod import;
pub mod info;

use jc3_adf::document::Document;
use jc3_adf::error::{Error, FormatError};
use jc3_adf::types::TypeDefinition;
use jc3_adf::{Container, RuntimeTypeLibrary};
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(clap::Subcommand)]
pub enum AdfCommands {
    /// Show the header and tables of an ADF file
    Info(info::InfoArgs),
    /// Decode every instance of an ADF file into JSON
    Export(export::ExportArgs),
    /// Build an ADF file from exported JSON
    Import(import::ImportArgs),
}

impl AdfCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            AdfCommands::Info(info) => info.handle(),
            AdfCommands::Export(export) => export.handle(),
            AdfCommands::Import(import) => import.handle(),
        }
    }
}

/// JSON form of a whole container
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AdfFile {
    #[serde(default)]
    pub big_endian: bool,
    #[serde(default)]
    pub comment: String,
    /// Type definitions embedded in the container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDefinition>,
    pub instances: Vec<AdfInstance>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AdfInstance {
    pub name: String,
    /// Either a `#AABBCCDD` literal or a type name to hash
    #[serde(rename = "type")]
    pub type_hash: String,
    pub document: Document,
}

/// Read every type definition found in `paths`, directories are searched recursively
///
/// Files that are not ADF containers are skipped.
pub fn load_library(paths: &[PathBuf]) -> Result<RuntimeTypeLibrary> {
    let mut library = RuntimeTypeLibrary::new();

    let files = paths
        .iter()
        .flat_map(WalkDir::new)
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir());

    for file in files {
        let container = match read_container(file.path()) {
            Ok(container) => container,
            Err(Error::Format(FormatError::Signature(magic))) => {
                debug!("skipping {} ({:#010X})", file.path().display(), magic);
                continue;
            }
            Err(e) => {
                return Err(e).context(format!("reading types from {}", file.path().display()))
            }
        };

        library
            .add_container(&container)
            .context(format!("adding types from {}", file.path().display()))?;
    }

    info!("loaded {} type definitions", library.len());
    Ok(library)
}

fn read_container(path: &Path) -> jc3_adf::error::Result<Container> {
    let f = File::open(path)?;
    Container::read(BufReader::new(f))
}

/// Open `path` for writing, refusing to replace an existing file unless `overwrite` is set
pub fn create_output(path: &Path, overwrite: bool) -> Result<File> {
    if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    }
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use jc3_adf::types::{MemberDefinition, Primitive, TypeDefinition};
    use jc3_adf::write::{ContainerWriter, ContainerWriterOptions};
    use jc3_adf::{hash_jenkins, Container, DecoderOptions, PayloadWriter, RuntimeTypeLibrary};
    use miette::IntoDiagnostic;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use super::export::export_container;
    use super::import::import_container;
    use super::AdfFile;

    fn tagged_container() -> miette::Result<Vec<u8>> {
        let tag = TypeDefinition::string_hash("Tag");
        let entry = TypeDefinition::structure(
            "Entry",
            16,
            8,
            vec![
                MemberDefinition::primitive("Count", Primitive::Int32, 0),
                MemberDefinition::of("Tag", &tag, 4),
                MemberDefinition::string("Label", 8),
            ],
        );

        let mut payload = PayloadWriter::new(Endian::Big);
        payload.alloc(16, 8);
        payload.write_at(0, &7i32)?;
        payload.write_at(4, &hash_jenkins("hello"))?;
        let label = payload.append_string("ab");
        payload.write_at(8, &(label as i64))?;

        let mut adf = ContainerWriter::new(
            Cursor::new(Vec::new()),
            ContainerWriterOptions::builder()
                .endian(Endian::Big)
                .comment("tagged")
                .build(),
        );
        adf.add_type_definition(tag)?;
        adf.add_type_definition(entry.clone())?;
        adf.string_hashes_mut().compute("hello")?;
        adf.add_instance("Entry", entry.name_hash, &payload.into_inner())?;
        Ok(adf.finish()?.into_inner())
    }

    fn export(data: &[u8]) -> miette::Result<AdfFile> {
        let adf = Container::from_bytes(data)?;
        export_container(&adf, data, &RuntimeTypeLibrary::new(), DecoderOptions::default())
    }

    #[test]
    fn embedded_types_survive_export_and_import() -> miette::Result<()> {
        let exported = export(&tagged_container()?)?;
        assert_eq!(exported.types.len(), 2);
        assert!(exported.big_endian);
        assert_eq!(exported.comment, "tagged");

        let json = serde_json::to_string_pretty(&exported).into_diagnostic()?;
        let parsed: AdfFile = serde_json::from_str(&json).into_diagnostic()?;
        assert_eq!(parsed, exported);

        // no external types needed to build the container again
        let rebuilt = import_container(&parsed, RuntimeTypeLibrary::new(), false)?;
        assert_eq!(export(&rebuilt)?, exported);

        let bare = AdfFile {
            types: Vec::new(),
            ..parsed
        };
        assert!(import_container(&bare, RuntimeTypeLibrary::new(), false).is_err());

        Ok(())
    }
}
