use super::AdfFile;
use binrw::Endian;
use clap::Args;
use jc3_adf::hash::{hash_jenkins, parse_hash_literal};
use jc3_adf::write::{ContainerWriter, ContainerWriterOptions};
use jc3_adf::{InstanceEncoder, RuntimeTypeLibrary};
use miette::{Context, IntoDiagnostic, Result};
use std::io::{BufReader, Cursor, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ImportArgs {
    /// A JSON file produced by `adf export`
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The ADF file to create
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Containers or directories providing type definitions, in addition to the types listed in
    /// the JSON file
    #[arg(short, long, value_name = "PATH")]
    types: Vec<PathBuf>,

    /// Also embed every type loaded through `--types` into the output
    #[arg(long, default_value_t = false)]
    embed_types: bool,

    /// Overwrite the output file if it exists
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ImportArgs {
    pub fn handle(&self) -> Result<()> {
        let f = std::fs::File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let import: AdfFile = serde_json::from_reader(BufReader::new(f))
            .into_diagnostic()
            .context(format!("parsing {}", self.file.display()))?;

        let library = super::load_library(&self.types)?;
        let bytes = import_container(&import, library, self.embed_types)?;

        let mut output = super::create_output(&self.output, self.overwrite)?;
        output
            .write_all(&bytes)
            .into_diagnostic()
            .context(format!("writing {}", self.output.display()))?;

        info!(
            "imported {} instances ({} bytes)",
            import.instances.len(),
            bytes.len()
        );
        Ok(())
    }
}

/// Encode `import` into container bytes
///
/// Types listed in `import` are embedded again and take part in encoding alongside `library`.
pub fn import_container(
    import: &AdfFile,
    mut library: RuntimeTypeLibrary,
    embed_library: bool,
) -> Result<Vec<u8>> {
    let endian = if import.big_endian {
        Endian::Big
    } else {
        Endian::Little
    };
    let mut adf = ContainerWriter::new(
        Cursor::new(Vec::new()),
        ContainerWriterOptions::builder()
            .endian(endian)
            .comment(import.comment.as_str())
            .build(),
    );

    if embed_library {
        for definition in library.iter() {
            if !import.types.iter().any(|t| t.name_hash == definition.name_hash) {
                adf.add_type_definition(definition.clone())?;
            }
        }
    }
    for definition in &import.types {
        library.add(definition.clone())?;
        adf.add_type_definition(definition.clone())?;
    }

    for instance in &import.instances {
        let type_hash = match parse_hash_literal(&instance.type_hash) {
            Some(literal) => literal?,
            None => hash_jenkins(&instance.type_hash),
        };

        let payload = InstanceEncoder::new(&library, adf.string_hashes_mut(), endian)
            .encode(type_hash, &instance.document)
            .context(format!("encoding instance {}", instance.name))?;
        info!("{}: {} bytes", instance.name, payload.len());

        adf.add_instance(instance.name.as_str(), type_hash, &payload)?;
    }

    Ok(adf.finish()?.into_inner())
}
