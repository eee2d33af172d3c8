use super::{AdfFile, AdfInstance};
use binrw::Endian;
use clap::Args;
use jc3_adf::hash::format_hash_literal;
use jc3_adf::{Container, DecoderOptions, InstanceDecoder, RuntimeTypeLibrary};
use miette::{Context, IntoDiagnostic, Result};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ExportArgs {
    /// An input ADF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The JSON file to write
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Containers or directories providing type definitions
    #[arg(short, long, value_name = "PATH")]
    types: Vec<PathBuf>,

    /// Reject arrays with more elements than this
    #[arg(long, value_name = "COUNT")]
    max_array_length: Option<u64>,

    /// Overwrite the output file if it exists
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExportArgs {
    pub fn handle(&self) -> Result<()> {
        let data = std::fs::read(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let adf = Container::from_bytes(&data)?;

        let mut library = super::load_library(&self.types)?;
        library.add_container(&adf)?;

        let options = match self.max_array_length {
            Some(max_array_length) => DecoderOptions::builder()
                .max_array_length(max_array_length)
                .build(),
            None => DecoderOptions::default(),
        };
        let export = export_container(&adf, &data, &library, options)?;

        let output = super::create_output(&self.output, self.overwrite)?;
        serde_json::to_writer_pretty(BufWriter::new(output), &export)
            .into_diagnostic()
            .context(format!("writing {}", self.output.display()))?;

        info!("exported {} instances", export.instances.len());
        Ok(())
    }
}

/// Decode every instance of `adf`, keeping its embedded types so the result can be imported alone
pub fn export_container(
    adf: &Container,
    data: &[u8],
    library: &RuntimeTypeLibrary,
    options: DecoderOptions,
) -> Result<AdfFile> {
    let decoder = InstanceDecoder::new(adf, library, options);

    let mut instances = Vec::with_capacity(adf.instances.len());
    for instance in &adf.instances {
        let document = decoder
            .decode_instance(instance, data)
            .context(format!("decoding instance {}", instance.name))?;
        info!("{}: {} nodes", instance.name, document.len());

        instances.push(AdfInstance {
            name: instance.name.clone(),
            type_hash: format_hash_literal(instance.type_hash),
            document,
        });
    }

    Ok(AdfFile {
        big_endian: adf.endian == Endian::Big,
        comment: adf.comment.clone(),
        types: adf.type_definitions.clone(),
        instances,
    })
}
