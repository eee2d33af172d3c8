use clap::Args;
use jc3_adf::hash::format_hash_literal;
use jc3_adf::types::{Primitive, TypeKind};
use jc3_adf::{Container, RuntimeTypeLibrary, TypeLibrary};
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::{fs::File, io::BufReader, path::PathBuf};

#[derive(Args)]
pub struct InfoArgs {
    /// An input ADF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Containers or directories providing type definitions for names
    #[arg(short, long, value_name = "PATH")]
    types: Vec<PathBuf>,

    /// List every member of the embedded type definitions
    #[arg(long, default_value_t = false)]
    members: bool,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let adf = Container::read(BufReader::new(f))?;

        let mut library = super::load_library(&self.types)?;
        library.add_container(&adf)?;

        println!("{}: {:?}", "endian".bold(), adf.endian);
        if !adf.comment.is_empty() {
            println!("{}: {}", "comment".bold(), adf.comment);
        }

        println!("{} ({})", "instances".bold(), adf.instances.len());
        for instance in &adf.instances {
            println!(
                "  {} {} @ {:#X} ({} bytes)",
                instance.name.green(),
                type_name(&library, instance.type_hash).blue(),
                instance.offset,
                instance.size
            );
        }

        println!("{} ({})", "types".bold(), adf.type_definitions.len());
        for definition in &adf.type_definitions {
            let detail = match definition.kind {
                TypeKind::Structure => format!("{} members", definition.members.len()),
                TypeKind::Array => {
                    format!("of {}", type_name(&library, definition.element_type_hash))
                }
                TypeKind::InlineArray => format!(
                    "of {} x{}",
                    type_name(&library, definition.element_type_hash),
                    definition.element_length
                ),
                _ => String::new(),
            };
            println!(
                "  {} {} {} {}, {} bytes",
                format_hash_literal(definition.name_hash).dimmed(),
                definition.name.blue(),
                definition.kind,
                detail,
                definition.size
            );

            if self.members {
                for member in &definition.members {
                    println!(
                        "    {:>6} {} {}",
                        format!("+{:#X}", member.offset),
                        member.name,
                        type_name(&library, member.type_hash).dimmed()
                    );
                }
            }
        }

        println!("{} ({})", "string hashes".bold(), adf.string_hashes.len());
        for info in adf.string_hashes.iter() {
            println!(
                "  {} {}",
                format_hash_literal(info.value_hash).dimmed(),
                info.value.yellow()
            );
        }

        Ok(())
    }
}

fn type_name(library: &RuntimeTypeLibrary, type_hash: u32) -> String {
    if let Some(primitive) = Primitive::from_type_hash(type_hash) {
        return primitive.to_string();
    }
    if type_hash == jc3_adf::types::type_hashes::STRING {
        return "String".to_owned();
    }
    library
        .resolve(type_hash)
        .map(|d| d.name.clone())
        .unwrap_or_else(|_| format_hash_literal(type_hash))
}
