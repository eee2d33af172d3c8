use clap::Args;
use jc3_adf::hash::{format_hash_literal, hash_jenkins, parse_hash_literal};
use miette::Result;
use owo_colors::OwoColorize;

#[derive(Args)]
pub struct HashArgs {
    /// Text to hash, `#AABBCCDD` literals are echoed as they are
    #[arg(required = true, value_name = "TEXT")]
    text: Vec<String>,
}

impl HashArgs {
    pub fn handle(&self) -> Result<()> {
        for text in &self.text {
            let hash = match parse_hash_literal(text) {
                Some(literal) => literal?,
                None => hash_jenkins(text),
            };
            println!("{} {}", format_hash_literal(hash).cyan(), text);
        }
        Ok(())
    }
}
