pub mod adf;
pub mod hash;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle ADF containers
    Adf {
        #[command(subcommand)]
        command: adf::AdfCommands,
    },
    /// Print the hashes the game uses for names and strings
    Hash(hash::HashArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Adf { command } => command.handle(),
            Commands::Hash(hash) => hash.handle(),
        }
    }
}
