use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::export::Format;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the sources found in the data directory.
    Sources(SourcesArgs),
    /// Convert sources into Shaped bundles.
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Data directory holding `bestiary/` and `spells/`.
    #[arg(long)]
    pub data: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Data directory holding `bestiary/` and `spells/`.
    #[arg(long)]
    pub data: PathBuf,

    /// Source key to convert (repeatable, e.g. `--source MM --source VGM`).
    #[arg(long = "source", required = true)]
    pub sources: Vec<String>,

    /// Output file path (default: stdout).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output encoding.
    #[arg(long, value_enum, default_value_t = Format::Script)]
    pub format: Format,

    /// Overwrite `--out` if it already exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}
