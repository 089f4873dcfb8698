use clap::{Args, Parser, Subcommand};
use clap_num::maybe_hex;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "eds-import", version, about)]
pub struct Cli {
    /// Log every import diagnostic as it is recorded
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import the PDOs of a single EDS or DCF file
    Import(ImportArgs),
    /// Run every import listed in a TOML config file
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to an EDS or DCF file
    #[arg(value_hint=clap::ValueHint::FilePath)]
    pub path: PathBuf,
    /// Node ID substituted for $NODEID. Decimal, or hex with a 0x prefix.
    #[arg(short, long, value_parser=maybe_hex::<u8>)]
    pub node_id: u8,
    /// Import for a CANopen manager
    #[arg(long)]
    pub canopen_manager: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Path to an import config TOML file
    #[arg(value_hint=clap::ValueHint::FilePath)]
    pub config: PathBuf,
}
