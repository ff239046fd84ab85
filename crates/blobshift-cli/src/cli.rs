use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blobshift",
    about = "Bulk-migrate blobs between blob stores",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy every missing blob from the source store to the destination
    Migrate(MigrateArgs),
    /// Print the default configuration as TOML
    Config,
    /// List the configured buckets
    Buckets(BucketsArgs),
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: PathBuf,
    /// Override the number of concurrent transfers
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Bucket to leave out; may be repeated
    #[arg(long = "exclude", value_name = "BUCKET")]
    pub exclusions: Vec<String>,
}

#[derive(Args)]
pub struct BucketsArgs {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
