use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "odb",
    about = "Inspect git object storage: loose objects, packs, refs and history",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Git directory; defaults to $GIT_DIR, then discovery from the cwd
    #[arg(long, global = true)]
    pub git_dir: Option<PathBuf>,

    /// TOML file with repository limits
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print an object
    CatFile(CatFileArgs),
    /// Resolve a ref name to an object id
    RevParse(RevParseArgs),
    /// List refs
    ShowRef,
    /// List the entries of a pack
    ShowPack(ShowPackArgs),
    /// Show the instructions of a delta entry
    ShowDelta(ShowDeltaArgs),
    /// Check pack checksums and entry CRCs
    VerifyPack(VerifyPackArgs),
    /// Paint two commits down to their common history, as graphviz
    GraphCommon(GraphCommonArgs),
    /// Print the merge base candidates of two commits
    MergeBase(MergeBaseArgs),
    /// Walk history from a commit
    Log(LogArgs),
}

#[derive(Args)]
pub struct CatFileArgs {
    /// Object id or ref name
    pub object: String,
}

#[derive(Args)]
pub struct RevParseArgs {
    pub name: String,
}

#[derive(Args)]
pub struct ShowPackArgs {
    /// Pack name, with or without the `pack-` prefix
    pub pack: String,
}

#[derive(Args)]
pub struct ShowDeltaArgs {
    pub pack: String,
    pub id: String,
}

#[derive(Args)]
pub struct VerifyPackArgs {
    /// Only this pack; every pack when omitted
    pub pack: Option<String>,
}

#[derive(Args)]
pub struct GraphCommonArgs {
    pub base: String,
    pub reference: String,
}

#[derive(Args)]
pub struct MergeBaseArgs {
    pub a: String,
    pub b: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(default_value = "HEAD")]
    pub rev: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}
