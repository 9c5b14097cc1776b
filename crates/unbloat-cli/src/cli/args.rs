use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "unbloat",
    version,
    about = "Shrink diagnostic support packages: drop nested archives and unwanted members, tail oversized logs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rewrite a support package into a smaller tar.gz
    Rewrite(RewriteArgs),
    /// List the members of an archive
    Inspect(InspectArgs),
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct RewriteArgs {
    /// Support package (.tar, .tar.gz, .tar.bz2 or .tar.zst)
    pub file: PathBuf,

    /// Exact member name to drop (repeatable)
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// File listing member names to drop, one per line (# comments allowed)
    #[arg(long, value_name = "PATH")]
    pub exclude_from: Option<PathBuf>,

    /// Lines kept from the end of each .log member [default: 500]
    #[arg(long, env = "UNBLOAT_TAIL_LINES")]
    pub tail_lines: Option<usize>,

    /// YAML config with `exclude`, `tail_lines` and `max_member_bytes`
    #[arg(long, env = "UNBLOAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output path (default: unbloat-<name> next to FILE)
    #[arg(long, short = 'o', conflicts_with_all = ["out_dir", "host"])]
    pub output: Option<PathBuf>,

    /// Directory to write the output into
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Name the output <host>_<YYYYmmddHHMMSS>.tar.gz
    #[arg(long, value_name = "FQDN")]
    pub host: Option<String>,

    /// Load the package into memory and rewrite from the buffer
    #[arg(long)]
    pub in_memory: bool,

    /// Leave it bloated: copy the package unchanged
    #[arg(long, conflicts_with_all = ["nosave", "in_memory"])]
    pub bloat: bool,

    /// Rewrite and report sizes without saving the result
    #[arg(long)]
    pub nosave: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Archive to list
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}
