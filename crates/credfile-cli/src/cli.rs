use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "credfile",
    about = "Provision an item's secret as a temp file for tools that only read credential files",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Provision an item and print the files, env vars and args a process would get.
    Plan(PlanArgs),
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

/// Options for `credfile plan`. Anything set here overrides the config file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanArgs {
    /// JSON file holding the item as a flat object of string fields.
    #[arg(long)]
    pub item: PathBuf,
    /// Field whose value becomes the file contents.
    #[arg(long, conflicts_with = "fields")]
    pub field: Option<String>,
    /// Comma-separated fields written to one file, in order.
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,
    /// Separator placed between values when using --fields.
    #[arg(long, default_value = "\n")]
    pub separator: String,
    /// Write the file at this exact path instead of the temp dir.
    #[arg(long)]
    pub fixed_path: Option<PathBuf>,
    /// Name of the file inside the temp dir.
    #[arg(long)]
    pub filename: Option<String>,
    /// Environment variable that receives the file path.
    #[arg(long = "env")]
    pub env_var: Option<String>,
    /// Append the file path to the command line.
    #[arg(long = "arg")]
    pub path_as_arg: bool,
    /// Token placed before the path on the command line (repeatable, implies --arg).
    #[arg(long = "arg-prefix", allow_hyphen_values = true)]
    pub arg_prefix: Vec<String>,
    /// Managed temp dir the file is placed in.
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
    /// Print file contents instead of redacting them.
    #[arg(long)]
    pub show_contents: bool,
}
