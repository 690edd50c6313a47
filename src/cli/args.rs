//! CLI argument definitions using clap derive

use crate::filetype::FileType;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// treecache - Path-addressed file cache
///
/// Writes, reads and purges cached text files kept in a resource tree
/// store on disk.
#[derive(Parser, Debug)]
#[command(name = "treecache")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TREECACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store directory and the cache root
    Init,

    /// Cache a file
    Write(WriteArgs),

    /// Print a cached file
    Read(ReadArgs),

    /// Check whether a file is cached
    Exists(ExistsArgs),

    /// Remove every cached file
    Purge,

    /// Show cache status
    Status(StatusArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the write command
#[derive(Parser, Debug)]
pub struct WriteArgs {
    /// Path relative to the cache root
    pub path: String,

    /// File type (text, css, js, json, html)
    #[arg(short = 't', long = "type", default_value = "text")]
    pub file_type: FileType,

    /// Content to cache
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub content: Option<String>,

    /// Read content from a local file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Arguments for the read command
#[derive(Parser, Debug)]
pub struct ReadArgs {
    /// Path relative to the cache root
    pub path: String,

    /// File type to read the entry as
    #[arg(short = 't', long = "type", default_value = "text")]
    pub file_type: FileType,
}

/// Arguments for the exists command
#[derive(Parser, Debug)]
pub struct ExistsArgs {
    /// Path relative to the cache root
    pub path: String,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for status
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON
    Json,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
