//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scarlet - cached world minimaps
///
/// Renders block worlds as PNG minimaps and serves them from a disk cache
/// shared by every scarlet process on the machine.
#[derive(Parser, Debug)]
#[command(name = "scarlet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SCARLET_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a world minimap as PNG
    Render(RenderArgs),

    /// Print a world's metadata document
    Meta(MetaArgs),

    /// Expire everything cached for a world
    Update(UpdateArgs),

    /// Inspect or clear the cache directory
    Cache(CacheArgs),

    /// List the configured block colors
    Colors(ColorsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// World ID
    pub world: String,

    /// Pixels per block (clamped to the configured range)
    #[arg(short, long, default_value = "1")]
    pub scale: u32,

    /// Output file (defaults to <world>.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the meta command
#[derive(Parser, Debug)]
pub struct MetaArgs {
    /// World ID
    pub world: String,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// World ID
    pub world: String,
}

/// Arguments for the colors command
#[derive(Parser, Debug)]
pub struct ColorsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
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

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove every entry not currently being computed
    Clear,
}
