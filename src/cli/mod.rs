//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{Overrides, SourceKind};
use crate::palette::ExtractionMode;

/// tagsync - mirror the currently playing track onto a BusyTag display.
///
/// Album art and title go to the screen; a color extracted from the art
/// goes to the LED ring.
#[derive(Parser, Debug)]
#[command(name = "tagsync", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for scripts)
    #[arg(long, short = 'f', default_value = "text", global = true, env = "TAGSYNC_FORMAT")]
    pub format: OutputFormat,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log format on stderr
    #[arg(long, default_value = "text", global = true, env = "TAGSYNC_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Settings file (default: <config dir>/tagsync/config.toml)
    #[arg(long, short = 'c', global = true, env = "TAGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

/// Log output selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Returns true if command output should be JSON.
    pub const fn use_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror the current track onto the device until interrupted
    Run(RunArgs),

    /// Print the LED color extracted from an image
    Extract(ExtractArgs),

    /// Show the effective configuration
    Config(ConfigArgs),

    /// Write a default configuration file
    Init(InitArgs),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Settings that can be overridden per invocation.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Color extraction mode
    #[arg(long, short = 'm', env = "TAGSYNC_MODE")]
    pub mode: Option<ExtractionMode>,

    /// Mount point of the BusyTag volume
    #[arg(long, env = "TAGSYNC_VOLUME")]
    pub volume: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Track source
    #[arg(long, env = "TAGSYNC_SOURCE")]
    pub source: Option<SourceKind>,

    /// Now-playing JSON file (implies --source file)
    #[arg(long, value_name = "FILE")]
    pub now_playing: Option<PathBuf>,
}

impl OverrideArgs {
    #[must_use]
    pub fn to_overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode,
            volume: self.volume.clone(),
            interval_ms: self.interval_ms,
            source: self
                .source
                .or_else(|| self.now_playing.as_ref().map(|_| SourceKind::File)),
            now_playing: self.now_playing.clone(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Run a single tick and exit
    #[arg(long)]
    pub once: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Image file (PNG, JPEG, ...)
    pub image: PathBuf,

    /// Extraction mode (defaults to the configured mode)
    #[arg(long, short = 'm', env = "TAGSYNC_MODE")]
    pub mode: Option<ExtractionMode>,

    /// Show every mode plus the LED pattern
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Number of quantizer candidates
    #[arg(long, default_value = "16")]
    pub candidates: usize,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,

    /// Volume to record in the new configuration
    #[arg(long)]
    pub volume: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Only print the configuration file path
    #[arg(long)]
    pub path: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
