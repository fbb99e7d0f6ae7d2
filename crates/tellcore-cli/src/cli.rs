//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// tdctl - control TellStick devices through telldus-core
///
/// Lists and switches the devices configured in the telldus-core service,
/// reads sensors, and prints driver events as they happen.
#[derive(Parser, Debug)]
#[command(
    name = "tdctl",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TDCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured devices
    List,

    /// Turn a device on
    On(DeviceArgs),

    /// Turn a device off
    Off(DeviceArgs),

    /// Ring a bell device
    Bell(DeviceArgs),

    /// Dim a device to a level between 0 and 255
    Dim(DimArgs),

    /// Run a scene
    Execute(DeviceArgs),

    /// Move blinds or a screen up
    Up(DeviceArgs),

    /// Move blinds or a screen down
    Down(DeviceArgs),

    /// Stop blinds or a screen
    Stop(DeviceArgs),

    /// Send the learn signal so a receiver can pair with the device
    Learn(DeviceArgs),

    /// Add a device to the driver's table
    Add(AddArgs),

    /// Remove a device from the driver's table
    Remove(DeviceArgs),

    /// Rename a device
    SetName(SetNameArgs),

    /// Read or write protocol parameters (house, unit, code, ...)
    Param(ParamArgs),

    /// Transmit a raw protocol command
    Raw(RawArgs),

    /// List sensors and their latest readings
    Sensors,

    /// Print driver events until interrupted
    Listen(ListenArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// A single device id
#[derive(Parser, Debug)]
pub struct DeviceArgs {
    /// Device id, as shown by `list`
    #[arg(value_name = "ID")]
    pub id: i32,
}

/// Arguments for the dim command
#[derive(Parser, Debug)]
pub struct DimArgs {
    /// Device id, as shown by `list`
    #[arg(value_name = "ID")]
    pub id: i32,

    /// Dim level, 0 (off) to 255 (full)
    #[arg(value_name = "LEVEL", allow_negative_numbers = true)]
    pub level: i32,
}

/// Arguments for the add command
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Name of the new device
    pub name: String,

    /// Protocol, e.g. arctech
    #[arg(short, long)]
    pub protocol: String,

    /// Model, e.g. selflearning-switch
    #[arg(short, long)]
    pub model: String,

    /// Protocol parameters as KEY=VALUE, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

/// Arguments for the set-name command
#[derive(Parser, Debug)]
pub struct SetNameArgs {
    /// Device id, as shown by `list`
    #[arg(value_name = "ID")]
    pub id: i32,

    /// New name
    pub name: String,
}

/// Arguments for the param command
#[derive(Parser, Debug)]
pub struct ParamArgs {
    #[command(subcommand)]
    pub action: ParamAction,
}

/// Parameter actions
#[derive(Subcommand, Debug)]
pub enum ParamAction {
    /// Print a parameter value
    Get {
        /// Device id
        #[arg(value_name = "ID")]
        id: i32,
        /// Parameter name
        name: String,
        /// Value to print when the device has none
        #[arg(long)]
        default: Option<String>,
    },

    /// Set a parameter value
    Set {
        /// Device id
        #[arg(value_name = "ID")]
        id: i32,
        /// Parameter name
        name: String,
        /// New value
        value: String,
    },
}

/// Arguments for the raw command
#[derive(Parser, Debug)]
pub struct RawArgs {
    /// Protocol command string, passed through unchanged
    #[arg(value_name = "COMMAND")]
    pub command: String,
}

/// Arguments for the listen command
#[derive(Parser, Debug)]
pub struct ListenArgs {
    /// Include raw protocol traffic
    #[arg(long)]
    pub raw: bool,

    /// Stop after this many events
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Show which configuration files are searched
    Paths,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
