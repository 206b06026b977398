//! CLI - Command Line Interface for livetv
//!
//! Every listing and playback action is scriptable. All output is
//! JSON-parseable with `--json` (the default when stdout is not a TTY).
//!
//! # Examples
//!
//! ```bash
//! # Browse
//! livetv channels --country uk
//! livetv events Soccer
//! livetv events Basketball --nba --json
//!
//! # Resolve and play
//! livetv resolve 51
//! livetv play 51 --player mpv
//!
//! # Guide
//! livetv upcoming us-espn
//! livetv match --names channels.txt
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::stream::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Upstream page no longer has the expected shape
    UpstreamChanged = 4,
    /// Invalid stream link or nothing found
    NotFound = 5,
    /// Player failed to start
    PlayerFailed = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// livetv - Browse and play live TV and sports streams
#[derive(Parser, Debug)]
#[command(
    name = "livetv",
    version,
    author = "Gorka & Hermes",
    about = "Browse and play live TV and sports streams",
    long_about = "Lists 24/7 channels and scheduled sports events, resolves a \
                  channel into a playable stream URL with its headers, and \
                  hands it to mpv or VLC.",
    after_help = "EXAMPLES:\n\
                  livetv channels --country usa      List US channels\n\
                  livetv events Basketball --nba     NBA games on the schedule\n\
                  livetv resolve 51                  Print the playable URL\n\
                  livetv play 51 -p vlc              Play in VLC"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging to stderr (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }

    /// Default log filter for the verbosity level
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List 24/7 channels
    #[command(visible_alias = "ch")]
    Channels(ChannelsCmd),

    /// List the country filters
    Countries,

    /// List schedule categories
    #[command(visible_alias = "cat")]
    Categories,

    /// List events of a schedule category
    #[command(visible_alias = "ev")]
    Events(EventsCmd),

    /// Resolve a channel into a playable URL
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Resolve a channel and play it locally
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Upcoming programmes for an EPG channel id
    #[command(visible_alias = "up")]
    Upcoming(UpcomingCmd),

    /// Match channel names against the EPG feed
    Match(MatchCmd),

    /// Look up a channel's EPG id in the built-in table
    Lookup(LookupCmd),
}

// =============================================================================
// Listing Commands
// =============================================================================

/// List 24/7 channels
#[derive(Args, Debug)]
pub struct ChannelsCmd {
    /// Only channels whose name contains this country
    #[arg(long, short = 'C')]
    pub country: Option<String>,

    /// Include adult channels
    #[arg(long)]
    pub adult: bool,
}

/// List the events of a category
#[derive(Args, Debug)]
pub struct EventsCmd {
    /// Category name as shown by `categories`
    #[arg(required = true)]
    pub category: String,

    /// Only NBA games (basketball category)
    #[arg(long)]
    pub nba: bool,
}

// =============================================================================
// Playback Commands
// =============================================================================

/// Resolve a channel into a playable URL
#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// Channel id (e.g. 51) or stream page path
    #[arg(required = true)]
    pub channel: String,
}

/// Local player selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerChoice {
    /// mpv media player
    Mpv,
    /// VLC media player
    Vlc,
}

impl From<PlayerChoice> for PlayerType {
    fn from(choice: PlayerChoice) -> Self {
        match choice {
            PlayerChoice::Mpv => PlayerType::Mpv,
            PlayerChoice::Vlc => PlayerType::Vlc,
        }
    }
}

/// Resolve and play a channel
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// Channel id (e.g. 51) or stream page path
    #[arg(required = true)]
    pub channel: String,

    /// Player to use (defaults to the configured player, then mpv)
    #[arg(long, short = 'p', value_enum)]
    pub player: Option<PlayerChoice>,

    /// Wait for the player to exit
    #[arg(long, short = 'w')]
    pub wait: bool,
}

// =============================================================================
// Guide Commands
// =============================================================================

/// Upcoming programmes on an EPG channel
#[derive(Args, Debug)]
pub struct UpcomingCmd {
    /// EPG channel id (e.g. us-espn) or a channel name from the built-in table
    #[arg(required = true)]
    pub channel: String,
}

/// Match channel names against the EPG feed
#[derive(Args, Debug)]
pub struct MatchCmd {
    /// File with one channel name per line (defaults to the live directory)
    #[arg(long, short = 'n')]
    pub names: Option<PathBuf>,

    /// Print matches as a table snippet instead of a listing
    #[arg(long)]
    pub source: bool,
}

/// Look up a channel's EPG id
#[derive(Args, Debug)]
pub struct LookupCmd {
    /// Channel display name, exactly as listed
    #[arg(required = true)]
    pub name: String,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// A resolved stream as printed by `resolve`
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// URL with the pipe-suffixed header block
    pub playback_url: String,
}

/// `play` success response
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayResponse {
    pub status: String,
    pub player: String,
    pub url: String,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data: wrapped JSON, or `text` for humans
    pub fn print<T: Serialize>(&self, data: T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let rendered = text(&data);
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Channel Argument Validation
// =============================================================================

/// A channel argument is an id of letters, digits, `-` or `_`, or a path
pub fn validate_channel(channel: &str) -> Result<&str, &'static str> {
    let channel = channel.trim();
    if channel.is_empty() {
        return Err("Channel must not be empty");
    }
    if channel.contains('/')
        || channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(channel)
    } else {
        Err("Invalid channel (expected an id like 51 or a stream page path)")
    }
}

// =============================================================================
// Tests
// =============================================================================
