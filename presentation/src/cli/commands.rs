//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for voice-copilot
#[derive(Parser, Debug)]
#[command(name = "voice-copilot")]
#[command(author, version, about = "Real-time voice copilot with MCP tools and Langfuse tracing")]
#[command(long_about = r#"
Voice Copilot joins a voice room through a media bridge, gives the LLM the
tools of every configured MCP server, and traces the conversation.

The media pipeline runs as a bridge speaking newline-delimited JSON, either a
sidecar started from [bridge].command or this process's own stdin/stdout.

Configuration files are loaded from (in priority order):
1. --config <path>            Explicit config file
2. ./voice-copilot.toml       Project-level config
3. ~/.config/voice-copilot/config.toml   Global config

Environment: ENABLE_TRACING, LANGFUSE_HOST, LANGFUSE_PUBLIC_KEY,
LANGFUSE_SECRET_KEY and VOICE_COPILOT_<SECTION>__<KEY>. A .env file in the
working directory is loaded first.

Example:
  voice-copilot --room-url https://example.daily.co/room --token $DAILY_TOKEN
  voice-copilot --bridge-command python --bridge-arg bridge.py -vv
  voice-copilot --list-tools
"#)]
pub struct Cli {
    /// Room URL handed to the bridge
    #[arg(long, value_name = "URL")]
    pub room_url: Option<String>,

    /// Room token handed to the bridge (never logged)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Start the bridge as a sidecar process instead of using stdio
    #[arg(long, value_name = "PROGRAM")]
    pub bridge_command: Option<String>,

    /// Argument for the bridge sidecar (can be specified multiple times)
    #[arg(long = "bridge-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub bridge_args: Vec<String>,

    /// Force tracing on regardless of ENABLE_TRACING
    #[arg(long)]
    pub enable_tracing: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Connect to the tool providers, print their tools and exit
    #[arg(long)]
    pub list_tools: bool,
}

impl Cli {
    /// Log filter directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["voice-copilot"]);
        assert!(cli.room_url.is_none());
        assert!(cli.bridge_args.is_empty());
        assert!(!cli.list_tools);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_bridge_and_verbosity() {
        let cli = Cli::parse_from([
            "voice-copilot",
            "--bridge-command",
            "python",
            "--bridge-arg",
            "bridge.py",
            "--bridge-arg",
            "--fast",
            "-vv",
            "--token",
            "secret",
        ]);
        assert_eq!(cli.bridge_command.as_deref(), Some("python"));
        assert_eq!(cli.bridge_args, vec!["bridge.py", "--fast"]);
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(cli.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
