//! Clap derive structures for the `alignak-app` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// alignak-app -- monitoring client for the Alignak backend
#[derive(Debug, Parser)]
#[command(
    name = "alignak-app",
    version,
    about = "Watch and act on Alignak monitoring state from the command line",
    long_about = "Polls an Alignak backend, caches hosts, services, daemons and \n\
        notifications, and lets you acknowledge problems or schedule downtimes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "ALIGNAK_APP_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'b', env = "ALIGNAK_APP_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Login name (overrides profile)
    #[arg(long, short = 'u', env = "ALIGNAK_APP_USERNAME", global = true)]
    pub username: Option<String>,

    /// Session token (skips the password login)
    #[arg(long, env = "ALIGNAK_APP_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "ALIGNAK_APP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ALIGNAK_APP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ALIGNAK_APP_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ALIGNAK_APP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the poller in the foreground and report changes
    Start(StartArgs),

    /// Install alignak-app as a systemd user service
    Install(InstallArgs),

    /// List monitored hosts
    #[command(alias = "h")]
    Hosts(HostsArgs),

    /// Show one host and its services
    Host {
        /// Host name or id
        host: String,
    },

    /// List unacknowledged problems
    #[command(alias = "pb")]
    Problems,

    /// Host and service state counters from the live synthesis
    Synthesis,

    /// Alignak daemons status
    Daemons,

    /// Recent history of a host
    History {
        /// Host name or id
        host: String,
    },

    /// Notifications sent to the logged-in user
    #[command(alias = "notif")]
    Notifications,

    /// Show the logged-in user
    User,

    /// Acknowledge a host or service problem
    Ack(AckArgs),

    /// Schedule a downtime on a host or service
    Downtime(DowntimeArgs),

    /// Replace the notes of a host or service
    Notes {
        /// Target: `host` or `host/service`
        target: String,
        /// New notes text
        notes: String,
    },

    /// Change the password of the logged-in user
    Password,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Daemon ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Only log to stderr, skip the daily log file
    #[arg(long)]
    pub no_log_file: bool,
}

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Print the unit file instead of writing it
    #[arg(long)]
    pub print: bool,
}

// ── Monitoring views ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HostsArgs {
    /// Only hosts whose name contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Only failing hosts
    #[arg(long)]
    pub failing: bool,
}

// ── Actions ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AckArgs {
    /// Target: `host` or `host/service`
    pub target: String,

    /// Acknowledge comment
    #[arg(long, short = 'm', default_value = "Acknowledged from alignak-app")]
    pub comment: String,

    /// Clear the acknowledge on the next state change
    #[arg(long)]
    pub not_sticky: bool,

    /// Notify contacts
    #[arg(long)]
    pub notify: bool,
}

#[derive(Debug, Args)]
pub struct DowntimeArgs {
    /// Target: `host` or `host/service`
    pub target: String,

    /// Downtime length, starting now (e.g. "2h", "30min")
    #[arg(long, short = 'd', default_value = "1day", value_parser = parse_duration)]
    pub duration: Duration,

    /// Start when the problem begins instead of now
    #[arg(long)]
    pub flexible: bool,

    /// Downtime comment
    #[arg(long, short = 'm', default_value = "Downtime scheduled from alignak-app")]
    pub comment: String,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,
    /// Show the current configuration (secrets masked)
    Show,
    /// Print the config file path
    Path,
    /// Store the profile password or token in the system keyring
    SetPassword {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
        /// Store a session token instead of a password
        #[arg(long)]
        token: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn downtime_duration_uses_humantime() {
        let cli = Cli::try_parse_from(["alignak-app", "downtime", "web/http", "-d", "90min"])
            .unwrap();
        match cli.command {
            Command::Downtime(args) => {
                assert_eq!(args.duration, Duration::from_secs(90 * 60));
                assert_eq!(args.target, "web/http");
                assert!(!args.flexible);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert!(Cli::try_parse_from(["alignak-app", "downtime", "web", "-d", "soon"]).is_err());
    }
}
