//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod actions;
pub mod config_cmd;
pub mod daemon;
pub mod monitor;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let controller_config = config::resolve_controller_config(global)?;
    tracing::debug!(command = ?cmd, backend = %controller_config.url, "dispatching command");

    match cmd {
        Command::Start(_) => daemon::start(controller_config, global).await,
        Command::Hosts(args) => monitor::hosts(controller_config, args, global).await,
        Command::Host { host } => monitor::host(controller_config, &host, global).await,
        Command::Problems => monitor::problems(controller_config, global).await,
        Command::Synthesis => monitor::synthesis(controller_config, global).await,
        Command::Daemons => monitor::daemons(controller_config, global).await,
        Command::History { host } => monitor::history(controller_config, &host, global).await,
        Command::Notifications => monitor::notifications(controller_config, global).await,
        Command::User => monitor::user(controller_config, global).await,
        Command::Ack(args) => actions::acknowledge(controller_config, args, global).await,
        Command::Downtime(args) => actions::downtime(controller_config, args, global).await,
        Command::Notes { target, notes } => {
            actions::notes(controller_config, target, notes, global).await
        }
        Command::Password => actions::password(controller_config, global).await,
        // Handled before a backend config is resolved
        Command::Install(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Validation {
                field: "command".into(),
                reason: "does not talk to the backend".into(),
            })
        }
    }
}
