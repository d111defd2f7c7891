//! `start`: run the poller in the foreground; `install`: user service unit.

use std::path::PathBuf;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use alignak_core::{ConnectionState, Controller, ControllerConfig, ResourceType, StoreEvent};

use crate::cli::{GlobalOpts, InstallArgs};
use crate::error::CliError;

const UNIT_NAME: &str = "alignak-app.service";

// ── start ───────────────────────────────────────────────────────────

pub async fn start(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let url = config.url.to_string();
    let controller = Controller::new(config);
    controller.connect().await?;
    info!(%url, "alignak-app started");

    let store = controller.store();
    let mut events = controller.events();
    let mut state = controller.connection_state();
    let mut last_problems = (usize::MAX, usize::MAX);
    report_problems(&controller, &mut last_problems, global.quiet);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("interrupt received, stopping");
                break;
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                match current {
                    ConnectionState::Unreachable => warn!("backend unreachable, showing cached data"),
                    ConnectionState::Connected => info!("backend reachable again"),
                    other => debug!(state = ?other, "connection state changed"),
                }
            }

            event = events.recv() => match event {
                Ok(StoreEvent::NewNotification(n)) => {
                    let message = n.str_field("message").unwrap_or_default();
                    info!(id = %n.id, %message, "new notification");
                    if !global.quiet {
                        println!("[notification] {message}");
                    }
                }
                Ok(StoreEvent::Refreshed { kind, count }) => {
                    debug!(%kind, count, "collection refreshed");
                    if matches!(kind, ResourceType::Host | ResourceType::Service) {
                        report_problems(&controller, &mut last_problems, global.quiet);
                    }
                }
                Ok(StoreEvent::ItemPatched { kind, id }) => debug!(%kind, %id, "record patched"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event consumer lagging"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!(ready = store.is_ready(), "shutting down");
    controller.disconnect().await;
    Ok(())
}

/// Print the problem counters when they change.
fn report_problems(controller: &Controller, last: &mut (usize, usize), quiet: bool) {
    let problems = controller.store().get_problems();
    let current = (problems.hosts_nb, problems.services_nb);
    if current == *last {
        return;
    }
    *last = current;
    info!(hosts = current.0, services = current.1, "problems changed");
    if !quiet {
        println!(
            "[problems] {} host(s), {} service(s)",
            current.0, current.1
        );
    }
}

// ── install ─────────────────────────────────────────────────────────

pub fn install(args: &InstallArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ensure_systemd_platform(std::env::consts::OS)?;

    let exe = std::env::current_exe()?;
    let unit = unit_file(&exe.display().to_string(), global.profile.as_deref());

    if args.print {
        println!("{unit}");
        return Ok(());
    }

    let dir = unit_dir().ok_or_else(|| CliError::Validation {
        field: "install".into(),
        reason: "cannot locate the user configuration directory".into(),
    })?;
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(UNIT_NAME);
    std::fs::write(&path, unit)?;

    if !global.quiet {
        eprintln!("✓ Service unit written to {}", path.display());
        eprintln!("  Enable it with: systemctl --user enable --now alignak-app");
    }
    Ok(())
}

/// Only Linux gets a systemd user unit.
fn ensure_systemd_platform(os: &str) -> Result<(), CliError> {
    if os == "linux" {
        Ok(())
    } else {
        Err(CliError::Unsupported {
            feature: "install".into(),
            os: os.into(),
        })
    }
}

fn unit_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("systemd").join("user"))
}

fn unit_file(exe: &str, profile: Option<&str>) -> String {
    let profile_arg = profile.map(|p| format!(" --profile {p}")).unwrap_or_default();
    format!(
        "[Unit]\n\
         Description=Alignak monitoring client\n\
         After=network-online.target\n\
         \n\
         [Service]\n\
         ExecStart={exe}{profile_arg} start\n\
         Restart=on-failure\n\
         RestartSec=30\n\
         \n\
         [Install]\n\
         WantedBy=default.target\n"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unit_runs_start_with_profile() {
        let unit = unit_file("/usr/bin/alignak-app", Some("prod"));
        assert!(unit.contains("ExecStart=/usr/bin/alignak-app --profile prod start\n"));
        assert!(unit.contains("WantedBy=default.target"));
    }

    #[test]
    fn install_is_linux_only() {
        assert!(ensure_systemd_platform("linux").is_ok());
        let err = ensure_systemd_platform("macos").unwrap_err();
        assert!(matches!(err, CliError::Unsupported { ref os, .. } if os == "macos"));
        assert_eq!(err.exit_code(), crate::error::exit_code::GENERAL);
    }

    #[test]
    fn unit_without_profile_uses_default() {
        let unit = unit_file("/opt/alignak-app", None);
        assert!(unit.contains("ExecStart=/opt/alignak-app start\n"));
    }
}
