//! Write commands: acknowledge, downtime, notes, password.

use secrecy::{ExposeSecret, SecretString};

use alignak_core::{Command as CoreCommand, CommandResult, Controller, ControllerConfig, ResourceType};

use crate::cli::{AckArgs, DowntimeArgs, GlobalOpts};
use crate::error::CliError;

use super::util;

const TARGET_KINDS: &[ResourceType] = &[ResourceType::Host, ResourceType::Service];

pub async fn acknowledge(
    config: ControllerConfig,
    args: AckArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = args.target.clone();
    Controller::oneshot(util::with_kinds(config, TARGET_KINDS), |c| async move {
        let (kind, id) = util::resolve_target(c.store(), &args.target)?;
        c.execute(CoreCommand::Acknowledge {
            kind,
            id,
            comment: args.comment,
            sticky: !args.not_sticky,
            notify: args.notify,
        })
        .await
    })
    .await?;

    if !global.quiet {
        eprintln!("Acknowledge requested for {target}");
    }
    Ok(())
}

pub async fn downtime(
    config: ControllerConfig,
    args: DowntimeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let target = args.target.clone();
    let length = humantime::format_duration(args.duration).to_string();
    Controller::oneshot(util::with_kinds(config, TARGET_KINDS), |c| async move {
        let (kind, id) = util::resolve_target(c.store(), &args.target)?;
        c.execute(CoreCommand::Downtime {
            kind,
            id,
            duration: args.duration,
            fixed: !args.flexible,
            comment: args.comment,
        })
        .await
    })
    .await?;

    if !global.quiet {
        eprintln!("Downtime of {length} requested for {target}");
    }
    Ok(())
}

pub async fn notes(
    config: ControllerConfig,
    target: String,
    notes: String,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = Controller::oneshot(util::with_kinds(config, TARGET_KINDS), |c| async move {
        let (kind, id) = util::resolve_target(c.store(), &target)?;
        c.execute(CoreCommand::EditNotes { kind, id, notes }).await
    })
    .await?;

    if !global.quiet {
        if let CommandResult::Updated { kind, id, .. } = result {
            eprintln!("Notes updated on {kind} {id}");
        }
    }
    Ok(())
}

pub async fn password(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let password = prompt_new_password()?;
    let username = config.auth.username().unwrap_or("current user").to_owned();
    if !util::confirm(&format!("Change the password of {username}?"), global.yes)? {
        return Ok(());
    }

    Controller::oneshot(util::with_kinds(config, &[]), |c| async move {
        c.execute(CoreCommand::ChangePassword { password }).await
    })
    .await?;

    if !global.quiet {
        eprintln!("Password changed. Update your keyring with: alignak-app config set-password");
    }
    Ok(())
}

fn prompt_new_password() -> Result<SecretString, CliError> {
    let prompt_err = |e: std::io::Error| CliError::Validation {
        field: "password".into(),
        reason: format!("prompt failed: {e}"),
    };
    let first = SecretString::from(rpassword::prompt_password("New password: ").map_err(prompt_err)?);
    let second =
        SecretString::from(rpassword::prompt_password("Confirm password: ").map_err(prompt_err)?);

    if first.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    if first.expose_secret() != second.expose_secret() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }
    Ok(first)
}
