//! Shared helpers for command handlers.

use std::sync::Arc;

use alignak_core::{
    Controller, ControllerConfig, CoreError, DataStore, Resource, ResourceId, ResourceType,
};

use crate::error::CliError;

/// Restrict a one-shot load to `kinds` (the user record is always loaded).
pub fn with_kinds(mut config: ControllerConfig, kinds: &[ResourceType]) -> ControllerConfig {
    config.schedule.resources = kinds.to_vec();
    config
}

/// Log in, load `kinds` once, log out, and keep the filled store.
pub async fn load_store(
    config: ControllerConfig,
    kinds: &[ResourceType],
) -> Result<Arc<DataStore>, CliError> {
    let store = Controller::oneshot(with_kinds(config, kinds), |c| async move {
        Ok(Arc::clone(c.store()))
    })
    .await?;
    Ok(store)
}

/// Resolve `host` or `host/service` to a record type and id.
pub fn resolve_target(
    store: &DataStore,
    target: &str,
) -> Result<(ResourceType, ResourceId), CoreError> {
    let (host_key, service_name) = match target.split_once('/') {
        Some((host, service)) => (host, Some(service)),
        None => (target, None),
    };

    let hws = store
        .get_host_with_services(host_key)
        .ok_or_else(|| CoreError::NotFound {
            resource_type: "host".into(),
            identifier: host_key.into(),
        })?;

    let Some(service_name) = service_name else {
        return Ok((ResourceType::Host, hws.host.id.clone()));
    };

    hws.services
        .iter()
        .find(|s| s.name == service_name || s.id.as_str() == service_name)
        .map(|s| (ResourceType::Service, s.id.clone()))
        .ok_or_else(|| CoreError::NotFound {
            resource_type: "service".into(),
            identifier: target.into(),
        })
}

/// Name of the host owning `record`, falling back to its host id.
pub fn host_name_of(store: &DataStore, record: &Resource) -> String {
    let Some(host_id) = record.host_id() else {
        return String::new();
    };
    store
        .get_item(ResourceType::Host, "_id", host_id)
        .map_or_else(|| host_id.to_owned(), |h| h.name.clone())
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Yes / empty cell for boolean table columns.
pub fn flag(value: bool) -> String {
    if value { "yes".into() } else { String::new() }
}
