//! Read-only views over the monitoring cache.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use alignak_core::{
    ControllerConfig, DataStore, HostWithServices, ItemsAndProblems, Resource, ResourceType,
    SynthesisCount,
};

use crate::cli::{GlobalOpts, HostsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Ack")]
    ack: String,
    #[tabled(rename = "Downtime")]
    downtime: String,
    #[tabled(rename = "Output")]
    output: String,
}

impl HostRow {
    fn new(h: &Resource, color: bool) -> Self {
        Self {
            name: h.name.clone(),
            state: output::paint_state(h.ls_state().as_ref(), color),
            ack: util::flag(h.is_acknowledged()),
            downtime: util::flag(h.is_downtimed()),
            output: h.str_field("ls_output").unwrap_or_default().to_owned(),
        }
    }
}

#[derive(Tabled)]
struct ProblemRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Output")]
    output: String,
}

#[derive(Tabled)]
struct DaemonRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Alive")]
    alive: String,
    #[tabled(rename = "Reachable")]
    reachable: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Realm")]
    realm: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&Arc<Resource>> for EventRow {
    fn from(e: &Arc<Resource>) -> Self {
        let service = e.str_field("service_name").unwrap_or_default();
        let message = e.str_field("message").unwrap_or_default();
        Self {
            date: e.str_field("_created").unwrap_or_default().to_owned(),
            kind: e.name.clone(),
            message: if service.is_empty() {
                message.to_owned()
            } else {
                format!("{service}: {message}")
            },
        }
    }
}

/// `synthesis` output: backend counters next to what the cache holds.
#[derive(Serialize)]
struct SynthesisView {
    synthesis: SynthesisCount,
    cached: ItemsAndProblems,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn hosts(
    config: ControllerConfig,
    args: HostsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = util::load_store(config, &[ResourceType::Host]).await?;
    let snap = store.snapshot(ResourceType::Host);
    let hosts: Vec<Arc<Resource>> = snap
        .iter()
        .filter(|h| args.filter.as_deref().is_none_or(|f| h.name.contains(f)))
        .filter(|h| {
            !args.failing
                || h.ls_state()
                    .is_some_and(|s| s.is_failure_for(ResourceType::Host))
        })
        .cloned()
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &hosts,
        |h| HostRow::new(h, color),
        |h| h.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn host(config: ControllerConfig, name: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::load_store(
        config,
        &[ResourceType::Realm, ResourceType::Host, ResourceType::Service],
    )
    .await?;
    let hws = store
        .get_host_with_services(name)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "host".into(),
            identifier: name.into(),
            list_command: "hosts".into(),
        })?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &hws,
        |hws| host_detail(&store, hws, color),
        |hws| hws.host.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn host_detail(store: &DataStore, hws: &HostWithServices, color: bool) -> String {
    let h = &hws.host;
    let mut out = String::new();
    let _ = writeln!(out, "Host:      {}", h.name);
    let _ = writeln!(out, "ID:        {}", h.id);
    if let Some(alias) = h.str_field("alias") {
        let _ = writeln!(out, "Alias:     {alias}");
    }
    if let Some(address) = h.str_field("address") {
        let _ = writeln!(out, "Address:   {address}");
    }
    if let Some(realm) = h.realm_id().and_then(|r| store.get_realm_name(r)) {
        let _ = writeln!(out, "Realm:     {realm}");
    }
    let _ = writeln!(out, "State:     {}", output::paint_state(h.ls_state().as_ref(), color));
    if let Some(o) = h.str_field("ls_output") {
        let _ = writeln!(out, "Output:    {o}");
    }
    if h.is_acknowledged() {
        let _ = writeln!(out, "           acknowledged");
    }
    if h.is_downtimed() {
        let _ = writeln!(out, "           in downtime");
    }
    if let Some(notes) = h.str_field("notes").filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "Notes:     {notes}");
    }

    let _ = writeln!(out, "\nServices ({}):", hws.services.len());
    for s in &hws.services {
        let _ = writeln!(
            out,
            "  {:<24} {:<12} {}",
            s.name,
            output::paint_state(s.ls_state().as_ref(), color),
            s.str_field("ls_output").unwrap_or_default()
        );
    }
    out.trim_end().to_owned()
}

pub async fn problems(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::load_store(config, &[ResourceType::Host, ResourceType::Service]).await?;
    let problems = store.get_problems();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &problems.problems,
        |p| problem_row(&store, p, color),
        |p| p.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    if !global.quiet && matches!(global.output, crate::cli::OutputFormat::Table) {
        eprintln!(
            "{} host problem(s), {} service problem(s)",
            problems.hosts_nb, problems.services_nb
        );
    }
    Ok(())
}

fn problem_row(store: &DataStore, p: &Resource, color: bool) -> ProblemRow {
    let (host, service) = match p.kind {
        ResourceType::Service => (util::host_name_of(store, p), p.name.clone()),
        _ => (p.name.clone(), String::new()),
    };
    ProblemRow {
        host,
        service,
        state: output::paint_state(p.ls_state().as_ref(), color),
        output: p.str_field("ls_output").unwrap_or_default().to_owned(),
    }
}

pub async fn synthesis(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::load_store(
        config,
        &[
            ResourceType::Host,
            ResourceType::Service,
            ResourceType::LiveSynthesis,
        ],
    )
    .await?;
    let view = SynthesisView {
        synthesis: store.synthesis_count(),
        cached: store.get_items_and_problems(),
    };
    let out = output::render_single(&global.output, &view, synthesis_detail, |v| {
        format!(
            "{} {}",
            v.synthesis.hosts.total, v.synthesis.services.total
        )
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn synthesis_detail(v: &SynthesisView) -> String {
    let h = &v.synthesis.hosts;
    let s = &v.synthesis.services;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Hosts:    {} total, {} up, {} down, {} unreachable, {} not monitored",
        h.total, h.up, h.down, h.unreachable, h.not_monitored
    );
    let _ = writeln!(
        out,
        "          {} acknowledged, {} in downtime, {} flapping",
        h.acknowledged, h.in_downtime, h.flapping
    );
    let _ = writeln!(
        out,
        "Services: {} total, {} ok, {} warning, {} critical, {} unknown, {} unreachable",
        s.total, s.ok, s.warning, s.critical, s.unknown, s.unreachable
    );
    let _ = writeln!(
        out,
        "          {} acknowledged, {} in downtime, {} flapping",
        s.acknowledged, s.in_downtime, s.flapping
    );
    let _ = write!(
        out,
        "Problems: {}/{} hosts, {}/{} services",
        v.cached.hosts.problems, v.cached.hosts.total, v.cached.services.problems, v.cached.services.total
    );
    out
}

pub async fn daemons(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::load_store(config, &[ResourceType::Realm, ResourceType::Daemon]).await?;
    let snap = store.snapshot(ResourceType::Daemon);
    let daemons: Vec<Arc<Resource>> = snap.iter().cloned().collect();

    let out = output::render_list(
        &global.output,
        &daemons,
        |d| DaemonRow {
            name: d.name.clone(),
            kind: d.str_field("type").unwrap_or_default().to_owned(),
            alive: util::flag(d.bool_field("alive")),
            reachable: util::flag(d.bool_field("reachable")),
            address: match (d.str_field("address"), d.u64_field("port")) {
                (Some(a), Some(p)) => format!("{a}:{p}"),
                (Some(a), None) => a.to_owned(),
                _ => String::new(),
            },
            realm: d
                .realm_id()
                .and_then(|r| store.get_realm_name(r))
                .unwrap_or_default(),
        },
        |d| d.name.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if !global.quiet && matches!(global.output, crate::cli::OutputFormat::Table) {
        let (alive, total) = store.daemons_status();
        eprintln!("{alive}/{total} daemon(s) alive");
    }
    Ok(())
}

pub async fn history(
    config: ControllerConfig,
    host: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = util::load_store(config, &[ResourceType::Host, ResourceType::History]).await?;
    let hws = store
        .get_host_with_services(host)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "host".into(),
            identifier: host.into(),
            list_command: "hosts".into(),
        })?;
    let entries = store.get_host_history(hws.host.id.as_str());

    let out = output::render_list(&global.output, &entries, |e| EventRow::from(e), |e| {
        e.id.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn notifications(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::load_store(config, &[ResourceType::Notification]).await?;
    let entries = store.notifications();

    let out = output::render_list(&global.output, &entries, |e| EventRow::from(e), |e| {
        e.str_field("message").unwrap_or_default().to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn user(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let store = util::load_store(config, &[ResourceType::Timeperiod]).await?;
    let user = store.user().ok_or_else(|| CliError::NotFound {
        resource_type: "user".into(),
        identifier: "(session)".into(),
        list_command: "user".into(),
    })?;

    let out = output::render_single(
        &global.output,
        &user,
        |u| user_detail(&store, u),
        |u| u.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn user_detail(store: &DataStore, u: &Resource) -> String {
    let period = |field: &str| {
        u.str_field(field)
            .map(|id| store.get_period_name(id).unwrap_or_else(|| id.to_owned()))
            .unwrap_or_default()
    };
    let mut out = String::new();
    let _ = writeln!(out, "User:          {}", u.name);
    if let Some(alias) = u.str_field("alias") {
        let _ = writeln!(out, "Alias:         {alias}");
    }
    if let Some(email) = u.str_field("email") {
        let _ = writeln!(out, "Email:         {email}");
    }
    let _ = writeln!(out, "Administrator: {}", u.bool_field("is_admin"));
    let _ = writeln!(out, "Commands:      {}", u.bool_field("can_submit_commands"));
    let _ = writeln!(
        out,
        "Host notif.:   {} ({})",
        u.bool_field("host_notifications_enabled"),
        period("host_notification_period")
    );
    let _ = write!(
        out,
        "Service notif: {} ({})",
        u.bool_field("service_notifications_enabled"),
        period("service_notification_period")
    );
    out
}
