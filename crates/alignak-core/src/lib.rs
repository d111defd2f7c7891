//! Polling and caching layer between `alignak-api` and its consumers.
//!
//! - **[`Controller`]**: Lifecycle facade: [`connect()`](Controller::connect)
//!   logs in, loads every resource type once, then spawns the scheduler,
//!   the store apply task, and the command processor.
//!   [`Controller::oneshot()`](Controller::oneshot) skips the scheduler for
//!   single CLI invocations.
//!
//! - **[`DataStore`]**: Process-lifetime cache of the latest collection
//!   per [`ResourceType`]. Readers take `Arc` snapshots; the only writer is
//!   the apply task fed by an `mpsc` channel.
//!
//! - **[`TaskManager`]**: Timer-driven round-robin scheduler launching at
//!   most one fetch worker per resource type.
//!
//! - **[`query`]**: One fetch function per resource type, selected by
//!   matching on [`ResourceType`].
//!
//! - **[`Command`]**: Acknowledge / downtime / notes / password writes,
//!   routed through the controller's command channel.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod query;
pub mod scheduler;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{AuthCredentials, ControllerConfig, PollSchedule, TlsVerification};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use scheduler::{TaskManager, TickReport};
pub use store::{CollectionSnapshot, DataStore};
pub use stream::ResourceStream;

pub use model::{
    HostCounts, HostWithServices, ItemCounts, ItemsAndProblems, Problems, Resource, ResourceId,
    ResourceType, ServiceCounts, State, StoreEvent, SynthesisCount,
};
