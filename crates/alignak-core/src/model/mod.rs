// ── Domain model ──

pub mod event;
pub mod resource;
pub mod resource_type;
pub mod state;
pub mod views;

pub use event::StoreEvent;
pub use resource::{Resource, ResourceId};
pub use resource_type::ResourceType;
pub use state::State;
pub use views::{
    HostCounts, HostWithServices, ItemCounts, ItemsAndProblems, Problems, ServiceCounts,
    SynthesisCount,
};
