use std::sync::Arc;

use super::resource::{Resource, ResourceId};
use super::resource_type::ResourceType;

/// Change notifications broadcast by the store.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A collection was replaced by a fresh fetch.
    Refreshed { kind: ResourceType, count: usize },
    /// A notification not seen in the previous fetch. Only emitted once
    /// the notification collection has been loaded at least once.
    NewNotification(Arc<Resource>),
    /// A record was patched after a successful write.
    ItemPatched { kind: ResourceType, id: ResourceId },
}
