// ── Resource cache ──
//
// One watch-backed collection per resource type, written only by the
// controller's apply task.

mod collection;
mod data_store;
mod refresh;
mod views;

pub use collection::CollectionSnapshot;
pub use data_store::DataStore;
