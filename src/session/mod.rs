//! Flow session: persistence boundary and builder-side orchestration.

mod controller;
mod http;
mod store;

pub use controller::{FlowSession, Selection, Shortcut};
pub use http::HttpFlowStore;
pub use store::{FlowStore, MemoryFlowStore};
