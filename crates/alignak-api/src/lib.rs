//! Async client for the Alignak monitoring backend.
//!
//! The backend is an Eve REST service: collections live under
//! `/<endpoint>`, filtered with the `where` / `projection` / `sort` query
//! parameters and paged with `page` / `max_results`. Authentication is a
//! token obtained from `POST /login`, replayed as HTTP basic auth.
//!
//! [`BackendClient`] owns the transport, the session token, and the
//! connectivity flag that the rest of the workspace inspects to decide
//! whether the backend is reachable.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod params;
pub mod transport;

pub use client::BackendClient;
pub use error::Error;
pub use models::{ItemsPage, PageMeta, WriteResponse};
pub use params::QueryParams;
pub use transport::{TlsMode, TransportConfig};
