//! Data source abstraction layer.
//!
//! This module defines the [`DataSource`] trait, the typed [`FetchError`]
//! every source reports, and the service data model.  The concrete HTTP
//! implementation lives in [`http`].
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory (e.g. `file.rs` for a fixture
//!    source).
//! 2. Define a struct and implement [`DataSource`] for it.
//! 3. Add `mod file;` below and re-export your struct in the `pub use` block.
//! 4. Construct it in `main.rs` and hand it to the
//!    [`RefreshController`](crate::refresh::RefreshController).
//!
//! The refresh controller, the UI and the tests are all source-agnostic.

mod http;
mod model;

// Re-export the public API of this module so callers can write
// `use crate::source::{DataSource, HttpSource, ServiceGroup};`
pub use http::HttpSource;
pub use model::{Incident, IncidentKind, ServiceCheck, ServiceGroup, ServiceStatus};

use std::future::Future;

use thiserror::Error;

/// Why a single fetch failed.
///
/// The `Display` text is what the dashboard shows to the user, so keep it
/// human-readable.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, refused connection,
    /// dropped body, ...).
    #[error("Failed to connect to backend: {0}")]
    Network(String),

    /// The backend answered, but not with something we can use.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The fetch task panicked or was cancelled before producing a result.
    #[error("Refresh task failed: {0}")]
    Task(String),
}

/// An HTTP-level or schema-level failure.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Non-2xx response.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The body was not an array of well-formed service groups.
    #[error("Invalid response from backend: {0}")]
    Body(#[from] serde_json::Error),
}

/// Trait that every data source must implement.
///
/// The refresh controller calls
/// [`fetch_service_groups()`](DataSource::fetch_service_groups) from a
/// spawned tokio task, so both the source and the returned future must be
/// [`Send`].
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* config fields */ }
///
/// impl DataSource for MySource {
///     async fn fetch_service_groups(&self) -> Result<Vec<ServiceGroup>, FetchError> {
///         // Perform one round trip, then convert into ServiceGroup values.
///         todo!()
///     }
/// }
/// ```
pub trait DataSource: Send + Sync + 'static {
    /// Fetch the current snapshot of every service group.
    ///
    /// Exactly one round trip per call: no retries and no caching.  Group
    /// and check order must be preserved as received.
    fn fetch_service_groups(
        &self,
    ) -> impl Future<Output = Result<Vec<ServiceGroup>, FetchError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
