//! Transform resolver: the client side of the transform registry protocol.
//!
//! The pipeline talks to the registry exclusively through the
//! [`TransformResolver`] trait so tests can substitute scripted
//! implementations; [`RegistryClient`] is the production implementation over
//! one long-lived HTTP session.

pub mod registry;

use async_trait::async_trait;
use cotproxy_core::TfLookup;

pub use registry::{RegistryClient, RegistryError};

/// Identity registration payload for the auto-add side effect.
///
/// Built from the first-seen event; its delivery is fire-and-forget with
/// respect to that event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub uid: String,
    pub cot_type: Option<String>,
    pub callsign: Option<String>,
    pub remarks: Option<String>,
}

/// Lookup/registration seam between the pipeline and the registry.
#[async_trait]
pub trait TransformResolver: Send + Sync {
    /// Look up the transform rule for an identity. Never fails; connectivity
    /// problems surface as [`TfLookup::Unavailable`].
    async fn resolve(&self, uid: &str) -> TfLookup;

    /// Register a first-seen identity (and a transform stub when a callsign
    /// is known). Failures are logged and swallowed; the outcome never
    /// changes how the triggering event is handled.
    async fn register(&self, registration: &Registration);

    /// Resolve an icon reference into an iconset path
    /// (`"{iconset_id}/{iconset_name}/{icon_id}"`). Returns `None` on any
    /// failure so icon substitution can be skipped without failing the
    /// primary transform.
    async fn resolve_icon(&self, icon: &str) -> Option<String>;
}
