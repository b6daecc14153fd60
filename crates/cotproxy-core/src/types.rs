//! Transform rule types shared between the registry client and the engine.

use serde::{Deserialize, Serialize};

/// A per-object rewrite rule held by the transform registry.
///
/// Fetched as JSON from `GET /tf/{uid}`. Every field except `active` is an
/// optional override; a rule with no overrides set is a valid no-op. Unknown
/// fields in the registry payload are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Gate: a rule that exists but is inactive is not applied.
    #[serde(default)]
    pub active: bool,
    /// Callsign override, applied to both the `detail` attribute and the
    /// `detail/contact` attribute.
    #[serde(default)]
    pub callsign: Option<String>,
    /// CoT type override (e.g. "a-f-A").
    #[serde(default)]
    pub cot_type: Option<String>,
    /// Remark override. The registry has historically used both `remark`
    /// and `remarks` for this field.
    #[serde(default, alias = "remarks")]
    pub remark: Option<String>,
    /// Icon reference, resolved through the icon/iconset sub-protocol into
    /// an iconset path before application.
    #[serde(default)]
    pub icon: Option<String>,
    /// Video feed override.
    #[serde(default)]
    pub video: Option<VideoRule>,
}

/// Structured video override carried by a transform rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRule {
    pub url: String,
}

impl TransformRule {
    /// True if no override field is set. An empty rule still stamps
    /// provenance when active, but changes nothing observable.
    pub fn is_empty(&self) -> bool {
        self.callsign.is_none()
            && self.cot_type.is_none()
            && self.remark.is_none()
            && self.icon.is_none()
            && self.video.is_none()
    }
}

/// Outcome of a transform lookup against the registry.
///
/// `Found`/`NotFound` are ordinary control flow (HTTP 200/404); only
/// `Unavailable` represents a failure, and it is returned rather than
/// raised so the pipeline can degrade instead of crash.
#[derive(Debug, Clone, PartialEq)]
pub enum TfLookup {
    /// The registry holds a rule for this uid.
    Found(TransformRule),
    /// The registry answered: no rule for this uid.
    NotFound,
    /// The registry could not be reached or answered out of protocol.
    Unavailable(String),
}
