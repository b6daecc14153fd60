//! HTTP client for the COTProxy transform registry (CPAPI).

use async_trait::async_trait;
use cotproxy_core::{TfLookup, TransformRule};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{Registration, TransformResolver};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid registry endpoint path: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("registry answered unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

#[derive(Serialize)]
struct CreateObject<'a> {
    uid: &'a str,
}

#[derive(Serialize)]
struct CreateTransform<'a> {
    cot_uid: &'a str,
    cot_type: Option<&'a str>,
    callsign: &'a str,
    remarks: Option<&'a str>,
}

#[derive(Deserialize)]
struct IconRef {
    iconset: String,
}

#[derive(Deserialize)]
struct IconsetRef {
    name: String,
}

/// Client for the transform registry, holding one connection-pooled HTTP
/// session against the base URL for the life of the process.
pub struct RegistryClient {
    http: reqwest::Client,
    base: Url,
}

impl RegistryClient {
    pub fn new(base: Url) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: with_trailing_slash(base),
        })
    }

    /// Base URL this client resolves endpoints against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, RegistryError> {
        Ok(self.base.join(path)?)
    }

    /// Existence probe: plain GET on a resource path. 404 means absent;
    /// any success means present.
    pub async fn exists(&self, endpoint: &str, pkey: &str) -> Result<bool, RegistryError> {
        let url = self.endpoint(&format!("{endpoint}/{pkey}"))?;
        let resp = self.http.get(url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(RegistryError::UnexpectedStatus(status)),
        }
    }

    async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<StatusCode, RegistryError> {
        let url = self.endpoint(path)?;
        let resp = self.http.post(url).json(payload).send().await?;
        Ok(resp.status())
    }
}

#[async_trait]
impl TransformResolver for RegistryClient {
    async fn resolve(&self, uid: &str) -> TfLookup {
        let url = match self.endpoint(&format!("tf/{uid}")) {
            Ok(url) => url,
            Err(e) => return TfLookup::Unavailable(e.to_string()),
        };

        match self.http.get(url).send().await {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => TfLookup::NotFound,
            Ok(resp) if resp.status().is_success() => match resp.json::<TransformRule>().await {
                Ok(rule) => TfLookup::Found(rule),
                Err(e) => TfLookup::Unavailable(format!("undecodable rule body: {e}")),
            },
            Ok(resp) => TfLookup::Unavailable(format!("registry answered {}", resp.status())),
            Err(e) => TfLookup::Unavailable(e.to_string()),
        }
    }

    async fn register(&self, registration: &Registration) {
        let object = CreateObject {
            uid: &registration.uid,
        };
        match self.post_json("co/", &object).await {
            Ok(status) => debug!(uid = %registration.uid, %status, "co/ call"),
            Err(e) => {
                warn!(uid = %registration.uid, error = %e, "failed to register object");
                return;
            }
        }

        // A transform stub only makes sense when a callsign is derivable.
        let Some(callsign) = registration.callsign.as_deref() else {
            return;
        };
        let transform = CreateTransform {
            cot_uid: &registration.uid,
            cot_type: registration.cot_type.as_deref(),
            callsign,
            remarks: registration.remarks.as_deref(),
        };
        match self.post_json("tf/", &transform).await {
            Ok(status) => debug!(uid = %registration.uid, %status, "tf/ call"),
            Err(e) => warn!(uid = %registration.uid, error = %e, "failed to register transform stub"),
        }
    }

    async fn resolve_icon(&self, icon: &str) -> Option<String> {
        let lookup = async {
            let url = self.endpoint(&format!("icon/{icon}"))?;
            let icon_ref: IconRef = self.http.get(url).send().await?.error_for_status()?.json().await?;

            let url = self.endpoint(&format!("iconset/{}", icon_ref.iconset))?;
            let iconset: IconsetRef =
                self.http.get(url).send().await?.error_for_status()?.json().await?;

            Ok::<String, RegistryError>(format!("{}/{}/{}", icon_ref.iconset, iconset.name, icon))
        };

        match lookup.await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(icon, error = %e, "icon resolution failed, skipping substitution");
                None
            }
        }
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
