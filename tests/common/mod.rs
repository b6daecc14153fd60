//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cotproxy_client::{Registration, TransformResolver};
use cotproxy_core::TfLookup;
use cotproxy_cot::{decode_single, CotEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A resolver that answers every lookup with the same scripted result and
/// records what was asked of it.
pub struct ScriptedResolver {
    lookup: TfLookup,
    icon_path: Option<String>,
    resolve_calls: AtomicUsize,
    registrations: Mutex<Vec<Registration>>,
}

impl ScriptedResolver {
    pub fn new(lookup: TfLookup) -> Self {
        Self {
            lookup,
            icon_path: None,
            resolve_calls: AtomicUsize::new(0),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_icon_path(mut self, path: Option<&str>) -> Self {
        self.icon_path = path.map(str::to_string);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransformResolver for ScriptedResolver {
    async fn resolve(&self, _uid: &str) -> TfLookup {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup.clone()
    }

    async fn register(&self, registration: &Registration) {
        self.registrations.lock().unwrap().push(registration.clone());
    }

    async fn resolve_icon(&self, _icon: &str) -> Option<String> {
        self.icon_path.clone()
    }
}

pub fn event_with_uid(uid: &str) -> CotEvent {
    decode_single(&format!(
        r#"<event version="2.0" uid="{uid}" type="a-f-S" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g"><point lat="33.7" lon="-118.2" hae="0.0" ce="10.0" le="5.0"/><detail callsign="SEAWOLF"><contact callsign="SEAWOLF"/></detail></event>"#
    ))
    .unwrap()
}

pub fn event_without_uid() -> CotEvent {
    decode_single(r#"<event version="2.0" type="a-f-G" how="m-g"/>"#).unwrap()
}
