//! Pipeline orchestrator: the transform stage between the ingest and
//! egress queues.
//!
//! Runs as its own task so a slow or unavailable registry never blocks
//! packet ingestion. Per run the stage moves through
//! `Connected -> Degraded`; Degraded is terminal for the process lifetime.
//! Entering Degraded removes the registry from the critical path entirely,
//! trading per-object transform correctness for availability of the basic
//! relay function.

use cotproxy_client::{Registration, TransformResolver};
use cotproxy_core::{TfLookup, TransformRule};
use cotproxy_cot::CotEvent;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Pipeline behavior options, from the merged proxy configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Relay events even when no transform decision could be made.
    pub pass_all: bool,
    /// Auto-register unknown identities on first sighting.
    pub auto_add: bool,
    /// Identity of this processing node, stamped into provenance.
    pub node: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Connected,
    Degraded,
}

/// Counters reported when the stage exits.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub processed: u64,
    pub transformed: u64,
    pub passed: u64,
    pub dropped: u64,
}

pub struct Pipeline {
    resolver: Option<Arc<dyn TransformResolver>>,
    options: PipelineOptions,
    state: PipelineState,
    stats: PipelineStats,
}

impl Pipeline {
    /// A pipeline with a live resolver session, starting Connected.
    pub fn new(resolver: Arc<dyn TransformResolver>, options: PipelineOptions) -> Self {
        Self {
            resolver: Some(resolver),
            options,
            state: PipelineState::Connected,
            stats: PipelineStats::default(),
        }
    }

    /// A pipeline whose resolver session could not be opened: Degraded from
    /// the first event.
    pub fn degraded(options: PipelineOptions) -> Self {
        warn!("starting in degraded mode, transforms disabled");
        Self {
            resolver: None,
            options,
            state: PipelineState::Degraded,
            stats: PipelineStats::default(),
        }
    }

    /// Run the transform stage until the ingest queue closes. Returns the
    /// final counters.
    pub async fn run(
        mut self,
        mut ingest_rx: UnboundedReceiver<CotEvent>,
        egress_tx: UnboundedSender<CotEvent>,
    ) -> PipelineStats {
        while let Some(event) = ingest_rx.recv().await {
            self.stats.processed += 1;
            self.handle_event(event, &egress_tx).await;
        }
        info!(
            processed = self.stats.processed,
            transformed = self.stats.transformed,
            passed = self.stats.passed,
            dropped = self.stats.dropped,
            "transform stage finished"
        );
        self.stats
    }

    async fn handle_event(&mut self, event: CotEvent, egress_tx: &UnboundedSender<CotEvent>) {
        // Un-routable events never reach the resolver. Frequent and
        // expected, so not an error.
        let Some(uid) = event.uid().map(str::to_string) else {
            debug!("event has no uid");
            self.relay_undecided(event, egress_tx);
            return;
        };

        if self.state == PipelineState::Degraded {
            self.relay_undecided(event, egress_tx);
            return;
        }

        let Some(resolver) = self.resolver.clone() else {
            self.relay_undecided(event, egress_tx);
            return;
        };

        match resolver.resolve(&uid).await {
            TfLookup::Found(rule) => {
                if rule.active {
                    let rule = self.resolve_rule_icon(&resolver, rule).await;
                    let transformed = cotproxy_transform::apply(event, &rule, &self.options.node);
                    self.stats.transformed += 1;
                    self.emit(transformed, egress_tx);
                } else {
                    debug!(uid = %uid, "rule inactive, passing through");
                    self.stats.passed += 1;
                    self.emit(event, egress_tx);
                }
            }
            TfLookup::NotFound => {
                if self.options.auto_add {
                    info!(uid = %uid, "auto-registering unknown identity");
                    resolver.register(&registration_for(&uid, &event)).await;
                }
                self.relay_undecided(event, egress_tx);
            }
            TfLookup::Unavailable(reason) => {
                warn!(uid = %uid, reason = %reason, "registry unreachable, entering degraded mode");
                self.state = PipelineState::Degraded;
                self.relay_undecided(event, egress_tx);
            }
        }
    }

    /// Pre-resolve the rule's icon reference into an iconset path. A failed
    /// icon lookup skips the substitution without failing the transform.
    async fn resolve_rule_icon(
        &self,
        resolver: &Arc<dyn TransformResolver>,
        mut rule: TransformRule,
    ) -> TransformRule {
        if let Some(icon) = rule.icon.take() {
            rule.icon = resolver.resolve_icon(&icon).await;
        }
        rule
    }

    /// Policy for events with no transform decision (no uid, unknown
    /// identity, degraded mode): relay iff pass-all, else drop.
    fn relay_undecided(&mut self, event: CotEvent, egress_tx: &UnboundedSender<CotEvent>) {
        if self.options.pass_all {
            self.stats.passed += 1;
            self.emit(event, egress_tx);
        } else {
            self.stats.dropped += 1;
        }
    }

    fn emit(&self, event: CotEvent, egress_tx: &UnboundedSender<CotEvent>) {
        // The egress consumer going away ends the process anyway; nothing
        // useful to do with the event here.
        let _ = egress_tx.send(event);
    }
}

fn registration_for(uid: &str, event: &CotEvent) -> Registration {
    Registration {
        uid: uid.to_string(),
        cot_type: event.event_type().map(str::to_string),
        callsign: event.callsign().map(str::to_string),
        remarks: event.remarks().map(str::to_string),
    }
}
