//! Transform-stage behavior against scripted resolvers.

mod common;

use common::{event_with_uid, event_without_uid, ScriptedResolver};
use cotproxy::{Pipeline, PipelineOptions, PipelineStats};
use cotproxy_core::{TfLookup, TransformRule};
use cotproxy_cot::CotEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

const NODE: &str = "test-node";

fn options(pass_all: bool, auto_add: bool) -> PipelineOptions {
    PipelineOptions {
        pass_all,
        auto_add,
        node: NODE.to_string(),
    }
}

/// Feed events through a pipeline and collect everything that reaches the
/// egress queue.
async fn run_pipeline(
    pipeline: Pipeline,
    events: Vec<CotEvent>,
) -> (Vec<CotEvent>, PipelineStats) {
    let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
    let (egress_tx, mut egress_rx) = mpsc::unbounded_channel();

    for event in events {
        ingest_tx.send(event).unwrap();
    }
    drop(ingest_tx);

    let stats = pipeline.run(ingest_rx, egress_tx).await;

    let mut out = Vec::new();
    while let Ok(event) = egress_rx.try_recv() {
        out.push(event);
    }
    (out, stats)
}

fn active_rule(json: &str) -> TfLookup {
    TfLookup::Found(serde_json::from_str::<TransformRule>(json).unwrap())
}

#[tokio::test]
async fn no_uid_event_never_reaches_resolver() {
    for pass_all in [false, true] {
        let resolver = Arc::new(ScriptedResolver::new(TfLookup::NotFound));
        let pipeline = Pipeline::new(resolver.clone(), options(pass_all, true));
        let input = event_without_uid();

        let (out, stats) = run_pipeline(pipeline, vec![input.clone()]).await;

        assert_eq!(resolver.resolve_calls(), 0);
        assert!(resolver.registrations().is_empty());
        if pass_all {
            assert_eq!(out, vec![input]);
        } else {
            assert!(out.is_empty());
            assert_eq!(stats.dropped, 1);
        }
    }
}

#[tokio::test]
async fn found_active_rule_transforms_event() {
    let resolver = Arc::new(ScriptedResolver::new(active_rule(
        r#"{"active": true, "callsign": "EAGLE1", "cot_type": "a-f-A"}"#,
    )));
    let pipeline = Pipeline::new(resolver, options(false, false));

    let (out, stats) = run_pipeline(pipeline, vec![event_with_uid("MMSI-993692001")]).await;

    assert_eq!(out.len(), 1);
    let event = &out[0];
    assert_eq!(event.uid(), Some("MMSI-993692001"));
    assert_eq!(event.event_type(), Some("a-f-A"));
    let detail = event.detail().unwrap();
    assert_eq!(detail.attr("callsign"), Some("EAGLE1"));
    assert_eq!(
        detail.child("contact").unwrap().attr("callsign"),
        Some("EAGLE1")
    );
    let stamp = event.root.child("_cotproxy_").unwrap();
    assert_eq!(stamp.attr("tfd"), Some("True"));
    assert_eq!(stamp.attr("node"), Some(NODE));
    assert_eq!(stats.transformed, 1);
}

#[tokio::test]
async fn found_inactive_rule_passes_through_unmodified() {
    let resolver = Arc::new(ScriptedResolver::new(active_rule(
        r#"{"active": false, "callsign": "TACO1"}"#,
    )));
    // pass_all off: an inactive rule still means "rule exists", so the
    // event is relayed, untouched.
    let pipeline = Pipeline::new(resolver, options(false, false));
    let input = event_with_uid("ICAO-AE1234");

    let (out, _) = run_pipeline(pipeline, vec![input.clone()]).await;

    assert_eq!(out, vec![input]);
    assert!(out[0].root.child("_cotproxy_").is_none());
}

#[tokio::test]
async fn not_found_with_auto_add_registers_and_passes() {
    let resolver = Arc::new(ScriptedResolver::new(TfLookup::NotFound));
    let pipeline = Pipeline::new(resolver.clone(), options(true, true));
    let input = event_with_uid("MMSI-993692001");

    let (out, _) = run_pipeline(pipeline, vec![input.clone()]).await;

    let registrations = resolver.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].uid, "MMSI-993692001");
    assert_eq!(registrations[0].cot_type.as_deref(), Some("a-f-S"));
    assert_eq!(registrations[0].callsign.as_deref(), Some("SEAWOLF"));

    // Original event relayed untransformed.
    assert_eq!(out, vec![input]);
}

#[tokio::test]
async fn not_found_without_auto_add_or_pass_all_drops() {
    let resolver = Arc::new(ScriptedResolver::new(TfLookup::NotFound));
    let pipeline = Pipeline::new(resolver.clone(), options(false, false));

    let (out, stats) = run_pipeline(pipeline, vec![event_with_uid("ICAO-000001")]).await;

    assert!(resolver.registrations().is_empty());
    assert!(out.is_empty());
    assert_eq!(stats.dropped, 1);
}

#[tokio::test]
async fn unavailable_latches_degraded_with_pass_all() {
    let resolver = Arc::new(ScriptedResolver::new(TfLookup::Unavailable(
        "connection refused".to_string(),
    )));
    let pipeline = Pipeline::new(resolver.clone(), options(true, true));
    let inputs: Vec<_> = (0..3).map(|i| event_with_uid(&format!("ICAO-{i:06}"))).collect();

    let (out, _) = run_pipeline(pipeline, inputs.clone()).await;

    // One lookup, then the registry is out of the critical path for good.
    assert_eq!(resolver.resolve_calls(), 1);
    assert_eq!(out, inputs);
}

#[tokio::test]
async fn unavailable_latches_degraded_without_pass_all() {
    let resolver = Arc::new(ScriptedResolver::new(TfLookup::Unavailable(
        "connection refused".to_string(),
    )));
    let pipeline = Pipeline::new(resolver.clone(), options(false, false));
    let inputs: Vec<_> = (0..3).map(|i| event_with_uid(&format!("ICAO-{i:06}"))).collect();

    let (out, stats) = run_pipeline(pipeline, inputs).await;

    assert_eq!(resolver.resolve_calls(), 1);
    assert!(out.is_empty());
    assert_eq!(stats.dropped, 3);
}

#[tokio::test]
async fn degraded_from_start_never_resolves() {
    let pipeline = Pipeline::degraded(options(true, true));
    let input = event_with_uid("ICAO-DEAD01");

    let (out, _) = run_pipeline(pipeline, vec![input.clone()]).await;

    assert_eq!(out, vec![input]);
}

#[tokio::test]
async fn icon_reference_resolved_before_apply() {
    let resolver = Arc::new(
        ScriptedResolver::new(active_rule(
            r#"{"active": true, "icon": "CIV_FIXED_ISR.png"}"#,
        ))
        .with_icon_path(Some("66f14976/Public Safety Air/CIV_FIXED_ISR.png")),
    );
    let pipeline = Pipeline::new(resolver, options(false, false));

    let (out, _) = run_pipeline(pipeline, vec![event_with_uid("ICAO-A1B2C3")]).await;

    let usericon = out[0].detail().unwrap().child("usericon").unwrap();
    assert_eq!(
        usericon.attr("iconsetpath"),
        Some("66f14976/Public Safety Air/CIV_FIXED_ISR.png")
    );
}

#[tokio::test]
async fn failed_icon_lookup_skips_substitution_only() {
    let resolver = Arc::new(
        ScriptedResolver::new(active_rule(
            r#"{"active": true, "callsign": "EAGLE1", "icon": "CIV_FIXED_ISR.png"}"#,
        ))
        .with_icon_path(None),
    );
    let pipeline = Pipeline::new(resolver, options(false, false));

    let (out, _) = run_pipeline(pipeline, vec![event_with_uid("ICAO-A1B2C3")]).await;

    let event = &out[0];
    // Icon skipped, but the rest of the transform still lands.
    assert!(event.detail().unwrap().child("usericon").is_none());
    assert_eq!(event.detail().unwrap().attr("callsign"), Some("EAGLE1"));
    assert!(event.root.child("_cotproxy_").is_some());
}
