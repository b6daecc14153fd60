//! End-to-end: UDP datagram in, resolver decision, egress queue out.

mod common;

use common::ScriptedResolver;
use cotproxy::{IngestListener, Pipeline, PipelineOptions};
use cotproxy_core::{TfLookup, TransformRule};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use url::Url;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

const DATAGRAM: &str = r#"<event version="2.0" uid="MMSI-993692001" type="a-f-S" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g"><point lat="33.7" lon="-118.2" hae="0.0" ce="10.0" le="5.0"/><detail callsign="SEAWOLF"><contact callsign="SEAWOLF"/></detail></event>"#;

async fn run_proxy(
    resolver: Arc<ScriptedResolver>,
    pass_all: bool,
    auto_add: bool,
) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<cotproxy_cot::CotEvent>) {
    let listener = IngestListener::bind(&Url::parse("udp://127.0.0.1:0").unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
    let (egress_tx, egress_rx) = mpsc::unbounded_channel();

    let _serve = listener.spawn(ingest_tx);
    let pipeline = Pipeline::new(
        resolver,
        PipelineOptions {
            pass_all,
            auto_add,
            node: "e2e-node".to_string(),
        },
    );
    tokio::spawn(pipeline.run(ingest_rx, egress_tx));

    (addr, egress_rx)
}

#[tokio::test]
async fn unknown_identity_is_auto_registered_and_relayed() {
    let resolver = Arc::new(ScriptedResolver::new(TfLookup::NotFound));
    let (addr, mut egress_rx) = run_proxy(resolver.clone(), true, true).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(DATAGRAM.as_bytes(), addr).await.unwrap();

    let event = timeout(RECV_TIMEOUT, egress_rx.recv())
        .await
        .expect("timed out waiting for egress")
        .expect("egress closed");

    // Original event relayed untransformed.
    assert_eq!(event.uid(), Some("MMSI-993692001"));
    assert_eq!(event.event_type(), Some("a-f-S"));
    assert!(event.root.child("_cotproxy_").is_none());

    let registrations = resolver.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].uid, "MMSI-993692001");
}

#[tokio::test]
async fn known_identity_is_transformed_on_egress() {
    let rule: TransformRule = serde_json::from_str(
        r#"{"active": true, "callsign": "EAGLE1", "cot_type": "a-f-A"}"#,
    )
    .unwrap();
    let resolver = Arc::new(ScriptedResolver::new(TfLookup::Found(rule)));
    let (addr, mut egress_rx) = run_proxy(resolver, false, false).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(DATAGRAM.as_bytes(), addr).await.unwrap();

    let event = timeout(RECV_TIMEOUT, egress_rx.recv())
        .await
        .expect("timed out waiting for egress")
        .expect("egress closed");

    assert_eq!(event.event_type(), Some("a-f-A"));
    assert_eq!(event.detail().unwrap().attr("callsign"), Some("EAGLE1"));
    let stamp = event.root.child("_cotproxy_").unwrap();
    assert_eq!(stamp.attr("tfd"), Some("True"));
}
