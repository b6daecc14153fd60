//! Ingest network listener.
//!
//! Binds a TCP or UDP endpoint (selected once from the listen URL scheme),
//! decodes inbound bytes into CoT events, and pushes them onto the ingest
//! queue. The queue is unbounded and pushes never block: a slow transform
//! stage must not apply backpressure to the socket read path.
//!
//! State machine: `bind()` takes the listener from Unbound to Bound and is
//! itself the readiness gate; callers that need the socket live (the
//! orchestrator, tests using ephemeral ports) simply await it before
//! spawning the serve loop.

use anyhow::{Context, Result};
use bytes::BytesMut;
use cotproxy_core::config::host_port;
use cotproxy_cot::{decode_concatenated, decode_single, CotEvent};
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Maximum accepted frame size for a single CoT message (10MB).
const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// XML end token used for TCP stream framing.
const XML_END_TOKEN: &[u8] = b"</event>";

/// Maximum UDP datagram we will receive.
const MAX_DATAGRAM_SIZE: usize = 65536;

const INITIAL_BUFFER_CAPACITY: usize = 8192;

/// Ingest transport, selected by the listen URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Tcp,
    Udp,
}

impl TransportMode {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            _ => None,
        }
    }
}

enum BoundTransport {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

/// A bound ingest listener, ready to serve.
pub struct IngestListener {
    transport: BoundTransport,
}

impl IngestListener {
    /// Bind the listen endpoint. Returns only once the socket is live, so a
    /// successful return doubles as the readiness signal. Bind failure is
    /// fatal to the process.
    pub async fn bind(listen_url: &url::Url) -> Result<Self> {
        let mode = TransportMode::from_scheme(listen_url.scheme())
            .with_context(|| format!("unsupported listen scheme '{}'", listen_url.scheme()))?;
        let (host, port) = host_port("LISTEN_URL", listen_url)?;
        let addr = format!("{host}:{port}");

        let transport = match mode {
            TransportMode::Tcp => {
                let listener = TcpListener::bind(&addr)
                    .await
                    .with_context(|| format!("failed to bind TCP listener on {addr}"))?;
                info!(addr = %addr, "listening on TCP");
                BoundTransport::Tcp(listener)
            }
            TransportMode::Udp => {
                let socket = UdpSocket::bind(&addr)
                    .await
                    .with_context(|| format!("failed to bind UDP socket on {addr}"))?;
                info!(addr = %addr, "listening on UDP");
                BoundTransport::Udp(socket)
            }
        };

        Ok(Self { transport })
    }

    /// Local bound address (useful with an ephemeral port).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let addr = match &self.transport {
            BoundTransport::Tcp(listener) => listener.local_addr()?,
            BoundTransport::Udp(socket) => socket.local_addr()?,
        };
        Ok(addr)
    }

    /// Spawn the serve loop. Malformed input is logged and discarded; the
    /// loop only ends if the ingest queue's consumer goes away.
    pub fn spawn(self, ingest_tx: UnboundedSender<CotEvent>) -> JoinHandle<()> {
        match self.transport {
            BoundTransport::Tcp(listener) => tokio::spawn(tcp_accept_loop(listener, ingest_tx)),
            BoundTransport::Udp(socket) => tokio::spawn(udp_recv_loop(socket, ingest_tx)),
        }
    }
}

async fn tcp_accept_loop(listener: TcpListener, ingest_tx: UnboundedSender<CotEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(peer = %peer, "accepted TCP connection");
                let tx = ingest_tx.clone();
                tokio::spawn(async move {
                    handle_tcp_connection(stream, peer, tx).await;
                });
            }
            Err(e) => {
                warn!(error = %e, "accept error");
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }
    }
}

async fn handle_tcp_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    ingest_tx: UnboundedSender<CotEvent>,
) {
    let mut buffer = BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY);

    loop {
        match read_xml_frame(&mut stream, &mut buffer).await {
            Ok(Some(frame)) => {
                let text = String::from_utf8_lossy(&frame);
                match decode_single(text.trim_start()) {
                    Ok(event) => {
                        if ingest_tx.send(event).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        debug!(peer = %peer, error = %e, "discarding malformed frame");
                    }
                }
            }
            Ok(None) => {
                debug!(peer = %peer, "connection closed");
                return;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "read error");
                return;
            }
        }
    }
}

/// Read one `</event>`-delimited frame from a TCP stream.
async fn read_xml_frame<R>(stream: &mut R, buffer: &mut BytesMut) -> Result<Option<bytes::Bytes>>
where
    R: AsyncReadExt + Unpin,
{
    loop {
        if buffer.len() >= XML_END_TOKEN.len() {
            if let Some(pos) = buffer
                .windows(XML_END_TOKEN.len())
                .position(|window| window == XML_END_TOKEN)
            {
                let frame = buffer.split_to(pos + XML_END_TOKEN.len());
                return Ok(Some(frame.freeze()));
            }
        }

        if buffer.len() >= MAX_FRAME_SIZE {
            anyhow::bail!("frame too large (> {MAX_FRAME_SIZE})");
        }

        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            if buffer.iter().all(|b| b.is_ascii_whitespace()) {
                return Ok(None);
            }
            anyhow::bail!("connection closed with incomplete frame");
        }
    }
}

async fn udp_recv_loop(socket: UdpSocket, ingest_tx: UnboundedSender<CotEvent>) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((size, source)) => {
                let text = String::from_utf8_lossy(&buffer[..size]);
                debug!(source = %source, size, "datagram received");
                for line in text.lines() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if handle_datagram_line(line, &ingest_tx).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "error receiving datagram");
            }
        }
    }
}

/// Decode one line of datagram text onto the ingest queue. A line carrying
/// its own XML declaration is a standalone document; anything else may be
/// several events concatenated without framing.
fn handle_datagram_line(line: &str, ingest_tx: &UnboundedSender<CotEvent>) -> Result<(), ()> {
    if line.starts_with("<?xml") {
        match decode_single(line) {
            Ok(event) => ingest_tx.send(event).map_err(|_| ())?,
            Err(e) => debug!(error = %e, "discarding malformed datagram line"),
        }
    } else {
        match decode_concatenated(line) {
            Ok(events) => {
                for event in events {
                    ingest_tx.send(event).map_err(|_| ())?;
                }
            }
            Err(e) => debug!(error = %e, "discarding malformed datagram line"),
        }
    }
    Ok(())
}
