//! Outbound transmitter: drains the egress queue to the configured CoT
//! endpoint.
//!
//! Deliberately thin. Failure to initialize is fatal (the pipeline cannot
//! function without its outbound end); a TCP write failure ends the task,
//! which ends the process under the fail-fast join policy in `main`.

use anyhow::{Context, Result};
use cotproxy_core::config::host_port;
use cotproxy_cot::{encode, CotEvent};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

pub enum CotSender {
    Tcp(TcpStream),
    Udp { socket: UdpSocket, remote: SocketAddr },
}

impl CotSender {
    /// Connect the outbound transport named by the CoT URL.
    pub async fn connect(cot_url: &url::Url) -> Result<Self> {
        let (host, port) = host_port("COT_URL", cot_url)?;
        let remote = lookup_host((host.as_str(), port))
            .await
            .with_context(|| format!("failed to resolve {host}:{port}"))?
            .next()
            .with_context(|| format!("no address for {host}:{port}"))?;

        match cot_url.scheme() {
            "tcp" => {
                let stream = TcpStream::connect(remote)
                    .await
                    .with_context(|| format!("failed to connect TCP to {remote}"))?;
                info!(remote = %remote, "outbound TCP connected");
                Ok(Self::Tcp(stream))
            }
            "udp" => {
                let socket = UdpSocket::bind("0.0.0.0:0")
                    .await
                    .context("failed to bind outbound UDP socket")?;
                info!(remote = %remote, "outbound UDP ready");
                Ok(Self::Udp { socket, remote })
            }
            scheme => anyhow::bail!("unsupported COT_URL scheme '{scheme}'"),
        }
    }

    /// Drain the egress queue until it closes or the transport fails.
    pub async fn run(mut self, mut egress_rx: UnboundedReceiver<CotEvent>) -> Result<()> {
        while let Some(event) = egress_rx.recv().await {
            let mut wire = encode(&event);
            wire.push('\n');
            debug!(uid = ?event.uid(), size = wire.len(), "transmitting event");

            match &mut self {
                CotSender::Tcp(stream) => {
                    stream
                        .write_all(wire.as_bytes())
                        .await
                        .context("outbound TCP write failed")?;
                    stream.flush().await.context("outbound TCP flush failed")?;
                }
                CotSender::Udp { socket, remote } => {
                    // Datagram loss is inherent to UDP; log and keep going.
                    if let Err(e) = socket.send_to(wire.as_bytes(), *remote).await {
                        warn!(error = %e, "outbound UDP send failed");
                    }
                }
            }
        }
        info!("egress queue closed, transmitter stopping");
        Ok(())
    }
}
