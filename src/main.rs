use anyhow::{Context, Result};
use clap::Parser;
use cotproxy_client::RegistryClient;
use cotproxy_core::{ConfigOverrides, FileConfig, ProxyConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cotproxy::{CotSender, IngestListener, Pipeline, PipelineOptions};

/// COTProxy - Cursor-On-Target transform proxy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ingest bind endpoint (tcp:// or udp://)
    #[arg(long, env = "LISTEN_URL")]
    listen_url: Option<String>,

    /// Transform registry base URL
    #[arg(long, env = "CPAPI_URL")]
    cpapi_url: Option<String>,

    /// Outbound CoT endpoint (tcp:// or udp://)
    #[arg(long, env = "COT_URL")]
    cot_url: Option<String>,

    /// Relay events even when no transform decision could be made
    #[arg(long, env = "PASS_ALL")]
    pass_all: Option<bool>,

    /// Auto-register unknown identities with the registry
    #[arg(long, env = "AUTO_ADD")]
    auto_add: Option<bool>,

    /// Enable debug logging
    #[arg(long, env = "DEBUG")]
    debug: Option<bool>,
}

fn load_config(args: &Args) -> Result<ProxyConfig> {
    let file = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {path:?}"))?;
            Some(FileConfig::from_yaml(&content)?)
        }
        None => None,
    };

    let overrides = ConfigOverrides {
        listen_url: args.listen_url.clone(),
        cpapi_url: args.cpapi_url.clone(),
        cot_url: args.cot_url.clone(),
        pass_all: args.pass_all,
        auto_add: args.auto_add,
        debug: args.debug,
    };

    Ok(ProxyConfig::resolve(file, overrides)?)
}

fn node_identity() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "cotproxy".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!(listen_url = %config.listen_url, cpapi_url = %config.cpapi_url,
          cot_url = %config.cot_url, pass_all = config.pass_all,
          auto_add = config.auto_add, "starting cotproxy");

    let options = PipelineOptions {
        pass_all: config.pass_all,
        auto_add: config.auto_add,
        node: node_identity(),
    };

    // Opening the resolver session decides Connected vs Degraded for the
    // whole run; the registry is never retried once lost.
    let pipeline = match RegistryClient::new(config.cpapi_url.clone()) {
        Ok(client) => Pipeline::new(Arc::new(client), options),
        Err(e) => {
            error!(error = %e, "failed to open registry session");
            Pipeline::degraded(options)
        }
    };

    let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
    let (egress_tx, egress_rx) = mpsc::unbounded_channel();

    // Both ends of the relay must come up or the process is useless.
    let ingest = IngestListener::bind(&config.listen_url).await?;
    let sender = CotSender::connect(&config.cot_url).await?;

    let listener_task = ingest.spawn(ingest_tx);
    let pipeline_task = tokio::spawn(pipeline.run(ingest_rx, egress_tx));
    let sender_task = tokio::spawn(sender.run(egress_rx));

    // Fail-fast: the first top-level task to finish ends the process;
    // in-flight queue contents are discarded.
    tokio::select! {
        result = listener_task => {
            error!(?result, "listener task ended");
        }
        result = pipeline_task => {
            error!(?result, "transform stage ended");
        }
        result = sender_task => {
            match result {
                Ok(Ok(())) => info!("transmitter finished"),
                Ok(Err(e)) => error!(error = %e, "transmitter failed"),
                Err(e) => error!(error = %e, "transmitter panicked"),
            }
        }
    }

    Ok(())
}
