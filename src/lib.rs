//! COTProxy runtime: ingest listener, transform-stage orchestrator, and
//! outbound transmitter, glued by unbounded FIFO queues.

pub mod listener;
pub mod output;
pub mod pipeline;

pub use listener::{IngestListener, TransportMode};
pub use output::CotSender;
pub use pipeline::{Pipeline, PipelineOptions, PipelineStats};
