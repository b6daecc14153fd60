//! CoT (Cursor on Target) wire codec for the transform proxy.
//!
//! Events are modeled as a mutable XML element tree rather than a fixed
//! schema: the proxy rewrites a handful of well-known fields and must pass
//! everything else through byte-faithfully, including attributes and child
//! elements it has never heard of.
//!
//! # Example
//!
//! ```rust
//! use cotproxy_cot::{decode_single, encode};
//!
//! let cot_xml = r#"<event version="2.0" uid="test-1" type="a-f-G"
//!        time="2024-01-15T10:30:00Z"
//!        start="2024-01-15T10:30:00Z"
//!        stale="2024-01-15T10:35:00Z" how="h-e">
//!     <point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="5.0"/>
//! </event>"#;
//!
//! let event = decode_single(cot_xml).expect("failed to parse CoT");
//! assert_eq!(event.uid(), Some("test-1"));
//! assert!(encode(&event).contains(r#"uid="test-1""#));
//! ```

pub mod event;
pub mod parser;
pub mod serializer;

pub use event::{CotEvent, Element};
pub use parser::{decode_concatenated, decode_single, CodecError};
pub use serializer::encode;
