//! platewatch - Frigate license plate recognition bridge.
//!
//! Subscribes to Frigate's MQTT event topic, fetches the cropped vehicle
//! snapshot for qualifying detections, submits it to a license plate
//! recognition service, records confirmed plates in a local SQLite table,
//! and reports the result back to Frigate (as a sub label) and to an
//! optional MQTT return topic.
//!
//! # Module Structure
//!
//! - `config`: YAML configuration file loading and validation
//! - `events`: Frigate MQTT event payload parsing
//! - `filter`: eligibility rules applied to each detection event
//! - `store`: durable plate table, also the at-most-once processing guard
//! - `recognizer`: recognition providers (Plate Recognizer, CodeProject.AI)
//! - `frigate`: Frigate HTTP API (snapshot fetch, sub label update)
//! - `known_plates`: operator-curated plate to owner-label directory
//! - `pipeline`: the per-event orchestrator tying the above together

use anyhow::{Context, Result};
use std::time::Duration;

pub mod config;
pub mod events;
pub mod filter;
pub mod frigate;
pub mod known_plates;
pub mod pipeline;
pub mod recognizer;
pub mod store;

pub use events::{parse_event, DetectionEvent};
pub use filter::{EventFilter, SkipReason};
pub use pipeline::{Outcome, Pipeline, ResultPublisher};
pub use recognizer::{PlateRecognizer, RecognitionResult};
pub use store::{PlateRecord, PlateStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared builder for the blocking HTTP clients used against Frigate and
/// the recognition services. Timeouts are explicit so a stalled endpoint
/// cannot wedge the event loop.
pub(crate) fn blocking_http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .context("build http client")
}
