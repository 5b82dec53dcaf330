//! Frigate MQTT event payload parsing.
//!
//! Frigate publishes detection lifecycle updates as
//! `{ "before": {...}, "after": {...}, "type": "new"|"update"|"end" }`
//! on `{main_topic}/events`. The `after` section is the current state of
//! the detection; `before` is the previous snapshot of the same tracked
//! object and is used only to detect a still-forming snapshot.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Raw wrapper as published by Frigate.
#[derive(Debug, Deserialize)]
pub struct EventWrapper {
    /// Previous state of the tracked object, null on the first update.
    pub before: Option<EventSnapshot>,

    /// Current state of the tracked object.
    pub after: Option<EventSnapshot>,
}

/// One `before`/`after` state of a tracked object.
#[derive(Debug, Deserialize)]
pub struct EventSnapshot {
    /// Event identifier, stable across the detection lifecycle.
    pub id: String,

    /// Camera name.
    pub camera: String,

    /// Object label (car, motorcycle, bus, person, ...).
    pub label: String,

    /// Zones the object has entered during tracking.
    #[serde(default)]
    pub entered_zones: Vec<String>,

    /// Best confidence seen so far for this object.
    pub top_score: Option<f64>,

    /// Detection start time, epoch seconds.
    #[serde(default)]
    pub start_time: f64,
}

/// A detection event flattened into the fields the pipeline acts on.
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub id: String,
    pub camera: String,
    pub label: String,
    pub entered_zones: Vec<String>,
    pub before_top_score: Option<f64>,
    pub after_top_score: Option<f64>,
    pub start_time: f64,
}

/// Parse a Frigate event payload into a [`DetectionEvent`].
///
/// Returns an error if the JSON is malformed or the `after` section is
/// missing; a null `before` section is normal for a fresh detection.
pub fn parse_event(payload: &[u8]) -> Result<DetectionEvent> {
    let wrapper: EventWrapper =
        serde_json::from_slice(payload).context("parse Frigate event JSON")?;

    let after = wrapper
        .after
        .ok_or_else(|| anyhow!("missing 'after' section in event"))?;

    Ok(DetectionEvent {
        id: after.id,
        camera: after.camera,
        label: after.label,
        entered_zones: after.entered_zones,
        before_top_score: wrapper.before.and_then(|before| before.top_score),
        after_top_score: after.top_score,
        start_time: after.start_time,
    })
}
