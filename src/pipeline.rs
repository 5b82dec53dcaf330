//! The per-event processing pipeline.
//!
//! One message is fully processed before the next is read:
//! filter -> dedup check -> snapshot fetch -> recognition -> persistence
//! -> sub label update -> result publish.
//!
//! Failure semantics: external-call failures (snapshot, provider, sub
//! label, publish) are logged and the event is abandoned, never retried
//! here. A store write failure is returned as an error so the caller can
//! log it at the event boundary; nothing in the pipeline is fatal to the
//! process.

use anyhow::Result;
use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::config::AppConfig;
use crate::events::parse_event;
use crate::filter::{EventFilter, SkipReason};
use crate::frigate::FrigateApi;
use crate::known_plates::KnownPlates;
use crate::recognizer::PlateRecognizer;
use crate::store::{PlateRecord, PlateStore};

const DETECTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Terminal state of one processed message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The unconditional discard of the first message after connect, which
    /// may be a stale retained message from the broker.
    FirstMessageDiscarded,
    /// Rejected by the event filter.
    Skipped(SkipReason),
    /// A row for this event already exists; idempotent no-op.
    AlreadyProcessed,
    /// Snapshot fetch failed; Frigate may redeliver the event.
    SnapshotFailed,
    /// The provider call failed.
    RecognitionFailed,
    /// The provider saw no plate in the image.
    NoPlate,
    /// A plate was read but its score is under the configured minimum.
    BelowThreshold { plate: String, score: f64 },
    /// Persisted and notified.
    Done { plate: String, score: f64 },
}

/// Fire-and-forget publisher for the result topic. The MQTT client is a
/// per-connection resource, so it is passed into [`Pipeline::process`]
/// rather than owned by the pipeline.
pub trait ResultPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// Message published on `{main_topic}/{return_topic}`.
#[derive(Debug, Serialize)]
struct ResultMessage<'a> {
    plate_number: &'a str,
    score: f64,
    frigate_event: &'a str,
    camera_name: &'a str,
    start_time: &'a str,
}

pub struct Pipeline {
    filter: EventFilter,
    store: Box<dyn PlateStore>,
    recognizer: Box<dyn PlateRecognizer>,
    frigate: Box<dyn FrigateApi>,
    known_plates: KnownPlates,
    min_score: Option<f64>,
    main_topic: String,
    return_topic: Option<String>,
    first_message_seen: bool,
}

impl Pipeline {
    pub fn new(
        cfg: &AppConfig,
        store: Box<dyn PlateStore>,
        recognizer: Box<dyn PlateRecognizer>,
        frigate: Box<dyn FrigateApi>,
    ) -> Self {
        Self {
            filter: EventFilter::new(
                cfg.cameras.clone(),
                cfg.zones.clone(),
                cfg.objects.clone(),
            ),
            store,
            recognizer,
            frigate,
            known_plates: KnownPlates::new(cfg.known_plates.clone()),
            min_score: cfg.min_score,
            main_topic: cfg.main_topic.clone(),
            return_topic: cfg.return_topic.clone(),
            first_message_seen: false,
        }
    }

    /// Process one raw MQTT payload to a terminal state.
    ///
    /// Returns `Err` only for malformed payloads and store write failures;
    /// both are event-fatal, logged by the caller, and never retried.
    pub fn process(
        &mut self,
        payload: &[u8],
        publisher: &dyn ResultPublisher,
    ) -> Result<Outcome> {
        if !self.first_message_seen {
            self.first_message_seen = true;
            log::debug!("skipping first message");
            return Ok(Outcome::FirstMessageDiscarded);
        }

        let event = parse_event(payload)?;

        if let Some(reason) = self.filter.check(&event) {
            log::debug!("skipping event {}: {}", event.id, reason);
            return Ok(Outcome::Skipped(reason));
        }

        if self.store.find_by_event(&event.id)?.is_some() {
            log::debug!(
                "skipping event {}: it has already been processed",
                event.id
            );
            return Ok(Outcome::AlreadyProcessed);
        }

        log::debug!("getting snapshot for event {}", event.id);
        let image = match self.frigate.fetch_snapshot(&event.id) {
            Ok(image) => image,
            Err(e) => {
                log::error!("error getting snapshot for event {}: {:#}", event.id, e);
                return Ok(Outcome::SnapshotFailed);
            }
        };

        let result = match self.recognizer.recognize(&image) {
            Ok(result) => result,
            Err(e) => {
                log::error!(
                    "{} failed for event {}: {:#}",
                    self.recognizer.name(),
                    event.id,
                    e
                );
                return Ok(Outcome::RecognitionFailed);
            }
        };

        let Some(plate) = result.plate else {
            log::info!("no plate number found for event {}", event.id);
            return Ok(Outcome::NoPlate);
        };
        let score = result.score.unwrap_or(0.0);

        if let Some(min_score) = self.min_score {
            if score < min_score {
                log::info!(
                    "score {:.2} for plate {} is below minimum {:.2}",
                    score,
                    plate,
                    min_score
                );
                return Ok(Outcome::BelowThreshold { plate, score });
            }
        }

        if let Some(owner) = self.known_plates.label_for(&plate) {
            log::info!(
                "event {}: plate {} is a known plate for {}",
                event.id,
                plate,
                owner
            );
        }

        let record = PlateRecord {
            detection_time: format_detection_time(event.start_time),
            score,
            plate_number: plate.clone(),
            frigate_event: event.id.clone(),
            camera_name: event.camera.clone(),
        };

        log::info!(
            "storing plate {} for event {} from camera {}",
            plate,
            event.id,
            event.camera
        );
        self.store.insert(&record)?;

        if let Err(e) = self.frigate.set_sub_label(&event.id, &plate) {
            log::error!("failed to set sub label for event {}: {:#}", event.id, e);
        }

        if let Some(return_topic) = &self.return_topic {
            let topic = format!("{}/{}", self.main_topic, return_topic);
            let message = ResultMessage {
                plate_number: &record.plate_number,
                score,
                frigate_event: &record.frigate_event,
                camera_name: &record.camera_name,
                start_time: &record.detection_time,
            };
            match serde_json::to_vec(&message) {
                Ok(body) => {
                    log::debug!("publishing result for event {} to {}", event.id, topic);
                    if let Err(e) = publisher.publish(&topic, body) {
                        log::error!(
                            "failed to publish result for event {}: {:#}",
                            event.id,
                            e
                        );
                    }
                }
                Err(e) => {
                    log::error!(
                        "failed to serialize result for event {}: {}",
                        event.id,
                        e
                    );
                }
            }
        }

        Ok(Outcome::Done { plate, score })
    }
}

/// Format a detection start time (epoch seconds) as a local timestamp.
pub fn format_detection_time(epoch: f64) -> String {
    let secs = epoch as i64;
    match Local.timestamp_opt(secs, 0).earliest() {
        Some(dt) => dt.format(DETECTION_TIME_FORMAT).to_string(),
        // Out-of-range epoch; keep something storable rather than failing
        // the whole event.
        None => format!("{}", secs),
    }
}
