//! Eligibility rules for incoming detection events.
//!
//! A pure predicate chain over a [`DetectionEvent`] and the configured
//! allow-lists. Rules are applied in order and short-circuit on the first
//! failure; the skip reason is reported so the caller can log it.

use std::fmt;

use crate::events::DetectionEvent;

/// Why an event was not eligible for recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Camera is not in the configured allow-list.
    WrongCamera,
    /// Configured zone allow-list does not intersect the entered zones.
    WrongZone,
    /// Object label is not a configured vehicle class.
    WrongLabel,
    /// Before/after top scores are equal: Frigate has not updated the
    /// snapshot yet, so the same image would be recognized again.
    DuplicateSnapshot,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::WrongCamera => "wrong-camera",
            SkipReason::WrongZone => "wrong-zone",
            SkipReason::WrongLabel => "wrong-label",
            SkipReason::DuplicateSnapshot => "duplicate-snapshot",
        };
        f.write_str(reason)
    }
}

/// Stateless event filter built once from configuration.
#[derive(Debug, Clone)]
pub struct EventFilter {
    cameras: Vec<String>,
    zones: Vec<String>,
    objects: Vec<String>,
}

impl EventFilter {
    pub fn new(cameras: Vec<String>, zones: Vec<String>, objects: Vec<String>) -> Self {
        Self {
            cameras,
            zones,
            objects,
        }
    }

    /// Check an event against the configured rules.
    ///
    /// Returns `None` when the event is eligible for recognition, or the
    /// first rule it failed. An empty zone list means no zone restriction.
    pub fn check(&self, event: &DetectionEvent) -> Option<SkipReason> {
        if !self.cameras.contains(&event.camera) {
            return Some(SkipReason::WrongCamera);
        }

        if !self.zones.is_empty()
            && !event
                .entered_zones
                .iter()
                .any(|zone| self.zones.contains(zone))
        {
            return Some(SkipReason::WrongZone);
        }

        if !self.objects.contains(&event.label) {
            return Some(SkipReason::WrongLabel);
        }

        // Equal top scores mean Frigate has not refreshed the snapshot
        // since the last update. Wait for the next delivery.
        if event.before_top_score == event.after_top_score {
            return Some(SkipReason::DuplicateSnapshot);
        }

        None
    }
}
