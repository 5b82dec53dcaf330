//! Operator-curated plate directory.
//!
//! Maps plate text to a human label, typically with several aliases per
//! vehicle because OCR confuses similar glyphs (0/O, 8/B). Loaded from
//! configuration and used only for enrichment logging, never to decide
//! whether an event is processed.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct KnownPlates {
    plates: HashMap<String, String>,
}

impl KnownPlates {
    /// Build the directory, normalizing plate keys to uppercase so
    /// provider case differences do not break lookups.
    pub fn new(plates: HashMap<String, String>) -> Self {
        let plates = plates
            .into_iter()
            .map(|(plate, label)| (plate.to_uppercase(), label))
            .collect();
        Self { plates }
    }

    pub fn label_for(&self, plate: &str) -> Option<&str> {
        self.plates.get(&plate.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> KnownPlates {
        let mut plates = HashMap::new();
        plates.insert("ABC128".to_string(), "Bob's Car".to_string());
        plates.insert("ABC12B".to_string(), "Bob's Car".to_string());
        plates.insert("123TR0".to_string(), "Steve's Truck".to_string());
        KnownPlates::new(plates)
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let directory = directory();
        assert_eq!(directory.label_for("abc128"), Some("Bob's Car"));
        assert_eq!(directory.label_for("ABC128"), Some("Bob's Car"));
    }

    #[test]
    fn aliases_resolve_to_the_same_label() {
        let directory = directory();
        assert_eq!(directory.label_for("ABC128"), directory.label_for("ABC12B"));
    }

    #[test]
    fn unknown_plate_is_none() {
        assert_eq!(directory().label_for("ZZZ999"), None);
    }
}
