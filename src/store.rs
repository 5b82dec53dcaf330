//! Durable plate records.
//!
//! One row per successfully recognized event. The UNIQUE constraint on
//! `frigate_event` is the at-most-once processing guard: the pipeline
//! checks for an existing row before doing any external work, and a
//! duplicate insert fails even if two deliveries race past that check.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// A confirmed plate recognition, as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateRecord {
    /// Local time of the detection, `%Y-%m-%d %H:%M:%S`.
    pub detection_time: String,
    /// Recognition confidence reported by the provider.
    pub score: f64,
    /// Recognized plate text.
    pub plate_number: String,
    /// Frigate event identifier, unique per detection lifecycle.
    pub frigate_event: String,
    /// Camera that produced the detection.
    pub camera_name: String,
}

pub trait PlateStore {
    /// Look up a record by Frigate event identifier.
    fn find_by_event(&mut self, frigate_event: &str) -> Result<Option<PlateRecord>>;

    /// Insert a new record. Fails if the event identifier already exists.
    fn insert(&mut self, record: &PlateRecord) -> Result<()>;
}

pub struct SqlitePlateStore {
    conn: Connection,
}

impl SqlitePlateStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS plates (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              detection_time TIMESTAMP NOT NULL,
              score REAL NOT NULL,
              plate_number TEXT NOT NULL,
              frigate_event TEXT NOT NULL UNIQUE,
              camera_name TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl PlateStore for SqlitePlateStore {
    fn find_by_event(&mut self, frigate_event: &str) -> Result<Option<PlateRecord>> {
        let record = self
            .conn
            .query_row(
                r#"
                SELECT detection_time, score, plate_number, frigate_event, camera_name
                FROM plates WHERE frigate_event = ?1
                "#,
                params![frigate_event],
                |row| {
                    Ok(PlateRecord {
                        detection_time: row.get(0)?,
                        score: row.get(1)?,
                        plate_number: row.get(2)?,
                        frigate_event: row.get(3)?,
                        camera_name: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn insert(&mut self, record: &PlateRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO plates (detection_time, score, plate_number, frigate_event, camera_name)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.detection_time,
                record.score,
                record.plate_number,
                record.frigate_event,
                record.camera_name
            ],
        )?;
        Ok(())
    }
}

/// In-memory store with the same uniqueness behavior, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlateStore {
    records: Vec<PlateRecord>,
}

impl InMemoryPlateStore {
    pub fn records(&self) -> &[PlateRecord] {
        &self.records
    }
}

impl PlateStore for InMemoryPlateStore {
    fn find_by_event(&mut self, frigate_event: &str) -> Result<Option<PlateRecord>> {
        Ok(self
            .records
            .iter()
            .find(|record| record.frigate_event == frigate_event)
            .cloned())
    }

    fn insert(&mut self, record: &PlateRecord) -> Result<()> {
        if self
            .records
            .iter()
            .any(|existing| existing.frigate_event == record.frigate_event)
        {
            return Err(anyhow::anyhow!(
                "duplicate frigate_event: {}",
                record.frigate_event
            ));
        }
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: &str) -> PlateRecord {
        PlateRecord {
            detection_time: "2023-11-14 14:13:20".to_string(),
            score: 0.95,
            plate_number: "ABC128".to_string(),
            frigate_event: event.to_string(),
            camera_name: "front".to_string(),
        }
    }

    #[test]
    fn sqlite_insert_and_find_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("plates.db");
        let mut store = SqlitePlateStore::open(db_path.to_str().unwrap()).unwrap();

        assert!(store.find_by_event("e1").unwrap().is_none());
        store.insert(&record("e1")).unwrap();

        let found = store.find_by_event("e1").unwrap().unwrap();
        assert_eq!(found, record("e1"));
    }

    #[test]
    fn sqlite_rejects_duplicate_event() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("plates.db");
        let mut store = SqlitePlateStore::open(db_path.to_str().unwrap()).unwrap();

        store.insert(&record("e1")).unwrap();
        assert!(store.insert(&record("e1")).is_err());
    }

    #[test]
    fn sqlite_schema_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("plates.db");
        {
            let mut store = SqlitePlateStore::open(db_path.to_str().unwrap()).unwrap();
            store.insert(&record("e1")).unwrap();
        }
        let mut store = SqlitePlateStore::open(db_path.to_str().unwrap()).unwrap();
        assert!(store.find_by_event("e1").unwrap().is_some());
    }

    #[test]
    fn in_memory_matches_sqlite_semantics() {
        let mut store = InMemoryPlateStore::default();
        assert!(store.find_by_event("e1").unwrap().is_none());
        store.insert(&record("e1")).unwrap();
        assert!(store.insert(&record("e1")).is_err());
        assert_eq!(store.find_by_event("e1").unwrap().unwrap(), record("e1"));
        assert_eq!(store.records().len(), 1);
    }
}
