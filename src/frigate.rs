//! Frigate HTTP API client.
//!
//! Two calls: fetch the cropped snapshot for an event, and set the event's
//! sub label once a plate is recognized.

use anyhow::{anyhow, Context, Result};

/// Frigate rejects sub labels longer than 20 characters.
pub const SUB_LABEL_MAX_LEN: usize = 20;

/// Truncate a label to the Frigate sub label limit, on a char boundary.
pub fn truncate_sub_label(label: &str) -> &str {
    match label.char_indices().nth(SUB_LABEL_MAX_LEN) {
        Some((idx, _)) => &label[..idx],
        None => label,
    }
}

pub trait FrigateApi {
    /// Fetch the cropped, quality-bounded snapshot for an event.
    fn fetch_snapshot(&self, event_id: &str) -> Result<Vec<u8>>;

    /// Set the event's sub label, truncated to [`SUB_LABEL_MAX_LEN`].
    fn set_sub_label(&self, event_id: &str, label: &str) -> Result<()>;
}

pub struct FrigateClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl FrigateClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: crate::blocking_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl FrigateApi for FrigateClient {
    fn fetch_snapshot(&self, event_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/events/{}/snapshot.jpg", self.base_url, event_id);
        log::debug!("fetching snapshot: {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("crop", "1"), ("quality", "95")])
            .send()
            .context("request snapshot")?;

        if !response.status().is_success() {
            return Err(anyhow!("snapshot request returned {}", response.status()));
        }

        let bytes = response.bytes().context("read snapshot body")?;
        Ok(bytes.to_vec())
    }

    fn set_sub_label(&self, event_id: &str, label: &str) -> Result<()> {
        let sub_label = truncate_sub_label(label);
        let url = format!("{}/api/events/{}/sub_label", self.base_url, event_id);
        log::debug!("setting sub label {} via {}", sub_label, url);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "subLabel": sub_label }))
            .send()
            .context("request sub label update")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "sub label update returned {}",
                response.status()
            ));
        }

        log::info!("sub label set to {} for event {}", sub_label, event_id);
        Ok(())
    }
}
