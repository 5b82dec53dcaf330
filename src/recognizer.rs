//! Recognition providers.
//!
//! Two variants behind one trait: the hosted Plate Recognizer API
//! (token-authenticated, accepts region hints) and a self-hosted
//! CodeProject.AI endpoint. Exactly one is configured per deployment;
//! the selection happens once at startup in [`build_recognizer`].
//!
//! An empty or missing plate in a well-formed response is a normal
//! "no plate visible" outcome, not an error. Providers make exactly one
//! call per invocation: no caching, no retry.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::ProviderSettings;

/// Outcome of a single recognition call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    pub plate: Option<String>,
    pub score: Option<f64>,
}

pub trait PlateRecognizer {
    /// Provider name for log lines.
    fn name(&self) -> &'static str;

    /// Submit an image, returning the best plate candidate if any.
    fn recognize(&self, image: &[u8]) -> Result<RecognitionResult>;
}

/// Build the configured provider.
pub fn build_recognizer(provider: &ProviderSettings) -> Result<Box<dyn PlateRecognizer>> {
    match provider {
        ProviderSettings::PlateRecognizer {
            url,
            token,
            regions,
        } => Ok(Box::new(PlateRecognizerApi::new(url, token, regions)?)),
        ProviderSettings::CodeProjectAi { url } => Ok(Box::new(CodeProjectAi::new(url)?)),
    }
}

/// Hosted Plate Recognizer API client.
pub struct PlateRecognizerApi {
    http: reqwest::blocking::Client,
    url: String,
    token: String,
    regions: Vec<String>,
}

impl PlateRecognizerApi {
    pub fn new(url: &str, token: &str, regions: &[String]) -> Result<Self> {
        Ok(Self {
            http: crate::blocking_http_client()?,
            url: url.to_string(),
            token: token.to_string(),
            regions: regions.to_vec(),
        })
    }
}

impl PlateRecognizer for PlateRecognizerApi {
    fn name(&self) -> &'static str {
        "plate_recognizer"
    }

    fn recognize(&self, image: &[u8]) -> Result<RecognitionResult> {
        let mut form = Form::new().part(
            "upload",
            Part::bytes(image.to_vec())
                .file_name("snapshot.jpg")
                .mime_str("image/jpeg")
                .context("build upload part")?,
        );
        for region in &self.regions {
            form = form.text("regions", region.clone());
        }

        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Token {}", self.token))
            .multipart(form)
            .send()
            .context("request plate recognizer")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "plate recognizer returned {}",
                response.status()
            ));
        }

        let body = response.bytes().context("read plate recognizer body")?;
        log::debug!(
            "plate recognizer response: {}",
            String::from_utf8_lossy(&body)
        );
        Ok(parse_plate_recognizer_response(&body))
    }
}

/// Self-hosted CodeProject.AI client.
pub struct CodeProjectAi {
    http: reqwest::blocking::Client,
    url: String,
}

impl CodeProjectAi {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            http: crate::blocking_http_client()?,
            url: url.to_string(),
        })
    }
}

impl PlateRecognizer for CodeProjectAi {
    fn name(&self) -> &'static str {
        "code_project_ai"
    }

    fn recognize(&self, image: &[u8]) -> Result<RecognitionResult> {
        let form = Form::new().part(
            "upload",
            Part::bytes(image.to_vec())
                .file_name("snapshot.jpg")
                .mime_str("image/jpeg")
                .context("build upload part")?,
        );

        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .context("request code project ai")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "code project ai returned {}",
                response.status()
            ));
        }

        let body = response.bytes().context("read code project ai body")?;
        log::debug!(
            "code project ai response: {}",
            String::from_utf8_lossy(&body)
        );
        Ok(parse_code_project_ai_response(&body))
    }
}

#[derive(Debug, Deserialize)]
struct PlateRecognizerResponse {
    results: Option<Vec<PlateRecognizerResult>>,
}

#[derive(Debug, Deserialize)]
struct PlateRecognizerResult {
    plate: Option<String>,
    score: Option<f64>,
}

/// Extract the best candidate from a Plate Recognizer response body.
///
/// A missing `results` field or an unparseable body is logged as an error
/// and treated as "no plate"; an empty `results` list is a quiet miss.
fn parse_plate_recognizer_response(body: &[u8]) -> RecognitionResult {
    let response: PlateRecognizerResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(e) => {
            log::error!(
                "malformed plate recognizer response: {} ({})",
                String::from_utf8_lossy(body),
                e
            );
            return RecognitionResult::default();
        }
    };

    let Some(results) = response.results else {
        log::error!(
            "plate recognizer response has no results: {}",
            String::from_utf8_lossy(body)
        );
        return RecognitionResult::default();
    };

    match results.into_iter().next() {
        Some(result) => RecognitionResult {
            plate: result.plate,
            score: result.score,
        },
        None => RecognitionResult::default(),
    }
}

#[derive(Debug, Deserialize)]
struct CodeProjectAiResponse {
    #[serde(default)]
    predictions: Vec<CodeProjectAiPrediction>,
}

#[derive(Debug, Deserialize)]
struct CodeProjectAiPrediction {
    plate: Option<String>,
    confidence: Option<f64>,
}

/// Extract the best candidate from a CodeProject.AI response body.
///
/// The plate text sometimes carries embedded spaces ("ABC 128"); those are
/// stripped. The confidence field name differs from the hosted API and is
/// normalized into [`RecognitionResult::score`].
fn parse_code_project_ai_response(body: &[u8]) -> RecognitionResult {
    let response: CodeProjectAiResponse = match serde_json::from_slice(body) {
        Ok(response) => response,
        Err(e) => {
            log::error!(
                "malformed code project ai response: {} ({})",
                String::from_utf8_lossy(body),
                e
            );
            return RecognitionResult::default();
        }
    };

    match response.predictions.into_iter().next() {
        Some(prediction) => match prediction.plate {
            Some(plate) => RecognitionResult {
                plate: Some(plate.replace(' ', "")),
                score: prediction.confidence,
            },
            None => RecognitionResult::default(),
        },
        None => RecognitionResult::default(),
    }
}
