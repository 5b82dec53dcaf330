//! Configuration file loading.
//!
//! The config is a YAML file mirroring the layout Frigate users expect:
//! a `frigate` section with MQTT and filter settings, exactly one
//! recognition provider section, and an optional `known_plates` map.
//! File values land in `Option` fields and are resolved against defaults
//! and validated into [`AppConfig`].

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_MQTT_SERVER: &str = "127.0.0.1";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MAIN_TOPIC: &str = "frigate";
const DEFAULT_DB_PATH: &str = "./config/platewatch.db";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PLATE_RECOGNIZER_URL: &str = "https://api.platerecognizer.com/v1/plate-reader";
const DEFAULT_CODE_PROJECT_AI_URL: &str = "http://127.0.0.1:32168";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    frigate: Option<FrigateSection>,
    plate_recognizer: Option<PlateRecognizerSection>,
    code_project_ai: Option<CodeProjectAiSection>,
    logger_level: Option<String>,
    db_path: Option<String>,
    known_plates: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize, Default)]
struct FrigateSection {
    frigate_url: Option<String>,
    mqtt_server: Option<String>,
    mqtt_port: Option<u16>,
    mqtt_auth: Option<bool>,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    main_topic: Option<String>,
    return_topic: Option<String>,
    camera: Option<Vec<String>>,
    zones: Option<Vec<String>>,
    objects: Option<Vec<String>>,
    min_score: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct PlateRecognizerSection {
    token: Option<String>,
    regions: Option<Vec<String>>,
    api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CodeProjectAiSection {
    api_url: Option<String>,
}

/// Which recognition provider is active, selected once at load time.
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    PlateRecognizer {
        url: String,
        token: String,
        regions: Vec<String>,
    },
    CodeProjectAi {
        url: String,
    },
}

impl ProviderSettings {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSettings::PlateRecognizer { .. } => "plate_recognizer",
            ProviderSettings::CodeProjectAi { .. } => "code_project_ai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub frigate_url: String,
    pub mqtt: MqttSettings,
    pub main_topic: String,
    pub return_topic: Option<String>,
    pub cameras: Vec<String>,
    pub zones: Vec<String>,
    pub objects: Vec<String>,
    pub min_score: Option<f64>,
    pub provider: ProviderSettings,
    pub known_plates: HashMap<String, String>,
    pub db_path: String,
    pub log_level: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(raw).context("parse config YAML")?;

        let frigate = file
            .frigate
            .ok_or_else(|| anyhow!("config is missing the frigate section"))?;

        let frigate_url = frigate
            .frigate_url
            .ok_or_else(|| anyhow!("frigate.frigate_url is required"))?;

        let cameras = frigate.camera.unwrap_or_default();
        if cameras.is_empty() {
            return Err(anyhow!("frigate.camera must list at least one camera"));
        }

        let objects = frigate.objects.unwrap_or_else(|| {
            vec![
                "car".to_string(),
                "motorcycle".to_string(),
                "bus".to_string(),
            ]
        });

        if let Some(min_score) = frigate.min_score {
            if !(0.0..=1.0).contains(&min_score) {
                return Err(anyhow!(
                    "frigate.min_score must be between 0 and 1, got {}",
                    min_score
                ));
            }
        }

        let mqtt_auth = frigate.mqtt_auth.unwrap_or(false);
        let mqtt = MqttSettings {
            server: frigate
                .mqtt_server
                .unwrap_or_else(|| DEFAULT_MQTT_SERVER.to_string()),
            port: frigate.mqtt_port.unwrap_or(DEFAULT_MQTT_PORT),
            username: if mqtt_auth {
                Some(frigate.mqtt_username.ok_or_else(|| {
                    anyhow!("frigate.mqtt_username is required when mqtt_auth is true")
                })?)
            } else {
                None
            },
            password: if mqtt_auth { frigate.mqtt_password } else { None },
        };

        let provider = match (file.plate_recognizer, file.code_project_ai) {
            (Some(section), None) => ProviderSettings::PlateRecognizer {
                url: section
                    .api_url
                    .unwrap_or_else(|| DEFAULT_PLATE_RECOGNIZER_URL.to_string()),
                token: section
                    .token
                    .ok_or_else(|| anyhow!("plate_recognizer.token is required"))?,
                regions: section.regions.unwrap_or_default(),
            },
            (None, Some(section)) => ProviderSettings::CodeProjectAi {
                url: section
                    .api_url
                    .unwrap_or_else(|| DEFAULT_CODE_PROJECT_AI_URL.to_string()),
            },
            (None, None) => {
                return Err(anyhow!(
                    "no recognition provider configured; set plate_recognizer or code_project_ai"
                ))
            }
            (Some(_), Some(_)) => {
                return Err(anyhow!(
                    "plate_recognizer and code_project_ai are mutually exclusive"
                ))
            }
        };

        let return_topic = frigate
            .return_topic
            .filter(|topic| !topic.trim().is_empty());

        Ok(Self {
            frigate_url,
            mqtt,
            main_topic: frigate
                .main_topic
                .unwrap_or_else(|| DEFAULT_MAIN_TOPIC.to_string()),
            return_topic,
            cameras,
            zones: frigate.zones.unwrap_or_default(),
            objects,
            min_score: frigate.min_score,
            provider,
            known_plates: file.known_plates.unwrap_or_default(),
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            log_level: file
                .logger_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  mqtt_server: mqtt.local
  mqtt_port: 8883
  mqtt_auth: true
  mqtt_username: frigate
  mqtt_password: secret
  main_topic: frigate
  return_topic: plate_recognizer
  camera:
    - front
    - driveway
  zones:
    - driveway
  min_score: 0.8
plate_recognizer:
  token: abc123
  regions:
    - us-ca
logger_level: debug
db_path: /data/plates.db
known_plates:
  ABC128: "Bob's Car"
"#;

    #[test]
    fn full_config_parses() {
        let cfg = AppConfig::from_yaml(FULL_CONFIG).unwrap();
        assert_eq!(cfg.frigate_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.mqtt.server, "mqtt.local");
        assert_eq!(cfg.mqtt.port, 8883);
        assert_eq!(cfg.mqtt.username.as_deref(), Some("frigate"));
        assert_eq!(cfg.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(cfg.return_topic.as_deref(), Some("plate_recognizer"));
        assert_eq!(cfg.cameras, vec!["front", "driveway"]);
        assert_eq!(cfg.zones, vec!["driveway"]);
        assert_eq!(cfg.objects, vec!["car", "motorcycle", "bus"]);
        assert_eq!(cfg.min_score, Some(0.8));
        assert_eq!(cfg.db_path, "/data/plates.db");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.known_plates.get("ABC128").unwrap(), "Bob's Car");
        match cfg.provider {
            ProviderSettings::PlateRecognizer {
                ref url,
                ref token,
                ref regions,
            } => {
                assert_eq!(url, DEFAULT_PLATE_RECOGNIZER_URL);
                assert_eq!(token, "abc123");
                assert_eq!(regions, &["us-ca".to_string()]);
            }
            _ => panic!("expected plate_recognizer provider"),
        }
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  camera: [front]
code_project_ai: {}
"#,
        )
        .unwrap();
        assert_eq!(cfg.mqtt.server, DEFAULT_MQTT_SERVER);
        assert_eq!(cfg.mqtt.port, DEFAULT_MQTT_PORT);
        assert!(cfg.mqtt.username.is_none());
        assert_eq!(cfg.main_topic, "frigate");
        assert!(cfg.return_topic.is_none());
        assert!(cfg.zones.is_empty());
        assert_eq!(cfg.min_score, None);
        assert_eq!(cfg.db_path, DEFAULT_DB_PATH);
        assert_eq!(cfg.log_level, "info");
        match cfg.provider {
            ProviderSettings::CodeProjectAi { ref url } => {
                assert_eq!(url, DEFAULT_CODE_PROJECT_AI_URL);
            }
            _ => panic!("expected code_project_ai provider"),
        }
    }

    #[test]
    fn missing_provider_is_rejected() {
        let result = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  camera: [front]
"#,
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("no recognition provider"));
    }

    #[test]
    fn two_providers_are_rejected() {
        let result = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  camera: [front]
plate_recognizer:
  token: abc
code_project_ai: {}
"#,
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("mutually exclusive"));
    }

    #[test]
    fn plate_recognizer_requires_token() {
        let result = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  camera: [front]
plate_recognizer:
  regions: [us-ca]
"#,
        );
        assert!(result.unwrap_err().to_string().contains("token"));
    }

    #[test]
    fn empty_camera_list_is_rejected() {
        let result = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
code_project_ai: {}
"#,
        );
        assert!(result.unwrap_err().to_string().contains("camera"));
    }

    #[test]
    fn out_of_range_min_score_is_rejected() {
        let result = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  camera: [front]
  min_score: 1.5
code_project_ai: {}
"#,
        );
        assert!(result.unwrap_err().to_string().contains("min_score"));
    }

    #[test]
    fn mqtt_auth_requires_username() {
        let result = AppConfig::from_yaml(
            r#"
frigate:
  frigate_url: http://127.0.0.1:5000
  camera: [front]
  mqtt_auth: true
code_project_ai: {}
"#,
        );
        assert!(result.unwrap_err().to_string().contains("mqtt_username"));
    }
}
