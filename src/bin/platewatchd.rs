//! platewatchd - Frigate license plate recognition daemon.
//!
//! Subscribes to `{main_topic}/events` on the configured MQTT broker and
//! runs each detection event through the recognition pipeline. Connection
//! loss triggers an unbounded reconnect loop with a fixed delay; nothing
//! in per-event processing can take the daemon down.

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, Incoming, MqttOptions};
use std::path::PathBuf;
use std::time::Duration;

use platewatch::config::AppConfig;
use platewatch::frigate::FrigateClient;
use platewatch::pipeline::{Pipeline, ResultPublisher};
use platewatch::recognizer::build_recognizer;
use platewatch::store::SqlitePlateStore;

const RECONNECT_DELAY: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(author, version, about = "Frigate license plate recognition bridge")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, env = "PLATEWATCH_CONFIG", default_value = "./config/config.yml")]
    config: PathBuf,

    /// Override the database path from the configuration file.
    #[arg(long, env = "PLATEWATCH_DB_PATH")]
    db_path: Option<String>,
}

struct MqttPublisher {
    client: Client,
}

impl ResultPublisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .context("publish result message")?;
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = AppConfig::load(&args.config)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cfg.log_level.clone()),
    )
    .init();

    log::info!("platewatch {} starting", platewatch::VERSION);
    log::info!("  frigate: {}", cfg.frigate_url);
    log::info!("  mqtt broker: {}:{}", cfg.mqtt.server, cfg.mqtt.port);
    log::info!("  cameras: {}", cfg.cameras.join(", "));
    log::info!(
        "  zones: {}",
        if cfg.zones.is_empty() {
            "all".to_string()
        } else {
            cfg.zones.join(", ")
        }
    );
    log::info!("  objects: {}", cfg.objects.join(", "));
    log::info!(
        "  min score: {}",
        cfg.min_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    log::info!("  provider: {}", cfg.provider.name());
    log::info!("  known plates: {}", cfg.known_plates.len());

    // Schema init failure here is the one process-fatal error.
    let db_path = args.db_path.unwrap_or_else(|| cfg.db_path.clone());
    let store = SqlitePlateStore::open(&db_path)
        .with_context(|| format!("open plate database {}", db_path))?;
    log::info!("plate database open: {}", db_path);

    let recognizer = build_recognizer(&cfg.provider)?;
    let frigate = FrigateClient::new(&cfg.frigate_url)?;
    let mut pipeline = Pipeline::new(&cfg, Box::new(store), recognizer, Box::new(frigate));

    let events_topic = format!("{}/events", cfg.main_topic);
    loop {
        let (client, mut connection) = connect_mqtt(&cfg);

        if let Err(e) = client.subscribe(&events_topic, QoS::AtMostOnce) {
            log::warn!(
                "failed to subscribe to {}: {}. retrying in {}s",
                events_topic,
                e,
                RECONNECT_DELAY.as_secs()
            );
            std::thread::sleep(RECONNECT_DELAY);
            continue;
        }
        log::info!("subscribed to {}", events_topic);

        let publisher = MqttPublisher { client };

        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    match pipeline.process(&publish.payload, &publisher) {
                        Ok(outcome) => log::debug!("event outcome: {:?}", outcome),
                        Err(e) => log::error!("failed to process event: {:#}", e),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "mqtt connection lost: {}. reconnecting in {}s",
                        e,
                        RECONNECT_DELAY.as_secs()
                    );
                    break;
                }
            }
        }

        std::thread::sleep(RECONNECT_DELAY);
    }
}

fn connect_mqtt(cfg: &AppConfig) -> (Client, Connection) {
    // Timestamped client id so a restart does not collide with a stale
    // session on the broker.
    let client_id = format!("platewatch-{}", chrono::Local::now().format("%Y%m%d%H%M%S"));
    let mut options = MqttOptions::new(client_id, &cfg.mqtt.server, cfg.mqtt.port);
    options.set_keep_alive(Duration::from_secs(60));
    options.set_clean_start(true);
    if let Some(username) = &cfg.mqtt.username {
        options.set_credentials(username, cfg.mqtt.password.clone().unwrap_or_default());
    }

    log::info!(
        "connecting to mqtt broker {}:{} (auth: {})",
        cfg.mqtt.server,
        cfg.mqtt.port,
        cfg.mqtt.username.is_some()
    );
    Client::new(options, 10)
}
