use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_pretty() -> bool { true }

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_minimum_emergency_seat_age")]
    pub minimum_emergency_seat_age: u32,
    /// Capacity of the seat-event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_minimum_emergency_seat_age() -> u32 { 18 }

fn default_event_buffer() -> usize { 100 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            minimum_emergency_seat_age: default_minimum_emergency_seat_age(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `ALTIS__STORE__PATH=/var/lib/altis/seats.json`
            .add_source(config::Environment::with_prefix("ALTIS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
