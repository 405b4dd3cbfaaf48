use std::{env, time::Duration};

use log::*;
use sf_common::{parse_duration_secs, Secret};

const DEFAULT_SF_HOST: &str = "127.0.0.1";
const DEFAULT_SF_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_BROKER_URL: &str = "amqp://127.0.0.1:5672/%2f";
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// AMQP connection string for the message broker shared with the payment and user services. Broker URLs
    /// routinely embed credentials, so the value is wrapped and never logged.
    pub broker_url: Secret<String>,
    /// How long the listeners wait before resubscribing after losing the broker connection.
    pub reconnect_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SF_HOST.to_string(),
            port: DEFAULT_SF_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            broker_url: Secret::new(DEFAULT_BROKER_URL.to_string()),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SF_HOST").ok().unwrap_or_else(|| DEFAULT_SF_HOST.into());
        let port = env::var("SF_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SF_PORT. {e} Using the default, {DEFAULT_SF_PORT}, instead.");
                    DEFAULT_SF_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SF_PORT);
        let database_url = env::var("SF_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ SF_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}, instead.");
            DEFAULT_DATABASE_URL.into()
        });
        let broker_url = Secret::new(env::var("MESSAGE_BROKER_URL").unwrap_or_else(|_| {
            warn!("🪛️ MESSAGE_BROKER_URL is not set. Using the default, {DEFAULT_BROKER_URL}, instead.");
            DEFAULT_BROKER_URL.into()
        }));
        let reconnect_delay = parse_duration_secs(env::var("SF_RECONNECT_DELAY_SECS").ok(), DEFAULT_RECONNECT_DELAY);
        Self { host, port, database_url, broker_url, reconnect_delay }
    }
}
