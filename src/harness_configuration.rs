use crate::{error::Error, fixtures::DEFAULT_RESOURCE_PATH, polling::RetryPolicy};
use serde::Deserialize;
use std::{
    convert::TryFrom,
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

const DEFAULT_BROKER_PORT: u16 = 5672;

/// Connection parameters of the message broker events are published to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfiguration {
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub exchange: String,
    pub routing_key: String,
}

fn default_broker_port() -> u16 {
    DEFAULT_BROKER_PORT
}

/// Everything a scenario needs to know about its surroundings. Passed
/// explicitly into each scenario instead of being read from globals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfiguration {
    frontend_host: String,
    frontend_port: u16,
    resource_path: PathBuf,
    poll_interval_ms: u64,
    request_timeout_ms: u64,
    broker: Option<BrokerConfiguration>,
}

impl HarnessConfiguration {
    pub fn new() -> Self {
        Self {
            frontend_host: String::from("localhost"),
            frontend_port: 0,
            resource_path: PathBuf::from(DEFAULT_RESOURCE_PATH),
            poll_interval_ms: 500,
            request_timeout_ms: 30_000,
            broker: None,
        }
    }

    /// Reads the configuration from process environment variables.
    ///
    /// `RABBIT_HOST`, `RABBIT_PORT`, `RABBIT_USERNAME`, `RABBIT_PASSWORD`,
    /// `RABBIT_EXCHANGE` and `RABBIT_KEY` describe the broker; it is left
    /// unconfigured when `RABBIT_HOST` is absent. `FRONTEND_HOST`,
    /// `FRONTEND_PORT`, `RESOURCE_PATH`, `POLL_INTERVAL_MS` and
    /// `REQUEST_TIMEOUT_SECS` override the remaining defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, Error> {
        let mut configuration = Self::new();

        if let Some(host) = lookup("FRONTEND_HOST") {
            configuration.frontend_host = host;
        }
        if let Some(port) = lookup("FRONTEND_PORT") {
            configuration.frontend_port = parse_value("FRONTEND_PORT", &port)?;
        }
        if let Some(path) = lookup("RESOURCE_PATH") {
            configuration.resource_path = PathBuf::from(path);
        }
        if let Some(interval) = lookup("POLL_INTERVAL_MS") {
            configuration.poll_interval_ms = parse_value("POLL_INTERVAL_MS", &interval)?;
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT_SECS") {
            let seconds: u64 = parse_value("REQUEST_TIMEOUT_SECS", &timeout)?;
            configuration.request_timeout_ms = seconds.checked_mul(1000).ok_or_else(|| {
                Error::Configuration(format!("REQUEST_TIMEOUT_SECS is too large: {}", seconds))
            })?;
        }

        if let Some(host) = lookup("RABBIT_HOST") {
            let required = |key: &str| {
                lookup(key).ok_or_else(|| Error::Configuration(format!("{} is not set", key)))
            };
            let port = match lookup("RABBIT_PORT") {
                Some(port) => parse_value("RABBIT_PORT", &port)?,
                None => DEFAULT_BROKER_PORT,
            };

            configuration.broker = Some(BrokerConfiguration {
                host,
                port,
                username: required("RABBIT_USERNAME")?,
                password: required("RABBIT_PASSWORD")?,
                exchange: required("RABBIT_EXCHANGE")?,
                routing_key: required("RABBIT_KEY")?,
            });
        }

        Ok(configuration)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::Configuration(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn set_frontend_host<S: Into<String>>(&mut self, host: S) {
        self.frontend_host = host.into();
    }

    pub fn frontend_host(&self) -> &str {
        &self.frontend_host
    }

    pub fn set_frontend_port(&mut self, port: u16) {
        self.frontend_port = port;
    }

    pub fn frontend_port(&self) -> u16 {
        self.frontend_port
    }

    pub fn set_resource_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.resource_path = path.into();
    }

    pub fn resource_path(&self) -> &Path {
        &self.resource_path
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval_ms = millis(interval);
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout_ms = millis(timeout);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn set_broker(&mut self, broker: BrokerConfiguration) {
        self.broker = Some(broker);
    }

    pub fn broker(&self) -> Option<&BrokerConfiguration> {
        self.broker.as_ref()
    }

    /// Polling policy for a wait of `timeout`, using the configured interval.
    pub fn retry_policy(&self, timeout: Duration) -> RetryPolicy {
        RetryPolicy::new(self.poll_interval(), timeout)
    }
}

impl Default for HarnessConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{} has an invalid value '{}'", key, value)))
}
