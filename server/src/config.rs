//! Authority runtime settings

use shared::{ConfigError, WorldSpec, DEFAULT_PUBLISH_PORT, DEFAULT_REPLY_PORT, DEFAULT_TICK};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    pub host: String,
    pub reply_port: u16,
    pub publish_port: u16,
    /// Interval between snapshots; must be non-zero
    pub tick_interval: Duration,
    /// Sessions silent for longer than this are dropped; None keeps them forever
    pub session_timeout: Option<Duration>,
    pub subscriber_timeout: Duration,
    pub world: WorldSpec,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            reply_port: DEFAULT_REPLY_PORT,
            publish_port: DEFAULT_PUBLISH_PORT,
            tick_interval: DEFAULT_TICK,
            session_timeout: Some(Duration::from_secs(5)),
            subscriber_timeout: Duration::from_secs(5),
            world: WorldSpec::default_level(),
        }
    }
}

impl AuthorityConfig {
    pub fn reply_addr(&self) -> String {
        format!("{}:{}", self.host, self.reply_port)
    }

    pub fn publish_addr(&self) -> String {
        format!("{}:{}", self.host, self.publish_port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidTick);
        }
        if self.subscriber_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("subscriber timeout"));
        }
        if self.session_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::InvalidTimeout("session timeout"));
        }
        self.world.validate()
    }
}
