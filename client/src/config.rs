//! Client runtime settings

use shared::{validate_name, ConfigError, WorldSpec, DEFAULT_PUBLISH_PORT, DEFAULT_REPLY_PORT};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Unique among concurrently connected clients
    pub name: String,
    pub server: String,
    pub reply_port: u16,
    pub publish_port: u16,
    pub frame_interval: Duration,
    pub request_timeout: Duration,
    /// Remote mirrors not refreshed within this age are evicted; None keeps them
    pub mirror_timeout: Option<Duration>,
    /// How often SUBSCRIBE is repeated to the broadcast endpoint
    pub keepalive: Duration,
    pub world: WorldSpec,
}

impl ClientConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            server: "127.0.0.1".to_string(),
            reply_port: DEFAULT_REPLY_PORT,
            publish_port: DEFAULT_PUBLISH_PORT,
            frame_interval: Duration::from_millis(16),
            request_timeout: Duration::from_millis(500),
            mirror_timeout: Some(Duration::from_secs(5)),
            keepalive: Duration::from_secs(1),
            world: WorldSpec::default_level(),
        }
    }

    pub fn reply_addr(&self) -> String {
        format!("{}:{}", self.server, self.reply_port)
    }

    pub fn publish_addr(&self) -> String {
        format!("{}:{}", self.server, self.publish_port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name)?;
        if self.frame_interval.is_zero() || self.keepalive.is_zero() {
            return Err(ConfigError::InvalidTick);
        }
        self.world.validate()
    }
}
