//! Authority wiring: binds both channels and runs their loops side by side

use crate::broadcast::Publisher;
use crate::config::AuthorityConfig;
use crate::events::{EventQueue, SharedEvents};
use crate::registry::{SessionRegistry, SharedRegistry};
use crate::reply::{ReplyHandler, ReplyServer};
use crate::world::World;
use log::{error, info};
use shared::Event;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::interval;

/// Removes sessions silent for longer than `timeout` and announces each one
///
/// Returns the names of the expired sessions.
pub async fn expire_sessions(
    registry: &SharedRegistry,
    events: &SharedEvents,
    timeout: Duration,
) -> Vec<String> {
    let mut registry = registry.write().await;
    let expired = registry.expire(timeout);
    if expired.is_empty() {
        return Vec::new();
    }

    let mut events = events.lock().await;
    expired
        .into_iter()
        .map(|session| {
            info!("Client {} timed out", session.name);
            events.push(Event::ClientDisconnect {
                name: session.name.clone(),
            });
            session.name
        })
        .collect()
}

/// The process owning the session registry and driving both channels
pub struct Authority {
    registry: SharedRegistry,
    events: SharedEvents,
    reply: ReplyServer,
    publisher: Publisher,
    session_timeout: Option<Duration>,
}

impl Authority {
    /// Validates the configuration and binds both endpoints
    ///
    /// A bind failure here is fatal for the authority.
    pub async fn bind(config: AuthorityConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let registry = SessionRegistry::shared();
        let events = EventQueue::shared();

        let handler = ReplyHandler::new(registry.clone(), events.clone());
        let reply = ReplyServer::bind(&config.reply_addr(), handler).await?;

        let publisher = Publisher::bind(
            &config.publish_addr(),
            registry.clone(),
            events.clone(),
            World::from_spec(&config.world),
            config.tick_interval,
            config.subscriber_timeout,
        )
        .await?;

        Ok(Self {
            registry,
            events,
            reply,
            publisher,
            session_timeout: config.session_timeout,
        })
    }

    pub fn reply_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(self.reply.local_addr()?)
    }

    pub fn publish_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(self.publisher.local_addr()?)
    }

    /// Spawns task that expires silent sessions once per second
    fn spawn_session_expiry(&self, timeout: Duration) {
        let registry = self.registry.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;
                expire_sessions(&registry, &events, timeout).await;
            }
        });
    }

    /// Runs the reply loop and the broadcast loop until one of them stops
    pub async fn run(self) {
        if let Some(timeout) = self.session_timeout {
            self.spawn_session_expiry(timeout);
        }

        let reply_task = tokio::spawn(self.reply.run());
        let publish_task = tokio::spawn(self.publisher.run());

        info!("Authority started successfully");

        tokio::select! {
            result = reply_task => {
                if let Err(e) = result {
                    error!("Reply loop panicked: {}", e);
                }
            }
            result = publish_task => {
                if let Err(e) = result {
                    error!("Broadcast loop panicked: {}", e);
                }
            }
        }
    }
}
