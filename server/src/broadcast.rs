//! Publish/subscribe channel: periodic world snapshots fanned out to clients
//!
//! Every tick the publisher advances the scripted world objects, serializes
//! objects, live sessions and pending events into one payload, and sends it
//! as one datagram to every subscriber. Delivery is best effort: nothing is
//! acknowledged or resent.
//!
//! Datagrams carry no notion of subscription, so clients join by sending
//! `SUBSCRIBE` to the broadcast endpoint and keep repeating it as a
//! keepalive. Subscribers that go quiet are dropped.

use crate::events::SharedEvents;
use crate::registry::SharedRegistry;
use crate::world::World;
use log::{debug, error, info, warn};
use shared::{ChannelError, ConfigError, SnapshotWriter, MAX_DATAGRAM, SUBSCRIBE, UNSUBSCRIBE};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};

/// Addresses currently receiving snapshots and when each last checked in
#[derive(Debug, Default)]
pub struct SubscriberSet {
    subscribers: HashMap<SocketAddr, Instant>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or refreshes a subscriber. Returns true if it was not known.
    pub fn subscribe(&mut self, addr: SocketAddr) -> bool {
        self.subscribers.insert(addr, Instant::now()).is_none()
    }

    pub fn unsubscribe(&mut self, addr: &SocketAddr) -> bool {
        self.subscribers.remove(addr).is_some()
    }

    /// Drops subscribers that have not checked in within `timeout`
    pub fn expire(&mut self, timeout: Duration) -> Vec<SocketAddr> {
        let expired: Vec<SocketAddr> = self
            .subscribers
            .iter()
            .filter(|(_, last_seen)| last_seen.elapsed() > timeout)
            .map(|(addr, _)| *addr)
            .collect();

        for addr in &expired {
            self.subscribers.remove(addr);
        }

        expired
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.subscribers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Authority end of the broadcast channel
pub struct Publisher {
    socket: Arc<UdpSocket>,
    subscribers: Arc<RwLock<SubscriberSet>>,
    registry: SharedRegistry,
    events: SharedEvents,
    world: World,
    tick_interval: Duration,
    subscriber_timeout: Duration,
    tick: u64,
}

impl Publisher {
    /// Binds the broadcast endpoint
    ///
    /// Both durations must be non-zero.
    pub async fn bind(
        addr: &str,
        registry: SharedRegistry,
        events: SharedEvents,
        world: World,
        tick_interval: Duration,
        subscriber_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        if tick_interval.is_zero() {
            return Err(ConfigError::InvalidTick.into());
        }
        if subscriber_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("subscriber timeout").into());
        }

        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ChannelError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Broadcast channel listening on {}", addr);

        Ok(Self {
            socket: Arc::new(socket),
            subscribers: Arc::new(RwLock::new(SubscriberSet::new())),
            registry,
            events,
            world,
            tick_interval,
            subscriber_timeout,
            tick: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn subscribers(&self) -> Arc<RwLock<SubscriberSet>> {
        Arc::clone(&self.subscribers)
    }

    /// Serializes objects, then live sessions, then pending events
    ///
    /// Draining the event queue here is what makes every event appear in
    /// exactly one snapshot.
    pub async fn build_snapshot(&self) -> String {
        let mut writer = SnapshotWriter::new();

        for object in self.world.objects() {
            writer.object(&object.name, object.position.x, object.position.y);
        }

        let sessions = self.registry.read().await.snapshot();
        for session in &sessions {
            writer.player(
                &session.name,
                session.active,
                session.position.x,
                session.position.y,
            );
        }

        let events = self.events.lock().await.drain();
        for event in &events {
            writer.event(event);
        }

        writer.finish()
    }

    async fn publish(&self, payload: &str) {
        if payload.len() > MAX_DATAGRAM {
            warn!(
                "Snapshot of {} bytes exceeds datagram limit, skipping tick {}",
                payload.len(),
                self.tick
            );
            return;
        }

        let addrs = self.subscribers.read().await.addrs();
        for addr in addrs {
            if let Err(e) = self.socket.send_to(payload.as_bytes(), addr).await {
                error!("Failed to send snapshot to {}: {}", addr, e);
            }
        }
    }

    /// Spawns task that tracks subscribe/unsubscribe control datagrams
    fn spawn_control_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let subscribers = Arc::clone(&self.subscribers);

        tokio::spawn(async move {
            let mut buffer = [0u8; 64];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match std::str::from_utf8(&buffer[..len]).map(str::trim) {
                        Ok(SUBSCRIBE) => {
                            if subscribers.write().await.subscribe(addr) {
                                info!("Subscriber {} joined", addr);
                            }
                        }
                        Ok(UNSUBSCRIBE) => {
                            if subscribers.write().await.unsubscribe(&addr) {
                                info!("Subscriber {} left", addr);
                            }
                        }
                        _ => warn!("Ignoring unknown control message from {}", addr),
                    },
                    Err(e) => {
                        error!("Error receiving control message: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drops subscribers who stopped sending keepalives
    fn spawn_subscriber_expiry(&self, timeout: Duration) {
        let subscribers = Arc::clone(&self.subscribers);

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;
                for addr in subscribers.write().await.expire(timeout) {
                    info!("Subscriber {} timed out", addr);
                }
            }
        });
    }

    /// Publishes a snapshot every tick until the task is dropped
    pub async fn run(mut self) {
        self.spawn_control_receiver();
        self.spawn_subscriber_expiry(self.subscriber_timeout);

        let mut tick_interval = interval(self.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            tick_interval.tick().await;

            let now = Instant::now();
            let dt = now.duration_since(last_tick).as_secs_f64();
            last_tick = now;

            self.world.step(dt);
            self.tick += 1;

            let payload = self.build_snapshot().await;
            self.publish(&payload).await;

            if self.tick % 500 == 0 {
                debug!(
                    "Tick {}: {} subscribers, {} bytes per snapshot",
                    self.tick,
                    self.subscribers.read().await.len(),
                    payload.len()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventQueue;
    use crate::registry::SessionRegistry;
    use shared::{decode_payload, Event, Record, WorldSpec};

    async fn publisher() -> (Publisher, SharedRegistry, SharedEvents) {
        let registry = SessionRegistry::shared();
        let events = EventQueue::shared();
        let publisher = Publisher::bind(
            "127.0.0.1:0",
            registry.clone(),
            events.clone(),
            World::from_spec(&WorldSpec::default_level()),
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        (publisher, registry, events)
    }

    async fn bind_with(
        tick: Duration,
        subscriber_timeout: Duration,
    ) -> Result<Publisher, ChannelError> {
        Publisher::bind(
            "127.0.0.1:0",
            SessionRegistry::shared(),
            EventQueue::shared(),
            World::default(),
            tick,
            subscriber_timeout,
        )
        .await
    }

    #[tokio::test]
    async fn test_bind_rejects_zero_durations() {
        assert!(matches!(
            bind_with(Duration::ZERO, Duration::from_secs(5)).await,
            Err(ChannelError::Config(ConfigError::InvalidTick))
        ));
        assert!(matches!(
            bind_with(Duration::from_millis(10), Duration::ZERO).await,
            Err(ChannelError::Config(ConfigError::InvalidTimeout(_)))
        ));
        assert!(bind_with(Duration::from_millis(10), Duration::from_secs(5))
            .await
            .is_ok());
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let mut set = SubscriberSet::new();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        assert!(set.subscribe(addr));
        assert!(!set.subscribe(addr));
        assert_eq!(set.len(), 1);

        assert!(set.unsubscribe(&addr));
        assert!(!set.unsubscribe(&addr));
        assert!(set.is_empty());
    }

    #[test]
    fn test_subscriber_expiry() {
        let mut set = SubscriberSet::new();
        let stale: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let fresh: SocketAddr = "127.0.0.1:9001".parse().unwrap();

        set.subscribe(stale);
        set.subscribe(fresh);
        set.subscribers
            .insert(stale, Instant::now() - Duration::from_secs(10));

        assert_eq!(set.expire(Duration::from_secs(5)), vec![stale]);
        assert_eq!(set.addrs(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_snapshot_contains_player_line() {
        let (publisher, registry, _events) = publisher().await;
        registry.write().await.upsert("Two", 10.0, 20.0);

        let payload = publisher.build_snapshot().await;

        assert!(payload.contains("Player,Two,true,10.000000,20.000000\n"));
        assert!(payload.contains("Object,floor,0.000000,550.000000\n"));
    }

    #[tokio::test]
    async fn test_snapshot_drains_events_once() {
        let (publisher, _registry, events) = publisher().await;
        events.lock().await.push(Event::ClientDisconnect {
            name: "Two".to_string(),
        });

        let first = publisher.build_snapshot().await;
        let second = publisher.build_snapshot().await;

        assert!(first.contains("Event,ClientDisconnect,Two\n"));
        assert!(!second.contains("Event,"));
    }

    #[tokio::test]
    async fn test_snapshot_decodes_cleanly() {
        let (publisher, registry, events) = publisher().await;
        registry.write().await.upsert("One", 1.0, 2.0);
        events.lock().await.push(Event::ClientDisconnect {
            name: "Two".to_string(),
        });

        let records = decode_payload(&publisher.build_snapshot().await);

        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|record| record.is_ok()));
        let players = records
            .iter()
            .filter(|record| matches!(record, Ok(Record::Player { .. })))
            .count();
        assert_eq!(players, 1);
    }

    #[tokio::test]
    async fn test_subscriber_receives_snapshots() {
        let (publisher, registry, _events) = publisher().await;
        registry.write().await.upsert("Two", 10.0, 20.0);
        let addr = publisher.local_addr().unwrap();
        let task = tokio::spawn(publisher.run());

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(addr).await.unwrap();
        socket.send(SUBSCRIBE.as_bytes()).await.unwrap();

        let mut buffer = vec![0u8; MAX_DATAGRAM];
        let len = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buffer))
            .await
            .expect("no snapshot within timeout")
            .unwrap();
        let payload = std::str::from_utf8(&buffer[..len]).unwrap();

        assert!(payload.contains("Player,Two,true,10.000000,20.000000\n"));

        task.abort();
    }
}
