//! Request/reply channel: clients report their state, the authority acknowledges
//!
//! Each datagram goes through the same steps:
//! await → parse → upsert (active) or remove (inactive) → acknowledge.
//!
//! One loop owns the socket and answers every request before reading the
//! next one, so a client never has two requests in flight. A malformed
//! request is answered with an error acknowledgment and never stops the loop.

use crate::events::SharedEvents;
use crate::registry::SharedRegistry;
use log::{debug, error, info, warn};
use shared::{decode_request, Ack, ChannelError, Event, MAX_DATAGRAM};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Transport-free core of the reply channel
#[derive(Clone)]
pub struct ReplyHandler {
    registry: SharedRegistry,
    events: SharedEvents,
}

impl ReplyHandler {
    pub fn new(registry: SharedRegistry, events: SharedEvents) -> Self {
        Self { registry, events }
    }

    /// Applies one request to the registry and returns its acknowledgment
    pub async fn handle(&self, message: &str) -> Ack {
        let state = match decode_request(message) {
            Ok(state) => state,
            Err(e) => {
                warn!("Rejecting malformed request ({} bytes): {}", message.len(), e);
                return Ack::Rejected(e.to_string());
            }
        };

        if state.active {
            let created = {
                let mut registry = self.registry.write().await;
                registry.upsert(&state.name, state.x, state.y)
            };
            if created {
                info!(
                    "Client {} joined at ({:.1}, {:.1})",
                    state.name, state.x, state.y
                );
            }
            return Ack::Accepted;
        }

        // Removal and its announcement happen under the registry lock so no
        // snapshot can see the event before the session is gone.
        let mut registry = self.registry.write().await;
        match registry.mark_inactive_and_remove(&state.name) {
            Some(session) => {
                self.events.lock().await.push(Event::ClientDisconnect {
                    name: session.name.clone(),
                });
                info!("Client {} disconnected", session.name);
            }
            None => {
                debug!("Disconnect from unknown client {}", state.name);
            }
        }

        Ack::Disconnected
    }
}

/// Authority end of the reply channel
pub struct ReplyServer {
    socket: UdpSocket,
    handler: ReplyHandler,
}

impl ReplyServer {
    pub async fn bind(addr: &str, handler: ReplyHandler) -> Result<Self, ChannelError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ChannelError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Reply channel listening on {}", addr);

        Ok(Self { socket, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serves requests until the task is dropped
    pub async fn run(self) {
        let mut buffer = vec![0u8; MAX_DATAGRAM];

        loop {
            let (len, addr) = match self.socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(e) => {
                    error!("Error receiving request: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            let message = String::from_utf8_lossy(&buffer[..len]);
            let ack = self.handler.handle(&message).await;

            if let Err(e) = self.socket.send_to(ack.to_string().as_bytes(), addr).await {
                error!("Failed to acknowledge {}: {}", addr, e);
            }
        }
    }
}
