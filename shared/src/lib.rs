//! Types and wire format shared by the authority and its clients.
//!
//! Everything here is transport-free: the text codec for snapshots and
//! reply-channel requests, the error taxonomy, the level description and a
//! handful of constants both sides must agree on.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod codec;
pub mod error;
pub mod world;

pub use codec::{
    decode_line, decode_payload, decode_request, encode_event, encode_object, encode_player,
    encode_request, Ack, Event, PlayerState, Record, SnapshotWriter,
};
pub use error::{ChannelError, ConfigError, ParseError};
pub use world::{Motion, ObjectSpec, WorldSpec};

pub const DEFAULT_REPLY_PORT: u16 = 5555;
pub const DEFAULT_PUBLISH_PORT: u16 = 5556;
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Control datagram a client sends to the broadcast endpoint to (re)join.
pub const SUBSCRIBE: &str = "SUBSCRIBE";
/// Control datagram a client sends to the broadcast endpoint to leave.
pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;

/// Longest client or object name, in bytes. Keeps snapshots of a full
/// lobby within one datagram.
pub const MAX_NAME_LEN: usize = 64;

pub const PLAYER_SIZE: f64 = 32.0;
pub const WORLD_WIDTH: f64 = 800.0;
pub const WORLD_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned bounding box anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Aabb {
    pub fn new(position: Position, width: f64, height: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width,
            height,
        }
    }

    pub fn player(position: Position) -> Self {
        Self::new(position, PLAYER_SIZE, PLAYER_SIZE)
    }

    pub fn moved_to(&self, position: Position) -> Self {
        Self::new(position, self.width, self.height)
    }

    /// Edges that merely touch do not count as overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.x + self.width <= other.x
            || other.x + other.width <= self.x
            || self.y + self.height <= other.y
            || other.y + other.height <= self.y)
    }
}

/// Names travel unescaped inside comma-separated lines.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.contains([',', '\n', '\r']) {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}
