//! Client-side view of the world: the local player plus read-only mirrors
//!
//! The local player is simulated here and is authoritative for itself.
//! Everything else is a mirror kept approximately in sync by snapshots:
//! - Level objects are built from the shared level description at startup
//!   and only ever moved by relative corrections
//! - Remote players are created, updated and removed by name as snapshot
//!   records arrive

use crate::collision::{ColliderId, ColliderRegistry};
use log::info;
use shared::{Aabb, ObjectSpec, PlayerState, Position, WorldSpec};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// The player this client simulates and reports
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub name: String,
    pub position: Position,
    pub active: bool,
}

impl LocalPlayer {
    pub fn new(name: &str, position: Position) -> Self {
        Self {
            name: name.to_string(),
            position,
            active: true,
        }
    }

    /// Request body for the reply channel
    pub fn state(&self) -> PlayerState {
        PlayerState {
            name: self.name.clone(),
            active: self.active,
            x: self.position.x,
            y: self.position.y,
        }
    }
}

/// Local copy of a level object
#[derive(Debug, Clone)]
pub struct ObjectMirror {
    pub name: String,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    /// Offset applied by the latest correction; riders on a moving platform
    /// follow it
    pub last_movement: Position,
}

impl ObjectMirror {
    pub fn from_spec(spec: &ObjectSpec) -> Self {
        Self {
            name: spec.name.clone(),
            position: spec.position(),
            width: spec.width,
            height: spec.height,
            last_movement: Position::default(),
        }
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.position.x += dx;
        self.position.y += dy;
        self.last_movement = Position::new(dx, dy);
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.width, self.height)
    }
}

/// Local copy of another client's player
#[derive(Debug, Clone)]
pub struct PlayerMirror {
    pub name: String,
    pub position: Position,
    pub active: bool,
    /// Last time a snapshot mentioned this player
    pub last_seen: Instant,
}

impl PlayerMirror {
    pub fn new(name: &str, position: Position, active: bool) -> Self {
        Self {
            name: name.to_string(),
            position,
            active,
            last_seen: Instant::now(),
        }
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.last_seen.elapsed() > max_age
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::player(self.position)
    }
}

/// Everything one client knows about the shared world
pub struct ClientWorld {
    pub(crate) local: LocalPlayer,
    pub(crate) objects: Vec<ObjectMirror>,
    pub(crate) players: BTreeMap<String, PlayerMirror>,
    pub(crate) colliders: ColliderRegistry,
}

impl ClientWorld {
    /// Builds object mirrors from the level and registers every collider
    pub fn new(local: LocalPlayer, level: &WorldSpec) -> Self {
        let objects: Vec<ObjectMirror> = level.objects.iter().map(ObjectMirror::from_spec).collect();

        let mut colliders = ColliderRegistry::new();
        for object in &objects {
            colliders.register(ColliderId::Object(object.name.clone()), object.bounds());
        }
        colliders.register(
            ColliderId::Player(local.name.clone()),
            Aabb::player(local.position),
        );

        Self {
            local,
            objects,
            players: BTreeMap::new(),
            colliders,
        }
    }

    pub fn local(&self) -> &LocalPlayer {
        &self.local
    }

    /// Moves the local player; snapshots never do
    pub fn move_local(&mut self, position: Position) {
        self.local.position = position;
        self.colliders
            .set_position(&ColliderId::Player(self.local.name.clone()), position);
    }

    /// Marks the local player as leaving; the next report tells the authority
    pub fn deactivate_local(&mut self) {
        self.local.active = false;
    }

    pub fn objects(&self) -> &[ObjectMirror] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&ObjectMirror> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerMirror> {
        self.players.values()
    }

    pub fn player(&self, name: &str) -> Option<&PlayerMirror> {
        self.players.get(name)
    }

    pub fn colliders(&self) -> &ColliderRegistry {
        &self.colliders
    }

    /// Removes a remote mirror together with its collider
    pub(crate) fn remove_player(&mut self, name: &str) -> Option<PlayerMirror> {
        let removed = self.players.remove(name)?;
        self.colliders
            .deregister(&ColliderId::Player(name.to_string()));
        Some(removed)
    }

    /// Drops remote mirrors no snapshot has mentioned within `max_age`
    pub fn evict_stale(&mut self, max_age: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .players
            .values()
            .filter(|mirror| mirror.is_stale(max_age))
            .map(|mirror| mirror.name.clone())
            .collect();

        for name in &stale {
            self.remove_player(name);
            info!("Evicted stale mirror {}", name);
        }

        stale
    }
}
