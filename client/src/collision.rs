//! Explicit broad-phase collider registry
//!
//! Every collidable thing the client knows about (level objects, the local
//! player and remote player mirrors) is registered here under a tagged id.
//! Systems that need overlap queries receive the registry by reference;
//! nothing joins or leaves collision as a side effect of another setter.

use shared::{Aabb, Position};
use std::collections::BTreeMap;

/// Objects and players live in separate namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColliderId {
    Object(String),
    Player(String),
}

#[derive(Debug, Clone)]
struct Collider {
    bounds: Aabb,
    enabled: bool,
}

#[derive(Debug, Default)]
pub struct ColliderRegistry {
    colliders: BTreeMap<ColliderId, Collider>,
}

impl ColliderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an enabled collider. Returns true if new.
    pub fn register(&mut self, id: ColliderId, bounds: Aabb) -> bool {
        self.colliders
            .insert(
                id,
                Collider {
                    bounds,
                    enabled: true,
                },
            )
            .is_none()
    }

    pub fn deregister(&mut self, id: &ColliderId) -> bool {
        self.colliders.remove(id).is_some()
    }

    pub fn set_position(&mut self, id: &ColliderId, position: Position) -> bool {
        match self.colliders.get_mut(id) {
            Some(collider) => {
                collider.bounds = collider.bounds.moved_to(position);
                true
            }
            None => false,
        }
    }

    /// Disabled colliders stay registered but never show up in queries.
    pub fn set_enabled(&mut self, id: &ColliderId, enabled: bool) -> bool {
        match self.colliders.get_mut(id) {
            Some(collider) => {
                collider.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &ColliderId) -> bool {
        self.colliders.contains_key(id)
    }

    pub fn is_enabled(&self, id: &ColliderId) -> bool {
        self.colliders.get(id).is_some_and(|c| c.enabled)
    }

    pub fn bounds(&self, id: &ColliderId) -> Option<Aabb> {
        self.colliders.get(id).map(|c| c.bounds)
    }

    /// Enabled colliders overlapping `area`, optionally skipping one id.
    pub fn overlapping(&self, area: &Aabb, exclude: Option<&ColliderId>) -> Vec<ColliderId> {
        self.colliders
            .iter()
            .filter(|(id, collider)| {
                collider.enabled && Some(*id) != exclude && collider.bounds.overlaps(area)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}
