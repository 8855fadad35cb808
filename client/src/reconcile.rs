//! Applies broadcast snapshots to the client's mirror set
//!
//! A payload is applied line by line. A malformed line is logged and skipped
//! without affecting the lines around it. References to names the client does
//! not know are not errors: an object update for an unknown object is
//! ignored, and an active player record for an unknown name creates a mirror.

use crate::collision::ColliderId;
use crate::mirror::{ClientWorld, PlayerMirror};
use log::{debug, info, warn};
use shared::{decode_payload, Event, ParseError, Position, Record};
use std::time::Instant;

/// Mirror-set changes worth reporting to whoever drives the frame loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEvent {
    PlayerJoined { name: String },
    PlayerLeft { name: String },
}

/// Outcome of applying one payload
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Records that changed (or refreshed) local state
    pub applied: usize,
    /// Well-formed records with nothing to act on
    pub ignored: usize,
    pub failures: Vec<ParseError>,
    pub events: Vec<LocalEvent>,
}

impl ClientWorld {
    /// Decodes and applies every record of one snapshot payload, in order
    pub fn apply_payload(&mut self, payload: &str) -> ApplyReport {
        let mut report = ApplyReport::default();

        for result in decode_payload(payload) {
            match result {
                Ok(record) => {
                    if self.apply_record(record, &mut report.events) {
                        report.applied += 1;
                    } else {
                        report.ignored += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping malformed snapshot line: {}", e);
                    report.failures.push(e);
                }
            }
        }

        report
    }

    /// Returns false when the record was well-formed but had no effect
    pub fn apply_record(&mut self, record: Record, events: &mut Vec<LocalEvent>) -> bool {
        match record {
            Record::Object { name, x, y } => self.apply_object(&name, x, y),
            Record::Player { name, active, x, y } => {
                self.apply_player(name, active, Position::new(x, y), events)
            }
            Record::Event(event) => self.apply_event(event, events),
        }
    }

    fn apply_object(&mut self, name: &str, x: f64, y: f64) -> bool {
        let Some(object) = self.objects.iter_mut().find(|object| object.name == name) else {
            debug!("Update for unknown object {}", name);
            return false;
        };

        let dx = x - object.position.x;
        let dy = y - object.position.y;
        object.move_by(dx, dy);
        self.colliders
            .set_position(&ColliderId::Object(object.name.clone()), object.position);
        true
    }

    fn apply_player(
        &mut self,
        name: String,
        active: bool,
        position: Position,
        events: &mut Vec<LocalEvent>,
    ) -> bool {
        // The local player is authoritative over itself
        if name == self.local.name {
            return false;
        }

        let id = ColliderId::Player(name.clone());

        if let Some(mirror) = self.players.get_mut(&name) {
            mirror.active = active;
            if active {
                mirror.position = position;
                mirror.last_seen = Instant::now();
                self.colliders.set_position(&id, position);
            }
            self.colliders.set_enabled(&id, active);
            return true;
        }

        if !active {
            return false;
        }

        info!("Player {} joined at ({:.1}, {:.1})", name, position.x, position.y);
        let mirror = PlayerMirror::new(&name, position, true);
        self.colliders.register(id, mirror.bounds());
        self.players.insert(name.clone(), mirror);
        events.push(LocalEvent::PlayerJoined { name });
        true
    }

    fn apply_event(&mut self, event: Event, events: &mut Vec<LocalEvent>) -> bool {
        match event {
            Event::ClientDisconnect { name } => {
                if self.remove_player(&name).is_none() {
                    return false;
                }
                info!("Player {} left", name);
                events.push(LocalEvent::PlayerLeft { name });
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::LocalPlayer;
    use assert_approx_eq::assert_approx_eq;
    use shared::WorldSpec;

    fn world(local: &str) -> ClientWorld {
        ClientWorld::new(
            LocalPlayer::new(local, Position::new(600.0, 400.0)),
            &WorldSpec::default_level(),
        )
    }

    #[test]
    fn test_own_player_record_is_ignored() {
        let mut world = world("One");

        let report = world.apply_payload("Player,One,true,1.000000,2.000000\n");

        assert_eq!(report.applied, 0);
        assert_eq!(report.ignored, 1);
        assert_eq!(world.local().position, Position::new(600.0, 400.0));
        assert!(world.player("One").is_none());
    }

    #[test]
    fn test_remote_player_is_mirrored() {
        let mut world = world("One");

        let report = world.apply_payload("Player,Two,true,10.000000,20.000000\n");

        assert_eq!(report.applied, 1);
        assert_eq!(
            report.events,
            vec![LocalEvent::PlayerJoined {
                name: "Two".to_string()
            }]
        );
        let mirror = world.player("Two").unwrap();
        assert_approx_eq!(mirror.position.x, 10.0);
        assert_approx_eq!(mirror.position.y, 20.0);
        assert!(world
            .colliders()
            .is_enabled(&ColliderId::Player("Two".to_string())));
    }

    #[test]
    fn test_malformed_line_is_isolated() {
        let mut world = world("One");
        let payload = "Player,Two,true,1.000000,1.000000\n\
                       Player,Three,maybe,1.000000,1.000000\n\
                       Player,Four,true,2.000000,2.000000\n\
                       Object,floor,0.000000,551.000000\n";

        let report = world.apply_payload(payload);

        assert_eq!(report.applied, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], ParseError::InvalidBool { .. }));
        assert!(world.player("Two").is_some());
        assert!(world.player("Three").is_none());
        assert!(world.player("Four").is_some());
    }

    #[test]
    fn test_non_numeric_field_is_isolated() {
        let mut world = world("One");
        let payload = "Player,Two,true,1.000000,1.000000\n\
                       Player,Three,true,abc,1.0\n\
                       Player,Four,true,2.000000,2.000000\n\
                       Object,floor,0.000000,551.000000\n";

        let report = world.apply_payload(payload);

        assert_eq!(report.applied, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            ParseError::InvalidNumber { field: "x", .. }
        ));
        assert!(world.player("Three").is_none());
        assert!(world.player("Four").is_some());
    }

    #[test]
    fn test_object_update_is_relative_move() {
        let mut world = world("One");

        world.apply_payload("Object,lift_horizontal,104.000000,450.000000\n");

        let lift = world.object("lift_horizontal").unwrap();
        assert_approx_eq!(lift.position.x, 104.0);
        assert_approx_eq!(lift.last_movement.x, 4.0);
        assert_approx_eq!(lift.last_movement.y, 0.0);

        let bounds = world
            .colliders()
            .bounds(&ColliderId::Object("lift_horizontal".to_string()))
            .unwrap();
        assert_approx_eq!(bounds.x, 104.0);
    }

    #[test]
    fn test_unknown_object_is_ignored() {
        let mut world = world("One");

        let report = world.apply_payload("Object,ghost,1.000000,1.000000\n");

        assert_eq!(report.ignored, 1);
        assert!(report.failures.is_empty());
        assert!(world.object("ghost").is_none());
    }

    #[test]
    fn test_inactive_records() {
        let mut world = world("One");

        // Unknown and inactive: nothing to mirror
        let report = world.apply_payload("Player,Two,false,5.000000,5.000000\n");
        assert_eq!(report.ignored, 1);
        assert!(world.player("Two").is_none());

        world.apply_payload("Player,Two,true,5.000000,5.000000\n");
        world.apply_payload("Player,Two,false,50.000000,50.000000\n");

        let mirror = world.player("Two").unwrap();
        assert!(!mirror.active);
        assert_approx_eq!(mirror.position.x, 5.0);
        assert!(!world
            .colliders()
            .is_enabled(&ColliderId::Player("Two".to_string())));
    }

    #[test]
    fn test_disconnect_removes_mirror() {
        let mut world = world("One");
        world.apply_payload("Player,Two,true,10.000000,20.000000\n");

        let report = world.apply_payload("Event,ClientDisconnect,Two\n");

        assert_eq!(report.applied, 1);
        assert_eq!(
            report.events,
            vec![LocalEvent::PlayerLeft {
                name: "Two".to_string()
            }]
        );
        assert!(world.player("Two").is_none());
        assert!(!world
            .colliders()
            .contains(&ColliderId::Player("Two".to_string())));

        // A repeated disconnect has nothing left to remove
        let report = world.apply_payload("Event,ClientDisconnect,Two\n");
        assert_eq!(report.ignored, 1);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_unknown_event_kind_is_a_failure() {
        let mut world = world("One");

        let report = world.apply_payload("Event,none,\nPlayer,Two,true,1.000000,1.000000");

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            ParseError::UnknownEventKind(_)
        ));
        assert_eq!(report.applied, 1);
    }
}
