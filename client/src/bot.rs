//! Headless stand-in for player input: a bounded random walk

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Position, PLAYER_SIZE, WORLD_HEIGHT, WORLD_WIDTH};

/// Pixels per second
const WALK_SPEED: f64 = 120.0;
/// Chance per step of picking a new heading
const TURN_CHANCE: f64 = 0.05;

pub struct Wanderer {
    rng: StdRng,
    heading: f64,
}

impl Wanderer {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let heading = rng.gen_range(0.0..std::f64::consts::TAU);
        Self { rng, heading }
    }

    /// Advances `from` by `dt` seconds, keeping the player inside the world
    pub fn step(&mut self, from: Position, dt: f64) -> Position {
        if self.rng.gen_bool(TURN_CHANCE) {
            self.heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
        }

        let distance = WALK_SPEED * dt;
        let mut x = from.x + self.heading.cos() * distance;
        let mut y = from.y + self.heading.sin() * distance;

        let max_x = WORLD_WIDTH - PLAYER_SIZE;
        let max_y = WORLD_HEIGHT - PLAYER_SIZE;
        if !(0.0..=max_x).contains(&x) || !(0.0..=max_y).contains(&y) {
            // Bounce back toward the middle
            self.heading += std::f64::consts::PI;
            x = x.clamp(0.0, max_x);
            y = y.clamp(0.0, max_y);
        }

        Position::new(x, y)
    }
}
