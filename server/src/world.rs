use log::info;
use shared::{Motion, ObjectSpec, Position, WorldSpec};

/// A static level object owned by the authority.
///
/// Never created or destroyed after startup; only its scripted motion moves it.
#[derive(Debug, Clone)]
pub struct WorldObject {
    pub name: String,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    motion: Motion,
    origin: Position,
    outbound: bool,
    pause_remaining: f64,
}

impl WorldObject {
    pub fn from_spec(spec: &ObjectSpec) -> Self {
        Self {
            name: spec.name.clone(),
            position: spec.position(),
            width: spec.width,
            height: spec.height,
            motion: spec.motion,
            origin: spec.position(),
            outbound: true,
            pause_remaining: 0.0,
        }
    }

    pub fn step(&mut self, dt: f64) {
        let Motion::Patrol { to, speed, pause } = self.motion else {
            return;
        };
        if speed <= 0.0 {
            return;
        }

        let mut dt = dt;
        if self.pause_remaining > 0.0 {
            self.pause_remaining -= dt;
            if self.pause_remaining > 0.0 {
                return;
            }
            dt = -self.pause_remaining;
            self.pause_remaining = 0.0;
        }

        let target = if self.outbound { to } else { self.origin };
        let remaining = self.position.distance(&target);
        let travel = speed * dt;

        if travel >= remaining {
            self.position = target;
            self.outbound = !self.outbound;
            self.pause_remaining = pause;
        } else {
            self.position.x += (target.x - self.position.x) / remaining * travel;
            self.position.y += (target.y - self.position.y) / remaining * travel;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct World {
    objects: Vec<WorldObject>,
}

impl World {
    pub fn from_spec(spec: &WorldSpec) -> Self {
        let objects: Vec<WorldObject> = spec.objects.iter().map(WorldObject::from_spec).collect();
        info!("World loaded with {} objects", objects.len());
        Self { objects }
    }

    pub fn step(&mut self, dt: f64) {
        for object in &mut self.objects {
            object.step(dt);
        }
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn get(&self, name: &str) -> Option<&WorldObject> {
        self.objects.iter().find(|object| object.name == name)
    }
}
