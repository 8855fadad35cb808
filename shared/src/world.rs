//! Level description shared by the authority and every client
//!
//! Both sides build their static objects from the same `WorldSpec`, either the
//! built-in level or a TOML file passed with `--world`. The authority animates
//! them; clients only ever move their mirrors by what the snapshots report.

use crate::error::ConfigError;
use crate::{validate_name, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Scripted movement of a world object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Motion {
    #[default]
    Static,
    /// Moves back and forth between the spawn position and `to` at `speed`
    /// units per second, resting `pause` seconds at each end.
    Patrol {
        to: Position,
        speed: f64,
        #[serde(default)]
        pause: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub motion: Motion,
}

impl ObjectSpec {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidObject {
            name: self.name.clone(),
            reason,
        };

        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(invalid("position must be finite"));
        }
        if !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
        {
            return Err(invalid("size must be finite and positive"));
        }

        if let Motion::Patrol { to, speed, pause } = self.motion {
            if !(to.x.is_finite() && to.y.is_finite()) {
                return Err(invalid("patrol destination must be finite"));
            }
            if !(speed.is_finite() && speed > 0.0) {
                return Err(invalid("patrol speed must be finite and positive"));
            }
            if !(pause.is_finite() && pause >= 0.0) {
                return Err(invalid("patrol pause must be finite and not negative"));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorldSpec {
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

impl WorldSpec {
    /// Parses and validates a level description.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let spec: WorldSpec = toml::from_str(source)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Loads `path` when given, otherwise returns the built-in level.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default_level()),
        }
    }

    /// Object names must be valid wire names and unique within the level,
    /// and every object must have finite geometry the codec can carry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for object in &self.objects {
            validate_name(&object.name)?;
            if !seen.insert(object.name.as_str()) {
                return Err(ConfigError::DuplicateName(object.name.clone()));
            }
            object.validate()?;
        }
        Ok(())
    }

    /// Floor, one fixed ledge and two lifts.
    pub fn default_level() -> Self {
        Self {
            objects: vec![
                ObjectSpec {
                    name: "floor".to_string(),
                    x: 0.0,
                    y: 550.0,
                    width: 800.0,
                    height: 50.0,
                    motion: Motion::Static,
                },
                ObjectSpec {
                    name: "ledge".to_string(),
                    x: 500.0,
                    y: 400.0,
                    width: 150.0,
                    height: 20.0,
                    motion: Motion::Static,
                },
                ObjectSpec {
                    name: "lift_horizontal".to_string(),
                    x: 100.0,
                    y: 450.0,
                    width: 100.0,
                    height: 20.0,
                    motion: Motion::Patrol {
                        to: Position::new(300.0, 450.0),
                        speed: 40.0,
                        pause: 1.0,
                    },
                },
                ObjectSpec {
                    name: "lift_vertical".to_string(),
                    x: 650.0,
                    y: 300.0,
                    width: 100.0,
                    height: 20.0,
                    motion: Motion::Patrol {
                        to: Position::new(650.0, 150.0),
                        speed: 40.0,
                        pause: 0.5,
                    },
                },
            ],
        }
    }
}
