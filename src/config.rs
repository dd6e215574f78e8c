//! Chain files
//!
//! A chain file is JSON listing springs and masses top to bottom, with
//! optional simulation settings:
//!
//! ```json
//! {
//!   "springs": [{ "index": 1, "rest_length": 0.5, "stiffness": 100.0, "behavior": "linear" }],
//!   "masses": [{ "type": "masspoint", "index": 1, "mass": 2.0, "position": [0.0, -0.6962] }],
//!   "settings": { "t_end": 5.0 }
//! }
//! ```
//!
//! Positions are in the presentation frame (up is +y). Velocities are
//! integration-frame values (down is +y) and enter the initial state as given.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{Chain, ChainBuilder, Mass, MassKind, MassTag, Spring, SpringBehavior};
use crate::error::{ChainError, PersistenceError};
use crate::settings::SimulationSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringSpec {
    pub index: usize,
    pub rest_length: f64,
    pub stiffness: f64,
    #[serde(default)]
    pub behavior: SpringBehavior,
}

impl From<&Spring> for SpringSpec {
    fn from(spring: &Spring) -> Self {
        Self {
            index: spring.index(),
            rest_length: spring.rest_length(),
            stiffness: spring.stiffness(),
            behavior: spring.behavior(),
        }
    }
}

impl SpringSpec {
    pub fn to_spring(&self) -> Spring {
        Spring::new(self.index, self.rest_length, self.stiffness, self.behavior)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpec {
    #[serde(rename = "type")]
    pub kind: MassTag,
    pub index: usize,
    /// Point masses only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    /// Rigid blocks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_dim: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_dim: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_dim: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    pub position: [f64; 2],
    #[serde(default)]
    pub velocity: [f64; 2],
    #[serde(default)]
    pub external_force: f64,
}

impl From<&Mass> for MassSpec {
    fn from(mass: &Mass) -> Self {
        let mut spec = Self {
            kind: mass.tag(),
            index: mass.index(),
            mass: None,
            x_dim: None,
            y_dim: None,
            z_dim: None,
            density: None,
            position: mass.position(),
            velocity: mass.velocity(),
            external_force: mass.external_force(),
        };
        match mass.kind() {
            MassKind::MassPoint { mass } => spec.mass = Some(mass),
            MassKind::RigidBlock {
                x_dim,
                y_dim,
                z_dim,
                density,
            } => {
                spec.x_dim = Some(x_dim);
                spec.y_dim = Some(y_dim);
                spec.z_dim = Some(z_dim);
                spec.density = Some(density);
            }
        }
        spec
    }
}

impl MassSpec {
    pub fn to_mass(&self) -> Result<Mass, ChainError> {
        let element = format!("{} {}", self.kind, self.index);
        let require = |value: Option<f64>, name: &'static str| {
            value.ok_or_else(|| ChainError::MissingParameter {
                element: element.clone(),
                name,
            })
        };
        let kind = match self.kind {
            MassTag::MassPoint => MassKind::MassPoint {
                mass: require(self.mass, "mass")?,
            },
            MassTag::RigidBlock => MassKind::RigidBlock {
                x_dim: require(self.x_dim, "x_dim")?,
                y_dim: require(self.y_dim, "y_dim")?,
                z_dim: require(self.z_dim, "z_dim")?,
                density: require(self.density, "density")?,
            },
        };
        Ok(Mass::new(self.index, kind)
            .with_external_force(self.external_force)
            .at(self.position, self.velocity))
    }
}

/// Contents of a chain file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub springs: Vec<SpringSpec>,
    pub masses: Vec<MassSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SimulationSettings>,
}

impl ChainConfig {
    pub fn from_json_str(text: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn build_chain(&self) -> Result<Chain, ChainError> {
        let mut builder = ChainBuilder::new();
        for spring in &self.springs {
            builder.push_spring(spring.to_spring());
        }
        for mass in &self.masses {
            builder.push_mass(mass.to_mass()?);
        }
        builder.build()
    }

    /// Settings from the file, or the defaults
    pub fn settings_or_default(&self) -> SimulationSettings {
        self.settings.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MASSES: &str = r#"{
        "springs": [
            { "index": 1, "rest_length": 0.5, "stiffness": 100.0 },
            { "index": 2, "rest_length": 0.4, "stiffness": 80.0, "behavior": "cubic" }
        ],
        "masses": [
            { "type": "masspoint", "index": 1, "mass": 2.0, "position": [0.0, -0.7] },
            { "type": "steady body", "index": 2, "x_dim": 0.2, "y_dim": 0.1, "z_dim": 0.2,
              "density": 500.0, "position": [0.0, -1.2], "external_force": 1.5 }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let config = ChainConfig::from_json_str(TWO_MASSES).unwrap();
        assert_eq!(config.springs[0].behavior, SpringBehavior::Linear);
        assert_eq!(config.springs[1].behavior, SpringBehavior::Cubic);
        assert!(config.settings.is_none());

        let chain = config.build_chain().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.masses()[1].tag(), MassTag::RigidBlock);
        assert_eq!(chain.masses()[1].external_force(), 1.5);
    }

    #[test]
    fn test_description_round_trip() {
        let config = ChainConfig::from_json_str(TWO_MASSES).unwrap();
        let chain = config.build_chain().unwrap();
        let text = chain.description(None).to_json_string().unwrap();
        let rebuilt = Chain::from_description(&ChainConfig::from_json_str(&text).unwrap()).unwrap();
        assert_eq!(rebuilt, chain);
    }

    #[test]
    fn test_unknown_mass_type_is_rejected() {
        let text = TWO_MASSES.replace("steady body", "balloon");
        let err = ChainConfig::from_json_str(&text).unwrap_err();
        assert!(err.to_string().contains("balloon"));
    }

    #[test]
    fn test_unknown_spring_behavior_is_rejected() {
        let text = TWO_MASSES.replace("cubic", "quadratic");
        assert!(ChainConfig::from_json_str(&text).is_err());
    }

    #[test]
    fn test_missing_block_dimension() {
        let text = TWO_MASSES.replace(r#""x_dim": 0.2,"#, "");
        let config = ChainConfig::from_json_str(&text).unwrap();
        let err = config.build_chain().unwrap_err();
        assert_eq!(
            err,
            ChainError::MissingParameter {
                element: "steady body 2".to_string(),
                name: "x_dim"
            }
        );
    }
}
