//! Saving and reloading simulation results
//!
//! A saved simulation is a versioned JSON document holding the trajectory,
//! the symbolic system, the chain description and the settings. Reloading
//! rebuilds an equivalent [`Mechanics`] straight from the stored symbolic
//! state, without assembling forces again.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::Chain;
use crate::error::{ChainError, Error, PersistenceError};
use crate::mechanics::Mechanics;
use crate::simulation::SimulationResult;

/// Version written by [`save`]; [`load`] refuses anything else
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSimulation {
    pub version: u32,
    pub result: SimulationResult,
}

impl SavedSimulation {
    pub fn new(result: SimulationResult) -> Self {
        Self {
            version: FORMAT_VERSION,
            result,
        }
    }

    pub fn mechanics(&self) -> Result<Mechanics, ChainError> {
        Mechanics::from_snapshot(&self.result.system)
    }

    /// The chain, positioned at the first trajectory sample
    pub fn chain(&self) -> Result<Chain, ChainError> {
        let mut chain = self.result.chain.build_chain()?;
        if !self.result.trajectory.is_empty() {
            chain.apply_sample(&self.result.trajectory, 0)?;
        }
        Ok(chain)
    }

    /// Integration-frame state of the first sample
    pub fn initial_state(&self) -> Option<Vec<f64>> {
        self.result.trajectory.sample_state(0)
    }

    /// Integrate the stored system again from its first sample
    pub fn rerun(&self) -> Result<SimulationResult, Error> {
        let initial_state = self
            .initial_state()
            .ok_or(ChainError::SampleOutOfRange { sample: 0, len: 0 })?;
        let settings = &self.result.settings;
        let trajectory = self.mechanics()?.simulate(
            &initial_state,
            settings.t_span(),
            settings.num_points,
            settings,
        )?;
        Ok(SimulationResult {
            trajectory,
            ..self.result.clone()
        })
    }
}

pub fn to_json(result: &SimulationResult) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(&SavedSimulation::new(result.clone()))?)
}

pub fn from_json(text: &str) -> Result<SavedSimulation, PersistenceError> {
    let saved: SavedSimulation = serde_json::from_str(text)?;
    if saved.version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: saved.version,
            expected: FORMAT_VERSION,
        });
    }
    let trajectory = &saved.result.trajectory;
    if !trajectory.is_consistent() {
        return Err(PersistenceError::RaggedTrajectory {
            samples: trajectory.len(),
        });
    }
    Ok(saved)
}

pub fn save(path: impl AsRef<Path>, result: &SimulationResult) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    fs::write(path, to_json(result)?)?;
    ftlog::info!(
        "saved {} samples to {}",
        result.trajectory.len(),
        path.display()
    );
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<SavedSimulation, PersistenceError> {
    let path = path.as_ref();
    let saved = from_json(&fs::read_to_string(path)?)?;
    ftlog::debug!(
        "loaded {} samples from {}",
        saved.result.trajectory.len(),
        path.display()
    );
    Ok(saved)
}
