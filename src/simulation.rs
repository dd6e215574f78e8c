//! Pipeline facade: chain, forces, equations, trajectory

use serde::{Deserialize, Serialize};

use crate::assembler::assemble_forces;
use crate::components::Chain;
use crate::config::ChainConfig;
use crate::error::{ChainError, Error};
use crate::integrator::Trajectory;
use crate::mechanics::{Mechanics, SystemSnapshot};
use crate::presentation;
use crate::settings::SimulationSettings;
use crate::symbolic::{Axis, Equation};

/// Register every mass of `chain`, add its assembled force sums and bind
/// the chain's parameter values with gravity `gravity`
pub fn build_mechanics(chain: &Chain, gravity: f64) -> Result<Mechanics, ChainError> {
    let mut mechanics = Mechanics::new();
    for mass in chain.masses() {
        mechanics.add_mass(&mass.name(), mass.mass_symbol())?;
    }
    for forces in assemble_forces(chain)? {
        for axis in Axis::ALL {
            mechanics.add_force(&forces.mass_name, (forces.sum(axis), axis))?;
        }
    }
    mechanics.set_param_values(chain.param_values(gravity));
    Ok(mechanics)
}

/// Everything produced by one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trajectory: Trajectory,
    pub system: SystemSnapshot,
    pub chain: ChainConfig,
    pub settings: SimulationSettings,
}

/// A chain together with the settings to simulate it with
#[derive(Debug, Clone)]
pub struct Simulation {
    chain: Chain,
    settings: SimulationSettings,
}

impl Simulation {
    pub fn new(chain: Chain, settings: SimulationSettings) -> Self {
        Self { chain, settings }
    }

    /// Build the chain of a chain file, using its settings or the defaults
    pub fn from_config(config: &ChainConfig) -> Result<Self, ChainError> {
        Ok(Self::new(config.build_chain()?, config.settings_or_default()))
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SimulationSettings {
        &mut self.settings
    }

    pub fn mechanics(&self) -> Result<Mechanics, ChainError> {
        build_mechanics(&self.chain, self.settings.gravity)
    }

    /// Equations of motion with every parameter substituted
    pub fn equations(&self) -> Result<Vec<Equation>, Error> {
        Ok(self.mechanics()?.resolved_equations()?)
    }

    pub fn latex(&self) -> Result<String, Error> {
        Ok(presentation::latex_equations(&self.mechanics()?)?)
    }

    /// Integrate from the chain's own initial conditions
    pub fn run(&self) -> Result<SimulationResult, Error> {
        self.run_from(&self.chain.initial_state())
    }

    /// Integrate from an integration-frame state `[q..., dq/dt...]`
    pub fn run_from(&self, initial_state: &[f64]) -> Result<SimulationResult, Error> {
        self.settings.validate()?;
        let mechanics = self.mechanics()?;
        let trajectory = mechanics.simulate(
            initial_state,
            self.settings.t_span(),
            self.settings.num_points,
            &self.settings,
        )?;
        Ok(SimulationResult {
            trajectory,
            system: mechanics.snapshot(),
            chain: self.chain.description(None),
            settings: self.settings.clone(),
        })
    }
}
