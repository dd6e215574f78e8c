//! The chain: springs and masses alternating downward from the origin
//!
//! Spring `j` (0-based) joins mass `j - 1` (or the origin for `j == 0`) to
//! mass `j`. Topology is fixed once [`ChainBuilder::build`] succeeds.

use std::collections::HashSet;

use super::mass::Mass;
use super::spring::Spring;
use crate::config::{ChainConfig, MassSpec, SpringSpec};
use crate::error::ChainError;
use crate::frame;
use crate::integrator::Trajectory;
use crate::settings::SimulationSettings;
use crate::symbolic::ParamValues;
use crate::utils::constants::GRAVITY_SYMBOL;

/// Collects springs and masses in hanging order, then validates them
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    springs: Vec<Spring>,
    masses: Vec<Mass>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spring(mut self, spring: Spring) -> Self {
        self.push_spring(spring);
        self
    }

    pub fn mass(mut self, mass: Mass) -> Self {
        self.push_mass(mass);
        self
    }

    pub fn push_spring(&mut self, spring: Spring) {
        self.springs.push(spring);
    }

    pub fn push_mass(&mut self, mass: Mass) {
        self.masses.push(mass);
    }

    /// Validate the element lists and bind every spring to its masses
    pub fn build(self) -> Result<Chain, ChainError> {
        let Self {
            mut springs,
            masses,
        } = self;

        if springs.is_empty() && masses.is_empty() {
            return Err(ChainError::Empty);
        }
        check_counts(&springs, &masses)?;
        check_unique("mass", masses.iter().map(Mass::index))?;
        check_unique("spring", springs.iter().map(Spring::index))?;
        for spring in &springs {
            spring.validate()?;
        }
        for mass in &masses {
            mass.validate()?;
        }

        for (j, spring) in springs.iter_mut().enumerate() {
            let top = j.checked_sub(1).map(|i| &masses[i]);
            spring.set_initial_conditions(top, &masses[j], [0.0, 0.0]);
        }

        ftlog::debug!(
            "built chain with {} masses ({} rigid blocks)",
            masses.len(),
            masses
                .iter()
                .filter(|m| m.tag() == super::MassTag::RigidBlock)
                .count()
        );
        Ok(Chain { springs, masses })
    }
}

pub(crate) fn check_counts(springs: &[Spring], masses: &[Mass]) -> Result<(), ChainError> {
    if springs.len() != masses.len() {
        return Err(ChainError::CountMismatch {
            springs: springs.len(),
            masses: masses.len(),
        });
    }
    Ok(())
}

fn check_unique(
    element: &'static str,
    indices: impl Iterator<Item = usize>,
) -> Result<(), ChainError> {
    let mut seen = HashSet::new();
    for index in indices {
        if !seen.insert(index) {
            return Err(ChainError::DuplicateIndex { element, index });
        }
    }
    Ok(())
}

/// A validated spring-mass chain
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    springs: Vec<Spring>,
    masses: Vec<Mass>,
}

impl Chain {
    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn masses(&self) -> &[Mass] {
        &self.masses
    }

    /// Number of spring-mass pairs
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Mass the spring at `position` hangs from, `None` for the first spring
    pub fn top_of(&self, position: usize) -> Option<&Mass> {
        position.checked_sub(1).and_then(|i| self.masses.get(i))
    }

    /// Every parameter value of the chain plus gravity
    pub fn param_values(&self, gravity: f64) -> ParamValues {
        let mut values = ParamValues::new();
        for spring in &self.springs {
            values.merge(&spring.param_values());
        }
        for mass in &self.masses {
            values.merge(&mass.param_values());
        }
        values.insert(GRAVITY_SYMBOL, gravity);
        values
    }

    /// Integration-frame state `[x1, y1, x2, y2, ..., vx1, vy1, ...]`
    pub fn initial_state(&self) -> Vec<f64> {
        let positions = self
            .masses
            .iter()
            .flat_map(|m| frame::presentation_to_state(m.position()));
        let velocities = self.masses.iter().flat_map(|m| m.velocity());
        positions.chain(velocities).collect()
    }

    /// Move every mass to the presentation-frame positions of `sample`,
    /// then let the springs follow
    pub fn apply_sample(&mut self, trajectory: &Trajectory, sample: usize) -> Result<(), ChainError> {
        if trajectory.coordinates() != 2 * self.masses.len() {
            return Err(ChainError::TrajectoryMismatch {
                coordinates: trajectory.coordinates(),
                masses: self.masses.len(),
            });
        }
        let positions = trajectory
            .presentation_positions(sample)
            .ok_or(ChainError::SampleOutOfRange {
                sample,
                len: trajectory.len(),
            })?;
        for (mass, [x, y]) in self.masses.iter_mut().zip(positions) {
            mass.move_to(x, y);
        }
        for (j, spring) in self.springs.iter_mut().enumerate() {
            let top = j.checked_sub(1).map(|i| &self.masses[i]);
            spring.move_between(top, &self.masses[j]);
        }
        Ok(())
    }

    /// Serializable description of the chain and its initial conditions
    pub fn description(&self, settings: Option<SimulationSettings>) -> ChainConfig {
        ChainConfig {
            springs: self.springs.iter().map(SpringSpec::from).collect(),
            masses: self.masses.iter().map(MassSpec::from).collect(),
            settings,
        }
    }

    /// Rebuild a chain from its description
    pub fn from_description(config: &ChainConfig) -> Result<Chain, ChainError> {
        config.build_chain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SpringBehavior;
    use approx::assert_relative_eq;

    fn two_mass_chain() -> Chain {
        ChainBuilder::new()
            .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
            .mass(Mass::point(1, 2.0).at([0.0, -0.7], [0.0, 0.1]))
            .spring(Spring::new(2, 0.4, 80.0, SpringBehavior::Cubic))
            .mass(Mass::block(2, 0.2, 0.1, 0.2, 500.0).at([0.0, -1.2], [0.0, 0.0]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_binds_geometry() {
        let chain = two_mass_chain();
        assert_eq!(chain.len(), 2);
        let second = &chain.springs()[1];
        assert_eq!(second.start(), chain.masses()[0].bottom_attachment());
        assert_eq!(second.end(), chain.masses()[1].top_attachment());
        assert_relative_eq!(second.length(), 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_build_rejects_empty_chain() {
        assert_eq!(ChainBuilder::new().build().unwrap_err(), ChainError::Empty);
    }

    #[test]
    fn test_build_rejects_count_mismatch() {
        let err = ChainBuilder::new()
            .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
            .spring(Spring::new(2, 0.5, 100.0, SpringBehavior::Linear))
            .mass(Mass::point(1, 2.0))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::CountMismatch {
                springs: 2,
                masses: 1
            }
        );
    }

    #[test]
    fn test_build_rejects_duplicate_index() {
        let err = ChainBuilder::new()
            .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
            .mass(Mass::point(1, 2.0))
            .spring(Spring::new(2, 0.5, 100.0, SpringBehavior::Linear))
            .mass(Mass::point(1, 2.0))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::DuplicateIndex {
                element: "mass",
                index: 1
            }
        );
    }

    #[test]
    fn test_param_values() {
        let values = two_mass_chain().param_values(9.81);
        assert_eq!(values.get("g"), Some(9.81));
        assert_eq!(values.get("k2"), Some(80.0));
        assert_eq!(values.get("l0_1"), Some(0.5));
        assert_relative_eq!(values.get("m2").unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(values.get("h2"), Some(0.1));
        assert_eq!(values.get("F1"), Some(0.0));
    }

    #[test]
    fn test_initial_state_flips_vertical_axis() {
        let z0 = two_mass_chain().initial_state();
        // positions flip, velocities are already integration-frame values
        assert_eq!(z0, vec![0.0, 0.7, 0.0, 1.2, 0.0, 0.1, 0.0, 0.0]);
    }

    #[test]
    fn test_initial_velocity_enters_state_unchanged() {
        let chain = ChainBuilder::new()
            .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
            .mass(Mass::point(1, 2.0).at([0.0, -0.6962], [0.0, 1.0]))
            .build()
            .unwrap();
        assert_eq!(chain.initial_state(), vec![0.0, 0.6962, 0.0, 1.0]);
    }

    #[test]
    fn test_apply_sample_moves_masses_and_springs() {
        let mut chain = two_mass_chain();
        let mut trajectory = Trajectory::new(4);
        trajectory.record(0.0, &chain.initial_state());
        trajectory.record(0.1, &[0.0, 0.8, 0.0, 1.4, 0.0, 0.0, 0.0, 0.0]);

        chain.apply_sample(&trajectory, 1).unwrap();
        assert_eq!(chain.masses()[0].position(), [0.0, -0.8]);
        assert_eq!(chain.masses()[1].position(), [0.0, -1.4]);
        assert_relative_eq!(chain.springs()[0].length(), 0.8, epsilon = 1e-12);
        assert_relative_eq!(chain.springs()[1].length(), 0.55, epsilon = 1e-12);

        let err = chain.apply_sample(&trajectory, 2).unwrap_err();
        assert_eq!(err, ChainError::SampleOutOfRange { sample: 2, len: 2 });
    }
}
