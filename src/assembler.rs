//! Force assembly
//!
//! Every mass feels gravity and its external load along +y (integration
//! frame). A spring hanging below a mass pulls it down by the spring force;
//! the spring it hangs from pulls it up by the same expression. Spring `j`
//! joins mass `j - 1` (the origin for `j == 0`) to mass `j`, and the bound
//! geometry of each spring is checked against that topology.

use serde::{Deserialize, Serialize};

use crate::components::{check_counts, Chain, Mass, Spring};
use crate::error::ChainError;
use crate::symbolic::{Axis, Expr};
use crate::utils::points_match;

/// Force terms acting on one mass, per axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassForces {
    pub mass_name: String,
    pub x: Vec<Expr>,
    pub y: Vec<Expr>,
}

impl MassForces {
    pub fn new(mass_name: impl Into<String>) -> Self {
        Self {
            mass_name: mass_name.into(),
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn push(&mut self, axis: Axis, term: Expr) {
        match axis {
            Axis::X => self.x.push(term),
            Axis::Y => self.y.push(term),
        }
    }

    pub fn terms(&self, axis: Axis) -> &[Expr] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    pub fn sum(&self, axis: Axis) -> Expr {
        self.terms(axis).iter().cloned().sum()
    }
}

/// Force sums for every mass of a validated chain
pub fn assemble_forces(chain: &Chain) -> Result<Vec<MassForces>, ChainError> {
    assemble(chain.springs(), chain.masses())
}

/// Force sums for springs and masses listed top to bottom
pub fn assemble(springs: &[Spring], masses: &[Mass]) -> Result<Vec<MassForces>, ChainError> {
    check_counts(springs, masses)?;

    let mut assembled = Vec::with_capacity(masses.len());
    for (i, mass) in masses.iter().enumerate() {
        let mut forces = MassForces::new(mass.name());
        forces.push(Axis::Y, mass.gravity_force());
        forces.push(Axis::Y, mass.external_force_symbol());

        for (j, spring) in springs.iter().enumerate() {
            let top = j.checked_sub(1).map(|t| &masses[t]);
            if j == i + 1 {
                if !points_match(spring.start(), mass.bottom_attachment()) {
                    return Err(detached(spring, mass));
                }
                let (fx, fy) = spring.force(top, &masses[j]);
                forces.push(Axis::X, fx);
                forces.push(Axis::Y, fy);
            } else if j == i {
                if !points_match(spring.end(), mass.top_attachment()) {
                    return Err(detached(spring, mass));
                }
                let (fx, fy) = spring.force(top, mass);
                forces.push(Axis::X, -fx);
                forces.push(Axis::Y, -fy);
            }
        }

        ftlog::debug!(
            "{}: {} x terms, {} y terms",
            forces.mass_name,
            forces.x.len(),
            forces.y.len()
        );
        assembled.push(forces);
    }
    Ok(assembled)
}

fn detached(spring: &Spring, mass: &Mass) -> ChainError {
    ChainError::DetachedSpring {
        spring: spring.index(),
        mass: mass.index(),
    }
}
