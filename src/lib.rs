//! chainsim - Equation-of-motion assembly and simulation for mass-spring chains
//!
//! A vertical chain hangs from a fixed origin: spring 1, mass 1, spring 2,
//! mass 2, ... Masses are either point masses or rigid rectangular blocks,
//! springs are linear or cubic.
//!
//! # Pipeline
//!
//! - [`components`]: `Spring`, `Mass` and the `Chain` value object
//! - [`assembler`]: per-mass symbolic force sums derived from the chain topology
//! - [`mechanics`]: Newton's second law per coordinate, parameter substitution
//! - [`compile`]: resolved right-hand sides turned into numeric callables
//! - [`integrator`]: first-order reduction and adaptive time stepping
//!
//! [`simulation::Simulation`] runs the whole pipeline, [`persistence`] saves
//! and reloads results, [`presentation`] typesets the equations.
//!
//! # Example
//!
//! ```rust
//! use chainsim::prelude::*;
//!
//! let chain = ChainBuilder::new()
//!     .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
//!     .mass(Mass::point(1, 2.0).at([0.0, -0.6962], [0.0, 0.0]))
//!     .build()
//!     .unwrap();
//!
//! let settings = SimulationSettings {
//!     t_end: 1.0,
//!     num_points: 101,
//!     ..SimulationSettings::default()
//! };
//! let result = Simulation::new(chain, settings).run().unwrap();
//! assert_eq!(result.trajectory.len(), 101);
//! ```

pub mod assembler;
pub mod compile;
pub mod components;
pub mod config;
pub mod error;
pub mod frame;
pub mod integrator;
pub mod mechanics;
pub mod persistence;
pub mod presentation;
pub mod settings;
pub mod simulation;
pub mod solvers;
pub mod symbolic;
pub mod utils;

pub use assembler::{assemble, assemble_forces, MassForces};
pub use components::{Chain, ChainBuilder, Mass, MassKind, Spring, SpringBehavior};
pub use error::{ChainError, Error, IntegrationError, IntegrationFailure, ResolutionError};
pub use integrator::{integrate, Trajectory};
pub use mechanics::{Mechanics, SystemSnapshot};
pub use settings::{SimulationSettings, SolverKind};
pub use simulation::{build_mechanics, Simulation, SimulationResult};
pub use symbolic::{Axis, Equation, Expr, ParamValues, StateVar, Symbol};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::components::{Chain, ChainBuilder, Mass, MassKind, Spring, SpringBehavior};
    pub use crate::config::ChainConfig;
    pub use crate::error::{ChainError, Error, IntegrationError, ResolutionError};
    pub use crate::integrator::Trajectory;
    pub use crate::mechanics::Mechanics;
    pub use crate::settings::{SimulationSettings, SolverKind};
    pub use crate::simulation::{Simulation, SimulationResult};
    pub use crate::symbolic::{Axis, Equation, Expr, ParamValues, Symbol};
}
