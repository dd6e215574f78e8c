//! Base solver traits and types

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::utils::constants::{SOL_BETA, SOL_SCALE_MAX, SOL_SCALE_MIN, TOLERANCE};

/// Solver-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Solver did not converge after {0} iterations")]
    ConvergenceFailure(usize),

    #[error("Newton iteration matrix is singular")]
    SingularMatrix,

    #[error("History buffer is empty; call buffer() before stepping")]
    EmptyHistory,

    #[error("Invalid stage index: {stage} >= {max_stages}")]
    InvalidStage { stage: usize, max_stages: usize },
}

/// Result of a solver step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverStepResult {
    pub success: bool,
    pub error_norm: f64,
    /// Suggested timestep factor; only set once the final stage is done
    pub scale: Option<f64>,
}

impl Default for SolverStepResult {
    fn default() -> Self {
        Self {
            success: true,
            error_norm: 0.0,
            scale: None,
        }
    }
}

/// Scaled max-norm error control shared by the adaptive solvers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorController {
    pub tol_abs: f64,
    pub tol_rel: f64,
    pub beta: f64,
}

impl ErrorController {
    pub fn new(tol_abs: f64, tol_rel: f64) -> Self {
        Self {
            tol_abs,
            tol_rel,
            beta: SOL_BETA,
        }
    }

    /// Judge the local error `dt * error_slope` against `state`
    ///
    /// # Arguments
    /// * `order` - Lower of the propagating and embedded orders
    pub fn evaluate(
        &self,
        state: &DVector<f64>,
        error_slope: &DVector<f64>,
        dt: f64,
        order: usize,
    ) -> SolverStepResult {
        let error_norm = state
            .iter()
            .zip(error_slope.iter())
            .map(|(x, e)| (dt * e).abs() / (self.tol_abs + self.tol_rel * x.abs()))
            .fold(TOLERANCE, f64::max);

        let scale = (self.beta / error_norm.powf(1.0 / (order as f64 + 1.0)))
            .clamp(SOL_SCALE_MIN, SOL_SCALE_MAX);

        SolverStepResult {
            success: error_norm <= 1.0,
            error_norm,
            scale: Some(scale),
        }
    }
}

/// Core solver trait for numerical integration
pub trait Solver: Send + Sync {
    /// Get current state vector
    fn state(&self) -> &DVector<f64>;

    /// Set state vector
    fn set_state(&mut self, state: DVector<f64>);

    /// Buffer current state for potential reversion
    fn buffer(&mut self, dt: f64);

    /// Revert to buffered state
    fn revert(&mut self) -> Result<(), SolverError>;

    /// Reset solver to initial state
    fn reset(&mut self);

    /// Order of the method
    fn order(&self) -> usize;

    /// Number of stages
    fn stages(&self) -> usize;

    /// Is this an explicit solver?
    fn is_explicit(&self) -> bool;
}

/// Explicit solver trait
pub trait ExplicitSolver: Solver {
    /// Advance one stage; the result of the last stage carries the error estimate
    fn step<F>(&mut self, f: F, dt: f64) -> Result<SolverStepResult, SolverError>
    where
        F: FnMut(&DVector<f64>, f64) -> DVector<f64>;
}

/// Implicit solver trait
pub trait ImplicitSolver: Solver {
    /// Solve the implicit equation of the current stage, returning the
    /// final residual
    fn solve<F, J>(&mut self, f: F, jac: Option<J>, dt: f64) -> Result<f64, SolverError>
    where
        F: FnMut(&DVector<f64>, f64) -> DVector<f64>,
        J: FnMut(&DVector<f64>, f64) -> DMatrix<f64>;

    /// Finalize the timestep and compute error estimate
    fn step(&mut self, dt: f64) -> Result<SolverStepResult, SolverError>;
}
