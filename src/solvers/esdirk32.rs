//! ESDIRK32 - Four-stage, 3rd order ESDIRK with embedded 2nd order error estimate
//!
//! L-stable and stiffly accurate implicit Runge-Kutta method, for chains with
//! very stiff springs next to soft ones.

use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

use super::{ErrorController, ImplicitSolver, Solver, SolverError, SolverStepResult};
use crate::utils::constants::{
    SIM_ITERATIONS_MAX, SIM_TOLERANCE_FPI, SOL_TOLERANCE_LTE_ABS, SOL_TOLERANCE_LTE_REL,
};

const STAGES: usize = 4;

/// Evaluation times
const C: [f64; STAGES] = [0.0, 1.0, 3.0 / 2.0, 1.0];

/// Diagonal entry
const GAMMA: f64 = 1.0 / 2.0;

/// Strictly lower triangular part of the tableau
const A: [&[f64]; STAGES] = [
    &[],
    &[1.0 / 2.0],
    &[5.0 / 8.0, 3.0 / 8.0],
    &[7.0 / 18.0, 1.0 / 3.0, -2.0 / 9.0],
];

/// Truncation error weights
const TR: [f64; STAGES] = [-1.0 / 9.0, -1.0 / 6.0, -2.0 / 9.0, 1.0 / 2.0];

/// ESDIRK32 - Four-stage, 3(2) embedded ESDIRK method
///
/// # Characteristics
/// - Order: 3 (propagating) / 2 (embedded)
/// - Stages: 4 (1 explicit, 3 implicit)
/// - Adaptive timestep
/// - L-stable, stiffly accurate
///
/// Implicit stages use Newton iteration when a Jacobian is supplied and
/// fall back to fixed-point iteration otherwise.
///
/// # References
/// - Kennedy, C. A., & Carpenter, M. H. (2019). "Diagonally implicit
///   Runge-Kutta methods for stiff ODEs". Applied Numerical
///   Mathematics, 146, 221-244.
#[derive(Debug, Clone)]
pub struct ESDIRK32 {
    state: DVector<f64>,
    initial: DVector<f64>,
    history: VecDeque<DVector<f64>>,
    slopes: Vec<DVector<f64>>,
    stage: usize,
    controller: ErrorController,
    max_iterations: usize,
    tolerance: f64,
}

impl ESDIRK32 {
    /// Create a new ESDIRK32 solver with the given initial state
    pub fn new(initial: DVector<f64>) -> Self {
        Self::with_tolerances(initial, SOL_TOLERANCE_LTE_ABS, SOL_TOLERANCE_LTE_REL)
    }

    /// Create a new ESDIRK32 solver with custom tolerances
    pub fn with_tolerances(initial: DVector<f64>, tol_abs: f64, tol_rel: f64) -> Self {
        let n = initial.len();
        Self {
            state: initial.clone(),
            initial,
            history: VecDeque::with_capacity(2),
            slopes: vec![DVector::zeros(n); STAGES],
            stage: 0,
            controller: ErrorController::new(tol_abs, tol_rel),
            max_iterations: SIM_ITERATIONS_MAX,
            tolerance: SIM_TOLERANCE_FPI,
        }
    }

    /// Set maximum iterations per implicit stage
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn newton<F, J>(
        &mut self,
        f: &mut F,
        jac: &mut J,
        anchor: &DVector<f64>,
        t: f64,
        dt: f64,
    ) -> Result<f64, SolverError>
    where
        F: FnMut(&DVector<f64>, f64) -> DVector<f64>,
        J: FnMut(&DVector<f64>, f64) -> DMatrix<f64>,
    {
        let n = self.state.len();
        for _ in 0..self.max_iterations {
            let slope = f(&self.state, t);
            let residual = &self.state - anchor - &slope * (dt * GAMMA);
            let norm = residual.norm();
            if norm < self.tolerance {
                self.slopes[self.stage] = slope;
                return Ok(norm);
            }
            let iteration = DMatrix::identity(n, n) - jac(&self.state, t) * (dt * GAMMA);
            let delta = iteration
                .lu()
                .solve(&residual)
                .ok_or(SolverError::SingularMatrix)?;
            self.state -= delta;
        }
        Err(SolverError::ConvergenceFailure(self.max_iterations))
    }

    fn fixed_point<F>(
        &mut self,
        f: &mut F,
        anchor: &DVector<f64>,
        t: f64,
        dt: f64,
    ) -> Result<f64, SolverError>
    where
        F: FnMut(&DVector<f64>, f64) -> DVector<f64>,
    {
        for _ in 0..self.max_iterations {
            let slope = f(&self.state, t);
            let next = anchor + slope * (dt * GAMMA);
            let norm = (&next - &self.state).norm();
            self.state = next;
            if norm < self.tolerance {
                self.slopes[self.stage] = f(&self.state, t);
                return Ok(norm);
            }
        }
        Err(SolverError::ConvergenceFailure(self.max_iterations))
    }
}

impl Solver for ESDIRK32 {
    fn state(&self) -> &DVector<f64> {
        &self.state
    }

    fn set_state(&mut self, state: DVector<f64>) {
        self.state = state;
    }

    fn buffer(&mut self, _dt: f64) {
        if self.history.len() >= 2 {
            self.history.pop_back();
        }
        self.history.push_front(self.state.clone());
        self.stage = 0;
    }

    fn revert(&mut self) -> Result<(), SolverError> {
        self.state = self.history.pop_front().ok_or(SolverError::EmptyHistory)?;
        self.stage = 0;
        Ok(())
    }

    fn reset(&mut self) {
        self.state = self.initial.clone();
        self.history.clear();
        self.stage = 0;
    }

    fn order(&self) -> usize {
        3
    }

    fn stages(&self) -> usize {
        STAGES
    }

    fn is_explicit(&self) -> bool {
        false
    }
}

impl ImplicitSolver for ESDIRK32 {
    fn solve<F, J>(&mut self, mut f: F, jac: Option<J>, dt: f64) -> Result<f64, SolverError>
    where
        F: FnMut(&DVector<f64>, f64) -> DVector<f64>,
        J: FnMut(&DVector<f64>, f64) -> DMatrix<f64>,
    {
        if self.stage >= STAGES {
            return Err(SolverError::InvalidStage {
                stage: self.stage,
                max_stages: STAGES,
            });
        }
        let x0 = self.history.front().ok_or(SolverError::EmptyHistory)?.clone();
        let t = C[self.stage] * dt;

        // first stage is explicit
        if self.stage == 0 {
            self.slopes[0] = f(&x0, t);
            self.state = x0;
            self.stage += 1;
            return Ok(0.0);
        }

        let mut anchor = x0;
        for (coef, slope) in A[self.stage].iter().zip(&self.slopes) {
            anchor.axpy(dt * coef, slope, 1.0);
        }

        let residual = match jac {
            Some(mut jac) => self.newton(&mut f, &mut jac, &anchor, t, dt)?,
            None => self.fixed_point(&mut f, &anchor, t, dt)?,
        };
        self.stage += 1;
        Ok(residual)
    }

    fn step(&mut self, dt: f64) -> Result<SolverStepResult, SolverError> {
        if self.stage < STAGES {
            return Ok(SolverStepResult::default());
        }
        let mut error_slope = DVector::zeros(self.state.len());
        for (coef, slope) in TR.iter().zip(&self.slopes) {
            error_slope.axpy(*coef, slope, 1.0);
        }
        self.stage = 0;
        Ok(self.controller.evaluate(&self.state, &error_slope, dt, 2))
    }
}
