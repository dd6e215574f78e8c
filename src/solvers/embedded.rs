//! Explicit embedded Runge-Kutta pairs
//!
//! One solver drives any explicit tableau with an embedded error estimate.
//! Each call to [`ExplicitSolver::step`] evaluates one stage; the last stage
//! propagates the solution and reports the error estimate.

use nalgebra::DVector;
use std::collections::VecDeque;

use super::{ErrorController, ExplicitSolver, Solver, SolverError, SolverStepResult};
use crate::utils::constants::{SOL_TOLERANCE_LTE_ABS, SOL_TOLERANCE_LTE_REL};

/// Butcher tableau of an explicit embedded pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButcherTableau {
    pub name: &'static str,
    /// Evaluation times, one per stage
    pub c: &'static [f64],
    /// Row `s` builds the input of stage `s + 1`
    pub a: &'static [&'static [f64]],
    /// Propagating weights
    pub b: &'static [f64],
    /// Propagating minus embedded weights
    pub error: &'static [f64],
    pub order: usize,
    pub embedded_order: usize,
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.c.len()
    }
}

/// Dormand-Prince 5(4)
///
/// Seven-stage, 5th order method with embedded 4th order error estimate.
/// The basis of MATLAB's `ode45`. FSAL is not exploited.
///
/// # References
/// - Dormand, J. R., & Prince, P. J. (1980). "A family of embedded
///   Runge-Kutta formulae". Journal of Computational and Applied
///   Mathematics, 6(1), 19-26.
#[rustfmt::skip]
pub const DOPRI54: ButcherTableau = ButcherTableau {
    name: "DOPRI54",
    c: &[0.0, 1.0/5.0, 3.0/10.0, 4.0/5.0, 8.0/9.0, 1.0, 1.0],
    a: &[
        &[1.0/5.0],
        &[3.0/40.0, 9.0/40.0],
        &[44.0/45.0, -56.0/15.0, 32.0/9.0],
        &[19372.0/6561.0, -25360.0/2187.0, 64448.0/6561.0, -212.0/729.0],
        &[9017.0/3168.0, -355.0/33.0, 46732.0/5247.0, 49.0/176.0, -5103.0/18656.0],
        &[35.0/384.0, 0.0, 500.0/1113.0, 125.0/192.0, -2187.0/6784.0, 11.0/84.0],
    ],
    b: &[35.0/384.0, 0.0, 500.0/1113.0, 125.0/192.0, -2187.0/6784.0, 11.0/84.0, 0.0],
    error: &[71.0/57600.0, 0.0, -71.0/16695.0, 71.0/1920.0, -17253.0/339200.0, 22.0/525.0, -1.0/40.0],
    order: 5,
    embedded_order: 4,
};

/// Runge-Kutta-Fehlberg 4(5)
///
/// Six-stage pair; the 5th order solution is propagated.
///
/// # References
/// - Fehlberg, E. (1969). "Low-order classical Runge-Kutta formulas with
///   stepsize control and their application to some heat transfer
///   problems". NASA Technical Report R-315.
#[rustfmt::skip]
pub const RKF45: ButcherTableau = ButcherTableau {
    name: "RKF45",
    c: &[0.0, 1.0/4.0, 3.0/8.0, 12.0/13.0, 1.0, 1.0/2.0],
    a: &[
        &[1.0/4.0],
        &[3.0/32.0, 9.0/32.0],
        &[1932.0/2197.0, -7200.0/2197.0, 7296.0/2197.0],
        &[439.0/216.0, -8.0, 3680.0/513.0, -845.0/4104.0],
        &[-8.0/27.0, 2.0, -3544.0/2565.0, 1859.0/4104.0, -11.0/40.0],
    ],
    b: &[16.0/135.0, 0.0, 6656.0/12825.0, 28561.0/56430.0, -9.0/50.0, 2.0/55.0],
    error: &[1.0/360.0, 0.0, -128.0/4275.0, -2197.0/75240.0, 1.0/50.0, 2.0/55.0],
    order: 5,
    embedded_order: 4,
};

/// Adaptive explicit solver over an embedded tableau
#[derive(Debug, Clone)]
pub struct EmbeddedRungeKutta {
    tableau: &'static ButcherTableau,
    state: DVector<f64>,
    initial: DVector<f64>,
    history: VecDeque<DVector<f64>>,
    slopes: Vec<DVector<f64>>,
    stage: usize,
    controller: ErrorController,
}

impl EmbeddedRungeKutta {
    /// Create a solver with the default tolerances
    pub fn new(tableau: &'static ButcherTableau, initial: DVector<f64>) -> Self {
        Self::with_tolerances(tableau, initial, SOL_TOLERANCE_LTE_ABS, SOL_TOLERANCE_LTE_REL)
    }

    /// Create a solver with custom tolerances
    ///
    /// # Arguments
    /// * `tableau` - Coefficients of the embedded pair
    /// * `initial` - Initial state vector
    /// * `tol_abs` - Absolute error tolerance
    /// * `tol_rel` - Relative error tolerance
    pub fn with_tolerances(
        tableau: &'static ButcherTableau,
        initial: DVector<f64>,
        tol_abs: f64,
        tol_rel: f64,
    ) -> Self {
        let n = initial.len();
        Self {
            tableau,
            state: initial.clone(),
            initial,
            history: VecDeque::with_capacity(2),
            slopes: vec![DVector::zeros(n); tableau.stages()],
            stage: 0,
            controller: ErrorController::new(tol_abs, tol_rel),
        }
    }

    pub fn tableau(&self) -> &'static ButcherTableau {
        self.tableau
    }

    fn weighted_slopes(&self, weights: &[f64]) -> DVector<f64> {
        let mut sum = DVector::zeros(self.state.len());
        for (coef, slope) in weights.iter().zip(&self.slopes) {
            if *coef != 0.0 {
                sum.axpy(*coef, slope, 1.0);
            }
        }
        sum
    }
}

impl Solver for EmbeddedRungeKutta {
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
        self.tableau.order
    }

    fn stages(&self) -> usize {
        self.tableau.stages()
    }

    fn is_explicit(&self) -> bool {
        true
    }
}

impl ExplicitSolver for EmbeddedRungeKutta {
    fn step<F>(&mut self, mut f: F, dt: f64) -> Result<SolverStepResult, SolverError>
    where
        F: FnMut(&DVector<f64>, f64) -> DVector<f64>,
    {
        let stages = self.tableau.stages();
        if self.stage >= stages {
            return Err(SolverError::InvalidStage {
                stage: self.stage,
                max_stages: stages,
            });
        }
        let x0 = self.history.front().ok_or(SolverError::EmptyHistory)?.clone();

        self.slopes[self.stage] = f(&self.state, self.tableau.c[self.stage] * dt);

        if self.stage + 1 < stages {
            let increment = self.weighted_slopes(self.tableau.a[self.stage]);
            self.state = x0 + increment * dt;
            self.stage += 1;
            return Ok(SolverStepResult::default());
        }

        let increment = self.weighted_slopes(self.tableau.b);
        let error_slope = self.weighted_slopes(self.tableau.error);
        self.state = x0 + increment * dt;
        self.stage = 0;

        let order = self.tableau.order.min(self.tableau.embedded_order);
        Ok(self.controller.evaluate(&self.state, &error_slope, dt, order))
    }
}
