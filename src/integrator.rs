//! First-order reduction and adaptive time stepping
//!
//! The compiled system gives one acceleration per coordinate. The state
//! `z = [q..., dq/dt...]` is advanced with `dz/dt = [dq/dt..., a(z)...]` and
//! sampled at evenly spaced output times; steps are shortened to land
//! exactly on every sample.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::compile::CompiledRhs;
use crate::error::{IntegrationError, IntegrationFailure};
use crate::frame;
use crate::settings::{SimulationSettings, SolverKind};
use crate::solvers::{
    EmbeddedRungeKutta, ExplicitSolver, ImplicitSolver, Solver, SolverError, SolverStepResult,
    DOPRI54, ESDIRK32, RKF45,
};
use crate::symbolic::Axis;
use crate::utils::linspace;

/// Sampled solution in the integration frame
///
/// `positions[c][s]` is coordinate `c` (`x1, y1, x2, y2, ...`) at sample `s`;
/// `velocities` has the same layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub positions: Vec<Vec<f64>>,
    pub velocities: Vec<Vec<f64>>,
    pub success: bool,
    pub message: String,
}

impl Trajectory {
    /// Empty trajectory over `coordinates` coordinates
    pub fn new(coordinates: usize) -> Self {
        Self {
            t: Vec::new(),
            positions: vec![Vec::new(); coordinates],
            velocities: vec![Vec::new(); coordinates],
            success: false,
            message: String::new(),
        }
    }

    /// Append the first-order state `[q..., dq/dt...]` at time `t`
    pub fn record(&mut self, t: f64, state: &[f64]) {
        let n = self.coordinates();
        debug_assert_eq!(state.len(), 2 * n);
        self.t.push(t);
        for (c, (q, v)) in self
            .positions
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .enumerate()
        {
            q.push(state[c]);
            v.push(state[n + c]);
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn coordinates(&self) -> usize {
        self.positions.len()
    }

    /// Position history of the `slot`-th mass (0-based) along `axis`
    pub fn position(&self, slot: usize, axis: Axis) -> Option<&[f64]> {
        self.positions.get(2 * slot + axis.offset()).map(Vec::as_slice)
    }

    pub fn velocity(&self, slot: usize, axis: Axis) -> Option<&[f64]> {
        self.velocities.get(2 * slot + axis.offset()).map(Vec::as_slice)
    }

    /// First-order state at `sample`
    pub fn sample_state(&self, sample: usize) -> Option<Vec<f64>> {
        if sample >= self.len() {
            return None;
        }
        self.positions
            .iter()
            .chain(&self.velocities)
            .map(|history| history.get(sample).copied())
            .collect()
    }

    /// Mass positions at `sample` in the presentation frame
    pub fn presentation_positions(&self, sample: usize) -> Option<Vec<[f64; 2]>> {
        if sample >= self.len() {
            return None;
        }
        self.positions
            .chunks(2)
            .map(|pair| {
                let x = pair.first()?.get(sample).copied()?;
                let y = match pair.get(1) {
                    Some(history) => history.get(sample).copied()?,
                    None => 0.0,
                };
                Some(frame::state_to_presentation([x, y]))
            })
            .collect()
    }

    /// Every coordinate history holds one value per sample time
    pub fn is_consistent(&self) -> bool {
        self.positions.len() == self.velocities.len()
            && self
                .positions
                .iter()
                .chain(&self.velocities)
                .all(|history| history.len() == self.t.len())
    }

    pub fn final_state(&self) -> Option<Vec<f64>> {
        self.len().checked_sub(1).and_then(|last| self.sample_state(last))
    }
}

enum Stepper {
    Explicit(EmbeddedRungeKutta),
    Implicit(ESDIRK32),
}

impl Stepper {
    fn new(kind: SolverKind, initial: DVector<f64>, settings: &SimulationSettings) -> Self {
        let (atol, rtol) = (settings.atol, settings.rtol);
        match kind {
            SolverKind::Dopri54 => Stepper::Explicit(EmbeddedRungeKutta::with_tolerances(
                &DOPRI54, initial, atol, rtol,
            )),
            SolverKind::Rkf45 => Stepper::Explicit(EmbeddedRungeKutta::with_tolerances(
                &RKF45, initial, atol, rtol,
            )),
            SolverKind::Esdirk32 => {
                Stepper::Implicit(ESDIRK32::with_tolerances(initial, atol, rtol))
            }
        }
    }

    fn solver(&self) -> &dyn Solver {
        match self {
            Stepper::Explicit(solver) => solver,
            Stepper::Implicit(solver) => solver,
        }
    }

    fn solver_mut(&mut self) -> &mut dyn Solver {
        match self {
            Stepper::Explicit(solver) => solver,
            Stepper::Implicit(solver) => solver,
        }
    }

    /// Run every stage of one step of size `dt`
    fn attempt<F, J>(
        &mut self,
        f: &F,
        jac: Option<&J>,
        dt: f64,
    ) -> Result<SolverStepResult, SolverError>
    where
        F: Fn(&DVector<f64>, f64) -> DVector<f64>,
        J: Fn(&DVector<f64>, f64) -> DMatrix<f64>,
    {
        self.solver_mut().buffer(dt);
        match self {
            Stepper::Explicit(solver) => {
                let mut result = SolverStepResult::default();
                for _ in 0..solver.stages() {
                    result = solver.step(f, dt)?;
                }
                Ok(result)
            }
            Stepper::Implicit(solver) => {
                for _ in 0..solver.stages() {
                    solver.solve(f, jac, dt)?;
                }
                solver.step(dt)
            }
        }
    }
}

fn abort(
    kind: IntegrationFailure,
    time: f64,
    mut partial: Trajectory,
) -> IntegrationError {
    partial.success = false;
    partial.message = format!("integration failed at t = {time}: {kind}");
    ftlog::warn!("{}", partial.message);
    IntegrationError {
        kind,
        time,
        partial: Box::new(partial),
    }
}

fn valid_step_control(settings: &SimulationSettings) -> bool {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    [
        settings.rtol,
        settings.atol,
        settings.dt_initial,
        settings.dt_min,
        settings.dt_max,
    ]
    .into_iter()
    .all(positive)
        && settings.dt_min <= settings.dt_max
}

/// Integrate the compiled system from `initial_state` over `t_span`,
/// sampling `num_points` evenly spaced times (both ends included)
///
/// `initial_state` is `[q..., dq/dt...]` in the integration frame. On
/// failure the error carries every sample reached before it.
pub fn integrate(
    compiled: &CompiledRhs,
    initial_state: &[f64],
    t_span: (f64, f64),
    num_points: usize,
    settings: &SimulationSettings,
) -> Result<Trajectory, IntegrationError> {
    let n = compiled.dimension();
    let (t0, t1) = t_span;
    let trajectory = Trajectory::new(n);

    if initial_state.len() != 2 * n {
        return Err(abort(IntegrationFailure::DimensionMismatch, t0, trajectory));
    }
    if !(t0.is_finite() && t1.is_finite()) || t1 <= t0 || num_points < 2 {
        return Err(abort(IntegrationFailure::InvalidTimeSpan, t0, trajectory));
    }
    if !valid_step_control(settings) {
        return Err(abort(IntegrationFailure::InvalidStepControl, t0, trajectory));
    }
    if initial_state.iter().any(|v| !v.is_finite()) {
        return Err(abort(IntegrationFailure::NonFinite, t0, trajectory));
    }

    let rhs = |z: &DVector<f64>, _t: f64| -> DVector<f64> {
        let mut dz = DVector::zeros(2 * n);
        dz.rows_mut(0, n).copy_from(&z.rows(n, n));
        compiled.accelerations(z.as_slice(), &mut dz.as_mut_slice()[n..]);
        dz
    };
    let jacobian = |z: &DVector<f64>, _t: f64| -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(2 * n, 2 * n);
        for i in 0..n {
            jac[(i, n + i)] = 1.0;
        }
        if let Some(partials) = compiled.jacobian(z.as_slice()) {
            jac.view_mut((n, 0), (n, 2 * n)).copy_from(&partials);
        }
        jac
    };
    let jac = compiled.has_jacobian().then_some(&jacobian);

    ftlog::info!(
        "integrating {} coordinates over [{}, {}] with {} ({} samples)",
        n,
        t0,
        t1,
        settings.solver,
        num_points
    );

    let mut trajectory = trajectory;
    trajectory.record(t0, initial_state);
    let mut stepper = Stepper::new(
        settings.solver,
        DVector::from_column_slice(initial_state),
        settings,
    );

    let (dt_min, dt_max) = (settings.dt_min, settings.dt_max);
    let mut dt = settings.dt_initial.clamp(dt_min, dt_max);
    let mut t = t0;
    let mut attempted = 0usize;
    let mut rejected = 0usize;

    for &target in &linspace(t0, t1, num_points)[1..] {
        let eps = 1e-12 * target.abs().max(1.0);
        while target - t > eps {
            if attempted >= settings.max_steps {
                return Err(abort(IntegrationFailure::StepBudgetExhausted, t, trajectory));
            }
            attempted += 1;

            let remaining = target - t;
            let lands = dt >= remaining - eps;
            let h = if lands { remaining } else { dt };

            match stepper.attempt(&rhs, jac, h) {
                Ok(result) => {
                    if stepper.solver().state().iter().any(|v| !v.is_finite()) {
                        return Err(abort(IntegrationFailure::NonFinite, t, trajectory));
                    }
                    let scale = result.scale.unwrap_or(1.0);
                    if result.success {
                        t = if lands { target } else { t + h };
                        let proposed = h * scale;
                        dt = if h < dt { dt.max(proposed) } else { proposed };
                        dt = dt.clamp(dt_min, dt_max);
                    } else {
                        rejected += 1;
                        if stepper.solver_mut().revert().is_err() {
                            return Err(abort(IntegrationFailure::Convergence, t, trajectory));
                        }
                        dt = h * scale;
                        ftlog::debug!(
                            "rejected step at t = {} (error norm {:.3e}), retrying with dt = {:.3e}",
                            t,
                            result.error_norm,
                            dt
                        );
                        if dt < dt_min {
                            return Err(abort(IntegrationFailure::StepSizeUnderflow, t, trajectory));
                        }
                    }
                }
                Err(SolverError::ConvergenceFailure(_) | SolverError::SingularMatrix) => {
                    rejected += 1;
                    if stepper.solver_mut().revert().is_err() {
                        return Err(abort(IntegrationFailure::Convergence, t, trajectory));
                    }
                    dt = 0.5 * h;
                    ftlog::debug!("stage iteration failed at t = {}, halving dt to {:.3e}", t, dt);
                    if dt < dt_min {
                        return Err(abort(IntegrationFailure::Convergence, t, trajectory));
                    }
                }
                Err(err) => {
                    ftlog::warn!("solver error at t = {}: {}", t, err);
                    return Err(abort(IntegrationFailure::Convergence, t, trajectory));
                }
            }
        }
        t = target;
        trajectory.record(target, stepper.solver().state().as_slice());
    }

    trajectory.success = true;
    trajectory.message = format!(
        "reached t = {} in {} steps ({} rejected)",
        t1,
        attempted - rejected,
        rejected
    );
    ftlog::info!("{}", trajectory.message);
    Ok(trajectory)
}
