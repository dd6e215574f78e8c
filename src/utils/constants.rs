//! Simulation constants and defaults

/// Standard gravitational acceleration (m/s²)
pub const GRAVITY: f64 = 9.81;

/// Name of the gravitational acceleration parameter
pub const GRAVITY_SYMBOL: &str = "g";

/// Default simulation start time
pub const SIM_T_START: f64 = 0.0;

/// Default simulation end time
pub const SIM_T_END: f64 = 10.0;

/// Default number of trajectory samples
pub const SIM_NUM_POINTS: usize = 1001;

/// Initial timestep for adaptive solvers
pub const SIM_TIMESTEP: f64 = 1e-3;

/// Minimum timestep for adaptive solvers
pub const SIM_TIMESTEP_MIN: f64 = 1e-12;

/// Maximum timestep for adaptive solvers
pub const SIM_TIMESTEP_MAX: f64 = 0.1;

/// Upper bound on attempted steps per run
pub const SIM_STEPS_MAX: usize = 5_000_000;

/// Tolerance for fixed-point and Newton iteration convergence
pub const SIM_TOLERANCE_FPI: f64 = 1e-10;

/// Maximum iterations for implicit stage solves
pub const SIM_ITERATIONS_MAX: usize = 100;

/// Lower bound for error norms
pub const TOLERANCE: f64 = 1e-16;

/// Minimum scale factor for timestep adjustment
pub const SOL_SCALE_MIN: f64 = 0.1;

/// Maximum scale factor for timestep adjustment
pub const SOL_SCALE_MAX: f64 = 10.0;

/// Safety factor for adaptive error control
pub const SOL_BETA: f64 = 0.9;

/// Default absolute tolerance for local truncation error
pub const SOL_TOLERANCE_LTE_ABS: f64 = 1e-9;

/// Default relative tolerance for local truncation error
pub const SOL_TOLERANCE_LTE_REL: f64 = 1e-6;

/// Relative tolerance when matching spring endpoints to mass attachment points
pub const ATTACHMENT_TOLERANCE: f64 = 1e-9;
