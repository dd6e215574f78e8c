//! Error types for chain assembly, parameter resolution, integration and persistence

use std::fmt;

use thiserror::Error;

use crate::integrator::Trajectory;

/// Errors raised while building a chain or registering masses, forces and constraints
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("chain has no springs or masses")]
    Empty,

    #[error("chain has {springs} springs but {masses} masses; every mass hangs from exactly one spring")]
    CountMismatch { springs: usize, masses: usize },

    #[error("{element} index {index} is used more than once")]
    DuplicateIndex { element: &'static str, index: usize },

    #[error("parameter '{name}' has invalid value {value}")]
    InvalidParameter { name: String, value: f64 },

    #[error("{element} is missing required parameter '{name}'")]
    MissingParameter { element: String, name: &'static str },

    #[error("unsupported mass type '{0}' (expected 'masspoint' or 'steady body')")]
    UnknownMassKind(String),

    #[error("unsupported spring behavior '{0}' (expected 'linear' or 'cubic')")]
    UnknownSpringBehavior(String),

    #[error("unsupported constraint type '{0}' (expected 'link')")]
    UnknownConstraintKind(String),

    #[error("mass name '{0}' has no trailing integer index")]
    InvalidMassName(String),

    #[error("mass '{0}' is already registered")]
    DuplicateMass(String),

    #[error("mass '{0}' is not registered")]
    UnknownMass(String),

    #[error("spring {spring} is not attached to mass {mass}")]
    DetachedSpring { spring: usize, mass: usize },

    #[error("sample {sample} is out of range for a trajectory of {len} samples")]
    SampleOutOfRange { sample: usize, len: usize },

    #[error("trajectory has {coordinates} coordinates but the chain has {masses} masses")]
    TrajectoryMismatch { coordinates: usize, masses: usize },

    #[error("invalid simulation settings: {0}")]
    InvalidSettings(String),
}

/// Errors raised when turning symbolic right-hand sides into numbers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("equation {equation} still contains parameter '{symbol}' after substitution")]
    UnresolvedSymbol { equation: usize, symbol: String },

    #[error("symbol '{symbol}' has no numeric value")]
    NonNumeric { symbol: String },

    #[error("{equations} equations need {expected} state symbols, got {found}")]
    StateMismatch {
        equations: usize,
        expected: usize,
        found: usize,
    },
}

/// Reason an integration run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationFailure {
    /// Step size fell below the configured minimum
    StepSizeUnderflow,
    /// State or derivative became NaN or infinite
    NonFinite,
    /// Implicit stage iteration did not converge at the minimum step size
    Convergence,
    /// Attempted more steps than allowed
    StepBudgetExhausted,
    /// Initial state length does not match the compiled system
    DimensionMismatch,
    /// Empty or reversed time span, or fewer than two samples
    InvalidTimeSpan,
    /// Step size bounds or tolerances that cannot drive the controller
    InvalidStepControl,
}

impl fmt::Display for IntegrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IntegrationFailure::StepSizeUnderflow => "step size fell below the minimum",
            IntegrationFailure::NonFinite => "state became non-finite",
            IntegrationFailure::Convergence => "implicit stage iteration did not converge",
            IntegrationFailure::StepBudgetExhausted => "step budget exhausted",
            IntegrationFailure::DimensionMismatch => "initial state has the wrong dimension",
            IntegrationFailure::InvalidTimeSpan => "time span is empty or has fewer than two samples",
            IntegrationFailure::InvalidStepControl => {
                "step size bounds or tolerances are not positive and ordered"
            }
        };
        f.write_str(text)
    }
}

/// Integration failure with the samples reached before it
#[derive(Error, Debug, Clone)]
#[error("integration failed at t = {time}: {kind}")]
pub struct IntegrationError {
    pub kind: IntegrationFailure,
    pub time: f64,
    pub partial: Box<Trajectory>,
}

/// Errors from saving or loading simulation results
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed simulation file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported simulation file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("trajectory histories do not match its {samples} sample times")]
    RaggedTrajectory { samples: usize },
}

/// Top-level error covering the full pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
