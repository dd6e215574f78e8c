//! Simulation settings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::utils::constants::{
    GRAVITY, SIM_NUM_POINTS, SIM_STEPS_MAX, SIM_TIMESTEP, SIM_TIMESTEP_MAX, SIM_TIMESTEP_MIN,
    SIM_T_END, SIM_T_START, SOL_TOLERANCE_LTE_ABS, SOL_TOLERANCE_LTE_REL,
};

/// Available ODE solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Dormand-Prince 5(4)
    #[default]
    Dopri54,
    /// Runge-Kutta-Fehlberg 4(5)
    Rkf45,
    /// ESDIRK 3(2), for stiff chains
    Esdirk32,
}

impl SolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Dopri54 => "DOPRI54",
            SolverKind::Rkf45 => "RKF45",
            SolverKind::Esdirk32 => "ESDIRK32",
        }
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, SolverKind::Esdirk32)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dopri54" | "rk45" => Ok(SolverKind::Dopri54),
            "rkf45" => Ok(SolverKind::Rkf45),
            "esdirk32" => Ok(SolverKind::Esdirk32),
            other => Err(ChainError::InvalidSettings(format!(
                "unknown solver '{other}' (expected dopri54, rkf45 or esdirk32)"
            ))),
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Start of the integration window
    pub t_start: f64,

    /// End of the integration window
    pub t_end: f64,

    /// Number of evenly spaced output samples, both ends included
    pub num_points: usize,

    /// Gravitational acceleration bound to `g`
    pub gravity: f64,

    /// ODE solver
    pub solver: SolverKind,

    /// Relative tolerance for adaptive stepping
    pub rtol: f64,

    /// Absolute tolerance for adaptive stepping
    pub atol: f64,

    /// First attempted time step
    pub dt_initial: f64,

    /// Minimum time step
    pub dt_min: f64,

    /// Maximum time step
    pub dt_max: f64,

    /// Attempted steps allowed per run
    pub max_steps: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            t_start: SIM_T_START,
            t_end: SIM_T_END,
            num_points: SIM_NUM_POINTS,
            gravity: GRAVITY,
            solver: SolverKind::default(),
            rtol: SOL_TOLERANCE_LTE_REL,
            atol: SOL_TOLERANCE_LTE_ABS,
            dt_initial: SIM_TIMESTEP,
            dt_min: SIM_TIMESTEP_MIN,
            dt_max: SIM_TIMESTEP_MAX,
            max_steps: SIM_STEPS_MAX,
        }
    }
}

impl SimulationSettings {
    pub fn t_span(&self) -> (f64, f64) {
        (self.t_start, self.t_end)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        let invalid = |message: String| Err(ChainError::InvalidSettings(message));

        if !(self.t_start.is_finite() && self.t_end.is_finite()) || self.t_end <= self.t_start {
            return invalid(format!(
                "time span [{}, {}] is empty or not finite",
                self.t_start, self.t_end
            ));
        }
        if self.num_points < 2 {
            return invalid(format!("need at least 2 samples, got {}", self.num_points));
        }
        if !self.gravity.is_finite() {
            return invalid(format!("gravity must be finite, got {}", self.gravity));
        }
        for (name, value) in [
            ("rtol", self.rtol),
            ("atol", self.atol),
            ("dt_initial", self.dt_initial),
            ("dt_min", self.dt_min),
            ("dt_max", self.dt_max),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        if self.dt_min > self.dt_max {
            return invalid(format!(
                "dt_min {} exceeds dt_max {}",
                self.dt_min, self.dt_max
            ));
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SimulationSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.solver, SolverKind::Dopri54);
        assert_eq!(settings.rtol, 1e-6);
        assert_eq!(settings.t_span(), (0.0, 10.0));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let reversed = SimulationSettings {
            t_end: -1.0,
            ..SimulationSettings::default()
        };
        assert!(reversed.validate().is_err());

        let single = SimulationSettings {
            num_points: 1,
            ..SimulationSettings::default()
        };
        assert!(single.validate().is_err());

        let zero_tol = SimulationSettings {
            atol: 0.0,
            ..SimulationSettings::default()
        };
        assert!(matches!(
            zero_tol.validate(),
            Err(ChainError::InvalidSettings(message)) if message.contains("atol")
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: SimulationSettings =
            serde_json::from_str(r#"{ "t_end": 2.5, "solver": "Esdirk32" }"#).unwrap();
        assert_eq!(settings.t_end, 2.5);
        assert_eq!(settings.solver, SolverKind::Esdirk32);
        assert_eq!(settings.num_points, 1001);
    }

    #[test]
    fn test_solver_from_str() {
        assert_eq!("DOPRI54".parse::<SolverKind>(), Ok(SolverKind::Dopri54));
        assert_eq!("esdirk32".parse::<SolverKind>(), Ok(SolverKind::Esdirk32));
        assert!("euler".parse::<SolverKind>().is_err());
    }
}
