//! Equation generation and parameter resolution
//!
//! [`Mechanics`] registers masses, collects the forces acting on them and
//! writes Newton's second law per coordinate in explicit acceleration form,
//! `d²q/dt² = ΣF / m`. Equations stay symbolic until
//! [`Mechanics::substitute_parameters`] binds numbers to the parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compile::CompiledRhs;
use crate::error::{ChainError, Error, ResolutionError};
use crate::integrator::{integrate, Trajectory};
use crate::settings::SimulationSettings;
use crate::symbolic::{Axis, Equation, Expr, ParamValues, StateVar, Symbol};

/// An `[x, y]` pair of expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub x: Expr,
    pub y: Expr,
}

impl Pair {
    pub fn get(&self, axis: Axis) -> &Expr {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

/// A force contribution along one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceTerm {
    pub expr: Expr,
    pub axis: Axis,
}

/// Everything recorded for one registered mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassEntry {
    pub name: String,
    pub index: usize,
    pub mass: Expr,
    pub coordinates: Pair,
    pub velocities: Pair,
    pub accelerations: Pair,
    pub forces: Vec<ForceTerm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    /// Fixed distance between two masses, or between a mass and the origin
    Link,
}

impl FromStr for ConstraintKind {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link" => Ok(ConstraintKind::Link),
            other => Err(ChainError::UnknownConstraintKind(other.to_string())),
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Link => f.write_str("link"),
        }
    }
}

/// A holonomic constraint; recorded, never eliminated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub start: String,
    pub end: String,
    pub equation: Equation,
}

/// Serializable state of a [`Mechanics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub masses: Vec<MassEntry>,
    pub param_values: ParamValues,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// Symbolic equations of motion of a set of masses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mechanics {
    masses: Vec<MassEntry>,
    param_values: ParamValues,
    constraints: BTreeMap<String, Constraint>,
}

impl Mechanics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mass under `name`, whose trailing integer names its
    /// coordinates: `m2` gets `x2(t)` and `y2(t)`
    pub fn add_mass(&mut self, name: &str, mass: Expr) -> Result<(), ChainError> {
        let index = trailing_index(name).ok_or_else(|| ChainError::InvalidMassName(name.to_string()))?;
        if self.masses.iter().any(|m| m.name == name || m.index == index) {
            return Err(ChainError::DuplicateMass(name.to_string()));
        }

        let coordinate = |axis| Expr::state(StateVar::coordinate(index, axis));
        let coordinates = Pair {
            x: coordinate(Axis::X),
            y: coordinate(Axis::Y),
        };
        let velocities = Pair {
            x: coordinates.x.diff_t(),
            y: coordinates.y.diff_t(),
        };
        let accelerations = Pair {
            x: velocities.x.diff_t(),
            y: velocities.y.diff_t(),
        };

        self.masses.push(MassEntry {
            name: name.to_string(),
            index,
            mass,
            coordinates,
            velocities,
            accelerations,
            forces: Vec::new(),
        });
        Ok(())
    }

    pub fn add_force(&mut self, name: &str, (expr, axis): (Expr, Axis)) -> Result<(), ChainError> {
        let entry = self
            .masses
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| ChainError::UnknownMass(name.to_string()))?;
        entry.forces.push(ForceTerm { expr, axis });
        Ok(())
    }

    /// Sum of the forces on `name` along `axis`; zero when there are none
    pub fn sum_of_force(&self, name: &str, axis: Axis) -> Result<Expr, ChainError> {
        let entry = self.entry(name)?;
        Ok(sum_along(entry, axis))
    }

    /// `acceleration = ΣF / m` for every mass, x before y, in registration order
    pub fn generate_equations(&self) -> Vec<Equation> {
        let mut equations = Vec::with_capacity(2 * self.masses.len());
        for entry in &self.masses {
            for axis in Axis::ALL {
                let rhs = sum_along(entry, axis) / entry.mass.clone();
                equations.push(Equation::new(entry.accelerations.get(axis).clone(), rhs));
            }
        }
        ftlog::debug!("generated {} equations of motion", equations.len());
        equations
    }

    /// Record a constraint between masses `start` and `end`; `start == end`
    /// ties the mass to the origin
    pub fn generate_constraint(
        &mut self,
        kind: ConstraintKind,
        start: &str,
        end: &str,
        dimension: Expr,
    ) -> Result<(), ChainError> {
        let equation = match kind {
            ConstraintKind::Link => {
                let to = self.entry(end)?.coordinates.clone();
                let from = if start == end {
                    Pair {
                        x: Expr::zero(),
                        y: Expr::zero(),
                    }
                } else {
                    self.entry(start)?.coordinates.clone()
                };
                let lhs = (to.x - from.x).powi(2) + (to.y - from.y).powi(2);
                Equation::new(lhs, dimension.powi(2))
            }
        };
        self.constraints.insert(
            format!("{start}->{end}"),
            Constraint {
                kind,
                start: start.to_string(),
                end: end.to_string(),
                equation,
            },
        );
        Ok(())
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(key, c)| (key.as_str(), c))
    }

    /// Bind numbers to parameters; unbound parameters stay symbolic
    pub fn substitute_parameters(equations: &[Equation], values: &ParamValues) -> Vec<Equation> {
        equations.iter().map(|eq| eq.substitute(values)).collect()
    }

    pub fn rhs_of_equation(equations: &[Equation]) -> Vec<Expr> {
        equations.iter().map(|eq| eq.rhs.clone()).collect()
    }

    /// Fail on the first right-hand side that still holds a parameter
    pub fn check_resolved(rhs: &[Expr]) -> Result<(), ResolutionError> {
        for (equation, expr) in rhs.iter().enumerate() {
            if let Some(symbol) = expr.params().into_iter().next() {
                return Err(ResolutionError::UnresolvedSymbol { equation, symbol });
            }
        }
        Ok(())
    }

    /// Equations with this system's parameter values substituted
    pub fn resolved_equations(&self) -> Result<Vec<Equation>, ResolutionError> {
        let equations = Self::substitute_parameters(&self.generate_equations(), &self.param_values);
        Self::check_resolved(&Self::rhs_of_equation(&equations))?;
        Ok(equations)
    }

    /// Fully numeric right-hand sides, one per coordinate
    pub fn resolved_rhs(&self) -> Result<Vec<Expr>, ResolutionError> {
        Ok(Self::rhs_of_equation(&self.resolved_equations()?))
    }

    /// Coordinate symbols followed by velocity symbols, trajectory order
    pub fn state_symbols(&self) -> Vec<Symbol> {
        let var = |entry: &MassEntry, axis, order| Symbol::State(StateVar {
            index: entry.index,
            axis,
            order,
        });
        let mut symbols = Vec::with_capacity(4 * self.masses.len());
        for order in [0, 1] {
            for entry in &self.masses {
                for axis in Axis::ALL {
                    symbols.push(var(entry, axis, order));
                }
            }
        }
        symbols
    }

    /// Compile the resolved right-hand sides
    pub fn compile(&self) -> Result<CompiledRhs, ResolutionError> {
        CompiledRhs::compile(&self.resolved_rhs()?, &self.state_symbols())
    }

    /// Resolve, compile and integrate from `initial_state`
    /// (`[positions..., velocities...]`, integration frame)
    pub fn simulate(
        &self,
        initial_state: &[f64],
        t_span: (f64, f64),
        num_points: usize,
        settings: &SimulationSettings,
    ) -> Result<Trajectory, Error> {
        settings.validate()?;
        let mut compiled = self.compile()?;
        if settings.solver.is_implicit() {
            compiled = compiled.with_jacobian()?;
        }
        let trajectory = integrate(&compiled, initial_state, t_span, num_points, settings)?;
        Ok(trajectory)
    }

    pub fn param_values(&self) -> &ParamValues {
        &self.param_values
    }

    pub fn set_param_values(&mut self, values: ParamValues) {
        self.param_values = values;
    }

    pub fn masses(&self) -> &[MassEntry] {
        &self.masses
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            masses: self.masses.clone(),
            param_values: self.param_values.clone(),
            constraints: self.constraints.values().cloned().collect(),
        }
    }

    /// Rebuild from a snapshot; coordinates are regenerated from the names
    pub fn from_snapshot(snapshot: &SystemSnapshot) -> Result<Self, ChainError> {
        let mut mechanics = Mechanics::new();
        for entry in &snapshot.masses {
            mechanics.add_mass(&entry.name, entry.mass.clone())?;
            for force in &entry.forces {
                mechanics.add_force(&entry.name, (force.expr.clone(), force.axis))?;
            }
        }
        for constraint in &snapshot.constraints {
            mechanics.constraints.insert(
                format!("{}->{}", constraint.start, constraint.end),
                constraint.clone(),
            );
        }
        mechanics.set_param_values(snapshot.param_values.clone());
        Ok(mechanics)
    }

    fn entry(&self, name: &str) -> Result<&MassEntry, ChainError> {
        self.masses
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ChainError::UnknownMass(name.to_string()))
    }
}

fn sum_along(entry: &MassEntry, axis: Axis) -> Expr {
    entry
        .forces
        .iter()
        .filter(|f| f.axis == axis)
        .map(|f| f.expr.clone())
        .sum()
}

fn trailing_index(name: &str) -> Option<usize> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    name[name.len() - digits..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn y1() -> Expr {
        Expr::state(StateVar::coordinate(1, Axis::Y))
    }

    fn single_spring() -> Mechanics {
        let mut mechanics = Mechanics::new();
        mechanics.add_mass("m1", Expr::param("m1")).unwrap();
        mechanics
            .add_force("m1", (Expr::param("m1") * Expr::param("g"), Axis::Y))
            .unwrap();
        mechanics
            .add_force(
                "m1",
                (-(Expr::param("k1") * (y1() - Expr::param("l0_1"))), Axis::Y),
            )
            .unwrap();
        let values: ParamValues = [("m1", 2.0), ("g", 9.81), ("k1", 100.0), ("l0_1", 0.5)]
            .into_iter()
            .collect();
        mechanics.set_param_values(values);
        mechanics
    }

    #[test]
    fn test_trailing_index() {
        assert_eq!(trailing_index("m12"), Some(12));
        assert_eq!(trailing_index("mass3"), Some(3));
        assert_eq!(trailing_index("mass"), None);
    }

    #[test]
    fn test_add_mass_generates_derivatives() {
        let mechanics = single_spring();
        let entry = &mechanics.masses()[0];
        assert_eq!(entry.index, 1);
        assert_eq!(entry.coordinates.y.to_string(), "y1(t)");
        assert_eq!(entry.velocities.y.to_string(), "dy1/dt");
        assert_eq!(entry.accelerations.x.to_string(), "d2x1/dt2");
    }

    #[test]
    fn test_add_mass_rejects_bad_names() {
        let mut mechanics = single_spring();
        assert_eq!(
            mechanics.add_mass("anchor", Expr::one()),
            Err(ChainError::InvalidMassName("anchor".to_string()))
        );
        assert_eq!(
            mechanics.add_mass("m1", Expr::one()),
            Err(ChainError::DuplicateMass("m1".to_string()))
        );
        assert_eq!(
            mechanics.add_force("m7", (Expr::one(), Axis::X)),
            Err(ChainError::UnknownMass("m7".to_string()))
        );
    }

    #[test]
    fn test_sum_of_force_without_terms_is_zero() {
        let mechanics = single_spring();
        assert_eq!(mechanics.sum_of_force("m1", Axis::X).unwrap(), Expr::zero());
    }

    #[test]
    fn test_generate_equations() {
        let mechanics = single_spring();
        let equations = mechanics.generate_equations();
        assert_eq!(equations.len(), 2);
        assert_eq!(equations[0].rhs, Expr::zero());
        assert_eq!(
            equations[1].to_string(),
            "d2y1/dt2 = (m1*g - k1*(y1(t) - l0_1))/m1"
        );
    }

    #[test]
    fn test_resolved_rhs_matches_closed_form() {
        let mechanics = single_spring();
        let rhs = mechanics.resolved_rhs().unwrap();
        for y in [0.0, 0.3, 0.6962, 1.4] {
            let value = rhs[1]
                .eval(&|s: &Symbol| s.as_state().map(|_| y))
                .unwrap();
            assert_relative_eq!(value, 9.81 - 50.0 * (y - 0.5), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let mechanics = single_spring();
        let once = Mechanics::substitute_parameters(
            &mechanics.generate_equations(),
            mechanics.param_values(),
        );
        let twice = Mechanics::substitute_parameters(&once, mechanics.param_values());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_parameter_is_reported() {
        let mut mechanics = single_spring();
        let values: ParamValues = [("m1", 2.0), ("k1", 100.0), ("l0_1", 0.5)]
            .into_iter()
            .collect();
        mechanics.set_param_values(values);
        assert_eq!(
            mechanics.resolved_rhs(),
            Err(ResolutionError::UnresolvedSymbol {
                equation: 1,
                symbol: "g".to_string()
            })
        );
    }

    #[test]
    fn test_state_symbols_order() {
        let mut mechanics = single_spring();
        mechanics.add_mass("m2", Expr::param("m2")).unwrap();
        let names: Vec<String> = mechanics
            .state_symbols()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            vec![
                "x1(t)", "y1(t)", "x2(t)", "y2(t)", "dx1/dt", "dy1/dt", "dx2/dt", "dy2/dt"
            ]
        );
    }

    #[test]
    fn test_link_constraint() {
        let mut mechanics = single_spring();
        mechanics.add_mass("m2", Expr::param("m2")).unwrap();
        mechanics
            .generate_constraint(ConstraintKind::Link, "m1", "m1", Expr::param("L1"))
            .unwrap();
        mechanics
            .generate_constraint(ConstraintKind::Link, "m1", "m2", Expr::num(0.5))
            .unwrap();

        let keys: Vec<&str> = mechanics.constraints().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["m1->m1", "m1->m2"]);

        let (_, to_origin) = mechanics.constraints().next().unwrap();
        assert_eq!(to_origin.equation.to_string(), "x1(t)^2 + y1(t)^2 = L1^2");
        assert_eq!(mechanics.generate_equations().len(), 4);
        assert!("rope".parse::<ConstraintKind>().is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mechanics = single_spring();
        let restored = Mechanics::from_snapshot(&mechanics.snapshot()).unwrap();
        assert_eq!(restored, mechanics);
    }
}
