//! Linear and cubic springs
//!
//! A spring stores its constants and the geometry it was bound to. The
//! symbolic force it exerts depends on what hangs at each end, so
//! [`Spring::force`] takes the two masses it connects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::mass::{Mass, MassKind};
use crate::error::ChainError;
use crate::symbolic::{Axis, Expr, ParamValues};

/// Force law of a spring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SpringBehavior {
    /// `F = k (e - l0)`
    #[default]
    Linear,
    /// `F = k (e - l0)^3`
    Cubic,
}

impl SpringBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpringBehavior::Linear => "linear",
            SpringBehavior::Cubic => "cubic",
        }
    }

    fn apply(&self, stiffness: Expr, extension: Expr) -> Expr {
        match self {
            SpringBehavior::Linear => stiffness * extension,
            SpringBehavior::Cubic => stiffness * extension.powi(3),
        }
    }
}

impl fmt::Display for SpringBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpringBehavior {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(SpringBehavior::Linear),
            "cubic" => Ok(SpringBehavior::Cubic),
            other => Err(ChainError::UnknownSpringBehavior(other.to_string())),
        }
    }
}

impl TryFrom<String> for SpringBehavior {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpringBehavior> for String {
    fn from(behavior: SpringBehavior) -> Self {
        behavior.as_str().to_string()
    }
}

/// A spring of the chain
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    index: usize,
    rest_length: f64,
    stiffness: f64,
    behavior: SpringBehavior,
    start: [f64; 2],
    end: [f64; 2],
    length: f64,
    pre_stretch: f64,
    velocity: [f64; 2],
}

impl Spring {
    /// Unbound spring hanging straight down from the origin at rest length
    pub fn new(index: usize, rest_length: f64, stiffness: f64, behavior: SpringBehavior) -> Self {
        Self {
            index,
            rest_length,
            stiffness,
            behavior,
            start: [0.0, 0.0],
            end: [0.0, -rest_length],
            length: rest_length,
            pre_stretch: 0.0,
            velocity: [0.0, 0.0],
        }
    }

    /// Bind the spring between `top` (the origin when `None`) and `bottom`
    pub fn set_initial_conditions(
        &mut self,
        top: Option<&Mass>,
        bottom: &Mass,
        velocity: [f64; 2],
    ) {
        self.velocity = velocity;
        self.attach(top, bottom);
        self.pre_stretch = self.length - self.rest_length;
    }

    /// Follow the masses to their current positions; pre-stretch is kept
    pub fn move_between(&mut self, top: Option<&Mass>, bottom: &Mass) {
        self.attach(top, bottom);
    }

    fn attach(&mut self, top: Option<&Mass>, bottom: &Mass) {
        self.start = top.map_or([0.0, 0.0], Mass::bottom_attachment);
        self.end = bottom.top_attachment();
        let dx = self.end[0] - self.start[0];
        let dy = self.end[1] - self.start[1];
        self.length = dx.hypot(dy);
    }

    /// Restoring force `(Fx, Fy)` between `top` (origin when `None`) and
    /// `bottom`, in the integration frame
    pub fn force(&self, top: Option<&Mass>, bottom: &Mass) -> (Expr, Expr) {
        let stiffness = self.stiffness_symbol();
        let horizontal = match top {
            None => bottom.coordinate(Axis::X),
            Some(top) => bottom.coordinate(Axis::X) - top.coordinate(Axis::X),
        };
        let vertical = vertical_extension(top, bottom) - self.rest_length_symbol();
        (
            self.behavior.apply(stiffness.clone(), horizontal),
            self.behavior.apply(stiffness, vertical),
        )
    }

    pub fn param_values(&self) -> ParamValues {
        let mut values = ParamValues::new();
        values.insert(format!("k{}", self.index), self.stiffness);
        values.insert(format!("l0_{}", self.index), self.rest_length);
        values
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        let checks = [
            (format!("k{}", self.index), self.stiffness, true),
            (format!("l0_{}", self.index), self.rest_length, false),
        ];
        for (name, value, strictly_positive) in checks {
            let bad = !value.is_finite() || value < 0.0 || (strictly_positive && value == 0.0);
            if bad {
                return Err(ChainError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    pub fn stiffness_symbol(&self) -> Expr {
        Expr::param(format!("k{}", self.index))
    }

    pub fn rest_length_symbol(&self) -> Expr {
        Expr::param(format!("l0_{}", self.index))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn behavior(&self) -> SpringBehavior {
        self.behavior
    }

    pub fn start(&self) -> [f64; 2] {
        self.start
    }

    pub fn end(&self) -> [f64; 2] {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn pre_stretch(&self) -> f64 {
        self.pre_stretch
    }

    pub fn velocity(&self) -> [f64; 2] {
        self.velocity
    }
}

/// Vertical distance between the faces a spring connects, integration frame
fn vertical_extension(top: Option<&Mass>, bottom: &Mass) -> Expr {
    let y = |m: &Mass| m.coordinate(Axis::Y);
    let half = |m: &Mass| m.height_symbol().map_or_else(Expr::zero, |h| h / 2.0);

    match (top.map(|m| (m, m.kind())), bottom.kind()) {
        (None, MassKind::MassPoint { .. }) => y(bottom),
        (None, MassKind::RigidBlock { .. }) => y(bottom) - half(bottom),
        (Some((top, MassKind::MassPoint { .. })), MassKind::MassPoint { .. }) => {
            y(bottom) - y(top)
        }
        (Some((top, MassKind::MassPoint { .. })), MassKind::RigidBlock { .. }) => {
            (y(bottom) - half(bottom)) - y(top)
        }
        (Some((top, MassKind::RigidBlock { .. })), MassKind::MassPoint { .. }) => {
            y(bottom) - (y(top) + half(top))
        }
        (Some((top, MassKind::RigidBlock { .. })), MassKind::RigidBlock { .. }) => {
            (y(bottom) - half(bottom)) - (y(top) + half(top))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{StateVar, Symbol};
    use approx::assert_relative_eq;

    fn lookup<'a>(
        params: &'a ParamValues,
        states: &'a [(usize, Axis, f64)],
    ) -> impl Fn(&Symbol) -> Option<f64> + 'a {
        move |symbol: &Symbol| match symbol {
            Symbol::Param(name) => params.get(name),
            Symbol::State(var) => states
                .iter()
                .find(|(i, a, _)| *i == var.index && *a == var.axis && var.order == 0)
                .map(|(_, _, v)| *v),
        }
    }

    #[test]
    fn test_initial_conditions_from_origin() {
        let mut spring = Spring::new(1, 0.5, 100.0, SpringBehavior::Linear);
        let mass = Mass::point(1, 2.0).at([0.0, -0.7], [0.0, 0.0]);
        spring.set_initial_conditions(None, &mass, [0.0, 0.0]);

        assert_eq!(spring.start(), [0.0, 0.0]);
        assert_eq!(spring.end(), [0.0, -0.7]);
        assert_relative_eq!(spring.length(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(spring.pre_stretch(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_move_keeps_pre_stretch() {
        let top = Mass::block(1, 0.2, 0.1, 0.2, 500.0).at([0.0, -0.6], [0.0, 0.0]);
        let mut bottom = Mass::point(2, 1.0).at([0.0, -1.2], [0.0, 0.0]);
        let mut spring = Spring::new(2, 0.4, 50.0, SpringBehavior::Linear);
        spring.set_initial_conditions(Some(&top), &bottom, [0.0, 0.0]);
        assert_relative_eq!(spring.start()[1], -0.65, epsilon = 1e-12);
        assert_relative_eq!(spring.length(), 0.55, epsilon = 1e-12);

        bottom.move_to(0.0, -1.5);
        spring.move_between(Some(&top), &bottom);
        assert_relative_eq!(spring.length(), 0.85, epsilon = 1e-12);
        assert_relative_eq!(spring.pre_stretch(), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_force_from_origin() {
        let spring = Spring::new(1, 0.5, 100.0, SpringBehavior::Linear);
        let mass = Mass::point(1, 2.0);
        let (fx, fy) = spring.force(None, &mass);

        let params = spring.param_values();
        let states = [(1, Axis::X, 0.1), (1, Axis::Y, 0.7)];
        let f = lookup(&params, &states);
        assert_relative_eq!(fx.eval(&f).unwrap(), 10.0, epsilon = 1e-12);
        assert_relative_eq!(fy.eval(&f).unwrap(), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_force() {
        let spring = Spring::new(1, 0.5, 100.0, SpringBehavior::Cubic);
        let mass = Mass::point(1, 2.0);
        let (_, fy) = spring.force(None, &mass);

        let params = spring.param_values();
        let states = [(1, Axis::X, 0.0), (1, Axis::Y, 0.7)];
        assert_relative_eq!(fy.eval(&lookup(&params, &states)).unwrap(), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_block_to_block_extension() {
        let top = Mass::block(1, 0.2, 0.1, 0.2, 500.0);
        let bottom = Mass::block(2, 0.2, 0.3, 0.2, 500.0);
        let spring = Spring::new(2, 0.4, 50.0, SpringBehavior::Linear);
        let (_, fy) = spring.force(Some(&top), &bottom);

        let mut params = spring.param_values();
        params.merge(&top.param_values());
        params.merge(&bottom.param_values());
        // faces: top block lower face 0.65, bottom block upper face 1.35
        let states = [
            (1, Axis::X, 0.0),
            (1, Axis::Y, 0.6),
            (2, Axis::X, 0.0),
            (2, Axis::Y, 1.5),
        ];
        let expected = 50.0 * ((1.5 - 0.15) - (0.6 + 0.05) - 0.4);
        assert_relative_eq!(
            fy.eval(&lookup(&params, &states)).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_point_below_block_extension() {
        let top = Mass::block(1, 0.2, 0.1, 0.2, 500.0);
        let bottom = Mass::point(2, 1.0);
        let spring = Spring::new(2, 0.4, 50.0, SpringBehavior::Linear);
        let (_, fy) = spring.force(Some(&top), &bottom);
        let symbols = fy.free_symbols();
        assert!(symbols.contains(&Symbol::param("h1")));
        assert!(!symbols.contains(&Symbol::param("h2")));
        assert!(symbols.contains(&Symbol::state(StateVar::coordinate(1, Axis::Y))));
    }

    #[test]
    fn test_behavior_parsing() {
        assert_eq!("cubic".parse::<SpringBehavior>(), Ok(SpringBehavior::Cubic));
        assert_eq!(
            "quadratic".parse::<SpringBehavior>(),
            Err(ChainError::UnknownSpringBehavior("quadratic".to_string()))
        );
    }

    #[test]
    fn test_validate() {
        assert!(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear).validate().is_ok());
        assert!(Spring::new(1, 0.0, 100.0, SpringBehavior::Linear).validate().is_ok());
        assert!(Spring::new(1, 0.5, 0.0, SpringBehavior::Linear).validate().is_err());
        assert!(Spring::new(1, f64::NAN, 1.0, SpringBehavior::Linear).validate().is_err());
    }
}
