//! Symbols: named parameters and time-dependent state variables

use std::fmt;

use serde::{Deserialize, Serialize};

/// Spatial axis of a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Both axes in equation order
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }

    /// Slot of this axis inside an `[x, y]` pair
    pub fn offset(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate of mass `index` along `axis`, differentiated `order` times in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateVar {
    pub index: usize,
    pub axis: Axis,
    pub order: u8,
}

impl StateVar {
    pub fn coordinate(index: usize, axis: Axis) -> Self {
        Self {
            index,
            axis,
            order: 0,
        }
    }

    pub fn derivative(self) -> Self {
        Self {
            order: self.order + 1,
            ..self
        }
    }

    /// Base name without derivative decoration, e.g. `y2`
    pub fn name(&self) -> String {
        format!("{}{}", self.axis, self.index)
    }
}

impl fmt::Display for StateVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            0 => write!(f, "{}(t)", self.name()),
            1 => write!(f, "d{}/dt", self.name()),
            n => write!(f, "d{n}{}/dt{n}", self.name()),
        }
    }
}

/// A leaf of an expression tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    /// Constant parameter such as `m1`, `k2`, `l0_2` or `g`
    Param(String),
    /// Time-dependent coordinate or one of its derivatives
    State(StateVar),
}

impl Symbol {
    pub fn param(name: impl Into<String>) -> Self {
        Symbol::Param(name.into())
    }

    pub fn state(var: StateVar) -> Self {
        Symbol::State(var)
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Symbol::Param(_))
    }

    pub fn as_state(&self) -> Option<StateVar> {
        match self {
            Symbol::State(var) => Some(*var),
            Symbol::Param(_) => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Param(name) => f.write_str(name),
            Symbol::State(var) => var.fmt(f),
        }
    }
}

impl From<StateVar> for Symbol {
    fn from(var: StateVar) -> Self {
        Symbol::State(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_var_display() {
        let y2 = StateVar::coordinate(2, Axis::Y);
        assert_eq!(y2.to_string(), "y2(t)");
        assert_eq!(y2.derivative().to_string(), "dy2/dt");
        assert_eq!(y2.derivative().derivative().to_string(), "d2y2/dt2");
    }

    #[test]
    fn test_symbol_ordering_groups_params_first() {
        let mut symbols = vec![
            Symbol::state(StateVar::coordinate(1, Axis::Y)),
            Symbol::param("k1"),
            Symbol::state(StateVar::coordinate(1, Axis::X)),
        ];
        symbols.sort();
        assert_eq!(symbols[0], Symbol::param("k1"));
        assert_eq!(symbols[1].as_state().map(|v| v.axis), Some(Axis::X));
    }
}
