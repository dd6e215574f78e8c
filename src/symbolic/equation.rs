use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Expr, ParamValues, Symbol};

/// `lhs = rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs }
    }

    /// Substitute parameter values on both sides
    pub fn substitute(&self, values: &ParamValues) -> Equation {
        Equation::new(self.lhs.substitute(values), self.rhs.substitute(values))
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = self.lhs.free_symbols();
        symbols.extend(self.rhs.free_symbols());
        symbols
    }
}
