//! Numeric compilation of resolved right-hand sides
//!
//! Each resolved expression is lowered once into a tree whose leaves index
//! directly into the state slice, so evaluation inside the integrator never
//! touches symbol names.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::error::ResolutionError;
use crate::symbolic::{Expr, Symbol};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    Slot(usize),
    Sum(Vec<Node>),
    Product(Vec<Node>),
    Powi(Box<Node>, i32),
}

impl Node {
    fn lower(
        expr: &Expr,
        slots: &HashMap<Symbol, usize>,
        equation: usize,
    ) -> Result<Node, ResolutionError> {
        let lower_all = |items: &[Expr]| -> Result<Vec<Node>, ResolutionError> {
            items
                .iter()
                .map(|item| Node::lower(item, slots, equation))
                .collect()
        };
        Ok(match expr {
            Expr::Num(value) => Node::Const(*value),
            Expr::Sym(symbol) => match slots.get(symbol) {
                Some(&slot) => Node::Slot(slot),
                None => {
                    return Err(ResolutionError::UnresolvedSymbol {
                        equation,
                        symbol: symbol.to_string(),
                    })
                }
            },
            Expr::Add(terms) => Node::Sum(lower_all(terms)?),
            Expr::Mul(factors) => Node::Product(lower_all(factors)?),
            Expr::Pow(base, n) => Node::Powi(Box::new(Node::lower(base, slots, equation)?), *n),
        })
    }

    fn eval(&self, state: &[f64]) -> f64 {
        match self {
            Node::Const(value) => *value,
            Node::Slot(slot) => state[*slot],
            Node::Sum(terms) => terms.iter().map(|t| t.eval(state)).sum(),
            Node::Product(factors) => factors.iter().map(|f| f.eval(state)).product(),
            Node::Powi(base, n) => base.eval(state).powi(*n),
        }
    }
}

/// Accelerations as numeric functions of the flattened state
/// `[positions..., velocities...]`
#[derive(Debug, Clone)]
pub struct CompiledRhs {
    rhs: Vec<Expr>,
    state: Vec<Symbol>,
    slots: HashMap<Symbol, usize>,
    accelerations: Vec<Node>,
    jacobian: Option<Vec<Vec<Node>>>,
}

impl CompiledRhs {
    /// Lower `rhs` against the state symbol order; every right-hand side
    /// must mention state symbols only
    pub fn compile(rhs: &[Expr], state: &[Symbol]) -> Result<Self, ResolutionError> {
        if state.len() != 2 * rhs.len() {
            return Err(ResolutionError::StateMismatch {
                equations: rhs.len(),
                expected: 2 * rhs.len(),
                found: state.len(),
            });
        }
        let slots: HashMap<Symbol, usize> = state
            .iter()
            .enumerate()
            .map(|(slot, symbol)| (symbol.clone(), slot))
            .collect();
        let accelerations = rhs
            .iter()
            .enumerate()
            .map(|(equation, expr)| Node::lower(expr, &slots, equation))
            .collect::<Result<Vec<_>, _>>()?;

        ftlog::debug!(
            "compiled {} right-hand sides over {} state slots",
            rhs.len(),
            state.len()
        );
        Ok(Self {
            rhs: rhs.to_vec(),
            state: state.to_vec(),
            slots,
            accelerations,
            jacobian: None,
        })
    }

    /// Also lower the partial derivatives of every right-hand side with
    /// respect to every state slot
    pub fn with_jacobian(mut self) -> Result<Self, ResolutionError> {
        let mut rows = Vec::with_capacity(self.rhs.len());
        for (equation, expr) in self.rhs.iter().enumerate() {
            let row = self
                .state
                .iter()
                .map(|symbol| Node::lower(&expr.diff(symbol), &self.slots, equation))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        self.jacobian = Some(rows);
        Ok(self)
    }

    /// Number of second-order equations (one per coordinate)
    pub fn dimension(&self) -> usize {
        self.accelerations.len()
    }

    /// Length of the first-order state
    pub fn state_len(&self) -> usize {
        self.state.len()
    }

    pub fn state_symbols(&self) -> &[Symbol] {
        &self.state
    }

    pub fn has_jacobian(&self) -> bool {
        self.jacobian.is_some()
    }

    /// Acceleration of coordinate `index`
    pub fn eval(&self, index: usize, state: &[f64]) -> f64 {
        self.accelerations[index].eval(state)
    }

    pub fn accelerations(&self, state: &[f64], out: &mut [f64]) {
        for (value, node) in out.iter_mut().zip(&self.accelerations) {
            *value = node.eval(state);
        }
    }

    /// `∂a_i/∂z_j`, one row per coordinate and one column per state slot
    pub fn jacobian(&self, state: &[f64]) -> Option<DMatrix<f64>> {
        let rows = self.jacobian.as_ref()?;
        Some(DMatrix::from_fn(rows.len(), self.state.len(), |i, j| {
            rows[i][j].eval(state)
        }))
    }
}
