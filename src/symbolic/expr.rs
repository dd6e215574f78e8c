//! Expression trees over parameters and state variables
//!
//! Expressions are built through folding constructors ([`Expr::sum`],
//! [`Expr::product`], [`Expr::powi`]) so numeric constants collapse as soon
//! as they meet. Nothing beyond constant folding and flattening is attempted:
//! `x - x` stays as written.

use std::collections::BTreeSet;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use super::{ParamValues, StateVar, Symbol};
use crate::error::ResolutionError;

pub(crate) const PREC_ADD: u8 = 1;
pub(crate) const PREC_MUL: u8 = 2;
pub(crate) const PREC_POW: u8 = 3;
pub(crate) const PREC_ATOM: u8 = 4;

/// Symbolic expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Num(f64),
    Sym(Symbol),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, i32),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(value)
    }

    pub fn zero() -> Self {
        Expr::Num(0.0)
    }

    pub fn one() -> Self {
        Expr::Num(1.0)
    }

    pub fn sym(symbol: Symbol) -> Self {
        Expr::Sym(symbol)
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expr::Sym(Symbol::param(name))
    }

    pub fn state(var: StateVar) -> Self {
        Expr::Sym(Symbol::State(var))
    }

    /// Sum of `terms`, flattening nested sums and folding constants
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Self {
        let mut constant = 0.0;
        let mut rest = Vec::new();
        for term in terms {
            match term {
                Expr::Num(value) => constant += value,
                Expr::Add(inner) => {
                    for t in inner {
                        match t {
                            Expr::Num(value) => constant += value,
                            other => rest.push(other),
                        }
                    }
                }
                other => rest.push(other),
            }
        }
        if rest.is_empty() {
            return Expr::Num(constant);
        }
        if constant != 0.0 {
            rest.push(Expr::Num(constant));
        }
        if rest.len() == 1 {
            return rest.remove(0);
        }
        Expr::Add(rest)
    }

    /// Product of `factors`, flattening nested products and folding constants
    pub fn product<I: IntoIterator<Item = Expr>>(factors: I) -> Self {
        let mut coefficient = 1.0;
        let mut rest = Vec::new();
        for factor in factors {
            match factor {
                Expr::Num(value) => coefficient *= value,
                Expr::Mul(inner) => {
                    for f in inner {
                        match f {
                            Expr::Num(value) => coefficient *= value,
                            other => rest.push(other),
                        }
                    }
                }
                other => rest.push(other),
            }
        }
        if coefficient == 0.0 || rest.is_empty() {
            return Expr::Num(coefficient);
        }
        if coefficient != 1.0 {
            rest.insert(0, Expr::Num(coefficient));
        }
        if rest.len() == 1 {
            return rest.remove(0);
        }
        Expr::Mul(rest)
    }

    /// Integer power
    pub fn powi(self, exponent: i32) -> Self {
        match (self, exponent) {
            (_, 0) => Expr::one(),
            (base, 1) => base,
            (Expr::Num(value), n) => Expr::Num(value.powi(n)),
            (Expr::Pow(base, inner), n) => (*base).powi(inner * n),
            (base, n) => Expr::Pow(Box::new(base), n),
        }
    }

    pub fn recip(self) -> Self {
        self.powi(-1)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Expr::Num(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Num(value) => Some(*value),
            _ => None,
        }
    }

    fn map_symbols<F>(&self, f: &F) -> Expr
    where
        F: Fn(&Symbol) -> Option<Expr>,
    {
        match self {
            Expr::Num(value) => Expr::Num(*value),
            Expr::Sym(symbol) => f(symbol).unwrap_or_else(|| Expr::Sym(symbol.clone())),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.map_symbols(f))),
            Expr::Mul(factors) => Expr::product(factors.iter().map(|t| t.map_symbols(f))),
            Expr::Pow(base, n) => base.map_symbols(f).powi(*n),
        }
    }

    /// Replace every parameter bound in `values` by its number
    pub fn substitute(&self, values: &ParamValues) -> Expr {
        self.map_symbols(&|symbol| match symbol {
            Symbol::Param(name) => values.get(name).map(Expr::Num),
            Symbol::State(_) => None,
        })
    }

    /// Replace one symbol by an expression
    pub fn subs(&self, symbol: &Symbol, replacement: &Expr) -> Expr {
        self.map_symbols(&|s| (s == symbol).then(|| replacement.clone()))
    }

    fn derive<F>(&self, leaf: &F) -> Expr
    where
        F: Fn(&Symbol) -> Expr,
    {
        match self {
            Expr::Num(_) => Expr::zero(),
            Expr::Sym(symbol) => leaf(symbol),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.derive(leaf))),
            Expr::Mul(factors) => Expr::sum((0..factors.len()).map(|i| {
                Expr::product(factors.iter().enumerate().map(|(j, f)| {
                    if i == j {
                        f.derive(leaf)
                    } else {
                        f.clone()
                    }
                }))
            })),
            Expr::Pow(base, n) => Expr::product([
                Expr::Num(f64::from(*n)),
                base.as_ref().clone().powi(n - 1),
                base.derive(leaf),
            ]),
        }
    }

    /// Partial derivative with respect to `wrt`, all other symbols held fixed
    pub fn diff(&self, wrt: &Symbol) -> Expr {
        self.derive(&|symbol| {
            if symbol == wrt {
                Expr::one()
            } else {
                Expr::zero()
            }
        })
    }

    /// Total time derivative: state variables advance one derivative order,
    /// parameters are constant
    pub fn diff_t(&self) -> Expr {
        self.derive(&|symbol| match symbol {
            Symbol::State(var) => Expr::state(var.derivative()),
            Symbol::Param(_) => Expr::zero(),
        })
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(symbol) => {
                out.insert(symbol.clone());
            }
            Expr::Add(items) | Expr::Mul(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Expr::Pow(base, _) => base.collect_symbols(out),
        }
    }

    /// Names of the parameters still present
    pub fn params(&self) -> BTreeSet<String> {
        self.free_symbols()
            .into_iter()
            .filter_map(|symbol| match symbol {
                Symbol::Param(name) => Some(name),
                Symbol::State(_) => None,
            })
            .collect()
    }

    /// True when only state variables and numbers remain
    pub fn is_resolved(&self) -> bool {
        match self {
            Expr::Num(_) => true,
            Expr::Sym(symbol) => !symbol.is_param(),
            Expr::Add(items) | Expr::Mul(items) => items.iter().all(Expr::is_resolved),
            Expr::Pow(base, _) => base.is_resolved(),
        }
    }

    /// Numeric value with symbols looked up through `lookup`
    pub fn eval<F>(&self, lookup: &F) -> Result<f64, ResolutionError>
    where
        F: Fn(&Symbol) -> Option<f64>,
    {
        match self {
            Expr::Num(value) => Ok(*value),
            Expr::Sym(symbol) => lookup(symbol).ok_or_else(|| ResolutionError::NonNumeric {
                symbol: symbol.to_string(),
            }),
            Expr::Add(terms) => terms.iter().map(|t| t.eval(lookup)).sum(),
            Expr::Mul(factors) => factors.iter().map(|f| f.eval(lookup)).product(),
            Expr::Pow(base, n) => Ok(base.eval(lookup)?.powi(*n)),
        }
    }

    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Num(value) if *value < 0.0 => PREC_ADD,
            Expr::Num(_) | Expr::Sym(_) => PREC_ATOM,
            Expr::Add(_) => PREC_ADD,
            Expr::Mul(_) => PREC_MUL,
            Expr::Pow(_, n) if *n < 0 => PREC_MUL,
            Expr::Pow(..) => PREC_POW,
        }
    }

    /// Whether the term renders with a leading minus sign
    pub(crate) fn is_negative(&self) -> bool {
        match self {
            Expr::Num(value) => *value < 0.0,
            Expr::Mul(factors) => matches!(factors.first(), Some(Expr::Num(value)) if *value < 0.0),
            _ => false,
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Num(value)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::Sym(symbol)
    }
}

impl From<StateVar> for Expr {
    fn from(var: StateVar) -> Self {
        Expr::state(var)
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::sum([self, rhs])
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::sum([self, -rhs])
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs])
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        Expr::product([Expr::Num(rhs), self])
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs.recip()])
    }
}

impl Div<f64> for Expr {
    type Output = Expr;

    fn div(self, rhs: f64) -> Expr {
        Expr::product([self, Expr::Num(rhs.recip())])
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::product([Expr::Num(-1.0), self])
    }
}

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::sum(iter)
    }
}
