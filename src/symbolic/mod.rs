//! Minimal symbolic algebra for equations of motion
//!
//! Expressions are trees over numbers, named parameters (`m1`, `k2`, `g`, ...)
//! and state variables (coordinates and their time derivatives). Supported
//! operations are exactly what equation assembly needs: substitution,
//! differentiation, evaluation and printing.

mod equation;
mod expr;
mod params;
pub mod print;
mod symbol;

pub use equation::Equation;
pub use expr::Expr;
pub use params::ParamValues;
pub use print::{render, Notation, PlainText};
pub use symbol::{Axis, StateVar, Symbol};
