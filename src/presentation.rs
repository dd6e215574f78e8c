//! Typesetting of the equations of motion
//!
//! Produces strings only. Parameters such as `l0_2` become `l_{0,2}`, state
//! variables use dot notation for time derivatives.

use crate::error::ResolutionError;
use crate::mechanics::Mechanics;
use crate::symbolic::print::{render, Notation};
use crate::symbolic::{Equation, Expr, StateVar, Symbol};

/// LaTeX math-mode notation
#[derive(Debug, Clone, Copy, Default)]
pub struct Latex;

impl Latex {
    fn param(name: &str) -> String {
        let split = name
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(name.len());
        let (stem, subscript) = name.split_at(split);
        if subscript.is_empty() || stem.is_empty() {
            name.to_string()
        } else {
            format!("{stem}_{{{}}}", subscript.replace('_', ","))
        }
    }

    fn state(var: &StateVar) -> String {
        let (axis, index) = (var.axis, var.index);
        match var.order {
            0 => format!("{axis}_{{{index}}}"),
            1 => format!("\\dot{{{axis}}}_{{{index}}}"),
            2 => format!("\\ddot{{{axis}}}_{{{index}}}"),
            n => format!("{axis}_{{{index}}}^{{({n})}}"),
        }
    }
}

impl Notation for Latex {
    fn symbol(&self, symbol: &Symbol) -> String {
        match symbol {
            Symbol::Param(name) => Self::param(name),
            Symbol::State(var) => Self::state(var),
        }
    }

    fn times(&self) -> &'static str {
        " "
    }

    fn group(&self, inner: &str) -> String {
        format!("\\left({inner}\\right)")
    }

    fn power(&self, base: &str, exponent: i32) -> String {
        format!("{base}^{{{exponent}}}")
    }

    fn fraction(&self, numerator: &str, denominator: &str, _compound: bool) -> String {
        format!("\\frac{{{numerator}}}{{{denominator}}}")
    }
}

pub fn latex_expr(expr: &Expr) -> String {
    render(expr, &Latex)
}

pub fn latex_equation(equation: &Equation) -> String {
    format!("{} = {}", latex_expr(&equation.lhs), latex_expr(&equation.rhs))
}

/// One `$...$` line per resolved equation of motion
pub fn latex_equations(mechanics: &Mechanics) -> Result<String, ResolutionError> {
    let lines: Vec<String> = mechanics
        .resolved_equations()?
        .iter()
        .map(|eq| format!("${}$", latex_equation(eq)))
        .collect();
    Ok(lines.join("\n"))
}

/// One plain-text line per resolved equation of motion
pub fn plain_equations(mechanics: &Mechanics) -> Result<String, ResolutionError> {
    let lines: Vec<String> = mechanics
        .resolved_equations()?
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(lines.join("\n"))
}
