//! Infix rendering of expressions
//!
//! The layout rules (operator precedence, leading minus signs, fractions) are
//! shared; a [`Notation`] decides how symbols, groups, powers and fractions
//! are spelled. [`PlainText`] backs `Display`, the LaTeX notation lives in
//! [`crate::presentation`].

use std::fmt;

use super::expr::{PREC_ATOM, PREC_MUL, PREC_POW};
use super::{Equation, Expr, Symbol};

/// Spelling of the individual pieces of an expression
pub trait Notation {
    fn symbol(&self, symbol: &Symbol) -> String;

    fn number(&self, value: f64) -> String {
        format_number(value)
    }

    /// Separator between factors of a product
    fn times(&self) -> &'static str;

    fn group(&self, inner: &str) -> String {
        format!("({inner})")
    }

    fn power(&self, base: &str, exponent: i32) -> String;

    /// `compound` is set when the denominator has more than one factor
    fn fraction(&self, numerator: &str, denominator: &str, compound: bool) -> String;
}

/// Shortest readable form of a number: integers without a decimal point
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:?}")
    }
}

/// Render `expr` in the given notation
pub fn render<N: Notation + ?Sized>(expr: &Expr, notation: &N) -> String {
    match expr {
        Expr::Num(value) if *value < 0.0 => format!("-{}", notation.number(-value)),
        Expr::Num(value) => notation.number(*value),
        Expr::Sym(symbol) => notation.symbol(symbol),
        Expr::Add(terms) => render_sum(terms, notation),
        Expr::Mul(factors) => render_product(factors, notation),
        Expr::Pow(_, n) if *n < 0 => render_product(std::slice::from_ref(expr), notation),
        Expr::Pow(base, n) => notation.power(&wrap(base, PREC_ATOM, notation), *n),
    }
}

fn wrap<N: Notation + ?Sized>(expr: &Expr, min_precedence: u8, notation: &N) -> String {
    let text = render(expr, notation);
    if expr.precedence() < min_precedence {
        notation.group(&text)
    } else {
        text
    }
}

fn render_sum<N: Notation + ?Sized>(terms: &[Expr], notation: &N) -> String {
    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        if i == 0 {
            out.push_str(&render(term, notation));
        } else if term.is_negative() {
            out.push_str(" - ");
            out.push_str(&render(&-term.clone(), notation));
        } else {
            out.push_str(" + ");
            out.push_str(&render(term, notation));
        }
    }
    out
}

fn render_product<N: Notation + ?Sized>(factors: &[Expr], notation: &N) -> String {
    let mut coefficient: f64 = 1.0;
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for factor in factors {
        match factor {
            Expr::Num(value) => coefficient *= value,
            Expr::Pow(base, n) if *n < 0 => denominator.push((**base).clone().powi(-n)),
            other => numerator.push(other.clone()),
        }
    }

    let magnitude = f64::abs(coefficient);
    let mut top: Vec<String> = Vec::new();
    let mut bottom: Vec<String> = Vec::new();
    let inverse = magnitude.recip();
    if magnitude < 1.0 && inverse.fract() == 0.0 {
        bottom.push(notation.number(inverse));
    } else if magnitude != 1.0 {
        top.push(notation.number(magnitude));
    }
    top.extend(numerator.iter().map(|e| wrap(e, PREC_MUL, notation)));
    bottom.extend(denominator.iter().map(|e| wrap(e, PREC_POW, notation)));

    let numerator_text = if top.is_empty() {
        notation.number(1.0)
    } else {
        top.join(notation.times())
    };
    let body = if bottom.is_empty() {
        numerator_text
    } else {
        let compound = bottom.len() > 1;
        notation.fraction(&numerator_text, &bottom.join(notation.times()), compound)
    };
    if coefficient < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

/// Human-readable ASCII notation
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Notation for PlainText {
    fn symbol(&self, symbol: &Symbol) -> String {
        symbol.to_string()
    }

    fn times(&self) -> &'static str {
        "*"
    }

    fn power(&self, base: &str, exponent: i32) -> String {
        format!("{base}^{exponent}")
    }

    fn fraction(&self, numerator: &str, denominator: &str, compound: bool) -> String {
        if compound {
            format!("{numerator}/({denominator})")
        } else {
            format!("{numerator}/{denominator}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, &PlainText))
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}
