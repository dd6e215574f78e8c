//! Chain elements: springs, masses and the chain that strings them together

mod chain;
mod mass;
mod spring;

pub use chain::{Chain, ChainBuilder};
pub use mass::{Mass, MassKind, MassTag};
pub use spring::{Spring, SpringBehavior};

pub(crate) use chain::check_counts;
