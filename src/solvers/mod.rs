//! Numerical integration solvers
//!
//! - [`EmbeddedRungeKutta`]: explicit adaptive solver driven by a
//!   [`ButcherTableau`] ([`DOPRI54`], [`RKF45`])
//! - [`ESDIRK32`]: L-stable implicit solver for stiff chains

mod base;
mod embedded;
mod esdirk32;

pub use base::*;
pub use embedded::{ButcherTableau, EmbeddedRungeKutta, DOPRI54, RKF45};
pub use esdirk32::ESDIRK32;
