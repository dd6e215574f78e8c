//! Point masses and rigid blocks
//!
//! Positions stored on a [`Mass`] are in the presentation frame (up is +y);
//! velocities are integration-frame values (down is +y). Symbolic expressions produced here are in the
//! integration frame (down is +y), where the upper face of a block sits at
//! `y - h/2` and the lower face at `y + h/2`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::symbolic::{Axis, Expr, ParamValues, StateVar};
use crate::utils::constants::GRAVITY_SYMBOL;

/// Mass variants a chain can hold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MassKind {
    /// Dimensionless point carrying mass `mass`
    MassPoint { mass: f64 },
    /// Rectangular block of uniform density; `y_dim` is its height
    RigidBlock {
        x_dim: f64,
        y_dim: f64,
        z_dim: f64,
        density: f64,
    },
}

impl MassKind {
    pub fn tag(&self) -> MassTag {
        match self {
            MassKind::MassPoint { .. } => MassTag::MassPoint,
            MassKind::RigidBlock { .. } => MassTag::RigidBlock,
        }
    }

    pub fn mass(&self) -> f64 {
        match *self {
            MassKind::MassPoint { mass } => mass,
            MassKind::RigidBlock {
                x_dim,
                y_dim,
                z_dim,
                density,
            } => x_dim * y_dim * z_dim * density,
        }
    }

    /// Distance from the center to the top or bottom face
    pub fn half_height(&self) -> f64 {
        match *self {
            MassKind::MassPoint { .. } => 0.0,
            MassKind::RigidBlock { y_dim, .. } => y_dim / 2.0,
        }
    }
}

/// Type tag of a mass as written in chain files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MassTag {
    MassPoint,
    RigidBlock,
}

impl MassTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MassTag::MassPoint => "masspoint",
            MassTag::RigidBlock => "steady body",
        }
    }
}

impl fmt::Display for MassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MassTag {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "masspoint" => Ok(MassTag::MassPoint),
            "steady body" => Ok(MassTag::RigidBlock),
            other => Err(ChainError::UnknownMassKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for MassTag {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MassTag> for String {
    fn from(tag: MassTag) -> Self {
        tag.as_str().to_string()
    }
}

/// A mass of the chain with its presentation-frame initial conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Mass {
    index: usize,
    kind: MassKind,
    position: [f64; 2],
    velocity: [f64; 2],
    external_force: f64,
}

impl Mass {
    pub fn new(index: usize, kind: MassKind) -> Self {
        Self {
            index,
            kind,
            position: [0.0, 0.0],
            velocity: [0.0, 0.0],
            external_force: 0.0,
        }
    }

    pub fn point(index: usize, mass: f64) -> Self {
        Self::new(index, MassKind::MassPoint { mass })
    }

    pub fn block(index: usize, x_dim: f64, y_dim: f64, z_dim: f64, density: f64) -> Self {
        Self::new(
            index,
            MassKind::RigidBlock {
                x_dim,
                y_dim,
                z_dim,
                density,
            },
        )
    }

    /// Constant vertical load in the integration frame (positive pulls down)
    pub fn with_external_force(mut self, force: f64) -> Self {
        self.external_force = force;
        self
    }

    /// Builder form of [`Mass::set_initial_conditions`]
    pub fn at(mut self, position: [f64; 2], velocity: [f64; 2]) -> Self {
        self.set_initial_conditions(position, velocity);
        self
    }

    pub fn set_initial_conditions(&mut self, position: [f64; 2], velocity: [f64; 2]) {
        self.position = position;
        self.velocity = velocity;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.position = [x, y];
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> MassKind {
        self.kind
    }

    pub fn tag(&self) -> MassTag {
        self.kind.tag()
    }

    pub fn mass(&self) -> f64 {
        self.kind.mass()
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn velocity(&self) -> [f64; 2] {
        self.velocity
    }

    pub fn external_force(&self) -> f64 {
        self.external_force
    }

    /// Registration name, `m<index>`
    pub fn name(&self) -> String {
        mass_symbol(self.index)
    }

    /// Where the spring above attaches, presentation frame
    pub fn top_attachment(&self) -> [f64; 2] {
        let [x, y] = self.position;
        [x, y + self.kind.half_height()]
    }

    /// Where the spring below attaches, presentation frame
    pub fn bottom_attachment(&self) -> [f64; 2] {
        let [x, y] = self.position;
        [x, y - self.kind.half_height()]
    }

    pub fn coordinate(&self, axis: Axis) -> Expr {
        Expr::state(StateVar::coordinate(self.index, axis))
    }

    /// Symbolic mass `m<i>`; for blocks it is bound to volume times density
    pub fn mass_symbol(&self) -> Expr {
        Expr::param(mass_symbol(self.index))
    }

    /// Symbolic block height `h<i>`; `None` for point masses
    pub fn height_symbol(&self) -> Option<Expr> {
        match self.kind {
            MassKind::MassPoint { .. } => None,
            MassKind::RigidBlock { .. } => Some(Expr::param(format!("h{}", self.index))),
        }
    }

    pub fn gravity_force(&self) -> Expr {
        self.mass_symbol() * Expr::param(GRAVITY_SYMBOL)
    }

    pub fn external_force_symbol(&self) -> Expr {
        Expr::param(format!("F{}", self.index))
    }

    /// Numeric values of every parameter this mass introduces
    pub fn param_values(&self) -> ParamValues {
        let mut values = ParamValues::new();
        values.insert(mass_symbol(self.index), self.mass());
        values.insert(format!("F{}", self.index), self.external_force);
        if let MassKind::RigidBlock {
            x_dim,
            y_dim,
            z_dim,
            ..
        } = self.kind
        {
            values.insert(format!("w{}", self.index), x_dim);
            values.insert(format!("h{}", self.index), y_dim);
            values.insert(format!("d{}", self.index), z_dim);
        }
        values
    }

    /// Reject non-finite or non-positive physical parameters
    pub fn validate(&self) -> Result<(), ChainError> {
        let name = self.name();
        let mut positive = vec![];
        match self.kind {
            MassKind::MassPoint { mass } => positive.push((name.clone(), mass)),
            MassKind::RigidBlock {
                x_dim,
                y_dim,
                z_dim,
                density,
            } => {
                positive.push((format!("w{}", self.index), x_dim));
                positive.push((format!("h{}", self.index), y_dim));
                positive.push((format!("d{}", self.index), z_dim));
                positive.push((format!("rho{}", self.index), density));
            }
        }
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ChainError::InvalidParameter { name, value });
            }
        }

        let finite = self
            .position
            .iter()
            .chain(self.velocity.iter())
            .chain(std::iter::once(&self.external_force));
        for &value in finite {
            if !value.is_finite() {
                return Err(ChainError::InvalidParameter {
                    name: format!("{name} initial conditions"),
                    value,
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn mass_symbol(index: usize) -> String {
    format!("m{index}")
}
