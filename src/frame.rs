//! Conversion between the integration and presentation frames
//!
//! Equations are written with +y pointing down (the direction gravity pulls).
//! Chain files, mass positions and everything shown to a user use +y pointing
//! up; initial velocities are taken as integration-frame values. Only the vertical axis differs; the map is its own inverse.

use crate::symbolic::Axis;

pub fn to_presentation(axis: Axis, value: f64) -> f64 {
    match axis {
        Axis::X => value,
        Axis::Y => -value,
    }
}

pub fn to_integration(axis: Axis, value: f64) -> f64 {
    to_presentation(axis, value)
}

/// `[x, y]` from the presentation frame into the integration frame
pub fn presentation_to_state(point: [f64; 2]) -> [f64; 2] {
    [
        to_integration(Axis::X, point[0]),
        to_integration(Axis::Y, point[1]),
    ]
}

/// `[x, y]` from the integration frame into the presentation frame
pub fn state_to_presentation(point: [f64; 2]) -> [f64; 2] {
    [
        to_presentation(Axis::X, point[0]),
        to_presentation(Axis::Y, point[1]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_vertical_axis_flips() {
        assert_eq!(presentation_to_state([0.3, -0.7]), [0.3, 0.7]);
        assert_eq!(to_presentation(Axis::X, -1.5), -1.5);
    }

    #[test]
    fn test_round_trip() {
        let p = [0.25, -1.125];
        assert_eq!(state_to_presentation(presentation_to_state(p)), p);
    }
}
