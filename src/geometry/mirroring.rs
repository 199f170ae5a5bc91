use crate::spacial::{Angle, Invert, Position};

/// Mirroring of the device X axis, as used by a mirrored plot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Mirroring {
    pub x: bool,
}

impl Mirroring {
    pub fn horizontal(mirror: bool) -> Self {
        Self {
            x: mirror,
        }
    }

    /// A single mirrored axis reverses every rotation.
    pub fn flips_winding(&self) -> bool {
        self.x
    }

    pub fn apply_to_position(&self, position: Position) -> Position {
        match self.x {
            true => position.invert_x(),
            false => position,
        }
    }

    /// Mirror a corner list of a flashed polygon, as seen by the device.
    pub fn apply_to_corners(&self, corners: &[Position]) -> Vec<Position> {
        corners
            .iter()
            .map(|corner| self.apply_to_position(*corner))
            .collect()
    }

    /// The rotation a flashed shape needs so it ends up at `angle` once mirrored.
    pub fn apply_to_angle(&self, angle: Angle) -> Angle {
        match self.flips_winding() {
            true => -angle,
            false => angle,
        }
    }
}
