use crate::spacial::{ki_round, rotate_vector, Angle, Position, Vector};

/// A circular arc in internal units, going from `start` through `mid` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularArc {
    pub center: Position,
    pub start: Position,
    pub mid: Position,
    pub end: Position,
}

impl CircularArc {
    /// Arc around `center`; angles are counter-clockwise on the board, the sweep goes from
    /// `start_angle` to `end_angle`.
    pub fn from_center(center: Position, start_angle: Angle, end_angle: Angle, radius: i64) -> Self {
        let point_at = |angle: Angle| center + rotate_vector(Vector::new(radius, 0), angle);
        let mid_angle = Angle::from_degrees((start_angle.degrees() + end_angle.degrees()) / 2.0);

        Self {
            center,
            start: point_at(start_angle),
            mid: point_at(mid_angle),
            end: point_at(end_angle),
        }
    }

    /// Arc through three points, `None` when they are collinear or coincident.
    ///
    /// When `end` equals `start` the arc is a full circle and `mid` the opposite point.
    pub fn through(start: Position, mid: Position, end: Position) -> Option<Self> {
        let center = match start == end {
            true if start != mid => Position::new(
                ki_round((start.x + mid.x) as f64 / 2.0),
                ki_round((start.y + mid.y) as f64 / 2.0),
            ),
            true => return None,
            false => circumcenter(start, mid, end)?,
        };
        Some(Self {
            center,
            start,
            mid,
            end,
        })
    }

    pub fn radius(&self) -> f64 {
        let delta = self.start - self.center;
        (delta.x as f64).hypot(delta.y as f64)
    }

    /// Signed sweep, positive when counter-clockwise on the board.
    pub fn sweep(&self) -> Angle {
        if self.start == self.end {
            return match self.start == self.mid {
                true => Angle::ZERO,
                false => Angle::DEGREES_360,
            };
        }

        let start = board_angle(self.start - self.center);
        let mid = board_angle(self.mid - self.center);
        let end = board_angle(self.end - self.center);

        let to_mid = (mid - start).normalized();
        let to_end = (end - start).normalized();

        if to_mid.degrees() <= to_end.degrees() {
            to_end
        } else {
            -(start - end).normalized()
        }
    }
}

/// Direction of `vector` on the board, counter-clockwise from the +X axis (Y axis pointing down).
pub fn board_angle(vector: Vector) -> Angle {
    Angle::from_radians((-vector.y as f64).atan2(vector.x as f64))
}

/// Centre of the circle through three points, rounded to internal units.
pub fn circumcenter(a: Position, b: Position, c: Position) -> Option<Position> {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64 - ax, b.y as f64 - ay);
    let (cx, cy) = (c.x as f64 - ax, c.y as f64 - ay);

    let d = 2.0 * (bx * cy - by * cx);
    if d.abs() < f64::EPSILON {
        return None;
    }

    let b_squared = bx * bx + by * by;
    let c_squared = cx * cx + cy * cy;

    let x = (cy * b_squared - by * c_squared) / d;
    let y = (bx * c_squared - cx * b_squared) / d;

    Some(Position::new(ki_round(ax + x), ki_round(ay + y)))
}
