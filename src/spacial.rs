use std::fmt;

/// A location in internal units, host orientation (Y axis pointing down).
pub type Position = nalgebra::Point2<i64>;
/// A relative displacement in internal units.
pub type Vector = nalgebra::Vector2<i64>;
/// Width and height in internal units.
pub type Size = nalgebra::Vector2<i64>;
/// A location in device space, before rounding.
pub type DevicePosition = nalgebra::Point2<f64>;

pub trait ToVector {
    fn to_vector(self) -> Vector;
}

impl ToVector for Position {
    fn to_vector(self) -> Vector {
        Vector::new(self.x, self.y)
    }
}

pub trait ToPosition {
    fn to_position(self) -> Position;
}

impl ToPosition for Vector {
    fn to_position(self) -> Position {
        Position::new(self.x, self.y)
    }
}

pub trait Invert {
    fn invert_x(self) -> Self;
}

macro_rules! impl_invert {
    ($name:ident) => {
        impl Invert for $name {
            fn invert_x(self) -> Self {
                Self::new(-self.x, self.y)
            }
        }
    };
}

impl_invert!(Vector);
impl_invert!(Position);

/// A rotation in degrees, counter-clockwise as seen on the board.
///
/// Compared bit-exactly; use `snapped` before comparing rotations that went through arithmetic.
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);
    pub const DEGREES_90: Angle = Angle(90.0);
    pub const DEGREES_180: Angle = Angle(180.0);
    pub const DEGREES_360: Angle = Angle(360.0);

    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees)
    }

    pub fn from_radians(radians: f64) -> Self {
        Self(radians.to_degrees())
    }

    pub fn degrees(self) -> f64 {
        self.0
    }

    pub fn radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Returns the equivalent angle in `[0, 360)`.
    pub fn normalized(self) -> Self {
        let mut degrees = self.0 % 360.0;
        if degrees < 0.0 {
            degrees += 360.0;
        }
        // -0.0 and 360.0 (from tiny negative inputs) both collapse to 0
        if degrees == 0.0 || degrees >= 360.0 {
            degrees = 0.0;
        }
        Self(degrees)
    }

    /// The normalized angle in millionths of a degree, the precision rotations are written with.
    pub fn micro_degrees(self) -> i64 {
        ki_round(self.normalized().0 * MICRO_DEGREES_PER_DEGREE) % (360 * MICRO_DEGREES_PER_DEGREE as i64)
    }

    /// The normalized angle rounded to the written precision, so rotations that only differ
    /// by floating point noise become equal.
    pub fn snapped(self) -> Self {
        Self(self.micro_degrees() as f64 / MICRO_DEGREES_PER_DEGREE)
    }

    /// True for 0, 90, 180 and 270 degrees.
    pub fn is_cardinal(self) -> bool {
        self.micro_degrees() % (90 * MICRO_DEGREES_PER_DEGREE as i64) == 0
    }

    /// True for 90 and 270 degrees.
    pub fn is_cardinal_90(self) -> bool {
        let micro_degrees = self.micro_degrees();
        micro_degrees == 90 * MICRO_DEGREES_PER_DEGREE as i64 || micro_degrees == 270 * MICRO_DEGREES_PER_DEGREE as i64
    }
}

const MICRO_DEGREES_PER_DEGREE: f64 = 1_000_000.0;

impl core::ops::Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Self) -> Self::Output {
        Angle(self.0 + rhs.0)
    }
}

impl core::ops::Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Self) -> Self::Output {
        Angle(self.0 - rhs.0)
    }
}

impl core::ops::Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Self::Output {
        Angle(-self.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Round half away from zero, saturating at the `i64` range.
pub fn ki_round(value: f64) -> i64 {
    let rounded = value.round();
    if rounded >= i64::MAX as f64 {
        i64::MAX
    } else if rounded <= i64::MIN as f64 {
        i64::MIN
    } else {
        rounded as i64
    }
}

/// Rotate a vector in place by `angle`.
///
/// The host Y axis points down, so a positive angle appears counter-clockwise on the board
/// and stays counter-clockwise once the Y axis is flipped for the device.
pub fn rotate_vector(vector: Vector, angle: Angle) -> Vector {
    let normalized = angle.normalized().degrees();

    // exact results for the cardinal angles, the common case for pads
    if normalized == 0.0 {
        return vector;
    } else if normalized == 90.0 {
        return Vector::new(vector.y, -vector.x);
    } else if normalized == 180.0 {
        return Vector::new(-vector.x, -vector.y);
    } else if normalized == 270.0 {
        return Vector::new(-vector.y, vector.x);
    }

    let (sin, cos) = angle.radians().sin_cos();
    let x = vector.x as f64;
    let y = vector.y as f64;

    Vector::new(ki_round(x * cos + y * sin), ki_round(y * cos - x * sin))
}

pub fn rotate_point(point: Position, angle: Angle) -> Position {
    rotate_vector(point.to_vector(), angle).to_position()
}

pub mod deduplicate {
    use crate::Position;

    pub trait DedupTolerance {
        /// Remove consecutive points closer than `margin` on both axes.
        fn dedup_with_margin(self, margin: i64) -> Self;
    }

    impl DedupTolerance for Vec<Position> {
        fn dedup_with_margin(mut self, margin: i64) -> Self {
            self.dedup_by(|b, a| (a.x - b.x).abs() <= margin && (a.y - b.y).abs() <= margin);
            self
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_dedup_with_margin_removes_near_duplicates() {
            // given
            let points = vec![
                Position::new(0, 0),
                Position::new(1, 1),
                Position::new(100, 0),
                Position::new(100, 0),
                Position::new(0, 100),
            ];

            // when
            let result = points.dedup_with_margin(1);

            // then
            assert_eq!(result, vec![Position::new(0, 0), Position::new(100, 0), Position::new(0, 100)]);
        }

        #[test]
        fn test_dedup_with_margin_short_list() {
            let points = vec![Position::new(5, 5)];
            assert_eq!(points.clone().dedup_with_margin(10), points);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(360.0, 0.0)]
    #[case(-90.0, 270.0)]
    #[case(450.0, 90.0)]
    #[case(-720.0, 0.0)]
    pub fn test_angle_normalized(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(Angle::from_degrees(input).normalized().degrees(), expected);
    }

    #[rstest]
    #[case(0.0, true, false)]
    #[case(90.0, true, true)]
    #[case(180.0, true, false)]
    #[case(-90.0, true, true)]
    #[case(45.0, false, false)]
    #[case(90.000_000_001, true, true)]
    #[case(-1e-9, true, false)]
    #[case(0.001, false, false)]
    pub fn test_angle_cardinal(#[case] degrees: f64, #[case] cardinal: bool, #[case] cardinal_90: bool) {
        let angle = Angle::from_degrees(degrees);
        assert_eq!(angle.is_cardinal(), cardinal);
        assert_eq!(angle.is_cardinal_90(), cardinal_90);
    }

    #[rstest]
    #[case(0.5, 1)]
    #[case(-0.5, -1)]
    #[case(1.49, 1)]
    #[case(-2.5, -3)]
    #[case(0.0, 0)]
    pub fn test_ki_round_half_away_from_zero(#[case] input: f64, #[case] expected: i64) {
        assert_eq!(ki_round(input), expected);
    }

    #[test]
    pub fn test_rotate_vector_cardinal() {
        // given
        let vector = Vector::new(100, 50);

        // then
        assert_eq!(rotate_vector(vector, Angle::ZERO), vector);
        assert_eq!(rotate_vector(vector, Angle::DEGREES_90), Vector::new(50, -100));
        assert_eq!(rotate_vector(vector, Angle::DEGREES_180), Vector::new(-100, -50));
        assert_eq!(rotate_vector(vector, Angle::from_degrees(270.0)), Vector::new(-50, 100));
    }

    #[test]
    pub fn test_rotate_vector_45_degrees() {
        let rotated = rotate_vector(Vector::new(1000, 0), Angle::from_degrees(45.0));
        assert_eq!(rotated, Vector::new(707, -707));
    }

    #[rstest]
    #[case(30.0, 30.000_000_001)]
    #[case(0.0, -1e-9)]
    #[case(0.0, 359.999_999_999)]
    #[case(-90.0, 270.000_000_2)]
    pub fn test_snapped_rotations_ignore_noise(#[case] a: f64, #[case] b: f64) {
        // given
        let a = Angle::from_degrees(a);
        let b = Angle::from_degrees(b);

        // then
        assert_ne!(a, b);
        assert_eq!(a.snapped(), b.snapped());
        assert_eq!(a.micro_degrees(), b.micro_degrees());
    }

    #[test]
    pub fn test_snapped_keeps_written_precision() {
        assert_ne!(Angle::from_degrees(30.0).snapped(), Angle::from_degrees(30.000_001).snapped());
        assert_eq!(Angle::from_degrees(30.000_001).micro_degrees(), 30_000_001);
    }

    #[test]
    pub fn test_invert() {
        assert_eq!(Position::new(3, 4).invert_x(), Position::new(-3, 4));
        assert_eq!(Vector::new(3, 4).invert_x(), Vector::new(-3, 4));
    }
}
