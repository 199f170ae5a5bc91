use crate::geometry::Contour;
use crate::spacial::deduplicate::DedupTolerance;
use crate::spacial::{ki_round, Position, Size, Vector};

/// Segments used to approximate a full circle when a rounded corner becomes a polygon.
pub const SEGMENTS_PER_CIRCLE: usize = 32;

/// Which corners of a rectangle are chamfered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChamferCorners(u8);

impl ChamferCorners {
    pub const NONE: ChamferCorners = ChamferCorners(0);
    pub const TOP_LEFT: ChamferCorners = ChamferCorners(1);
    pub const TOP_RIGHT: ChamferCorners = ChamferCorners(2);
    pub const BOTTOM_LEFT: ChamferCorners = ChamferCorners(4);
    pub const BOTTOM_RIGHT: ChamferCorners = ChamferCorners(8);
    pub const ALL: ChamferCorners = ChamferCorners(15);

    pub fn contains(self, other: ChamferCorners) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self.contains(Self::ALL)
    }
}

impl core::ops::BitOr for ChamferCorners {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        ChamferCorners((self.0 | rhs.0) & Self::ALL.0)
    }
}

/// Corner order used by the rectangle helpers, clockwise on the board starting top-left.
/// Each entry is the corner flag and the corner direction (host Y axis points down).
const CORNERS: [(ChamferCorners, i64, i64); 4] = [
    (ChamferCorners::TOP_LEFT, -1, -1),
    (ChamferCorners::TOP_RIGHT, 1, -1),
    (ChamferCorners::BOTTOM_RIGHT, 1, 1),
    (ChamferCorners::BOTTOM_LEFT, -1, 1),
];

/// The four corners of a rectangle centred on the origin.
pub fn rect_corners(size: Size) -> [Position; 4] {
    let half = Vector::new(size.x / 2, size.y / 2);
    CORNERS.map(|(_, sx, sy)| Position::new(sx * half.x, sy * half.y))
}

/// Outline of a rectangle centred on the origin with chamfered and/or rounded corners.
///
/// Chamfered corners are cut by `chamfer_ratio * min(width, height)`, the other corners are
/// rounded with `radius`, each arc approximated with a quarter of `SEGMENTS_PER_CIRCLE` segments.
/// Points that end up coincident (e.g. a chamfer of half the side) are merged.
pub fn chamfered_rect_outline(
    size: Size,
    radius: i64,
    chamfer_ratio: f64,
    chamfered: ChamferCorners,
) -> Vec<Position> {
    let half = Vector::new(size.x / 2, size.y / 2);
    let chamfer = ki_round(chamfer_ratio.clamp(0.0, 0.5) * size.x.min(size.y) as f64);
    let radius = radius.clamp(0, half.x.min(half.y));
    let arc_segments = SEGMENTS_PER_CIRCLE / 4;

    let mut outline = Vec::new();
    for (flag, sx, sy) in CORNERS {
        let corner = Position::new(sx * half.x, sy * half.y);

        // walking clockwise, the edge before a corner is vertical on the left/right sides when
        // sx == sy, horizontal otherwise
        let vertical_first = sx == sy;

        if chamfered.contains(flag) && chamfer > 0 {
            let along_x = Vector::new(-sx * chamfer, 0);
            let along_y = Vector::new(0, -sy * chamfer);
            let (first, second) = match vertical_first {
                true => (along_y, along_x),
                false => (along_x, along_y),
            };
            outline.push(corner + first);
            outline.push(corner + second);
        } else if radius > 0 {
            let center = corner - Vector::new(sx * radius, sy * radius);
            // angle of the corner direction, Y axis down
            let start_degrees: f64 = match (sx, sy) {
                (-1, -1) => 180.0,
                (1, -1) => 270.0,
                (1, 1) => 0.0,
                _ => 90.0,
            };
            for step in 0..=arc_segments {
                let angle = (start_degrees + 90.0 * step as f64 / arc_segments as f64).to_radians();
                outline.push(Position::new(
                    center.x + ki_round(radius as f64 * angle.cos()),
                    center.y + ki_round(radius as f64 * angle.sin()),
                ));
            }
        } else {
            outline.push(corner);
        }
    }

    let mut outline = outline.dedup_with_margin(0);
    if outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }
    outline
}

/// Closed contour of a rounded rectangle centred on the origin: four sides and four
/// quarter-circle arcs.
pub fn round_rect_contour(size: Size, radius: i64) -> Contour {
    let half = Vector::new(size.x / 2, size.y / 2);
    let radius = radius.clamp(0, half.x.min(half.y));

    if radius == 0 {
        return Contour::from_polygon(&rect_corners(size));
    }

    let diagonal = ki_round(radius as f64 * std::f64::consts::FRAC_1_SQRT_2);

    // starts where the top-left arc ends, then walks the corners clockwise back to it
    let mut contour = Contour::new(Position::new(-half.x + radius, -half.y));
    for (_, sx, sy) in CORNERS.iter().cycle().skip(1).take(4) {
        let (sx, sy) = (*sx, *sy);
        let center = Position::new(sx * (half.x - radius), sy * (half.y - radius));

        let on_horizontal_side = center + Vector::new(0, sy * radius);
        let on_vertical_side = center + Vector::new(sx * radius, 0);
        let (arc_start, arc_end) = match sx == sy {
            true => (on_vertical_side, on_horizontal_side),
            false => (on_horizontal_side, on_vertical_side),
        };

        contour.line_to(arc_start);
        contour.arc_to(center + Vector::new(sx * diagonal, sy * diagonal), arc_end);
    }
    contour
}

/// True if every turn along the polygon goes the same way; collinear edges are allowed.
pub fn is_convex(vertices: &[Position]) -> bool {
    if vertices.len() < 3 {
        return true;
    }

    let n = vertices.len();
    let mut sign = 0;

    for i in 0..n {
        let p1 = vertices[i];
        let p2 = vertices[(i + 1) % n];
        let p3 = vertices[(i + 2) % n];

        let v1 = p2 - p1;
        let v2 = p3 - p2;

        // Cross product in 2D
        let cross = v1.x as i128 * v2.y as i128 - v1.y as i128 * v2.x as i128;

        if cross == 0 {
            continue;
        }
        if sign == 0 {
            sign = if cross > 0 { 1 } else { -1 };
        } else if (cross > 0 && sign < 0) || (cross < 0 && sign > 0) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::geometry::Segment;

    #[test]
    pub fn test_fully_chamfered_square_becomes_diamond() {
        // when
        let outline = chamfered_rect_outline(Size::new(1000, 1000), 0, 0.5, ChamferCorners::ALL);

        // then
        assert_eq!(
            outline,
            vec![
                Position::new(-500, 0),
                Position::new(0, -500),
                Position::new(500, 0),
                Position::new(0, 500),
            ]
        );
        assert!(is_convex(&outline));
    }

    #[rstest]
    #[case(ChamferCorners::TOP_LEFT, 5)]
    #[case(ChamferCorners::TOP_LEFT | ChamferCorners::BOTTOM_RIGHT, 6)]
    #[case(ChamferCorners::ALL, 8)]
    pub fn test_chamfer_corner_counts(#[case] chamfered: ChamferCorners, #[case] expected: usize) {
        let outline = chamfered_rect_outline(Size::new(2000, 1000), 0, 0.25, chamfered);
        assert_eq!(outline.len(), expected);
        assert!(is_convex(&outline));
    }

    #[test]
    pub fn test_rounded_and_chamfered_corners() {
        // given
        let arc_points = SEGMENTS_PER_CIRCLE / 4 + 1;

        // when
        let outline = chamfered_rect_outline(Size::new(2000, 1000), 100, 0.2, ChamferCorners::TOP_RIGHT);

        // then
        assert_eq!(outline.len(), 3 * arc_points + 2);
        assert!(outline.contains(&Position::new(800, -500)));
        assert!(outline.contains(&Position::new(1000, -300)));
        assert!(is_convex(&outline));
    }

    #[test]
    pub fn test_is_convex_rejects_dent() {
        let dented = [
            Position::new(0, 0),
            Position::new(100, 0),
            Position::new(50, 20),
            Position::new(100, 100),
            Position::new(0, 100),
        ];
        assert!(!is_convex(&dented));
    }

    #[test]
    pub fn test_round_rect_contour() {
        // when
        let contour = round_rect_contour(Size::new(2000, 1000), 200);

        // then
        assert!(contour.is_closed());
        assert_eq!(contour.start, Position::new(-800, -500));
        assert_eq!(contour.segments.len(), 8);
        assert_eq!(contour.segments[0], Segment::Line(Position::new(800, -500)));
        assert_eq!(
            contour.segments[1],
            Segment::Arc {
                mid: Position::new(941, -441),
                end: Position::new(1000, -300),
            }
        );
    }

    #[test]
    pub fn test_round_rect_contour_without_straight_sides() {
        // a circle: every side has zero length
        let contour = round_rect_contour(Size::new(1000, 1000), 500);

        assert!(contour.is_closed());
        assert!(contour
            .segments
            .iter()
            .all(|segment| matches!(segment, Segment::Arc { .. })));
    }

    #[test]
    pub fn test_rect_corners() {
        assert_eq!(
            rect_corners(Size::new(200, 100)),
            [
                Position::new(-100, -50),
                Position::new(100, -50),
                Position::new(100, 50),
                Position::new(-100, 50),
            ]
        );
    }
}
