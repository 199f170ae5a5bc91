//! Aperture macro bodies: the fixed families and the free polygons generated per plot.

use std::fmt::Write as _;

use log::debug;

use crate::spacial::Position;
use crate::units::format_parameter;

pub const FREE_POLYGON_BASENAME: &str = "FreePoly";

/// Newline after this many coordinate pairs in a free polygon body.
const COORDINATES_PER_LINE: usize = 20;

const ROUND_RECT_BODY: &str = "%AMRoundRect*
0 Rectangle with rounded corners*
0 $1 Rounding radius*
0 $2 $3 $4 $5 $6 $7 $8 $9 X,Y pos of 4 corners*
0 Add a 4 corners polygon primitive as box body*
4,1,4,$2,$3,$4,$5,$6,$7,$8,$9,$2,$3,0*
0 Add four circle primitives for the rounded corners*
1,1,$1+$1,$2,$3*
1,1,$1+$1,$4,$5*
1,1,$1+$1,$6,$7*
1,1,$1+$1,$8,$9*
0 Add four rect primitives between the rounded corners*
20,1,$1+$1,$2,$3,$4,$5,0*
20,1,$1+$1,$4,$5,$6,$7,0*
20,1,$1+$1,$6,$7,$8,$9,0*
20,1,$1+$1,$8,$9,$2,$3,0*%
";

const ROTATED_OVAL_BODY: &str = "%AMHorizOval*
0 Thick line with rounded ends*
0 $1 width*
0 $2 $3 position (X,Y) of the first rounded end (center of the circle)*
0 $4 $5 position (X,Y) of the second rounded end (center of the circle)*
0 Add line between two ends*
20,1,$1,$2,$3,$4,$5,0*
0 Add two circle primitives to create the rounded ends*
1,1,$1,$2,$3*
1,1,$1,$4,$5*%
";

const ROTATED_RECT_BODY: &str = "%AMRotRect*
0 Rectangle, with rotation*
0 The origin of the aperture is its center*
0 $1 length*
0 $2 width*
0 $3 Rotation angle, in degrees counterclockwise*
0 Add horizontal line*
21,1,$1,$2,0,0,$3*%
";

/// A family of aperture macros with a fixed body, written once if any aperture uses it.
///
/// The declaration order is the order the bodies appear in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MacroFamily {
    RoundRect,
    RotatedOval,
    RotatedRect,
    Outline4P,
    Outline5P,
    Outline6P,
    Outline7P,
    Outline8P,
}

impl MacroFamily {
    /// The outline family able to hold `corner_count` corners.
    pub fn outline(corner_count: usize) -> Option<MacroFamily> {
        match corner_count {
            4 => Some(MacroFamily::Outline4P),
            5 => Some(MacroFamily::Outline5P),
            6 => Some(MacroFamily::Outline6P),
            7 => Some(MacroFamily::Outline7P),
            8 => Some(MacroFamily::Outline8P),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MacroFamily::RoundRect => "RoundRect",
            MacroFamily::RotatedOval => "HorizOval",
            MacroFamily::RotatedRect => "RotRect",
            MacroFamily::Outline4P => "Outline4P",
            MacroFamily::Outline5P => "Outline5P",
            MacroFamily::Outline6P => "Outline6P",
            MacroFamily::Outline7P => "Outline7P",
            MacroFamily::Outline8P => "Outline8P",
        }
    }

    fn outline_corner_count(self) -> Option<usize> {
        match self {
            MacroFamily::Outline4P => Some(4),
            MacroFamily::Outline5P => Some(5),
            MacroFamily::Outline6P => Some(6),
            MacroFamily::Outline7P => Some(7),
            MacroFamily::Outline8P => Some(8),
            _ => None,
        }
    }

    /// The complete `%AM...*%` block, newline terminated.
    pub fn body(self) -> String {
        match self {
            MacroFamily::RoundRect => ROUND_RECT_BODY.to_string(),
            MacroFamily::RotatedOval => ROTATED_OVAL_BODY.to_string(),
            MacroFamily::RotatedRect => ROTATED_RECT_BODY.to_string(),
            _ => {
                let corners = self.outline_corner_count().unwrap_or_default();
                outline_body(self.name(), corners)
            }
        }
    }
}

/// `%AMOutline<n>P*`: a primitive 4 outline with `n` corners as parameters, the last
/// parameter being the rotation.
fn outline_body(name: &str, corners: usize) -> String {
    let coordinates = corners * 2;
    let rotation = coordinates + 1;

    let mut body = String::new();
    let _ = writeln!(body, "%AM{}*", name);
    let _ = writeln!(body, "0 Free polygon, {} corners , with rotation*", corners);
    let _ = writeln!(body, "0 The origin of the aperture is its center*");
    let _ = writeln!(body, "0 number of corners: always {}*", corners);
    let _ = writeln!(body, "0 $1 to ${} corner X, Y*", coordinates);
    let _ = writeln!(body, "0 ${} Rotation angle, in degrees counterclockwise*", rotation);
    let _ = writeln!(body, "0 create outline with {} corners*", corners);

    let _ = write!(body, "4,1,{},", corners);
    for parameter in 1..=coordinates {
        let _ = write!(body, "${},", parameter);
    }
    // close the outline on the first corner
    let _ = writeln!(body, "$1,$2,${}*%", rotation);

    body
}

/// A macro generated for one custom pad shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FreePolygonMacro {
    pub id: usize,
    /// Origin centred, unrotated, in internal units.
    pub corners: Vec<Position>,
}

impl FreePolygonMacro {
    pub fn name(&self) -> String {
        format!("{}{}", FREE_POLYGON_BASENAME, self.id)
    }

    /// The `%AMFreePoly<n>*` block; `to_physical` converts internal units to the file unit.
    ///
    /// Y is negated since the host and Gerber Y axes are opposite. The rotation is left as the
    /// `$1` parameter so every orientation of the shape shares the macro.
    pub fn format(&self, to_physical: impl Fn(i64) -> f64) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "%AM{}*", self.name());
        let _ = write!(body, "4,1,{},", self.corners.len());

        let closed = self.corners.iter().chain(self.corners.first());
        for (index, corner) in closed.enumerate() {
            let _ = write!(
                body,
                "{},{},",
                format_parameter(to_physical(corner.x)),
                format_parameter(-to_physical(corner.y))
            );
            if (index + 1) % COORDINATES_PER_LINE == 0 {
                body.push('\n');
            }
        }

        body.push_str("$1*%\n");
        body
    }
}

/// Compare corner lists allowing each coordinate to differ by up to `margin`.
///
/// Rotating a polygon into its canonical frame perturbs coordinates by a few units, which must
/// not produce a distinct shape.
pub fn corners_match(a: &[Position], b: &[Position], margin: i64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(a, b)| (a.x - b.x).abs() <= margin && (a.y - b.y).abs() <= margin)
}

/// The free polygon macros of the current plot.
#[derive(Debug, Default)]
pub struct FreePolygonLibrary {
    macros: Vec<FreePolygonMacro>,
    margin: i64,
}

impl FreePolygonLibrary {
    pub fn new(margin: i64) -> Self {
        Self {
            macros: Vec::new(),
            margin,
        }
    }

    pub fn find(&self, corners: &[Position]) -> Option<usize> {
        self.macros
            .iter()
            .position(|candidate| corners_match(&candidate.corners, corners, self.margin))
    }

    /// Store a normalized corner list, returning its macro id.
    pub fn append(&mut self, corners: Vec<Position>) -> usize {
        let id = self.macros.len();
        debug!("new free polygon macro. id: {}, corners: {}", id, corners.len());
        self.macros.push(FreePolygonMacro {
            id,
            corners,
        });
        id
    }

    pub fn find_or_append(&mut self, corners: &[Position]) -> usize {
        match self.find(corners) {
            Some(id) => id,
            None => self.append(corners.to_vec()),
        }
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn format_all(&self, to_physical: impl Fn(i64) -> f64) -> String {
        self.macros
            .iter()
            .map(|free_polygon| free_polygon.format(&to_physical))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn square(half: i64) -> Vec<Position> {
        vec![
            Position::new(-half, -half),
            Position::new(half, -half),
            Position::new(half, half),
            Position::new(-half, half),
        ]
    }

    #[test]
    pub fn test_outline_4p_body() {
        let expected = "%AMOutline4P*
0 Free polygon, 4 corners , with rotation*
0 The origin of the aperture is its center*
0 number of corners: always 4*
0 $1 to $8 corner X, Y*
0 $9 Rotation angle, in degrees counterclockwise*
0 create outline with 4 corners*
4,1,4,$1,$2,$3,$4,$5,$6,$7,$8,$1,$2,$9*%
";
        assert_eq!(MacroFamily::Outline4P.body(), expected);
    }

    #[test]
    pub fn test_outline_8p_closes_and_rotates() {
        let body = MacroFamily::Outline8P.body();
        assert!(body.starts_with("%AMOutline8P*\n"));
        assert!(body.ends_with("4,1,8,$1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$1,$2,$17*%\n"));
    }

    #[rstest]
    #[case(3, None)]
    #[case(4, Some(MacroFamily::Outline4P))]
    #[case(6, Some(MacroFamily::Outline6P))]
    #[case(8, Some(MacroFamily::Outline8P))]
    #[case(9, None)]
    pub fn test_outline_family_by_corner_count(#[case] corners: usize, #[case] expected: Option<MacroFamily>) {
        assert_eq!(MacroFamily::outline(corners), expected);
    }

    #[test]
    pub fn test_family_order_is_declaration_order() {
        let mut families = vec![MacroFamily::Outline4P, MacroFamily::RoundRect, MacroFamily::RotatedRect];
        families.sort();
        assert_eq!(
            families,
            vec![MacroFamily::RoundRect, MacroFamily::RotatedRect, MacroFamily::Outline4P]
        );
    }

    #[test]
    pub fn test_library_finds_within_margin() {
        // given
        let mut library = FreePolygonLibrary::new(2);
        let id = library.append(square(1000));

        // when
        let mut perturbed = square(1000);
        perturbed[1].x += 2;
        perturbed[3].y -= 1;
        let mut different = square(1000);
        different[2].x += 3;

        // then
        assert_eq!(library.find(&perturbed), Some(id));
        assert_eq!(library.find(&different), None);
        assert_eq!(library.find(&square(1000)[..3]), None);
    }

    #[test]
    pub fn test_find_or_append_assigns_sequential_ids() {
        let mut library = FreePolygonLibrary::new(2);
        assert_eq!(library.find_or_append(&square(100)), 0);
        assert_eq!(library.find_or_append(&square(200)), 1);
        assert_eq!(library.find_or_append(&square(100)), 0);
        assert_eq!(library.len(), 2);
    }

    #[test]
    pub fn test_free_polygon_format() {
        // given
        let free_polygon = FreePolygonMacro {
            id: 3,
            corners: vec![Position::new(0, 0), Position::new(1000, 0), Position::new(0, 500)],
        };

        // when
        let body = free_polygon.format(|length| length as f64 / 1000.0);

        // then
        assert_eq!(
            body,
            "%AMFreePoly3*\n4,1,3,0.000000,0.000000,1.000000,0.000000,0.000000,-0.500000,0.000000,0.000000,$1*%\n"
        );
    }

    #[test]
    pub fn test_free_polygon_format_wraps_every_20_pairs() {
        // given
        let corners = (0..25).map(|index| Position::new(index, 0)).collect::<Vec<_>>();
        let free_polygon = FreePolygonMacro {
            id: 0,
            corners,
        };

        // when
        let body = free_polygon.format(|length| length as f64);

        // then
        let lines = body.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].matches(',').count(), 3 + 20 * 2);
        assert!(lines[2].ends_with("$1*%"));
    }
}
