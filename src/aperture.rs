use std::collections::BTreeSet;

use log::trace;

use crate::attributes::ApertureFunction;
use crate::macros::{corners_match, FreePolygonLibrary, MacroFamily, FREE_POLYGON_BASENAME};
use crate::spacial::{rotate_vector, Angle, Position, Size, Vector};
use crate::units::{format_parameter, UnitConverter};

/// The first D-code available for apertures; D00 to D09 are reserved.
pub const FIRST_DCODE: u32 = 10;

/// Smallest half size of a round-rect body, in nanometres.
const MIN_ROUND_RECT_HALF_SIZE_NM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonOutline {
    /// Relative to the aperture origin, unrotated, in internal units.
    pub corners: Vec<Position>,
    pub rotation: Angle,
}

impl PolygonOutline {
    pub fn is_similar(&self, other: &PolygonOutline, margin: i64) -> bool {
        self.rotation.micro_degrees() == other.rotation.micro_degrees()
            && corners_match(&self.corners, &other.corners, margin)
    }
}

/// The geometry of an aperture, sizes in internal units.
#[derive(Debug, Clone, PartialEq)]
pub enum ApertureShape {
    Circle { diameter: i64 },
    /// Pen used to stroke tracks and outlines.
    Plotting { width: i64 },
    Rect { size: Size },
    Oval { size: Size },
    RegularPolygon { diameter: i64, vertices: u8, rotation: Angle },
    RoundRect { size: Size, radius: i64, rotation: Angle },
    /// `size.x` is the full length and must not be smaller than `size.y`, the width.
    RotatedOval { size: Size, rotation: Angle },
    RotatedRect { size: Size, rotation: Angle },
    /// 4 to 8 corners, written with the matching `Outline<n>P` macro.
    Outline(PolygonOutline),
    FreePolygon(PolygonOutline),
}

impl ApertureShape {
    /// Matching rule of the aperture table.
    ///
    /// Polygon shapes compare corners within `margin`; every other shape compares exactly.
    /// Rotations are compared at the precision they are written with.
    pub fn matches(&self, other: &ApertureShape, margin: i64) -> bool {
        match (self, other) {
            (ApertureShape::Outline(a), ApertureShape::Outline(b))
            | (ApertureShape::FreePolygon(a), ApertureShape::FreePolygon(b)) => a.is_similar(b, margin),
            (ApertureShape::Outline(_) | ApertureShape::FreePolygon(_), _)
            | (_, ApertureShape::Outline(_) | ApertureShape::FreePolygon(_)) => false,
            _ => self.snapped() == other.snapped(),
        }
    }

    /// The same shape with its rotation rounded to the written precision.
    pub fn snapped(&self) -> ApertureShape {
        let mut shape = self.clone();
        match &mut shape {
            ApertureShape::RegularPolygon { rotation, .. }
            | ApertureShape::RoundRect { rotation, .. }
            | ApertureShape::RotatedOval { rotation, .. }
            | ApertureShape::RotatedRect { rotation, .. } => *rotation = rotation.snapped(),
            ApertureShape::Outline(outline) | ApertureShape::FreePolygon(outline) => {
                outline.rotation = outline.rotation.snapped()
            }
            _ => {}
        }
        shape
    }

    /// The fixed macro family the shape is written with, if any.
    pub fn macro_family(&self) -> Option<MacroFamily> {
        match self {
            ApertureShape::RoundRect { .. } => Some(MacroFamily::RoundRect),
            ApertureShape::RotatedOval { .. } => Some(MacroFamily::RotatedOval),
            ApertureShape::RotatedRect { .. } => Some(MacroFamily::RotatedRect),
            ApertureShape::Outline(outline) => {
                let family = MacroFamily::outline(outline.corners.len());
                assert!(
                    family.is_some(),
                    "outline aperture needs 4 to 8 corners, got {}",
                    outline.corners.len()
                );
                family
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    pub dcode: u32,
    pub shape: ApertureShape,
    pub function: Option<ApertureFunction>,
    /// Id of the free polygon macro, for `ApertureShape::FreePolygon`.
    pub free_polygon: Option<usize>,
}

impl Aperture {
    /// The parameter part of the `%ADD` statement, after the D-code, e.g. `C,0.100000`.
    pub fn template(&self, converter: &UnitConverter) -> String {
        let size = |length: i64| format_parameter(converter.to_physical(length));
        let coordinates = |corner: Vector| {
            format!(
                "{}X{}",
                format_parameter(converter.to_physical(corner.x)),
                format_parameter(-converter.to_physical(corner.y))
            )
        };

        match &self.shape {
            ApertureShape::Circle {
                diameter,
            } => format!("C,{}", size(*diameter)),
            ApertureShape::Plotting {
                width,
            } => format!("C,{}", size(*width)),
            ApertureShape::Rect {
                size: rect,
            } => format!("R,{}X{}", size(rect.x), size(rect.y)),
            ApertureShape::Oval {
                size: oval,
            } => format!("O,{}X{}", size(oval.x), size(oval.y)),
            ApertureShape::RegularPolygon {
                diameter,
                vertices,
                rotation,
            } => format!(
                "P,{}X{}X{}",
                size(*diameter),
                vertices,
                format_parameter(rotation.normalized().degrees())
            ),
            ApertureShape::RoundRect {
                size: rect,
                radius,
                rotation,
            } => {
                // the macro wants the centres of the four corner circles
                let min_half_size = converter.iu_from_nanometres(MIN_ROUND_RECT_HALF_SIZE_NM);
                let half_x = (rect.x / 2 - radius).max(min_half_size);
                let half_y = (rect.y / 2 - radius).max(min_half_size);

                let corners = [
                    Vector::new(-half_x, -half_y),
                    Vector::new(half_x, -half_y),
                    Vector::new(half_x, half_y),
                    Vector::new(-half_x, half_y),
                ]
                .map(|corner| coordinates(rotate_vector(corner, *rotation)));

                format!("{},{}X{}", MacroFamily::RoundRect.name(), size(*radius), corners.join("X"))
            }
            ApertureShape::RotatedOval {
                size: oval,
                rotation,
            } => {
                // centres of the two rounded ends
                let half_segment = (oval.x - oval.y) / 2;
                let start = rotate_vector(Vector::new(half_segment, 0), *rotation);
                let end = rotate_vector(Vector::new(-half_segment, 0), *rotation);

                format!(
                    "{},{}X{}X{}",
                    MacroFamily::RotatedOval.name(),
                    size(oval.y),
                    coordinates(start),
                    coordinates(end)
                )
            }
            ApertureShape::RotatedRect {
                size: rect,
                rotation,
            } => format!(
                "{},{}X{}X{}",
                MacroFamily::RotatedRect.name(),
                size(rect.x),
                size(rect.y),
                format_parameter(rotation.normalized().degrees())
            ),
            ApertureShape::Outline(outline) => {
                let family = self.shape.macro_family().map(MacroFamily::name).unwrap_or_default();
                let mut template = format!("{},", family);
                for corner in &outline.corners {
                    template.push_str(&coordinates(corner.coords));
                    template.push('X');
                }
                template.push_str(&format_parameter(outline.rotation.normalized().degrees()));
                template
            }
            ApertureShape::FreePolygon(outline) => format!(
                "{}{},{}",
                FREE_POLYGON_BASENAME,
                self.free_polygon.unwrap_or_default(),
                format_parameter(outline.rotation.normalized().degrees())
            ),
        }
    }

    /// `%ADD<dcode><template>*%`
    pub fn definition(&self, converter: &UnitConverter) -> String {
        format!("%ADD{}{}*%", self.dcode, self.template(converter))
    }
}

/// Deduplicating registry of the apertures used by one plot.
#[derive(Debug)]
pub struct ApertureTable {
    apertures: Vec<Aperture>,
    free_polygons: FreePolygonLibrary,
    used_families: BTreeSet<MacroFamily>,
    margin: i64,
}

impl ApertureTable {
    pub fn new(margin: i64) -> Self {
        Self {
            apertures: Vec::new(),
            free_polygons: FreePolygonLibrary::new(margin),
            used_families: BTreeSet::new(),
            margin,
        }
    }

    /// True if the aperture at `index` has this shape and function.
    pub fn matches(&self, index: usize, shape: &ApertureShape, function: Option<&ApertureFunction>) -> bool {
        self.apertures
            .get(index)
            .is_some_and(|aperture| aperture.function.as_ref() == function && aperture.shape.matches(shape, self.margin))
    }

    pub fn find(&self, shape: &ApertureShape, function: Option<&ApertureFunction>) -> Option<usize> {
        (0..self.apertures.len()).find(|&index| self.matches(index, shape, function))
    }

    /// Index of the matching aperture, creating it with the next D-code if needed.
    pub fn get_or_create(&mut self, shape: ApertureShape, function: Option<ApertureFunction>) -> usize {
        let shape = shape.snapped();
        if let Some(index) = self.find(&shape, function.as_ref()) {
            return index;
        }

        let free_polygon = match &shape {
            ApertureShape::FreePolygon(outline) => Some(self.free_polygons.find_or_append(&outline.corners)),
            _ => None,
        };

        if let Some(family) = shape.macro_family() {
            self.used_families.insert(family);
        }

        let dcode = self
            .apertures
            .last()
            .map_or(FIRST_DCODE, |aperture| aperture.dcode + 1);

        trace!("new aperture. dcode: {}, shape: {:?}, function: {:?}", dcode, shape, function);

        self.apertures.push(Aperture {
            dcode,
            shape,
            function,
            free_polygon,
        });

        self.apertures.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Aperture> {
        self.apertures.get(index)
    }

    pub fn apertures(&self) -> &[Aperture] {
        &self.apertures
    }

    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }

    /// Macro families used so far, in file order.
    pub fn used_families(&self) -> impl Iterator<Item = MacroFamily> + '_ {
        self.used_families.iter().copied()
    }

    pub fn free_polygons(&self) -> &FreePolygonLibrary {
        &self.free_polygons
    }

    pub fn has_macros(&self) -> bool {
        !self.used_families.is_empty() || !self.free_polygons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::units::{CoordinateFormat, Viewport};

    fn converter() -> UnitConverter {
        UnitConverter::new(CoordinateFormat::new(false, 6).unwrap(), Viewport::default())
    }

    fn outline(corners: Vec<Position>, rotation: f64) -> PolygonOutline {
        PolygonOutline {
            corners,
            rotation: Angle::from_degrees(rotation),
        }
    }

    fn trapezoid() -> Vec<Position> {
        vec![
            Position::new(-1000, 500),
            Position::new(-500, -500),
            Position::new(500, -500),
            Position::new(1000, 500),
        ]
    }

    #[test]
    pub fn test_dcodes_start_at_10_and_increment() {
        // given
        let mut table = ApertureTable::new(2);

        // when
        let first = table.get_or_create(ApertureShape::Circle { diameter: 100 }, None);
        let second = table.get_or_create(ApertureShape::Rect { size: Size::new(100, 200) }, None);
        let again = table.get_or_create(ApertureShape::Circle { diameter: 100 }, None);
        let third = table.get_or_create(ApertureShape::Circle { diameter: 100 }, Some(ApertureFunction::ViaPad));

        // then
        assert_eq!((first, second, again, third), (0, 1, 0, 2));
        let dcodes = table.apertures().iter().map(|aperture| aperture.dcode).collect::<Vec<_>>();
        assert_eq!(dcodes, vec![10, 11, 12]);
    }

    #[test]
    pub fn test_circle_and_plotting_pen_are_distinct() {
        let mut table = ApertureTable::new(2);
        let circle = table.get_or_create(ApertureShape::Circle { diameter: 100 }, None);
        let pen = table.get_or_create(ApertureShape::Plotting { width: 100 }, None);
        assert_ne!(circle, pen);
    }

    #[test]
    pub fn test_outline_matches_within_margin_only() {
        // given
        let mut table = ApertureTable::new(2);
        let index = table.get_or_create(ApertureShape::Outline(outline(trapezoid(), 30.0)), None);

        // when
        let mut close = trapezoid();
        close[0].x += 2;
        let mut far = trapezoid();
        far[0].x += 3;

        // then
        assert_eq!(table.find(&ApertureShape::Outline(outline(close, 30.0)), None), Some(index));
        assert_eq!(table.find(&ApertureShape::Outline(outline(far, 30.0)), None), None);
        assert_eq!(table.find(&ApertureShape::Outline(outline(trapezoid(), 31.0)), None), None);
        assert_eq!(table.find(&ApertureShape::FreePolygon(outline(trapezoid(), 30.0)), None), None);
    }

    #[rstest]
    #[case(30.0, 30.000_000_001)]
    #[case(0.0, 360.0)]
    #[case(15.0, 15.0 + 1e-12)]
    pub fn test_rotation_noise_reuses_aperture(#[case] first: f64, #[case] second: f64) {
        // given
        let mut table = ApertureTable::new(2);
        let rotated_rect = |degrees: f64| ApertureShape::RotatedRect {
            size: Size::new(2_000_000, 1_000_000),
            rotation: Angle::from_degrees(degrees),
        };

        // when
        let a = table.get_or_create(rotated_rect(first), None);
        let b = table.get_or_create(rotated_rect(second), None);
        let outline_a = table.get_or_create(ApertureShape::Outline(outline(trapezoid(), first)), None);
        let outline_b = table.get_or_create(ApertureShape::Outline(outline(trapezoid(), second)), None);

        // then
        assert_eq!(a, b);
        assert_eq!(outline_a, outline_b);
        assert_eq!(table.len(), 2);
        assert!(table.matches(a, &rotated_rect(second), None));
    }

    #[test]
    pub fn test_macro_families_are_recorded() {
        // given
        let mut table = ApertureTable::new(2);

        // when
        table.get_or_create(ApertureShape::Circle { diameter: 100 }, None);
        assert!(!table.has_macros());
        table.get_or_create(
            ApertureShape::RotatedRect {
                size: Size::new(100, 50),
                rotation: Angle::from_degrees(30.0),
            },
            None,
        );
        table.get_or_create(
            ApertureShape::RoundRect {
                size: Size::new(100, 50),
                radius: 10,
                rotation: Angle::ZERO,
            },
            None,
        );

        // then
        assert_eq!(
            table.used_families().collect::<Vec<_>>(),
            vec![MacroFamily::RoundRect, MacroFamily::RotatedRect]
        );
    }

    #[test]
    pub fn test_free_polygons_share_macro_across_rotations() {
        // given
        let mut table = ApertureTable::new(2);

        // when
        let a = table.get_or_create(ApertureShape::FreePolygon(outline(trapezoid(), 0.0)), None);
        let b = table.get_or_create(ApertureShape::FreePolygon(outline(trapezoid(), 90.0)), None);

        // then
        assert_ne!(a, b);
        assert_eq!(table.free_polygons().len(), 1);
        assert_eq!(table.get(a).unwrap().free_polygon, Some(0));
        assert_eq!(table.get(b).unwrap().free_polygon, Some(0));
    }

    #[test]
    #[should_panic(expected = "4 to 8 corners")]
    pub fn test_outline_with_too_few_corners_panics() {
        let mut table = ApertureTable::new(2);
        table.get_or_create(ApertureShape::Outline(outline(trapezoid()[..3].to_vec(), 0.0)), None);
    }

    #[rstest]
    #[case(ApertureShape::Circle { diameter: 1_000_000 }, "%ADD10C,1.000000*%")]
    #[case(ApertureShape::Plotting { width: 150_000 }, "%ADD10C,0.150000*%")]
    #[case(ApertureShape::Rect { size: Size::new(2_000_000, 1_000_000) }, "%ADD10R,2.000000X1.000000*%")]
    #[case(ApertureShape::Oval { size: Size::new(1_500_000, 800_000) }, "%ADD10O,1.500000X0.800000*%")]
    #[case(
        ApertureShape::RegularPolygon { diameter: 1_000_000, vertices: 6, rotation: Angle::from_degrees(30.0) },
        "%ADD10P,1.000000X6X30.000000*%"
    )]
    #[case(
        ApertureShape::RotatedRect { size: Size::new(2_000_000, 1_000_000), rotation: Angle::from_degrees(-45.0) },
        "%ADD10RotRect,2.000000X1.000000X315.000000*%"
    )]
    #[case(
        ApertureShape::RoundRect { size: Size::new(2_000_000, 1_000_000), radius: 200_000, rotation: Angle::ZERO },
        "%ADD10RoundRect,0.200000X-0.800000X0.300000X0.800000X0.300000X0.800000X-0.300000X-0.800000X-0.300000*%"
    )]
    #[case(
        ApertureShape::RotatedOval { size: Size::new(2_000_000, 1_000_000), rotation: Angle::DEGREES_90 },
        "%ADD10HorizOval,1.000000X0.000000X0.500000X0.000000X-0.500000*%"
    )]
    pub fn test_definitions(#[case] shape: ApertureShape, #[case] expected: &str) {
        // given
        let mut table = ApertureTable::new(2);
        let index = table.get_or_create(shape, None);

        // when
        let definition = table.get(index).unwrap().definition(&converter());

        // then
        assert_eq!(definition, expected);
    }

    #[test]
    pub fn test_outline_definition_negates_y() {
        let mut table = ApertureTable::new(2);
        let index = table.get_or_create(ApertureShape::Outline(outline(trapezoid(), 90.0)), None);

        assert_eq!(
            table.get(index).unwrap().definition(&converter()),
            "%ADD10Outline4P,-0.001000X-0.000500X-0.000500X0.000500X0.000500X0.000500X0.001000X-0.000500X90.000000*%"
        );
    }

    #[test]
    pub fn test_round_rect_half_size_never_degenerates() {
        // given
        // radius equals half the height, the body would have no height
        let mut table = ApertureTable::new(2);
        let index = table.get_or_create(
            ApertureShape::RoundRect {
                size: Size::new(2_000_000, 1_000_000),
                radius: 500_000,
                rotation: Angle::ZERO,
            },
            None,
        );

        // when
        let definition = table.get(index).unwrap().definition(&converter());

        // then
        assert_eq!(
            definition,
            "%ADD10RoundRect,0.500000X-0.500000X0.000010X0.500000X0.000010X0.500000X-0.000010X-0.500000X-0.000010*%"
        );
    }
}
