use gerber_types::{Command, CoordinateNumber, CoordinateOffset, Coordinates, Unit};

use crate::error::PlotError;
use crate::spacial::{ki_round, DevicePosition, Position};

/// Internal units per decimil when internal units are nanometres.
pub const NANOMETRES_PER_DECIMIL: f64 = 2540.0;

/// Fixed-point coordinate format of the file: `%FSLA<leading><resolution>...`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFormat {
    pub unit: Unit,
    /// Digits after the decimal point.
    pub resolution: u8,
}

impl CoordinateFormat {
    pub const MIN_RESOLUTION: u8 = 4;
    pub const MAX_RESOLUTION: u8 = 6;

    pub fn new(use_inches: bool, resolution: u8) -> Result<Self, PlotError> {
        if !(Self::MIN_RESOLUTION..=Self::MAX_RESOLUTION).contains(&resolution) {
            return Err(PlotError::InvalidResolution {
                digits: resolution,
            });
        }

        let unit = match use_inches {
            true => Unit::Inches,
            false => Unit::Millimeters,
        };

        Ok(Self {
            unit,
            resolution,
        })
    }

    /// The integer part digit count; only informative when leading zeros are omitted.
    pub fn leading_digits(&self) -> u8 {
        match self.unit {
            Unit::Inches => 3,
            Unit::Millimeters => 4,
        }
    }

    pub fn unit_name(&self) -> &'static str {
        match self.unit {
            Unit::Inches => "inch",
            Unit::Millimeters => "mm",
        }
    }

    pub fn gerber_format(&self) -> gerber_types::CoordinateFormat {
        gerber_types::CoordinateFormat::new(self.leading_digits(), self.resolution)
    }

    /// `%FSLAX46Y46*%`
    pub fn format_command(&self) -> Command {
        self.gerber_format().into()
    }

    /// `%MOMM*%` or `%MOIN*%`
    pub fn unit_command(&self) -> Command {
        self.unit.into()
    }

    /// A quantized device value; `gerber_types` keeps six decimals, so this is exact.
    fn number(&self, device: i64) -> CoordinateNumber {
        CoordinateNumber::new(device * 10i64.pow(6u32.saturating_sub(self.resolution as u32)))
    }

    /// The `X<x>Y<y>` words of an operation.
    pub fn coordinates(&self, (x, y): (i64, i64)) -> Coordinates {
        Coordinates::new(self.number(x), self.number(y), self.gerber_format())
    }

    /// The `I<i>J<j>` words of an arc, relative to its start.
    pub fn offset(&self, (i, j): (i64, i64)) -> CoordinateOffset {
        CoordinateOffset::new(self.number(i), self.number(j), self.gerber_format())
    }

    /// Human readable description, written as a `G04` comment.
    pub fn describe(&self) -> String {
        format!(
            "Gerber Fmt {}.{}, Leading zero omitted, Abs format (unit {})",
            self.leading_digits(),
            self.resolution,
            self.unit_name()
        )
    }
}

/// Maps internal units to device units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Subtracted from every coordinate before scaling.
    pub offset: Position,
    pub ius_per_decimil: f64,
    pub scale: f64,
    /// Horizontal mirror, device X is negated.
    pub mirror: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Position::new(0, 0),
            ius_per_decimil: NANOMETRES_PER_DECIMIL,
            scale: 1.0,
            mirror: false,
        }
    }
}

impl Viewport {
    pub fn validate(&self) -> Result<(), PlotError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(PlotError::InvalidScale(self.scale));
        }
        if !(self.ius_per_decimil.is_finite() && self.ius_per_decimil > 0.0) {
            return Err(PlotError::InvalidScale(self.ius_per_decimil));
        }
        Ok(())
    }
}

/// Converts internal units to quantized device coordinates and physical aperture sizes.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter {
    format: CoordinateFormat,
    viewport: Viewport,
    /// Device units per internal unit, plot scale included.
    device_per_iu: f64,
    /// Inches or millimetres per internal unit, plot scale included.
    physical_per_iu: f64,
}

impl UnitConverter {
    pub fn new(format: CoordinateFormat, viewport: Viewport) -> Self {
        let mut device_per_iu = 10f64.powi(format.resolution as i32) / (viewport.ius_per_decimil * 10000.0);
        let mut physical_per_iu = 0.0001 / viewport.ius_per_decimil;

        if let Unit::Millimeters = format.unit {
            device_per_iu *= 25.4;
            physical_per_iu *= 25.4;
        }

        Self {
            format,
            viewport,
            device_per_iu: device_per_iu * viewport.scale,
            physical_per_iu: physical_per_iu * viewport.scale,
        }
    }

    pub fn format(&self) -> &CoordinateFormat {
        &self.format
    }

    /// Device coordinates before rounding; the device Y axis points up.
    pub fn to_device(&self, position: Position) -> DevicePosition {
        let x = (position.x - self.viewport.offset.x) as f64 * self.device_per_iu;
        let y = -((position.y - self.viewport.offset.y) as f64) * self.device_per_iu;

        match self.viewport.mirror {
            true => DevicePosition::new(-x, y),
            false => DevicePosition::new(x, y),
        }
    }

    pub fn to_device_rounded(&self, position: Position) -> (i64, i64) {
        let device = self.to_device(position);
        (ki_round(device.x), ki_round(device.y))
    }

    /// Internal units for a physical length in nanometres, plot scale ignored.
    pub fn iu_from_nanometres(&self, nanometres: f64) -> i64 {
        ki_round(nanometres * self.viewport.ius_per_decimil / NANOMETRES_PER_DECIMIL)
    }

    /// A length in device units (e.g. an arc length).
    pub fn length_to_device(&self, length: f64) -> f64 {
        length * self.device_per_iu
    }

    /// A size expressed in the file unit (inch or mm), as used by aperture parameters.
    pub fn to_physical(&self, length: i64) -> f64 {
        length as f64 * self.physical_per_iu
    }
}

/// Format an aperture or macro parameter: fixed six decimals, never exponent form.
pub fn format_parameter(value: f64) -> String {
    let formatted = format!("{:.6}", value);

    // tiny negatives round to zero but keep their sign
    match formatted.strip_prefix('-') {
        Some(magnitude) if magnitude.bytes().all(|digit| matches!(digit, b'0' | b'.')) => magnitude.to_string(),
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use gerber_types::GerberCode;

    use super::*;

    fn serialized(command: Command) -> String {
        let mut output = Vec::new();
        command.serialize(&mut output).unwrap();
        String::from_utf8(output).unwrap().trim_end().to_string()
    }

    fn converter(use_inches: bool, resolution: u8, viewport: Viewport) -> UnitConverter {
        UnitConverter::new(CoordinateFormat::new(use_inches, resolution).unwrap(), viewport)
    }

    #[rstest]
    #[case(false, 6, "%FSLAX46Y46*%", "%MOMM*%")]
    #[case(false, 5, "%FSLAX45Y45*%", "%MOMM*%")]
    #[case(true, 6, "%FSLAX36Y36*%", "%MOIN*%")]
    #[case(true, 5, "%FSLAX35Y35*%", "%MOIN*%")]
    pub fn test_statements(
        #[case] use_inches: bool,
        #[case] resolution: u8,
        #[case] expected_format: &str,
        #[case] expected_unit: &str,
    ) {
        let format = CoordinateFormat::new(use_inches, resolution).unwrap();
        assert_eq!(serialized(format.format_command()), expected_format);
        assert_eq!(serialized(format.unit_command()), expected_unit);
    }

    #[rstest]
    #[case(3)]
    #[case(7)]
    pub fn test_invalid_resolution(#[case] resolution: u8) {
        assert!(matches!(
            CoordinateFormat::new(false, resolution),
            Err(PlotError::InvalidResolution { .. })
        ));
    }

    #[test]
    pub fn test_describe() {
        let format = CoordinateFormat::new(false, 6).unwrap();
        assert_eq!(
            format.describe(),
            "Gerber Fmt 4.6, Leading zero omitted, Abs format (unit mm)"
        );
    }

    #[test]
    pub fn test_nanometres_map_one_to_one_in_mm_4_6() {
        // given
        let converter = converter(false, 6, Viewport::default());

        // when
        let (x, y) = converter.to_device_rounded(Position::new(1_000_000, 2_500_000));

        // then
        // 1mm = 1_000_000 device units, Y axis flipped
        assert_eq!((x, y), (1_000_000, -2_500_000));
    }

    #[test]
    pub fn test_inches_4_5() {
        let converter = converter(true, 5, Viewport::default());
        // 25.4mm = 1 inch = 100_000 device units
        assert_eq!(converter.to_device_rounded(Position::new(25_400_000, 0)), (100_000, 0));
    }

    #[test]
    pub fn test_offset_scale_and_mirror() {
        // given
        let viewport = Viewport {
            offset: Position::new(1000, 1000),
            scale: 2.0,
            mirror: true,
            ..Viewport::default()
        };
        let converter = converter(false, 6, viewport);

        // when
        let (x, y) = converter.to_device_rounded(Position::new(1500, 500));

        // then
        assert_eq!((x, y), (-1000, 1000));
    }

    #[test]
    pub fn test_physical_sizes() {
        let metric = converter(false, 6, Viewport::default());
        assert!((metric.to_physical(1_000_000) - 1.0).abs() < 1e-12);

        let imperial = converter(true, 6, Viewport::default());
        assert!((imperial.to_physical(25_400_000) - 1.0).abs() < 1e-12);
    }

    #[rstest]
    #[case(1.0, "1.000000")]
    #[case(-0.0, "0.000000")]
    #[case(0.1234567, "0.123457")]
    #[case(-2.5, "-2.500000")]
    #[case(1e-9, "0.000000")]
    #[case(-1e-9, "0.000000")]
    #[case(-0.0000004, "0.000000")]
    #[case(-0.0000006, "-0.000001")]
    pub fn test_format_parameter(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_parameter(value), expected);
    }

    #[rstest]
    #[case(6, (1_000_000, -2_500_000), "X1000000Y-2500000")]
    #[case(5, (100_000, 0), "X100000Y0")]
    #[case(4, (-15, 7), "X-15Y7")]
    pub fn test_device_coordinates_are_written_unchanged(
        #[case] resolution: u8,
        #[case] device: (i64, i64),
        #[case] expected: &str,
    ) {
        // given
        let format = CoordinateFormat::new(false, resolution).unwrap();
        let operation = gerber_types::Operation::Move(Some(format.coordinates(device)));

        // when
        let written = serialized(gerber_types::DCode::Operation(operation).into());

        // then
        assert_eq!(written, format!("{}D02*", expected));
    }

    #[test]
    pub fn test_viewport_validation() {
        let viewport = Viewport {
            scale: 0.0,
            ..Viewport::default()
        };
        assert!(matches!(viewport.validate(), Err(PlotError::InvalidScale(_))));
        assert!(Viewport::default().validate().is_ok());
    }
}
