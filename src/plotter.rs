use std::io::Write;

use gerber_types::{GCode, InterpolationMode, MCode, Polarity};
use log::{debug, info};

use crate::aperture::ApertureTable;
use crate::attributes::{ApertureFunction, AttributeDictionary, AttributeFormat, AttributeRecord, PlotAttributes};
use crate::config::PlotterConfig;
use crate::emitter::{comment, Emitter, Record};
use crate::error::PlotError;
use crate::geometry::{ChamferCorners, CircularArc, Contour, Mirroring};
use crate::pads::{Emission, Pad, PadShape, PadTranslator};
use crate::spacial::{Angle, Position, Size, Vector};
use crate::units::{CoordinateFormat, UnitConverter, Viewport};
use crate::writer::PlotWriter;

/// A configured plotter, ready to start a plot.
#[derive(Debug, Clone)]
pub struct GerberPlotter {
    config: PlotterConfig,
    format: CoordinateFormat,
    viewport: Viewport,
}

impl GerberPlotter {
    pub fn new(config: PlotterConfig) -> Result<Self, PlotError> {
        let format = CoordinateFormat::new(config.use_inches, config.resolution)?;

        Ok(Self {
            config,
            format,
            viewport: Viewport::default(),
        })
    }

    pub fn config(&self) -> &PlotterConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), PlotError> {
        viewport.validate()?;
        self.viewport = viewport;
        Ok(())
    }

    /// Write the file header into a fresh scratch stream; the session owns `output` until
    /// `PlotSession::end_plot`.
    pub fn start_plot<W: Write>(self, output: W) -> PlotSession<W> {
        let converter = UnitConverter::new(self.format, self.viewport);
        let apertures = ApertureTable::new(self.config.polygon_match_margin);
        let mut emitter = Emitter::new(converter, apertures);

        for line in &self.config.header_lines {
            emitter.push(Record::Line(line.clone()));
        }
        emitter.command(self.format.format_command());
        emitter.command(comment(self.format.describe()));
        emitter.command(comment(format!("Created by {}", self.config.creator)));
        emitter.command(self.format.unit_command());
        emitter.command(Polarity::Dark);
        emitter.command(GCode::InterpolationMode(InterpolationMode::Linear));
        emitter.push(Record::ApertureList);

        let translator = PadTranslator {
            macros_enabled: !self.config.disable_aperture_macros,
            max_free_polygon_corners: self.config.max_free_polygon_corners,
            mirroring: Mirroring::horizontal(self.viewport.mirror),
        };

        debug!("plot started. format: {}, viewport: {:?}", self.format.describe(), self.viewport);

        PlotSession {
            attribute_format: AttributeFormat::from_x2(self.config.use_x2_format),
            config: self.config,
            output,
            emitter,
            attributes: AttributeDictionary::default(),
            translator,
        }
    }
}

fn function_of(attributes: Option<&PlotAttributes>) -> Option<ApertureFunction> {
    attributes.and_then(|attributes| attributes.aperture_function.clone())
}

/// One open plot. Coordinates are internal units with the Y axis pointing down.
///
/// Dropping the session without calling `end_plot` discards the plot.
pub struct PlotSession<W: Write> {
    config: PlotterConfig,
    output: W,
    emitter: Emitter,
    attributes: AttributeDictionary,
    attribute_format: AttributeFormat,
    translator: PadTranslator,
}

impl<W: Write> PlotSession<W> {
    pub fn config(&self) -> &PlotterConfig {
        &self.config
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Finish the file: clear object attributes, end it, and write everything to the output.
    pub fn end_plot(mut self) -> Result<W, PlotError> {
        self.clear_object_attributes();
        self.emitter.command(MCode::EndOfFile);

        let (records, apertures, converter) = self.emitter.into_parts();
        PlotWriter::new(&apertures, &converter, self.attribute_format).write(&mut self.output, &records)?;
        self.output.flush()?;

        info!(
            "plot finished. apertures: {}, macro families: {}, free polygon macros: {}",
            apertures.len(),
            apertures.used_families().count(),
            apertures.free_polygons().len()
        );

        Ok(self.output)
    }

    //
    // pen
    //

    pub fn move_to(&mut self, position: Position) {
        self.emitter.move_to(position);
    }

    pub fn line_to(&mut self, position: Position) {
        self.emitter.line_to(position);
    }

    pub fn finish_to(&mut self, position: Position) {
        self.emitter.finish_to(position);
    }

    pub fn pen_finish(&mut self) {
        self.emitter.pen_finish();
    }

    pub fn set_current_line_width(&mut self, width: i64, function: Option<ApertureFunction>) {
        self.emitter.set_line_width(width, function);
    }

    pub fn set_layer_polarity(&mut self, polarity: Polarity) {
        self.emitter.command(polarity);
    }

    //
    // attributes
    //

    pub fn start_block(&mut self) {
        self.clear_object_attributes();
    }

    pub fn end_block(&mut self) {
        self.clear_object_attributes();
    }

    fn push_attribute(&mut self, attribute: AttributeRecord) {
        self.emitter.command(attribute.command(self.attribute_format));
    }

    fn clear_object_attributes(&mut self) {
        if self.attributes.clear() {
            self.push_attribute(AttributeRecord::Delete(None));
        }
    }

    /// Write the object attributes that differ from the active ones.
    fn write_object_attributes(&mut self, attributes: Option<&PlotAttributes>) {
        if !self.config.use_net_attributes {
            return;
        }
        let Some(attributes) = attributes else {
            return;
        };
        let attributes = attributes.object_attributes();
        if attributes.is_empty() {
            return;
        }

        let diff = self.attributes.apply(attributes);
        if diff.clear {
            self.push_attribute(AttributeRecord::Delete(None));
        }
        for (key, value) in diff.changed {
            self.push_attribute(AttributeRecord::Object(key, value));
        }
    }

    //
    // strokes
    //

    pub fn thick_segment(&mut self, start: Position, end: Position, width: i64, attributes: Option<&PlotAttributes>) {
        self.emitter.set_line_width(width, function_of(attributes));
        self.write_object_attributes(attributes);
        self.emitter.move_to(start);
        self.emitter.finish_to(end);
    }

    fn stroke_arc(&mut self, arc: &CircularArc, width: i64, attributes: Option<&PlotAttributes>) {
        self.emitter.set_line_width(width, function_of(attributes));
        self.write_object_attributes(attributes);
        self.emitter.move_to(arc.start);
        self.emitter.arc_to(arc);
        self.emitter.pen_finish();
    }

    /// Arc around `center`, angles counter-clockwise on the board.
    pub fn thick_arc(
        &mut self,
        center: Position,
        start_angle: Angle,
        end_angle: Angle,
        radius: i64,
        width: i64,
        attributes: Option<&PlotAttributes>,
    ) {
        let arc = CircularArc::from_center(center, start_angle, end_angle, radius);
        self.stroke_arc(&arc, width, attributes);
    }

    /// Arc through three points; collinear points draw a straight segment.
    pub fn arc_through(
        &mut self,
        start: Position,
        mid: Position,
        end: Position,
        width: i64,
        attributes: Option<&PlotAttributes>,
    ) {
        match CircularArc::through(start, mid, end) {
            Some(arc) => self.stroke_arc(&arc, width, attributes),
            None => self.thick_segment(start, end, width, attributes),
        }
    }

    pub fn thick_rect(&mut self, corner: Position, opposite: Position, width: i64, attributes: Option<&PlotAttributes>) {
        let contour = Contour::from_polygon(&rect_from_corners(corner, opposite));
        self.stroke_contour(&contour, width, attributes);
    }

    pub fn thick_circle(&mut self, center: Position, diameter: i64, width: i64, attributes: Option<&PlotAttributes>) {
        let arc = CircularArc::from_center(center, Angle::ZERO, Angle::DEGREES_360, diameter / 2);
        self.stroke_arc(&arc, width, attributes);
    }

    /// A filled disc drawn, not flashed: a circle of half the diameter stroked with a pen of
    /// half the diameter.
    pub fn filled_circle(&mut self, center: Position, diameter: i64, attributes: Option<&PlotAttributes>) {
        let half = diameter / 2;
        self.thick_circle(center, half, half, attributes);
    }

    //
    // plain shapes
    //

    pub fn rect(&mut self, corner: Position, opposite: Position, fill: bool, width: i64) {
        let contour = Contour::from_polygon(&rect_from_corners(corner, opposite));
        self.plot_poly(&contour, fill, width, None);
    }

    pub fn circle(&mut self, center: Position, diameter: i64, fill: bool, width: i64) {
        let radius = diameter / 2;
        let start = center + Vector::new(radius, 0);
        let mut contour = Contour::new(start);
        contour.arc_to(center - Vector::new(radius, 0), start);
        self.plot_poly(&contour, fill, width, None);
    }

    /// A filled arc is a pie slice closed on the centre.
    pub fn arc(&mut self, center: Position, start_angle: Angle, end_angle: Angle, radius: i64, fill: bool, width: i64) {
        let arc = CircularArc::from_center(center, start_angle, end_angle, radius);

        let contour = match fill {
            true => {
                let mut contour = Contour::new(center);
                contour.line_to(arc.start).arc_to(arc.mid, arc.end).close();
                contour
            }
            false => {
                let mut contour = Contour::new(arc.start);
                contour.arc_to(arc.mid, arc.end);
                contour
            }
        };
        self.plot_poly(&contour, fill, width, None);
    }

    fn stroke_contour(&mut self, contour: &Contour, width: i64, attributes: Option<&PlotAttributes>) {
        self.emitter.set_line_width(width, function_of(attributes));
        self.write_object_attributes(attributes);
        self.emitter.trace_contour(contour);
        self.emitter.pen_finish();
    }

    /// A polygon or polyline. Filled contours become a region, closed if needed, with an
    /// outline on top when `width` is positive; unfilled contours are stroked as given.
    pub fn plot_poly(&mut self, contour: &Contour, fill: bool, width: i64, attributes: Option<&PlotAttributes>) {
        if contour.segments.is_empty() {
            return;
        }

        let mut closed = contour.clone();
        if fill {
            closed.close();

            self.write_object_attributes(attributes);
            self.emitter.start_region();
            self.emitter.trace_contour(&closed);
            self.emitter.end_region();
        }

        if width > 0 || !fill {
            let outline = match fill {
                true => &closed,
                false => contour,
            };
            self.stroke_contour(outline, width, attributes);
        }
    }

    /// A filled region without outline, carrying the aperture function of `attributes`.
    pub fn plot_region(&mut self, contour: &Contour, attributes: Option<&PlotAttributes>) {
        let function = function_of(attributes);

        if let Some(function) = &function {
            self.push_attribute(AttributeRecord::Aperture(function.clone()));
        }

        self.plot_poly(contour, true, 0, attributes);

        if function.is_some() {
            self.push_attribute(AttributeRecord::Delete(Some(".AperFunction")));
        }
    }

    //
    // pads
    //

    /// Plot a pad as a flash, or as regions when no aperture can represent it.
    pub fn flash_pad(&mut self, pad: &Pad, attributes: Option<&PlotAttributes>) {
        for emission in self.translator.translate(pad) {
            match emission {
                Emission::Flash {
                    shape,
                    position,
                } => {
                    self.emitter.select_aperture(shape, function_of(attributes));
                    self.write_object_attributes(attributes);
                    self.emitter.flash_at(position);
                }
                Emission::Region(contour) => self.plot_region(&contour, attributes),
            }
        }
    }

    pub fn flash_pad_circle(&mut self, position: Position, diameter: i64, attributes: Option<&PlotAttributes>) {
        self.flash_pad(
            &Pad {
                position,
                rotation: Angle::ZERO,
                shape: PadShape::Circle {
                    diameter,
                },
            },
            attributes,
        );
    }

    pub fn flash_pad_oval(&mut self, position: Position, size: Size, rotation: Angle, attributes: Option<&PlotAttributes>) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::Oval {
                    size,
                },
            },
            attributes,
        );
    }

    pub fn flash_pad_rect(&mut self, position: Position, size: Size, rotation: Angle, attributes: Option<&PlotAttributes>) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::Rect {
                    size,
                },
            },
            attributes,
        );
    }

    pub fn flash_pad_round_rect(
        &mut self,
        position: Position,
        size: Size,
        radius: i64,
        rotation: Angle,
        attributes: Option<&PlotAttributes>,
    ) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::RoundRect {
                    size,
                    radius,
                },
            },
            attributes,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn flash_pad_chamfer_round_rect(
        &mut self,
        position: Position,
        size: Size,
        radius: i64,
        chamfer_ratio: f64,
        chamfered: ChamferCorners,
        rotation: Angle,
        attributes: Option<&PlotAttributes>,
    ) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::ChamferRoundRect {
                    size,
                    radius,
                    chamfer_ratio,
                    chamfered,
                },
            },
            attributes,
        );
    }

    /// `corners` are relative to `position`, before rotation.
    pub fn flash_pad_trapez(
        &mut self,
        position: Position,
        corners: [Position; 4],
        rotation: Angle,
        attributes: Option<&PlotAttributes>,
    ) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::Trapezoid {
                    corners,
                },
            },
            attributes,
        );
    }

    pub fn flash_regular_polygon(
        &mut self,
        position: Position,
        diameter: i64,
        vertices: u8,
        rotation: Angle,
        attributes: Option<&PlotAttributes>,
    ) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::RegularPolygon {
                    diameter,
                    vertices,
                },
            },
            attributes,
        );
    }

    /// `outlines` are in board coordinates, already placed at `position` and turned by `rotation`.
    pub fn flash_pad_custom(
        &mut self,
        position: Position,
        rotation: Angle,
        outlines: Vec<Vec<Position>>,
        attributes: Option<&PlotAttributes>,
    ) {
        self.flash_pad(
            &Pad {
                position,
                rotation,
                shape: PadShape::Custom {
                    outlines,
                },
            },
            attributes,
        );
    }
}

fn rect_from_corners(corner: Position, opposite: Position) -> [Position; 4] {
    [
        corner,
        Position::new(opposite.x, corner.y),
        opposite,
        Position::new(corner.x, opposite.y),
    ]
}
