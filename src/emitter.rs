use gerber_types::{Command, CommentContent, Coordinates, DCode, GCode, InterpolationMode, Operation, QuadrantMode};
use log::trace;

use crate::aperture::{ApertureShape, ApertureTable};
use crate::attributes::ApertureFunction;
use crate::geometry::{calculate_winding, CircularArc, Contour, Segment, Winding};
use crate::spacial::{ki_round, Position};
use crate::units::UnitConverter;

/// Arcs sweeping less than this are drawn as a straight segment.
pub const MIN_ARC_SWEEP_DEGREES: f64 = 0.1;
/// Arcs shorter than this, in device units, are drawn as a straight segment.
pub const MIN_ARC_LENGTH_DEVICE: f64 = 2.0;

/// One statement of the scratch stream. Coordinates are already quantized device units,
/// apertures are referenced by table index until the finishing pass knows every D-code.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Command(Command),
    /// Caller supplied header text, written verbatim without a line terminator.
    Line(String),
    /// Expanded into the macro and aperture definitions by the finishing pass.
    ApertureList,
    SelectAperture(usize),
}

/// `G04 <text>*`
pub fn comment(text: impl Into<String>) -> Command {
    GCode::Comment(CommentContent::String(text.into())).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    /// Pen up, no path.
    Idle,
    Tracing,
    /// Inside `G36`/`G37`.
    RegionOpen,
}

/// Stateful writer of drawing operations into the scratch records.
#[derive(Debug)]
pub struct Emitter {
    converter: UnitConverter,
    apertures: ApertureTable,
    records: Vec<Record>,
    state: PathState,
    current_aperture: Option<usize>,
}

impl Emitter {
    pub fn new(converter: UnitConverter, apertures: ApertureTable) -> Self {
        Self {
            converter,
            apertures,
            records: Vec::new(),
            state: PathState::Idle,
            current_aperture: None,
        }
    }

    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    pub fn apertures(&self) -> &ApertureTable {
        &self.apertures
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    pub fn current_aperture(&self) -> Option<usize> {
        self.current_aperture
    }

    pub fn into_parts(self) -> (Vec<Record>, ApertureTable, UnitConverter) {
        (self.records, self.apertures, self.converter)
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn command(&mut self, command: impl Into<Command>) {
        self.records.push(Record::Command(command.into()));
    }

    /// Make the aperture current, writing a `D<code>*` only if the current one differs.
    ///
    /// Only the current aperture is compared, so a run of identical flashes selects once.
    pub fn select_aperture(&mut self, shape: ApertureShape, function: Option<ApertureFunction>) {
        if let Some(index) = self.current_aperture {
            if self.apertures.matches(index, &shape, function.as_ref()) {
                return;
            }
        }

        let index = self.apertures.get_or_create(shape, function);
        self.records.push(Record::SelectAperture(index));
        self.current_aperture = Some(index);
    }

    /// Select the round plotting pen used for strokes.
    pub fn set_line_width(&mut self, width: i64, function: Option<ApertureFunction>) {
        assert!(width >= 0, "negative pen width: {}", width);

        self.select_aperture(
            ApertureShape::Plotting {
                width,
            },
            function,
        );
    }

    fn operation(&mut self, position: Position, operation: fn(Option<Coordinates>) -> Operation) {
        let coordinates = self
            .converter
            .format()
            .coordinates(self.converter.to_device_rounded(position));
        self.command(DCode::Operation(operation(Some(coordinates))));
    }

    /// Pen up and reposition; starts a new path, or a new contour inside a region.
    pub fn move_to(&mut self, position: Position) {
        self.operation(position, Operation::Move);
        if self.state == PathState::Idle {
            self.state = PathState::Tracing;
        }
    }

    pub fn line_to(&mut self, position: Position) {
        self.operation(position, |coordinates| Operation::Interpolate(coordinates, None));
        if self.state == PathState::Idle {
            self.state = PathState::Tracing;
        }
    }

    /// Lift the pen. Regions stay open until `end_region`.
    pub fn pen_finish(&mut self) {
        if self.state == PathState::Tracing {
            self.state = PathState::Idle;
        }
    }

    pub fn finish_to(&mut self, position: Position) {
        self.line_to(position);
        self.pen_finish();
    }

    /// Draw a circular arc from the current point, which must be `arc.start`.
    ///
    /// The direction is taken from device space, after offset, scale and mirroring.
    pub fn arc_to(&mut self, arc: &CircularArc) {
        let sweep = arc.sweep();
        let length = self.converter.length_to_device(arc.radius()) * sweep.radians().abs();

        if sweep.degrees().abs() < MIN_ARC_SWEEP_DEGREES || length < MIN_ARC_LENGTH_DEVICE {
            trace!("arc too small, drawing a segment. sweep: {}, device length: {}", sweep, length);
            self.line_to(arc.end);
            return;
        }

        let start = self.converter.to_device(arc.start);
        let mid = self.converter.to_device(arc.mid);
        let end = self.converter.to_device(arc.end);
        let center = self.converter.to_device(arc.center);

        // a full circle has no usable winding; either direction draws it
        let mode = match calculate_winding(&[start, mid, end]) {
            Winding::CounterClockwise => InterpolationMode::CounterclockwiseCircular,
            Winding::Clockwise => InterpolationMode::ClockwiseCircular,
        };

        let format = *self.converter.format();
        let end = format.coordinates(self.converter.to_device_rounded(arc.end));
        let offset = center - start;
        let offset = format.offset((ki_round(offset.x), ki_round(offset.y)));

        self.command(GCode::QuadrantMode(QuadrantMode::Multi));
        self.command(GCode::InterpolationMode(mode));
        self.command(DCode::Operation(Operation::Interpolate(Some(end), Some(offset))));
        self.command(GCode::InterpolationMode(InterpolationMode::Linear));

        if self.state == PathState::Idle {
            self.state = PathState::Tracing;
        }
    }

    /// Move to the contour start and trace every segment; arcs whose points are collinear
    /// become lines.
    pub fn trace_contour(&mut self, contour: &Contour) {
        self.move_to(contour.start);

        let mut current = contour.start;
        for segment in &contour.segments {
            match *segment {
                Segment::Line(end) => self.line_to(end),
                Segment::Arc {
                    mid,
                    end,
                } => match CircularArc::through(current, mid, end) {
                    Some(arc) => self.arc_to(&arc),
                    None => self.line_to(end),
                },
            }
            current = segment.end();
        }
    }

    /// Flash the current aperture; the path state is unchanged.
    pub fn flash_at(&mut self, position: Position) {
        self.operation(position, Operation::Flash);
    }

    pub fn start_region(&mut self) {
        self.command(GCode::RegionMode(true));
        self.state = PathState::RegionOpen;
    }

    pub fn end_region(&mut self) {
        self.command(GCode::RegionMode(false));
        self.state = PathState::Idle;
    }
}
