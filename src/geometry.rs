mod arc;
mod mirroring;
mod shapes;

pub use arc::*;
pub use mirroring::*;
pub use shapes::*;

use crate::spacial::{rotate_point, Angle, DevicePosition, Position, ToVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Aka 'Negative' in Geometry
    Clockwise,
    /// Aka 'Positive' in Geometry
    CounterClockwise,
}

/// Winding of a polygon in device space, where the Y axis points up.
pub fn calculate_winding(vertices: &[DevicePosition]) -> Winding {
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    if sum > 0.0 {
        Winding::CounterClockwise
    } else {
        Winding::Clockwise
    }
}

/// One piece of a contour, starting where the previous piece ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Position),
    /// Circular arc through `mid`.
    Arc { mid: Position, end: Position },
}

impl Segment {
    pub fn end(&self) -> Position {
        match self {
            Segment::Line(end) => *end,
            Segment::Arc {
                end, ..
            } => *end,
        }
    }

    fn map(self, f: impl Fn(Position) -> Position) -> Self {
        match self {
            Segment::Line(end) => Segment::Line(f(end)),
            Segment::Arc {
                mid,
                end,
            } => Segment::Arc {
                mid: f(mid),
                end: f(end),
            },
        }
    }
}

/// A chain of lines and arcs, the boundary of a region or a stroked outline.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub start: Position,
    pub segments: Vec<Segment>,
}

impl Contour {
    pub fn new(start: Position) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    /// A polygon made of straight edges, closed back to the first corner.
    pub fn from_polygon(corners: &[Position]) -> Self {
        let mut contour = Contour::new(corners.first().copied().unwrap_or(Position::origin()));
        for corner in corners.iter().skip(1) {
            contour.line_to(*corner);
        }
        contour.close();
        contour
    }

    pub fn line_to(&mut self, end: Position) -> &mut Self {
        if end != self.end() {
            self.segments.push(Segment::Line(end));
        }
        self
    }

    pub fn arc_to(&mut self, mid: Position, end: Position) -> &mut Self {
        self.segments.push(Segment::Arc {
            mid,
            end,
        });
        self
    }

    pub fn end(&self) -> Position {
        self.segments
            .last()
            .map_or(self.start, Segment::end)
    }

    pub fn is_closed(&self) -> bool {
        !self.segments.is_empty() && self.end() == self.start
    }

    /// Add a straight closing edge if the contour does not end at its start.
    pub fn close(&mut self) -> &mut Self {
        let start = self.start;
        self.line_to(start)
    }

    /// Rotate around the origin, then move by `offset`.
    pub fn transformed(&self, rotation: Angle, offset: Position) -> Contour {
        let transform = |point: Position| rotate_point(point, rotation) + offset.to_vector();
        Contour {
            start: transform(self.start),
            segments: self
                .segments
                .iter()
                .map(|segment| segment.map(transform))
                .collect(),
        }
    }
}
