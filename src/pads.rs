//! Maps pad shapes to a native aperture, an aperture macro or a filled region.

use log::debug;

use crate::aperture::{ApertureShape, PolygonOutline};
use crate::geometry::{
    chamfered_rect_outline, is_convex, rect_corners, round_rect_contour, ChamferCorners, Contour, Mirroring,
};
use crate::macros::MacroFamily;
use crate::spacial::{rotate_point, Angle, Position, Size, ToVector};

#[derive(Debug, Clone, PartialEq)]
pub enum PadShape {
    Circle {
        diameter: i64,
    },
    Oval {
        size: Size,
    },
    Rect {
        size: Size,
    },
    RoundRect {
        size: Size,
        radius: i64,
    },
    ChamferRoundRect {
        size: Size,
        radius: i64,
        /// Chamfer length as a fraction of the smaller side, 0 to 0.5.
        chamfer_ratio: f64,
        chamfered: ChamferCorners,
    },
    /// Corners relative to the pad position, unrotated.
    Trapezoid {
        corners: [Position; 4],
    },
    RegularPolygon {
        /// Circumscribed circle.
        diameter: i64,
        vertices: u8,
    },
    /// Outlines in board coordinates, already placed and rotated.
    Custom {
        outlines: Vec<Vec<Position>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    pub position: Position,
    pub rotation: Angle,
    pub shape: PadShape,
}

/// How a pad ends up in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Flash { shape: ApertureShape, position: Position },
    /// A filled region in board coordinates.
    Region(Contour),
}

#[derive(Debug, Clone, Copy)]
pub struct PadTranslator {
    pub macros_enabled: bool,
    pub max_free_polygon_corners: usize,
    pub mirroring: Mirroring,
}

impl PadTranslator {
    pub fn translate(&self, pad: &Pad) -> Vec<Emission> {
        let rotation = pad.rotation.snapped();
        let flash = |shape: ApertureShape| {
            vec![Emission::Flash {
                shape,
                position: pad.position,
            }]
        };
        // a shape centred on the origin, placed like the pad
        let region = |contour: Contour| vec![Emission::Region(contour.transformed(rotation, pad.position))];

        match &pad.shape {
            PadShape::Circle {
                diameter,
            } => flash(ApertureShape::Circle {
                diameter: *diameter,
            }),
            PadShape::Oval {
                size,
            } if size.x == size.y => flash(ApertureShape::Circle {
                diameter: size.x,
            }),
            PadShape::Oval {
                size,
            } if rotation.is_cardinal() => flash(ApertureShape::Oval {
                size: cardinal_size(*size, rotation),
            }),
            PadShape::Oval {
                size,
            } => {
                if !self.macros_enabled {
                    debug!("aperture macros disabled, oval pad plotted as a region");
                    return region(round_rect_contour(*size, size.x.min(size.y) / 2));
                }

                // the macro wants the long axis horizontal
                let (size, rotation) = match size.y > size.x {
                    true => (Size::new(size.y, size.x), (rotation + Angle::DEGREES_90).snapped()),
                    false => (*size, rotation),
                };
                flash(ApertureShape::RotatedOval {
                    size,
                    rotation: self.flashed_rotation(rotation),
                })
            }
            PadShape::Rect {
                size,
            } if rotation.is_cardinal() => flash(ApertureShape::Rect {
                size: cardinal_size(*size, rotation),
            }),
            PadShape::Rect {
                size,
            } => {
                if !self.macros_enabled {
                    debug!("aperture macros disabled, rotated rect pad plotted as a region");
                    return region(Contour::from_polygon(&rect_corners(*size)));
                }
                flash(ApertureShape::RotatedRect {
                    size: *size,
                    rotation: self.flashed_rotation(rotation),
                })
            }
            PadShape::RoundRect {
                size,
                radius,
            } if *radius <= 0 => self.translate(&Pad {
                shape: PadShape::Rect {
                    size: *size,
                },
                ..pad.clone()
            }),
            PadShape::RoundRect {
                size,
                radius,
            } => {
                if !self.macros_enabled {
                    return region(round_rect_contour(*size, *radius));
                }
                flash(ApertureShape::RoundRect {
                    size: *size,
                    radius: *radius,
                    rotation: self.flashed_rotation(rotation),
                })
            }
            PadShape::ChamferRoundRect {
                size,
                radius,
                chamfer_ratio,
                chamfered,
            } if chamfered.is_empty() || *chamfer_ratio <= 0.0 => self.translate(&Pad {
                shape: PadShape::RoundRect {
                    size: *size,
                    radius: *radius,
                },
                ..pad.clone()
            }),
            PadShape::ChamferRoundRect {
                size,
                radius,
                chamfer_ratio,
                chamfered,
            } => {
                let outline = chamfered_rect_outline(*size, *radius, *chamfer_ratio, *chamfered);

                if !self.macros_enabled {
                    return region(Contour::from_polygon(&outline));
                }

                let fully_chamfered = *radius <= 0 || chamfered.is_all();
                if fully_chamfered && MacroFamily::outline(outline.len()).is_some() && is_convex(&outline) {
                    return flash(ApertureShape::Outline(self.flashed_outline(&outline, rotation)));
                }
                if fully_chamfered {
                    debug!("chamfered outline has {} corners, using a free polygon", outline.len());
                }

                self.free_polygon(&outline, rotation, pad.position)
                    .unwrap_or_else(|| region(Contour::from_polygon(&outline)))
            }
            PadShape::Trapezoid {
                corners,
            } => {
                if !self.macros_enabled {
                    return region(Contour::from_polygon(corners));
                }
                flash(ApertureShape::Outline(self.flashed_outline(corners, rotation)))
            }
            PadShape::RegularPolygon {
                diameter,
                vertices,
            } => {
                assert!(
                    (3..=12).contains(vertices),
                    "regular polygon needs 3 to 12 corners, got {}",
                    vertices
                );

                // the first vertex sits on the +X axis, mirroring moves it to the -X axis
                let rotation = match self.mirroring.flips_winding() {
                    true => (Angle::DEGREES_180 - rotation).snapped(),
                    false => rotation,
                };
                flash(ApertureShape::RegularPolygon {
                    diameter: *diameter,
                    vertices: *vertices,
                    rotation,
                })
            }
            PadShape::Custom {
                outlines,
            } => outlines
                .iter()
                .filter(|outline| outline.len() >= 3)
                .flat_map(|outline| {
                    let normalized = outline
                        .iter()
                        .map(|corner| rotate_point(*corner - pad.position.to_vector(), -rotation))
                        .collect::<Vec<_>>();

                    self.free_polygon(&normalized, rotation, pad.position)
                        .unwrap_or_else(|| vec![Emission::Region(Contour::from_polygon(outline))])
                })
                .collect(),
        }
    }

    /// Flash of an origin-centred, unrotated polygon through the free polygon macros, if allowed.
    fn free_polygon(&self, corners: &[Position], rotation: Angle, position: Position) -> Option<Vec<Emission>> {
        if !self.macros_enabled {
            return None;
        }
        if corners.len() > self.max_free_polygon_corners {
            debug!(
                "polygon has {} corners, more than the {} a macro may hold, plotting as a region",
                corners.len(),
                self.max_free_polygon_corners
            );
            return None;
        }

        Some(vec![Emission::Flash {
            shape: ApertureShape::FreePolygon(self.flashed_outline(corners, rotation)),
            position,
        }])
    }

    fn flashed_outline(&self, corners: &[Position], rotation: Angle) -> PolygonOutline {
        PolygonOutline {
            corners: self.mirroring.apply_to_corners(corners),
            rotation: self.flashed_rotation(rotation),
        }
    }

    fn flashed_rotation(&self, rotation: Angle) -> Angle {
        self.mirroring.apply_to_angle(rotation).snapped()
    }
}

/// Size of an axis aligned shape turned by a multiple of 90 degrees.
fn cardinal_size(size: Size, rotation: Angle) -> Size {
    match rotation.is_cardinal_90() {
        true => Size::new(size.y, size.x),
        false => size,
    }
}
