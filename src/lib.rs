mod aperture;
mod attributes;
mod config;
mod emitter;
mod error;
mod geometry;
mod macros;
mod pads;
mod plotter;
pub mod spacial;
mod units;
mod writer;

pub use aperture::*;
pub use attributes::*;
pub use config::*;
pub use emitter::*;
pub use error::*;
pub use geometry::*;
/// re-export 'gerber_types' crate
#[cfg(feature = "types")]
pub use gerber_types;
pub use macros::*;
pub use pads::*;
pub use plotter::*;
pub use units::*;
pub use writer::*;

#[cfg(feature = "testing")]
pub mod testing;

pub use crate::spacial::{Angle, Position, Size, Vector};
