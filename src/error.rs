use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gerber error: {0}")]
    Gerber(#[from] gerber_types::GerberError),

    #[error("Invalid coordinate resolution, digits: {digits}, expected 4 to 6")]
    InvalidResolution { digits: u8 },

    #[error("Invalid scale: {0}")]
    InvalidScale(f64),
}
