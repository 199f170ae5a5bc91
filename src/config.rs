#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings for one Gerber file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlotterConfig {
    pub use_inches: bool,
    /// Digits after the decimal point in coordinates, 4 to 6.
    pub resolution: u8,
    /// Structured `%TA`/`%TO`/`%TD` attributes; otherwise `G04 #@!` comments are used.
    pub use_x2_format: bool,
    /// Emit `TO.P`/`TO.N`/`TO.C` object attributes.
    pub use_net_attributes: bool,
    /// Replace every aperture macro with its region equivalent.
    pub disable_aperture_macros: bool,
    /// Allowed per-coordinate difference, in internal units, when matching polygon corner lists.
    pub polygon_match_margin: i64,
    /// Custom pads with more corners than this are plotted as regions.
    pub max_free_polygon_corners: usize,
    pub creator: String,
    /// Written verbatim at the top of the file, typically `%TF...*%` file attributes.
    pub header_lines: Vec<String>,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            use_inches: false,
            resolution: 6,
            use_x2_format: true,
            use_net_attributes: true,
            disable_aperture_macros: false,
            polygon_match_margin: 2,
            max_free_polygon_corners: 4990,
            creator: env!("CARGO_PKG_NAME").to_string(),
            header_lines: Vec::new(),
        }
    }
}

impl PlotterConfig {
    pub fn with_inches(mut self, resolution: u8) -> Self {
        self.use_inches = true;
        self.resolution = resolution;
        self
    }

    pub fn with_millimetres(mut self, resolution: u8) -> Self {
        self.use_inches = false;
        self.resolution = resolution;
        self
    }

    pub fn with_x2_format(mut self, enabled: bool) -> Self {
        self.use_x2_format = enabled;
        self
    }

    pub fn with_net_attributes(mut self, enabled: bool) -> Self {
        self.use_net_attributes = enabled;
        self
    }

    pub fn with_aperture_macros(mut self, enabled: bool) -> Self {
        self.disable_aperture_macros = !enabled;
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn with_header_line(mut self, line: impl Into<String>) -> Self {
        self.header_lines.push(line.into());
        self
    }
}
