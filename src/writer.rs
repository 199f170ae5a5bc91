//! The finishing pass: writes the scratch records once every aperture is known.

use std::io::Write;

use gerber_types::{Command, DCode, GerberCode};
use log::info;

use crate::aperture::ApertureTable;
use crate::attributes::{AttributeFormat, AttributeRecord};
use crate::emitter::{comment, Record};
use crate::error::PlotError;
use crate::units::UnitConverter;

pub const APERTURE_LIST_START: &str = "APERTURE LIST";
pub const APERTURE_LIST_END: &str = "APERTURE END LIST";
pub const MACRO_LIST_START: &str = "Aperture macros list";
pub const MACRO_LIST_END: &str = "Aperture macros list end";

pub struct PlotWriter<'a> {
    apertures: &'a ApertureTable,
    converter: &'a UnitConverter,
    attribute_format: AttributeFormat,
}

impl<'a> PlotWriter<'a> {
    pub fn new(apertures: &'a ApertureTable, converter: &'a UnitConverter, attribute_format: AttributeFormat) -> Self {
        Self {
            apertures,
            converter,
            attribute_format,
        }
    }

    /// Write every record, expanding the aperture list placeholder in place.
    #[profiling::function]
    pub fn write<W: Write>(&self, output: &mut W, records: &[Record]) -> Result<(), PlotError> {
        for record in records {
            self.write_record(output, record)?;
        }

        info!(
            "plot written. records: {}, apertures: {}, free polygon macros: {}",
            records.len(),
            self.apertures.len(),
            self.apertures.free_polygons().len()
        );
        Ok(())
    }

    pub fn write_record<W: Write>(&self, output: &mut W, record: &Record) -> Result<(), PlotError> {
        match record {
            Record::Command(command) => command.serialize(output)?,
            Record::Line(line) => writeln!(output, "{}", line)?,
            Record::ApertureList => self.write_aperture_list(output)?,
            Record::SelectAperture(index) => {
                let dcode = self.apertures.apertures()[*index].dcode;
                Command::from(DCode::SelectAperture(dcode as i32)).serialize(output)?
            }
        }
        Ok(())
    }

    /// A record as text, without the final line terminator.
    pub fn render(&self, record: &Record) -> Result<String, PlotError> {
        let mut output = Vec::new();
        self.write_record(&mut output, record)?;
        let text = String::from_utf8_lossy(&output);
        Ok(text.trim_end_matches('\n').to_string())
    }

    fn write_aperture_list<W: Write>(&self, output: &mut W) -> Result<(), PlotError> {
        comment(APERTURE_LIST_START).serialize(output)?;

        // `gerber_types` prints parameters with the shortest float form, aperture parameters
        // and macro bodies need fixed six decimals, so those stay hand formatted
        if self.apertures.has_macros() {
            comment(MACRO_LIST_START).serialize(output)?;
            for family in self.apertures.used_families() {
                output.write_all(family.body().as_bytes())?;
            }
            let free_polygons = self
                .apertures
                .free_polygons()
                .format_all(|length| self.converter.to_physical(length));
            output.write_all(free_polygons.as_bytes())?;
            comment(MACRO_LIST_END).serialize(output)?;
        }

        for aperture in self.apertures.apertures() {
            if let Some(function) = &aperture.function {
                AttributeRecord::Aperture(function.clone())
                    .command(self.attribute_format)
                    .serialize(output)?;
            }

            writeln!(output, "{}", aperture.definition(self.converter))?;

            // the aperture attribute would otherwise stick to the following definitions
            if aperture.function.is_some() {
                AttributeRecord::Delete(None)
                    .command(self.attribute_format)
                    .serialize(output)?;
            }
        }

        comment(APERTURE_LIST_END).serialize(output)?;
        Ok(())
    }
}
