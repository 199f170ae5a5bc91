//! X2 attributes (and their X1 comment renderings) attached to apertures and graphic objects.

use std::fmt::Write as _;

use gerber_types::{
    ApertureAttribute, Command, CommentContent, ExtendedCode, GCode, Net, ObjectAttribute, Pin, StandardComment,
};

/// Value of the `.AperFunction` aperture attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApertureFunction {
    EtchedComponent,
    Conductor,
    Profile,
    ViaPad,
    NonConductor,
    ComponentPad,
    SmdPadSolderMaskDefined,
    SmdPadCopperDefined,
    BgaPadSolderMaskDefined,
    BgaPadCopperDefined,
    ConnectorPad,
    WasherPad,
    HeatsinkPad,
    TestPad,
    FiducialPadGlobal,
    FiducialPadLocal,
    CastellatedPad,
    /// `Other,<free text>`
    Other(String),
}

impl ApertureFunction {
    /// The `gerber_types` value; free text is escaped.
    pub fn to_gerber(&self) -> gerber_types::ApertureFunction {
        use gerber_types::{ApertureFunction as Gerber, FiducialScope, SmdPadType};

        match self {
            ApertureFunction::EtchedComponent => Gerber::EtchedComponent,
            ApertureFunction::Conductor => Gerber::Conductor,
            ApertureFunction::Profile => Gerber::Profile,
            ApertureFunction::ViaPad => Gerber::ViaPad,
            ApertureFunction::NonConductor => Gerber::NonConductor,
            ApertureFunction::ComponentPad => Gerber::ComponentPad,
            ApertureFunction::SmdPadSolderMaskDefined => Gerber::SmdPad(SmdPadType::SoldermaskDefined),
            ApertureFunction::SmdPadCopperDefined => Gerber::SmdPad(SmdPadType::CopperDefined),
            ApertureFunction::BgaPadSolderMaskDefined => Gerber::BgaPad(SmdPadType::SoldermaskDefined),
            ApertureFunction::BgaPadCopperDefined => Gerber::BgaPad(SmdPadType::CopperDefined),
            ApertureFunction::ConnectorPad => Gerber::ConnectorPad,
            ApertureFunction::WasherPad => Gerber::WasherPad,
            ApertureFunction::HeatsinkPad => Gerber::HeatsinkPad,
            ApertureFunction::TestPad => Gerber::TestPad,
            ApertureFunction::FiducialPadGlobal => Gerber::FiducialPad(FiducialScope::Global),
            ApertureFunction::FiducialPadLocal => Gerber::FiducialPad(FiducialScope::Local),
            ApertureFunction::CastellatedPad => Gerber::CastellatedPad,
            ApertureFunction::Other(text) => Gerber::Other(escape_gerber_string(text)),
        }
    }
}

/// How attributes are written to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    /// `%TO.N,GND*%`
    X2,
    /// `G04 #@! TO.N,GND*`, ignored by readers that do not know the convention.
    X1,
}

impl AttributeFormat {
    pub fn from_x2(use_x2: bool) -> Self {
        match use_x2 {
            true => AttributeFormat::X2,
            false => AttributeFormat::X1,
        }
    }
}

/// An attribute statement, before the attribute format is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeRecord {
    Aperture(ApertureFunction),
    Object(ObjectAttributeKey, String),
    /// `TD` with no name deletes every attribute in the dictionary.
    Delete(Option<&'static str>),
}

impl AttributeRecord {
    pub fn command(&self, format: AttributeFormat) -> Command {
        match (self, format) {
            (AttributeRecord::Aperture(function), AttributeFormat::X2) => {
                ApertureAttribute::ApertureFunction(function.to_gerber()).into()
            }
            (AttributeRecord::Aperture(function), AttributeFormat::X1) => standard_comment(
                StandardComment::ApertureAttribute(ApertureAttribute::ApertureFunction(function.to_gerber())),
            ),
            (AttributeRecord::Object(key, value), AttributeFormat::X2) => {
                ExtendedCode::ObjectAttribute(key.attribute(value)).into()
            }
            (AttributeRecord::Object(key, value), AttributeFormat::X1) => {
                standard_comment(StandardComment::ObjectAttribute(key.attribute(value)))
            }
            (AttributeRecord::Delete(name), AttributeFormat::X2) => {
                ExtendedCode::DeleteAttribute(name.unwrap_or_default().to_string()).into()
            }
            // there is no standard comment for TD
            (AttributeRecord::Delete(name), AttributeFormat::X1) => GCode::Comment(CommentContent::String(format!(
                "#@! TD{}",
                name.unwrap_or_default()
            )))
            .into(),
        }
    }
}

fn standard_comment(comment: StandardComment) -> Command {
    GCode::Comment(CommentContent::Standard(comment)).into()
}

/// The object attributes tracked by the dictionary, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectAttributeKey {
    /// `.P`, pad: component reference, pin and optional pin function.
    Pad,
    /// `.N`, net name.
    Net,
    /// `.C`, component reference.
    Component,
}

impl ObjectAttributeKey {
    pub fn name(self) -> &'static str {
        match self {
            ObjectAttributeKey::Pad => ".P",
            ObjectAttributeKey::Net => ".N",
            ObjectAttributeKey::Component => ".C",
        }
    }

    /// The typed attribute for a value produced by `PlotAttributes::object_attributes`.
    pub fn attribute(self, value: &str) -> ObjectAttribute {
        match self {
            ObjectAttributeKey::Pad => {
                // fields are escaped, so a raw comma always separates them
                let mut fields = value.splitn(3, ',');
                ObjectAttribute::Pin(Pin {
                    refdes: fields.next().unwrap_or_default().to_string(),
                    name: fields.next().unwrap_or_default().to_string(),
                    function: fields.next().map(str::to_string),
                })
            }
            ObjectAttributeKey::Net => ObjectAttribute::Net(match value {
                "" => Net::None,
                NO_NET_NAME => Net::NotConnected,
                name => Net::Connected(vec![name.to_string()]),
            }),
            ObjectAttributeKey::Component => ObjectAttribute::Component(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PadAttribute {
    pub component: String,
    /// Empty for mechanical pads.
    pub pin: String,
    pub pin_function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetAttribute {
    Named(String),
    /// Connectable but unconnected, written as `N/C`.
    NotConnected,
    /// Never connectable, e.g. mechanical pads; written with an empty name.
    NotInNet,
}

/// Metadata that can accompany a drawing operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlotAttributes {
    pub aperture_function: Option<ApertureFunction>,
    pub pad: Option<PadAttribute>,
    pub net: Option<NetAttribute>,
    pub component: Option<String>,
}

const NO_PAD_NAME: &str = "";
const NO_NET_NAME: &str = "N/C";

impl PlotAttributes {
    pub fn with_function(function: ApertureFunction) -> Self {
        Self {
            aperture_function: Some(function),
            ..Self::default()
        }
    }

    pub fn with_net(mut self, net: impl Into<String>) -> Self {
        self.net = Some(NetAttribute::Named(net.into()));
        self
    }

    pub fn with_pad(mut self, component: impl Into<String>, pin: impl Into<String>) -> Self {
        self.pad = Some(PadAttribute {
            component: component.into(),
            pin: pin.into(),
            pin_function: None,
        });
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// The formatted object attribute values, keyed and in emission order.
    pub fn object_attributes(&self) -> Vec<(ObjectAttributeKey, String)> {
        let mut attributes = Vec::new();

        if let Some(pad) = &self.pad {
            let mut value = format!("{},", escape_gerber_string(&pad.component));
            if pad.pin.is_empty() {
                value.push_str(NO_PAD_NAME);
            } else {
                value.push_str(&escape_gerber_string(&pad.pin));
                // a pin function only exists for named pins
                if let Some(function) = &pad.pin_function {
                    value.push(',');
                    value.push_str(&escape_gerber_string(function));
                }
            }
            attributes.push((ObjectAttributeKey::Pad, value));
        }

        if let Some(net) = &self.net {
            let value = match net {
                NetAttribute::Named(name) => escape_gerber_string(name),
                NetAttribute::NotConnected => NO_NET_NAME.to_string(),
                NetAttribute::NotInNet => String::new(),
            };
            attributes.push((ObjectAttributeKey::Net, value));
        }

        // the pad attribute already names the component
        if let (Some(component), None) = (&self.component, &self.pad) {
            attributes.push((ObjectAttributeKey::Component, escape_gerber_string(component)));
        }

        attributes
    }
}

/// Escape characters that are reserved in Gerber attribute fields, and any non-ASCII character,
/// as `\uXXXX` (`\UXXXXXXXX` outside the basic multilingual plane).
pub fn escape_gerber_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        let code = c as u32;
        if code > 0x7F || matches!(c, '%' | '*' | ',' | '\\' | '"') {
            if code > 0xFFFF {
                let _ = write!(escaped, "\\U{:08X}", code);
            } else {
                let _ = write!(escaped, "\\u{:04X}", code);
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Result of comparing a new attribute set against the dictionary.
#[derive(Debug, Default, PartialEq)]
pub struct AttributeDiff {
    /// All active attributes must be deleted (`TD`) before writing `changed`.
    pub clear: bool,
    pub changed: Vec<(ObjectAttributeKey, String)>,
}

impl AttributeDiff {
    pub fn is_empty(&self) -> bool {
        !self.clear && self.changed.is_empty()
    }
}

/// Last emitted value of each active object attribute.
///
/// Object attributes stay attached to every following graphic object until deleted, so only
/// the difference against what is already active needs writing.
#[derive(Debug, Default)]
pub struct AttributeDictionary {
    active: Vec<(ObjectAttributeKey, String)>,
}

impl AttributeDictionary {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn get(&self, key: ObjectAttributeKey) -> Option<&str> {
        self.active
            .iter()
            .find(|(active_key, _)| *active_key == key)
            .map(|(_, value)| value.as_str())
    }

    /// Compute what must be written so the active set becomes `attributes`, and adopt it.
    ///
    /// An attribute that is active but absent from `attributes` cannot be removed on its own
    /// with the dictionary semantics used here, so that case clears everything and rewrites
    /// the whole new set.
    pub fn apply(&mut self, attributes: Vec<(ObjectAttributeKey, String)>) -> AttributeDiff {
        let dropped = self
            .active
            .iter()
            .any(|(key, _)| !attributes.iter().any(|(new_key, _)| new_key == key));

        let diff = match dropped {
            true => AttributeDiff {
                clear: true,
                changed: attributes.clone(),
            },
            false => AttributeDiff {
                clear: false,
                changed: attributes
                    .iter()
                    .filter(|(key, value)| self.get(*key) != Some(value.as_str()))
                    .cloned()
                    .collect(),
            },
        };

        self.active = attributes;
        diff
    }

    /// Forget all active attributes. Returns true if any were active, i.e. a `TD` is needed.
    pub fn clear(&mut self) -> bool {
        let was_active = !self.active.is_empty();
        self.active.clear();
        was_active
    }
}
