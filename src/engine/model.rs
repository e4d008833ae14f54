//! Native object model exposed by document engines
//!
//! These types describe annotations and form widgets the way an engine
//! holds them in memory: a subtype discriminator, common geometry and
//! metadata, and a bag of variant properties. The bridge never hands
//! them to the host directly; `crate::convert` flattens them into
//! records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pointer-like identity of a native annotation.
///
/// Assigned by the engine when a document is loaded, so it is unique
/// within one loaded document but changes across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NativeId(pub u64);

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NativeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(NativeId)
    }
}

/// Annotation subtypes an engine may report.
///
/// The set is wider than what the bridge serializes; subtypes without a
/// converter are skipped when records are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Subtype {
    Text,
    Link,
    FreeText,
    Line,
    Square,
    Circle,
    Polygon,
    PolyLine,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Stamp,
    Caret,
    Ink,
    Popup,
    FileAttachment,
    Sound,
    Movie,
    Widget,
    Screen,
    Redact,
    #[serde(other)]
    Unknown,
}

impl Subtype {
    const ALL: [Subtype; 23] = [
        Subtype::Text,
        Subtype::Link,
        Subtype::FreeText,
        Subtype::Line,
        Subtype::Square,
        Subtype::Circle,
        Subtype::Polygon,
        Subtype::PolyLine,
        Subtype::Highlight,
        Subtype::Underline,
        Subtype::Squiggly,
        Subtype::StrikeOut,
        Subtype::Stamp,
        Subtype::Caret,
        Subtype::Ink,
        Subtype::Popup,
        Subtype::FileAttachment,
        Subtype::Sound,
        Subtype::Movie,
        Subtype::Widget,
        Subtype::Screen,
        Subtype::Redact,
        Subtype::Unknown,
    ];

    /// Inverse of [`Subtype::as_str`]
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == name)
            .unwrap_or(Subtype::Unknown)
    }

    /// Map a PDF `/Subtype` name to a subtype.
    pub fn from_pdf_name(name: &[u8]) -> Self {
        match name {
            b"Text" => Subtype::Text,
            b"Link" => Subtype::Link,
            b"FreeText" => Subtype::FreeText,
            b"Line" => Subtype::Line,
            b"Square" => Subtype::Square,
            b"Circle" => Subtype::Circle,
            b"Polygon" => Subtype::Polygon,
            b"PolyLine" => Subtype::PolyLine,
            b"Highlight" => Subtype::Highlight,
            b"Underline" => Subtype::Underline,
            b"Squiggly" => Subtype::Squiggly,
            b"StrikeOut" => Subtype::StrikeOut,
            b"Stamp" => Subtype::Stamp,
            b"Caret" => Subtype::Caret,
            b"Ink" => Subtype::Ink,
            b"Popup" => Subtype::Popup,
            b"FileAttachment" => Subtype::FileAttachment,
            b"Sound" => Subtype::Sound,
            b"Movie" => Subtype::Movie,
            b"Widget" => Subtype::Widget,
            b"Screen" => Subtype::Screen,
            b"Redact" => Subtype::Redact,
            _ => Subtype::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::Text => "text",
            Subtype::Link => "link",
            Subtype::FreeText => "freeText",
            Subtype::Line => "line",
            Subtype::Square => "square",
            Subtype::Circle => "circle",
            Subtype::Polygon => "polygon",
            Subtype::PolyLine => "polyLine",
            Subtype::Highlight => "highlight",
            Subtype::Underline => "underline",
            Subtype::Squiggly => "squiggly",
            Subtype::StrikeOut => "strikeOut",
            Subtype::Stamp => "stamp",
            Subtype::Caret => "caret",
            Subtype::Ink => "ink",
            Subtype::Popup => "popup",
            Subtype::FileAttachment => "fileAttachment",
            Subtype::Sound => "sound",
            Subtype::Movie => "movie",
            Subtype::Widget => "widget",
            Subtype::Screen => "screen",
            Subtype::Redact => "redact",
            Subtype::Unknown => "unknown",
        }
    }
}

/// Form widget kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    TextField,
    ListBox,
    ComboBox,
    RadioButton,
    CheckBox,
    SignatureField,
    PushButton,
    #[serde(other)]
    Unknown,
}

/// Bounding rectangle in page space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }
}

/// RGB color, serialized as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Build from PDF color components in the 0..=1 range
    pub fn from_components(r: f32, g: f32, b: f32) -> Self {
        let scale = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::from_rgb(scale(r), scale(g), scale(b))
    }

    /// Upper-case hex form. Alpha bits, if any, are masked off.
    pub fn to_hex(&self) -> String {
        format!("#{:06X}", self.0 & 0xFF_FFFF)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 && hex.len() != 8 {
            return Err(format!("invalid color: {}", value));
        }
        u32::from_str_radix(hex, 16)
            .map(|v| Color(v & 0xFF_FFFF))
            .map_err(|_| format!("invalid color: {}", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineEnding {
    #[default]
    None,
    Arrow,
    Circle,
    Diamond,
    Square,
    ClosedArrow,
    #[serde(other)]
    Unknown,
}

impl LineEnding {
    pub fn from_pdf_name(name: &[u8]) -> Self {
        match name {
            b"None" => LineEnding::None,
            b"OpenArrow" => LineEnding::Arrow,
            b"ClosedArrow" => LineEnding::ClosedArrow,
            b"Circle" => LineEnding::Circle,
            b"Diamond" => LineEnding::Diamond,
            b"Square" => LineEnding::Square,
            _ => LineEnding::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::None => "none",
            LineEnding::Arrow => "arrow",
            LineEnding::Circle => "circle",
            LineEnding::Diamond => "diamond",
            LineEnding::Square => "square",
            LineEnding::ClosedArrow => "closedArrow",
            LineEnding::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorderEffect {
    #[default]
    Solid,
    Cloudy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlignment {
    /// PDF `/Q` quadding value
    pub fn from_quadding(q: i32) -> Self {
        match q {
            1 => TextAlignment::Center,
            2 => TextAlignment::Right,
            _ => TextAlignment::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlignment::Left => "left",
            TextAlignment::Center => "center",
            TextAlignment::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StampKind {
    #[default]
    Standard,
    Text,
    Image,
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckStyle {
    #[default]
    Check,
    Circle,
    Cross,
    Diamond,
    Square,
    Star,
}

impl CheckStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStyle::Check => "check",
            CheckStyle::Circle => "circle",
            CheckStyle::Cross => "cross",
            CheckStyle::Diamond => "diamond",
            CheckStyle::Square => "square",
            CheckStyle::Star => "star",
        }
    }
}

/// Action kinds attached to links and push buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    #[default]
    Unknown,
    GoTo,
    GoToR,
    GoToE,
    Launch,
    Thread,
    Uri,
    Sound,
    Movie,
    Hide,
    Named,
    SubmitForm,
    ResetForm,
    ImportData,
    JavaScript,
    #[serde(rename = "setOCGState")]
    SetOcgState,
    Rendition,
    Trans,
    #[serde(rename = "goTo3DView")]
    GoTo3dView,
    Uop,
    Error,
}

impl ActionKind {
    /// Map a PDF action `/S` name
    pub fn from_pdf_name(name: &[u8]) -> Self {
        match name {
            b"GoTo" => ActionKind::GoTo,
            b"GoToR" => ActionKind::GoToR,
            b"GoToE" => ActionKind::GoToE,
            b"Launch" => ActionKind::Launch,
            b"Thread" => ActionKind::Thread,
            b"URI" => ActionKind::Uri,
            b"Sound" => ActionKind::Sound,
            b"Movie" => ActionKind::Movie,
            b"Hide" => ActionKind::Hide,
            b"Named" => ActionKind::Named,
            b"SubmitForm" => ActionKind::SubmitForm,
            b"ResetForm" => ActionKind::ResetForm,
            b"ImportData" => ActionKind::ImportData,
            b"JavaScript" => ActionKind::JavaScript,
            b"SetOCGState" => ActionKind::SetOcgState,
            b"Rendition" => ActionKind::Rendition,
            b"Trans" => ActionKind::Trans,
            b"GoTo3DView" => ActionKind::GoTo3dView,
            _ => ActionKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Unknown => "unknown",
            ActionKind::GoTo => "goTo",
            ActionKind::GoToR => "goToR",
            ActionKind::GoToE => "goToE",
            ActionKind::Launch => "launch",
            ActionKind::Thread => "thread",
            ActionKind::Uri => "uri",
            ActionKind::Sound => "sound",
            ActionKind::Movie => "movie",
            ActionKind::Hide => "hide",
            ActionKind::Named => "named",
            ActionKind::SubmitForm => "submitForm",
            ActionKind::ResetForm => "resetForm",
            ActionKind::ImportData => "importData",
            ActionKind::JavaScript => "javaScript",
            ActionKind::SetOcgState => "setOCGState",
            ActionKind::Rendition => "rendition",
            ActionKind::Trans => "trans",
            ActionKind::GoTo3dView => "goTo3DView",
            ActionKind::Uop => "uop",
            ActionKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Action {
    pub kind: ActionKind,
    pub uri: Option<String>,
    pub page_index: Option<usize>,
}

/// Font used by free text annotations and widgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Font {
    /// PostScript-style name, e.g. `Helvetica-Bold`
    pub name: String,
    pub size: f32,
    pub color: Color,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Helvetica".to_string(),
            size: 12.0,
            color: Color::BLACK,
        }
    }
}

/// Variant properties of an annotation. Engines fill in what the
/// subtype carries and leave the rest at defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Properties {
    pub color: Option<Color>,
    pub opacity: Option<f32>,
    pub fill_color: Option<Color>,
    pub fill_opacity: Option<f32>,
    pub border_width: Option<f32>,
    pub border_effect: BorderEffect,
    pub line_head: LineEnding,
    pub line_tail: LineEnding,
    pub marked_text: Option<String>,
    pub stamp: StampKind,
    pub alignment: TextAlignment,
    pub font: Option<Font>,
    pub action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub text: String,
    pub value: String,
}

/// Decoded signature appearance image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureImage {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub rgba: Vec<u8>,
}

/// Form field state carried by widget annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetFields {
    pub kind: WidgetKind,
    pub field_name: String,
    pub text: String,
    pub multiline: bool,
    pub checked: bool,
    pub check_style: CheckStyle,
    pub check_color: Color,
    pub options: Vec<ChoiceOption>,
    pub selected: Vec<usize>,
    pub button_title: String,
    /// The signature field carries a signature, drawn or cryptographic
    pub signed: bool,
    pub signature: Option<SignatureImage>,
}

impl Default for WidgetFields {
    fn default() -> Self {
        Self {
            kind: WidgetKind::Unknown,
            field_name: String::new(),
            text: String::new(),
            multiline: false,
            checked: false,
            check_style: CheckStyle::Check,
            check_color: Color::BLACK,
            options: Vec::new(),
            selected: Vec::new(),
            button_title: String::new(),
            signed: false,
            signature: None,
        }
    }
}

/// A live annotation as held by an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeAnnotation {
    #[serde(skip)]
    pub id: NativeId,
    pub subtype: Subtype,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetFields>,
    /// Set when a mutation changed state the appearance stream does not reflect yet
    #[serde(skip)]
    pub appearance_stale: bool,
}

impl NativeAnnotation {
    pub fn new(subtype: Subtype, rect: Rect) -> Self {
        Self {
            id: NativeId::default(),
            subtype,
            rect,
            title: String::new(),
            content: String::new(),
            created: None,
            modified: None,
            properties: Properties::default(),
            widget: None,
            appearance_stale: false,
        }
    }

    /// A widget annotation for a form field
    pub fn widget(kind: WidgetKind, field_name: impl Into<String>, rect: Rect) -> Self {
        let field_name = field_name.into();
        let mut annot = Self::new(Subtype::Widget, rect);
        annot.title = field_name.clone();
        annot.widget = Some(WidgetFields {
            kind,
            field_name,
            ..WidgetFields::default()
        });
        annot
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_dates(mut self, created: Option<DateTime<Utc>>, modified: Option<DateTime<Utc>>) -> Self {
        self.created = created;
        self.modified = modified;
        self
    }

    pub fn is_widget(&self) -> bool {
        self.subtype == Subtype::Widget
    }

    pub fn widget_kind(&self) -> Option<WidgetKind> {
        self.widget.as_ref().map(|w| w.kind)
    }

    /// Record a modification made through the bridge
    pub fn touch(&mut self) {
        self.modified = Some(Utc::now());
        self.appearance_stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_masks_alpha() {
        assert_eq!(Color(0xFF12_34AB).to_hex(), "#1234AB");
        assert_eq!(Color::from_rgb(255, 0, 16).to_hex(), "#FF0010");
    }

    #[test]
    fn test_color_from_components() {
        assert_eq!(Color::from_components(1.0, 1.0, 0.0).to_hex(), "#FFFF00");
        assert_eq!(Color::from_components(2.0, -1.0, 0.5).to_hex(), "#FF0080");
    }

    #[test]
    fn test_color_serde_roundtrip() {
        let json = serde_json::to_string(&Color(0x00FF00)).unwrap();
        assert_eq!(json, "\"#00FF00\"");
        let back: Color = serde_json::from_str("\"#ff0000\"").unwrap();
        assert_eq!(back, Color(0xFF0000));
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }

    #[test]
    fn test_native_id_parse() {
        assert_eq!("42".parse::<NativeId>().unwrap(), NativeId(42));
        assert!("abc".parse::<NativeId>().is_err());
        assert_eq!(NativeId(7).to_string(), "7");
    }

    #[test]
    fn test_unknown_subtype_deserializes() {
        let subtype: Subtype = serde_json::from_str("\"threeD\"").unwrap();
        assert_eq!(subtype, Subtype::Unknown);
        assert_eq!(Subtype::from_pdf_name(b"Highlight"), Subtype::Highlight);
        assert_eq!(Subtype::from_pdf_name(b"3D"), Subtype::Unknown);
        assert_eq!(Subtype::from_name("strikeOut"), Subtype::StrikeOut);
        assert_eq!(Subtype::from_name("nope"), Subtype::Unknown);
    }

    #[test]
    fn test_widget_constructor_sets_title() {
        let annot = NativeAnnotation::widget(WidgetKind::TextField, "name", Rect::default());
        assert!(annot.is_widget());
        assert_eq!(annot.title, "name");
        assert_eq!(annot.widget_kind(), Some(WidgetKind::TextField));
    }

    #[test]
    fn test_action_kind_names() {
        assert_eq!(ActionKind::from_pdf_name(b"URI").as_str(), "uri");
        assert_eq!(
            serde_json::to_string(&ActionKind::SetOcgState).unwrap(),
            "\"setOCGState\""
        );
        assert_eq!(
            serde_json::to_string(&ActionKind::GoTo3dView).unwrap(),
            "\"goTo3DView\""
        );
    }
}
