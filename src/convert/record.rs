//! Serialized annotation and widget records
//!
//! Every record is a common [`Envelope`] plus a payload enum internally
//! tagged by `type`. Flattening both into one JSON object gives the host
//! a flat map whose shape is fixed by the tag.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::model::{
    ActionKind, BorderEffect, CheckStyle, ChoiceOption, Color, LineEnding, NativeAnnotation, Rect, TextAlignment,
};

/// Fields shared by every record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub page: usize,
    /// Native identity, valid until the document is reloaded
    pub uuid: String,
    pub title: String,
    pub content: String,
    pub rect: Rect,
    /// Epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify_date: Option<i64>,
}

impl Envelope {
    pub fn new(page: usize, annot: &NativeAnnotation) -> Self {
        Self {
            page,
            uuid: annot.id.to_string(),
            title: annot.title.clone(),
            content: annot.content.clone(),
            rect: annot.rect,
            create_date: annot.created.as_ref().map(DateTime::<Utc>::timestamp_millis),
            modify_date: annot.modified.as_ref().map(DateTime::<Utc>::timestamp_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record<P> {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(flatten)]
    pub payload: P,
}

pub type AnnotationRecord = Record<AnnotationPayload>;
pub type WidgetRecord = Record<WidgetPayload>;

impl AnnotationRecord {
    pub fn variant_tag(&self) -> &'static str {
        self.payload.tag()
    }
}

impl WidgetRecord {
    pub fn variant_tag(&self) -> &'static str {
        self.payload.tag()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationPayload {
    Note,
    Highlight(MarkupFields),
    Underline(MarkupFields),
    Squiggly(MarkupFields),
    Strikeout(MarkupFields),
    Sound(MarkupFields),
    Ink(InkFields),
    Circle(ShapeFields),
    Square(ShapeFields),
    Line(LineFields),
    Arrow(LineFields),
    Stamp,
    Signature,
    Pictures,
    Freetext(FreeTextFields),
    Link(LinkFields),
}

impl AnnotationPayload {
    pub fn tag(&self) -> &'static str {
        match self {
            AnnotationPayload::Note => "note",
            AnnotationPayload::Highlight(_) => "highlight",
            AnnotationPayload::Underline(_) => "underline",
            AnnotationPayload::Squiggly(_) => "squiggly",
            AnnotationPayload::Strikeout(_) => "strikeout",
            AnnotationPayload::Sound(_) => "sound",
            AnnotationPayload::Ink(_) => "ink",
            AnnotationPayload::Circle(_) => "circle",
            AnnotationPayload::Square(_) => "square",
            AnnotationPayload::Line(_) => "line",
            AnnotationPayload::Arrow(_) => "arrow",
            AnnotationPayload::Stamp => "stamp",
            AnnotationPayload::Signature => "signature",
            AnnotationPayload::Pictures => "pictures",
            AnnotationPayload::Freetext(_) => "freetext",
            AnnotationPayload::Link(_) => "link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetPayload {
    TextField(TextFieldFields),
    ListBox(ChoiceFields),
    ComboBox(ChoiceFields),
    RadioButton(ToggleFields),
    CheckBox(ToggleFields),
    #[serde(rename = "signaturesFields")]
    SignatureField(SignatureFields),
    PushButton(PushButtonFields),
}

impl WidgetPayload {
    pub fn tag(&self) -> &'static str {
        match self {
            WidgetPayload::TextField(_) => "textField",
            WidgetPayload::ListBox(_) => "listBox",
            WidgetPayload::ComboBox(_) => "comboBox",
            WidgetPayload::RadioButton(_) => "radioButton",
            WidgetPayload::CheckBox(_) => "checkBox",
            WidgetPayload::SignatureField(_) => "signaturesFields",
            WidgetPayload::PushButton(_) => "pushButton",
        }
    }
}

/// Highlight, underline, squiggly, strikeout and sound
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupFields {
    pub marked_text: String,
    pub color: Color,
    pub alpha: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InkFields {
    pub color: Color,
    pub alpha: u8,
    pub border_width: f32,
}

/// Circle and square
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeFields {
    pub border_color: Color,
    pub border_alpha: u8,
    pub fill_color: Color,
    pub fill_alpha: u8,
    pub border_width: f32,
    pub bord_effect_type: BorderEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineFields {
    pub border_color: Color,
    pub border_alpha: u8,
    pub fill_color: Color,
    pub fill_alpha: u8,
    pub border_width: f32,
    pub line_head_type: LineEnding,
    pub line_tail_type: LineEnding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextFields {
    pub alpha: u8,
    pub alignment: TextAlignment,
    pub text_attribute: TextAttribute,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAttribute {
    pub color: Color,
    pub font_size: f32,
    pub family_name: String,
    pub style_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub action_type: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,
}

/// Font fields shared by text-bearing widgets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFields {
    pub font_color: Color,
    pub font_size: f32,
    pub family_name: String,
    pub style_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFieldFields {
    pub text: String,
    pub is_multiline: bool,
    pub alignment: TextAlignment,
    #[serde(flatten)]
    pub font: FontFields,
}

/// List box and combo box
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceFields {
    pub options: Vec<ChoiceOption>,
    pub selected_indexes: Vec<usize>,
    #[serde(flatten)]
    pub font: FontFields,
}

/// Check box and radio button
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFields {
    pub is_checked: bool,
    pub check_style: CheckStyle,
    pub check_color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureFields {
    pub is_signed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushButtonFields {
    pub button_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRecord>,
    #[serde(flatten)]
    pub font: FontFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> Envelope {
        Envelope {
            page: 1,
            uuid: "42".to_string(),
            title: "Guest".to_string(),
            content: "note".to_string(),
            rect: Rect::new(1.0, 2.0, 3.0, 4.0),
            create_date: None,
            modify_date: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn test_unit_payload_carries_only_tag() {
        let record = AnnotationRecord {
            envelope: envelope(),
            payload: AnnotationPayload::Note,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "note",
                "page": 1,
                "uuid": "42",
                "title": "Guest",
                "content": "note",
                "rect": {"left": 1.0, "top": 2.0, "right": 3.0, "bottom": 4.0},
                "modifyDate": 1_700_000_000_000i64,
            })
        );
        assert_eq!(record.variant_tag(), "note");
    }

    #[test]
    fn test_payload_fields_are_flattened() {
        let record = AnnotationRecord {
            envelope: envelope(),
            payload: AnnotationPayload::Strikeout(MarkupFields {
                marked_text: "struck".to_string(),
                color: Color(0xFF0000),
                alpha: 128,
            }),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "strikeout");
        assert_eq!(value["markedText"], "struck");
        assert_eq!(value["color"], "#FF0000");
        assert_eq!(value["alpha"], 128);
        assert!(value.get("createDate").is_none());
    }

    #[test]
    fn test_widget_tags() {
        let record = WidgetRecord {
            envelope: envelope(),
            payload: WidgetPayload::SignatureField(SignatureFields { is_signed: false }),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "signaturesFields");
        assert_eq!(value["isSigned"], false);
        assert_eq!(record.variant_tag(), "signaturesFields");

        let text = WidgetPayload::TextField(TextFieldFields {
            text: "hi".to_string(),
            is_multiline: true,
            alignment: TextAlignment::Center,
            font: FontFields {
                font_color: Color::BLACK,
                font_size: 10.0,
                family_name: "Helvetica".to_string(),
                style_name: "Regular".to_string(),
            },
        });
        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value["type"], "textField");
        assert_eq!(value["isMultiline"], true);
        assert_eq!(value["alignment"], "center");
        assert_eq!(value["familyName"], "Helvetica");
        assert_eq!(value["fontColor"], "#000000");
    }
}
