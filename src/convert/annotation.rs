//! Annotation converters

use crate::engine::model::{Action, ActionKind, Color, LineEnding, NativeAnnotation, StampKind, Subtype};

use super::record::{
    ActionRecord, AnnotationPayload, AnnotationRecord, Envelope, FreeTextFields, InkFields, LineFields, LinkFields,
    MarkupFields, Record, ShapeFields, TextAttribute,
};
use super::{alpha, split_font_name};

/// One converter per payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationConverter {
    Note,
    /// Highlight, underline, squiggly, strikeout and sound
    Markup,
    Ink,
    /// Circle and square
    Shape,
    /// Line, or arrow when either end is decorated
    Line,
    /// Standard, signature and image stamps
    Stamp,
    FreeText,
    Link,
}

impl AnnotationConverter {
    /// `None` for subtypes the bridge does not expose, widgets included
    pub fn for_subtype(subtype: Subtype) -> Option<Self> {
        match subtype {
            Subtype::Text => Some(AnnotationConverter::Note),
            Subtype::Highlight
            | Subtype::Underline
            | Subtype::Squiggly
            | Subtype::StrikeOut
            | Subtype::Sound => Some(AnnotationConverter::Markup),
            Subtype::Ink => Some(AnnotationConverter::Ink),
            Subtype::Circle | Subtype::Square => Some(AnnotationConverter::Shape),
            Subtype::Line => Some(AnnotationConverter::Line),
            Subtype::Stamp => Some(AnnotationConverter::Stamp),
            Subtype::FreeText => Some(AnnotationConverter::FreeText),
            Subtype::Link => Some(AnnotationConverter::Link),
            Subtype::Polygon
            | Subtype::PolyLine
            | Subtype::Caret
            | Subtype::Popup
            | Subtype::FileAttachment
            | Subtype::Movie
            | Subtype::Widget
            | Subtype::Screen
            | Subtype::Redact
            | Subtype::Unknown => None,
        }
    }

    pub fn serialize(self, page: usize, annot: &NativeAnnotation) -> AnnotationRecord {
        let props = &annot.properties;
        let payload = match self {
            AnnotationConverter::Note => AnnotationPayload::Note,
            AnnotationConverter::Markup => {
                let fields = MarkupFields {
                    marked_text: props.marked_text.clone().unwrap_or_default(),
                    color: props.color.unwrap_or_default(),
                    alpha: alpha(props.opacity),
                };
                match annot.subtype {
                    Subtype::Underline => AnnotationPayload::Underline(fields),
                    Subtype::Squiggly => AnnotationPayload::Squiggly(fields),
                    Subtype::StrikeOut => AnnotationPayload::Strikeout(fields),
                    Subtype::Sound => AnnotationPayload::Sound(fields),
                    _ => AnnotationPayload::Highlight(fields),
                }
            }
            AnnotationConverter::Ink => AnnotationPayload::Ink(InkFields {
                color: props.color.unwrap_or_default(),
                alpha: alpha(props.opacity),
                border_width: props.border_width.unwrap_or(1.0),
            }),
            AnnotationConverter::Shape => {
                let fields = ShapeFields {
                    border_color: props.color.unwrap_or_default(),
                    border_alpha: alpha(props.opacity),
                    fill_color: props.fill_color.unwrap_or_default(),
                    fill_alpha: fill_alpha(props.fill_color, props.fill_opacity),
                    border_width: props.border_width.unwrap_or(1.0),
                    bord_effect_type: props.border_effect,
                };
                if annot.subtype == Subtype::Circle {
                    AnnotationPayload::Circle(fields)
                } else {
                    AnnotationPayload::Square(fields)
                }
            }
            AnnotationConverter::Line => {
                let fields = LineFields {
                    border_color: props.color.unwrap_or_default(),
                    border_alpha: alpha(props.opacity),
                    fill_color: props.fill_color.unwrap_or_default(),
                    fill_alpha: fill_alpha(props.fill_color, props.fill_opacity),
                    border_width: props.border_width.unwrap_or(1.0),
                    line_head_type: props.line_head,
                    line_tail_type: props.line_tail,
                };
                if fields.line_head_type == LineEnding::None && fields.line_tail_type == LineEnding::None {
                    AnnotationPayload::Line(fields)
                } else {
                    AnnotationPayload::Arrow(fields)
                }
            }
            AnnotationConverter::Stamp => match props.stamp {
                StampKind::Signature => AnnotationPayload::Signature,
                StampKind::Image => AnnotationPayload::Pictures,
                StampKind::Standard | StampKind::Text => AnnotationPayload::Stamp,
            },
            AnnotationConverter::FreeText => {
                let font = props.font.clone().unwrap_or_default();
                let (family_name, style_name) = split_font_name(&font.name);
                AnnotationPayload::Freetext(FreeTextFields {
                    alpha: alpha(props.opacity),
                    alignment: props.alignment,
                    text_attribute: TextAttribute {
                        color: font.color,
                        font_size: font.size,
                        family_name,
                        style_name,
                    },
                })
            }
            AnnotationConverter::Link => AnnotationPayload::Link(LinkFields {
                action: props.action.as_ref().map(action_record),
            }),
        };

        Record {
            envelope: Envelope::new(page, annot),
            payload,
        }
    }
}

/// A missing fill is fully transparent
fn fill_alpha(fill: Option<Color>, opacity: Option<f32>) -> u8 {
    match fill {
        Some(_) => alpha(opacity),
        None => 0,
    }
}

/// Host view of an action. Mail links drop their scheme.
pub(super) fn action_record(action: &Action) -> ActionRecord {
    let uri = match action.kind {
        ActionKind::Uri => action.uri.as_deref().map(|uri| {
            if uri.starts_with("mailto:") {
                uri.replace("mailto:", "")
            } else {
                uri.to_string()
            }
        }),
        _ => None,
    };
    let page_index = match action.kind {
        ActionKind::GoTo => action.page_index,
        _ => None,
    };
    ActionRecord {
        action_type: action.kind,
        uri,
        page_index,
    }
}
