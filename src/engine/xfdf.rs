//! XFDF-style interchange for annotations and form field values
//!
//! Only the subset the bridge round-trips is modelled: annotation
//! geometry, text, color and dates, and one value per form field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::model::{Color, NativeAnnotation, Properties, Rect, Subtype, WidgetFields, WidgetKind};

const XFDF_NAMESPACE: &str = "http://ns.adobe.com/xfdf/";

/// Checked toggle value
const ON: &str = "Yes";
/// Unchecked toggle value
const OFF: &str = "Off";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "xfdf")]
struct XfdfDocument {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    #[serde(default)]
    annots: XfdfAnnots,
    #[serde(default)]
    fields: XfdfFields,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct XfdfAnnots {
    #[serde(rename = "annot", default)]
    items: Vec<XfdfAnnot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XfdfAnnot {
    #[serde(rename = "@subtype")]
    subtype: String,
    #[serde(rename = "@page")]
    page: usize,
    #[serde(rename = "@rect")]
    rect: String,
    #[serde(rename = "@title", default)]
    title: String,
    #[serde(rename = "@contents", default)]
    contents: String,
    #[serde(rename = "@color", default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(rename = "@opacity", default, skip_serializing_if = "Option::is_none")]
    opacity: Option<f32>,
    #[serde(rename = "@creationdate", default, skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(rename = "@date", default, skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct XfdfFields {
    #[serde(rename = "field", default)]
    items: Vec<XfdfField>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XfdfField {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value", default)]
    value: String,
}

/// A form field value read back from XFDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
}

/// Serialize `(page_index, annotation)` pairs
pub fn write_annotations<'a>(annotations: impl IntoIterator<Item = (usize, &'a NativeAnnotation)>) -> EngineResult<String> {
    let items = annotations
        .into_iter()
        .map(|(page, annot)| XfdfAnnot {
            subtype: annot.subtype.as_str().to_string(),
            page,
            rect: format_rect(&annot.rect),
            title: annot.title.clone(),
            contents: annot.content.clone(),
            color: annot.properties.color.map(|c| c.to_hex()),
            opacity: annot.properties.opacity,
            created: annot.created.map(|d| d.to_rfc3339()),
            modified: annot.modified.map(|d| d.to_rfc3339()),
        })
        .collect();

    write_document(XfdfDocument {
        xmlns: XFDF_NAMESPACE.to_string(),
        annots: XfdfAnnots { items },
        fields: XfdfFields::default(),
    })
}

/// Parse annotations. Ids are left at their default; the caller assigns them.
pub fn read_annotations(xml: &str) -> EngineResult<Vec<(usize, NativeAnnotation)>> {
    let doc: XfdfDocument = quick_xml::de::from_str(xml)?;
    doc.annots
        .items
        .into_iter()
        .map(|item| {
            let color = item
                .color
                .map(Color::try_from)
                .transpose()
                .map_err(EngineError::Format)?;
            let annot = NativeAnnotation::new(Subtype::from_name(&item.subtype), parse_rect(&item.rect)?)
                .with_title(item.title)
                .with_content(item.contents)
                .with_properties(Properties {
                    color,
                    opacity: item.opacity,
                    ..Properties::default()
                })
                .with_dates(parse_date(item.created), parse_date(item.modified));
            Ok((item.page, annot))
        })
        .collect()
}

/// Serialize one value per form field
pub fn write_fields<'a>(fields: impl IntoIterator<Item = &'a WidgetFields>) -> EngineResult<String> {
    let items = fields
        .into_iter()
        .map(|field| XfdfField {
            name: field.field_name.clone(),
            value: field_value(field),
        })
        .collect();

    write_document(XfdfDocument {
        xmlns: XFDF_NAMESPACE.to_string(),
        annots: XfdfAnnots::default(),
        fields: XfdfFields { items },
    })
}

pub fn read_fields(xml: &str) -> EngineResult<Vec<FieldValue>> {
    let doc: XfdfDocument = quick_xml::de::from_str(xml)?;
    Ok(doc
        .fields
        .items
        .into_iter()
        .map(|f| FieldValue {
            name: f.name,
            value: f.value,
        })
        .collect())
}

/// Apply an imported value to a field. Returns false for kinds that carry no value.
pub fn apply_field_value(field: &mut WidgetFields, value: &str) -> bool {
    match field.kind {
        WidgetKind::TextField => {
            field.text = value.to_string();
            true
        }
        WidgetKind::CheckBox | WidgetKind::RadioButton => {
            field.checked = value != OFF && !value.is_empty();
            true
        }
        WidgetKind::ListBox | WidgetKind::ComboBox => {
            field.selected = field
                .options
                .iter()
                .position(|o| o.value == value)
                .into_iter()
                .collect();
            true
        }
        WidgetKind::SignatureField | WidgetKind::PushButton | WidgetKind::Unknown => false,
    }
}

fn field_value(field: &WidgetFields) -> String {
    match field.kind {
        WidgetKind::TextField => field.text.clone(),
        WidgetKind::CheckBox | WidgetKind::RadioButton => {
            if field.checked { ON } else { OFF }.to_string()
        }
        WidgetKind::ListBox | WidgetKind::ComboBox => field
            .selected
            .first()
            .and_then(|&i| field.options.get(i))
            .map(|o| o.value.clone())
            .unwrap_or_default(),
        WidgetKind::SignatureField | WidgetKind::PushButton | WidgetKind::Unknown => String::new(),
    }
}

fn write_document(doc: XfdfDocument) -> EngineResult<String> {
    Ok(quick_xml::se::to_string(&doc)?)
}

fn format_rect(rect: &Rect) -> String {
    format!("{},{},{},{}", rect.left, rect.top, rect.right, rect.bottom)
}

fn parse_rect(raw: &str) -> EngineResult<Rect> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EngineError::Format(format!("invalid rect '{}': {}", raw, e)))?;

    match values.as_slice() {
        [left, top, right, bottom] => Ok(Rect::new(*left, *top, *right, *bottom)),
        _ => Err(EngineError::Format(format!("invalid rect '{}'", raw))),
    }
}

fn parse_date(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::ChoiceOption;
    use chrono::TimeZone;

    #[test]
    fn test_annotations_survive_export_import() {
        let modified = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let annot = NativeAnnotation::new(Subtype::Highlight, Rect::new(10.0, 20.5, 110.0, 40.0))
            .with_title("Reviewer")
            .with_content("check <this> & that")
            .with_properties(Properties {
                color: Some(Color(0xFFFF00)),
                opacity: Some(0.5),
                ..Properties::default()
            })
            .with_dates(None, Some(modified));

        let xml = write_annotations([(2, &annot)]).unwrap();
        assert!(xml.starts_with("<xfdf"));

        let back = read_annotations(&xml).unwrap();
        assert_eq!(back.len(), 1);
        let (page, imported) = &back[0];
        assert_eq!(*page, 2);
        assert_eq!(imported.subtype, Subtype::Highlight);
        assert_eq!(imported.rect, annot.rect);
        assert_eq!(imported.title, "Reviewer");
        assert_eq!(imported.content, "check <this> & that");
        assert_eq!(imported.properties.color, Some(Color(0xFFFF00)));
        assert_eq!(imported.properties.opacity, Some(0.5));
        assert_eq!(imported.created, None);
        assert_eq!(imported.modified, Some(modified));
    }

    #[test]
    fn test_field_values() {
        let mut text = WidgetFields {
            kind: WidgetKind::TextField,
            field_name: "name".to_string(),
            text: "Ada".to_string(),
            ..WidgetFields::default()
        };
        let mut check = WidgetFields {
            kind: WidgetKind::CheckBox,
            field_name: "agree".to_string(),
            checked: true,
            ..WidgetFields::default()
        };
        let mut choice = WidgetFields {
            kind: WidgetKind::ComboBox,
            field_name: "color".to_string(),
            options: vec![
                ChoiceOption { text: "Red".to_string(), value: "r".to_string() },
                ChoiceOption { text: "Blue".to_string(), value: "b".to_string() },
            ],
            selected: vec![1],
            ..WidgetFields::default()
        };

        let xml = write_fields([&text, &check, &choice]).unwrap();
        let values = read_fields(&xml).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue { name: "name".to_string(), value: "Ada".to_string() },
                FieldValue { name: "agree".to_string(), value: "Yes".to_string() },
                FieldValue { name: "color".to_string(), value: "b".to_string() },
            ]
        );

        assert!(apply_field_value(&mut text, "Grace"));
        assert_eq!(text.text, "Grace");
        assert!(apply_field_value(&mut check, "Off"));
        assert!(!check.checked);
        assert!(apply_field_value(&mut choice, "r"));
        assert_eq!(choice.selected, vec![0]);
    }

    #[test]
    fn test_bad_rect_is_format_error() {
        assert!(matches!(parse_rect("1,2,3"), Err(EngineError::Format(_))));
        assert!(matches!(parse_rect("a,b,c,d"), Err(EngineError::Format(_))));
    }
}
