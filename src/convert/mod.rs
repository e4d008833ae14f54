//! Converter registry
//!
//! Maps engine annotations onto flat host records. The table is the
//! pair of `for_subtype`/`for_kind` matches, so an unhandled variant is
//! a compile error rather than a missing map entry. Elements without a
//! converter are skipped, never reported as errors.
//!
//! Records are rebuilt from the live engine state on every call.

mod annotation;
pub mod record;
mod widget;

use thiserror::Error;

use crate::engine::model::{NativeAnnotation, SignatureImage, Subtype, WidgetKind};
use crate::engine::{EngineDocument, EngineError, EngineResult, NativeId};

pub use annotation::AnnotationConverter;
pub use record::{AnnotationRecord, WidgetRecord};
pub use widget::WidgetConverter;

/// Font style suffixes recognised after the last `-` of a font name
const STYLE_NAMES: &[&str] = &[
    "Regular",
    "Bold",
    "Italic",
    "Oblique",
    "BoldItalic",
    "BoldOblique",
];

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no annotation with identity {identity} on page {page_index}")]
    NotFound { page_index: usize, identity: String },

    #[error("{mutation} is not supported by {variant}")]
    UnsupportedMutation {
        mutation: &'static str,
        variant: &'static str,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A change the host may push back onto a live widget
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetText(String),
    SetChecked(bool),
    SetSignatureImage(SignatureImage),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetText(_) => "setText",
            Mutation::SetChecked(_) => "setChecked",
            Mutation::SetSignatureImage(_) => "setSignatureImage",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConverterRegistry;

impl ConverterRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn annotation_converter(&self, subtype: Subtype) -> Option<AnnotationConverter> {
        AnnotationConverter::for_subtype(subtype)
    }

    pub fn widget_converter(&self, kind: WidgetKind) -> Option<WidgetConverter> {
        WidgetConverter::for_kind(kind)
    }

    /// Records for a page's annotations in native order. Widgets are left
    /// to [`ConverterRegistry::get_widgets`].
    pub fn get_annotations(&self, doc: &dyn EngineDocument, page_index: usize) -> EngineResult<Vec<AnnotationRecord>> {
        let annotations = doc.annotations(page_index)?;
        let records: Vec<_> = annotations
            .iter()
            .filter_map(|annot| {
                self.annotation_converter(annot.subtype)
                    .map(|converter| converter.serialize(page_index, annot))
            })
            .collect();

        tracing::debug!(
            page_index,
            native = annotations.len(),
            records = records.len(),
            "annotations converted"
        );
        Ok(records)
    }

    /// Records for a page's form widgets in native order
    pub fn get_widgets(&self, doc: &dyn EngineDocument, page_index: usize) -> EngineResult<Vec<WidgetRecord>> {
        let records = doc
            .annotations(page_index)?
            .iter()
            .filter(|annot| annot.is_widget())
            .filter_map(|annot| {
                let fields = annot.widget.as_ref()?;
                self.widget_converter(fields.kind)
                    .map(|converter| converter.serialize(page_index, annot, fields))
            })
            .collect();
        Ok(records)
    }

    /// Linear scan of a page for an identity string
    pub fn find_by_identity<'a>(
        &self,
        doc: &'a dyn EngineDocument,
        page_index: usize,
        identity: &str,
    ) -> Result<&'a NativeAnnotation, ConvertError> {
        let not_found = || ConvertError::NotFound {
            page_index,
            identity: identity.to_string(),
        };
        let id: NativeId = identity.parse().map_err(|_| not_found())?;
        doc.annotations(page_index)?
            .iter()
            .find(|annot| annot.id == id)
            .ok_or_else(not_found)
    }

    /// Apply a mutation to a live object. The variant decides what it accepts.
    pub fn apply_mutation(&self, annot: &mut NativeAnnotation, mutation: Mutation) -> Result<(), ConvertError> {
        let converter = annot
            .widget_kind()
            .and_then(|kind| self.widget_converter(kind))
            .ok_or(ConvertError::UnsupportedMutation {
                mutation: mutation.name(),
                variant: annot.subtype.as_str(),
            })?;
        converter.apply(annot, mutation)
    }

    /// Resolve an identity on a page and apply a mutation to it.
    ///
    /// Support is checked before the engine hands out a mutable reference,
    /// so a rejected mutation leaves the document unmodified.
    pub fn mutate(
        &self,
        doc: &mut dyn EngineDocument,
        page_index: usize,
        identity: &str,
        mutation: Mutation,
    ) -> Result<NativeId, ConvertError> {
        let target = self.find_by_identity(&*doc, page_index, identity)?;
        let id = target.id;
        let supported = target
            .widget_kind()
            .and_then(|kind| self.widget_converter(kind))
            .map_or(false, |converter| converter.supports(&mutation));
        if !supported {
            return Err(ConvertError::UnsupportedMutation {
                mutation: mutation.name(),
                variant: variant_name(target),
            });
        }

        let annot = doc
            .annotation_mut(page_index, id)?
            .ok_or_else(|| ConvertError::NotFound {
                page_index,
                identity: identity.to_string(),
            })?;
        self.apply_mutation(annot, mutation)?;
        Ok(id)
    }
}

fn variant_name(annot: &NativeAnnotation) -> &'static str {
    annot
        .widget_kind()
        .and_then(WidgetConverter::for_kind)
        .map_or(annot.subtype.as_str(), WidgetConverter::name)
}

/// Opacity in 0..=1 to an 8-bit alpha; absent means opaque
pub(crate) fn alpha(opacity: Option<f32>) -> u8 {
    (opacity.unwrap_or(1.0).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Split `Family-Style` into family and style names
pub(crate) fn split_font_name(name: &str) -> (String, String) {
    match name.rsplit_once('-') {
        Some((family, style)) if !family.is_empty() && STYLE_NAMES.contains(&style) => {
            (family.to_string(), style.to_string())
        }
        _ => (name.to_string(), "Regular".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryDocumentData, MemoryEngine, MemoryPage};
    use crate::engine::model::Rect;
    use crate::engine::Engine;
    use std::path::Path;

    fn open_sample() -> Box<dyn EngineDocument> {
        let engine = MemoryEngine::new();
        engine.library().insert(
            "annots.pdf",
            MemoryDocumentData::new().with_page(
                MemoryPage::a4()
                    .with_annotation(NativeAnnotation::new(Subtype::Highlight, Rect::default()))
                    .with_annotation(NativeAnnotation::new(Subtype::Popup, Rect::default()))
                    .with_annotation(NativeAnnotation::widget(WidgetKind::TextField, "name", Rect::default()))
                    .with_annotation(NativeAnnotation::new(Subtype::Text, Rect::default()))
                    .with_annotation(NativeAnnotation::new(Subtype::Polygon, Rect::default()))
                    .with_annotation(NativeAnnotation::widget(WidgetKind::Unknown, "odd", Rect::default()))
                    .with_annotation(NativeAnnotation::widget(WidgetKind::CheckBox, "agree", Rect::default())),
            ),
        );
        engine.open(Path::new("annots.pdf"), None).unwrap()
    }

    fn identity_of(doc: &dyn EngineDocument, subtype: Subtype, kind: Option<WidgetKind>) -> String {
        doc.annotations(0)
            .unwrap()
            .iter()
            .find(|a| a.subtype == subtype && a.widget_kind() == kind)
            .unwrap()
            .id
            .to_string()
    }

    #[test]
    fn test_get_annotations_skips_unconverted_in_order() {
        let doc = open_sample();
        let registry = ConverterRegistry::new();
        let records = registry.get_annotations(doc.as_ref(), 0).unwrap();
        let tags: Vec<_> = records.iter().map(|r| r.variant_tag()).collect();
        assert_eq!(tags, vec!["highlight", "note"]);
    }

    #[test]
    fn test_get_widgets_only_known_kinds() {
        let doc = open_sample();
        let records = ConverterRegistry::new().get_widgets(doc.as_ref(), 0).unwrap();
        let tags: Vec<_> = records.iter().map(|r| r.variant_tag()).collect();
        assert_eq!(tags, vec!["textField", "checkBox"]);
        assert_eq!(records[0].envelope.title, "name");
    }

    #[test]
    fn test_find_by_identity() {
        let doc = open_sample();
        let registry = ConverterRegistry::new();
        let identity = identity_of(doc.as_ref(), Subtype::Text, None);
        let found = registry.find_by_identity(doc.as_ref(), 0, &identity).unwrap();
        assert_eq!(found.subtype, Subtype::Text);

        assert!(matches!(
            registry.find_by_identity(doc.as_ref(), 0, "12345"),
            Err(ConvertError::NotFound { page_index: 0, .. })
        ));
        assert!(matches!(
            registry.find_by_identity(doc.as_ref(), 0, "not-a-number"),
            Err(ConvertError::NotFound { .. })
        ));
        assert!(matches!(
            registry.find_by_identity(doc.as_ref(), 9, &identity),
            Err(ConvertError::Engine(EngineError::PageOutOfRange(9, 1)))
        ));
    }

    #[test]
    fn test_mutate_text_field_reflects_in_records() {
        let mut doc = open_sample();
        let registry = ConverterRegistry::new();
        let identity = identity_of(doc.as_ref(), Subtype::Widget, Some(WidgetKind::TextField));

        registry
            .mutate(doc.as_mut(), 0, &identity, Mutation::SetText("X".to_string()))
            .unwrap();
        assert!(doc.has_changes());

        let records = registry.get_widgets(doc.as_ref(), 0).unwrap();
        let value = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(value["text"], "X");
        assert_eq!(value["uuid"], identity);
    }

    #[test]
    fn test_rejected_mutation_leaves_document_clean() {
        let mut doc = open_sample();
        let registry = ConverterRegistry::new();
        let note = identity_of(doc.as_ref(), Subtype::Text, None);
        let err = registry
            .mutate(doc.as_mut(), 0, &note, Mutation::SetChecked(true))
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedMutation { variant: "text", .. }));

        let check = identity_of(doc.as_ref(), Subtype::Widget, Some(WidgetKind::CheckBox));
        let err = registry
            .mutate(doc.as_mut(), 0, &check, Mutation::SetText("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedMutation { variant: "toggle", .. }));
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_split_font_name() {
        assert_eq!(
            split_font_name("Helvetica-Bold"),
            ("Helvetica".to_string(), "Bold".to_string())
        );
        assert_eq!(
            split_font_name("Times-Roman"),
            ("Times-Roman".to_string(), "Regular".to_string())
        );
        assert_eq!(split_font_name("Helv"), ("Helv".to_string(), "Regular".to_string()));
    }

    #[test]
    fn test_alpha() {
        assert_eq!(alpha(None), 255);
        assert_eq!(alpha(Some(0.5)), 128);
        assert_eq!(alpha(Some(-1.0)), 0);
    }
}
