//! Form widget converters and the mutations they accept

use crate::engine::model::{NativeAnnotation, WidgetFields, WidgetKind};

use super::annotation::action_record;
use super::record::{
    ChoiceFields, Envelope, FontFields, PushButtonFields, Record, SignatureFields, TextFieldFields, ToggleFields,
    WidgetPayload, WidgetRecord,
};
use super::{split_font_name, ConvertError, Mutation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetConverter {
    TextField,
    /// List box and combo box
    Choice,
    /// Check box and radio button
    Toggle,
    Signature,
    PushButton,
}

impl WidgetConverter {
    pub fn for_kind(kind: WidgetKind) -> Option<Self> {
        match kind {
            WidgetKind::TextField => Some(WidgetConverter::TextField),
            WidgetKind::ListBox | WidgetKind::ComboBox => Some(WidgetConverter::Choice),
            WidgetKind::RadioButton | WidgetKind::CheckBox => Some(WidgetConverter::Toggle),
            WidgetKind::SignatureField => Some(WidgetConverter::Signature),
            WidgetKind::PushButton => Some(WidgetConverter::PushButton),
            WidgetKind::Unknown => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WidgetConverter::TextField => "textField",
            WidgetConverter::Choice => "choice",
            WidgetConverter::Toggle => "toggle",
            WidgetConverter::Signature => "signaturesFields",
            WidgetConverter::PushButton => "pushButton",
        }
    }

    pub fn serialize(self, page: usize, annot: &NativeAnnotation, fields: &WidgetFields) -> WidgetRecord {
        let payload = match self {
            WidgetConverter::TextField => WidgetPayload::TextField(TextFieldFields {
                text: fields.text.clone(),
                is_multiline: fields.multiline,
                alignment: annot.properties.alignment,
                font: font_fields(annot),
            }),
            WidgetConverter::Choice => {
                let choice = ChoiceFields {
                    options: fields.options.clone(),
                    selected_indexes: fields.selected.clone(),
                    font: font_fields(annot),
                };
                if fields.kind == WidgetKind::ListBox {
                    WidgetPayload::ListBox(choice)
                } else {
                    WidgetPayload::ComboBox(choice)
                }
            }
            WidgetConverter::Toggle => {
                let toggle = ToggleFields {
                    is_checked: fields.checked,
                    check_style: fields.check_style,
                    check_color: fields.check_color,
                };
                if fields.kind == WidgetKind::RadioButton {
                    WidgetPayload::RadioButton(toggle)
                } else {
                    WidgetPayload::CheckBox(toggle)
                }
            }
            WidgetConverter::Signature => WidgetPayload::SignatureField(SignatureFields {
                is_signed: fields.signed,
            }),
            WidgetConverter::PushButton => WidgetPayload::PushButton(PushButtonFields {
                button_title: fields.button_title.clone(),
                action: annot.properties.action.as_ref().map(action_record),
                font: font_fields(annot),
            }),
        };

        let mut envelope = Envelope::new(page, annot);
        envelope.title = fields.field_name.clone();
        Record { envelope, payload }
    }

    pub fn supports(self, mutation: &Mutation) -> bool {
        matches!(
            (self, mutation),
            (WidgetConverter::TextField, Mutation::SetText(_))
                | (WidgetConverter::Toggle, Mutation::SetChecked(_))
                | (WidgetConverter::Signature, Mutation::SetSignatureImage(_))
        )
    }

    /// Apply a mutation and mark the annotation modified.
    pub fn apply(self, annot: &mut NativeAnnotation, mutation: Mutation) -> Result<(), ConvertError> {
        if !self.supports(&mutation) {
            return Err(ConvertError::UnsupportedMutation {
                mutation: mutation.name(),
                variant: self.name(),
            });
        }
        let Some(fields) = annot.widget.as_mut() else {
            return Err(ConvertError::UnsupportedMutation {
                mutation: mutation.name(),
                variant: annot.subtype.as_str(),
            });
        };

        match mutation {
            Mutation::SetText(text) => fields.text = text,
            Mutation::SetChecked(checked) => fields.checked = checked,
            Mutation::SetSignatureImage(image) => {
                fields.signature = Some(image);
                fields.signed = true;
            }
        }
        annot.touch();
        Ok(())
    }
}

fn font_fields(annot: &NativeAnnotation) -> FontFields {
    let font = annot.properties.font.clone().unwrap_or_default();
    let (family_name, style_name) = split_font_name(&font.name);
    FontFields {
        font_color: font.color,
        font_size: font.size,
        family_name,
        style_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::{ChoiceOption, Rect, SignatureImage};

    fn widget(kind: WidgetKind) -> NativeAnnotation {
        NativeAnnotation::widget(kind, "field", Rect::default())
    }

    fn fields(annot: &NativeAnnotation) -> &WidgetFields {
        annot.widget.as_ref().unwrap()
    }

    #[test]
    fn test_set_text_round_trip() {
        let mut annot = widget(WidgetKind::TextField);
        WidgetConverter::TextField
            .apply(&mut annot, Mutation::SetText("X".to_string()))
            .unwrap();
        assert!(annot.appearance_stale);
        assert!(annot.modified.is_some());

        let record = WidgetConverter::TextField.serialize(0, &annot, fields(&annot));
        match &record.payload {
            WidgetPayload::TextField(f) => assert_eq!(f.text, "X"),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(record.envelope.title, "field");
    }

    #[test]
    fn test_unsupported_mutation_is_rejected() {
        let mut annot = widget(WidgetKind::CheckBox);
        let err = WidgetConverter::Toggle
            .apply(&mut annot, Mutation::SetText("nope".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedMutation {
                mutation: "setText",
                variant: "toggle"
            }
        ));
        assert!(!annot.appearance_stale);

        let mut button = widget(WidgetKind::PushButton);
        assert!(WidgetConverter::PushButton
            .apply(&mut button, Mutation::SetChecked(true))
            .is_err());
    }

    #[test]
    fn test_toggle_kinds() {
        let mut radio = widget(WidgetKind::RadioButton);
        WidgetConverter::Toggle
            .apply(&mut radio, Mutation::SetChecked(true))
            .unwrap();
        let value = serde_json::to_value(WidgetConverter::Toggle.serialize(0, &radio, fields(&radio))).unwrap();
        assert_eq!(value["type"], "radioButton");
        assert_eq!(value["isChecked"], true);
        assert_eq!(value["checkStyle"], "check");
    }

    #[test]
    fn test_signature_image_marks_signed() {
        let mut sig = widget(WidgetKind::SignatureField);
        let before = WidgetConverter::Signature.serialize(0, &sig, fields(&sig));
        assert_eq!(before.payload, WidgetPayload::SignatureField(SignatureFields { is_signed: false }));

        let image = SignatureImage {
            width: 2,
            height: 1,
            rgba: vec![0; 8],
        };
        WidgetConverter::Signature
            .apply(&mut sig, Mutation::SetSignatureImage(image))
            .unwrap();
        let after = WidgetConverter::Signature.serialize(0, &sig, fields(&sig));
        assert_eq!(after.payload, WidgetPayload::SignatureField(SignatureFields { is_signed: true }));
    }

    #[test]
    fn test_choice_options() {
        let mut combo = widget(WidgetKind::ComboBox);
        if let Some(f) = combo.widget.as_mut() {
            f.options = vec![
                ChoiceOption { text: "One".to_string(), value: "1".to_string() },
                ChoiceOption { text: "Two".to_string(), value: "2".to_string() },
            ];
            f.selected = vec![1];
        }
        let value = serde_json::to_value(WidgetConverter::Choice.serialize(2, &combo, fields(&combo))).unwrap();
        assert_eq!(value["type"], "comboBox");
        assert_eq!(value["options"][1]["text"], "Two");
        assert_eq!(value["selectedIndexes"], serde_json::json!([1]));
        assert_eq!(value["styleName"], "Regular");
    }
}
