//! Read-only engine over PDF files, backed by MuPDF
//!
//! Annotations and form widgets are read once at open time by walking
//! the page tree's `/Annots` arrays. The text layer is read from MuPDF's
//! structured text on every request, so layout changes are picked up.
//! Every mutation fails with a `read-only` engine error.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ::mupdf::pdf::{PdfDocument, PdfObject};
use ::mupdf::{Document, TextPageOptions};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::error::{EngineError, EngineResult};
use super::model::{
    Action, ActionKind, BorderEffect, ChoiceOption, Color, Font, LineEnding, NativeAnnotation, NativeId,
    Properties, Rect, StampKind, Subtype, TextAlignment, WidgetFields, WidgetKind,
};
use super::{
    xfdf, DocumentSnapshot, EncryptAlgo, Engine, EngineDocument, PasswordSettings, PendingSave, Permissions,
    SnapshotOptions,
};

/// Guard against cyclic page trees and field hierarchies
const MAX_TREE_DEPTH: usize = 32;

// Field flag bits (PDF 32000-1, 12.7.4)
const FF_MULTILINE: u32 = 1 << 12;
const FF_RADIO: u32 = 1 << 15;
const FF_PUSHBUTTON: u32 = 1 << 16;
const FF_COMBO: u32 = 1 << 17;

type MuResult<T> = Result<T, ::mupdf::Error>;

#[derive(Debug, Clone, Default)]
pub struct MupdfEngine {
    next_id: Arc<AtomicU64>,
}

impl MupdfEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MupdfEngine {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    fn open(&self, path: &Path, password: Option<&str>) -> EngineResult<Box<dyn EngineDocument>> {
        let path_str = path.to_string_lossy();
        let mut doc = Document::open(&*path_str)?;

        let encrypted = doc.needs_password()?;
        if encrypted && !doc.authenticate(password.unwrap_or(""))? {
            return Err(EngineError::Password("incorrect password".to_string()));
        }

        let page_count = doc.page_count()?.max(0) as usize;
        let mut annotations = if encrypted {
            Vec::new()
        } else {
            read_annotations(&path_str, &self.next_id).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "failed to read annotations: {}", e);
                Vec::new()
            })
        };
        annotations.resize_with(page_count, Vec::new);

        let encrypt_algo = if encrypted {
            read_encrypt_version(&path_str)
                .map(encrypt_algo_for_version)
                .unwrap_or(EncryptAlgo::Rc4)
        } else {
            EncryptAlgo::NoEncryptAlgo
        };

        tracing::debug!(path = %path.display(), page_count, encrypted, "mupdf document opened");
        Ok(Box::new(MupdfDocument {
            path: path.to_path_buf(),
            password: password.map(str::to_string),
            next_id: self.next_id.clone(),
            doc,
            page_count,
            annotations,
            encrypted,
            encrypt_algo,
        }))
    }
}

/// A PDF opened read-only
pub struct MupdfDocument {
    path: PathBuf,
    password: Option<String>,
    next_id: Arc<AtomicU64>,
    doc: Document,
    page_count: usize,
    annotations: Vec<Vec<NativeAnnotation>>,
    encrypted: bool,
    encrypt_algo: EncryptAlgo,
}

impl MupdfDocument {
    fn check_page(&self, page_index: usize) -> EngineResult<()> {
        if page_index >= self.page_count {
            return Err(EngineError::PageOutOfRange(page_index, self.page_count));
        }
        Ok(())
    }

    fn read_only<T>(&self, what: &str) -> EngineResult<T> {
        Err(EngineError::ReadOnly(format!("{} is not supported for {}", what, self.path.display())))
    }
}

impl EngineDocument for MupdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn annotations(&self, page_index: usize) -> EngineResult<&[NativeAnnotation]> {
        self.check_page(page_index)?;
        Ok(&self.annotations[page_index])
    }

    fn annotation_mut(&mut self, _page_index: usize, _id: NativeId) -> EngineResult<Option<&mut NativeAnnotation>> {
        self.read_only("editing annotations")
    }

    fn delete_annotation(&mut self, _page_index: usize, _id: NativeId) -> EngineResult<bool> {
        self.read_only("deleting annotations")
    }

    fn remove_all_annotations(&mut self) -> EngineResult<bool> {
        self.read_only("removing annotations")
    }

    fn update_appearance(&mut self, _page_index: usize, _id: NativeId) -> EngineResult<bool> {
        self.read_only("updating appearances")
    }

    fn page_text(&self, page_index: usize) -> EngineResult<String> {
        self.check_page(page_index)?;
        let page = self.doc.load_page(page_index as i32)?;
        let text_page = page.to_text_page(TextPageOptions::empty())?;

        let mut text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                if !text.is_empty() {
                    text.push('\n');
                }
                for ch in line.chars() {
                    if let Some(c) = ch.char() {
                        text.push(c);
                    }
                }
            }
        }
        Ok(text)
    }

    fn has_changes(&self) -> bool {
        false
    }

    fn begin_save(&mut self) -> EngineResult<PendingSave> {
        self.read_only("saving")
    }

    fn finish_save(&mut self, _revision: u64) -> bool {
        true
    }

    fn reload(&mut self) -> EngineResult<()> {
        let path_str = self.path.to_string_lossy().into_owned();
        let mut doc = Document::open(&path_str)?;
        if doc.needs_password()? && !doc.authenticate(self.password.as_deref().unwrap_or(""))? {
            return Err(EngineError::Password("incorrect password".to_string()));
        }
        self.page_count = doc.page_count()?.max(0) as usize;
        self.doc = doc;

        let mut annotations = if self.encrypted {
            Vec::new()
        } else {
            read_annotations(&path_str, &self.next_id)?
        };
        annotations.resize_with(self.page_count, Vec::new);
        self.annotations = annotations;
        Ok(())
    }

    fn snapshot(&self, options: &SnapshotOptions) -> EngineResult<Box<dyn DocumentSnapshot>> {
        if options.flatten || options.remove_security || options.pages.is_some() {
            return self.read_only("rewriting the document");
        }
        Ok(Box::new(FileCopySnapshot {
            source: self.path.clone(),
        }))
    }

    fn insert_blank_page(&mut self, _page_index: usize, _width: f32, _height: f32) -> EngineResult<()> {
        self.read_only("inserting pages")
    }

    fn import_pages(&mut self, _source: &Path, _password: Option<&str>, _pages: &[usize], _position: usize) -> EngineResult<()> {
        self.read_only("importing pages")
    }

    fn export_annotations(&self) -> EngineResult<String> {
        let annotations = self.annotations.iter().enumerate().flat_map(|(page, annots)| {
            annots.iter().filter(|a| !a.is_widget()).map(move |a| (page, a))
        });
        xfdf::write_annotations(annotations)
    }

    fn import_annotations(&mut self, _xfdf: &str) -> EngineResult<usize> {
        self.read_only("importing annotations")
    }

    fn export_widgets(&self) -> EngineResult<String> {
        xfdf::write_fields(self.annotations.iter().flatten().filter_map(|a| a.widget.as_ref()))
    }

    fn import_widgets(&mut self, _xfdf: &str) -> EngineResult<usize> {
        self.read_only("importing form data")
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn permissions(&self) -> Permissions {
        if self.encrypted {
            Permissions::User
        } else {
            Permissions::None
        }
    }

    fn encrypt_algo(&self) -> EncryptAlgo {
        self.encrypt_algo
    }

    fn owner_unlocked(&self) -> bool {
        !self.encrypted
    }

    fn check_owner_password(&mut self, _password: &str) -> bool {
        false
    }

    fn set_password(&mut self, _settings: &PasswordSettings) -> EngineResult<()> {
        self.read_only("changing passwords")
    }

    fn remove_password(&mut self) -> EngineResult<()> {
        self.read_only("removing passwords")
    }
}

/// Save-as for an unmodified file is a byte copy
struct FileCopySnapshot {
    source: PathBuf,
}

impl DocumentSnapshot for FileCopySnapshot {
    fn write_to(&self, path: &Path) -> EngineResult<()> {
        if path == self.source {
            return Ok(());
        }
        std::fs::copy(&self.source, path)?;
        Ok(())
    }
}

fn read_encrypt_version(path: &str) -> Option<i32> {
    let pdf = PdfDocument::open(path).ok()?;
    let trailer = pdf.trailer().ok()?;
    let encrypt = trailer.get_dict("Encrypt").ok()??;
    encrypt.get_dict("V").ok()??.as_int().ok()
}

/// Map the `/Encrypt /V` version to an algorithm family
fn encrypt_algo_for_version(version: i32) -> EncryptAlgo {
    match version {
        4 => EncryptAlgo::Aes128,
        5 | 6 => EncryptAlgo::Aes256,
        _ => EncryptAlgo::Rc4,
    }
}

/// Read every page's annotations, in page order
fn read_annotations(path: &str, next_id: &AtomicU64) -> MuResult<Vec<Vec<NativeAnnotation>>> {
    let pdf = PdfDocument::open(path)?;
    let trailer = pdf.trailer()?;
    let Some(root) = trailer.get_dict("Root")? else {
        return Ok(Vec::new());
    };
    let Some(pages) = root.get_dict("Pages")? else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    walk_page_tree(&pages, 0, &mut |page| {
        out.push(page_annotations(page, next_id)?);
        Ok(())
    })?;
    Ok(out)
}

fn walk_page_tree(
    node: &PdfObject,
    depth: usize,
    visit: &mut dyn FnMut(&PdfObject) -> MuResult<()>,
) -> MuResult<()> {
    if depth > MAX_TREE_DEPTH {
        return Ok(());
    }
    match node.get_dict("Kids")? {
        Some(kids) => {
            for i in 0..kids.len()? {
                if let Some(kid) = kids.get_array(i as i32)? {
                    walk_page_tree(&kid, depth + 1, visit)?;
                }
            }
            Ok(())
        }
        None => visit(node),
    }
}

fn page_annotations(page: &PdfObject, next_id: &AtomicU64) -> MuResult<Vec<NativeAnnotation>> {
    let Some(annots) = page.get_dict("Annots")? else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for i in 0..annots.len()? {
        if let Some(obj) = annots.get_array(i as i32)? {
            let mut annot = read_annotation(&obj)?;
            annot.id = NativeId(next_id.fetch_add(1, Ordering::Relaxed) + 1);
            out.push(annot);
        }
    }
    Ok(out)
}

fn read_annotation(obj: &PdfObject) -> MuResult<NativeAnnotation> {
    let subtype = name(obj, "Subtype")?
        .map(|n| Subtype::from_pdf_name(&n))
        .unwrap_or(Subtype::Unknown);

    let line_endings = names(obj, "LE")?;
    let properties = Properties {
        color: color(obj, "C")?,
        opacity: float(obj, "CA")?,
        fill_color: color(obj, "IC")?,
        fill_opacity: None,
        border_width: border_width(obj)?,
        border_effect: border_effect(obj)?,
        line_head: line_endings
            .first()
            .map(|n| LineEnding::from_pdf_name(n))
            .unwrap_or_default(),
        line_tail: line_endings
            .get(1)
            .map(|n| LineEnding::from_pdf_name(n))
            .unwrap_or_default(),
        marked_text: None,
        stamp: if subtype == Subtype::Stamp && name(obj, "Name")?.is_none() {
            StampKind::Image
        } else {
            StampKind::Standard
        },
        alignment: int(obj, "Q")?.map(TextAlignment::from_quadding).unwrap_or_default(),
        font: inherited(obj, "DA", 0)?
            .and_then(|da| da.as_string().ok().map(parse_default_appearance)),
        action: action(obj)?,
    };

    let mut annot = NativeAnnotation::new(subtype, rect(obj)?)
        .with_title(string(obj, "T")?.unwrap_or_default())
        .with_content(string(obj, "Contents")?.unwrap_or_default())
        .with_properties(properties)
        .with_dates(
            string(obj, "CreationDate")?.as_deref().and_then(parse_pdf_date),
            string(obj, "M")?.as_deref().and_then(parse_pdf_date),
        );

    if subtype == Subtype::Widget {
        let widget = read_widget(obj)?;
        annot.title = widget.field_name.clone();
        annot.widget = Some(widget);
    }
    Ok(annot)
}

fn read_widget(obj: &PdfObject) -> MuResult<WidgetFields> {
    let flags = inherited(obj, "Ff", 0)?
        .and_then(|f| f.as_int().ok())
        .unwrap_or(0) as u32;
    let field_type = inherited(obj, "FT", 0)?.and_then(|ft| ft.as_name().ok().map(<[u8]>::to_vec));

    let kind = match field_type.as_deref() {
        Some(b"Tx") => WidgetKind::TextField,
        Some(b"Btn") if flags & FF_PUSHBUTTON != 0 => WidgetKind::PushButton,
        Some(b"Btn") if flags & FF_RADIO != 0 => WidgetKind::RadioButton,
        Some(b"Btn") => WidgetKind::CheckBox,
        Some(b"Ch") if flags & FF_COMBO != 0 => WidgetKind::ComboBox,
        Some(b"Ch") => WidgetKind::ListBox,
        Some(b"Sig") => WidgetKind::SignatureField,
        _ => WidgetKind::Unknown,
    };

    let value = inherited(obj, "V", 0)?.and_then(|v| {
        v.as_string()
            .ok()
            .map(str::to_string)
            .or_else(|| v.as_name().ok().map(|n| String::from_utf8_lossy(n).into_owned()))
    });
    let appearance_state = name(obj, "AS")?;

    let options = match inherited(obj, "Opt", 0)? {
        Some(opt) => choice_options(&opt)?,
        None => Vec::new(),
    };
    let selected = value
        .as_deref()
        .and_then(|v| options.iter().position(|o| o.value == v))
        .into_iter()
        .collect();

    let button_title = match obj.get_dict("MK")? {
        Some(mk) => string(&mk, "CA")?.unwrap_or_default(),
        None => String::new(),
    };

    let checked = match appearance_state.as_deref() {
        Some(state) => state != b"Off",
        None => value.as_deref().map_or(false, |v| v != "Off"),
    };

    Ok(WidgetFields {
        kind,
        field_name: inherited(obj, "T", 0)?
            .and_then(|t| t.as_string().ok().map(str::to_string))
            .unwrap_or_default(),
        text: if kind == WidgetKind::TextField {
            value.clone().unwrap_or_default()
        } else {
            String::new()
        },
        multiline: flags & FF_MULTILINE != 0,
        checked,
        signed: kind == WidgetKind::SignatureField && value.is_some(),
        options,
        selected,
        button_title,
        ..WidgetFields::default()
    })
}

fn choice_options(opt: &PdfObject) -> MuResult<Vec<ChoiceOption>> {
    let mut options = Vec::new();
    for i in 0..opt.len()? {
        let Some(item) = opt.get_array(i as i32)? else {
            continue;
        };
        if item.is_array()? {
            let value = item
                .get_array(0)?
                .and_then(|v| v.as_string().ok().map(str::to_string))
                .unwrap_or_default();
            let text = item
                .get_array(1)?
                .and_then(|v| v.as_string().ok().map(str::to_string))
                .unwrap_or_else(|| value.clone());
            options.push(ChoiceOption { text, value });
        } else {
            let text = item.as_string().unwrap_or("").to_string();
            options.push(ChoiceOption {
                value: text.clone(),
                text,
            });
        }
    }
    Ok(options)
}

fn action(obj: &PdfObject) -> MuResult<Option<Action>> {
    let Some(a) = obj.get_dict("A")? else {
        return Ok(obj.get_dict("Dest")?.map(|_| Action {
            kind: ActionKind::GoTo,
            ..Action::default()
        }));
    };
    let kind = name(&a, "S")?
        .map(|n| ActionKind::from_pdf_name(&n))
        .unwrap_or_default();
    Ok(Some(Action {
        kind,
        uri: string(&a, "URI")?,
        page_index: None,
    }))
}

fn rect(obj: &PdfObject) -> MuResult<Rect> {
    match floats(obj, "Rect")?.as_slice() {
        [x0, y0, x1, y1] => Ok(Rect::new(x0.min(*x1), y0.max(*y1), x0.max(*x1), y0.min(*y1))),
        _ => Ok(Rect::default()),
    }
}

fn color(obj: &PdfObject, key: &str) -> MuResult<Option<Color>> {
    Ok(match floats(obj, key)?.as_slice() {
        [g] => Some(Color::from_components(*g, *g, *g)),
        [r, g, b] => Some(Color::from_components(*r, *g, *b)),
        [c, m, y, k] => Some(Color::from_components(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )),
        _ => None,
    })
}

fn border_width(obj: &PdfObject) -> MuResult<Option<f32>> {
    if let Some(bs) = obj.get_dict("BS")? {
        if let Some(w) = float(&bs, "W")? {
            return Ok(Some(w));
        }
    }
    Ok(floats(obj, "Border")?.get(2).copied())
}

fn border_effect(obj: &PdfObject) -> MuResult<BorderEffect> {
    let cloudy = match obj.get_dict("BE")? {
        Some(be) => name(&be, "S")?.as_deref() == Some(b"C".as_slice()),
        None => false,
    };
    Ok(if cloudy { BorderEffect::Cloudy } else { BorderEffect::Solid })
}

/// Look a key up on a field and then its ancestors
fn inherited(obj: &PdfObject, key: &str, depth: usize) -> MuResult<Option<PdfObject>> {
    if let Some(value) = obj.get_dict(key)? {
        return Ok(Some(value));
    }
    if depth >= MAX_TREE_DEPTH {
        return Ok(None);
    }
    match obj.get_dict("Parent")? {
        Some(parent) => inherited(&parent, key, depth + 1),
        None => Ok(None),
    }
}

fn string(obj: &PdfObject, key: &str) -> MuResult<Option<String>> {
    Ok(obj
        .get_dict(key)?
        .and_then(|v| v.as_string().ok().map(str::to_string)))
}

fn name(obj: &PdfObject, key: &str) -> MuResult<Option<Vec<u8>>> {
    Ok(obj
        .get_dict(key)?
        .and_then(|v| v.as_name().ok().map(<[u8]>::to_vec)))
}

fn names(obj: &PdfObject, key: &str) -> MuResult<Vec<Vec<u8>>> {
    let Some(array) = obj.get_dict(key)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for i in 0..array.len()? {
        if let Some(item) = array.get_array(i as i32)? {
            out.push(item.as_name().map(<[u8]>::to_vec).unwrap_or_default());
        }
    }
    Ok(out)
}

fn float(obj: &PdfObject, key: &str) -> MuResult<Option<f32>> {
    Ok(obj.get_dict(key)?.and_then(|v| v.as_float().ok()))
}

fn int(obj: &PdfObject, key: &str) -> MuResult<Option<i32>> {
    Ok(obj.get_dict(key)?.and_then(|v| v.as_int().ok()))
}

fn floats(obj: &PdfObject, key: &str) -> MuResult<Vec<f32>> {
    let Some(array) = obj.get_dict(key)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for i in 0..array.len()? {
        if let Some(item) = array.get_array(i as i32)? {
            out.push(item.as_float().unwrap_or(0.0));
        }
    }
    Ok(out)
}

/// Parse a `/DA` default appearance string such as `/Helv 12 Tf 0 0 1 rg`
fn parse_default_appearance(da: &str) -> Font {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let number = |i: usize| tokens.get(i).and_then(|t| t.parse::<f32>().ok());
    let mut font = Font::default();

    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "Tf" if i >= 2 => {
                font.name = tokens[i - 2].trim_start_matches('/').to_string();
                font.size = number(i - 1).unwrap_or(font.size);
            }
            "g" if i >= 1 => {
                if let Some(g) = number(i - 1) {
                    font.color = Color::from_components(g, g, g);
                }
            }
            "rg" if i >= 3 => {
                if let (Some(r), Some(g), Some(b)) = (number(i - 3), number(i - 2), number(i - 1)) {
                    font.color = Color::from_components(r, g, b);
                }
            }
            _ => {}
        }
    }
    font
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS` with optional offset)
fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let digits: String = raw
        .trim()
        .trim_start_matches("D:")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.len() >= 14 {
        NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S")
            .ok()
            .map(|dt| dt.and_utc())
    } else if digits.len() >= 8 {
        NaiveDate::parse_from_str(&digits[..8], "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_default_appearance() {
        let font = parse_default_appearance("/Helvetica-Bold 14 Tf 0 0 1 rg");
        assert_eq!(font.name, "Helvetica-Bold");
        assert_eq!(font.size, 14.0);
        assert_eq!(font.color.to_hex(), "#0000FF");

        let gray = parse_default_appearance("/Helv 0 Tf 0.5 g");
        assert_eq!(gray.name, "Helv");
        assert_eq!(gray.size, 0.0);
        assert_eq!(gray.color.to_hex(), "#808080");

        let empty = parse_default_appearance("");
        assert_eq!(empty, Font::default());
    }

    #[test]
    fn test_parse_pdf_date() {
        assert_eq!(
            parse_pdf_date("D:20240301123000+01'00'"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(
            parse_pdf_date("D:20240301"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_pdf_date("yesterday"), None);
    }

    #[test]
    fn test_encrypt_algo_for_version() {
        assert_eq!(encrypt_algo_for_version(2), EncryptAlgo::Rc4);
        assert_eq!(encrypt_algo_for_version(4), EncryptAlgo::Aes128);
        assert_eq!(encrypt_algo_for_version(5), EncryptAlgo::Aes256);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let engine = MupdfEngine::new();
        assert!(engine.open(Path::new("/nonexistent/missing.pdf"), None).is_err());
    }

    /// One-page PDF with a line of text and a sticky note
    fn write_sample_pdf(path: &Path) {
        let content = "BT /F1 18 Tf 72 720 Td (Hello fixture) Tj ET";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> /Annots [6 0 R] >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            "<< /Type /Annot /Subtype /Text /Rect [100 600 120 620] /T (Reviewer) /Contents (sticky note) >>"
                .to_string(),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }
        let xref = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{:010} 00000 n \n", offset));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        ));
        std::fs::write(path, pdf).unwrap();
    }

    fn check_read_only_document(path: &Path) -> Box<dyn EngineDocument> {
        let engine = MupdfEngine::new();
        let mut doc = engine.open(path, None).unwrap();
        assert!(doc.page_count() > 0);
        assert!(!doc.is_encrypted());
        assert!(!doc.has_changes());
        assert!(matches!(doc.begin_save(), Err(EngineError::ReadOnly(_))));
        assert!(matches!(
            doc.insert_blank_page(0, 100.0, 100.0),
            Err(EngineError::ReadOnly(_))
        ));
        let count = doc.page_count();
        assert!(matches!(doc.annotations(count), Err(EngineError::PageOutOfRange(..))));
        doc
    }

    #[test]
    fn test_open_sample_pdf() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sample.pdf");
        write_sample_pdf(&path);

        let doc = check_read_only_document(&path);
        assert_eq!(doc.page_count(), 1);
        assert!(doc.page_text(0).unwrap().contains("Hello fixture"));

        let annotations = doc.annotations(0).unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].subtype, Subtype::Text);
        assert_eq!(annotations[0].title, "Reviewer");
        assert_eq!(annotations[0].content, "sticky note");
        assert!(doc.export_annotations().unwrap().contains("sticky note"));

        let copy = dir.path().join("copy.pdf");
        doc.snapshot(&SnapshotOptions::default()).unwrap().write_to(&copy).unwrap();
        assert_eq!(MupdfEngine::new().open(&copy, None).unwrap().page_count(), 1);
    }

    /// Set `DOCVIEW_PDF_FIXTURE` to run the read-only checks on a real file
    #[test]
    fn test_open_pdf_fixture() {
        let Ok(fixture) = std::env::var("DOCVIEW_PDF_FIXTURE") else {
            eprintln!("DOCVIEW_PDF_FIXTURE not set, skipping");
            return;
        };
        let doc = check_read_only_document(Path::new(&fixture));
        for page_index in 0..doc.page_count() {
            doc.page_text(page_index).unwrap();
            doc.annotations(page_index).unwrap();
        }
    }
}
