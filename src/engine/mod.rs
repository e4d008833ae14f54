//! Document engine seam
//!
//! The engine owns parsing, layout and file formats. The bridge only
//! talks to it through these traits:
//!
//! - [`Engine`]: opens documents. Moved onto the view-host thread at start.
//! - [`EngineDocument`]: a loaded document. Not required to be `Send`; it
//!   never leaves the view-host thread.
//! - [`DocumentSnapshot`]: a `Send` copy of document state used to do
//!   file writes on the worker pool.
//!
//! Two engines ship with the crate: [`memory::MemoryEngine`], a complete
//! engine over JSON-described documents, and [`mupdf::MupdfEngine`], a
//! read-only engine over real PDF files.

mod error;
pub mod memory;
pub mod model;
pub mod mupdf;
pub mod text;
pub mod xfdf;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::search::SearchQuery;

pub use error::{EngineError, EngineResult};
pub use model::{NativeAnnotation, NativeId};
pub use text::TextSpan;

/// Which engine backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Pick per file: PDF magic bytes go to MuPDF, everything else to the memory engine
    #[default]
    Auto,
    Memory,
    Mupdf,
}

/// Opens documents
pub trait Engine: Send {
    fn name(&self) -> &'static str;

    fn open(&self, path: &Path, password: Option<&str>) -> EngineResult<Box<dyn EngineDocument>>;
}

/// Result of preparing a save
pub struct PendingSave {
    /// State to write back to the document's own path
    pub snapshot: Box<dyn DocumentSnapshot>,
    /// The engine must reload the document once the write lands
    pub needs_reload: bool,
    /// Edit revision the snapshot was taken at
    pub revision: u64,
}

/// Captured document state that can be written off the view-host thread
pub trait DocumentSnapshot: Send {
    fn write_to(&self, path: &Path) -> EngineResult<()>;
}

/// What a snapshot should contain
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    /// Only these pages, in this order. `None` keeps every page.
    pub pages: Option<Vec<usize>>,
    /// Merge annotations and form fields into page content
    pub flatten: bool,
    /// Drop passwords and permissions
    pub remove_security: bool,
    /// Embed only the used glyphs of fonts
    pub font_subset: bool,
}

/// Permission level the document was unlocked with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    None = 0,
    User = 1,
    Owner = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncryptAlgo {
    #[default]
    NoEncryptAlgo,
    Rc4,
    Aes128,
    Aes256,
}

impl EncryptAlgo {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptAlgo::NoEncryptAlgo => "noEncryptAlgo",
            EncryptAlgo::Rc4 => "rc4",
            EncryptAlgo::Aes128 => "aes128",
            EncryptAlgo::Aes256 => "aes256",
        }
    }
}

/// New document security settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordSettings {
    pub user_password: Option<String>,
    pub owner_password: Option<String>,
    #[serde(default)]
    pub allows_printing: bool,
    #[serde(default)]
    pub allows_copying: bool,
    #[serde(default)]
    pub encrypt_algo: EncryptAlgo,
}

/// A loaded document
pub trait EngineDocument {
    /// Filesystem path (or library key) the document was opened from
    fn path(&self) -> &Path;

    fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn page_count(&self) -> usize;

    /// The page's annotations in native order, widgets included
    fn annotations(&self, page_index: usize) -> EngineResult<&[NativeAnnotation]>;

    /// Mutable access to one annotation. Marks the document modified.
    fn annotation_mut(&mut self, page_index: usize, id: NativeId) -> EngineResult<Option<&mut NativeAnnotation>>;

    /// Returns false when no annotation has that id
    fn delete_annotation(&mut self, page_index: usize, id: NativeId) -> EngineResult<bool>;

    /// Remove every non-widget annotation. Returns whether anything was removed.
    fn remove_all_annotations(&mut self) -> EngineResult<bool>;

    /// Regenerate the appearance stream. Returns false when no annotation has that id.
    fn update_appearance(&mut self, page_index: usize, id: NativeId) -> EngineResult<bool>;

    /// Full text layer of a page
    fn page_text(&self, page_index: usize) -> EngineResult<String>;

    /// Run the keyword matcher over one page
    fn search_page(&self, page_index: usize, query: &SearchQuery) -> EngineResult<Vec<TextSpan>> {
        let text = self.page_text(page_index)?;
        Ok(text::find_matches(&text, query))
    }

    /// Text of a character range on a page
    fn text_range(&self, page_index: usize, location: usize, length: usize) -> EngineResult<String> {
        let text = self.page_text(page_index)?;
        Ok(text::slice_chars(&text, location, length))
    }

    fn has_changes(&self) -> bool;

    /// Capture state for a save to the document's own path
    fn begin_save(&mut self) -> EngineResult<PendingSave>;

    /// Called once the save captured at `revision` has been written.
    ///
    /// Returns false when the document was edited after the capture. It
    /// then still has unsaved changes and must not be reloaded.
    fn finish_save(&mut self, revision: u64) -> bool;

    /// Re-read the document from its origin. Native ids change.
    fn reload(&mut self) -> EngineResult<()>;

    fn snapshot(&self, options: &SnapshotOptions) -> EngineResult<Box<dyn DocumentSnapshot>>;

    fn insert_blank_page(&mut self, page_index: usize, width: f32, height: f32) -> EngineResult<()>;

    /// Insert pages of another document. Empty `pages` imports all of them;
    /// `position` past the end appends.
    fn import_pages(
        &mut self,
        source: &Path,
        password: Option<&str>,
        pages: &[usize],
        position: usize,
    ) -> EngineResult<()>;

    /// Serialize annotations (not widgets) to XFDF
    fn export_annotations(&self) -> EngineResult<String>;

    /// Add annotations from XFDF. Returns the number imported.
    fn import_annotations(&mut self, xfdf: &str) -> EngineResult<usize>;

    /// Serialize form field values to XFDF
    fn export_widgets(&self) -> EngineResult<String>;

    /// Apply form field values from XFDF by field name. Returns the number updated.
    fn import_widgets(&mut self, xfdf: &str) -> EngineResult<usize>;

    fn is_encrypted(&self) -> bool;

    fn permissions(&self) -> Permissions;

    fn encrypt_algo(&self) -> EncryptAlgo;

    fn owner_unlocked(&self) -> bool;

    /// Unlock owner permissions. Returns whether the password matched.
    fn check_owner_password(&mut self, password: &str) -> bool;

    fn set_password(&mut self, settings: &PasswordSettings) -> EngineResult<()>;

    fn remove_password(&mut self) -> EngineResult<()>;
}

/// Build the configured engine
pub fn from_kind(kind: EngineKind) -> Box<dyn Engine> {
    match kind {
        EngineKind::Auto => Box::new(AutoEngine::new(memory::MemoryEngine::new())),
        EngineKind::Memory => Box::new(memory::MemoryEngine::new()),
        EngineKind::Mupdf => Box::new(mupdf::MupdfEngine::new()),
    }
}

/// Dispatches on file content: PDFs go to MuPDF, everything else to
/// the memory engine.
pub struct AutoEngine {
    memory: memory::MemoryEngine,
    mupdf: mupdf::MupdfEngine,
}

impl AutoEngine {
    pub fn new(memory: memory::MemoryEngine) -> Self {
        Self {
            memory,
            mupdf: mupdf::MupdfEngine::new(),
        }
    }
}

impl Engine for AutoEngine {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn open(&self, path: &Path, password: Option<&str>) -> EngineResult<Box<dyn EngineDocument>> {
        if !self.memory.library().contains(path) && is_pdf(path) {
            tracing::debug!(path = %path.display(), "opening with mupdf");
            return self.mupdf.open(path, password);
        }
        self.memory.open(path, password)
    }
}

/// Sniff the `%PDF` magic bytes
fn is_pdf(path: &Path) -> bool {
    use std::io::Read;

    let mut magic = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == b"%PDF")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_pdf_sniffs_magic() {
        let mut pdf = tempfile::NamedTempFile::new().unwrap();
        pdf.write_all(b"%PDF-1.7\n").unwrap();
        assert!(is_pdf(pdf.path()));

        let mut json = tempfile::NamedTempFile::new().unwrap();
        json.write_all(b"{\"pages\": []}").unwrap();
        assert!(!is_pdf(json.path()));

        assert!(!is_pdf(Path::new("/nonexistent/file.pdf")));
    }

    #[test]
    fn test_auto_engine_prefers_library() {
        let memory = memory::MemoryEngine::new();
        memory
            .library()
            .insert("lib.pdf", memory::MemoryDocumentData::new().with_page(memory::MemoryPage::a4()));
        let engine = AutoEngine::new(memory);
        let doc = engine.open(Path::new("lib.pdf"), None).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_encrypt_algo_names() {
        assert_eq!(EncryptAlgo::Aes256.as_str(), "aes256");
        let algo: EncryptAlgo = serde_json::from_str("\"rc4\"").unwrap();
        assert_eq!(algo, EncryptAlgo::Rc4);
    }
}
