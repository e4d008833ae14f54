//! In-memory document engine
//!
//! Documents are described by [`MemoryDocumentData`]: pages with a text
//! layer and native annotations, plus security settings. They are read
//! either from a shared [`MemoryLibrary`] (keyed by path) or from JSON
//! files on disk, and written back the same way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::model::{NativeAnnotation, NativeId};
use super::{
    xfdf, DocumentSnapshot, EncryptAlgo, Engine, EngineDocument, PasswordSettings, PendingSave, Permissions,
    SnapshotOptions,
};

/// A4 in points
pub const A4_WIDTH: f32 = 595.0;
pub const A4_HEIGHT: f32 = 842.0;

/// Stored security settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Security {
    pub user_password: Option<String>,
    pub owner_password: Option<String>,
    pub allows_printing: bool,
    pub allows_copying: bool,
    pub encrypt_algo: EncryptAlgo,
}

impl Security {
    fn is_encrypted(&self) -> bool {
        self.user_password.is_some() || self.owner_password.is_some()
    }

    /// Permission level a password unlocks
    fn unlock(&self, password: Option<&str>) -> EngineResult<Permissions> {
        if !self.is_encrypted() {
            return Ok(Permissions::None);
        }
        if password.is_some() && password == self.owner_password.as_deref() {
            return Ok(Permissions::Owner);
        }
        match self.user_password.as_deref() {
            None => Ok(Permissions::User),
            Some(user) if password == Some(user) => Ok(Permissions::User),
            Some(_) => Err(EngineError::Password("incorrect password".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPage {
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub annotations: Vec<NativeAnnotation>,
}

impl MemoryPage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn a4() -> Self {
        Self::new(A4_WIDTH, A4_HEIGHT)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_annotation(mut self, annotation: NativeAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Serialized form of a memory document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDocumentData {
    pub pages: Vec<MemoryPage>,
    pub security: Security,
}

impl MemoryDocumentData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: MemoryPage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }
}

/// Documents shared between engine, snapshots and callers
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    documents: Arc<RwLock<HashMap<PathBuf, MemoryDocumentData>>>,
}

impl MemoryLibrary {
    pub fn insert(&self, path: impl Into<PathBuf>, data: MemoryDocumentData) {
        self.documents.write().insert(path.into(), data);
    }

    pub fn get(&self, path: &Path) -> Option<MemoryDocumentData> {
        self.documents.read().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.documents.read().contains_key(path)
    }

    /// Read a document from the library, falling back to a JSON file
    fn load(&self, path: &Path) -> EngineResult<MemoryDocumentData> {
        if let Some(data) = self.get(path) {
            return Ok(data);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write a document to the library if it lives there, else to disk
    fn store(&self, path: &Path, data: &MemoryDocumentData) -> EngineResult<()> {
        if self.contains(path) {
            self.insert(path, data.clone());
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(data)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Engine over [`MemoryDocumentData`]
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    library: MemoryLibrary,
    next_id: Arc<AtomicU64>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(library: MemoryLibrary) -> Self {
        Self {
            library,
            next_id: Arc::default(),
        }
    }

    pub fn library(&self) -> &MemoryLibrary {
        &self.library
    }
}

impl Engine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, path: &Path, password: Option<&str>) -> EngineResult<Box<dyn EngineDocument>> {
        let mut data = self.library.load(path)?;
        let unlocked = data.security.unlock(password)?;
        assign_ids(&mut data.pages, &self.next_id);

        tracing::debug!(path = %path.display(), pages = data.pages.len(), "memory document opened");
        Ok(Box::new(MemoryDocument {
            path: path.to_path_buf(),
            library: self.library.clone(),
            next_id: self.next_id.clone(),
            password: password.map(str::to_string),
            data,
            unlocked,
            revision: 0,
            saved_revision: 0,
            security_changed: false,
        }))
    }
}

fn assign_ids(pages: &mut [MemoryPage], next_id: &AtomicU64) {
    for annot in pages.iter_mut().flat_map(|p| p.annotations.iter_mut()) {
        annot.id = NativeId(next_id.fetch_add(1, Ordering::Relaxed) + 1);
    }
}

/// A document opened by [`MemoryEngine`]
pub struct MemoryDocument {
    path: PathBuf,
    library: MemoryLibrary,
    next_id: Arc<AtomicU64>,
    password: Option<String>,
    data: MemoryDocumentData,
    unlocked: Permissions,
    /// Bumped by every edit
    revision: u64,
    /// Latest revision known to be on disk
    saved_revision: u64,
    security_changed: bool,
}

impl MemoryDocument {
    fn page(&self, page_index: usize) -> EngineResult<&MemoryPage> {
        let count = self.data.pages.len();
        self.data
            .pages
            .get(page_index)
            .ok_or(EngineError::PageOutOfRange(page_index, count))
    }

    fn page_mut(&mut self, page_index: usize) -> EngineResult<&mut MemoryPage> {
        let count = self.data.pages.len();
        self.data
            .pages
            .get_mut(page_index)
            .ok_or(EngineError::PageOutOfRange(page_index, count))
    }

    fn mark_changed(&mut self) {
        self.revision += 1;
    }

    fn require_owner(&self) -> EngineResult<()> {
        match self.unlocked {
            Permissions::User => Err(EngineError::Permission("owner password required".to_string())),
            Permissions::None | Permissions::Owner => Ok(()),
        }
    }

    fn widgets(&self) -> impl Iterator<Item = &NativeAnnotation> {
        self.data
            .pages
            .iter()
            .flat_map(|p| p.annotations.iter())
            .filter(|a| a.is_widget())
    }
}

impl EngineDocument for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.data.pages.len()
    }

    fn annotations(&self, page_index: usize) -> EngineResult<&[NativeAnnotation]> {
        Ok(&self.page(page_index)?.annotations)
    }

    fn annotation_mut(&mut self, page_index: usize, id: NativeId) -> EngineResult<Option<&mut NativeAnnotation>> {
        let page = self.page_mut(page_index)?;
        let Some(position) = page.annotations.iter().position(|a| a.id == id) else {
            return Ok(None);
        };
        self.mark_changed();
        Ok(self.data.pages[page_index].annotations.get_mut(position))
    }

    fn delete_annotation(&mut self, page_index: usize, id: NativeId) -> EngineResult<bool> {
        let page = self.page_mut(page_index)?;
        let before = page.annotations.len();
        page.annotations.retain(|a| a.id != id);
        let removed = page.annotations.len() != before;
        if removed {
            self.mark_changed();
        }
        Ok(removed)
    }

    fn remove_all_annotations(&mut self) -> EngineResult<bool> {
        let mut removed = false;
        for page in &mut self.data.pages {
            let before = page.annotations.len();
            page.annotations.retain(NativeAnnotation::is_widget);
            removed |= page.annotations.len() != before;
        }
        if removed {
            self.mark_changed();
        }
        Ok(removed)
    }

    fn update_appearance(&mut self, page_index: usize, id: NativeId) -> EngineResult<bool> {
        // Regenerating an appearance is not an edit
        match self.page_mut(page_index)?.annotations.iter_mut().find(|a| a.id == id) {
            Some(annot) => {
                annot.appearance_stale = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn page_text(&self, page_index: usize) -> EngineResult<String> {
        Ok(self.page(page_index)?.text.clone())
    }

    fn has_changes(&self) -> bool {
        self.revision != self.saved_revision || self.security_changed
    }

    fn begin_save(&mut self) -> EngineResult<PendingSave> {
        Ok(PendingSave {
            snapshot: Box::new(MemorySnapshot {
                data: self.data.clone(),
                library: self.library.clone(),
            }),
            needs_reload: self.security_changed,
            revision: self.revision,
        })
    }

    fn finish_save(&mut self, revision: u64) -> bool {
        self.saved_revision = self.saved_revision.max(revision);
        let current = revision == self.revision;
        if current {
            self.security_changed = false;
        }
        current
    }

    fn reload(&mut self) -> EngineResult<()> {
        let mut data = self.library.load(&self.path)?;
        self.unlocked = data.security.unlock(self.password.as_deref())?;
        assign_ids(&mut data.pages, &self.next_id);
        self.data = data;
        self.saved_revision = self.revision;
        self.security_changed = false;
        tracing::debug!(path = %self.path.display(), "memory document reloaded");
        Ok(())
    }

    fn snapshot(&self, options: &SnapshotOptions) -> EngineResult<Box<dyn DocumentSnapshot>> {
        let mut data = self.data.clone();

        if let Some(pages) = &options.pages {
            let count = data.pages.len();
            data.pages = pages
                .iter()
                .map(|&i| data.pages.get(i).cloned().ok_or(EngineError::PageOutOfRange(i, count)))
                .collect::<EngineResult<Vec<_>>>()?;
        }

        if options.flatten {
            for page in &mut data.pages {
                for annot in page.annotations.drain(..) {
                    let burned = match &annot.widget {
                        Some(widget) => widget.text.clone(),
                        None => annot.content.clone(),
                    };
                    if !burned.is_empty() {
                        if !page.text.is_empty() {
                            page.text.push('\n');
                        }
                        page.text.push_str(&burned);
                    }
                }
            }
        }

        if options.remove_security {
            self.require_owner()?;
            data.security = Security::default();
        }

        Ok(Box::new(MemorySnapshot {
            data,
            library: self.library.clone(),
        }))
    }

    fn insert_blank_page(&mut self, page_index: usize, width: f32, height: f32) -> EngineResult<()> {
        let count = self.data.pages.len();
        if page_index > count {
            return Err(EngineError::PageOutOfRange(page_index, count));
        }
        self.data.pages.insert(page_index, MemoryPage::new(width, height));
        self.mark_changed();
        Ok(())
    }

    fn import_pages(
        &mut self,
        source: &Path,
        password: Option<&str>,
        pages: &[usize],
        position: usize,
    ) -> EngineResult<()> {
        let source_data = self.library.load(source)?;
        source_data.security.unlock(password)?;

        let count = source_data.pages.len();
        let mut imported = if pages.is_empty() {
            source_data.pages
        } else {
            pages
                .iter()
                .map(|&i| source_data.pages.get(i).cloned().ok_or(EngineError::PageOutOfRange(i, count)))
                .collect::<EngineResult<Vec<_>>>()?
        };
        assign_ids(&mut imported, &self.next_id);

        let position = position.min(self.data.pages.len());
        let added = imported.len();
        self.data.pages.splice(position..position, imported);
        self.mark_changed();
        tracing::debug!(source = %source.display(), added, position, "pages imported");
        Ok(())
    }

    fn export_annotations(&self) -> EngineResult<String> {
        let annotations = self.data.pages.iter().enumerate().flat_map(|(page, p)| {
            p.annotations
                .iter()
                .filter(|a| !a.is_widget())
                .map(move |a| (page, a))
        });
        xfdf::write_annotations(annotations)
    }

    fn import_annotations(&mut self, xml: &str) -> EngineResult<usize> {
        let parsed = xfdf::read_annotations(xml)?;
        let count = self.data.pages.len();
        if let Some((page, _)) = parsed.iter().find(|(page, _)| *page >= count) {
            return Err(EngineError::PageOutOfRange(*page, count));
        }

        let imported = parsed.len();
        for (page, mut annot) in parsed {
            annot.id = NativeId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            self.data.pages[page].annotations.push(annot);
        }
        if imported > 0 {
            self.mark_changed();
        }
        Ok(imported)
    }

    fn export_widgets(&self) -> EngineResult<String> {
        xfdf::write_fields(self.widgets().filter_map(|a| a.widget.as_ref()))
    }

    fn import_widgets(&mut self, xml: &str) -> EngineResult<usize> {
        let values: HashMap<String, String> = xfdf::read_fields(xml)?
            .into_iter()
            .map(|f| (f.name, f.value))
            .collect();

        let mut updated = 0;
        for annot in self.data.pages.iter_mut().flat_map(|p| p.annotations.iter_mut()) {
            let Some(widget) = annot.widget.as_mut() else {
                continue;
            };
            let Some(value) = values.get(&widget.field_name) else {
                continue;
            };
            if xfdf::apply_field_value(widget, value) {
                annot.touch();
                updated += 1;
            }
        }
        if updated > 0 {
            self.mark_changed();
        }
        Ok(updated)
    }

    fn is_encrypted(&self) -> bool {
        self.data.security.is_encrypted()
    }

    fn permissions(&self) -> Permissions {
        self.unlocked
    }

    fn encrypt_algo(&self) -> EncryptAlgo {
        if self.is_encrypted() {
            self.data.security.encrypt_algo
        } else {
            EncryptAlgo::NoEncryptAlgo
        }
    }

    fn owner_unlocked(&self) -> bool {
        self.unlocked != Permissions::User
    }

    fn check_owner_password(&mut self, password: &str) -> bool {
        if self.data.security.owner_password.as_deref() == Some(password) {
            self.unlocked = Permissions::Owner;
            return true;
        }
        false
    }

    fn set_password(&mut self, settings: &PasswordSettings) -> EngineResult<()> {
        self.require_owner()?;
        let non_empty = |p: &Option<String>| p.clone().filter(|s| !s.is_empty());

        self.data.security = Security {
            user_password: non_empty(&settings.user_password),
            owner_password: non_empty(&settings.owner_password),
            allows_printing: settings.allows_printing,
            allows_copying: settings.allows_copying,
            encrypt_algo: settings.encrypt_algo,
        };
        // Reopening after save must use a password the new settings accept
        self.password = self
            .data
            .security
            .owner_password
            .clone()
            .or_else(|| self.data.security.user_password.clone());
        self.security_changed = true;
        self.mark_changed();
        Ok(())
    }

    fn remove_password(&mut self) -> EngineResult<()> {
        self.require_owner()?;
        self.data.security = Security::default();
        self.password = None;
        self.security_changed = true;
        self.mark_changed();
        Ok(())
    }
}

/// Owned copy of a memory document
struct MemorySnapshot {
    data: MemoryDocumentData,
    library: MemoryLibrary,
}

impl DocumentSnapshot for MemorySnapshot {
    fn write_to(&self, path: &Path) -> EngineResult<()> {
        self.library.store(path, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::{Rect, Subtype, WidgetKind};

    fn sample() -> MemoryDocumentData {
        MemoryDocumentData::new()
            .with_page(
                MemoryPage::a4()
                    .with_text("first page")
                    .with_annotation(NativeAnnotation::new(Subtype::Highlight, Rect::default()).with_content("hl"))
                    .with_annotation(NativeAnnotation::widget(WidgetKind::TextField, "name", Rect::default())),
            )
            .with_page(MemoryPage::a4().with_text("second page"))
    }

    fn open(engine: &MemoryEngine, path: &str, password: Option<&str>) -> Box<dyn EngineDocument> {
        engine.open(Path::new(path), password).unwrap()
    }

    #[test]
    fn test_ids_are_unique_and_change_on_reload() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let mut doc = open(&engine, "doc.pdf", None);

        let ids: Vec<NativeId> = doc.annotations(0).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        doc.reload().unwrap();
        let reloaded: Vec<NativeId> = doc.annotations(0).unwrap().iter().map(|a| a.id).collect();
        assert!(reloaded.iter().all(|id| !ids.contains(id)));
    }

    #[test]
    fn test_page_out_of_range() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let doc = open(&engine, "doc.pdf", None);
        assert!(matches!(doc.annotations(5), Err(EngineError::PageOutOfRange(5, 2))));
    }

    #[test]
    fn test_delete_and_remove_all() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let mut doc = open(&engine, "doc.pdf", None);
        assert!(!doc.has_changes());

        assert!(!doc.delete_annotation(0, NativeId(999_999)).unwrap());
        assert!(!doc.has_changes());

        assert!(doc.remove_all_annotations().unwrap());
        let remaining = doc.annotations(0).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_widget());
        assert!(doc.has_changes());
    }

    #[test]
    fn test_save_writes_back_to_library() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let mut doc = open(&engine, "doc.pdf", None);
        doc.insert_blank_page(1, 100.0, 200.0).unwrap();

        let pending = doc.begin_save().unwrap();
        assert!(!pending.needs_reload);
        pending.snapshot.write_to(Path::new("doc.pdf")).unwrap();
        assert!(doc.finish_save(pending.revision));

        assert!(!doc.has_changes());
        let stored = engine.library().get(Path::new("doc.pdf")).unwrap();
        assert_eq!(stored.pages.len(), 3);
        assert_eq!(stored.pages[1].width, 100.0);
    }

    #[test]
    fn test_edit_during_save_stays_unsaved() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let mut doc = open(&engine, "doc.pdf", None);
        doc.insert_blank_page(0, 100.0, 200.0).unwrap();

        let pending = doc.begin_save().unwrap();
        doc.insert_blank_page(0, 300.0, 400.0).unwrap();
        pending.snapshot.write_to(Path::new("doc.pdf")).unwrap();

        assert!(!doc.finish_save(pending.revision));
        assert!(doc.has_changes());
        assert_eq!(engine.library().get(Path::new("doc.pdf")).unwrap().pages.len(), 3);

        let pending = doc.begin_save().unwrap();
        pending.snapshot.write_to(Path::new("doc.pdf")).unwrap();
        assert!(doc.finish_save(pending.revision));
        assert!(!doc.has_changes());
        assert_eq!(engine.library().get(Path::new("doc.pdf")).unwrap().pages.len(), 4);
    }

    #[test]
    fn test_update_appearance_is_not_an_edit() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let mut doc = open(&engine, "doc.pdf", None);
        let id = doc.annotations(0).unwrap()[0].id;

        assert!(doc.update_appearance(0, id).unwrap());
        assert!(!doc.update_appearance(0, NativeId(999_999)).unwrap());
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, serde_json::to_string(&sample()).unwrap()).unwrap();

        let engine = MemoryEngine::new();
        let doc = engine.open(&path, None).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_text(1).unwrap(), "second page");

        let copy = dir.path().join("copy.json");
        doc.snapshot(&SnapshotOptions {
            pages: Some(vec![1]),
            ..SnapshotOptions::default()
        })
        .unwrap()
        .write_to(&copy)
        .unwrap();
        let split = engine.open(&copy, None).unwrap();
        assert_eq!(split.page_count(), 1);
        assert_eq!(split.page_text(0).unwrap(), "second page");
    }

    #[test]
    fn test_flatten_burns_content_into_text() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let doc = open(&engine, "doc.pdf", None);

        let snapshot = doc
            .snapshot(&SnapshotOptions {
                flatten: true,
                ..SnapshotOptions::default()
            })
            .unwrap();
        engine.library().insert("flat.pdf", MemoryDocumentData::new());
        snapshot.write_to(Path::new("flat.pdf")).unwrap();
        let flat = open(&engine, "flat.pdf", None);
        assert!(flat.annotations(0).unwrap().is_empty());
        assert_eq!(flat.page_text(0).unwrap(), "first page\nhl");
    }

    #[test]
    fn test_passwords_and_permissions() {
        let engine = MemoryEngine::new();
        engine.library().insert(
            "locked.pdf",
            sample().with_security(Security {
                user_password: Some("user".to_string()),
                owner_password: Some("owner".to_string()),
                encrypt_algo: EncryptAlgo::Aes256,
                ..Security::default()
            }),
        );

        assert!(matches!(
            engine.open(Path::new("locked.pdf"), Some("wrong")),
            Err(EngineError::Password(_))
        ));

        let mut doc = open(&engine, "locked.pdf", Some("user"));
        assert!(doc.is_encrypted());
        assert_eq!(doc.permissions(), Permissions::User);
        assert_eq!(doc.encrypt_algo(), EncryptAlgo::Aes256);
        assert!(!doc.owner_unlocked());
        assert!(matches!(doc.remove_password(), Err(EngineError::Permission(_))));

        assert!(!doc.check_owner_password("nope"));
        assert!(doc.check_owner_password("owner"));
        assert!(doc.owner_unlocked());

        doc.remove_password().unwrap();
        assert!(!doc.is_encrypted());
        let pending = doc.begin_save().unwrap();
        assert!(pending.needs_reload);
    }

    #[test]
    fn test_set_password_then_reload() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        let mut doc = open(&engine, "doc.pdf", None);

        doc.set_password(&PasswordSettings {
            user_password: Some("secret".to_string()),
            owner_password: Some(String::new()),
            encrypt_algo: EncryptAlgo::Aes128,
            ..PasswordSettings::default()
        })
        .unwrap();

        let pending = doc.begin_save().unwrap();
        pending.snapshot.write_to(Path::new("doc.pdf")).unwrap();
        assert!(doc.finish_save(pending.revision));
        doc.reload().unwrap();

        assert!(doc.is_encrypted());
        assert_eq!(doc.permissions(), Permissions::User);
        assert!(engine.open(Path::new("doc.pdf"), None).is_err());
    }

    #[test]
    fn test_import_pages() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        engine.library().insert(
            "other.pdf",
            MemoryDocumentData::new()
                .with_page(MemoryPage::a4().with_text("o1"))
                .with_page(MemoryPage::a4().with_text("o2")),
        );
        let mut doc = open(&engine, "doc.pdf", None);

        doc.import_pages(Path::new("other.pdf"), None, &[1], 0).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.page_text(0).unwrap(), "o2");

        doc.import_pages(Path::new("other.pdf"), None, &[], usize::MAX).unwrap();
        assert_eq!(doc.page_count(), 5);
        assert_eq!(doc.page_text(4).unwrap(), "o2");

        assert!(doc.import_pages(Path::new("other.pdf"), None, &[7], 0).is_err());
    }

    #[test]
    fn test_annotation_and_widget_interchange() {
        let engine = MemoryEngine::new();
        engine.library().insert("doc.pdf", sample());
        engine.library().insert("blank.pdf", sample());
        let mut source = open(&engine, "doc.pdf", None);

        let widget_id = source.annotations(0).unwrap()[1].id;
        if let Some(annot) = source.annotation_mut(0, widget_id).unwrap() {
            if let Some(widget) = annot.widget.as_mut() {
                widget.text = "Filled".to_string();
            }
        }

        let annots_xml = source.export_annotations().unwrap();
        let widgets_xml = source.export_widgets().unwrap();

        let mut target = open(&engine, "blank.pdf", None);
        assert_eq!(target.import_annotations(&annots_xml).unwrap(), 1);
        assert_eq!(target.annotations(0).unwrap().len(), 3);

        assert_eq!(target.import_widgets(&widgets_xml).unwrap(), 1);
        let widget = target.annotations(0).unwrap().iter().find(|a| a.is_widget()).unwrap();
        assert_eq!(widget.widget.as_ref().unwrap().text, "Filled");
    }
}
