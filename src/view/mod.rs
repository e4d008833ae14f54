//! Document views and their handles
//!
//! A [`DocumentView`] is what a host tag names. It collects three inputs
//! (document, password, configuration) in any order and opens the
//! document once all three are present:
//!
//! ```text
//! Uninitialized --set*--> AwaitingInputs --all inputs--> Loaded --destroy--> Detached
//! ```
//!
//! Once loaded, the setters only record values; the document is never
//! opened a second time.

pub mod registry;
pub mod source;

use serde::{Deserialize, Serialize};

use crate::engine::EngineDocument;
use crate::error::{BridgeError, Result};
use crate::search::TextSearcher;

pub use registry::HandleRegistry;
pub use source::{DocumentOpener, DocumentUri, UriResolver};

/// Host-chosen view identifier
pub type Tag = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleState {
    Uninitialized,
    AwaitingInputs,
    Loaded,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl From<[i32; 4]> for Margins {
    fn from([left, top, right, bottom]: [i32; 4]) -> Self {
        Self { left, top, right, bottom }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Viewer,
    Annotations,
    ContentEditor,
    Forms,
    Signatures,
}

/// The parts of the host's view configuration the bridge reads.
/// Everything else in the JSON is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfiguration {
    pub mode_config: ModeConfig,
    pub reader_view_config: ReaderViewConfig,
    pub global_config: GlobalConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModeConfig {
    pub initial_view_mode: ViewMode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderViewConfig {
    /// `[left, top, right, bottom]`
    pub margins: [i32; 4],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalConfig {
    pub file_save_extra_font_subset: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            file_save_extra_font_subset: true,
        }
    }
}

impl ViewConfiguration {
    /// Parse the host's configuration JSON. An empty string is the default.
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| BridgeError::InvalidArgument(format!("invalid configuration: {}", e)))
    }
}

/// One live document view
pub struct DocumentView {
    tag: Tag,
    state: HandleState,
    attached: bool,
    document_uri: Option<String>,
    password: Option<String>,
    configuration: Option<ViewConfiguration>,
    document: Option<Box<dyn EngineDocument>>,
    current_page: usize,
    margins: Margins,
    view_mode: ViewMode,
    searcher: TextSearcher,
    loads: u64,
    redraws: u64,
    page_reloads: u64,
}

impl DocumentView {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            state: HandleState::Uninitialized,
            attached: false,
            document_uri: None,
            password: None,
            configuration: None,
            document: None,
            current_page: 0,
            margins: Margins::default(),
            view_mode: ViewMode::default(),
            searcher: TextSearcher::new(),
            loads: 0,
            redraws: 0,
            page_reloads: 0,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == HandleState::Loaded
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// The view is now part of a window
    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn set_document(&mut self, uri: impl Into<String>, opener: &DocumentOpener) -> Result<()> {
        self.document_uri = Some(uri.into());
        self.try_load(opener)
    }

    pub fn set_password(&mut self, password: impl Into<String>, opener: &DocumentOpener) -> Result<()> {
        self.password = Some(password.into());
        self.try_load(opener)
    }

    pub fn set_configuration(&mut self, configuration: ViewConfiguration, opener: &DocumentOpener) -> Result<()> {
        self.configuration = Some(configuration);
        self.try_load(opener)
    }

    fn try_load(&mut self, opener: &DocumentOpener) -> Result<()> {
        match self.state {
            HandleState::Loaded | HandleState::Detached => return Ok(()),
            HandleState::Uninitialized | HandleState::AwaitingInputs => {}
        }
        self.state = HandleState::AwaitingInputs;

        let (Some(uri), Some(password), Some(configuration)) =
            (&self.document_uri, &self.password, &self.configuration)
        else {
            return Ok(());
        };

        let password = Some(password.as_str()).filter(|p| !p.is_empty());
        let document = opener.open(uri, password).map_err(|e| {
            tracing::warn!(tag = self.tag, uri = %uri, "document failed to open: {}", e);
            e
        })?;

        self.margins = Margins::from(configuration.reader_view_config.margins);
        self.view_mode = configuration.mode_config.initial_view_mode;
        self.current_page = 0;
        tracing::info!(
            tag = self.tag,
            uri = %uri,
            pages = document.page_count(),
            "document loaded"
        );
        self.document = Some(document);
        self.state = HandleState::Loaded;
        self.loads += 1;
        self.page_reloads += 1;
        Ok(())
    }

    /// Replace the document of a live view.
    ///
    /// Unlike the setters this always opens, even once loaded. A failure
    /// keeps whatever document the view already had.
    pub fn reopen(&mut self, uri: impl Into<String>, password: Option<String>, opener: &DocumentOpener) -> Result<()> {
        let uri = uri.into();
        let password = password.filter(|p| !p.is_empty());
        let document = opener.open(&uri, password.as_deref())?;

        tracing::info!(tag = self.tag, uri = %uri, pages = document.page_count(), "document replaced");
        self.document_uri = Some(uri);
        self.password = Some(password.unwrap_or_default());
        self.configuration.get_or_insert_with(ViewConfiguration::default);
        self.document = Some(document);
        self.searcher.clear();
        self.current_page = 0;
        self.state = HandleState::Loaded;
        self.loads += 1;
        self.reload_pages();
        Ok(())
    }

    /// Drop the document. The handle is dead afterwards.
    pub fn release(&mut self) {
        if self.document.take().is_some() {
            tracing::info!(tag = self.tag, "document released");
        }
        self.searcher.clear();
        self.attached = false;
        self.state = HandleState::Detached;
    }

    pub fn document(&self) -> Result<&dyn EngineDocument> {
        self.document.as_deref().ok_or(BridgeError::DocumentNotLoaded(self.tag))
    }

    pub fn document_mut(&mut self) -> Result<&mut dyn EngineDocument> {
        let tag = self.tag;
        match self.document.as_deref_mut() {
            Some(doc) => Ok(doc),
            None => Err(BridgeError::DocumentNotLoaded(tag)),
        }
    }

    /// The document and the searcher, borrowed together
    pub fn search_parts(&mut self) -> Result<(&dyn EngineDocument, &mut TextSearcher)> {
        match self.document.as_deref() {
            Some(doc) => Ok((doc, &mut self.searcher)),
            None => Err(BridgeError::DocumentNotLoaded(self.tag)),
        }
    }

    /// The document reference as the host gave it
    pub fn document_uri(&self) -> Option<&str> {
        self.document_uri.as_deref()
    }

    pub fn searcher(&self) -> &TextSearcher {
        &self.searcher
    }

    pub fn configuration(&self) -> Option<&ViewConfiguration> {
        self.configuration.as_ref()
    }

    /// Extra font subsetting on save, per the configuration
    pub fn font_subset(&self) -> bool {
        self.configuration
            .as_ref()
            .map_or(true, |c| c.global_config.file_save_extra_font_subset)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_current_page(&mut self, page_index: usize) -> Result<()> {
        let count = self.document()?.page_count();
        if page_index >= count {
            return Err(BridgeError::InvalidArgument(format!(
                "page {} out of range (document has {} pages)",
                page_index, count
            )));
        }
        self.current_page = page_index;
        self.request_redraw();
        Ok(())
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn set_margins(&mut self, margins: Margins) {
        self.margins = margins;
        self.reload_pages();
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Redraw the visible pages
    pub fn request_redraw(&mut self) {
        self.redraws += 1;
    }

    /// Re-lay out every page, e.g. after the document changed shape
    pub fn reload_pages(&mut self) {
        let count = self.document.as_ref().map_or(0, |d| d.page_count());
        if count > 0 && self.current_page >= count {
            self.current_page = count - 1;
        }
        self.page_reloads += 1;
        self.redraws += 1;
    }

    /// Times the document has been opened
    pub fn loads(&self) -> u64 {
        self.loads
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    pub fn page_reloads(&self) -> u64 {
        self.page_reloads
    }
}

impl std::fmt::Debug for DocumentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentView")
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("attached", &self.attached)
            .field("document_uri", &self.document_uri)
            .field("current_page", &self.current_page)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::engine::memory::{MemoryDocumentData, MemoryEngine, MemoryPage, Security};

    fn opener() -> DocumentOpener {
        let engine = MemoryEngine::new();
        engine.library().insert(
            "/docs/sample.pdf",
            MemoryDocumentData::new()
                .with_page(MemoryPage::a4().with_text("one"))
                .with_page(MemoryPage::a4().with_text("two")),
        );
        engine.library().insert(
            "/docs/locked.pdf",
            MemoryDocumentData::new()
                .with_page(MemoryPage::a4())
                .with_security(Security {
                    user_password: Some("secret".to_string()),
                    ..Security::default()
                }),
        );
        DocumentOpener::new(Box::new(engine), UriResolver::new(&BridgeConfig::default()))
    }

    #[test]
    fn test_inputs_in_any_order() {
        let opener = opener();
        let mut view = DocumentView::new(1);
        assert_eq!(view.state(), HandleState::Uninitialized);

        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();
        assert_eq!(view.state(), HandleState::AwaitingInputs);
        view.set_password("", &opener).unwrap();
        assert_eq!(view.state(), HandleState::AwaitingInputs);
        assert!(matches!(view.document(), Err(BridgeError::DocumentNotLoaded(1))));

        view.set_document("/docs/sample.pdf", &opener).unwrap();
        assert_eq!(view.state(), HandleState::Loaded);
        assert_eq!(view.document().unwrap().page_count(), 2);
        assert_eq!(view.loads(), 1);
    }

    #[test]
    fn test_setters_after_load_do_not_reopen() {
        let opener = opener();
        let mut view = DocumentView::new(1);
        view.set_document("/docs/sample.pdf", &opener).unwrap();
        view.set_password("", &opener).unwrap();
        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();
        assert_eq!(view.loads(), 1);

        view.set_document("/docs/locked.pdf", &opener).unwrap();
        view.set_password("whatever", &opener).unwrap();
        assert_eq!(view.loads(), 1);
        assert_eq!(view.document().unwrap().page_count(), 2);
    }

    #[test]
    fn test_wrong_password_stays_awaiting() {
        let opener = opener();
        let mut view = DocumentView::new(2);
        view.set_document("/docs/locked.pdf", &opener).unwrap();
        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();

        let err = view.set_password("nope", &opener).unwrap_err();
        assert_eq!(err.code(), "ENGINE_ERROR");
        assert_eq!(view.state(), HandleState::AwaitingInputs);

        view.set_password("secret", &opener).unwrap();
        assert_eq!(view.state(), HandleState::Loaded);
    }

    #[test]
    fn test_configuration_is_applied() {
        let config = ViewConfiguration::parse(
            r#"{
                "modeConfig": {"initialViewMode": "forms", "readerOnly": false},
                "readerViewConfig": {"margins": [1, 2, 3, 4], "displayMode": "doublePage"},
                "globalConfig": {"fileSaveExtraFontSubset": false}
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode_config.initial_view_mode, ViewMode::Forms);

        let opener = opener();
        let mut view = DocumentView::new(3);
        view.set_configuration(config, &opener).unwrap();
        view.set_password("", &opener).unwrap();
        view.set_document("/docs/sample.pdf", &opener).unwrap();
        assert_eq!(view.margins(), Margins { left: 1, top: 2, right: 3, bottom: 4 });
        assert_eq!(view.view_mode(), ViewMode::Forms);
        assert!(!view.font_subset());

        assert!(matches!(ViewConfiguration::parse("{not json"), Err(BridgeError::InvalidArgument(_))));
        assert_eq!(ViewConfiguration::parse("").unwrap(), ViewConfiguration::default());
    }

    #[test]
    fn test_release_is_terminal() {
        let opener = opener();
        let mut view = DocumentView::new(4);
        view.set_document("/docs/sample.pdf", &opener).unwrap();
        view.set_password("", &opener).unwrap();
        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();

        view.release();
        assert_eq!(view.state(), HandleState::Detached);
        assert!(view.document().is_err());

        view.set_document("/docs/sample.pdf", &opener).unwrap();
        assert_eq!(view.state(), HandleState::Detached);
    }

    #[test]
    fn test_reopen_replaces_document() {
        let opener = opener();
        let mut view = DocumentView::new(6);
        view.set_document("/docs/sample.pdf", &opener).unwrap();
        view.set_password("", &opener).unwrap();
        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();
        view.set_current_page(1).unwrap();

        assert!(view.reopen("/docs/locked.pdf", Some("bad".to_string()), &opener).is_err());
        assert_eq!(view.document_uri(), Some("/docs/sample.pdf"));

        view.reopen("/docs/locked.pdf", Some("secret".to_string()), &opener).unwrap();
        assert_eq!(view.document_uri(), Some("/docs/locked.pdf"));
        assert_eq!(view.document().unwrap().page_count(), 1);
        assert_eq!(view.current_page(), 0);
        assert_eq!(view.loads(), 2);
    }

    #[test]
    fn test_current_page_bounds() {
        let opener = opener();
        let mut view = DocumentView::new(5);
        view.set_document("/docs/sample.pdf", &opener).unwrap();
        view.set_password("", &opener).unwrap();
        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();

        view.set_current_page(1).unwrap();
        assert_eq!(view.current_page(), 1);
        assert!(matches!(view.set_current_page(2), Err(BridgeError::InvalidArgument(_))));
    }
}
