//! Tag to view mapping
//!
//! Owned by the view host and only touched from its thread, so it needs
//! no locking of its own.

use std::collections::HashMap;

use super::{DocumentView, Tag};
use crate::error::{BridgeError, Result};

#[derive(Debug, Default)]
pub struct HandleRegistry {
    views: HashMap<Tag, DocumentView>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the view for `tag`.
    ///
    /// A view that is not attached is handed straight back. A view with a
    /// loaded document gets its pages reloaded, since the window it left
    /// may have laid them out differently. Returns whichever view did not
    /// end up registered: the rejected one, or the one it replaced.
    pub fn register(&mut self, tag: Tag, mut view: DocumentView) -> Option<DocumentView> {
        if !view.is_attached() {
            tracing::debug!(tag, "ignoring registration of unattached view");
            return Some(view);
        }
        if view.is_loaded() {
            view.reload_pages();
        }
        tracing::debug!(tag, "view registered");
        self.views.insert(tag, view)
    }

    pub fn resolve(&self, tag: Tag) -> Result<&DocumentView> {
        self.views.get(&tag).ok_or(BridgeError::ViewNotFound(tag))
    }

    pub fn resolve_mut(&mut self, tag: Tag) -> Result<&mut DocumentView> {
        self.views.get_mut(&tag).ok_or(BridgeError::ViewNotFound(tag))
    }

    /// A registered view whose document is open
    pub fn loaded_mut(&mut self, tag: Tag) -> Result<&mut DocumentView> {
        let view = self.resolve_mut(tag)?;
        if !view.is_loaded() {
            return Err(BridgeError::DocumentNotLoaded(tag));
        }
        Ok(view)
    }

    /// Idempotent; the second call for a tag returns `None`.
    pub fn unregister(&mut self, tag: Tag) -> Option<DocumentView> {
        let removed = self.views.remove(&tag);
        if removed.is_some() {
            tracing::debug!(tag, "view unregistered");
        }
        removed
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.views.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::engine::memory::{MemoryDocumentData, MemoryEngine, MemoryPage};
    use crate::view::{DocumentOpener, UriResolver, ViewConfiguration};

    fn attached(tag: Tag) -> DocumentView {
        let mut view = DocumentView::new(tag);
        view.attach();
        view
    }

    #[test]
    fn test_unattached_view_is_rejected() {
        let mut registry = HandleRegistry::new();
        let rejected = registry.register(1, DocumentView::new(1));
        assert!(rejected.is_some());
        assert!(!registry.contains(1));
        assert!(matches!(registry.resolve(1), Err(BridgeError::ViewNotFound(1))));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = HandleRegistry::new();
        assert!(registry.register(1, attached(1)).is_none());
        let replaced = registry.register(1, attached(1));
        assert_eq!(replaced.map(|v| v.tag()), Some(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = HandleRegistry::new();
        registry.register(7, attached(7));
        assert!(registry.unregister(7).is_some());
        assert!(registry.unregister(7).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_reloads_loaded_view() {
        let engine = MemoryEngine::new();
        engine
            .library()
            .insert("a.pdf", MemoryDocumentData::new().with_page(MemoryPage::a4()));
        let opener = DocumentOpener::new(Box::new(engine), UriResolver::new(&BridgeConfig::default()));

        let mut view = attached(3);
        view.set_document("a.pdf", &opener).unwrap();
        view.set_password("", &opener).unwrap();
        view.set_configuration(ViewConfiguration::default(), &opener).unwrap();
        let before = view.page_reloads();

        let mut registry = HandleRegistry::new();
        registry.register(3, view);
        assert_eq!(registry.resolve(3).unwrap().page_reloads(), before + 1);

        let unloaded = attached(4);
        registry.register(4, unloaded);
        assert_eq!(registry.resolve(4).unwrap().page_reloads(), 0);

        assert!(registry.loaded_mut(3).is_ok());
        assert!(matches!(registry.loaded_mut(4), Err(BridgeError::DocumentNotLoaded(4))));
        assert!(matches!(registry.loaded_mut(5), Err(BridgeError::ViewNotFound(5))));
    }
}
