//! Command handlers. Everything here runs on the view-host thread.

use std::fs;
use std::path::{Path, PathBuf};

use super::{find_view, Command, Completion, Reply, ViewHost};
use crate::convert::{ConvertError, ConverterRegistry, Mutation};
use crate::engine::model::SignatureImage;
use crate::engine::{EngineDocument, EngineResult, PasswordSettings, PendingSave, SnapshotOptions};
use crate::error::{BridgeError, Result};
use crate::search::{SearchOptions, SearchQuery, SearchSession};
use crate::view::{DocumentOpener, DocumentUri, DocumentView, HandleRegistry, Margins, Tag, UriResolver, ViewConfiguration};

/// XFDF interchange for one kind of page object
#[derive(Debug, Clone, Copy)]
enum Interchange {
    Annotations,
    Widgets,
}

impl Interchange {
    fn dir(self) -> &'static str {
        match self {
            Interchange::Annotations => "annotations",
            Interchange::Widgets => "widgets",
        }
    }

    fn import_op(self) -> &'static str {
        match self {
            Interchange::Annotations => "importAnnotations",
            Interchange::Widgets => "importWidgets",
        }
    }

    fn export_op(self) -> &'static str {
        match self {
            Interchange::Annotations => "exportAnnotations",
            Interchange::Widgets => "exportWidgets",
        }
    }

    fn export(self, doc: &dyn EngineDocument) -> EngineResult<String> {
        match self {
            Interchange::Annotations => doc.export_annotations(),
            Interchange::Widgets => doc.export_widgets(),
        }
    }

    fn import(self, doc: &mut dyn EngineDocument, xfdf: &str) -> EngineResult<usize> {
        match self {
            Interchange::Annotations => doc.import_annotations(xfdf),
            Interchange::Widgets => doc.import_widgets(xfdf),
        }
    }
}

impl ViewHost {
    pub(super) fn handle(&mut self, tag: Tag, command: Command, done: Completion) {
        let converters = self.converters;
        let registry = &mut self.registry;
        let opener = &self.opener;

        let result = match command {
            // Offloaded; these resolve `done` themselves
            Command::Save => return self.save(tag, done),
            Command::SaveAs {
                save_path,
                remove_security,
                font_subset,
            } => {
                let options = SnapshotOptions {
                    remove_security,
                    ..SnapshotOptions::default()
                };
                return self.write_copy(tag, "saveAs", &save_path, options, font_subset, BridgeError::SaveFailed, done);
            }
            Command::FlattenAllPages { save_path, font_subset } => {
                let options = SnapshotOptions {
                    flatten: true,
                    ..SnapshotOptions::default()
                };
                return self.write_copy(
                    tag,
                    "flattenAllPages",
                    &save_path,
                    options,
                    font_subset,
                    BridgeError::FlattenFailed,
                    done,
                );
            }
            Command::SplitDocumentPages { save_path, pages } => {
                let options = SnapshotOptions {
                    pages: Some(pages),
                    ..SnapshotOptions::default()
                };
                return self.write_copy(
                    tag,
                    "splitDocumentPages",
                    &save_path,
                    options,
                    None,
                    BridgeError::SplitDocumentFailed,
                    done,
                );
            }
            Command::ImportDocument {
                file_path,
                password,
                pages,
                insert_position,
            } => return self.import_document(tag, &file_path, password, pages, insert_position, done),
            Command::ImportAnnotations { xfdf_path } => {
                return self.import_interchange(tag, Interchange::Annotations, &xfdf_path, done)
            }
            Command::ImportWidgets { xfdf_path } => {
                return self.import_interchange(tag, Interchange::Widgets, &xfdf_path, done)
            }
            Command::ExportAnnotations => return self.export_interchange(tag, Interchange::Annotations, done),
            Command::ExportWidgets => return self.export_interchange(tag, Interchange::Widgets, done),

            // Inputs
            Command::Open { document, password } => on_loaded(registry, tag, |view| {
                view.reopen(document, password, opener)?;
                Ok(true)
            }),
            Command::SetDocument { document } => {
                self.input(tag, |view, opener| view.set_document(document, opener))
            }
            Command::SetPassword { password } => {
                self.input(tag, |view, opener| view.set_password(password, opener))
            }
            Command::SetConfiguration { configuration } => self.input(tag, |view, opener| {
                view.set_configuration(ViewConfiguration::parse(&configuration)?, opener)
            }),

            // View
            Command::GetCurrentPageIndex => on_loaded(registry, tag, |view| Ok(view.current_page())),
            Command::SetDisplayPageIndex { page_index } => {
                on_loaded(registry, tag, |view| view.set_current_page(page_index))
            }
            Command::SetMargins {
                left,
                top,
                right,
                bottom,
            } => on_loaded(registry, tag, |view| {
                view.set_margins(Margins {
                    left,
                    top,
                    right,
                    bottom,
                });
                Ok(())
            }),

            // Document
            Command::GetPageCount => on_loaded(registry, tag, |view| Ok(view.document()?.page_count())),
            Command::GetFileName => on_loaded(registry, tag, |view| Ok(view.document()?.file_name())),
            Command::GetDocumentPath => on_loaded(registry, tag, |view| {
                let path = view.document()?.path().display().to_string();
                Ok(view.document_uri().map_or(path, str::to_string))
            }),
            Command::HasChange => on_loaded(registry, tag, |view| Ok(view.document()?.has_changes())),
            Command::InsertBlankPage {
                page_index,
                width,
                height,
            } => on_loaded(registry, tag, |view| {
                if !(width > 0.0 && height > 0.0) {
                    return Err(BridgeError::InvalidArgument(format!(
                        "invalid page size {}x{}",
                        width, height
                    )));
                }
                view.document_mut()?.insert_blank_page(page_index, width, height)?;
                view.reload_pages();
                Ok(true)
            }),
            Command::RemoveAllAnnotations => on_loaded(registry, tag, |view| {
                if view.document_mut()?.remove_all_annotations()? {
                    view.reload_pages();
                }
                Ok(true)
            }),

            // Security
            Command::IsEncrypted => on_loaded(registry, tag, |view| Ok(view.document()?.is_encrypted())),
            Command::GetPermissions => on_loaded(registry, tag, |view| Ok(view.document()?.permissions() as i64)),
            Command::CheckOwnerUnlocked => on_loaded(registry, tag, |view| Ok(view.document()?.owner_unlocked())),
            Command::CheckOwnerPassword { password } => {
                on_loaded(registry, tag, |view| Ok(view.document_mut()?.check_owner_password(&password)))
            }
            Command::SetDocumentPassword {
                user_password,
                owner_password,
                allows_printing,
                allows_copying,
                encrypt_algo,
            } => {
                let settings = PasswordSettings {
                    user_password,
                    owner_password,
                    allows_printing,
                    allows_copying,
                    encrypt_algo,
                };
                on_loaded(registry, tag, |view| {
                    view.document_mut()?.set_password(&settings)?;
                    Ok(true)
                })
            }
            Command::RemovePassword => on_loaded(registry, tag, |view| {
                view.document_mut()?.remove_password()?;
                Ok(true)
            }),
            Command::GetEncryptAlgo => {
                on_loaded(registry, tag, |view| Ok(view.document()?.encrypt_algo().as_str().to_string()))
            }

            // Page objects
            Command::GetAnnotations { page_index } => on_loaded(registry, tag, |view| {
                Ok(converters.get_annotations(view.document()?, page_index)?)
            }),
            Command::GetWidgets { page_index } => {
                on_loaded(registry, tag, |view| Ok(converters.get_widgets(view.document()?, page_index)?))
            }
            Command::RemoveAnnotation { page_index, uuid } => on_loaded(registry, tag, |view| {
                remove_object(view, converters, page_index, &uuid, false)
            }),
            Command::RemoveWidget { page_index, uuid } => {
                on_loaded(registry, tag, |view| remove_object(view, converters, page_index, &uuid, true))
            }
            Command::SetTextWidgetText { page_index, uuid, text } => on_loaded(registry, tag, |view| {
                mutate(view, converters, page_index, &uuid, Mutation::SetText(text))
            }),
            Command::SetWidgetIsChecked {
                page_index,
                uuid,
                is_checked,
            } => on_loaded(registry, tag, |view| {
                mutate(view, converters, page_index, &uuid, Mutation::SetChecked(is_checked))
            }),
            Command::AddWidgetImageSignature {
                page_index,
                uuid,
                image_path,
            } => on_loaded(registry, tag, |view| {
                let image = load_signature(opener.resolver(), &image_path)?;
                mutate(view, converters, page_index, &uuid, Mutation::SetSignatureImage(image))
            }),
            Command::UpdateAp { page_index, uuid } => on_loaded(registry, tag, |view| {
                let doc = view.document_mut()?;
                let id = converters.find_by_identity(&*doc, page_index, &uuid)?.id;
                let updated = doc.update_appearance(page_index, id)?;
                view.request_redraw();
                Ok(updated)
            }),

            // Search
            Command::SearchText {
                keywords,
                search_options,
            } => on_loaded(registry, tag, |view| {
                let (doc, searcher) = view.search_parts()?;
                let query = SearchQuery::new(keywords, SearchOptions::from_host(search_options));
                Ok(searcher.search(doc, query)?)
            }),
            Command::Selection {
                page_index,
                text_range_index,
            } => on_loaded(registry, tag, |view| {
                let (doc, searcher) = view.search_parts()?;
                if searcher.select(doc, page_index, text_range_index)?.is_none() {
                    tracing::debug!(tag, page_index, text_range_index, "no match to highlight");
                }
                view.request_redraw();
                Ok(())
            }),
            Command::ClearSearch => on_loaded(registry, tag, |view| {
                let (_, searcher) = view.search_parts()?;
                if searcher.clear() {
                    view.request_redraw();
                }
                Ok(())
            }),
            Command::GetSearchText {
                page_index,
                location,
                length,
            } => on_loaded(registry, tag, |view| {
                Ok(SearchSession::result_text(view.document()?, page_index, location, length)?)
            }),
        };

        done.complete(result);
    }

    /// Run an input setter on a registered or parked view
    fn input<F>(&mut self, tag: Tag, f: F) -> Result<Reply>
    where
        F: FnOnce(&mut DocumentView, &DocumentOpener) -> Result<()>,
    {
        let view = find_view(&mut self.registry, &mut self.parked, tag).ok_or(BridgeError::ViewNotFound(tag))?;
        f(view, &self.opener)?;
        Ok(Reply::Void)
    }

    /// Write unsaved changes back to the document's own path.
    ///
    /// One save per view is in flight at a time. A save that arrives
    /// meanwhile waits and is folded into a follow-up save of the latest
    /// state, so writes to the same path never race.
    fn save(&mut self, tag: Tag, done: Completion) {
        if let Some(waiting) = self.saves.get_mut(&tag) {
            tracing::debug!(tag, "save queued behind the one in flight");
            waiting.push(done);
            return;
        }
        self.start_save(tag, vec![done]);
    }

    /// A document without changes succeeds at once. Otherwise the state
    /// is captured here, written on the pool, and the engine is told
    /// (and reloads, if it asks to) back on the view host.
    fn start_save(&mut self, tag: Tag, waiters: Vec<Completion>) {
        let prepared = self.registry.loaded_mut(tag).and_then(|view| {
            let loads = view.loads();
            let doc = view.document_mut()?;
            if !doc.has_changes() {
                return Ok(None);
            }
            Ok(Some((doc.begin_save()?, doc.path().to_path_buf(), loads)))
        });
        let (pending, path, loads) = match prepared {
            Ok(Some(prepared)) => prepared,
            Ok(None) => return resolve_all(waiters, Ok(Reply::from(true))),
            Err(e) => return resolve_all(waiters, Err(e.wrap(BridgeError::SaveFailed))),
        };

        let PendingSave {
            snapshot,
            needs_reload,
            revision,
        } = pending;
        self.saves.insert(tag, Vec::new());
        let resume = self.workers.on_drop(move |host| host.resume_saves(tag));

        self.workers.offload(
            "save",
            move || snapshot.write_to(&path),
            move |host, written| {
                let _resume = resume;
                let result = written
                    .map_err(BridgeError::from)
                    .and_then(|()| host.finish_save(tag, loads, revision, needs_reload));
                resolve_all(
                    waiters,
                    result.map(|()| Reply::from(true)).map_err(|e| e.wrap(BridgeError::SaveFailed)),
                );
            },
        );
    }

    fn resume_saves(&mut self, tag: Tag) {
        let waiting = self.saves.remove(&tag).unwrap_or_default();
        if !waiting.is_empty() {
            self.start_save(tag, waiting);
        }
    }

    /// Edits made after the capture keep the document dirty and suppress
    /// the reload, which would discard them.
    fn finish_save(&mut self, tag: Tag, loads: u64, revision: u64, needs_reload: bool) -> Result<()> {
        let Some(view) = self.any_view_mut(tag) else {
            tracing::debug!(tag, "view gone before save finished");
            return Ok(());
        };
        if view.loads() != loads {
            tracing::debug!(tag, "document replaced before save finished");
            return Ok(());
        }
        let Ok(doc) = view.document_mut() else {
            return Ok(());
        };

        let current = doc.finish_save(revision);
        let reload = needs_reload && current;
        if reload {
            doc.reload()?;
            view.reload_pages();
        }
        tracing::info!(tag, current, reloaded = reload, "document saved");
        Ok(())
    }

    /// Write a transformed copy of the document to `save_path`
    #[allow(clippy::too_many_arguments)]
    fn write_copy(
        &mut self,
        tag: Tag,
        op: &'static str,
        save_path: &str,
        options: SnapshotOptions,
        font_subset: Option<bool>,
        wrap: fn(String) -> BridgeError,
        done: Completion,
    ) {
        let resolver = self.opener.resolver();
        let prepared = self.registry.loaded_mut(tag).and_then(|view| {
            if options.pages.as_ref().is_some_and(|pages| pages.is_empty()) {
                return Err(BridgeError::InvalidArgument("no pages selected".to_string()));
            }
            let target = resolver.output_path(&DocumentUri::parse(save_path)?)?;
            let options = SnapshotOptions {
                font_subset: font_subset.unwrap_or_else(|| view.font_subset()),
                ..options
            };
            Ok((view.document()?.snapshot(&options)?, target))
        });
        let (snapshot, target) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return done.fail(e.wrap(wrap)),
        };

        tracing::info!(tag, op, target = %target.display(), "writing document copy");
        self.workers.offload(
            op,
            move || snapshot.write_to(&target),
            move |_host, written| {
                done.complete(
                    written
                        .map(|()| Reply::from(true))
                        .map_err(|e| BridgeError::from(e).wrap(wrap)),
                );
            },
        );
    }

    /// Merge pages of another document. The source is read (and copied
    /// out of a content mount) on the pool, then merged on the view host.
    fn import_document(
        &mut self,
        tag: Tag,
        file_path: &str,
        password: String,
        pages: Vec<usize>,
        insert_position: i64,
        done: Completion,
    ) {
        let uri = match self
            .registry
            .loaded_mut(tag)
            .and_then(|_| DocumentUri::parse(file_path))
        {
            Ok(uri) => uri,
            Err(e) => return done.fail(e.wrap(BridgeError::ImportDocumentFailed)),
        };

        let resolver = self.opener.resolver().clone();
        self.workers.offload(
            "importDocument",
            move || resolver.materialize_import(&uri),
            move |host, source| {
                let result =
                    source.and_then(|source| host.import_pages(tag, &source, &password, &pages, insert_position));
                done.complete(
                    result
                        .map(|()| Reply::from(true))
                        .map_err(|e| e.wrap(BridgeError::ImportDocumentFailed)),
                );
            },
        );
    }

    fn import_pages(
        &mut self,
        tag: Tag,
        source: &Path,
        password: &str,
        pages: &[usize],
        insert_position: i64,
    ) -> Result<()> {
        let view = self.registry.loaded_mut(tag)?;
        let doc = view.document_mut()?;
        let count = doc.page_count();
        let position = usize::try_from(insert_position).map_or(count, |p| p.min(count));
        let password = Some(password).filter(|p| !p.is_empty());

        doc.import_pages(source, password, pages, position)?;
        view.reload_pages();
        tracing::info!(tag, source = %source.display(), position, "document imported");
        Ok(())
    }

    fn import_interchange(&mut self, tag: Tag, kind: Interchange, xfdf_path: &str, done: Completion) {
        let wrap: fn(String) -> BridgeError = BridgeError::ImportAnnotationsFailed;
        let uri = match self
            .registry
            .loaded_mut(tag)
            .and_then(|_| DocumentUri::parse(xfdf_path))
        {
            Ok(uri) => uri,
            Err(e) => return done.fail(e.wrap(wrap)),
        };

        let resolver = self.opener.resolver().clone();
        self.workers.offload(
            kind.import_op(),
            move || -> Result<String> {
                let path = resolver.resolve(&uri)?;
                Ok(fs::read_to_string(path)?)
            },
            move |host, xfdf| {
                let result = xfdf.and_then(|xfdf| host.apply_interchange(tag, kind, &xfdf));
                done.complete(result.map(|_| Reply::from(true)).map_err(|e| e.wrap(wrap)));
            },
        );
    }

    fn apply_interchange(&mut self, tag: Tag, kind: Interchange, xfdf: &str) -> Result<usize> {
        let view = self.registry.loaded_mut(tag)?;
        let count = kind.import(view.document_mut()?, xfdf)?;
        view.reload_pages();
        tracing::info!(tag, kind = kind.dir(), count, "interchange imported");
        Ok(count)
    }

    /// Serialize on the view host, write on the pool. Replies with the
    /// path written.
    fn export_interchange(&mut self, tag: Tag, kind: Interchange, done: Completion) {
        let wrap: fn(String) -> BridgeError = BridgeError::ExportAnnotationsFailed;
        let exported = self.registry.loaded_mut(tag).and_then(|view| {
            let doc = view.document()?;
            Ok((kind.export(doc)?, file_stem(doc)))
        });
        let (xfdf, stem) = match exported {
            Ok(exported) => exported,
            Err(e) => return done.fail(e.wrap(wrap)),
        };

        let resolver = self.opener.resolver().clone();
        self.workers.offload(
            kind.export_op(),
            move || -> Result<PathBuf> {
                let target = resolver.export_path(kind.dir(), &stem, "xfdf")?;
                fs::write(&target, xfdf)?;
                Ok(target)
            },
            move |_host, written| {
                done.complete(
                    written
                        .map(|target| Reply::from(target.display().to_string()))
                        .map_err(|e| e.wrap(wrap)),
                );
            },
        );
    }
}

/// Resolve every waiter of one save with the same outcome
fn resolve_all(waiters: Vec<Completion>, result: Result<Reply>) {
    match result {
        Ok(reply) => {
            for done in waiters {
                done.succeed(reply.clone());
            }
        }
        Err(err) => {
            for done in waiters {
                done.fail(save_failure(&err));
            }
        }
    }
}

/// Copy of a save failure, code preserved
fn save_failure(err: &BridgeError) -> BridgeError {
    match err {
        BridgeError::ViewNotFound(tag) => BridgeError::ViewNotFound(*tag),
        BridgeError::DocumentNotLoaded(tag) => BridgeError::DocumentNotLoaded(*tag),
        BridgeError::InvalidArgument(msg) => BridgeError::InvalidArgument(msg.clone()),
        BridgeError::Internal(msg) => BridgeError::Internal(msg.clone()),
        BridgeError::SaveFailed(msg) => BridgeError::SaveFailed(msg.clone()),
        other => BridgeError::SaveFailed(other.to_string()),
    }
}

/// Run `f` against a registered view with a loaded document
fn on_loaded<R, F>(registry: &mut HandleRegistry, tag: Tag, f: F) -> Result<Reply>
where
    R: Into<Reply>,
    F: FnOnce(&mut DocumentView) -> Result<R>,
{
    f(registry.loaded_mut(tag)?).map(Into::into)
}

/// Delete an annotation (or widget) by identity.
///
/// An identity that resolves to nothing, or to the other kind of
/// object, removes nothing and yields `false`.
fn remove_object(
    view: &mut DocumentView,
    converters: ConverterRegistry,
    page_index: usize,
    identity: &str,
    widget: bool,
) -> Result<bool> {
    let doc = view.document_mut()?;
    let id = match converters.find_by_identity(&*doc, page_index, identity) {
        Ok(annot) if annot.is_widget() == widget => annot.id,
        Ok(_) | Err(ConvertError::NotFound { .. }) => {
            tracing::debug!(page_index, identity, "nothing to remove");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let removed = doc.delete_annotation(page_index, id)?;
    if removed {
        view.request_redraw();
    }
    Ok(removed)
}

fn mutate(
    view: &mut DocumentView,
    converters: ConverterRegistry,
    page_index: usize,
    identity: &str,
    mutation: Mutation,
) -> Result<bool> {
    let doc = view.document_mut()?;
    let id = converters.mutate(doc, page_index, identity, mutation)?;
    doc.update_appearance(page_index, id)?;
    view.request_redraw();
    Ok(true)
}

fn load_signature(resolver: &UriResolver, image_path: &str) -> Result<SignatureImage> {
    let path = resolver.resolve(&DocumentUri::parse(image_path)?)?;
    let image = image::open(&path)
        .map_err(|e| BridgeError::InvalidArgument(format!("unreadable signature image {}: {}", path.display(), e)))?
        .to_rgba8();
    Ok(SignatureImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn file_stem(doc: &dyn EngineDocument) -> String {
    Path::new(&doc.file_name())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
