//! Command dispatcher
//!
//! All engine objects live on one OS thread, the view host. Callers
//! never touch them directly: they post jobs onto an unbounded queue and
//! the view host runs them one at a time, in order. That queue is the
//! only thing keeping two commands from mutating a document at once, so
//! every entrypoint goes through it.
//!
//! File I/O that would stall the queue (save, export, split, import) is
//! handed to a [`WorkerPool`](worker::WorkerPool). Its completion, and
//! any reload that follows, is posted back onto the queue before the
//! caller hears about it.

mod command;
mod completion;
mod ops;
mod worker;


use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::thread;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::config::BridgeConfig;
use crate::convert::ConverterRegistry;
use crate::engine::Engine;
use crate::error::{BridgeError, Result};
use crate::view::{DocumentOpener, DocumentView, HandleRegistry, HandleState, Tag, UriResolver};

pub use command::{Command, Reply};
pub use completion::{Completion, CompletionReceiver};

use worker::WorkerPool;

/// A unit of work for the view host
pub(crate) type Job = Box<dyn FnOnce(&mut ViewHost) + Send>;

/// Cloneable handle for posting commands to the view host.
///
/// The view host stops once every clone has been dropped.
#[derive(Clone)]
pub struct Dispatcher {
    queue: mpsc::UnboundedSender<Job>,
}

/// Summary of one view, for the host bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewInfo {
    pub tag: Tag,
    pub state: HandleState,
    pub attached: bool,
    pub page_count: Option<usize>,
}

impl Dispatcher {
    /// Spawn the view host thread. Must be called from within a tokio
    /// runtime, which the worker pool runs on.
    pub fn start(config: &BridgeConfig, engine: Box<dyn Engine>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::Internal(format!("dispatcher needs a tokio runtime: {}", e)))?;
        let (queue, mut jobs) = mpsc::unbounded_channel::<Job>();
        let workers = WorkerPool::new(runtime, config.worker_threads, queue.downgrade());
        let resolver = UriResolver::new(config);
        let engine_name = engine.name();

        thread::Builder::new().name("view-host".into()).spawn(move || {
            let mut host = ViewHost::new(DocumentOpener::new(engine, resolver), workers);
            tracing::info!(engine = engine_name, "view host started");

            while let Some(job) = jobs.blocking_recv() {
                if std::panic::catch_unwind(AssertUnwindSafe(|| job(&mut host))).is_err() {
                    tracing::error!("view host job panicked");
                }
            }
            tracing::info!(views = host.registry.len(), "view host stopped");
        })?;

        Ok(Self { queue })
    }

    /// Post a command. `done` is resolved exactly once, on the view host
    /// or, for offloaded work, after the worker result is posted back.
    pub fn dispatch(&self, tag: Tag, command: Command, done: Completion) {
        tracing::debug!(tag, op = command.name(), "dispatch");
        self.post(move |host| host.handle(tag, command, done));
    }

    /// Post a command and wait for its result
    pub async fn execute(&self, tag: Tag, command: Command) -> Result<Reply> {
        let (done, reply) = Completion::new(command.name());
        self.dispatch(tag, command, done);
        reply
            .await
            .unwrap_or_else(|_| Err(BridgeError::Internal("view host stopped".to_string())))
    }

    /// Construct a view for `tag`. It receives inputs but no other
    /// commands until attached.
    pub async fn create_view(&self, tag: Tag) -> Result<()> {
        self.call(move |host| host.create_view(tag)).await
    }

    pub async fn attach_view(&self, tag: Tag) -> Result<()> {
        self.call(move |host| host.attach_view(tag)).await
    }

    pub async fn detach_view(&self, tag: Tag) -> Result<()> {
        self.call(move |host| host.detach_view(tag)).await
    }

    /// Release the view's document and forget the tag. Idempotent.
    pub async fn destroy_view(&self, tag: Tag) -> Result<()> {
        self.call(move |host| host.destroy_view(tag)).await
    }

    pub async fn view_info(&self, tag: Tag) -> Result<ViewInfo> {
        self.call(move |host| host.view_info(tag)).await
    }

    /// Run a closure on the view host and wait for its result
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ViewHost) -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.post(move |host| {
            let _ = sender.send(f(host));
        });
        receiver
            .await
            .map_err(|_| BridgeError::Internal("view host dropped the request".to_string()))?
    }

    fn post(&self, job: impl FnOnce(&mut ViewHost) + Send + 'static) {
        if self.queue.send(Box::new(job)).is_err() {
            tracing::warn!("view host stopped; job dropped");
        }
    }
}

/// State owned by the view-host thread
pub struct ViewHost {
    registry: HandleRegistry,
    /// Created or detached views, not reachable by ordinary commands
    parked: HashMap<Tag, DocumentView>,
    /// Views with a save in flight, and the saves waiting behind it
    saves: HashMap<Tag, Vec<Completion>>,
    opener: DocumentOpener,
    converters: ConverterRegistry,
    workers: WorkerPool,
}

impl ViewHost {
    fn new(opener: DocumentOpener, workers: WorkerPool) -> Self {
        Self {
            registry: HandleRegistry::new(),
            parked: HashMap::new(),
            saves: HashMap::new(),
            opener,
            converters: ConverterRegistry::new(),
            workers,
        }
    }

    fn create_view(&mut self, tag: Tag) -> Result<()> {
        if self.registry.contains(tag) || self.parked.contains_key(&tag) {
            return Err(BridgeError::InvalidArgument(format!("view {} already exists", tag)));
        }
        self.parked.insert(tag, DocumentView::new(tag));
        tracing::info!(tag, "view created");
        Ok(())
    }

    fn attach_view(&mut self, tag: Tag) -> Result<()> {
        if self.registry.contains(tag) {
            return Ok(());
        }
        let mut view = self.parked.remove(&tag).ok_or(BridgeError::ViewNotFound(tag))?;
        view.attach();
        if let Some(displaced) = self.registry.register(tag, view) {
            tracing::warn!(tag, state = ?displaced.state(), "attach displaced a view");
        }
        Ok(())
    }

    fn detach_view(&mut self, tag: Tag) -> Result<()> {
        if self.parked.contains_key(&tag) {
            return Ok(());
        }
        let mut view = self.registry.unregister(tag).ok_or(BridgeError::ViewNotFound(tag))?;
        view.detach();
        self.parked.insert(tag, view);
        Ok(())
    }

    fn destroy_view(&mut self, tag: Tag) -> Result<()> {
        let view = self.registry.unregister(tag).or_else(|| self.parked.remove(&tag));
        if let Some(mut view) = view {
            view.release();
            tracing::info!(tag, "view destroyed");
        }
        Ok(())
    }

    fn view_info(&mut self, tag: Tag) -> Result<ViewInfo> {
        let view = self.any_view_mut(tag).ok_or(BridgeError::ViewNotFound(tag))?;
        Ok(ViewInfo {
            tag,
            state: view.state(),
            attached: view.is_attached(),
            page_count: view.document().ok().map(|d| d.page_count()),
        })
    }

    fn any_view_mut(&mut self, tag: Tag) -> Option<&mut DocumentView> {
        find_view(&mut self.registry, &mut self.parked, tag)
    }
}

/// A registered view, or a parked one. Parked views still accept inputs.
fn find_view<'a>(
    registry: &'a mut HandleRegistry,
    parked: &'a mut HashMap<Tag, DocumentView>,
    tag: Tag,
) -> Option<&'a mut DocumentView> {
    if registry.contains(tag) {
        return registry.resolve_mut(tag).ok();
    }
    parked.get_mut(&tag)
}
