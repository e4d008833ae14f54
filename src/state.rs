//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::engine::{self, Engine};
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    dispatcher: Dispatcher,
}

impl AppState {
    /// Start the view host for the configured engine.
    ///
    /// Must run inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let engine = engine::from_kind(config.bridge.engine);
        Self::with_engine(config, engine)
    }

    /// Like [`AppState::new`], with an explicit engine
    pub fn with_engine(config: Config, engine: Box<dyn Engine>) -> Result<Self> {
        let dispatcher = Dispatcher::start(&config.bridge, engine)?;
        Ok(Self {
            inner: Arc::new(AppStateInner { config, dispatcher }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}
