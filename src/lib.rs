//! Document View Bridge Library
//!
//! A host application drives document views through numeric tags. This
//! crate keeps the engine objects behind those tags and runs the host's
//! commands against them, one at a time, on a dedicated thread.
//!
//! # Modules
//!
//! - `view`: per-tag view state, the tag registry and document references
//! - `dispatch`: the command set and the view-host thread that runs it
//! - `convert`: native annotations to typed records and back
//! - `search`: keyword search sessions
//! - `engine`: the document engine abstraction and its backends
//! - `routes`: HTTP endpoints over the dispatcher

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod routes;
pub mod search;
pub mod state;
pub mod view;
