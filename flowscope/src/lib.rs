//! Flowscope: an interactive debugging console for graph-structured
//! workflow engines.
//!
//! The core is the execution-trace synchronization engine: it normalizes
//! the static graph topology ([`graph`]), computes a stable layered layout
//! ([`layout`]), decodes the live per-node event stream ([`stream`]),
//! classifies step payloads into renderable shapes ([`classify`]), and keeps
//! the active-node highlight consistent with the trace ([`controller`]).

pub mod api;
pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod layout;
pub mod markdown;
pub mod render;
pub mod stream;
pub mod threads;

pub use error::{ConsoleError, Result};
