//! services/api/src/lib.rs
//!
//! The service shell around `study_assistant_core`: OpenAI-backed adapters for
//! every core port, configuration, document import and the HTTP/WebSocket surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod import;
pub mod web;
