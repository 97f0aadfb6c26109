//! VPBank Text2SQL UI
//!
//! A browser chat interface for a natural-language-to-SQL banking
//! assistant. The server renders every view as plain HTML, streams the
//! typewriter reveal over SSE, and consumes the Text2SQL backend's
//! JSON API without owning any wire protocol of its own.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server with HTMX fragment swaps
//! - **Backend client**: Typed JSON client for the Text2SQL API, with a
//!   canned-data mode for development
//! - **View state**: In-process message threads, chat history and the
//!   persisted credential bundle
//!
//! # Modules
//!
//! - [`backend`]: Backend API contract, HTTP and mock implementations
//! - [`session`]: Message threads and chat history buckets
//! - [`reveal`]: Time-paced character-by-character text reveal
//! - [`table`]: Sort/filter/paginate for rectangular result sets
//! - [`chart`]: Series and pie-slice shaping for chart rendering
//! - [`ui`]: Server-rendered HTML fragments

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod backend;
pub mod chart;
pub mod config;
pub mod reveal;
pub mod server;
pub mod session;
pub mod table;
pub mod ui;

use std::sync::Arc;

use crate::auth::AuthStore;
use crate::backend::ChatBackend;
use crate::config::AppConfig;
use crate::session::{ChatHistoryStore, ThreadStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend API client (HTTP or canned demo data).
    pub backend: Arc<dyn ChatBackend>,
    /// Persisted credential bundle.
    pub auth: AuthStore,
    /// Live message threads by chat id.
    pub threads: ThreadStore,
    /// Sidebar chat summaries.
    pub history: ChatHistoryStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
