//! Conversation view-model state.
//!
//! This module provides the in-memory state behind the chat view: the
//! per-chat ordered message list with its transient rendering flags, and
//! the sidebar's chat-session summaries with relative-time bucketing.
//!
//! # Architecture
//!
//! - [`ChatThread`]: the message view-model for one open conversation
//! - [`ThreadStore`]: thread-safe store for open conversations
//! - [`ChatHistoryStore`]: sidebar summaries, synced from the backend
//!
//! # Example
//!
//! ```rust
//! use vpbank_text2sql_ui::session::{ChatMessage, ThreadStore};
//!
//! let store = ThreadStore::new();
//! let thread = store.get_or_create("chat-1");
//! thread.begin_send("Cho tôi xem top khách hàng");
//!
//! // user message plus the loading placeholder
//! assert_eq!(thread.messages().len(), 2);
//! ```

pub mod history;
pub mod thread;

pub use history::{Bucket, BucketLabel, ChatHistoryStore};
pub use thread::{ChatMessage, ChatThread, ThreadStore};
