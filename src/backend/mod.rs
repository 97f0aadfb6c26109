//! Text2SQL backend API client.
//!
//! The UI consumes the backend's JSON contracts and owns no wire protocol of
//! its own. [`ChatBackend`] is the seam: the integrated mode talks HTTP via
//! [`HttpBackend`], development mode serves canned banking demo data via
//! [`MockBackend`]. The active implementation is chosen from configuration
//! at startup and injected through `AppState`.

pub mod http;
pub mod mock;
pub mod types;

pub use http::HttpBackend;
pub use mock::MockBackend;

use thiserror::Error;

use types::{
    ChatDetail, ChatSessionSummary, ContinueChatResponse, KnowledgeBaseResponse, LoginResponse,
    MessageData, NewChatResponse,
};

/// Backend call failure taxonomy.
///
/// Nothing here is fatal to the process; handlers degrade every variant to a
/// visible, recoverable UI state. `Unauthorized` is special-cased uniformly
/// at the client boundary: the caller clears stored credentials and forces
/// the login view regardless of which call triggered it.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport-level failure (connection refused, timeout, DNS).
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The stored credentials were rejected (HTTP 401).
    #[error("authentication rejected by backend")]
    Unauthorized,

    /// Non-401 error status from the backend.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected contract.
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Contract with the Text2SQL backend (consumed, not reimplemented here).
///
/// Every call completes exactly once (success or failure) and is not itself
/// cancelable; a caller navigating away simply stops relying on the result.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a new conversation from the first user message.
    async fn new_chat(&self, message: &str) -> BackendResult<NewChatResponse>;

    /// Send a follow-up message on an existing conversation.
    async fn continue_chat(
        &self,
        chat_id: &str,
        message: &str,
    ) -> BackendResult<ContinueChatResponse>;

    /// List chat-session summaries for the sidebar.
    async fn get_chat_history(&self) -> BackendResult<Vec<ChatSessionSummary>>;

    /// Fetch one conversation with its full message list.
    async fn get_chat_by_id(&self, chat_id: &str) -> BackendResult<ChatDetail>;

    /// Delete a conversation.
    async fn delete_chat(&self, chat_id: &str) -> BackendResult<()>;

    /// Lazily resolve the tabular data attached to an assistant message.
    async fn get_message_data(&self, message_id: &str) -> BackendResult<MessageData>;

    /// Upload a document to the knowledge base.
    async fn upload_knowledge_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<KnowledgeBaseResponse>;

    /// Exchange username/password for a credential bundle.
    async fn login(&self, username: &str, password: &str) -> BackendResult<LoginResponse>;
}
