//! Per-chat message view-model.
//!
//! A [`ChatThread`] holds the ordered list of messages shown for one
//! conversation. The list is strictly append-only, save for the single
//! loading-placeholder removal step that happens when a send resolves
//! or fails. The [`ThreadStore`] keys live threads by chat id so the
//! HTTP handlers can share them across requests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::types::{MessageRecord, MessageRole, ResponseType, ResultPayload};

/// One rendered chat message.
///
/// Transient presentation flags (`is_streaming`, `is_loading`) never
/// survive serialization; a message reloaded from history always comes
/// back settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_count: Option<usize>,
    pub created_at: DateTime<Utc>,
    /// Character reveal still in progress.
    #[serde(skip)]
    pub is_streaming: bool,
    /// Placeholder shown while the backend call is in flight.
    #[serde(skip)]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultPayload>,
}

impl ChatMessage {
    /// A settled user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            sql_query: None,
            response_type: ResponseType::Text,
            execution_time: None,
            rows_count: None,
            created_at: Utc::now(),
            is_streaming: false,
            is_loading: false,
            data: None,
        }
    }

    /// The in-flight assistant placeholder. At most one of these ever
    /// lives in a thread.
    pub fn loading_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: String::new(),
            sql_query: None,
            response_type: ResponseType::Text,
            execution_time: None,
            rows_count: None,
            created_at: Utc::now(),
            is_streaming: false,
            is_loading: true,
            data: None,
        }
    }

    /// An assistant message, optionally still revealing.
    pub fn assistant(id: impl Into<String>, content: impl Into<String>, streaming: bool) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            sql_query: None,
            response_type: ResponseType::Text,
            execution_time: None,
            rows_count: None,
            created_at: Utc::now(),
            is_streaming: streaming,
            is_loading: false,
            data: None,
        }
    }

    /// Rehydrate a message fetched from chat history. Transient flags
    /// are always cleared.
    pub fn from_record(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            role: record.role,
            content: record.content,
            sql_query: record.sql_query,
            response_type: record.response_type.unwrap_or_default(),
            execution_time: record.execution_time,
            rows_count: record.rows_count,
            created_at: record.created_at,
            is_streaming: false,
            is_loading: false,
            data: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Ordered message list for one chat.
///
/// Cheap to clone; all clones share the same message list.
#[derive(Debug)]
pub struct ChatThread {
    inner: Arc<ThreadInner>,
}

#[derive(Debug)]
struct ThreadInner {
    id: String,
    messages: RwLock<Vec<ChatMessage>>,
}

impl Clone for ChatThread {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ChatThread {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ThreadInner {
                id: id.into(),
                messages: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Build a thread from persisted history records.
    pub fn from_records(id: impl Into<String>, records: Vec<MessageRecord>) -> Self {
        let thread = Self::new(id);
        {
            let mut messages = thread.inner.messages.write().unwrap();
            messages.extend(records.into_iter().map(ChatMessage::from_record));
        }
        thread
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Append a message. Pushing a loading placeholder first evicts any
    /// placeholder already present, so the thread never shows two.
    pub fn push(&self, message: ChatMessage) {
        debug_assert!(
            !(message.is_loading && message.is_streaming),
            "a message cannot be loading and streaming at once"
        );
        let mut messages = self.inner.messages.write().unwrap();
        if message.is_loading {
            messages.retain(|m| !m.is_loading);
        }
        messages.push(message);
    }

    /// Mutate the most recent message in place, if any.
    pub fn replace_last<F>(&self, mutate: F)
    where
        F: FnOnce(&mut ChatMessage),
    {
        let mut messages = self.inner.messages.write().unwrap();
        if let Some(last) = messages.last_mut() {
            mutate(last);
        }
    }

    pub fn pop_last(&self) -> Option<ChatMessage> {
        let mut messages = self.inner.messages.write().unwrap();
        messages.pop()
    }

    /// Snapshot of the current messages.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let messages = self.inner.messages.read().unwrap();
        messages.clone()
    }

    pub fn message_count(&self) -> usize {
        let messages = self.inner.messages.read().unwrap();
        messages.len()
    }

    /// Start a send: append the user message followed by the loading
    /// placeholder. Returns the user message id.
    pub fn begin_send(&self, content: impl Into<String>) -> String {
        let user = ChatMessage::user(content);
        let user_id = user.id.clone();
        self.push(user);
        self.push(ChatMessage::loading_placeholder());
        user_id
    }

    /// Resolve a send: drop the placeholder and append the settled
    /// assistant reply.
    pub fn resolve_send(&self, reply: ChatMessage) {
        let mut messages = self.inner.messages.write().unwrap();
        messages.retain(|m| !m.is_loading);
        messages.push(reply);
    }

    /// Fail a send: drop the placeholder. The user message stays so the
    /// question is not lost.
    pub fn fail_send(&self) {
        let mut messages = self.inner.messages.write().unwrap();
        messages.retain(|m| !m.is_loading);
    }

    /// Attach a lazily fetched result payload to a message. Unknown ids
    /// are ignored.
    pub fn attach_data(&self, message_id: &str, payload: ResultPayload) {
        let mut messages = self.inner.messages.write().unwrap();
        if let Some(message) = messages.iter_mut().find(|m| m.id == message_id) {
            message.data = Some(payload);
        }
    }

    /// Mark a streaming message as fully revealed. Unknown ids are
    /// ignored.
    pub fn finish_reveal(&self, message_id: &str) {
        let mut messages = self.inner.messages.write().unwrap();
        if let Some(message) = messages.iter_mut().find(|m| m.id == message_id) {
            message.is_streaming = false;
        }
    }
}

/// Shared map from chat id to live thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadStore {
    inner: Arc<RwLock<HashMap<String, ChatThread>>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat_id: &str) -> Option<ChatThread> {
        let threads = self.inner.read().unwrap();
        threads.get(chat_id).cloned()
    }

    pub fn get_or_create(&self, chat_id: &str) -> ChatThread {
        let mut threads = self.inner.write().unwrap();
        threads
            .entry(chat_id.to_string())
            .or_insert_with(|| ChatThread::new(chat_id))
            .clone()
    }

    pub fn insert(&self, thread: ChatThread) {
        let mut threads = self.inner.write().unwrap();
        threads.insert(thread.id().to_string(), thread);
    }

    pub fn remove(&self, chat_id: &str) -> Option<ChatThread> {
        let mut threads = self.inner.write().unwrap();
        threads.remove(chat_id)
    }
}
