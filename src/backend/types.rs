//! Wire types for the Text2SQL backend API.
//!
//! These mirror the backend's JSON contracts; the UI is strictly a consumer
//! of them. Timestamps travel as RFC3339 and are parsed into [`DateTime`]
//! at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single rectangular result record: column name -> value.
pub type Row = serde_json::Map<String, Value>;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// How an assistant response should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Text,
    Table,
    Chart,
}

/// Chart variants supported by the result renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

/// Summary of one conversation thread, as listed by `/chat/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Tabular result payload attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    pub rows: Vec<Row>,
    /// Display order of columns.
    pub columns: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sql_query: Option<String>,
}

/// Chart result payload attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartResult {
    pub rows: Vec<Row>,
    pub title: String,
    /// Column used for the x axis / slice labels.
    pub x_key: String,
    /// Column used for the y axis / slice sizes.
    pub y_key: String,
    pub chart_kind: ChartKind,
    #[serde(default)]
    pub sql_query: Option<String>,
}

/// Data attached to an assistant message representing query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultPayload {
    Table(TableResult),
    Chart(ChartResult),
}

impl ResultPayload {
    /// Rows of the underlying result set, whichever shape it has.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Table(t) => &t.rows,
            Self::Chart(c) => &c.rows,
        }
    }
}

/// Response from `POST /chat/new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatResponse {
    pub chat_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assistant reply body inside [`ContinueChatResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    #[serde(default)]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub rows_count: Option<usize>,
    /// Embedded payload. Present only when data is supplied directly
    /// (mock mode); the integrated backend resolves it lazily by
    /// message id instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultPayload>,
}

/// Response from `POST /chat/continue/{chat_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueChatResponse {
    pub message_id: String,
    pub response: AssistantReply,
}

/// One stored message, as returned by `GET /chat/history/{chat_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub sql_query: Option<String>,
    #[serde(default)]
    pub response_type: Option<ResponseType>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub rows_count: Option<usize>,
    pub created_at: DateTime<Utc>,
}

/// Response from `GET /chat/history/{chat_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    pub id: String,
    pub title: String,
    pub messages: Vec<MessageRecord>,
}

/// Response from `GET /chat/data/{message_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub sql_query: Option<String>,
}

/// Response from `POST /kb/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseResponse {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub upload_date: DateTime<Utc>,
    pub processing_status: String,
}

/// Authenticated user profile inside the credential bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Response from `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: AuthUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_payload_tagging() {
        let payload = ResultPayload::Table(TableResult {
            rows: vec![],
            columns: vec!["branch".to_string()],
            title: None,
            sql_query: None,
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "table");
        assert_eq!(json["columns"][0], "branch");
    }

    #[test]
    fn test_assistant_reply_type_field() {
        let json = serde_json::json!({
            "content": "Here are the results",
            "type": "table",
            "sql_query": "SELECT 1",
        });
        let reply: AssistantReply = serde_json::from_value(json).unwrap();
        assert_eq!(reply.response_type, ResponseType::Table);
        assert!(reply.data.is_none());
    }

    #[test]
    fn test_message_role_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
