//! In-process mock backend for development and tests.
//!
//! Serves the canned banking demo conversations (top depositors table, CASA
//! growth line chart, credit-balance-by-branch bar chart) without a network.
//! Chat ids are generated client-side here; the integrated backend assigns
//! its own ids instead.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use super::types::{
    AssistantReply, AuthUser, ChartKind, ChartResult, ChatDetail, ChatSessionSummary,
    ContinueChatResponse, KnowledgeBaseResponse, LoginResponse, MessageData, MessageRecord,
    MessageRole, NewChatResponse, ResponseType, ResultPayload, Row, TableResult,
};
use super::{BackendError, BackendResult, ChatBackend};

/// Maximum chat title length before ellipsizing.
const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug)]
struct MockChat {
    summary: ChatSessionSummary,
    messages: Vec<MessageRecord>,
    data: HashMap<String, MessageData>,
}

/// Mock implementation of [`ChatBackend`].
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    chats: Arc<RwLock<HashMap<String, MockChat>>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a chat title from the first user message: first 50 characters,
    /// ellipsized when truncated.
    #[must_use]
    pub fn title_from_message(message: &str) -> String {
        let mut title: String = message.chars().take(TITLE_MAX_CHARS).collect();
        if message.chars().count() > TITLE_MAX_CHARS {
            title.push('…');
        }
        title
    }

    /// Build the canned reply for a user message, routed by keyword.
    fn reply_for(message: &str) -> AssistantReply {
        let lower = message.to_lowercase();
        if lower.contains("casa") || lower.contains("tăng trưởng") {
            casa_growth_reply()
        } else if lower.contains("chi nhánh") || lower.contains("dư nợ") {
            credit_by_branch_reply()
        } else if lower.contains("khách hàng") || lower.contains("số dư") || lower.contains("top")
        {
            top_depositors_reply()
        } else {
            AssistantReply {
                content: format!(
                    "Tôi đã ghi nhận câu hỏi: \"{message}\". Hãy hỏi về số dư khách hàng, \
                     tăng trưởng CASA hoặc dư nợ theo chi nhánh để xem dữ liệu minh họa."
                ),
                response_type: ResponseType::Text,
                sql_query: None,
                execution_time: None,
                rows_count: None,
                data: None,
            }
        }
    }

    fn record_exchange(
        chat: &mut MockChat,
        message: &str,
        reply: &AssistantReply,
    ) -> ContinueChatResponse {
        let now = Utc::now();
        chat.messages.push(MessageRecord {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: message.to_string(),
            sql_query: None,
            response_type: None,
            execution_time: None,
            rows_count: None,
            created_at: now,
        });

        let message_id = Uuid::new_v4().to_string();
        chat.messages.push(MessageRecord {
            id: message_id.clone(),
            role: MessageRole::Assistant,
            content: reply.content.clone(),
            sql_query: reply.sql_query.clone(),
            response_type: Some(reply.response_type),
            execution_time: reply.execution_time,
            rows_count: reply.rows_count,
            created_at: now,
        });

        // Keep the payload addressable by message id as well, so the lazily
        // fetching render path works against the mock too.
        if let Some(payload) = &reply.data {
            let (rows, columns, sql_query) = match payload {
                ResultPayload::Table(t) => (t.rows.clone(), t.columns.clone(), t.sql_query.clone()),
                ResultPayload::Chart(c) => (
                    c.rows.clone(),
                    vec![c.x_key.clone(), c.y_key.clone()],
                    c.sql_query.clone(),
                ),
            };
            chat.data.insert(
                message_id.clone(),
                MessageData {
                    rows,
                    columns,
                    sql_query,
                },
            );
        }

        chat.summary.updated_at = now;
        chat.summary.message_count = chat.messages.len();

        ContinueChatResponse {
            message_id,
            response: reply.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for MockBackend {
    async fn new_chat(&self, message: &str) -> BackendResult<NewChatResponse> {
        let now = Utc::now();
        let chat_id = Uuid::new_v4().to_string();
        let title = Self::title_from_message(message);

        let chat = MockChat {
            summary: ChatSessionSummary {
                id: chat_id.clone(),
                title: title.clone(),
                created_at: now,
                updated_at: now,
                message_count: 0,
            },
            messages: Vec::new(),
            data: HashMap::new(),
        };
        self.chats.write().unwrap().insert(chat_id.clone(), chat);

        Ok(NewChatResponse {
            chat_id,
            title,
            created_at: now,
            updated_at: now,
        })
    }

    async fn continue_chat(
        &self,
        chat_id: &str,
        message: &str,
    ) -> BackendResult<ContinueChatResponse> {
        let reply = Self::reply_for(message);
        let mut chats = self.chats.write().unwrap();
        let chat = chats.get_mut(chat_id).ok_or(BackendError::Status {
            status: 404,
            message: format!("chat {chat_id} not found"),
        })?;
        Ok(Self::record_exchange(chat, message, &reply))
    }

    async fn get_chat_history(&self) -> BackendResult<Vec<ChatSessionSummary>> {
        let chats = self.chats.read().unwrap();
        let mut summaries: Vec<ChatSessionSummary> =
            chats.values().map(|c| c.summary.clone()).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> BackendResult<ChatDetail> {
        let chats = self.chats.read().unwrap();
        let chat = chats.get(chat_id).ok_or(BackendError::Status {
            status: 404,
            message: format!("chat {chat_id} not found"),
        })?;
        Ok(ChatDetail {
            id: chat.summary.id.clone(),
            title: chat.summary.title.clone(),
            messages: chat.messages.clone(),
        })
    }

    async fn delete_chat(&self, chat_id: &str) -> BackendResult<()> {
        let removed = self.chats.write().unwrap().remove(chat_id);
        match removed {
            Some(_) => Ok(()),
            None => Err(BackendError::Status {
                status: 404,
                message: format!("chat {chat_id} not found"),
            }),
        }
    }

    async fn get_message_data(&self, message_id: &str) -> BackendResult<MessageData> {
        let chats = self.chats.read().unwrap();
        chats
            .values()
            .find_map(|c| c.data.get(message_id).cloned())
            .ok_or(BackendError::Status {
                status: 404,
                message: format!("no data for message {message_id}"),
            })
    }

    async fn upload_knowledge_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<KnowledgeBaseResponse> {
        Ok(KnowledgeBaseResponse {
            id: Uuid::new_v4().to_string(),
            filename: format!("{}-{file_name}", Uuid::new_v4()),
            original_filename: file_name.to_string(),
            file_type: file_name.rsplit('.').next().unwrap_or("bin").to_string(),
            file_size: bytes.len() as u64,
            upload_date: Utc::now(),
            processing_status: "completed".to_string(),
        })
    }

    async fn login(&self, username: &str, password: &str) -> BackendResult<LoginResponse> {
        if username.is_empty() || password.is_empty() {
            return Err(BackendError::Unauthorized);
        }
        Ok(LoginResponse {
            access_token: format!("mock-token-{}", Uuid::new_v4()),
            user: AuthUser {
                id: Uuid::new_v4().to_string(),
                username: username.to_string(),
                email: Some(format!("{username}@vpbank.example")),
                full_name: None,
                role: Some("analyst".to_string()),
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canned demo data
// ─────────────────────────────────────────────────────────────────────────────

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn top_depositors_reply() -> AssistantReply {
    let branches = ["Hà Nội", "TP.HCM", "Đà Nẵng", "Cần Thơ", "Hải Phòng"];
    let rows: Vec<Row> = (0..25usize)
        .map(|i| {
            row(json!({
                "stt": i + 1,
                "cif": format!("KH{:03}", i + 1),
                "customer_name": format!("Khách hàng {}", i + 1),
                "balance_vnd": 15_500_000_000_i64 - (i as i64) * 100_000_000,
                "branch": branches[i % branches.len()],
            }))
        })
        .collect();
    let rows_count = rows.len();

    AssistantReply {
        content: "Tôi sẽ truy vấn dữ liệu để tìm các khách hàng có số dư tiền gửi VND cao nhất \
                  trong hệ thống."
            .to_string(),
        response_type: ResponseType::Table,
        sql_query: Some(
            "SELECT cif, customer_name, balance_vnd, branch FROM customer_deposits \
             ORDER BY balance_vnd DESC"
                .to_string(),
        ),
        execution_time: Some(0.42),
        rows_count: Some(rows_count),
        data: Some(ResultPayload::Table(TableResult {
            rows,
            columns: vec![
                "stt".to_string(),
                "cif".to_string(),
                "customer_name".to_string(),
                "balance_vnd".to_string(),
                "branch".to_string(),
            ],
            title: Some("Danh sách khách hàng có số dư cao nhất".to_string()),
            sql_query: Some(
                "SELECT cif, customer_name, balance_vnd, branch FROM customer_deposits \
                 ORDER BY balance_vnd DESC"
                    .to_string(),
            ),
        })),
    }
}

fn casa_growth_reply() -> AssistantReply {
    let rows: Vec<Row> = [
        ("T7", 12.5),
        ("T8", 15.2),
        ("T9", 18.7),
        ("T10", 16.3),
        ("T11", 19.8),
        ("T12", 22.1),
    ]
    .into_iter()
    .map(|(month, growth)| row(json!({ "month": month, "growth": growth })))
    .collect();
    let rows_count = rows.len();

    AssistantReply {
        content: "Dưới đây là báo cáo tăng trưởng CASA (Current Account Saving Account) trong 6 \
                  tháng qua:"
            .to_string(),
        response_type: ResponseType::Chart,
        sql_query: Some(
            "SELECT month, growth_rate AS growth FROM casa_growth ORDER BY date".to_string(),
        ),
        execution_time: Some(0.31),
        rows_count: Some(rows_count),
        data: Some(ResultPayload::Chart(ChartResult {
            rows,
            title: "Tăng trưởng CASA theo tháng (%)".to_string(),
            x_key: "month".to_string(),
            y_key: "growth".to_string(),
            chart_kind: ChartKind::Line,
            sql_query: Some(
                "SELECT month, growth_rate AS growth FROM casa_growth ORDER BY date".to_string(),
            ),
        })),
    }
}

fn credit_by_branch_reply() -> AssistantReply {
    let rows: Vec<Row> = [
        ("TP.HCM", 1120.8),
        ("Hà Nội", 850.5),
        ("Đà Nẵng", 420.3),
        ("Cần Thơ", 380.2),
    ]
    .into_iter()
    .map(|(branch, amount)| row(json!({ "branch": branch, "amount": amount })))
    .collect();
    let rows_count = rows.len();

    AssistantReply {
        content: "Đây là biểu đồ trực quan hóa dư nợ tín dụng theo chi nhánh:".to_string(),
        response_type: ResponseType::Chart,
        sql_query: Some(
            "SELECT branch, SUM(credit_balance/1000000000) AS amount FROM credit_portfolio \
             GROUP BY branch ORDER BY amount DESC"
                .to_string(),
        ),
        execution_time: Some(0.27),
        rows_count: Some(rows_count),
        data: Some(ResultPayload::Chart(ChartResult {
            rows,
            title: "Dư nợ tín dụng theo chi nhánh (tỷ VND)".to_string(),
            x_key: "branch".to_string(),
            y_key: "amount".to_string(),
            chart_kind: ChartKind::Bar,
            sql_query: Some(
                "SELECT branch, SUM(credit_balance/1000000000) AS amount FROM credit_portfolio \
                 GROUP BY branch ORDER BY amount DESC"
                    .to_string(),
            ),
        })),
    }
}
