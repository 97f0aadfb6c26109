//! Message bubbles and the chat composer.

use crate::backend::types::{MessageRole, ResponseType};
use crate::session::ChatMessage;
use crate::table::TableQuery;

use super::{escape, escape_multiline, results};

/// Chat page content: message list plus composer.
pub fn chat_content(chat_id: Option<&str>, messages_html: &str) -> String {
    let chat_field = chat_id.map_or_else(String::new, |id| {
        format!(
            r#"                <input type="hidden" name="chat_id" value="{}">
"#,
            escape(id)
        )
    });
    format!(
        r##"
    <header class="flex items-center gap-3 px-6 py-4 bg-surfaceContainer shrink-0">
        <h2 class="font-semibold text-lg">VPBank Text2SQL Assistant</h2>
    </header>

    <div id="messages" class="flex-1 overflow-y-auto px-6 py-4 space-y-4">
{messages_html}
    </div>

    <div class="p-5 bg-surfaceContainer shrink-0">
        <form class="flex gap-3"
              hx-post="/ui/send"
              hx-target="#messages"
              hx-swap="innerHTML"
              hx-on--after-request="this.reset()">
{chat_field}            <textarea name="message"
                      placeholder="Hỏi về dữ liệu ngân hàng..."
                      class="flex-1 min-h-[48px] max-h-[200px] resize-none rounded-2xl bg-surface px-5 py-3.5 text-textPrimary placeholder:text-textMuted focus:outline-none focus:ring-2 focus:ring-primary"
                      rows="1"
                      required></textarea>
            <button type="submit"
                    class="h-12 w-12 shrink-0 rounded-2xl bg-primary text-white hover:bg-primaryMuted active:scale-95 transition-all">➤</button>
        </form>
        <p class="mt-3 text-center text-xs text-textMuted">Enter để gửi, Shift+Enter để xuống dòng</p>
    </div>
    "##
    )
}

/// Render the whole message list for a chat.
pub fn messages_list(chat_id: &str, messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&render_message(chat_id, message));
    }
    out
}

/// Render one message bubble.
pub fn render_message(chat_id: &str, message: &ChatMessage) -> String {
    match message.role {
        MessageRole::User => user_bubble(message),
        MessageRole::Assistant if message.is_loading => loading_bubble(),
        MessageRole::Assistant => assistant_bubble(chat_id, message),
    }
}

fn user_bubble(message: &ChatMessage) -> String {
    format!(
        r#"        <div class="flex justify-end">
            <div class="max-w-[75%] rounded-2xl rounded-br-sm bg-primary px-4 py-3 text-white">
                <p class="text-sm">{content}</p>
            </div>
        </div>
"#,
        content = escape_multiline(&message.content),
    )
}

fn loading_bubble() -> String {
    r#"        <div class="flex justify-start" id="loading-indicator">
            <div class="rounded-2xl rounded-bl-sm bg-surface px-4 py-3">
                <span class="typing-dots" aria-label="Đang xử lý"><i></i><i></i><i></i></span>
            </div>
        </div>
"#
    .to_string()
}

fn assistant_bubble(chat_id: &str, message: &ChatMessage) -> String {
    let body = if message.is_streaming {
        // The reveal stream replaces this span one prefix at a time and
        // closes itself on the final event.
        format!(
            r#"                <p class="text-sm"
                   hx-ext="sse"
                   sse-connect="/ui/chats/{chat_id}/messages/{id}/reveal"
                   sse-swap="reveal"
                   sse-close="done"></p>
"#,
            chat_id = escape(chat_id),
            id = escape(&message.id),
        )
    } else {
        format!(
            r#"                <p class="text-sm">{}</p>
"#,
            escape_multiline(&message.content)
        )
    };

    let mut extras = String::new();
    if let Some(sql) = &message.sql_query {
        extras.push_str(&sql_block(sql));
    }
    if let Some(meta) = metadata_line(message) {
        extras.push_str(&meta);
    }
    extras.push_str(&data_section(chat_id, message));

    format!(
        r#"        <div class="flex justify-start">
            <div class="max-w-[90%] rounded-2xl rounded-bl-sm bg-surface px-4 py-3">
{body}{extras}            </div>
        </div>
"#,
    )
}

/// Collapsible SQL block shown under assistant answers.
fn sql_block(sql: &str) -> String {
    format!(
        r#"                <details class="mt-2">
                    <summary class="cursor-pointer text-xs text-textMuted hover:text-textPrimary">Xem câu lệnh SQL</summary>
                    <pre class="mt-1 overflow-x-auto rounded-xl bg-surfaceVariant p-3 text-xs"><code>{}</code></pre>
                </details>
"#,
        escape(sql),
    )
}

fn metadata_line(message: &ChatMessage) -> Option<String> {
    if message.execution_time.is_none() && message.rows_count.is_none() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(secs) = message.execution_time {
        parts.push(format!("{secs:.2}s"));
    }
    if let Some(rows) = message.rows_count {
        parts.push(format!("{rows} dòng"));
    }
    Some(format!(
        r#"                <p class="mt-1 text-xs text-textMuted">{}</p>
"#,
        parts.join(" · "),
    ))
}

/// Inline payload when present, otherwise a lazy fetch slot for
/// table/chart messages whose data lives behind `/chat/data/{id}`.
fn data_section(chat_id: &str, message: &ChatMessage) -> String {
    if let Some(payload) = &message.data {
        return format!(
            r#"                <div class="mt-3" id="data-{id}">
{inner}                </div>
"#,
            id = escape(&message.id),
            inner = results::render_payload(chat_id, &message.id, payload, &TableQuery::default()),
        );
    }
    match message.response_type {
        ResponseType::Table | ResponseType::Chart => format!(
            r#"                <div class="mt-3" id="data-{id}"
                     hx-get="/ui/chats/{chat_id}/messages/{id}/data"
                     hx-trigger="load"
                     hx-swap="innerHTML"></div>
"#,
            chat_id = escape(chat_id),
            id = escape(&message.id),
        ),
        ResponseType::Text => String::new(),
    }
}
