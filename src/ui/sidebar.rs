//! Chat history sidebar with relative-time buckets.

use crate::backend::types::AuthUser;
use crate::session::Bucket;

use super::escape;

/// Render the sidebar: new-chat button, bucketed history, footer links.
pub fn render(buckets: &[Bucket], active_chat_id: Option<&str>, user: Option<&AuthUser>) -> String {
    let mut sections = String::new();
    for bucket in buckets {
        let mut items = String::new();
        for session in &bucket.sessions {
            let active = active_chat_id == Some(session.id.as_str());
            let item_class = if active {
                "sidebar-item group flex items-center justify-between rounded-xl px-3 py-2 bg-surfaceVariant"
            } else {
                "sidebar-item group flex items-center justify-between rounded-xl px-3 py-2 hover:bg-surfaceVariant transition-colors"
            };
            items.push_str(&format!(
                r##"            <div class="{item_class}">
                <a href="/chat/{id}" class="flex-1 truncate text-sm" hx-boost="true">{title}</a>
                <button type="button"
                        class="hidden group-hover:block text-textMuted hover:text-danger"
                        hx-delete="/ui/chats/{id}"
                        hx-target="#sidebar"
                        hx-swap="outerHTML"
                        hx-confirm="Xóa cuộc trò chuyện này?"
                        aria-label="Xóa">&times;</button>
            </div>
"##,
                id = escape(&session.id),
                title = escape(&session.title),
            ));
        }
        sections.push_str(&format!(
            r#"        <section class="mb-4">
            <h3 class="px-3 pb-1 text-xs font-semibold uppercase text-textMuted">{label}</h3>
{items}        </section>
"#,
            label = bucket.label.display(),
        ));
    }

    let user_line = user.map_or_else(String::new, |u| {
        format!(
            r#"            <p class="px-3 text-xs text-textMuted truncate">{}</p>
"#,
            escape(&u.username)
        )
    });

    format!(
        r#"<aside id="sidebar" class="flex w-72 shrink-0 flex-col bg-surfaceContainer overflow-hidden"
       hx-get="/ui/sidebar" hx-trigger="chat-list-changed from:body" hx-swap="outerHTML">
    <div class="p-3 shrink-0">
        <a href="/" hx-boost="true"
           class="flex w-full items-center justify-center gap-2 rounded-2xl bg-primary px-4 py-2.5 text-sm font-medium text-white hover:bg-primaryMuted transition-all">
            + Cuộc trò chuyện mới
        </a>
    </div>
    <nav class="flex-1 overflow-y-auto px-2">
{sections}    </nav>
    <footer class="shrink-0 p-3 space-y-1">
{user_line}        <a href="/knowledge" hx-boost="true"
           class="block rounded-xl px-3 py-2 text-sm text-textSecondary hover:bg-surfaceVariant transition-colors">Tri thức nghiệp vụ</a>
        <button type="button"
                class="block w-full rounded-xl px-3 py-2 text-left text-sm text-textSecondary hover:bg-surfaceVariant transition-colors"
                hx-post="/logout">Đăng xuất</button>
    </footer>
</aside>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::ChatSessionSummary;
    use crate::session::BucketLabel;
    use chrono::Utc;

    fn bucket_with(id: &str, title: &str) -> Bucket {
        Bucket {
            label: BucketLabel::Today,
            sessions: vec![ChatSessionSummary {
                id: id.to_string(),
                title: title.to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                message_count: 2,
            }],
        }
    }

    #[test]
    fn test_render_lists_sessions_under_labels() {
        let html = render(&[bucket_with("c1", "Dư nợ theo chi nhánh")], None, None);
        assert!(html.contains("Hôm nay"));
        assert!(html.contains(r#"href="/chat/c1""#));
        assert!(html.contains("Dư nợ theo chi nhánh"));
        assert!(html.contains(r#"hx-delete="/ui/chats/c1""#));
        assert!(html.contains(r##"hx-target="#sidebar""##));
    }

    #[test]
    fn test_render_escapes_titles() {
        let html = render(&[bucket_with("c1", "<img onerror>")], None, None);
        assert!(!html.contains("<img onerror>"));
        assert!(html.contains("&lt;img onerror&gt;"));
    }

    #[test]
    fn test_render_marks_active_chat() {
        let html = render(&[bucket_with("c1", "t")], Some("c1"), None);
        assert!(html.contains("bg-surfaceVariant\">"));
    }
}
