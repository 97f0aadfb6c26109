//! Integration tests for the chat UI flows.
//!
//! These drive the real router against the canned-data backend:
//! - Login gate and credential persistence
//! - Sending a first and a follow-up message
//! - Table round-trips (sort, filter, pagination)
//! - Chat deletion and logout

use std::sync::Arc;

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};

use vpbank_text2sql_ui::AppState;
use vpbank_text2sql_ui::auth::AuthStore;
use vpbank_text2sql_ui::backend::MockBackend;
use vpbank_text2sql_ui::config::{AppConfig, AuthConfig, BackendConfig, ChatConfig, ServerConfig};
use vpbank_text2sql_ui::server::build_router;
use vpbank_text2sql_ui::session::{ChatHistoryStore, ThreadStore};

// =============================================================================
// Test Utilities
// =============================================================================

fn test_config(state_path: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            static_dir: "static".to_string(),
        },
        backend: BackendConfig {
            base_url: "http://localhost:8000".to_string(),
            mock: true,
        },
        auth: AuthConfig {
            state_path: state_path.to_string(),
        },
        chat: ChatConfig { reveal_speed_ms: 1 },
    }
}

/// Build a test server over the mock backend. Returns the tempdir so the
/// auth state file outlives the test.
fn test_server(logged_in: bool) -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let state_path = dir.path().join("auth.json");
    let auth = AuthStore::open(&state_path);

    let state = AppState {
        backend: Arc::new(MockBackend::new()),
        auth: auth.clone(),
        threads: ThreadStore::new(),
        history: ChatHistoryStore::new(),
        config: Arc::new(test_config(state_path.to_str().expect("utf-8 path"))),
    };

    if logged_in {
        use vpbank_text2sql_ui::auth::AuthData;
        use vpbank_text2sql_ui::backend::types::AuthUser;
        auth.set(AuthData {
            access_token: "test-token".to_string(),
            user: AuthUser {
                id: "u1".to_string(),
                username: "analyst".to_string(),
                email: None,
                full_name: None,
                role: None,
            },
        });
    }

    let server = TestServer::new(build_router(state)).expect("test server");
    (server, dir)
}

fn hx_redirect(response: &axum_test::TestResponse) -> String {
    response
        .headers()
        .get("HX-Redirect")
        .expect("HX-Redirect header")
        .to_str()
        .expect("header is ascii")
        .to_string()
}

/// Pull the first reveal-stream reference out of a page and return
/// (chat_id, message_id).
fn first_reveal_ids(html: &str) -> (String, String) {
    let marker = "sse-connect=\"";
    let start = html.find(marker).expect("reveal url in page") + marker.len();
    let rest = &html[start..];
    let end = rest.find('"').expect("closing quote");
    let url = &rest[..end];
    let parts: Vec<&str> = url.split('/').collect();
    // ["", "ui", "chats", chat_id, "messages", message_id, "reveal"]
    (parts[3].to_string(), parts[5].to_string())
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_unauthenticated_requests_land_on_login() {
    let (server, _dir) = test_server(false);

    let response = server.get("/").await;
    response.assert_status_see_other();
    assert_eq!(response.header("location"), "/login");

    // HTMX actions answer with a client-side redirect instead.
    let response = server
        .post("/ui/send")
        .form(&[("message", "xin chào")])
        .await;
    assert_eq!(hx_redirect(&response), "/login");
}

#[tokio::test]
async fn test_login_persists_credentials_and_enters_app() {
    let (server, _dir) = test_server(false);

    let response = server
        .post("/login")
        .form(&[("username", "analyst"), ("password", "secret")])
        .await;
    response.assert_status_ok();
    assert_eq!(hx_redirect(&response), "/");

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text_contains("Trợ lý dữ liệu ngân hàng");
}

#[tokio::test]
async fn test_rejected_login_shows_notice() {
    let (server, _dir) = test_server(false);

    let response = server
        .post("/login")
        .form(&[("username", ""), ("password", "")])
        .await;
    response.assert_status_ok();
    assert!(response.headers().get("HX-Redirect").is_none());
    response.assert_text_contains("Sai tên đăng nhập hoặc mật khẩu");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (server, _dir) = test_server(true);

    let response = server.post("/logout").await;
    assert_eq!(hx_redirect(&response), "/login");

    let response = server.get("/").await;
    response.assert_status_see_other();
}

// =============================================================================
// Chat Flow
// =============================================================================

#[tokio::test]
async fn test_first_message_creates_chat_and_redirects() {
    let (server, _dir) = test_server(true);

    let response = server
        .post("/ui/send")
        .form(&[("message", "Top 10 khách hàng có số dư tiền gửi lớn nhất")])
        .await;
    response.assert_status_ok();
    let location = hx_redirect(&response);
    assert!(location.starts_with("/chat/"), "got {location}");

    let page = server.get(&location).await;
    page.assert_status_ok();
    // The user message and a streaming assistant reply are both rendered.
    page.assert_text_contains("Top 10 khách hàng có số dư tiền gửi lớn nhất");
    page.assert_text_contains("sse-connect");
    // The new chat shows up in the sidebar under today's bucket.
    page.assert_text_contains("Hôm nay");
}

#[tokio::test]
async fn test_followup_message_swaps_fragment() {
    let (server, _dir) = test_server(true);

    let response = server
        .post("/ui/send")
        .form(&[("message", "Tăng trưởng CASA 6 tháng gần nhất")])
        .await;
    let location = hx_redirect(&response);
    let chat_id = location.trim_start_matches("/chat/").to_string();

    let response = server
        .post("/ui/send")
        .form(&[
            ("message", "Còn dư nợ theo chi nhánh thì sao?"),
            ("chat_id", chat_id.as_str()),
        ])
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("HX-Trigger").to_str().expect("ascii"),
        "chat-list-changed"
    );
    response.assert_text_contains("Còn dư nợ theo chi nhánh thì sao?");
}

#[tokio::test]
async fn test_failed_send_keeps_user_message_and_shows_notice() {
    let (server, _dir) = test_server(true);

    // A chat id the backend does not know: continue_chat fails with 404.
    let response = server
        .post("/ui/send")
        .form(&[("message", "câu hỏi"), ("chat_id", "missing-chat")])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("câu hỏi");
    response.assert_text_contains("Không thể xử lý yêu cầu");
    // No assistant reply was added.
    assert!(!response.text().contains("sse-connect"));
}

#[tokio::test]
async fn test_chat_page_reload_keeps_messages() {
    let (server, _dir) = test_server(true);

    let response = server
        .post("/ui/send")
        .form(&[("message", "Số dư khách hàng")])
        .await;
    let location = hx_redirect(&response);

    for _ in 0..2 {
        let page = server.get(&location).await;
        page.assert_status_ok();
        page.assert_text_contains("Số dư khách hàng");
    }
}

// =============================================================================
// Result Tables
// =============================================================================

#[tokio::test]
async fn test_table_fragment_sorts_filters_and_pages() {
    let (server, _dir) = test_server(true);

    let response = server
        .post("/ui/send")
        .form(&[("message", "Top 10 khách hàng có số dư tiền gửi lớn nhất")])
        .await;
    let location = hx_redirect(&response);
    let page = server.get(&location).await;
    let (chat_id, message_id) = first_reveal_ids(&page.text());

    let base = format!("/ui/chats/{chat_id}/messages/{message_id}/table");

    // Page two of the 25 canned rows.
    let response = server.get(&base).add_query_param("page", 2).await;
    response.assert_status_ok();
    response.assert_text_contains("Hiển thị 11-20 trong số 25");

    // Filtering narrows the rows and lands on page one.
    let response = server.get(&base).add_query_param("filter", "KH001").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("KH001"));
    assert!(text.contains("Hiển thị 1-1 trong số 1"));

    // Sorting descending keeps the full row count.
    let response = server
        .get(&base)
        .add_query_param("sort", "balance_vnd")
        .add_query_param("dir", "desc")
        .await;
    response.assert_status_ok();
    response.assert_text_contains("trong số 25");
    response.assert_text_contains("balance_vnd ▼");
}

#[tokio::test]
async fn test_missing_payload_degrades_to_empty_fragment() {
    let (server, _dir) = test_server(true);

    let response = server
        .post("/ui/send")
        .form(&[("message", "Tăng trưởng CASA")])
        .await;
    let location = hx_redirect(&response);
    let chat_id = location.trim_start_matches("/chat/");

    let response = server
        .get(&format!("/ui/chats/{chat_id}/messages/unknown-id/data"))
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "");
}

// =============================================================================
// Deletion and Knowledge Base
// =============================================================================

#[tokio::test]
async fn test_delete_chat_removes_it_from_sidebar() {
    let (server, _dir) = test_server(true);

    let response = server
        .post("/ui/send")
        .form(&[("message", "Dư nợ theo chi nhánh")])
        .await;
    let location = hx_redirect(&response);
    let chat_id = location.trim_start_matches("/chat/").to_string();

    let response = server.delete(&format!("/ui/chats/{chat_id}")).await;
    response.assert_status_ok();
    assert!(!response.text().contains(&chat_id));

    // The deleted chat's page is gone.
    let response = server.get(&location).await;
    response.assert_status_see_other();
    assert_eq!(response.header("location"), "/");
}

#[tokio::test]
async fn test_knowledge_upload_round_trip() {
    let (server, _dir) = test_server(true);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes("business glossary".as_bytes().to_vec())
            .file_name("glossary.txt")
            .mime_type("text/plain"),
    );
    let response = server.post("/ui/knowledge/upload").multipart(form).await;
    response.assert_status_ok();
    response.assert_text_contains("Đã tải lên glossary.txt");
}
