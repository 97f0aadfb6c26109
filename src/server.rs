use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Form, Multipart, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    response::{
        Html, IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
    middleware::Next,
    routing::{delete, get, post},
};
use chrono::{Local, Utc};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::auth::{AuthData, AuthStore};
use crate::backend::{
    BackendError, ChatBackend, HttpBackend, MockBackend,
    types::{ChatSessionSummary, ResponseType, ResultPayload, TableResult},
};
use crate::config::AppConfig;
use crate::reveal::{RevealStep, reveal};
use crate::session::{ChatHistoryStore, ChatMessage, ChatThread, ThreadStore};
use crate::table::TableQuery;
use crate::ui;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let auth = AuthStore::open(&config.auth.state_path);

    let backend: Arc<dyn ChatBackend> = if config.backend.mock {
        info!(name: "backend.mode", mode = "mock", "Serving canned demo data");
        Arc::new(MockBackend::new())
    } else {
        info!(
            name: "backend.mode",
            mode = "http",
            base_url = %config.backend.base_url,
            "Using integrated backend"
        );
        Arc::new(HttpBackend::new(&config.backend.base_url, auth.clone())?)
    };

    let state = AppState {
        backend,
        auth,
        threads: ThreadStore::new(),
        history: ChatHistoryStore::new(),
        config: config.clone(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Assemble the router. Shared with the integration tests.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // HTML pages
        .route("/", get(index_page))
        .route("/chat/{chat_id}", get(chat_page))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
        .route("/knowledge", get(knowledge_page))
        // HTMX fragments and actions
        .route("/ui/send", post(send_message))
        .route("/ui/sidebar", get(sidebar_fragment))
        .route("/ui/chats/{chat_id}", delete(delete_chat))
        .route(
            "/ui/chats/{chat_id}/messages/{message_id}/reveal",
            get(reveal_stream),
        )
        .route(
            "/ui/chats/{chat_id}/messages/{message_id}/data",
            get(message_data_fragment),
        )
        .route(
            "/ui/chats/{chat_id}/messages/{message_id}/table",
            get(table_fragment),
        )
        .route("/ui/knowledge/upload", post(upload_knowledge))
        // Static assets
        .nest_service(
            "/static",
            ServeDir::new(state.config.server.static_dir.clone()),
        )
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(Duration::from_secs(30), next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Welcome page, or login redirect.
async fn index_page(State(state): State<AppState>) -> Response {
    if !state.auth.is_authenticated() {
        return Redirect::to("/login").into_response();
    }
    if let Some(resp) = refresh_history(&state).await {
        return resp;
    }
    let sidebar = render_sidebar(&state, None);
    Html(ui::layout::html_shell(
        "Chat",
        &sidebar,
        &ui::pages::welcome_content(),
    ))
    .into_response()
}

/// GET /chat/:chat_id - One conversation.
async fn chat_page(State(state): State<AppState>, Path(chat_id): Path<String>) -> Response {
    if !state.auth.is_authenticated() {
        return Redirect::to("/login").into_response();
    }
    if let Some(resp) = refresh_history(&state).await {
        return resp;
    }

    let thread = match load_thread(&state, &chat_id).await {
        Ok(thread) => thread,
        Err(BackendError::Unauthorized) => return force_login(&state),
        Err(err) => {
            tracing::error!(chat_id = %chat_id, error = %err, "Failed to load chat");
            return Redirect::to("/").into_response();
        }
    };

    let messages_html = ui::messages::messages_list(&chat_id, &thread.messages());
    let sidebar = render_sidebar(&state, Some(&chat_id));
    let title = state
        .history
        .get(&chat_id)
        .map_or_else(|| "Chat".to_string(), |s| s.title);
    Html(ui::layout::html_shell(
        &title,
        &sidebar,
        &ui::messages::chat_content(Some(&chat_id), &messages_html),
    ))
    .into_response()
}

/// GET /login - Login page.
async fn login_page(State(state): State<AppState>) -> Response {
    if state.auth.is_authenticated() {
        return Redirect::to("/").into_response();
    }
    Html(ui::layout::html_shell_bare(
        "Đăng nhập",
        &ui::pages::login_content(None),
    ))
    .into_response()
}

/// GET /knowledge - Knowledge-base upload page.
async fn knowledge_page(State(state): State<AppState>) -> Response {
    if !state.auth.is_authenticated() {
        return Redirect::to("/login").into_response();
    }
    let sidebar = render_sidebar(&state, None);
    Html(ui::layout::html_shell(
        "Tri thức nghiệp vụ",
        &sidebar,
        &ui::pages::knowledge_content(None),
    ))
    .into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Login form body.
#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

/// POST /login - Exchange credentials, persist them, enter the app.
async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.backend.login(&form.username, &form.password).await {
        Ok(bundle) => {
            info!(name: "auth.login", username = %bundle.user.username, "Login succeeded");
            state.auth.set(AuthData {
                access_token: bundle.access_token,
                user: bundle.user,
            });
            hx_redirect("/")
        }
        Err(BackendError::Unauthorized) => Html(ui::pages::login_content(Some(
            "Sai tên đăng nhập hoặc mật khẩu",
        )))
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Login call failed");
            Html(ui::pages::login_content(Some(
                "Không thể kết nối máy chủ, thử lại sau",
            )))
            .into_response()
        }
    }
}

/// POST /logout - Clear stored credentials.
async fn logout(State(state): State<AppState>) -> Response {
    state.auth.clear();
    info!(name: "auth.logout", "Logged out");
    hx_redirect("/login")
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Send form body.
#[derive(Debug, Deserialize)]
struct SendForm {
    message: String,
    #[serde(default)]
    chat_id: Option<String>,
}

/// POST /ui/send - Send a user message, return the re-rendered list.
///
/// A first message creates the chat and redirects to its page; the
/// streaming reveal then starts from there. Follow-ups swap the message
/// list in place.
async fn send_message(State(state): State<AppState>, Form(form): Form<SendForm>) -> Response {
    if !state.auth.is_authenticated() {
        return hx_redirect("/login");
    }
    let message = form.message.trim();
    if message.is_empty() {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }

    let chat_id = match &form.chat_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            // New conversation: register it before the first exchange.
            let created = match state.backend.new_chat(message).await {
                Ok(created) => created,
                Err(err) => return backend_failure(&state, None, err),
            };
            state.history.add(ChatSessionSummary {
                id: created.chat_id.clone(),
                title: created.title,
                created_at: created.created_at,
                updated_at: created.updated_at,
                message_count: 0,
            });
            created.chat_id
        }
    };

    let thread = state.threads.get_or_create(&chat_id);
    thread.begin_send(message);

    info!(
        name: "chat.send",
        chat_id = %chat_id,
        message_count = thread.message_count(),
        "Sending user message"
    );

    match state.backend.continue_chat(&chat_id, message).await {
        Ok(reply) => {
            let mut assistant =
                ChatMessage::assistant(reply.message_id, reply.response.content, true);
            assistant.sql_query = reply.response.sql_query;
            assistant.response_type = reply.response.response_type;
            assistant.execution_time = reply.response.execution_time;
            assistant.rows_count = reply.response.rows_count;
            assistant.data = reply.response.data;
            thread.resolve_send(assistant);
            state.history.touch(&chat_id, Utc::now());
        }
        Err(err) => {
            thread.fail_send();
            return backend_failure(&state, Some(&thread), err);
        }
    }

    if form.chat_id.as_deref().is_none_or(str::is_empty) {
        // The welcome page has no chat-scoped composer; load the chat page.
        return hx_redirect(&format!("/chat/{chat_id}"));
    }

    let html = ui::messages::messages_list(&chat_id, &thread.messages());
    fragment_with_trigger(html, "chat-list-changed")
}

/// GET /ui/sidebar - Sidebar fragment refresh.
async fn sidebar_fragment(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !state.auth.is_authenticated() {
        return hx_redirect("/login");
    }
    let active = current_chat_id(&headers);
    Html(render_sidebar(&state, active.as_deref())).into_response()
}

/// DELETE /ui/chats/:chat_id - Remove a conversation everywhere.
async fn delete_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.auth.is_authenticated() {
        return hx_redirect("/login");
    }
    if let Err(err) = state.backend.delete_chat(&chat_id).await {
        return backend_failure(&state, None, err);
    }
    state.threads.remove(&chat_id);
    state.history.remove(&chat_id);
    info!(name: "chat.deleted", chat_id = %chat_id, "Chat deleted");

    // Deleting the open chat sends the user back to the welcome page.
    if current_chat_id(&headers).as_deref() == Some(chat_id.as_str()) {
        return hx_redirect("/");
    }
    Html(render_sidebar(&state, None)).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming Reveal
// ─────────────────────────────────────────────────────────────────────────────

/// GET /ui/chats/:chat_id/messages/:message_id/reveal - SSE prefix stream.
///
/// Emits one `reveal` event per character and a terminal `done` event,
/// after which the message is marked settled.
async fn reveal_stream(
    State(state): State<AppState>,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let speed = Duration::from_millis(state.config.chat.reveal_speed_ms);
    let thread = state.threads.get(&chat_id);
    let text = thread
        .as_ref()
        .and_then(|t| {
            t.messages()
                .into_iter()
                .find(|m| m.id == message_id)
                .map(|m| m.content)
        })
        .unwrap_or_default();

    info!(
        name: "chat.reveal.started",
        chat_id = %chat_id,
        message_id = %message_id,
        chars = text.chars().count(),
        "Starting reveal stream"
    );

    let stream = reveal(text, speed).map(move |step| {
        Ok(match step {
            RevealStep::Prefix(prefix) => Event::default()
                .event("reveal")
                .data(ui::escape_multiline(&prefix)),
            RevealStep::Done => {
                if let Some(thread) = &thread {
                    thread.finish_reveal(&message_id);
                }
                Event::default().event("done").data("")
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Data Fragments
// ─────────────────────────────────────────────────────────────────────────────

/// GET /ui/chats/:chat_id/messages/:message_id/data - Lazy payload fetch.
///
/// A malformed or missing payload degrades to an empty fragment; the
/// message text stays readable.
async fn message_data_fragment(
    State(state): State<AppState>,
    Path((chat_id, message_id)): Path<(String, String)>,
) -> Response {
    if !state.auth.is_authenticated() {
        return hx_redirect("/login");
    }
    match resolve_payload(&state, &chat_id, &message_id).await {
        Ok(Some(payload)) => Html(ui::results::render_payload(
            &chat_id,
            &message_id,
            &payload,
            &TableQuery::default(),
        ))
        .into_response(),
        Ok(None) => Html(String::new()).into_response(),
        Err(BackendError::Unauthorized) => force_login(&state),
        Err(err) => {
            tracing::warn!(
                message_id = %message_id,
                error = %err,
                "Result payload unavailable, rendering text only"
            );
            Html(String::new()).into_response()
        }
    }
}

/// GET /ui/chats/:chat_id/messages/:message_id/table - Table round-trip.
async fn table_fragment(
    State(state): State<AppState>,
    Path((chat_id, message_id)): Path<(String, String)>,
    Query(query): Query<TableQuery>,
) -> Response {
    if !state.auth.is_authenticated() {
        return hx_redirect("/login");
    }
    match resolve_payload(&state, &chat_id, &message_id).await {
        Ok(Some(payload)) => Html(ui::results::render_payload(
            &chat_id,
            &message_id,
            &payload,
            &query,
        ))
        .into_response(),
        Ok(None) => Html(String::new()).into_response(),
        Err(BackendError::Unauthorized) => force_login(&state),
        Err(err) => {
            tracing::warn!(message_id = %message_id, error = %err, "Table refresh failed");
            Html(String::new()).into_response()
        }
    }
}

/// Find a message's payload: attached data first, then the lazy
/// `/chat/data/{message_id}` fetch. A fetched payload is cached on the
/// message so table round-trips stay local.
async fn resolve_payload(
    state: &AppState,
    chat_id: &str,
    message_id: &str,
) -> Result<Option<ResultPayload>, BackendError> {
    let thread = state.threads.get(chat_id);
    let message = thread
        .as_ref()
        .and_then(|t| t.messages().into_iter().find(|m| m.id == message_id));

    if let Some(message) = &message {
        if let Some(payload) = &message.data {
            return Ok(Some(payload.clone()));
        }
        if message.response_type == ResponseType::Text {
            return Ok(None);
        }
    }

    let data = state.backend.get_message_data(message_id).await?;
    if data.columns.is_empty() {
        return Ok(None);
    }
    let payload = ResultPayload::Table(TableResult {
        rows: data.rows,
        columns: data.columns,
        title: None,
        sql_query: data.sql_query,
    });
    if let Some(thread) = &thread {
        thread.attach_data(message_id, payload.clone());
    }
    Ok(Some(payload))
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Base
// ─────────────────────────────────────────────────────────────────────────────

/// POST /ui/knowledge/upload - Forward a document to the backend.
async fn upload_knowledge(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    if !state.auth.is_authenticated() {
        return hx_redirect("/login");
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .unwrap_or("document")
                .to_string();
            match field.bytes().await {
                Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to read upload body");
                }
            }
            break;
        }
    }

    let Some((file_name, bytes)) = upload else {
        return Html(ui::pages::upload_result(false, "Chưa chọn tệp để tải lên")).into_response();
    };

    match state.backend.upload_knowledge_file(&file_name, bytes).await {
        Ok(kb) => {
            info!(
                name: "knowledge.uploaded",
                file = %kb.original_filename,
                status = %kb.processing_status,
                "Knowledge file uploaded"
            );
            Html(ui::pages::upload_result(
                true,
                &format!("Đã tải lên {} ({})", kb.original_filename, kb.processing_status),
            ))
            .into_response()
        }
        Err(BackendError::Unauthorized) => force_login(&state),
        Err(err) => {
            tracing::error!(error = %err, "Knowledge upload failed");
            Html(ui::pages::upload_result(false, "Tải lên thất bại, thử lại sau")).into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Refresh the in-memory history list from the backend. Returns a
/// response only when the caller must be redirected to login.
async fn refresh_history(state: &AppState) -> Option<Response> {
    match state.backend.get_chat_history().await {
        Ok(sessions) => {
            state.history.set(sessions);
            None
        }
        Err(BackendError::Unauthorized) => {
            state.auth.clear();
            Some(Redirect::to("/login").into_response())
        }
        Err(err) => {
            // A stale sidebar beats a broken page.
            tracing::warn!(error = %err, "Failed to refresh chat history");
            None
        }
    }
}

fn render_sidebar(state: &AppState, active_chat_id: Option<&str>) -> String {
    let buckets = state.history.bucketed(Local::now());
    ui::sidebar::render(&buckets, active_chat_id, state.auth.user().as_ref())
}

/// Fetch a thread, loading it from chat history on first access.
async fn load_thread(state: &AppState, chat_id: &str) -> Result<ChatThread, BackendError> {
    if let Some(thread) = state.threads.get(chat_id) {
        return Ok(thread);
    }
    let detail = state.backend.get_chat_by_id(chat_id).await?;
    let thread = ChatThread::from_records(detail.id, detail.messages);
    state.threads.insert(thread.clone());
    Ok(thread)
}

/// Uniform backend failure handling: 401 clears credentials and forces
/// the login view; anything else surfaces a notice in the message list.
fn backend_failure(state: &AppState, thread: Option<&ChatThread>, err: BackendError) -> Response {
    if matches!(err, BackendError::Unauthorized) {
        return force_login(state);
    }
    tracing::error!(error = %err, "Backend call failed");
    let mut html = thread.map_or_else(String::new, |t| {
        ui::messages::messages_list(t.id(), &t.messages())
    });
    html.push_str(
        r#"        <div class="rounded-xl bg-danger/10 px-4 py-3 text-sm text-danger">Không thể xử lý yêu cầu, vui lòng thử lại.</div>
"#,
    );
    Html(html).into_response()
}

/// Clear credentials and force the login view, independent of which
/// call triggered the 401.
fn force_login(state: &AppState) -> Response {
    state.auth.clear();
    hx_redirect("/login")
}

/// Client-side redirect for HTMX requests.
fn hx_redirect(to: &str) -> Response {
    let mut resp = StatusCode::OK.into_response();
    if let Ok(value) = to.parse() {
        resp.headers_mut().insert("HX-Redirect", value);
    }
    resp
}

/// Fragment response that also fires a client event (sidebar refresh).
fn fragment_with_trigger(html: String, event: &str) -> Response {
    let mut resp = Html(html).into_response();
    if let Ok(value) = event.parse() {
        resp.headers_mut().insert("HX-Trigger", value);
    }
    resp
}

/// The chat id of the page the request came from, if any.
fn current_chat_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("HX-Current-URL")?.to_str().ok()?;
    let parsed = url::Url::parse(raw).ok()?;
    parsed
        .path()
        .strip_prefix("/chat/")
        .map(ToString::to_string)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_chat_id_parses_hx_current_url() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "HX-Current-URL",
            "http://localhost:3000/chat/abc-123".parse().unwrap(),
        );
        assert_eq!(current_chat_id(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_current_chat_id_ignores_other_pages() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "HX-Current-URL",
            "http://localhost:3000/knowledge".parse().unwrap(),
        );
        assert_eq!(current_chat_id(&headers), None);
        assert_eq!(current_chat_id(&HeaderMap::new()), None);
    }
}
