//! HTTP implementation of the backend contract.
//!
//! Talks to the Text2SQL REST API with reqwest. Every request carries the
//! stored bearer token; a 401 from any endpoint maps to
//! [`BackendError::Unauthorized`] so the caller can apply the uniform
//! clear-credentials-and-relogin handling.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::AuthStore;

use super::types::{
    ChatDetail, ChatSessionSummary, ContinueChatResponse, KnowledgeBaseResponse, LoginResponse,
    MessageData, NewChatResponse,
};
use super::{BackendError, BackendResult, ChatBackend};

/// Client for the Text2SQL backend REST API.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
    auth: AuthStore,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpBackend {
    /// Create a client for the given base URL.
    pub fn new(base_url: &str, auth: AuthStore) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.auth.token() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// Map the response status, decoding the body on success.
    async fn expect_json<T: DeserializeOwned>(resp: Response) -> BackendResult<T> {
        let resp = Self::check_status(resp).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_status(resp: Response) -> BackendResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpBackend {
    async fn new_chat(&self, message: &str) -> BackendResult<NewChatResponse> {
        let url = self.endpoint("/chat/new");
        debug!(url = %url, "Starting new chat");
        let resp = self
            .authorize(self.http.post(&url))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    async fn continue_chat(
        &self,
        chat_id: &str,
        message: &str,
    ) -> BackendResult<ContinueChatResponse> {
        let url = self.endpoint(&format!("/chat/continue/{chat_id}"));
        debug!(url = %url, chat_id = %chat_id, "Continuing chat");
        let resp = self
            .authorize(self.http.post(&url))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    async fn get_chat_history(&self) -> BackendResult<Vec<ChatSessionSummary>> {
        let url = self.endpoint("/chat/history");
        let resp = self.authorize(self.http.get(&url)).send().await?;
        Self::expect_json(resp).await
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> BackendResult<ChatDetail> {
        let url = self.endpoint(&format!("/chat/history/{chat_id}"));
        let resp = self.authorize(self.http.get(&url)).send().await?;
        Self::expect_json(resp).await
    }

    async fn delete_chat(&self, chat_id: &str) -> BackendResult<()> {
        let url = self.endpoint(&format!("/chat/history/{chat_id}"));
        let resp = self.authorize(self.http.delete(&url)).send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn get_message_data(&self, message_id: &str) -> BackendResult<MessageData> {
        let url = self.endpoint(&format!("/chat/data/{message_id}"));
        let resp = self.authorize(self.http.get(&url)).send().await?;
        Self::expect_json(resp).await
    }

    async fn upload_knowledge_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<KnowledgeBaseResponse> {
        let url = self.endpoint("/kb/upload");
        debug!(url = %url, file = %file_name, size = bytes.len(), "Uploading knowledge file");
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .authorize(self.http.post(&url))
            .multipart(form)
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    async fn login(&self, username: &str, password: &str) -> BackendResult<LoginResponse> {
        let url = self.endpoint("/auth/login");
        // No bearer header here: this call establishes the credentials.
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        Self::expect_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let dir = tempfile::tempdir().unwrap();
        let auth = AuthStore::open(dir.path().join("auth.json"));
        let backend = HttpBackend::new("http://localhost:8000/", auth).unwrap();
        assert_eq!(
            backend.endpoint("/chat/history"),
            "http://localhost:8000/chat/history"
        );
        assert_eq!(
            backend.endpoint("chat/data/m1"),
            "http://localhost:8000/chat/data/m1"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let auth = AuthStore::open(dir.path().join("auth.json"));
        assert!(HttpBackend::new("not a url", auth).is_err());
    }
}
