//! Thin typed wrapper over the SupportChat HTTP endpoints.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use supportchat_chat::ChatReply;
use supportchat_core::types::{ChatSession, Document};

use crate::error::ClientError;

/// Upper bound on one request; a chat turn waits on the model.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client bound to one server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build `<base>/api/<segments..>` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// GET /api/documents
    pub async fn list_documents(&self) -> Result<Vec<Document>, ClientError> {
        let response = self.http.get(self.url(&["documents"])?).send().await?;
        Self::parse(response).await
    }

    /// POST /api/documents (JSON)
    pub async fn upload_document(&self, title: &str, content: &str) -> Result<Document, ClientError> {
        let response = self
            .http
            .post(self.url(&["documents"])?)
            .json(&json!({ "title": title, "content": content }))
            .send()
            .await?;
        Self::parse(response).await
    }

    /// POST /api/documents (multipart). The file's text becomes the content.
    pub async fn upload_file(
        &self,
        title: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Document, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/plain")?;
        let mut form = Form::new().part("file", part);
        if let Some(title) = title {
            form = form.text("title", title.to_string());
        }

        let response = self
            .http
            .post(self.url(&["documents"])?)
            .multipart(form)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Read a UTF-8 text file and upload it. The file name is the fallback title.
    pub async fn upload_path(
        &self,
        title: Option<&str>,
        path: &Path,
    ) -> Result<Document, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.txt".to_string());
        self.upload_file(title, &file_name, bytes).await
    }

    /// DELETE /api/documents/{id}
    pub async fn delete_document(&self, id: &str) -> Result<(), ClientError> {
        let response = self.http.delete(self.url(&["documents", id])?).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// GET /api/chat/{session_id}
    pub async fn load_chat(&self, session_id: &str) -> Result<ChatSession, ClientError> {
        let response = self.http.get(self.url(&["chat", session_id])?).send().await?;
        Self::parse(response).await
    }

    /// POST /api/chat
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<ChatReply, ClientError> {
        debug!(session_id, "Sending chat message");
        let response = self
            .http
            .post(self.url(&["chat"])?)
            .json(&json!({ "sessionId": session_id, "message": message }))
            .send()
            .await?;
        Self::parse(response).await
    }
}
