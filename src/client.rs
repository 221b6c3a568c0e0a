use crate::attachment::Attachment;
use crate::config::Config;
use crate::conversation::{Turn, wire_history};
use crate::error::DispatchError;
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// Reply used when the backend answers with an empty body
pub const EMPTY_REPLY_TEXT: &str = "No response received";

/// Everything the backend needs for one turn
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Trimmed user text, possibly empty when a document is attached
    pub text: String,
    /// Conversation before this request's user turn
    pub history: Vec<Turn>,
    pub attachment: Option<Attachment>,
}

/// File information returned by `/upload`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    file_info: Option<UploadedFile>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the chat backend
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    client: reqwest::Client,
}

impl ChatClient {
    /// No request timeout is set; the transport's own behavior applies
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.backend_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// JSON body, or a multipart form when a document rides along
    fn build_request(
        &self,
        path: &str,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, DispatchError> {
        let builder = self.client.post(self.endpoint(path));

        match &request.attachment {
            Some(attachment) => {
                let history = serde_json::to_string(&wire_history(&request.history))
                    .map_err(|err| DispatchError::Decode(err.to_string()))?;
                let form = Form::new()
                    .text("chat", request.text.clone())
                    .text("history", history)
                    .part("file", file_part(attachment)?);
                Ok(builder.multipart(form))
            }
            None => {
                let payload = serde_json::json!({
                    "chat": request.text,
                    "history": wire_history(&request.history),
                });
                Ok(builder.json(&payload))
            }
        }
    }

    /// Buffered `/chat` call returning the full reply
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, DispatchError> {
        let response = self.build_request("chat", request)?.send().await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        Ok(extract_reply_text(&body))
    }

    /// Open `/stream`; the caller consumes the body incrementally
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, DispatchError> {
        let response = self.build_request("stream", request)?.send().await?;
        ensure_success(response).await
    }

    /// Send a document to `/upload` and return what the backend extracted
    pub async fn upload(&self, attachment: &Attachment) -> Result<UploadedFile, DispatchError> {
        let form = Form::new().part("file", file_part(attachment)?);
        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|err| DispatchError::Decode(err.to_string()))?;

        match parsed {
            UploadResponse {
                success: true,
                file_info: Some(info),
                ..
            } if status.is_success() => Ok(info),
            UploadResponse { error, .. } => Err(DispatchError::Status {
                status: status.as_u16(),
                body: error.unwrap_or(body),
            }),
        }
    }
}

fn file_part(attachment: &Attachment) -> Result<Part, DispatchError> {
    Part::bytes(attachment.bytes.clone())
        .file_name(attachment.meta.filename.clone())
        .mime_str(attachment.meta.kind.mime_type())
        .map_err(|err| DispatchError::Attachment(err.to_string()))
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DispatchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DispatchError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Pull the `text` field out of a `/chat` reply, falling back to the raw payload
pub fn extract_reply_text(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(text) = value.get("text").and_then(|text| text.as_str()) {
            return text.to_string();
        }
    }

    let raw = body.trim();
    if raw.is_empty() {
        EMPTY_REPLY_TEXT.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_prefers_text_field() {
        assert_eq!(extract_reply_text(r#"{"text":"hello"}"#), "hello");
    }

    #[test]
    fn reply_text_falls_back_to_raw_payload() {
        assert_eq!(extract_reply_text("plain words"), "plain words");
        assert_eq!(
            extract_reply_text(r#"{"answer":"elsewhere"}"#),
            r#"{"answer":"elsewhere"}"#
        );
        assert_eq!(extract_reply_text("  "), EMPTY_REPLY_TEXT);
    }

    #[test]
    fn endpoints_ignore_trailing_slashes() {
        let client = ChatClient::new("http://localhost:9000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.endpoint("/stream"), "http://localhost:9000/stream");
    }

    #[test]
    fn upload_response_parses_file_info() {
        let raw = r#"{"success":true,"file_info":{"filename":"a.docx","type":"docx","size":12,"content":"Hi\n"},"message":"ok"}"#;
        let parsed: UploadResponse = serde_json::from_str(raw).unwrap();
        let info = parsed.file_info.unwrap();
        assert!(parsed.success);
        assert_eq!(info.filename, "a.docx");
        assert_eq!(info.kind.as_deref(), Some("docx"));
        assert_eq!(info.content, "Hi\n");
    }
}
