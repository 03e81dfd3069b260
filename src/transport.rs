// Message types exchanged with the webhook collaborator. Delivery itself
// (HTTP, retries, auth) lives outside this crate behind `WebhookSink`.

use crate::error::ExportError;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub annotation_id: i64,
    /// Base64 of the UTF-8 XML document
    pub content: String,
}

impl Payload {
    pub fn new(annotation_id: i64, xml: &str) -> Self {
        Self {
            annotation_id,
            content: STANDARD.encode(xml.as_bytes()),
        }
    }

    pub fn decode_content(&self) -> anyhow::Result<String> {
        let bytes = STANDARD.decode(&self.content)?;
        Ok(String::from_utf8(bytes)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// What the hook hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookResponse {
    Exported(Payload),
    Failed(ErrorResponse),
}

impl HookResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, HookResponse::Failed(_))
    }
}

/// Delivery seam for the webhook call.
pub trait WebhookSink {
    fn deliver(&self, url: &str, payload: &Payload) -> anyhow::Result<()>;
}

/// Sink that only records the delivery in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl WebhookSink for LogSink {
    fn deliver(&self, url: &str, payload: &Payload) -> anyhow::Result<()> {
        info!(
            "Would deliver annotation {} ({} base64 chars) to {}",
            payload.annotation_id,
            payload.content.len(),
            url
        );
        Ok(())
    }
}

/// Accepts an integer id or a string holding one.
pub fn parse_annotation_id(raw: &Value) -> Result<i64, ExportError> {
    match raw {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| ExportError::AnnotationId(number.to_string())),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| ExportError::AnnotationId(format!("{:?}", text))),
        other => Err(ExportError::AnnotationId(other.to_string())),
    }
}
