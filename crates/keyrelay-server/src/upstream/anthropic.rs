//! Anthropic messages API client.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use keyrelay_config::UpstreamConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use super::{ChatBackend, UpstreamError, status_error};

const SERVICE: &str = "Claude";

/// One relayed user turn.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// Pool key the user is bound to.
    pub api_key: &'a str,
    pub message: &'a str,
    /// Ask the API for an SSE stream and drain it before returning.
    pub stream: bool,
    /// Timestamp stated in the system prompt.
    pub now: OffsetDateTime,
    /// Extra system instructions placed before the timestamp.
    pub persona: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    messages_url: String,
    model: String,
    max_tokens: u32,
    version: String,
}

impl AnthropicClient {
    pub fn new(client: Client, config: &UpstreamConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        Self {
            client,
            messages_url: format!("{base}/v1/messages"),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            version: config.anthropic_version.clone(),
        }
    }
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: [Turn<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub(crate) fn system_prompt(now: OffsetDateTime, persona: Option<&str>) -> String {
    let stamp = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
    match persona {
        Some(persona) => format!("{persona} The current date and time is {stamp} (UTC)."),
        None => format!("The current date and time is {stamp} (UTC)."),
    }
}

#[async_trait]
impl ChatBackend for AnthropicClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, UpstreamError> {
        let body = MessagesBody {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt(request.now, request.persona),
            messages: [Turn {
                role: "user",
                content: request.message,
            }],
            stream: request.stream,
        };

        let resp = self
            .client
            .post(&self.messages_url)
            .header("x-api-key", request.api_key)
            .header("anthropic-version", &self.version)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(SERVICE, resp).await);
        }

        if request.stream {
            return drain_sse(resp.bytes_stream()).await;
        }

        let parsed: MessagesResponse = resp.json().await?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        if text.is_empty() {
            return Err(UpstreamError::Decode("response carried no text content".into()));
        }
        Ok(text)
    }
}

/// Read an SSE body to the end, concatenating every text delta.
pub(crate) async fn drain_sse<S, B>(stream: S) -> Result<String, UpstreamError>
where
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();
    let mut text = String::new();
    let mut events = 0usize;

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(chunk?.as_ref());
        while let Some(end) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=end).collect();
            events += apply_sse_line(&String::from_utf8_lossy(&line), &mut text)?;
        }
    }
    if !buffer.is_empty() {
        events += apply_sse_line(&String::from_utf8_lossy(&buffer), &mut text)?;
    }

    debug!(events, chars = text.chars().count(), "stream drained");
    if text.is_empty() {
        return Err(UpstreamError::Decode("stream carried no text content".into()));
    }
    Ok(text)
}

/// Apply one SSE line to `text`. Returns 1 if the line was a data event.
fn apply_sse_line(line: &str, text: &mut String) -> Result<usize, UpstreamError> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(0);
    };
    let Ok(event) = serde_json::from_str::<Value>(data.trim_start()) else {
        return Ok(0);
    };

    match event["type"].as_str() {
        Some("content_block_delta") if event["delta"]["type"] == "text_delta" => {
            if let Some(delta) = event["delta"]["text"].as_str() {
                text.push_str(delta);
            }
        }
        Some("error") => {
            let message = event["error"]["message"]
                .as_str()
                .unwrap_or("unknown stream error")
                .to_string();
            return Err(UpstreamError::Stream {
                service: SERVICE,
                message,
                body: event.clone(),
            });
        }
        _ => {}
    }
    Ok(1)
}
