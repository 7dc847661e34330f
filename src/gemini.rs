// Copyright 2026 Pagelite Contributors
// SPDX-License-Identifier: Apache-2.0

//! Streaming client for the Gemini generative language API.
//!
//! One call per tier: POST `models/{model}:streamGenerateContent?alt=sse`
//! and decode the SSE `data:` lines into plain text fragments as they
//! arrive. The call itself returns `Result` — a failure to establish the
//! stream is distinct from a failure partway through it, and the
//! summarization pipeline treats the two differently.

use crate::config::AiConfig;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default API endpoint. Overridable for tests.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,
    #[error("request to Gemini failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("malformed stream payload: {0}")]
    Malformed(String),
}

/// Text fragments as the model produces them.
pub type TextStream = BoxStream<'static, Result<String, GeminiError>>;

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct StreamPayload {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl StreamPayload {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| &content.parts)
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: GEMINI_API_BASE.to_string(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Open a streaming generation call against one model.
    ///
    /// `Err` here means the stream never started (missing key, connect
    /// failure, non-2xx status). Errors after that surface as `Err` items
    /// inside the returned stream.
    pub async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<TextStream, GeminiError> {
        let api_key = self.api_key.clone().ok_or(GeminiError::MissingApiKey)?;
        let url = format!(
            "{}/v1beta/models/{model}:streamGenerateContent?alt=sse",
            self.base_url
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: crate::extract::truncate_chars(message.trim(), 500),
            });
        }

        let mut bytes = resp.bytes_stream().boxed();
        let stream = async_stream::stream! {
            let mut buf = String::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        buf.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(pos) = buf.find('\n') {
                            let line = buf[..pos].trim_end_matches('\r').to_string();
                            buf.drain(..=pos);
                            for item in decode_sse_line(&line) {
                                yield item;
                            }
                        }
                    }
                    Err(err) => {
                        yield Err(GeminiError::Http(err));
                        break;
                    }
                }
            }
            // Flush a final unterminated line, if the server sent one.
            let tail = buf.trim_end_matches('\r').to_string();
            for item in decode_sse_line(&tail) {
                yield item;
            }
        };
        Ok(stream.boxed())
    }
}

/// Decode one SSE line. Returns at most one item: the concatenated text of
/// a `data:` payload (empty payloads and `[DONE]` markers produce nothing).
fn decode_sse_line(line: &str) -> Option<Result<String, GeminiError>> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<StreamPayload>(data) {
        Ok(payload) => {
            let text = payload.text();
            if text.is_empty() {
                None
            } else {
                Some(Ok(text))
            }
        }
        Err(err) => Some(Err(GeminiError::Malformed(err.to_string()))),
    }
}
