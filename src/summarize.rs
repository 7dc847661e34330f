//! Tiered streaming summarization pipeline.
//!
//! The heart of the service: drive a primary/fallback model pair over the
//! extracted text, forward chunks as they arrive, and hide failures once any
//! real content has reached the client. A half-finished summary truncated
//! silently reads far better than a completed summary with "Error: 429"
//! stapled to the bottom.

use crate::config::AiConfig;
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Inputs shorter than this skip the AI tiers entirely and go out as raw
/// text. Not an error path — tiny pages are already "summarized".
pub const MIN_SUMMARY_INPUT: usize = 500;

/// Raw-text fallback keeps at most this many characters.
pub const RAW_TEXT_LIMIT: usize = 5000;

/// Emitted when the primary tier fails before any content was sent.
pub const SWITCH_NOTICE: &str = "\n\n*(Note: Switched to backup model due to high traffic)*\n\n";

/// Emitted when both tiers fail before any content was sent.
pub const UNAVAILABLE_NOTICE: &str = "\n\n*AI Summarization unavailable. The server is busy.*";

const SYSTEM_PROMPT: &str = "You are a bandwidth-saving assistant. Summarize the following web page content into concise markdown.

Requirements:
- Capture all dates, deadlines, and critical notifications.
- Do not hallucinate links.
- Format with clear headers (##, ###).
- Keep the summary under 2000 words.
- Output strictly in Markdown format.
- Preserve important numerical data and statistics.
- If content is already concise, format it clearly rather than shortening.

Content to summarize:";

/// Text chunks from one model tier. Items can individually fail.
pub type ChunkStream = BoxStream<'static, anyhow::Result<String>>;

/// One summarization tier: submit prompt text, receive a stream of text
/// fragments. An `Err` from the call itself means the stream never started.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    fn name(&self) -> &str;
    async fn stream_summary(&self, prompt: &str) -> anyhow::Result<ChunkStream>;
}

/// A named Gemini model behind the [`SummaryModel`] seam.
pub struct GeminiModel {
    client: GeminiClient,
    model: String,
}

impl GeminiModel {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SummaryModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream_summary(&self, prompt: &str) -> anyhow::Result<ChunkStream> {
        let stream = self.client.stream_generate(&self.model, prompt).await?;
        Ok(stream
            .map(|item| item.map_err(anyhow::Error::from))
            .boxed())
    }
}

/// The two-tier pipeline. Per-request state lives inside each returned
/// stream; the summarizer itself is shared and immutable.
pub struct Summarizer {
    primary: Arc<dyn SummaryModel>,
    fallback: Arc<dyn SummaryModel>,
}

impl Summarizer {
    pub fn new(config: &AiConfig) -> Self {
        let client = GeminiClient::new(config);
        Self {
            primary: Arc::new(GeminiModel::new(client.clone(), config.primary_model.clone())),
            fallback: Arc::new(GeminiModel::new(client, config.fallback_model.clone())),
        }
    }

    /// Build a pipeline from explicit tiers (tests).
    pub fn from_models(primary: Arc<dyn SummaryModel>, fallback: Arc<dyn SummaryModel>) -> Self {
        Self { primary, fallback }
    }

    /// Summarize extracted text as a stream of output chunks.
    ///
    /// The stream is infallible from the caller's view — every failure mode
    /// is resolved internally into fallback output, a notice, or silence:
    ///
    /// 1. Short input: one chunk of raw-text formatting, no model call.
    /// 2. Primary tier streams; any error (before the first chunk or
    ///    mid-stream) switches to the fallback tier.
    /// 3. Entering the fallback before any content was sent emits a switch
    ///    notice. The notice does not count as content.
    /// 4. Per-chunk errors during fallback streaming are skipped.
    /// 5. A fallback that never starts yields the unavailable notice — but
    ///    only if the client has received nothing. Once any real content is
    ///    out, every later failure is silent.
    pub fn summarize(&self, text: &str) -> BoxStream<'static, String> {
        if text.chars().count() < MIN_SUMMARY_INPUT {
            let raw = format_raw_text(text);
            return futures::stream::once(async move { raw }).boxed();
        }

        let primary = Arc::clone(&self.primary);
        let fallback = Arc::clone(&self.fallback);
        let prompt = format!("{SYSTEM_PROMPT}\n\n{text}");

        let out = async_stream::stream! {
            let mut has_sent_content = false;

            let primary_failure = match primary.stream_summary(&prompt).await {
                Ok(mut chunks) => {
                    let mut failure = None;
                    while let Some(item) = chunks.next().await {
                        match item {
                            Ok(chunk) => {
                                yield chunk;
                                has_sent_content = true;
                            }
                            Err(err) => {
                                failure = Some(err);
                                break;
                            }
                        }
                    }
                    failure
                }
                Err(err) => Some(err),
            };

            let Some(primary_failure) = primary_failure else {
                return;
            };
            warn!(
                tier = primary.name(),
                error = %primary_failure,
                "primary summarization tier failed, switching to fallback"
            );

            if !has_sent_content {
                yield SWITCH_NOTICE.to_string();
            }

            match fallback.stream_summary(&prompt).await {
                Ok(mut chunks) => {
                    while let Some(item) = chunks.next().await {
                        match item {
                            Ok(chunk) => {
                                yield chunk;
                                has_sent_content = true;
                            }
                            Err(err) => {
                                // One bad chunk does not sink the stream.
                                debug!(tier = fallback.name(), error = %err, "skipping failed chunk");
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(tier = fallback.name(), error = %err, "fallback summarization tier failed");
                    if !has_sent_content {
                        yield UNAVAILABLE_NOTICE.to_string();
                    }
                }
            }
        };
        out.boxed()
    }
}

/// Fixed markdown rendering of unsummarized text: used for short inputs and
/// whenever the AI tiers are out of the picture.
pub fn format_raw_text(text: &str) -> String {
    let snippet = crate::extract::truncate_chars(text, RAW_TEXT_LIMIT);
    format!("## Page Content (Raw)\n\n{}", snippet.replace('\n', "\n\n"))
}
