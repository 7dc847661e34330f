// Copyright 2026 Pagelite Contributors
// SPDX-License-Identifier: Apache-2.0

//! Response stream orchestration.
//!
//! One lazy producer per request: Fetch → Extract → metadata + separator →
//! summary chunks, all flattened into a single ordered stream of text. The
//! stream is pulled by the HTTP layer, so dropping the response (client
//! disconnect) abandons any in-flight fetch or model call with it.

use crate::extract::{self, NavEntry};
use crate::fetch::FetchError;
use crate::rest::AppState;
use futures::Stream;
use serde::Serialize;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use url::Url;

/// Literal token dividing the metadata segment from the content segment.
/// Consumers treat everything after it as opaque markdown.
pub const SEPARATOR: &str = "\n---SEPARATOR---\n";

/// The one JSON object emitted before the separator.
#[derive(Debug, Serialize)]
pub struct PageMetadata {
    pub meta: PageMeta,
    pub navigation: Vec<NavEntry>,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub original_size_bytes: usize,
    pub title: String,
    pub url: String,
}

/// Build the full response stream for one validated URL.
///
/// Fetch failures end the stream after a single JSON error chunk — no
/// metadata, no separator. Summarization failures never reach here; the
/// pipeline resolves them internally. Anything else unexpected lands as a
/// final visible marker rather than a broken connection.
pub fn respond(state: Arc<AppState>, url: String) -> impl Stream<Item = String> + Send {
    async_stream::stream! {
        info!(%url, "fetching");
        match state.fetcher.fetch(&url).await {
            Err(err) => {
                warn!(%url, error = %err, "fetch failed");
                let message = match &err {
                    FetchError::Timeout => err.to_string(),
                    other => format!("Connection failed: {other}"),
                };
                yield serde_json::json!({ "error": message }).to_string();
            }
            Ok(page) => {
                // The fetch succeeded, so the URL is parseable; the base is
                // only needed to resolve relative navigation hrefs.
                let Ok(base) = Url::parse(&url) else {
                    error!(%url, "fetched URL failed to re-parse");
                    yield format!("\n\n*Critical Error: unparseable base URL {url}*");
                    return;
                };

                let extraction = extract::extract_page(&page.body, &base);
                let metadata = PageMetadata {
                    meta: PageMeta {
                        original_size_bytes: page.byte_len,
                        title: extraction.title,
                        url: url.clone(),
                    },
                    navigation: extraction.navigation,
                };

                match serde_json::to_string(&metadata) {
                    Err(err) => {
                        error!(%url, error = %err, "metadata serialization failed");
                        yield format!("\n\n*Critical Error: {err}*");
                    }
                    Ok(json) => {
                        yield format!("{json}{SEPARATOR}");
                        debug!(%url, bytes = page.byte_len, "metadata sent, starting summary stream");

                        let mut summary = state.summarizer.summarize(&extraction.text);
                        while let Some(chunk) = summary.next().await {
                            yield chunk;
                        }
                        debug!(%url, "stream complete");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetcher;
    use crate::summarize::{format_raw_text, Summarizer};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state() -> Arc<AppState> {
        // No API key: short pages bypass the tiers, so nothing dials out.
        Arc::new(AppState {
            fetcher: Fetcher::new(),
            summarizer: Summarizer::new(&crate::config::AiConfig::default()),
        })
    }

    async fn collect(state: Arc<AppState>, url: String) -> Vec<String> {
        respond(state, url).collect().await
    }

    #[tokio::test]
    async fn test_short_page_stream_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>T</title></head><body>\
                 <nav><a href=\"/a\">A</a></nav><p>short</p></body></html>",
            ))
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let chunks = collect(state(), url.clone()).await;
        assert_eq!(chunks.len(), 2);

        let (metadata_json, sep) = chunks[0].split_once("\n---SEPARATOR---\n").unwrap();
        assert_eq!(sep, "");
        let metadata: serde_json::Value = serde_json::from_str(metadata_json).unwrap();
        assert_eq!(metadata["meta"]["title"], "T");
        assert_eq!(metadata["meta"]["url"], url);
        assert_eq!(metadata["navigation"][0]["label"], "A");
        assert_eq!(
            metadata["navigation"][0]["link"],
            format!("{}/a", server.uri())
        );
        assert!(metadata["meta"]["original_size_bytes"].as_u64().unwrap() > 0);

        assert_eq!(chunks[1], format_raw_text("T A short"));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_single_error_chunk() {
        let chunks = collect(
            state(),
            "http://nonexistent-host-zq.invalid/page".to_string(),
        )
        .await;
        assert_eq!(chunks.len(), 1);
        let err: serde_json::Value = serde_json::from_str(&chunks[0]).unwrap();
        let message = err["error"].as_str().unwrap();
        assert!(message.starts_with("Connection failed:"), "{message}");
        assert!(!chunks[0].contains(SEPARATOR));
    }

    #[tokio::test]
    async fn test_origin_error_status_ends_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let chunks = collect(state(), format!("{}/x", server.uri())).await;
        assert_eq!(chunks.len(), 1);
        let err: serde_json::Value = serde_json::from_str(&chunks[0]).unwrap();
        assert!(err["error"].as_str().unwrap().contains("Connection failed:"));
    }
}
