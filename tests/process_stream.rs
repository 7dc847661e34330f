//! End-to-end tests for the `/process` streaming contract, driven over real
//! sockets: a wiremock origin on one side, reqwest as the consuming client
//! on the other.

use async_trait::async_trait;
use futures::StreamExt;
use pagelite::config::AiConfig;
use pagelite::fetch::Fetcher;
use pagelite::rest::{router, AppState};
use pagelite::stream::SEPARATOR;
use pagelite::summarize::{ChunkStream, SummaryModel, Summarizer, SWITCH_NOTICE};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the app on an ephemeral port and return its base URL.
async fn spawn_app(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

/// App with no AI credential: short pages bypass the tiers entirely.
fn offline_state() -> Arc<AppState> {
    Arc::new(AppState::new(&AiConfig::default()))
}

struct ScriptedTier {
    name: &'static str,
    chunks: Option<Vec<&'static str>>,
}

#[async_trait]
impl SummaryModel for ScriptedTier {
    fn name(&self) -> &str {
        self.name
    }

    async fn stream_summary(&self, _prompt: &str) -> anyhow::Result<ChunkStream> {
        match &self.chunks {
            None => Err(anyhow::anyhow!("tier offline")),
            Some(chunks) => {
                let items: Vec<anyhow::Result<String>> =
                    chunks.iter().map(|c| Ok(c.to_string())).collect();
                Ok(futures::stream::iter(items).boxed())
            }
        }
    }
}

fn scripted_state(
    primary: Option<Vec<&'static str>>,
    fallback: Option<Vec<&'static str>>,
) -> Arc<AppState> {
    Arc::new(AppState {
        fetcher: Fetcher::new(),
        summarizer: Summarizer::from_models(
            Arc::new(ScriptedTier {
                name: "primary",
                chunks: primary,
            }),
            Arc::new(ScriptedTier {
                name: "fallback",
                chunks: fallback,
            }),
        ),
    })
}

#[tokio::test]
async fn health_endpoint() {
    let app = spawn_app(offline_state()).await;
    let body: serde_json::Value = reqwest::get(format!("{app}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "status": "healthy" }));
}

#[tokio::test]
async fn invalid_url_is_rejected_before_streaming() {
    let app = spawn_app(offline_state()).await;
    for query in ["", "?url=", "?url=not%20a%20url"] {
        let resp = reqwest::get(format!("{app}/process{query}")).await.unwrap();
        assert_eq!(resp.status(), 400, "query {query:?}");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["detail"], "Invalid URL provided");
    }
}

#[tokio::test]
async fn short_page_streams_metadata_then_raw_text() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>T</title></head><body>\
             <nav><a href=\"/a\">A</a></nav><p>short</p></body></html>",
        ))
        .mount(&origin)
        .await;

    let app = spawn_app(offline_state()).await;
    let url = format!("{}/page", origin.uri());
    let resp = reqwest::get(format!("{app}/process?url={url}")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = resp.text().await.unwrap();
    let (metadata_json, content) = body.split_once(SEPARATOR).expect("separator present");
    let metadata: serde_json::Value = serde_json::from_str(metadata_json).unwrap();
    assert_eq!(metadata["meta"]["title"], "T");
    assert_eq!(metadata["meta"]["url"], url);
    assert_eq!(metadata["navigation"][0]["label"], "A");
    assert_eq!(
        metadata["navigation"][0]["link"],
        format!("{}/a", origin.uri())
    );
    assert!(content.starts_with("## Page Content (Raw)\n\n"));
    assert!(content.contains("short"));
}

#[tokio::test]
async fn long_page_streams_summary_chunks_in_order() {
    let text = "lorem ipsum ".repeat(100);
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<html><head><title>Long</title></head><body><p>{text}</p></body></html>"
        )))
        .mount(&origin)
        .await;

    let app = spawn_app(scripted_state(Some(vec!["## Summary\n", "- point"]), None)).await;
    let resp = reqwest::get(format!("{app}/process?url={}/doc", origin.uri()))
        .await
        .unwrap();
    let body = resp.text().await.unwrap();
    let (_, content) = body.split_once(SEPARATOR).unwrap();
    assert_eq!(content, "## Summary\n- point");
}

#[tokio::test]
async fn dead_primary_switches_to_fallback_with_notice() {
    let text = "lorem ipsum ".repeat(100);
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body><p>{text}</p></body></html>")),
        )
        .mount(&origin)
        .await;

    let app = spawn_app(scripted_state(None, Some(vec!["backup summary"]))).await;
    let resp = reqwest::get(format!("{app}/process?url={}/doc", origin.uri()))
        .await
        .unwrap();
    let body = resp.text().await.unwrap();
    let (_, content) = body.split_once(SEPARATOR).unwrap();
    assert_eq!(content, format!("{SWITCH_NOTICE}backup summary"));
}

#[tokio::test]
async fn unresolvable_host_yields_only_an_error_chunk() {
    let app = spawn_app(offline_state()).await;
    let resp = reqwest::get(format!(
        "{app}/process?url=http://nonexistent-host-zq.invalid/page"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);

    let body = resp.text().await.unwrap();
    assert!(!body.contains(SEPARATOR));
    let err: serde_json::Value = serde_json::from_str(&body).expect("single JSON error chunk");
    assert!(err["error"]
        .as_str()
        .unwrap()
        .starts_with("Connection failed:"));
}
