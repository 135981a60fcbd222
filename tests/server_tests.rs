use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use market_pulse::model::batch::Batch;
use market_pulse::model::quote::Quote;
use market_pulse::server::serve_listener;
use market_pulse::snapshot::{SnapshotPaths, SnapshotWriter};

struct TestServer {
    addr: SocketAddr,
    dir: PathBuf,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(publish: bool) -> Self {
        let dir = std::env::temp_dir().join(format!("market-pulse-server-{}", uuid::Uuid::new_v4()));
        let paths = SnapshotPaths {
            stocks: dir.join("stock_data.json"),
            best: dir.join("best_stock.json"),
            trending: dir.join("trending.json"),
        };
        if publish {
            SnapshotWriter::new(paths.clone())
                .publish(&Batch::from_quotes(vec![
                    Quote::from_change("AAPL", 150.0, 3.45),
                    Quote::from_change("MSFT", 100.0, -1.96),
                ]))
                .unwrap();
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(serve_listener(listener, paths, rx));
        Self {
            addr,
            dir,
            shutdown,
            task,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn serves_published_documents_with_cors() {
    let server = TestServer::start(true).await;
    let http = reqwest::Client::new();

    let response = http.get(server.url("/stocks")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("application/json"));
    assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    assert_eq!(
        header(&response, "access-control-allow-methods"),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(
        header(&response, "access-control-allow-headers"),
        Some("Content-Type, Authorization")
    );
    let stocks: Value = response.json().await.unwrap();
    assert_eq!(stocks.as_array().map(Vec::len), Some(2));

    let best: Value = http
        .get(server.url("/best"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        best,
        json!({"symbol": "AAPL", "price": 150.0, "change_percent": 3.45})
    );

    let trending: Value = http
        .get(server.url("/trending"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(trending[0]["symbol"], "AAPL");
    assert_eq!(trending[1]["symbol"], "MSFT");

    server.stop().await;
}

#[tokio::test]
async fn post_serves_the_same_document() {
    let server = TestServer::start(true).await;
    let response = reqwest::Client::new()
        .post(server.url("/best"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    assert_eq!(
        header(&response, "access-control-allow-methods"),
        Some("GET, POST, OPTIONS")
    );
    let best: Value = response.json().await.unwrap();
    assert_eq!(best["symbol"], "AAPL");

    server.stop().await;
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let server = TestServer::start(true).await;
    let response = reqwest::get(server.url("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    assert_eq!(
        header(&response, "access-control-allow-methods"),
        Some("GET, OPTIONS")
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Invalid endpoint"}));

    server.stop().await;
}

#[tokio::test]
async fn options_preflight_is_answered_everywhere() {
    let server = TestServer::start(true).await;
    let http = reqwest::Client::new();

    for path in ["/stocks", "/best", "/anything"] {
        let response = http
            .request(Method::OPTIONS, server.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "path {path}");
        assert_eq!(header(&response, "access-control-max-age"), Some("86400"));
        assert_eq!(
            header(&response, "access-control-allow-methods"),
            Some("GET, POST, OPTIONS")
        );
    }

    server.stop().await;
}

#[tokio::test]
async fn missing_document_is_json_500() {
    let server = TestServer::start(false).await;
    let response = reqwest::get(server.url("/trending")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Could not read file"}));

    server.stop().await;
}
