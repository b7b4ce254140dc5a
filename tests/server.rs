//! End-to-end tests for the HTTP transport.
//!
//! Each test starts the server on a free port with the `hash` embedding
//! provider, waits for `/health`, and drives it with `reqwest`.

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use docsift::config::{parse_config, Config};
use docsift::retriever::Retriever;
use docsift::server::run_server_with;

/// Single-page PDF drawing `phrase` in Helvetica, with a correct xref.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 712 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    offsets.push(out.len());
    out.extend_from_slice(b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n");
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let root = tmp.path();
    let config_content = format!(
        r#"[snapshot]
index_path = "{root}/data/index.bin"
store_path = "{root}/data/store.json"

[embedding]
provider = "hash"
dims = 128

[server]
bind = "127.0.0.1:{port}"
upload_dir = "{root}/uploads"
"#,
        root = root.display(),
        port = port
    );
    parse_config(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_server(tmp: &TempDir) -> (u16, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let cfg = test_config(tmp, port);
    let retriever = Arc::new(Retriever::open(&cfg).await.unwrap());

    let handle = tokio::spawn(async move {
        run_server_with(&cfg, retriever).await.ok();
    });
    wait_for_server(port).await;
    (port, handle)
}

fn pdf_form(name: &str, phrase: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(minimal_pdf(phrase))
        .file_name(name.to_string())
        .mime_str("application/pdf")
        .unwrap();
    reqwest::multipart::Form::new().part("file", part)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let (port, server) = start_server(&tmp).await;

    let body: Value = reqwest::get(format!("http://127.0.0.1:{}/health", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chunks"], 0);

    server.abort();
}

/// Upload a PDF, then find it through search and context.
#[tokio::test]
async fn test_upload_then_search_and_context() {
    let tmp = TempDir::new().unwrap();
    let (port, server) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{}/documents", port))
        .multipart(pdf_form("irrigation.pdf", "Drip lines should be spaced twelve inches apart"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["source"], "irrigation.pdf");
    assert_eq!(body["chunks_added"], 1);
    assert_eq!(body["persisted"], true);
    assert!(tmp.path().join("data/index.bin").exists());

    let resp = client
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&json!({ "query": "drip line spacing", "top_k": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "irrigation.pdf");
    assert_eq!(results[0]["page"], 1);

    let resp = client
        .post(format!("http://127.0.0.1:{}/context", port))
        .json(&json!({ "query": "drip line spacing", "max_length": 2000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let context = body["context"].as_str().unwrap();
    assert!(context.starts_with("[Source: irrigation.pdf, Page 1, Relevance: "));
    assert!(context.contains("twelve inches"));

    let health: Value = reqwest::get(format!("http://127.0.0.1:{}/health", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["chunks"], 1);

    server.abort();
}

#[tokio::test]
async fn test_upload_rejections() {
    let tmp = TempDir::new().unwrap();
    let (port, server) = start_server(&tmp).await;
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/documents", port);

    // Unsupported extension → 400 before anything is stored
    let part = reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("notes.docx");
    let resp = client
        .post(&url)
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    // No `file` field → 400
    let resp = client
        .post(&url)
        .multipart(reqwest::multipart::Form::new().text("other", "value"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Corrupt PDF → 500, and the rejected upload is removed
    let part = reqwest::multipart::Part::bytes(b"not a pdf".to_vec()).file_name("broken.pdf");
    let resp = client
        .post(&url)
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "internal");
    let leftover = std::fs::read_dir(tmp.path().join("uploads"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);

    server.abort();
}

#[tokio::test]
async fn test_search_errors() {
    let tmp = TempDir::new().unwrap();
    let (port, server) = start_server(&tmp).await;
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/search", port);

    // Empty query → 400
    let resp = client
        .post(&url)
        .json(&json!({ "query": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Empty corpus → empty results
    let resp = client
        .post(&url)
        .json(&json!({ "query": "anything" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"], json!([]));

    // Unknown source → 404
    let resp = client
        .post(&url)
        .json(&json!({ "query": "anything", "source": "ghost.pdf" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    server.abort();
}
