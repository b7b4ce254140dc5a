use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docsift_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docsift");
    path
}

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

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("field-guide.pdf"),
        minimal_pdf("Rotate crops every season to keep the soil healthy"),
    )
    .unwrap();
    fs::write(files_dir.join("notes.docx"), b"not a supported document").unwrap();

    let config_content = format!(
        r#"[snapshot]
index_path = "{root}/data/index.bin"
store_path = "{root}/data/store.json"

[chunking]
chunk_size = 500
overlap = 50

[retrieval]
top_k = 5
max_context_length = 2000

[embedding]
provider = "hash"
dims = 128

[server]
upload_dir = "{root}/uploads"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("docsift.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docsift(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docsift_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docsift binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn file_arg(tmp: &TempDir, name: &str) -> String {
    tmp.path().join("files").join(name).display().to_string()
}

#[test]
fn test_add_unsupported_type_reports_false() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_docsift(&config_path, &["add", &file_arg(&tmp, "notes.docx")]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Document added: false"));

    // Nothing was committed, so no snapshot is written.
    assert!(!tmp.path().join("data/index.bin").exists());
    assert!(!tmp.path().join("data/store.json").exists());
}

#[test]
fn test_add_missing_file_reports_false() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_docsift(&config_path, &["add", &file_arg(&tmp, "absent.pdf")]);
    assert!(success);
    assert!(stdout.contains("Document added: false"));
}

#[test]
fn test_search_empty_corpus_prints_empty_array() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docsift(&config_path, &["search", "anything"]);
    assert!(success, "search failed: stderr={}", stderr);
    let results: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(results, Value::Array(vec![]));
}

#[test]
fn test_context_empty_corpus_is_blank() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docsift(&config_path, &["context", "anything"]);
    assert!(success, "context failed: stderr={}", stderr);
    assert!(stdout.trim().is_empty());
}

#[test]
fn test_add_pdf_then_search_and_context() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_docsift(&config_path, &["add", &file_arg(&tmp, "field-guide.pdf")]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Document added: true"), "stderr={}", stderr);
    assert!(tmp.path().join("data/index.bin").exists());
    assert!(tmp.path().join("data/store.json").exists());

    // A fresh process restores the snapshot.
    let (stdout, stderr, success) =
        run_docsift(&config_path, &["search", "rotate crops", "--top-k", "3"]);
    assert!(success, "search failed: stderr={}", stderr);
    let results: Value = serde_json::from_str(stdout.trim()).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["source"], "field-guide.pdf");
    assert_eq!(results[0]["type"], "pdf");
    assert_eq!(results[0]["page"], 1);
    assert_eq!(results[0]["chunk_id"], 0);
    assert!(results[0]["text"]
        .as_str()
        .unwrap()
        .contains("Rotate crops every season"));
    assert!(results[0]["relevance_score"].as_f64().unwrap() > 0.0);

    let (stdout, _, success) = run_docsift(&config_path, &["context", "rotate crops"]);
    assert!(success);
    assert!(stdout.starts_with("[Source: field-guide.pdf, Page 1, Relevance: "));

    let (stdout, _, success) = run_docsift(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Chunks:      1"));
    assert!(stdout.contains("field-guide.pdf"));
}

#[test]
fn test_search_scoped_to_source() {
    let (tmp, config_path) = setup_test_env();
    run_docsift(&config_path, &["add", &file_arg(&tmp, "field-guide.pdf")]);

    let (stdout, _, success) = run_docsift(
        &config_path,
        &["search", "soil", "--source", "field-guide.pdf"],
    );
    assert!(success);
    let results: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(results.as_array().unwrap().len(), 1);

    let (_, stderr, success) = run_docsift(
        &config_path,
        &["search", "soil", "--source", "missing.pdf"],
    );
    assert!(!success);
    assert!(stderr.contains("missing.pdf"), "stderr={}", stderr);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let bad_config = tmp.path().join("config/bad.toml");
    fs::write(&bad_config, "[chunking]\nchunk_size = 100\noverlap = 100\n").unwrap();

    let (_, stderr, success) = run_docsift(&bad_config, &["search", "anything"]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "stderr={}", stderr);
}
