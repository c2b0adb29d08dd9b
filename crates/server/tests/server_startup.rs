use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Minimal valid config with storage under `root`
fn minimal_config(port: u16, root: &Path) -> String {
    let root = root.display();
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[storage]
static_root = "{root}"
uploads_dir = "{root}/uploads"
generated_images_dir = "{root}/generated_images"
videos_dir = "{root}/videos"
temp_dir = "{root}/videos/temp"

[video_provider]
api_key = "sk-startup-test"
"#
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_keyreel"))
        .env("KEYREEL_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_server_starts_and_serves_api() {
    let port = get_available_port();
    let root = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, root.path()));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(health["status"], "ok");

    let config_json: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(config_json["server"]["port"], port);
    assert_eq!(config_json["video_provider"]["api_key_configured"], true);
    assert!(!config_json.to_string().contains("sk-startup-test"));

    // Storage tree is created at startup
    assert!(root.path().join("uploads").is_dir());
    assert!(root.path().join("videos").join("temp").is_dir());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_keyreel"))
            .env("KEYREEL_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_plan_exits_with_error() {
    let root = TempDir::new().unwrap();
    let content = format!(
        "{}\n[plan]\nsubject = \"x\"\nstages = []\n",
        minimal_config(get_available_port(), root.path())
    );
    let config = write_config(&content);

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_keyreel"))
            .env("KEYREEL_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
