//! API tests driving the router in-process with mocked providers.

mod common;

use axum::http::StatusCode;
use keyreel_core::{JobOutcome, ProviderError};

use common::TestFixture;

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_hides_api_keys() {
    let fixture = TestFixture::with_config(|config| {
        config.video_provider.api_key = "sk-video-secret".to_string();
    })
    .await;

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["video_provider"]["api_key_configured"], true);
    assert_eq!(response.body["image_provider"]["api_key_configured"], false);
    assert!(!response.body.to_string().contains("sk-video-secret"));
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_and_get_session() {
    let fixture = TestFixture::new().await;

    let created = fixture.post("/api/v1/sessions").await;
    assert_status!(created, StatusCode::CREATED);
    assert_eq!(created.body["status"], "WAITING_INPUT");
    let id = created.body["id"].as_str().unwrap().to_string();

    let fetched = fixture.get(&format!("/api/v1/sessions/{}", id)).await;
    assert_status!(fetched, StatusCode::OK);
    assert_eq!(fetched.body["id"], id.as_str());
    assert_eq!(fetched.body["clip_count"], 0);
}

#[tokio::test]
async fn test_get_unknown_session_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/sessions/does-not-exist").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(response.body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_list_sessions() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/sessions").await;
    fixture.post("/api/v1/sessions").await;

    let response = fixture.get("/api/v1/sessions").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 2);
    assert_eq!(response.body["sessions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upload_reference_runs_workflow() {
    let fixture = TestFixture::new().await;
    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let response = fixture
        .post_file(
            &format!("/api/v1/sessions/{}/reference", id),
            "product_image",
            "mug.png",
            b"\x89PNG fake image bytes",
        )
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["status"], "started");

    let ref_image = response.body["ref_image"].as_str().unwrap().to_string();
    assert!(ref_image.contains(&format!("ref_{}_", id)));
    assert!(ref_image.ends_with(".png"));
    assert!(std::path::Path::new(&ref_image).is_file());

    let done = fixture.wait_for_session(&id).await;
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(done["clip_count"], 1);
    assert!(done["output_artifact_ref"]
        .as_str()
        .unwrap()
        .ends_with(&format!("{}.mp4", id)));
    assert_eq!(fixture.provider.submit_count().await, 1);
}

#[tokio::test]
async fn test_second_upload_is_already_started() {
    let fixture = TestFixture::new().await;
    fixture
        .provider
        .set_poll_delay(std::time::Duration::from_millis(200))
        .await;
    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();
    let path = format!("/api/v1/sessions/{}/reference", id);

    let first = fixture.post_file(&path, "product_image", "a.jpg", b"a").await;
    assert_eq!(first.body["status"], "started");

    let second = fixture.post_file(&path, "product_image", "b.png", b"b").await;
    assert_status!(second, StatusCode::ACCEPTED);
    assert_eq!(second.body["status"], "already_started");
    assert!(second.body.get("ref_image").is_none());

    // Only the accepted upload stays on disk.
    let stored = fixture.stored_uploads();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].to_str().unwrap(),
        first.body["ref_image"].as_str().unwrap()
    );

    fixture.wait_for_session(&id).await;
    assert_eq!(fixture.provider.submit_count().await, 1);
}

#[tokio::test]
async fn test_upload_to_finished_session_is_conflict() {
    let fixture = TestFixture::new().await;
    fixture
        .provider
        .push_submit(Err(ProviderError::Submission("no task id".to_string())))
        .await;
    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();
    let path = format!("/api/v1/sessions/{}/reference", id);

    fixture.post_file(&path, "product_image", "a.jpg", b"a").await;
    let done = fixture.wait_for_session(&id).await;
    assert_eq!(done["status"], "FAILED");
    assert_eq!(done["error_reason"], "no clip produced");

    let again = fixture.post_file(&path, "product_image", "a.png", b"a").await;
    assert_status!(again, StatusCode::CONFLICT);
    assert_eq!(fixture.stored_uploads().len(), 1);
}

#[tokio::test]
async fn test_list_sessions_newest_first() {
    let fixture = TestFixture::new().await;
    let first = fixture.post("/api/v1/sessions").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = fixture.post("/api/v1/sessions").await;

    let response = fixture.get("/api/v1/sessions").await;
    let sessions = response.body["sessions"].as_array().unwrap();
    assert_eq!(sessions[0]["id"], second.body["id"]);
    assert_eq!(sessions[1]["id"], first.body["id"]);
}

#[tokio::test]
async fn test_upload_without_image_field_is_bad_request() {
    let fixture = TestFixture::new().await;
    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let response = fixture
        .post_file(
            &format!("/api/v1/sessions/{}/reference", id),
            "wrong_field",
            "a.jpg",
            b"a",
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let session = fixture.get(&format!("/api/v1/sessions/{}", id)).await;
    assert_eq!(session.body["status"], "WAITING_INPUT");
}

#[tokio::test]
async fn test_upload_to_unknown_session_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post_file("/api/v1/sessions/missing/reference", "product_image", "a.jpg", b"a")
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_failure_still_completes() {
    let fixture = TestFixture::with_config(|config| {
        config.plan = common::fixtures::video_plan(2);
    })
    .await;
    fixture
        .provider
        .script_task(
            "task_1",
            vec![Ok(JobOutcome::Failed {
                reason: "moderation".to_string(),
            })],
        )
        .await;

    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();
    fixture
        .post_file(
            &format!("/api/v1/sessions/{}/reference", id),
            "product_image",
            "a.jpg",
            b"a",
        )
        .await;

    let done = fixture.wait_for_session(&id).await;
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(done["clip_count"], 1);
}

// =============================================================================
// Playback
// =============================================================================

#[tokio::test]
async fn test_play_requires_ready() {
    let fixture = TestFixture::new().await;
    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();

    let response = fixture.post(&format!("/api/v1/sessions/{}/play", id)).await;
    assert_status!(response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_ready_session_can_play() {
    let fixture = TestFixture::with_config(|config| {
        config.workflow.await_playback = true;
    })
    .await;
    let created = fixture.post("/api/v1/sessions").await;
    let id = created.body["id"].as_str().unwrap().to_string();

    fixture
        .post_file(
            &format!("/api/v1/sessions/{}/reference", id),
            "product_image",
            "a.jpg",
            b"a",
        )
        .await;
    let done = fixture.wait_for_session(&id).await;
    assert_eq!(done["status"], "READY");

    let played = fixture.post(&format!("/api/v1/sessions/{}/play", id)).await;
    assert_status!(played, StatusCode::OK);
    assert_eq!(played.body["status"], "PLAYING");
}

// =============================================================================
// One-shot upload, status, metrics, static files
// =============================================================================

#[tokio::test]
async fn test_update_playlist_creates_and_starts() {
    let fixture = TestFixture::with_config(|config| {
        config.public.base_url = Some("https://reel.example.com".to_string());
    })
    .await;

    let response = fixture
        .post_file("/api/v1/update_playlist", "product_image", "p.jpg", b"img")
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["status"], "started");
    assert_eq!(response.body["public_base_url"], "https://reel.example.com");

    let id = response.body["session_id"].as_str().unwrap().to_string();
    let done = fixture.wait_for_session(&id).await;
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(
        done["output_artifact_ref"],
        format!("https://reel.example.com/static/videos/{}.mp4", id)
    );

    let submissions = fixture.provider.submissions().await;
    assert!(submissions[0]
        .image_url
        .starts_with("https://reel.example.com/static/uploads/ref_"));
}

#[tokio::test]
async fn test_orchestrator_status() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/sessions").await;

    let response = fixture.get("/api/v1/orchestrator/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["sessions"]["waiting_input"], 1);
    assert_eq!(response.body["sessions"]["total"], 1);
    assert_eq!(response.body["image_gate"]["capacity"], 1);
    assert_eq!(response.body["plan_stages"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, text) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("keyreel_http_requests_total"));
    assert!(text.contains("keyreel_sessions_by_status"));
}

#[tokio::test]
async fn test_static_files_served() {
    let fixture = TestFixture::new().await;
    let video = fixture.config.storage.videos_dir.join("demo.mp4");
    std::fs::write(&video, b"not really a video").unwrap();

    let (status, text) = fixture.get_text("/static/videos/demo.mp4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "not really a video");
}
