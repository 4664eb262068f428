//! Video generation lifecycle integration tests: reserve, submit, poll,
//! settle, refund.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn create_video_reserves_credits_and_submits() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-abc").await;

    let response = harness
        .server
        .post("/videos")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({ "prompt": "a cat surfing a wave" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let job: Value = response.json();
    assert_eq!(job["status"], "queued");
    assert_eq!(job["openai_id"], "video-abc");
    assert_eq!(job["cost_credits"], 80);
    assert_eq!(job["seconds"], 4);
    assert_eq!(job["size"], "1280x720");
    assert_eq!(job["model"], "sora-2");
    assert!(job["file_url"].is_null());

    assert_eq!(harness.credits(&token).await, 20);

    let items = harness.transactions(&token).await;
    let spends: Vec<&Value> = items.iter().filter(|t| t["type"] == "spend").collect();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0]["amount"], -80);
    assert_eq!(spends[0]["status"], "pending");
    assert_eq!(spends[0]["ref"], job["id"]);
}

#[tokio::test]
async fn create_video_applies_style_and_format() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-styled").await;

    let response = harness
        .server
        .post("/videos")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({
            "prompt": "a duel at dawn",
            "style": "80s",
            "format": "9:16",
            "model": "sora-2-pro",
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let job: Value = response.json();
    assert_eq!(job["size"], "720x1280");
    assert_eq!(job["model"], "sora-2-pro");
    let prompt = job["prompt"].as_str().expect("prompt");
    assert!(prompt.starts_with("80s action anime:"), "got: {prompt}");
    assert!(prompt.ends_with("a duel at dawn"));
}

#[tokio::test]
async fn create_video_rejects_bad_seconds() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;

    let response = harness
        .server
        .post("/videos")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({ "prompt": "a cat", "seconds": 5 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Allowed seconds are 4, 8, or 12");

    assert_eq!(harness.credits(&token).await, 100);
    assert!(harness.videos(&token).await.is_empty());
}

#[tokio::test]
async fn create_video_insufficient_credits_never_submits() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;

    Mock::given(method("POST"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.provider)
        .await;

    let response = harness
        .server
        .post("/videos")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({ "prompt": "a cat", "seconds": 12 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Not enough credits: need 240, have 100");

    assert_eq!(harness.credits(&token).await, 100);
    assert!(harness.videos(&token).await.is_empty());
}

#[tokio::test]
async fn create_video_provider_rejection_refunds() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_failure(500, "upstream exploded").await;

    let response = harness
        .server
        .post("/videos")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({ "prompt": "a cat" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    let detail = body["detail"].as_str().expect("detail");
    assert!(detail.starts_with("OpenAI error:"), "got: {detail}");

    assert_eq!(harness.credits(&token).await, 100);

    // The job row survives, still queued and without a provider id.
    let videos = harness.videos(&token).await;
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0]["status"], "queued");
    assert!(videos[0]["openai_id"].is_null());

    let items = harness.transactions(&token).await;
    let spends: Vec<&Value> = items.iter().filter(|t| t["type"] == "spend").collect();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0]["status"], "failed");
    assert_eq!(spends[0]["ref"], "create_error");
    let refunds: Vec<&Value> = items.iter().filter(|t| t["type"] == "refund").collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0]["amount"], 80);
    assert_eq!(refunds[0]["status"], "settled");
    assert_eq!(refunds[0]["ref"], "create_error");
}

#[tokio::test]
async fn videos_require_auth() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/videos").await;
    response.assert_status_unauthorized();

    let response = harness
        .server
        .post("/videos")
        .json(&json!({ "prompt": "a cat" }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn pull_in_progress_marks_processing() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-abc").await;
    let job = harness.create_video(&token, "a cat").await;
    let job_id = job["id"].as_str().expect("job id");

    harness.mock_status("video-abc", "in_progress").await;

    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;

    response.assert_status_ok();
    let pulled: Value = response.json();
    assert_eq!(pulled["status"], "processing");

    // The reservation stays pending while the provider is still working.
    assert_eq!(harness.credits(&token).await, 20);
    let items = harness.transactions(&token).await;
    assert!(items
        .iter()
        .any(|t| t["type"] == "spend" && t["status"] == "pending"));
}

#[tokio::test]
async fn pull_completed_downloads_and_settles() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-abc").await;
    let job = harness.create_video(&token, "a cat").await;
    let job_id = job["id"].as_str().expect("job id").to_string();

    harness.mock_status("video-abc", "completed").await;
    harness.mock_download("video-abc", b"fake mp4 bytes").await;

    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;

    response.assert_status_ok();
    let pulled: Value = response.json();
    assert_eq!(pulled["status"], "completed");
    // Locally stored clips are served by the file endpoint, not a URL.
    assert!(pulled["file_url"].is_null());

    assert_eq!(harness.credits(&token).await, 20);
    let items = harness.transactions(&token).await;
    let spends: Vec<&Value> = items.iter().filter(|t| t["type"] == "spend").collect();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0]["status"], "settled");
    assert_eq!(spends[0]["ref"], job_id.as_str());

    // A terminal job answers without touching the provider again; with all
    // mocks gone, any provider call would surface as a 502.
    harness.provider.reset().await;
    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;
    response.assert_status_ok();
    let again: Value = response.json();
    assert_eq!(again["status"], "completed");
}

#[tokio::test]
async fn pull_failed_refunds_exactly_once() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-abc").await;
    let job = harness.create_video(&token, "a cat").await;
    let job_id = job["id"].as_str().expect("job id").to_string();

    harness.mock_status("video-abc", "expired").await;

    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;

    response.assert_status_ok();
    let pulled: Value = response.json();
    assert_eq!(pulled["status"], "failed");

    assert_eq!(harness.credits(&token).await, 100);
    let items = harness.transactions(&token).await;
    let spends: Vec<&Value> = items.iter().filter(|t| t["type"] == "spend").collect();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0]["status"], "failed");
    assert_eq!(spends[0]["ref"], job_id.as_str());
    let refunds: Vec<&Value> = items.iter().filter(|t| t["type"] == "refund").collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0]["amount"], 80);
    assert_eq!(refunds[0]["ref"], job_id.as_str());

    // Polling a failed job again must not refund a second time.
    harness.provider.reset().await;
    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;
    response.assert_status_ok();
    let again: Value = response.json();
    assert_eq!(again["status"], "failed");

    assert_eq!(harness.credits(&token).await, 100);
    let items = harness.transactions(&token).await;
    let refunds: Vec<&Value> = items.iter().filter(|t| t["type"] == "refund").collect();
    assert_eq!(refunds.len(), 1);
}

#[tokio::test]
async fn pull_provider_error_passes_through() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-abc").await;
    let job = harness.create_video(&token, "a cat").await;
    let job_id = job["id"].as_str().expect("job id");

    // No status mock mounted, so the status query comes back 404.
    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    let detail = body["detail"].as_str().expect("detail");
    assert!(
        detail.starts_with("OpenAI check/download error:"),
        "got: {detail}"
    );

    // A transient check error leaves the job and the reservation alone.
    assert_eq!(harness.credits(&token).await, 20);
    let videos = harness.videos(&token).await;
    assert_eq!(videos[0]["status"], "queued");
}

#[tokio::test]
async fn pull_without_provider_id_rejected() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_failure(500, "upstream exploded").await;

    let response = harness
        .server
        .post("/videos")
        .add_header("authorization", TestHarness::bearer(&token))
        .json(&json!({ "prompt": "a cat" }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let videos = harness.videos(&token).await;
    let job_id = videos[0]["id"].as_str().expect("job id");

    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["detail"], "OpenAI id unknown for this job");
}

#[tokio::test]
async fn pull_of_foreign_or_unknown_job_not_found() {
    let harness = TestHarness::new().await;
    let alice = harness.register("alice@example.com").await;
    let bob = harness.register("bob@example.com").await;
    harness.mock_submit_success("video-abc").await;
    let job = harness.create_video(&alice, "a cat").await;
    let job_id = job["id"].as_str().expect("job id");

    let response = harness
        .server
        .post(&format!("/videos/{job_id}/pull"))
        .add_header("authorization", TestHarness::bearer(&bob))
        .await;
    response.assert_status_not_found();

    let response = harness
        .server
        .post("/videos/7f2c1f6e-58af-4cbb-9f7b-1df52a9b0f6e/pull")
        .add_header("authorization", TestHarness::bearer(&alice))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn get_and_list_videos() {
    let harness = TestHarness::with_config(|c| c.welcome_credits = 200).await;
    let token = harness.register("alice@example.com").await;
    harness.mock_submit_success("video-abc").await;
    let first = harness.create_video(&token, "a cat").await;
    let second = harness.create_video(&token, "a dog").await;

    let videos = harness.videos(&token).await;
    assert_eq!(videos.len(), 2);
    let ids: Vec<&str> = videos.iter().filter_map(|v| v["id"].as_str()).collect();
    assert!(ids.contains(&first["id"].as_str().expect("id")));
    assert!(ids.contains(&second["id"].as_str().expect("id")));

    let response = harness
        .server
        .get(&format!("/videos/{}", first["id"].as_str().expect("id")))
        .add_header("authorization", TestHarness::bearer(&token))
        .await;
    response.assert_status_ok();
    let fetched: Value = response.json();
    assert_eq!(fetched["id"], first["id"]);
    assert_eq!(fetched["prompt"], first["prompt"]);
}

#[tokio::test]
async fn get_video_malformed_id_not_found() {
    let harness = TestHarness::new().await;
    let token = harness.register("alice@example.com").await;

    let response = harness
        .server
        .get("/videos/not-a-uuid")
        .add_header("authorization", TestHarness::bearer(&token))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["detail"], "Video not found");
}
