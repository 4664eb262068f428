//! Common test utilities for storycraft integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storycraft_api::{create_router, ApiConfig, AppState};
use storycraft_openai::{OpenAiClient, OpenAiConfig};
use storycraft_storage::{LocalStorage, MediaStorage};
use storycraft_store::Db;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Mock of the provider API.
    pub provider: MockServer,
    /// Direct database handle, for assertions and fixtures.
    pub db: Db,
    /// Where local media lands (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database, a mock provider
    /// and a local media directory.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestHarness::new`], tweaking the config before startup.
    pub async fn with_config(adjust: impl FnOnce(&mut ApiConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("storycraft-test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let db = Db::connect(&database_url)
            .await
            .expect("Failed to open database");
        db.migrate().await.expect("Failed to run migrations");

        let provider = MockServer::start().await;
        let openai = OpenAiClient::new(OpenAiConfig {
            base_url: provider.uri(),
            api_key: "test-key".to_string(),
            submit_timeout: Duration::from_secs(5),
            status_timeout: Duration::from_secs(5),
            download_timeout: Duration::from_secs(5),
        })
        .expect("Failed to build provider client");

        let storage: Arc<dyn MediaStorage> =
            Arc::new(LocalStorage::new(temp_dir.path().join("videos")));

        let mut config = ApiConfig {
            database_url,
            jwt_secret: "test-secret".to_string(),
            ..ApiConfig::default()
        };
        adjust(&mut config);

        let state = AppState::from_parts(config, db.clone(), openai, storage);
        let router: Router = create_router(state, None);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            provider,
            db,
            _temp_dir: temp_dir,
        }
    }

    /// Register an account and return its bearer token.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .server
            .post("/auth/register")
            .json(&json!({ "email": email, "password": "password123" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["access_token"]
            .as_str()
            .expect("token in register response")
            .to_string()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    /// The authenticated account, via GET /me.
    pub async fn me(&self, token: &str) -> Value {
        let response = self
            .server
            .get("/me")
            .add_header("authorization", Self::bearer(token))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Current credit balance of the account behind `token`.
    pub async fn credits(&self, token: &str) -> i64 {
        self.me(token).await["credits"]
            .as_i64()
            .expect("credits in /me response")
    }

    /// The account id behind `token`.
    pub async fn user_id(&self, token: &str) -> String {
        self.me(token).await["id"]
            .as_str()
            .expect("id in /me response")
            .to_string()
    }

    /// The account's ledger entries, newest first.
    pub async fn transactions(&self, token: &str) -> Vec<Value> {
        let response = self
            .server
            .get("/credits/transactions")
            .add_header("authorization", Self::bearer(token))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["items"].as_array().expect("items array").clone()
    }

    /// The account's jobs, newest first.
    pub async fn videos(&self, token: &str) -> Vec<Value> {
        let response = self
            .server
            .get("/videos")
            .add_header("authorization", Self::bearer(token))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["items"].as_array().expect("items array").clone()
    }

    /// Create a default 4-second clip and return the job body.
    pub async fn create_video(&self, token: &str, prompt: &str) -> Value {
        let response = self
            .server
            .post("/videos")
            .add_header("authorization", Self::bearer(token))
            .json(&json!({ "prompt": prompt }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    /// Flip the account's admin flag directly in the database.
    pub async fn make_admin(&self, email: &str) {
        sqlx::query("UPDATE users SET is_admin = 1 WHERE email = ?1")
            .bind(email)
            .execute(self.db.pool())
            .await
            .expect("Failed to promote user");
    }

    /// Provider accepts submissions, assigning `id`.
    pub async fn mock_submit_success(&self, id: &str) {
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "status": "queued",
            })))
            .mount(&self.provider)
            .await;
    }

    /// Provider accepts only the next `n` submissions, assigning `id`.
    pub async fn mock_submit_success_n(&self, id: &str, n: u64) {
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "status": "queued",
            })))
            .up_to_n_times(n)
            .mount(&self.provider)
            .await;
    }

    /// Provider rejects submissions with `status_code`.
    pub async fn mock_submit_failure(&self, status_code: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .mount(&self.provider)
            .await;
    }

    /// Provider reports `status` for the submitted video.
    pub async fn mock_status(&self, id: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/videos/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "status": status,
            })))
            .mount(&self.provider)
            .await;
    }

    /// Provider serves the finished clip's bytes.
    pub async fn mock_download(&self, id: &str, bytes: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/videos/{id}/content")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
            .mount(&self.provider)
            .await;
    }
}
