/// Common test utilities for integration tests
///
/// Each `TestContext` owns a fresh in-memory store and a router built over
/// it, so tests need no external services. Requests go through
/// `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use collabhub_api::app::{build_router, AppState};
use collabhub_api::config::Config;
use collabhub_shared::auth::assertion::{sign_assertion, IDENTITY_SIGNATURE_HEADER};
use collabhub_shared::auth::jwt::issue_token_pair;
use collabhub_shared::db::memory::MemoryStore;
use collabhub_shared::db::store::{Store, UnitOfWork};
use collabhub_shared::models::user::{NewUser, SystemRole, User};
use collabhub_shared::notify::RecordingNotifier;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Key the test harness signs external identity assertions with
pub const TEST_IDENTITY_SECRET: &str = "identity-secret-key-at-least-32-bytes";

pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        let config =
            Config::for_secret(TEST_SECRET).with_external_identity_secret(TEST_IDENTITY_SECRET);
        Self::with_config(config).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = AppState::new(store.clone(), notifier.clone(), config);
        state
            .services
            .accounts
            .ensure_system_account()
            .await
            .expect("system account");

        Self {
            app: build_router(state.clone()),
            state,
            store,
            notifier,
        }
    }

    /// Inserts a passwordless account and returns it with an access token
    pub async fn user(&self, email: &str) -> (User, String) {
        let user = User::from_new(NewUser {
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            password_hash: None,
            role: SystemRole::User,
            provider: None,
            provider_id: None,
        });

        let mut tx = self.store.begin().await.unwrap();
        tx.insert_user(&user).await.unwrap();
        tx.commit().await.unwrap();

        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn system_token(&self) -> String {
        let system = self
            .state
            .services
            .accounts
            .find_by_email("admin@admin.com")
            .await
            .unwrap()
            .unwrap();
        self.token_for(&system)
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_token_pair(user, TEST_SECRET).unwrap().access_token
    }

    /// Sends a request and returns the status and the parsed JSON body
    /// (`Value::Null` for empty bodies)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Posts an external identity assertion with an optional signature header
    pub async fn external_login(&self, body: &Value, signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/v1/auth/external")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(IDENTITY_SIGNATURE_HEADER, signature);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Posts an assertion signed the way the sign-in collaborator signs it
    pub async fn signed_external_login(&self, body: &Value) -> (StatusCode, Value) {
        let signature = sign_assertion(TEST_IDENTITY_SECRET.as_bytes(), body.to_string().as_bytes())
            .unwrap();
        self.external_login(body, Some(&signature)).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/v1/projects",
                token,
                serde_json::json!({
                    "name": name,
                    "description": "Integration test project",
                    "start_date": "2024-01-01",
                    "end_date": "2024-06-30"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}
