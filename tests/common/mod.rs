//! Common test utilities for buildpack-notify integration tests
//!
//! [`FakeCloudFoundry`] is a small axum server that answers the handful of
//! Cloud Foundry API endpoints the job uses, with paginated responses and the
//! client-credentials token exchange, so the real HTTP client can be tested
//! end to end.

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Client id accepted by the fake token endpoint.
pub const CLIENT_ID: &str = "notify";
/// Client secret accepted by the fake token endpoint.
pub const CLIENT_SECRET: &str = "secret";

const BASIC_AUTH: &str = "Basic bm90aWZ5OnNlY3JldA==";
const TOKEN: &str = "test-token";

#[derive(Default)]
struct FakeState {
    base: String,
    requests: Mutex<Vec<String>>,
    failing_paths: Mutex<Vec<String>>,
}

/// Running fake API; the server stops when the test runtime shuts down.
pub struct FakeCloudFoundry {
    /// API root, e.g. `http://127.0.0.1:41234`
    pub base: String,
    state: Arc<FakeState>,
}

impl FakeCloudFoundry {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(FakeState {
            base: base.clone(),
            ..FakeState::default()
        });

        let router = Router::new()
            .route("/v2/info", get(info))
            .route("/oauth/token", post(token))
            .route("/v3/buildpacks", get(buildpacks))
            .route("/v3/apps", get(apps))
            .route("/v3/apps/{guid}/droplets", get(droplets))
            .route("/v3/spaces/{guid}", get(space))
            .route("/v2/spaces/{guid}/{role}", get(space_users))
            .with_state(state.clone());

        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        Self { base, state }
    }

    /// Answer every request whose path starts with `prefix` with HTTP 500.
    pub fn fail_path(&self, prefix: &str) {
        self.state.failing_paths.lock().unwrap().push(prefix.to_string());
    }

    /// Authenticated API requests served so far (path and query).
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn info(State(state): State<Arc<FakeState>>) -> Json<Value> {
    Json(json!({
        "api_version": "2.150.0",
        "token_endpoint": state.base,
    }))
}

async fn token(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(BASIC_AUTH);
    if !authorized || form.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response();
    }
    Json(json!({"access_token": TOKEN, "token_type": "bearer", "expires_in": 43199}))
        .into_response()
}

/// Check the bearer token and failure injection; record the request.
fn guard(state: &FakeState, headers: &HeaderMap, path: String) -> Option<Response> {
    let bearer = format!("Bearer {TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(bearer.as_str());
    if !authorized {
        return Some(StatusCode::UNAUTHORIZED.into_response());
    }

    let failing = state
        .failing_paths
        .lock()
        .unwrap()
        .iter()
        .any(|prefix| path.starts_with(prefix));
    state.requests.lock().unwrap().push(path);
    failing.then(|| (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure").into_response())
}

fn query_string(query: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

fn v3_page(resources: Value, next: Option<String>) -> Json<Value> {
    Json(json!({
        "pagination": {
            "total_results": resources.as_array().map_or(0, Vec::len),
            "next": next.map(|href| json!({"href": href})),
        },
        "resources": resources,
    }))
}

async fn buildpacks(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = format!("/v3/buildpacks{}", query_string(&query));
    if let Some(response) = guard(&state, &headers, path) {
        return response;
    }
    v3_page(
        json!([
            {
                "guid": "bp-1",
                "name": "python_buildpack",
                "stack": "cflinuxfs3",
                "filename": "python_buildpack-cflinuxfs3-v1.7.43.zip",
                "created_at": "2015-01-01T00:00:00Z",
                "updated_at": "2016-06-08T16:41:45Z"
            },
            {
                "guid": "bp-2",
                "name": "custom_buildpack",
                "stack": null,
                "filename": null,
                "created_at": "2015-01-01T00:00:00Z",
                "updated_at": "2015-01-01T00:00:00Z"
            }
        ]),
        None,
    )
    .into_response()
}

fn app(guid: &str, name: &str, state: &str) -> Value {
    json!({
        "guid": guid,
        "name": name,
        "state": state,
        "created_at": "2016-01-01T00:00:00Z",
        "updated_at": "2016-01-01T00:00:00Z",
        "lifecycle": {"type": "buildpack", "data": {"buildpacks": [], "stack": "cflinuxfs3"}},
        "relationships": {"space": {"data": {"guid": "space-1"}}}
    })
}

async fn apps(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = format!("/v3/apps{}", query_string(&query));
    if let Some(response) = guard(&state, &headers, path) {
        return response;
    }
    let page = match query.get("page").map(String::as_str) {
        None | Some("1") => v3_page(
            json!([
                app("app-1", "my-drupal-app", "STARTED"),
                app("app-2", "stopped-app", "STOPPED")
            ]),
            Some(format!("{}/v3/apps?page=2&per_page=100", state.base)),
        ),
        _ => v3_page(json!([app("app-3", "restaged-app", "STARTED")]), None),
    };
    page.into_response()
}

async fn droplets(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(guid): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = format!("/v3/apps/{guid}/droplets{}", query_string(&query));
    if let Some(response) = guard(&state, &headers, path) {
        return response;
    }
    let created_at = match guid.as_str() {
        "app-1" => "2016-03-01T00:00:00Z",
        "app-3" => "2016-07-01T00:00:00Z",
        _ => return v3_page(json!([]), None).into_response(),
    };
    v3_page(
        json!([{
            "guid": format!("droplet-{guid}"),
            "state": "STAGED",
            "error": null,
            "created_at": created_at,
            "updated_at": created_at,
            "buildpacks": [{"name": "python_buildpack", "detect_output": "python", "buildpack_name": "python", "version": "1.7.43"}]
        }]),
        None,
    )
    .into_response()
}

async fn space(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(guid): Path<String>,
) -> Response {
    if let Some(response) = guard(&state, &headers, format!("/v3/spaces/{guid}")) {
        return response;
    }
    Json(json!({
        "guid": guid,
        "name": "dev",
        "relationships": {"organization": {"data": {"guid": "org-1"}}},
        "included": {"organizations": [{"guid": "org-1", "name": "sandbox"}]}
    }))
    .into_response()
}

fn user(guid: &str, username: &str) -> Value {
    json!({
        "metadata": {"guid": guid, "url": format!("/v2/users/{guid}")},
        "entity": {"username": username, "active": true}
    })
}

async fn space_users(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path((guid, role)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = format!("/v2/spaces/{guid}/{role}{}", query_string(&query));
    if let Some(response) = guard(&state, &headers, path) {
        return response;
    }
    let second_page = query.get("page").map(String::as_str) == Some("2");
    let (resources, next_url) = match (role.as_str(), second_page) {
        ("developers", false) => (
            json!([user("u-1", "user1@example.com")]),
            Some(format!("/v2/spaces/{guid}/developers?page=2&results-per-page=100")),
        ),
        ("developers", true) => (json!([user("u-2", "admin")]), None),
        ("managers", _) => (
            json!([user("u-1", "user1@example.com"), user("u-3", "manager@example.com")]),
            None,
        ),
        _ => (json!([]), None),
    };
    Json(json!({
        "total_results": resources.as_array().map_or(0, Vec::len),
        "next_url": next_url,
        "resources": resources,
    }))
    .into_response()
}
