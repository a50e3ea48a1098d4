use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use edis_server::config::Config;
use edis_server::db::{create_pool, readings, run_migrations};
use edis_server::http::{create_router, AppState};
use edis_server::portal::parser::LoadCurveRow;

fn test_config(dir: &Path) -> Config {
    Config {
        http_addr: "127.0.0.1:0".to_string(),
        start_url: "https://private.e-distribuzione.it/PortaleClienti/s/curvedicarico".to_string(),
        portal_username: None,
        portal_password: None,
        storage_state_path: dir.join("absent.json").to_string_lossy().into_owned(),
        persist_session: false,
        webdriver_url: "http://127.0.0.1:9".to_string(),
        headless: true,
        proxy_url: None,
        user_agent: "test-agent".to_string(),
        accept_language: "it-IT,it;q=0.9".to_string(),
        nav_timeout_ms: 1000,
        idle_wait_ms: 10,
        login_timeout_ms: 1000,
        download_timeout_ms: 100,
        download_dir: dir.join("downloads").to_string_lossy().into_owned(),
        cache_dir: dir.join("cache").to_string_lossy().into_owned(),
        database_url: String::new(),
        allow_origins: vec!["*".to_string()],
        api_key: None,
    }
}

async fn test_state(dir: &Path) -> AppState {
    let url = format!("sqlite://{}?mode=rwc", dir.join("test.db").display());
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let mut config = test_config(dir);
    config.database_url = url;
    AppState::new(config, pool)
}

async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
    let app = create_router(state);
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_raw(state: AppState, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let app = create_router(state);
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, bytes.to_vec())
}

async fn post_json(
    state: AppState,
    uri: &str,
    body: serde_json::Value,
    api_key: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let app = create_router(state);
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn sample_rows() -> Vec<LoadCurveRow> {
    vec![
        LoadCurveRow {
            ts: "2025-08-01T10:00:00".to_string(),
            value_kwh: 0.25,
            quality: Some("E".to_string()),
        },
        LoadCurveRow {
            ts: "2025-08-02T23:45:00".to_string(),
            value_kwh: 0.50,
            quality: None,
        },
        LoadCurveRow {
            ts: "2025-08-03T00:00:00".to_string(),
            value_kwh: 0.75,
            quality: None,
        },
    ]
}

#[tokio::test]
async fn test_healthz_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let (status, body) = get_json(state, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let (status, body) = get_json(state, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["msg"].as_str().unwrap().contains("/refresh"));
}

#[tokio::test]
async fn test_diag_reports_environment() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let (status, body) = get_json(state, "/diag").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["exists"], false);
    assert_eq!(body["size_bytes"], 0);
    assert_eq!(body["readings_count"], 0);
    assert_eq!(body["cache_entries"], 0);
    assert_eq!(body["webdriver_url"], "http://127.0.0.1:9");
    assert_eq!(body["headless"], true);
}

#[tokio::test]
async fn test_data_empty_db_returns_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let (status, body) = get_json(
        state,
        "/data?pod=IT001E1&date_from=2025-08-01&date_to=2025-08-02",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["count"], 0);
    assert!(body["readings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_data_end_date_is_inclusive() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    readings::upsert_readings(&state.db_pool, "IT001E1", &sample_rows())
        .await
        .unwrap();

    let (status, body) = get_json(
        state.clone(),
        "/data?pod=IT001E1&date_from=2025-08-01&date_to=2025-08-02",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let rows = body["readings"].as_array().unwrap();
    assert_eq!(rows[0]["ts"], "2025-08-01T10:00:00");
    assert_eq!(rows[1]["ts"], "2025-08-02T23:45:00");
    // Wire format keeps the portal's kWh key.
    assert_eq!(rows[0]["kWh"], 0.25);

    // The midnight reading of the next day stays out.
    let (_, body) = get_json(
        state,
        "/data?pod=IT001E1&date_from=2025-08-03&date_to=2025-08-03",
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["readings"][0]["ts"], "2025-08-03T00:00:00");
}

#[tokio::test]
async fn test_data_pod_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    readings::upsert_readings(&state.db_pool, "IT001E1", &sample_rows())
        .await
        .unwrap();

    let (_, body) = get_json(
        state,
        "/data?pod=it001e1&date_from=2025-08-01&date_to=2025-08-03",
    )
    .await;
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_data_rejects_inverted_range() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let (status, body) = get_json(
        state,
        "/data?pod=IT001E1&date_from=2025-08-05&date_to=2025-08-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "INPUT_ERROR");
}

#[tokio::test]
async fn test_data_csv_without_cache_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let (status, body) = get_json(
        state,
        "/data?pod=IT001E1&date_from=2025-08-01&date_to=2025-08-02&format=csv",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_data_csv_serves_cached_export() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    state
        .cache
        .store(
            "IT001E1",
            "2025-08-01",
            "2025-08-02",
            "Data;Ora;kWh\n01/08/2025;10:00;0,25\n",
            &sample_rows()[..1],
        )
        .unwrap();

    let (status, content_type, bytes) = get_raw(
        state,
        "/data?pod=IT001E1&date_from=2025-08-01&date_to=2025-08-02&format=csv",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/csv"));
    assert_eq!(bytes, b"Data;Ora;kWh\n01/08/2025;10:00;0,25\n");
}

#[tokio::test]
async fn test_refresh_requires_api_key_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = test_state(dir.path()).await;
    let mut config = (*state.config).clone();
    config.api_key = Some("sesame".to_string());
    state.config = std::sync::Arc::new(config);

    let body = serde_json::json!({
        "pod": "IT001E1",
        "date_from": "2025-08-01",
        "date_to": "2025-08-02",
        "use_storage": true
    });

    let (status, envelope) = post_json(state.clone(), "/refresh", body.clone(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(envelope["error"]["code"], "UNAUTHORIZED");

    // A correct key passes the guard; the run then fails on input checks,
    // proving the request reached the handler.
    let bad_body = serde_json::json!({
        "pod": "",
        "date_from": "2025-08-01",
        "date_to": "2025-08-02",
        "use_storage": true
    });
    let (status, envelope) = post_json(state, "/refresh", bad_body, Some("sesame")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["error"]["code"], "INPUT_ERROR");
}

#[tokio::test]
async fn test_refresh_without_saved_session_is_precondition_failed() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let body = serde_json::json!({
        "pod": "IT001E1",
        "date_from": "2025-08-01",
        "date_to": "2025-08-02",
        "use_storage": true
    });

    let (status, envelope) = post_json(state, "/refresh", body, None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(envelope["ok"], false);
    assert_eq!(envelope["error"]["code"], "SESSION_UNAVAILABLE");
    // The run log travels with the failure.
    assert!(!envelope["log"].as_array().unwrap().is_empty());
}
