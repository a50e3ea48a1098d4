use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Days, Utc};

use crate::db::readings;
use crate::http::auth::require_api_key;
use crate::http::{
    ApiError, AppState, DataFormat, DataQuery, DataResponse, DiagResponse, HealthResponse,
    MsgResponse, RefreshRequest, RefreshResponse,
};
use crate::portal::{refresh_load_curve, RunLog, SessionParams, StateStore};
use crate::utils::{mask_sensitive, parse_input_date};

pub fn create_router(state: AppState) -> Router {
    // Only the mutating route sits behind the API key.
    let protected_routes = Router::new()
        .route("/refresh", post(refresh_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(health_handler))
        .route("/diag", get(diag_handler))
        .route("/data", get(data_handler));

    public_routes.merge(protected_routes).with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(MsgResponse {
        ok: true,
        msg: "see /healthz, /diag, /data, /refresh".to_string(),
    })
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    };

    (StatusCode::OK, Json(response))
}

async fn diag_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = StateStore::new(&state.config.storage_state_path);
    let readings_count = readings::count_readings(&state.db_pool).await?;
    let last_refresh = readings::latest_snapshot(&state.db_pool).await?;

    let response = DiagResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        storage_state_path: state.config.storage_state_path.clone(),
        exists: store.exists(),
        size_bytes: store.size_bytes(),
        webdriver_url: state.config.webdriver_url.clone(),
        headless: state.config.headless,
        allow_origins: state.config.allow_origins.clone(),
        readings_count,
        cache_entries: state.cache.entry_count(),
        last_refresh,
    };

    Ok((StatusCode::OK, Json(response)))
}

async fn data_handler(
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> Result<Response, ApiError> {
    let from = parse_input_date(&query.date_from).map_err(ApiError::BadRequest)?;
    let to = parse_input_date(&query.date_to).map_err(ApiError::BadRequest)?;
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "date_from {} is after date_to {}",
            query.date_from, query.date_to
        )));
    }

    let pod = query.pod.trim().to_uppercase();
    let from_iso = from.format("%Y-%m-%d").to_string();
    let to_iso = to.format("%Y-%m-%d").to_string();

    match query.format {
        DataFormat::Csv => match state.cache.load_csv(&pod, &from_iso, &to_iso) {
            Some(csv) => {
                Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
            }
            None => Err(ApiError::NotFound(format!(
                "no cached export for {} {}..{}",
                pod, from_iso, to_iso
            ))),
        },
        DataFormat::Json => {
            // End date is inclusive: scan up to midnight of the next day.
            let upper = to.checked_add_days(Days::new(1)).unwrap_or(to);
            let from_ts = format!("{}T00:00:00", from_iso);
            let to_ts = format!("{}T00:00:00", upper.format("%Y-%m-%d"));

            let rows = readings::select_readings(&state.db_pool, &pod, &from_ts, &to_ts).await?;
            let response = DataResponse {
                ok: true,
                pod,
                date_from: from_iso,
                date_to: to_iso,
                count: rows.len(),
                readings: rows,
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
    }
}

async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        "📥 refresh requested: request_id={} pod={}",
        request.request_id,
        mask_sensitive(&request.pod)
    );

    let from = parse_input_date(&request.date_from).map_err(ApiError::BadRequest)?;
    let to = parse_input_date(&request.date_to).map_err(ApiError::BadRequest)?;
    let from_iso = from.format("%Y-%m-%d").to_string();
    let to_iso = to.format("%Y-%m-%d").to_string();

    let mut log = RunLog::new();
    log.push(format!(
        "request: pod={} range={}..{} use_storage={} user={}",
        mask_sensitive(&request.pod),
        from_iso,
        to_iso,
        request.use_storage,
        request
            .username
            .as_deref()
            .map(mask_sensitive)
            .unwrap_or_else(|| "-".to_string())
    ));

    // Request credentials win over the configured fallback pair.
    let params = SessionParams {
        pod: request.pod.clone(),
        date_from: request.date_from.clone(),
        date_to: request.date_to.clone(),
        use_storage: request.use_storage,
        username: request
            .username
            .clone()
            .or_else(|| state.config.portal_username.clone()),
        password: request
            .password
            .clone()
            .or_else(|| state.config.portal_password.clone()),
    };

    let outcome = match refresh_load_curve(&state.config, &params, &mut log).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(
                "❌ refresh failed: request_id={} error={}",
                request.request_id,
                e
            );
            return Err(ApiError::session(e, log.into_lines()));
        }
    };

    let pod = params.pod_normalized();
    match readings::upsert_readings(&state.db_pool, &pod, &outcome.rows).await {
        Ok(n) => tracing::debug!("💾 {} readings stored for {}", n, mask_sensitive(&pod)),
        Err(e) => {
            tracing::warn!("⚠️ readings not stored: {}", e);
            log.push(format!("warning: readings not stored: {}", e));
        }
    }
    if let Err(e) = readings::record_snapshot(&state.db_pool, &pod, &from_iso, &to_iso).await {
        tracing::warn!("⚠️ snapshot not recorded: {}", e);
        log.push(format!("warning: snapshot not recorded: {}", e));
    }
    if let Err(e) = state
        .cache
        .store(&pod, &from_iso, &to_iso, &outcome.csv, &outcome.rows)
    {
        tracing::warn!("⚠️ export not cached: {}", e);
        log.push(format!("warning: export not cached: {}", e));
    }

    tracing::info!(
        "✅ refresh complete: request_id={} rows={} skipped={}",
        request.request_id,
        outcome.stats.rows_used,
        outcome.stats.rows_skipped
    );

    let response = RefreshResponse {
        ok: true,
        request_id: request.request_id,
        pod,
        date_from: from_iso,
        date_to: to_iso,
        rows_parsed: outcome.stats.rows_used,
        rows_skipped: outcome.stats.rows_skipped,
        rows: outcome.rows,
        csv: outcome.csv,
        file_name: outcome.file_name,
        log: log.into_lines(),
    };

    Ok((StatusCode::OK, Json(response)))
}
