use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{ReadingRow, SnapshotRow};
use crate::portal::parser::LoadCurveRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub pod: String,
    pub date_from: String,
    pub date_to: String,
    #[serde(default)]
    pub use_storage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "generate_request_id")]
    pub request_id: String,
}

fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub ok: bool,
    pub request_id: String,
    pub pod: String,
    pub date_from: String,
    pub date_to: String,
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub rows: Vec<LoadCurveRow>,
    pub csv: String,
    pub file_name: String,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Csv,
}

fn default_format() -> DataFormat {
    DataFormat::Json
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataQuery {
    pub pod: String,
    pub date_from: String,
    pub date_to: String,
    #[serde(default = "default_format")]
    pub format: DataFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataResponse {
    pub ok: bool,
    pub pod: String,
    pub date_from: String,
    pub date_to: String,
    pub count: usize,
    pub readings: Vec<ReadingRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagResponse {
    pub ok: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage_state_path: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub webdriver_url: String,
    pub headless: bool,
    pub allow_origins: Vec<String>,
    pub readings_count: i64,
    pub cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<SnapshotRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgResponse {
    pub ok: bool,
    pub msg: String,
}
