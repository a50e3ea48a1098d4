use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReadingRow {
    pub ts: String,
    #[serde(rename = "kWh")]
    pub value_kwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SnapshotRow {
    pub pod: String,
    pub date_from: String,
    pub date_to: String,
    pub created_at: DateTime<Utc>,
}
