use chrono::Utc;

use crate::db::models::{ReadingRow, SnapshotRow};
use crate::db::DbPool;
use crate::portal::parser::LoadCurveRow;

/// Writes one batch of parsed rows. Re-running the same range overwrites
/// in place, so corrected meter data wins.
pub async fn upsert_readings(
    pool: &DbPool,
    pod: &str,
    rows: &[LoadCurveRow],
) -> Result<u64, sqlx::Error> {
    let mut written = 0u64;
    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO readings (pod, ts, value_kwh, quality)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(pod)
        .bind(&row.ts)
        .bind(row.value_kwh)
        .bind(&row.quality)
        .execute(pool)
        .await?;
        written += result.rows_affected();
    }
    Ok(written)
}

/// Half-open scan: `ts >= from_ts AND ts < to_ts`. Timestamps sort
/// lexicographically in their canonical form.
pub async fn select_readings(
    pool: &DbPool,
    pod: &str,
    from_ts: &str,
    to_ts: &str,
) -> Result<Vec<ReadingRow>, sqlx::Error> {
    sqlx::query_as::<_, ReadingRow>(
        r#"
        SELECT ts, value_kwh, quality FROM readings
        WHERE pod = $1 AND ts >= $2 AND ts < $3
        ORDER BY ts ASC
        "#,
    )
    .bind(pod)
    .bind(from_ts)
    .bind(to_ts)
    .fetch_all(pool)
    .await
}

pub async fn count_readings(pool: &DbPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM readings")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn record_snapshot(
    pool: &DbPool,
    pod: &str,
    date_from: &str,
    date_to: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO snapshots (pod, date_from, date_to, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(pod)
    .bind(date_from)
    .bind(date_to)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn latest_snapshot(pool: &DbPool) -> Result<Option<SnapshotRow>, sqlx::Error> {
    sqlx::query_as::<_, SnapshotRow>(
        r#"
        SELECT pod, date_from, date_to, created_at FROM snapshots
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}
