use std::path::Path;

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::column;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{DatedRecord, Pillar};

pub async fn upsert_metric(
    pool: &PgPool,
    pillar: Pillar,
    metric_date: NaiveDate,
    value: f64,
) -> ServiceResult<DatedRecord> {
    let row = sqlx::query(
        r#"
        INSERT INTO sqcdp.pillar_metrics (id, pillar, metric_date, value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (pillar, metric_date) DO UPDATE
        SET value = EXCLUDED.value
        RETURNING metric_date, value
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(pillar.as_str())
    .bind(metric_date)
    .bind(value)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to save pillar metric"))?;

    info!(%pillar, date = %metric_date, value, "pillar metric saved");
    Ok(DatedRecord::new(
        column(&row, "metric_date")?,
        column(&row, "value")?,
    ))
}

/// Metric values for one pillar between `from` and `to` inclusive, oldest
/// first.
pub async fn fetch_metrics(
    pool: &PgPool,
    pillar: Pillar,
    from: NaiveDate,
    to: NaiveDate,
) -> ServiceResult<Vec<DatedRecord>> {
    let records = sqlx::query(
        "SELECT metric_date, value FROM sqcdp.pillar_metrics \
         WHERE pillar = $1 AND metric_date >= $2 AND metric_date <= $3 ORDER BY metric_date",
    )
    .bind(pillar.as_str())
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .map_err(ServiceError::backend("failed to load pillar metrics"))?;

    debug!(%pillar, count = records.len(), %from, %to, "pillar metrics loaded");
    records
        .iter()
        .map(|row| -> ServiceResult<DatedRecord> {
            Ok(DatedRecord::new(
                column(row, "metric_date")?,
                column(row, "value")?,
            ))
        })
        .collect()
}

#[derive(Debug, serde::Deserialize)]
struct MetricCsvRow {
    pillar: String,
    date: NaiveDate,
    value: f64,
}

/// Bulk-loads `pillar,date,value` rows, upserting each. Returns the number
/// of rows written.
pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut written = 0usize;

    for result in reader.deserialize::<MetricCsvRow>() {
        let row = result?;
        let pillar = row.pillar.parse::<Pillar>()?;
        upsert_metric(pool, pillar, row.date, row.value).await?;
        written += 1;
    }

    Ok(written)
}
