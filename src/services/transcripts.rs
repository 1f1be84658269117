use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::column;
use crate::error::{ServiceError, ServiceResult, ValidationError, ValidationErrors};
use crate::models::DailyTranscript;
use crate::sanitize::sanitize_transcript;

pub const MIN_TRANSCRIPT_CHARS: usize = 20;

/// Sanitizes raw transcript text and rejects it if too little remains.
pub fn prepare_transcript(raw: &str) -> Result<String, ValidationError> {
    let content = sanitize_transcript(raw);
    let actual = content.chars().count();
    if actual == 0 {
        return Err(ValidationError::Required {
            field: "transcript".to_string(),
        });
    }
    if actual < MIN_TRANSCRIPT_CHARS {
        return Err(ValidationError::TooShort {
            field: "transcript".to_string(),
            min: MIN_TRANSCRIPT_CHARS,
            actual,
        });
    }
    Ok(content)
}

pub async fn save_transcript(
    pool: &PgPool,
    transcript_date: NaiveDate,
    raw: &str,
) -> ServiceResult<DailyTranscript> {
    let content = prepare_transcript(raw).map_err(ValidationErrors::from)?;

    let row = sqlx::query(
        r#"
        INSERT INTO sqcdp.daily_transcripts (id, transcript_date, content)
        VALUES ($1, $2, $3)
        ON CONFLICT (transcript_date) DO UPDATE
        SET content = EXCLUDED.content, updated_at = now()
        RETURNING transcript_date, content, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(transcript_date)
    .bind(&content)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to save transcript"))?;

    info!(date = %transcript_date, chars = content.chars().count(), "transcript saved");
    transcript_from_row(&row)
}

pub async fn fetch_transcript(
    pool: &PgPool,
    transcript_date: NaiveDate,
) -> ServiceResult<Option<DailyTranscript>> {
    let row = sqlx::query(
        "SELECT transcript_date, content, updated_at FROM sqcdp.daily_transcripts \
         WHERE transcript_date = $1",
    )
    .bind(transcript_date)
    .fetch_optional(pool)
    .await
    .map_err(ServiceError::backend("failed to load transcript"))?;

    row.as_ref().map(transcript_from_row).transpose()
}

pub async fn fetch_transcripts(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> ServiceResult<Vec<DailyTranscript>> {
    let records = sqlx::query(
        "SELECT transcript_date, content, updated_at FROM sqcdp.daily_transcripts \
         WHERE transcript_date >= $1 AND transcript_date <= $2 ORDER BY transcript_date DESC",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .map_err(ServiceError::backend("failed to load transcripts"))?;

    debug!(count = records.len(), %from, %to, "transcripts loaded");
    records.iter().map(transcript_from_row).collect()
}

pub async fn delete_transcript(pool: &PgPool, transcript_date: NaiveDate) -> ServiceResult<bool> {
    let result = sqlx::query("DELETE FROM sqcdp.daily_transcripts WHERE transcript_date = $1")
        .bind(transcript_date)
        .execute(pool)
        .await
        .map_err(ServiceError::backend("failed to delete transcript"))?;

    let deleted = result.rows_affected() > 0;
    info!(date = %transcript_date, deleted, "transcript delete requested");
    Ok(deleted)
}

fn transcript_from_row(row: &PgRow) -> ServiceResult<DailyTranscript> {
    Ok(DailyTranscript {
        transcript_date: column(row, "transcript_date")?,
        content: column(row, "content")?,
        updated_at: column(row, "updated_at")?,
    })
}
