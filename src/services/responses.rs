use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{column, decode_json, encode_json, pillar_column, questions};
use crate::error::{ServiceError, ServiceResult};
use crate::models::Pillar;
use crate::survey::{self, Answers, PillarResponse};

/// Validates the answers against the pillar's active questions, drops
/// answers to hidden questions, then upserts on `(pillar, response_date)`.
pub async fn upsert_response(
    pool: &PgPool,
    pillar: Pillar,
    response_date: NaiveDate,
    answers: &Answers,
) -> ServiceResult<PillarResponse> {
    let form = questions::fetch_questions(pool, pillar).await?;
    survey::validate_answers(&form, answers)?;
    let kept = survey::prune_hidden_answers(&form, answers);
    let encoded = encode_json(&kept, "answers")?;

    let row = sqlx::query(
        r#"
        INSERT INTO sqcdp.pillar_responses (id, pillar, response_date, answers)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (pillar, response_date) DO UPDATE
        SET answers = EXCLUDED.answers, updated_at = now()
        RETURNING pillar, response_date, answers
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(pillar.as_str())
    .bind(response_date)
    .bind(encoded)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to save survey response"))?;

    info!(%pillar, date = %response_date, answers = kept.len(), "survey response saved");
    response_from_row(&row)
}

pub async fn fetch_response(
    pool: &PgPool,
    pillar: Pillar,
    response_date: NaiveDate,
) -> ServiceResult<Option<PillarResponse>> {
    let row = sqlx::query(
        "SELECT pillar, response_date, answers FROM sqcdp.pillar_responses \
         WHERE pillar = $1 AND response_date = $2",
    )
    .bind(pillar.as_str())
    .bind(response_date)
    .fetch_optional(pool)
    .await
    .map_err(ServiceError::backend("failed to load survey response"))?;

    debug!(%pillar, date = %response_date, found = row.is_some(), "survey response lookup");
    row.as_ref().map(response_from_row).transpose()
}

fn response_from_row(row: &PgRow) -> ServiceResult<PillarResponse> {
    let answers: String = column(row, "answers")?;
    Ok(PillarResponse {
        pillar: pillar_column(row)?,
        response_date: column(row, "response_date")?,
        answers: decode_json(&answers, "answers")?,
    })
}
