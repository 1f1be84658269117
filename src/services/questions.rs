use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{column, decode_json, encode_json, pillar_column};
use crate::error::{ServiceError, ServiceResult, ValidationError, ValidationErrors};
use crate::models::Pillar;
use crate::survey::{Condition, PillarQuestion, QuestionKind};

const QUESTION_COLUMNS: &str =
    "pillar, question_id, prompt, kind, required, conditional, sort_order, is_active";

/// Active questions for a pillar in display order.
pub async fn fetch_questions(pool: &PgPool, pillar: Pillar) -> ServiceResult<Vec<PillarQuestion>> {
    let records = sqlx::query(&format!(
        "SELECT {QUESTION_COLUMNS} FROM sqcdp.pillar_questions \
         WHERE pillar = $1 AND is_active ORDER BY sort_order, question_id"
    ))
    .bind(pillar.as_str())
    .fetch_all(pool)
    .await
    .map_err(ServiceError::backend("failed to load pillar questions"))?;

    debug!(%pillar, count = records.len(), "pillar questions loaded");
    records.iter().map(question_from_row).collect()
}

/// Creates or replaces a question keyed by pillar and question id. Saving a
/// retired question brings it back.
pub async fn upsert_question(pool: &PgPool, question: &PillarQuestion) -> ServiceResult<PillarQuestion> {
    validate_question(question).map_err(ValidationErrors::from)?;
    let kind = encode_json(&question.kind, "kind")?;
    let conditional = question
        .conditional
        .as_ref()
        .map(|condition| encode_json(condition, "conditional"))
        .transpose()?;

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO sqcdp.pillar_questions
        (id, pillar, question_id, prompt, kind, required, conditional, sort_order, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true)
        ON CONFLICT (pillar, question_id) DO UPDATE
        SET prompt = EXCLUDED.prompt,
            kind = EXCLUDED.kind,
            required = EXCLUDED.required,
            conditional = EXCLUDED.conditional,
            sort_order = EXCLUDED.sort_order,
            is_active = true
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(question.pillar.as_str())
    .bind(question_key(&question.question_id))
    .bind(question.prompt.trim())
    .bind(kind)
    .bind(question.required)
    .bind(conditional)
    .bind(question.sort_order)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to save pillar question"))?;

    info!(pillar = %question.pillar, question = %question.question_id, "pillar question saved");
    question_from_row(&row)
}

/// Hides a question from future forms without deleting past answers.
pub async fn retire_question(pool: &PgPool, pillar: Pillar, question_id: &str) -> ServiceResult<bool> {
    let result = sqlx::query(
        "UPDATE sqcdp.pillar_questions SET is_active = false \
         WHERE pillar = $1 AND question_id = $2 AND is_active",
    )
    .bind(pillar.as_str())
    .bind(question_key(question_id))
    .execute(pool)
    .await
    .map_err(ServiceError::backend("failed to retire pillar question"))?;

    let retired = result.rows_affected() > 0;
    info!(%pillar, question = question_id, retired, "pillar question retire requested");
    Ok(retired)
}

/// Question ids are stored and matched trimmed.
fn question_key(question_id: &str) -> &str {
    question_id.trim()
}

pub fn validate_question(question: &PillarQuestion) -> Result<(), ValidationError> {
    if question_key(&question.question_id).is_empty() {
        return Err(ValidationError::Required {
            field: "question_id".to_string(),
        });
    }
    if question.prompt.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "prompt".to_string(),
        });
    }
    match &question.kind {
        QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options }
            if options.is_empty() =>
        {
            Err(ValidationError::Required {
                field: "options".to_string(),
            })
        }
        QuestionKind::Rating { min, max } if min >= max => Err(ValidationError::InvalidBounds {
            field: question.question_id.clone(),
            min: *min,
            max: *max,
        }),
        _ => Ok(()),
    }
}

fn question_from_row(row: &PgRow) -> ServiceResult<PillarQuestion> {
    let kind: String = column(row, "kind")?;
    let conditional: Option<String> = column(row, "conditional")?;
    Ok(PillarQuestion {
        pillar: pillar_column(row)?,
        question_id: column(row, "question_id")?,
        prompt: column(row, "prompt")?,
        kind: decode_json::<QuestionKind>(&kind, "kind")?,
        required: column(row, "required")?,
        conditional: conditional
            .as_deref()
            .map(|raw| decode_json::<Condition>(raw, "conditional"))
            .transpose()?,
        sort_order: column(row, "sort_order")?,
        is_active: column(row, "is_active")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionKind) -> PillarQuestion {
        PillarQuestion {
            pillar: Pillar::Production,
            question_id: "downtime".to_string(),
            prompt: "Minutes of unplanned downtime".to_string(),
            kind,
            required: true,
            conditional: None,
            sort_order: 1,
            is_active: true,
        }
    }

    #[test]
    fn choice_questions_need_options() {
        let err = validate_question(&question(QuestionKind::SingleChoice { options: vec![] })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Required {
                field: "options".to_string()
            }
        );
    }

    #[test]
    fn rating_bounds_must_be_ordered() {
        assert!(validate_question(&question(QuestionKind::Rating { min: 5, max: 1 })).is_err());
        assert!(validate_question(&question(QuestionKind::Rating { min: 1, max: 5 })).is_ok());
    }

    #[test]
    fn padded_ids_match_the_stored_key() {
        let stored = question(QuestionKind::Number);
        assert_eq!(question_key(" downtime  "), question_key(&stored.question_id));
        assert_eq!(question_key("\tdowntime\n"), "downtime");
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut q = question(QuestionKind::Number);
        q.prompt = "  ".to_string();
        assert!(matches!(validate_question(&q), Err(ValidationError::Required { .. })));
    }
}
