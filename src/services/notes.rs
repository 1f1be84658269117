use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{column, decode_json, encode_json, pillar_column};
use crate::error::{ServiceError, ServiceResult, ValidationErrors};
use crate::models::{MeetingNote, NewMeetingNote, Pillar};

const NOTE_COLUMNS: &str = "id, pillar, note_date, key_points, created_at";

pub async fn upsert_meeting_note(pool: &PgPool, note: &NewMeetingNote) -> ServiceResult<MeetingNote> {
    note.validate().map_err(ValidationErrors::from)?;
    let key_points = encode_json(&note.key_points, "key_points")?;

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO sqcdp.meeting_notes (id, pillar, note_date, key_points)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (pillar, note_date) DO UPDATE
        SET key_points = EXCLUDED.key_points
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(note.pillar.as_str())
    .bind(note.note_date)
    .bind(key_points)
    .fetch_one(pool)
    .await
    .map_err(ServiceError::backend("failed to save meeting note"))?;

    info!(pillar = %note.pillar, date = %note.note_date, points = note.key_points.len(), "meeting note saved");
    note_from_row(&row)
}

pub async fn fetch_meeting_note(
    pool: &PgPool,
    pillar: Pillar,
    note_date: NaiveDate,
) -> ServiceResult<Option<MeetingNote>> {
    let row = sqlx::query(&format!(
        "SELECT {NOTE_COLUMNS} FROM sqcdp.meeting_notes WHERE pillar = $1 AND note_date = $2"
    ))
    .bind(pillar.as_str())
    .bind(note_date)
    .fetch_optional(pool)
    .await
    .map_err(ServiceError::backend("failed to load meeting note"))?;

    row.as_ref().map(note_from_row).transpose()
}

/// Notes between `from` and `to` inclusive, newest first. `pillar` of `None`
/// returns every pillar.
pub async fn fetch_meeting_notes(
    pool: &PgPool,
    pillar: Option<Pillar>,
    from: NaiveDate,
    to: NaiveDate,
) -> ServiceResult<Vec<MeetingNote>> {
    let mut query = format!(
        "SELECT {NOTE_COLUMNS} FROM sqcdp.meeting_notes WHERE note_date >= $1 AND note_date <= $2"
    );
    if pillar.is_some() {
        query.push_str(" AND pillar = $3");
    }
    query.push_str(" ORDER BY note_date DESC, pillar");

    let mut rows = sqlx::query(&query).bind(from).bind(to);
    if let Some(value) = pillar {
        rows = rows.bind(value.as_str());
    }

    let records = rows
        .fetch_all(pool)
        .await
        .map_err(ServiceError::backend("failed to load meeting notes"))?;
    debug!(count = records.len(), %from, %to, "meeting notes loaded");

    records.iter().map(note_from_row).collect()
}

fn note_from_row(row: &PgRow) -> ServiceResult<MeetingNote> {
    let key_points: String = column(row, "key_points")?;
    Ok(MeetingNote {
        id: column(row, "id")?,
        pillar: pillar_column(row)?,
        note_date: column(row, "note_date")?,
        key_points: decode_json(&key_points, "key_points")?,
        created_at: column(row, "created_at")?,
    })
}
