use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{ServiceResult, ValidationError};
use crate::models::{ActionStatus, NewActionItem, NewMeetingNote, Pillar, Priority};
use crate::services;

const LEGACY_DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fixture is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{section}[{index}]: invalid date '{value}' (expected e.g. 'Jul 22, 2025')")]
    InvalidDate {
        section: &'static str,
        index: usize,
        value: String,
    },
    #[error("{section}[{index}]: {source}")]
    InvalidEntry {
        section: &'static str,
        index: usize,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFixture {
    #[serde(default)]
    pub meeting_notes: Vec<LegacyMeetingNote>,
    #[serde(default)]
    pub action_items: Vec<LegacyActionItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMeetingNote {
    pub pillar: String,
    pub created_date: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyActionItem {
    pub pillar: String,
    pub created_date: String,
    pub description: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
}

/// Notes are ordered by pillar then date; actions keep fixture order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    pub notes: Vec<NewMeetingNote>,
    pub actions: Vec<NewActionItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub notes_written: usize,
    pub actions_inserted: usize,
    pub actions_skipped: usize,
}

/// Parses the fixture date format, e.g. `Jul 22, 2025`.
pub fn parse_legacy_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), LEGACY_DATE_FORMAT).ok()
}

fn parse_any_date(value: &str) -> Option<NaiveDate> {
    parse_legacy_date(value).or_else(|| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok())
}

pub fn load_fixture(path: &Path) -> Result<LegacyFixture, LegacyError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LegacyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Notes sharing a pillar and date are merged into one.
pub fn plan_migration(fixture: &LegacyFixture) -> Result<MigrationPlan, LegacyError> {
    let mut notes: BTreeMap<(Pillar, NaiveDate), Vec<String>> = BTreeMap::new();

    for (index, note) in fixture.meeting_notes.iter().enumerate() {
        let section = "meetingNotes";
        let pillar = parse_pillar(section, index, &note.pillar)?;
        let note_date = parse_legacy_date(&note.created_date).ok_or_else(|| LegacyError::InvalidDate {
            section,
            index,
            value: note.created_date.clone(),
        })?;

        let candidate = NewMeetingNote::new(pillar, note_date, note.key_points.clone());
        if candidate.key_points.is_empty() {
            warn!(index, pillar = %pillar, "skipping legacy meeting note without key points");
            continue;
        }
        notes
            .entry((pillar, note_date))
            .or_default()
            .extend(candidate.key_points);
    }

    let mut actions = Vec::with_capacity(fixture.action_items.len());
    for (index, item) in fixture.action_items.iter().enumerate() {
        actions.push(plan_action(index, item)?);
    }

    Ok(MigrationPlan {
        notes: notes
            .into_iter()
            .map(|((pillar, note_date), key_points)| NewMeetingNote {
                pillar,
                note_date,
                key_points,
            })
            .collect(),
        actions,
    })
}

fn plan_action(index: usize, item: &LegacyActionItem) -> Result<NewActionItem, LegacyError> {
    let section = "actionItems";
    let entry_error = |source| LegacyError::InvalidEntry {
        section,
        index,
        source,
    };

    let pillar = parse_pillar(section, index, &item.pillar)?;
    let created_date = parse_legacy_date(&item.created_date).ok_or_else(|| LegacyError::InvalidDate {
        section,
        index,
        value: item.created_date.clone(),
    })?;

    let due_date = match item.due_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(parse_any_date(value).ok_or_else(|| LegacyError::InvalidDate {
            section,
            index,
            value: value.to_string(),
        })?),
    };

    let priority = match item.priority.as_deref() {
        Some(value) if !value.trim().is_empty() => value.parse::<Priority>().map_err(entry_error)?,
        _ => Priority::default(),
    };
    let status = match item.status.as_deref() {
        Some(value) if !value.trim().is_empty() => value.parse::<ActionStatus>().map_err(entry_error)?,
        _ => ActionStatus::default(),
    };

    let action = NewActionItem {
        pillar,
        description: item.description.trim().to_string(),
        assignee: item
            .assignee
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        priority,
        status,
        created_date,
        due_date,
    };
    action.validate().map_err(entry_error)?;
    Ok(action)
}

fn parse_pillar(section: &'static str, index: usize, value: &str) -> Result<Pillar, LegacyError> {
    value
        .parse::<Pillar>()
        .map_err(|source| LegacyError::InvalidEntry {
            section,
            index,
            source,
        })
}

pub async fn migrate(pool: &PgPool, plan: &MigrationPlan) -> ServiceResult<MigrationSummary> {
    let mut summary = MigrationSummary::default();

    for note in &plan.notes {
        services::notes::upsert_meeting_note(pool, note).await?;
        summary.notes_written += 1;
    }

    for action in &plan.actions {
        if services::actions::action_exists(pool, action).await? {
            summary.actions_skipped += 1;
            continue;
        }
        services::actions::create_action_item(pool, action).await?;
        summary.actions_inserted += 1;
    }

    info!(
        notes = summary.notes_written,
        actions = summary.actions_inserted,
        skipped = summary.actions_skipped,
        "legacy fixture migrated"
    );
    Ok(summary)
}
