use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pillar {
    Safety,
    Quality,
    Cost,
    Delivery,
    Production,
    People,
}

impl Pillar {
    pub const ALL: [Pillar; 6] = [
        Pillar::Safety,
        Pillar::Quality,
        Pillar::Cost,
        Pillar::Delivery,
        Pillar::Production,
        Pillar::People,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Pillar::Safety => "safety",
            Pillar::Quality => "quality",
            Pillar::Cost => "cost",
            Pillar::Delivery => "delivery",
            Pillar::Production => "production",
            Pillar::People => "people",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Pillar::Safety => "Safety",
            Pillar::Quality => "Quality",
            Pillar::Cost => "Cost",
            Pillar::Delivery => "Delivery",
            Pillar::Production => "Production",
            Pillar::People => "People",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pillar {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safety" => Ok(Pillar::Safety),
            "quality" => Ok(Pillar::Quality),
            "cost" => Ok(Pillar::Cost),
            "delivery" | "inventory" => Ok(Pillar::Delivery),
            "production" => Ok(Pillar::Production),
            "people" => Ok(Pillar::People),
            _ => Err(ValidationError::UnknownPillar(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ValidationError::UnknownPriority(value.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl ActionStatus {
    /// Display order for status breakdowns.
    pub const ALL: [ActionStatus; 4] = [
        ActionStatus::Open,
        ActionStatus::InProgress,
        ActionStatus::Completed,
        ActionStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionStatus::Open => "open",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
            ActionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ActionStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "todo" => Ok(ActionStatus::Open),
            "in_progress" | "in-progress" | "in progress" => Ok(ActionStatus::InProgress),
            "completed" | "done" | "closed" => Ok(ActionStatus::Completed),
            "cancelled" | "canceled" => Ok(ActionStatus::Cancelled),
            _ => Err(ValidationError::UnknownStatus(value.to_string())),
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation for one day, as fed to the chart strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedRecord {
    pub date: NaiveDate,
    pub value: f64,
}

impl DatedRecord {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingNote {
    pub id: Uuid,
    pub pillar: Pillar,
    pub note_date: NaiveDate,
    pub key_points: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionItem {
    pub id: Uuid,
    pub pillar: Pillar,
    pub description: String,
    pub assignee: Option<String>,
    pub priority: Priority,
    pub status: ActionStatus,
    pub created_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

/// A meeting note as submitted; upserted on `(pillar, note_date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeetingNote {
    pub pillar: Pillar,
    pub note_date: NaiveDate,
    pub key_points: Vec<String>,
}

impl NewMeetingNote {
    /// Trims key points and drops blank ones.
    pub fn new(pillar: Pillar, note_date: NaiveDate, key_points: Vec<String>) -> Self {
        let key_points = key_points
            .into_iter()
            .map(|point| point.trim().to_string())
            .filter(|point| !point.is_empty())
            .collect();
        Self {
            pillar,
            note_date,
            key_points,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key_points.is_empty() {
            return Err(ValidationError::Required {
                field: "key_points".to_string(),
            });
        }
        Ok(())
    }
}

/// Fields supplied when creating an action item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActionItem {
    pub pillar: Pillar,
    pub description: String,
    pub assignee: Option<String>,
    pub priority: Priority,
    pub status: ActionStatus,
    pub created_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

impl NewActionItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "description".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTranscript {
    pub transcript_date: NaiveDate,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}
