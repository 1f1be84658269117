use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::models::{ActionStatus, NewActionItem, NewMeetingNote, Pillar, Priority};
use crate::services;
use crate::survey::{Condition, PillarQuestion, QuestionKind};

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config.require_database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!(max_connections = config.max_connections, "connected to board database");
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply migrations")?;
    Ok(())
}

/// Loads a starter question set per pillar plus a few weeks of metrics,
/// a meeting note and two action items ending at `today`.
pub async fn seed(pool: &PgPool, today: NaiveDate) -> anyhow::Result<()> {
    for question in seed_questions() {
        services::questions::upsert_question(pool, &question).await?;
    }

    let daily_metrics = [
        (Pillar::Safety, [0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]),
        (Pillar::Quality, [4.0, 3.0, 5.0, 2.0, 6.0, 1.0, 0.0]),
        (Pillar::Cost, [1200.0, 950.0, 1100.0, 1300.0, 870.0, 400.0, 0.0]),
        (Pillar::Delivery, [96.0, 98.0, 91.0, 99.0, 97.0, 100.0, 0.0]),
        (Pillar::Production, [412.0, 398.0, 430.0, 401.0, 415.0, 220.0, 0.0]),
        (Pillar::People, [1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 0.0]),
    ];

    for (pillar, pattern) in daily_metrics {
        for days_ago in 1..=42i64 {
            let date = today - Duration::days(days_ago);
            let value = pattern[(days_ago % 7) as usize];
            // Every seventh day stays unrecorded so charts show gaps.
            if days_ago % 7 == 6 {
                continue;
            }
            services::metrics::upsert_metric(pool, pillar, date, value).await?;
        }
    }

    let note = NewMeetingNote::new(
        Pillar::Safety,
        today - Duration::days(1),
        vec![
            "Near miss at dock 4: forklift and pedestrian crossing".to_string(),
            "PPE audit passed on both shifts".to_string(),
        ],
    );
    services::notes::upsert_meeting_note(pool, &note).await?;

    let actions = vec![
        NewActionItem {
            pillar: Pillar::Safety,
            description: "Repaint pedestrian lane at dock 4".to_string(),
            assignee: Some("Maintenance".to_string()),
            priority: Priority::High,
            status: ActionStatus::Open,
            created_date: today - Duration::days(1),
            due_date: Some(today + Duration::days(6)),
        },
        NewActionItem {
            pillar: Pillar::Quality,
            description: "Recalibrate torque gauge on line 2".to_string(),
            assignee: Some("Quality tech".to_string()),
            priority: Priority::Medium,
            status: ActionStatus::InProgress,
            created_date: today - Duration::days(3),
            due_date: Some(today + Duration::days(2)),
        },
    ];

    for action in &actions {
        if !services::actions::action_exists(pool, action).await? {
            services::actions::create_action_item(pool, action).await?;
        }
    }

    info!(%today, "seed data loaded");
    Ok(())
}

fn seed_questions() -> Vec<PillarQuestion> {
    let yes_no = |pillar, id: &str, prompt: &str, order| PillarQuestion {
        pillar,
        question_id: id.to_string(),
        prompt: prompt.to_string(),
        kind: QuestionKind::YesNo,
        required: true,
        conditional: None,
        sort_order: order,
        is_active: true,
    };
    let follow_up = |pillar, id: &str, prompt: &str, depends_on: &str, order| PillarQuestion {
        pillar,
        question_id: id.to_string(),
        prompt: prompt.to_string(),
        kind: QuestionKind::Text { min_length: 10 },
        required: true,
        conditional: Some(Condition {
            depends_on: depends_on.to_string(),
            show_when: vec!["yes".to_string()],
        }),
        sort_order: order,
        is_active: true,
    };

    vec![
        yes_no(Pillar::Safety, "incident", "Any safety incident or near miss since last meeting?", 1),
        follow_up(Pillar::Safety, "incident_details", "Describe what happened", "incident", 2),
        yes_no(Pillar::Quality, "customer_complaint", "Any customer complaint received?", 1),
        follow_up(Pillar::Quality, "complaint_details", "Which part and what defect?", "customer_complaint", 2),
        PillarQuestion {
            pillar: Pillar::Cost,
            question_id: "overtime_hours".to_string(),
            prompt: "Overtime hours yesterday".to_string(),
            kind: QuestionKind::Number,
            required: true,
            conditional: None,
            sort_order: 1,
            is_active: true,
        },
        PillarQuestion {
            pillar: Pillar::Delivery,
            question_id: "late_shipments".to_string(),
            prompt: "Shipments that missed their window".to_string(),
            kind: QuestionKind::Number,
            required: true,
            conditional: None,
            sort_order: 1,
            is_active: true,
        },
        PillarQuestion {
            pillar: Pillar::Production,
            question_id: "constraint".to_string(),
            prompt: "Main constraint today".to_string(),
            kind: QuestionKind::SingleChoice {
                options: vec![
                    "staffing".to_string(),
                    "material".to_string(),
                    "equipment".to_string(),
                    "none".to_string(),
                ],
            },
            required: true,
            conditional: None,
            sort_order: 1,
            is_active: true,
        },
        PillarQuestion {
            pillar: Pillar::People,
            question_id: "morale".to_string(),
            prompt: "Team morale".to_string(),
            kind: QuestionKind::Rating { min: 1, max: 5 },
            required: false,
            conditional: None,
            sort_order: 1,
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::questions::validate_question;

    #[test]
    fn seed_questions_are_valid_and_unique() {
        let questions = seed_questions();
        for question in &questions {
            assert!(validate_question(question).is_ok(), "{}", question.question_id);
        }
        let mut keys: Vec<(Pillar, &str)> = questions
            .iter()
            .map(|q| (q.pillar, q.question_id.as_str()))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), questions.len());
        assert!(Pillar::ALL
            .iter()
            .all(|pillar| questions.iter().any(|q| q.pillar == *pillar)));
    }

    #[test]
    fn follow_ups_depend_on_questions_in_same_pillar() {
        let questions = seed_questions();
        for question in questions.iter().filter(|q| q.conditional.is_some()) {
            let depends_on = &question.conditional.as_ref().unwrap().depends_on;
            assert!(questions
                .iter()
                .any(|q| q.pillar == question.pillar && &q.question_id == depends_on));
        }
    }
}
