use std::fmt::Write;

use chrono::NaiveDate;

use crate::charts;
use crate::models::{ActionItem, ActionStatus, MeetingNote, Pillar};
use crate::periods::{Bucket, DataType, TimePeriod};

/// Everything the board report shows for one pillar.
#[derive(Debug, Clone)]
pub struct PillarSnapshot {
    pub pillar: Pillar,
    pub series: Vec<Bucket>,
    pub actions: Vec<ActionItem>,
    pub latest_note: Option<MeetingNote>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub recorded: usize,
    pub missing: usize,
    pub future: usize,
    pub total: f64,
    pub target_total: f64,
}

pub fn summarize_series(series: &[Bucket]) -> SeriesSummary {
    let mut summary = SeriesSummary {
        recorded: 0,
        missing: 0,
        future: 0,
        total: 0.0,
        target_total: 0.0,
    };

    for bucket in series {
        match bucket.data_type {
            DataType::Recorded => summary.recorded += 1,
            DataType::Missing => summary.missing += 1,
            DataType::Future => {
                summary.future += 1;
                continue;
            }
        }
        summary.total += bucket.value;
        summary.target_total += bucket.target;
    }

    summary
}

pub fn build_report(reference: NaiveDate, period: TimePeriod, snapshots: &[PillarSnapshot]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# SQCDP Board Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} view)",
        reference,
        period.label().to_lowercase()
    );

    for snapshot in snapshots {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", snapshot.pillar.title());

        let summary = summarize_series(&snapshot.series);
        let _ = writeln!(
            output,
            "Total {:.1} against target {:.1} ({} recorded, {} missing, {} upcoming)",
            summary.total, summary.target_total, summary.recorded, summary.missing, summary.future
        );
        for bucket in snapshot.series.iter().filter(|b| b.data_type != DataType::Future) {
            let marker = match bucket.data_type {
                DataType::Recorded => "",
                _ => " (no data)",
            };
            let _ = writeln!(output, "- {}: {:.1}{}", bucket.label, bucket.value, marker);
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Action Items");
        if snapshot.actions.is_empty() {
            let _ = writeln!(output, "No action items recorded.");
        } else {
            let mix = charts::status_mix(&snapshot.actions);
            let parts: Vec<String> = mix
                .iter()
                .filter(|slice| slice.count > 0)
                .map(|slice| format!("{} {}", slice.count, slice.status))
                .collect();
            let _ = writeln!(output, "{}", parts.join(", "));

            let mut open: Vec<&ActionItem> = snapshot
                .actions
                .iter()
                .filter(|a| matches!(a.status, ActionStatus::Open | ActionStatus::InProgress))
                .collect();
            open.sort_by(|a, b| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.created_date.cmp(&b.created_date),
            });
            for action in open.iter().take(5) {
                let due = action
                    .due_date
                    .map(|d| format!(", due {d}"))
                    .unwrap_or_default();
                let overdue = match action.due_date {
                    Some(d) if d < reference => " OVERDUE",
                    _ => "",
                };
                let _ = writeln!(
                    output,
                    "- [{}] {} ({}{}){}",
                    action.priority,
                    action.description,
                    action.assignee.as_deref().unwrap_or("unassigned"),
                    due,
                    overdue
                );
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Latest Meeting Notes");
        match &snapshot.latest_note {
            Some(note) => {
                let _ = writeln!(output, "From {}:", note.note_date);
                for point in &note.key_points {
                    let _ = writeln!(output, "- {point}");
                }
            }
            None => {
                let _ = writeln!(output, "No meeting notes in this window.");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatedRecord, Priority};
    use chrono::Utc;
    use uuid::Uuid;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn action(description: &str, status: ActionStatus, due: Option<NaiveDate>) -> ActionItem {
        ActionItem {
            id: Uuid::new_v4(),
            pillar: Pillar::Safety,
            description: description.to_string(),
            assignee: Some("Dana".to_string()),
            priority: Priority::High,
            status,
            created_date: date(2025, 7, 1),
            due_date: due,
        }
    }

    #[test]
    fn summary_skips_future_buckets() {
        let records = vec![DatedRecord::new(date(2025, 7, 14), 2.0)];
        let series = TimePeriod::Week.bucket(&records, date(2025, 7, 16), 1.0);
        let summary = summarize_series(&series);
        assert_eq!(summary.recorded, 1);
        assert_eq!(summary.missing, 2);
        assert_eq!(summary.future, 4);
        assert_eq!(summary.total, 2.0);
        assert_eq!(summary.target_total, 3.0);
    }

    #[test]
    fn report_lists_series_actions_and_notes() {
        let reference = date(2025, 7, 16);
        let records = vec![DatedRecord::new(date(2025, 7, 14), 2.0)];
        let snapshot = PillarSnapshot {
            pillar: Pillar::Safety,
            series: TimePeriod::Week.bucket(&records, reference, 0.0),
            actions: vec![
                action("Repaint lane", ActionStatus::Open, Some(date(2025, 7, 10))),
                action("Close audit", ActionStatus::Completed, None),
            ],
            latest_note: Some(MeetingNote {
                id: Uuid::new_v4(),
                pillar: Pillar::Safety,
                note_date: date(2025, 7, 15),
                key_points: vec!["Near miss at dock 4".to_string()],
                created_at: Utc::now(),
            }),
        };

        let report = build_report(reference, TimePeriod::Week, &[snapshot]);
        assert!(report.starts_with("# SQCDP Board Report\nGenerated for 2025-07-16 (week view)"));
        assert!(report.contains("## Safety"));
        assert!(report.contains("- Mon 14: 2.0\n"));
        assert!(report.contains("- Tue 15: 0.0 (no data)\n"));
        assert!(!report.contains("Thu 17"));
        assert!(report.contains("1 open, 1 completed"));
        assert!(report.contains("- [high] Repaint lane (Dana, due 2025-07-10) OVERDUE"));
        assert!(!report.contains("Close audit"));
        assert!(report.contains("From 2025-07-15:\n- Near miss at dock 4"));
    }

    #[test]
    fn empty_pillar_reports_placeholders() {
        let snapshot = PillarSnapshot {
            pillar: Pillar::People,
            series: Vec::new(),
            actions: Vec::new(),
            latest_note: None,
        };
        let report = build_report(date(2025, 7, 16), TimePeriod::Month, &[snapshot]);
        assert!(report.contains("No action items recorded."));
        assert!(report.contains("No meeting notes in this window."));
    }
}
