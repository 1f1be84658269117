//! Series for the pie/donut status charts and the calendar heatmap.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{ActionItem, ActionStatus, DatedRecord};
use crate::periods::{self, DataType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSlice {
    pub status: ActionStatus,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub weekday: u32,
    pub value: f64,
    pub data_type: DataType,
}

/// One slice per status, in [`ActionStatus::ALL`] order.
pub fn status_mix(actions: &[ActionItem]) -> Vec<StatusSlice> {
    let total = actions.len();
    ActionStatus::ALL
        .iter()
        .map(|status| {
            let count = actions.iter().filter(|a| a.status == *status).count();
            StatusSlice {
                status: *status,
                count,
                share: if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                },
            }
        })
        .collect()
}

/// One cell per day of the month containing `reference`.
pub fn calendar_month(records: &[DatedRecord], reference: NaiveDate) -> Vec<CalendarDay> {
    let first = periods::month_start(reference);
    let last = periods::month_end(reference);

    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| {
            let (value, data_type) = periods::classify(day, day, reference, records);
            CalendarDay {
                date: day,
                weekday: day.weekday().num_days_from_monday(),
                value,
                data_type,
            }
        })
        .collect()
}
