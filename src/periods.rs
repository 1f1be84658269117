use std::fmt;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

use crate::models::DatedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodOption {
    pub label: &'static str,
    pub value: &'static str,
    pub description: &'static str,
}

const PERIOD_OPTIONS: [PeriodOption; 4] = [
    PeriodOption {
        label: "Week",
        value: "week",
        description: "Daily view of the current work week",
    },
    PeriodOption {
        label: "Month",
        value: "month",
        description: "Weekly view of the current month",
    },
    PeriodOption {
        label: "3 Months",
        value: "3month",
        description: "Monthly view of the last 3 months",
    },
    PeriodOption {
        label: "6 Months",
        value: "6month",
        description: "Monthly view of the last 6 months",
    },
];

/// Identifiers written by older releases of the board.
const LEGACY_PERIODS: [(&str, &str); 5] = [
    ("1w", "week"),
    ("1m", "month"),
    ("3m", "3month"),
    ("6m", "6month"),
    ("5m", "month"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum TimePeriod {
    #[serde(rename = "week")]
    Week,
    #[default]
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3month")]
    ThreeMonth,
    #[serde(rename = "6month")]
    SixMonth,
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Recorded,
    Missing,
    Future,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub value: f64,
    pub target: f64,
    pub data_type: DataType,
}

pub fn strategy_options() -> &'static [PeriodOption] {
    &PERIOD_OPTIONS
}

/// Unknown strings pass through untouched.
pub fn remap_legacy(identifier: &str) -> &str {
    LEGACY_PERIODS
        .iter()
        .find(|(legacy, _)| *legacy == identifier)
        .map(|(_, modern)| *modern)
        .unwrap_or(identifier)
}

pub fn resolve(identifier: &str) -> TimePeriod {
    match remap_legacy(identifier) {
        "week" => TimePeriod::Week,
        "month" => TimePeriod::Month,
        "3month" => TimePeriod::ThreeMonth,
        "6month" => TimePeriod::SixMonth,
        _ => TimePeriod::default(),
    }
}

pub fn migrate_period_value(identifier: &str) -> &'static str {
    resolve(identifier).value()
}

impl TimePeriod {
    pub fn option(self) -> &'static PeriodOption {
        let index = match self {
            TimePeriod::Week => 0,
            TimePeriod::Month => 1,
            TimePeriod::ThreeMonth => 2,
            TimePeriod::SixMonth => 3,
        };
        &PERIOD_OPTIONS[index]
    }

    pub fn value(self) -> &'static str {
        self.option().value
    }

    pub fn label(self) -> &'static str {
        self.option().label
    }

    pub fn range(self, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
        let spans = self.spans(reference);
        match (spans.first(), spans.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (reference, reference),
        }
    }

    pub fn bucket(self, records: &[DatedRecord], reference: NaiveDate, target: f64) -> Vec<Bucket> {
        self.spans(reference)
            .into_iter()
            .map(|span| {
                let (value, data_type) = classify(span.start, span.end, reference, records);
                Bucket {
                    label: span.label,
                    start: span.start,
                    end: span.end,
                    value,
                    target,
                    data_type,
                }
            })
            .collect()
    }

    fn spans(self, reference: NaiveDate) -> Vec<Span> {
        match self {
            TimePeriod::Week => week_spans(reference),
            TimePeriod::Month => month_week_spans(reference),
            TimePeriod::ThreeMonth => trailing_month_spans(reference, 3),
            TimePeriod::SixMonth => trailing_month_spans(reference, 6),
        }
    }
}

struct Span {
    start: NaiveDate,
    end: NaiveDate,
    label: String,
}

// A slice that has already begun is never Future.
pub(crate) fn classify(
    start: NaiveDate,
    end: NaiveDate,
    reference: NaiveDate,
    records: &[DatedRecord],
) -> (f64, DataType) {
    if start > reference {
        return (0.0, DataType::Future);
    }

    let mut total = 0.0;
    let mut seen = false;
    for record in records {
        if record.date >= start && record.date <= end {
            total += record.value;
            seen = true;
        }
    }

    if seen {
        (total, DataType::Recorded)
    } else {
        (0.0, DataType::Missing)
    }
}

pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

pub(crate) fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn week_spans(reference: NaiveDate) -> Vec<Span> {
    let monday = week_start(reference);
    (0..7)
        .map(|offset| {
            let day = monday + Duration::days(offset);
            Span {
                start: day,
                end: day,
                label: day.format("%a %-d").to_string(),
            }
        })
        .collect()
}

fn month_week_spans(reference: NaiveDate) -> Vec<Span> {
    let first = month_start(reference);
    let last = month_end(reference);
    let mut spans = Vec::with_capacity(6);
    let mut start = first;

    while start <= last {
        let sunday = week_start(start) + Duration::days(6);
        let end = sunday.min(last);
        let label = if start == end {
            format!("{} {}", start.format("%b"), start.day())
        } else {
            format!("{} {}-{}", start.format("%b"), start.day(), end.day())
        };
        spans.push(Span { start, end, label });
        match end.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }

    spans
}

fn trailing_month_spans(reference: NaiveDate, months: u32) -> Vec<Span> {
    let current = month_start(reference);
    (0..months)
        .rev()
        .filter_map(|offset| current.checked_sub_months(Months::new(offset)))
        .map(|start| Span {
            start,
            end: month_end(start),
            label: start.format("%b %Y").to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn options_keep_catalog_order() {
        let values: Vec<&str> = strategy_options().iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["week", "month", "3month", "6month"]);
    }

    #[test]
    fn legacy_identifiers_resolve_like_modern_ones() {
        assert_eq!(resolve("1w"), resolve("week"));
        assert_eq!(resolve("1m"), resolve("month"));
        assert_eq!(resolve("3m"), resolve("3month"));
        assert_eq!(resolve("6m"), resolve("6month"));
        assert_eq!(resolve("5m"), resolve("month"));
    }

    #[test]
    fn unknown_identifiers_fall_back_to_month() {
        assert_eq!(resolve(""), TimePeriod::Month);
        assert_eq!(resolve("12month"), TimePeriod::Month);
        assert_eq!(resolve("WEEK"), TimePeriod::Month);
        assert_eq!(remap_legacy("quarter"), "quarter");
    }

    #[test]
    fn migrated_period_values_are_canonical() {
        assert_eq!(migrate_period_value("6m"), "6month");
        assert_eq!(migrate_period_value("bogus"), "month");
        assert_eq!(migrate_period_value(migrate_period_value("1w")), "week");
    }

    #[test]
    fn week_runs_monday_to_sunday_with_future_days() {
        let reference = date(2025, 7, 16); // Wednesday
        let records = vec![
            DatedRecord::new(date(2025, 7, 14), 2.0),
            DatedRecord::new(date(2025, 7, 14), 1.0),
            DatedRecord::new(date(2025, 7, 18), 9.0),
        ];
        let series = TimePeriod::Week.bucket(&records, reference, 1.0);

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].start, date(2025, 7, 14));
        assert_eq!(series[0].label, "Mon 14");
        assert_eq!(series[0].value, 3.0);
        assert_eq!(series[0].data_type, DataType::Recorded);
        assert_eq!(series[1].data_type, DataType::Missing);
        assert_eq!(series[2].data_type, DataType::Missing);
        assert_eq!(series[4].data_type, DataType::Future);
        assert_eq!(series[4].value, 0.0);
        assert!(series.iter().all(|bucket| bucket.target == 1.0));
    }

    #[test]
    fn month_scenario_sums_per_week() {
        let records = vec![
            DatedRecord::new(date(2025, 7, 1), 3.0),
            DatedRecord::new(date(2025, 7, 15), 5.0),
        ];
        let series = TimePeriod::Month.bucket(&records, date(2025, 7, 20), 0.0);

        let labels: Vec<&str> = series.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Jul 1-6", "Jul 7-13", "Jul 14-20", "Jul 21-27", "Jul 28-31"]);

        assert_eq!(series[0].value, 3.0);
        assert_eq!(series[0].data_type, DataType::Recorded);
        assert_eq!(series[1].value, 0.0);
        assert_eq!(series[1].data_type, DataType::Missing);
        assert_eq!(series[2].value, 5.0);
        assert_eq!(series[2].data_type, DataType::Recorded);
        assert_eq!(series[3].data_type, DataType::Future);
        assert_eq!(series[4].data_type, DataType::Future);
    }

    #[test]
    fn partial_current_bucket_is_missing_not_future() {
        let series = TimePeriod::Month.bucket(&[], date(2025, 7, 22), 0.0);
        let current = series
            .iter()
            .find(|b| b.start <= date(2025, 7, 22) && date(2025, 7, 22) <= b.end)
            .expect("bucket for reference date");
        assert_eq!(current.data_type, DataType::Missing);
    }

    #[test]
    fn month_with_single_day_tail_gets_short_label() {
        // March 2025 ends on a Monday.
        let series = TimePeriod::Month.bucket(&[], date(2025, 3, 3), 0.0);
        assert_eq!(series.len(), 6);
        assert_eq!(series[0].label, "Mar 1-2");
        assert_eq!(series[5].label, "Mar 31");
    }

    #[test]
    fn trailing_months_end_with_reference_month() {
        let records = vec![
            DatedRecord::new(date(2025, 5, 3), 4.0),
            DatedRecord::new(date(2025, 5, 30), 1.0),
            DatedRecord::new(date(2024, 12, 31), 7.0),
        ];
        let series = TimePeriod::ThreeMonth.bucket(&records, date(2025, 7, 2), 2.0);
        let labels: Vec<&str> = series.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["May 2025", "Jun 2025", "Jul 2025"]);
        assert_eq!(series[0].value, 5.0);
        assert_eq!(series[1].data_type, DataType::Missing);
        assert_eq!(series[2].data_type, DataType::Missing);

        let six = TimePeriod::SixMonth.bucket(&records, date(2025, 2, 10), 2.0);
        assert_eq!(six.len(), 6);
        assert_eq!(six[0].label, "Sep 2024");
        assert_eq!(six[3].value, 7.0);
        assert_eq!(six[5].end, date(2025, 2, 28));
    }

    #[test]
    fn range_covers_first_and_last_bucket() {
        let (from, to) = TimePeriod::SixMonth.range(date(2025, 7, 20));
        assert_eq!(from, date(2025, 2, 1));
        assert_eq!(to, date(2025, 7, 31));
    }

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..20_000).prop_map(|offset| date(1990, 1, 1) + Duration::days(offset))
    }

    proptest! {
        #[test]
        fn week_always_has_seven_buckets(
            reference in any_date(),
            offsets in proptest::collection::vec((-30i64..30, 0.0f64..100.0), 0..64),
        ) {
            let records: Vec<DatedRecord> = offsets
                .into_iter()
                .map(|(offset, value)| DatedRecord::new(reference + Duration::days(offset), value))
                .collect();
            prop_assert_eq!(TimePeriod::Week.bucket(&records, reference, 0.0).len(), 7);
        }

        #[test]
        fn month_buckets_partition_the_month(reference in any_date()) {
            let series = TimePeriod::Month.bucket(&[], reference, 0.0);
            prop_assert!((4..=6).contains(&series.len()));
            prop_assert_eq!(series[0].start, month_start(reference));
            prop_assert_eq!(series[series.len() - 1].end, month_end(reference));
            for pair in series.windows(2) {
                prop_assert_eq!(pair[0].end.succ_opt(), Some(pair[1].start));
            }
        }

        #[test]
        fn unrecognized_identifiers_resolve_to_month(identifier in "[a-z0-9]{0,8}") {
            let known = ["week", "month", "3month", "6month", "1w", "1m", "3m", "6m", "5m"];
            prop_assume!(!known.contains(&identifier.as_str()));
            prop_assert_eq!(resolve(&identifier), TimePeriod::Month);
        }
    }
}
