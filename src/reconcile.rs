//! Folds sparse attendance marks against the expected practice dates.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{AttendanceEvent, AttendanceMetrics, AttendanceStatus};

/// Keeps one event per (individual, date): the greatest `recorded_at` wins,
/// unstamped events lose to stamped ones, and ties go to the later input.
/// Output is ordered by individual, then date.
pub fn latest_per_date(events: &[AttendanceEvent]) -> Vec<AttendanceEvent> {
    let mut latest: HashMap<(Uuid, NaiveDate), &AttendanceEvent> = HashMap::new();

    for event in events {
        let key = (event.individual_id, event.date);
        match latest.get(&key) {
            Some(current) if current.recorded_at > event.recorded_at => {}
            _ => {
                latest.insert(key, event);
            }
        }
    }

    let mut resolved: Vec<AttendanceEvent> = latest.into_values().cloned().collect();
    resolved.sort_by_key(|event| (event.individual_id, event.date));
    resolved
}

/// Metrics for one individual. `events` must hold at most one event per
/// date; if not, the last one in the slice is used.
pub fn reconcile(expected: &[NaiveDate], events: &[AttendanceEvent]) -> AttendanceMetrics {
    let marks: HashMap<NaiveDate, AttendanceStatus> =
        events.iter().map(|event| (event.date, event.status)).collect();

    let mut metrics = AttendanceMetrics {
        total_scheduled: expected.len() as u32,
        ..AttendanceMetrics::default()
    };

    for date in expected {
        match marks.get(date) {
            Some(AttendanceStatus::Present) => metrics.present += 1,
            Some(AttendanceStatus::Absent) => metrics.absent += 1,
            Some(AttendanceStatus::Late) => metrics.late += 1,
            Some(AttendanceStatus::LeftEarly) => metrics.left_early += 1,
            None => metrics.unmarked += 1,
        }
    }

    metrics.attended = metrics.present + metrics.late + metrics.left_early;
    metrics.percentage = percentage(metrics.attended, metrics.total_scheduled);

    let (streak, most_recent) = absence_streak(expected, &marks);
    metrics.streak_length = streak;
    metrics.most_recent_absence = most_recent;
    metrics
}

pub fn percentage(part: u32, whole: u32) -> Option<u32> {
    if whole == 0 {
        return None;
    }
    Some((f64::from(part) * 100.0 / f64::from(whole)).round() as u32)
}

/// Walks back from the latest date. Present or late ends the run; absent
/// extends it; unmarked and left-early dates are passed over without
/// counting.
fn absence_streak(
    expected: &[NaiveDate],
    marks: &HashMap<NaiveDate, AttendanceStatus>,
) -> (u32, Option<NaiveDate>) {
    let mut dates = expected.to_vec();
    dates.sort_by_key(|date| Reverse(*date));
    dates.dedup();

    let mut streak = 0;
    let mut most_recent = None;

    for date in dates {
        match marks.get(&date) {
            Some(AttendanceStatus::Present) | Some(AttendanceStatus::Late) => break,
            Some(AttendanceStatus::Absent) => {
                streak += 1;
                most_recent.get_or_insert(date);
            }
            Some(AttendanceStatus::LeftEarly) | None => {}
        }
    }

    (streak, most_recent)
}
