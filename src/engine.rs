//! Runs the whole roster through expand, reconcile and aggregate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::aggregate::{aggregate, CohortOrder};
use crate::expand::{expand_range, DateRange};
use crate::models::{
    AttendanceEvent, CohortMetrics, Individual, IndividualMetrics, RecurringBlock,
};
use crate::reconcile::{latest_per_date, reconcile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub range: DateRange,
    /// Only individuals with at least one expected practice.
    pub individuals: Vec<IndividualMetrics>,
    pub cohorts: Vec<CohortMetrics>,
    /// Roster members with nothing scheduled in the range.
    pub unscheduled: usize,
}

impl AttendanceReport {
    /// Individuals in warning, longest streak first.
    pub fn warnings(&self) -> Vec<&IndividualMetrics> {
        let mut flagged: Vec<&IndividualMetrics> = self
            .individuals
            .iter()
            .filter(|entry| entry.metrics.in_warning())
            .collect();
        flagged.sort_by(|a, b| {
            b.metrics
                .streak_length
                .cmp(&a.metrics.streak_length)
                .then_with(|| a.individual.name.cmp(&b.individual.name))
        });
        flagged
    }

    pub fn cohort(&self, name: &str) -> Option<&CohortMetrics> {
        self.cohorts.iter().find(|cohort| cohort.cohort == name)
    }

    pub fn individual(&self, id: Uuid) -> Option<&IndividualMetrics> {
        self.individuals.iter().find(|entry| entry.individual.id == id)
    }
}

/// Inputs must be fully loaded; events outside `range` are ignored.
pub fn build_report(
    roster: &[Individual],
    blocks: &[RecurringBlock],
    events: &[AttendanceEvent],
    range: &DateRange,
    order: &CohortOrder,
) -> AttendanceReport {
    let mut by_individual: HashMap<Uuid, Vec<AttendanceEvent>> = HashMap::new();
    for event in latest_per_date(events) {
        if range.contains(event.date) {
            by_individual.entry(event.individual_id).or_default().push(event);
        }
    }

    let mut individuals = Vec::with_capacity(roster.len());
    let mut unscheduled = 0;

    for individual in roster {
        let expected = expand_range(individual, blocks, range);
        if expected.is_empty() {
            unscheduled += 1;
            continue;
        }
        let events = by_individual
            .get(&individual.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        individuals.push(IndividualMetrics {
            individual: individual.clone(),
            metrics: reconcile(&expected, events),
        });
    }

    individuals.sort_by(|a, b| {
        order
            .compare(&a.individual.cohort, &b.individual.cohort)
            .then_with(|| a.individual.name.cmp(&b.individual.name))
    });

    let cohorts = aggregate(&individuals, order);
    debug!(
        scheduled = individuals.len(),
        unscheduled,
        cohorts = cohorts.len(),
        "built attendance report"
    );

    AttendanceReport {
        range: *range,
        individuals,
        cohorts,
        unscheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, BlockTemplate};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn player(name: &str, cohort: &str) -> Individual {
        Individual {
            id: Uuid::new_v4(),
            name: name.to_string(),
            cohort: cohort.to_string(),
            sub_group: None,
        }
    }

    fn blocks(cohort: &str, days: &[Weekday]) -> Vec<RecurringBlock> {
        let template = BlockTemplate {
            cohort: cohort.to_string(),
            sub_group: None,
            label: None,
            start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            external: false,
        };
        days.iter().map(|day| template.on(*day)).collect()
    }

    fn absent(individual: &Individual, on: NaiveDate) -> AttendanceEvent {
        AttendanceEvent {
            individual_id: individual.id,
            date: on,
            status: AttendanceStatus::Absent,
            check_in: None,
            check_out: None,
            notes: None,
            recorded_at: None,
        }
    }

    #[test]
    fn unscheduled_roster_members_are_left_out() {
        let roster = vec![player("Casey", "Level 4"), player("Drew", "Level 9")];
        let schedule = blocks("Level 4", &[Weekday::Mon]);
        let range = DateRange::new(date(2026, 1, 4), date(2026, 1, 10)).unwrap();

        let report = build_report(&roster, &schedule, &[], &range, &CohortOrder::default());
        assert_eq!(report.individuals.len(), 1);
        assert_eq!(report.unscheduled, 1);
        assert_eq!(report.cohorts.len(), 1);
        assert_eq!(report.cohorts[0].cohort, "Level 4");
    }

    #[test]
    fn warnings_sorted_by_streak() {
        let casey = player("Casey", "Level 4");
        let blair = player("Blair", "Level 4");
        let schedule = blocks("Level 4", &[Weekday::Mon, Weekday::Wed]);
        let range = DateRange::new(date(2026, 1, 4), date(2026, 1, 17)).unwrap();
        let practice = [date(2026, 1, 5), date(2026, 1, 7), date(2026, 1, 12), date(2026, 1, 14)];

        let mut events: Vec<AttendanceEvent> = practice.iter().map(|d| absent(&casey, *d)).collect();
        events.extend(practice[1..].iter().map(|d| absent(&blair, *d)));
        // outside the range
        events.push(absent(&blair, date(2026, 1, 19)));

        let report = build_report(
            &[casey.clone(), blair.clone()],
            &schedule,
            &events,
            &range,
            &CohortOrder::default(),
        );

        let warnings: Vec<&str> = report
            .warnings()
            .iter()
            .map(|entry| entry.individual.name.as_str())
            .collect();
        assert_eq!(warnings, vec!["Casey", "Blair"]);
        assert_eq!(report.individual(blair.id).unwrap().metrics.streak_length, 3);
        assert_eq!(report.cohort("Level 4").unwrap().warning_count, 2);
    }
}
