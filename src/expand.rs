//! Turns weekly practice blocks into the calendar dates they cover.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InvalidRangeError;
use crate::models::{Individual, RecurringBlock};

/// Inclusive span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidRangeError> {
        if end < start {
            return Err(InvalidRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// Sunday through Saturday around `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn month_of(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.day0()));
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Dates in `[range_start, range_end]` on which `individual` has practice,
/// ascending and without repeats. Empty when no block matches the
/// individual's cohort and sub-group, or when the range is inverted.
pub fn expand(
    individual: &Individual,
    blocks: &[RecurringBlock],
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Vec<NaiveDate> {
    let mut practice_days = [false; 7];
    for block in blocks.iter().filter(|block| block.applies_to(individual)) {
        practice_days[block.weekday.num_days_from_sunday() as usize] = true;
    }

    if range_start > range_end || !practice_days.contains(&true) {
        return Vec::new();
    }

    let dates: Vec<NaiveDate> = range_start
        .iter_days()
        .take_while(|date| *date <= range_end)
        .filter(|date| practice_days[date.weekday().num_days_from_sunday() as usize])
        .collect();

    debug!(
        individual = %individual.id,
        occurrences = dates.len(),
        "expanded practice schedule"
    );
    dates
}

pub fn expand_range(
    individual: &Individual,
    blocks: &[RecurringBlock],
    range: &DateRange,
) -> Vec<NaiveDate> {
    expand(individual, blocks, range.start, range.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockTemplate;
    use chrono::{NaiveTime, Weekday};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn player(cohort: &str, sub_group: Option<&str>) -> Individual {
        Individual {
            id: Uuid::new_v4(),
            name: "Jordan Reyes".to_string(),
            cohort: cohort.to_string(),
            sub_group: sub_group.map(str::to_string),
        }
    }

    fn block(cohort: &str, sub_group: &str, weekday: Weekday) -> RecurringBlock {
        BlockTemplate {
            cohort: cohort.to_string(),
            sub_group: Some(sub_group.to_string()),
            label: None,
            start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            external: false,
        }
        .on(weekday)
    }

    #[test]
    fn expands_multiple_weekdays() {
        let blocks = vec![
            block("Level 4", "A", Weekday::Mon),
            block("Level 4", "A", Weekday::Wed),
            block("Level 4", "B", Weekday::Fri),
        ];
        // 2026-01-04 (Sun) .. 2026-01-17 (Sat)
        let dates = expand(&player("Level 4", None), &blocks, date(2026, 1, 4), date(2026, 1, 17));
        assert_eq!(
            dates,
            vec![
                date(2026, 1, 5),
                date(2026, 1, 7),
                date(2026, 1, 12),
                date(2026, 1, 14)
            ]
        );
    }

    #[test]
    fn duplicate_weekdays_yield_one_date() {
        let blocks = vec![
            block("Level 4", "A", Weekday::Mon),
            block("Level 4", "A", Weekday::Mon),
        ];
        let dates = expand(&player("Level 4", Some("A")), &blocks, date(2026, 1, 5), date(2026, 1, 5));
        assert_eq!(dates, vec![date(2026, 1, 5)]);
    }

    #[test]
    fn unmatched_individual_gets_nothing() {
        let blocks = vec![block("Level 4", "A", Weekday::Mon)];
        assert!(expand(&player("Level 5", None), &blocks, date(2026, 1, 1), date(2026, 1, 31)).is_empty());
        assert!(expand(&player("Level 4", Some("B")), &blocks, date(2026, 1, 1), date(2026, 1, 31)).is_empty());
    }

    #[test]
    fn inverted_range_is_empty() {
        let blocks = vec![block("Level 4", "A", Weekday::Mon)];
        assert!(expand(&player("Level 4", None), &blocks, date(2026, 1, 31), date(2026, 1, 1)).is_empty());
        assert_eq!(
            DateRange::new(date(2026, 1, 31), date(2026, 1, 1)),
            Err(InvalidRangeError {
                start: date(2026, 1, 31),
                end: date(2026, 1, 1)
            })
        );
    }

    #[test]
    fn week_and_month_helpers() {
        // 2026-01-07 is a Wednesday.
        let week = DateRange::week_of(date(2026, 1, 7));
        assert_eq!(week.start, date(2026, 1, 4));
        assert_eq!(week.end, date(2026, 1, 10));
        assert_eq!(week.len_days(), 7);

        let feb = DateRange::month_of(date(2028, 2, 14));
        assert_eq!(feb.start, date(2028, 2, 1));
        assert_eq!(feb.end, date(2028, 2, 29));

        let dec = DateRange::month_of(date(2026, 12, 31));
        assert_eq!(dec.end, date(2026, 12, 31));
        assert!(dec.contains(date(2026, 12, 1)));
        assert!(!dec.contains(date(2027, 1, 1)));
    }

    fn weekday_strategy() -> impl Strategy<Value = Weekday> {
        (0i16..7).prop_map(|i| crate::models::weekday_from_index(i).unwrap())
    }

    proptest! {
        #[test]
        fn matches_brute_force_count(
            days in prop::collection::vec(weekday_strategy(), 0..6),
            offset in 0i64..400,
            span in 0i64..120,
        ) {
            let blocks: Vec<RecurringBlock> =
                days.iter().map(|day| block("Level 4", "A", *day)).collect();
            let start = date(2025, 1, 1) + Duration::days(offset);
            let end = start + Duration::days(span);
            let dates = expand(&player("Level 4", None), &blocks, start, end);

            let expected = start
                .iter_days()
                .take_while(|d| *d <= end)
                .filter(|d| days.contains(&d.weekday()))
                .count();
            prop_assert_eq!(dates.len(), expected);
            prop_assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(dates.iter().all(|d| *d >= start && *d <= end));
        }

        #[test]
        fn is_idempotent(
            days in prop::collection::vec(weekday_strategy(), 1..4),
            span in 0i64..60,
        ) {
            let blocks: Vec<RecurringBlock> =
                days.iter().map(|day| block("Level 4", "A", *day)).collect();
            let individual = player("Level 4", Some("A"));
            let start = date(2026, 3, 1);
            let end = start + Duration::days(span);
            prop_assert_eq!(
                expand(&individual, &blocks, start, end),
                expand(&individual, &blocks, start, end)
            );
        }
    }
}
