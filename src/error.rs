use std::fmt;

use chrono::{NaiveDate, NaiveTime, Weekday};
use thiserror::Error;

use crate::models::weekday_name;

/// One or more weekdays already hold a block for the (cohort, sub-group).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cohort} group {sub_group} already has practice on {}", DayList(.weekdays))]
pub struct ConflictError {
    pub cohort: String,
    pub sub_group: String,
    /// Sunday first, no repeats.
    pub weekdays: Vec<Weekday>,
}

impl ConflictError {
    pub fn weekday_names(&self) -> Vec<&'static str> {
        self.weekdays.iter().copied().map(weekday_name).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("range end {end} is before range start {start}")]
pub struct InvalidRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("cohort must not be empty")]
    EmptyCohort,

    #[error("practice must end after it starts ({start} - {end})")]
    EndBeforeStart { start: NaiveTime, end: NaiveTime },

    #[error("no weekdays selected")]
    NoWeekdays,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

struct DayList<'a>(&'a [Weekday]);

impl fmt::Display for DayList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, day) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(weekday_name(*day))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_every_day() {
        let err = ConflictError {
            cohort: "Level 4".to_string(),
            sub_group: "A".to_string(),
            weekdays: vec![Weekday::Mon, Weekday::Wed],
        };
        assert_eq!(
            err.to_string(),
            "Level 4 group A already has practice on Monday, Wednesday"
        );
        assert_eq!(err.weekday_names(), vec!["Monday", "Wednesday"]);
    }
}
