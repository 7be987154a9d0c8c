use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sub-group assumed for individuals and blocks that do not name one.
pub const DEFAULT_SUB_GROUP: &str = "A";

/// Consecutive absences at which an individual is flagged.
pub const WARNING_STREAK: u32 = 3;

/// Weekdays in storage order (Sunday = 0).
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn weekday_from_index(index: i16) -> Option<Weekday> {
    usize::try_from(index).ok().and_then(|i| WEEK.get(i).copied())
}

pub fn weekday_index(day: Weekday) -> i16 {
    day.num_days_from_sunday() as i16
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Accepts weekday names ("mon", "Monday") or storage indices ("0".."6").
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let value = value.trim();
    if let Ok(index) = value.parse::<i16>() {
        return weekday_from_index(index);
    }
    value.parse::<Weekday>().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub id: Uuid,
    pub name: String,
    pub cohort: String,
    pub sub_group: Option<String>,
}

impl Individual {
    pub fn sub_group_key(&self) -> &str {
        match self.sub_group.as_deref() {
            Some(group) if !group.trim().is_empty() => group.trim(),
            _ => DEFAULT_SUB_GROUP,
        }
    }
}

/// A weekly practice slot for one (cohort, sub-group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringBlock {
    pub id: Uuid,
    pub cohort: String,
    pub sub_group: String,
    pub label: Option<String>,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Scheduled for rotation only; nobody on the roster belongs to it.
    pub external: bool,
}

impl RecurringBlock {
    pub fn applies_to(&self, individual: &Individual) -> bool {
        self.cohort == individual.cohort && self.sub_group == individual.sub_group_key()
    }
}

/// Shared fields of a block authored for one or more weekdays at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub cohort: String,
    pub sub_group: Option<String>,
    pub label: Option<String>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub external: bool,
}

impl BlockTemplate {
    pub fn sub_group_key(&self) -> &str {
        match self.sub_group.as_deref() {
            Some(group) if !group.trim().is_empty() => group.trim(),
            _ => DEFAULT_SUB_GROUP,
        }
    }

    pub fn on(&self, weekday: Weekday) -> RecurringBlock {
        self.with_id(Uuid::new_v4(), weekday)
    }

    pub fn with_id(&self, id: Uuid, weekday: Weekday) -> RecurringBlock {
        RecurringBlock {
            id,
            cohort: self.cohort.trim().to_string(),
            sub_group: self.sub_group_key().to_string(),
            label: self.label.clone().filter(|label| !label.trim().is_empty()),
            weekday,
            start: self.start,
            end: self.end,
            external: self.external,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    LeftEarly,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::LeftEarly => "left_early",
        }
    }

    /// Late arrivals and early departures still count as attended.
    pub fn is_attended(&self) -> bool {
        !matches!(self, AttendanceStatus::Absent)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "left_early" => Ok(AttendanceStatus::LeftEarly),
            other => Err(format!("unknown attendance status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub individual_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Last-write ordering key used to pick between duplicate records.
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceMetrics {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub left_early: u32,
    pub unmarked: u32,
    pub total_scheduled: u32,
    pub attended: u32,
    /// `None` when nothing was scheduled.
    pub percentage: Option<u32>,
    pub streak_length: u32,
    pub most_recent_absence: Option<NaiveDate>,
}

impl AttendanceMetrics {
    pub fn in_warning(&self) -> bool {
        self.streak_length >= WARNING_STREAK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualMetrics {
    pub individual: Individual,
    pub metrics: AttendanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortMetrics {
    pub cohort: String,
    pub individual_count: usize,
    pub average_percentage: u32,
    pub warning_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn individual(sub_group: Option<&str>) -> Individual {
        Individual {
            id: Uuid::new_v4(),
            name: "Rowan Park".to_string(),
            cohort: "Level 4".to_string(),
            sub_group: sub_group.map(str::to_string),
        }
    }

    #[test]
    fn sub_group_defaults_to_a() {
        assert_eq!(individual(None).sub_group_key(), "A");
        assert_eq!(individual(Some("  ")).sub_group_key(), "A");
        assert_eq!(individual(Some("B")).sub_group_key(), "B");
    }

    #[test]
    fn weekday_indices_start_on_sunday() {
        assert_eq!(weekday_from_index(0), Some(Weekday::Sun));
        assert_eq!(weekday_from_index(6), Some(Weekday::Sat));
        assert_eq!(weekday_from_index(7), None);
        assert_eq!(weekday_from_index(-1), None);
        assert_eq!(weekday_index(Weekday::Mon), 1);
    }

    #[test]
    fn parses_weekday_names_and_indices() {
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Wed"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("0"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn status_parsing_accepts_dashes() {
        assert_eq!("left-early".parse::<AttendanceStatus>(), Ok(AttendanceStatus::LeftEarly));
        assert_eq!("PRESENT".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Present));
        assert!("excused".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn template_normalizes_sub_group_and_label() {
        let template = BlockTemplate {
            cohort: " Level 4 ".to_string(),
            sub_group: None,
            label: Some(String::new()),
            start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            external: false,
        };
        let block = template.on(Weekday::Tue);
        assert_eq!(block.cohort, "Level 4");
        assert_eq!(block.sub_group, "A");
        assert_eq!(block.label, None);
        assert!(block.applies_to(&individual(None)));
        assert!(!block.applies_to(&individual(Some("B"))));
    }
}
