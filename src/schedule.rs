//! Authoring rules for recurring practice blocks.
//!
//! A (cohort, sub-group) may hold at most one block per weekday. Times on
//! different weekdays are never compared against each other.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;
use uuid::Uuid;

use crate::error::{BlockError, ConflictError, ScheduleError};
use crate::models::{weekday_from_index, BlockTemplate, Individual, RecurringBlock};

pub fn check_template(template: &BlockTemplate) -> Result<(), BlockError> {
    if template.cohort.trim().is_empty() {
        return Err(BlockError::EmptyCohort);
    }
    if template.end <= template.start {
        return Err(BlockError::EndBeforeStart {
            start: template.start,
            end: template.end,
        });
    }
    Ok(())
}

/// Checks `candidate` against `existing`, skipping the block with `exclude_id`
/// (the block being edited in place).
pub fn validate(
    candidate: &RecurringBlock,
    existing: &[RecurringBlock],
    exclude_id: Option<Uuid>,
) -> Result<(), ConflictError> {
    let taken = conflicting_days(
        &candidate.cohort,
        &candidate.sub_group,
        &[candidate.weekday],
        existing,
        exclude_id,
    );
    if taken.is_empty() {
        Ok(())
    } else {
        Err(ConflictError {
            cohort: candidate.cohort.clone(),
            sub_group: candidate.sub_group.clone(),
            weekdays: taken,
        })
    }
}

/// Validates a template stamped onto several weekdays at once.
///
/// Every weekday is checked before anything is accepted, so the error lists
/// all conflicting days. On success the returned blocks (one per distinct
/// weekday, Sunday first) are ready to persist together.
pub fn validate_batch(
    template: &BlockTemplate,
    weekdays: &[Weekday],
    existing: &[RecurringBlock],
    exclude_id: Option<Uuid>,
) -> Result<Vec<RecurringBlock>, ScheduleError> {
    check_template(template)?;

    let days = distinct_days(weekdays);
    if days.is_empty() {
        return Err(BlockError::NoWeekdays.into());
    }

    let cohort = template.cohort.trim();
    let sub_group = template.sub_group_key();
    let taken = conflicting_days(cohort, sub_group, &days, existing, exclude_id);
    if !taken.is_empty() {
        debug!(cohort, sub_group, conflicts = taken.len(), "batch rejected");
        return Err(ConflictError {
            cohort: cohort.to_string(),
            sub_group: sub_group.to_string(),
            weekdays: taken,
        }
        .into());
    }

    Ok(days.into_iter().map(|day| template.on(day)).collect())
}

/// Rewrites block `id` from `template`, checked against every other block.
pub fn validate_edit(
    id: Uuid,
    template: &BlockTemplate,
    weekday: Weekday,
    existing: &[RecurringBlock],
) -> Result<RecurringBlock, ScheduleError> {
    check_template(template)?;
    let block = template.with_id(id, weekday);
    validate(&block, existing, Some(id))?;
    Ok(block)
}

/// Blocks held on `date`, earliest start first.
pub fn sessions_on(date: NaiveDate, blocks: &[RecurringBlock]) -> Vec<&RecurringBlock> {
    let mut sessions: Vec<&RecurringBlock> = blocks
        .iter()
        .filter(|block| block.weekday == date.weekday())
        .collect();
    sessions.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.cohort.cmp(&b.cohort))
            .then_with(|| a.sub_group.cmp(&b.sub_group))
    });
    sessions
}

/// Roster members expected to practice on `date`.
pub fn expected_on<'a>(
    date: NaiveDate,
    roster: &'a [Individual],
    blocks: &[RecurringBlock],
) -> Vec<&'a Individual> {
    let sessions = sessions_on(date, blocks);
    roster
        .iter()
        .filter(|individual| sessions.iter().any(|block| block.applies_to(individual)))
        .collect()
}

fn distinct_days(weekdays: &[Weekday]) -> Vec<Weekday> {
    weekdays
        .iter()
        .map(|day| day.num_days_from_sunday())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|index| weekday_from_index(index as i16))
        .collect()
}

fn conflicting_days(
    cohort: &str,
    sub_group: &str,
    weekdays: &[Weekday],
    existing: &[RecurringBlock],
    exclude_id: Option<Uuid>,
) -> Vec<Weekday> {
    let mut taken: Vec<Weekday> = weekdays
        .iter()
        .copied()
        .filter(|day| {
            existing.iter().any(|block| {
                Some(block.id) != exclude_id
                    && block.cohort == cohort
                    && block.sub_group == sub_group
                    && block.weekday == *day
            })
        })
        .collect();
    taken.sort_by_key(|day| day.num_days_from_sunday());
    taken.dedup();
    taken
}
