use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CohortMetrics, IndividualMetrics};

/// Canonical display order for cohorts. Unlisted cohorts follow the listed
/// ones alphabetically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortOrder {
    names: Vec<String>,
}

impl CohortOrder {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Comma separated, blanks dropped.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn rank(&self, cohort: &str) -> Option<usize> {
        self.names.iter().position(|name| name == cohort)
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}

/// Rolls individual metrics up per cohort. Individuals with nothing
/// scheduled belong upstream; any that slip through are skipped.
pub fn aggregate(individuals: &[IndividualMetrics], order: &CohortOrder) -> Vec<CohortMetrics> {
    let mut groups: BTreeMap<&str, (Vec<u32>, usize)> = BTreeMap::new();

    for entry in individuals {
        let Some(percentage) = entry.metrics.percentage else {
            debug!(individual = %entry.individual.id, "skipping individual with no schedule");
            continue;
        };
        let group = groups
            .entry(entry.individual.cohort.as_str())
            .or_insert_with(|| (Vec::new(), 0));
        group.0.push(percentage);
        if entry.metrics.in_warning() {
            group.1 += 1;
        }
    }

    let mut cohorts: Vec<CohortMetrics> = groups
        .into_iter()
        .map(|(cohort, (percentages, warning_count))| CohortMetrics {
            cohort: cohort.to_string(),
            individual_count: percentages.len(),
            average_percentage: mean_rounded(&percentages),
            warning_count,
        })
        .collect();

    cohorts.sort_by(|a, b| order.compare(&a.cohort, &b.cohort));
    cohorts
}

fn mean_rounded(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let total: f64 = values.iter().map(|v| f64::from(*v)).sum();
    (total / values.len() as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceMetrics, Individual};
    use uuid::Uuid;

    fn entry(cohort: &str, percentage: Option<u32>, streak: u32) -> IndividualMetrics {
        IndividualMetrics {
            individual: Individual {
                id: Uuid::new_v4(),
                name: format!("{cohort} player"),
                cohort: cohort.to_string(),
                sub_group: None,
            },
            metrics: AttendanceMetrics {
                total_scheduled: if percentage.is_some() { 10 } else { 0 },
                percentage,
                streak_length: streak,
                ..AttendanceMetrics::default()
            },
        }
    }

    #[test]
    fn averages_and_counts_warnings() {
        let input = vec![entry("Level 4", Some(80), 3), entry("Level 4", Some(100), 0)];
        let cohorts = aggregate(&input, &CohortOrder::default());

        assert_eq!(
            cohorts,
            vec![CohortMetrics {
                cohort: "Level 4".to_string(),
                individual_count: 2,
                average_percentage: 90,
                warning_count: 1,
            }]
        );
    }

    #[test]
    fn average_is_rounded() {
        let input = vec![
            entry("Level 2", Some(67), 0),
            entry("Level 2", Some(50), 0),
            entry("Level 2", Some(100), 0),
        ];
        // 217 / 3 = 72.33
        assert_eq!(aggregate(&input, &CohortOrder::default())[0].average_percentage, 72);
    }

    #[test]
    fn unscheduled_individuals_are_not_counted() {
        let input = vec![entry("Level 4", Some(60), 0), entry("Level 4", None, 0)];
        let cohorts = aggregate(&input, &CohortOrder::default());
        assert_eq!(cohorts[0].individual_count, 1);
        assert_eq!(cohorts[0].average_percentage, 60);
    }

    #[test]
    fn configured_order_then_alphabetical() {
        let input = vec![
            entry("Masters", Some(90), 0),
            entry("Adults", Some(90), 0),
            entry("Level 6", Some(90), 0),
            entry("Level 2", Some(90), 0),
        ];
        let order = CohortOrder::parse("Level 6, Level 2 ,,");
        assert_eq!(order.names(), &["Level 6".to_string(), "Level 2".to_string()]);

        let names: Vec<String> = aggregate(&input, &order)
            .into_iter()
            .map(|c| c.cohort)
            .collect();
        assert_eq!(names, vec!["Level 6", "Level 2", "Adults", "Masters"]);
    }
}
