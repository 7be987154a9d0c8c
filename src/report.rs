use std::fmt::Write;

use crate::engine::AttendanceReport;
use crate::models::WARNING_STREAK;

pub fn build_markdown(report: &AttendanceReport, cohort: Option<&str>) -> String {
    let mut output = String::new();
    let cohort_label = cohort.unwrap_or("all cohorts");

    let _ = writeln!(output, "# Practice Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} to {})",
        cohort_label, report.range.start, report.range.end
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohorts");

    if report.cohorts.is_empty() {
        let _ = writeln!(output, "No scheduled practices in this window.");
    } else {
        let _ = writeln!(output, "| Cohort | Members | Avg attendance | In warning |");
        let _ = writeln!(output, "|---|---|---|---|");
        for summary in &report.cohorts {
            let _ = writeln!(
                output,
                "| {} | {} | {}% | {} |",
                summary.cohort,
                summary.individual_count,
                summary.average_percentage,
                summary.warning_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Consecutive Absences ({WARNING_STREAK}+)");

    let warnings = report.warnings();
    if warnings.is_empty() {
        let _ = writeln!(output, "Nobody is on a warning streak.");
    } else {
        for entry in warnings {
            let last = entry
                .metrics
                .most_recent_absence
                .map(|date| date.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- {} ({}, group {}) missed {} in a row, last on {}",
                entry.individual.name,
                entry.individual.cohort,
                entry.individual.sub_group_key(),
                entry.metrics.streak_length,
                last
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Individuals");

    if report.individuals.is_empty() {
        let _ = writeln!(output, "No scheduled individuals in this window.");
    } else {
        let _ = writeln!(
            output,
            "| Name | Cohort | Present | Late | Left early | Absent | Unmarked | Attendance | Streak |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for entry in &report.individuals {
            let m = &entry.metrics;
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                entry.individual.name,
                entry.individual.cohort,
                m.present,
                m.late,
                m.left_early,
                m.absent,
                m.unmarked,
                m.percentage
                    .map(|pct| format!("{pct}%"))
                    .unwrap_or_else(|| "n/a".to_string()),
                m.streak_length
            );
        }
    }

    if report.unscheduled > 0 {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "_{} roster member(s) had no practice scheduled and are not listed._",
            report.unscheduled
        );
    }

    output
}
