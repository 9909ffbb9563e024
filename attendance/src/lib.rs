mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap};

pub use crate::config::*;

/// The canonical form of a handle or a secret word: trimmed and lowercased.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Counts the validated attendances of every person for one category.
///
/// A self-report is valid if an official event of the same category exists
/// with the same week and secret word. The join is many-to-many: two events
/// logged with the same week and secret word validate each matching report
/// twice, and a report submitted twice is counted twice.
///
/// The records are expected to be normalized already. People without any
/// valid attendance are not returned. The output is sorted by handle.
pub fn count_category(
    reports: &[SelfReport],
    events: &[OfficialEvent],
    category: Category,
) -> Vec<CategoryCount> {
    let label = category.label();

    // Number of events for each (week, secret word) pair of this category.
    let mut event_keys: HashMap<(&PeriodKey, &str), u64> = HashMap::new();
    for e in events.iter().filter(|e| e.activity == label) {
        *event_keys
            .entry((&e.week, e.secret_word.as_str()))
            .or_insert(0) += 1;
    }

    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for r in reports.iter().filter(|r| r.activity == label) {
        if r.handle.is_empty() {
            debug!(
                "count_category: {}: skipping report without handle for week {}",
                label, r.week
            );
            continue;
        }
        if let Some(num_events) = event_keys.get(&(&r.week, r.secret_word.as_str())) {
            *counts.entry(r.handle.as_str()).or_insert(0) += num_events;
        }
    }

    debug!(
        "count_category: {}: {} events, {} people with attendance",
        label,
        event_keys.len(),
        counts.len()
    );

    counts
        .into_iter()
        .map(|(handle, count)| CategoryCount {
            handle: handle.to_string(),
            count,
        })
        .collect()
}

/// Same as [count_category], with the category given by its label.
///
/// Unknown labels yield an empty result.
pub fn count_category_named(
    reports: &[SelfReport],
    events: &[OfficialEvent],
    label: &str,
) -> Vec<CategoryCount> {
    match Category::from_label(label) {
        Some(category) => count_category(reports, events, category),
        None => {
            debug!("count_category_named: unknown category {:?}", label);
            Vec::new()
        }
    }
}

/// Runs the reconciliation for all the categories and assembles the summary.
///
/// Arguments:
/// * `reports` the normalized self-reports
/// * `events` the normalized official events
///
/// Everyone with at least one valid attendance in any category gets exactly
/// one row, with zero for the categories in which they have none. People
/// without any valid attendance do not appear at all.
pub fn run_attendance_stats(reports: &[SelfReport], events: &[OfficialEvent]) -> AttendanceSummary {
    info!(
        "Processing {:?} self-reports against {:?} events",
        reports.len(),
        events.len()
    );

    // Outer join on the handle. The map keeps the rows sorted.
    let mut table: BTreeMap<String, SummaryRow> = BTreeMap::new();
    for category in Category::ALL {
        let counts = count_category(reports, events, category);
        info!("Category {}: {} people", category, counts.len());
        for cc in counts {
            table
                .entry(cc.handle.clone())
                .or_insert_with(|| SummaryRow::new(&cc.handle))
                .set_count(category, cc.count);
        }
    }

    AttendanceSummary::from_rows(table.into_values().collect())
}

/// Finds the row of a person. The identity is normalized before the lookup.
pub fn lookup<'a>(
    summary: &'a AttendanceSummary,
    identity: &str,
) -> Result<&'a SummaryRow, LookupError> {
    let handle = normalize_identity(identity);
    summary
        .find(&handle)
        .ok_or(LookupError::IdentityNotFound(handle))
}

/// The attendance of a person as `category: count` lines.
pub fn describe_attendance(
    summary: &AttendanceSummary,
    identity: &str,
) -> Result<Vec<String>, LookupError> {
    lookup(summary, identity).map(|row| row.lines())
}
