// Primitives for reading and writing the CSV files.

use std::io::{Read, Write};

use attendance::{AttendanceSummary, Category, OfficialEvent, SelfReport, SummaryRow};
use csv::StringRecord;
use log::debug;
use snafu::prelude::*;

use crate::tracker::*;

pub const HANDLE_COLUMN: &str = "HKN Handle";
pub const WEEK_COLUMN: &str = "Week";
pub const SECRET_WORD_COLUMN: &str = "Secret Word";
pub const ACTIVITY_COLUMN: &str = "Activity Type";

/// Reads the raw self-reports. The records are returned as written in the
/// spreadsheet, without normalization.
pub fn read_self_reports(data: &[u8], name: &str) -> TrackerResult<Vec<SelfReport>> {
    let mut rdr = csv::Reader::from_reader(data);
    let headers = rdr.headers().context(CsvReadSnafu { name })?.clone();
    let handle_idx = column_index(&headers, HANDLE_COLUMN, name)?;
    let week_idx = column_index(&headers, WEEK_COLUMN, name)?;
    let secret_idx = column_index(&headers, SECRET_WORD_COLUMN, name)?;
    let activity_idx = column_index(&headers, ACTIVITY_COLUMN, name)?;

    let mut res: Vec<SelfReport> = Vec::new();
    for line_r in rdr.records() {
        let line = line_r.context(CsvReadSnafu { name })?;
        res.push(SelfReport::new(
            cell(&line, handle_idx),
            cell(&line, week_idx),
            cell(&line, secret_idx),
            cell(&line, activity_idx),
        ));
    }
    debug!("read_self_reports: {}: {} records", name, res.len());
    Ok(res)
}

pub fn read_events(data: &[u8], name: &str) -> TrackerResult<Vec<OfficialEvent>> {
    let mut rdr = csv::Reader::from_reader(data);
    let headers = rdr.headers().context(CsvReadSnafu { name })?.clone();
    let week_idx = column_index(&headers, WEEK_COLUMN, name)?;
    let secret_idx = column_index(&headers, SECRET_WORD_COLUMN, name)?;
    let activity_idx = column_index(&headers, ACTIVITY_COLUMN, name)?;

    let mut res: Vec<OfficialEvent> = Vec::new();
    for line_r in rdr.records() {
        let line = line_r.context(CsvReadSnafu { name })?;
        res.push(OfficialEvent::new(
            cell(&line, week_idx),
            cell(&line, secret_idx),
            cell(&line, activity_idx),
        ));
    }
    debug!("read_events: {}: {} records", name, res.len());
    Ok(res)
}

/// Writes the summary: the handle column, then one count column per category.
pub fn write_summary<W: Write>(summary: &AttendanceSummary, writer: W) -> TrackerResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<String> = vec![HANDLE_COLUMN.to_string()];
    header.extend(Category::ALL.iter().map(|c| c.column_name()));
    wtr.write_record(&header).context(CsvWriteSnafu {})?;

    for row in summary.rows() {
        let mut record: Vec<String> = vec![row.handle.clone()];
        record.extend(row.counts.iter().map(|n| n.to_string()));
        wtr.write_record(&record).context(CsvWriteSnafu {})?;
    }
    wtr.flush()
        .map_err(csv::Error::from)
        .context(CsvWriteSnafu {})?;
    Ok(())
}

pub fn summary_to_bytes(summary: &AttendanceSummary) -> TrackerResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    write_summary(summary, &mut buf)?;
    Ok(buf)
}

pub fn summary_to_string(summary: &AttendanceSummary) -> TrackerResult<String> {
    let bytes = summary_to_bytes(summary)?;
    // The writer only ever receives strings.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads back a summary written by [write_summary]. The count columns are
/// located by name.
pub fn read_summary<R: Read>(reader: R, name: &str) -> TrackerResult<AttendanceSummary> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context(CsvReadSnafu { name })?.clone();
    let handle_idx = column_index(&headers, HANDLE_COLUMN, name)?;
    let mut count_idxs: Vec<(Category, usize)> = Vec::new();
    for c in Category::ALL {
        count_idxs.push((c, column_index(&headers, &c.column_name(), name)?));
    }

    let mut rows: Vec<SummaryRow> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvReadSnafu { name })?;
        let mut row = SummaryRow::new(cell(&line, handle_idx).trim());
        for (c, col_idx) in count_idxs.iter() {
            let value = cell(&line, *col_idx);
            let count = value
                .trim()
                .parse::<u64>()
                .ok()
                .context(InvalidCountSnafu {
                    value,
                    lineno,
                    name,
                })?;
            row.set_count(*c, count);
        }
        rows.push(row);
    }
    debug!("read_summary: {}: {} rows", name, rows.len());
    Ok(AttendanceSummary::from_rows(rows))
}

fn column_index(headers: &StringRecord, column: &str, name: &str) -> TrackerResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .context(MissingColumnSnafu { column, name })
}

fn cell(line: &StringRecord, idx: usize) -> &str {
    line.get(idx).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::testing::{EVENTS_CSV, RESPONSES_CSV};
    use attendance::PeriodKey;

    #[test]
    fn read_raw_responses() {
        let reports = read_self_reports(RESPONSES_CSV.as_bytes(), "responses.csv").unwrap();
        assert_eq!(reports.len(), 4);
        // Not normalized yet.
        assert_eq!(reports[0].handle, "Alice ");
        assert_eq!(reports[0].secret_word, " FOO ");
        assert_eq!(reports[0].week, PeriodKey::Number(1));
        assert_eq!(reports[0].activity, "HM");
    }

    #[test]
    fn read_raw_events() {
        let events = read_events(EVENTS_CSV.as_bytes(), "events.csv").unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2].secret_word, "Apple");
        assert_eq!(events[2].activity, "GM");
    }

    #[test]
    fn columns_are_found_by_name() {
        let data = "Activity Type,Secret Word,Notes,Week\nQSM,kiwi,,7\n";
        let events = read_events(data.as_bytes(), "events.csv").unwrap();
        assert_eq!(events, vec![OfficialEvent::new("7", "kiwi", "QSM")]);
    }

    #[test]
    fn missing_column() {
        let data = "Week,Secret Word\n1,foo\n";
        let err = read_events(data.as_bytes(), "events.csv").unwrap_err();
        assert!(
            matches!(err, TrackerError::MissingColumn { ref column, .. } if column == ACTIVITY_COLUMN),
            "{:?}",
            err
        );
    }

    #[test]
    fn summary_layout() {
        let mut alice = SummaryRow::new("alice");
        alice.set_count(Category::Hm, 1);
        let mut bob = SummaryRow::new("bob");
        bob.set_count(Category::Qsm, 3);
        let summary = AttendanceSummary::from_rows(vec![bob, alice]);

        let s = summary_to_string(&summary).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(
            lines,
            vec![
                "HKN Handle,HMs Attended,Cookie Runs Attended,Teaching Sessions Attended,CMs Attended,GMs Attended,Inter-Committee Dutys Attended,QSMs Attended",
                "alice,1,0,0,0,0,0,0",
                "bob,0,0,0,0,0,0,3",
            ]
        );

        let back = read_summary(s.as_bytes(), "attendance.csv").unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn summary_with_invalid_count() {
        let data = "HKN Handle,HMs Attended,Cookie Runs Attended,Teaching Sessions Attended,CMs Attended,GMs Attended,Inter-Committee Dutys Attended,QSMs Attended\n\
                    alice,1,0,0,0,-2,0,0\n";
        let err = read_summary(data.as_bytes(), "attendance.csv").unwrap_err();
        assert!(
            matches!(err, TrackerError::InvalidCount { lineno: 2, .. }),
            "{:?}",
            err
        );
    }
}
