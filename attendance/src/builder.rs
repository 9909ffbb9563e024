pub use crate::config::*;

/// A builder for collecting raw records.
///
/// The records are normalized as they are added, so that the builder can be
/// fed directly with the content of the spreadsheets.
///
/// ```
/// use attendance::builder::Builder;
/// use attendance::Category;
///
/// let mut builder = Builder::new();
/// builder.add_self_report("Alice ", "1", " FOO ", "HM");
/// builder.add_event("1", "foo", "HM");
///
/// let summary = builder.build();
/// assert_eq!(summary.find("alice").map(|r| r.count(Category::Hm)), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _reports: Vec<SelfReport>,
    pub(crate) _events: Vec<OfficialEvent>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Adds the submission of a person. The handle and the secret word do
    /// not need to be trimmed or lowercased.
    pub fn add_self_report(&mut self, handle: &str, week: &str, secret_word: &str, activity: &str) {
        self.add_self_report_2(&SelfReport::new(handle, week, secret_word, activity))
    }

    pub fn add_self_report_2(&mut self, report: &SelfReport) {
        self._reports.push(report.normalized());
    }

    pub fn add_event(&mut self, week: &str, secret_word: &str, activity: &str) {
        self.add_event_2(&OfficialEvent::new(week, secret_word, activity))
    }

    pub fn add_event_2(&mut self, event: &OfficialEvent) {
        self._events.push(event.normalized());
    }

    pub fn reports(&self) -> &[SelfReport] {
        &self._reports
    }

    pub fn events(&self) -> &[OfficialEvent] {
        &self._events
    }

    /// Runs the reconciliation over all the records added so far.
    pub fn build(&self) -> AttendanceSummary {
        crate::run_attendance_stats(&self._reports, &self._events)
    }
}
