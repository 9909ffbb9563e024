use log::{info, warn};

use attendance::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::PathBuf;

use text_diff::print_diff;

use crate::tracker::cache::{AttendanceCache, Freshness, RawSource};
use crate::tracker::slack::{EphemeralMessage, MessageSink};
use crate::tracker::webhook::SlashCommand;

pub mod cache;
pub mod config_reader;
pub mod io_csv;
pub mod slack;
pub mod webhook;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TrackerError {
    #[snafu(display("Missing setting {name}: pass --{flag} or set the {name} environment variable"))]
    MissingSetting { name: String, flag: String },

    #[snafu(display("Could not create the HTTP client"))]
    HttpClient { source: reqwest::Error },
    #[snafu(display("Error fetching {url}"))]
    FetchSource { source: reqwest::Error, url: String },
    #[snafu(display("Fetching {url} returned status {status}"))]
    SourceStatus { url: String, status: u16 },

    #[snafu(display("Error reading CSV data from {name}"))]
    CsvRead { source: csv::Error, name: String },
    #[snafu(display("Missing column {column:?} in {name}"))]
    MissingColumn { column: String, name: String },
    #[snafu(display("Invalid count {value:?} on line {lineno} of {name}"))]
    InvalidCount {
        value: String,
        lineno: u64,
        name: String,
    },
    #[snafu(display("Error writing CSV data"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error accessing {}", path.display()))]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("No attendance summary is available"))]
    SummaryUnavailable {
        #[snafu(source(from(TrackerError, Box::new)))]
        source: Box<TrackerError>,
    },

    #[snafu(display("Error parsing the slash command"))]
    ParsingForm {
        source: serde_urlencoded::de::Error,
    },
    #[snafu(display("Error sending the message to Slack"))]
    DeliveryRequest { source: reqwest::Error },
    #[snafu(display("Slack rejected the message: {error}"))]
    Delivery { error: String },
    #[snafu(display("Could not listen on {bind}: {message}"))]
    ServerStart { bind: String, message: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// What a lookup produced, before it is turned into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(SummaryRow),
    NotFound(String),
    Unavailable,
}

/// Everything needed to answer a slash command.
pub struct Tracker<S: RawSource, M: MessageSink> {
    pub cache: AttendanceCache<S>,
    pub sink: M,
    pub support_contact: Option<String>,
}

impl<S: RawSource, M: MessageSink> Tracker<S, M> {
    pub fn new(cache: AttendanceCache<S>, sink: M, support_contact: Option<String>) -> Self {
        Tracker {
            cache,
            sink,
            support_contact,
        }
    }

    /// Looks up a handle in the current summary, refreshing it if needed.
    pub fn lookup_outcome(&self, handle: &str) -> LookupOutcome {
        let cached = match self.cache.get_summary() {
            Ok(cached) => cached,
            Err(e) => {
                warn!("lookup_outcome: {}: {}", handle, e);
                return LookupOutcome::Unavailable;
            }
        };
        if cached.freshness == Freshness::Stale {
            warn!("lookup_outcome: serving a stale summary for {}", handle);
        }
        match lookup(&cached.summary, handle) {
            Ok(row) => LookupOutcome::Found(row.clone()),
            Err(LookupError::IdentityNotFound(h)) => {
                info!("lookup_outcome: no attendance for {:?}", h);
                LookupOutcome::NotFound(h)
            }
        }
    }

    /// Answers a slash command with an ephemeral message.
    pub fn reply(&self, command: &SlashCommand) -> TrackerResult<()> {
        info!(
            "Attendance requested by {} ({}) in {}",
            command.user_name, command.user_id, command.channel_id
        );
        let outcome = self.lookup_outcome(&command.user_name);
        let message = EphemeralMessage::render(
            &command.channel_id,
            &command.user_id,
            &outcome,
            self.support_contact.as_deref(),
        );
        self.sink.send(&message)
    }
}

/// Rebuilds the summary and prints it.
///
/// If a reference summary is provided, the rebuilt summary must match it.
pub fn run_refresh<S: RawSource>(
    cache: &AttendanceCache<S>,
    check_summary_path: Option<String>,
) -> TrackerResult<()> {
    let summary = cache.refresh()?;
    let computed = io_csv::summary_to_string(&summary)?;
    print!("{}", computed);

    if let Some(summary_p) = check_summary_path {
        let path = PathBuf::from(summary_p);
        let file = fs::File::open(&path).context(IoSnafu { path: path.clone() })?;
        let reference = io_csv::read_summary(file, &path.display().to_string())?;
        // Both sides go through the same writer so that only the content is compared.
        let expected = io_csv::summary_to_string(&reference)?;
        if expected != computed {
            warn!("Found differences with the reference summary");
            print_diff(expected.as_str(), computed.as_str(), "\n");
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("The summary matches {}", path.display());
    }
    Ok(())
}

/// Prints the attendance of one person. Returns false if they are not in the
/// summary.
pub fn run_lookup<S: RawSource>(cache: &AttendanceCache<S>, handle: &str) -> TrackerResult<bool> {
    let cached = cache.get_summary()?;
    if cached.freshness == Freshness::Stale {
        warn!("The spreadsheets could not be fetched, the summary may be out of date");
    }
    match describe_attendance(&cached.summary, handle) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            Ok(true)
        }
        Err(e) => {
            println!("{}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};

    use crate::tracker::cache::SourceKind;

    pub const RESPONSES_CSV: &str = "\
Timestamp,HKN Handle,Week,Secret Word,Activity Type
2023-01-10 10:00:00,Alice , 1, FOO ,HM
2023-01-11 10:00:00,bob,2,bar,HM
2023-01-12 10:00:00,carol,1,apple,GM
2023-01-19 10:00:00,carol,2,pear,GM
";

    pub const EVENTS_CSV: &str = "\
Week,Secret Word,Activity Type
1,foo,HM
2,baz,HM
1,Apple,GM
2,pear,GM
";

    /// A source serving fixed content, or failing.
    pub struct StaticSource {
        pub responses: Option<String>,
        pub events: Option<String>,
        pub calls: Cell<usize>,
    }

    impl StaticSource {
        pub fn new(responses: &str, events: &str) -> StaticSource {
            StaticSource {
                responses: Some(responses.to_string()),
                events: Some(events.to_string()),
                calls: Cell::new(0),
            }
        }

        pub fn failing() -> StaticSource {
            StaticSource {
                responses: None,
                events: None,
                calls: Cell::new(0),
            }
        }
    }

    impl RawSource for StaticSource {
        fn fetch(&self, kind: SourceKind) -> TrackerResult<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            let content = match kind {
                SourceKind::Responses => &self.responses,
                SourceKind::Events => &self.events,
            };
            match content {
                Some(s) => Ok(s.as_bytes().to_vec()),
                None => SourceStatusSnafu {
                    url: format!("static://{:?}", kind),
                    status: 503u16,
                }
                .fail(),
            }
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: RefCell<Vec<EphemeralMessage>>,
    }

    impl MessageSink for RecordingSink {
        fn send(&self, message: &EphemeralMessage) -> TrackerResult<()> {
            self.sent.borrow_mut().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::tracker::config_reader::CacheSettings;
    use std::time::Duration;
    use tempfile::tempdir;

    fn tracker(dir: &std::path::Path, source: StaticSource) -> Tracker<StaticSource, RecordingSink> {
        let settings = CacheSettings {
            data_dir: dir.to_path_buf(),
            max_age: Duration::from_secs(7 * 24 * 3600),
        };
        Tracker::new(
            AttendanceCache::new(settings, source),
            RecordingSink::default(),
            Some("U0SUPPORT".to_string()),
        )
    }

    fn command(user_name: &str) -> SlashCommand {
        SlashCommand {
            channel_id: "C123".to_string(),
            user_id: "U456".to_string(),
            user_name: user_name.to_string(),
        }
    }

    #[test]
    fn reply_with_progress() {
        let dir = tempdir().unwrap();
        let t = tracker(dir.path(), StaticSource::new(RESPONSES_CSV, EVENTS_CSV));
        t.reply(&command("alice")).unwrap();

        let sent = t.sink.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, "C123");
        assert_eq!(sent[0].user, "U456");
        let body = serde_json::to_string(&sent[0].blocks).unwrap();
        assert!(body.contains("*HMs Attended*: 1"), "{}", body);
        assert!(body.contains("<@U0SUPPORT>"), "{}", body);
    }

    #[test]
    fn reply_for_unknown_person() {
        let dir = tempdir().unwrap();
        let t = tracker(dir.path(), StaticSource::new(RESPONSES_CSV, EVENTS_CSV));
        assert_eq!(t.lookup_outcome("bob"), LookupOutcome::NotFound("bob".to_string()));
        t.reply(&command("bob")).unwrap();
        let sent = t.sink.sent.borrow();
        assert!(sent[0].text.contains("No attendance"), "{}", sent[0].text);
    }

    #[test]
    fn reply_without_data() {
        let dir = tempdir().unwrap();
        let t = tracker(dir.path(), StaticSource::failing());
        assert_eq!(t.lookup_outcome("alice"), LookupOutcome::Unavailable);
        t.reply(&command("alice")).unwrap();
        assert_eq!(t.sink.sent.borrow().len(), 1);
    }

    #[test]
    fn lookup_outcome_counts() {
        let dir = tempdir().unwrap();
        let t = tracker(dir.path(), StaticSource::new(RESPONSES_CSV, EVENTS_CSV));
        match t.lookup_outcome("Carol") {
            LookupOutcome::Found(row) => {
                assert_eq!(row.count(Category::Gm), 2);
                assert_eq!(row.count(Category::Hm), 0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn refresh_matches_reference() {
        let dir = tempdir().unwrap();
        let t = tracker(dir.path(), StaticSource::new(RESPONSES_CSV, EVENTS_CSV));
        let reference = dir.path().join("reference.csv");
        fs::write(
            &reference,
            "HKN Handle,HMs Attended,Cookie Runs Attended,Teaching Sessions Attended,CMs Attended,GMs Attended,Inter-Committee Dutys Attended,QSMs Attended\r\n\
             carol,0,0,0,0,2,0,0\r\n\
             alice,1,0,0,0,0,0,0\r\n",
        )
        .unwrap();
        run_refresh(&t.cache, Some(reference.display().to_string())).unwrap();

        fs::write(
            &reference,
            "HKN Handle,HMs Attended,Cookie Runs Attended,Teaching Sessions Attended,CMs Attended,GMs Attended,Inter-Committee Dutys Attended,QSMs Attended\n\
             alice,2,0,0,0,0,0,0\n",
        )
        .unwrap();
        assert!(run_refresh(&t.cache, Some(reference.display().to_string())).is_err());
    }

    #[test]
    fn lookup_command() {
        let dir = tempdir().unwrap();
        let t = tracker(dir.path(), StaticSource::new(RESPONSES_CSV, EVENTS_CSV));
        assert!(run_lookup(&t.cache, "ALICE").unwrap());
        assert!(!run_lookup(&t.cache, "bob").unwrap());
    }
}
