use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use attendance::builder::Builder;
use attendance::AttendanceSummary;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use snafu::prelude::*;

use crate::tracker::config_reader::{CacheSettings, SourceSettings};
use crate::tracker::*;

pub const RESPONSES_FILE: &str = "responses.csv";
pub const EVENTS_FILE: &str = "events.csv";
pub const ATTENDANCE_FILE: &str = "attendance.csv";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SourceKind {
    Responses,
    Events,
}

/// Where the raw spreadsheets come from.
pub trait RawSource {
    fn fetch(&self, kind: SourceKind) -> TrackerResult<Vec<u8>>;
}

/// Downloads the published spreadsheets.
pub struct HttpSource {
    client: Client,
    settings: SourceSettings,
}

impl HttpSource {
    pub fn new(settings: SourceSettings) -> TrackerResult<HttpSource> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context(HttpClientSnafu {})?;
        Ok(HttpSource { client, settings })
    }
}

impl RawSource for HttpSource {
    fn fetch(&self, kind: SourceKind) -> TrackerResult<Vec<u8>> {
        let url = match kind {
            SourceKind::Responses => &self.settings.responses_url,
            SourceKind::Events => &self.settings.events_url,
        };
        debug!("fetch: {:?} from {}", kind, url);
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .context(FetchSourceSnafu { url })?;
        let status = resp.status();
        if !status.is_success() {
            return SourceStatusSnafu {
                url,
                status: status.as_u16(),
            }
            .fail();
        }
        let bytes = resp.bytes().context(FetchSourceSnafu { url })?;
        debug!("fetch: {:?}: {} bytes", kind, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Freshness {
    /// Rebuilt recently enough.
    Fresh,
    /// The rebuild failed and an older summary is returned instead.
    Stale,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CachedSummary {
    pub summary: AttendanceSummary,
    pub freshness: Freshness,
}

/// The attendance summary, persisted in a directory together with the
/// spreadsheets it was computed from.
///
/// The modification time of the responses file is the time of the last
/// successful rebuild: it is written last.
pub struct AttendanceCache<S: RawSource> {
    settings: CacheSettings,
    source: S,
    rebuild_lock: Mutex<()>,
}

impl<S: RawSource> AttendanceCache<S> {
    pub fn new(settings: CacheSettings, source: S) -> Self {
        AttendanceCache {
            settings,
            source,
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn responses_path(&self) -> PathBuf {
        self.settings.data_dir.join(RESPONSES_FILE)
    }

    pub fn events_path(&self) -> PathBuf {
        self.settings.data_dir.join(EVENTS_FILE)
    }

    pub fn attendance_path(&self) -> PathBuf {
        self.settings.data_dir.join(ATTENDANCE_FILE)
    }

    /// Returns the current summary, rebuilding it first if it is missing or
    /// too old.
    pub fn get_summary(&self) -> TrackerResult<CachedSummary> {
        self.get_summary_at(SystemTime::now())
    }

    pub(crate) fn get_summary_at(&self, now: SystemTime) -> TrackerResult<CachedSummary> {
        if !self.needs_refresh(now) {
            match self.read_persisted() {
                Ok(summary) => {
                    return Ok(CachedSummary {
                        summary,
                        freshness: Freshness::Fresh,
                    })
                }
                Err(e) => {
                    warn!("get_summary: could not read the cached summary: {}", e);
                }
            }
        }

        match self.refresh() {
            Ok(summary) => Ok(CachedSummary {
                summary,
                freshness: Freshness::Fresh,
            }),
            Err(e) => {
                warn!("get_summary: could not rebuild the summary: {}", e);
                if !self.attendance_path().exists() {
                    return Err(e).context(SummaryUnavailableSnafu {});
                }
                match self.read_persisted() {
                    Ok(summary) => Ok(CachedSummary {
                        summary,
                        freshness: Freshness::Stale,
                    }),
                    Err(read_e) => {
                        warn!("get_summary: could not read the cached summary: {}", read_e);
                        Err(e).context(SummaryUnavailableSnafu {})
                    }
                }
            }
        }
    }

    /// True if the summary is missing or if the spreadsheets were downloaded
    /// more than `max_age` before `now`.
    pub fn needs_refresh(&self, now: SystemTime) -> bool {
        if !self.attendance_path().exists() {
            debug!("needs_refresh: no summary in {:?}", self.settings.data_dir);
            return true;
        }
        let modified = match fs::metadata(self.responses_path()).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                debug!("needs_refresh: {:?}: {}", self.responses_path(), e);
                return true;
            }
        };
        match now.duration_since(modified) {
            Ok(elapsed) => {
                debug!("needs_refresh: last download {:?} ago", elapsed);
                elapsed > self.settings.max_age
            }
            // Modified in the future: the clock moved, consider it fresh.
            Err(_) => false,
        }
    }

    /// Downloads both spreadsheets and rebuilds the summary, whatever the age
    /// of the current one.
    pub fn refresh(&self) -> TrackerResult<AttendanceSummary> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        info!("Fetching latest HKN attendance data");
        let responses_raw = self.source.fetch(SourceKind::Responses)?;
        let events_raw = self.source.fetch(SourceKind::Events)?;

        info!("Reading the spreadsheets");
        let mut builder = Builder::new();
        for report in io_csv::read_self_reports(&responses_raw, RESPONSES_FILE)?.iter() {
            builder.add_self_report_2(report);
        }
        for event in io_csv::read_events(&events_raw, EVENTS_FILE)?.iter() {
            builder.add_event_2(event);
        }

        info!("Calculating attendance");
        let summary = builder.build();
        let summary_bytes = io_csv::summary_to_bytes(&summary)?;

        let data_dir = &self.settings.data_dir;
        fs::create_dir_all(data_dir).context(IoSnafu { path: data_dir })?;
        write_atomic(&self.events_path(), &events_raw)?;
        write_atomic(&self.attendance_path(), &summary_bytes)?;
        write_atomic(&self.responses_path(), &responses_raw)?;
        info!(
            "Saved attendance for {} people in {}",
            summary.len(),
            self.attendance_path().display()
        );
        Ok(summary)
    }

    fn read_persisted(&self) -> TrackerResult<AttendanceSummary> {
        let path = self.attendance_path();
        let file = File::open(&path).context(IoSnafu { path: &path })?;
        io_csv::read_summary(file, ATTENDANCE_FILE)
    }
}

/// Replaces the content of a file. Readers see either the old or the new
/// content.
fn write_atomic(path: &Path, bytes: &[u8]) -> TrackerResult<()> {
    let tmp = path.with_extension("csv.tmp");
    let mut f = File::create(&tmp).context(IoSnafu { path: &tmp })?;
    f.write_all(bytes).context(IoSnafu { path: &tmp })?;
    f.sync_all().context(IoSnafu { path: &tmp })?;
    fs::rename(&tmp, path).context(IoSnafu { path })?;
    Ok(())
}
