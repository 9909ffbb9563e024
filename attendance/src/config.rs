// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The week in which an activity took place.
///
/// Spreadsheet exports are not consistent with numbers: the same week may be
/// written `1`, `01`, `1.0` or ` 1`. Numeric keys are compared by value, anything
/// else is compared as trimmed text.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum PeriodKey {
    Number(i64),
    Label(String),
}

impl PeriodKey {
    pub fn parse(raw: &str) -> PeriodKey {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return PeriodKey::Number(n);
        }
        // Some exports write whole numbers as `1.0`.
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 => {
                PeriodKey::Number(x as i64)
            }
            _ => PeriodKey::Label(trimmed.to_string()),
        }
    }
}

impl Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodKey::Number(n) => write!(f, "{}", n),
            PeriodKey::Label(s) => write!(f, "{}", s),
        }
    }
}

/// The activity categories that are tracked separately.
///
/// The order of the variants is the order of the columns in the summary.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Hm,
    CookieRun,
    TeachingSession,
    Cm,
    Gm,
    InterCommitteeDuty,
    Qsm,
}

impl Category {
    pub const COUNT: usize = 7;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Hm,
        Category::CookieRun,
        Category::TeachingSession,
        Category::Cm,
        Category::Gm,
        Category::InterCommitteeDuty,
        Category::Qsm,
    ];

    /// The value of the `Activity Type` cell in both spreadsheets.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Hm => "HM",
            Category::CookieRun => "Cookie Run",
            Category::TeachingSession => "Teaching Session",
            Category::Cm => "CM",
            Category::Gm => "GM",
            Category::InterCommitteeDuty => "Inter-Committee Duty",
            Category::Qsm => "QSM",
        }
    }

    /// The name of the count column in the summary, e.g. `HMs Attended`.
    pub fn column_name(&self) -> String {
        format!("{}s Attended", self.label())
    }

    /// Labels come from drop-down menus: they are matched exactly, modulo
    /// surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Category> {
        let trimmed = label.trim();
        Category::ALL.iter().copied().find(|c| c.label() == trimmed)
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A claim made by a person that they attended an activity.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SelfReport {
    pub handle: String,
    pub week: PeriodKey,
    pub secret_word: String,
    pub activity: String,
}

impl SelfReport {
    pub fn new(handle: &str, week: &str, secret_word: &str, activity: &str) -> SelfReport {
        SelfReport {
            handle: handle.to_string(),
            week: PeriodKey::parse(week),
            secret_word: secret_word.to_string(),
            activity: activity.trim().to_string(),
        }
    }

    /// The same record with the handle and the secret word in canonical form.
    pub fn normalized(&self) -> SelfReport {
        SelfReport {
            handle: crate::normalize_identity(&self.handle),
            week: self.week.clone(),
            secret_word: crate::normalize_identity(&self.secret_word),
            activity: self.activity.clone(),
        }
    }
}

/// An activity that officially took place.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OfficialEvent {
    pub week: PeriodKey,
    pub secret_word: String,
    pub activity: String,
}

impl OfficialEvent {
    pub fn new(week: &str, secret_word: &str, activity: &str) -> OfficialEvent {
        OfficialEvent {
            week: PeriodKey::parse(week),
            secret_word: secret_word.to_string(),
            activity: activity.trim().to_string(),
        }
    }

    pub fn normalized(&self) -> OfficialEvent {
        OfficialEvent {
            week: self.week.clone(),
            secret_word: crate::normalize_identity(&self.secret_word),
            activity: self.activity.clone(),
        }
    }
}

// ******** Output data structures *********

/// Number of validated attendances of one person in one category.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryCount {
    pub handle: String,
    pub count: u64,
}

/// One line of the summary: the counts of one person for every category.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SummaryRow {
    pub handle: String,
    pub counts: [u64; Category::COUNT],
}

impl SummaryRow {
    pub fn new(handle: &str) -> SummaryRow {
        SummaryRow {
            handle: handle.to_string(),
            counts: [0; Category::COUNT],
        }
    }

    pub fn count(&self, category: Category) -> u64 {
        self.counts[category.index()]
    }

    pub fn set_count(&mut self, category: Category, count: u64) {
        self.counts[category.index()] = count;
    }

    /// The counts, in category order.
    pub fn per_category(&self) -> Vec<(Category, u64)> {
        Category::ALL
            .iter()
            .map(|c| (*c, self.count(*c)))
            .collect()
    }

    /// Human-readable `category: count` lines, in category order.
    pub fn lines(&self) -> Vec<String> {
        self.per_category()
            .iter()
            .map(|(c, n)| format!("{}: {}", c.column_name(), n))
            .collect()
    }
}

/// The per-person attendance table.
///
/// Invariant: the rows are sorted by handle.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AttendanceSummary {
    rows: Vec<SummaryRow>,
}

impl AttendanceSummary {
    /// Builds a summary out of rows in any order. The sort is stable, so if
    /// a handle is repeated the first row stays first.
    pub fn from_rows(mut rows: Vec<SummaryRow>) -> AttendanceSummary {
        rows.sort_by(|a, b| a.handle.cmp(&b.handle));
        AttendanceSummary { rows }
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row with this exact handle.
    pub fn find(&self, handle: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.handle == handle)
    }
}

/// Errors when reading a person's attendance.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum LookupError {
    /// Nobody with this (normalized) handle is in the summary.
    IdentityNotFound(String),
}

impl Error for LookupError {}

impl Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::IdentityNotFound(handle) => {
                write!(f, "no attendance recorded for {:?}", handle)
            }
        }
    }
}
