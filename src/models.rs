use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A crowd-sourced campus status report, as read from `campus_status_message`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    #[allow(dead_code)]
    pub content: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

/// Report category. Upstream values are opaque strings; anything that is not
/// one of the known tags is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Traffic,
    Cafeteria,
    Weather,
    Event,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Traffic => "TRAFFIC",
            Category::Cafeteria => "CAFETERIA",
            Category::Weather => "WEATHER",
            Category::Event => "EVENT",
            Category::Other(raw) => raw,
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "TRAFFIC" => Category::Traffic,
            "CAFETERIA" => Category::Cafeteria,
            "WEATHER" => Category::Weather,
            "EVENT" => Category::Event,
            _ => Category::Other(raw),
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Category::from(raw.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local weekday as a three-letter uppercase code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    /// Days that receive a forecast timeline.
    pub const WORKDAYS: [DayOfWeek; 5] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
    ];

    pub fn code(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "MON",
            DayOfWeek::Tue => "TUE",
            DayOfWeek::Wed => "WED",
            DayOfWeek::Thu => "THU",
            DayOfWeek::Fri => "FRI",
            DayOfWeek::Sat => "SAT",
            DayOfWeek::Sun => "SUN",
        }
    }

    pub fn is_workday(self) -> bool {
        !matches!(self, DayOfWeek::Sat | DayOfWeek::Sun)
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MON" => Ok(DayOfWeek::Mon),
            "TUE" => Ok(DayOfWeek::Tue),
            "WED" => Ok(DayOfWeek::Wed),
            "THU" => Ok(DayOfWeek::Thu),
            "FRI" => Ok(DayOfWeek::Fri),
            "SAT" => Ok(DayOfWeek::Sat),
            "SUN" => Ok(DayOfWeek::Sun),
            other => Err(format!("unknown day code '{other}', expected MON..SUN")),
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Local (weekday, hour, quarter-hour) bucket a report falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub day: DayOfWeek,
    pub hour: u32,
    pub minute_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    pub hour: u32,
    pub minute_offset: u32,
    pub dominant_category: Category,
    pub report_count: usize,
    pub congestion_score: u8,
    pub summary: String,
}

impl TimeSlot {
    /// Zero-padded 24-hour `HH:MM` label.
    pub fn time_label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute_offset)
    }
}

#[derive(Debug, Clone)]
pub struct Timeline {
    pub university_id: i32,
    pub day: DayOfWeek,
    pub slots: Vec<TimeSlot>,
    pub updated_at: DateTime<Utc>,
}

impl Timeline {
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.slots.iter().map(TimelineEntry::from).collect()
    }
}

/// Persisted shape of one slot inside `campus_prediction.timeline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time: String,
    pub congestion: u8,
    pub category: String,
    pub summary: String,
}

impl From<&TimeSlot> for TimelineEntry {
    fn from(slot: &TimeSlot) -> Self {
        Self {
            time: slot.time_label(),
            congestion: slot.congestion_score,
            category: slot.dominant_category.as_str().to_string(),
            summary: slot.summary.clone(),
        }
    }
}

/// A stored prediction row read back from `campus_prediction`.
#[derive(Debug, Clone)]
pub struct StoredPrediction {
    pub day: DayOfWeek,
    pub timeline: Vec<TimelineEntry>,
    pub updated_at: DateTime<Utc>,
}

/// What happened to one university during a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UniversityOutcome {
    Updated {
        university_id: i32,
        days_written: Vec<DayOfWeek>,
        days_failed: Vec<DayFailure>,
    },
    Skipped {
        university_id: i32,
    },
    Failed {
        university_id: i32,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayFailure {
    pub day: DayOfWeek,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUniversity {
    pub university_id: i32,
    pub reason: String,
}

/// Job-level result of a refresh run. Always returned, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshResult {
    Success {
        processed: Vec<String>,
        skipped: Vec<i32>,
        failed: Vec<FailedUniversity>,
        outcomes: Vec<UniversityOutcome>,
    },
    Error {
        message: String,
    },
}

impl RefreshResult {
    pub fn is_error(&self) -> bool {
        matches!(self, RefreshResult::Error { .. })
    }
}
