use crate::domain::snapshot::{CalendarEvent, Quote};
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Asia,
    Usa,
    Global,
    Futures,
    Btc,
    Tsla,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Asia,
        ReportKind::Usa,
        ReportKind::Global,
        ReportKind::Futures,
        ReportKind::Btc,
        ReportKind::Tsla,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Asia => "asia",
            ReportKind::Usa => "usa",
            ReportKind::Global => "global",
            ReportKind::Futures => "futures",
            ReportKind::Btc => "btc",
            ReportKind::Tsla => "tsla",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryTag {
    pub code: String,
    pub iso3: String,
    /// `data:` URI; absent when the flag asset could not be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: CalendarEvent,
    pub country: CountryTag,
    /// Parsed `event.date`, used for ordering.
    #[serde(skip)]
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryEvents {
    pub country: String,
    pub events: Vec<EnrichedEvent>,
}

/// One day of calendar, shaped per the report's grouping mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalendarDay {
    Flat(Vec<EnrichedEvent>),
    ByCountry(Vec<CountryEvents>),
}

impl CalendarDay {
    pub fn event_count(&self) -> usize {
        match self {
            CalendarDay::Flat(events) => events.len(),
            CalendarDay::ByCountry(groups) => groups.iter().map(|g| g.events.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: &'static str,
}

/// Everything the renderer needs for one report. Section and highlight maps
/// are flattened so templates address them by key at the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub report: ReportKind,
    pub title: String,
    pub today_date_string: String,
    pub previous_date_string: String,
    pub today_date: DateParts,
    pub yesterday_date: DateParts,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Vec<Quote>>,
    pub exchange_rates: Vec<Quote>,
    pub usd_krw_fallback: bool,
    #[serde(flatten)]
    pub highlights: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yesterday_calendar: Option<CalendarDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_calendar: Option<CalendarDay>,
}
