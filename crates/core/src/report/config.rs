use crate::domain::report::ReportKind;
use crate::domain::snapshot::{NewsSource, QuoteSource};
use crate::error::ConfigError;
use std::collections::{BTreeMap, BTreeSet};

/// Payload keys owned by the assembler; sections and highlights may not reuse them.
const RESERVED_KEYS: [&str; 10] = [
    "report",
    "title",
    "today_date_string",
    "previous_date_string",
    "today_date",
    "yesterday_date",
    "exchange_rates",
    "usd_krw_fallback",
    "yesterday_calendar",
    "today_calendar",
];

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 3;

/// Which bundled template a report renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Market,
    Crypto,
    Stock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSection {
    pub key: String,
    pub source: QuoteSource,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FxConfig {
    pub source: QuoteSource,
    /// `XXX/KRW` pairs in output order.
    pub wanted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryMeta {
    /// Country name as it appears in the snapshot calendar.
    pub name: String,
    pub code: String,
    pub iso3: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Flat,
    ByCountry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarConfig {
    /// Relevant countries, in display order.
    pub countries: Vec<CountryMeta>,
    pub min_importance: u8,
    pub grouping: Grouping,
}

impl CalendarConfig {
    pub fn country(&self, name: &str) -> Option<&CountryMeta> {
        self.countries.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Highlight {
    /// Free-form `stocks.<stock>` document.
    Stock { key: String, stock: String },
    /// `{price, market_cap}` for one coin.
    CryptoPrice {
        key: String,
        symbol: String,
        source: QuoteSource,
    },
    News { key: String, source: NewsSource },
}

impl Highlight {
    pub fn key(&self) -> &str {
        match self {
            Highlight::Stock { key, .. }
            | Highlight::CryptoPrice { key, .. }
            | Highlight::News { key, .. } => key,
        }
    }
}

/// Everything that distinguishes one market report from another.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub kind: ReportKind,
    pub title: String,
    pub layout: Layout,
    pub sections: Vec<InstrumentSection>,
    pub fx: Option<FxConfig>,
    pub calendar: Option<CalendarConfig>,
    pub highlights: Vec<Highlight>,
    /// Template helper name -> (symbol -> display name).
    pub name_maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl ReportConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        let keys = self
            .sections
            .iter()
            .map(|s| s.key.as_str())
            .chain(self.highlights.iter().map(Highlight::key));
        for key in keys {
            if RESERVED_KEYS.contains(&key) || !seen.insert(key) {
                return Err(ConfigError::DuplicateSection(key.to_string()));
            }
        }

        if let Some(fx) = &self.fx {
            for pair in &fx.wanted {
                if krw_base(pair).is_none() {
                    return Err(ConfigError::UnsupportedPair(pair.clone()));
                }
            }
        }

        if let Some(cal) = &self.calendar {
            if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&cal.min_importance) {
                return Err(ConfigError::ImportanceOutOfRange(cal.min_importance));
            }
        }

        Ok(self)
    }

    /// Override the calendar threshold, e.g. from the CLI.
    pub fn with_min_importance(mut self, min_importance: u8) -> Result<Self, ConfigError> {
        if let Some(cal) = self.calendar.as_mut() {
            cal.min_importance = min_importance;
        }
        self.validate()
    }
}

/// `"JPY/KRW"` -> `Some("JPY")`.
pub fn krw_base(pair: &str) -> Option<&str> {
    pair.strip_suffix("/KRW")
        .filter(|base| !base.is_empty() && !base.contains('/'))
}

pub(crate) fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn name_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
