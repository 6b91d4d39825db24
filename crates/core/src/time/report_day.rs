use crate::domain::report::DateParts;
use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

/// Reports are dated in KST regardless of where the job runs.
pub const REPORT_UTC_OFFSET_SECS: i32 = 9 * 3600;

const WEEKDAYS_KO: [&str; 7] = ["월", "화", "수", "목", "금", "토", "일"];

pub fn report_offset() -> anyhow::Result<FixedOffset> {
    FixedOffset::east_opt(REPORT_UTC_OFFSET_SECS).context("invalid KST offset")
}

/// Calendar date of `now_utc` in the reporting time zone.
pub fn report_today(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    Ok(now_utc.with_timezone(&report_offset()?).date_naive())
}

/// Most recent Mon-Fri strictly before `date`. Public holidays are not
/// considered.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut d = date - Duration::days(1);
    while is_weekend(d) {
        d = d - Duration::days(1);
    }
    d
}

pub fn parse_date_arg(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {s}"))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn date_parts(date: NaiveDate) -> DateParts {
    DateParts {
        year: date.year(),
        month: date.month(),
        day: date.day(),
        weekday: WEEKDAYS_KO[date.weekday().num_days_from_monday() as usize],
    }
}

/// `2024년 6월 7일`, used in mail subjects.
pub fn korean_long_date(date: NaiveDate) -> String {
    format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
}

/// The "today" / "yesterday" pair a report is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportDates {
    pub today: NaiveDate,
    pub previous_business_day: NaiveDate,
}

impl ReportDates {
    pub fn for_day(today: NaiveDate) -> Self {
        Self {
            today,
            previous_business_day: previous_business_day(today),
        }
    }

    pub fn from_now(now_utc: DateTime<Utc>) -> anyhow::Result<Self> {
        Ok(Self::for_day(report_today(now_utc)?))
    }

    pub fn today_key(&self) -> String {
        date_key(self.today)
    }

    pub fn previous_key(&self) -> String {
        date_key(self.previous_business_day)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}
