use crate::assets::{flag_data_uri, FlagLoader};
use crate::domain::report::{CalendarDay, CountryEvents, CountryTag, EnrichedEvent};
use crate::domain::snapshot::Calendar;
use crate::error::NormalizeError;
use crate::report::config::{CalendarConfig, CountryMeta, Grouping};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// date -> country -> events, importance-filtered, enriched and time-sorted.
/// Dates and countries with nothing left are absent.
pub type SelectedCalendar = BTreeMap<String, BTreeMap<String, Vec<EnrichedEvent>>>;

// Naive forms are read as UTC.
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn select_events(
    calendar: &Calendar,
    cfg: &CalendarConfig,
    flags: &dyn FlagLoader,
) -> Result<SelectedCalendar, NormalizeError> {
    let mut tags: HashMap<&str, CountryTag> = HashMap::new();
    let mut out = SelectedCalendar::new();

    for (date, by_country) in calendar {
        let mut day = BTreeMap::new();

        for meta in &cfg.countries {
            let Some(events) = by_country.get(&meta.name) else {
                continue;
            };

            let mut kept = Vec::new();
            for event in events.iter().filter(|e| e.importance >= cfg.min_importance) {
                kept.push((event_timestamp(&event.date)?, event));
            }
            if kept.is_empty() {
                continue;
            }
            kept.sort_by_key(|(at, _)| *at);

            let tag = tags
                .entry(meta.name.as_str())
                .or_insert_with(|| country_tag(meta, flags));
            let enriched = kept
                .into_iter()
                .map(|(at, event)| EnrichedEvent {
                    event: event.clone(),
                    country: tag.clone(),
                    at,
                })
                .collect();
            day.insert(meta.name.clone(), enriched);
        }

        if !day.is_empty() {
            out.insert(date.clone(), day);
        }
    }

    Ok(out)
}

/// One date's slice of `selected`, shaped per `cfg.grouping`. A date with no
/// entry yields an empty day.
pub fn calendar_day(selected: &SelectedCalendar, date: &str, cfg: &CalendarConfig) -> CalendarDay {
    let empty = BTreeMap::new();
    let by_country = selected.get(date).unwrap_or(&empty);

    match cfg.grouping {
        Grouping::Flat => {
            let mut events: Vec<EnrichedEvent> = cfg
                .countries
                .iter()
                .filter_map(|meta| by_country.get(&meta.name))
                .flatten()
                .cloned()
                .collect();
            events.sort_by_key(|e| e.at);
            CalendarDay::Flat(events)
        }
        Grouping::ByCountry => CalendarDay::ByCountry(
            cfg.countries
                .iter()
                .filter_map(|meta| {
                    by_country.get(&meta.name).map(|events| CountryEvents {
                        country: meta.name.clone(),
                        events: events.clone(),
                    })
                })
                .collect(),
        ),
    }
}

pub fn event_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizeError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc());
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc());
    }
    Err(NormalizeError::MalformedSnapshot(format!(
        "unparsable calendar event date: {raw:?}"
    )))
}

fn country_tag(meta: &CountryMeta, flags: &dyn FlagLoader) -> CountryTag {
    let flag = if !flags.enabled() {
        None
    } else {
        match flags.load_flag(&meta.code) {
            Ok(bytes) => Some(flag_data_uri(&bytes)),
            Err(err) => {
                tracing::warn!(country = %meta.name, code = %meta.code, error = %err, "flag asset unavailable; omitting flag");
                None
            }
        }
    };

    CountryTag {
        code: meta.code.clone(),
        iso3: meta.iso3.clone(),
        flag,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::snapshot::CalendarEvent;
    use crate::report::presets::country_meta;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `<svg/>` for every code except those listed as broken.
    #[derive(Default)]
    pub(crate) struct StubFlags {
        pub broken: Vec<&'static str>,
        pub calls: AtomicUsize,
    }

    impl FlagLoader for StubFlags {
        fn load_flag(&self, code: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!self.broken.iter().any(|b| *b == code), "no flag for {code}");
            Ok(b"<svg/>".to_vec())
        }
    }

    fn cal_cfg(countries: &[&str], min_importance: u8, grouping: Grouping) -> CalendarConfig {
        CalendarConfig {
            countries: countries.iter().filter_map(|c| country_meta(c)).collect(),
            min_importance,
            grouping,
        }
    }

    fn calendar(v: serde_json::Value) -> Calendar {
        serde_json::from_value(v).unwrap()
    }

    fn event_names(events: &[EnrichedEvent]) -> Vec<&str> {
        events
            .iter()
            .map(|e| e.event.fields["event"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn keeps_only_events_at_or_above_threshold() {
        let cal = calendar(json!({
            "2024-06-10": {
                "Japan": [
                    {"date": "2024-06-10T08:50:00+09:00", "importance": 1, "event": "Machine Orders"},
                    {"date": "2024-06-10T08:50:00+09:00", "importance": 3, "event": "GDP"}
                ]
            }
        }));
        let flags = StubFlags::default();
        let out = select_events(&cal, &cal_cfg(&["Japan"], 2, Grouping::Flat), &flags).unwrap();

        let japan = &out["2024-06-10"]["Japan"];
        assert_eq!(event_names(japan), ["GDP"]);
        assert_eq!(japan[0].event.importance, 3);
        assert_eq!(japan[0].country.code, "JP");
        assert_eq!(japan[0].country.iso3, "JPN");
        assert_eq!(
            japan[0].country.flag.as_deref(),
            Some("data:image/svg+xml;base64,PHN2Zy8+")
        );
    }

    #[test]
    fn omits_empty_groups_and_unknown_countries() {
        let cal = calendar(json!({
            "2024-06-10": {
                "Japan": [{"date": "2024-06-10 09:00", "importance": 1, "event": "a"}],
                "Mexico": [{"date": "2024-06-10 09:00", "importance": 3, "event": "b"}],
                "China": [{"date": "2024-06-10 09:00", "importance": 2, "event": "c"}]
            },
            "2024-06-11": {
                "Japan": [{"date": "2024-06-11 09:00", "importance": 1, "event": "d"}]
            }
        }));
        let flags = StubFlags::default();
        let out = select_events(&cal, &cal_cfg(&["Japan", "China"], 2, Grouping::Flat), &flags).unwrap();

        assert_eq!(out.len(), 1);
        let day = &out["2024-06-10"];
        assert_eq!(day.keys().collect::<Vec<_>>(), ["China"]);
        for groups in out.values() {
            for events in groups.values() {
                assert!(!events.is_empty());
                assert!(events.iter().all(|e| e.event.importance >= 2));
            }
        }
    }

    #[test]
    fn sorts_within_country_and_loads_each_flag_once() {
        let cal = calendar(json!({
            "2024-06-10": {
                "United States": [
                    {"date": "2024-06-10T14:00:00Z", "importance": 2, "event": "late"},
                    {"date": "2024-06-10T12:30:00Z", "importance": 3, "event": "early"},
                    {"date": "2024-06-10T13:00:00Z", "importance": 2, "event": "mid"}
                ]
            },
            "2024-06-11": {
                "United States": [{"date": "2024-06-11T12:30:00Z", "importance": 3, "event": "next"}]
            }
        }));
        let flags = StubFlags::default();
        let out = select_events(&cal, &cal_cfg(&["United States"], 2, Grouping::Flat), &flags).unwrap();

        assert_eq!(
            event_names(&out["2024-06-10"]["United States"]),
            ["early", "mid", "late"]
        );
        assert_eq!(flags.calls.load(Ordering::SeqCst), 1);
    }

    /// Disabled loader that counts any call it should never receive.
    #[derive(Default)]
    struct OffFlags {
        calls: AtomicUsize,
    }

    impl FlagLoader for OffFlags {
        fn load_flag(&self, code: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("no flag for {code}")
        }

        fn enabled(&self) -> bool {
            false
        }
    }

    #[test]
    fn disabled_flags_are_not_loaded() {
        let cal = calendar(json!({
            "2024-06-10": {
                "Japan": [{"date": "2024-06-10T08:50:00+09:00", "importance": 3, "event": "GDP"}],
                "China": [{"date": "2024-06-10T01:30:00Z", "importance": 2, "event": "CPI"}]
            }
        }));
        let flags = OffFlags::default();
        let out = select_events(&cal, &cal_cfg(&["Japan", "China"], 2, Grouping::Flat), &flags).unwrap();

        let day = &out["2024-06-10"];
        assert_eq!(day["Japan"][0].country.flag, None);
        assert_eq!(day["China"][0].country.code, "CN");
        assert_eq!(flags.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn broken_flag_degrades_to_no_flag() {
        let cal = calendar(json!({
            "2024-06-10": {"South Korea": [{"date": "2024-06-10", "importance": 3, "event": "CPI"}]}
        }));
        let flags = StubFlags {
            broken: vec!["KR"],
            ..Default::default()
        };
        let out = select_events(&cal, &cal_cfg(&["South Korea"], 2, Grouping::Flat), &flags).unwrap();
        let kr = &out["2024-06-10"]["South Korea"][0];
        assert_eq!(kr.country.flag, None);
        assert_eq!(kr.country.code, "KR");
    }

    #[test]
    fn unparsable_timestamp_fails_loudly() {
        let cal = calendar(json!({
            "2024-06-10": {"Japan": [{"date": "tomorrow-ish", "importance": 3}]}
        }));
        let err = select_events(&cal, &cal_cfg(&["Japan"], 2, Grouping::Flat), &StubFlags::default())
            .unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedSnapshot(_)));
    }

    #[test]
    fn flat_day_merges_countries_chronologically() {
        let cal = calendar(json!({
            "2024-06-10": {
                "China": [{"date": "2024-06-10T02:00:00Z", "importance": 2, "event": "cn"}],
                "Japan": [
                    {"date": "2024-06-10T01:00:00Z", "importance": 3, "event": "jp1"},
                    {"date": "2024-06-10T03:00:00Z", "importance": 3, "event": "jp2"}
                ]
            }
        }));
        let c = cal_cfg(&["Japan", "China"], 2, Grouping::Flat);
        let selected = select_events(&cal, &c, &StubFlags::default()).unwrap();

        let CalendarDay::Flat(events) = calendar_day(&selected, "2024-06-10", &c) else {
            panic!("expected flat day");
        };
        assert_eq!(event_names(&events), ["jp1", "cn", "jp2"]);

        assert_eq!(calendar_day(&selected, "2024-06-07", &c), CalendarDay::Flat(vec![]));
    }

    #[test]
    fn grouped_day_follows_configured_country_order() {
        let cal = calendar(json!({
            "2024-06-10": {
                "China": [{"date": "2024-06-10T02:00:00Z", "importance": 2, "event": "cn"}],
                "Japan": [{"date": "2024-06-10T01:00:00Z", "importance": 3, "event": "jp"}]
            }
        }));
        let c = cal_cfg(&["Japan", "China"], 2, Grouping::ByCountry);
        let selected = select_events(&cal, &c, &StubFlags::default()).unwrap();

        let CalendarDay::ByCountry(groups) = calendar_day(&selected, "2024-06-10", &c) else {
            panic!("expected grouped day");
        };
        let order: Vec<_> = groups.iter().map(|g| g.country.as_str()).collect();
        assert_eq!(order, ["Japan", "China"]);
    }

    #[test]
    fn timestamp_formats() {
        let utc = |s: &str| event_timestamp(s).unwrap().to_rfc3339();
        assert_eq!(utc("2024-06-10T08:50:00+09:00"), "2024-06-09T23:50:00+00:00");
        assert_eq!(utc("2024-06-10 08:50:00"), "2024-06-10T08:50:00+00:00");
        assert_eq!(utc("2024-06-10T08:50:00.250"), "2024-06-10T08:50:00.250+00:00");
        assert_eq!(utc("2024-06-10 08:50"), "2024-06-10T08:50:00+00:00");
        assert_eq!(utc("2024-06-10"), "2024-06-10T00:00:00+00:00");
        assert!(event_timestamp("10/06/2024").is_err());
    }

    #[test]
    fn event_fields_survive_enrichment() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "date": "2024-06-10T12:30:00Z",
            "importance": 3,
            "event": "CPI",
            "actual": "3.3%",
            "forecast": "3.4%"
        }))
        .unwrap();
        let enriched = EnrichedEvent {
            event,
            country: CountryTag {
                code: "US".to_string(),
                iso3: "USA".to_string(),
                flag: None,
            },
            at: event_timestamp("2024-06-10T12:30:00Z").unwrap(),
        };
        let v = serde_json::to_value(&enriched).unwrap();
        assert_eq!(v["actual"], json!("3.3%"));
        assert_eq!(v["country"], json!({"code": "US", "iso3": "USA"}));
        assert!(v.get("at").is_none());
    }
}
