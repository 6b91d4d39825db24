//! Snapshot -> report payload. Every stage is pure apart from flag loading,
//! so the same snapshot, config, dates and flags always give the same payload.

pub mod calendar;
pub mod fx;
pub mod instruments;

use crate::assets::FlagLoader;
use crate::domain::report::ReportPayload;
use crate::domain::snapshot::Snapshot;
use crate::error::NormalizeError;
use crate::report::config::{Highlight, ReportConfig};
use crate::time::report_day::date_parts;
use crate::time::ReportDates;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub fn assemble(
    snapshot: &Snapshot,
    config: &ReportConfig,
    dates: &ReportDates,
    flags: &dyn FlagLoader,
) -> Result<ReportPayload, NormalizeError> {
    let sections = config
        .sections
        .iter()
        .map(|s| {
            let quotes = instruments::filter_quotes(snapshot.quotes(s.source), &s.names);
            (s.key.clone(), quotes)
        })
        .collect();

    let derived = match &config.fx {
        Some(fx_cfg) => fx::derive_krw_rates(snapshot.quotes(fx_cfg.source), &fx_cfg.wanted),
        None => fx::DerivedRates::default(),
    };
    if derived.usd_krw_fallback {
        tracing::warn!(report = %config.kind, "USD/KRW missing from snapshot; KRW crosses derived at rate 1");
    }
    for err in &derived.failures {
        tracing::warn!(report = %config.kind, error = %err, "exchange rate dropped");
    }

    let today_key = dates.today_key();
    let previous_key = dates.previous_key();

    let (yesterday_calendar, today_calendar) = match &config.calendar {
        Some(cal_cfg) => {
            let selected = match snapshot.calendar() {
                Some(cal) => calendar::select_events(cal, cal_cfg, flags)?,
                None => calendar::SelectedCalendar::new(),
            };
            (
                Some(calendar::calendar_day(&selected, &previous_key, cal_cfg)),
                Some(calendar::calendar_day(&selected, &today_key, cal_cfg)),
            )
        }
        None => (None, None),
    };

    Ok(ReportPayload {
        report: config.kind,
        title: config.title.clone(),
        today_date_string: today_key,
        previous_date_string: previous_key,
        today_date: date_parts(dates.today),
        yesterday_date: date_parts(dates.previous_business_day),
        sections,
        exchange_rates: derived.rates,
        usd_krw_fallback: derived.usd_krw_fallback,
        highlights: highlights(snapshot, &config.highlights),
        yesterday_calendar,
        today_calendar,
    })
}

fn highlights(snapshot: &Snapshot, wanted: &[Highlight]) -> BTreeMap<String, Value> {
    wanted
        .iter()
        .map(|h| {
            let value = match h {
                Highlight::Stock { stock, .. } => {
                    snapshot.stocks.get(stock).cloned().unwrap_or(Value::Null)
                }
                Highlight::CryptoPrice { symbol, source, .. } => {
                    let price = snapshot.quotes(*source).iter().find(|q| &q.name == symbol);
                    json!({
                        "price": price,
                        "market_cap": snapshot.coin_market_cap(symbol),
                    })
                }
                Highlight::News { source, .. } => Value::Array(snapshot.news(*source).to_vec()),
            };
            (h.key().to_string(), value)
        })
        .collect()
}
