pub mod config;
pub mod presets;

pub use config::ReportConfig;

use crate::assets::FlagLoader;
use crate::domain::report::ReportPayload;
use crate::error::NormalizeError;
use crate::ingest::SnapshotSource;
use crate::normalize::assemble;
use crate::time::ReportDates;

/// Fetch the snapshot for `dates.today` and normalize it. A missing snapshot
/// surfaces as [`NormalizeError::NoDataForDate`] (recoverable via
/// `downcast_ref`).
pub async fn build_report(
    source: &dyn SnapshotSource,
    config: &ReportConfig,
    dates: &ReportDates,
    flags: &dyn FlagLoader,
) -> anyhow::Result<ReportPayload> {
    let today = dates.today_key();
    tracing::info!(report = %config.kind, date = %today, source = source.source_name(), "fetching market snapshot");

    let snapshot = source
        .fetch_snapshot(dates.today)
        .await?
        .ok_or_else(|| NormalizeError::NoDataForDate(today.clone()))?;

    let payload = assemble(&snapshot, config, dates, flags)?;

    tracing::info!(
        report = %config.kind,
        date = %today,
        exchange_rates = payload.exchange_rates.len(),
        today_events = payload.today_calendar.as_ref().map_or(0, |d| d.event_count()),
        yesterday_events = payload.yesterday_calendar.as_ref().map_or(0, |d| d.event_count()),
        "report normalized"
    );
    Ok(payload)
}
