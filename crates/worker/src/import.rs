use anyhow::Context;
use chrono::NaiveDate;
use fince_core::ingest::provider::parse_snapshot;
use fince_core::storage::PgSnapshotStore;
use fince_core::time::report_day::parse_date_arg;
use std::path::Path;

/// Load a snapshot JSON file into the store. The key is `--date` if given,
/// else the document's own `_id`.
pub async fn import_snapshot_file(
    store: &PgSnapshotStore,
    file: &Path,
    date_arg: Option<&str>,
) -> anyhow::Result<NaiveDate> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("read snapshot file failed: {}", file.display()))?;

    let date = import_key(&text, date_arg)?;
    let rows = store.upsert_snapshot(date, &text).await?;

    tracing::info!(%date, file = %file.display(), rows, "imported market snapshot");
    Ok(date)
}

fn import_key(text: &str, date_arg: Option<&str>) -> anyhow::Result<NaiveDate> {
    let snapshot = parse_snapshot(text)?;
    let id = match (date_arg, snapshot.id.as_deref()) {
        (Some(arg), _) => arg,
        (None, Some(id)) => id,
        (None, None) => anyhow::bail!("snapshot has no _id; pass --date"),
    };
    parse_date_arg(id)
}
