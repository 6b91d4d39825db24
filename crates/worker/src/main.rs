use anyhow::Context;
use clap::{Parser, Subcommand};
use fince_core::assets::{flag_loader_from_settings, FlagLoader};
use fince_core::domain::report::ReportKind;
use fince_core::ingest::{HttpSnapshotSource, SnapshotSource};
use fince_core::render::ReportRenderer;
use fince_core::report::{build_report, ReportConfig};
use fince_core::storage::PgSnapshotStore;
use fince_core::time::report_day::parse_date_arg;
use fince_core::time::ReportDates;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod import;
mod mail;

#[derive(Debug, Parser)]
#[command(name = "fince_worker")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Report to build; repeatable. Defaults to every report.
    #[arg(long = "report", value_name = "KIND")]
    reports: Vec<ReportKind>,

    /// Report date (YYYY-MM-DD). Defaults to today's KST date.
    #[arg(long)]
    date: Option<String>,

    /// Output root; overrides REPORT_OUTPUT_DIR.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Calendar importance threshold (1-3); overrides each report's default.
    #[arg(long)]
    min_importance: Option<u8>,

    /// Normalize and log only. Nothing is written or sent.
    #[arg(long)]
    dry_run: bool,

    /// Email each rendered report.
    #[arg(long)]
    send: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a snapshot JSON file and upsert it into Postgres.
    Import {
        #[arg(long)]
        file: PathBuf,

        /// Snapshot key; defaults to the document's `_id`.
        #[arg(long)]
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fince_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Some(Command::Import { file, date }) = &args.command {
        let store = connect_store(&settings).await?;
        import::import_snapshot_file(&store, file, date.as_deref()).await?;
        return Ok(());
    }

    let dates = match args.date.as_deref() {
        Some(s) => ReportDates::for_day(parse_date_arg(s)?),
        None => ReportDates::from_now(chrono::Utc::now())?,
    };
    let kinds = if args.reports.is_empty() {
        ReportKind::ALL.to_vec()
    } else {
        args.reports.clone()
    };

    let source: Box<dyn SnapshotSource> = if settings.database_url.is_some() {
        Box::new(connect_store(&settings).await?)
    } else {
        Box::new(HttpSnapshotSource::from_settings(&settings)?)
    };
    let flags = flag_loader_from_settings(&settings);
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(settings.report_output_dir()));
    let mailer = if args.send && !args.dry_run {
        Some(mail::Mailer::from_settings(&settings)?)
    } else {
        None
    };

    let run = Run {
        source: source.as_ref(),
        flags: flags.as_ref(),
        dates,
        out_dir: &out_dir,
        min_importance: args.min_importance,
        dry_run: args.dry_run,
        mailer: mailer.as_ref(),
    };

    let mut failed = Vec::new();
    for kind in &kinds {
        if let Err(err) = run.report(*kind).await {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(report = %kind, date = %dates.today, error = %format!("{err:#}"), "report run failed");
            failed.push(kind.as_str());
        }
    }

    anyhow::ensure!(
        failed.is_empty(),
        "{} of {} reports failed: {}",
        failed.len(),
        kinds.len(),
        failed.join(", ")
    );
    Ok(())
}

struct Run<'a> {
    source: &'a dyn SnapshotSource,
    flags: &'a dyn FlagLoader,
    dates: ReportDates,
    out_dir: &'a Path,
    min_importance: Option<u8>,
    dry_run: bool,
    mailer: Option<&'a mail::Mailer>,
}

impl Run<'_> {
    async fn report(&self, kind: ReportKind) -> anyhow::Result<()> {
        let mut config = ReportConfig::preset(kind)?;
        if let Some(min) = self.min_importance {
            config = config.with_min_importance(min)?;
        }

        let payload = build_report(self.source, &config, &self.dates, self.flags).await?;
        let html = ReportRenderer::new(&config)?.render(&payload)?;

        if self.dry_run {
            tracing::info!(report = %kind, date = %self.dates.today, dry_run = true, html_len = html.len(), "report rendered");
            return Ok(());
        }

        let path = write_report(self.out_dir, &self.dates, kind, &html)?;
        tracing::info!(report = %kind, path = %path.display(), "report written");

        if let Some(mailer) = self.mailer {
            let subject = mail::subject(&config.title, self.dates.previous_business_day);
            mailer.send_report(subject, html).await?;
            tracing::info!(report = %kind, "report emailed");
        }
        Ok(())
    }
}

/// `<out_dir>/<yyyymmdd>/<kind>.html`
fn report_path(out_dir: &Path, dates: &ReportDates, kind: ReportKind) -> PathBuf {
    out_dir
        .join(dates.today.format("%Y%m%d").to_string())
        .join(format!("{kind}.html"))
}

fn write_report(
    out_dir: &Path,
    dates: &ReportDates,
    kind: ReportKind,
    html: &str,
) -> anyhow::Result<PathBuf> {
    let path = report_path(out_dir, dates, kind);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir failed: {}", dir.display()))?;
    }
    std::fs::write(&path, html)
        .with_context(|| format!("write report failed: {}", path.display()))?;
    Ok(path)
}

async fn connect_store(settings: &fince_core::config::Settings) -> anyhow::Result<PgSnapshotStore> {
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    fince_core::storage::migrate(&pool).await?;
    Ok(PgSnapshotStore::new(pool))
}

fn init_sentry(settings: &fince_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
