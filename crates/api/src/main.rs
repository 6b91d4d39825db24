use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fince_core::assets::{flag_loader_from_settings, FlagLoader};
use fince_core::config::Settings;
use fince_core::domain::report::{ReportKind, ReportPayload};
use fince_core::error::{ConfigError, NormalizeError};
use fince_core::ingest::{HttpSnapshotSource, SnapshotSource};
use fince_core::render::ReportRenderer;
use fince_core::report::{build_report, ReportConfig};
use fince_core::storage::PgSnapshotStore;
use fince_core::time::report_day::parse_date_arg;
use fince_core::time::ReportDates;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let state = AppState {
        source: connect_source(&settings).await,
        flags: flag_loader_from_settings(&settings).into(),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Postgres when DATABASE_URL is set, else the HTTP snapshot source. Any
/// failure leaves the API up in degraded mode, answering 503 for reports.
async fn connect_source(settings: &Settings) -> Option<Arc<dyn SnapshotSource>> {
    if let Some(db_url) = settings.database_url.as_deref() {
        return match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match fince_core::storage::migrate(&pool).await {
                Ok(()) => Some(Arc::new(PgSnapshotStore::new(pool))),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        };
    }

    match HttpSnapshotSource::from_settings(settings) {
        Ok(source) => Some(Arc::new(source)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "no snapshot source configured; starting API in degraded mode");
            None
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/reports/:kind", get(get_today_report))
        .route("/reports/:kind/:date", get(get_report))
        .route("/reports/:kind/:date/html", get(get_report_html))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    source: Option<Arc<dyn SnapshotSource>>,
    flags: Arc<dyn FlagLoader>,
}

async fn get_today_report(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<ReportPayload>, StatusCode> {
    let kind = parse_kind(&kind)?;
    let dates = ReportDates::from_now(chrono::Utc::now()).map_err(|e| internal(&e))?;
    let (_, payload) = load(&state, kind, dates).await?;
    Ok(Json(payload))
}

async fn get_report(
    State(state): State<AppState>,
    Path((kind, date)): Path<(String, String)>,
) -> Result<Json<ReportPayload>, StatusCode> {
    let kind = parse_kind(&kind)?;
    let dates = parse_dates(&date)?;
    let (_, payload) = load(&state, kind, dates).await?;
    Ok(Json(payload))
}

async fn get_report_html(
    State(state): State<AppState>,
    Path((kind, date)): Path<(String, String)>,
) -> Result<Html<String>, StatusCode> {
    let kind = parse_kind(&kind)?;
    let dates = parse_dates(&date)?;
    let (config, payload) = load(&state, kind, dates).await?;

    let html = ReportRenderer::new(&config)
        .and_then(|renderer| renderer.render(&payload))
        .map_err(|e| internal(&e))?;
    Ok(Html(html))
}

async fn load(
    state: &AppState,
    kind: ReportKind,
    dates: ReportDates,
) -> Result<(ReportConfig, ReportPayload), StatusCode> {
    let Some(source) = &state.source else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let config = ReportConfig::preset(kind).map_err(|_| StatusCode::BAD_REQUEST)?;
    let payload = build_report(source.as_ref(), &config, &dates, state.flags.as_ref())
        .await
        .map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(report = %kind, date = %dates.today, error = %format!("{e:#}"), "report preview failed");
            }
            status
        })?;
    Ok((config, payload))
}

fn parse_kind(raw: &str) -> Result<ReportKind, StatusCode> {
    raw.parse::<ReportKind>().map_err(|_| StatusCode::BAD_REQUEST)
}

fn parse_dates(raw: &str) -> Result<ReportDates, StatusCode> {
    parse_date_arg(raw)
        .map(ReportDates::for_day)
        .map_err(|_| StatusCode::BAD_REQUEST)
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    if let Some(e) = err.downcast_ref::<NormalizeError>() {
        return match e {
            NormalizeError::NoDataForDate(_) => StatusCode::NOT_FOUND,
            NormalizeError::Config(_) => StatusCode::BAD_REQUEST,
            NormalizeError::MalformedSnapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return StatusCode::BAD_REQUEST;
    }
    let store_down = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
        )
    });
    if store_down {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

fn internal(err: &anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(err);
    tracing::error!(error = %format!("{err:#}"), "report preview failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use chrono::NaiveDate;
    use fince_core::domain::snapshot::Snapshot;

    struct OneDay(NaiveDate, Snapshot);

    #[async_trait::async_trait]
    impl SnapshotSource for OneDay {
        fn source_name(&self) -> &'static str {
            "test"
        }

        async fn fetch_snapshot(&self, date: NaiveDate) -> anyhow::Result<Option<Snapshot>> {
            Ok((date == self.0).then(|| self.1.clone()))
        }
    }

    fn state() -> AppState {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "market_data": {"indices": [{"name": "KOSPI", "current_price": 2701.17}]}
        }))
        .unwrap();
        AppState {
            source: Some(Arc::new(OneDay(
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                snapshot,
            ))),
            flags: Arc::new(fince_core::assets::NoFlags),
        }
    }

    fn path(kind: &str, date: &str) -> Path<(String, String)> {
        Path((kind.to_string(), date.to_string()))
    }

    #[tokio::test]
    async fn serves_payload_json() {
        let Json(payload) = get_report(State(state()), path("asia", "2024-06-10"))
            .await
            .unwrap();
        assert_eq!(payload.report, ReportKind::Asia);
        assert_eq!(payload.sections["indices"][0].name, "KOSPI");
        assert_eq!(payload.previous_date_string, "2024-06-07");
    }

    #[tokio::test]
    async fn serves_rendered_html() {
        let Html(html) = get_report_html(State(state()), path("asia", "2024-06-10"))
            .await
            .unwrap();
        assert!(html.contains("코스피"));
    }

    #[tokio::test]
    async fn maps_request_errors() {
        let err = get_report(State(state()), path("europe", "2024-06-10")).await.unwrap_err();
        assert_eq!(err, StatusCode::BAD_REQUEST);

        let err = get_report(State(state()), path("asia", "10/06/2024")).await.unwrap_err();
        assert_eq!(err, StatusCode::BAD_REQUEST);

        let err = get_report(State(state()), path("asia", "2024-06-11")).await.unwrap_err();
        assert_eq!(err, StatusCode::NOT_FOUND);

        let degraded = AppState {
            source: None,
            ..state()
        };
        let err = get_report(State(degraded), path("asia", "2024-06-10")).await.unwrap_err();
        assert_eq!(err, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn status_follows_error_chain() {
        let pool_down = anyhow::Error::new(sqlx::Error::PoolTimedOut).context("select failed");
        assert_eq!(status_for(&pool_down), StatusCode::SERVICE_UNAVAILABLE);

        let missing: anyhow::Error = NormalizeError::NoDataForDate("2024-06-10".into()).into();
        assert_eq!(status_for(&missing), StatusCode::NOT_FOUND);

        let other = Err::<(), _>(std::fmt::Error)
            .context("boom")
            .unwrap_err();
        assert_eq!(status_for(&other), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
