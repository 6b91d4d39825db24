pub mod assets;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod render;
pub mod report;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub snapshot_base_url: Option<String>,
        pub snapshot_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub flag_asset_dir: Option<String>,
        pub report_output_dir: Option<String>,
        pub smtp_host: Option<String>,
        pub smtp_username: Option<String>,
        pub smtp_password: Option<String>,
        pub mail_from: Option<String>,
        pub mail_to: Vec<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                snapshot_base_url: std::env::var("SNAPSHOT_BASE_URL").ok(),
                snapshot_api_key: std::env::var("SNAPSHOT_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                flag_asset_dir: std::env::var("FLAG_ASSET_DIR").ok(),
                report_output_dir: std::env::var("REPORT_OUTPUT_DIR").ok(),
                smtp_host: std::env::var("SMTP_HOST").ok(),
                smtp_username: std::env::var("SMTP_USERNAME").ok(),
                smtp_password: std::env::var("SMTP_PASSWORD").ok(),
                mail_from: std::env::var("MAIL_FROM").ok(),
                mail_to: std::env::var("MAIL_TO")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_snapshot_base_url(&self) -> anyhow::Result<&str> {
            self.snapshot_base_url
                .as_deref()
                .context("SNAPSHOT_BASE_URL is required")
        }

        pub fn require_smtp_host(&self) -> anyhow::Result<&str> {
            self.smtp_host.as_deref().context("SMTP_HOST is required")
        }

        pub fn require_mail_from(&self) -> anyhow::Result<&str> {
            self.mail_from.as_deref().context("MAIL_FROM is required")
        }

        pub fn require_mail_to(&self) -> anyhow::Result<&[String]> {
            anyhow::ensure!(!self.mail_to.is_empty(), "MAIL_TO is required");
            Ok(&self.mail_to)
        }

        pub fn report_output_dir(&self) -> &str {
            self.report_output_dir.as_deref().unwrap_or("out")
        }
    }

    fn split_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

}
