use anyhow::Context;
use base64::Engine;
use std::path::PathBuf;

const FLAG_MIME: &str = "image/svg+xml";

/// Source of raw flag images, keyed by ISO alpha-2 country code.
pub trait FlagLoader: Send + Sync {
    fn load_flag(&self, code: &str) -> anyhow::Result<Vec<u8>>;

    /// `false` means flags are switched off and `load_flag` is never called.
    fn enabled(&self) -> bool {
        true
    }
}

/// Used when no flag directory is configured. Reports render without flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFlags;

impl FlagLoader for NoFlags {
    fn load_flag(&self, code: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("flag assets are disabled (FLAG_ASSET_DIR unset); no flag for {code}")
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// `FsFlagLoader` over `FLAG_ASSET_DIR` when it is set, else `NoFlags`.
pub fn flag_loader_from_settings(settings: &crate::config::Settings) -> Box<dyn FlagLoader> {
    match settings.flag_asset_dir.as_deref() {
        Some(dir) => {
            tracing::info!(dir, "loading country flags from disk");
            Box::new(FsFlagLoader::new(dir))
        }
        None => {
            tracing::info!("FLAG_ASSET_DIR unset; calendar events render without flags");
            Box::new(NoFlags)
        }
    }
}

/// Reads `<dir>/<code>.svg` (lowercase code).
#[derive(Debug, Clone)]
pub struct FsFlagLoader {
    dir: PathBuf,
}

impl FsFlagLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FlagLoader for FsFlagLoader {
    fn load_flag(&self, code: &str) -> anyhow::Result<Vec<u8>> {
        let code = code.trim().to_ascii_lowercase();
        anyhow::ensure!(
            !code.is_empty() && code.chars().all(|c| c.is_ascii_alphabetic()),
            "invalid country code: {code:?}"
        );
        let path = self.dir.join(format!("{code}.svg"));
        std::fs::read(&path).with_context(|| format!("read flag asset {}", path.display()))
    }
}

pub fn flag_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:{FLAG_MIME};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
