use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub feed: FeedTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// CDN prefix prepended to backdrop paths when building image URLs.
    #[serde(default = "default_image_cdn")]
    pub image_cdn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Authenticated user identifier; produced by the sign-in flow, which is
    /// outside this tool's scope.
    #[serde(default)]
    pub name: Option<String>,
}

/// Feed cadence knobs. The defaults match the shipped client; they are
/// tunable, not load-bearing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedTuning {
    /// Window size after a fresh load.
    #[serde(default = "default_initial_window")]
    pub initial_window: usize,
    /// Items appended to the window per `load_more` page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Unseen-buffer level below which a background refill is triggered.
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
    /// Shown-set size that forces a sync flush.
    #[serde(default = "default_shown_flush_threshold")]
    pub shown_flush_threshold: usize,
    /// A refill runs after every Nth backend-confirmed rating.
    #[serde(default = "default_refill_rating_interval")]
    pub refill_rating_interval: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_image_cdn() -> String {
    "https://image.tmdb.org/t/p/original".to_string()
}

fn default_initial_window() -> usize {
    10
}

fn default_page_size() -> usize {
    10
}

fn default_low_water_mark() -> usize {
    15
}

fn default_shown_flush_threshold() -> usize {
    3
}

fn default_refill_rating_interval() -> u64 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            image_cdn: default_image_cdn(),
        }
    }
}

impl Default for FeedTuning {
    fn default() -> Self {
        Self {
            initial_window: default_initial_window(),
            page_size: default_page_size(),
            low_water_mark: default_low_water_mark(),
            shown_flush_threshold: default_shown_flush_threshold(),
            refill_rating_interval: default_refill_rating_interval(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_cadence() {
        let tuning = FeedTuning::default();
        assert_eq!(tuning.initial_window, 10);
        assert_eq!(tuning.page_size, 10);
        assert_eq!(tuning.low_water_mark, 15);
        assert_eq!(tuning.shown_flush_threshold, 3);
        assert_eq!(tuning.refill_rating_interval, 3);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "http://192.168.1.18:8000"

            [feed]
            low_water_mark = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://192.168.1.18:8000");
        assert_eq!(config.backend.image_cdn, "https://image.tmdb.org/t/p/original");
        assert_eq!(config.feed.low_water_mark, 20);
        assert_eq!(config.feed.page_size, 10);
        assert!(config.user.name.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.user.name = Some("Shamik".to_string());
        config.feed.shown_flush_threshold = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.user.name.as_deref(), Some("Shamik"));
        assert_eq!(loaded.feed.shown_flush_threshold, 5);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/reelrec.toml")).unwrap();
        assert_eq!(config.feed.initial_window, 10);
    }
}
