//! Configuration loader and validator for the batch catalog browser.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub api: Api,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub images: Images,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub output_dir: String,
}

/// Remote catalog API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    pub popular_path: String,
    pub batches_path: String,
}

/// Paging, debounce, cache and observer tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub page_size: u32,
    pub debounce_ms: u64,
    pub stale_secs: u64,
    pub gc_secs: u64,
    pub threshold: f64,
    pub root_margin_px: f64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            page_size: 16,
            debounce_ms: 500,
            stale_secs: 5 * 60,
            gc_secs: 10 * 60,
            threshold: 0.1,
            root_margin_px: 200.0,
        }
    }
}

/// Image resolution bases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Images {
    pub static_base: String,
    pub fallback: String,
}

impl Default for Images {
    fn default() -> Self {
        Self {
            static_base: crate::image::STATIC_ASSET_BASE.to_string(),
            fallback: crate::image::FALLBACK_IMAGE_URL.to_string(),
        }
    }
}

impl Catalog {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }

    pub fn evict_after(&self) -> Duration {
        Duration::from_secs(self.gc_secs)
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.output_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.output_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.output_dir)
    }

    /// Parsed API base URL. Validation guarantees this succeeds for loaded configs.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api.base_url).map_err(|_| ConfigError::Invalid("api.base_url must be a valid URL"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.output_dir must be non-empty"));
    }

    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    cfg.base_url()?;
    if cfg.api.popular_path.trim().is_empty() {
        return Err(ConfigError::Invalid("api.popular_path must be non-empty"));
    }
    if cfg.api.batches_path.trim().is_empty() {
        return Err(ConfigError::Invalid("api.batches_path must be non-empty"));
    }

    let c = &cfg.catalog;
    if c.page_size == 0 {
        return Err(ConfigError::Invalid("catalog.page_size must be > 0"));
    }
    if c.debounce_ms == 0 {
        return Err(ConfigError::Invalid("catalog.debounce_ms must be > 0"));
    }
    if c.gc_secs < c.stale_secs {
        return Err(ConfigError::Invalid("catalog.gc_secs must be >= catalog.stale_secs"));
    }
    if !(c.threshold > 0.0 && c.threshold <= 1.0) {
        return Err(ConfigError::Invalid("catalog.threshold must be in (0, 1]"));
    }
    if c.root_margin_px < 0.0 {
        return Err(ConfigError::Invalid("catalog.root_margin_px must be >= 0"));
    }

    if cfg.images.static_base.trim().is_empty() {
        return Err(ConfigError::Invalid("images.static_base must be non-empty"));
    }
    if cfg.images.fallback.trim().is_empty() {
        return Err(ConfigError::Invalid("images.fallback must be non-empty"));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  output_dir: "./out"

api:
  base_url: "https://api.example.com/"
  popular_path: "v1/batches/popular"
  batches_path: "v1/batches"

catalog:
  page_size: 16
  debounce_ms: 500
  stale_secs: 300
  gc_secs: 600
  threshold: 0.1
  root_margin_px: 200

images:
  static_base: "https://static.pw.live/"
  fallback: "https://static.pw.live/5eb393ee95fab7468a79d189/9ef3bea0-6eed-46a8-b148-4a35dd6b3b61.png"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.catalog, Catalog::default());
        assert_eq!(cfg.images, Images::default());
    }

    #[test]
    fn catalog_and_images_sections_default_when_omitted() {
        let yaml = r#"app:
  output_dir: "./out"
api:
  base_url: "http://localhost:8080/"
  popular_path: "popular"
  batches_path: "batches"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.catalog.page_size, 16);
        assert_eq!(cfg.catalog.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("api.base_url")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "not a url".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_catalog_tuning() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.page_size = 0;
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("page_size")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.gc_secs = 10;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.threshold = 0.0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.debounce_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_output_dir() {
        let td = tempdir().unwrap();
        let out_path = td.path().join("out");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.output_dir = out_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(out_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.api.batches_path, "v1/batches");
    }
}
