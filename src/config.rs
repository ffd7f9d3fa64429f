//! Configuration management using the prefer crate for file discovery.
//!
//! A config file (`earchive.toml`, `.yaml` or `.json`) is discovered by
//! prefer or passed explicitly, parsed with serde, applied over defaults,
//! and finally overridden by environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "earchive.db";

/// Default blob subdirectory name.
const BLOBS_SUBDIR: &str = "blobs";

/// OCR worker settings.
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// Tesseract language list, e.g. `eng` or `ara+eng`.
    pub language: String,
    /// Rasterization resolution for paged documents.
    pub dpi: u32,
    /// Parent directory for per-job scratch dirs (system temp if unset).
    pub temp_dir: Option<PathBuf>,
    /// Jobs processed concurrently by one worker.
    pub max_concurrent_jobs: usize,
    /// Timeout for the worker's callback POST.
    pub callback_timeout_secs: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
            temp_dir: None,
            max_concurrent_jobs: 2,
            callback_timeout_secs: 30,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Directory for uploaded document bytes, when configured explicitly.
    /// Otherwise blobs live under `data_dir`; see [`Settings::blobs_dir`].
    pub blobs_dir: Option<PathBuf>,
    /// Address the archive service listens on.
    pub bind: String,
    /// Address the OCR worker listens on.
    pub worker_bind: String,
    /// Base URL the worker uses to reach the archive's callback endpoints.
    pub public_url: String,
    /// Base URL of the OCR worker.
    pub worker_url: String,
    /// Timeout for dispatching a job to the worker.
    pub dispatch_timeout_secs: u64,
    /// Shared secret required on callback requests, if set.
    pub callback_token: Option<String>,
    pub ocr: OcrSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("earchive");

        Self {
            data_dir,
            blobs_dir: None,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            bind: "127.0.0.1:8080".to_string(),
            worker_bind: "127.0.0.1:8090".to_string(),
            public_url: "http://127.0.0.1:8080".to_string(),
            worker_url: "http://127.0.0.1:8090".to_string(),
            dispatch_timeout_secs: 10,
            callback_token: None,
            ocr: OcrSettings::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Directory for uploaded document bytes.
    pub fn blobs_dir(&self) -> PathBuf {
        self.blobs_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(BLOBS_SUBDIR))
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            let path = self.data_dir.join(&self.database_filename);
            format!("sqlite:{}", path.display())
        }
    }

    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.blobs_dir())?;
        if let Some(ref temp) = self.ocr.temp_dir {
            std::fs::create_dir_all(temp)?;
        }
        Ok(())
    }

    /// Apply `EARCHIVE_*` and `DATABASE_URL` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("EARCHIVE_DATA_DIR") {
            self.data_dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(url) = var("EARCHIVE_PUBLIC_URL") {
            self.public_url = url;
        }
        if let Some(url) = var("EARCHIVE_WORKER_URL") {
            self.worker_url = url;
        }
        if let Some(token) = var("EARCHIVE_CALLBACK_TOKEN") {
            self.callback_token = Some(token).filter(|t| !t.is_empty());
        }
    }
}

/// OCR section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_jobs: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_timeout_secs: Option<u64>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Blob directory (defaults to `<data_dir>/blobs`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_token: Option<String>,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers earchive config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("earchive").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found, use defaults
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref blobs_dir) = self.blobs_dir {
            settings.blobs_dir = Some(self.resolve_path(blobs_dir, base_dir));
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(ref bind) = self.worker_bind {
            settings.worker_bind = bind.clone();
        }
        if let Some(ref url) = self.public_url {
            settings.public_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ref url) = self.worker_url {
            settings.worker_url = url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = self.dispatch_timeout_secs {
            settings.dispatch_timeout_secs = timeout;
        }
        if let Some(ref token) = self.callback_token {
            settings.callback_token = Some(token.clone()).filter(|t| !t.is_empty());
        }

        let ocr = &self.ocr;
        if let Some(ref language) = ocr.language {
            settings.ocr.language = language.clone();
        }
        if let Some(dpi) = ocr.dpi {
            settings.ocr.dpi = dpi;
        }
        if let Some(ref temp_dir) = ocr.temp_dir {
            settings.ocr.temp_dir = Some(self.resolve_path(temp_dir, base_dir));
        }
        if let Some(jobs) = ocr.max_concurrent_jobs {
            settings.ocr.max_concurrent_jobs = jobs.max(1);
        }
        if let Some(timeout) = ocr.callback_timeout_secs {
            settings.ocr.callback_timeout_secs = timeout;
        }
    }
}

/// Load settings: explicit config path, else prefer discovery, then env.
pub async fn load_settings(config_path: Option<&Path>) -> anyhow::Result<(Settings, Config)> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?,
        None => Config::load().await,
    };

    let base_dir = match config.base_dir() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides();

    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_extension() {
        let toml_cfg = Config::parse(
            "data_dir = \"archive\"\n[ocr]\nlanguage = \"ara+eng\"\ndpi = 200\n",
            Path::new("earchive.toml"),
        )
        .unwrap();
        assert_eq!(toml_cfg.data_dir.as_deref(), Some("archive"));
        assert_eq!(toml_cfg.ocr.language.as_deref(), Some("ara+eng"));

        let yaml_cfg = Config::parse(
            "worker_url: http://ocr:9000/\nocr:\n  max_concurrent_jobs: 4\n",
            Path::new("earchive.yml"),
        )
        .unwrap();
        assert_eq!(yaml_cfg.ocr.max_concurrent_jobs, Some(4));

        let json_cfg = Config::parse(r#"{"callback_token": "s3cret"}"#, Path::new("earchive.json"))
            .unwrap();
        assert_eq!(json_cfg.callback_token.as_deref(), Some("s3cret"));

        assert!(Config::parse("not = [valid", Path::new("bad.toml")).is_err());
    }

    #[test]
    fn test_apply_to_settings_resolves_relative_paths() {
        let config = Config {
            data_dir: Some("archive".to_string()),
            worker_url: Some("http://ocr:9000/".to_string()),
            ocr: OcrConfig {
                dpi: Some(150),
                temp_dir: Some("/scratch".to_string()),
                max_concurrent_jobs: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/earchive"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/earchive/archive"));
        assert_eq!(settings.blobs_dir(), PathBuf::from("/etc/earchive/archive/blobs"));
        assert_eq!(settings.worker_url, "http://ocr:9000");
        assert_eq!(settings.ocr.dpi, 150);
        assert_eq!(settings.ocr.temp_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(settings.ocr.max_concurrent_jobs, 1);
        assert_eq!(settings.ocr.language, "eng");
    }

    #[test]
    fn test_data_dir_override_keeps_configured_blobs_dir() {
        let config = Config {
            data_dir: Some("archive".to_string()),
            blobs_dir: Some("/mnt/scans".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/earchive"));

        let env = |key: &str| (key == "EARCHIVE_DATA_DIR").then(|| "/srv/earchive".to_string());
        settings.apply_overrides_from(env);
        assert_eq!(settings.data_dir, PathBuf::from("/srv/earchive"));
        assert_eq!(settings.blobs_dir(), PathBuf::from("/mnt/scans"));

        let mut derived = Settings::default();
        derived.apply_overrides_from(env);
        assert_eq!(derived.blobs_dir(), PathBuf::from("/srv/earchive/blobs"));
    }

    #[test]
    fn test_database_url() {
        let settings = Settings::with_data_dir(PathBuf::from("/data"));
        assert_eq!(settings.database_url(), "sqlite:/data/earchive.db");
    }
}
