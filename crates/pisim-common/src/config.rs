//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared configuration loading and validation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

/// Upper bound on records per batch; the whole batch is held in memory.
pub const MAX_COUNT: usize = 100_000;

fn default_count() -> usize {
    1
}

fn default_pacing() -> Duration {
    Duration::from_millis(200)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for a simulator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "PISIM_CONFIG";
    pub const ENV_ENDPOINT: &'static str = "PISIM_ENDPOINT";
    pub const DEFAULT_PATH: &'static str = "configs/pisim.toml";

    /// Load configuration, respecting the `PISIM_CONFIG` override.
    ///
    /// An explicitly named file (environment or `explicit`) must exist. The
    /// default location is optional; defaults apply when it is absent.
    pub fn load_with_source(explicit: Option<&Path>) -> Result<LoadedAppConfig> {
        Self::load_from(std::env::var(Self::ENV_CONFIG_PATH).ok(), explicit)
    }

    /// [`AppConfig::load_with_source`] with the `PISIM_CONFIG` value supplied
    /// by the caller. Blank values count as unset.
    pub fn load_from(env_value: Option<String>, explicit: Option<&Path>) -> Result<LoadedAppConfig> {
        let env_path = non_blank(env_value).map(PathBuf::from);
        Self::resolve(env_path, explicit.map(Path::to_path_buf), Path::new(Self::DEFAULT_PATH))
    }

    fn resolve(
        env_path: Option<PathBuf>,
        explicit: Option<PathBuf>,
        fallback: &Path,
    ) -> Result<LoadedAppConfig> {
        if let Some(path) = env_path.or(explicit) {
            let config = Self::from_path(&path)?;
            return Ok(LoadedAppConfig {
                config,
                source: Some(path),
            });
        }

        if fallback.exists() {
            let config = Self::from_path(fallback)?;
            return Ok(LoadedAppConfig {
                config,
                source: Some(fallback.to_path_buf()),
            });
        }

        debug!(fallback = %fallback.display(), "no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply the `PISIM_ENDPOINT` environment override when present.
    pub fn apply_env_overrides(&mut self) {
        self.apply_endpoint_override(std::env::var(Self::ENV_ENDPOINT).ok());
    }

    /// Replace the file endpoint with `value` unless it is absent or blank.
    pub fn apply_endpoint_override(&mut self, value: Option<String>) {
        if let Some(endpoint) = non_blank(value) {
            self.upload.endpoint = endpoint;
        }
    }

    /// Validate structural invariants. Called once every override is applied.
    pub fn validate(&self) -> Result<()> {
        self.upload.validate()?;
        self.generator.validate()?;
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    /// Parse without validating; overrides may still fill in the endpoint.
    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(content).with_context(|| "failed to parse configuration")
    }
}

/// Destination of the batch upload.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub endpoint: String,
    /// Request timeout. Absent means the transport default applies.
    #[serde(default, rename = "timeout_secs")]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

impl UploadConfig {
    /// Parse the endpoint, failing fast on empty or non-http(s) values.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self.endpoint.trim();
        if raw.is_empty() {
            bail!(
                "upload endpoint is not configured; set upload.endpoint, {} or --endpoint",
                AppConfig::ENV_ENDPOINT
            );
        }
        let url = Url::parse(raw).with_context(|| format!("invalid upload endpoint '{raw}'"))?;
        match url.scheme() {
            "http" | "https" => {}
            other => bail!("upload endpoint must use http or https, got '{other}'"),
        }
        if url.host_str().is_none() {
            return Err(anyhow!("upload endpoint '{raw}' has no host"));
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint_url().map(|_| ())
    }
}

/// Record generation parameters.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_pacing", rename = "pacing_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub pacing: Duration,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            pacing: default_pacing(),
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(anyhow!("generator.count must be at least 1"));
        }
        if self.count > MAX_COUNT {
            return Err(anyhow!(
                "generator.count {} exceeds the limit of {MAX_COUNT}",
                self.count
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling log file. File logging is off when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[upload]
endpoint = "https://storage.example.com/bins/1g3idq"
timeout_secs = 15

[generator]
count = 5
pacing_ms = 50
seed = 7

[logging]
directory = "target/logs"
format = "structured-json"
"#;

    #[test]
    fn parses_full_document() {
        let config: AppConfig = FULL.parse().unwrap();
        assert_eq!(config.upload.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.generator.count, 5);
        assert_eq!(config.generator.pacing, Duration::from_millis(50));
        assert_eq!(config.generator.seed, Some(7));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        config.validate().unwrap();
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.generator.count, 1);
        assert_eq!(config.generator.pacing, Duration::from_millis(200));
        assert!(config.upload.timeout.is_none());
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn missing_endpoint_fails_validation() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn rejects_non_http_endpoints() {
        let mut config = AppConfig::default();
        config.upload.endpoint = "ftp://storage.example.com/bin".into();
        assert!(config.validate().is_err());
        config.upload.endpoint = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_count() {
        let mut config = AppConfig::default();
        config.upload.endpoint = "http://127.0.0.1:9000/bin".into();
        config.generator.count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_count() {
        let mut config = AppConfig::default();
        config.upload.endpoint = "http://127.0.0.1:9000/bin".into();
        config.generator.count = usize::MAX;
        assert!(config.validate().is_err());
        config.generator.count = MAX_COUNT;
        config.validate().unwrap();
    }

    #[test]
    fn endpoint_override_replaces_file_value() {
        let mut config: AppConfig = FULL.parse().unwrap();
        config.apply_endpoint_override(Some("  http://10.0.0.5:8080/bin  ".into()));
        assert_eq!(config.upload.endpoint, "http://10.0.0.5:8080/bin");
    }

    #[test]
    fn blank_endpoint_override_is_ignored() {
        let mut config: AppConfig = FULL.parse().unwrap();
        config.apply_endpoint_override(Some("   ".into()));
        assert_eq!(config.upload.endpoint, "https://storage.example.com/bins/1g3idq");
        config.apply_endpoint_override(None);
        assert_eq!(config.upload.endpoint, "https://storage.example.com/bins/1g3idq");
    }

    #[test]
    fn load_from_honours_config_env_value() -> Result<()> {
        let mut env_file = NamedTempFile::new()?;
        writeln!(env_file, "[generator]\ncount = 4")?;
        let mut explicit_file = NamedTempFile::new()?;
        writeln!(explicit_file, "[generator]\ncount = 8")?;

        let env_value = Some(env_file.path().display().to_string());
        let loaded = AppConfig::load_from(env_value, Some(explicit_file.path()))?;
        assert_eq!(loaded.config.generator.count, 4);
        assert_eq!(loaded.source.as_deref(), Some(env_file.path()));

        let loaded = AppConfig::load_from(Some("  ".into()), Some(explicit_file.path()))?;
        assert_eq!(loaded.config.generator.count, 8);

        assert!(AppConfig::load_from(Some("does/not/exist.toml".into()), None).is_err());
        Ok(())
    }

    #[test]
    fn resolve_prefers_env_then_explicit() -> Result<()> {
        let mut env_file = NamedTempFile::new()?;
        writeln!(env_file, "[generator]\ncount = 3")?;
        let mut explicit_file = NamedTempFile::new()?;
        writeln!(explicit_file, "[generator]\ncount = 9")?;

        let loaded = AppConfig::resolve(
            Some(env_file.path().to_path_buf()),
            Some(explicit_file.path().to_path_buf()),
            Path::new("does/not/exist.toml"),
        )?;
        assert_eq!(loaded.config.generator.count, 3);

        let loaded = AppConfig::resolve(
            None,
            Some(explicit_file.path().to_path_buf()),
            Path::new("does/not/exist.toml"),
        )?;
        assert_eq!(loaded.config.generator.count, 9);
        assert_eq!(loaded.source.as_deref(), Some(explicit_file.path()));
        Ok(())
    }

    #[test]
    fn resolve_falls_back_to_defaults() -> Result<()> {
        let loaded = AppConfig::resolve(None, None, Path::new("does/not/exist.toml"))?;
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.generator.count, 1);
        Ok(())
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = AppConfig::resolve(
            None,
            Some(PathBuf::from("does/not/exist.toml")),
            Path::new("does/not/exist.toml"),
        );
        assert!(result.is_err());
    }
}
