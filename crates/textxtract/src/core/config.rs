//! Extraction configuration.
//!
//! The effective configuration for a request is built in three layers:
//! process-wide defaults ([`global_defaults`]), extractor-level overrides and
//! per-call overrides. Each layer is a [`ConfigOverrides`] applied with
//! [`ExtractionConfig::merged`], which re-validates the result.
use crate::core::validation::normalize_extension;
use crate::{Result, TextxtractError};
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum input size: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Name of the file looked up by [`ExtractionConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "textxtract.toml";

/// Per-handler option map, keyed by option name.
pub type HandlerOptions = Map<String, Value>;

/// Diagnostic verbosity for per-request outcome events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown logging level '{}' (expected trace, debug, info, warn or error)",
                other
            )),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, String> {
        value.parse()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Bounds applied while traversing ZIP archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Maximum nesting depth of archives within archives (the outermost archive is depth 0).
    pub max_depth: usize,
    /// Cumulative uncompressed size ceiling across every entry of one request.
    ///
    /// `None` derives the ceiling from the effective `max_file_size`.
    pub max_total_size: Option<u64>,
    /// Maximum number of file entries per archive.
    pub max_entries: usize,
    /// Maximum uncompressed/compressed ratio for a single entry.
    pub max_compression_ratio: f64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_total_size: None,
            max_entries: 10_000,
            max_compression_ratio: 500.0,
        }
    }
}

/// Effective configuration handed to validators and handlers.
///
/// # Example
///
/// ```rust
/// use textxtract::{ConfigOverrides, ExtractionConfig};
///
/// let base = ExtractionConfig::default();
/// let overrides = ConfigOverrides::default().with_max_file_size(1024);
/// let merged = base.merged(&overrides).unwrap();
///
/// assert_eq!(merged.max_file_size, 1024);
/// assert_eq!(merged.encoding, "utf-8");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Charset label used to decode text-like formats.
    pub encoding: String,
    /// Maximum accepted input size in bytes.
    pub max_file_size: u64,
    /// Level for completion/failure events (`None` = debug).
    pub logging_level: Option<LogLevel>,
    /// Async deadline in seconds.
    pub timeout: Option<f64>,
    /// Async worker pool size (`None` = number of CPUs).
    pub max_workers: Option<usize>,
    /// Directory for temporary files (`None` = OS temp dir).
    pub temp_dir: Option<PathBuf>,
    pub archive: ArchiveConfig,
    /// Per-handler options keyed by normalized extension.
    pub handlers: HashMap<String, HandlerOptions>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            logging_level: None,
            timeout: None,
            max_workers: None,
            temp_dir: None,
            archive: ArchiveConfig::default(),
            handlers: HashMap::new(),
        }
    }
}

/// Partial archive bounds used inside [`ConfigOverrides`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveOverrides {
    pub max_depth: Option<usize>,
    pub max_total_size: Option<u64>,
    pub max_entries: Option<usize>,
    pub max_compression_ratio: Option<f64>,
}

/// A partial configuration layer. Unset fields leave the lower layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub encoding: Option<String>,
    pub max_file_size: Option<u64>,
    pub logging_level: Option<LogLevel>,
    pub timeout: Option<f64>,
    pub max_workers: Option<usize>,
    pub temp_dir: Option<PathBuf>,
    pub archive: Option<ArchiveOverrides>,
    pub handlers: HashMap<String, HandlerOptions>,
}

impl ConfigOverrides {
    /// Parse overrides from a JSON object. Unknown keys and mistyped values are usage errors.
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| TextxtractError::usage(format!("Invalid configuration overrides: {}", e)))
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        Self::from_json(Value::Object(map))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn with_logging_level(mut self, level: LogLevel) -> Self {
        self.logging_level = Some(level);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_secs_f64());
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_archive(mut self, archive: ArchiveOverrides) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Set a single option for the handler registered under `extension`.
    pub fn with_handler_option(mut self, extension: &str, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.handlers
            .entry(normalize_extension(extension))
            .or_default()
            .insert(key.into(), value.into());
        self
    }
}

impl ExtractionConfig {
    /// Apply an override layer on top of this configuration and validate the result.
    pub fn merged(&self, overrides: &ConfigOverrides) -> Result<Self> {
        let mut merged = self.clone();

        if let Some(encoding) = &overrides.encoding {
            merged.encoding = encoding.clone();
        }
        if let Some(max_file_size) = overrides.max_file_size {
            merged.max_file_size = max_file_size;
        }
        if let Some(level) = overrides.logging_level {
            merged.logging_level = Some(level);
        }
        if let Some(timeout) = overrides.timeout {
            merged.timeout = Some(timeout);
        }
        if let Some(workers) = overrides.max_workers {
            merged.max_workers = Some(workers);
        }
        if let Some(dir) = &overrides.temp_dir {
            merged.temp_dir = Some(dir.clone());
        }
        if let Some(archive) = &overrides.archive {
            if let Some(depth) = archive.max_depth {
                merged.archive.max_depth = depth;
            }
            if let Some(total) = archive.max_total_size {
                merged.archive.max_total_size = Some(total);
            }
            if let Some(entries) = archive.max_entries {
                merged.archive.max_entries = entries;
            }
            if let Some(ratio) = archive.max_compression_ratio {
                merged.archive.max_compression_ratio = ratio;
            }
        }

        let mut handlers: HashMap<String, HandlerOptions> = HashMap::with_capacity(merged.handlers.len());
        let layers = merged.handlers.iter().chain(overrides.handlers.iter());
        for (extension, options) in layers {
            let entry = handlers.entry(normalize_extension(extension)).or_default();
            for (key, value) in options {
                entry.insert(key.clone(), value.clone());
            }
        }
        merged.handlers = handlers;

        merged.validate()?;
        Ok(merged)
    }

    /// Check value ranges and charset labels.
    pub fn validate(&self) -> Result<()> {
        lookup_encoding(&self.encoding)?;

        if self.max_file_size == 0 {
            return Err(TextxtractError::usage("max_file_size must be greater than zero"));
        }

        if let Some(timeout) = self.timeout
            && !(timeout > 0.0 && Duration::try_from_secs_f64(timeout).is_ok())
        {
            return Err(TextxtractError::usage(format!(
                "timeout must be a positive number of seconds, got {}",
                timeout
            )));
        }

        if self.max_workers == Some(0) {
            return Err(TextxtractError::usage("max_workers must be at least 1"));
        }

        let ratio = self.archive.max_compression_ratio;
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(TextxtractError::usage(format!(
                "archive.max_compression_ratio must be positive, got {}",
                ratio
            )));
        }

        for (extension, options) in &self.handlers {
            if let Some(value) = options.get("encoding") {
                let label = value.as_str().ok_or_else(|| {
                    TextxtractError::usage(format!("handlers.{}.encoding must be a string", extension))
                })?;
                lookup_encoding(label)?;
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        self.logging_level.unwrap_or(LogLevel::Debug)
    }

    /// Deadline as a `Duration`. Values `validate` would reject yield `None`.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Options for one handler, if any were configured.
    pub fn handler_options(&self, extension: &str) -> Option<&HandlerOptions> {
        self.handlers.get(extension)
    }

    pub fn handler_option_str(&self, extension: &str, key: &str) -> Option<&str> {
        self.handler_options(extension)
            .and_then(|options| options.get(key))
            .and_then(Value::as_str)
    }

    /// Charset for `extension`: `handlers.<ext>.encoding` wins over the global `encoding`.
    pub fn encoding_for(&self, extension: &str) -> &'static Encoding {
        let label = self
            .handler_option_str(extension, "encoding")
            .unwrap_or(self.encoding.as_str());
        Encoding::for_label(label.trim().as_bytes()).unwrap_or(encoding_rs::UTF_8)
    }

    /// Cumulative uncompressed byte ceiling for archive traversal.
    pub fn effective_archive_ceiling(&self) -> u64 {
        self.archive.max_total_size.unwrap_or(self.max_file_size)
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| TextxtractError::usage(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| TextxtractError::usage(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TextxtractError::usage(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Self::from_toml_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(TextxtractError::usage(format!(
                "Unsupported config file format: {} (expected .toml, .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `textxtract.toml` in the current directory and its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let start = std::env::current_dir()?;
        Self::discover_from(&start)
    }

    pub(crate) fn discover_from(start: &Path) -> Result<Option<Self>> {
        let mut current = Some(start);

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }
            current = dir.parent();
        }

        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| TextxtractError::usage(format!("Failed to read config file {}: {}", path.display(), e)))
}

fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| TextxtractError::usage(format!("Unknown encoding: '{}'", label)))
}

static GLOBAL_DEFAULTS: Lazy<RwLock<Arc<ExtractionConfig>>> =
    Lazy::new(|| RwLock::new(Arc::new(ExtractionConfig::default())));

/// Process-wide defaults every extractor starts from.
pub fn global_defaults() -> Arc<ExtractionConfig> {
    GLOBAL_DEFAULTS.read().clone()
}

/// Replace the process-wide defaults. Requests already in flight keep their merged config.
pub fn set_global_defaults(config: ExtractionConfig) -> Result<()> {
    config.validate()?;
    *GLOBAL_DEFAULTS.write() = Arc::new(config);
    Ok(())
}

pub fn reset_global_defaults() {
    *GLOBAL_DEFAULTS.write() = Arc::new(ExtractionConfig::default());
}
