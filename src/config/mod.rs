//! Configuration management.
//!
//! Defaults are overridden by a TOML file and then by `CONTEXTFOLD_*` environment
//! variables, in that order.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for the core services.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    /// Branch manager settings.
    pub branch: BranchConfig,
    /// Scoped search settings.
    pub search: SearchConfig,
    /// ReasoningBank settings.
    pub memory: MemoryConfig,
    /// Persistence backend.
    pub storage: StorageConfig,
    /// Embedding settings.
    pub embedding: EmbeddingConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Branch manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchConfig {
    /// Maximum nesting depth; a root branch has depth 0.
    pub max_depth: u32,
    /// Budget (tokens) when the caller gives none.
    pub default_budget: u64,
    /// Deadline (seconds) when the caller gives none.
    pub default_timeout_secs: u64,
    /// Characters per estimated token.
    pub chars_per_token: usize,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            default_budget: 8_000,
            default_timeout_secs: 300,
            chars_per_token: 4,
        }
    }
}

/// What scoped search does when a wider tier fails after a narrower tier succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyFailurePolicy {
    /// Return the results gathered so far with `partial = true` and a warning.
    #[default]
    Partial,
    /// Propagate the backend error.
    Fail,
}

impl HierarchyFailurePolicy {
    /// Parses a policy string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "partial" => Some(Self::Partial),
            "fail" | "strict" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// Scoped search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Result limit when the caller gives none.
    pub default_limit: usize,
    /// Upper bound on any requested limit.
    pub max_limit: usize,
    /// Confidence floor when the caller gives none.
    pub default_min_confidence: f32,
    /// Mid-hierarchy failure handling.
    pub hierarchy_failure: HierarchyFailurePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            default_min_confidence: 0.0,
            hierarchy_failure: HierarchyFailurePolicy::Partial,
        }
    }
}

/// Whether memories are written per call or buffered per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryGranularity {
    /// Every record call produces a searchable memory.
    #[default]
    Entry,
    /// Records made inside a session are buffered as turns until `consolidate_session`.
    Session,
}

impl MemoryGranularity {
    /// Parses a granularity string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "entry" | "turn" => Some(Self::Entry),
            "session" => Some(Self::Session),
            _ => None,
        }
    }
}

/// ReasoningBank settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    /// Entries below this confidence are ranked after all others.
    pub low_confidence_floor: f32,
    /// Default consolidation similarity threshold.
    pub similarity_threshold: f32,
    /// Write granularity.
    pub granularity: MemoryGranularity,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            low_confidence_floor: 0.1,
            similarity_threshold: crate::models::DEFAULT_SIMILARITY_THRESHOLD,
            granularity: MemoryGranularity::Entry,
        }
    }
}

/// Persistence backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// `SQLite` database at the given path.
    Sqlite(PathBuf),
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
}

/// Embedding settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Vector dimensions.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: crate::embedding::DEFAULT_DIMENSIONS,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

impl LogFormat {
    /// Parses a format string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info,contextfold=debug`.
    pub filter: String,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "info".to_string(),
            file: None,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// `[branch]` section.
    pub branch: Option<ConfigFileBranch>,
    /// `[search]` section.
    pub search: Option<ConfigFileSearch>,
    /// `[memory]` section.
    pub memory: Option<ConfigFileMemory>,
    /// `[storage]` section.
    pub storage: Option<ConfigFileStorage>,
    /// `[embedding]` section.
    pub embedding: Option<ConfigFileEmbedding>,
    /// `[logging]` section.
    pub logging: Option<ConfigFileLogging>,
}

/// Branch section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileBranch {
    /// Max depth.
    pub max_depth: Option<u32>,
    /// Default budget.
    pub default_budget: Option<u64>,
    /// Default timeout in seconds.
    pub default_timeout_secs: Option<u64>,
    /// Characters per token.
    pub chars_per_token: Option<usize>,
}

/// Search section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileSearch {
    /// Default limit.
    pub default_limit: Option<usize>,
    /// Max limit.
    pub max_limit: Option<usize>,
    /// Default min confidence.
    pub default_min_confidence: Option<f32>,
    /// `partial` or `fail`.
    pub hierarchy_failure: Option<String>,
}

/// Memory section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileMemory {
    /// Low-confidence floor.
    pub low_confidence_floor: Option<f32>,
    /// Consolidation threshold.
    pub similarity_threshold: Option<f32>,
    /// `entry` or `session`.
    pub granularity: Option<String>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileStorage {
    /// `memory` or `sqlite`.
    pub backend: Option<String>,
    /// Database path for `sqlite`.
    pub path: Option<String>,
}

/// Embedding section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileEmbedding {
    /// Dimensions.
    pub dimensions: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// `json` or `pretty`.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl CoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds invalid values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::backend("read_config_file", e))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`] or a value is
    /// out of range.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::backend("parse_config_file", e))?;
        let config = Self::from_config_file(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location, then applies env overrides.
    ///
    /// Checks the platform config dir (`~/Library/Application Support/contextfold/` on
    /// macOS) and then `~/.config/contextfold/config.toml`. Falls back to defaults when no
    /// readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let mut config = Self::default_file_paths()
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                    None
                },
            })
            .unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    fn default_file_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        vec![
            base_dirs.config_dir().join("contextfold").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("contextfold")
                .join("config.toml"),
        ]
    }

    /// Applies `CONTEXTFOLD_*` environment variables. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CONTEXTFOLD_MAX_DEPTH").and_then(|v| v.parse().ok()) {
            self.branch.max_depth = v;
        }
        if let Some(v) = lookup("CONTEXTFOLD_DEFAULT_BUDGET").and_then(|v| v.parse().ok()) {
            self.branch.default_budget = v;
        }
        if let Some(v) = lookup("CONTEXTFOLD_BRANCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.branch.default_timeout_secs = v;
        }
        if let Some(path) = lookup("CONTEXTFOLD_STORAGE_PATH").filter(|v| !v.trim().is_empty()) {
            self.storage.backend = StorageBackend::Sqlite(PathBuf::from(path));
        }
        if let Some(format) = lookup("CONTEXTFOLD_LOG_FORMAT").and_then(|v| LogFormat::parse(&v)) {
            self.logging.format = format;
        }
        if let Some(filter) = lookup("CONTEXTFOLD_LOG").filter(|v| !v.trim().is_empty()) {
            self.logging.filter = filter;
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first out-of-range setting.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::Validation(msg.to_string()));
        if self.branch.default_budget == 0 {
            return invalid("branch.default_budget must be positive");
        }
        if self.branch.default_timeout_secs == 0 {
            return invalid("branch.default_timeout_secs must be positive");
        }
        if self.branch.chars_per_token == 0 {
            return invalid("branch.chars_per_token must be positive");
        }
        if self.search.default_limit == 0 || self.search.max_limit < self.search.default_limit {
            return invalid("search.default_limit must be positive and at most search.max_limit");
        }
        if !(0.0..=1.0).contains(&self.search.default_min_confidence) {
            return invalid("search.default_min_confidence must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.memory.low_confidence_floor) {
            return invalid("memory.low_confidence_floor must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.memory.similarity_threshold) {
            return invalid("memory.similarity_threshold must be within [0, 1]");
        }
        if self.embedding.dimensions == 0 {
            return invalid("embedding.dimensions must be positive");
        }
        Ok(())
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(branch) = file.branch {
            if let Some(v) = branch.max_depth {
                config.branch.max_depth = v;
            }
            if let Some(v) = branch.default_budget {
                config.branch.default_budget = v;
            }
            if let Some(v) = branch.default_timeout_secs {
                config.branch.default_timeout_secs = v;
            }
            if let Some(v) = branch.chars_per_token {
                config.branch.chars_per_token = v;
            }
        }
        if let Some(search) = file.search {
            if let Some(v) = search.default_limit {
                config.search.default_limit = v;
            }
            if let Some(v) = search.max_limit {
                config.search.max_limit = v;
            }
            if let Some(v) = search.default_min_confidence {
                config.search.default_min_confidence = v;
            }
            if let Some(policy) = search.hierarchy_failure {
                config.search.hierarchy_failure = HierarchyFailurePolicy::parse(&policy)
                    .ok_or_else(|| {
                        Error::Validation(format!("unknown hierarchy_failure policy '{policy}'"))
                    })?;
            }
        }
        if let Some(memory) = file.memory {
            if let Some(v) = memory.low_confidence_floor {
                config.memory.low_confidence_floor = v;
            }
            if let Some(v) = memory.similarity_threshold {
                config.memory.similarity_threshold = v;
            }
            if let Some(granularity) = memory.granularity {
                config.memory.granularity = MemoryGranularity::parse(&granularity)
                    .ok_or_else(|| {
                        Error::Validation(format!("unknown memory granularity '{granularity}'"))
                    })?;
            }
        }
        if let Some(storage) = file.storage {
            config.storage.backend = match (storage.backend.as_deref(), storage.path) {
                (Some("memory"), _) | (None, None) => StorageBackend::Memory,
                (None | Some("sqlite"), Some(path)) => StorageBackend::Sqlite(PathBuf::from(path)),
                (Some("sqlite"), None) => {
                    return Err(Error::Validation(
                        "storage.path is required for the sqlite backend".to_string(),
                    ));
                },
                (Some(other), _) => {
                    return Err(Error::Validation(format!(
                        "unknown storage backend '{other}'"
                    )));
                },
            };
        }
        if let Some(embedding) = file.embedding
            && let Some(v) = embedding.dimensions
        {
            config.embedding.dimensions = v;
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format)
                    .ok_or_else(|| Error::Validation(format!("unknown log format '{format}'")))?;
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        Ok(config)
    }

    /// Uses a `SQLite` store at `path`.
    #[must_use]
    pub fn with_sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.backend = StorageBackend::Sqlite(path.into());
        self
    }

    /// Sets the memory write granularity.
    #[must_use]
    pub const fn with_granularity(mut self, granularity: MemoryGranularity) -> Self {
        self.memory.granularity = granularity;
        self
    }

    /// Sets the hierarchy failure policy.
    #[must_use]
    pub const fn with_hierarchy_failure(mut self, policy: HierarchyFailurePolicy) -> Self {
        self.search.hierarchy_failure = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.branch.max_depth, 3);
        assert_eq!(config.branch.default_budget, 8_000);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.hierarchy_failure, HierarchyFailurePolicy::Partial);
        assert_eq!(config.memory.granularity, MemoryGranularity::Entry);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_overrides_sections() {
        let config = CoreConfig::from_toml(
            r#"
            [branch]
            max_depth = 5
            default_budget = 2000

            [search]
            hierarchy_failure = "fail"

            [memory]
            granularity = "session"

            [storage]
            backend = "sqlite"
            path = "/tmp/contextfold.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.branch.max_depth, 5);
        assert_eq!(config.branch.default_budget, 2000);
        assert_eq!(config.branch.default_timeout_secs, 300);
        assert_eq!(config.search.hierarchy_failure, HierarchyFailurePolicy::Fail);
        assert_eq!(config.memory.granularity, MemoryGranularity::Session);
        assert_eq!(
            config.storage.backend,
            StorageBackend::Sqlite(PathBuf::from("/tmp/contextfold.db"))
        );
    }

    #[test]
    fn test_from_toml_rejects_unknown_values() {
        assert!(CoreConfig::from_toml("[memory]\ngranularity = \"weekly\"").is_err());
        assert!(CoreConfig::from_toml("[storage]\nbackend = \"sqlite\"").is_err());
        assert!(CoreConfig::from_toml("[branch]\nmax_width = 2").is_err());
        assert!(CoreConfig::from_toml("[search]\ndefault_limit = 0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"pretty\"\nfilter = \"debug\"").unwrap();
        let config = CoreConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_load_from_missing_file_is_backend_error() {
        let err = CoreConfig::load_from_file(Path::new("/nonexistent/contextfold.toml"))
            .unwrap_err();
        assert_eq!(err.code(), "backend_error");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CONTEXTFOLD_MAX_DEPTH", "2"),
            ("CONTEXTFOLD_DEFAULT_BUDGET", "not-a-number"),
            ("CONTEXTFOLD_STORAGE_PATH", "/var/lib/contextfold.db"),
            ("CONTEXTFOLD_LOG_FORMAT", "pretty"),
        ]);
        let mut config = CoreConfig::default();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.branch.max_depth, 2);
        assert_eq!(config.branch.default_budget, 8_000);
        assert_eq!(
            config.storage.backend,
            StorageBackend::Sqlite(PathBuf::from("/var/lib/contextfold.db"))
        );
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
