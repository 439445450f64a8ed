// config.rs — Engine configuration (.hookwarden/config.toml).
//
// Every field has a serde default, so an empty or partial file is valid.
// A missing file means "all defaults"; a present but unparsable file is an
// error, never silently ignored.
//
// Example:
//
//   [pipeline]
//   timeout_ms = 10000
//   max_concurrency = 4
//   speculative_high_tier = false
//   background_grace_ms = 2000
//
//   [audit]
//   enabled = true
//   log_path = ".hookwarden/verdicts.jsonl"

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

/// Scheduling limits for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Global deadline for the critical and high tiers together.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum high-tier hooks running at once. Unbounded when absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Start the high tier alongside the critical tier instead of after it.
    /// High-tier verdicts are still discarded after a critical block.
    #[serde(default)]
    pub speculative_high_tier: bool,

    /// How long a single-shot host waits for background hooks before exit.
    #[serde(default = "default_background_grace_ms")]
    pub background_grace_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_concurrency: None,
            speculative_high_tier: false,
            background_grace_ms: default_background_grace_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn background_grace(&self) -> Duration {
        Duration::from_millis(self.background_grace_ms)
    }
}

/// Verdict audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log location. Relative paths resolve against the project root.
    /// Defaults to `.hookwarden/verdicts.jsonl`.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
        }
    }
}

// Serde default functions
fn default_timeout_ms() -> u64 {
    10_000
}

fn default_background_grace_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source, path)
    }

    /// Load config if the file exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.timeout_ms must be positive".to_string(),
            ));
        }
        if self.pipeline.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "pipeline.max_concurrency must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Conventional file locations under a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub manifest_path: PathBuf,
    pub default_audit_log: PathBuf,
}

impl ProjectLayout {
    pub const DIR: &'static str = ".hookwarden";

    pub fn for_project(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let dir = root.join(Self::DIR);
        Self {
            config_path: dir.join("config.toml"),
            manifest_path: dir.join("hooks.yaml"),
            default_audit_log: dir.join("verdicts.jsonl"),
            root,
        }
    }

    /// Resolve the audit log path, honouring `[audit] log_path`.
    pub fn audit_log_path(&self, audit: &AuditConfig) -> PathBuf {
        match &audit.log_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.root.join(path),
            None => self.default_audit_log.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = EngineConfig::from_toml_str("", Path::new("config.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.pipeline.timeout(), Duration::from_secs(10));
        assert_eq!(config.pipeline.background_grace(), Duration::from_secs(2));
        assert!(config.audit.enabled);
        assert!(!config.pipeline.speculative_high_tier);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let src = r#"
[pipeline]
max_concurrency = 4

[audit]
enabled = false
"#;
        let config = EngineConfig::from_toml_str(src, Path::new("config.toml")).unwrap();
        assert_eq!(config.pipeline.max_concurrency, Some(4));
        assert_eq!(config.pipeline.timeout_ms, 10_000);
        assert!(!config.audit.enabled);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = EngineConfig::from_toml_str("[pipeline]\ntimeout_ms = 0\n", Path::new("c.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err =
            EngineConfig::from_toml_str("[pipeline]\nmax_concurrency = 0\n", Path::new("c.toml"))
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_or_default_distinguishes_missing_from_broken() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(
            EngineConfig::load_or_default(&path).unwrap(),
            EngineConfig::default()
        );

        std::fs::write(&path, "[pipeline\n").unwrap();
        assert!(matches!(
            EngineConfig::load_or_default(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn layout_resolves_conventional_paths() {
        let layout = ProjectLayout::for_project("/work/app");
        assert_eq!(
            layout.config_path,
            PathBuf::from("/work/app/.hookwarden/config.toml")
        );
        assert_eq!(
            layout.manifest_path,
            PathBuf::from("/work/app/.hookwarden/hooks.yaml")
        );

        let mut audit = AuditConfig::default();
        assert_eq!(
            layout.audit_log_path(&audit),
            PathBuf::from("/work/app/.hookwarden/verdicts.jsonl")
        );
        audit.log_path = Some(PathBuf::from("logs/v.jsonl"));
        assert_eq!(
            layout.audit_log_path(&audit),
            PathBuf::from("/work/app/logs/v.jsonl")
        );
    }
}
