// manifest.rs — Hook manifest loading (hooks.yaml / hooks.toml / hooks.json).
//
// The manifest is the on-disk form of the hook registry:
//
//   hooks:
//     - id: no-env-writes
//       phase: pre
//       matcherPattern: "glob:**/.env"
//       priorityTier: critical
//       timeoutMs: 2000
//       handler:
//         type: command
//         command: ./hooks/deny.sh
//
// The engine validates everything except `handler`, which it hands to an
// EvaluatorFactory untouched. Built-in handler kinds live in hw-evaluators.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::{HookDescriptor, PhaseFilter, PriorityTier};
use crate::error::RegistryError;
use crate::hook::{HookEvaluator, RegisteredHook};

/// Builds the evaluator for one manifest entry from its opaque `handler`.
pub trait EvaluatorFactory: Send + Sync {
    /// Return the evaluator, or `RegistryError::InvalidDescriptor` when the
    /// handler is unknown or malformed.
    fn build(&self, entry: &ManifestEntry) -> Result<Arc<dyn HookEvaluator>, RegistryError>;
}

/// Top-level manifest document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookManifest {
    #[serde(default)]
    pub hooks: Vec<ManifestEntry>,
}

/// One hook as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub phase: PhaseFilter,
    #[serde(default = "default_matcher_pattern")]
    pub matcher_pattern: String,
    #[serde(default = "default_priority_tier")]
    pub priority_tier: PriorityTier,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Evaluator configuration, interpreted by the EvaluatorFactory.
    #[serde(default)]
    pub handler: serde_json::Value,
}

fn default_matcher_pattern() -> String {
    "*".to_string()
}

fn default_priority_tier() -> PriorityTier {
    PriorityTier::High
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_enabled() -> bool {
    true
}

impl ManifestEntry {
    /// Validate the static part of the entry.
    pub fn descriptor(&self) -> Result<HookDescriptor, RegistryError> {
        Ok(HookDescriptor::new(
            self.id.clone(),
            self.phase,
            &self.matcher_pattern,
            self.priority_tier,
            self.timeout_ms,
        )?
        .with_enabled(self.enabled))
    }

    /// The handler's `type` field, if any.
    pub fn handler_type(&self) -> Option<&str> {
        self.handler.get("type").and_then(|t| t.as_str())
    }
}

impl HookManifest {
    pub fn from_yaml_str(source: &str, origin: &str) -> Result<Self, RegistryError> {
        serde_yaml::from_str(source).map_err(|e| parse_error(origin, e))
    }

    pub fn from_toml_str(source: &str, origin: &str) -> Result<Self, RegistryError> {
        toml::from_str(source).map_err(|e| parse_error(origin, e))
    }

    pub fn from_json_str(source: &str, origin: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(source).map_err(|e| parse_error(origin, e))
    }

    /// Load a manifest, choosing the format from the file extension
    /// (`.yaml`/`.yml`, `.toml`, `.json`).
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path).map_err(|source| RegistryError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&source, &origin),
            Some("toml") => Self::from_toml_str(&source, &origin),
            Some("json") => Self::from_json_str(&source, &origin),
            other => Err(RegistryError::ManifestParse {
                path: origin,
                reason: format!(
                    "unsupported manifest extension '{}' (expected yaml, yml, toml, or json)",
                    other.unwrap_or("")
                ),
            }),
        }
    }

    /// Load the manifest if it exists, otherwise return an empty one.
    pub fn load_or_default(path: &Path) -> Result<Self, RegistryError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no hook manifest, starting with no hooks");
            Ok(Self::default())
        }
    }

    /// Validate every descriptor and reject duplicate ids, without building
    /// evaluators.
    pub fn descriptors(&self) -> Result<Vec<HookDescriptor>, RegistryError> {
        let mut seen = HashSet::new();
        self.hooks
            .iter()
            .map(|entry| {
                if !seen.insert(entry.id.as_str()) {
                    return Err(RegistryError::DuplicateHook {
                        id: entry.id.clone(),
                    });
                }
                entry.descriptor()
            })
            .collect()
    }

    /// Validate every entry and bind it to an evaluator. Any error aborts the
    /// whole load; nothing partial is returned.
    pub fn build_hooks(
        &self,
        factory: &dyn EvaluatorFactory,
    ) -> Result<Vec<RegisteredHook>, RegistryError> {
        let descriptors = self.descriptors()?;
        self.hooks
            .iter()
            .zip(descriptors)
            .map(|(entry, descriptor)| {
                let evaluator = factory.build(entry)?;
                Ok(RegisteredHook::new(descriptor, evaluator))
            })
            .collect()
    }
}

fn parse_error(origin: &str, e: impl std::fmt::Display) -> RegistryError {
    RegistryError::ManifestParse {
        path: origin.to_string(),
        reason: e.to_string(),
    }
}
