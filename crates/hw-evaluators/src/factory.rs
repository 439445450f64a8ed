// factory.rs — Manifest handler → evaluator.
//
// The engine treats a manifest entry's `handler` as opaque JSON. This
// factory understands the two built-in shapes:
//
//   handler: { type: command, command: ./hooks/check.sh, args: [...] }
//   handler: { type: rules, rules: [ { id, pattern, action, ... } ] }

use std::path::PathBuf;
use std::sync::Arc;

use hw_engine::{EvaluatorFactory, HookEvaluator, ManifestEntry, PatternCache, RegistryError};
use serde::{Deserialize, Serialize};

use crate::command::{CommandHook, CommandSpec};
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleHook};

/// The built-in handler kinds, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerSpec {
    Command(CommandSpec),
    Rules { rules: Vec<Rule> },
}

/// Builds command and rule evaluators from manifest entries.
pub struct BuiltinFactory {
    cache: Arc<PatternCache>,
    base_dir: Option<PathBuf>,
}

impl BuiltinFactory {
    /// Rule hooks compile through `cache`; pass the registry's cache so
    /// reloads invalidate their entries too.
    pub fn new(cache: Arc<PatternCache>) -> Self {
        Self {
            cache,
            base_dir: None,
        }
    }

    /// Resolve relative command paths against `dir` (the project root).
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn build_spec(
        &self,
        entry: &ManifestEntry,
    ) -> Result<Arc<dyn HookEvaluator>, EvaluatorError> {
        let spec: HandlerSpec = serde_json::from_value(entry.handler.clone()).map_err(|e| {
            EvaluatorError::InvalidHandler {
                reason: e.to_string(),
            }
        })?;

        Ok(match spec {
            HandlerSpec::Command(spec) => {
                let hook = CommandHook::new(spec);
                match &self.base_dir {
                    Some(dir) => Arc::new(hook.with_base_dir(dir.clone())),
                    None => Arc::new(hook),
                }
            }
            HandlerSpec::Rules { rules } => {
                Arc::new(RuleHook::new(&entry.id, rules, Arc::clone(&self.cache))?)
            }
        })
    }
}

impl EvaluatorFactory for BuiltinFactory {
    fn build(&self, entry: &ManifestEntry) -> Result<Arc<dyn HookEvaluator>, RegistryError> {
        self.build_spec(entry)
            .map_err(|e| RegistryError::InvalidDescriptor {
                id: entry.id.clone(),
                reason: e.to_string(),
            })
    }
}
