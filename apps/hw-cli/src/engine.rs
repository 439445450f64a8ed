// engine.rs — Wiring shared by every subcommand.
//
// Resolves the project layout, loads config and manifest, and assembles a
// HookPipeline whose verdicts go to tracing plus (when enabled) the
// hash-chained verdict log. A log that cannot be opened is logged and
// skipped; hooks still run.
//
// Hooks are always built through the registry's own PatternCache so that a
// reload invalidates the patterns of every hook it replaced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use hw_audit::AuditSink;
use hw_engine::{
    EngineConfig, HookManifest, HookPipeline, HookRegistry, ProjectLayout, RegisteredHook,
    RegistryError, SinkSet, TracingSink,
};
use hw_evaluators::BuiltinFactory;

pub struct EngineContext {
    pub layout: ProjectLayout,
    pub config: EngineConfig,
    pub manifest_path: PathBuf,
}

impl EngineContext {
    /// Load engine config from `config` (or the project default). The
    /// manifest is only read when a registry is built.
    pub fn load(
        project_root: &Path,
        manifest: Option<PathBuf>,
        config: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let layout = ProjectLayout::for_project(project_root);
        let config = match config {
            Some(path) => EngineConfig::load(&path)?,
            None => EngineConfig::load_or_default(&layout.config_path)?,
        };
        let manifest_path = manifest.unwrap_or_else(|| layout.manifest_path.clone());
        Ok(Self {
            layout,
            config,
            manifest_path,
        })
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.layout.audit_log_path(&self.config.audit)
    }

    /// Read the manifest and bind every entry to an evaluator. A missing
    /// manifest yields no hooks; any invalid entry fails the whole load.
    pub fn load_hooks(&self, registry: &HookRegistry) -> Result<Vec<RegisteredHook>, RegistryError> {
        let manifest = HookManifest::load_or_default(&self.manifest_path)?;
        let factory = BuiltinFactory::new(Arc::clone(registry.cache()))
            .with_base_dir(self.layout.root.clone());
        manifest.build_hooks(&factory)
    }

    pub fn build_registry(&self) -> anyhow::Result<Arc<HookRegistry>> {
        let registry = HookRegistry::new();
        let hooks = self
            .load_hooks(&registry)
            .with_context(|| format!("loading hooks from {}", self.manifest_path.display()))?;
        let version = registry.reload(hooks)?;
        tracing::info!(
            manifest = %self.manifest_path.display(),
            hooks = registry.len(),
            version,
            "hook registry loaded"
        );
        Ok(Arc::new(registry))
    }

    pub fn build_pipeline(&self, registry: Arc<HookRegistry>) -> anyhow::Result<HookPipeline> {
        let mut sinks = SinkSet::new().with_sink(Arc::new(TracingSink));
        if self.config.audit.enabled {
            let path = self.audit_log_path();
            match AuditSink::open(&path) {
                Ok(sink) => sinks.push(Arc::new(sink)),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "verdict log unavailable, recording verdicts to tracing only"
                ),
            }
        }
        Ok(HookPipeline::new(registry, self.config.pipeline.clone()).with_sink(Arc::new(sinks)))
    }
}
