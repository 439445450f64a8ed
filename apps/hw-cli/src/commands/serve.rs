// serve.rs — Long-running JSON-lines host.
//
// Reads one event per line from stdin and writes one response per line to
// stdout, in input order. Runs are sequential; neither a blocked event nor a
// malformed line (bad JSON, bad UTF-8) ends the loop. Lines are read as raw
// bytes so decoding failures surface as malformed-event responses. At EOF,
// outstanding background hooks get the configured grace period.
//
// With watching enabled, the manifest's directory is watched with notify.
// Any create/modify/remove touching the manifest file triggers a reload
// after a short debounce. A reload that fails keeps the previous snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hw_engine::{BackgroundTasks, HookRegistry};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::check::render;
use crate::engine::EngineContext;

const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

pub fn execute(ctx: &EngineContext, full: bool, watch: bool) -> anyhow::Result<()> {
    let registry = ctx.build_registry()?;
    let pipeline = ctx.build_pipeline(Arc::clone(&registry))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (tx, mut changes) = mpsc::unbounded_channel::<()>();
        let _watcher = if watch {
            watch_manifest(&ctx.manifest_path, tx)
        } else {
            None
        };

        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut line = Vec::new();
        let mut background = BackgroundTasks::new();
        let mut served = 0u64;

        loop {
            tokio::select! {
                read = stdin.read_until(b'\n', &mut line) => {
                    let at_eof = read? == 0;
                    if !is_blank(&line) {
                        let run = pipeline.run_bytes(&line).await;
                        println!("{}", render(&run.result, full)?);
                        background.prune();
                        background.extend(run.background);
                        served += 1;
                    }
                    line.clear();
                    if at_eof {
                        break;
                    }
                }
                Some(()) = changes.recv() => {
                    tokio::time::sleep(RELOAD_DEBOUNCE).await;
                    while changes.try_recv().is_ok() {}
                    reload(ctx, &registry);
                }
            }
        }

        tracing::info!(events = served, "stdin closed, shutting down");
        background.wait(pipeline.config().background_grace()).await;
        Ok::<(), anyhow::Error>(())
    })
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Rebuild hooks from the manifest and swap them in. Errors are logged and
/// the current snapshot stays in place.
fn reload(ctx: &EngineContext, registry: &HookRegistry) {
    if !ctx.manifest_path.exists() {
        tracing::warn!(
            manifest = %ctx.manifest_path.display(),
            "manifest disappeared, keeping current hooks"
        );
        return;
    }
    match ctx.load_hooks(registry).and_then(|hooks| registry.reload(hooks)) {
        Ok(version) => tracing::info!(
            version,
            hooks = registry.len(),
            "manifest reloaded"
        ),
        Err(e) => tracing::warn!(
            error = %e,
            version = registry.version(),
            "manifest reload failed, keeping current hooks"
        ),
    }
}

/// Watch the directory holding `manifest` and send a unit on every change
/// that touches it. Returns `None` (and logs) if the watch cannot be set up.
fn watch_manifest(manifest: &Path, tx: mpsc::UnboundedSender<()>) -> Option<RecommendedWatcher> {
    let file_name = manifest.file_name()?.to_owned();
    let dir = match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let handler = move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            let relevant = matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if relevant {
                let _ = tx.send(());
            }
        }
        Err(e) => tracing::warn!(error = %e, "manifest watcher error"),
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::warn!(error = %e, "failed to start manifest watcher");
            return None;
        }
    };
    if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot watch manifest directory");
        return None;
    }
    tracing::info!(manifest = %manifest.display(), "watching manifest for changes");
    Some(watcher)
}
