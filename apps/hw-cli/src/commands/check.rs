// check.rs — Run a single event through the pipeline.
//
// The event is read from `--event FILE` or stdin as raw bytes; bad UTF-8 is
// a malformed event like bad JSON. The host response (or the full result
// with `--full`) is printed to stdout as one JSON object.
// Background hooks get `background_grace_ms` to finish before the runtime
// shuts down. Returns true when the event was blocked; the caller turns
// that into exit code 2.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use hw_engine::PipelineResult;

use crate::engine::EngineContext;

pub fn execute(ctx: &EngineContext, event: Option<&Path>, full: bool) -> anyhow::Result<bool> {
    let input = match event {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("reading event from {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };

    let registry = ctx.build_registry()?;
    let pipeline = ctx.build_pipeline(registry)?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let run = pipeline.run_bytes(&input).await;
        run.background.wait(pipeline.config().background_grace()).await;
        run.result
    });

    println!("{}", render(&result, full)?);
    Ok(result.is_blocked())
}

/// One-line JSON for the host, or the full result.
pub fn render(result: &PipelineResult, full: bool) -> anyhow::Result<String> {
    if let Some(error) = &result.error {
        tracing::warn!(error = %error, "malformed event, allowing");
    }
    let text = if full {
        serde_json::to_string(result)?
    } else {
        serde_json::to_string(&result.to_host_response())?
    };
    Ok(text)
}
