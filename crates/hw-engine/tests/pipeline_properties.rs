// pipeline_properties.rs — End-to-end behaviour of the hook pipeline.
//
// Each test builds a real registry, runs events through HookPipeline, and
// checks the aggregate decision the host would see:
//
//   - a critical block wins and no modification is applied
//   - failing and timed-out hooks never block (fail-open)
//   - concurrent modifications apply in registry order, each once
//   - duplicate registration changes nothing
//   - background hooks are advisory only
//   - reloads are atomic with respect to in-flight runs
//   - the pipeline deadline cancels hook work that is still running

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use hw_engine::{
    Disposition, EvaluationError, FnHook, HookDescriptor, HookOutcome, HookPipeline,
    HookRegistry, MemorySink, PhaseFilter, PipelineConfig, PipelineStatus, PriorityTier,
    RegisteredHook, RegistryError, VerdictKind,
};
use hw_event::{Event, Phase};

fn hook(
    id: &str,
    pattern: &str,
    tier: PriorityTier,
    timeout_ms: u64,
    delay_ms: u64,
    outcome: Result<HookOutcome, &'static str>,
) -> RegisteredHook {
    let descriptor = HookDescriptor::new(id, PhaseFilter::Both, pattern, tier, timeout_ms).unwrap();
    RegisteredHook::new(
        descriptor,
        Arc::new(FnHook::new(move |_: Event| {
            let outcome = outcome.clone();
            async move {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                outcome.map_err(EvaluationError::failed)
            }
        })),
    )
}

fn quick(id: &str, tier: PriorityTier, outcome: HookOutcome) -> RegisteredHook {
    hook(id, "*", tier, 1_000, 0, Ok(outcome))
}

/// Appends `marker` to whatever content the hook sees.
fn appender(id: &str, marker: &'static str, delay_ms: u64) -> RegisteredHook {
    let descriptor = HookDescriptor::new(id, PhaseFilter::Both, "*", PriorityTier::High, 1_000).unwrap();
    RegisteredHook::new(
        descriptor,
        Arc::new(FnHook::new(move |event: Event| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let content = event.content().unwrap_or_default();
            Ok(HookOutcome::modify(format!("{}{}", content, marker)))
        })),
    )
}

fn pipeline(hooks: Vec<RegisteredHook>) -> (HookPipeline, Arc<MemorySink>) {
    let registry = Arc::new(HookRegistry::new());
    registry.reload(hooks).unwrap();
    let sink = Arc::new(MemorySink::new());
    let pipeline = HookPipeline::new(registry, PipelineConfig::default()).with_sink(sink.clone());
    (pipeline, sink)
}

fn write(content: &str) -> Event {
    Event::new(Phase::Pre, "write")
        .with_file_path("/src/app.js")
        .with_content(content)
}

#[tokio::test]
async fn critical_block_wins_and_no_modification_applies() {
    let (pipeline, _) = pipeline(vec![
        quick("gate", PriorityTier::Critical, HookOutcome::block("forbidden file")),
        appender("fmt", "!", 0),
    ]);

    let result = pipeline.process(write("original")).await;
    assert_eq!(result.status, PipelineStatus::Blocked);
    assert_eq!(result.message.as_deref(), Some("forbidden file"));
    assert_eq!(result.final_content.as_deref(), Some("original"));
    assert!(result.per_hook.iter().all(|v| v.kind != VerdictKind::Modify));
}

#[tokio::test]
async fn improved_suffix_is_blocked_with_a_message() {
    let (pipeline, _) = pipeline(vec![hook(
        "no-improved-files",
        "_improved",
        PriorityTier::Critical,
        1_000,
        0,
        Ok(HookOutcome::block("create-don't-improve: edit the original file instead")),
    )]);

    let result = pipeline
        .process_value(&json!({
            "phase": "pre",
            "toolName": "write",
            "filePath": "/x_improved.js"
        }))
        .await;
    assert_eq!(result.status, PipelineStatus::Blocked);
    assert!(!result.message.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn failing_and_timed_out_hooks_never_block() {
    let (pipeline, _) = pipeline(vec![
        hook("thrower", "*", PriorityTier::Critical, 1_000, 0, Err("exploded")),
        hook("sleeper", "*", PriorityTier::Critical, 30, 2_000, Ok(HookOutcome::block("late"))),
        hook("slow-high", "*", PriorityTier::High, 30, 2_000, Ok(HookOutcome::block("late"))),
    ]);

    let result = pipeline.process(write("x")).await;
    assert_eq!(result.status, PipelineStatus::Allow);
    assert_eq!(result.per_hook.len(), 3);
    assert!(result.per_hook.iter().all(|v| v.kind == VerdictKind::Error));
    assert_eq!(
        result.per_hook[1].message.as_deref(),
        Some("hook sleeper timed out")
    );
}

#[tokio::test]
async fn timed_out_hook_next_to_a_warning_yields_warning() {
    let (pipeline, _) = pipeline(vec![
        hook("slow", "*", PriorityTier::High, 30, 2_000, Ok(HookOutcome::allow())),
        quick("lint", PriorityTier::High, HookOutcome::warn("missing semicolon")),
    ]);

    let result = pipeline.process(write("x")).await;
    assert_eq!(result.status, PipelineStatus::Warning);
    assert_eq!(result.message.as_deref(), Some("missing semicolon"));
    assert_eq!(result.per_hook[0].hook_id, "slow");
    assert_eq!(result.per_hook[0].kind, VerdictKind::Error);
}

#[tokio::test]
async fn modifications_apply_in_registry_order_exactly_once() {
    // B finishes first; A's marker must still come first.
    let (pipeline, _) = pipeline(vec![appender("a", "[A]", 60), appender("b", "[B]", 0)]);

    let result = pipeline.process(write("x")).await;
    assert_eq!(result.status, PipelineStatus::Modified);
    let content = result.final_content.unwrap();
    assert_eq!(content, "x[A][B]");
    assert_eq!(content.matches("[A]").count(), 1);
    assert_eq!(content.matches("[B]").count(), 1);

    let response = serde_json::to_value(
        pipeline.process(write("x")).await.to_host_response(),
    )
    .unwrap();
    assert_eq!(response["finalContent"], "x[A][B]");
}

#[tokio::test]
async fn duplicate_registration_has_no_partial_effect() {
    let registry = HookRegistry::new();
    registry
        .register(quick("guard", PriorityTier::Critical, HookOutcome::allow()))
        .unwrap();
    let version = registry.version();

    let err = registry
        .register(quick("guard", PriorityTier::High, HookOutcome::block("shadow")))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateHook { .. }));
    assert_eq!(registry.list(), vec!["guard"]);
    assert_eq!(registry.version(), version);

    let err = registry
        .reload(vec![
            quick("one", PriorityTier::High, HookOutcome::allow()),
            quick("one", PriorityTier::High, HookOutcome::allow()),
        ])
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateHook { .. }));
    assert_eq!(registry.list(), vec!["guard"]);
}

#[tokio::test]
async fn background_block_never_changes_status() {
    let (pipeline, sink) = pipeline(vec![
        quick("audit-bg", PriorityTier::Background, HookOutcome::block("advisory block")),
        quick("fmt-bg", PriorityTier::Background, HookOutcome::modify("rewritten")),
    ]);

    let run = pipeline.run(write("x")).await;
    assert_eq!(run.result.status, PipelineStatus::Allow);
    assert!(run.result.per_hook.is_empty());
    assert_eq!(run.result.background_hooks, vec!["audit-bg", "fmt-bg"]);
    assert_eq!(run.result.final_content.as_deref(), Some("x"));

    assert_eq!(run.background.wait(Duration::from_secs(2)).await, 0);
    let advisory = sink.with_disposition(Disposition::Advisory);
    assert_eq!(advisory.len(), 2);
    assert!(advisory.iter().all(|r| r.run_id == run.result.run_id));
}

#[tokio::test]
async fn no_matching_hooks_is_allow_with_empty_per_hook() {
    let (pipeline, _) = pipeline(vec![hook(
        "rust-only",
        "glob:**/*.rs",
        PriorityTier::Critical,
        1_000,
        0,
        Ok(HookOutcome::block("no")),
    )]);

    let result = pipeline.process(write("x")).await;
    assert_eq!(result.status, PipelineStatus::Allow);
    assert!(result.per_hook.is_empty());
}

#[tokio::test]
async fn phase_filter_limits_hooks_to_their_phase() {
    let descriptor =
        HookDescriptor::new("post-check", PhaseFilter::Post, "*", PriorityTier::Critical, 1_000)
            .unwrap();
    let post_only = RegisteredHook::new(
        descriptor,
        Arc::new(FnHook::new(|_: Event| async { Ok(HookOutcome::block("post")) })),
    );
    let (pipeline, _) = pipeline(vec![post_only]);

    assert_eq!(
        pipeline.process(write("x")).await.status,
        PipelineStatus::Allow
    );
    let post = Event::new(Phase::Post, "write").with_previous_content("old");
    assert_eq!(pipeline.process(post).await.status, PipelineStatus::Blocked);
}

#[tokio::test]
async fn reload_during_a_run_does_not_affect_it() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let descriptor =
        HookDescriptor::new("slow-warn", PhaseFilter::Both, "*", PriorityTier::High, 2_000).unwrap();
    let slow = RegisteredHook::new(
        descriptor,
        Arc::new(FnHook::new(move |_: Event| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(HookOutcome::warn("old rules"))
            }
        })),
    );

    let (pipeline, _) = pipeline(vec![slow]);
    let pipeline = Arc::new(pipeline);

    let in_flight = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.process(write("x")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    pipeline
        .registry()
        .reload(vec![quick("new-gate", PriorityTier::Critical, HookOutcome::block("new rules"))])
        .unwrap();

    let first = in_flight.await.unwrap();
    assert_eq!(first.status, PipelineStatus::Warning);
    assert_eq!(first.message.as_deref(), Some("old rules"));

    let second = pipeline.process(write("x")).await;
    assert_eq!(second.status, PipelineStatus::Blocked);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_event_degrades_to_allow() {
    let (pipeline, _) = pipeline(vec![quick(
        "gate",
        PriorityTier::Critical,
        HookOutcome::block("no"),
    )]);

    for raw in [
        json!({"phase": "pre"}),
        json!({"phase": "pre", "toolName": ""}),
        json!({"phase": "pre", "toolName": "write", "filePath": 42}),
        json!(["not", "an", "object"]),
    ] {
        let result = pipeline.process_value(&raw).await;
        assert_eq!(result.status, PipelineStatus::Allow, "payload {}", raw);
        assert!(result.error.is_some(), "payload {}", raw);
        assert!(result.per_hook.is_empty());
    }
}

#[tokio::test]
async fn pipeline_deadline_cancels_running_evaluations() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let descriptor =
        HookDescriptor::new("lingering", PhaseFilter::Both, "*", PriorityTier::High, 60_000).unwrap();
    let lingering = RegisteredHook::new(
        descriptor,
        Arc::new(FnHook::new(move |_: Event| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(HookOutcome::allow())
            }
        })),
    );

    let registry = Arc::new(HookRegistry::new());
    registry.reload(vec![lingering]).unwrap();
    let config = PipelineConfig {
        timeout_ms: 50,
        ..PipelineConfig::default()
    };
    let result = HookPipeline::new(registry, config).process(write("x")).await;

    assert_eq!(result.status, PipelineStatus::Allow);
    assert_eq!(result.per_hook[0].kind, VerdictKind::Error);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!finished.load(Ordering::SeqCst));
}
