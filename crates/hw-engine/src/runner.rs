// runner.rs — Sandboxed execution of one hook against one event.
//
// The runner is the fail-open boundary. Inside, a hook invocation is a
// Result<HookOutcome, HookFault>; outside, it is always a Verdict:
//
//   evaluator returned Ok(outcome) → verdict kind taken from the outcome
//   evaluator returned Err(e)      → kind=error, "hook <id> failed: <e>"
//   evaluator panicked             → kind=error, "hook <id> failed: panicked: ..."
//   timeout elapsed                → kind=error, "hook <id> timed out"
//
// Each evaluation runs on its own tokio task. That gives us panic isolation
// (a panic surfaces as a JoinError instead of unwinding through the
// scheduler) and a handle to abort on timeout. The handle aborts on drop, so
// a caller that cancels `run_hook` (the scheduler at the pipeline deadline)
// cancels the evaluation with it.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use hw_event::Event;
use tokio::task::{JoinError, JoinHandle};

use crate::error::HookFault;
use crate::hook::{HookOutcome, RegisteredHook};
use crate::verdict::Verdict;

/// Run `hook` against `event` under the hook's own timeout.
///
/// Never fails and never panics: every failure class becomes a
/// non-blocking `error` verdict.
pub async fn run_hook(hook: Arc<RegisteredHook>, event: Arc<Event>) -> Verdict {
    let started = Instant::now();
    let tier = hook.descriptor.priority_tier;
    let result = execute(&hook, event).await;
    let elapsed = started.elapsed();

    let verdict = match result {
        Ok(outcome) => Verdict::from_outcome(hook.id(), tier, outcome, elapsed),
        Err(fault) => {
            tracing::warn!(
                hook_id = %hook.id(),
                tier = %tier,
                elapsed_ms = elapsed.as_millis() as u64,
                "hook fault (fail-open): {}",
                fault
            );
            Verdict::from_fault(hook.id(), tier, &fault, elapsed)
        }
    };

    tracing::debug!(
        hook_id = %verdict.hook_id,
        tier = %tier,
        kind = verdict.kind.as_str(),
        elapsed_ms = verdict.duration_ms,
        "hook finished"
    );
    verdict
}

async fn execute(hook: &RegisteredHook, event: Arc<Event>) -> Result<HookOutcome, HookFault> {
    let evaluator = Arc::clone(&hook.evaluator);
    let mut task = AbortOnDrop(tokio::spawn(async move { evaluator.evaluate(&event).await }));

    match tokio::time::timeout(hook.descriptor.timeout(), &mut task.0).await {
        Ok(Ok(Ok(outcome))) => Ok(outcome),
        Ok(Ok(Err(e))) => Err(HookFault::Execution {
            hook_id: hook.id().to_string(),
            reason: e.to_string(),
        }),
        Ok(Err(join_error)) => Err(HookFault::Execution {
            hook_id: hook.id().to_string(),
            reason: describe_join_error(join_error),
        }),
        Err(_elapsed) => {
            // Best effort: a hook blocked in synchronous code keeps running
            // until its next await point, but its result is discarded.
            task.0.abort();
            Err(HookFault::Timeout {
                hook_id: hook.id().to_string(),
                timeout_ms: hook.descriptor.timeout_ms,
            })
        }
    }
}

/// Aborts the spawned evaluation when dropped. Aborting a finished task is
/// a no-op.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_panic() {
        format!("panicked: {}", panic_message(error.into_panic()))
    } else {
        "task was cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HookDescriptor, PhaseFilter, PriorityTier};
    use crate::error::EvaluationError;
    use crate::hook::{FnHook, HookEvaluator};
    use crate::verdict::VerdictKind;
    use async_trait::async_trait;
    use hw_event::Phase;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn registered(id: &str, timeout_ms: u64, evaluator: Arc<dyn HookEvaluator>) -> Arc<RegisteredHook> {
        let descriptor =
            HookDescriptor::new(id, PhaseFilter::Both, "*", PriorityTier::High, timeout_ms)
                .unwrap();
        Arc::new(RegisteredHook::new(descriptor, evaluator))
    }

    fn event() -> Arc<Event> {
        Arc::new(Event::new(Phase::Pre, "write").with_content("hello"))
    }

    struct PanickingHook;

    #[async_trait]
    impl HookEvaluator for PanickingHook {
        async fn evaluate(&self, _event: &Event) -> Result<HookOutcome, EvaluationError> {
            panic!("boom");
        }
    }

    struct SlowHook {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HookEvaluator for SlowHook {
        async fn evaluate(&self, _event: &Event) -> Result<HookOutcome, EvaluationError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(HookOutcome::block("too late"))
        }
    }

    #[tokio::test]
    async fn normal_outcome_maps_verbatim() {
        let hook = registered(
            "upper",
            1_000,
            Arc::new(FnHook::new(|event: Event| async move {
                Ok(HookOutcome::modify(
                    event.content().unwrap_or_default().to_uppercase(),
                ))
            })),
        );
        let verdict = run_hook(hook, event()).await;
        assert_eq!(verdict.kind, VerdictKind::Modify);
        assert_eq!(verdict.modified_content.as_deref(), Some("HELLO"));
        assert_eq!(verdict.tier, PriorityTier::High);
    }

    #[tokio::test]
    async fn evaluator_error_becomes_error_verdict() {
        let hook = registered(
            "broken",
            1_000,
            Arc::new(FnHook::new(|_: Event| async {
                Err(EvaluationError::failed("config missing"))
            })),
        );
        let verdict = run_hook(hook, event()).await;
        assert_eq!(verdict.kind, VerdictKind::Error);
        assert_eq!(
            verdict.message.as_deref(),
            Some("hook broken failed: config missing")
        );
    }

    #[tokio::test]
    async fn panic_becomes_error_verdict() {
        let verdict = run_hook(registered("panicky", 1_000, Arc::new(PanickingHook)), event()).await;
        assert_eq!(verdict.kind, VerdictKind::Error);
        let message = verdict.message.unwrap();
        assert!(message.contains("panicked"), "{}", message);
        assert!(message.contains("boom"), "{}", message);
    }

    #[tokio::test]
    async fn timeout_becomes_error_and_aborts_the_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let hook = registered(
            "slow",
            20,
            Arc::new(SlowHook {
                finished: Arc::clone(&finished),
            }),
        );

        let started = Instant::now();
        let verdict = run_hook(hook, event()).await;
        assert!(started.elapsed() < Duration::from_millis(180));
        assert_eq!(verdict.kind, VerdictKind::Error);
        assert_eq!(verdict.message.as_deref(), Some("hook slow timed out"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelling_the_run_cancels_the_evaluation() {
        let finished = Arc::new(AtomicBool::new(false));
        let hook = registered(
            "slow",
            60_000,
            Arc::new(SlowHook {
                finished: Arc::clone(&finished),
            }),
        );

        let cancelled = tokio::time::timeout(Duration::from_millis(20), run_hook(hook, event())).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
