// scheduler.rs — Priority-tiered execution of the hooks matching one event.
//
// Tiers run in order critical → high → background:
//
//   critical    sequential, registry order; the first block stops the run
//               (no further critical hooks, no lower tier)
//   high        concurrent (optionally bounded by a semaphore); awaited
//               until all finish or the pipeline deadline passes, after
//               which pending hooks become `error` verdicts and are aborted
//   background  detached tasks; their verdicts go to the sink only
//
// With `speculative_high_tier` the high tier is dispatched before the
// critical tier starts. If a critical hook then blocks, the high-tier tasks
// keep running detached and their verdicts are recorded as discarded.

use std::sync::Arc;
use std::time::Duration;

use hw_event::Event;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::descriptor::PriorityTier;
use crate::error::HookFault;
use crate::hook::RegisteredHook;
use crate::runner::run_hook;
use crate::sink::{record_quietly, Disposition, VerdictRecord, VerdictSink};
use crate::verdict::Verdict;

/// What the scheduler produced for one run.
#[derive(Debug)]
pub struct ScheduleOutcome {
    /// Critical verdicts followed by high-tier verdicts, each in registry
    /// order. These are the only verdicts the aggregator sees.
    pub counted: Vec<Verdict>,
    /// A critical hook blocked; the high tier did not count and background
    /// dispatch was skipped.
    pub critical_block: bool,
    /// Ids of background hooks dispatched detached.
    pub background_hooks: Vec<String>,
    /// Ids of high-tier hooks whose verdicts were discarded after a
    /// critical block.
    pub discarded_hooks: Vec<String>,
    /// Handles to detached work still running after the run returned.
    pub background: BackgroundTasks,
}

/// Detached tasks spawned by one or more pipeline runs.
///
/// Dropping this handle leaves the tasks running; a single-shot host calls
/// [`BackgroundTasks::wait`] so the runtime is not torn down under them.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Merge another set of handles into this one.
    pub fn extend(&mut self, other: BackgroundTasks) {
        self.handles.extend(other.handles);
    }

    /// Drop handles of tasks that already finished.
    pub fn prune(&mut self) {
        self.handles.retain(|handle| !handle.is_finished());
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for all tasks, but no longer than `grace`. Returns how many were
    /// still running when the grace period ended (they are left detached).
    pub async fn wait(self, grace: Duration) -> usize {
        let deadline = Instant::now() + grace;
        let mut pending = 0;
        for mut handle in self.handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                pending += 1;
            }
        }
        if pending > 0 {
            tracing::warn!(pending, "background hooks still running after grace period");
        }
        pending
    }
}

/// High-tier tasks in flight, indexed by registry position.
struct HighTierDispatch {
    hooks: Vec<Arc<RegisteredHook>>,
    tasks: JoinSet<(usize, Verdict)>,
}

impl HighTierDispatch {
    fn hook_ids(&self) -> Vec<String> {
        self.hooks.iter().map(|h| h.id().to_string()).collect()
    }
}

/// Runs the tiers of one pipeline run.
pub struct Scheduler {
    config: PipelineConfig,
    sink: Arc<dyn VerdictSink>,
}

impl Scheduler {
    pub fn new(config: PipelineConfig, sink: Arc<dyn VerdictSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute `hooks` (already ordered by tier, then registration) for
    /// `event`.
    pub async fn schedule(
        &self,
        run_id: Uuid,
        event: Arc<Event>,
        hooks: Vec<Arc<RegisteredHook>>,
    ) -> ScheduleOutcome {
        let deadline = Instant::now() + self.config.timeout();
        let mut background = BackgroundTasks::new();

        let (mut critical, mut high, mut advisory) = (Vec::new(), Vec::new(), Vec::new());
        for hook in hooks {
            match hook.descriptor.priority_tier {
                PriorityTier::Critical => critical.push(hook),
                PriorityTier::High => high.push(hook),
                PriorityTier::Background => advisory.push(hook),
            }
        }

        let mut speculative = if self.config.speculative_high_tier && !high.is_empty() {
            Some(self.dispatch_high(std::mem::take(&mut high), &event))
        } else {
            None
        };

        let mut counted = Vec::with_capacity(critical.len() + high.len());
        let mut critical_block = false;
        for hook in critical {
            let verdict = run_hook(hook, Arc::clone(&event)).await;
            let blocked = verdict.kind.is_blocking();
            counted.push(verdict);
            if blocked {
                critical_block = true;
                break;
            }
        }

        let mut discarded_hooks = Vec::new();
        let mut background_hooks = Vec::new();

        if critical_block {
            let blocker = counted.last().map(|v| v.hook_id.as_str()).unwrap_or("");
            tracing::debug!(run_id = %run_id, hook_id = %blocker, "critical block, skipping lower tiers");
            if let Some(dispatch) = speculative.take() {
                discarded_hooks = dispatch.hook_ids();
                background.push(self.discard(run_id, &event, dispatch));
            }
        } else {
            let dispatch = match speculative.take() {
                Some(dispatch) => dispatch,
                None => self.dispatch_high(high, &event),
            };
            counted.extend(collect_high(dispatch, deadline).await);

            for hook in advisory {
                background_hooks.push(hook.id().to_string());
                background.push(self.dispatch_background(run_id, &event, hook));
            }
        }

        for verdict in &counted {
            record_quietly(
                self.sink.as_ref(),
                &VerdictRecord::new(run_id, &event, Disposition::Counted, verdict.clone()),
            );
        }

        ScheduleOutcome {
            counted,
            critical_block,
            background_hooks,
            discarded_hooks,
            background,
        }
    }

    fn dispatch_high(&self, hooks: Vec<Arc<RegisteredHook>>, event: &Arc<Event>) -> HighTierDispatch {
        let limit = self
            .config
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let mut tasks = JoinSet::new();

        for (index, hook) in hooks.iter().enumerate() {
            let hook = Arc::clone(hook);
            let event = Arc::clone(event);
            let limit = limit.clone();
            tasks.spawn(async move {
                // A closed semaphore only happens on shutdown; run unthrottled.
                let _permit = match limit {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                (index, run_hook(hook, event).await)
            });
        }

        HighTierDispatch { hooks, tasks }
    }

    /// Let speculative high-tier work finish detached; record what it
    /// produces as discarded.
    fn discard(
        &self,
        run_id: Uuid,
        event: &Arc<Event>,
        mut dispatch: HighTierDispatch,
    ) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let event = Arc::clone(event);
        tokio::spawn(async move {
            while let Some(joined) = dispatch.tasks.join_next().await {
                if let Ok((_, verdict)) = joined {
                    record_quietly(
                        sink.as_ref(),
                        &VerdictRecord::new(run_id, &event, Disposition::Discarded, verdict),
                    );
                }
            }
        })
    }

    fn dispatch_background(
        &self,
        run_id: Uuid,
        event: &Arc<Event>,
        hook: Arc<RegisteredHook>,
    ) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let event = Arc::clone(event);
        tokio::spawn(async move {
            let verdict = run_hook(hook, Arc::clone(&event)).await;
            record_quietly(
                sink.as_ref(),
                &VerdictRecord::new(run_id, &event, Disposition::Advisory, verdict),
            );
        })
    }
}

/// Await the high tier until every hook finished or `deadline` passed.
/// Returns verdicts in registry order.
async fn collect_high(mut dispatch: HighTierDispatch, deadline: Instant) -> Vec<Verdict> {
    let started = Instant::now();
    let mut slots: Vec<Option<Verdict>> = vec![None; dispatch.hooks.len()];

    let deadline_passed = loop {
        match tokio::time::timeout_at(deadline, dispatch.tasks.join_next()).await {
            Ok(Some(Ok((index, verdict)))) => slots[index] = Some(verdict),
            Ok(Some(Err(e))) => tracing::warn!("high-tier task ended without a verdict: {}", e),
            Ok(None) => break false,
            Err(_) => break true,
        }
    };

    if deadline_passed {
        dispatch.tasks.abort_all();
    }

    slots
        .into_iter()
        .zip(&dispatch.hooks)
        .map(|(slot, hook)| {
            slot.unwrap_or_else(|| {
                let fault = if deadline_passed {
                    HookFault::PipelineDeadline {
                        hook_id: hook.id().to_string(),
                    }
                } else {
                    HookFault::Execution {
                        hook_id: hook.id().to_string(),
                        reason: "hook task ended without a verdict".to_string(),
                    }
                };
                tracing::warn!(hook_id = %hook.id(), "{}", fault);
                Verdict::from_fault(hook.id(), PriorityTier::High, &fault, started.elapsed())
            })
        })
        .collect()
}
