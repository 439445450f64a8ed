// hook.rs — The opaque evaluation capability behind each hook.
//
// The engine never knows what a hook checks. It only knows the contract:
// given an Event, eventually return a HookOutcome or an EvaluationError.
// Built-in kinds (external commands, regex rules) live in hw-evaluators;
// embedding hosts can implement HookEvaluator directly or wrap a closure
// in FnHook.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use hw_event::Event;

use crate::descriptor::HookDescriptor;
use crate::error::EvaluationError;

/// What a hook decided about an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Nothing to object to.
    Allow { message: Option<String> },
    /// Stop the operation. The reason is shown to the user.
    Block { reason: String },
    /// Let the operation through but surface a warning.
    Warn { message: String },
    /// Replace the operation's content.
    Modify {
        content: String,
        message: Option<String>,
    },
}

impl HookOutcome {
    /// Shorthand for `Allow { message: None }`.
    pub fn allow() -> Self {
        HookOutcome::Allow { message: None }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        HookOutcome::Block {
            reason: reason.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        HookOutcome::Warn {
            message: message.into(),
        }
    }

    pub fn modify(content: impl Into<String>) -> Self {
        HookOutcome::Modify {
            content: content.into(),
            message: None,
        }
    }
}

/// Trait for the evaluation logic of one hook.
#[async_trait]
pub trait HookEvaluator: Send + Sync {
    /// Evaluate the hook against one event.
    async fn evaluate(&self, event: &Event) -> Result<HookOutcome, EvaluationError>;

    /// Short human-readable description (e.g. "command: ./check.sh").
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

/// Adapter that turns an async closure into a [`HookEvaluator`].
///
/// The closure receives an owned clone of the event so the returned future
/// can be `'static`.
pub struct FnHook<F> {
    f: F,
}

impl<F, Fut> FnHook<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HookOutcome, EvaluationError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> HookEvaluator for FnHook<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HookOutcome, EvaluationError>> + Send + 'static,
{
    async fn evaluate(&self, event: &Event) -> Result<HookOutcome, EvaluationError> {
        (self.f)(event.clone()).await
    }

    fn describe(&self) -> String {
        "closure".to_string()
    }
}

/// A descriptor bound to its evaluator. This is what the registry stores.
#[derive(Clone)]
pub struct RegisteredHook {
    pub descriptor: HookDescriptor,
    pub evaluator: Arc<dyn HookEvaluator>,
}

impl RegisteredHook {
    pub fn new(descriptor: HookDescriptor, evaluator: Arc<dyn HookEvaluator>) -> Self {
        Self {
            descriptor,
            evaluator,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

impl std::fmt::Debug for RegisteredHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHook")
            .field("descriptor", &self.descriptor)
            .field("evaluator", &self.evaluator.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hw_event::Phase;

    #[tokio::test]
    async fn fn_hook_sees_the_event() {
        let hook = FnHook::new(|event: Event| async move {
            if event.file_path().is_some_and(|p| p.ends_with(".env")) {
                Ok(HookOutcome::block("refusing to write .env files"))
            } else {
                Ok(HookOutcome::allow())
            }
        });

        let blocked = hook
            .evaluate(&Event::new(Phase::Pre, "write").with_file_path("/app/.env"))
            .await
            .unwrap();
        assert_eq!(blocked, HookOutcome::block("refusing to write .env files"));

        let allowed = hook
            .evaluate(&Event::new(Phase::Pre, "write").with_file_path("/app/main.rs"))
            .await
            .unwrap();
        assert_eq!(allowed, HookOutcome::allow());
    }
}
