//! # hw-evaluators
//!
//! Built-in hook evaluators for hookwarden.
//!
//! The engine only knows the [`hw_engine::HookEvaluator`] contract. This
//! crate provides the two generic carriers a manifest can name:
//!
//! - [`CommandHook`] (`type: command`) runs an external process with the
//!   event as JSON on stdin. Exit code 2 blocks.
//! - [`RuleHook`] (`type: rules`) applies an ordered list of regex rules
//!   that block, warn, or rewrite content.
//!
//! [`BuiltinFactory`] turns manifest `handler` blocks into either kind.

pub mod command;
pub mod error;
pub mod factory;
pub mod rules;

pub use command::{CommandHook, CommandSpec, BLOCK_EXIT_CODE};
pub use error::EvaluatorError;
pub use factory::{BuiltinFactory, HandlerSpec};
pub use rules::{Rule, RuleAction, RuleHook, RuleTarget};
