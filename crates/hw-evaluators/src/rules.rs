// rules.rs — Declarative regex rule hooks.
//
// A rule hook carries an ordered list of rules. Each rule matches a regex
// against one field of the event and then blocks, warns, or rewrites:
//
//   - id: no-console
//     pattern: "console\\.log\\("
//     target: content        # content | path | tool
//     action: warn           # block | warn | replace
//     message: "remove debug logging"
//
// Evaluation walks the rules in order. The first matching `block` rule
// ends evaluation. `replace` rules rewrite a working copy of the content,
// and later rules see the rewritten text. Warnings accumulate.
//
// Regexes are compiled lazily through the shared PatternCache, keyed by
// the rule id and its pattern source.

use std::sync::Arc;

use async_trait::async_trait;
use hw_engine::{CompiledPattern, EvaluationError, HookEvaluator, HookOutcome, PatternCache};
use hw_event::Event;
use serde::{Deserialize, Serialize};

use crate::error::EvaluatorError;

/// Which event field a rule looks at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    #[default]
    Content,
    Path,
    Tool,
}

/// What a matching rule does.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Warn,
    Replace,
}

/// One rule as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub target: RuleTarget,
    pub action: RuleAction,
    #[serde(default)]
    pub message: Option<String>,
    /// Replacement text for `replace` rules; supports `$1`-style groups.
    #[serde(default)]
    pub replacement: Option<String>,
}

impl Rule {
    fn pattern_id(&self) -> String {
        format!("rule:{}:{}", self.id, self.pattern)
    }

    fn default_message(&self) -> String {
        format!("rule {} matched", self.id)
    }
}

/// Evaluates an ordered rule list against each event.
pub struct RuleHook {
    hook_id: String,
    rules: Vec<Rule>,
    cache: Arc<PatternCache>,
}

impl RuleHook {
    /// Validate the rules and build the hook. Patterns are compiled once
    /// here to surface syntax errors; the cached copy is built on first use.
    pub fn new(
        hook_id: impl Into<String>,
        rules: Vec<Rule>,
        cache: Arc<PatternCache>,
    ) -> Result<Self, EvaluatorError> {
        for rule in &rules {
            CompiledPattern::regex(&rule.pattern).map_err(|source| {
                EvaluatorError::InvalidPattern {
                    rule_id: rule.id.clone(),
                    source,
                }
            })?;
            if rule.action == RuleAction::Replace {
                if rule.replacement.is_none() {
                    return Err(EvaluatorError::InvalidRule {
                        rule_id: rule.id.clone(),
                        reason: "replace action requires a replacement".to_string(),
                    });
                }
                if rule.target != RuleTarget::Content {
                    return Err(EvaluatorError::InvalidRule {
                        rule_id: rule.id.clone(),
                        reason: "replace action only applies to content".to_string(),
                    });
                }
            }
        }

        Ok(Self {
            hook_id: hook_id.into(),
            rules,
            cache,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

#[async_trait]
impl HookEvaluator for RuleHook {
    async fn evaluate(&self, event: &Event) -> Result<HookOutcome, EvaluationError> {
        let mut rewritten: Option<String> = None;
        let mut warnings: Vec<String> = Vec::new();

        for rule in &self.rules {
            let compiled = self
                .cache
                .get_or_compile(&self.hook_id, &rule.pattern_id(), || {
                    CompiledPattern::regex(&rule.pattern)
                })?;
            let Some(regex) = compiled.as_regex() else {
                continue;
            };

            let text = match rule.target {
                RuleTarget::Content => rewritten.as_deref().or(event.content()),
                RuleTarget::Path => event.file_path(),
                RuleTarget::Tool => Some(event.tool_name()),
            };
            let Some(text) = text else {
                continue;
            };
            if !regex.is_match(text) {
                continue;
            }

            match rule.action {
                RuleAction::Block => {
                    return Ok(HookOutcome::block(
                        rule.message.clone().unwrap_or_else(|| rule.default_message()),
                    ));
                }
                RuleAction::Warn => {
                    warnings.push(rule.message.clone().unwrap_or_else(|| rule.default_message()));
                }
                RuleAction::Replace => {
                    let replacement = rule.replacement.as_deref().unwrap_or_default();
                    let replaced = regex.replace_all(text, replacement).into_owned();
                    rewritten = Some(replaced);
                    if let Some(message) = &rule.message {
                        warnings.push(message.clone());
                    }
                }
            }
        }

        let message = if warnings.is_empty() {
            None
        } else {
            Some(warnings.join("\n"))
        };

        match (rewritten, message) {
            (Some(content), message) if Some(content.as_str()) != event.content() => {
                Ok(HookOutcome::Modify { content, message })
            }
            (_, Some(message)) => Ok(HookOutcome::warn(message)),
            (_, None) => Ok(HookOutcome::allow()),
        }
    }

    fn describe(&self) -> String {
        format!("rules: {} rule(s)", self.rules.len())
    }
}
