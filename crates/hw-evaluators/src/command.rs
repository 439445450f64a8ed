// command.rs — Hooks implemented as external processes.
//
// The event is written as JSON to the process's stdin. The exit status and
// output decide the outcome:
//
//   exit 0, empty stdout        → allow
//   exit 0, JSON object stdout  → {decision|kind, message|reason,
//                                  content|modifiedContent} mapped to an outcome
//   exit 0, other stdout        → allow, stdout kept as the message
//   exit 2                      → block; stderr (or stdout) is the reason
//   anything else               → evaluation error (the runner fails open)
//
// The child is spawned with kill_on_drop, so when the runner aborts a
// timed-out evaluation the process is killed with it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use hw_engine::{EvaluationError, HookEvaluator, HookOutcome};
use hw_event::Event;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit code that means "block this operation".
pub const BLOCK_EXIT_CODE: i32 = 2;

/// `handler` block for `type: command`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory. Relative paths resolve against the project root.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Structured response a command may print on stdout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandResponse {
    #[serde(default, alias = "kind")]
    decision: Option<String>,
    #[serde(default, alias = "reason")]
    message: Option<String>,
    #[serde(default, alias = "modifiedContent")]
    content: Option<String>,
}

/// Runs an external command for every event.
#[derive(Debug, Clone)]
pub struct CommandHook {
    spec: CommandSpec,
    base_dir: Option<PathBuf>,
}

impl CommandHook {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            base_dir: None,
        }
    }

    /// Resolve relative command paths and `cwd` against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn program(&self) -> PathBuf {
        let program = Path::new(&self.spec.command);
        match &self.base_dir {
            // Bare names ("python3") go through PATH; only relative paths are anchored.
            Some(base) if program.is_relative() && program.components().count() > 1 => {
                base.join(program)
            }
            _ => program.to_path_buf(),
        }
    }

    fn working_dir(&self) -> Option<PathBuf> {
        match (&self.spec.cwd, &self.base_dir) {
            (Some(cwd), Some(base)) if cwd.is_relative() => Some(base.join(cwd)),
            (Some(cwd), _) => Some(cwd.clone()),
            (None, base) => base.clone(),
        }
    }
}

#[async_trait]
impl HookEvaluator for CommandHook {
    async fn evaluate(&self, event: &Event) -> Result<HookOutcome, EvaluationError> {
        let payload = serde_json::to_vec(event).map_err(|e| EvaluationError::InvalidResponse {
            reason: format!("failed to encode event: {}", e),
        })?;

        let program = self.program();
        let mut cmd = Command::new(&program);
        cmd.args(&self.spec.args)
            .envs(&self.spec.env)
            .env("HOOKWARDEN_PHASE", event.phase().as_str())
            .env("HOOKWARDEN_TOOL", event.tool_name())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            EvaluationError::failed(format!("failed to spawn '{}': {}", program.display(), e))
        })?;

        // Feed stdin while draining stdout/stderr, or a command that writes
        // before reading could fill its pipe and stall both sides.
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                // A command may exit without reading its input; that is not an error.
                if let Err(e) = stdin.write_all(&payload).await {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e);
                    }
                }
            }
            Ok(())
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;
        written?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(command = %program.display(), stderr = %stderr.trim(), "hook stderr");
        }

        interpret(output.status.code(), stdout.trim(), stderr.trim())
    }

    fn describe(&self) -> String {
        format!("command: {}", self.spec.command)
    }
}

/// Map an exit status and output to an outcome.
fn interpret(code: Option<i32>, stdout: &str, stderr: &str) -> Result<HookOutcome, EvaluationError> {
    match code {
        Some(0) if stdout.is_empty() => Ok(HookOutcome::allow()),
        Some(0) if stdout.starts_with('{') => {
            let response: CommandResponse =
                serde_json::from_str(stdout).map_err(|e| EvaluationError::InvalidResponse {
                    reason: e.to_string(),
                })?;
            map_response(response)
        }
        Some(0) => Ok(HookOutcome::Allow {
            message: Some(stdout.to_string()),
        }),
        Some(BLOCK_EXIT_CODE) => {
            let reason = if stderr.is_empty() { stdout } else { stderr };
            Ok(HookOutcome::block(reason))
        }
        Some(code) => Err(EvaluationError::failed(if stderr.is_empty() {
            format!("exited with status {}", code)
        } else {
            format!("exited with status {}: {}", code, stderr)
        })),
        None => Err(EvaluationError::failed("terminated by signal")),
    }
}

fn map_response(response: CommandResponse) -> Result<HookOutcome, EvaluationError> {
    let decision = response
        .decision
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| {
            if response.content.is_some() {
                "modify".to_string()
            } else {
                "allow".to_string()
            }
        });

    match decision.as_str() {
        "allow" | "approve" => Ok(HookOutcome::Allow {
            message: response.message,
        }),
        "block" | "deny" => Ok(HookOutcome::block(response.message.unwrap_or_default())),
        "warn" | "warning" => match response.message {
            Some(message) => Ok(HookOutcome::warn(message)),
            None => Err(EvaluationError::InvalidResponse {
                reason: "warn decision without a message".to_string(),
            }),
        },
        "modify" => match response.content {
            Some(content) => Ok(HookOutcome::Modify {
                content,
                message: response.message,
            }),
            None => Err(EvaluationError::InvalidResponse {
                reason: "modify decision without content".to_string(),
            }),
        },
        other => Err(EvaluationError::InvalidResponse {
            reason: format!("unknown decision '{}'", other),
        }),
    }
}
