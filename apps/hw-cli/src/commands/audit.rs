// audit.rs — Audit subcommands: verify, tail.

use std::path::PathBuf;

use clap::Subcommand;
use hw_audit::{AuditError, VerdictLog};

use crate::engine::EngineContext;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the verdict log hash chain.
    Verify {
        /// Path to the verdict log (defaults to .hookwarden/verdicts.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Show recent verdicts.
    Tail {
        /// Path to the verdict log (defaults to .hookwarden/verdicts.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of entries to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, ctx: &EngineContext) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log.clone().unwrap_or_else(|| ctx.audit_log_path());

            if !path.exists() {
                println!("No verdict log found at {}", path.display());
                return Ok(());
            }

            match VerdictLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Verdict log verified: {} entry(ies), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The verdict log may have been tampered with.");
                    anyhow::bail!("Verdict log integrity check failed");
                }
                Err(AuditError::SequenceGap {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("SEQUENCE GAP at line {}:", line);
                    println!("  Expected sequence: {}", expected);
                    println!("  Actual sequence:   {}", actual);
                    anyhow::bail!("Verdict log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let path = log.clone().unwrap_or_else(|| ctx.audit_log_path());

            if !path.exists() {
                println!("No verdict log found at {}", path.display());
                return Ok(());
            }

            let recent = VerdictLog::tail(&path, *n)?;
            if recent.is_empty() {
                println!("No verdicts recorded.");
                return Ok(());
            }

            println!(
                "{:<22} {:<20} {:<8} {:<10} {:<10} MESSAGE",
                "TIMESTAMP", "HOOK", "KIND", "TOOL", "DISPOSITION"
            );
            println!("{}", "-".repeat(90));

            for entry in &recent {
                let record = &entry.record;
                println!(
                    "{:<22} {:<20} {:<8} {:<10} {:<10} {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.verdict.hook_id,
                    record.verdict.kind.as_str(),
                    record.tool_name,
                    record.disposition.as_str(),
                    record
                        .verdict
                        .message
                        .as_deref()
                        .map(first_line)
                        .unwrap_or("-"),
                );
            }
        }
    }

    Ok(())
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}
