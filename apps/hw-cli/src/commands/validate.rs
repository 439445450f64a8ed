// validate.rs — Load the manifest and print what would run.
//
// Fails (non-zero exit) on any manifest error: unreadable file, parse
// error, duplicate id, bad matcher, or unknown handler type.

use hw_engine::PriorityTier;

use crate::engine::EngineContext;

pub fn execute(ctx: &EngineContext) -> anyhow::Result<()> {
    let registry = ctx.build_registry()?;
    let snapshot = registry.snapshot();

    if snapshot.is_empty() {
        println!("No hooks defined in {}", ctx.manifest_path.display());
        return Ok(());
    }

    println!(
        "{:<24} {:<6} {:<10} {:<8} {:<24} HANDLER",
        "ID", "PHASE", "TIER", "TIMEOUT", "MATCHER"
    );
    println!("{}", "-".repeat(90));

    for tier in PriorityTier::ALL {
        for hook in snapshot
            .hooks()
            .iter()
            .filter(|h| h.descriptor.priority_tier == tier)
        {
            let d = &hook.descriptor;
            println!(
                "{:<24} {:<6} {:<10} {:<8} {:<24} {}{}",
                d.id,
                d.phase.as_str(),
                tier.as_str(),
                format!("{}ms", d.timeout_ms),
                d.matcher.source(),
                hook.evaluator.describe(),
                if d.enabled { "" } else { " (disabled)" },
            );
        }
    }

    let counts = snapshot.tier_counts();
    println!();
    println!(
        "{} hook(s); enabled: {} critical, {} high, {} background.",
        snapshot.len(),
        counts.get(&PriorityTier::Critical).copied().unwrap_or(0),
        counts.get(&PriorityTier::High).copied().unwrap_or(0),
        counts.get(&PriorityTier::Background).copied().unwrap_or(0),
    );
    Ok(())
}
