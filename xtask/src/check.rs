use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::TARGET;

/// One `cargo` invocation and whether its failure aborts the run.
pub(crate) struct Step<'a> {
    pub label: &'a str,
    pub args: &'a [&'a str],
    pub fatal: bool,
}

const STEPS: &[Step<'static>] = &[
    Step {
        label: "platform crate (no_std)",
        args: &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
        fatal: true,
    },
    Step {
        label: "soc crate (no_std, Cortex-M33)",
        args: &["check", "-p", "soc", "--target", TARGET, "--features", "hardware"],
        fatal: true,
    },
    Step {
        label: "soc crate (host, tracing)",
        args: &["check", "-p", "soc", "--features", "std,tracing"],
        fatal: true,
    },
    Step {
        label: "clippy lints",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        fatal: false,
    },
    Step {
        label: "code formatting",
        args: &["fmt", "--all", "--check"],
        fatal: false,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        run_step(step)?;
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

/// Run one step, printing its outcome. Only a fatal step's failure is an error.
pub(crate) fn run_step(step: &Step<'_>) -> Result<()> {
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(step.args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", step.args.join(" ")))?;

    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                step.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else if step.fatal {
        eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{} failed", step.label);
    } else {
        // Lint and format findings are reported, not fatal.
        eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}
