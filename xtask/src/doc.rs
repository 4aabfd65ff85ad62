use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::check::{run_step, Step};
use crate::TARGET;

const PACKAGES: [&str; 5] = ["doc", "-p", "platform", "-p", "soc"];

/// `cargo doc` arguments. Host docs carry the simulated SoC; target docs
/// carry the Cortex-M33 `Core` implementation.
fn doc_args(on_target: bool, open: bool) -> Vec<&'static str> {
    let mut args = PACKAGES.to_vec();
    args.push("--no-deps");
    if on_target {
        args.extend(["--target", TARGET, "--features", "soc/hardware"]);
    } else {
        args.extend(["--features", "soc/std"]);
    }
    if open {
        args.push("--open");
    }
    args
}

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    let host = doc_args(false, false);
    let target = doc_args(true, open);
    for (label, args) in [("host docs (simulated SoC)", &host), ("target docs (Cortex-M33)", &target)] {
        println!("{}", format!("  Documenting {label}...").cyan());
        run_step(&Step { label, args, fatal: true })?;
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ Documentation built in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );

    if !open {
        println!();
        println!(
            "   {}",
            format!("Open target/{TARGET}/doc/soc/index.html in your browser").dimmed()
        );
        println!(
            "   {}",
            "Or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
    }

    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_docs_use_simulated_soc() {
        let args = doc_args(false, false);
        assert!(args.windows(2).any(|w| w == ["--features", "soc/std"]));
        assert!(!args.contains(&"--target"));
        assert!(!args.contains(&"--open"));
    }

    #[test]
    fn target_docs_build_hardware_feature() {
        let args = doc_args(true, false);
        assert!(args.windows(2).any(|w| w == ["--target", TARGET]));
        assert!(args.windows(2).any(|w| w == ["--features", "soc/hardware"]));
        assert!(!args.contains(&"soc/std"));
    }

    #[test]
    fn open_applies_to_one_build() {
        assert_eq!(doc_args(true, true).last(), Some(&"--open"));
        assert!(!doc_args(false, false).contains(&"--open"));
    }
}
