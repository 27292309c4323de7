//! Classify command implementation.

use anyhow::Result;
use colored::Colorize;
use sigcheck_core::{classify, donut_fraction};

use crate::utils::{score_bar, severity_label};

/// Print the severity for a score. Unparseable input classifies as unknown.
pub fn execute(score: &str) -> Result<()> {
    let value = score.trim().parse::<f64>().ok();
    let severity = classify(value);

    println!("{}", severity_label(severity));
    println!("   {}", severity.description());
    if let Some(value) = value.filter(|v| v.is_finite()) {
        println!(
            "   {} {} {:.2}%",
            "Similarity:".dimmed(),
            score_bar(donut_fraction(value), 20),
            value
        );
    }
    Ok(())
}
