//! Scan command implementation.

use anyhow::{Context as _, Result};
use colored::Colorize;
use sigcheck_core::{SaveStatus, ScanOrchestrator, SignatureService};
use tracing::{info, warn};

use crate::utils::{score_bar, severity_label, Context};

/// Execute the scan command.
pub async fn execute(ctx: &Context, id: i64, json: bool) -> Result<()> {
    let record = SignatureService::new(ctx.signatures.clone(), ctx.state.clone())
        .get(id)
        .await?;
    info!(signature_id = id, "Scanning signature record");

    let orchestrator = ScanOrchestrator::new(
        record,
        ctx.scanner.clone(),
        ctx.results.clone(),
        ctx.state.clone(),
    );
    if !json {
        eprintln!("{}", "Analyzing...".dimmed());
    }
    let report = orchestrator.start_scan().await.context("Scan failed")?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
        return Ok(());
    }

    println!();
    println!("   {} {}", "Result:".dimmed(), severity_label(report.severity));
    println!("   {}", report.severity.description());
    println!(
        "   {} {} {:.2}%",
        "Similarity:".dimmed(),
        score_bar(report.donut_fraction, 20),
        report.similarity_index
    );
    println!("   {} {}", "Scanned on:".dimmed(), report.computed_at);

    match &report.save_status {
        SaveStatus::Saved => println!("   {} {}", "Stored:".dimmed(), "yes".green()),
        SaveStatus::Failed(reason) => {
            warn!(error = %reason, "Result shown but not stored");
            println!(
                "   {} {}",
                "Stored:".dimmed(),
                format!("no ({reason})").yellow()
            );
        }
        SaveStatus::Stored => {}
    }
    Ok(())
}
