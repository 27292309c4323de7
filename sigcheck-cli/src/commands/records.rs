//! Signature record commands: new, list, show.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use colored::Colorize;
use sigcheck_core::{ScanOrchestrator, SignatureForm, SignatureService};

use crate::utils::{format_timestamp, score_bar, severity_label, Context};

fn service(ctx: &Context) -> SignatureService {
    SignatureService::new(ctx.signatures.clone(), ctx.state.clone())
}

pub async fn create(
    ctx: &Context,
    title: String,
    author: String,
    original: PathBuf,
    scanned: PathBuf,
) -> Result<()> {
    let form = SignatureForm {
        title,
        author,
        original_image: Some(original),
        scanned_image: Some(scanned),
    };
    let record = service(ctx)
        .submit(&form)
        .await
        .context("Failed to create signature record")?;

    println!();
    println!("{}", "Signature record created.".green().bold());
    println!("   {} {}", "ID:".dimmed(), record.id);
    println!("   {} {}", "Title:".dimmed(), record.title);
    println!("   {} sigcheck scan {}", "Next:".dimmed(), record.id);
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let records = service(ctx).refresh().await?;
    if records.is_empty() {
        println!("{}", "No signature records yet.".dimmed());
        return Ok(());
    }

    println!("{:>6}  {:<30}  {:<20}  {}", "ID".bold(), "TITLE".bold(), "AUTHOR".bold(), "CREATED".bold());
    for record in &records {
        println!(
            "{:>6}  {:<30}  {:<20}  {}",
            record.id,
            truncate(&record.title, 30),
            truncate(&record.author, 20),
            format_timestamp(&record.created_at)
        );
    }
    Ok(())
}

pub async fn show(ctx: &Context, id: i64) -> Result<()> {
    let record = service(ctx).get(id).await?;

    println!();
    println!("{}", record.title.bold());
    println!("   {} {}", "ID:".dimmed(), record.id);
    println!("   {} {}", "Author:".dimmed(), record.author);
    println!("   {} {}", "Created:".dimmed(), format_timestamp(&record.created_at));

    let orchestrator = ScanOrchestrator::new(
        record,
        ctx.scanner.clone(),
        ctx.results.clone(),
        ctx.state.clone(),
    );
    match orchestrator.load_existing().await? {
        Some(report) => {
            println!(
                "   {} {} {} {:.2}%",
                "Last result:".dimmed(),
                severity_label(report.severity),
                score_bar(report.donut_fraction, 20),
                report.similarity_index
            );
            println!("   {} {}", "Scanned on:".dimmed(), report.computed_at);
        }
        None => println!("   {} {}", "Last result:".dimmed(), "not scanned yet".dimmed()),
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-ten", 11), "exactly-ten");
        assert_eq!(truncate("much too long", 5), "much…");
    }
}
