//! Console and JSON rendering shared by the run commands.

use std::path::Path;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tipisync_core::PackageName;
use tipisync_engine::{Bucket, BucketCounts, ChangeSet, SyncDecision};
use tipisync_sync::{MutationFailure, PublishOutcome, RunReport};

// ---------------------------------------------------------------------------
// JSON payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DecisionJson<'a> {
    name: &'a PackageName,
    #[serde(flatten)]
    decision: &'a SyncDecision,
}

#[derive(Serialize)]
struct ChangesJson<'a> {
    counts: BucketCounts,
    decisions: Vec<DecisionJson<'a>>,
}

impl<'a> ChangesJson<'a> {
    fn new(changes: &'a ChangeSet) -> Self {
        ChangesJson {
            counts: changes.counts(),
            decisions: changes
                .iter()
                .map(|(name, decision)| DecisionJson { name, decision })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    dry_run: bool,
    has_changes: bool,
    #[serde(flatten)]
    changes: ChangesJson<'a>,
    removed: &'a [PackageName],
    kept: &'a [PackageName],
    missing: &'a [PackageName],
    failures: &'a [MutationFailure],
    publish: &'a PublishOutcome,
    changelog: Option<&'a Path>,
    changelog_error: Option<&'a str>,
}

pub fn print_plan_json(changes: &ChangeSet) -> Result<()> {
    let payload = ChangesJson::new(changes);
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

pub fn print_report_json(report: &RunReport) -> Result<()> {
    let payload = ReportJson {
        dry_run: report.dry_run,
        has_changes: report.has_changes(),
        changes: ChangesJson::new(&report.changes),
        removed: &report.removed,
        kept: &report.kept,
        missing: &report.missing,
        failures: &report.failures,
        publish: &report.publish,
        changelog: report.changelog.as_deref(),
        changelog_error: report.changelog_error.as_deref(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize report JSON")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "app")]
    app: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "reason")]
    reason: String,
}

fn paint(bucket: Bucket, text: &str) -> ColoredString {
    match bucket {
        Bucket::Added => text.green(),
        Bucket::Updated => text.cyan(),
        Bucket::Preserved => text.blue(),
        Bucket::Skipped => text.bright_black(),
        Bucket::Conflicted => text.yellow().bold(),
    }
}

/// Table of every package that is not skipped, plus per-bucket counts.
pub fn print_plan_table(changes: &ChangeSet) {
    let rows: Vec<PlanRow> = changes
        .iter()
        .filter(|(_, decision)| decision.bucket() != Bucket::Skipped)
        .map(|(name, decision)| PlanRow {
            app: name.to_string(),
            action: decision.bucket().to_string(),
            reason: decision.reason().unwrap_or("new upstream app").to_string(),
        })
        .collect();

    if rows.is_empty() {
        println!("No apps in sync scope.");
    } else {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    print_counts(&changes.counts());
}

fn print_counts(counts: &BucketCounts) {
    let parts: Vec<String> = Bucket::all()
        .iter()
        .map(|bucket| {
            let label = format!("{} {bucket}", counts.get(*bucket));
            paint(*bucket, &label).to_string()
        })
        .collect();
    println!("{}", parts.join("  "));
}

/// Names per bucket with their reasons; skipped apps are listed on one line.
pub fn print_changes(changes: &ChangeSet) {
    let counts = changes.counts();
    for bucket in Bucket::all() {
        let n = counts.get(*bucket);
        if n == 0 {
            continue;
        }
        println!("{} ({n})", paint(*bucket, &bucket.to_string()).bold());
        if *bucket == Bucket::Skipped {
            let names: Vec<&str> = changes
                .names_in(Bucket::Skipped)
                .into_iter()
                .map(PackageName::as_str)
                .collect();
            println!("    {}", names.join(", ").bright_black());
            continue;
        }
        for (name, decision) in changes.in_bucket(*bucket) {
            match decision.reason() {
                Some(reason) => println!("    {name}: {}", reason.dimmed()),
                None => println!("    {name}"),
            }
        }
    }
}

/// Human summary of a finished run.
pub fn print_report(command: &str, report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let headline = if report.has_changes() {
        format!("{prefix}✓ {command} finished with changes")
    } else {
        format!("{prefix}✓ {command} finished, nothing to change")
    };
    println!("{}", headline.bold());

    if !report.changes.is_empty() {
        print_changes(&report.changes);
    }
    if !report.removed.is_empty() {
        let verb = if report.dry_run { "would remove" } else { "removed" };
        println!("{} ({})", verb.red().bold(), report.removed.len());
        for name in &report.removed {
            println!("    {name}");
        }
    }
    if !report.kept.is_empty() {
        println!("{} ({})", "kept".green(), report.kept.len());
    }
    for name in &report.missing {
        println!("{} custom app '{name}' is not present", "⚠".yellow());
    }
    for failure in &report.failures {
        println!("{} {}: {}", "✗".red(), failure.name, failure.message);
    }
    if let Some(path) = &report.changelog {
        println!("changelog: {}", path.display());
    }
    if let Some(error) = &report.changelog_error {
        println!("{} changelog not written: {error}", "⚠".yellow());
    }
    print_publish(&report.publish);
}

fn print_publish(outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::NotRequested => {}
        PublishOutcome::NothingToCommit => println!("✓ nothing to commit"),
        PublishOutcome::Committed { message } => println!("✓ committed: {message}"),
        PublishOutcome::Pushed { branch, message } => {
            println!("✓ pushed to {branch}: {message}")
        }
        PublishOutcome::Failed {
            error, retry_hint, ..
        } => {
            println!("{} publish failed: {error}", "⚠".yellow());
            println!("    retry manually: {}", retry_hint.bold());
        }
    }
}
