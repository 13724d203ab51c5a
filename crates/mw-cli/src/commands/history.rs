use std::fmt::Write as _;

use anyhow::Context;
use chrono::Local;
use mw_core::types::ProcessedRecord;

use super::CliContext;

pub fn run(ctx: &CliContext, days: Option<u32>) -> anyhow::Result<()> {
    let days = days.unwrap_or(ctx.config.watch.history_days);
    let mut records = ctx
        .ledger()
        .recent_records(days)
        .context("failed to read watch state")?;
    records.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));

    if records.is_empty() {
        println!("No PRs processed in the last {days} day(s).");
        return Ok(());
    }
    for record in &records {
        print!("{}", render(record));
    }
    Ok(())
}

fn render(record: &ProcessedRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {}#{} {} (merged by {})",
        record.processed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        if record.owner.is_empty() { String::new() } else { format!("{}/{}", record.owner, record.repo) },
        record.pr_number,
        record.pr_title,
        if record.merged_by.is_empty() { "unknown" } else { &record.merged_by },
    );
    for update in &record.jira_updates {
        match &update.error {
            None => {
                let _ = writeln!(out, "    ok    {}: {} -> {}", update.ticket, update.old_status, update.new_status);
            }
            Some(err) => {
                let _ = writeln!(out, "    FAIL  {}: {err}", update.ticket);
            }
        }
    }
    out
}
