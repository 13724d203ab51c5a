use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, Utc};
use mw_core::process::SignalProbe;
use mw_core::tickets::{extract_ticket_ids, project_key};
use mw_core::types::WatchedPr;
use mw_daemon::bootstrap::{build_cycle, github_client};
use mw_daemon::cycle::CycleReport;
use mw_daemon::daemon::WatchDaemon;
use mw_daemon::processor::RunMode;
use mw_daemon::scheduler::format_until;
use mw_integrations::{CodeHost, PullRequestInfo};
use tracing::warn;

use super::{parse_repo, CliContext};

pub async fn check(ctx: &CliContext, dry_run: bool) -> anyhow::Result<()> {
    let mode = if dry_run { RunMode::DryRun } else { RunMode::Live };
    let cycle = build_cycle(&ctx.paths, &ctx.config).context("cannot run check")?;
    let daemon = WatchDaemon::new(cycle, ctx.scheduler(), Arc::new(SignalProbe));
    let report = daemon.check_once(mode).await.context("check cycle failed")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &CycleReport) {
    let prefix = if report.mode.is_dry_run() { "[dry run] " } else { "" };
    println!(
        "{prefix}Checked {} PR(s): {} merged, {} lookup failure(s)",
        report.watched,
        report.merged.len(),
        report.lookup_failures
    );
    for record in &report.records {
        println!("  #{} {}", record.pr_number, record.pr_title);
        for update in &record.jira_updates {
            match &update.error {
                None => println!("    ok    {}: {} -> {}", update.ticket, update.old_status, update.new_status),
                Some(err) => println!("    FAIL  {}: {err}", update.ticket),
            }
        }
    }
    if report.swept > 0 {
        println!("Removed {} already processed PR(s) from the watch list", report.swept);
    }
}

pub fn show_config(ctx: &CliContext) -> anyhow::Result<()> {
    let scheduler = ctx.scheduler();
    let now = Local::now();
    let next = scheduler.next_check_time(&now);
    let watch = &ctx.config.watch;

    println!("Data directory:  {}", ctx.paths.root().display());
    println!("Config file:     {}", ctx.paths.config().display());
    println!("Current mode:    {}", scheduler.current_mode(&now));
    println!(
        "Schedule:        every {} min by day, night {:05.2}h-{:05.2}h at {:?}",
        watch.daytime_interval_mins, watch.night_start, watch.night_end, watch.night_checks
    );
    println!(
        "Next check:      {} ({})",
        next.format("%Y-%m-%d %H:%M"),
        format_until(&next, &now)
    );
    let credentials = ctx.credentials()?;
    let github = if credentials.github_token(&ctx.config.github).is_some() { "set" } else { "missing" };
    let jira = if credentials.jira_token(&ctx.config.jira).is_some() { "set" } else { "missing" };
    println!("GitHub token:    {} ({github})", ctx.config.github.token_env);
    println!("Jira token:      {} ({jira})", ctx.config.jira.token_env);
    println!();
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}

pub async fn add(ctx: &CliContext, repo: &str, number: u64, tickets: Vec<String>) -> anyhow::Result<()> {
    let (owner, repo) = parse_repo(repo)?;
    let info = fetch_pull_request(ctx, &owner, &repo, number).await;

    let tickets = if tickets.is_empty() {
        let Some(info) = &info else {
            anyhow::bail!("no tickets given and PR #{number} could not be fetched; pass --ticket");
        };
        extract_ticket_ids([info.head_branch.as_str(), info.title.as_str()])
    } else {
        tickets.into_iter().map(|t| t.trim().to_uppercase()).collect()
    };
    if tickets.is_empty() {
        anyhow::bail!("no ticket ids found in the PR branch or title; pass --ticket");
    }
    for ticket in &tickets {
        if project_key(ticket).is_none() {
            anyhow::bail!("invalid ticket id {ticket:?}");
        }
    }

    let pr = WatchedPr {
        pr_number: number,
        owner: owner.clone(),
        repo: repo.clone(),
        branch: info.as_ref().map(|i| i.head_branch.clone()).unwrap_or_default(),
        title: info.as_ref().map(|i| i.title.clone()).unwrap_or_default(),
        pr_url: info
            .as_ref()
            .map(|i| i.url.clone())
            .unwrap_or_else(|| format!("https://github.com/{owner}/{repo}/pull/{number}")),
        jira_tickets: tickets.clone(),
        created_at: String::new(),
    };
    ctx.registry().add(pr).context("failed to update watch list")?;

    let unmapped: Vec<&str> = tickets
        .iter()
        .filter_map(|t| project_key(t))
        .filter(|p| matches!(ctx.mappings().get(p), Ok(None)))
        .collect();
    println!("Watching {owner}/{repo}#{number} for {}", tickets.join(", "));
    if !unmapped.is_empty() {
        println!(
            "Note: no status mapping for {}; run `mw mapping set` before it merges",
            unmapped.join(", ")
        );
    }
    Ok(())
}

/// PR details for registration, or `None` when no token is configured or
/// the lookup fails.
async fn fetch_pull_request(ctx: &CliContext, owner: &str, repo: &str, number: u64) -> Option<PullRequestInfo> {
    let credentials = match ctx.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(error = %e, "cannot read credentials");
            return None;
        }
    };
    let token = credentials.github_token(&ctx.config.github)?;
    let client = match github_client(&ctx.config.github, &token) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "cannot build GitHub client");
            return None;
        }
    };
    match client.get_pull_request(owner, repo, number).await {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(pr = number, error = %e, "failed to fetch PR details");
            None
        }
    }
}

pub fn list(ctx: &CliContext) -> anyhow::Result<()> {
    let prs = ctx.registry().list().context("failed to read watch list")?;
    if prs.is_empty() {
        println!("Not watching any PRs.");
        return Ok(());
    }
    for pr in prs {
        let age = pr
            .created_at_parsed()
            .map(|t| format!("{}d", (Utc::now() - t).num_days()))
            .unwrap_or_else(|| "?".into());
        println!(
            "{}/{}#{:<6} {:<24} {:>4}  {}",
            pr.owner,
            pr.repo,
            pr.pr_number,
            pr.jira_tickets.join(","),
            age,
            pr.title
        );
    }
    Ok(())
}

pub fn remove(ctx: &CliContext, number: u64, repo: Option<&str>) -> anyhow::Result<()> {
    let registry = ctx.registry();
    let (owner, repo) = match repo {
        Some(repo) => parse_repo(repo)?,
        None => {
            let matching: Vec<WatchedPr> = registry
                .list()
                .context("failed to read watch list")?
                .into_iter()
                .filter(|p| p.pr_number == number)
                .collect();
            match matching.as_slice() {
                [] => {
                    println!("Not watching PR #{number}");
                    return Ok(());
                }
                [pr] => (pr.owner.clone(), pr.repo.clone()),
                _ => anyhow::bail!("PR #{number} is watched in several repositories; pass --repo OWNER/REPO"),
            }
        }
    };

    if !registry.exists(&owner, &repo, number)? {
        println!("Not watching {owner}/{repo}#{number}");
        return Ok(());
    }
    registry
        .remove(&owner, &repo, number)
        .context("failed to update watch list")?;
    println!("Stopped watching {owner}/{repo}#{number}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;

    #[tokio::test]
    async fn add_with_explicit_tickets_needs_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.config.github.token_env = "MW_TEST_UNSET_GITHUB_TOKEN".into();

        add(&ctx, "acme/api", 12, vec!["proj-3".into()]).await.unwrap();

        let pr = ctx.registry().find_by_number(12).unwrap().unwrap();
        assert_eq!(pr.jira_tickets, vec!["PROJ-3"]);
        assert_eq!(pr.pr_url, "https://github.com/acme/api/pull/12");
        assert!(pr.created_at_parsed().is_some());
    }

    #[tokio::test]
    async fn add_without_tickets_or_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.config.github.token_env = "MW_TEST_UNSET_GITHUB_TOKEN".into();

        assert!(add(&ctx, "acme/api", 12, vec![]).await.is_err());
        assert_eq!(ctx.registry().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_by_number_alone_when_unambiguous() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.config.github.token_env = "MW_TEST_UNSET_GITHUB_TOKEN".into();
        add(&ctx, "acme/api", 7, vec!["PROJ-7".into()]).await.unwrap();
        add(&ctx, "acme/web", 7, vec!["WEB-7".into()]).await.unwrap();

        assert!(remove(&ctx, 7, None).is_err());
        remove(&ctx, 7, Some("acme/web")).unwrap();
        remove(&ctx, 7, None).unwrap();
        assert_eq!(ctx.registry().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn check_uses_env_file_tokens_without_claiming_the_daemon_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.config.github.token_env = "MW_TEST_CHECK_GITHUB_TOKEN".into();
        ctx.config.jira.token_env = "MW_TEST_CHECK_JIRA_TOKEN".into();
        ctx.config.jira.base_url = "https://acme.atlassian.net".into();
        ctx.config.jira.email = "bot@acme.io".into();
        mw_core::credentials::write_env_file(
            ctx.paths.env_file(),
            &[("MW_TEST_CHECK_GITHUB_TOKEN", "g"), ("MW_TEST_CHECK_JIRA_TOKEN", "j")],
        )
        .unwrap();

        check(&ctx, true).await.unwrap();

        let meta = ctx.ledger().metadata().unwrap();
        assert!(!meta.is_recorded());
        assert!(meta.last_check_time.is_none());
    }
}
