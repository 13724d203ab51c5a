mod common;

use common::{FakeTracker, Fixture};
use mw_core::types::{zero_time, ProcessedRecord};
use mw_daemon::checker::Checker;

fn processed(repo: &str, number: u64) -> ProcessedRecord {
    ProcessedRecord {
        pr_number: number,
        owner: "acme".into(),
        repo: repo.into(),
        pr_title: String::new(),
        pr_url: format!("https://github.com/acme/{repo}/pull/{number}"),
        branch: String::new(),
        jira_tickets: vec![],
        merged_at: zero_time(),
        merged_by: String::new(),
        processed_at: zero_time(),
        jira_updates: vec![],
    }
}

#[tokio::test]
async fn reports_only_merged_prs_with_registration_tickets() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch(1, &["PROJ-1"]);
    fx.watch(2, &["PROJ-2", "OPS-9"]);
    fx.host.merge(2);

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .expect("check should succeed");

    assert_eq!(outcome.merged.len(), 1);
    let pr = &outcome.merged[0];
    assert_eq!(pr.number, 2);
    assert_eq!(pr.owner, "acme");
    assert_eq!(pr.merged_by, "octocat");
    assert_eq!(pr.merged_at, "2026-03-10T09:30:00Z");
    // Tickets come from the registry entry, not from the remote title.
    assert_eq!(pr.jira_tickets, vec!["PROJ-2".to_string(), "OPS-9".to_string()]);
}

#[tokio::test]
async fn processed_prs_are_not_queried() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch(5, &["PROJ-5"]);
    fx.host.merge(5);
    fx.ledger.append_processed(processed("api", 5)).unwrap();

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .unwrap();

    assert!(outcome.merged.is_empty());
    assert_eq!(outcome.already_processed.len(), 1);
    assert!(fx.host.calls().is_empty(), "ledger gate must prevent remote lookups");
}

#[tokio::test]
async fn same_number_in_another_repo_is_still_checked() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch_in("api", 7, &["PROJ-7"]);
    fx.watch_in("web", 7, &["WEB-7"]);
    fx.host.merge_in("web", 7);
    fx.ledger.append_processed(processed("api", 7)).unwrap();

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .unwrap();

    assert_eq!(outcome.already_processed.len(), 1);
    assert_eq!(outcome.already_processed[0].repo, "api");
    assert_eq!(fx.host.repo_calls(), vec!["web#7".to_string()]);
    assert_eq!(outcome.merged.len(), 1);
    assert_eq!(outcome.merged[0].jira_tickets, vec!["WEB-7".to_string()]);
}

#[tokio::test]
async fn unqualified_legacy_record_is_neither_queried_nor_swept() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch_in("web", 7, &["WEB-7"]);
    let mut legacy = processed("api", 7);
    legacy.owner.clear();
    legacy.repo.clear();
    legacy.pr_url.clear();
    fx.ledger.append_processed(legacy).unwrap();

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .unwrap();

    assert!(outcome.already_processed.is_empty());
    assert!(outcome.merged.is_empty());
    assert!(fx.host.calls().is_empty());
}

#[tokio::test]
async fn lookup_failure_does_not_abort_the_walk() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch(1, &["PROJ-1"]);
    fx.watch(2, &["PROJ-2"]);
    fx.host.fail(1);
    fx.host.merge(2);

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .unwrap();

    assert_eq!(outcome.lookup_failures, 1);
    assert_eq!(outcome.merged.len(), 1);
    assert_eq!(outcome.merged[0].number, 2);
    assert_eq!(fx.host.calls(), vec![1, 2]);
}

#[tokio::test]
async fn merged_pr_without_tickets_is_skipped() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch(3, &[]);
    fx.host.merge(3);

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .unwrap();

    assert!(outcome.merged.is_empty());
    assert_eq!(fx.registry.count().unwrap(), 1);
}

#[tokio::test]
async fn empty_merge_timestamp_means_unmerged() {
    let fx = Fixture::new(FakeTracker::default());
    fx.watch(4, &["PROJ-4"]);
    fx.host.merge_at(4, "");

    let outcome = Checker::new(fx.host.clone())
        .find_merged(&fx.registry, &fx.ledger)
        .await
        .unwrap();

    assert!(outcome.merged.is_empty());
}
