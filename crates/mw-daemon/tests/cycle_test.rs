mod common;

use common::{watched, FakeTracker, Fixture};
use mw_core::types::{zero_time, ProcessedRecord, TicketUpdateOutcome};
use mw_daemon::processor::RunMode;

#[tokio::test]
async fn live_cycle_updates_records_and_unwatches() {
    let fx = Fixture::new(FakeTracker::default().with_issue("PROJ-7", "In Review"));
    fx.map("PROJ", "Done");
    fx.watch(7, &["PROJ-7"]);
    fx.watch(8, &["PROJ-8"]);
    fx.host.merge(7);

    let report = fx.cycle().run(RunMode::Live).await.unwrap();

    assert_eq!(report.watched, 2);
    assert_eq!(report.merged.len(), 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.ticket_failures(), 0);
    assert_eq!(fx.tracker.updates(), vec![("PROJ-7".to_string(), "Done".to_string())]);

    assert!(fx.ledger.is_processed(&watched(7, &[])).unwrap());
    assert!(!fx.registry.exists("acme", "api", 7).unwrap());
    assert!(fx.registry.exists("acme", "api", 8).unwrap());
    assert!(fx.ledger.metadata().unwrap().last_check_time.is_some());
}

#[tokio::test]
async fn restart_between_ledger_append_and_unwatch_does_not_update_twice() {
    let fx = Fixture::new(FakeTracker::default().with_issue("PROJ-9", "In Review"));
    fx.map("PROJ", "Done");
    fx.watch(9, &["PROJ-9"]);
    fx.host.merge(9);

    // Simulate a crash after the ledger write: record present, entry still
    // watched.
    fx.ledger
        .append_processed(ProcessedRecord {
            pr_number: 9,
            owner: "acme".into(),
            repo: "api".into(),
            pr_title: "change 9".into(),
            pr_url: "https://github.com/acme/api/pull/9".into(),
            branch: "feature/9".into(),
            jira_tickets: vec!["PROJ-9".into()],
            merged_at: zero_time(),
            merged_by: "octocat".into(),
            processed_at: zero_time(),
            jira_updates: vec![TicketUpdateOutcome::succeeded("PROJ-9", "In Review", "Done")],
        })
        .unwrap();

    let restarted = fx.reopen();
    let report = restarted.cycle().run(RunMode::Live).await.unwrap();

    assert!(report.merged.is_empty());
    assert_eq!(report.swept, 1);
    assert!(fx.tracker.updates().is_empty());
    assert!(fx.host.calls().is_empty());
    assert_eq!(restarted.registry.count().unwrap(), 0);
    assert_eq!(restarted.ledger.records().unwrap().len(), 1);
}

#[tokio::test]
async fn processing_one_repo_leaves_same_number_in_another_repo_watched() {
    let fx = Fixture::new(
        FakeTracker::default()
            .with_issue("PROJ-7", "In Review")
            .with_issue("WEB-7", "In Review"),
    );
    fx.map("PROJ", "Done");
    fx.map("WEB", "Done");
    fx.watch_in("api", 7, &["PROJ-7"]);
    fx.watch_in("web", 7, &["WEB-7"]);
    fx.host.merge_in("api", 7);

    fx.cycle().run(RunMode::Live).await.unwrap();
    let report = fx.cycle().run(RunMode::Live).await.unwrap();

    assert_eq!(report.swept, 0);
    assert!(fx.registry.exists("acme", "web", 7).unwrap());
    assert_eq!(fx.tracker.status("WEB-7").as_deref(), Some("In Review"));

    fx.host.merge_in("web", 7);
    let report = fx.cycle().run(RunMode::Live).await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].repo, "web");
    assert_eq!(fx.tracker.status("WEB-7").as_deref(), Some("Done"));
    assert!(!fx.registry.exists("acme", "web", 7).unwrap());
    let repos: Vec<String> = fx.ledger.records().unwrap().into_iter().map(|r| r.repo).collect();
    assert_eq!(repos, vec!["api".to_string(), "web".to_string()]);
}

#[tokio::test]
async fn unreadable_watch_list_still_records_check_time() {
    let fx = Fixture::new(FakeTracker::default());
    std::fs::write(fx.dir.path().join("watching-prs.json"), "{not json").unwrap();

    assert!(fx.cycle().run(RunMode::DryRun).await.is_err());
    assert!(fx.ledger.metadata().unwrap().last_check_time.is_none());

    assert!(fx.cycle().run(RunMode::Live).await.is_err());
    assert!(fx.ledger.metadata().unwrap().last_check_time.is_some());
}

#[tokio::test]
async fn dry_run_changes_nothing() {
    let fx = Fixture::new(FakeTracker::default().with_issue("PROJ-3", "In Review"));
    fx.map("PROJ", "Done");
    fx.watch(3, &["PROJ-3"]);
    fx.host.merge(3);

    let report = fx.cycle().run(RunMode::DryRun).await.unwrap();

    assert_eq!(report.mode, RunMode::DryRun);
    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].jira_updates[0].success);
    assert!(fx.tracker.updates().is_empty());
    assert_eq!(fx.tracker.status("PROJ-3").as_deref(), Some("In Review"));
    assert!(!fx.ledger.is_processed(&watched(3, &[])).unwrap());
    assert!(fx.registry.exists("acme", "api", 3).unwrap());
    assert!(fx.ledger.metadata().unwrap().last_check_time.is_none());
}

#[tokio::test]
async fn failed_lookups_stay_watched_for_next_cycle() {
    let fx = Fixture::new(FakeTracker::default().with_issue("PROJ-4", "Open"));
    fx.map("PROJ", "Done");
    fx.watch(4, &["PROJ-4"]);
    fx.host.fail(4);

    let report = fx.cycle().run(RunMode::Live).await.unwrap();
    assert_eq!(report.lookup_failures, 1);
    assert!(fx.registry.exists("acme", "api", 4).unwrap());

    fx.host.recover(4);
    fx.host.merge(4);
    let report = fx.cycle().run(RunMode::Live).await.unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(fx.tracker.status("PROJ-4").as_deref(), Some("Done"));
    assert!(!fx.registry.exists("acme", "api", 4).unwrap());
}
