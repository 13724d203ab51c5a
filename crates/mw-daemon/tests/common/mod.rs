//! Shared fakes and fixtures for the daemon integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mw_core::ledger::Ledger;
use mw_core::status_mapping::StatusMappingStore;
use mw_core::types::{StatusMapping, WatchedPr};
use mw_core::watch_registry::WatchRegistry;
use mw_daemon::cycle::WatchCycle;
use mw_integrations::{CodeHost, IntegrationError, IssueInfo, IssueTracker, PullRequestInfo};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

// ---------------------------------------------------------------------------
// Code host
// ---------------------------------------------------------------------------

/// PRs are open unless merged. Unqualified helpers act on `acme/api`.
#[derive(Default)]
pub struct FakeCodeHost {
    merged: Mutex<HashMap<(String, u64), String>>,
    failing: Mutex<HashSet<u64>>,
    calls: Mutex<Vec<(String, u64)>>,
}

impl FakeCodeHost {
    pub fn merge(&self, number: u64) {
        self.merge_in("api", number);
    }

    pub fn merge_in(&self, repo: &str, number: u64) {
        self.merged
            .lock()
            .unwrap()
            .insert((repo.to_string(), number), "2026-03-10T09:30:00Z".to_string());
    }

    pub fn merge_at(&self, number: u64, merged_at: &str) {
        self.merged
            .lock()
            .unwrap()
            .insert(("api".to_string(), number), merged_at.to_string());
    }

    pub fn fail(&self, number: u64) {
        self.failing.lock().unwrap().insert(number);
    }

    pub fn recover(&self, number: u64) {
        self.failing.lock().unwrap().remove(&number);
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    /// Lookups as `repo#number`.
    pub fn repo_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(repo, n)| format!("{repo}#{n}"))
            .collect()
    }
}

#[async_trait]
impl CodeHost for FakeCodeHost {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> mw_integrations::Result<PullRequestInfo> {
        self.calls.lock().unwrap().push((repo.to_string(), number));
        if self.failing.lock().unwrap().contains(&number) {
            return Err(IntegrationError::Transport("connection reset".into()));
        }
        let merged_at = self
            .merged
            .lock()
            .unwrap()
            .get(&(repo.to_string(), number))
            .cloned();
        Ok(PullRequestInfo {
            number,
            title: format!("PROJ-{number} change"),
            url: format!("https://github.com/{owner}/{repo}/pull/{number}"),
            head_branch: format!("feature/PROJ-{number}"),
            base_branch: "main".into(),
            state: if merged_at.is_some() { "closed" } else { "open" }.into(),
            merged_by: if merged_at.is_some() { "octocat".into() } else { String::new() },
            merged_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Issue tracker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeTracker {
    statuses: Mutex<HashMap<String, String>>,
    fail_updates: Mutex<HashSet<String>>,
    updates: Mutex<Vec<(String, String)>>,
}

impl FakeTracker {
    pub fn with_issue(self, key: &str, status: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(key.to_string(), status.to_string());
        self
    }

    pub fn fail_updates_for(&self, key: &str) {
        self.fail_updates.lock().unwrap().insert(key.to_string());
    }

    pub fn status(&self, key: &str) -> Option<String> {
        self.statuses.lock().unwrap().get(key).cloned()
    }

    /// Every `update_status` call, in order.
    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn get_issue(&self, key: &str) -> mw_integrations::Result<IssueInfo> {
        match self.statuses.lock().unwrap().get(key) {
            Some(status) => Ok(IssueInfo {
                key: key.to_string(),
                summary: format!("summary of {key}"),
                status: status.clone(),
            }),
            None => Err(IntegrationError::NotFound(format!("issue {key}"))),
        }
    }

    async fn update_status(&self, key: &str, status: &str) -> mw_integrations::Result<()> {
        self.updates
            .lock()
            .unwrap()
            .push((key.to_string(), status.to_string()));
        if self.fail_updates.lock().unwrap().contains(key) {
            return Err(IntegrationError::TransitionNotFound {
                key: key.to_string(),
                status: status.to_string(),
            });
        }
        self.statuses
            .lock()
            .unwrap()
            .insert(key.to_string(), status.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// File-backed stores in a temp dir plus fake remotes.
pub struct Fixture {
    pub dir: Arc<TempDir>,
    pub registry: Arc<WatchRegistry>,
    pub ledger: Arc<Ledger>,
    pub mappings: Arc<StatusMappingStore>,
    pub host: Arc<FakeCodeHost>,
    pub tracker: Arc<FakeTracker>,
}

impl Fixture {
    pub fn new(tracker: FakeTracker) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            registry: Arc::new(WatchRegistry::open(dir.path().join("watching-prs.json"))),
            ledger: Arc::new(Ledger::open(dir.path().join("watch-state.json"))),
            mappings: Arc::new(StatusMappingStore::open(dir.path().join("jira-status.json"))),
            host: Arc::new(FakeCodeHost::default()),
            tracker: Arc::new(tracker),
            dir: Arc::new(dir),
        }
    }

    /// Reopen the same files with fresh store handles, as a restarted
    /// process would.
    pub fn reopen(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            registry: Arc::new(WatchRegistry::open(self.dir.path().join("watching-prs.json"))),
            ledger: Arc::new(Ledger::open(self.dir.path().join("watch-state.json"))),
            mappings: Arc::new(StatusMappingStore::open(self.dir.path().join("jira-status.json"))),
            host: self.host.clone(),
            tracker: self.tracker.clone(),
        }
    }

    pub fn map(&self, project: &str, merged_status: &str) {
        self.mappings
            .save(StatusMapping {
                project_key: project.into(),
                pr_created_status: "In Review".into(),
                pr_merged_status: merged_status.into(),
            })
            .unwrap();
    }

    pub fn watch(&self, number: u64, tickets: &[&str]) {
        self.registry.add(watched(number, tickets)).unwrap();
    }

    pub fn watch_in(&self, repo: &str, number: u64, tickets: &[&str]) {
        self.registry.add(watched_in(repo, number, tickets)).unwrap();
    }

    pub fn cycle(&self) -> WatchCycle {
        WatchCycle::new(
            self.registry.clone(),
            self.ledger.clone(),
            self.mappings.clone(),
            self.host.clone(),
            self.tracker.clone(),
        )
    }
}

pub fn watched(number: u64, tickets: &[&str]) -> WatchedPr {
    watched_in("api", number, tickets)
}

pub fn watched_in(repo: &str, number: u64, tickets: &[&str]) -> WatchedPr {
    WatchedPr {
        pr_number: number,
        owner: "acme".into(),
        repo: repo.into(),
        branch: format!("feature/{number}"),
        title: format!("change {number}"),
        pr_url: format!("https://github.com/acme/{repo}/pull/{number}"),
        jira_tickets: tickets.iter().map(|t| t.to_string()).collect(),
        created_at: (Utc::now() - Duration::days(1)).to_rfc3339(),
    }
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// In-memory writer for asserting on formatted log lines.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's log events into a capture buffer until the guard drops.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
