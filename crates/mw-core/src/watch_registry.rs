//! Durable set of pull requests awaiting merge.

use std::path::Path;

use chrono::{Duration, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::store::{DocumentStore, JsonFileStore, StoreError};
use crate::types::{WatchList, WatchedPr};

/// Registry of watched PRs backed by `watching-prs.json`.
///
/// Every call re-reads the document, so a failed write never leaves a stale
/// in-memory copy behind for the next operation.
pub struct WatchRegistry {
    store: Box<dyn DocumentStore<WatchList>>,
}

impl WatchRegistry {
    /// Open (without creating) the registry file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_store(JsonFileStore::new(path.as_ref()))
    }

    pub fn with_store(store: impl DocumentStore<WatchList> + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Insert `pr`, replacing any entry with the same identity.
    ///
    /// A replaced entry keeps its original `created_at` unless `pr` carries
    /// one; a new entry without a timestamp is stamped with now.
    pub fn add(&self, mut pr: WatchedPr) -> Result<(), StoreError> {
        let mut list = self.store.load()?;

        match list
            .prs
            .iter_mut()
            .find(|p| p.is(&pr.owner, &pr.repo, pr.pr_number))
        {
            Some(existing) => {
                if pr.created_at.is_empty() {
                    pr.created_at = existing.created_at.clone();
                }
                debug!(pr = pr.pr_number, owner = %pr.owner, repo = %pr.repo, "updating watched PR");
                *existing = pr;
            }
            None => {
                if pr.created_at.is_empty() {
                    pr.created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
                }
                info!(pr = pr.pr_number, owner = %pr.owner, repo = %pr.repo, "watching PR");
                list.prs.push(pr);
            }
        }

        self.store.save(&list)
    }

    /// Remove the entry with this identity. Absent entries are a no-op.
    pub fn remove(&self, owner: &str, repo: &str, number: u64) -> Result<(), StoreError> {
        let mut list = self.store.load()?;
        let before = list.prs.len();
        list.prs.retain(|p| !p.is(owner, repo, number));
        if list.prs.len() == before {
            return Ok(());
        }
        self.store.save(&list)
    }

    pub fn list(&self) -> Result<Vec<WatchedPr>, StoreError> {
        Ok(self.store.load()?.prs)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.store.load()?.prs.len())
    }

    pub fn exists(&self, owner: &str, repo: &str, number: u64) -> Result<bool, StoreError> {
        Ok(self
            .store
            .load()?
            .prs
            .iter()
            .any(|p| p.is(owner, repo, number)))
    }

    /// First entry with this PR number, regardless of repository.
    pub fn find_by_number(&self, number: u64) -> Result<Option<WatchedPr>, StoreError> {
        Ok(self
            .store
            .load()?
            .prs
            .into_iter()
            .find(|p| p.pr_number == number))
    }

    /// Drop entries created more than `retention_days` ago.
    ///
    /// Entries whose timestamp does not parse are kept. A zero retention is a
    /// no-op. Returns the number of entries removed.
    pub fn clean(&self, retention_days: u32) -> Result<usize, StoreError> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));

        let mut list = self.store.load()?;
        let before = list.prs.len();
        list.prs.retain(|p| match p.created_at_parsed() {
            Some(created) => created > cutoff,
            None => true,
        });
        let removed = before - list.prs.len();
        if removed > 0 {
            self.store.save(&list)?;
            info!(removed, retention_days, "dropped expired watched PRs");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn watched(number: u64, created_at: &str) -> WatchedPr {
        WatchedPr {
            pr_number: number,
            owner: "acme".into(),
            repo: "api".into(),
            branch: format!("feature/PROJ-{number}"),
            title: format!("PROJ-{number} change"),
            pr_url: format!("https://github.com/acme/api/pull/{number}"),
            jira_tickets: vec![format!("PROJ-{number}")],
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn add_then_list_defaults_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatchRegistry::open(dir.path().join("watching-prs.json"));

        registry.add(watched(1, "")).unwrap();

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
        let entry = &listed[0];
        assert!(entry.created_at_parsed().is_some());
        let mut expected = watched(1, "");
        expected.created_at = entry.created_at.clone();
        assert_eq!(entry, &expected);
    }

    #[test]
    fn add_existing_identity_overwrites_but_keeps_created_at() {
        let registry = WatchRegistry::with_store(MemoryStore::<WatchList>::default());
        registry.add(watched(1, "2026-01-01T00:00:00Z")).unwrap();

        let mut updated = watched(1, "");
        updated.title = "renamed".into();
        registry.add(updated).unwrap();

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "renamed");
        assert_eq!(listed[0].created_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn caller_supplied_created_at_wins_on_overwrite() {
        let registry = WatchRegistry::with_store(MemoryStore::<WatchList>::default());
        registry.add(watched(1, "2026-01-01T00:00:00Z")).unwrap();
        registry.add(watched(1, "2026-02-01T00:00:00Z")).unwrap();
        assert_eq!(registry.list().unwrap()[0].created_at, "2026-02-01T00:00:00Z");
    }

    #[test]
    fn same_number_in_other_repo_is_a_separate_entry() {
        let registry = WatchRegistry::with_store(MemoryStore::<WatchList>::default());
        registry.add(watched(1, "")).unwrap();
        let mut other = watched(1, "");
        other.repo = "web".into();
        registry.add(other).unwrap();
        assert_eq!(registry.count().unwrap(), 2);
    }

    #[test]
    fn remove_excludes_entry_and_is_noop_when_absent() {
        let registry = WatchRegistry::with_store(MemoryStore::<WatchList>::default());
        registry.add(watched(1, "")).unwrap();
        registry.add(watched(2, "")).unwrap();

        registry.remove("acme", "api", 1).unwrap();
        registry.remove("acme", "api", 99).unwrap();

        let numbers: Vec<u64> = registry.list().unwrap().iter().map(|p| p.pr_number).collect();
        assert_eq!(numbers, vec![2]);
        assert!(!registry.exists("acme", "api", 1).unwrap());
    }

    #[test]
    fn clean_drops_old_entries_and_keeps_unparsable() {
        let registry = WatchRegistry::with_store(MemoryStore::<WatchList>::default());
        let old = (Utc::now() - Duration::days(40)).to_rfc3339();
        let recent = (Utc::now() - Duration::days(5)).to_rfc3339();
        registry.add(watched(1, &old)).unwrap();
        registry.add(watched(2, &recent)).unwrap();
        registry.add(watched(3, "last tuesday")).unwrap();

        let removed = registry.clean(30).unwrap();

        assert_eq!(removed, 1);
        let numbers: Vec<u64> = registry.list().unwrap().iter().map(|p| p.pr_number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn failed_persist_is_reported_and_not_applied() {
        let store = Arc::new(MemoryStore::<WatchList>::default());
        let registry = WatchRegistry::with_store(store.clone());
        registry.add(watched(1, "")).unwrap();

        store.set_fail_saves(true);
        assert!(registry.add(watched(2, "")).is_err());
        store.set_fail_saves(false);

        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn find_by_number_ignores_repository() {
        let registry = WatchRegistry::with_store(MemoryStore::<WatchList>::default());
        registry.add(watched(5, "")).unwrap();
        assert_eq!(registry.find_by_number(5).unwrap().unwrap().repo, "api");
        assert!(registry.find_by_number(6).unwrap().is_none());
    }
}
