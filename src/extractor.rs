// src/extractor.rs

use crate::error::{ExtractError, SetupError};
use crate::handoff::Handoff;
use crate::model::{Commit, CommitSet};
use crate::repo::Mirror;
use crate::store::CommitStore;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What a single poll cycle found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub new_commits: usize,
    pub tip: String,
}

/// Keeps the commit set in step with the remote branch.
pub struct Extractor {
    mirror: Mirror,
    store: Box<dyn CommitStore>,
    commits: CommitSet,
    /// Hash of the last commit known to be processed
    resume: Option<String>,
    interval: Duration,
}

impl Extractor {
    /// Loads the persisted history and resumes from its most recent commit.
    pub fn new(
        mirror: Mirror,
        store: Box<dyn CommitStore>,
        interval: Duration,
    ) -> Result<Self, SetupError> {
        let commits: CommitSet = store.load_all()?.into_iter().collect();
        let resume = commits.latest_by_authoring().map(|c| c.hash.clone());

        match &resume {
            Some(hash) => tracing::info!("Resuming extraction after {} ({} known commits)", hash, commits.len()),
            None => tracing::info!("No stored commits, extracting full history of '{}'", mirror.branch()),
        }

        Ok(Self {
            mirror,
            store,
            commits,
            resume,
            interval,
        })
    }

    pub fn resume_point(&self) -> Option<&str> {
        self.resume.as_deref()
    }

    pub fn commits(&self) -> &CommitSet {
        &self.commits
    }

    /// Read-only view handed to the metric stage.
    pub fn snapshot(&self) -> Arc<CommitSet> {
        Arc::new(self.commits.clone())
    }

    /// Refreshes the mirror and absorbs every commit newer than the resume point.
    pub fn poll_once(&mut self) -> Result<PollOutcome, ExtractError> {
        self.mirror.refresh()?;
        let oid = self.mirror.tip()?;
        let tip = oid.to_string();

        if self.resume.as_deref() == Some(tip.as_str()) {
            tracing::debug!("Branch tip {} unchanged", tip);
            return Ok(PollOutcome { new_commits: 0, tip });
        }

        let mut fresh: Vec<Commit> = self
            .mirror
            .commits_since(oid, self.resume.as_deref())?
            .into_iter()
            .filter(|c| !self.commits.contains(&c.hash))
            .collect();
        // oldest first
        fresh.reverse();

        for commit in &fresh {
            self.commits.insert(Arc::new(commit.clone()));
        }
        if let Err(e) = self.store.append_batch(&fresh) {
            tracing::warn!("Failed to persist {} new commits: {}", fresh.len(), e);
        }
        self.resume = Some(tip.clone());

        tracing::info!(
            "Extracted {} new commits up to {} ({} total)",
            fresh.len(),
            tip,
            self.commits.len()
        );
        Ok(PollOutcome {
            new_commits: fresh.len(),
            tip,
        })
    }

    /// One poll followed by a publish of the full commit set. A failed poll
    /// publishes nothing.
    pub fn cycle(&mut self, outbox: &Handoff<Arc<CommitSet>>) -> Result<PollOutcome, ExtractError> {
        let outcome = self.poll_once()?;
        outbox.publish(self.snapshot());
        Ok(outcome)
    }

    /// Polls forever. Failures are logged and retried on the normal schedule.
    pub fn run(mut self, outbox: Arc<Handoff<Arc<CommitSet>>>) {
        loop {
            if let Err(e) = self.cycle(&outbox) {
                tracing::warn!("Extraction cycle failed: {}. Retrying in {:?}", e, self.interval);
            }
            thread::sleep(self.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::test_commit;
    use crate::repo::fixtures::Origin;
    use crate::repo::RepoSettings;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct RecordingStore {
        stored: Arc<Mutex<Vec<Commit>>>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
        failing: bool,
    }

    impl CommitStore for RecordingStore {
        fn load_all(&self) -> Result<Vec<Commit>, StoreError> {
            Ok(self.stored.lock().clone())
        }

        fn append_batch(&self, commits: &[Commit]) -> Result<(), StoreError> {
            if self.failing {
                return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
            }
            self.stored.lock().extend_from_slice(commits);
            self.batches
                .lock()
                .push(commits.iter().map(|c| c.message.clone()).collect());
            Ok(())
        }

        fn remove(&self, _hashes: &[String]) -> Result<Vec<Commit>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn mirror(origin: &Origin, path: &Path) -> Mirror {
        Mirror::setup(&RepoSettings {
            uri: origin.uri(),
            token: String::new(),
            path: path.to_path_buf(),
            branch: "main".to_string(),
        })
        .unwrap()
    }

    fn extractor(origin: &Origin, path: &Path, store: &RecordingStore) -> Extractor {
        Extractor::new(
            mirror(origin, path),
            Box::new(store.clone()),
            Duration::from_secs(3600),
        )
        .unwrap()
    }

    #[test]
    fn cold_start_then_unchanged_tip() {
        let origin = Origin::new();
        origin.commit("a.txt", "a", "A", 100);
        origin.commit("b.txt", "b", "B", 200);
        let c = origin.commit("c.txt", "c", "C", 300);

        let local = tempdir().unwrap();
        let store = RecordingStore::default();
        let mut extractor = extractor(&origin, &local.path().join("m"), &store);
        assert_eq!(extractor.resume_point(), None);
        let outbox = Handoff::new();

        let first = extractor.cycle(&outbox).unwrap();
        assert_eq!(first.new_commits, 3);
        assert_eq!(extractor.resume_point(), Some(c.to_string().as_str()));
        assert_eq!(*store.batches.lock(), vec![vec!["A", "B", "C"]]);
        assert_eq!(outbox.take().unwrap().len(), 3);

        let second = extractor.cycle(&outbox).unwrap();
        assert_eq!(second.new_commits, 0);
        assert_eq!(extractor.commits().len(), 3);
        assert_eq!(store.batches.lock().len(), 1);
        // republished even though nothing changed
        let republished = outbox.take().unwrap();
        assert_eq!(republished.len(), 3);
        assert!(republished.contains(&c.to_string()));
    }

    #[test]
    fn resumes_from_the_stored_tip() {
        let origin = Origin::new();
        origin.commit("a.txt", "a", "A", 100);
        origin.commit("b.txt", "b", "B", 200);
        origin.commit("c.txt", "c", "C", 300);

        let local = tempdir().unwrap();
        let path = local.path().join("m");
        let store = RecordingStore::default();
        extractor(&origin, &path, &store).poll_once().unwrap();

        origin.commit("d.txt", "d", "D", 400);
        let e = origin.commit("e.txt", "e", "E", 500);

        let mut resumed = extractor(&origin, &path, &store);
        assert_eq!(resumed.commits().len(), 3);
        let outcome = resumed.poll_once().unwrap();
        assert_eq!(outcome.new_commits, 2);
        assert_eq!(outcome.tip, e.to_string());
        assert_eq!(store.batches.lock().last().unwrap(), &vec!["D", "E"]);
        assert_eq!(resumed.commits().len(), 5);
    }

    #[test]
    fn unknown_resume_point_never_duplicates() {
        let origin = Origin::new();
        origin.commit("a.txt", "a", "A", 100);

        let local = tempdir().unwrap();
        let path = local.path().join("m");
        let store = RecordingStore::default();
        extractor(&origin, &path, &store).poll_once().unwrap();
        store
            .stored
            .lock()
            .push(test_commit("ffffffffffffffffffffffffffffffffffffffff", 10_000_000_000));

        origin.commit("b.txt", "b", "B", 200);
        origin.commit("c.txt", "c", "C", 300);

        let mut resumed = extractor(&origin, &path, &store);
        let outcome = resumed.poll_once().unwrap();
        assert_eq!(outcome.new_commits, 2);
        assert_eq!(resumed.commits().len(), 4);
        assert_eq!(store.batches.lock().last().unwrap(), &vec!["B", "C"]);
    }

    #[test]
    fn persistence_failures_are_not_fatal() {
        let origin = Origin::new();
        origin.commit("a.txt", "a", "A", 100);

        let local = tempdir().unwrap();
        let store = RecordingStore {
            failing: true,
            ..Default::default()
        };
        let mut extractor = extractor(&origin, &local.path().join("m"), &store);
        let outbox = Handoff::new();

        assert_eq!(extractor.cycle(&outbox).unwrap().new_commits, 1);
        assert_eq!(outbox.take().unwrap().len(), 1);
        assert!(store.stored.lock().is_empty());
    }

    #[test]
    fn failed_cycle_publishes_nothing() {
        let origin = Origin::new();
        origin.commit("a.txt", "a", "A", 100);

        let local = tempdir().unwrap();
        let store = RecordingStore::default();
        let mut extractor = extractor(&origin, &local.path().join("m"), &store);
        let outbox = Handoff::new();

        // the remote disappears
        drop(origin);

        assert!(extractor.cycle(&outbox).is_err());
        assert!(outbox.take().is_none());
        assert_eq!(extractor.resume_point(), None);
    }

    #[test]
    fn run_keeps_polling_until_the_remote_returns() {
        let origin = Origin::new();
        origin.commit("a.txt", "a", "A", 100);
        origin.commit("b.txt", "b", "B", 200);

        let local = tempdir().unwrap();
        let store = RecordingStore::default();
        let mut extractor = extractor(&origin, &local.path().join("m"), &store);
        extractor.interval = Duration::from_millis(20);

        let away = local.path().join("origin-away");
        fs::rename(origin.dir.path(), &away).unwrap();

        let outbox = Arc::new(Handoff::new());
        let inbox = Arc::clone(&outbox);
        // the loop never returns; the thread ends with the test process
        thread::spawn(move || extractor.run(outbox));
        assert!(!inbox.await_signal_timeout(Duration::from_millis(300)));

        fs::rename(&away, origin.dir.path()).unwrap();
        assert!(inbox.await_signal_timeout(Duration::from_secs(30)));
        assert_eq!(inbox.take().unwrap().len(), 2);
        assert_eq!(*store.batches.lock(), vec![vec!["A", "B"]]);
    }
}
