// src/model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A single commit as extracted from the mirror. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub committer: String,
    pub committed_at: DateTime<Utc>,
    pub authored_at: DateTime<Utc>,
    /// Paths that differ from the first parent's tree
    pub modified_files: Vec<String>,
}

/// The full known history, keyed by hash. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct CommitSet {
    commits: Vec<Arc<Commit>>,
    index: HashMap<String, usize>,
}

impl CommitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a commit unless one with the same hash is already present.
    pub fn insert(&mut self, commit: Arc<Commit>) -> bool {
        if self.index.contains_key(&commit.hash) {
            return false;
        }
        self.index.insert(commit.hash.clone(), self.commits.len());
        self.commits.push(commit);
        true
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.index.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&Arc<Commit>> {
        self.index.get(hash).map(|&i| &self.commits[i])
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Commit>> {
        self.commits.iter()
    }

    /// Most recent commit by authoring date; ties go to the later insertion.
    pub fn latest_by_authoring(&self) -> Option<&Arc<Commit>> {
        self.commits.iter().max_by_key(|c| c.authored_at)
    }
}

impl FromIterator<Commit> for CommitSet {
    fn from_iter<I: IntoIterator<Item = Commit>>(iter: I) -> Self {
        let mut set = CommitSet::new();
        for commit in iter {
            set.insert(Arc::new(commit));
        }
        set
    }
}

/// Output of one metric over one commit set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Name of the metric that produced this result
    pub metric: String,
    pub values: BTreeMap<String, serde_json::Value>,
    /// Hashes of the commits the metric actually classified
    pub commit_hashes: Vec<String>,
}

/// One result per registered metric, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub results: Vec<MetricResult>,
}

impl ResultSet {
    pub fn first(&self) -> Option<&MetricResult> {
        self.results.first()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_commit(hash: &str, authored_secs: i64) -> Commit {
    use chrono::TimeZone;

    let at = Utc.timestamp_opt(authored_secs, 0).unwrap();
    Commit {
        hash: hash.to_string(),
        message: format!("commit {hash}"),
        author: "Ada".to_string(),
        committer: "Ada".to_string(),
        committed_at: at,
        authored_at: at,
        modified_files: vec![format!("{hash}.txt")],
    }
}
