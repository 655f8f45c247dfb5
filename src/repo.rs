// src/repo.rs

use crate::error::{ExtractError, SetupError};
use crate::model::Commit;
use chrono::{DateTime, TimeZone, Utc};
use git2::build::RepoBuilder;
use git2::{Cred, DiffFindOptions, FetchOptions, Oid, RemoteCallbacks, Repository, Sort};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const SETUP_ATTEMPTS: u32 = 5;
const SETUP_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Supplies where the repository lives and how to reach it.
pub trait RepoSetup {
    fn repository_uri(&self) -> &str;
    fn token(&self) -> &str;
    /// Local directory holding the mirror
    fn repository_path(&self) -> &Path;
    fn branch(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct RepoSettings {
    pub uri: String,
    pub token: String,
    pub path: PathBuf,
    pub branch: String,
}

impl RepoSetup for RepoSettings {
    fn repository_uri(&self) -> &str {
        &self.uri
    }

    fn token(&self) -> &str {
        &self.token
    }

    fn repository_path(&self) -> &Path {
        &self.path
    }

    fn branch(&self) -> &str {
        &self.branch
    }
}

/// Local bare mirror of the remote, tracking a single branch.
pub struct Mirror {
    repo: Repository,
    token: String,
    branch: String,
}

impl Mirror {
    /// Opens or clones the mirror and checks that the branch exists remotely.
    /// Unclassified git failures are retried a few times before giving up.
    pub fn setup(setup: &dyn RepoSetup) -> Result<Self, SetupError> {
        let mut attempt = 1;
        loop {
            match Self::try_setup(setup) {
                Ok(mirror) => return Ok(mirror),
                Err(e) if e.is_retryable() && attempt < SETUP_ATTEMPTS => {
                    tracing::warn!(
                        "Repository setup failed (attempt {}/{}): {}. Retrying...",
                        attempt,
                        SETUP_ATTEMPTS,
                        e
                    );
                    thread::sleep(SETUP_RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_setup(setup: &dyn RepoSetup) -> Result<Self, SetupError> {
        let uri = setup.repository_uri();
        let path = setup.repository_path();

        let repo = if is_empty_or_missing(path) {
            clone(uri, setup.token(), path)?
        } else {
            open_mirror(uri, path)?
        };

        let mirror = Mirror {
            repo,
            token: setup.token().to_string(),
            branch: setup.branch().to_string(),
        };
        mirror
            .refresh()
            .map_err(|e| SetupError::classify(uri, e))?;
        if mirror.repo.find_reference(&mirror.remote_ref()).is_err() {
            return Err(SetupError::InvalidBranch(mirror.branch));
        }

        tracing::info!("Tracking branch '{}' of {}", mirror.branch, uri);
        Ok(mirror)
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn remote_ref(&self) -> String {
        format!("refs/remotes/origin/{}", self.branch)
    }

    fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Fetches the tracked branch and moves the local branch onto it.
    pub fn refresh(&self) -> Result<(), git2::Error> {
        let mut remote = self.repo.find_remote("origin")?;
        let mut options = FetchOptions::new();
        options.remote_callbacks(credentials(&self.token));

        let refspec = format!("+{}:{}", self.local_ref(), self.remote_ref());
        remote.fetch(&[refspec.as_str()], Some(&mut options), None)?;

        if let Ok(oid) = self.repo.refname_to_id(&self.remote_ref()) {
            self.repo
                .reference(&self.local_ref(), oid, true, "git-curtain: refresh")?;
        }
        Ok(())
    }

    /// Current tip of the tracked branch.
    pub fn tip(&self) -> Result<Oid, ExtractError> {
        self.repo
            .refname_to_id(&self.local_ref())
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => ExtractError::MissingBranch(self.branch.clone()),
                _ => ExtractError::Git(e),
            })
    }

    /// Every commit reachable from `tip` but not from `resume`, newest first.
    ///
    /// A resume point the mirror does not know (rewritten history) is
    /// ignored and the whole history is walked.
    pub fn commits_since(&self, tip: Oid, resume: Option<&str>) -> Result<Vec<Commit>, git2::Error> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(tip)?;

        if let Some(hash) = resume {
            if let Err(e) = Oid::from_str(hash).and_then(|oid| revwalk.hide(oid)) {
                tracing::warn!(
                    "Resume point {} is unknown to the mirror ({}), walking full history",
                    hash,
                    e
                );
            }
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(self.to_commit(&commit)?);
        }
        Ok(commits)
    }

    fn to_commit(&self, commit: &git2::Commit) -> Result<Commit, git2::Error> {
        let author = commit.author();
        let committer = commit.committer();

        Ok(Commit {
            hash: commit.id().to_string(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            author: author.name().unwrap_or("Unknown").to_string(),
            committer: committer.name().unwrap_or("Unknown").to_string(),
            committed_at: to_utc(committer.when()),
            authored_at: to_utc(author.when()),
            modified_files: self.changed_files(commit)?,
        })
    }

    /// Paths that differ between the commit's tree and its first parent's.
    /// A root commit is compared with the empty tree.
    fn changed_files(&self, commit: &git2::Commit) -> Result<Vec<String>, git2::Error> {
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

        Ok(diff
            .deltas()
            .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
            .map(|path| path.to_string_lossy().into_owned())
            .collect())
    }
}

fn is_empty_or_missing(path: &Path) -> bool {
    match path.read_dir() {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => !path.exists(),
    }
}

/// Only a bare mirror of the same URI is reused; anything else at the path
/// is left untouched.
fn open_mirror(uri: &str, path: &Path) -> Result<Repository, SetupError> {
    let not_a_mirror = || SetupError::NotAMirror(path.to_path_buf());

    let repo = Repository::open_bare(path).map_err(|_| not_a_mirror())?;
    let same_origin = repo
        .find_remote("origin")
        .ok()
        .and_then(|remote| remote.url().map(|url| url == uri))
        .unwrap_or(false);
    if !repo.is_bare() || !same_origin {
        return Err(not_a_mirror());
    }

    tracing::info!("Reusing mirror at {}", path.display());
    Ok(repo)
}

fn clone(uri: &str, token: &str, path: &Path) -> Result<Repository, SetupError> {
    tracing::info!("Cloning {} into {}", uri, path.display());

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} objects")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Cloning");

    let mut callbacks = credentials(token);
    callbacks.transfer_progress(|stats| {
        bar.set_length(stats.total_objects() as u64);
        bar.set_position(stats.received_objects() as u64);
        true
    });
    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);

    let result = RepoBuilder::new()
        .bare(true)
        .fetch_options(options)
        .clone(uri, path);
    bar.finish_and_clear();
    result.map_err(|e| SetupError::classify(uri, e))
}

/// The token is sent as the user name with an empty password.
fn credentials<'a>(token: &str) -> RemoteCallbacks<'a> {
    let token = token.to_string();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, _allowed| Cred::userpass_plaintext(&token, ""));
    callbacks
}

fn to_utc(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}
