// src/store.rs

use crate::error::StoreError;
use crate::model::Commit;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Durable, append-only record of every extracted commit.
pub trait CommitStore: Send {
    /// Reads every stored commit. An absent store is an empty one.
    fn load_all(&self) -> Result<Vec<Commit>, StoreError>;

    fn append_batch(&self, commits: &[Commit]) -> Result<(), StoreError>;

    /// Administrative removal; the pipeline itself never calls this.
    fn remove(&self, hashes: &[String]) -> Result<Vec<Commit>, StoreError>;
}

/// Stores one JSON-encoded commit per line.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    path: PathBuf,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(&self) -> Result<Option<BufReader<File>>, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_lines<'a>(
        writer: &mut impl Write,
        commits: impl IntoIterator<Item = &'a Commit>,
    ) -> Result<(), StoreError> {
        for commit in commits {
            serde_json::to_writer(&mut *writer, commit).map_err(StoreError::Serialize)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl CommitStore for JsonLinesStore {
    fn load_all(&self) -> Result<Vec<Commit>, StoreError> {
        let Some(reader) = self.open_reader()? else {
            tracing::debug!("No commit store at {:?}, starting cold", self.path);
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut commits = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let commit: Commit = serde_json::from_str(&line)
                .map_err(|source| StoreError::Corrupt { line: i + 1, source })?;
            if seen.insert(commit.hash.clone()) {
                commits.push(commit);
            }
        }

        tracing::info!("Loaded {} commits from {:?}", commits.len(), self.path);
        Ok(commits)
    }

    fn append_batch(&self, commits: &[Commit]) -> Result<(), StoreError> {
        if commits.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        Self::write_lines(&mut writer, commits)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;

        tracing::debug!("Appended {} commits to {:?}", commits.len(), self.path);
        Ok(())
    }

    fn remove(&self, hashes: &[String]) -> Result<Vec<Commit>, StoreError> {
        let doomed: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        let (removed, kept): (Vec<Commit>, Vec<Commit>) = self
            .load_all()?
            .into_iter()
            .partition(|c| doomed.contains(c.hash.as_str()));
        if removed.is_empty() {
            return Ok(removed);
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            Self::write_lines(&mut writer, &kept)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::info!("Removed {} commits from {:?}", removed.len(), self.path);
        Ok(removed)
    }
}
