// src/sar.rs

//! Self-affirmed refactoring detection: a commit whose message matches any
//! keyword pattern is one whose author says they refactored.

use crate::error::SetupError;
use crate::metrics::Metric;
use crate::model::{CommitSet, MetricResult};
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const SAR: &str = "SAR";
pub const NON_SAR: &str = "Non SAR";

pub struct SelfAffirmedRefactoring {
    keywords: Vec<Regex>,
}

impl SelfAffirmedRefactoring {
    /// Builds case-insensitive patterns, one per non-blank line, taken as written.
    pub fn from_patterns<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, SetupError> {
        let keywords = lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| SetupError::InvalidKeyword {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keywords })
    }

    pub fn from_file(path: &Path) -> Result<Self, SetupError> {
        let content = fs::read_to_string(path).map_err(|source| SetupError::Keywords {
            path: path.to_path_buf(),
            source,
        })?;
        let metric = Self::from_patterns(content.lines())?;
        tracing::info!("Loaded {} refactoring keywords from {}", metric.keywords.len(), path.display());
        Ok(metric)
    }

    fn is_refactoring(&self, message: &str) -> bool {
        self.keywords.iter().any(|k| k.is_match(message))
    }
}

impl Metric for SelfAffirmedRefactoring {
    fn name(&self) -> &str {
        "self-affirmed-refactoring"
    }

    fn run(&self, commits: &CommitSet) -> anyhow::Result<MetricResult> {
        let commits: Vec<_> = commits.iter().collect();
        let flags: Vec<bool> = commits
            .par_iter()
            .map(|c| self.is_refactoring(&c.message))
            .collect();

        let mut sar = Vec::new();
        let mut non_sar = Vec::new();
        for (commit, is_sar) in commits.iter().zip(flags) {
            if is_sar {
                sar.push(commit.hash.clone());
            } else {
                non_sar.push(commit.hash.clone());
            }
        }
        tracing::debug!("{} of {} commits are self-affirmed refactorings", sar.len(), commits.len());

        let commit_hashes = sar.iter().chain(&non_sar).cloned().collect();
        let values = BTreeMap::from([
            (SAR.to_string(), sar.into()),
            (NON_SAR.to_string(), non_sar.into()),
        ]);
        Ok(MetricResult {
            metric: self.name().to_string(),
            values,
            commit_hashes,
        })
    }
}
