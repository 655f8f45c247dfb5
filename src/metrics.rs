// src/metrics.rs

use crate::handoff::Handoff;
use crate::model::{CommitSet, MetricResult, ResultSet};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// A pluggable computation over the full commit history.
///
/// Implementations must be pure with respect to the commit set: the same
/// input always yields the same result and commits are never modified.
pub trait Metric: Send {
    fn name(&self) -> &str;

    fn run(&self, commits: &CommitSet) -> anyhow::Result<MetricResult>;
}

/// Ordered list of metrics. First registered, first executed.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: Vec<(u32, Box<dyn Metric>)>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: u32, metric: Box<dyn Metric>) {
        tracing::debug!("Registered metric {} '{}'", id, metric.name());
        self.metrics.push((id, metric));
    }

    pub fn remove(&mut self, id: u32) -> Option<Box<dyn Metric>> {
        let pos = self.metrics.iter().position(|(mid, _)| *mid == id)?;
        Some(self.metrics.remove(pos).1)
    }

    pub fn clear(&mut self) -> Vec<Box<dyn Metric>> {
        self.metrics.drain(..).map(|(_, m)| m).collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Runs every metric in order. The first failure aborts the run.
    pub fn execute(&self, commits: &CommitSet) -> anyhow::Result<ResultSet> {
        let mut results = Vec::with_capacity(self.metrics.len());
        for (id, metric) in &self.metrics {
            let result = metric
                .run(commits)
                .with_context(|| format!("metric {} '{}' failed", id, metric.name()))?;
            results.push(result);
        }
        Ok(ResultSet { results })
    }
}

/// Consumer of commit sets, producer of result sets.
pub struct MetricRunner {
    registry: MetricRegistry,
}

impl MetricRunner {
    pub fn new(registry: MetricRegistry) -> Self {
        Self { registry }
    }

    /// Runs the registry over one snapshot and publishes the results.
    pub fn process(
        &self,
        commits: &CommitSet,
        outbox: &Handoff<Arc<ResultSet>>,
    ) -> anyhow::Result<()> {
        let start = Instant::now();
        let results = self.registry.execute(commits)?;
        tracing::info!(
            "Computed {} metrics over {} commits in {:.2?}",
            results.len(),
            commits.len(),
            start.elapsed()
        );
        outbox.publish(Arc::new(results));
        Ok(())
    }

    /// Processes snapshots one at a time, forever.
    pub fn run(
        self,
        inbox: Arc<Handoff<Arc<CommitSet>>>,
        outbox: Arc<Handoff<Arc<ResultSet>>>,
    ) {
        loop {
            let commits = inbox.recv();
            if let Err(e) = self.process(&commits, &outbox) {
                tracing::warn!("Metric run aborted: {:#}", e);
            }
        }
    }
}
