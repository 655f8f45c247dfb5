// src/pipeline.rs

use crate::extractor::Extractor;
use crate::handoff::Handoff;
use crate::metrics::MetricRunner;
use crate::model::{CommitSet, ResultSet};
use crate::visualization::{Visualization, VisualizationRunner};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the two handoffs and starts the stages once setup has succeeded.
pub struct PipelineSupervisor {
    commits: Arc<Handoff<Arc<CommitSet>>>,
    results: Arc<Handoff<Arc<ResultSet>>>,
}

/// Threads of a running pipeline.
pub struct PipelineHandle {
    threads: Vec<JoinHandle<()>>,
}

impl PipelineSupervisor {
    pub fn new() -> Self {
        Self {
            commits: Arc::new(Handoff::new()),
            results: Arc::new(Handoff::new()),
        }
    }

    /// Spawns extraction, metrics and visualization, in that order.
    pub fn start<V>(
        self,
        extractor: Extractor,
        metrics: MetricRunner,
        visualization: VisualizationRunner<V>,
    ) -> io::Result<PipelineHandle>
    where
        V: Visualization + 'static,
    {
        let mut threads = Vec::with_capacity(3);

        let outbox = Arc::clone(&self.commits);
        threads.push(spawn("extraction", move || extractor.run(outbox))?);

        let (inbox, outbox) = (Arc::clone(&self.commits), Arc::clone(&self.results));
        threads.push(spawn("metrics", move || metrics.run(inbox, outbox))?);

        let inbox = Arc::clone(&self.results);
        threads.push(spawn("visualization", move || visualization.run(inbox))?);

        tracing::info!("Pipeline started");
        Ok(PipelineHandle { threads })
    }
}

impl Default for PipelineSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineHandle {
    /// Blocks for as long as the stages run, which is until the process ends.
    /// A stage that panics logs it on its own thread and stops.
    pub fn join(self) {
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}

fn spawn<F>(name: &str, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let stage = name.to_string();
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            run_stage(&stage, f);
        })
}

/// Returns false if the stage panicked.
fn run_stage<F: FnOnce()>(name: &str, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown cause".to_string());
            tracing::error!("Pipeline stage '{}' panicked: {}", name, message);
            false
        }
    }
}
