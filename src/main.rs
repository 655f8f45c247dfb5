// src/main.rs

use clap::Parser;
use git_curtain::cli::Args;
use git_curtain::config::Prompt;
use git_curtain::error::ConfigError;
use git_curtain::renderer::PieChart;
use git_curtain::sar::SelfAffirmedRefactoring;
use git_curtain::{
    Extractor, JsonLinesStore, MetricRegistry, MetricRunner, Mirror, PipelineHandle,
    PipelineSupervisor, RepoSettings, VisualizationRunner,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SAR_METRIC_ID: u32 = 1;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "git_curtain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    match start(args) {
        Ok(pipeline) => {
            tracing::info!("Setup finished in {:.2?}", start_time.elapsed());
            pipeline.join();
        }
        Err(e) => {
            eprintln!("Error. {:#}", e);
            std::process::exit(1);
        }
    }
}

fn start(args: Args) -> anyhow::Result<PipelineHandle> {
    let mut prompt = Prompt::new(io::stdin().lock(), io::stdout());

    let store_path = match args.store {
        Some(path) => path,
        None => PathBuf::from(prompt.ask(
            "Path of the commit store (an existing file, or one to be created):",
        )?),
    };

    let settings = RepoSettings {
        uri: or_ask(args.repo_uri, &mut prompt, "Repository URI (its Git clone URL):")?,
        token: or_ask(
            args.token,
            &mut prompt,
            "Personal access token (leave empty for public repositories):",
        )?,
        path: match args.repo_path {
            Some(path) => path,
            None => PathBuf::from(prompt.ask("Directory to mirror the repository into:")?),
        },
        branch: or_ask(args.branch, &mut prompt, "Branch to follow:")?,
    };
    let mirror = Mirror::setup(&settings)?;

    let keywords = match args.keywords {
        Some(path) => path,
        None => PathBuf::from(prompt.ask(
            "Path of the self-affirmed refactoring keyword file (one regex per line):",
        )?),
    };
    let sar = SelfAffirmedRefactoring::from_file(&keywords)?;

    let interval =
        prompt.poll_interval_from(args.poll_interval_ms.as_deref(), args.confirm_low_interval)?;
    tracing::info!("Checking '{}' for updates every {:?}", settings.branch, interval);

    let extractor = Extractor::new(mirror, Box::new(JsonLinesStore::new(store_path)), interval)?;

    let mut registry = MetricRegistry::new();
    registry.register(SAR_METRIC_ID, Box::new(sar));

    let chart = PieChart::new(args.output, args.width, args.height);
    let pipeline = PipelineSupervisor::new().start(
        extractor,
        MetricRunner::new(registry),
        VisualizationRunner::new(chart),
    )?;
    Ok(pipeline)
}

fn or_ask<R: BufRead, W: Write>(
    given: Option<String>,
    prompt: &mut Prompt<R, W>,
    question: &str,
) -> Result<String, ConfigError> {
    match given {
        Some(value) => Ok(value),
        None => prompt.ask(question),
    }
}
