//! Tessera CLI - training jobs and link prediction from the command line.
//!
//! Every command works on a workspace directory (see `FsBackend` for the
//! layout). Graphs are placed under `graphs/{scope}.json` by the host.
//!
//! # Usage
//!
//! ```bash
//! # Queue a training job for a scope
//! tessera -w ./ws enqueue physics --total-epochs 100 --epochs 25
//!
//! # One invocation: advance one job by one slice (run on a schedule)
//! tessera -w ./ws step
//!
//! # Inspect jobs
//! tessera -w ./ws jobs
//!
//! # Query the persisted vectors of a finished scope
//! tessera -w ./ws predict tail physics --head marie --relation discovered
//! tessera -w ./ws score physics marie discovered radium
//! tessera -w ./ws similar entities physics marie -k 5
//!
//! # Rank-based evaluation on head,relation,tail lines
//! tessera -w ./ws evaluate physics test.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tessera_core::Triplet;
use tessera_jobs::{
    EmbeddingSource, FsBackend, JobQueue, Orchestrator, OrchestratorConfig, TrainingJob,
};
use tessera_kge::{Prediction, Predictor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Knowledge graph embedding jobs and link prediction", long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Orchestrator config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the staleness threshold, in seconds
    #[arg(long, global = true)]
    stale_after: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a training job for a scope
    Enqueue {
        /// Scope (graph / topic) to train on
        scope: String,

        /// Total epoch budget
        #[arg(long)]
        total_epochs: Option<usize>,

        /// Epochs per invocation slice
        #[arg(long)]
        epochs: Option<usize>,

        /// Embedding dimension
        #[arg(long)]
        dimensions: Option<usize>,

        /// Learning rate
        #[arg(long)]
        learning_rate: Option<f32>,

        /// Margin of the ranking loss
        #[arg(long)]
        margin: Option<f32>,

        /// Batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Advance one job by one slice and print the outcome as JSON
    Step,

    /// List training jobs
    Jobs,

    /// Predict missing parts of a triplet
    Predict {
        #[command(subcommand)]
        target: PredictTarget,
    },

    /// Plausibility of one triplet, in (0, 1]
    Score {
        scope: String,
        head: String,
        relation: String,
        tail: String,
    },

    /// Nearest neighbours by cosine similarity
    Similar {
        #[command(subcommand)]
        target: SimilarTarget,
    },

    /// Rank-based metrics over a CSV of head,relation,tail lines
    Evaluate {
        scope: String,

        /// Test triplets file
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum PredictTarget {
    /// (head, relation, ?)
    Tail {
        scope: String,
        #[arg(long)]
        head: String,
        #[arg(long)]
        relation: String,
        #[arg(short, default_value = "10")]
        k: usize,
    },
    /// (?, relation, tail)
    Head {
        scope: String,
        #[arg(long)]
        relation: String,
        #[arg(long)]
        tail: String,
        #[arg(short, default_value = "10")]
        k: usize,
    },
    /// (head, ?, tail)
    Relation {
        scope: String,
        #[arg(long)]
        head: String,
        #[arg(long)]
        tail: String,
        #[arg(short, default_value = "10")]
        k: usize,
    },
}

#[derive(Subcommand)]
enum SimilarTarget {
    /// Entities closest to an entity
    Entities {
        scope: String,
        id: String,
        #[arg(short, default_value = "10")]
        k: usize,
    },
    /// Relation types closest to a relation type
    Relations {
        scope: String,
        relation: String,
        #[arg(short, default_value = "10")]
        k: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.stale_after)?;
    let backend = FsBackend::open(&cli.workspace)
        .with_context(|| format!("Failed to open workspace {}", cli.workspace.display()))?;

    match cli.command {
        Commands::Enqueue {
            scope,
            total_epochs,
            epochs,
            dimensions,
            learning_rate,
            margin,
            batch_size,
            seed,
        } => {
            let mut training = config.default_training.clone();
            if let Some(v) = epochs {
                training = training.with_epochs(v);
            }
            if let Some(v) = dimensions {
                training = training.with_dimensions(v);
            }
            if let Some(v) = learning_rate {
                training = training.with_learning_rate(v);
            }
            if let Some(v) = margin {
                training = training.with_margin(v);
            }
            if let Some(v) = batch_size {
                training = training.with_batch_size(v);
            }
            if let Some(v) = seed {
                training = training.with_seed(v);
            }
            cmd_enqueue(&backend, config, &scope, training, total_epochs)
        }
        Commands::Step => cmd_step(&backend, config),
        Commands::Jobs => cmd_jobs(&backend),
        Commands::Predict { target } => cmd_predict(&backend, target),
        Commands::Score {
            scope,
            head,
            relation,
            tail,
        } => cmd_score(&backend, &scope, &head, &relation, &tail),
        Commands::Similar { target } => cmd_similar(&backend, target),
        Commands::Evaluate { scope, input } => cmd_evaluate(&backend, &scope, &input),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, stale_after: Option<u64>) -> Result<OrchestratorConfig> {
    let mut config = match path {
        Some(path) => OrchestratorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };
    if let Some(secs) = stale_after {
        config = config.with_stale_after(Duration::from_secs(secs));
    }
    Ok(config)
}

fn load_predictor(backend: &FsBackend, scope: &str) -> Result<Predictor> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading embeddings for {}...", scope));

    let embeddings = backend
        .load_embeddings(scope)
        .with_context(|| format!("Failed to load embeddings for scope {}", scope))?;
    if embeddings.is_empty() {
        pb.finish_and_clear();
        bail!("No embeddings for scope {}; has its training job completed?", scope);
    }

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(embeddings.into_predictor())
}

fn cmd_enqueue(
    backend: &FsBackend,
    config: OrchestratorConfig,
    scope: &str,
    training: tessera_kge::TrainingConfig,
    total_epochs: Option<usize>,
) -> Result<()> {
    let orch = Orchestrator::with_backend(config, backend);
    let job = orch
        .enqueue(scope, Some(training), total_epochs)
        .with_context(|| format!("Failed to enqueue job for scope {}", scope))?;

    println!("Enqueued {}", job.id);
    println!(
        "Scope: {} | budget: {} epochs | slice: {} epochs",
        job.scope_id, job.total_epoch_budget, job.config.epochs
    );
    Ok(())
}

fn cmd_step(backend: &FsBackend, config: OrchestratorConfig) -> Result<()> {
    let orch = Orchestrator::with_backend(config, backend);

    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Training...");

    let outcome = orch.run_once();
    pb.finish_and_clear();
    let outcome = outcome.context("Training invocation failed")?;

    tracing::info!(elapsed = ?start.elapsed(), "invocation finished");
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn cmd_jobs(backend: &FsBackend) -> Result<()> {
    let jobs = backend.list().context("Failed to list jobs")?;

    println!("Jobs ({} total):", jobs.len());
    for job in &jobs {
        println!("  {}", describe_job(job));
        if let Some(err) = &job.error {
            println!("    error: {}", err);
        }
    }
    Ok(())
}

fn describe_job(job: &TrainingJob) -> String {
    format!(
        "{} [{}] {} {}/{} epochs ({:.0}%)",
        job.id,
        job.status,
        job.scope_id,
        job.processed_epochs,
        job.total_epoch_budget,
        job.progress() * 100.0
    )
}

fn print_predictions(title: &str, predictions: &[Prediction]) {
    println!("{}", title);
    for p in predictions {
        println!("{}. {} ({:.4})", p.rank, p.id, p.score);
    }
}

fn cmd_predict(backend: &FsBackend, target: PredictTarget) -> Result<()> {
    match target {
        PredictTarget::Tail {
            scope,
            head,
            relation,
            k,
        } => {
            let predictor = load_predictor(backend, &scope)?;
            let preds = predictor.predict_tail(&head, &relation, k)?;
            print_predictions(&format!("({}, {}, ?)", head, relation), &preds);
        }
        PredictTarget::Head {
            scope,
            relation,
            tail,
            k,
        } => {
            let predictor = load_predictor(backend, &scope)?;
            let preds = predictor.predict_head(&relation, &tail, k)?;
            print_predictions(&format!("(?, {}, {})", relation, tail), &preds);
        }
        PredictTarget::Relation {
            scope,
            head,
            tail,
            k,
        } => {
            let predictor = load_predictor(backend, &scope)?;
            let preds = predictor.predict_relation(&head, &tail, k)?;
            print_predictions(&format!("({}, ?, {})", head, tail), &preds);
        }
    }
    Ok(())
}

fn cmd_score(
    backend: &FsBackend,
    scope: &str,
    head: &str,
    relation: &str,
    tail: &str,
) -> Result<()> {
    let predictor = load_predictor(backend, scope)?;
    let score = predictor.triplet_score(head, relation, tail)?;
    println!("{:.6}", score);
    Ok(())
}

fn cmd_similar(backend: &FsBackend, target: SimilarTarget) -> Result<()> {
    match target {
        SimilarTarget::Entities { scope, id, k } => {
            let predictor = load_predictor(backend, &scope)?;
            let sims = predictor.find_similar_entities(&id, k)?;
            print_predictions(&format!("Entities similar to {}:", id), &sims);
        }
        SimilarTarget::Relations { scope, relation, k } => {
            let predictor = load_predictor(backend, &scope)?;
            let sims = predictor.find_similar_relations(&relation, k)?;
            print_predictions(&format!("Relations similar to {}:", relation), &sims);
        }
    }
    Ok(())
}

fn read_triplets(input: &Path) -> Result<Vec<Triplet>> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let mut triplets = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Triplet::from_csv_line(line) {
            Some(t) => triplets.push(t),
            None => bail!("{}:{}: expected head,relation,tail", input.display(), i + 1),
        }
    }
    Ok(triplets)
}

fn cmd_evaluate(backend: &FsBackend, scope: &str, input: &Path) -> Result<()> {
    let triplets = read_triplets(input)?;
    let predictor = load_predictor(backend, scope)?;

    let start = Instant::now();
    let metrics = predictor.evaluate_graph_completeness(&triplets)?;
    println!(
        "Evaluated {} triplets in {:.2?}",
        triplets.len(),
        start.elapsed()
    );
    println!("{}", metrics.summary());
    Ok(())
}
