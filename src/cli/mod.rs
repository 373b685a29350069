//! Kolosal OpenML CLI Module
//!
//! Command-line interface for running tasks from local files and inspecting
//! split tables.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{DataLoader, PreparedDataset};
use crate::evaluation::{Evaluator, MajorityClassEvaluator};
use crate::registry::{EmptyRegistry, LocalRunRegistry, RunRegistry};
use crate::runner::{
    CollectingListener, JsonLinesSink, RepeatOutcome, ResultListener, RunnerConfig, TaskContext,
    TaskRunner,
};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_warn(msg: &str) {
    println!("  {} {}", "!".yellow(), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-openml")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Repeated cross-validation runner for OpenML tasks")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a task against its predefined splits
    Run {
        /// Task description (JSON)
        #[arg(short, long)]
        task: PathBuf,

        /// Dataset file (CSV or TSV)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Split table file (CSV or TSV)
        #[arg(short, long)]
        splits: PathBuf,

        /// Runner configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Local run registry file
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Output file for JSON-lines results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of repeats, overriding task and configuration
        #[arg(long)]
        repeats: Option<u32>,

        /// Also build a model on the full dataset
        #[arg(long)]
        full_model: bool,
    },

    /// Show split table information
    Info {
        /// Split table file
        #[arg(short, long)]
        splits: PathBuf,

        /// Task description to check the splits against
        #[arg(short, long)]
        task: Option<PathBuf>,
    },
}

/// Inputs of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub task: PathBuf,
    pub dataset: PathBuf,
    pub splits: PathBuf,
    pub config: Option<PathBuf>,
    pub registry: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub repeats: Option<u32>,
    pub full_model: bool,
}

/// Runner configuration from file, with command-line overrides applied
pub fn resolve_config(opts: &RunOptions) -> anyhow::Result<RunnerConfig> {
    let mut config = match &opts.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(repeats) = opts.repeats {
        config = config.with_num_repeats(repeats);
    }
    if opts.full_model {
        config = config.with_model_full_dataset(true);
    }
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(opts: &RunOptions) -> anyhow::Result<()> {
    section("Run");
    let loader = DataLoader::new();

    step_run("Loading task");
    let task = loader.load_task(&opts.task)?;
    step_done(&format!("{}, {}", task, task.task_type));

    step_run("Loading dataset");
    let start = Instant::now();
    let frame = loader.load_auto(&opts.dataset)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        frame.height(),
        frame.width(),
        start.elapsed()
    ));
    let dataset = PreparedDataset::prepare(frame, &task.source_data)?;
    if dataset.missing_labels() {
        step_warn("Target has missing labels; canonical measures will be empty");
    }

    step_run("Loading splits");
    let splits = loader.load_splits(&opts.splits)?;
    step_done(&format!("{} records", splits.len()));

    let config = resolve_config(opts)?;
    let ctx = TaskContext::new(task, dataset, splits)?;
    let mut registry = opts
        .registry
        .as_deref()
        .map(LocalRunRegistry::open)
        .transpose()?;

    let evaluator = MajorityClassEvaluator::new();
    let flavor = evaluator.model_class_name();
    let config_key = evaluator.config_key();

    let outcomes = {
        let lookup: &dyn RunRegistry = match &registry {
            Some(local) => local,
            None => &EmptyRegistry,
        };
        match &opts.output {
            Some(path) => {
                let mut sink = JsonLinesSink::create(path)?;
                let outcomes = run_task(&ctx, config, evaluator, lookup, &mut sink)?;
                sink.flush()?;
                if sink.written() == 0 {
                    step_warn(&format!("Nothing written, {} left unchanged", path.display()));
                } else {
                    step_ok(&format!("{} lines → {}", sink.written(), path.display()));
                }
                outcomes
            }
            None => {
                let mut listener = CollectingListener::new();
                let outcomes = run_task(&ctx, config, evaluator, lookup, &mut listener)?;
                print_results(&listener);
                outcomes
            }
        }
    };

    let completed = outcomes.iter().any(RepeatOutcome::is_completed);
    if let (Some(local), true) = (registry.as_mut(), completed) {
        let setup_id = local.register_setup(&flavor, &config_key);
        let run_id = local.record_run(ctx.task().task_id, setup_id);
        local.save()?;
        step_ok(&format!(
            "Recorded run {} (setup {}) in {}",
            run_id,
            setup_id,
            local.path().display()
        ));
    }

    println!();
    Ok(())
}

fn run_task<L: ResultListener>(
    ctx: &TaskContext,
    config: RunnerConfig,
    evaluator: MajorityClassEvaluator,
    registry: &dyn RunRegistry,
    listener: L,
) -> anyhow::Result<Vec<RepeatOutcome>> {
    let mut runner = TaskRunner::new(config, evaluator, registry, listener);

    step_run(&format!("Evaluating {}", runner.evaluator().model_class_name().as_str().cyan()));
    let start = Instant::now();
    let outcomes = runner.run_all(ctx)?;
    step_done(&format!("{:?}", start.elapsed()));

    for (repeat, outcome) in outcomes.iter().enumerate() {
        match outcome {
            RepeatOutcome::Skipped { existing_runs } => step_warn(&format!(
                "Repeat {} skipped, existing runs {:?}",
                repeat, existing_runs
            )),
            RepeatOutcome::Completed { dispatched, failed } => step_ok(&format!(
                "Repeat {}: {} cells, {} failed",
                repeat, dispatched, failed
            )),
            RepeatOutcome::Failed { error } => step_warn(&format!(
                "Repeat {} failed: {}",
                repeat, error
            )),
        }
    }
    Ok(outcomes)
}

fn print_results(listener: &CollectingListener) {
    if listener.results.is_empty() && listener.errors.is_empty() {
        return;
    }
    println!();
    println!(
        "  {:<8} {:<6} {:<8} {:>6} {:>10} {:>10}",
        muted("Repeat"),
        muted("Fold"),
        muted("Sample"),
        muted("Test"),
        muted("Accuracy"),
        muted("Time ms")
    );
    println!("  {}", dim(&"─".repeat(54)));

    for result in &listener.results {
        let accuracy = result
            .measures
            .value("predictive_accuracy")
            .map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));
        let time = result
            .measures
            .value("usercpu_time_millis")
            .map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));
        println!(
            "  {:<8} {:<6} {:<8} {:>6} {:>10} {:>10}",
            result.repeat,
            result.fold,
            result.sample.map_or_else(|| "-".to_string(), |s| s.to_string()),
            result.test_row_ids.len(),
            accuracy.as_str().white().bold(),
            time.as_str().white()
        );
    }
    for error in &listener.errors {
        println!(
            "  {:<8} {:<6} {:<8} {}",
            error.repeat,
            error.fold,
            error.sample.map_or_else(|| "-".to_string(), |s| s.to_string()),
            error.message.as_str().red()
        );
    }
    for full in &listener.full_models {
        let accuracy = full
            .measures
            .value("predictive_accuracy")
            .map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));
        println!("  {:<24} {:>17}", muted("Full dataset"), accuracy.as_str().white().bold());
    }
}

pub fn cmd_info(splits_path: &Path, task_path: Option<&Path>) -> anyhow::Result<()> {
    section("Split Info");
    let loader = DataLoader::new();
    let splits = loader.load_splits(splits_path)?;

    println!("  {:<12} {}", muted("File"), splits_path.display());
    println!("  {:<12} {}", muted("Records"), splits.len());
    println!(
        "  {:<12} {}",
        muted("Samples"),
        if splits.has_samples() { "yes" } else { "no" }
    );
    println!();

    println!(
        "  {:<8} {:>6} {:>8} {:>8} {:>8} {:>8}",
        muted("Repeat"),
        muted("Folds"),
        muted("Samples"),
        muted("Train"),
        muted("Test"),
        muted("Other")
    );
    println!("  {}", dim(&"─".repeat(52)));

    let repeats = splits.repeats();
    for &repeat in &repeats {
        let summary = splits.summary(repeat);
        println!(
            "  {:<8} {:>6} {:>8} {:>8} {:>8} {:>8}",
            repeat, summary.folds, summary.samples, summary.train, summary.test, summary.ignored
        );
    }

    if let Some(path) = task_path {
        let task = loader.load_task(path)?;
        println!();
        println!("  {:<12} {}", muted("Task"), task);
        for &repeat in &repeats {
            let summary = splits.summary(repeat);
            if summary.folds > task.num_folds() || summary.samples > task.num_samples() {
                step_warn(&format!(
                    "Repeat {} uses {} folds × {} samples, task declares {} × {}",
                    repeat,
                    summary.folds,
                    summary.samples,
                    task.num_folds(),
                    task.num_samples()
                ));
            }
        }
        let declared = task.num_repeats().unwrap_or(1);
        if (repeats.len() as u32) < declared {
            step_warn(&format!(
                "Split table has {} repeats, task declares {}",
                repeats.len(),
                declared
            ));
        } else {
            step_ok("Split table covers the task");
        }
    }

    println!();
    Ok(())
}
