//! Repeat orchestration
//!
//! A [`TaskRunner`] evaluates every (fold, sample) cell of a repeat, translates
//! the evaluator's metrics and pushes each outcome to its listener. Cells are
//! processed fold-major in a single thread; a cell whose data the evaluator
//! rejects is reported as an error and its siblings still run.

use super::config::RunnerConfig;
use super::listener::{CellResult, ErrorResult, FullModelResult, ResultListener};
use crate::data::{PreparedDataset, SplitTable};
use crate::error::Result;
use crate::evaluation::{Evaluator, MetricTranslator};
use crate::partition::{PartitionBuilder, PartitionCell};
use crate::registry::{DuplicateRunGuard, RunId, RunRegistry};
use crate::task::{Task, TaskId};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Everything needed to run a task: the task, its prepared dataset and its splits
#[derive(Debug, Clone)]
pub struct TaskContext {
    task: Task,
    dataset: PreparedDataset,
    splits: SplitTable,
}

impl TaskContext {
    /// Fails with `UnsupportedTaskType` for anything but classification tasks
    pub fn new(task: Task, dataset: PreparedDataset, splits: SplitTable) -> Result<Self> {
        task.ensure_supported()?;
        Ok(Self {
            task,
            dataset,
            splits,
        })
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn dataset(&self) -> &PreparedDataset {
        &self.dataset
    }

    pub fn splits(&self) -> &SplitTable {
        &self.splits
    }
}

/// Stages of a repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatState {
    Init,
    CheckDuplicate,
    Skipped,
    BuildPartitions,
    Evaluate,
    Translate,
    Dispatch,
    Done,
}

impl fmt::Display for RepeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepeatState::Init => "init",
            RepeatState::CheckDuplicate => "check_duplicate",
            RepeatState::Skipped => "skipped",
            RepeatState::BuildPartitions => "build_partitions",
            RepeatState::Evaluate => "evaluate",
            RepeatState::Translate => "translate",
            RepeatState::Dispatch => "dispatch",
            RepeatState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a repeat ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatOutcome {
    /// The registry already holds runs for this task and setup
    Skipped { existing_runs: Vec<RunId> },
    /// Every cell was processed
    Completed { dispatched: usize, failed: usize },
    /// The repeat ended early; later repeats still run
    Failed { error: String },
}

impl RepeatOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RepeatOutcome::Skipped { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RepeatOutcome::Completed { .. })
    }

    /// Number of results dispatched; zero for skipped and failed repeats
    pub fn dispatched(&self) -> usize {
        match self {
            RepeatOutcome::Skipped { .. } | RepeatOutcome::Failed { .. } => 0,
            RepeatOutcome::Completed { dispatched, .. } => *dispatched,
        }
    }
}

/// Runs the repeats of a task with one evaluator, registry and listener
pub struct TaskRunner<E, R, L> {
    config: RunnerConfig,
    evaluator: E,
    registry: R,
    listener: L,
    full_models: HashSet<TaskId>,
}

impl<E, R, L> TaskRunner<E, R, L>
where
    E: Evaluator,
    R: RunRegistry,
    L: ResultListener,
{
    pub fn new(config: RunnerConfig, evaluator: E, registry: R, listener: L) -> Self {
        Self {
            config,
            evaluator,
            registry,
            listener,
            full_models: HashSet::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_parts(self) -> (E, R, L) {
        (self.evaluator, self.registry, self.listener)
    }

    /// Evaluate all cells of `repeat` (0-based)
    ///
    /// Returns `Skipped` without building partitions when the registry already
    /// knows a run for this task and setup. Split errors and evaluator errors
    /// other than unsupported data end the repeat with an error.
    pub fn run_repeat(&mut self, ctx: &TaskContext, repeat: u32) -> Result<RepeatOutcome> {
        let task_id = ctx.task().task_id;
        let flavor = self.evaluator.model_class_name();
        let config_key = self.evaluator.config_key();
        transition(task_id, repeat, RepeatState::Init);

        if !self.config.skip_duplicate_check {
            transition(task_id, repeat, RepeatState::CheckDuplicate);
            let guard = DuplicateRunGuard::new(&self.registry);
            if let Some(existing_runs) = guard.already_run(task_id, &flavor, &config_key) {
                info!(task_id, repeat, flavor = %flavor, "Run exists, skipping repeat");
                transition(task_id, repeat, RepeatState::Skipped);
                return Ok(RepeatOutcome::Skipped { existing_runs });
            }
        }

        transition(task_id, repeat, RepeatState::BuildPartitions);
        let task = ctx.task();
        let partitions = PartitionBuilder::new(task.num_folds(), task.num_samples()).build(
            ctx.dataset().frame(),
            ctx.splits(),
            repeat,
        )?;
        info!(
            task_id,
            repeat,
            folds = partitions.num_folds(),
            samples = partitions.num_samples(),
            rows = partitions.assigned_rows(),
            "Partitions built"
        );

        let translator = MetricTranslator::for_task(ctx.dataset().missing_labels());
        let mut dispatched = 0;
        let mut failed = 0;

        for cell in partitions.into_cells() {
            if self.run_cell(ctx, repeat, cell, &translator, &config_key)? {
                dispatched += 1;
            } else {
                failed += 1;
            }
        }

        transition(task_id, repeat, RepeatState::Done);
        info!(task_id, repeat, dispatched, failed, "Repeat completed");
        Ok(RepeatOutcome::Completed { dispatched, failed })
    }

    /// Train and evaluate on the whole dataset; at most once per task
    ///
    /// Returns `Ok(false)` when the full model was already built for this task.
    /// A failed build can be retried.
    pub fn run_full_dataset(&mut self, ctx: &TaskContext) -> Result<bool> {
        let task_id = ctx.task().task_id;
        if self.full_models.contains(&task_id) {
            warn!(task_id, "Full-dataset model already built for task");
            return Ok(false);
        }

        let dataset = ctx.dataset();
        let frame = dataset.frame();
        info!(task_id, rows = frame.height(), "Building model on full dataset");
        let evaluation = self.evaluator.evaluate(frame, frame, dataset.target())?;
        let measures = MetricTranslator::for_task(dataset.missing_labels())
            .user_measures(&evaluation.raw_metrics, frame.height());

        self.listener.accept_full_model(FullModelResult {
            task: ctx.task(),
            dataset,
            model: evaluation.model,
            config_key: self.evaluator.config_key(),
            measures,
            evaluator: self.evaluator.descriptor(),
        })?;
        self.full_models.insert(task_id);
        Ok(true)
    }

    /// Run every repeat of the task in order, then the full-dataset pass if configured
    ///
    /// The repeat count comes from the configuration, then the task, then defaults
    /// to one. A repeat that fails is recorded as `Failed` and the next one runs;
    /// configuration and output errors abort the task. The full-dataset pass is
    /// left out when any repeat was skipped.
    pub fn run_all(&mut self, ctx: &TaskContext) -> Result<Vec<RepeatOutcome>> {
        let task_id = ctx.task().task_id;
        let repeats = self
            .config
            .num_repeats
            .or_else(|| ctx.task().num_repeats())
            .unwrap_or(1);
        info!(task_id, repeats, "Running task");

        let mut outcomes = Vec::with_capacity(repeats as usize);
        for repeat in 0..repeats {
            let outcome = match self.run_repeat(ctx, repeat) {
                Ok(outcome) => outcome,
                Err(e) if e.is_configuration() || e.is_output() => return Err(e),
                Err(e) => {
                    error!(task_id, repeat, error = %e, "Repeat failed, continuing");
                    RepeatOutcome::Failed { error: e.to_string() }
                }
            };
            outcomes.push(outcome);
        }

        if self.config.model_full_dataset && !outcomes.iter().any(RepeatOutcome::is_skipped) {
            self.run_full_dataset(ctx)?;
        }
        Ok(outcomes)
    }

    /// Evaluate one cell. `Ok(false)` means the evaluator rejected its data.
    fn run_cell(
        &mut self,
        ctx: &TaskContext,
        repeat: u32,
        cell: PartitionCell,
        translator: &MetricTranslator,
        config_key: &str,
    ) -> Result<bool> {
        let task_id = ctx.task().task_id;
        let fold = cell.fold;
        let sample = ctx.splits().has_samples().then_some(cell.sample);
        debug!(
            task_id,
            repeat,
            fold,
            sample = cell.sample,
            train_rows = cell.train.height(),
            test_rows = cell.test.height(),
            state = %RepeatState::Evaluate,
            "Evaluating cell"
        );

        let evaluation = match self
            .evaluator
            .evaluate(&cell.train, &cell.test, ctx.dataset().target())
        {
            Ok(evaluation) => evaluation,
            Err(e) if e.is_unsupported_data() => {
                error!(task_id, repeat, fold, sample = cell.sample, error = %e, "Evaluator rejected cell");
                self.listener.accept_error(ErrorResult {
                    task: ctx.task(),
                    dataset: ctx.dataset(),
                    repeat,
                    fold,
                    sample,
                    flavor: self.evaluator.model_class_name(),
                    config_key: config_key.to_string(),
                    message: e.to_string(),
                })?;
                return Ok(false);
            }
            Err(e) => {
                error!(task_id, repeat, fold, sample = cell.sample, error = %e, "Evaluation failed, aborting repeat");
                return Err(e);
            }
        };

        let timestamp = Utc::now();
        debug!(task_id, repeat, fold, state = %RepeatState::Translate, metrics = evaluation.raw_metrics.len());
        let measures = translator.user_measures(&evaluation.raw_metrics, cell.test.height());

        let trace = match self.evaluator.optimization_trace() {
            Ok(trace) => trace,
            Err(e) => {
                warn!(task_id, repeat, fold, error = %e, "Could not extract optimization trace");
                None
            }
        };

        debug!(task_id, repeat, fold, state = %RepeatState::Dispatch, measures = measures.len());
        self.listener.accept_result(CellResult {
            task: ctx.task(),
            dataset: ctx.dataset(),
            timestamp,
            repeat,
            fold,
            sample,
            model: evaluation.model,
            config_key: config_key.to_string(),
            test_row_ids: cell.test_row_ids,
            predictions: evaluation.predictions,
            raw_metrics: evaluation.raw_metrics,
            measures,
            trace,
            build_full_model: self.config.model_full_dataset,
        })?;
        Ok(true)
    }
}

fn transition(task_id: TaskId, repeat: u32, state: RepeatState) {
    debug!(task_id, repeat, state = %state, "Repeat state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SplitRecord, SplitRole};
    use crate::error::TaskRunError;
    use crate::evaluation::{
        Evaluation, ModelHandle, OptimizationTrace, Prediction, RawMetrics, TraceIteration,
    };
    use crate::registry::{EmptyRegistry, SetupId};
    use crate::runner::CollectingListener;
    use crate::task::{SourceData, TaskType};
    use polars::prelude::*;

    /// Predicts the first training label and reports fixed timings; the first
    /// `failures` calls fail hard
    struct ConstantEvaluator {
        calls: usize,
        trace: bool,
        failures: usize,
    }

    impl ConstantEvaluator {
        fn new() -> Self {
            Self { calls: 0, trace: false, failures: 0 }
        }
    }

    impl Evaluator for ConstantEvaluator {
        fn evaluate(&mut self, _train: &DataFrame, test: &DataFrame, _target: &str) -> Result<Evaluation> {
            self.calls += 1;
            if self.calls <= self.failures {
                return Err(TaskRunError::EvaluationError("out of memory".to_string()));
            }
            let mut raw_metrics = RawMetrics::new();
            raw_metrics.insert("Percent_correct".to_string(), 50.0);
            raw_metrics.insert("UserCPU_Time_millis_training".to_string(), 2.0);
            raw_metrics.insert("UserCPU_Time_millis_testing".to_string(), 1.0);
            let predictions = (0..test.height())
                .map(|_| Prediction {
                    actual: None,
                    predicted: "a".to_string(),
                    confidences: Default::default(),
                })
                .collect();
            Ok(Evaluation {
                raw_metrics,
                predictions,
                model: ModelHandle::new("test.Constant", "a"),
            })
        }

        fn model_class_name(&self) -> String {
            "test.Constant".to_string()
        }

        fn config_key(&self) -> String {
            "-C a".to_string()
        }

        fn optimization_trace(&self) -> Result<Option<OptimizationTrace>> {
            if self.trace {
                Ok(Some(vec![TraceIteration {
                    setup_string: "-C a".to_string(),
                    evaluation: 0.5,
                    parameters: vec![("C".to_string(), "a".to_string())],
                    selected: true,
                }]))
            } else {
                Err(TaskRunError::TraceError("not a tuned model".to_string()))
            }
        }
    }

    struct ClosedListener;

    impl ResultListener for ClosedListener {
        fn accept_result(&mut self, _result: CellResult<'_>) -> Result<()> {
            Err(TaskRunError::ListenerError("sink closed".to_string()))
        }

        fn accept_error(&mut self, _error: ErrorResult<'_>) -> Result<()> {
            Ok(())
        }

        fn accept_full_model(&mut self, _result: FullModelResult<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct KnownRun;

    impl RunRegistry for KnownRun {
        fn lookup_setup_id(&self, _flavor: &str, _config_key: &str) -> Result<Option<SetupId>> {
            Ok(Some(7))
        }

        fn find_runs(&self, _task_id: TaskId, _setup_id: SetupId) -> Result<Vec<RunId>> {
            Ok(vec![42])
        }
    }

    fn context(task_type: TaskType) -> Result<TaskContext> {
        let frame = df! {
            "x" => [1.0, 2.0, 3.0, 4.0],
            "class" => ["a", "b", "a", "b"],
        }
        .unwrap();
        let source = SourceData {
            dataset_id: 1,
            name: "tiny".to_string(),
            target_feature: "class".to_string(),
            ignore_attributes: Vec::new(),
            row_id_attribute: None,
        };
        let task = Task::new(10, task_type, source.clone())
            .with_folds(2)
            .with_repeats(2);
        let dataset = PreparedDataset::prepare(frame, &source).unwrap();
        let mut records = Vec::new();
        for repeat in 0..2 {
            for row in 0..4 {
                let fold = (row % 2) as u32;
                records.push(SplitRecord::new(repeat, fold, None, SplitRole::Test, row));
                records.push(SplitRecord::new(repeat, 1 - fold, None, SplitRole::Train, row));
            }
        }
        TaskContext::new(task, dataset, SplitTable::new(records, false))
    }

    #[test]
    fn test_regression_context_rejected() {
        let err = context(TaskType::SupervisedRegression).unwrap_err();
        assert!(matches!(err, TaskRunError::UnsupportedTaskType(_)));
    }

    #[test]
    fn test_repeat_dispatches_every_cell() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();
        let mut runner = TaskRunner::new(
            RunnerConfig::new(),
            ConstantEvaluator::new(),
            EmptyRegistry,
            CollectingListener::new(),
        );

        let outcome = runner.run_repeat(&ctx, 0).unwrap();
        assert_eq!(outcome, RepeatOutcome::Completed { dispatched: 2, failed: 0 });

        let listener = runner.listener();
        assert_eq!(listener.cells(), vec![(0, None), (1, None)]);
        assert_eq!(listener.results[0].test_row_ids, vec![0, 2]);
        assert_eq!(listener.results[1].test_row_ids, vec![1, 3]);
        assert_eq!(listener.results[0].predictions.len(), 2);
        assert!(listener.results[0].trace.is_none());
        assert!(!listener.results[0].build_full_model);
    }

    #[test]
    fn test_trace_is_attached() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();
        let mut evaluator = ConstantEvaluator::new();
        evaluator.trace = true;
        let mut runner =
            TaskRunner::new(RunnerConfig::new(), evaluator, EmptyRegistry, CollectingListener::new());

        runner.run_repeat(&ctx, 1).unwrap();
        let trace = runner.listener().results[0].trace.as_ref().unwrap();
        assert_eq!(trace.len(), 1);
        assert!(trace[0].selected);
    }

    #[test]
    fn test_skip_check_bypasses_registry() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();

        let mut guarded =
            TaskRunner::new(RunnerConfig::new(), ConstantEvaluator::new(), KnownRun, CollectingListener::new());
        assert_eq!(
            guarded.run_repeat(&ctx, 0).unwrap(),
            RepeatOutcome::Skipped { existing_runs: vec![42] }
        );
        assert_eq!(guarded.evaluator().calls, 0);

        let mut unguarded = TaskRunner::new(
            RunnerConfig::new().with_skip_duplicate_check(true),
            ConstantEvaluator::new(),
            KnownRun,
            CollectingListener::new(),
        );
        assert_eq!(unguarded.run_repeat(&ctx, 0).unwrap().dispatched(), 2);
    }

    #[test]
    fn test_run_all_uses_task_repeats_and_builds_full_model() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();
        let mut runner = TaskRunner::new(
            RunnerConfig::new().with_model_full_dataset(true),
            ConstantEvaluator::new(),
            EmptyRegistry,
            CollectingListener::new(),
        );

        let outcomes = runner.run_all(&ctx).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(runner.listener().results.iter().all(|r| r.build_full_model));

        let full = &runner.listener().full_models;
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].evaluator.class_name, "test.Constant");
        assert_eq!(full[0].measures.get("predictive_accuracy").unwrap().weight, 4);

        assert!(!runner.run_full_dataset(&ctx).unwrap());
        assert_eq!(runner.listener().full_models.len(), 1);
    }

    #[test]
    fn test_run_all_config_overrides_repeats() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();
        let mut runner = TaskRunner::new(
            RunnerConfig::new().with_num_repeats(1),
            ConstantEvaluator::new(),
            EmptyRegistry,
            CollectingListener::new(),
        );
        assert_eq!(runner.run_all(&ctx).unwrap().len(), 1);
        assert!(runner.listener().full_models.is_empty());
    }

    #[test]
    fn test_failed_full_model_can_be_retried() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();
        let mut evaluator = ConstantEvaluator::new();
        evaluator.failures = 1;
        let mut runner =
            TaskRunner::new(RunnerConfig::new(), evaluator, EmptyRegistry, CollectingListener::new());

        let err = runner.run_full_dataset(&ctx).unwrap_err();
        assert!(matches!(err, TaskRunError::EvaluationError(_)));
        assert!(runner.listener().full_models.is_empty());

        assert!(runner.run_full_dataset(&ctx).unwrap());
        assert!(!runner.run_full_dataset(&ctx).unwrap());
        assert_eq!(runner.listener().full_models.len(), 1);
        assert_eq!(runner.evaluator().calls, 2);
    }

    #[test]
    fn test_listener_failure_aborts_run_all() {
        let ctx = context(TaskType::SupervisedClassification).unwrap();
        let mut runner =
            TaskRunner::new(RunnerConfig::new(), ConstantEvaluator::new(), EmptyRegistry, ClosedListener);

        let err = runner.run_all(&ctx).unwrap_err();
        assert!(matches!(err, TaskRunError::ListenerError(_)));
        assert_eq!(runner.evaluator().calls, 1);
    }
}
