//! Evaluator capability
//!
//! An evaluator fits a model on a train frame, scores a test frame and reports
//! its metrics under its own native names.

use crate::error::Result;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics keyed by the evaluator's native names
pub type RawMetrics = BTreeMap<String, f64>;

/// Opaque description of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub class_name: String,
    pub description: String,
}

impl ModelHandle {
    pub fn new(class_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            description: description.into(),
        }
    }
}

/// Prediction for one test row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Known label, if present in the test frame
    pub actual: Option<String>,
    pub predicted: String,
    /// Class label to confidence
    pub confidences: BTreeMap<String, f64>,
}

/// Output of a single train/test evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub raw_metrics: RawMetrics,
    /// One prediction per test row, in test-frame order
    pub predictions: Vec<Prediction>,
    pub model: ModelHandle,
}

/// One iteration of a hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceIteration {
    pub setup_string: String,
    pub evaluation: f64,
    pub parameters: Vec<(String, String)>,
    pub selected: bool,
}

/// Optimization trace of a tuned model
pub type OptimizationTrace = Vec<TraceIteration>;

/// Describes the evaluator that produced a full-dataset model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorDescriptor {
    pub class_name: String,
    pub config_key: String,
}

/// Opaque model evaluation capability
pub trait Evaluator {
    /// Fit on `train`, predict and score `test`. `target` names the class attribute.
    ///
    /// Data the evaluator cannot consume must be reported as
    /// [`TaskRunError::UnsupportedData`](crate::error::TaskRunError::UnsupportedData).
    fn evaluate(&mut self, train: &DataFrame, test: &DataFrame, target: &str) -> Result<Evaluation>;

    /// Model flavor, e.g. the implementing class name
    fn model_class_name(&self) -> String;

    /// Hyperparameter configuration string
    fn config_key(&self) -> String;

    /// Trace of the most recent evaluation, for evaluators that tune themselves
    fn optimization_trace(&self) -> Result<Option<OptimizationTrace>> {
        Ok(None)
    }

    fn descriptor(&self) -> EvaluatorDescriptor {
        EvaluatorDescriptor {
            class_name: self.model_class_name(),
            config_key: self.config_key(),
        }
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&mut self, train: &DataFrame, test: &DataFrame, target: &str) -> Result<Evaluation> {
        (**self).evaluate(train, test, target)
    }

    fn model_class_name(&self) -> String {
        (**self).model_class_name()
    }

    fn config_key(&self) -> String {
        (**self).config_key()
    }

    fn optimization_trace(&self) -> Result<Option<OptimizationTrace>> {
        (**self).optimization_trace()
    }
}
