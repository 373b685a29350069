//! Majority-class baseline evaluator
//!
//! Predicts the most frequent training label for every test row, with the
//! training class frequencies as confidences. Metrics use the native names of
//! the measure table (`Percent_correct`, `Kappa_statistic`, ...).

use super::evaluator::{Evaluation, Evaluator, ModelHandle, Prediction, RawMetrics};
use crate::error::{Result, TaskRunError};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Baseline classifier that always predicts the majority class
#[derive(Debug, Clone, Default)]
pub struct MajorityClassEvaluator {
    majority: Option<String>,
}

impl MajorityClassEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label predicted by the most recent evaluation
    pub fn majority(&self) -> Option<&str> {
        self.majority.as_deref()
    }
}

impl Evaluator for MajorityClassEvaluator {
    fn evaluate(&mut self, train: &DataFrame, test: &DataFrame, target: &str) -> Result<Evaluation> {
        let start = Instant::now();
        let train_labels = class_labels(train, target)?;
        let priors = class_priors(&train_labels)?;
        let majority = majority_label(&priors);
        let training_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        let test_labels = class_labels(test, target)?;
        let predictions: Vec<Prediction> = test_labels
            .iter()
            .map(|actual| Prediction {
                actual: actual.clone(),
                predicted: majority.clone(),
                confidences: priors.clone(),
            })
            .collect();
        let testing_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut raw_metrics = classification_metrics(&predictions, &priors);
        raw_metrics.insert("UserCPU_Time_millis_training".to_string(), training_ms);
        raw_metrics.insert("UserCPU_Time_millis_testing".to_string(), testing_ms);

        self.majority = Some(majority.clone());
        Ok(Evaluation {
            raw_metrics,
            predictions,
            model: ModelHandle::new(self.model_class_name(), format!("predicts '{}'", majority)),
        })
    }

    fn model_class_name(&self) -> String {
        "kolosal.MajorityClass".to_string()
    }

    fn config_key(&self) -> String {
        String::new()
    }
}

fn class_labels(frame: &DataFrame, target: &str) -> Result<Vec<Option<String>>> {
    let column = frame
        .column(target)
        .map_err(|_| TaskRunError::DataError(format!("class attribute '{}' not found", target)))?;
    if column.dtype().is_float() {
        return Err(TaskRunError::UnsupportedData(format!(
            "class attribute '{}' is numeric ({}); a nominal class is required",
            target,
            column.dtype()
        )));
    }
    let labels = column.cast(&DataType::String)?;
    Ok(labels
        .str()?
        .into_iter()
        .map(|label| label.map(str::to_string))
        .collect())
}

fn class_priors(labels: &[Option<String>]) -> Result<BTreeMap<String, f64>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels.iter().flatten() {
        *counts.entry(label.clone()).or_default() += 1;
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return Err(TaskRunError::UnsupportedData(
            "training set contains no labelled rows".to_string(),
        ));
    }
    Ok(counts
        .into_iter()
        .map(|(label, count)| (label, count as f64 / total as f64))
        .collect())
}

/// Most frequent label; ties go to the first label in sort order
fn majority_label(priors: &BTreeMap<String, f64>) -> String {
    let mut best: Option<(&String, f64)> = None;
    for (label, &p) in priors {
        if best.map_or(true, |(_, best_p)| p > best_p) {
            best = Some((label, p));
        }
    }
    best.map(|(label, _)| label.clone()).unwrap_or_default()
}

fn classification_metrics(predictions: &[Prediction], priors: &BTreeMap<String, f64>) -> RawMetrics {
    let mut metrics = RawMetrics::new();
    let labelled: Vec<(&str, &Prediction)> = predictions
        .iter()
        .filter_map(|p| p.actual.as_deref().map(|actual| (actual, p)))
        .collect();
    let n = labelled.len();
    if n == 0 {
        return metrics;
    }

    let correct = labelled.iter().filter(|(actual, p)| *actual == p.predicted).count();
    let observed = correct as f64 / n as f64;

    let mut actual_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut predicted_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (actual, p) in &labelled {
        *actual_counts.entry(*actual).or_default() += 1;
        *predicted_counts.entry(p.predicted.as_str()).or_default() += 1;
    }
    let expected: f64 = predicted_counts
        .iter()
        .map(|(label, &count)| {
            let actual = actual_counts.get(label).copied().unwrap_or(0);
            (actual as f64 / n as f64) * (count as f64 / n as f64)
        })
        .sum();
    let kappa = if (1.0 - expected).abs() > f64::EPSILON {
        (observed - expected) / (1.0 - expected)
    } else if correct == n {
        1.0
    } else {
        0.0
    };

    let classes: BTreeSet<&str> = priors
        .keys()
        .map(String::as_str)
        .chain(actual_counts.keys().copied())
        .collect();
    let squared: f64 = labelled
        .iter()
        .map(|(actual, p)| {
            classes
                .iter()
                .map(|class| {
                    let confidence = p.confidences.get(*class).copied().unwrap_or(0.0);
                    let truth = if class == actual { 1.0 } else { 0.0 };
                    (confidence - truth).powi(2)
                })
                .sum::<f64>()
        })
        .sum();
    let rmse = (squared / (n * classes.len()) as f64).sqrt();

    metrics.insert("Percent_correct".to_string(), observed * 100.0);
    metrics.insert("Kappa_statistic".to_string(), kappa);
    metrics.insert("Root_mean_squared_error".to_string(), rmse);
    metrics.insert("Number_correct".to_string(), correct as f64);
    metrics
}
