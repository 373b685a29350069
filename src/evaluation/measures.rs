//! Canonical user measures
//!
//! Evaluators report metrics under their own names and units. The fixed
//! [`USER_MEASURES`] table maps them onto the canonical OpenML vocabulary.

use super::evaluator::RawMetrics;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

pub const TRAINING_TIME: &str = "usercpu_time_millis_training";
pub const TESTING_TIME: &str = "usercpu_time_millis_testing";
pub const TOTAL_TIME: &str = "usercpu_time_millis";

/// Mapping of one native metric onto a canonical one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserMeasure {
    pub name: &'static str,
    pub implementation: &'static str,
    pub native_name: &'static str,
    /// Multiplier from native to canonical units
    pub factor: f64,
}

impl UserMeasure {
    const fn new(name: &'static str, implementation: &'static str, native_name: &'static str) -> Self {
        Self::scaled(name, implementation, native_name, 1.0)
    }

    const fn scaled(
        name: &'static str,
        implementation: &'static str,
        native_name: &'static str,
        factor: f64,
    ) -> Self {
        Self {
            name,
            implementation,
            native_name,
            factor,
        }
    }
}

/// Native percentages (0-100) are scaled to fractions
pub const USER_MEASURES: [UserMeasure; 7] = [
    UserMeasure::scaled(
        "predictive_accuracy",
        "openml.evaluation.predictive_accuracy(1.0)",
        "Percent_correct",
        0.01,
    ),
    UserMeasure::new("kappa", "openml.evaluation.kappa(1.0)", "Kappa_statistic"),
    UserMeasure::new(
        "root_mean_squared_error",
        "openml.evaluation.root_mean_squared_error(1.0)",
        "Root_mean_squared_error",
    ),
    UserMeasure::scaled(
        "root_relative_squared_error",
        "openml.evaluation.root_relative_squared_error(1.0)",
        "Root_relative_squared_error",
        0.01,
    ),
    UserMeasure::new(
        TRAINING_TIME,
        "openml.evaluation.usercpu_time_millis_training(1.0)",
        "UserCPU_Time_millis_training",
    ),
    UserMeasure::new(
        TESTING_TIME,
        "openml.evaluation.usercpu_time_millis_testing(1.0)",
        "UserCPU_Time_millis_testing",
    ),
    UserMeasure::new(
        TOTAL_TIME,
        "openml.evaluation.usercpu_time_millis(1.0)",
        "UserCPU_Time_millis",
    ),
];

/// A canonical metric value with the test-set size as weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub implementation: String,
    pub value: f64,
    pub weight: usize,
}

/// Canonical measures keyed by canonical metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalMeasures(BTreeMap<String, MetricScore>);

impl CanonicalMeasures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, score: MetricScore) {
        self.0.insert(name.into(), score);
    }

    pub fn get(&self, name: &str) -> Option<&MetricScore> {
        self.0.get(name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.0.get(name).map(|score| score.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, MetricScore> {
        self.0.iter()
    }
}

/// Translates native metrics into canonical user measures
#[derive(Debug, Clone)]
pub struct MetricTranslator {
    measures: &'static [UserMeasure],
    missing_labels: bool,
}

impl Default for MetricTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTranslator {
    pub fn new() -> Self {
        Self {
            measures: &USER_MEASURES,
            missing_labels: false,
        }
    }

    /// Translator for a task; tasks with missing labels produce no user measures
    pub fn for_task(missing_labels: bool) -> Self {
        Self {
            missing_labels,
            ..Self::new()
        }
    }

    /// Apply the measure table. Entries whose native metric is absent are skipped.
    pub fn translate(&self, raw: &RawMetrics, test_size: usize) -> CanonicalMeasures {
        let mut measures = CanonicalMeasures::new();
        for measure in self.measures {
            if let Some(value) = raw.get(measure.native_name) {
                measures.insert(
                    measure.name,
                    MetricScore {
                        implementation: measure.implementation.to_string(),
                        value: value * measure.factor,
                        weight: test_size,
                    },
                );
            }
        }
        measures
    }

    /// Measures reported for one cell: the translated table plus total time, or
    /// nothing when the task has missing labels
    pub fn user_measures(&self, raw: &RawMetrics, test_size: usize) -> CanonicalMeasures {
        if self.missing_labels {
            return CanonicalMeasures::new();
        }
        let mut measures = self.translate(raw, test_size);
        with_total_time(&mut measures, test_size);
        measures
    }
}

/// Add `usercpu_time_millis` as training plus testing time when both are present
pub fn with_total_time(measures: &mut CanonicalMeasures, weight: usize) {
    let (Some(training), Some(testing)) = (measures.value(TRAINING_TIME), measures.value(TESTING_TIME))
    else {
        return;
    };
    let implementation = USER_MEASURES
        .iter()
        .find(|m| m.name == TOTAL_TIME)
        .map(|m| m.implementation)
        .unwrap_or(TOTAL_TIME);
    measures.insert(
        TOTAL_TIME,
        MetricScore {
            implementation: implementation.to_string(),
            value: training + testing,
            weight,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, f64)]) -> RawMetrics {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_percentages_scaled() {
        let measures = MetricTranslator::new().translate(
            &raw(&[("Percent_correct", 87.5), ("Kappa_statistic", 0.75)]),
            40,
        );

        assert_eq!(measures.len(), 2);
        assert!((measures.value("predictive_accuracy").unwrap() - 0.875).abs() < 1e-12);
        assert_eq!(measures.value("kappa"), Some(0.75));
        assert_eq!(measures.get("kappa").unwrap().weight, 40);
        assert_eq!(
            measures.get("kappa").unwrap().implementation,
            "openml.evaluation.kappa(1.0)"
        );
    }

    #[test]
    fn test_unknown_and_absent_metrics_skipped() {
        let measures = MetricTranslator::new().translate(&raw(&[("F_measure", 0.4)]), 10);
        assert!(measures.is_empty());
    }

    #[test]
    fn test_total_time_is_sum() {
        let measures = MetricTranslator::new().user_measures(
            &raw(&[
                ("UserCPU_Time_millis_training", 12.25),
                ("UserCPU_Time_millis_testing", 3.5),
                ("UserCPU_Time_millis", 99.0),
            ]),
            5,
        );
        assert_eq!(measures.value(TOTAL_TIME), Some(12.25 + 3.5));
    }

    #[test]
    fn test_total_time_requires_both() {
        let measures =
            MetricTranslator::new().user_measures(&raw(&[("UserCPU_Time_millis_training", 1.0)]), 5);
        assert!(!measures.contains(TOTAL_TIME));
    }

    #[test]
    fn test_missing_labels_suppress_measures() {
        let measures = MetricTranslator::for_task(true).user_measures(
            &raw(&[("Percent_correct", 50.0), ("UserCPU_Time_millis_training", 1.0)]),
            5,
        );
        assert!(measures.is_empty());
    }
}
