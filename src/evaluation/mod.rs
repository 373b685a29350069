//! Model evaluation capability and canonical measures

pub mod evaluator;
pub mod majority;
pub mod measures;

pub use evaluator::{
    Evaluation, Evaluator, EvaluatorDescriptor, ModelHandle, OptimizationTrace, Prediction,
    RawMetrics, TraceIteration,
};
pub use majority::MajorityClassEvaluator;
pub use measures::{CanonicalMeasures, MetricScore, MetricTranslator, UserMeasure, USER_MEASURES};
