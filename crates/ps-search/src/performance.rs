//! Recorded outcome of evaluating one point.

use ps_types::{EvaluationFailure, Metric, MetricSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::evaluator::EvaluationResult;
use crate::point::Point;

/// Performance of one point of the parameter space.
///
/// A performance whose evaluation failed, or never ran, has no metric
/// values: every lookup returns NaN and it ranks below anything with a real
/// value. Values are only stored for metrics in the declared [`MetricSet`].
#[derive(Debug, Serialize)]
#[serde(bound = "")]
pub struct Performance<M = ()> {
    point: Point,
    /// Generation sequence number across the whole search.
    ordinal: usize,
    /// Refinement level that produced the point (0 = initial grid).
    level: usize,
    metric: Metric,
    class_label: usize,
    metric_set: MetricSet,
    values: BTreeMap<Metric, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(skip)]
    model: Option<Arc<M>>,
}

impl<M> Performance<M> {
    /// Pulls every declared metric out of `result`. `None` records a
    /// performance without values.
    pub fn record<R>(
        point: Point,
        result: Option<&R>,
        metric_set: &MetricSet,
        metric: Metric,
        class_label: usize,
    ) -> Self
    where
        R: EvaluationResult + ?Sized,
    {
        let mut performance = Self::empty(point, metric_set, metric, class_label);
        if let Some(result) = result {
            for m in metric_set.iter() {
                if let Some(value) = result.metric(m, class_label) {
                    performance.values.insert(m, value);
                }
            }
        }
        performance
    }

    /// Worst-case performance for a point whose evaluation failed.
    pub fn failed(
        point: Point,
        failure: &EvaluationFailure,
        metric_set: &MetricSet,
        metric: Metric,
        class_label: usize,
    ) -> Self {
        let mut performance = Self::empty(point, metric_set, metric, class_label);
        performance.failure = Some(failure.message.clone());
        performance
    }

    fn empty(point: Point, metric_set: &MetricSet, metric: Metric, class_label: usize) -> Self {
        Self {
            point,
            ordinal: 0,
            level: 0,
            metric,
            class_label,
            metric_set: metric_set.clone(),
            values: BTreeMap::new(),
            failure: None,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<Arc<M>>) -> Self {
        self.model = model;
        self
    }

    /// Position of the point in the search: sequence number and level.
    pub fn at(mut self, ordinal: usize, level: usize) -> Self {
        self.ordinal = ordinal;
        self.level = level;
        self
    }

    /// Stores `value` for `metric`. Returns `false`, dropping the write, when
    /// the metric is not part of the declared set.
    pub fn set_metric(&mut self, metric: Metric, value: f64) -> bool {
        if !self.metric_set.contains(metric) {
            debug!(%metric, point = %self.point, "dropping write to undeclared metric");
            return false;
        }
        self.values.insert(metric, value);
        true
    }

    /// Value of `metric`, NaN when undeclared or not recorded.
    pub fn metric_value(&self, metric: Metric) -> f64 {
        if !self.metric_set.contains(metric) {
            return f64::NAN;
        }
        self.values.get(&metric).copied().unwrap_or(f64::NAN)
    }

    /// Value of the primary metric.
    pub fn value(&self) -> f64 {
        self.metric_value(self.metric)
    }

    /// True when the primary metric holds a real value.
    pub fn is_valid(&self) -> bool {
        !self.value().is_nan()
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn class_label(&self) -> usize {
        self.class_label
    }

    pub fn metrics(&self) -> &BTreeMap<Metric, f64> {
        &self.values
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn model(&self) -> Option<&Arc<M>> {
        self.model.as_ref()
    }
}

impl<M> Clone for Performance<M> {
    fn clone(&self) -> Self {
        Self {
            point: self.point.clone(),
            ordinal: self.ordinal,
            level: self.level,
            metric: self.metric,
            class_label: self.class_label,
            metric_set: self.metric_set.clone(),
            values: self.values.clone(),
            failure: self.failure.clone(),
            model: self.model.clone(),
        }
    }
}

impl<M> fmt::Display for Performance<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Performance {}: {} ({})", self.point, self.value(), self.metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_types::ParameterValue;

    fn point() -> Point {
        Point::new(vec![("c".into(), ParameterValue::Float(0.5))])
    }

    fn table(entries: &[(Metric, f64)]) -> BTreeMap<Metric, f64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn absent_evaluation_yields_nan_everywhere() {
        let perf: Performance = Performance::record::<BTreeMap<Metric, f64>>(
            point(),
            None,
            &MetricSet::all(),
            Metric::Accuracy,
            0,
        );
        assert!(perf.metrics().is_empty());
        assert!(Metric::ALL.iter().all(|m| perf.metric_value(*m).is_nan()));
        assert!(!perf.is_valid());
    }

    #[test]
    fn failed_evaluation_keeps_message() {
        let perf: Performance = Performance::failed(
            point(),
            &EvaluationFailure::new("out of memory"),
            &MetricSet::all(),
            Metric::Accuracy,
            0,
        );
        assert!(perf.value().is_nan());
        assert_eq!(perf.failure(), Some("out of memory"));
    }

    #[test]
    fn records_only_declared_metrics() {
        let result = table(&[
            (Metric::Accuracy, 0.9),
            (Metric::Kappa, 0.7),
            (Metric::RootMeanSquaredError, 0.3),
        ]);
        let declared = MetricSet::new([Metric::Accuracy, Metric::Kappa]);
        let perf: Performance =
            Performance::record(point(), Some(&result), &declared, Metric::Accuracy, 0);

        assert_eq!(perf.value(), 0.9);
        assert_eq!(perf.metric_value(Metric::Kappa), 0.7);
        assert!(perf.metric_value(Metric::RootMeanSquaredError).is_nan());
        assert_eq!(perf.metrics().len(), 2);
    }

    #[test]
    fn unreported_metric_reads_as_nan() {
        let result = table(&[(Metric::Accuracy, 0.9)]);
        let perf: Performance =
            Performance::record(point(), Some(&result), &MetricSet::all(), Metric::Kappa, 0);
        assert!(perf.value().is_nan());
        assert_eq!(perf.metric_value(Metric::Accuracy), 0.9);
    }

    #[test]
    fn set_metric_rejects_undeclared_ids() {
        let declared = MetricSet::new([Metric::Accuracy]);
        let mut perf: Performance = Performance::record::<BTreeMap<Metric, f64>>(
            point(),
            None,
            &declared,
            Metric::Accuracy,
            0,
        );
        assert!(!perf.set_metric(Metric::Kappa, 0.5));
        assert!(perf.metric_value(Metric::Kappa).is_nan());
        assert!(perf.set_metric(Metric::Accuracy, 0.8));
        assert_eq!(perf.value(), 0.8);
    }

    struct PerClass;

    impl EvaluationResult for PerClass {
        fn metric(&self, metric: Metric, class_label: usize) -> Option<f64> {
            match metric {
                Metric::FMeasure => Some([0.2, 0.6][class_label]),
                Metric::Accuracy => Some(0.75),
                _ => None,
            }
        }
    }

    #[test]
    fn per_class_metrics_use_class_label() {
        let perf: Performance = Performance::record(
            point(),
            Some(&PerClass),
            &MetricSet::all(),
            Metric::FMeasure,
            1,
        );
        assert_eq!(perf.value(), 0.6);
        assert_eq!(perf.class_label(), 1);
        assert_eq!(perf.metric_value(Metric::Accuracy), 0.75);
    }

    #[test]
    fn clones_are_independent() {
        let result = table(&[(Metric::Accuracy, 0.9)]);
        let original: Performance<String> =
            Performance::record(point(), Some(&result), &MetricSet::all(), Metric::Accuracy, 0)
                .with_model(Some(Arc::new("model".to_string())));
        let mut copy = original.clone();
        copy.set_metric(Metric::Accuracy, 0.1);
        assert_eq!(original.value(), 0.9);
        assert_eq!(copy.value(), 0.1);
        assert!(Arc::ptr_eq(original.model().unwrap(), copy.model().unwrap()));
    }

    #[test]
    fn display_and_serialization() {
        let result = table(&[(Metric::Accuracy, 0.85)]);
        let perf: Performance =
            Performance::record(point(), Some(&result), &MetricSet::all(), Metric::Accuracy, 0)
                .at(4, 1);
        assert_eq!(perf.to_string(), "Performance (c=0.5): 0.85 (ACC)");

        let json = serde_json::to_value(&perf).unwrap();
        assert_eq!(json["ordinal"], 4);
        assert_eq!(json["level"], 1);
        assert_eq!(json["values"]["accuracy"], 0.85);
        assert!(json.get("model").is_none());
    }
}
