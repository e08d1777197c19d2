//! Collaborator seams: the target configuration a point is applied to, and
//! the evaluator that scores it.

use ps_types::{ConfigureError, EvaluationFailure, Metric, ParameterValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// An opaque bag of named settings that parameter values are written into.
///
/// This is the only place the search touches the trainable model's
/// configuration surface.
pub trait Configurable: Clone + Send + Sync {
    fn set_parameter(&mut self, property: &str, value: &ParameterValue)
        -> Result<(), ConfigureError>;
}

/// JSON objects accept dotted property paths (`"kernel.gamma"`), creating
/// intermediate objects as needed.
impl Configurable for serde_json::Value {
    fn set_parameter(
        &mut self,
        property: &str,
        value: &ParameterValue,
    ) -> Result<(), ConfigureError> {
        let mut segments = property.split('.').peekable();
        let mut node = self;

        while let Some(segment) = segments.next() {
            if segment.is_empty() {
                return Err(ConfigureError::UnknownSetting {
                    property: property.to_string(),
                });
            }
            let object = node.as_object_mut().ok_or(ConfigureError::NotAnObject)?;
            if segments.peek().is_none() {
                object.insert(segment.to_string(), value.to_json());
                return Ok(());
            }
            node = object
                .entry(segment.to_string())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        }

        Err(ConfigureError::UnknownSetting {
            property: property.to_string(),
        })
    }
}

impl Configurable for HashMap<String, ParameterValue> {
    fn set_parameter(
        &mut self,
        property: &str,
        value: &ParameterValue,
    ) -> Result<(), ConfigureError> {
        self.insert(property.to_string(), value.clone());
        Ok(())
    }
}

/// Metric lookups exposed by a finished evaluation.
pub trait EvaluationResult {
    /// Value of `metric`; per-class metrics are evaluated for `class_label`.
    /// `None` when the evaluation cannot report the metric.
    fn metric(&self, metric: Metric, class_label: usize) -> Option<f64>;
}

/// Flat metric tables ignore the class label.
impl EvaluationResult for BTreeMap<Metric, f64> {
    fn metric(&self, metric: Metric, _class_label: usize) -> Option<f64> {
        self.get(&metric).copied()
    }
}

impl EvaluationResult for HashMap<Metric, f64> {
    fn metric(&self, metric: Metric, _class_label: usize) -> Option<f64> {
        self.get(&metric).copied()
    }
}

/// Successful evaluation: the metric source plus, optionally, the model it
/// trained. The model stays owned by whoever holds the `Arc`.
#[derive(Debug)]
pub struct Evaluation<R, M> {
    pub result: R,
    pub model: Option<Arc<M>>,
}

impl<R, M> Evaluation<R, M> {
    pub fn new(result: R) -> Self {
        Self {
            result,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Arc<M>) -> Self {
        self.model = Some(model);
        self
    }
}

/// Trains and scores one materialized configuration.
///
/// Implementations must be callable from several worker threads at once.
pub trait Evaluator: Sync {
    /// Configuration the search points are applied to.
    type Config: Configurable;
    /// Dataset handle passed through untouched.
    type Data: ?Sized + Sync;
    type Result: EvaluationResult;
    type Model: Send + Sync;

    fn evaluate(
        &self,
        config: &Self::Config,
        data: &Self::Data,
    ) -> Result<Evaluation<Self::Result, Self::Model>, EvaluationFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_target_sets_top_level_setting() {
        let mut config = json!({"kernel": "rbf"});
        config
            .set_parameter("C", &ParameterValue::Float(0.5))
            .unwrap();
        assert_eq!(config, json!({"kernel": "rbf", "C": 0.5}));
    }

    #[test]
    fn json_target_follows_dotted_paths() {
        let mut config = json!({"kernel": {"type": "rbf"}});
        config
            .set_parameter("kernel.gamma", &ParameterValue::Float(0.01))
            .unwrap();
        config
            .set_parameter("filter.bins", &ParameterValue::Int(10))
            .unwrap();
        assert_eq!(
            config,
            json!({"kernel": {"type": "rbf", "gamma": 0.01}, "filter": {"bins": 10}})
        );
    }

    #[test]
    fn json_target_rejects_non_objects() {
        let mut config = json!({"kernel": "rbf"});
        let err = config
            .set_parameter("kernel.gamma", &ParameterValue::Float(0.01))
            .unwrap_err();
        assert_eq!(err, ConfigureError::NotAnObject);

        let err = json!({})
            .set_parameter("a..b", &ParameterValue::Int(1))
            .unwrap_err();
        assert!(matches!(err, ConfigureError::UnknownSetting { .. }));
    }

    #[test]
    fn metric_table_ignores_class_label() {
        let table: BTreeMap<Metric, f64> = [(Metric::Accuracy, 0.9)].into_iter().collect();
        assert_eq!(table.metric(Metric::Accuracy, 3), Some(0.9));
        assert_eq!(table.metric(Metric::Kappa, 0), None);
    }
}
