//! Search configuration.

use chrono::{DateTime, Utc};
use ps_types::{config_error, Metric, MetricSet, ObjectiveDirection, SearchResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::comparator::{PerformanceComparator, TieBreak};
use crate::parameter::Parameter;

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Top-level configuration for a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub id: SearchId,
    pub name: String,

    /// Search dimensions, in enumeration order (first varies slowest).
    pub parameters: Vec<Parameter>,

    /// Metric the ranking is based on.
    pub metric: Metric,

    /// Metrics recorded for every performance; must contain `metric`.
    pub metric_set: MetricSet,

    /// Class label for per-class metrics (ignored otherwise).
    pub class_label: usize,

    /// Direction of optimization.
    pub direction: ObjectiveDirection,

    pub tie_break: TieBreak,

    /// How many refinement levels may follow the initial grid.
    pub refinement_iterations: usize,

    /// Fraction of a numeric range kept around the best point when refining.
    pub shrink_factor: f64,

    /// Stop refining once a level improves the best value by less than this.
    pub min_improvement: Option<f64>,

    /// How many evaluations may run at once.
    pub parallelism: usize,

    /// Keep every performance, not just the best one.
    pub retain_history: bool,

    pub created_at: DateTime<Utc>,
}

impl SearchConfig {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parameters,
            metric: Metric::Accuracy,
            metric_set: MetricSet::all(),
            class_label: 0,
            direction: ObjectiveDirection::Maximize,
            tie_break: TieBreak::Simplicity,
            refinement_iterations: 0,
            shrink_factor: 0.5,
            min_improvement: None,
            parallelism: 1,
            retain_history: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_objective(mut self, metric: Metric, direction: ObjectiveDirection) -> Self {
        self.metric = metric;
        self.direction = direction;
        self
    }

    /// Uses the metric's natural direction.
    pub fn with_metric(self, metric: Metric) -> Self {
        self.with_objective(metric, metric.preferred_direction())
    }

    pub fn with_metric_set(mut self, metric_set: MetricSet) -> Self {
        self.metric_set = metric_set;
        self
    }

    pub fn with_class_label(mut self, class_label: usize) -> Self {
        self.class_label = class_label;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_refinement(mut self, iterations: usize, shrink_factor: f64) -> Self {
        self.refinement_iterations = iterations;
        self.shrink_factor = shrink_factor;
        self
    }

    pub fn with_min_improvement(mut self, threshold: f64) -> Self {
        self.min_improvement = Some(threshold);
        self
    }

    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = n;
        self
    }

    pub fn with_history(mut self, retain: bool) -> Self {
        self.retain_history = retain;
        self
    }

    /// Checks the policy settings. Parameter domains are checked when the
    /// space generator is built.
    pub fn validate(&self) -> SearchResult<()> {
        if self.parallelism == 0 {
            return Err(config_error!("parallelism must be at least 1"));
        }
        if !self.metric_set.contains(self.metric) {
            return Err(config_error!(
                "primary metric {} is not part of the declared metric set",
                self.metric
            ));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor <= 1.0) {
            return Err(config_error!(
                "shrink factor must lie in (0, 1], got {}",
                self.shrink_factor
            ));
        }
        if let Some(threshold) = self.min_improvement {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(config_error!(
                    "minimum improvement must be a non-negative number, got {threshold}"
                ));
            }
        }
        Ok(())
    }

    pub fn comparator(&self) -> PerformanceComparator {
        PerformanceComparator::new(self.metric, self.direction)
            .with_tie_break(self.tie_break)
            .with_defaults(&self.parameters)
    }

    pub fn to_json(&self) -> SearchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> SearchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
