//! Metric identifiers, declared metric sets and optimization direction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

/// A named quality measure reported by an evaluator.
///
/// The search never computes these; it only stores and compares the values an
/// evaluator reports for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Correlation coefficient.
    Correlation,
    RootMeanSquaredError,
    RootRelativeSquaredError,
    MeanAbsoluteError,
    RelativeAbsoluteError,
    /// `(1 - |CC|) + RRSE + RAE`, all fractions.
    Combined,
    Accuracy,
    Kappa,
    Precision,
    WeightedPrecision,
    Recall,
    WeightedRecall,
    AreaUnderRoc,
    WeightedAreaUnderRoc,
    AreaUnderPrc,
    WeightedAreaUnderPrc,
    FMeasure,
    WeightedFMeasure,
    TruePositiveRate,
    TrueNegativeRate,
    FalsePositiveRate,
    FalseNegativeRate,
    MatthewsCorrelation,
    WeightedMatthewsCorrelation,
}

impl Metric {
    pub const ALL: [Metric; 24] = [
        Metric::Correlation,
        Metric::RootMeanSquaredError,
        Metric::RootRelativeSquaredError,
        Metric::MeanAbsoluteError,
        Metric::RelativeAbsoluteError,
        Metric::Combined,
        Metric::Accuracy,
        Metric::Kappa,
        Metric::Precision,
        Metric::WeightedPrecision,
        Metric::Recall,
        Metric::WeightedRecall,
        Metric::AreaUnderRoc,
        Metric::WeightedAreaUnderRoc,
        Metric::AreaUnderPrc,
        Metric::WeightedAreaUnderPrc,
        Metric::FMeasure,
        Metric::WeightedFMeasure,
        Metric::TruePositiveRate,
        Metric::TrueNegativeRate,
        Metric::FalsePositiveRate,
        Metric::FalseNegativeRate,
        Metric::MatthewsCorrelation,
        Metric::WeightedMatthewsCorrelation,
    ];

    /// Short identifier, e.g. `ACC` or `RMSE`.
    pub fn short_name(self) -> &'static str {
        match self {
            Metric::Correlation => "CC",
            Metric::RootMeanSquaredError => "RMSE",
            Metric::RootRelativeSquaredError => "RRSE",
            Metric::MeanAbsoluteError => "MAE",
            Metric::RelativeAbsoluteError => "RAE",
            Metric::Combined => "COMB",
            Metric::Accuracy => "ACC",
            Metric::Kappa => "KAP",
            Metric::Precision => "PREC",
            Metric::WeightedPrecision => "WPREC",
            Metric::Recall => "REC",
            Metric::WeightedRecall => "WREC",
            Metric::AreaUnderRoc => "AUC",
            Metric::WeightedAreaUnderRoc => "WAUC",
            Metric::AreaUnderPrc => "PRC",
            Metric::WeightedAreaUnderPrc => "WPRC",
            Metric::FMeasure => "FM",
            Metric::WeightedFMeasure => "WFM",
            Metric::TruePositiveRate => "TPR",
            Metric::TrueNegativeRate => "TNR",
            Metric::FalsePositiveRate => "FPR",
            Metric::FalseNegativeRate => "FNR",
            Metric::MatthewsCorrelation => "MCC",
            Metric::WeightedMatthewsCorrelation => "WMCC",
        }
    }

    /// Metrics evaluated for one class label rather than the whole dataset.
    pub fn is_per_class(self) -> bool {
        matches!(
            self,
            Metric::Precision
                | Metric::Recall
                | Metric::AreaUnderRoc
                | Metric::AreaUnderPrc
                | Metric::FMeasure
                | Metric::TruePositiveRate
                | Metric::TrueNegativeRate
                | Metric::FalsePositiveRate
                | Metric::FalseNegativeRate
                | Metric::MatthewsCorrelation
        )
    }

    /// Natural optimization direction (errors and false rates are minimized).
    pub fn preferred_direction(self) -> ObjectiveDirection {
        match self {
            Metric::RootMeanSquaredError
            | Metric::RootRelativeSquaredError
            | Metric::MeanAbsoluteError
            | Metric::RelativeAbsoluteError
            | Metric::Combined
            | Metric::FalsePositiveRate
            | Metric::FalseNegativeRate => ObjectiveDirection::Minimize,
            _ => ObjectiveDirection::Maximize,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Error returned when parsing an unknown metric name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// The set of metrics a search is configured to track.
///
/// Performances only ever store values for metrics in this set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet {
    metrics: BTreeSet<Metric>,
}

impl MetricSet {
    pub fn new(metrics: impl IntoIterator<Item = Metric>) -> Self {
        Self {
            metrics: metrics.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new(Metric::ALL)
    }

    pub fn classification() -> Self {
        Self::new(Metric::ALL.into_iter().filter(|m| {
            !matches!(
                m,
                Metric::Correlation
                    | Metric::RootMeanSquaredError
                    | Metric::RootRelativeSquaredError
                    | Metric::MeanAbsoluteError
                    | Metric::RelativeAbsoluteError
                    | Metric::Combined
            )
        }))
    }

    pub fn regression() -> Self {
        Self::new([
            Metric::Correlation,
            Metric::RootMeanSquaredError,
            Metric::RootRelativeSquaredError,
            Metric::MeanAbsoluteError,
            Metric::RelativeAbsoluteError,
            Metric::Combined,
        ])
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        self.metrics.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Metric> for MetricSet {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_names() {
        assert_eq!("acc".parse::<Metric>(), Ok(Metric::Accuracy));
        assert_eq!("RMSE".parse::<Metric>(), Ok(Metric::RootMeanSquaredError));
        assert!("bogus".parse::<Metric>().is_err());
    }

    #[test]
    fn error_metrics_are_minimized() {
        assert_eq!(
            Metric::MeanAbsoluteError.preferred_direction(),
            ObjectiveDirection::Minimize
        );
        assert_eq!(Metric::Accuracy.preferred_direction(), ObjectiveDirection::Maximize);
    }

    #[test]
    fn presets_partition_all_metrics() {
        let classification = MetricSet::classification();
        let regression = MetricSet::regression();
        assert_eq!(classification.len() + regression.len(), Metric::ALL.len());
        assert!(regression.iter().all(|m| !classification.contains(m)));
    }

    #[test]
    fn metric_set_serializes_as_list() {
        let set = MetricSet::new([Metric::Kappa, Metric::Accuracy]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["accuracy","kappa"]"#);
        let back: MetricSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn f_measure_is_per_class() {
        assert!(Metric::FMeasure.is_per_class());
        assert!(!Metric::WeightedFMeasure.is_per_class());
    }
}
