//! Total ordering over performances.

use ps_types::{Metric, ObjectiveDirection, ParameterValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::parameter::Parameter;
use crate::performance::Performance;
use crate::point::Point;

/// Secondary rule for performances with equal primary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// Fewer parameters away from their declared default wins, then the
    /// earlier ordinal.
    #[default]
    Simplicity,
    /// Earlier ordinal wins.
    DeclarationOrder,
}

/// Orders performances by one metric and direction.
///
/// `compare(a, b)` returns [`Ordering::Greater`] when `a` is the better of the
/// two. NaN ranks below every real value in both directions. Ties, including
/// two NaNs, fall through to the [`TieBreak`] so that the outcome of a fold
/// never depends on the order results arrive in.
#[derive(Debug, Clone)]
pub struct PerformanceComparator {
    metric: Metric,
    direction: ObjectiveDirection,
    tie_break: TieBreak,
    defaults: Vec<(String, ParameterValue)>,
}

impl PerformanceComparator {
    pub fn new(metric: Metric, direction: ObjectiveDirection) -> Self {
        Self {
            metric,
            direction,
            tie_break: TieBreak::default(),
            defaults: Vec::new(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Takes the declared defaults of `parameters` for the simplicity rule.
    pub fn with_defaults(mut self, parameters: &[Parameter]) -> Self {
        self.defaults = parameters
            .iter()
            .filter_map(|p| {
                p.default_value()
                    .map(|d| (p.name().to_string(), d.clone()))
            })
            .collect();
        self
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn direction(&self) -> ObjectiveDirection {
        self.direction
    }

    /// Compares the designated metric only; two NaNs are equal.
    pub fn compare_primary<M>(&self, a: &Performance<M>, b: &Performance<M>) -> Ordering {
        let (x, y) = (a.metric_value(self.metric), b.metric_value(self.metric));
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match self.direction {
                    ObjectiveDirection::Maximize => ord,
                    ObjectiveDirection::Minimize => ord.reverse(),
                }
            }
        }
    }

    /// Full order: primary metric, then the tie-break.
    pub fn compare<M>(&self, a: &Performance<M>, b: &Performance<M>) -> Ordering {
        self.compare_primary(a, b).then_with(|| match self.tie_break {
            TieBreak::Simplicity => self
                .non_default_count(b.point())
                .cmp(&self.non_default_count(a.point()))
                .then_with(|| b.ordinal().cmp(&a.ordinal())),
            TieBreak::DeclarationOrder => b.ordinal().cmp(&a.ordinal()),
        })
    }

    /// Number of parameters in `point` set to something other than their
    /// declared default. Parameters without a default never count.
    pub fn non_default_count(&self, point: &Point) -> usize {
        self.defaults
            .iter()
            .filter(|(name, default)| point.get(name).is_some_and(|v| v != default))
            .count()
    }

    pub fn is_better<M>(&self, candidate: &Performance<M>, incumbent: &Performance<M>) -> bool {
        self.compare(candidate, incumbent) == Ordering::Greater
    }

    /// Keeps the better of `incumbent` and `candidate`; the flag reports
    /// whether the candidate took over.
    pub fn fold<M>(
        &self,
        incumbent: Option<Performance<M>>,
        candidate: Performance<M>,
    ) -> (Performance<M>, bool) {
        match incumbent {
            Some(current) if !self.is_better(&candidate, &current) => (current, false),
            _ => (candidate, true),
        }
    }

    pub fn best<'a, M>(
        &self,
        performances: impl IntoIterator<Item = &'a Performance<M>>,
    ) -> Option<&'a Performance<M>>
    where
        M: 'a,
    {
        performances.into_iter().max_by(|a, b| self.compare(a, b))
    }

    pub fn sort_best_first<M>(&self, performances: &mut [Performance<M>]) {
        performances.sort_by(|a, b| self.compare(b, a));
    }
}
