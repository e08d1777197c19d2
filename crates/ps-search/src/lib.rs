//! # ps-search
//!
//! Parameter-space search for ParamSweep.
//!
//! Provides parameter domains, cartesian grid enumeration, performance
//! recording and ranking, and a driver that evaluates a grid concurrently and
//! refines it around the best point.

mod cache;
mod cancel;
mod comparator;
mod config;
mod driver;
mod evaluator;
mod events;
mod parameter;
mod performance;
mod point;
mod space;

pub use cache::{CacheStats, PointCache};
pub use cancel::CancelToken;
pub use comparator::{PerformanceComparator, TieBreak};
pub use config::{SearchConfig, SearchId};
pub use driver::{
    LevelSummary, SearchDriver, SearchReport, SearchState, SearchStatus, Selection,
};
pub use evaluator::{Configurable, Evaluation, EvaluationResult, Evaluator};
pub use events::SearchEvent;
pub use parameter::{Domain, Parameter, Scale};
pub use performance::Performance;
pub use point::Point;
pub use space::{GridIter, SpaceGenerator};

pub use ps_types::{
    ConfigureError, DomainError, EvaluationFailure, Metric, MetricSet, ObjectiveDirection,
    ParameterValue, SearchError, SearchResult,
};
