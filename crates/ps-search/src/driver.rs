//! Search orchestration: generate points, evaluate them, rank the results and
//! optionally refine around the best point.

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use ps_types::{EvaluationFailure, ObjectiveDirection, SearchError, SearchResult};
use rayon::iter::{ParallelBridge, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, PointCache};
use crate::cancel::CancelToken;
use crate::comparator::PerformanceComparator;
use crate::config::{SearchConfig, SearchId};
use crate::evaluator::Evaluator;
use crate::events::{EventSink, SearchEvent};
use crate::performance::Performance;
use crate::point::Point;
use crate::space::SpaceGenerator;

/// Lifecycle state of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchState {
    Idle,
    Generating,
    Evaluating,
    Ranking,
    Refining,
    Done,
}

/// How a finished search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchStatus {
    /// Every planned level ran, or refinement ended on its own terms.
    Completed,
    /// A graceful stop skipped the remaining levels.
    Stopped,
    /// A hard cancel abandoned the level in flight.
    Cancelled,
}

/// The configuration the search settled on.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "")]
pub enum Selection<M> {
    Found(Performance<M>),
    /// Nothing completed, or every completed point lacks a primary metric
    /// value.
    NoValidConfiguration,
}

/// Per-level bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: usize,
    pub points: usize,
    /// Points scored by the evaluator in this level.
    pub evaluated: usize,
    /// Points whose evaluation or configuration failed.
    pub failed: usize,
    /// Points already scored by an earlier level.
    pub cached: usize,
    /// Points skipped or discarded because of a hard cancel.
    pub skipped: usize,
    /// Best primary value after this level (NaN if nothing valid yet).
    pub best_value: f64,
}

/// Outcome of a search run.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "")]
pub struct SearchReport<M> {
    pub id: SearchId,
    pub name: String,
    pub status: SearchStatus,
    pub selection: Selection<M>,
    /// Every ranked performance in ordinal order, when history was requested.
    pub history: Vec<Performance<M>>,
    pub levels: Vec<LevelSummary>,
    pub evaluated: usize,
    pub failed: usize,
    pub cache: CacheStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<M> SearchReport<M> {
    pub fn best(&self) -> Option<&Performance<M>> {
        match &self.selection {
            Selection::Found(best) => Some(best),
            Selection::NoValidConfiguration => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self.selection, Selection::Found(_))
    }
}

/// State shared by the workers of one run; only touched under the lock.
struct Ranking<M> {
    best: Option<Performance<M>>,
    history: Vec<Performance<M>>,
    tally: LevelSummary,
}

/// Runs a grid search, with optional coarse-to-fine refinement, against an
/// [`Evaluator`].
///
/// Points of one level are evaluated concurrently on a pool of
/// `config.parallelism` threads. A level only starts once the previous one
/// has been fully ranked, since its grid is centered on that level's best.
pub struct SearchDriver<E: Evaluator> {
    config: SearchConfig,
    space: SpaceGenerator,
    comparator: PerformanceComparator,
    evaluator: E,
    base: E::Config,
    state: RwLock<SearchState>,
    cancel: CancelToken,
    events: EventSink,
}

impl<E: Evaluator> SearchDriver<E> {
    /// Validates the configuration and the parameter space. Nothing is
    /// evaluated if this fails.
    pub fn new(config: SearchConfig, evaluator: E, base: E::Config) -> SearchResult<Self> {
        config.validate()?;
        let space = SpaceGenerator::generate(config.parameters.clone())?;
        let comparator = config.comparator();
        Ok(Self {
            config,
            space,
            comparator,
            evaluator,
            base,
            state: RwLock::new(SearchState::Idle),
            cancel: CancelToken::new(),
            events: EventSink::default(),
        })
    }

    pub fn with_events(mut self, tx: Sender<SearchEvent>) -> Self {
        self.events = EventSink::new(Some(tx));
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn space(&self) -> &SpaceGenerator {
        &self.space
    }

    pub fn state(&self) -> SearchState {
        *self.state.read()
    }

    fn transition(&self, next: SearchState) {
        let mut state = self.state.write();
        debug!(search = %self.config.name, from = ?*state, to = ?next, "state transition");
        *state = next;
    }

    /// Runs the search to completion, cancellation or the end of refinement.
    ///
    /// Per-point failures never abort the run; only a thread pool that
    /// cannot be built does.
    pub fn run(&self, data: &E::Data) -> SearchResult<SearchReport<E::Model>> {
        let started_at = Utc::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallelism)
            .thread_name(|i| format!("ps-worker-{i}"))
            .build()
            .map_err(|e| SearchError::ThreadPool(e.to_string()))?;

        let cache = PointCache::new();
        let ranking = Mutex::new(Ranking {
            best: None,
            history: Vec::new(),
            tally: empty_summary(0, 0),
        });

        let mut space = self.space.clone();
        let mut levels: Vec<LevelSummary> = Vec::new();
        let mut next_ordinal = 0usize;
        let mut status = SearchStatus::Completed;

        info!(
            search = %self.config.name,
            id = %self.config.id,
            points = space.len(),
            parallelism = self.config.parallelism,
            refinements = self.config.refinement_iterations,
            "starting search"
        );

        for level in 0..=self.config.refinement_iterations {
            self.transition(SearchState::Generating);
            ranking.lock().tally = empty_summary(level, space.len());
            self.events.emit(SearchEvent::LevelStarted {
                search_id: self.config.id,
                level,
                points: space.len(),
            });
            info!(search = %self.config.name, level, points = space.len(), "starting level");

            self.transition(SearchState::Evaluating);
            let base_ordinal = next_ordinal;
            let level_space = &space;
            pool.install(|| {
                level_space
                    .iter()
                    .enumerate()
                    .par_bridge()
                    .for_each(|(i, point)| {
                        self.visit(level_space, level, base_ordinal + i, point, data, &cache, &ranking)
                    });
            });
            next_ordinal += space.len();

            self.transition(SearchState::Ranking);
            let summary = {
                let mut guard = ranking.lock();
                guard.tally.best_value = guard.best.as_ref().map_or(f64::NAN, Performance::value);
                guard.tally.clone()
            };
            info!(
                search = %self.config.name,
                level,
                evaluated = summary.evaluated,
                failed = summary.failed,
                cached = summary.cached,
                skipped = summary.skipped,
                best = summary.best_value,
                "level completed"
            );
            self.events.emit(SearchEvent::LevelCompleted {
                search_id: self.config.id,
                level,
                evaluated: summary.evaluated,
                failed: summary.failed,
                best_value: summary.best_value,
            });
            let previous_best = levels.last().map(|l| l.best_value);
            levels.push(summary);

            if self.cancel.is_cancelled() {
                status = SearchStatus::Cancelled;
                break;
            }
            if level == self.config.refinement_iterations {
                break;
            }

            self.transition(SearchState::Refining);
            if self.cancel.is_stop_requested() {
                status = SearchStatus::Stopped;
                break;
            }
            let center = {
                let guard = ranking.lock();
                match guard.best.as_ref() {
                    Some(best) if best.is_valid() => (best.point().clone(), best.value()),
                    _ => {
                        info!(search = %self.config.name, "no valid point to refine around");
                        break;
                    }
                }
            };
            match self.next_level(&space, &center, previous_best) {
                Some(refined) => space = refined,
                None => break,
            }
        }

        self.transition(SearchState::Done);

        let Ranking { best, mut history, .. } = ranking.into_inner();
        history.sort_by_key(Performance::ordinal);
        let selection = match best {
            Some(best) if best.is_valid() => Selection::Found(best),
            _ => Selection::NoValidConfiguration,
        };
        let evaluated: usize = levels.iter().map(|l| l.evaluated).sum();
        let failed: usize = levels.iter().map(|l| l.failed).sum();

        match &selection {
            Selection::Found(best) => info!(
                search = %self.config.name,
                evaluated,
                failed,
                status = ?status,
                "selected {best}"
            ),
            Selection::NoValidConfiguration => warn!(
                search = %self.config.name,
                evaluated,
                failed,
                status = ?status,
                "no valid configuration found"
            ),
        }
        self.events.emit(SearchEvent::Finished {
            search_id: self.config.id,
            evaluated,
            failed,
            found: matches!(selection, Selection::Found(_)),
        });

        Ok(SearchReport {
            id: self.config.id,
            name: self.config.name.clone(),
            status,
            selection,
            history,
            levels,
            evaluated,
            failed,
            cache: cache.stats(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Decides whether to refine around `center` and builds the next grid.
    fn next_level(
        &self,
        space: &SpaceGenerator,
        (center, value): &(Point, f64),
        previous_best: Option<f64>,
    ) -> Option<SpaceGenerator> {
        if let (Some(threshold), Some(previous)) = (self.config.min_improvement, previous_best) {
            if !previous.is_nan() {
                let gain = match self.config.direction {
                    ObjectiveDirection::Maximize => value - previous,
                    ObjectiveDirection::Minimize => previous - value,
                };
                if gain < threshold {
                    info!(search = %self.config.name, gain, threshold, "improvement below threshold");
                    return None;
                }
            }
        }
        if !space.is_interior(center) {
            info!(search = %self.config.name, %center, "best point is not interior, nothing to refine");
            return None;
        }
        match space.refine(center, self.config.shrink_factor) {
            Ok(refined) => {
                debug!(search = %self.config.name, %center, points = refined.len(), "refined grid");
                Some(refined)
            }
            Err(e) => {
                warn!(search = %self.config.name, %center, error = %e, "refinement failed");
                None
            }
        }
    }

    /// Evaluates one point and folds the result into the ranking.
    #[allow(clippy::too_many_arguments)]
    fn visit(
        &self,
        space: &SpaceGenerator,
        level: usize,
        ordinal: usize,
        point: Point,
        data: &E::Data,
        cache: &PointCache,
        ranking: &Mutex<Ranking<E::Model>>,
    ) {
        if self.cancel.is_cancelled() {
            ranking.lock().tally.skipped += 1;
            return;
        }
        if cache.check(&point) {
            debug!(search = %self.config.name, ordinal, %point, "already evaluated");
            ranking.lock().tally.cached += 1;
            return;
        }

        let outcome = point
            .apply_to(space.parameters(), &self.base)
            .map_err(EvaluationFailure::from)
            .and_then(|config| self.evaluator.evaluate(&config, data));

        let performance = match outcome {
            Ok(evaluation) => Performance::record(
                point,
                Some(&evaluation.result),
                &self.config.metric_set,
                self.config.metric,
                self.config.class_label,
            )
            .with_model(evaluation.model),
            Err(failure) => {
                warn!(search = %self.config.name, ordinal, %point, error = %failure, "evaluation failed");
                Performance::failed(
                    point,
                    &failure,
                    &self.config.metric_set,
                    self.config.metric,
                    self.config.class_label,
                )
            }
        }
        .at(ordinal, level);

        if self.cancel.is_cancelled() {
            ranking.lock().tally.skipped += 1;
            return;
        }
        cache.insert(performance.point());

        match performance.failure() {
            Some(error) => self.events.emit(SearchEvent::PointFailed {
                search_id: self.config.id,
                ordinal,
                point: performance.point().clone(),
                error: error.to_string(),
            }),
            None => {
                debug!(
                    search = %self.config.name,
                    ordinal,
                    point = %performance.point(),
                    value = performance.value(),
                    "evaluated"
                );
                self.events.emit(SearchEvent::PointEvaluated {
                    search_id: self.config.id,
                    ordinal,
                    point: performance.point().clone(),
                    value: performance.value(),
                });
            }
        }

        let mut guard = ranking.lock();
        if performance.failure().is_some() {
            guard.tally.failed += 1;
        } else {
            guard.tally.evaluated += 1;
        }
        if self.config.retain_history {
            guard.history.push(performance.clone());
        }
        let (best, improved) = self.comparator.fold(guard.best.take(), performance);
        if improved && best.is_valid() {
            self.events.emit(SearchEvent::BestImproved {
                search_id: self.config.id,
                ordinal: best.ordinal(),
                point: best.point().clone(),
                value: best.value(),
            });
        }
        guard.best = Some(best);
    }
}

fn empty_summary(level: usize, points: usize) -> LevelSummary {
    LevelSummary {
        level,
        points,
        evaluated: 0,
        failed: 0,
        cached: 0,
        skipped: 0,
        best_value: f64::NAN,
    }
}
