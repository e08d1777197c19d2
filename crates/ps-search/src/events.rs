//! Progress events emitted while a search runs.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::point::Point;

/// Something observable happened during a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchEvent {
    LevelStarted {
        search_id: Uuid,
        level: usize,
        points: usize,
    },
    PointEvaluated {
        search_id: Uuid,
        ordinal: usize,
        point: Point,
        value: f64,
    },
    PointFailed {
        search_id: Uuid,
        ordinal: usize,
        point: Point,
        error: String,
    },
    BestImproved {
        search_id: Uuid,
        ordinal: usize,
        point: Point,
        value: f64,
    },
    LevelCompleted {
        search_id: Uuid,
        level: usize,
        evaluated: usize,
        failed: usize,
        best_value: f64,
    },
    Finished {
        search_id: Uuid,
        evaluated: usize,
        failed: usize,
        found: bool,
    },
}

/// Optional event channel. Sending is best-effort: a dropped receiver never
/// disturbs the search.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<Sender<SearchEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<Sender<SearchEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: SearchEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn sink_without_channel_is_silent() {
        EventSink::default().emit(SearchEvent::Finished {
            search_id: Uuid::new_v4(),
            evaluated: 0,
            failed: 0,
            found: false,
        });
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (tx, rx) = unbounded();
        drop(rx);
        let sink = EventSink::new(Some(tx));
        sink.emit(SearchEvent::LevelStarted {
            search_id: Uuid::new_v4(),
            level: 0,
            points: 3,
        });
    }

    #[test]
    fn events_are_delivered_in_order() {
        let (tx, rx) = unbounded();
        let sink = EventSink::new(Some(tx));
        let id = Uuid::new_v4();
        sink.emit(SearchEvent::LevelStarted {
            search_id: id,
            level: 0,
            points: 2,
        });
        sink.emit(SearchEvent::Finished {
            search_id: id,
            evaluated: 2,
            failed: 0,
            found: true,
        });
        assert!(matches!(rx.try_recv(), Ok(SearchEvent::LevelStarted { points: 2, .. })));
        assert!(matches!(rx.try_recv(), Ok(SearchEvent::Finished { found: true, .. })));
    }
}
