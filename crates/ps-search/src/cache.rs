//! Memo of evaluated points, so refinement levels that revisit a point skip
//! it instead of retraining.

use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::point::Point;

/// Concurrent set of [`Point::key`]s that already went through the evaluator.
///
/// A revisited point's first result was ranked when it was recorded, so only
/// its identity needs remembering.
#[derive(Debug, Default)]
pub struct PointCache {
    keys: DashSet<String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `point` was recorded before; counts a hit or a miss.
    pub fn check(&self, point: &Point) -> bool {
        let seen = self.keys.contains(&point.key());
        let counter = if seen { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        seen
    }

    /// Records `point`. Returns `false` if it was already present.
    pub fn insert(&self, point: &Point) -> bool {
        self.keys.insert(point.key())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.keys.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_types::ParameterValue;

    fn point(c: f64) -> Point {
        Point::new(vec![("c".into(), ParameterValue::Float(c))])
    }

    #[test]
    fn lookup_by_point_value() {
        let cache = PointCache::new();
        assert!(cache.insert(&point(0.5)));

        assert!(cache.check(&point(0.5)));
        assert!(!cache.check(&point(0.25)));
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn repeated_insert_is_reported() {
        let cache = PointCache::new();
        assert!(cache.insert(&point(0.5)));
        assert!(!cache.insert(&point(0.5)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn different_types_are_different_points() {
        let cache = PointCache::new();
        cache.insert(&Point::new(vec![("c".into(), ParameterValue::Int(1))]));
        assert!(!cache.check(&point(1.0)));
    }
}
