//! Lazy cartesian-product enumeration of a search space and coarse-to-fine
//! refinement.

use ps_types::{config_error, DomainError, SearchError, SearchResult};
use std::collections::HashSet;
use std::iter::FusedIterator;

use crate::parameter::{Parameter, TOLERANCE};
use crate::point::Point;

/// Enumerates every point of the grid spanned by a parameter set.
///
/// Only the size of each axis is kept; values are computed as points are
/// produced, so a long axis costs nothing until it is walked. The first
/// parameter varies slowest and the last fastest, i.e. points come out in
/// lexicographic order of their index tuples. [`SpaceGenerator::iter`] can be
/// called any number of times; each call restarts from the first point.
#[derive(Debug, Clone)]
pub struct SpaceGenerator {
    parameters: Vec<Parameter>,
    sizes: Vec<usize>,
    len: usize,
}

impl SpaceGenerator {
    /// Validates `parameters` and prepares the grid.
    pub fn generate(parameters: Vec<Parameter>) -> SearchResult<Self> {
        if parameters.is_empty() {
            return Err(config_error!("search space has no parameters"));
        }

        {
            let mut seen = HashSet::new();
            if let Some(duplicate) = parameters.iter().find(|p| !seen.insert(p.name())) {
                return Err(DomainError::DuplicateName {
                    parameter: duplicate.name().to_string(),
                }
                .into());
            }
        }

        let mut len: usize = 1;
        let mut sizes = Vec::with_capacity(parameters.len());
        for parameter in &parameters {
            let size = parameter.size().map_err(|e| match e {
                DomainError::TooManyValues { .. } => SearchError::SpaceTooLarge,
                e => e.into(),
            })?;
            if size == 0 {
                return Err(SearchError::EmptySpace {
                    parameter: parameter.name().to_string(),
                });
            }
            len = len.checked_mul(size).ok_or(SearchError::SpaceTooLarge)?;
            sizes.push(size);
        }

        Ok(Self {
            parameters,
            sizes,
            len,
        })
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Total number of points: the product of every parameter's size.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            space: self,
            indices: vec![0; self.sizes.len()],
            remaining: self.len,
        }
    }

    /// Point at flat position `index` of the enumeration order.
    pub fn point_at(&self, index: usize) -> Option<Point> {
        if index >= self.len {
            return None;
        }
        let mut indices = vec![0; self.sizes.len()];
        let mut rest = index;
        for (slot, &size) in indices.iter_mut().zip(&self.sizes).rev() {
            *slot = rest % size;
            rest /= size;
        }
        Some(self.point_from(&indices))
    }

    fn point_from(&self, indices: &[usize]) -> Point {
        Point::new(
            self.parameters
                .iter()
                .zip(indices)
                .map(|(parameter, &i)| (parameter.name().to_string(), parameter.nth(i)))
                .collect(),
        )
    }

    /// Builds a narrower grid around `center`; see [`Parameter::refine`].
    pub fn refine(&self, center: &Point, shrink_factor: f64) -> SearchResult<Self> {
        center.validate(&self.parameters)?;
        let refined = self
            .parameters
            .iter()
            .zip(center.iter())
            .map(|(parameter, (_, value))| parameter.refine(value, shrink_factor))
            .collect::<Result<Vec<_>, _>>()?;
        Self::generate(refined)
    }

    /// Whether refining around `point` can still narrow something.
    ///
    /// True when at least one numeric dimension spans more than one value and
    /// `point` sits strictly inside the bounds of every such dimension.
    pub fn is_interior(&self, point: &Point) -> bool {
        let mut spanning = 0;
        for ((parameter, &size), (_, value)) in
            self.parameters.iter().zip(&self.sizes).zip(point.iter())
        {
            let Some((lower, upper)) = parameter.bounds() else {
                continue;
            };
            if size < 2 {
                continue;
            }
            spanning += 1;
            let slack = TOLERANCE * (upper - lower).max(1.0);
            match value.as_f64() {
                Some(v) if v > lower + slack && v < upper - slack => {}
                _ => return false,
            }
        }
        spanning > 0
    }
}

impl<'a> IntoIterator for &'a SpaceGenerator {
    type Item = Point;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Odometer over the grid's index tuples.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    space: &'a SpaceGenerator,
    indices: Vec<usize>,
    remaining: usize,
}

impl Iterator for GridIter<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.remaining == 0 {
            return None;
        }
        let point = self.space.point_from(&self.indices);
        self.remaining -= 1;

        for (slot, &size) in self.indices.iter_mut().zip(&self.space.sizes).rev() {
            *slot += 1;
            if *slot < size {
                break;
            }
            *slot = 0;
        }
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

impl FusedIterator for GridIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_types::ParameterValue;

    fn values(points: &[Point]) -> Vec<Vec<String>> {
        points
            .iter()
            .map(|p| p.iter().map(|(_, v)| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn single_dimension_order() {
        let space = SpaceGenerator::generate(vec![Parameter::discrete("x", [1, 2, 3]).unwrap()])
            .unwrap();
        let points: Vec<Point> = space.iter().collect();
        assert_eq!(values(&points), vec![vec!["1"], vec!["2"], vec!["3"]]);
    }

    #[test]
    fn first_dimension_varies_slowest() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("letter", ["A", "B"]).unwrap(),
            Parameter::discrete("digit", [1, 2, 3]).unwrap(),
        ])
        .unwrap();
        let points: Vec<Point> = space.iter().collect();
        assert_eq!(
            values(&points),
            vec![
                vec!["A", "1"],
                vec!["A", "2"],
                vec!["A", "3"],
                vec!["B", "1"],
                vec!["B", "2"],
                vec!["B", "3"],
            ]
        );
    }

    #[test]
    fn yields_product_of_sizes_without_duplicates() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("a", [1, 2]).unwrap(),
            Parameter::linear("b", 0.0, 1.0, 0.25).unwrap(),
            Parameter::log("c", 1.0, 1000.0, 1.0, 10.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(space.len(), 2 * 5 * 4);

        let points: Vec<Point> = space.iter().collect();
        assert_eq!(points.len(), 40);
        assert!(points.iter().all(|p| p.len() == 3));
        let keys: HashSet<String> = points.iter().map(Point::key).collect();
        assert_eq!(keys.len(), 40);
        assert!(points.iter().all(|p| p.validate(space.parameters()).is_ok()));
    }

    #[test]
    fn iteration_is_restartable_and_exact_sized() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("a", [1, 2]).unwrap(),
            Parameter::discrete("b", [3, 4]).unwrap(),
        ])
        .unwrap();
        let mut iter = space.iter();
        assert_eq!(iter.len(), 4);
        iter.next();
        assert_eq!(iter.len(), 3);

        let first: Vec<Point> = space.iter().collect();
        let second: Vec<Point> = (&space).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn point_at_matches_iteration_order() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("a", [1, 2, 3]).unwrap(),
            Parameter::discrete("b", ["x", "y"]).unwrap(),
        ])
        .unwrap();
        for (i, point) in space.iter().enumerate() {
            assert_eq!(space.point_at(i), Some(point));
        }
        assert!(space.point_at(6).is_none());
    }

    #[test]
    fn empty_dimension_is_rejected() {
        let err = SpaceGenerator::generate(vec![
            Parameter::discrete("a", [1, 2]).unwrap(),
            Parameter::discrete("b", Vec::<i64>::new()).unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(err, SearchError::EmptySpace { ref parameter } if parameter == "b"));
    }

    #[test]
    fn duplicate_names_and_empty_sets_are_rejected() {
        let err = SpaceGenerator::generate(vec![
            Parameter::discrete("a", [1]).unwrap(),
            Parameter::discrete("a", [2]).unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            SearchError::InvalidDomain(DomainError::DuplicateName { .. })
        ));
        assert!(matches!(
            SpaceGenerator::generate(Vec::new()),
            Err(SearchError::Config(_))
        ));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let wide = |name: &str| Parameter::linear(name, 0.0, 1e12, 1.0).unwrap();
        let err = SpaceGenerator::generate(vec![wide("a"), wide("b")]).unwrap_err();
        assert!(matches!(err, SearchError::SpaceTooLarge));
    }

    #[test]
    fn uncountable_axis_is_rejected() {
        let tiny = Parameter::linear("x", 0.0, 1.0, 1e-20).unwrap();
        assert!(matches!(
            SpaceGenerator::generate(vec![tiny]),
            Err(SearchError::SpaceTooLarge)
        ));

        let log = Parameter::log("c", 0.001, 1000.0, 1e-20, 10.0).unwrap();
        let err = SpaceGenerator::generate(vec![Parameter::discrete("k", [1]).unwrap(), log])
            .unwrap_err();
        assert!(matches!(err, SearchError::SpaceTooLarge));
    }

    #[test]
    fn long_axis_is_enumerated_lazily() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("k", ["a", "b"]).unwrap(),
            Parameter::linear("x", 0.0, 1e10, 1.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(space.len(), 2 * 10_000_000_001);

        let head: Vec<Point> = space.iter().take(3).collect();
        assert_eq!(values(&head), vec![vec!["a", "0"], vec!["a", "1"], vec!["a", "2"]]);

        let last = space.point_at(space.len() - 1).unwrap();
        assert_eq!(last.get("k"), Some(&ParameterValue::from("b")));
        assert_eq!(last.get("x"), Some(&ParameterValue::Float(1e10)));
    }

    #[test]
    fn refine_narrows_numeric_and_keeps_discrete() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("kernel", ["rbf", "linear"]).unwrap(),
            Parameter::linear("c", 0.0, 10.0, 1.0).unwrap(),
        ])
        .unwrap();
        let center = Point::new(vec![
            ("kernel".into(), ParameterValue::from("linear")),
            ("c".into(), ParameterValue::Float(6.0)),
        ]);
        let refined = space.refine(&center, 0.5).unwrap();
        assert_eq!(refined.parameters()[0], space.parameters()[0]);
        assert_eq!(refined.parameters()[1].bounds(), Some((3.5, 8.5)));
        assert_eq!(refined.len(), 2 * 11);
    }

    #[test]
    fn refine_rejects_foreign_points() {
        let space =
            SpaceGenerator::generate(vec![Parameter::linear("c", 0.0, 10.0, 1.0).unwrap()])
                .unwrap();
        let stranger = Point::new(vec![("gamma".into(), ParameterValue::Float(1.0))]);
        assert!(matches!(
            space.refine(&stranger, 0.5),
            Err(SearchError::InvalidDomain(DomainError::NameMismatch { .. }))
        ));
    }

    #[test]
    fn interior_detection() {
        let space = SpaceGenerator::generate(vec![
            Parameter::discrete("kernel", ["rbf", "linear"]).unwrap(),
            Parameter::linear("c", 0.0, 10.0, 1.0).unwrap(),
        ])
        .unwrap();
        let at = |c: f64| {
            Point::new(vec![
                ("kernel".into(), ParameterValue::from("rbf")),
                ("c".into(), ParameterValue::Float(c)),
            ])
        };
        assert!(space.is_interior(&at(6.0)));
        assert!(!space.is_interior(&at(0.0)));
        assert!(!space.is_interior(&at(10.0)));

        let discrete_only =
            SpaceGenerator::generate(vec![Parameter::discrete("k", [1, 2, 3]).unwrap()]).unwrap();
        let p = discrete_only.point_at(1).unwrap();
        assert!(!discrete_only.is_interior(&p));
    }
}
