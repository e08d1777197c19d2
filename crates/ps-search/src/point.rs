//! One concrete assignment of values across all search dimensions.

use ps_types::{ConfigureError, DomainError, ParameterValue};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::evaluator::Configurable;
use crate::parameter::Parameter;

/// Ordered `(parameter name, value)` pairs, in parameter declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    values: Vec<(String, ParameterValue)>,
}

impl Point {
    pub fn new(values: Vec<(String, ParameterValue)>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn value(&self, position: usize) -> Option<&ParameterValue> {
        self.values.get(position).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Stable textual identity, used to recognise a point that an earlier
    /// refinement level already evaluated.
    pub fn key(&self) -> String {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(name, value)| format!("{name}={value:?}"))
            .collect();
        parts.join(";")
    }

    /// Checks arity, name order and domain membership against `parameters`.
    pub fn validate(&self, parameters: &[Parameter]) -> Result<(), DomainError> {
        if self.values.len() != parameters.len() {
            return Err(DomainError::ArityMismatch {
                expected: parameters.len(),
                actual: self.values.len(),
            });
        }
        for (position, ((name, value), parameter)) in
            self.values.iter().zip(parameters).enumerate()
        {
            if name != parameter.name() {
                return Err(DomainError::NameMismatch {
                    position,
                    expected: parameter.name().to_string(),
                    actual: name.clone(),
                });
            }
            if !parameter.contains(value) {
                return Err(DomainError::OutOfDomain {
                    parameter: name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Copies `base` and writes every value of this point into the copy.
    pub fn apply_to<C: Configurable>(
        &self,
        parameters: &[Parameter],
        base: &C,
    ) -> Result<C, ConfigureError> {
        let mut config = base.clone();
        for (parameter, (_, value)) in parameters.iter().zip(&self.values) {
            parameter.apply(value, &mut config)?;
        }
        Ok(config)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Vec<Parameter> {
        vec![
            Parameter::discrete("kernel", ["rbf", "linear"]).unwrap(),
            Parameter::linear("c", 0.0, 1.0, 0.25).unwrap(),
        ]
    }

    fn point(kernel: &str, c: f64) -> Point {
        Point::new(vec![
            ("kernel".into(), ParameterValue::from(kernel)),
            ("c".into(), ParameterValue::Float(c)),
        ])
    }

    #[test]
    fn display_and_lookup() {
        let p = point("rbf", 0.5);
        assert_eq!(p.to_string(), "(kernel=rbf, c=0.5)");
        assert_eq!(p.get("c"), Some(&ParameterValue::Float(0.5)));
        assert_eq!(p.value(0), Some(&ParameterValue::from("rbf")));
        assert!(p.get("gamma").is_none());
    }

    #[test]
    fn keys_distinguish_types_and_values() {
        assert_eq!(point("rbf", 0.5).key(), point("rbf", 0.5).key());
        assert_ne!(point("rbf", 0.5).key(), point("rbf", 0.75).key());
        let int_point = Point::new(vec![("x".into(), ParameterValue::Int(1))]);
        let float_point = Point::new(vec![("x".into(), ParameterValue::Float(1.0))]);
        assert_ne!(int_point.key(), float_point.key());
    }

    #[test]
    fn validate_against_parameters() {
        let parameters = params();
        assert!(point("linear", 0.75).validate(&parameters).is_ok());
        assert!(matches!(
            point("poly", 0.5).validate(&parameters),
            Err(DomainError::OutOfDomain { .. })
        ));
        assert!(matches!(
            point("rbf", 2.0).validate(&parameters),
            Err(DomainError::OutOfDomain { .. })
        ));
        assert!(matches!(
            point("rbf", 0.5).validate(&parameters[..1]),
            Err(DomainError::ArityMismatch { expected: 1, actual: 2 })
        ));
        let swapped = Point::new(vec![
            ("c".into(), ParameterValue::Float(0.5)),
            ("kernel".into(), ParameterValue::from("rbf")),
        ]);
        assert!(matches!(
            swapped.validate(&parameters),
            Err(DomainError::NameMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn apply_to_leaves_base_untouched() {
        let base = json!({"seed": 1});
        let config = point("linear", 0.25).apply_to(&params(), &base).unwrap();
        assert_eq!(config, json!({"seed": 1, "kernel": "linear", "c": 0.25}));
        assert_eq!(base, json!({"seed": 1}));
    }
}
