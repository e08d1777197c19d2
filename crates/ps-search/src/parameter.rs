//! Search dimensions and their value domains.

use ps_types::{ConfigureError, DomainError, ParameterValue};
use serde::{Deserialize, Serialize};

use crate::evaluator::Configurable;

/// Relative slack for floating-point grid arithmetic, so that `[0, 1]` with
/// step `0.1` yields 11 values rather than 10.
pub(crate) const TOLERANCE: f64 = 1e-9;

/// Spacing of a numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scale {
    /// `lower + k * step`
    Linear,
    /// `lower * base^(k * step)`; with `step = 1` this is `lower * base^k`.
    Log { base: f64 },
}

/// Value domain of a search dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    /// Explicit ordered list of values.
    Discrete { values: Vec<ParameterValue> },
    /// Numeric range `[lower, upper]`, inclusive on both ends.
    Range {
        lower: f64,
        upper: f64,
        step: f64,
        scale: Scale,
    },
}

/// A single tunable dimension of the search space.
///
/// Constructors validate the domain; since deserialized parameters skip the
/// constructors, [`Parameter::size`] and the space generator validate again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    /// Setting written on the target configuration; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    property: Option<String>,
    domain: Domain,
    /// Value the model would use untuned. Drives the simplicity tie-break.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<ParameterValue>,
}

impl Parameter {
    /// Explicit list of values, enumerated in the given order.
    pub fn discrete<V>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, DomainError>
    where
        V: Into<ParameterValue>,
    {
        Self::with_domain(
            name,
            Domain::Discrete {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn linear(
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        step: f64,
    ) -> Result<Self, DomainError> {
        Self::range(name, lower, upper, step, Scale::Linear)
    }

    /// `lower * base^(k * step)` for every `k` keeping the value `<= upper`.
    pub fn log(
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        step: f64,
        base: f64,
    ) -> Result<Self, DomainError> {
        Self::range(name, lower, upper, step, Scale::Log { base })
    }

    pub fn range(
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        step: f64,
        scale: Scale,
    ) -> Result<Self, DomainError> {
        Self::with_domain(
            name,
            Domain::Range {
                lower,
                upper,
                step,
                scale,
            },
        )
    }

    pub fn with_domain(name: impl Into<String>, domain: Domain) -> Result<Self, DomainError> {
        let parameter = Self {
            name: name.into(),
            property: None,
            domain,
            default: None,
        };
        parameter.validate()?;
        Ok(parameter)
    }

    pub fn with_default(mut self, value: impl Into<ParameterValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self) -> &str {
        self.property.as_deref().unwrap_or(&self.name)
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn default_value(&self) -> Option<&ParameterValue> {
        self.default.as_ref()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.domain, Domain::Range { .. })
    }

    /// `(lower, upper)` for numeric ranges.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self.domain {
            Domain::Range { lower, upper, .. } => Some((lower, upper)),
            Domain::Discrete { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.is_empty() {
            return Err(DomainError::EmptyName);
        }
        let Domain::Range {
            lower,
            upper,
            step,
            scale,
        } = self.domain
        else {
            return Ok(());
        };

        if !(lower.is_finite() && upper.is_finite() && step.is_finite()) {
            return Err(DomainError::NonFiniteBound {
                parameter: self.name.clone(),
            });
        }
        if step <= 0.0 {
            return Err(DomainError::NonPositiveStep {
                parameter: self.name.clone(),
                step,
            });
        }
        if lower > upper {
            return Err(DomainError::InvertedBounds {
                parameter: self.name.clone(),
                lower,
                upper,
            });
        }
        if let Scale::Log { base } = scale {
            if !base.is_finite() || base <= 1.0 {
                return Err(DomainError::InvalidLogBase {
                    parameter: self.name.clone(),
                    base,
                });
            }
            if lower <= 0.0 {
                return Err(DomainError::NonPositiveLogBound {
                    parameter: self.name.clone(),
                    lower,
                });
            }
        }
        Ok(())
    }

    /// Number of values in the domain.
    pub fn size(&self) -> Result<usize, DomainError> {
        self.validate()?;
        Ok(match &self.domain {
            Domain::Discrete { values } => values.len(),
            Domain::Range {
                lower,
                upper,
                step,
                scale,
            } => {
                let steps = match scale {
                    Scale::Linear => (upper - lower) / step,
                    Scale::Log { base } => (upper / lower).log(*base) / step,
                };
                // Slack stays well under one step, even for very long ranges.
                let slack = (TOLERANCE * steps.max(1.0)).min(1e-3);
                let whole = (steps + slack).floor();
                if !whole.is_finite() || whole >= usize::MAX as f64 {
                    return Err(self.too_many_values());
                }
                (whole as usize)
                    .checked_add(1)
                    .ok_or_else(|| self.too_many_values())?
            }
        })
    }

    fn too_many_values(&self) -> DomainError {
        DomainError::TooManyValues {
            parameter: self.name.clone(),
        }
    }

    /// The `index`-th value of the domain.
    pub fn value_at(&self, index: usize) -> Result<ParameterValue, DomainError> {
        let size = self.size()?;
        if index >= size {
            return Err(DomainError::IndexOutOfRange {
                parameter: self.name.clone(),
                index,
                size,
            });
        }
        Ok(self.nth(index))
    }

    /// `value_at` without validation; `index` must be below `size()`.
    pub(crate) fn nth(&self, index: usize) -> ParameterValue {
        match &self.domain {
            Domain::Discrete { values } => values[index].clone(),
            Domain::Range {
                lower,
                upper,
                step,
                scale,
            } => {
                let k = index as f64;
                let value = match scale {
                    Scale::Linear => lower + k * step,
                    Scale::Log { base } => lower * base.powf(k * step),
                };
                ParameterValue::Float(value.min(*upper))
            }
        }
    }

    /// All values in enumeration order.
    pub fn values(&self) -> Result<Vec<ParameterValue>, DomainError> {
        Ok((0..self.size()?).map(|i| self.nth(i)).collect())
    }

    /// Whether `value` belongs to the domain. Ranges check bounds only, so
    /// values from refined grids still belong to the coarser parameter.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match &self.domain {
            Domain::Discrete { values } => values.contains(value),
            Domain::Range { lower, upper, .. } => value.as_f64().is_some_and(|v| {
                let slack = TOLERANCE * (upper - lower).abs().max(1.0);
                v >= lower - slack && v <= upper + slack
            }),
        }
    }

    /// Writes `value` for this dimension into `target`.
    pub fn apply<C: Configurable>(
        &self,
        value: &ParameterValue,
        target: &mut C,
    ) -> Result<(), ConfigureError> {
        target.set_parameter(self.property(), value)
    }

    /// Narrower copy of this parameter centered on `center`.
    ///
    /// Numeric bounds become `center ± (upper - lower) * shrink / 2`, clamped
    /// to the current bounds, and the step shrinks by the same factor. Log
    /// ranges do this arithmetic on exponents. Discrete domains are returned
    /// unchanged.
    pub fn refine(&self, center: &ParameterValue, shrink: f64) -> Result<Self, DomainError> {
        if !(shrink > 0.0 && shrink <= 1.0) {
            return Err(DomainError::InvalidShrinkFactor { factor: shrink });
        }
        self.validate()?;

        let Domain::Range {
            lower,
            upper,
            step,
            scale,
        } = self.domain
        else {
            return Ok(self.clone());
        };

        let c = match center.as_f64() {
            Some(c) if self.contains(center) => c.clamp(lower, upper),
            _ => {
                return Err(DomainError::OutOfDomain {
                    parameter: self.name.clone(),
                    value: center.to_string(),
                })
            }
        };

        let (new_lower, new_upper) = match scale {
            Scale::Linear => {
                let half = (upper - lower) * shrink / 2.0;
                ((c - half).max(lower), (c + half).min(upper))
            }
            Scale::Log { base } => {
                let (el, eu, ec) = (lower.log(base), upper.log(base), c.log(base));
                let half = (eu - el) * shrink / 2.0;
                (
                    base.powf((ec - half).max(el)).max(lower),
                    base.powf((ec + half).min(eu)).min(upper),
                )
            }
        };

        let mut refined = self.clone();
        refined.domain = Domain::Range {
            lower: new_lower,
            upper: new_upper,
            step: step * shrink,
            scale,
        };
        refined.validate()?;
        Ok(refined)
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.domain {
            Domain::Discrete { values } => {
                let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{}: [{}]", self.name, joined.join(", "))
            }
            Domain::Range {
                lower,
                upper,
                step,
                scale: Scale::Linear,
            } => write!(f, "{}: {lower}..={upper} step {step}", self.name),
            Domain::Range {
                lower,
                upper,
                step,
                scale: Scale::Log { base },
            } => write!(
                f,
                "{}: {lower}..={upper} step {step} (log base {base})",
                self.name
            ),
        }
    }
}
