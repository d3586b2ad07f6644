//! Unit-interval scores.
//!
//! Every confidence, biodiversity score, health value, and indicator is a
//! [`Score`]. The only ways to obtain one are [`Score::new`] (which rejects
//! anything outside `[0, 1]`) and [`Score::saturating`] (for values computed
//! internally from other scores).

use std::borrow::Cow;
use std::fmt;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A value in the closed interval `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);

    /// Build a score, rejecting NaN and values outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` when `value` is out of range.
    pub fn new(value: f64) -> Result<Self, CoreError> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(CoreError::constraint(format!(
                "score {value} is outside [0, 1]"
            )));
        }
        Ok(Self(value))
    }

    /// Clamp an internally computed value into range. NaN maps to zero.
    #[must_use]
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Lower of the two scores.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl TryFrom<f64> for Score {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl JsonSchema for Score {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("Score")
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "number",
            "minimum": 0.0,
            "maximum": 1.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounds() {
        assert_eq!(Score::new(0.0).unwrap(), Score::ZERO);
        assert_eq!(Score::new(1.0).unwrap(), Score::ONE);
        assert!((Score::new(0.42).unwrap().value() - 0.42).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_with_constraint_violation() {
        for bad in [-0.01, 1.000_1, f64::NAN, f64::INFINITY] {
            let err = Score::new(bad).unwrap_err();
            assert!(
                matches!(err, CoreError::ConstraintViolation(_)),
                "expected constraint violation for {bad}"
            );
        }
    }

    #[test]
    fn deserialization_enforces_range() {
        let ok: Score = serde_json::from_str("0.5").unwrap();
        assert_eq!(ok.value(), 0.5);
        assert!(serde_json::from_str::<Score>("1.5").is_err());
        assert!(serde_json::from_str::<Score>("-0.2").is_err());
    }

    #[test]
    fn saturating_clamps() {
        assert_eq!(Score::saturating(1.7), Score::ONE);
        assert_eq!(Score::saturating(-3.0), Score::ZERO);
        assert_eq!(Score::saturating(f64::NAN), Score::ZERO);
    }
}
