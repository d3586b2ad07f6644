//! Geolocation triple supplied by the host environment.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Where a capture was taken: coordinates plus a human-readable place name.
///
/// All three parts are required. Storage columns are nullable as a group, so
/// [`Location::from_parts`] is the single entry point for rebuilding one from
/// optional pieces and rejects anything partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_name: String,
}

#[derive(Deserialize, JsonSchema)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
    resolved_name: String,
}

impl TryFrom<RawLocation> for Location {
    type Error = CoreError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude, raw.resolved_name)
    }
}

impl Location {
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` for out-of-range coordinates or
    /// a blank place name.
    pub fn new(
        latitude: f64,
        longitude: f64,
        resolved_name: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let resolved_name = resolved_name.into();
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::constraint(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::constraint(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        if resolved_name.trim().is_empty() {
            return Err(CoreError::constraint("location name must not be blank"));
        }
        Ok(Self {
            latitude,
            longitude,
            resolved_name,
        })
    }

    /// Rebuild an optional location from nullable parts.
    ///
    /// All-`None` yields `Ok(None)`; all-`Some` yields a validated location;
    /// any mix is a partial location and is rejected.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` for partial or invalid input.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
        resolved_name: Option<String>,
    ) -> Result<Option<Self>, CoreError> {
        match (latitude, longitude, resolved_name) {
            (None, None, None) => Ok(None),
            (Some(lat), Some(lng), Some(name)) => Self::new(lat, lng, name).map(Some),
            _ => Err(CoreError::constraint(
                "partial location: latitude, longitude and name must be given together",
            )),
        }
    }

    /// Lowercased place name, for keyword classification.
    #[must_use]
    pub fn name_lowercase(&self) -> String {
        self.resolved_name.to_lowercase()
    }
}
