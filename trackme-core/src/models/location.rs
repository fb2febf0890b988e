//! Location samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A single position reported by a location feed.
///
/// Samples are immutable once produced and consumed once by the session
/// manager. Deserializing goes through [`LocationSample::new`], so a
/// decoded sample is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSample")]
pub struct LocationSample {
    latitude: f64,
    longitude: f64,
    observed_at: DateTime<Utc>,
}

impl LocationSample {
    /// Creates a sample observed at the given time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] if either coordinate is not
    /// finite or lies outside the WGS84 range.
    pub fn new(latitude: f64, longitude: f64, observed_at: DateTime<Utc>) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::InvalidCoordinate(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::InvalidCoordinate(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            observed_at,
        })
    }

    /// Creates a sample observed now.
    ///
    /// # Errors
    ///
    /// See [`LocationSample::new`].
    pub fn now(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        Self::new(latitude, longitude, Utc::now())
    }

    /// Parses a `"latitude,longitude"` pair observed now.
    ///
    /// Surrounding whitespace is ignored on both numbers.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSample`] if the text is not two
    /// comma-separated numbers, or [`CoreError::InvalidCoordinate`] if they
    /// are out of range.
    pub fn parse_pair(text: &str) -> Result<Self, CoreError> {
        let (lat, lon) = text
            .split_once(',')
            .ok_or_else(|| CoreError::InvalidSample(format!("expected 'lat,lon', got '{text}'")))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidSample(format!("bad latitude '{}'", lat.trim())))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidSample(format!("bad longitude '{}'", lon.trim())))?;
        Self::now(latitude, longitude)
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// When the position was observed.
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

#[derive(Deserialize)]
struct RawSample {
    latitude: f64,
    longitude: f64,
    observed_at: DateTime<Utc>,
}

impl TryFrom<RawSample> for LocationSample {
    type Error = CoreError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude, raw.observed_at)
    }
}

impl fmt::Display for LocationSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}
