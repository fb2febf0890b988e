//! JSON request and response bodies.
//!
//! # Wire format
//!
//! Location submission (`POST /coordinates`):
//!
//! ```json
//! {"username": "alice", "latitude": 55.6, "longitude": 12.5, "access_token": "A1"}
//! ```
//!
//! Coordinates are encoded as JSON numbers. Decoding also accepts numeric
//! strings, which older clients sent.
//!
//! Token pair (`/auth` and `/refreshtoken` responses):
//!
//! ```json
//! {"access_token": "A1", "refresh_token": "R1"}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use trackme_core::{Credentials, LocationSample, TokenPair};

use crate::error::CodecError;

// ============================================================================
// Request Bodies
// ============================================================================

/// `POST /auth` body.
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `POST /refreshtoken` body.
#[derive(Serialize)]
struct RefreshRequest<'a> {
    username: &'a str,
    refresh_token: &'a str,
    access_token: &'a str,
}

/// `POST /coordinates` body, as sent.
#[derive(Serialize)]
struct SubmissionRequest<'a> {
    username: &'a str,
    latitude: f64,
    longitude: f64,
    access_token: &'a str,
}

/// A decoded location submission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationSubmission {
    /// Submitting user.
    pub username: String,
    /// Latitude in degrees.
    #[serde(deserialize_with = "number_or_string")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(deserialize_with = "number_or_string")]
    pub longitude: f64,
    /// Access token the submission was authorized with.
    pub access_token: String,
}

/// Accepts `55.6` as well as `"55.6"`.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Number(f64),
        Text(String),
    }

    match Coordinate::deserialize(deserializer)? {
        Coordinate::Number(n) => Ok(n),
        Coordinate::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes an authenticated location submission.
///
/// # Errors
///
/// Returns [`CodecError::MissingAccessToken`] if `credentials` hold no
/// session.
pub fn encode_location_submission(
    sample: &LocationSample,
    credentials: &Credentials,
) -> Result<Vec<u8>, CodecError> {
    let access_token = credentials
        .access_token()
        .ok_or_else(|| CodecError::MissingAccessToken {
            username: credentials.username().to_string(),
        })?;

    let body = SubmissionRequest {
        username: credentials.username(),
        latitude: sample.latitude(),
        longitude: sample.longitude(),
        access_token,
    };
    Ok(serde_json::to_vec(&body)?)
}

/// Encodes a login request.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_login(username: &str, password: &str) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(&LoginRequest { username, password })?)
}

/// Encodes a token refresh request.
///
/// # Errors
///
/// Returns [`CodecError::MissingAccessToken`] if `credentials` hold no
/// session.
pub fn encode_refresh(credentials: &Credentials) -> Result<Vec<u8>, CodecError> {
    let tokens = credentials
        .tokens()
        .ok_or_else(|| CodecError::MissingAccessToken {
            username: credentials.username().to_string(),
        })?;

    let body = RefreshRequest {
        username: credentials.username(),
        refresh_token: &tokens.refresh_token,
        access_token: &tokens.access_token,
    };
    Ok(serde_json::to_vec(&body)?)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a token pair from an `/auth` or `/refreshtoken` response.
///
/// Extra keys are ignored.
///
/// # Errors
///
/// Returns [`CodecError::MalformedResponse`] if the body is not JSON or a
/// token is missing or not a string.
pub fn decode_token_pair(bytes: &[u8]) -> Result<TokenPair, CodecError> {
    serde_json::from_slice::<TokenPair>(bytes)
        .map_err(|e| CodecError::MalformedResponse(format!("token pair: {e}")))
}

/// Decodes a location submission body.
///
/// # Errors
///
/// Returns [`CodecError::MalformedResponse`] if the body is not a valid
/// submission.
pub fn decode_location_submission(bytes: &[u8]) -> Result<LocationSubmission, CodecError> {
    serde_json::from_slice(bytes)
        .map_err(|e| CodecError::MalformedResponse(format!("location submission: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
