//! Session credential types.
//!
//! [`Credentials`] pairs a username with an optional [`TokenPair`]. The two
//! tokens only ever travel together, so a half-populated session cannot be
//! constructed. The persisted form is flat:
//!
//! ```json
//! {
//!   "username": "alice",
//!   "access_token": "A1",
//!   "refresh_token": "R1"
//! }
//! ```
//!
//! A persisted record carrying only one of the two tokens loads as a session
//! without tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Token Pair
// ============================================================================

/// Access and refresh token issued together by `/auth` or `/refreshtoken`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token authorizing location submissions.
    pub access_token: String,
    /// Longer-lived token used to obtain a new access token.
    pub refresh_token: String,
}

impl TokenPair {
    /// Creates a new token pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens are secrets and must never end up in logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credentials held by the credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCredentials", into = "StoredCredentials")]
pub struct Credentials {
    username: String,
    tokens: Option<TokenPair>,
}

impl Credentials {
    /// Credentials with no username and no session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Credentials remembering a username but holding no session.
    pub fn anonymous(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            tokens: None,
        }
    }

    /// Credentials for an authenticated session.
    pub fn authenticated(username: impl Into<String>, tokens: TokenPair) -> Self {
        Self {
            username: username.into(),
            tokens: Some(tokens),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the current token pair, if a session exists.
    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    /// Returns the access token, if a session exists.
    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    /// Returns the refresh token, if a session exists.
    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.refresh_token.as_str())
    }

    /// Returns true if both tokens are present.
    pub fn has_session(&self) -> bool {
        self.tokens.is_some()
    }

    /// Returns a copy with the token pair replaced.
    #[must_use]
    pub fn with_tokens(&self, tokens: TokenPair) -> Self {
        Self {
            username: self.username.clone(),
            tokens: Some(tokens),
        }
    }
}

/// Flat on-disk representation of [`Credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredCredentials {
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl From<StoredCredentials> for Credentials {
    fn from(stored: StoredCredentials) -> Self {
        let tokens = match (stored.access_token, stored.refresh_token) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        };
        Self {
            username: stored.username,
            tokens,
        }
    }
}

impl From<Credentials> for StoredCredentials {
    fn from(credentials: Credentials) -> Self {
        let (access_token, refresh_token) = match credentials.tokens {
            Some(pair) => (Some(pair.access_token), Some(pair.refresh_token)),
            None => (None, None),
        };
        Self {
            username: credentials.username,
            access_token,
            refresh_token,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
