//! Session value types: the state snapshot and the opaque remote records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// RECORD
// =============================================================================

/// Opaque key/value record returned by the API (a user or a profile).
///
/// The session core stores and forwards records without interpreting them,
/// except for reading the user's `profile` reference during login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Convert an arbitrary JSON value. Non-object values yield `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The user record's reference to its profile, if it carries one.
    #[must_use]
    pub fn profile_ref(&self) -> Option<&str> {
        self.get("profile").and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

pub type UserRecord = Record;
pub type ProfileRecord = Record;

// =============================================================================
// AUTHENTICATED SESSION
// =============================================================================

/// Composed result of a successful login handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedSession {
    pub user: UserRecord,
    pub profile: ProfileRecord,
    pub token: String,
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Immutable snapshot of the client's session.
///
/// Fields are private: a `SessionState` is only ever produced by
/// [`SessionState::default`], by the store's transitions, or by
/// rehydrating a persisted snapshot whose flag agrees with its data.
/// `logged_in` is derived from `token` and `current_user`, so the
/// "logged in iff token present and user non-empty" rule cannot drift.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    current_user: UserRecord,
    current_profile: ProfileRecord,
    token: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn logged_in(&self) -> bool {
        self.token.is_some() && !self.current_user.is_empty()
    }

    #[must_use]
    pub fn current_user(&self) -> &UserRecord {
        &self.current_user
    }

    #[must_use]
    pub fn current_profile(&self) -> &ProfileRecord {
        &self.current_profile
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn logged_in_as(session: AuthenticatedSession) -> Self {
        Self { current_user: session.user, current_profile: session.profile, token: Some(session.token) }
    }

    pub(crate) fn with_user(&self, user: UserRecord) -> Self {
        Self { current_user: user, ..self.clone() }
    }

    pub(crate) fn with_profile(&self, profile: ProfileRecord) -> Self {
        Self { current_profile: profile, ..self.clone() }
    }
}

// =============================================================================
// SNAPSHOT WIRE FORMAT
// =============================================================================

/// Persisted JSON layout of a [`SessionState`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredSession {
    pub logged_in: bool,
    #[serde(default)]
    pub current_user: UserRecord,
    #[serde(default)]
    pub current_profile: ProfileRecord,
    #[serde(default)]
    pub token: Option<String>,
}

impl From<&SessionState> for StoredSession {
    fn from(state: &SessionState) -> Self {
        Self {
            logged_in: state.logged_in(),
            current_user: state.current_user.clone(),
            current_profile: state.current_profile.clone(),
            token: state.token.clone(),
        }
    }
}

impl StoredSession {
    /// Rebuild the state, rejecting snapshots whose flag contradicts their data.
    pub fn into_state(self) -> Option<SessionState> {
        let state =
            SessionState { current_user: self.current_user, current_profile: self.current_profile, token: self.token };
        (state.logged_in() == self.logged_in).then_some(state)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
