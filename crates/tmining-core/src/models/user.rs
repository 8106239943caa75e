use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::model::ModelRecord;

/// Identity-provider claims as received at login. Only `sub` is required.
pub type Claims = serde_json::Map<String, Value>;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider subject; unique.
    pub subject: String,
    /// System-assigned identifier; owns models.
    pub identifier: String,
    pub credential: Option<String>,
    pub profile: Claims,
}

impl User {
    /// The `sub` claim, if present and a string.
    pub fn subject_of(claims: &Claims) -> Option<&str> {
        claims.get("sub").and_then(Value::as_str)
    }

    /// Expiry from the profile's `exp` claim, in seconds since the epoch.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let seconds = match self.profile.get("exp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        DateTime::from_timestamp(seconds, 0)
    }

    /// Offline session check: the stored credential is treated as valid while
    /// its `exp` claim lies in the future. No `exp` means no valid session.
    pub fn session_is_valid(&self, now: DateTime<Utc>) -> bool {
        self.credential.is_some() && self.expires_at().is_some_and(|exp| exp > now)
    }
}

/// A user together with the models it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: User,
    pub models: Vec<ModelRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn user_with(profile: Value) -> User {
        User {
            subject: "alice".to_string(),
            identifier: "u-1".to_string(),
            credential: Some("token".to_string()),
            profile: profile.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_subject_of() {
        let claims = json!({"sub": "alice", "name": "Alice"});
        assert_eq!(User::subject_of(claims.as_object().unwrap()), Some("alice"));

        let claims = json!({"sub": 42});
        assert_eq!(User::subject_of(claims.as_object().unwrap()), None);
    }

    #[test]
    fn test_session_validity_follows_exp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = now.timestamp() + 60;

        assert!(user_with(json!({"exp": later})).session_is_valid(now));
        assert!(user_with(json!({"exp": later.to_string()})).session_is_valid(now));
        assert!(!user_with(json!({"exp": now.timestamp()})).session_is_valid(now));
        assert!(!user_with(json!({})).session_is_valid(now));
    }

    #[test]
    fn test_session_requires_credential() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut user = user_with(json!({"exp": now.timestamp() + 60}));
        user.credential = None;
        assert!(!user.session_is_valid(now));
    }
}
