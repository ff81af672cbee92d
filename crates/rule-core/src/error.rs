use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("configuration required: {0}")]
    ConfigMissing(String),

    #[error("configuration malformed: {0}")]
    ConfigMalformed(String),

    #[error("sign-in rejected: {0}")]
    AuthRejected(String),

    #[error("sign-in unavailable: {0}")]
    AuthUnavailable(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("habit not found: {category}/{habit}")]
    HabitNotFound { category: String, habit: String },

    #[error("duplicate category id: {0}")]
    DuplicateCategory(String),

    #[error("duplicate habit id '{habit}' in category '{category}'")]
    DuplicateHabit { category: String, habit: String },

    #[error("invalid id '{0}': must be lowercase alphanumeric with '-' or '_'")]
    InvalidId(String),

    #[error("invalid id '{0}': longer than {max} characters", max = crate::paths::MAX_ID_LEN)]
    IdTooLong(String),

    #[error("invalid count for habit '{0}'")]
    InvalidCount(String),

    #[error("unknown habit '{0}'")]
    UnknownHabit(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse error class used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocking "configuration required" state, never retried.
    Configuration,
    /// Sign-in failed; recovered by falling back to another method.
    Auth,
    /// Store read/write/subscription failure; logged, never fatal.
    Sync,
    /// The requested edit does not fit the current schema.
    Validation,
}

impl RuleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleError::ConfigMissing(_) | RuleError::ConfigMalformed(_) => ErrorKind::Configuration,
            RuleError::AuthRejected(_) | RuleError::AuthUnavailable(_) => ErrorKind::Auth,
            RuleError::StoreUnavailable(_)
            | RuleError::PermissionDenied(_)
            | RuleError::Io(_)
            | RuleError::Yaml(_)
            | RuleError::Json(_) => ErrorKind::Sync,
            RuleError::CategoryNotFound(_)
            | RuleError::HabitNotFound { .. }
            | RuleError::DuplicateCategory(_)
            | RuleError::DuplicateHabit { .. }
            | RuleError::InvalidId(_)
            | RuleError::IdTooLong(_)
            | RuleError::InvalidCount(_)
            | RuleError::UnknownHabit(_) => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            RuleError::ConfigMissing("apiKey".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(RuleError::AuthRejected("bad".into()).kind(), ErrorKind::Auth);
        assert_eq!(
            RuleError::StoreUnavailable("offline".into()).kind(),
            ErrorKind::Sync
        );
        assert_eq!(
            RuleError::CategoryNotFound("x".into()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn config_missing_message_is_user_facing() {
        let msg = RuleError::ConfigMissing("set RULE_STORE_CONFIG".into()).to_string();
        assert!(msg.starts_with("configuration required"));
    }
}
