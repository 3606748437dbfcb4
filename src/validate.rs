use regex::Regex;
use std::sync::LazyLock;

// Whole-string match; the local part, domain and tld may not contain '@' or whitespace.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("age cannot be negative (got {0})")]
    InvalidAge(i64),
    #[error("invalid email format: {0:?}")]
    InvalidEmail(String),
    #[error("identifier must be non-empty and alphanumeric: {0:?}")]
    InvalidIdentifier(String),
    #[error("name must not be empty")]
    InvalidName,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAge(_) => "invalid_age",
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::InvalidName => "invalid_name",
        }
    }
}

pub fn validate_age(age: i64) -> Result<u32, ValidationError> {
    if age < 0 {
        return Err(ValidationError::InvalidAge(age));
    }
    u32::try_from(age).map_err(|_| ValidationError::InvalidAge(age))
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Only the IPC create handlers enforce this; stored documents may carry other id shapes.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}
