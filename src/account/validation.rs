//! Input validation for account identifiers
//!
//! Account ids arrive from clients and are interpolated into lock keys
//! (`lock:update_account:<id>`), so they are validated once at the boundary
//! and carried as [`AccountId`] afterwards. Fields are private to force
//! validation through the public API.

use std::fmt;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============================================================================
// AccountId - Validated Account Identifier (Private Field)
// ============================================================================

/// Maximum account id length in bytes.
pub const ACCOUNT_ID_MAX_LEN: usize = 64;

/// Validated account identifier
///
/// # Validation Rules
/// - Length: 1-64 characters
/// - Characters: ASCII letters, digits, `_` and `-`
///
/// Separators used by the lock key namespace (`:`) and whitespace can never
/// appear, so two distinct ids always produce two distinct lock keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new validated AccountId
    ///
    /// # Examples
    /// ```
    /// use account_transfer::account::AccountId;
    ///
    /// let id = AccountId::new("acc_123").unwrap();
    /// assert_eq!(id.as_str(), "acc_123");
    ///
    /// assert!(AccountId::new("acc:123").is_err());
    /// ```
    pub fn new(id: &str) -> Result<Self, ValidationError> {
        if id.is_empty() || id.len() > ACCOUNT_ID_MAX_LEN {
            return Err(ValidationError::InvalidLength {
                field: "account_id",
                min: 1,
                max: ACCOUNT_ID_MAX_LEN,
                actual: id.len(),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "account_id",
                value: id.to_string(),
                expected: "ASCII letters, digits, '_' or '-'",
            });
        }

        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for AccountId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
