//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated subject identifier.
    ///
    /// Subject IDs must be non-empty strings. They identify the monitored
    /// entity (a person or workstation) whose events are tracked; uniqueness
    /// is enforced at the database level.
    SubjectId, "subject ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_rejects_empty() {
        assert!(SubjectId::new("").is_err());
        assert!(SubjectId::new("emp-001").is_ok());
    }

    #[test]
    fn subject_id_serde_roundtrip() {
        let id = SubjectId::new("emp-001").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"emp-001\"");
        let parsed: SubjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn subject_id_serde_rejects_empty() {
        let result: Result<SubjectId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn subject_id_as_ref() {
        let id = SubjectId::new("emp-001").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "emp-001");
    }
}
