//! Validated names for users and catalog entities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Name`] or [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The input is empty after trimming.
    #[error("name cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

fn parse_trimmed(s: &str, max: usize) -> Result<String, NameError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.chars().count() > max {
        return Err(NameError::TooLong { max });
    }
    Ok(trimmed.to_owned())
}

/// The display name of a store, item or tag.
///
/// Names are trimmed but otherwise compared exactly, so "Sale" and "sale" are
/// different tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 80;

    /// Parse a name.
    ///
    /// # Errors
    ///
    /// Returns `NameError` if the trimmed input is empty or too long.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        parse_trimmed(s, Self::MAX_LENGTH).map(Self)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A login name, unique across all users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Maximum length in characters.
    pub const MAX_LENGTH: usize = 80;

    /// Parse a username.
    ///
    /// # Errors
    ///
    /// Returns `NameError` if the trimmed input is empty or too long.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        parse_trimmed(s, Self::MAX_LENGTH).map(Self)
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_string_conversions {
    ($ty:ident) => {
        impl TryFrom<String> for $ty {
            type Error = NameError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

impl_string_conversions!(Name);
impl_string_conversions!(Username);
