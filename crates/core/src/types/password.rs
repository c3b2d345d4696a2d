//! Password strength policy.

/// Reasons a password fails the strength policy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Fewer than [`Password::MIN_LENGTH`] characters.
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// More than [`Password::MAX_LENGTH`] characters.
    #[error("password must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// No lowercase letter.
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    /// No uppercase letter.
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    /// No digit.
    #[error("password must contain a number")]
    MissingDigit,
}

/// A plaintext password that satisfies the strength policy.
///
/// Never serialized and never logged; it only lives long enough to be
/// hashed.
pub struct Password<'a>(&'a str);

impl<'a> Password<'a> {
    /// Minimum length in characters.
    pub const MIN_LENGTH: usize = 8;
    /// Maximum length in characters (bounds hashing cost).
    pub const MAX_LENGTH: usize = 128;

    /// Check a candidate password against the policy.
    ///
    /// ```
    /// use bookstore_core::{Password, PasswordError};
    ///
    /// assert!(Password::validate("Sup3rSecret").is_ok());
    /// assert_eq!(
    ///     Password::validate("alllowercase1").err(),
    ///     Some(PasswordError::MissingUppercase)
    /// );
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the first rule the password breaks.
    pub fn validate(candidate: &'a str) -> Result<Self, PasswordError> {
        let length = candidate.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(PasswordError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !candidate.chars().any(char::is_lowercase) {
            return Err(PasswordError::MissingLowercase);
        }
        if !candidate.chars().any(char::is_uppercase) {
            return Err(PasswordError::MissingUppercase);
        }
        if !candidate.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordError::MissingDigit);
        }

        Ok(Self(candidate))
    }

    /// The validated password.
    #[must_use]
    pub const fn expose(&self) -> &'a str {
        self.0
    }
}

impl core::fmt::Debug for Password<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        assert!(Password::validate("Correct1Horse").is_ok());
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            Password::validate("Ab1").err(),
            Some(PasswordError::TooShort { min: 8 })
        );
    }

    #[test]
    fn test_too_long() {
        let long = format!("Aa1{}", "x".repeat(200));
        assert_eq!(
            Password::validate(&long).err(),
            Some(PasswordError::TooLong { max: 128 })
        );
    }

    #[test]
    fn test_character_classes() {
        assert_eq!(
            Password::validate("ALLUPPER123").err(),
            Some(PasswordError::MissingLowercase)
        );
        assert_eq!(
            Password::validate("alllower123").err(),
            Some(PasswordError::MissingUppercase)
        );
        assert_eq!(
            Password::validate("NoDigitsHere").err(),
            Some(PasswordError::MissingDigit)
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // Seven characters, more than eight bytes.
        assert!(matches!(
            Password::validate("Éé1ñÑüÜ"),
            Err(PasswordError::TooShort { .. })
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let password = Password::validate("Correct1Horse").ok();
        let debug = format!("{password:?}");
        assert!(!debug.contains("Correct1Horse"));
    }
}
