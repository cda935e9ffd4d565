//! Field validators for student records.
//!
//! Each validator is a plain character-class check with a documented
//! precondition. They run before any store access, and a failure is
//! reported to the user rather than propagated as a fault.
//!
//! # Example
//! ```rust
//! use studentctl_core::validation::{is_letters_only, is_national_id};
//!
//! assert!(is_letters_only("Primero"));
//! assert!(!is_letters_only("Ana Maria"));
//! assert!(is_national_id("12.345.678-K"));
//! assert!(!is_national_id("1234"));
//! ```

use thiserror::Error;

/// Shortest accepted national identifier, in characters.
pub const NATIONAL_ID_MIN_LEN: usize = 9;
/// Longest accepted national identifier, in characters.
pub const NATIONAL_ID_MAX_LEN: usize = 12;

/// A field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Name is empty or contains something other than ASCII letters
    #[error("name must contain letters only (A-Z, a-z)")]
    Name,

    /// National identifier has a bad character or length
    #[error("national id must be 9 to 12 characters of digits, '.', ',', '-' or 'K'")]
    NationalId,

    /// Class name is empty or contains something other than ASCII letters
    #[error("class must contain letters only (A-Z, a-z)")]
    ClassName,

    /// Level is empty or contains something other than ASCII digits
    #[error("level must contain digits only")]
    Level,
}

/// True when `value` is non-empty and made only of ASCII letters.
///
/// Spaces, accents, digits, and punctuation are all rejected.
pub fn is_letters_only(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

/// True when `value` is non-empty and made only of ASCII digits.
pub fn is_digits_only(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// True when `value` looks like a national identifier with check digit.
///
/// Accepts digits, `.`, `,`, `-`, and `k`/`K`, with a total length between
/// [`NATIONAL_ID_MIN_LEN`] and [`NATIONAL_ID_MAX_LEN`] characters. The check
/// digit itself is not verified.
pub fn is_national_id(value: &str) -> bool {
    value.chars().all(is_national_id_char)
        && (NATIONAL_ID_MIN_LEN..=NATIONAL_ID_MAX_LEN).contains(&value.chars().count())
}

const fn is_national_id_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | 'k' | 'K')
}

/// Validates a student name.
///
/// # Errors
/// Returns [`FieldError::Name`] unless [`is_letters_only`] holds.
pub fn validate_name(value: &str) -> Result<(), FieldError> {
    if is_letters_only(value) {
        Ok(())
    } else {
        Err(FieldError::Name)
    }
}

/// Validates a national identifier.
///
/// # Errors
/// Returns [`FieldError::NationalId`] unless [`is_national_id`] holds.
pub fn validate_national_id(value: &str) -> Result<(), FieldError> {
    if is_national_id(value) {
        Ok(())
    } else {
        Err(FieldError::NationalId)
    }
}

/// Validates a class name.
///
/// # Errors
/// Returns [`FieldError::ClassName`] unless [`is_letters_only`] holds.
pub fn validate_class_name(value: &str) -> Result<(), FieldError> {
    if is_letters_only(value) {
        Ok(())
    } else {
        Err(FieldError::ClassName)
    }
}

/// Validates a level.
///
/// # Errors
/// Returns [`FieldError::Level`] unless [`is_digits_only`] holds.
pub fn validate_level(value: &str) -> Result<(), FieldError> {
    if is_digits_only(value) {
        Ok(())
    } else {
        Err(FieldError::Level)
    }
}
