//! Student record types.
//!
//! [`FieldArgs`] carries raw positional values, [`NewStudent`] and
//! [`NationalId`] are the validated forms written to the store, and
//! [`Student`] is a row read back from it.

use crate::validation::{
    FieldError, validate_class_name, validate_level, validate_name, validate_national_id,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Raw field values as they appeared on the command line.
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldArgs {
    /// Student name
    pub name: Option<String>,
    /// National identifier
    pub national_id: Option<String>,
    /// Class name
    pub class_name: Option<String>,
    /// Level
    pub level: Option<String>,
}

impl FieldArgs {
    /// The national identifier, if supplied.
    pub fn national_id(&self) -> Option<&str> {
        present(self.national_id.as_deref())
    }

    /// All four fields, if every one was supplied.
    pub fn all(&self) -> Option<(&str, &str, &str, &str)> {
        Some((
            present(self.name.as_deref())?,
            present(self.national_id.as_deref())?,
            present(self.class_name.as_deref())?,
            present(self.level.as_deref())?,
        ))
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A validated national identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NationalId(String);

impl NationalId {
    /// Validates and wraps `value`.
    ///
    /// # Errors
    /// Returns [`FieldError::NationalId`] for a malformed identifier.
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        validate_national_id(value)?;
        Ok(Self(value.to_string()))
    }

    /// The identifier as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NationalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated set of student fields, ready to insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    name: String,
    national_id: NationalId,
    class_name: String,
    level: String,
}

impl NewStudent {
    /// Validates all four fields.
    ///
    /// Fields are checked in positional order and the first failure wins.
    ///
    /// # Errors
    /// Returns the [`FieldError`] of the first invalid field.
    pub fn new(
        name: &str,
        national_id: &str,
        class_name: &str,
        level: &str,
    ) -> Result<Self, FieldError> {
        validate_name(name)?;
        let national_id = NationalId::parse(national_id)?;
        validate_class_name(class_name)?;
        validate_level(level)?;

        Ok(Self {
            name: name.to_string(),
            national_id,
            class_name: class_name.to_string(),
            level: level.to_string(),
        })
    }

    /// Student name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// National identifier.
    pub const fn national_id(&self) -> &NationalId {
        &self.national_id
    }

    /// Class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Level.
    pub fn level(&self) -> &str {
        &self.level
    }
}

/// A student row as stored.
///
/// Columns other than the four known ones (a serial `id`, timestamps, ...)
/// are kept in `extra` in the order the store returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Student name
    #[serde(rename = "nombre")]
    pub name: String,
    /// National identifier
    #[serde(rename = "rut")]
    pub national_id: String,
    /// Class name
    #[serde(rename = "curso")]
    pub class_name: String,
    /// Level, normalised to text
    #[serde(rename = "nivel", deserialize_with = "text_or_number")]
    pub level: String,
    /// Any other columns on the row
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Student {
    /// Builds a row from validated fields with no extra columns.
    pub fn from_new(student: &NewStudent) -> Self {
        Self {
            name: student.name().to_string(),
            national_id: student.national_id().to_string(),
            class_name: student.class_name().to_string(),
            level: student.level().to_string(),
            extra: Map::new(),
        }
    }

    /// Decodes a row rendered as a JSON object.
    ///
    /// # Errors
    /// Fails if a known column is missing or has an unusable type.
    pub fn from_row(row: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row)
    }
}

/// Accepts a text column or an integer column for `nivel`.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected text or number for nivel, found {}",
            other
        ))),
    }
}
