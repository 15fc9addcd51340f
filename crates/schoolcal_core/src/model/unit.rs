//! Unit (school) domain model.
//!
//! Units are created once through registration and never mutated by the
//! core. Name uniqueness is a registry policy, not a model invariant.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of an organizational unit.
pub type UnitId = Uuid;

/// An organizational scope (a school) that events can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
}

/// Validation failures for unit input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitValidationError {
    /// Name is empty after trim.
    EmptyName,
}

impl Display for UnitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "unit name must not be empty"),
        }
    }
}

impl Error for UnitValidationError {}

impl Unit {
    /// Builds a unit with a freshly allocated id.
    ///
    /// The stored name is trimmed.
    pub fn new(name: &str) -> Result<Self, UnitValidationError> {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Builds a unit with a caller-provided id.
    pub fn with_id(id: UnitId, name: &str) -> Result<Self, UnitValidationError> {
        let name = normalize_unit_name(name)?;
        Ok(Self { id, name })
    }
}

/// Trims a unit name and rejects blank values.
pub fn normalize_unit_name(name: &str) -> Result<String, UnitValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(UnitValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
