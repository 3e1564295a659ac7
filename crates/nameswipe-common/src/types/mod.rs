//! Catalog vocabulary shared across Nameswipe

use serde::{Deserialize, Serialize};

use crate::NameswipeError;

/// Gender a catalog name is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Map a dataset gender token (`M`/`F`, any case, surrounding whitespace
    /// ignored) to a gender. Any other token yields `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" | "m" => Some(Gender::Male),
            "F" | "f" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = NameswipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(NameswipeError::InvalidGender(s.to_string())),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a catalog row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Seeded with the application
    Static,
    /// Bulk-ingested from an external dataset
    #[default]
    Extended,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Static => "static",
            Provenance::Extended => "extended",
        }
    }
}

impl std::str::FromStr for Provenance {
    type Err = NameswipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Provenance::Static),
            "extended" => Ok(Provenance::Extended),
            _ => Err(NameswipeError::InvalidProvenance(s.to_string())),
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
