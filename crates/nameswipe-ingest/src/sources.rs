//! Supported dataset sources
//!
//! Each source is a country partition of the extended name dataset. The table
//! is static for the lifetime of the process.

use serde::Serialize;

/// A dataset partition that can be ingested independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedSource {
    pub code: &'static str,
    pub display_name: &'static str,
}

pub const SUPPORTED_SOURCES: &[SupportedSource] = &[
    SupportedSource { code: "US", display_name: "United States" },
    SupportedSource { code: "GB", display_name: "United Kingdom" },
    SupportedSource { code: "DE", display_name: "Germany" },
    SupportedSource { code: "FR", display_name: "France" },
    SupportedSource { code: "IT", display_name: "Italy" },
    SupportedSource { code: "ES", display_name: "Spain" },
    SupportedSource { code: "IE", display_name: "Ireland" },
];

/// Look up a source code, ignoring case and surrounding whitespace
pub fn find_source(code: &str) -> Option<&'static SupportedSource> {
    let code = code.trim();
    SUPPORTED_SOURCES
        .iter()
        .find(|source| source.code.eq_ignore_ascii_case(code))
}
