//! Candidate record parsing and name validation
//!
//! A dataset line becomes a [`CandidateRecord`] only if it has enough fields
//! and a recognisable gender token; anything else is a malformed row and is
//! dropped without being counted. Candidates are then classified by
//! [`NameValidator`] as accepted or rejected with a [`RejectReason`].
//!
//! Rules, first failure wins:
//!
//! 1. empty or whitespace-only name (`empty`)
//! 2. fewer than 3 code points (`too_short`)
//! 3. more than 20 code points (`too_long`)
//! 4. for sources with a registered character set: no non-Latin script
//!    (`non_latin_script`), and only letters plus `'`, `-`, `.` and space
//!    (`invalid_characters`)
//! 5. for the same sources: capitalised words in the source's alphabet,
//!    separated by single spaces (`invalid_format`)
//! 6. double names: at most two parts (`too_many_parts`), each starting with
//!    an upper-case letter (`invalid_capitalization`)
//! 7. known joke names, suspicious letter patterns, placeholder words and the
//!    source's own blacklist (`joke_name`, `suspicious_pattern`,
//!    `not_first_name`, `country_blacklisted`)

use std::collections::{HashMap, HashSet};

use nameswipe_common::Gender;
use regex::Regex;
use serde::Serialize;

pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 20;

/// Sources whose names must be written in Latin letters
const LATIN_SOURCES: &[&str] = &["US", "GB", "DE", "FR", "IT", "ES", "IE"];

const LATIN_NAME_PATTERN: &str = r"^[\p{L}'\-. ]+$";

/// Arabic, Cyrillic, Greek, CJK, kana, Hangul, Thai, Hebrew, Devanagari
const NON_LATIN_SCRIPT_PATTERN: &str = concat!(
    r"[\x{0600}-\x{06FF}\x{0400}-\x{04FF}\x{0370}-\x{03FF}\x{4E00}-\x{9FFF}",
    r"\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{AC00}-\x{D7AF}\x{0E00}-\x{0E7F}",
    r"\x{0590}-\x{05FF}\x{0900}-\x{097F}]",
);

/// Per-source capitalisation and alphabet. The leading class of `US` and `GB`
/// also admits lower-case accented letters.
const NAME_FORMAT_PATTERNS: &[(&str, &str)] = &[
    ("US", r"^[A-ZÀ-ÖØ-öø-ÿ][a-zà-öø-ÿ'\-.]*(?: [A-ZÀ-ÖØ-öø-ÿ][a-zà-öø-ÿ'\-.]*)*$"),
    ("GB", r"^[A-ZÀ-ÖØ-öø-ÿ][a-zà-öø-ÿ'\-.]*(?: [A-ZÀ-ÖØ-öø-ÿ][a-zà-öø-ÿ'\-.]*)*$"),
    ("DE", r"^[A-ZÄÖÜ][a-zäöüß'\-.]*(?: [A-ZÄÖÜ][a-zäöüß'\-.]*)*$"),
    (
        "FR",
        r"^[A-ZÀÂÆÇÉÈÊËÏÎÔÙÛÜŸ][a-zàâæçéèêëïîôùûüÿ'\-.]*(?: [A-ZÀÂÆÇÉÈÊËÏÎÔÙÛÜŸ][a-zàâæçéèêëïîôùûüÿ'\-.]*)*$",
    ),
    ("IT", r"^[A-ZÀÈÉÌÒÙ][a-zàèéìòù'\-.]*(?: [A-ZÀÈÉÌÒÙ][a-zàèéìòù'\-.]*)*$"),
    ("ES", r"^[A-ZÁÉÍÓÚÑ][a-záéíóúñü'\-.]*(?: [A-ZÁÉÍÓÚÑ][a-záéíóúñü'\-.]*)*$"),
    ("IE", r"^[A-ZÁÉÍÓÚ][a-záéíóú'\-.]*(?: [A-ZÁÉÍÓÚ][a-záéíóú'\-.]*)*$"),
];

/// Parts allowed in a double first name such as `Jose Luis`
const MAX_NAME_PARTS: usize = 2;

const JOKE_NAMES: &[&str] = &["bredlbroad", "gsichtsbäichl"];

const NOT_FIRST_NAMES: &[&str] = &["unknown", "none", "anonymous", "test", "dummy"];

/// Why a candidate was filtered out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Empty,
    TooShort,
    TooLong,
    NonLatinScript,
    InvalidCharacters,
    InvalidFormat,
    TooManyParts,
    InvalidCapitalization,
    JokeName,
    SuspiciousPattern,
    NotFirstName,
    CountryBlacklisted,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Empty => "empty",
            RejectReason::TooShort => "too_short",
            RejectReason::TooLong => "too_long",
            RejectReason::NonLatinScript => "non_latin_script",
            RejectReason::InvalidCharacters => "invalid_characters",
            RejectReason::InvalidFormat => "invalid_format",
            RejectReason::TooManyParts => "too_many_parts",
            RejectReason::InvalidCapitalization => "invalid_capitalization",
            RejectReason::JokeName => "joke_name",
            RejectReason::SuspiciousPattern => "suspicious_pattern",
            RejectReason::NotFirstName => "not_first_name",
            RejectReason::CountryBlacklisted => "country_blacklisted",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed dataset row, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub raw_name: String,
    pub gender: Gender,
    pub source: String,
}

impl CandidateRecord {
    /// Best-effort split of a `first,last,gender,country` line.
    ///
    /// Only the first and third fields are read; the record is attributed to
    /// the requested `source`, not the line's own country column. Returns
    /// `None` for lines with fewer than three fields or an unknown gender.
    pub fn parse_line(line: &str, source: &str) -> Option<Self> {
        let mut fields = line.split(',');
        let raw_name = fields.next()?;
        let _last_name = fields.next()?;
        let gender = Gender::from_code(fields.next()?)?;

        Some(Self {
            raw_name: raw_name.to_string(),
            gender,
            source: source.to_string(),
        })
    }
}

/// A candidate that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidName {
    pub name: String,
    pub gender: Gender,
}

/// Outcome of validating one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ValidName),
    Rejected(RejectReason),
}

/// Stateless name classifier with precompiled per-source patterns
#[derive(Debug, Clone)]
pub struct NameValidator {
    charset_patterns: HashMap<&'static str, Regex>,
    format_patterns: HashMap<&'static str, Regex>,
    non_latin: Regex,
    /// Lower-cased names keyed by upper-case source code
    country_blacklists: HashMap<String, HashSet<String>>,
}

impl NameValidator {
    pub fn new() -> Result<Self, regex::Error> {
        let latin = Regex::new(LATIN_NAME_PATTERN)?;
        let charset_patterns = LATIN_SOURCES
            .iter()
            .map(|code| (*code, latin.clone()))
            .collect();
        let format_patterns = NAME_FORMAT_PATTERNS
            .iter()
            .map(|(code, pattern)| Regex::new(pattern).map(|regex| (*code, regex)))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            charset_patterns,
            format_patterns,
            non_latin: Regex::new(NON_LATIN_SCRIPT_PATTERN)?,
            country_blacklists: HashMap::new(),
        })
    }

    /// Reject `names` (case-insensitive) for `country`
    pub fn with_country_blacklist<I, S>(mut self, country: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.country_blacklists
            .entry(country.trim().to_uppercase())
            .or_default()
            .extend(names.into_iter().map(|name| name.as_ref().trim().to_lowercase()));
        self
    }

    /// Classify a candidate record
    pub fn validate(&self, candidate: &CandidateRecord) -> Verdict {
        match self.validate_name(&candidate.raw_name, &candidate.source) {
            Ok(name) => Verdict::Accepted(ValidName {
                name,
                gender: candidate.gender,
            }),
            Err(reason) => Verdict::Rejected(reason),
        }
    }

    /// Validate a raw first name for a source, returning the trimmed name
    pub fn validate_name(&self, raw_name: &str, country: &str) -> Result<String, RejectReason> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(RejectReason::Empty);
        }

        let length = name.chars().count();
        if length < MIN_NAME_LENGTH {
            return Err(RejectReason::TooShort);
        }
        if length > MAX_NAME_LENGTH {
            return Err(RejectReason::TooLong);
        }

        let country = country.trim().to_uppercase();
        if let Some(pattern) = self.charset_patterns.get(country.as_str()) {
            if self.non_latin.is_match(name) {
                return Err(RejectReason::NonLatinScript);
            }
            if !pattern.is_match(name) {
                return Err(RejectReason::InvalidCharacters);
            }
        }
        if let Some(pattern) = self.format_patterns.get(country.as_str()) {
            if !pattern.is_match(name) {
                return Err(RejectReason::InvalidFormat);
            }
        }
        check_double_name(name)?;

        let lower = name.to_lowercase();
        if JOKE_NAMES.contains(&lower.as_str()) {
            return Err(RejectReason::JokeName);
        }
        if is_suspicious(&lower) {
            return Err(RejectReason::SuspiciousPattern);
        }
        if NOT_FIRST_NAMES.contains(&lower.as_str()) {
            return Err(RejectReason::NotFirstName);
        }
        if self
            .country_blacklists
            .get(&country)
            .is_some_and(|names| names.contains(&lower))
        {
            return Err(RejectReason::CountryBlacklisted);
        }

        Ok(name.to_string())
    }
}

/// Names with a space may have two parts, each capitalised
fn check_double_name(name: &str) -> Result<(), RejectReason> {
    if !name.contains(' ') {
        return Ok(());
    }

    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() > MAX_NAME_PARTS {
        return Err(RejectReason::TooManyParts);
    }
    if parts
        .iter()
        .any(|part| !part.chars().next().is_some_and(char::is_uppercase))
    {
        return Err(RejectReason::InvalidCapitalization);
    }
    Ok(())
}

/// Repeated-letter names (`aaa`, `aabb`) and vowel-free runs of four or more
/// consonants. Expects a lower-cased name.
fn is_suspicious(lower: &str) -> bool {
    let mut runs: Vec<usize> = Vec::new();
    let mut previous = None;
    for c in lower.chars() {
        match runs.last_mut() {
            Some(len) if previous == Some(c) => *len += 1,
            _ => runs.push(1),
        }
        previous = Some(c);
    }

    let single_repeated = runs.len() == 1 && runs[0] >= 3;
    let two_runs = runs.len() == 2 && runs.iter().all(|len| *len >= 2);
    let consonants_only = lower.chars().count() >= 4
        && lower
            .chars()
            .all(|c| c.is_ascii_lowercase() && !"aeiou".contains(c));

    single_repeated || two_runs || consonants_only
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn validator() -> NameValidator {
        NameValidator::new().unwrap()
    }

    #[test]
    fn test_empty_and_whitespace() {
        let v = validator();
        assert_eq!(v.validate_name("", "US"), Err(RejectReason::Empty));
        assert_eq!(v.validate_name("   \t", "US"), Err(RejectReason::Empty));
    }

    #[test]
    fn test_length_boundaries() {
        let v = validator();
        assert_eq!(v.validate_name("Al", "US"), Err(RejectReason::TooShort));
        assert_eq!(v.validate_name("Ali", "US"), Ok("Ali".to_string()));

        let twenty = "Maximiliana Josefina";
        assert_eq!(twenty.chars().count(), 20);
        assert_eq!(v.validate_name(twenty, "FR"), Ok(twenty.to_string()));

        let twenty_one = "Maximilianna Josefina";
        assert_eq!(v.validate_name(twenty_one, "FR"), Err(RejectReason::TooLong));
    }

    #[test]
    fn test_length_counts_code_points() {
        // Three code points, four bytes
        assert_eq!(validator().validate_name("Zoë", "FR"), Ok("Zoë".to_string()));
        assert_eq!(validator().validate_name("Åsa", "US"), Ok("Åsa".to_string()));
    }

    #[test]
    fn test_trims_before_measuring() {
        assert_eq!(validator().validate_name("  Al  ", "US"), Err(RejectReason::TooShort));
        assert_eq!(validator().validate_name(" Emma ", "US"), Ok("Emma".to_string()));
    }

    #[test]
    fn test_charset_for_registered_source() {
        let v = validator();
        assert_eq!(v.validate_name("J0hn", "US"), Err(RejectReason::InvalidCharacters));
        assert_eq!(v.validate_name("Ann@", "gb"), Err(RejectReason::InvalidCharacters));
        assert_eq!(v.validate_name("Jean-marc", "FR"), Ok("Jean-marc".to_string()));
        assert_eq!(v.validate_name("Siobhán", "IE"), Ok("Siobhán".to_string()));
        assert_eq!(v.validate_name("Иван", "DE"), Err(RejectReason::NonLatinScript));
    }

    #[test]
    fn test_format_for_registered_source() {
        let v = validator();
        assert_eq!(v.validate_name("jOHN", "US"), Err(RejectReason::InvalidFormat));
        assert_eq!(v.validate_name("mARIE", "FR"), Err(RejectReason::InvalidFormat));
        assert_eq!(v.validate_name("JOHN", "GB"), Err(RejectReason::InvalidFormat));
        assert_eq!(v.validate_name("Jean-Luc", "FR"), Err(RejectReason::InvalidFormat));
        assert_eq!(v.validate_name("Anna  Lena", "DE"), Err(RejectReason::InvalidFormat));

        // Each source has its own alphabet
        assert_eq!(v.validate_name("Jürgen", "DE"), Ok("Jürgen".to_string()));
        assert_eq!(v.validate_name("Ñuño", "ES"), Ok("Ñuño".to_string()));
        assert_eq!(v.validate_name("Ñuño", "DE"), Err(RejectReason::InvalidFormat));

        assert_eq!(v.validate_name("jOHN", "JP"), Ok("jOHN".to_string()));
    }

    #[test]
    fn test_double_names() {
        let v = validator();
        assert_eq!(v.validate_name("Jose Luis", "ES"), Ok("Jose Luis".to_string()));
        assert_eq!(v.validate_name("Anna Maria Luisa", "IT"), Err(RejectReason::TooManyParts));
        assert_eq!(
            v.validate_name("Mary élise", "US"),
            Err(RejectReason::InvalidCapitalization)
        );

        // Applies to sources without a registered format too
        assert_eq!(
            v.validate_name("anna maria", "JP"),
            Err(RejectReason::InvalidCapitalization)
        );
        assert_eq!(v.validate_name("Ana Bel Li", "JP"), Err(RejectReason::TooManyParts));
    }

    #[test]
    fn test_country_blacklist() {
        let v = validator().with_country_blacklist("de", ["Kevin"]);
        assert_eq!(v.validate_name("Kevin", "DE"), Err(RejectReason::CountryBlacklisted));
        assert_eq!(v.validate_name("kevin", "JP"), Ok("kevin".to_string()));
        assert_eq!(v.validate_name("Kevin", "US"), Ok("Kevin".to_string()));
        assert_eq!(validator().validate_name("Kevin", "DE"), Ok("Kevin".to_string()));
    }

    #[test]
    fn test_unregistered_source_is_permissive() {
        let v = validator();
        assert_eq!(v.validate_name("J0hn", "JP"), Ok("J0hn".to_string()));
        assert_eq!(v.validate_name("Иван", "RU"), Ok("Иван".to_string()));
    }

    #[test]
    fn test_blacklists() {
        let v = validator();
        assert_eq!(v.validate_name("Bredlbroad", "DE"), Err(RejectReason::JokeName));
        assert_eq!(v.validate_name("Unknown", "US"), Err(RejectReason::NotFirstName));
        assert_eq!(v.validate_name("Test", "US"), Err(RejectReason::NotFirstName));
        assert_eq!(v.validate_name("Aaa", "US"), Err(RejectReason::SuspiciousPattern));
        assert_eq!(v.validate_name("Aabb", "US"), Err(RejectReason::SuspiciousPattern));
        assert_eq!(v.validate_name("Brrr", "US"), Err(RejectReason::SuspiciousPattern));
    }

    #[test]
    fn test_common_names_are_not_suspicious() {
        for name in ["anna", "otto", "bob", "lee", "emma", "aaron", "ella"] {
            assert!(!is_suspicious(name), "{name} flagged");
        }
    }

    #[test]
    fn test_parse_line() {
        let record = CandidateRecord::parse_line("Alice,Doe,F,FR", "FR").unwrap();
        assert_eq!(record.raw_name, "Alice");
        assert_eq!(record.gender, Gender::Female);
        assert_eq!(record.source, "FR");

        // Three fields are enough and the line's own country is ignored
        let record = CandidateRecord::parse_line("Bob,,m", "US").unwrap();
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.source, "US");
    }

    #[test]
    fn test_parse_line_drops_malformed_rows() {
        assert!(CandidateRecord::parse_line("Alice,Doe", "FR").is_none());
        assert!(CandidateRecord::parse_line("", "FR").is_none());
        assert!(CandidateRecord::parse_line("Alice,Doe,X,FR", "FR").is_none());
        assert!(CandidateRecord::parse_line("Alice,Doe,,FR", "FR").is_none());
    }

    #[test]
    fn test_validate_candidate() {
        let v = validator();
        let accepted = CandidateRecord::parse_line(" Chloé ,Martin,F,FR", "FR").unwrap();
        assert_eq!(
            v.validate(&accepted),
            Verdict::Accepted(ValidName {
                name: "Chloé".to_string(),
                gender: Gender::Female
            })
        );

        let rejected = CandidateRecord::parse_line("Li,Wang,M,US", "US").unwrap();
        assert_eq!(v.validate(&rejected), Verdict::Rejected(RejectReason::TooShort));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(RejectReason::InvalidCharacters.to_string(), "invalid_characters");
        assert_eq!(RejectReason::CountryBlacklisted.to_string(), "country_blacklisted");
        assert_eq!(
            serde_json::to_string(&RejectReason::TooLong).unwrap(),
            "\"too_long\""
        );
    }
}
