//! Environment variable readers for configuration loaders
//!
//! An unset variable falls back to the default. A variable that is set but
//! does not parse is an error naming the variable.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Parse `key`, or `default` when unset
pub fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {:?} ({})", key, value, e)),
        Err(_) => Ok(default),
    }
}

/// Whole seconds
pub fn secs_or(key: &str, default_secs: u64) -> Result<Duration> {
    var_or(key, default_secs).map(Duration::from_secs)
}

/// Comma-separated values, trimmed, blanks dropped
pub fn list_or(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(value) => value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default.iter().map(|item| item.to_string()).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // Each test owns its variable names; tests run in parallel

    #[test]
    fn test_unset_uses_default() {
        assert_eq!(var_or("NAMESWIPE_TEST_UNSET_PORT", 8000u16).unwrap(), 8000);
        assert_eq!(
            secs_or("NAMESWIPE_TEST_UNSET_SECS", 7).unwrap(),
            Duration::from_secs(7)
        );
        assert_eq!(list_or("NAMESWIPE_TEST_UNSET_LIST", &["a"]), vec!["a"]);
    }

    #[test]
    fn test_set_values_are_parsed() {
        std::env::set_var("NAMESWIPE_TEST_PORT", " 9001 ");
        std::env::set_var("NAMESWIPE_TEST_LIST", "http://a, ,http://b");

        assert_eq!(var_or("NAMESWIPE_TEST_PORT", 0u16).unwrap(), 9001);
        assert_eq!(list_or("NAMESWIPE_TEST_LIST", &[]), vec!["http://a", "http://b"]);
    }

    #[test]
    fn test_unparsable_value_names_the_variable() {
        std::env::set_var("NAMESWIPE_TEST_BAD_PORT", "eighty");

        let err = var_or("NAMESWIPE_TEST_BAD_PORT", 0u16).unwrap_err();
        assert!(err.to_string().contains("NAMESWIPE_TEST_BAD_PORT"));
    }
}
