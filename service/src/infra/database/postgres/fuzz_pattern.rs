//! [`FuzzPattern`] definition.

use derive_more::Display;
use postgres_types::{FromSql, ToSql};

/// `ILIKE` pattern matching any text containing the given input.
///
/// Wildcards of the input are escaped, so they match literally.
#[derive(Clone, Debug, Display, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct FuzzPattern(String);

impl FuzzPattern {
    /// Creates a new [`FuzzPattern`] out of the given `input`.
    ///
    /// Surrounding whitespace of the `input` is ignored.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let input = input.trim();
        let mut pattern = String::with_capacity(input.len() + 2);
        pattern.push('%');
        for c in input.chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Self(pattern)
    }
}

#[cfg(test)]
mod spec {
    use super::FuzzPattern;

    #[test]
    fn wraps_input_in_wildcards() {
        assert_eq!(FuzzPattern::new("  Dom Casmurro ").0, "%Dom Casmurro%");
    }

    #[test]
    fn escapes_wildcards() {
        assert_eq!(FuzzPattern::new(r"50%_off\").0, r"%50\%\_off\\%");
    }
}
