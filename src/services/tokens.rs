//! Token cost estimation.

/// Default characters per token for English prose and code.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Character-count token estimator.
///
/// Counts Unicode scalar values, not bytes, and rounds up so any non-empty text costs
/// at least one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator {
    /// Creates an estimator; a ratio of zero is treated as one.
    #[must_use]
    pub const fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: if chars_per_token == 0 { 1 } else { chars_per_token },
        }
    }

    /// Estimated tokens for `text`.
    #[must_use]
    pub fn estimate(&self, text: &str) -> u64 {
        let chars = text.chars().count();
        chars.div_ceil(self.chars_per_token) as u64
    }

    /// Estimated tokens for several texts.
    #[must_use]
    pub fn estimate_all<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> u64 {
        texts.into_iter().map(|t| self.estimate(t)).sum()
    }

    /// Cuts `text` to at most `tokens` estimated tokens, on a char boundary.
    #[must_use]
    pub fn truncate(&self, text: &str, tokens: u64) -> String {
        let max_chars = usize::try_from(tokens)
            .unwrap_or(usize::MAX)
            .saturating_mul(self.chars_per_token);
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", 0 ; "empty")]
    #[test_case("abc", 1 ; "rounds up")]
    #[test_case("abcd", 1 ; "exact")]
    #[test_case("abcde", 2 ; "partial second token")]
    #[test_case("ééééé", 2 ; "counts chars not bytes")]
    fn test_estimate(text: &str, expected: u64) {
        assert_eq!(TokenEstimator::default().estimate(text), expected);
    }

    #[test]
    fn test_zero_ratio_is_clamped() {
        assert_eq!(TokenEstimator::new(0).estimate("abc"), 3);
    }

    #[test]
    fn test_truncate_fits_budget() {
        let estimator = TokenEstimator::default();
        let cut = estimator.truncate("ééééé-abcdef", 2);
        assert_eq!(cut, "ééééé-ab");
        assert_eq!(estimator.estimate(&cut), 2);
        assert_eq!(estimator.truncate("abc", 10), "abc");
    }

    #[test]
    fn test_estimate_all() {
        assert_eq!(TokenEstimator::default().estimate_all(["abcd", "abcde"]), 3);
    }
}
