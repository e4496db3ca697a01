//! Wildcard pattern translation
//!
//! A pattern uses a single configurable wildcard character that matches
//! any sequence of characters (including none):
//! - `road%` - names starting with "road"
//! - `%bridge%` - names containing "bridge"
//! - `a%%b` - same as `a%b` (runs of wildcards collapse)
//!
//! Everything else is literal, including regex metacharacters.

/// Translates wildcard patterns into anchored regular expressions
pub struct WildcardPattern;

impl WildcardPattern {
    /// True if `pattern` contains the wildcard character
    pub fn has_wildcard(pattern: &str, wildcard: char) -> bool {
        pattern.contains(wildcard)
    }

    /// Build a full-string regular expression for `pattern`
    ///
    /// # Examples
    /// ```
    /// use feature_store::wildcard::WildcardPattern;
    ///
    /// assert_eq!(WildcardPattern::to_regex("a%b", '%'), r"(?s)^a.*b$");
    /// assert_eq!(WildcardPattern::to_regex("1.5%%", '%'), r"(?s)^1\.5.*$");
    /// ```
    pub fn to_regex(pattern: &str, wildcard: char) -> String {
        let mut out = String::with_capacity(pattern.len() + 8);
        out.push_str("(?s)^");

        let mut literal = String::new();
        let mut prev_wildcard = false;
        for c in pattern.chars() {
            if c == wildcard {
                if !prev_wildcard {
                    out.push_str(&regex::escape(&literal));
                    literal.clear();
                    out.push_str(".*");
                }
                prev_wildcard = true;
            } else {
                literal.push(c);
                prev_wildcard = false;
            }
        }
        out.push_str(&regex::escape(&literal));
        out.push('$');
        out
    }
}
