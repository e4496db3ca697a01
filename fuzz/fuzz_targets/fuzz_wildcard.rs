#![no_main]
use feature_store::wildcard::{WildcardMatcher, WildcardPattern};
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

#[derive(Debug, Arbitrary)]
struct Input {
    pattern: String,
    candidate: String,
}

// Arbitrary patterns must never panic, and a pattern that is nothing but
// wildcards matches every candidate
fuzz_target!(|input: Input| {
    let matcher = WildcardMatcher::default();
    let _ = matcher.matches(&input.pattern, &input.candidate);

    if !WildcardPattern::has_wildcard(&input.pattern, '%') {
        if let Ok(matched) = matcher.matches(&input.pattern, &input.candidate) {
            assert_eq!(matched, input.pattern == input.candidate);
        }
    }

    if let Ok(matched) = matcher.matches("%%", &input.candidate) {
        assert!(matched);
    }
});
