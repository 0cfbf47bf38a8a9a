//! Categorization strategies
//!
//! Maps a free-text description to a category label. Two interchangeable
//! strategies exist: a static keyword table and a frequency model learned
//! from the owner's own ledger history.

pub mod learned;
pub mod rules;

pub use learned::{CategoryModel, LearnedCategorizer};
pub use rules::RuleCategorizer;

/// Label returned whenever nothing better is known
pub const UNCATEGORIZED: &str = "uncategorized";

/// Trait for a categorization strategy
pub trait Categorizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classify a non-empty description. Never fails.
    fn classify(&self, description: &str) -> String;
}

/// Categorize an optional description.
///
/// An absent or blank description yields [`UNCATEGORIZED`] without
/// consulting the strategy.
pub fn categorize(strategy: &dyn Categorizer, description: Option<&str>) -> String {
    match description.map(str::trim) {
        Some(text) if !text.is_empty() => strategy.classify(text),
        _ => UNCATEGORIZED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicking;

    impl Categorizer for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn classify(&self, _description: &str) -> String {
            panic!("strategy must not be called for absent descriptions");
        }
    }

    #[test]
    fn test_absent_description_skips_strategy() {
        assert_eq!(categorize(&Panicking, None), UNCATEGORIZED);
        assert_eq!(categorize(&Panicking, Some("   ")), UNCATEGORIZED);
    }

    #[test]
    fn test_present_description_uses_strategy() {
        let rules = RuleCategorizer::new();
        assert_eq!(categorize(&rules, Some("uber pro trabalho")), "transporte");
    }
}
