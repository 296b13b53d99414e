//! Value validation
//!
//! Runs the whole-value validator first, then the validators attached to
//! pattern keys that appear in the active mask. Both levels stop at the first
//! failure.

use crate::compiler::Symbol;
use crate::registry::{PatternRegistry, ValueCheck};

/// Message reported for every failed check
pub const INVALID_INPUT: &str = "Invalid input";

/// Which check rejected a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The whole-value validator from the options
    Value,
    /// The validator attached to this pattern key
    Slot(Symbol),
}

/// Outcome of validating a raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_message: Option<String>,
    pub failure: Option<ValidationFailure>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        ValidationResult::valid()
    }
}

impl ValidationResult {
    pub fn valid() -> Self {
        ValidationResult {
            is_valid: true,
            error_message: None,
            failure: None,
        }
    }

    pub fn invalid(failure: ValidationFailure) -> Self {
        ValidationResult {
            is_valid: false,
            error_message: Some(INVALID_INPUT.to_string()),
            failure: Some(failure),
        }
    }
}

/// Validate a raw value against the active mask
///
/// `active` is the pattern currently in effect; per-key validators only run
/// for keys that appear in it, each key once, in order of first appearance.
pub fn validate(
    raw: &str,
    active: &[Symbol],
    registry: &PatternRegistry,
    whole_value: Option<&ValueCheck>,
) -> ValidationResult {
    if let Some(check) = whole_value
        && !check.check(raw)
    {
        return ValidationResult::invalid(ValidationFailure::Value);
    }

    let mut seen: Vec<Symbol> = Vec::new();
    for &symbol in active {
        if seen.contains(&symbol) {
            continue;
        }
        seen.push(symbol);

        if let Some(check) = registry.get(symbol).and_then(|rule| rule.validator())
            && !check.check(raw)
        {
            return ValidationResult::invalid(ValidationFailure::Slot(symbol));
        }
    }

    ValidationResult::valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CharMatcher, PatternRule};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn symbols(mask: &str) -> Vec<Symbol> {
        mask.chars().map(Symbol::Char).collect()
    }

    #[test]
    fn test_no_validators_is_valid() {
        let result = validate("12", &symbols("##"), &PatternRegistry::builtin(), None);
        assert_eq!(result, ValidationResult::valid());
    }

    #[test]
    fn test_whole_value_failure() {
        let check = ValueCheck::new(|raw| raw.len() == 3);
        let registry = PatternRegistry::builtin();

        let result = validate("12", &symbols("###"), &registry, Some(&check));
        assert!(!result.is_valid);
        assert_eq!(result.error_message.as_deref(), Some("Invalid input"));
        assert_eq!(result.failure, Some(ValidationFailure::Value));

        assert!(validate("123", &symbols("###"), &registry, Some(&check)).is_valid);
    }

    #[test]
    fn test_slot_validator_only_for_keys_in_mask() {
        let mut registry = PatternRegistry::builtin();
        registry.insert(
            'X',
            PatternRule::new(CharMatcher::Digit).with_validator(|_| false),
        );

        assert!(validate("12", &symbols("##"), &registry, None).is_valid);
        let result = validate("12", &symbols("#X"), &registry, None);
        assert_eq!(result.failure, Some(ValidationFailure::Slot(Symbol::Char('X'))));
    }

    #[test]
    fn test_whole_value_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = PatternRegistry::builtin();
        registry.insert(
            '#',
            PatternRule::new(CharMatcher::Digit).with_validator(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );
        let reject = ValueCheck::new(|_| false);

        validate("1", &symbols("###"), &registry, Some(&reject));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        validate("1", &symbols("###"), &registry, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
