//! Pattern registry
//!
//! Maps mask symbols to the rule that decides what a slot accepts. Built-in
//! rules cover the five standard mask characters; callers replace or add rules
//! per key, and inline regex sections register their compiled expressions
//! under synthetic keys.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::compiler::{MaskSpec, Symbol};
use crate::error::{MaskError, Result};

/// A caller-supplied single-character test
#[derive(Clone)]
pub struct CharPredicate(Arc<dyn Fn(char) -> bool + Send + Sync>);

impl CharPredicate {
    pub fn new(f: impl Fn(char) -> bool + Send + Sync + 'static) -> Self {
        CharPredicate(Arc::new(f))
    }

    pub fn test(&self, c: char) -> bool {
        (self.0)(c)
    }
}

impl fmt::Debug for CharPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CharPredicate(..)")
    }
}

/// A caller-supplied single-character normalizer
#[derive(Clone)]
pub struct CharMap(Arc<dyn Fn(char) -> char + Send + Sync>);

impl CharMap {
    pub fn new(f: impl Fn(char) -> char + Send + Sync + 'static) -> Self {
        CharMap(Arc::new(f))
    }

    pub fn map(&self, c: char) -> char {
        (self.0)(c)
    }
}

impl fmt::Debug for CharMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CharMap(..)")
    }
}

/// A predicate over a whole raw value
#[derive(Clone)]
pub struct ValueCheck(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl ValueCheck {
    pub fn new(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        ValueCheck(Arc::new(f))
    }

    pub fn check(&self, raw: &str) -> bool {
        (self.0)(raw)
    }
}

impl fmt::Debug for ValueCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueCheck(..)")
    }
}

/// What a slot accepts
#[derive(Debug, Clone)]
pub enum CharMatcher {
    /// ASCII digits `0-9`
    Digit,
    /// ASCII letters `a-z`, `A-Z`
    Alphabetic,
    /// ASCII letters and digits
    Alphanumeric,
    /// Characters the expression finds a match in
    Regex(Regex),
    /// A caller closure
    Custom(CharPredicate),
    /// Nothing
    Never,
}

impl CharMatcher {
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharMatcher::Digit => c.is_ascii_digit(),
            CharMatcher::Alphabetic => c.is_ascii_alphabetic(),
            CharMatcher::Alphanumeric => c.is_ascii_alphanumeric(),
            CharMatcher::Regex(regex) => {
                let mut buf = [0u8; 4];
                regex.is_match(c.encode_utf8(&mut buf))
            }
            CharMatcher::Custom(predicate) => predicate.test(c),
            CharMatcher::Never => false,
        }
    }
}

/// How an accepted character is normalized
#[derive(Debug, Clone)]
pub enum Transform {
    Uppercase,
    Lowercase,
    Custom(CharMap),
}

impl Transform {
    pub fn apply(&self, c: char) -> char {
        match self {
            // One input char always yields one output char.
            Transform::Uppercase => single_char(c.to_uppercase(), c),
            Transform::Lowercase => single_char(c.to_lowercase(), c),
            Transform::Custom(map) => map.map(c),
        }
    }
}

fn single_char(mut mapped: impl ExactSizeIterator<Item = char>, original: char) -> char {
    if mapped.len() == 1 {
        mapped.next().unwrap_or(original)
    } else {
        original
    }
}

/// The rule behind one slot key
#[derive(Debug, Clone)]
pub struct PatternRule {
    matcher: CharMatcher,
    transform: Option<Transform>,
    validate: Option<ValueCheck>,
}

impl PatternRule {
    /// Create a rule with no transform and no validator
    pub fn new(matcher: CharMatcher) -> Self {
        PatternRule {
            matcher,
            transform: None,
            validate: None,
        }
    }

    /// Create a rule from a single-character regular expression
    pub fn from_regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|err| MaskError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        Ok(PatternRule::new(CharMatcher::Regex(regex)))
    }

    /// Create a rule from a closure
    pub fn predicate(f: impl Fn(char) -> bool + Send + Sync + 'static) -> Self {
        PatternRule::new(CharMatcher::Custom(CharPredicate::new(f)))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a validator that runs against the raw value whenever this key is in the mask
    pub fn with_validator(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Some(ValueCheck::new(f));
        self
    }

    pub fn matcher(&self) -> &CharMatcher {
        &self.matcher
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    pub fn validator(&self) -> Option<&ValueCheck> {
        self.validate.as_ref()
    }

    /// Whether the slot accepts this character
    pub fn matches(&self, c: char) -> bool {
        self.matcher.matches(c)
    }

    /// The character written into the masked value for an accepted input
    pub fn apply(&self, c: char) -> char {
        match &self.transform {
            Some(transform) => transform.apply(c),
            None => c,
        }
    }
}

/// What a pattern position resolves to
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Slot(&'a PatternRule),
    Literal(char),
}

/// Registry of slot rules
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    rules: HashMap<Symbol, PatternRule>,
    unbound: PatternRule,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        PatternRegistry::builtin()
    }
}

impl PatternRegistry {
    /// An empty registry: every mask character is a literal
    pub fn empty() -> Self {
        PatternRegistry {
            rules: HashMap::new(),
            unbound: PatternRule::new(CharMatcher::Never),
        }
    }

    /// The built-in rules: `#` digit, `A` letter, `*` alphanumeric,
    /// `U` letter to uppercase, `L` letter to lowercase
    pub fn builtin() -> Self {
        let mut registry = PatternRegistry::empty();
        registry.insert('#', PatternRule::new(CharMatcher::Digit));
        registry.insert('A', PatternRule::new(CharMatcher::Alphabetic));
        registry.insert('*', PatternRule::new(CharMatcher::Alphanumeric));
        registry.insert(
            'U',
            PatternRule::new(CharMatcher::Alphabetic).with_transform(Transform::Uppercase),
        );
        registry.insert(
            'L',
            PatternRule::new(CharMatcher::Alphabetic).with_transform(Transform::Lowercase),
        );
        registry
    }

    /// Built-ins with caller rules laid over them; a caller rule replaces the
    /// built-in of the same key entirely
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a char, &'a PatternRule)>) -> Self {
        let mut registry = PatternRegistry::builtin();
        for (&key, rule) in overrides {
            registry.insert(key, rule.clone());
        }
        registry
    }

    /// Register the inline regex sections of a compiled mask
    pub fn register_inline(&mut self, spec: &MaskSpec) {
        for (symbol, regex) in spec.synthetic_patterns() {
            self.rules
                .insert(symbol, PatternRule::new(CharMatcher::Regex(regex.clone())));
        }
    }

    /// Add or replace the rule for a mask character
    pub fn insert(&mut self, key: char, rule: PatternRule) -> Option<PatternRule> {
        self.rules.insert(Symbol::Char(key), rule)
    }

    /// Remove the rule for a mask character, making it a literal
    pub fn remove(&mut self, key: char) -> Option<PatternRule> {
        self.rules.remove(&Symbol::Char(key))
    }

    pub fn get(&self, symbol: Symbol) -> Option<&PatternRule> {
        self.rules.get(&symbol)
    }

    /// Resolve a pattern position to its slot rule or literal character
    pub fn resolve(&self, symbol: Symbol) -> Resolved<'_> {
        match (self.rules.get(&symbol), symbol) {
            (Some(rule), _) => Resolved::Slot(rule),
            (None, Symbol::Char(c)) => Resolved::Literal(c),
            // An inline key is always a slot; without a compiled pattern it accepts nothing.
            (None, Symbol::Inline(_)) => Resolved::Slot(&self.unbound),
        }
    }

    pub fn is_slot(&self, symbol: Symbol) -> bool {
        matches!(self.resolve(symbol), Resolved::Slot(_))
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
