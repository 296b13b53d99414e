//! Mask engine
//!
//! Applies a compiled mask to input text, recovers the raw value from a masked
//! value, and decides where the caret goes after an edit. Every function here
//! is pure over `(input, spec, registry, placeholder)`; session state lives in
//! [`crate::session`].
//!
//! Positions are counted in `char`s.

use tracing::trace;

use crate::compiler::{MaskSpec, Symbol, compile};
use crate::options::MaskOptions;
use crate::registry::{PatternRegistry, Resolved, ValueCheck};
use crate::validate::{ValidationResult, validate};

/// Kind of edit, as far as caret placement is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOp {
    Insert,
    Delete,
}

/// The pattern in effect for an input of a given length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicPattern {
    /// Pattern symbols with inactive optional sections removed
    pub symbols: Vec<Symbol>,
    /// Indices of the optional sections that are included
    pub active_sections: Vec<usize>,
}

/// A masked value together with what was derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub masked: String,
    pub raw: String,
    /// The pattern the input was masked with
    pub pattern: DynamicPattern,
}

impl Formatted {
    pub fn active_sections(&self) -> &[usize] {
        &self.pattern.active_sections
    }
}

/// What a backspace at a caret position should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backspace {
    /// Let the deletion happen
    Proceed,
    /// Suppress it and move the caret here instead
    Redirect { cursor: usize },
}

/// A compiled mask bound to its rules and placeholder
#[derive(Debug, Clone)]
pub struct Masker {
    spec: MaskSpec,
    registry: PatternRegistry,
    placeholder: char,
}

impl Masker {
    /// Bind a compiled mask to a registry; the mask's inline sections are
    /// registered on top of the given rules
    pub fn new(spec: MaskSpec, mut registry: PatternRegistry, placeholder: char) -> Self {
        registry.register_inline(&spec);
        Masker {
            spec,
            registry,
            placeholder,
        }
    }

    /// Compile the mask described by a set of options
    pub fn from_options(options: &MaskOptions) -> Self {
        let spec = compile(&options.mask, options.compile_options());
        let registry = PatternRegistry::with_overrides(&options.patterns);
        Masker::new(spec, registry, options.placeholder)
    }

    pub fn spec(&self) -> &MaskSpec {
        &self.spec
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    /// Whether a pattern symbol is a slot
    pub fn is_slot(&self, symbol: Symbol) -> bool {
        self.registry.is_slot(symbol)
    }

    /// The pattern in effect for input of `input_len` characters
    ///
    /// A section is included once the input is longer than the section's
    /// start index; otherwise its positions are removed.
    pub fn dynamic_pattern(&self, input_len: usize) -> DynamicPattern {
        let sections = self.spec.optional_sections();
        if sections.is_empty() {
            return DynamicPattern {
                symbols: self.spec.symbols().to_vec(),
                active_sections: Vec::new(),
            };
        }

        let active_sections: Vec<usize> = sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.is_active(input_len))
            .map(|(index, _)| index)
            .collect();

        let symbols = self
            .spec
            .symbols()
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                !sections
                    .iter()
                    .any(|section| !section.is_active(input_len) && section.contains(*index))
            })
            .map(|(_, &symbol)| symbol)
            .collect();

        DynamicPattern {
            symbols,
            active_sections,
        }
    }

    /// The pattern a piece of text is masked against
    ///
    /// Normally this is [`Masker::dynamic_pattern`] for the text's length.
    /// Text that already reads as a masked value of another section layout
    /// keeps that layout, so a masked value maps back to the pattern that
    /// produced it.
    pub fn pattern_for(&self, text: &str) -> DynamicPattern {
        let chars: Vec<char> = text.chars().collect();
        self.select_pattern(&chars)
    }

    fn select_pattern(&self, text: &[char]) -> DynamicPattern {
        let primary = self.dynamic_pattern(text.len());
        if self.spec.optional_sections().is_empty() || self.fits(text, &primary.symbols) {
            return primary;
        }
        self.section_layouts()
            .into_iter()
            .map(|len| self.dynamic_pattern(len))
            .find(|pattern| self.fits(text, &pattern.symbols))
            .unwrap_or(primary)
    }

    /// One input length per distinct set of active sections, most active first
    fn section_layouts(&self) -> Vec<usize> {
        let mut lengths: Vec<usize> = self
            .spec
            .optional_sections()
            .iter()
            .map(|section| section.start + 1)
            .collect();
        lengths.push(0);
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        lengths.dedup();
        lengths
    }

    /// Whether `text` is a prefix of a value masked with `pattern`: literals in
    /// place, slots holding the placeholder or a character the slot keeps as is
    fn fits(&self, text: &[char], pattern: &[Symbol]) -> bool {
        text.len() <= pattern.len()
            && text
                .iter()
                .zip(pattern)
                .all(|(&c, &symbol)| match self.registry.resolve(symbol) {
                    Resolved::Literal(literal) => c == literal,
                    Resolved::Slot(rule) => {
                        c == self.placeholder || (rule.matches(c) && rule.apply(c) == c)
                    }
                })
    }

    /// Apply the mask to input text
    ///
    /// Slots take one input character each: a match is written (transformed),
    /// a mismatch writes the placeholder and the character is dropped.
    /// Literals are always written and swallow an equal input character.
    /// The walk stops at the end of the pattern or of the input; empty input
    /// gives an empty result.
    ///
    /// # Example
    /// ```
    /// use inmask_core::{Masker, MaskOptions};
    ///
    /// let masker = Masker::from_options(&MaskOptions::new("(###) ###-####"));
    /// assert_eq!(masker.apply("1234567890"), "(123) 456-7890");
    /// ```
    pub fn apply(&self, input: &str) -> String {
        let input: Vec<char> = input.chars().collect();
        if input.is_empty() {
            return String::new();
        }
        let pattern = self.select_pattern(&input);
        self.walk(&input, &pattern.symbols)
    }

    fn walk(&self, input: &[char], pattern: &[Symbol]) -> String {
        let mut output = String::with_capacity(pattern.len());
        let mut next = 0;

        for &symbol in pattern {
            let Some(&c) = input.get(next) else {
                break;
            };
            match self.registry.resolve(symbol) {
                Resolved::Slot(rule) => {
                    if rule.matches(c) {
                        output.push(rule.apply(c));
                    } else {
                        output.push(self.placeholder);
                    }
                    next += 1;
                }
                Resolved::Literal(literal) => {
                    output.push(literal);
                    if c == literal {
                        next += 1;
                    }
                }
            }
        }

        output
    }

    /// Recover the raw value from a masked value
    ///
    /// Keeps characters at slot positions that are not the placeholder.
    /// Characters past the end of the pattern are ignored.
    pub fn extract_raw(&self, masked: &str) -> String {
        let pattern = self.pattern_for(masked);
        self.extract_with(masked, &pattern.symbols)
    }

    fn extract_with(&self, masked: &str, pattern: &[Symbol]) -> String {
        masked
            .chars()
            .zip(pattern)
            .filter(|&(c, &symbol)| c != self.placeholder && self.is_slot(symbol))
            .map(|(c, _)| c)
            .collect()
    }

    /// Mask input and derive the raw value and active sections from the
    /// same pattern
    pub fn format(&self, input: &str) -> Formatted {
        let chars: Vec<char> = input.chars().collect();
        let pattern = self.select_pattern(&chars);
        let masked = if chars.is_empty() {
            String::new()
        } else {
            self.walk(&chars, &pattern.symbols)
        };
        let raw = self.extract_with(&masked, &pattern.symbols);
        trace!(input, masked = %masked, raw = %raw, "formatted");
        Formatted {
            masked,
            raw,
            pattern,
        }
    }

    /// Validate a raw value against the pattern in effect for `masked`
    pub fn validate(
        &self,
        raw: &str,
        masked: &str,
        whole_value: Option<&ValueCheck>,
    ) -> ValidationResult {
        let pattern = self.pattern_for(masked);
        validate(raw, &pattern.symbols, &self.registry, whole_value)
    }

    /// Validate a formatted value against the pattern it was masked with
    pub fn validate_formatted(
        &self,
        formatted: &Formatted,
        whole_value: Option<&ValueCheck>,
    ) -> ValidationResult {
        validate(
            &formatted.raw,
            &formatted.pattern.symbols,
            &self.registry,
            whole_value,
        )
    }

    /// Where the caret goes after an edit
    ///
    /// `edit_position` is the caret the text surface reported after the edit.
    /// Filling an empty field puts the caret at the end. A delete lands on the
    /// first slot at or after the edit position. An insert moves one past the
    /// edit position and then over any literals. The result never exceeds the
    /// length of `current`.
    pub fn next_cursor(
        &self,
        previous: &str,
        current: &str,
        edit_position: usize,
        op: CursorOp,
    ) -> usize {
        let len = current.chars().count();
        if previous.is_empty() && len > 0 {
            return len;
        }

        let pattern = self.pattern_for(current).symbols;
        let position = match op {
            CursorOp::Delete => (edit_position..pattern.len())
                .find(|&index| self.is_slot(pattern[index]))
                .unwrap_or(edit_position),
            CursorOp::Insert => {
                let mut next = edit_position + 1;
                while next < pattern.len() && !self.is_slot(pattern[next]) {
                    next += 1;
                }
                next
            }
        };

        position.min(len)
    }

    /// Decide what a backspace at `caret` does to `masked`
    ///
    /// When the character before the caret sits on a literal position the
    /// deletion is redirected: the caret moves back over the run of literals
    /// to just after the nearest slot before it.
    pub fn backspace(&self, masked: &str, caret: usize) -> Backspace {
        if caret == 0 {
            return Backspace::Proceed;
        }

        let pattern = self.pattern_for(masked).symbols;
        let index = caret - 1;
        match pattern.get(index) {
            Some(&symbol) if !self.is_slot(symbol) => {
                let mut cursor = index;
                while cursor > 0 && !self.is_slot(pattern[cursor - 1]) {
                    cursor -= 1;
                }
                Backspace::Redirect { cursor }
            }
            _ => Backspace::Proceed,
        }
    }

    /// A readable description of the mask, e.g. `Format: number number / number number`
    pub fn describe(&self) -> String {
        let words: Vec<String> = self
            .spec
            .symbols()
            .iter()
            .map(|&symbol| match (self.registry.resolve(symbol), symbol) {
                (Resolved::Literal(c), _) => c.to_string(),
                (Resolved::Slot(_), Symbol::Char('#')) => "number".to_string(),
                (Resolved::Slot(_), Symbol::Char('A')) => "letter".to_string(),
                (Resolved::Slot(_), Symbol::Char('U')) => "uppercase letter".to_string(),
                (Resolved::Slot(_), Symbol::Char('L')) => "lowercase letter".to_string(),
                (Resolved::Slot(_), _) => "character".to_string(),
            })
            .collect();
        format!("Format: {}", words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PatternRule, Transform};

    fn masker(mask: &str) -> Masker {
        Masker::from_options(&MaskOptions::new(mask))
    }

    fn sectioned(mask: &str) -> Masker {
        Masker::from_options(&MaskOptions::new(mask).with_optional_sections(true))
    }

    #[test]
    fn test_date_mask() {
        let m = masker("##/##/####");
        assert_eq!(m.apply("12345678"), "12/34/5678");
        assert_eq!(m.extract_raw("12/34/5678"), "12345678");
    }

    #[test]
    fn test_phone_mask() {
        assert_eq!(masker("(###) ###-####").apply("1234567890"), "(123) 456-7890");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(masker("(###)").apply(""), "");
    }

    #[test]
    fn test_excess_input_ignored() {
        assert_eq!(masker("###").apply("12345"), "123");
    }

    #[test]
    fn test_rejected_input_writes_placeholders() {
        let m = masker("###");
        assert_eq!(m.apply("abc"), "___");
        assert_eq!(m.extract_raw("___"), "");
        assert_eq!(m.apply("1b3"), "1_3");
    }

    #[test]
    fn test_custom_placeholder() {
        let m = Masker::from_options(&MaskOptions::new("##").with_placeholder('*'));
        assert_eq!(m.apply("x1"), "*1");
        assert_eq!(m.extract_raw("*1"), "1");
    }

    #[test]
    fn test_typed_literals_are_absorbed() {
        let m = masker("##/##");
        assert_eq!(m.apply("12/34"), "12/34");
        assert_eq!(m.apply("12/"), "12/");
    }

    #[test]
    fn test_leading_literal_emitted_before_first_slot() {
        let m = masker("(###)");
        assert_eq!(m.apply("1"), "(1");
        assert_eq!(m.apply("123"), "(123");
        assert_eq!(m.apply("1234"), "(123)");
    }

    #[test]
    fn test_transforms() {
        assert_eq!(masker("U##L").apply("a12B"), "A12b");
    }

    #[test]
    fn test_custom_transform_rule() {
        let options = MaskOptions::new("AAA").with_pattern(
            'A',
            PatternRule::predicate(|c| c.is_ascii_uppercase())
                .with_transform(Transform::Lowercase),
        );
        assert_eq!(Masker::from_options(&options).apply("ABC"), "abc");
    }

    #[test]
    fn test_idempotent_on_masked_value() {
        let m = masker("(###) ###-####");
        let once = m.apply("12a4567890");
        assert_eq!(m.apply(&once), once);
    }

    #[test]
    fn test_extract_ignores_overflow() {
        assert_eq!(masker("##").extract_raw("1234"), "12");
    }

    #[test]
    fn test_dynamic_pattern() {
        let m = sectioned("##[/##]");
        assert_eq!(m.spec().effective_pattern(), "##/##");

        let short = m.dynamic_pattern(2);
        assert_eq!(crate::compiler::render(&short.symbols), "##");
        assert!(short.active_sections.is_empty());

        let long = m.dynamic_pattern(3);
        assert_eq!(crate::compiler::render(&long.symbols), "##/##");
        assert_eq!(long.active_sections, vec![0]);
    }

    #[test]
    fn test_optional_section_growth() {
        let m = sectioned("##[/##]");
        assert_eq!(m.apply("12"), "12");
        assert_eq!(m.apply("1234"), "12/34");
        assert_eq!(m.extract_raw("12/34"), "1234");
        assert_eq!(m.format("123").raw, "123");
    }

    #[test]
    fn test_multiple_sections_drop_independently() {
        let m = sectioned("##[/##][/####]");
        assert_eq!(m.apply("1234"), "12/34");
        assert_eq!(m.format("1234").active_sections(), [0]);
        assert_eq!(m.apply("12345678"), "12/34/5678");
    }

    #[test]
    fn test_section_followed_by_literals_round_trips() {
        let m = sectioned("+#[#] (###) ###-####");
        let formatted = m.format("12");
        assert_eq!(formatted.masked, "+1 (2");
        assert_eq!(formatted.raw, "12");
        assert!(formatted.active_sections().is_empty());

        assert_eq!(m.extract_raw("+1 (2"), "12");
        assert_eq!(m.apply("+1 (2"), "+1 (2");
        assert_eq!(m.validate("12", "+1 (2", None), ValidationResult::valid());
    }

    #[test]
    fn test_literal_only_section_round_trips() {
        let m = sectioned("(#[-]#");
        assert_eq!(m.apply("12"), "(12");
        assert_eq!(m.extract_raw("(12"), "12");
        assert_eq!(m.apply("123"), "(1-2");
        assert_eq!(m.extract_raw("(1-2"), "12");
    }

    #[test]
    fn test_pattern_for_masked_value() {
        let m = sectioned("(#[-]#");
        assert!(m.pattern_for("(12").active_sections.is_empty());
        assert_eq!(m.pattern_for("(1-2").active_sections, vec![0]);
        assert_eq!(m.next_cursor("(1", "(12", 2, CursorOp::Insert), 3);
    }

    #[test]
    fn test_inline_regex_slots() {
        let m = Masker::from_options(&MaskOptions::new("#{[a-z]}-#").with_regex_patterns(true));
        assert_eq!(m.apply("a5"), "a-5");
        assert_eq!(m.apply("55"), "_-5");
        assert_eq!(m.extract_raw("a-5"), "a5");
    }

    #[test]
    fn test_cursor_after_first_fill() {
        let m = masker("##/##");
        assert_eq!(m.next_cursor("", "1", 1, CursorOp::Insert), 1);
    }

    #[test]
    fn test_cursor_insert_skips_literals() {
        let m = masker("##/##");
        assert_eq!(m.next_cursor("1", "12/3", 1, CursorOp::Insert), 3);
        assert_eq!(m.next_cursor("12/3", "12/34", 4, CursorOp::Insert), 5);
    }

    #[test]
    fn test_cursor_clamped_to_value() {
        let m = masker("##/##");
        assert_eq!(m.next_cursor("1", "12", 2, CursorOp::Insert), 2);
    }

    #[test]
    fn test_cursor_delete_lands_on_slot() {
        let m = masker("(###) ###");
        assert_eq!(m.next_cursor("(123) 4", "(123) ", 4, CursorOp::Delete), 6);
        assert_eq!(m.next_cursor("(12", "(1", 2, CursorOp::Delete), 2);
    }

    #[test]
    fn test_cursor_delete_without_slot_keeps_position() {
        let m = masker("##--");
        assert_eq!(m.next_cursor("12--", "12-", 3, CursorOp::Delete), 3);
    }

    #[test]
    fn test_backspace_over_literal() {
        let m = masker("##/##");
        assert_eq!(m.backspace("12/34", 3), Backspace::Redirect { cursor: 2 });
        assert_eq!(m.backspace("12/34", 4), Backspace::Proceed);
        assert_eq!(m.backspace("12/34", 0), Backspace::Proceed);
    }

    #[test]
    fn test_backspace_over_literal_run() {
        let m = masker("(###) ###");
        assert_eq!(m.backspace("(123) 4", 6), Backspace::Redirect { cursor: 4 });
        assert_eq!(m.backspace("(1", 1), Backspace::Redirect { cursor: 0 });
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            masker("##/U").describe(),
            "Format: number number / uppercase letter"
        );
    }
}
