//! Mask pattern compiler
//!
//! Turns a mask string written in the mask mini-language into a [`MaskSpec`]:
//!
//! ```text
//!   mask      := item*
//!   item      := section | inline | char
//!   section   := '[' (inline | char)* ']'      (']' may be missing at the end)
//!   inline    := '#{' body '}'                  (body: one or more non-'}' chars)
//!   char      := any character
//! ```
//!
//! Inline regex sections are expanded first, so an inline key is a single
//! symbol and optional-section indices are exact positions in the final
//! effective pattern.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use tracing::debug;

use crate::error::{MaskError, Span};

/// One position of an effective pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// A mask character; a slot if the registry has a rule for it, a literal otherwise
    Char(char),
    /// The synthetic key `#R<n>` of an expanded inline regex section
    Inline(usize),
}

impl Symbol {
    /// The registry key this symbol is looked up by, as written in the mini-language
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{}", c),
            Symbol::Inline(n) => write!(f, "#R{}", n),
        }
    }
}

/// Render a symbol sequence back to mask text
pub fn render(symbols: &[Symbol]) -> String {
    symbols.iter().map(Symbol::to_string).collect()
}

/// A bracketed region that is only part of the mask once input reaches it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalSection {
    /// First pattern index of the section
    pub start: usize,
    /// Last pattern index of the section (inclusive)
    pub end: usize,
    /// The section's pattern text
    pub content: String,
}

impl OptionalSection {
    /// Whether a pattern index falls inside this section
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Whether input of the given length reaches this section
    pub fn is_active(&self, input_len: usize) -> bool {
        input_len > self.start
    }
}

/// Feature flags for the compiler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Parse `[...]` as optional sections
    pub optional_sections: bool,
    /// Expand `#{...}` as inline regex sections
    pub regex_sections: bool,
}

/// A compiled mask
#[derive(Debug, Clone)]
pub struct MaskSpec {
    source: String,
    symbols: Vec<Symbol>,
    optional_sections: Vec<OptionalSection>,
    inline_patterns: Vec<Regex>,
    diagnostics: Vec<MaskError>,
}

impl MaskSpec {
    /// The mask string this spec was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The effective pattern
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The effective pattern rendered as mask text
    pub fn effective_pattern(&self) -> String {
        render(&self.symbols)
    }

    /// Number of positions in the effective pattern
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the effective pattern is empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Optional sections in pattern order
    pub fn optional_sections(&self) -> &[OptionalSection] {
        &self.optional_sections
    }

    /// The compiled expression of inline section `n`
    pub fn inline_pattern(&self, n: usize) -> Option<&Regex> {
        self.inline_patterns.get(n)
    }

    /// Inline sections keyed by their synthetic key (`#R0`, `#R1`, ...)
    pub fn synthetic_patterns(&self) -> impl Iterator<Item = (Symbol, &Regex)> + '_ {
        self.inline_patterns
            .iter()
            .enumerate()
            .map(|(n, regex)| (Symbol::Inline(n), regex))
    }

    /// Problems recovered from while compiling
    pub fn diagnostics(&self) -> &[MaskError] {
        &self.diagnostics
    }
}

/// Compile a mask string
///
/// Never fails: an invalid inline regex stays literal text and an unterminated
/// section runs to the end of the mask. Both are recorded in
/// [`MaskSpec::diagnostics`].
pub fn compile(mask: &str, options: CompileOptions) -> MaskSpec {
    let chars: Vec<char> = mask.chars().collect();
    let mut diagnostics = Vec::new();

    let (located, inline_patterns) = if options.regex_sections {
        scan_inline_sections(&chars, &mut diagnostics)
    } else {
        (plain_symbols(&chars), Vec::new())
    };

    let (symbols, optional_sections) = if options.optional_sections {
        split_optional_sections(located, &mut diagnostics)
    } else {
        (located.into_iter().map(|(_, symbol)| symbol).collect(), Vec::new())
    };

    debug!(
        mask,
        effective = %render(&symbols),
        sections = optional_sections.len(),
        inline = inline_patterns.len(),
        "compiled mask"
    );

    MaskSpec {
        source: mask.to_string(),
        symbols,
        optional_sections,
        inline_patterns,
        diagnostics,
    }
}

/// Result of parsing optional sections out of a mask string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSections {
    /// The mask with brackets removed
    pub parsed_mask: String,
    /// The sections found, indexed against `parsed_mask`
    pub optional_sections: Vec<OptionalSection>,
}

/// Parse `[...]` optional sections out of a mask string
///
/// # Example
/// ```
/// use inmask_core::parse_optional_sections;
///
/// let parsed = parse_optional_sections("##[/##]");
/// assert_eq!(parsed.parsed_mask, "##/##");
/// assert_eq!(parsed.optional_sections[0].start, 2);
/// assert_eq!(parsed.optional_sections[0].end, 4);
/// ```
pub fn parse_optional_sections(mask: &str) -> ParsedSections {
    let chars: Vec<char> = mask.chars().collect();
    let (symbols, optional_sections) =
        split_optional_sections(plain_symbols(&chars), &mut Vec::new());
    ParsedSections {
        parsed_mask: render(&symbols),
        optional_sections,
    }
}

/// Result of expanding inline regex sections in a mask string
#[derive(Debug, Clone)]
pub struct RegexExpansion {
    /// The mask with each valid `#{...}` replaced by its synthetic key
    pub expanded_mask: String,
    /// Compiled expressions keyed by synthetic key
    pub regex_patterns: BTreeMap<String, Regex>,
}

/// Expand `#{...}` inline regex sections in a mask string
///
/// # Example
/// ```
/// use inmask_core::expand_regex_sections;
///
/// let expansion = expand_regex_sections("#{[a-z]}-#{[0-9]}");
/// assert_eq!(expansion.expanded_mask, "#R0-#R1");
/// assert!(expansion.regex_patterns["#R0"].is_match("a"));
/// ```
pub fn expand_regex_sections(mask: &str) -> RegexExpansion {
    let chars: Vec<char> = mask.chars().collect();
    let (located, patterns) = scan_inline_sections(&chars, &mut Vec::new());
    let symbols: Vec<Symbol> = located.into_iter().map(|(_, symbol)| symbol).collect();
    RegexExpansion {
        expanded_mask: render(&symbols),
        regex_patterns: patterns
            .into_iter()
            .enumerate()
            .map(|(n, regex)| (Symbol::Inline(n).key(), regex))
            .collect(),
    }
}

/// A symbol paired with its position in the source mask
type Located = (usize, Symbol);

fn plain_symbols(chars: &[char]) -> Vec<Located> {
    chars
        .iter()
        .enumerate()
        .map(|(pos, &c)| (pos, Symbol::Char(c)))
        .collect()
}

fn scan_inline_sections(
    chars: &[char],
    diagnostics: &mut Vec<MaskError>,
) -> (Vec<Located>, Vec<Regex>) {
    let mut located = Vec::with_capacity(chars.len());
    let mut patterns = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if chars[pos] == '#'
            && chars.get(pos + 1) == Some(&'{')
            && let Some(body_len) = chars[pos + 2..].iter().position(|&c| c == '}')
            && body_len > 0
        {
            let close = pos + 2 + body_len;
            let body: String = chars[pos + 2..close].iter().collect();

            match Regex::new(&body) {
                Ok(regex) => {
                    located.push((pos, Symbol::Inline(patterns.len())));
                    patterns.push(regex);
                }
                Err(err) => {
                    debug!(body = %body, position = pos, "inline regex kept as literal text");
                    diagnostics.push(MaskError::InvalidRegexSection {
                        span: Span::new(pos, close + 1),
                        body,
                        message: err.to_string(),
                    });
                    located.extend((pos..=close).map(|p| (p, Symbol::Char(chars[p]))));
                }
            }
            pos = close + 1;
            continue;
        }

        located.push((pos, Symbol::Char(chars[pos])));
        pos += 1;
    }

    (located, patterns)
}

fn split_optional_sections(
    located: Vec<Located>,
    diagnostics: &mut Vec<MaskError>,
) -> (Vec<Symbol>, Vec<OptionalSection>) {
    let mut symbols = Vec::with_capacity(located.len());
    let mut sections = Vec::new();
    let mut iter = located.into_iter();

    while let Some((pos, symbol)) = iter.next() {
        if symbol != Symbol::Char('[') {
            symbols.push(symbol);
            continue;
        }

        let start = symbols.len();
        let mut content = String::new();
        let mut closed = false;
        for (_, inner) in iter.by_ref() {
            if inner == Symbol::Char(']') {
                closed = true;
                break;
            }
            content.push_str(&inner.key());
            symbols.push(inner);
        }

        if !closed {
            debug!(position = pos, "optional section runs to end of mask");
            diagnostics.push(MaskError::UnterminatedSection { position: pos });
        }
        if symbols.len() > start {
            sections.push(OptionalSection {
                start,
                end: symbols.len() - 1,
                content,
            });
        }
    }

    (symbols, sections)
}
