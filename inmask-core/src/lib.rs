//! Inmask Core Library
//!
//! Input masking: format free text against a mask pattern such as
//! `(###) ###-####` while it is being typed, keep the unmasked raw value, and
//! decide where the caret goes after every edit.

pub mod compiler;
pub mod engine;
pub mod error;
pub mod options;
pub mod registry;
pub mod session;
pub mod validate;

pub use compiler::{
    CompileOptions, MaskSpec, OptionalSection, ParsedSections, RegexExpansion, Symbol, compile,
    expand_regex_sections, parse_optional_sections, render,
};
pub use engine::{Backspace, CursorOp, DynamicPattern, Formatted, Masker};
pub use error::{MaskError, Result, Span};
pub use options::{ChangeListener, DEFAULT_PLACEHOLDER, MaskOptions, OptionsPatch};
pub use registry::{
    CharMap, CharMatcher, CharPredicate, PatternRegistry, PatternRule, Resolved, Transform,
    ValueCheck,
};
pub use session::{
    Announcement, EditKind, EditOutcome, FocusOutcome, KeyAction, Lifecycle, MaskSession,
    ScheduledCursor, SessionState, TextSurface,
};
pub use validate::{INVALID_INPUT, ValidationFailure, ValidationResult};

/// Create an unmounted editing session
///
/// This is the main entry point for masking a field.
pub fn create_mask<S: TextSurface>(options: MaskOptions) -> MaskSession<S> {
    MaskSession::new(options)
}

/// Compile a mask and collect what the compiler made of it
pub fn compile_debug(mask: &str, options: CompileOptions) -> CompileReport {
    let spec = compile(mask, options);
    CompileReport {
        input: mask.to_string(),
        effective: spec.effective_pattern(),
        sections: spec
            .optional_sections()
            .iter()
            .map(|section| format!("{}..={} {}", section.start, section.end, section.content))
            .collect(),
        inline_patterns: spec
            .synthetic_patterns()
            .map(|(symbol, regex)| format!("{} = {}", symbol, regex.as_str()))
            .collect(),
        diagnostics: spec
            .diagnostics()
            .iter()
            .map(|error| Diagnostic {
                message: error.to_string(),
                marker: error.span().map(|span| span.marker()),
            })
            .collect(),
    }
}

/// A recovered compile problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// `^` markers lined up under the mask string
    pub marker: Option<String>,
}

/// Result of a compilation with debug information
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// The mask as written
    pub input: String,
    /// The pattern the engine walks
    pub effective: String,
    /// Optional sections as `start..=end content`
    pub sections: Vec<String>,
    /// Inline regex slots as `key = regex`
    pub inline_patterns: Vec<String>,
    /// Malformed parts of the mask that were kept as literals
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileReport {
    /// Print a formatted report of the compilation
    pub fn report(&self) {
        println!("Compilation Report");
        println!("==================");
        println!("Input:     {}", self.input);
        println!("Effective: {}", self.effective);
        for section in &self.sections {
            println!("Section:   {}", section);
        }
        for pattern in &self.inline_patterns {
            println!("Inline:    {}", pattern);
        }
        for diagnostic in &self.diagnostics {
            println!("Warning:   {}", diagnostic.message);
            if let Some(marker) = &diagnostic.marker {
                println!("           {}", self.input);
                println!("           {}", marker);
            }
        }
    }
}
