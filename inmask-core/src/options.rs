//! Mask configuration
//!
//! [`MaskOptions`] is the full option set a session is created with;
//! [`OptionsPatch`] carries a partial update applied through
//! [`MaskSession::update_options`](crate::MaskSession::update_options).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::compiler::CompileOptions;
use crate::registry::{PatternRule, ValueCheck};

/// Placeholder written into slots whose input was rejected
pub const DEFAULT_PLACEHOLDER: char = '_';

/// Change listener, called with `(raw, masked)`
#[derive(Clone)]
pub struct ChangeListener(Arc<dyn Fn(&str, &str) + Send + Sync>);

impl ChangeListener {
    pub fn new(f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        ChangeListener(Arc::new(f))
    }

    pub fn notify(&self, raw: &str, masked: &str) {
        (self.0)(raw, masked)
    }
}

impl fmt::Debug for ChangeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangeListener(..)")
    }
}

/// Options a mask is created with
#[derive(Debug, Clone)]
pub struct MaskOptions {
    /// The mask pattern, e.g. `##/##/####`
    pub mask: String,
    /// Character written into rejected slots
    pub placeholder: char,
    /// Backspace over a literal moves the caret instead of deleting
    pub keep_literals: bool,
    /// Caller rules, replacing built-ins of the same key
    pub patterns: BTreeMap<char, PatternRule>,
    /// Parse `[...]` as optional sections
    pub enable_optional_sections: bool,
    /// Expand `#{...}` as inline regex sections
    pub enable_regex_patterns: bool,
    /// Whole-value validator
    pub validate: Option<ValueCheck>,
    pub on_change: Option<ChangeListener>,
    /// Format description announced instead of the generated one
    pub description: Option<String>,
    /// Produce announcements for paste, autofill, invalid values and focus
    pub announce_changes: bool,
}

impl Default for MaskOptions {
    fn default() -> Self {
        MaskOptions {
            mask: String::new(),
            placeholder: DEFAULT_PLACEHOLDER,
            keep_literals: true,
            patterns: BTreeMap::new(),
            enable_optional_sections: false,
            enable_regex_patterns: false,
            validate: None,
            on_change: None,
            description: None,
            announce_changes: false,
        }
    }
}

impl MaskOptions {
    /// Options for a mask with every other setting at its default
    pub fn new(mask: impl Into<String>) -> Self {
        MaskOptions {
            mask: mask.into(),
            ..MaskOptions::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn with_keep_literals(mut self, keep: bool) -> Self {
        self.keep_literals = keep;
        self
    }

    /// Add or replace the rule for one mask character
    pub fn with_pattern(mut self, key: char, rule: PatternRule) -> Self {
        self.patterns.insert(key, rule);
        self
    }

    pub fn with_optional_sections(mut self, enabled: bool) -> Self {
        self.enable_optional_sections = enabled;
        self
    }

    pub fn with_regex_patterns(mut self, enabled: bool) -> Self {
        self.enable_regex_patterns = enabled;
        self
    }

    pub fn with_validator(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Some(ValueCheck::new(f));
        self
    }

    pub fn on_change(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_change = Some(ChangeListener::new(f));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_announce_changes(mut self, announce: bool) -> Self {
        self.announce_changes = announce;
        self
    }

    /// Compiler flags derived from these options
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            optional_sections: self.enable_optional_sections,
            regex_sections: self.enable_regex_patterns,
        }
    }

    /// Apply a partial update; fields absent from the patch are kept
    pub fn apply(&mut self, patch: OptionsPatch) {
        let OptionsPatch {
            mask,
            placeholder,
            keep_literals,
            patterns,
            enable_optional_sections,
            enable_regex_patterns,
            validate,
            on_change,
            description,
            announce_changes,
        } = patch;

        if let Some(mask) = mask {
            self.mask = mask;
        }
        if let Some(placeholder) = placeholder {
            self.placeholder = placeholder;
        }
        if let Some(keep) = keep_literals {
            self.keep_literals = keep;
        }
        if let Some(patterns) = patterns {
            self.patterns = patterns;
        }
        if let Some(enabled) = enable_optional_sections {
            self.enable_optional_sections = enabled;
        }
        if let Some(enabled) = enable_regex_patterns {
            self.enable_regex_patterns = enabled;
        }
        if validate.is_some() {
            self.validate = validate;
        }
        if on_change.is_some() {
            self.on_change = on_change;
        }
        if description.is_some() {
            self.description = description;
        }
        if let Some(announce) = announce_changes {
            self.announce_changes = announce;
        }
    }
}

/// A partial update to [`MaskOptions`]
#[derive(Debug, Clone, Default)]
pub struct OptionsPatch {
    pub mask: Option<String>,
    pub placeholder: Option<char>,
    pub keep_literals: Option<bool>,
    /// Replaces the whole set of caller rules
    pub patterns: Option<BTreeMap<char, PatternRule>>,
    pub enable_optional_sections: Option<bool>,
    pub enable_regex_patterns: Option<bool>,
    pub validate: Option<ValueCheck>,
    pub on_change: Option<ChangeListener>,
    pub description: Option<String>,
    pub announce_changes: Option<bool>,
}

impl OptionsPatch {
    pub fn new() -> Self {
        OptionsPatch::default()
    }

    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn keep_literals(mut self, keep: bool) -> Self {
        self.keep_literals = Some(keep);
        self
    }

    /// Set one caller rule; the patch's rule set replaces the existing one
    pub fn pattern(mut self, key: char, rule: PatternRule) -> Self {
        self.patterns.get_or_insert_with(BTreeMap::new).insert(key, rule);
        self
    }

    pub fn optional_sections(mut self, enabled: bool) -> Self {
        self.enable_optional_sections = Some(enabled);
        self
    }

    pub fn regex_patterns(mut self, enabled: bool) -> Self {
        self.enable_regex_patterns = Some(enabled);
        self
    }

    pub fn validator(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Some(ValueCheck::new(f));
        self
    }

    pub fn on_change(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_change = Some(ChangeListener::new(f));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn announce_changes(mut self, announce: bool) -> Self {
        self.announce_changes = Some(announce);
        self
    }

    /// Whether applying this patch changes the compiled mask
    pub fn needs_recompile(&self) -> bool {
        self.mask.is_some()
            || self.placeholder.is_some()
            || self.patterns.is_some()
            || self.enable_optional_sections.is_some()
            || self.enable_regex_patterns.is_some()
    }
}
