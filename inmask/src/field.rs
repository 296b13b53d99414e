//! In-memory text fields
//!
//! [`BufferField`] behaves like a plain single-line text input: inserting and
//! deleting edit the text at the caret without any masking. Mounting it on a
//! [`MaskSession`] and reporting each edit through [`Keystrokes`] gives the
//! same flow a UI binding drives.

use std::collections::BTreeMap;

use inmask_core::{EditOutcome, KeyAction, MaskSession, TextSurface};

use crate::init::AttributeSource;

/// A text field held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferField {
    text: String,
    cursor: usize,
    attributes: BTreeMap<String, String>,
}

impl BufferField {
    pub fn new() -> Self {
        BufferField::default()
    }

    /// Set the initial text, with the caret at its end (builder)
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self.cursor = self.text.chars().count();
        self
    }

    /// Set an attribute (builder)
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    /// Caret position in `char`s
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Insert text at the caret and return the new caret
    pub fn insert(&mut self, text: &str) -> usize {
        let byte = self.byte_offset(self.cursor);
        self.text.insert_str(byte, text);
        self.cursor += text.chars().count();
        self.cursor
    }

    /// Delete the character before the caret and return the new caret
    pub fn delete_backward(&mut self) -> usize {
        if self.cursor > 0 {
            let start = self.byte_offset(self.cursor - 1);
            let end = self.byte_offset(self.cursor);
            self.text.drain(start..end);
            self.cursor -= 1;
        }
        self.cursor
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_offset(&self, position: usize) -> usize {
        self.text
            .char_indices()
            .nth(position)
            .map_or(self.text.len(), |(byte, _)| byte)
    }
}

impl TextSurface for BufferField {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.cursor.min(self.char_count());
    }

    fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.char_count());
    }
}

impl AttributeSource for BufferField {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }
}

/// Simulated keyboard input on a mounted session
///
/// Every method edits the field first, reports the edit to the session, then
/// places the caret the session scheduled. All of them return `None` while the
/// session is unmounted.
pub trait Keystrokes {
    /// Type one character at the caret
    fn type_char(&mut self, c: char) -> Option<EditOutcome>;

    /// Type a string one character at a time; returns the last outcome
    fn type_str(&mut self, text: &str) -> Option<EditOutcome> {
        text.chars().fold(None, |last, c| self.type_char(c).or(last))
    }

    /// Press backspace
    fn press_backspace(&mut self) -> Option<EditOutcome>;
}

impl Keystrokes for MaskSession<BufferField> {
    fn type_char(&mut self, c: char) -> Option<EditOutcome> {
        let mut buf = [0u8; 4];
        let caret = self.surface_mut()?.insert(c.encode_utf8(&mut buf));
        let outcome = self.input(caret)?;
        if let Some(cursor) = outcome.cursor {
            self.place_cursor(cursor);
        }
        Some(outcome)
    }

    fn press_backspace(&mut self) -> Option<EditOutcome> {
        let caret = self.surface()?.cursor();
        match self.key_backspace(caret) {
            KeyAction::Suppress(cursor) => {
                self.place_cursor(cursor);
                None
            }
            KeyAction::Proceed => {
                let caret = self.surface_mut()?.delete_backward();
                let outcome = self.input(caret)?;
                if let Some(cursor) = outcome.cursor {
                    self.place_cursor(cursor);
                }
                Some(outcome)
            }
        }
    }
}
