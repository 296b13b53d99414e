//! Editing sessions
//!
//! A [`MaskSession`] owns the state of one masked field across an editing
//! session and exposes the operations a binding layer drives: edits, pastes,
//! programmatic sets, option updates and teardown.
//!
//! The session never moves the caret itself. Each edit yields a
//! [`ScheduledCursor`] that the binding layer redeems with
//! [`MaskSession::place_cursor`] whenever its surface is ready; a token from
//! an earlier mount, or redeemed after unmount, does nothing.

use std::ops::Range;

use tracing::{debug, debug_span, trace};

use crate::engine::{Backspace, CursorOp, Masker};
use crate::options::{MaskOptions, OptionsPatch};
use crate::validate::ValidationResult;

/// An editable text surface a session can be mounted on
pub trait TextSurface {
    /// Current contents of the surface
    fn text(&self) -> String;

    /// Replace the contents of the surface
    fn set_text(&mut self, text: &str);

    /// Move the caret, in `char`s
    fn set_cursor(&mut self, position: usize);
}

/// Per-session mutable state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub raw_value: String,
    pub masked_value: String,
    pub cursor_position: usize,
    pub active_optional_sections: Vec<usize>,
    pub validation: ValidationResult,
}

/// The kind of edit that produced the surface's current text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
    Paste,
    /// A value change that did not come from the user typing
    Autofill,
}

impl EditKind {
    fn cursor_op(self) -> CursorOp {
        match self {
            EditKind::Delete => CursorOp::Delete,
            EditKind::Insert | EditKind::Paste | EditKind::Autofill => CursorOp::Insert,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            EditKind::Insert => "insert",
            EditKind::Delete => "delete",
            EditKind::Paste => "paste",
            EditKind::Autofill => "autofill",
        }
    }
}

/// Mount state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unmounted,
    Mounted,
}

/// A caret placement waiting to be applied to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCursor {
    pub position: usize,
    epoch: u64,
}

/// Messages for assistive technology
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    Pasted,
    Autofilled,
    Invalid(String),
    /// The expected input format
    Format(String),
}

impl Announcement {
    pub fn message(&self) -> &str {
        match self {
            Announcement::Pasted => "Content pasted and formatted.",
            Announcement::Autofilled => "Field autofilled and formatted.",
            Announcement::Invalid(message) | Announcement::Format(message) => message,
        }
    }
}

/// Result of a processed edit or value change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub raw_value: String,
    pub masked_value: String,
    pub validation: ValidationResult,
    pub cursor: Option<ScheduledCursor>,
    pub announcements: Vec<Announcement>,
}

/// What the binding layer should do with a backspace key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Let the surface delete as usual, then report the edit
    Proceed,
    /// Cancel the key press and place the caret instead
    Suppress(ScheduledCursor),
}

/// Result of the surface gaining focus
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FocusOutcome {
    pub cursor: Option<ScheduledCursor>,
    pub announcement: Option<Announcement>,
}

/// An editing session for one masked field
#[derive(Debug)]
pub struct MaskSession<S> {
    options: MaskOptions,
    masker: Masker,
    state: SessionState,
    surface: Option<S>,
    epoch: u64,
    processing: bool,
    pending_cursor: Option<usize>,
    scheduled_cursor: Option<ScheduledCursor>,
}

impl<S: TextSurface> MaskSession<S> {
    /// Create an unmounted session
    pub fn new(options: MaskOptions) -> Self {
        let masker = Masker::from_options(&options);
        MaskSession {
            options,
            masker,
            state: SessionState::default(),
            surface: None,
            epoch: 0,
            processing: false,
            pending_cursor: None,
            scheduled_cursor: None,
        }
    }

    pub fn options(&self) -> &MaskOptions {
        &self.options
    }

    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current raw value
    pub fn value(&self) -> &str {
        &self.state.raw_value
    }

    pub fn masked_value(&self) -> &str {
        &self.state.masked_value
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.surface.is_some() {
            Lifecycle::Mounted
        } else {
            Lifecycle::Unmounted
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Attach to a surface, replacing any previous one
    ///
    /// Existing content on the surface is masked in place and replaces the
    /// session's value. The change listener is not called.
    pub fn mount(&mut self, mut surface: S) {
        self.unmount();
        self.epoch += 1;

        let text = surface.text();
        if text.is_empty() {
            self.state = SessionState::default();
        } else {
            self.state = self.derive_state(&text);
            self.state.cursor_position = 0;
            if text != self.state.masked_value {
                surface.set_text(&self.state.masked_value);
            }
        }

        debug!(epoch = self.epoch, masked = %self.state.masked_value, "mounted");
        self.surface = Some(surface);
    }

    /// Detach from the surface and hand it back
    pub fn unmount(&mut self) -> Option<S> {
        let surface = self.surface.take();
        if surface.is_some() {
            debug!(epoch = self.epoch, "unmounted");
        }
        self.pending_cursor = None;
        self.scheduled_cursor = None;
        surface
    }

    /// Report that the surface's text changed through user input
    ///
    /// The edit counts as a delete when the text got shorter than the last
    /// masked value, as an insert otherwise. `caret` is the caret position the
    /// surface reports after the edit.
    pub fn input(&mut self, caret: usize) -> Option<EditOutcome> {
        let text = self.surface.as_ref()?.text();
        let kind = if text.chars().count() < self.state.masked_value.chars().count() {
            EditKind::Delete
        } else {
            EditKind::Insert
        };
        self.apply_edit(kind, caret)
    }

    /// Report an edit of a known kind
    pub fn apply_edit(&mut self, kind: EditKind, caret: usize) -> Option<EditOutcome> {
        let previous = self.state.masked_value.clone();
        self.process(&previous, kind, caret)
    }

    /// Paste text over a selection of the surface's current text
    ///
    /// The caret is placed as if the pasted text had been typed.
    pub fn paste(&mut self, pasted: &str, selection: Range<usize>) -> Option<EditOutcome> {
        let surface = self.surface.as_mut()?;
        let current = surface.text();
        let chars: Vec<char> = current.chars().collect();
        let start = selection.start.min(chars.len());
        let end = selection.end.clamp(start, chars.len());

        let mut spliced: String = chars[..start].iter().collect();
        spliced.push_str(pasted);
        spliced.extend(&chars[end..]);
        surface.set_text(&spliced);

        let caret = start + pasted.chars().count();
        self.process(&current, EditKind::Paste, caret)
    }

    /// Report a value change made outside of user input, such as autofill
    pub fn notify_external_change(&mut self, text: &str) -> Option<EditOutcome> {
        self.surface.as_mut()?.set_text(text);
        let previous = self.state.masked_value.clone();
        self.process(&previous, EditKind::Autofill, text.chars().count())
    }

    /// Handle a backspace key press before the surface applies it
    ///
    /// With `keep_literals` set, a backspace right after a literal is
    /// suppressed and the caret moves back past the literals instead.
    pub fn key_backspace(&mut self, caret: usize) -> KeyAction {
        if !self.options.keep_literals || self.surface.is_none() {
            return KeyAction::Proceed;
        }
        let text = self.surface.as_ref().map(S::text).unwrap_or_default();
        match self.masker.backspace(&text, caret) {
            Backspace::Proceed => KeyAction::Proceed,
            Backspace::Redirect { cursor } => {
                trace!(caret, cursor, "backspace over literal redirected");
                self.state.cursor_position = cursor;
                match self.request_cursor(cursor) {
                    Some(scheduled) => KeyAction::Suppress(scheduled),
                    None => KeyAction::Proceed,
                }
            }
        }
    }

    /// Handle the surface gaining focus
    pub fn focus(&mut self) -> FocusOutcome {
        let Some(surface) = self.surface.as_ref() else {
            return FocusOutcome::default();
        };
        let mut outcome = FocusOutcome::default();
        if surface.text().is_empty() && !self.masker.spec().is_empty() {
            outcome.cursor = self.request_cursor(0);
        }
        if self.options.announce_changes && self.options.description.is_none() {
            outcome.announcement = Some(Announcement::Format(self.masker.describe()));
        }
        outcome
    }

    /// Set the value programmatically
    ///
    /// Does nothing while unmounted. The caret moves to the end of the masked
    /// value.
    pub fn set_value(&mut self, value: &str) -> Option<EditOutcome> {
        if self.surface.is_none() {
            debug!("set_value on an unmounted session ignored");
            return None;
        }

        self.state = self.derive_state(value);

        if let Some(surface) = self.surface.as_mut() {
            surface.set_text(&self.state.masked_value);
        }
        self.notify();

        let cursor = self.request_cursor(self.state.cursor_position);
        let mut announcements = Vec::new();
        self.announce_validation(&mut announcements);
        Some(self.outcome(cursor, announcements))
    }

    /// Update options, recompiling the mask
    ///
    /// When mounted with a non-empty value, the mask is re-applied to the
    /// current raw value and the change is reported like any other edit.
    /// While unmounted the value is re-derived silently.
    pub fn update_options(&mut self, patch: OptionsPatch) -> Option<EditOutcome> {
        let recompile = patch.needs_recompile();
        self.options.apply(patch);
        if recompile {
            self.masker = Masker::from_options(&self.options);
            debug!(mask = %self.options.mask, "options updated, mask recompiled");
        }

        if self.state.masked_value.is_empty() {
            return None;
        }
        let raw = self.state.raw_value.clone();
        if self.surface.is_some() {
            return self.set_value(&raw);
        }
        self.state = self.derive_state(&raw);
        None
    }

    /// Validate the current value and store the result
    pub fn validate(&mut self) -> ValidationResult {
        let validation = self.masker.validate(
            &self.state.raw_value,
            &self.state.masked_value,
            self.options.validate.as_ref(),
        );
        self.state.validation = validation.clone();
        validation
    }

    /// Unmount and reset to an empty value
    pub fn destroy(&mut self) {
        self.unmount();
        let had_value = !self.state.masked_value.is_empty();
        self.state = SessionState::default();
        if had_value {
            self.notify();
        }
    }

    /// Take the most recent caret placement not yet handed out
    pub fn take_scheduled_cursor(&mut self) -> Option<ScheduledCursor> {
        self.scheduled_cursor.take()
    }

    /// Apply a scheduled caret placement to the surface
    ///
    /// Returns `false` without touching anything if the session was unmounted
    /// or remounted since the placement was scheduled.
    pub fn place_cursor(&mut self, cursor: ScheduledCursor) -> bool {
        if cursor.epoch != self.epoch {
            return false;
        }
        match self.surface.as_mut() {
            Some(surface) => {
                surface.set_cursor(cursor.position);
                if self.scheduled_cursor == Some(cursor) {
                    self.scheduled_cursor = None;
                }
                true
            }
            None => false,
        }
    }

    fn process(&mut self, previous: &str, kind: EditKind, caret: usize) -> Option<EditOutcome> {
        self.surface.as_ref()?;
        let _span = debug_span!("mask.edit", operation = kind.as_str(), caret).entered();

        self.processing = true;
        let announcements = self.process_text(previous, kind, caret);
        self.processing = false;

        let cursor = self
            .pending_cursor
            .take()
            .and_then(|position| self.request_cursor(position));
        Some(self.outcome(cursor, announcements))
    }

    fn process_text(&mut self, previous: &str, kind: EditKind, caret: usize) -> Vec<Announcement> {
        let mut announcements = Vec::new();
        let text = self.surface.as_ref().map(S::text).unwrap_or_default();

        if text.is_empty() {
            self.state = SessionState::default();
            if let Some(surface) = self.surface.as_mut() {
                surface.set_text("");
            }
            self.notify();
            return announcements;
        }

        let formatted = self.masker.format(&text);
        let validation = self
            .masker
            .validate_formatted(&formatted, self.options.validate.as_ref());
        let cursor = self.masker.next_cursor(
            previous,
            &formatted.masked,
            self.edit_position(&text, caret, kind),
            kind.cursor_op(),
        );
        let changed = formatted.masked != previous;

        self.state = SessionState {
            raw_value: formatted.raw,
            masked_value: formatted.masked,
            cursor_position: cursor,
            active_optional_sections: formatted.pattern.active_sections,
            validation,
        };
        trace!(
            raw = %self.state.raw_value,
            masked = %self.state.masked_value,
            cursor,
            "edit applied"
        );

        if text != self.state.masked_value
            && let Some(surface) = self.surface.as_mut()
        {
            surface.set_text(&self.state.masked_value);
        }
        self.request_cursor(cursor);

        if changed && self.options.announce_changes {
            match kind {
                EditKind::Paste => announcements.push(Announcement::Pasted),
                EditKind::Autofill => announcements.push(Announcement::Autofilled),
                EditKind::Insert | EditKind::Delete => {}
            }
        }
        self.announce_validation(&mut announcements);
        self.notify();
        announcements
    }

    /// Mask `value` into a fresh state with the caret at the end
    fn derive_state(&self, value: &str) -> SessionState {
        let formatted = self.masker.format(value);
        let validation = self
            .masker
            .validate_formatted(&formatted, self.options.validate.as_ref());
        SessionState {
            raw_value: formatted.raw,
            cursor_position: formatted.masked.chars().count(),
            masked_value: formatted.masked,
            active_optional_sections: formatted.pattern.active_sections,
            validation,
        }
    }

    /// Map a caret in the unmasked surface text to the masked position of the
    /// edit: the last inserted character, or the deletion point
    fn edit_position(&self, text: &str, caret: usize, kind: EditKind) -> usize {
        let prefix: String = text.chars().take(caret).collect();
        let reached = self.masker.apply(&prefix).chars().count();
        match kind.cursor_op() {
            CursorOp::Insert => reached.saturating_sub(1),
            CursorOp::Delete => reached,
        }
    }

    /// Queue a caret placement; while processing it is held back and only the
    /// last request is scheduled once processing ends
    fn request_cursor(&mut self, position: usize) -> Option<ScheduledCursor> {
        self.surface.as_ref()?;
        if self.processing {
            self.pending_cursor = Some(position);
            return None;
        }
        let scheduled = ScheduledCursor {
            position,
            epoch: self.epoch,
        };
        self.scheduled_cursor = Some(scheduled);
        Some(scheduled)
    }

    fn announce_validation(&self, announcements: &mut Vec<Announcement>) {
        if self.options.announce_changes
            && let Some(message) = &self.state.validation.error_message
        {
            announcements.push(Announcement::Invalid(message.clone()));
        }
    }

    fn notify(&self) {
        if let Some(listener) = &self.options.on_change {
            listener.notify(&self.state.raw_value, &self.state.masked_value);
        }
    }

    fn outcome(
        &self,
        cursor: Option<ScheduledCursor>,
        announcements: Vec<Announcement>,
    ) -> EditOutcome {
        EditOutcome {
            raw_value: self.state.raw_value.clone(),
            masked_value: self.state.masked_value.clone(),
            validation: self.state.validation.clone(),
            cursor,
            announcements,
        }
    }
}
