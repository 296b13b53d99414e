//! Inmask
//!
//! Input masking for text fields. Re-exports the engine and session API from
//! `inmask-core` and adds what a front end needs on top of it: an in-memory
//! field, attribute-driven initialization and preset formats.
//!
//! # Example
//! ```
//! use inmask::{BufferField, Keystrokes, MaskOptions, create_mask};
//!
//! let mut session = create_mask(MaskOptions::new("(###) ###-####"));
//! session.mount(BufferField::new());
//! session.type_str("5551234567");
//! assert_eq!(session.masked_value(), "(555) 123-4567");
//! assert_eq!(session.value(), "5551234567");
//! ```

pub mod field;
pub mod init;
pub mod presets;

pub use inmask_core::*;

pub use field::{BufferField, Keystrokes};
pub use init::{AttributeSource, InitOptions, InitResult, MaskGroup, MaskRegistry};
pub use presets::Preset;
