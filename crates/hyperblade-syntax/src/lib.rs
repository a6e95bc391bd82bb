//! Source-level building blocks for hyperblade templates.
//!
//! This crate knows how hyperblade constructs are *written*: where a macro
//! head ends, which `@@end` closes which block, where a component tag's
//! content stops. It knows nothing about handlers, aliases or the code that
//! gets generated; that lives in `hyperblade-compiler`.

pub mod args;
pub mod cursor;
pub mod layout;
pub mod macros;
pub mod names;
pub mod span;
pub mod syntax;
pub mod tags;

pub use cursor::Cursor;
pub use macros::{match_block_macro, parse_macro_head, BlockIndex, BlockMacro, MacroHead};
pub use span::{LineCol, LineIndex, Span};
pub use syntax::Syntax;
pub use tags::{match_element, parse_tag_open, Element, RawAttribute, RawValue, TagOpen};
