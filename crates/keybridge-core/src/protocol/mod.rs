//! Serial line protocol: the typed event model and the line decoder.
//!
//! Protocol layout:
//! - `event`: The [`event::Event`] enum produced for every received line,
//!   plus the [`event::NamedKey`] set understood by keystroke injection.
//! - `decoder`: The ordered matcher table and the total [`decoder::decode`]
//!   function.

pub mod decoder;
pub mod event;
