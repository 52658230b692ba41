//! Post-mortem decoding of V8 JavaScript engine heap state from a target
//! process or core dump.
//!
//! This crate is the pure decoding core of a debugger extension: given a
//! [`host::Host`] implementation (memory, symbol table, and register
//! access over whatever the embedding debugger actually exposes) it
//! autoconfigures against the target's `v8dbg_*` metadata symbols, then
//! lets a host classify heap words, print objects, decode strings, and
//! walk JavaScript call stacks. It does not open processes, parse command
//! lines, or know about any particular debugger's plugin API — see
//! `demos/inspect.rs` for a minimal host built on a flat memory dump.
//!
//! # Examples
//!
//! Autoconfigure against a target and describe one heap word:
//!
//! ```
//! use v8_postmortem::config::Config;
//! use v8_postmortem::host::mock::MockHost;
//! use v8_postmortem::metadata::autoconfig::Autoconfigurator;
//! use v8_postmortem::{commands, word::Word};
//!
//! fn describe(host: &MockHost) {
//!     let metadata = match Autoconfigurator::run(host) {
//!         Ok(m) => m,
//!         Err(_) => return, // target has no V8 metadata; nothing to do
//!     };
//!     let config = Config::default();
//!     let mut out = v8_postmortem::host::StringOutput::new();
//!     let _ = commands::describe_type(host, &metadata, &config, &mut out, Word(0x6));
//!     println!("{}", out.into_string());
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod metadata;
pub mod object_printer;
pub mod reader;
pub mod stack_walker;
pub mod string_decoder;
pub mod tag;
pub mod word;

/// Allow iterating over enum variants for enums that have `#[derive(EnumIter)]`.
///
/// Wrapper around `strum`'s `IntoEnumIterator` so that users don't need to
/// know about `strum` directly; both [`error::ExitStatus`] and
/// [`commands::CommandKind`] use it.
pub trait EnumIterable {
    type Iterator: Iterator<Item = Self>;

    fn iter() -> Self::Iterator;
}

impl<T: strum::IntoEnumIterator> EnumIterable for T {
    type Iterator = T::Iterator;

    fn iter() -> Self::Iterator {
        T::iter()
    }
}
