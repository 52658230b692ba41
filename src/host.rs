//! The Host Interface Shim (component A): the thin boundary between this
//! crate's pure decoding logic and whatever real debugger embeds it.
//!
//! Every trait here stands in for one subsystem the original mdb module
//! called into directly (`mdb_vread`/`mdb_readstr`, `mdb_lookup_by_name`/
//! `mdb_symbol_iter`, `mdb_getareg`, `mdb_printf`). Splitting them instead
//! of one monolithic shim lets a host implement only what it has — a core
//! file reader has no live registers, a pure symbol-table inspector has no
//! memory to read, and so on — and lets tests hand out a [`mock::MockHost`]
//! that implements all three over plain in-memory maps.
//!
//! There is no `alloc`/`free` trait: scratch buffers are ordinary `Vec<u8>`
//! values whose `Drop` impl is the "release scratch memory on every exit
//! path" requirement from the design notes, for free.

pub mod mock;

use crate::error::HostError;
use crate::word::Word;

/// Identifies a thread within the target for register reads. The original
/// module defaults to thread 1 when the host doesn't pin one down; callers
/// that want that default should use [`ThreadId::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

impl Default for ThreadId {
    fn default() -> ThreadId {
        ThreadId(1)
    }
}

/// What a symbol lookup reports about one global symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    pub address: Word,
    pub size: u64,
}

/// Read access to target process/core memory.
pub trait TargetMemory {
    /// Read exactly `len` bytes starting at `addr`.
    fn read_bytes(&self, addr: Word, len: usize) -> Result<Vec<u8>, HostError>;

    /// Read up to `max_len` bytes starting at `addr`, stopping at (and not
    /// including) the first NUL byte. Fails if no NUL is found within
    /// `max_len` bytes or the read itself fails.
    fn read_cstr(&self, addr: Word, max_len: usize) -> Result<Vec<u8>, HostError> {
        let bytes = self.read_bytes(addr, max_len)?;
        match bytes.iter().position(|&b| b == 0) {
            Some(pos) => Ok(bytes[..pos].to_vec()),
            None => Ok(bytes),
        }
    }
}

/// Read access to the target's global symbol table.
pub trait SymbolTable {
    /// Resolve one symbol by exact name. Used both to read configuration
    /// constants and for the autoconfigurator's presence probe (which only
    /// needs the symbol to resolve, never its value).
    fn lookup(&self, name: &str) -> Result<SymbolInfo, HostError>;

    /// Read a named symbol's value as an integer, for constant/enum-value
    /// symbols whose "address" is actually their encoded value.
    fn read_symbol_value(&self, name: &str) -> Result<i64, HostError>;

    /// Invoke `visit` once per global object/function symbol, in whatever
    /// order the host's symbol table enumerates them. A visitor error
    /// aborts the scan and is propagated.
    fn for_each_global(
        &self,
        visit: &mut dyn FnMut(&str, i64) -> Result<(), HostError>,
    ) -> Result<(), HostError>;
}

/// Read access to a thread's registers.
pub trait Registers {
    fn read(&self, thread: ThreadId, name: &str) -> Result<Word, HostError>;
}

/// The read-side host bundle every command needs.
pub trait Host: TargetMemory + SymbolTable + Registers {}

impl<T: TargetMemory + SymbolTable + Registers> Host for T {}

/// Formatted, indentation-aware output. Kept separate from [`Host`] because
/// it's the only mutable half of the boundary, and because a caller using
/// this crate as a pure library (e.g. `describe_type` returning a value) has
/// no need of it.
pub trait Output {
    fn write_str(&mut self, s: &str);
    fn push_indent(&mut self, spaces: usize);
    fn pop_indent(&mut self, spaces: usize);

    fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        self.write_str(&args.to_string());
    }

    fn write_line(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\n");
    }
}

/// An [`Output`] that accumulates everything written to it into a `String`,
/// tracking indentation as a simple counter. Used by tests and by any host
/// that wants to capture output rather than stream it.
#[derive(Debug, Default)]
pub struct StringOutput {
    buf: String,
    indent: usize,
    at_line_start: bool,
}

impl StringOutput {
    pub fn new() -> StringOutput {
        StringOutput {
            buf: String::new(),
            indent: 0,
            at_line_start: true,
        }
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

impl Output for StringOutput {
    fn write_str(&mut self, s: &str) {
        for ch in s.chars() {
            if self.at_line_start && ch != '\n' {
                self.buf.push_str(&" ".repeat(self.indent));
                self.at_line_start = false;
            }
            self.buf.push(ch);
            if ch == '\n' {
                self.at_line_start = true;
            }
        }
    }

    fn push_indent(&mut self, spaces: usize) {
        self.indent += spaces;
    }

    fn pop_indent(&mut self, spaces: usize) {
        self.indent = self.indent.saturating_sub(spaces);
    }
}
