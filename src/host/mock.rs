//! An in-memory [`Host`] used throughout this crate's own test suite and by
//! `demos/inspect.rs`. Not a stand-in for a production host (a real
//! debugger reads a live process or core file); it exists so the rest of
//! the crate's tests can describe a target as plain data instead of
//! standing up a real process.

use std::collections::HashMap;

use super::{Registers, SymbolInfo, SymbolTable, TargetMemory, ThreadId};
use crate::error::HostError;
use crate::word::Word;

#[derive(Debug, Clone, Default)]
pub struct MockHost {
    memory: HashMap<u32, u8>,
    symbols: HashMap<String, i64>,
    /// Global symbol insertion order, so `for_each_global` iteration is
    /// deterministic in tests.
    symbol_order: Vec<String>,
    registers: HashMap<(ThreadId, String), Word>,
}

impl MockHost {
    pub fn new() -> MockHost {
        MockHost::default()
    }

    /// Write `bytes` starting at `addr`, little-endian word order left to
    /// the caller (use [`MockHost::write_word`] for tagged pointers/SMIs).
    pub fn write_bytes(&mut self, addr: Word, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.memory.insert(addr.raw().wrapping_add(i as u32), *b);
        }
    }

    pub fn write_word(&mut self, addr: Word, value: Word) {
        self.write_bytes(addr, &value.raw().to_le_bytes());
    }

    pub fn write_cstr(&mut self, addr: Word, s: &str) {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.write_bytes(addr, &bytes);
    }

    /// Define a global symbol with an integer value (used both for plain
    /// constants and for `v8dbg_*` metadata symbols, whose "value" is what
    /// the autoconfigurator reads).
    pub fn define_symbol(&mut self, name: impl Into<String>, value: i64) {
        let name = name.into();
        if !self.symbols.contains_key(&name) {
            self.symbol_order.push(name.clone());
        }
        self.symbols.insert(name, value);
    }

    pub fn set_register(&mut self, thread: ThreadId, name: &str, value: Word) {
        self.registers.insert((thread, name.to_string()), value);
    }
}

impl TargetMemory for MockHost {
    fn read_bytes(&self, addr: Word, len: usize) -> Result<Vec<u8>, HostError> {
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = addr.raw().wrapping_add(i as u32);
            match self.memory.get(&a) {
                Some(b) => out.push(*b),
                None => {
                    return Err(HostError::new(format!(
                        "unmapped address {:#010x}",
                        a
                    )))
                }
            }
        }
        Ok(out)
    }
}

impl SymbolTable for MockHost {
    fn lookup(&self, name: &str) -> Result<SymbolInfo, HostError> {
        self.symbols
            .get(name)
            .map(|&v| SymbolInfo {
                address: Word(v as u32),
                size: std::mem::size_of::<u32>() as u64,
            })
            .ok_or_else(|| HostError::new(format!("no such symbol: {}", name)))
    }

    fn read_symbol_value(&self, name: &str) -> Result<i64, HostError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| HostError::new(format!("no such symbol: {}", name)))
    }

    fn for_each_global(
        &self,
        visit: &mut dyn FnMut(&str, i64) -> Result<(), HostError>,
    ) -> Result<(), HostError> {
        for name in &self.symbol_order {
            let value = self.symbols[name];
            visit(name, value)?;
        }
        Ok(())
    }
}

impl Registers for MockHost {
    fn read(&self, thread: ThreadId, name: &str) -> Result<Word, HostError> {
        self.registers
            .get(&(thread, name.to_string()))
            .copied()
            .ok_or_else(|| HostError::new(format!("no register {} on thread {:?}", name, thread)))
    }
}
