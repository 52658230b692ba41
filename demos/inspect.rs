//! A minimal host that drives `v8_postmortem` against a flat memory dump
//! and a plain-text symbol table, instead of a live process or a real
//! debugger's core-file reader. Useful for trying commands against a
//! hand-built or captured snapshot without writing a debugger plugin.
//!
//! Symbol file format: one `NAME VALUE` pair per line (`VALUE` decimal or
//! `0x`-prefixed hex), blank lines and `#`-prefixed lines ignored.
//! Register file format: one `THREAD REGISTER VALUE` triple per line.
//! Memory file: a raw byte dump, addressed starting at `--base`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{App, Arg, SubCommand};

use v8_postmortem::config::Config;
use v8_postmortem::error::{exit_status, Error, ExitStatus};
use v8_postmortem::host::{Output, Registers, StringOutput, SymbolInfo, SymbolTable, TargetMemory, ThreadId};
use v8_postmortem::metadata::autoconfig::Autoconfigurator;
use v8_postmortem::metadata::Metadata;
use v8_postmortem::word::Word;
use v8_postmortem::{commands, error::HostError};

struct FileHost {
    base: u32,
    memory: Vec<u8>,
    symbols: Vec<(String, i64)>,
    registers: HashMap<(ThreadId, String), Word>,
}

impl TargetMemory for FileHost {
    fn read_bytes(&self, addr: Word, len: usize) -> Result<Vec<u8>, HostError> {
        let start = addr.raw().wrapping_sub(self.base) as usize;
        let end = start
            .checked_add(len)
            .ok_or_else(|| HostError::new("address range overflow"))?;
        self.memory
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or_else(|| HostError::new(format!("{} is outside the loaded memory dump", addr)))
    }
}

impl SymbolTable for FileHost {
    fn lookup(&self, name: &str) -> Result<SymbolInfo, HostError> {
        self.symbols
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| SymbolInfo {
                address: Word(*v as u32),
                size: std::mem::size_of::<u32>() as u64,
            })
            .ok_or_else(|| HostError::new(format!("no such symbol: {}", name)))
    }

    fn read_symbol_value(&self, name: &str) -> Result<i64, HostError> {
        self.symbols
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| HostError::new(format!("no such symbol: {}", name)))
    }

    fn for_each_global(
        &self,
        visit: &mut dyn FnMut(&str, i64) -> Result<(), HostError>,
    ) -> Result<(), HostError> {
        for (name, value) in &self.symbols {
            visit(name, *value)?;
        }
        Ok(())
    }
}

impl Registers for FileHost {
    fn read(&self, thread: ThreadId, name: &str) -> Result<Word, HostError> {
        self.registers
            .get(&(thread, name.to_string()))
            .copied()
            .ok_or_else(|| HostError::new(format!("no register {} on thread {:?}", name, thread)))
    }
}

fn parse_int(text: &str) -> anyhow::Result<i64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x") {
        Ok(i64::from_str_radix(hex, 16)?)
    } else {
        Ok(text.parse()?)
    }
}

fn load_symbols(path: &PathBuf) -> anyhow::Result<Vec<(String, i64)>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let mut symbols = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let value = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("malformed symbol line: {}", line))?;
        symbols.push((name.to_string(), parse_int(value)?));
    }
    Ok(symbols)
}

fn load_registers(path: Option<&PathBuf>) -> anyhow::Result<HashMap<(ThreadId, String), Word>> {
    let mut registers = HashMap::new();
    let path = match path {
        Some(p) => p,
        None => return Ok(registers),
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let thread: u32 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("malformed register line: {}", line))?
            .parse()?;
        let reg = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("malformed register line: {}", line))?;
        let value = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("malformed register line: {}", line))?;
        registers.insert((ThreadId(thread), reg.to_string()), Word(parse_int(value)? as u32));
    }
    Ok(registers)
}

fn build_host(matches: &clap::ArgMatches) -> anyhow::Result<FileHost> {
    let memory_path = PathBuf::from(matches.value_of("memory").unwrap());
    let symbols_path = PathBuf::from(matches.value_of("symbols").unwrap());
    let registers_path = matches.value_of("registers").map(PathBuf::from);
    let base = match matches.value_of("base") {
        Some(b) => parse_int(b)? as u32,
        None => 0,
    };

    let memory = fs::read(&memory_path).with_context(|| format!("reading {:?}", memory_path))?;
    let symbols = load_symbols(&symbols_path)?;
    let registers = load_registers(registers_path.as_ref())?;

    Ok(FileHost {
        base,
        memory,
        symbols,
        registers,
    })
}

fn run_command(
    host: &FileHost,
    metadata: &Metadata,
    config: &Config,
    matches: &clap::ArgMatches,
) -> Result<(), Error> {
    let mut out = StringOutput::new();
    let result = dispatch(host, metadata, config, &mut out, matches);
    print!("{}", out.into_string());
    result
}

fn dispatch(
    host: &FileHost,
    metadata: &Metadata,
    config: &Config,
    out: &mut dyn Output,
    matches: &clap::ArgMatches,
) -> Result<(), Error> {
    let thread = matches
        .value_of("thread")
        .and_then(|t| t.parse().ok())
        .map(ThreadId)
        .unwrap_or_default();
    let verbose = matches.is_present("verbose");

    match matches.subcommand() {
        ("list-classes", _) => commands::list_classes(metadata, out),
        ("list-types", _) => commands::list_types(metadata, out),
        ("list-specials", _) => commands::list_specials(host, metadata, config, out),
        ("describe-type", Some(m)) => {
            let addr = word_arg(m, "addr")?;
            commands::describe_type(host, metadata, config, out, addr)
        }
        ("print-object", Some(m)) => {
            let addr = word_arg(m, "addr")?;
            commands::print_object(host, metadata, config, out, addr, m.value_of("class"))
        }
        ("print-string", Some(m)) => {
            let addr = word_arg(m, "addr")?;
            commands::print_string(host, metadata, config, out, addr, verbose)
        }
        ("print-frame", Some(m)) => {
            let fp = word_arg(m, "fp")?;
            commands::print_frame(host, metadata, config, out, fp, verbose)
        }
        ("print-stack", _) => commands::print_stack(host, metadata, config, out, thread, verbose),
        ("walk-frames", _) => commands::walk_frames(host, metadata, out, thread),
        (other, _) => Err(Error::Usage(format!("unknown command: {}", other))),
    }
}

fn word_arg(matches: &clap::ArgMatches, name: &str) -> Result<Word, Error> {
    let text = matches
        .value_of(name)
        .ok_or_else(|| Error::Usage(format!("missing argument: {}", name)))?;
    let value = parse_int(text).map_err(|e| Error::Usage(e.to_string()))?;
    Ok(Word(value as u32))
}

fn addr_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name).required(true).help(help)
}

fn main() -> anyhow::Result<()> {
    let matches = App::new("inspect")
        .about("Post-mortem inspection of a V8 heap captured to a flat memory dump")
        .arg(Arg::with_name("memory").long("memory").takes_value(true).required(true))
        .arg(Arg::with_name("symbols").long("symbols").takes_value(true).required(true))
        .arg(Arg::with_name("registers").long("registers").takes_value(true))
        .arg(Arg::with_name("base").long("base").takes_value(true))
        .arg(Arg::with_name("thread").long("thread").takes_value(true).global(true))
        .arg(Arg::with_name("verbose").short("v").long("verbose").global(true))
        .subcommand(SubCommand::with_name("list-classes"))
        .subcommand(SubCommand::with_name("list-types"))
        .subcommand(SubCommand::with_name("list-specials"))
        .subcommand(SubCommand::with_name("describe-type").arg(addr_arg("addr", "word to classify")))
        .subcommand(
            SubCommand::with_name("print-object")
                .arg(addr_arg("addr", "object address"))
                .arg(Arg::with_name("class").long("class").takes_value(true)),
        )
        .subcommand(SubCommand::with_name("print-string").arg(addr_arg("addr", "string address")))
        .subcommand(SubCommand::with_name("print-frame").arg(addr_arg("fp", "frame pointer")))
        .subcommand(SubCommand::with_name("print-stack"))
        .subcommand(SubCommand::with_name("walk-frames"))
        .get_matches();

    let host = build_host(&matches)?;
    let metadata = match Autoconfigurator::run(&host) {
        Ok(m) => m,
        Err(Error::ConfigurationAbsent) => {
            println!("target has no V8 metadata; nothing to inspect");
            return Ok(());
        }
        Err(e) => bail!("V8 metadata is present but incomplete: {}", e),
    };
    let config = Config::default();

    let result = run_command(&host, &metadata, &config, &matches);
    match exit_status(&result) {
        ExitStatus::Ok => Ok(()),
        ExitStatus::Usage => bail!("usage error: {}", result.unwrap_err()),
        ExitStatus::Err => bail!("{}", result.unwrap_err()),
    }
}
