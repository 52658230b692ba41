//! The Frame Decoder (component H): classifies one stack frame and, for
//! JavaScript frames, reconstructs a function name and source location.

use crate::config::Config;
use crate::error::Error;
use crate::host::TargetMemory;
use crate::metadata::Metadata;
use crate::reader;
use crate::string_decoder;
use crate::tag::{self, PointerKind};
use crate::word::Word;

/// The kind of one stack frame, determined by the context/marker slot
/// check order `ComputeType` in the original module uses: context first,
/// then marker, else JavaScript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    ArgumentsAdaptor(i32),
    /// A non-JavaScript frame identified by its marker value, labeled via
    /// the frame-type enum table (`EntryFrame`, `ExitFrame`,
    /// `InternalFrame`, ...).
    Marker(String),
    JavaScript(JsFrame),
}

/// Where a token position landed in a script's line-ends table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineResult {
    Line(u32),
    /// `line_ends` was the "undefined" oddball; `token_position` is
    /// reported as a raw position instead of a resolved line.
    Position(i32),
    OutOfRange,
}

impl std::fmt::Display for LineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineResult::Line(n) => write!(f, "line {}", n),
            LineResult::Position(p) => write!(f, "position {}", p),
            LineResult::OutOfRange => write!(f, "position out of range"),
        }
    }
}

/// A decoded JavaScript frame: enough to print `NAME at SCRIPT line N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsFrame {
    pub function: Word,
    pub shared: Word,
    pub name: String,
    pub script: Word,
    pub script_name: String,
    pub token_position: i32,
    pub line_result: LineResult,
}

fn expect_heap_object(word: Word, metadata: &Metadata) -> Result<Word, Error> {
    match tag::classify(word, metadata.constants())? {
        PointerKind::HeapObject(addr) => Ok(addr),
        _ => Err(Error::type_violation(word, "HeapObject")),
    }
}

fn decode_string_field(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    word: Word,
) -> Result<String, Error> {
    let addr = expect_heap_object(word, metadata)?;
    string_decoder::decode_string(mem, metadata, config, addr, config.string_buf_len())
}

/// Reconstruct a JavaScript frame's function name and source location.
/// `fp` is the raw frame pointer; `fp + off_fp_function` holds the tagged
/// `JSFunction` pointer.
pub fn decode_js_frame(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    fp: Word,
) -> Result<JsFrame, Error> {
    let c = metadata.constants();
    let function_word = reader::read_word(mem, fp.add_offset(c.off_fp_function))?;
    let function = expect_heap_object(function_word, metadata)?;

    let shared_word = reader::read_heap_ptr(mem, metadata, function, "JSFunction", "shared")?;
    let shared = expect_heap_object(shared_word, metadata)?;

    let name = resolve_function_name(mem, metadata, config, shared)?;

    let token_position_word =
        reader::read_heap_ptr(mem, metadata, shared, "SharedFunctionInfo", "function_token_position")?;
    let token_position = match tag::classify(token_position_word, c)? {
        PointerKind::Smi(v) => v,
        _ => return Err(Error::type_violation(token_position_word, "SMI")),
    };

    let script_word = reader::read_heap_ptr(mem, metadata, shared, "SharedFunctionInfo", "script")?;
    let script = expect_heap_object(script_word, metadata)?;

    let script_name_word = reader::read_heap_ptr(mem, metadata, script, "Script", "name")?;
    let script_name = decode_string_field(mem, metadata, config, script_name_word)?;

    let line_ends = reader::read_heap_ptr(mem, metadata, script, "Script", "line_ends")?;
    let line_result = compute_line_number(mem, metadata, config, line_ends, token_position)?;

    Ok(JsFrame {
        function,
        shared,
        name,
        script,
        script_name,
        token_position,
        line_result,
    })
}

/// Try `SharedFunctionInfo.name`; fall back to `inferred_name`, rendering
/// `<anonymous> (as NAME)` when present or plain `<anonymous>` otherwise.
fn resolve_function_name(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    shared: Word,
) -> Result<String, Error> {
    let name_word = reader::read_heap_ptr(mem, metadata, shared, "SharedFunctionInfo", "name")?;
    if let Ok(name) = decode_string_field(mem, metadata, config, name_word) {
        if !name.is_empty() {
            return Ok(name);
        }
    }

    let inferred_word =
        reader::read_heap_ptr(mem, metadata, shared, "SharedFunctionInfo", "inferred_name")?;
    match decode_string_field(mem, metadata, config, inferred_word) {
        Ok(inferred) if !inferred.is_empty() => Ok(format!("<anonymous> (as {})", inferred)),
        _ => Ok("<anonymous>".to_string()),
    }
}

/// Resolve a token position to a line number via binary search over
/// `line_ends`'s ascending SMI entries, or report a raw position when
/// `line_ends` is the "undefined" oddball, detected by string comparison
/// against `Oddball.to_string`, matching the original's
/// `jsobj_is_undefined`.
fn compute_line_number(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    line_ends: Word,
    token_position: i32,
) -> Result<LineResult, Error> {
    let addr = expect_heap_object(line_ends, metadata)?;
    let type_byte = reader::read_type_byte(mem, metadata, addr)? as u32;
    if metadata.instance_type_label(type_byte) == Some("Oddball") {
        let str_ptr = reader::read_heap_ptr(mem, metadata, addr, "Oddball", "to_string")?;
        let text = decode_string_field(mem, metadata, config, str_ptr)?;
        if text == "undefined" {
            return Ok(LineResult::Position(token_position));
        }
    }

    let length = reader::read_heap_smi(mem, metadata, addr, "FixedArray", "length")?;
    let length = length.max(0) as usize;
    let data_offset = metadata
        .field_offset("FixedArray", "data")
        .ok_or_else(|| Error::ConfigurationIncomplete("FixedArray.data not resolved".into()))?;
    let data_addr = addr.add_offset(data_offset);

    let mut entries = Vec::with_capacity(length);
    for i in 0..length {
        let word = reader::read_word(mem, data_addr.add_offset((i as u32) * 4))?;
        match tag::classify(word, metadata.constants())? {
            PointerKind::Smi(v) => entries.push(v),
            _ => return Err(Error::type_violation(word, "SMI line-ends entry")),
        }
    }

    Ok(binary_search_line(&entries, token_position))
}

fn binary_search_line(data: &[i32], tokpos: i32) -> LineResult {
    if data.is_empty() {
        return LineResult::OutOfRange;
    }
    if tokpos > data[data.len() - 1] {
        return LineResult::OutOfRange;
    }
    if tokpos <= data[0] {
        return LineResult::Line(1);
    }

    let mut lower = 0usize;
    let mut upper = data.len() - 1;
    loop {
        let ii = (lower + upper) / 2;
        if tokpos > data[ii] {
            lower = ii + 1;
        } else if ii > 0 && tokpos <= data[ii - 1] {
            upper = ii - 1;
        } else {
            return LineResult::Line((ii + 1) as u32);
        }
    }
}
