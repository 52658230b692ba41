//! The Command Surface (component J): the user-visible operations a host
//! wires up to its own UI — `list-classes`, `list-types`, `list-specials`,
//! `describe-type`, `print-object`, `print-string`, `print-frame`,
//! `print-stack`, `walk-frames`.
//!
//! Each function here takes the host bundle plus whatever a command needs
//! and returns `Result<(), Error>`; a host maps that to an exit code via
//! [`crate::error::exit_status`]. Parsing a command line into one of these
//! calls is the host's job (Non-goal: option parsing).

use strum_macros::EnumIter;

use crate::config::Config;
use crate::error::Error;
use crate::frame::{self, FrameKind};
use crate::host::{Host, Output, ThreadId};
use crate::metadata::Metadata;
use crate::object_printer;
use crate::reader;
use crate::stack_walker::StackWalker;
use crate::string_decoder;
use crate::tag::{self, PointerKind};
use crate::word::Word;

/// The symbol naming `v8::internal::Heap::roots_`, read only by
/// `list-specials`. Not part of the `v8dbg_*` metadata contract; see
/// `list-specials`' resolved design notes.
const ROOTS_SYMBOL: &str = "roots_";

/// Enumerable command identifiers, so a host can build a help listing or
/// completion table without this crate hard-coding any particular UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum CommandKind {
    ListClasses,
    ListTypes,
    ListSpecials,
    DescribeType,
    PrintObject,
    PrintString,
    PrintFrame,
    PrintStack,
    WalkFrames,
}

/// Print every known class name, one per line, in the lexicographic order
/// `Metadata::classes` already provides.
pub fn list_classes(metadata: &Metadata, output: &mut dyn Output) -> Result<(), Error> {
    for class in metadata.classes() {
        output.write_line(class.name());
    }
    Ok(())
}

/// Print the instance-type table: `label value`, in insertion order.
pub fn list_types(metadata: &Metadata, output: &mut dyn Output) -> Result<(), Error> {
    for (value, label) in metadata.instance_types().iter() {
        output.write_line(&format!("{} {}", label, value));
    }
    Ok(())
}

const SPECIAL_NAMES: &[(&str, fn(&crate::config::RootIndices) -> u32)] = &[
    ("undefined", |r| r.undefined_value),
    ("null", |r| r.null_value),
    ("true", |r| r.true_value),
    ("false", |r| r.false_value),
    ("NaN", |r| r.nan_value),
    ("-0", |r| r.minus_zero_value),
];

/// Print the six well-known root values and their target addresses,
/// resolved through `roots_` at the configured indices. Degrades per
/// value (never aborts the whole command) when the symbol or the index
/// configuration is unavailable.
pub fn list_specials<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
) -> Result<(), Error> {
    let root_indices = match config.root_indices() {
        Some(r) => *r,
        None => {
            for (name, _) in SPECIAL_NAMES {
                output.write_line(&format!("{}: root indices not configured", name));
            }
            return Ok(());
        }
    };

    let roots_addr = host.lookup(ROOTS_SYMBOL).ok().map(|info| info.address);

    for (name, index_of) in SPECIAL_NAMES {
        match roots_addr {
            None => output.write_line(&format!("{}: roots_ symbol not found", name)),
            Some(base) => {
                let index = index_of(&root_indices);
                let slot = base.add_offset(index * 4);
                match reader::read_word(host, slot) {
                    Ok(word) => match object_printer::describe_word(host, metadata, config, word) {
                        Ok(description) => {
                            output.write_line(&format!("{}: {} ({})", name, slot, description))
                        }
                        Err(_) => output.write_line(&format!("{}: {} (unreadable)", name, slot)),
                    },
                    Err(_) => output.write_line(&format!("{}: roots_ symbol not found", name)),
                }
            }
        }
    }
    Ok(())
}

/// `describe-type @addr`: classify `addr` and print `addr: description`.
/// Addresses print as unpadded hex here (matching the original module's
/// `%p`-on-a-word-sized-int rendering), distinct from the zero-padded
/// [`Word`] `Display` used when addresses anchor object/field output.
pub fn describe_type<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
) -> Result<(), Error> {
    let description = object_printer::describe_word(host, metadata, config, addr)?;
    output.write_line(&format!("{:#x}: {}", addr.raw(), description));
    Ok(())
}

/// `print-object @addr [class]`: SMI and Failure short-circuit to a single
/// line; a HeapObject prints through the Object Printer, either as the
/// named class or auto-detected from its type byte.
pub fn print_object<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
    class_name: Option<&str>,
) -> Result<(), Error> {
    match tag::classify(addr, metadata.constants())? {
        PointerKind::Smi(v) => {
            output.write_line(&format!("SMI: value = {}", v));
            Ok(())
        }
        PointerKind::Failure => {
            output.write_line("'Failure' object");
            Ok(())
        }
        PointerKind::HeapObject(obj_addr) => {
            let class = match class_name {
                Some(name) => metadata
                    .find_class(name)
                    .ok_or_else(|| Error::Usage(format!("unknown class: {}", name)))?,
                None => {
                    let type_byte = reader::read_type_byte(host, metadata, obj_addr)? as u32;
                    let label = metadata
                        .instance_type_label(type_byte)
                        .ok_or_else(|| Error::type_violation(obj_addr, "known instance type"))?;
                    metadata.find_class(label).ok_or_else(|| {
                        Error::ConfigurationIncomplete(format!("no class metadata for {}", label))
                    })?
                }
            };
            object_printer::print_object(host, metadata, config, output, obj_addr, class)
        }
    }
}

/// `print-string @addr [-v]`. Non-verbose prints the decoded value alone;
/// `-v` additionally traces the representation of every node visited.
pub fn print_string<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
    verbose: bool,
) -> Result<(), Error> {
    if verbose {
        let mut depth_remaining = config.max_string_depth();
        let text = trace_string(host, metadata, config, output, addr, &mut depth_remaining)?;
        output.write_line(&text);
    } else {
        let text = string_decoder::decode_string(host, metadata, config, addr, config.string_buf_len())?;
        output.write_line(&text);
    }
    Ok(())
}

fn trace_string<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
    depth_remaining: &mut usize,
) -> Result<String, Error> {
    if *depth_remaining == 0 {
        return Err(Error::StringDecodingLimitExceeded(config.max_string_depth()));
    }
    *depth_remaining -= 1;

    let type_byte = reader::read_type_byte(host, metadata, addr)? as u32;
    let c = metadata.constants();

    if !string_decoder::is_string_type(type_byte, c) {
        output.write_line(&format!("{} <not a string>", addr));
        return Ok("<not a string>".to_string());
    }
    if !string_decoder::is_ascii_encoding(type_byte, c) {
        output.write_line(&format!("{} <two-byte string>", addr));
        return Ok("<two-byte string>".to_string());
    }

    let representation = string_decoder::representation_of(type_byte, c);
    output.write_line(&format!("{} {}", addr, representation.label()));

    match representation {
        string_decoder::Representation::Cons => {
            let first = reader::read_heap_ptr(host, metadata, addr, "ConsString", "first")?;
            let second = reader::read_heap_ptr(host, metadata, addr, "ConsString", "second")?;
            let mut out = trace_string(host, metadata, config, output, first, depth_remaining)?;
            out.push_str(&trace_string(host, metadata, config, output, second, depth_remaining)?);
            Ok(out)
        }
        _ => string_decoder::decode_string(host, metadata, config, addr, config.string_buf_len()),
    }
}

fn format_frame_kind(fp: Word, kind: &FrameKind) -> String {
    match kind {
        FrameKind::ArgumentsAdaptor(n) => {
            format!("{} arguments adaptor frame ({} args)", fp, n)
        }
        FrameKind::Marker(label) => format!("{} {} frame", fp, label),
        FrameKind::JavaScript(js) => {
            format!("{} {} at {} {}", fp, js.name, js.script_name, js.line_result)
        }
    }
}

/// `print-frame @fp [-v]`: classify and, for JavaScript frames, decode the
/// frame at `fp`. `-v` adds the function/shared object addresses.
pub fn print_frame<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    fp: Word,
    verbose: bool,
) -> Result<(), Error> {
    let kind = classify_with_config(host, metadata, config, fp)?;
    output.write_line(&format_frame_kind(fp, &kind));
    if verbose {
        if let FrameKind::JavaScript(js) = &kind {
            output.write_line(&format!("  function: {}", js.function));
            output.write_line(&format!("  shared: {}", js.shared));
            output.write_line(&format!("  token_position: {}", js.token_position));
        }
    }
    Ok(())
}

/// Context slot checked before marker slot, JavaScript the default when
/// neither is a SMI; delegates to [`frame::decode_js_frame`] with the
/// caller's own `Config` so a JS frame's name/script decode against the
/// caller's configured string limits rather than a default.
fn classify_with_config<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    fp: Word,
) -> Result<FrameKind, Error> {
    let c = metadata.constants();
    let context_addr = fp.add_offset(c.off_fp_context);
    let context_word = reader::read_word(host, context_addr)?;
    if tag::is_smi(context_word, c) {
        return Ok(FrameKind::ArgumentsAdaptor(tag::smi_value(context_word, c)));
    }
    let marker_addr = fp.add_offset(c.off_fp_marker);
    let marker_word = reader::read_word(host, marker_addr)?;
    if tag::is_smi(marker_word, c) {
        let label = metadata
            .frame_type_label(tag::smi_value(marker_word, c) as i64)
            .unwrap_or("<unknown frame type>")
            .to_string();
        return Ok(FrameKind::Marker(label));
    }
    Ok(FrameKind::JavaScript(frame::decode_js_frame(
        host, metadata, config, fp,
    )?))
}

/// `print-stack [-v]`: walk `thread`'s frame chain, printing each frame.
/// A frame that fails to decode is reported and skipped; walking
/// continues for the remaining frames.
pub fn print_stack<H: Host>(
    host: &H,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    thread: ThreadId,
    verbose: bool,
) -> Result<(), Error> {
    let walker = StackWalker::new(host, host, metadata.constants(), thread)?;
    for fp_result in walker {
        match fp_result {
            Ok(fp) => {
                if print_frame(host, metadata, config, output, fp, verbose).is_err() {
                    output.write_line(&format!("{} (unreadable frame)", fp));
                }
            }
            Err(_) => output.write_line("(unreadable frame)"),
        }
    }
    Ok(())
}

/// `walk-frames [thread-id]`: the raw Stack Walker output with no frame
/// decoding, one frame pointer per line.
pub fn walk_frames<H: Host>(
    host: &H,
    metadata: &Metadata,
    output: &mut dyn Output,
    thread: ThreadId,
) -> Result<(), Error> {
    let walker = StackWalker::new(host, host, metadata.constants(), thread)?;
    for fp_result in walker {
        match fp_result {
            Ok(fp) => output.write_line(&format!("{}", fp)),
            Err(_) => {
                output.write_line("(unreadable frame)");
                break;
            }
        }
    }
    Ok(())
}
