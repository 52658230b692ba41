//! The Autoconfigurator (component C): mines a target binary's symbol
//! table for `v8dbg_*` metadata symbols and assembles a [`Metadata`].
//!
//! Runs exactly once, at load. Everything it produces is immutable
//! afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use super::{Class, Constants, EnumTable, Field, Metadata};
use crate::error::Error;
use crate::host::SymbolTable;

const PREFIX_PARENT: &str = "v8dbg_parent_";
const PREFIX_CLASS: &str = "v8dbg_class_";
const PREFIX_TYPE: &str = "v8dbg_type_";
const PREFIX_FRAMETYPE: &str = "v8dbg_frametype_";

/// The symbol whose mere presence (not value) signals "this target has V8
/// metadata"; see `autoconfigure()`'s presence probe in the original
/// module.
const PRESENCE_PROBE_SYMBOL: &str = "v8dbg_SmiTag";

/// The four `(class, field)` pairs the crate calls directly by name and
/// therefore requires to resolve, beyond the generic metadata scan.
const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("Map", "instance_attributes"),
    ("SeqAsciiString", "chars"),
    ("FixedArray", "data"),
    ("Oddball", "to_string"),
];

/// Split `s` at the first literal `"__"`, the separator the original
/// module's `conf_next_part()` uses to tokenize `v8dbg_*` symbol names.
fn split_double_underscore(s: &str) -> Option<(&str, &str)> {
    s.find("__").map(|idx| (&s[..idx], &s[idx + 2..]))
}

#[derive(Debug, Default)]
struct RawClass {
    parent: Option<String>,
    fields: Vec<(String, u32)>,
}

pub struct Autoconfigurator;

impl Autoconfigurator {
    /// Run the full autoconfiguration sequence against `symbols`. Returns
    /// `Error::ConfigurationAbsent` if the presence probe symbol is
    /// missing — the graceful "this target has no V8" outcome, which a
    /// host should treat as silently disabling V8 support rather than as
    /// a hard failure. Any other `Err` means the target claims to have V8
    /// support but its metadata is inconsistent.
    pub fn run(symbols: &dyn SymbolTable) -> Result<Metadata, Error> {
        symbols
            .lookup(PRESENCE_PROBE_SYMBOL)
            .map_err(|_| Error::ConfigurationAbsent)?;

        let mut raw_classes: HashMap<String, RawClass> = HashMap::new();
        let mut instance_types = EnumTable::new();
        let mut frame_types = EnumTable::new();

        symbols.for_each_global(&mut |name, value| {
            if let Some(rest) = name.strip_prefix(PREFIX_PARENT) {
                match split_double_underscore(rest) {
                    Some((child, parent)) => {
                        raw_classes.entry(child.to_string()).or_default();
                        raw_classes.entry(parent.to_string()).or_default();
                        raw_classes.get_mut(child).unwrap().parent = Some(parent.to_string());
                    }
                    None => warn!(symbol = name, "malformed v8dbg_parent_ symbol name"),
                }
            } else if let Some(rest) = name.strip_prefix(PREFIX_CLASS) {
                match split_double_underscore(rest) {
                    Some((class_name, after_class)) => {
                        let field_name = match split_double_underscore(after_class) {
                            Some((field_name, _type_suffix)) => field_name,
                            None => after_class,
                        };
                        raw_classes
                            .entry(class_name.to_string())
                            .or_default()
                            .fields
                            .push((field_name.to_string(), value as u32));
                    }
                    None => warn!(symbol = name, "malformed v8dbg_class_ symbol name"),
                }
            } else if let Some(rest) = name.strip_prefix(PREFIX_TYPE) {
                // The original re-splits on "__" here too, discarding
                // everything after it; only the class label before the
                // separator (or the whole name, if there is none) is kept.
                let class_name = split_double_underscore(rest).map_or(rest, |(c, _)| c);
                instance_types.insert(value, class_name);
            } else if let Some(rest) = name.strip_prefix(PREFIX_FRAMETYPE) {
                frame_types.insert(value, rest);
            }
            Ok(())
        })
        .map_err(|e| Error::ConfigurationIncomplete(format!("{}", e)))?;

        let constants = read_constants(symbols)?;

        let mut classes = assemble_classes(raw_classes, &constants)?;
        compute_offsets(&mut classes)?;

        let classes: BTreeMap<String, Class> =
            classes.into_iter().map(|(k, v)| (k, v)).collect();

        let metadata = Metadata::new(classes, instance_types, frame_types, constants);

        for (class, field) in REQUIRED_FIELDS {
            if metadata.field_offset(class, field).is_none() {
                return Err(Error::ConfigurationIncomplete(format!(
                    "required field {}.{} did not resolve",
                    class, field
                )));
            }
        }

        Ok(metadata)
    }
}

fn read_constants(symbols: &dyn SymbolTable) -> Result<Constants, Error> {
    let read = |name: &str| -> Result<u32, Error> {
        symbols
            .read_symbol_value(name)
            .map(|v| v as u32)
            .map_err(|e| Error::ConfigurationIncomplete(format!("{}: {}", name, e)))
    };
    Ok(Constants {
        smi_tag: read("v8dbg_SmiTag")?,
        smi_tag_mask: read("v8dbg_SmiTagMask")?,
        smi_value_shift: read("v8dbg_SmiValueShift")?,
        failure_tag: read("v8dbg_FailureTag")?,
        failure_tag_mask: read("v8dbg_FailureTagMask")?,
        heap_object_tag: read("v8dbg_HeapObjectTag")?,
        heap_object_tag_mask: read("v8dbg_HeapObjectTagMask")?,
        first_nonstring_type: read("v8dbg_FirstNonstringType")?,
        is_not_string_mask: read("v8dbg_IsNotStringMask")?,
        string_tag: read("v8dbg_StringTag")?,
        not_string_tag: read("v8dbg_NotStringTag")?,
        string_encoding_mask: read("v8dbg_StringEncodingMask")?,
        ascii_string_tag: read("v8dbg_AsciiStringTag")?,
        two_byte_string_tag: read("v8dbg_TwoByteStringTag")?,
        string_representation_mask: read("v8dbg_StringRepresentationMask")?,
        seq_string_tag: read("v8dbg_SeqStringTag")?,
        cons_string_tag: read("v8dbg_ConsStringTag")?,
        external_string_tag: read("v8dbg_ExternalStringTag")?,
        off_fp_context: read("v8dbg_off_fp_context")?,
        off_fp_marker: read("v8dbg_off_fp_marker")?,
        off_fp_function: read("v8dbg_off_fp_function")?,
    })
}

/// Build [`Class`] values with heap-adjusted field offsets: the
/// `V8_OFF_HEAP` adjustment is applied here, once, rather than at every
/// read site.
fn assemble_classes(
    raw: HashMap<String, RawClass>,
    constants: &Constants,
) -> Result<HashMap<String, Class>, Error> {
    let mut classes = HashMap::with_capacity(raw.len());
    for (name, raw_class) in raw {
        let mut class = Class::new(name.clone());
        class.parent = raw_class.parent;
        for (field_name, raw_offset) in raw_class.fields {
            let adjusted = raw_offset.wrapping_sub(constants.heap_object_tag);
            class
                .fields
                .insert(field_name.clone(), Field::new(field_name, adjusted));
        }
        classes.insert(name, class);
    }
    Ok(classes)
}

/// Recursively compute each class's `[start, end)` range: `start` is the
/// parent's `end` (0 if no parent), `end` is the offset of the last field
/// plus one pointer width (or equal to `start` if the class has no own
/// fields).
fn compute_offsets(classes: &mut HashMap<String, Class>) -> Result<(), Error> {
    let names: Vec<String> = classes.keys().cloned().collect();
    let mut resolved: HashSet<String> = HashSet::new();
    for name in names {
        resolve_one(&name, classes, &mut resolved, &mut HashSet::new())?;
    }
    Ok(())
}

const POINTER_SIZE: u32 = 4;

fn resolve_one(
    name: &str,
    classes: &mut HashMap<String, Class>,
    resolved: &mut HashSet<String>,
    visiting: &mut HashSet<String>,
) -> Result<(u32, u32), Error> {
    if resolved.contains(name) {
        let c = &classes[name];
        return Ok((c.start, c.end));
    }
    if !visiting.insert(name.to_string()) {
        return Err(Error::ConfigurationIncomplete(format!(
            "cycle in class inheritance involving {}",
            name
        )));
    }

    let parent_name = classes
        .get(name)
        .ok_or_else(|| Error::ConfigurationIncomplete(format!("unknown class {}", name)))?
        .parent
        .clone();

    let start = match parent_name {
        Some(parent) => {
            if !classes.contains_key(&parent) {
                return Err(Error::ConfigurationIncomplete(format!(
                    "class {} has unknown parent {}",
                    name, parent
                )));
            }
            let (_, parent_end) = resolve_one(&parent, classes, resolved, visiting)?;
            parent_end
        }
        None => 0,
    };

    let last_field_offset = classes[name].fields.values().map(|f| f.heap_offset()).max();
    let end = match last_field_offset {
        Some(off) => off + POINTER_SIZE,
        None => start,
    };

    let class = classes.get_mut(name).unwrap();
    class.start = start;
    class.end = end;

    visiting.remove(name);
    resolved.insert(name.to_string());
    Ok((start, end))
}
