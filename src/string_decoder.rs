//! The String Decoder (component F): renders any V8 string — sequential,
//! concatenation-tree (cons), or externally-backed — into an owned
//! `String`.
//!
//! Two-byte (UTF-16) strings are detected and labeled, never decoded
//! (explicit non-goal). Concatenation-tree recursion is bounded by
//! [`Config::max_string_depth`] so a pathological or cyclic tree fails
//! cleanly instead of overflowing the stack. The truncation length is an
//! explicit `buf_len` parameter rather than something this module reads
//! off `Config` itself, since callers disagree on which cap applies:
//! top-level string commands use [`Config::string_buf_len`], but the
//! Object Printer renders field values against the independent, smaller
//! [`Config::field_print_buf_len`].

use crate::config::Config;
use crate::error::Error;
use crate::host::TargetMemory;
use crate::metadata::{Constants, Metadata};
use crate::reader;
use crate::word::Word;

const TRUNCATION_SUFFIX: &str = "[...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Representation {
    Sequential,
    Cons,
    External,
    Unknown,
}

impl Representation {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Representation::Sequential => "sequential",
            Representation::Cons => "cons",
            Representation::External => "external",
            Representation::Unknown => "unknown",
        }
    }
}

pub(crate) fn is_string_type(type_byte: u32, c: &Constants) -> bool {
    (type_byte & c.is_not_string_mask) == c.string_tag
}

pub(crate) fn is_ascii_encoding(type_byte: u32, c: &Constants) -> bool {
    (type_byte & c.string_encoding_mask) == c.ascii_string_tag
}

pub(crate) fn representation_of(type_byte: u32, c: &Constants) -> Representation {
    let rep = type_byte & c.string_representation_mask;
    if rep == c.seq_string_tag {
        Representation::Sequential
    } else if rep == c.cons_string_tag {
        Representation::Cons
    } else if rep == c.external_string_tag {
        Representation::External
    } else {
        Representation::Unknown
    }
}

/// Decode the V8 string at `addr` into an owned `String`, truncating
/// sequential/external string data to `buf_len` bytes.
pub fn decode_string(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    addr: Word,
    buf_len: usize,
) -> Result<String, Error> {
    let mut depth_remaining = config.max_string_depth();
    decode_rec(mem, metadata, config, addr, buf_len, &mut depth_remaining)
}

fn decode_rec(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    addr: Word,
    buf_len: usize,
    depth_remaining: &mut usize,
) -> Result<String, Error> {
    if *depth_remaining == 0 {
        return Err(Error::StringDecodingLimitExceeded(config.max_string_depth()));
    }
    *depth_remaining -= 1;

    let type_byte = reader::read_type_byte(mem, metadata, addr)? as u32;
    let constants = metadata.constants();

    if !is_string_type(type_byte, constants) {
        return Ok("<not a string>".to_string());
    }
    if !is_ascii_encoding(type_byte, constants) {
        return Ok("<two-byte string>".to_string());
    }

    match representation_of(type_byte, constants) {
        Representation::Sequential => decode_sequential(mem, metadata, addr, buf_len),
        Representation::Cons => decode_cons(mem, metadata, config, addr, buf_len, depth_remaining),
        Representation::External => decode_external(mem, metadata, config, addr, buf_len),
        Representation::Unknown => Ok("<unknown string representation>".to_string()),
    }
}

/// Walk a cons tree's right spine iteratively, recursing only on each
/// node's `first` (and on whatever non-cons value eventually terminates
/// the spine). This keeps Rust's call stack bounded by the tree's
/// left-nesting depth alone rather than its total size; `depth_remaining`
/// still charges one unit per node visited on the spine, so the overall
/// recursion-limit guarantee is unchanged.
fn decode_cons(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    addr: Word,
    buf_len: usize,
    depth_remaining: &mut usize,
) -> Result<String, Error> {
    let constants = metadata.constants();
    let mut out = String::new();
    let mut node = addr;

    loop {
        let first = reader::read_heap_ptr(mem, metadata, node, "ConsString", "first")?;
        out.push_str(&decode_rec(mem, metadata, config, first, buf_len, depth_remaining)?);

        let second = reader::read_heap_ptr(mem, metadata, node, "ConsString", "second")?;
        let second_type = reader::read_type_byte(mem, metadata, second)? as u32;
        let second_is_cons = is_string_type(second_type, constants)
            && is_ascii_encoding(second_type, constants)
            && representation_of(second_type, constants) == Representation::Cons;

        if !second_is_cons {
            out.push_str(&decode_rec(mem, metadata, config, second, buf_len, depth_remaining)?);
            return Ok(out);
        }

        if *depth_remaining == 0 {
            return Err(Error::StringDecodingLimitExceeded(config.max_string_depth()));
        }
        *depth_remaining -= 1;
        node = second;
    }
}

fn decode_sequential(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    addr: Word,
    buf_len: usize,
) -> Result<String, Error> {
    let len = reader::read_heap_smi(mem, metadata, addr, "String", "length")?;
    let len = len.max(0) as usize;
    let chars_offset = metadata.field_offset("SeqAsciiString", "chars").ok_or_else(|| {
        crate::error::Error::ConfigurationIncomplete("SeqAsciiString.chars not resolved".into())
    })?;
    let chars_addr = addr.add_offset(chars_offset);

    let (readable, truncated) = if len <= buf_len.saturating_sub(1) {
        (len, false)
    } else {
        (buf_len.saturating_sub(TRUNCATION_SUFFIX.len()), true)
    };

    let bytes = mem
        .read_bytes(chars_addr, readable)
        .map_err(|e| Error::target_read(chars_addr, e))?;
    let mut out: String = bytes.iter().map(|&b| b as char).collect();
    if truncated {
        out.push_str(TRUNCATION_SUFFIX);
    }
    Ok(out)
}

/// `resource` names the backing `node::ExternalAsciiStringResource`, not
/// the character data itself: the data pointer lives at a fixed offset
/// *inside* that resource (`NODE_OFF_EXTSTR_DATA`), so decoding an
/// external string is a two-hop read — resource, then the pointer stored
/// at `resource + external_string_backing_offset`, then the bytes at
/// *that* address — matching the original's `jsstr_print_external`.
fn decode_external(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    addr: Word,
    buf_len: usize,
) -> Result<String, Error> {
    let resource = reader::read_heap_ptr(mem, metadata, addr, "ExternalString", "resource")?;
    let ptr_addr = resource.add_offset(config.external_string_backing_offset());
    let data_addr = reader::read_word(mem, ptr_addr)?;
    let bytes = mem
        .read_cstr(data_addr, buf_len)
        .map_err(|e| Error::target_read(data_addr, e))?;
    if let Some(&first) = bytes.first() {
        if first >= 0x80 {
            return Err(Error::type_violation(data_addr, "ASCII external string data"));
        }
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use crate::metadata::{Class, EnumTable, Field};
    use std::collections::BTreeMap;

    // SMI tag 0/mask 1; HeapObject tag 1/mask 3 (so tagged addresses are
    // odd); string tag 0 under mask 0x80; ASCII tag 4 under encoding mask
    // 4; seq/cons/external reps 0/1/2 under mask 3.
    fn constants() -> Constants {
        Constants {
            smi_tag: 0,
            smi_tag_mask: 1,
            smi_value_shift: 1,
            failure_tag: 3,
            failure_tag_mask: 3,
            heap_object_tag: 1,
            heap_object_tag_mask: 3,
            first_nonstring_type: 0x80,
            is_not_string_mask: 0x80,
            string_tag: 0,
            not_string_tag: 0x80,
            string_encoding_mask: 4,
            ascii_string_tag: 4,
            two_byte_string_tag: 0,
            string_representation_mask: 3,
            seq_string_tag: 0,
            cons_string_tag: 1,
            external_string_tag: 2,
            off_fp_context: 0,
            off_fp_marker: 4,
            off_fp_function: 8,
        }
    }

    fn base_metadata() -> Metadata {
        let mut classes = BTreeMap::new();

        let mut map_class = Class::new("Map");
        map_class.insert_field(Field::new("instance_attributes", 4));
        classes.insert("Map".to_string(), map_class);

        let mut string_class = Class::new("String");
        string_class.insert_field(Field::new("length", 4));
        classes.insert("String".to_string(), string_class);

        let mut seq_ascii = Class::new("SeqAsciiString");
        seq_ascii.insert_field(Field::new("chars", 8));
        classes.insert("SeqAsciiString".to_string(), seq_ascii);

        let mut cons = Class::new("ConsString");
        cons.insert_field(Field::new("first", 4));
        cons.insert_field(Field::new("second", 8));
        classes.insert("ConsString".to_string(), cons);

        let mut external = Class::new("ExternalString");
        external.insert_field(Field::new("resource", 4));
        classes.insert("ExternalString".to_string(), external);

        Metadata::new(classes, EnumTable::new(), EnumTable::new(), constants())
    }

    /// Write a Map object at `map_addr` (untagged) whose instance_attributes
    /// byte is `type_byte`, and point the heap object at `obj_addr - 1`
    /// (the tag bit) at that map.
    fn install_map(host: &mut MockHost, obj_tagged: Word, map_addr: Word, type_byte: u8) {
        host.write_word(obj_tagged.sub(1), map_addr);
        host.write_bytes(map_addr.add_offset(4), &[type_byte]);
    }

    fn seq_ascii_type_byte() -> u8 {
        // not-string-mask bit clear (string), ascii bit set, seq rep (0)
        0x04
    }

    fn cons_type_byte() -> u8 {
        0x05 // ascii (4) | cons rep (1)
    }

    fn external_type_byte() -> u8 {
        0x06 // ascii (4) | external rep (2)
    }

    fn write_seq_ascii(host: &mut MockHost, addr: Word, map_addr: Word, text: &str) {
        install_map(host, addr, map_addr, seq_ascii_type_byte());
        host.write_word(addr.add_offset(4), Word((text.len() as u32) << 1)); // SMI-encoded length
        host.write_bytes(addr.add_offset(8), text.as_bytes());
    }

    /// Write an external string at `addr` whose `resource` field (offset
    /// 4) points at `resource_addr`; `resource_addr + backing_offset`
    /// holds the actual data pointer, which in turn points at a
    /// NUL-terminated copy of `text`.
    fn write_external(
        host: &mut MockHost,
        addr: Word,
        map_addr: Word,
        resource_addr: Word,
        data_addr: Word,
        backing_offset: u32,
        text: &str,
    ) {
        install_map(host, addr, map_addr, external_type_byte());
        host.write_word(addr.add_offset(4), resource_addr);
        host.write_word(resource_addr.add_offset(backing_offset), data_addr);
        host.write_cstr(data_addr, text);
    }

    #[test]
    fn decodes_sequential_ascii_string() {
        let metadata = base_metadata();
        let config = Config::default();
        let mut host = MockHost::new();
        write_seq_ascii(&mut host, Word(0x1001), Word(0x3001), "hello");

        let s = decode_string(&host, &metadata, &config, Word(0x1001), config.string_buf_len()).unwrap();
        assert_eq!(s, "hello");
    }

    #[test]
    fn truncates_long_sequential_string() {
        let metadata = base_metadata();
        let mut config = Config::default();
        config.set_string_buf_len(10);
        let mut host = MockHost::new();
        write_seq_ascii(&mut host, Word(0x1001), Word(0x3001), "abcdefghijklmnop");

        let s = decode_string(&host, &metadata, &config, Word(0x1001), config.string_buf_len()).unwrap();
        // buf_len 10, suffix "[...]" is 5 chars -> 5 readable chars + suffix
        assert_eq!(s, "abcde[...]");
    }

    #[test]
    fn decodes_concatenation_tree_left_to_right() {
        let metadata = base_metadata();
        let config = Config::default();
        let mut host = MockHost::new();

        // leaves
        write_seq_ascii(&mut host, Word(0x1101), Word(0x3101), "foo");
        write_seq_ascii(&mut host, Word(0x1201), Word(0x3201), "ba");
        write_seq_ascii(&mut host, Word(0x1301), Word(0x3301), "r");

        // inner cons: second -> "ba" + "r"
        install_map(&mut host, Word(0x1401), Word(0x3401), cons_type_byte());
        host.write_word(Word(0x1401).add_offset(4), Word(0x1201));
        host.write_word(Word(0x1401).add_offset(8), Word(0x1301));

        // outer cons: "foo" + inner
        install_map(&mut host, Word(0x1501), Word(0x3501), cons_type_byte());
        host.write_word(Word(0x1501).add_offset(4), Word(0x1101));
        host.write_word(Word(0x1501).add_offset(8), Word(0x1401));

        let s = decode_string(&host, &metadata, &config, Word(0x1501), config.string_buf_len()).unwrap();
        assert_eq!(s, "foobar");
    }

    #[test]
    fn decodes_long_right_spine_iteratively() {
        let metadata = base_metadata();
        let config = Config::default();
        let mut host = MockHost::new();

        // A right-leaning chain of 50 single-character leaves: leaf_0 + (leaf_1 + (leaf_2 + ...)).
        const N: u32 = 50;
        let leaf_addr = |i: u32| Word(0x1000 + i * 0x10);
        let leaf_map_addr = |i: u32| Word(0x3000 + i * 0x10);
        let cons_addr = |i: u32| Word(0x5000 + i * 0x10);
        let cons_map_addr = |i: u32| Word(0x7000 + i * 0x10);

        for i in 0..N {
            let ch = (b'a' + (i % 26) as u8) as char;
            write_seq_ascii(&mut host, leaf_addr(i), leaf_map_addr(i), &ch.to_string());
        }

        // cons(N-2) = leaf(N-2) + leaf(N-1); cons(i) = leaf(i) + cons(i+1) for i < N-2.
        install_map(&mut host, cons_addr(N - 2), cons_map_addr(N - 2), cons_type_byte());
        host.write_word(cons_addr(N - 2).add_offset(4), leaf_addr(N - 2));
        host.write_word(cons_addr(N - 2).add_offset(8), leaf_addr(N - 1));
        for i in (0..N - 2).rev() {
            install_map(&mut host, cons_addr(i), cons_map_addr(i), cons_type_byte());
            host.write_word(cons_addr(i).add_offset(4), leaf_addr(i));
            host.write_word(cons_addr(i).add_offset(8), cons_addr(i + 1));
        }

        let s = decode_string(&host, &metadata, &config, cons_addr(0), config.string_buf_len()).unwrap();
        let expected: String = (0..N).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        assert_eq!(s, expected);
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let metadata = base_metadata();
        let mut config = Config::default();
        config.set_max_string_depth(2);
        let mut host = MockHost::new();

        write_seq_ascii(&mut host, Word(0x1101), Word(0x3101), "a");
        install_map(&mut host, Word(0x1201), Word(0x3201), cons_type_byte());
        host.write_word(Word(0x1201).add_offset(4), Word(0x1101));
        host.write_word(Word(0x1201).add_offset(8), Word(0x1101));
        install_map(&mut host, Word(0x1301), Word(0x3301), cons_type_byte());
        host.write_word(Word(0x1301).add_offset(4), Word(0x1201));
        host.write_word(Word(0x1301).add_offset(8), Word(0x1201));

        let err =
            decode_string(&host, &metadata, &config, Word(0x1301), config.string_buf_len()).unwrap_err();
        assert!(matches!(err, Error::StringDecodingLimitExceeded(_)));
    }

    #[test]
    fn non_string_type_is_labeled_not_an_error() {
        let metadata = base_metadata();
        let config = Config::default();
        let mut host = MockHost::new();
        install_map(&mut host, Word(0x1001), Word(0x3001), 0x80); // not-string bit set

        let s = decode_string(&host, &metadata, &config, Word(0x1001), config.string_buf_len()).unwrap();
        assert_eq!(s, "<not a string>");
    }

    #[test]
    fn two_byte_encoding_is_labeled_not_decoded() {
        let metadata = base_metadata();
        let config = Config::default();
        let mut host = MockHost::new();
        install_map(&mut host, Word(0x1001), Word(0x3001), 0x00); // string, two-byte, seq

        let s = decode_string(&host, &metadata, &config, Word(0x1001), config.string_buf_len()).unwrap();
        assert_eq!(s, "<two-byte string>");
    }

    #[test]
    fn decodes_external_string_through_two_hop_resource_pointer() {
        let metadata = base_metadata();
        let config = Config::default();
        let mut host = MockHost::new();
        write_external(
            &mut host,
            Word(0x1001),
            Word(0x3001),
            Word(0x4001),
            Word(0x9001),
            config.external_string_backing_offset(),
            "hello",
        );

        let s = decode_string(&host, &metadata, &config, Word(0x1001), config.string_buf_len()).unwrap();
        assert_eq!(s, "hello");
    }
}
