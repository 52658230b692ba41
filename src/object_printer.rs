//! The Object Printer (component G): renders a heap object's class
//! hierarchy and fields, and the shared "describe any word" logic
//! ([`describe_word`]) that both object printing and the `describe-type`
//! command build on.

use crate::config::Config;
use crate::error::Error;
use crate::host::{Output, TargetMemory};
use crate::metadata::{Class, Field, Metadata};
use crate::reader;
use crate::string_decoder;
use crate::tag::{self, PointerKind};
use crate::word::Word;

/// Describe the classification and, where applicable, the contents of a
/// single pointer-sized word: `SMI: value = N`, `'Failure' object`, a bare
/// class name, or (for strings and for the `Oddball` class, whose
/// `to_string` field names the singleton it represents) the class name
/// followed by `: "value"`.
pub fn describe_word(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    word: Word,
) -> Result<String, Error> {
    match tag::classify(word, metadata.constants())? {
        PointerKind::Smi(v) => Ok(format!("SMI: value = {}", v)),
        PointerKind::Failure => Ok("'Failure' object".to_string()),
        PointerKind::HeapObject(addr) => {
            let type_byte = reader::read_type_byte(mem, metadata, addr)? as u32;
            let label = metadata
                .instance_type_label(type_byte)
                .unwrap_or("<unknown type>")
                .to_string();

            if label == "Oddball" {
                let str_ptr = reader::read_heap_ptr(mem, metadata, addr, "Oddball", "to_string")?;
                let text = string_decoder::decode_string(
                    mem,
                    metadata,
                    config,
                    str_ptr,
                    config.field_print_buf_len(),
                )?;
                Ok(format!("{}: \"{}\"", label, text))
            } else if string_decoder::is_string_type(type_byte, metadata.constants()) {
                let text = string_decoder::decode_string(
                    mem,
                    metadata,
                    config,
                    addr,
                    config.field_print_buf_len(),
                )?;
                Ok(format!("{}: \"{}\"", label, text))
            } else {
                Ok(label)
            }
        }
    }
}

/// Print `addr` as an instance of `class`, recursing through its parent
/// chain. `addr` is the tagged HeapObject pointer (not yet adjusted).
pub fn print_object(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
    class: &Class,
) -> Result<(), Error> {
    print_layer(mem, metadata, config, output, addr, class)?;
    output.write_str("\n");
    Ok(())
}

fn print_layer(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
    class: &Class,
) -> Result<(), Error> {
    if !class.has_own_fields() {
        output.write_str(&format!("{} ", class.name()));
        if let Some(parent) = class.parent().as_ref().and_then(|p| metadata.find_class(p)) {
            output.write_str("< ");
            print_layer(mem, metadata, config, output, addr, parent)?;
        }
        return Ok(());
    }

    output.write_str(&format!("{} {} {{\n", addr, class.name()));
    output.push_indent(config.indent_width());

    if let Some(parent) = class.parent().as_ref().and_then(|p| metadata.find_class(p)) {
        print_layer(mem, metadata, config, output, addr, parent)?;
    }

    for field in class.fields() {
        print_field(mem, metadata, config, output, addr, field);
    }

    output.pop_indent(config.indent_width());
    output.write_str("}\n");
    Ok(())
}

/// Print one field. Unreadable fields print `(unreadable)` and processing
/// continues — object printing is deliberately lenient so a partial dump
/// remains useful even over corrupted or unmapped heap regions.
fn print_field(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    config: &Config,
    output: &mut dyn Output,
    addr: Word,
    field: &Field,
) {
    let field_addr = addr.add_offset(field.heap_offset());
    match reader::read_word(mem, field_addr) {
        Err(_) => {
            output.write_line(&format!("{} {} (unreadable)", field_addr, field.name()));
        }
        Ok(word) => match describe_word(mem, metadata, config, word) {
            Ok(description) => {
                output.write_line(&format!("{} {}: {}", field_addr, field.name(), description));
            }
            Err(_) => {
                output.write_line(&format!("{} {} (unreadable)", field_addr, field.name()));
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use crate::host::StringOutput;
    use crate::metadata::{Class as MClass, Constants, EnumTable};
    use std::collections::BTreeMap;

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

    fn metadata_with_point_class() -> Metadata {
        let mut classes = BTreeMap::new();

        let mut map_class = MClass::new("Map");
        map_class.insert_field(crate::metadata::Field::new("instance_attributes", 4));
        classes.insert("Map".to_string(), map_class);

        let mut point = MClass::new("JSPoint");
        point.insert_field(crate::metadata::Field::new("x", 4));
        point.insert_field(crate::metadata::Field::new("y", 8));
        classes.insert("JSPoint".to_string(), point);

        let mut instance_types = EnumTable::new();
        instance_types.insert(0x10, "JSPoint");

        Metadata::new(classes, instance_types, EnumTable::new(), constants())
    }

    #[test]
    fn prints_fields_with_smi_values() {
        let metadata = metadata_with_point_class();
        let config = Config::default();
        let mut host = MockHost::new();
        let obj = Word(0x1001);
        // map pointer for the object itself, so describe_word could recurse
        // if ever asked to (not needed here; fields are plain SMIs).
        host.write_word(obj.sub(1), Word(0x2001));
        host.write_bytes(Word(0x2001).add_offset(4), &[0x10]);
        host.write_word(obj.add_offset(4), Word(6)); // x = SMI 3
        host.write_word(obj.add_offset(8), Word(10)); // y = SMI 5

        let class = metadata.find_class("JSPoint").unwrap();
        let mut out = StringOutput::new();
        print_object(&host, &metadata, &config, &mut out, obj, class).unwrap();

        let text = out.into_string();
        assert!(text.contains("x: SMI: value = 3"));
        assert!(text.contains("y: SMI: value = 5"));
    }

    #[test]
    fn unreadable_field_does_not_abort_printing() {
        let metadata = metadata_with_point_class();
        let config = Config::default();
        let mut host = MockHost::new();
        let obj = Word(0x1001);
        // leave x unmapped; only write y
        host.write_word(obj.add_offset(8), Word(10));

        let class = metadata.find_class("JSPoint").unwrap();
        let mut out = StringOutput::new();
        print_object(&host, &metadata, &config, &mut out, obj, class).unwrap();

        let text = out.into_string();
        assert!(text.contains("x (unreadable)"));
        assert!(text.contains("y: SMI: value = 5"));
    }

    #[test]
    fn class_with_no_own_fields_prints_inheritance_header() {
        let mut classes = BTreeMap::new();
        let base = MClass::new("Base"); // no fields: start == end == 0
        classes.insert("Base".to_string(), base);
        let mut derived = MClass::new("Derived");
        derived.set_parent(Some("Base".to_string()));
        derived.set_range(0, 0); // no own fields either: end == start
        classes.insert("Derived".to_string(), derived);
        let metadata = Metadata::new(classes, EnumTable::new(), EnumTable::new(), constants());

        let config = Config::default();
        let host = MockHost::new();
        let class = metadata.find_class("Derived").unwrap();
        let mut out = StringOutput::new();
        print_layer(&host, &metadata, &config, &mut out, Word(0x1001), class).unwrap();
        assert_eq!(out.into_string(), "Derived < Base ");
    }
}
