//! The Heap Reader (component E): typed reads of V8 heap object fields,
//! resolved by class+field name against the [`Metadata`] store, plus the
//! type-byte read every other decoding step is built on.

use crate::error::{Error, HostError};
use crate::host::TargetMemory;
use crate::metadata::Metadata;
use crate::tag::{self, PointerKind};
use crate::word::Word;

fn to_target_read_err(addr: Word) -> impl Fn(HostError) -> Error {
    move |e| Error::target_read(addr, e)
}

/// Read one pointer-sized word at `addr`, tagged form untouched.
pub fn read_word(mem: &dyn TargetMemory, addr: Word) -> Result<Word, Error> {
    let bytes = mem.read_bytes(addr, 4).map_err(to_target_read_err(addr))?;
    Word::from_bytes(&bytes).ok_or_else(|| Error::target_read(addr, HostError::new("short read")))
}

fn field_address(
    metadata: &Metadata,
    addr: Word,
    class: &str,
    field: &str,
) -> Result<Word, Error> {
    let offset = metadata.field_offset(class, field).ok_or_else(|| {
        Error::ConfigurationIncomplete(format!("no such field {}.{}", class, field))
    })?;
    Ok(addr.add_offset(offset))
}

/// Read the (still tagged) pointer stored in `class.field` of the object at
/// `addr`.
pub fn read_heap_ptr(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    addr: Word,
    class: &str,
    field: &str,
) -> Result<Word, Error> {
    let field_addr = field_address(metadata, addr, class, field)?;
    read_word(mem, field_addr)
}

/// Read `class.field` of the object at `addr` and assert it is a SMI,
/// returning its decoded integer value.
pub fn read_heap_smi(
    mem: &dyn TargetMemory,
    metadata: &Metadata,
    addr: Word,
    class: &str,
    field: &str,
) -> Result<i32, Error> {
    let word = read_heap_ptr(mem, metadata, addr, class, field)?;
    match tag::classify(word, metadata.constants())? {
        PointerKind::Smi(v) => Ok(v),
        _ => Err(Error::type_violation(word, "SMI")),
    }
}

/// Read the instance-type byte of the HeapObject at `addr`: the Map
/// pointer sits at `addr - heap_object_tag` (every heap object's first
/// word, independent of the class's own field layout), and the type byte
/// sits at `map + Map.instance_attributes`.
pub fn read_type_byte(mem: &dyn TargetMemory, metadata: &Metadata, addr: Word) -> Result<u8, Error> {
    let map_addr = addr.sub(metadata.constants().heap_object_tag);
    let map_word = read_word(mem, map_addr)?;
    match tag::classify(map_word, metadata.constants())? {
        PointerKind::HeapObject(_) => {}
        _ => return Err(Error::ProtocolViolation(map_word)),
    }
    let attrs_offset = metadata
        .field_offset("Map", "instance_attributes")
        .ok_or_else(|| {
            Error::ConfigurationIncomplete("Map.instance_attributes not resolved".into())
        })?;
    let byte_addr = map_word.add_offset(attrs_offset);
    let bytes = mem
        .read_bytes(byte_addr, 1)
        .map_err(to_target_read_err(byte_addr))?;
    Ok(bytes[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use crate::metadata::{Class, Constants, EnumTable};
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

    fn metadata_with_map_class() -> Metadata {
        let mut classes = BTreeMap::new();
        let mut map_class = Class::new("Map");
        map_class.insert_field(crate::metadata::Field::new("instance_attributes", 4));
        classes.insert("Map".to_string(), map_class);

        let mut fixed_array = Class::new("FixedArray");
        fixed_array.insert_field(crate::metadata::Field::new("data", 8));
        classes.insert("FixedArray".to_string(), fixed_array);

        Metadata::new(classes, EnumTable::new(), EnumTable::new(), constants())
    }

    #[test]
    fn reads_type_byte_through_map() {
        let metadata = metadata_with_map_class();
        let mut host = MockHost::new();
        // object tagged at 0x1001 (tag bit 1 set): map ptr lives at 0x1000
        let obj = Word(0x1001);
        let map_addr = Word(0x2001); // tagged HeapObject map pointer
        host.write_word(obj.sub(1), map_addr);
        // instance_attributes at map_addr + 4 (already heap-adjusted offset)
        host.write_bytes(map_addr.add_offset(4), &[0x42]);

        let byte = read_type_byte(&host, &metadata, obj).unwrap();
        assert_eq!(byte, 0x42);
    }

    #[test]
    fn rejects_map_that_is_not_heap_object() {
        let metadata = metadata_with_map_class();
        let mut host = MockHost::new();
        let obj = Word(0x1001);
        // a SMI value where the Map pointer should be
        host.write_word(obj.sub(1), Word(0x0));
        let err = read_type_byte(&host, &metadata, obj).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn read_heap_smi_rejects_non_smi() {
        let metadata = metadata_with_map_class();
        let mut host = MockHost::new();
        let obj = Word(0x1001);
        host.write_word(obj.add_offset(4), Word(0x1001)); // a tagged pointer, not a SMI
        let err = read_heap_smi(&host, &metadata, obj, "Map", "instance_attributes").unwrap_err();
        assert!(matches!(err, Error::TypeViolation { .. }));
    }
}
