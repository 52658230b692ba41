//! The Metadata Store (component B): classes, fields, enum-value tables,
//! and the integer constants discovered by [`autoconfig`].
//!
//! Everything here is built once by [`autoconfig::Autoconfigurator`] and is
//! read-only for the rest of the process lifetime — no field is ever
//! mutated after construction finishes, so a `Metadata` is `Send + Sync`
//! for free and a host can share one behind a plain `Arc` across
//! concurrently-served requests with no additional locking.

pub mod autoconfig;

use std::collections::BTreeMap;

use getset::{CopyGetters, Getters};

/// A single field of a V8 heap object class.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Field {
    #[getset(get = "pub")]
    name: String,
    /// Already adjusted by `V8_OFF_HEAP` (tag-bit subtracted) at
    /// autoconfiguration time — reader code never re-applies it.
    #[getset(get_copy = "pub")]
    heap_offset: u32,
}

impl Field {
    pub fn new(name: impl Into<String>, heap_offset: u32) -> Field {
        Field {
            name: name.into(),
            heap_offset,
        }
    }
}

/// A V8 heap object class: a name, an optional parent, a field table, and
/// the computed `[start, end)` byte range of its own (non-inherited)
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Class {
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    parent: Option<String>,
    fields: BTreeMap<String, Field>,
    #[getset(get_copy = "pub")]
    start: u32,
    #[getset(get_copy = "pub")]
    end: u32,
}

/// Name length bound carried over from the original module's fixed
/// `char v8c_name[64]` metadata buffer. A longer name is a configuration
/// warning, not a silent truncation.
pub const MAX_CLASS_NAME_LEN: usize = 64;

impl Class {
    pub fn new(name: impl Into<String>) -> Class {
        Class {
            name: name.into(),
            parent: None,
            fields: BTreeMap::new(),
            start: 0,
            end: 0,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Insert or replace a field. Exposed at `pub(crate)` for the
    /// autoconfigurator and for other modules' tests that need to build a
    /// [`Class`] by hand; ordinary readers only ever look fields up.
    pub(crate) fn insert_field(&mut self, field: Field) {
        self.fields.insert(field.name().clone(), field);
    }

    /// Set the computed `[start, end)` range. `pub(crate)` for the same
    /// reason as [`Class::insert_field`].
    pub(crate) fn set_range(&mut self, start: u32, end: u32) {
        self.start = start;
        self.end = end;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// A class with no fields of its own reports `end == start` (the
    /// "no own fields" marker used by the Object Printer to decide whether
    /// to recurse straight through to the parent).
    pub fn has_own_fields(&self) -> bool {
        self.end != self.start
    }
}

/// An append-only, insertion-ordered (value, label) table used for both
/// the instance-type table and the frame-type table. Lookup returns the
/// first-inserted match on a tied value, matching the original's
/// linear-scan-first-match semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumTable {
    entries: Vec<(i64, String)>,
}

impl EnumTable {
    pub fn new() -> EnumTable {
        EnumTable::default()
    }

    pub fn insert(&mut self, value: i64, label: impl Into<String>) {
        self.entries.push((value, label.into()));
    }

    pub fn lookup(&self, value: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, label)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(i64, String)> {
        self.entries.iter()
    }
}

/// The fixed set of integer constants read by symbol name during
/// autoconfiguration: tag masks/shifts, the string-type boundary, string
/// encoding/representation masks and tags, and frame-slot offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Constants {
    pub smi_tag: u32,
    pub smi_tag_mask: u32,
    pub smi_value_shift: u32,
    pub failure_tag: u32,
    pub failure_tag_mask: u32,
    pub heap_object_tag: u32,
    pub heap_object_tag_mask: u32,
    pub first_nonstring_type: u32,
    pub is_not_string_mask: u32,
    pub string_tag: u32,
    pub not_string_tag: u32,
    pub string_encoding_mask: u32,
    pub ascii_string_tag: u32,
    pub two_byte_string_tag: u32,
    pub string_representation_mask: u32,
    pub seq_string_tag: u32,
    pub cons_string_tag: u32,
    pub external_string_tag: u32,
    pub off_fp_context: u32,
    pub off_fp_marker: u32,
    pub off_fp_function: u32,
}

/// The fully assembled result of autoconfiguration: everything the rest of
/// the crate needs to decode heap state for one target.
#[derive(Debug, Clone)]
pub struct Metadata {
    classes: BTreeMap<String, Class>,
    instance_types: EnumTable,
    frame_types: EnumTable,
    constants: Constants,
}

impl Metadata {
    pub fn new(
        classes: BTreeMap<String, Class>,
        instance_types: EnumTable,
        frame_types: EnumTable,
        constants: Constants,
    ) -> Metadata {
        Metadata {
            classes,
            instance_types,
            frame_types,
            constants,
        }
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    pub fn instance_types(&self) -> &EnumTable {
        &self.instance_types
    }

    pub fn frame_types(&self) -> &EnumTable {
        &self.frame_types
    }

    /// Classes in lexicographic order — a `BTreeMap` produces this for
    /// free, with no separate sort step.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    pub fn find_class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    /// Resolve `(class, field)` to its already-heap-adjusted offset.
    pub fn field_offset(&self, class: &str, field: &str) -> Option<u32> {
        self.find_class(class)
            .and_then(|c| c.field(field))
            .map(|f| f.heap_offset())
    }

    pub fn instance_type_label(&self, type_byte: u32) -> Option<&str> {
        self.instance_types.lookup(type_byte as i64)
    }

    pub fn frame_type_label(&self, marker: i64) -> Option<&str> {
        self.frame_types.lookup(marker)
    }
}
