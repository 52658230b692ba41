//! The Tag Discriminator (component D): classifies a pointer-sized word as
//! a SMI, a Failure sentinel, or a tagged HeapObject pointer.

use crate::error::Error;
use crate::metadata::Constants;
use crate::word::Word;

/// A pointer-sized word, classified. Replaces the original's sequential
/// `V8_IS_SMI`/`V8_IS_FAILURE`/`V8_IS_HEAPOBJECT` macro checks with a
/// tagged variant, per the design notes' "polymorphism over classes/fields"
/// guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// A small integer, already shifted out of its tagged encoding.
    Smi(i32),
    /// The opaque out-of-memory-or-similar sentinel. No further decoding.
    Failure,
    /// A tagged pointer into the heap. Still has its tag bit set; subtract
    /// `heap_object_tag` to get the real address (callers normally don't
    /// need to do this by hand — [`crate::reader`] does it for them).
    HeapObject(Word),
}

pub fn is_smi(word: Word, c: &Constants) -> bool {
    (word.raw() & c.smi_tag_mask) == c.smi_tag
}

pub fn is_failure(word: Word, c: &Constants) -> bool {
    (word.raw() & c.failure_tag_mask) == c.failure_tag
}

pub fn is_heap_object(word: Word, c: &Constants) -> bool {
    (word.raw() & c.heap_object_tag_mask) == c.heap_object_tag
}

/// Right-shift a word already known to be a SMI into its integer value.
/// Callers should check [`is_smi`] first; this function does not check.
pub fn smi_value(word: Word, c: &Constants) -> i32 {
    (word.raw() as i32).wrapping_shr(c.smi_value_shift)
}

/// Classify `word`, checking Failure before SMI before HeapObject — the
/// order `obj_jstype()` in the original module uses, which takes priority
/// here over the more commonly quoted SMI-first ordering.
pub fn classify(word: Word, c: &Constants) -> Result<PointerKind, Error> {
    if is_failure(word, c) {
        Ok(PointerKind::Failure)
    } else if is_smi(word, c) {
        Ok(PointerKind::Smi(smi_value(word, c)))
    } else if is_heap_object(word, c) {
        Ok(PointerKind::HeapObject(word))
    } else {
        Err(Error::type_violation(word, "SMI, Failure, or HeapObject"))
    }
}
