use nom::number::complete::le_u32;
use nom::IResult;

/// A pointer-sized value as it appears in V8 heap memory: either a tagged
/// pointer, a SMI, or a Failure sentinel, still in its raw encoded form.
///
/// Per the crate's scope (32-bit targets only), this wraps a `u32`. All
/// arithmetic on it is wrapping: a corrupted or adversarial target image
/// must never be able to panic the decoder via overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Word(pub u32);

impl Word {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn add_offset(self, offset: u32) -> Word {
        Word(self.0.wrapping_add(offset))
    }

    pub fn sub(self, amount: u32) -> Word {
        Word(self.0.wrapping_sub(amount))
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Word> {
        let (rest, v) = le_u32(input)?;
        Ok((rest, Word(v)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Word> {
        Word::parse(bytes).ok().map(|(_, w)| w)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for Word {
    fn from(v: u32) -> Word {
        Word(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_little_endian() {
        let bytes = [0x06, 0x00, 0x00, 0x00];
        let (rest, w) = Word::parse(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(w, Word(6));
    }

    #[test]
    fn offset_arithmetic_wraps_instead_of_panicking() {
        let w = Word(0);
        assert_eq!(w.sub(1), Word(u32::MAX));
        assert_eq!(Word(u32::MAX).add_offset(1), Word(0));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(format!("{}", Word(0x1001)), "0x00001001");
    }
}
