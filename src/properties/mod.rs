//! The character-properties store (§3.2, §4.3): decodes the 32-bit word the
//! properties trie yields for every code point into general category, bidi
//! class, mirroring, and numeric/digit values, consulting the exceptions
//! table when the inline value field isn't enough.
//!
//! Grounded on `icu4c/source/common/uchar.c`'s property-word layout
//! (`GC_*_MASK`, `EXCEPTION_SHIFT`, `VALUE_SHIFT`, `UPPER_MASK`, the
//! `flagsOffset`/popcount table for locating an exception's slots) and on
//! the teacher's `ucd.rs` accessor surface (`combining_class`,
//! `primary_composite`, case tables), re-expressed over a trie-backed store
//! instead of `HashMap`s loaded from JSON.

pub mod case;

use crate::data::{DataHeader, DataSource, OnceStore, FORMAT_PROPERTIES};
use crate::error::{Error, Result};
use crate::trie::CodePointTrie;

// --- property word layout (§3.2, SPEC_FULL.md §3) ---------------------------

const CATEGORY_MASK: u32 = 0x1F; // bits 0..=4
const EXCEPTION_BIT: u32 = 1 << 5; // bit 5
const BIDI_SHIFT: u32 = 6;
const BIDI_MASK: u32 = 0x1F << BIDI_SHIFT; // bits 6..=10
const MIRROR_BIT: u32 = 1 << 11; // bit 11
const VALUE_SHIFT: u32 = 20; // bits 20..=31

/// Sign-extend the 12-bit value field (§3.2: "arithmetic overflow into the
/// upper bits is by design").
fn signed_value(word: u32) -> i32 {
    ((word as i32) >> VALUE_SHIFT as i32) // arithmetic shift sign-extends
}

fn exception_index(word: u32) -> usize {
    (word >> VALUE_SHIFT) as usize
}

/// One of the 30 general-category enumerators (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GeneralCategory {
    Lu = 0,
    Ll = 1,
    Lt = 2,
    Lm = 3,
    Lo = 4,
    Mn = 5,
    Me = 6,
    Mc = 7,
    Nd = 8,
    Nl = 9,
    No = 10,
    Zs = 11,
    Zl = 12,
    Zp = 13,
    Cc = 14,
    Cf = 15,
    Co = 16,
    Cs = 17,
    Pd = 18,
    Ps = 19,
    Pe = 20,
    Pc = 21,
    Po = 22,
    Sm = 23,
    Sc = 24,
    Sk = 25,
    So = 26,
    Pi = 27,
    Pf = 28,
    Cn = 29,
}

impl GeneralCategory {
    pub fn from_u8(v: u8) -> GeneralCategory {
        use GeneralCategory::*;
        const TABLE: [GeneralCategory; 30] = [
            Lu, Ll, Lt, Lm, Lo, Mn, Me, Mc, Nd, Nl, No, Zs, Zl, Zp, Cc, Cf, Co, Cs, Pd, Ps, Pe, Pc, Po, Sm, Sc, Sk,
            So, Pi, Pf, Cn,
        ];
        TABLE.get(v as usize).copied().unwrap_or(Cn)
    }

    pub fn is_letter(self) -> bool {
        use GeneralCategory::*;
        matches!(self, Lu | Ll | Lt | Lm | Lo)
    }

    pub fn is_mark(self) -> bool {
        use GeneralCategory::*;
        matches!(self, Mn | Me | Mc)
    }

    pub fn is_number(self) -> bool {
        use GeneralCategory::*;
        matches!(self, Nd | Nl | No)
    }

    pub fn is_separator(self) -> bool {
        use GeneralCategory::*;
        matches!(self, Zs | Zl | Zp)
    }

    pub fn is_other(self) -> bool {
        use GeneralCategory::*;
        matches!(self, Cc | Cf | Co | Cs | Cn)
    }
}

/// Bidirectional category (§3.2 bits 6..=10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BidiClass {
    L = 0,
    R = 1,
    Al = 2,
    En = 3,
    Es = 4,
    Et = 5,
    An = 6,
    Cs = 7,
    Nsm = 8,
    Bn = 9,
    B = 10,
    S = 11,
    Ws = 12,
    On = 13,
    Lre = 14,
    Lro = 15,
    Rle = 16,
    Rlo = 17,
    Pdf = 18,
}

impl BidiClass {
    pub fn from_u8(v: u8) -> BidiClass {
        use BidiClass::*;
        const TABLE: [BidiClass; 19] = [
            L, R, Al, En, Es, Et, An, Cs, Nsm, Bn, B, S, Ws, On, Lre, Lro, Rle, Rlo, Pdf,
        ];
        TABLE.get(v as usize).copied().unwrap_or(On)
    }
}

/// Which optional word follows an exception's flag word, in this order
/// (§3.2: "nine optional follow-on words").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionSlot {
    Uppercase = 0,
    Lowercase = 1,
    Titlecase = 2,
    Digit = 3,
    Numeric = 4,
    Denominator = 5,
    Mirror = 6,
    SpecialCasing = 7,
    CaseFolding = 8,
}

const EXCEPTION_SLOT_COUNT: u32 = 9;

/// A code point whose record needs more than the inline 12-bit value field.
/// Encoded flat: `[flags_and_ccc, slot0, slot1, ...]` where `flags_and_ccc`
/// packs the 9-bit present-slot mask in bits 0..=8 and the combining class in
/// bits 16..=23, and the present slots follow in `ExceptionSlot` order
/// (§3.2, "a compact bit-count table converts a (flag, slot) pair into the
/// slot's offset").
pub struct ExceptionsTable {
    words: Vec<u32>,
}

impl ExceptionsTable {
    pub fn new(words: Vec<u32>) -> Self {
        ExceptionsTable { words }
    }

    fn flags_word(&self, index: usize) -> u32 {
        self.words[index]
    }

    pub fn combining_class(&self, index: usize) -> u8 {
        ((self.flags_word(index) >> 16) & 0xFF) as u8
    }

    pub fn has_slot(&self, index: usize, slot: ExceptionSlot) -> bool {
        self.flags_word(index) & (1 << (slot as u32)) != 0
    }

    /// Offset of `slot`'s word, counting present slots before it
    /// (a popcount over the lower bits of the flag mask).
    pub fn slot(&self, index: usize, slot: ExceptionSlot) -> Option<u32> {
        if !self.has_slot(index, slot) {
            return None;
        }
        let flags = self.flags_word(index) & ((1 << EXCEPTION_SLOT_COUNT) - 1);
        let preceding = flags & ((1 << (slot as u32)) - 1);
        let offset = preceding.count_ones() as usize;
        Some(self.words[index + 1 + offset])
    }
}

/// A script / binary-properties / east-asian-width row, reached through a
/// second trie mapping a code point to a row index (§3.2 "additional
/// properties vectors").
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditionalRow {
    pub script: u16,
    pub binary_props: u32,
    pub east_asian_width: u8,
}

pub mod binary_prop {
    pub const ALPHABETIC: u32 = 1 << 0;
    pub const LOWERCASE: u32 = 1 << 1;
    pub const UPPERCASE: u32 = 1 << 2;
    pub const WHITE_SPACE: u32 = 1 << 3;
    pub const CASED: u32 = 1 << 4;
    pub const CASE_IGNORABLE: u32 = 1 << 5;
}

/// The ASCII/Latin-1-control fallback table used when no data has been
/// loaded (§4.3): a flat `u32` word per code point `0x00..=0x9F`, in the same
/// bit layout as the real properties word, so the ordinary decode path works
/// unchanged on it.
pub const ASCII_FALLBACK_LEN: usize = 0xA0;

fn ascii_fallback_word(cp: u32) -> u32 {
    use GeneralCategory::*;
    let cat = if cp < 0x20 || cp == 0x7F || (0x80..=0x9F).contains(&cp) {
        Cc
    } else if cp == b' ' as u32 {
        Zs
    } else if (b'0' as u32..=b'9' as u32).contains(&cp) {
        Nd
    } else if (b'A' as u32..=b'Z' as u32).contains(&cp) {
        Lu
    } else if (b'a' as u32..=b'z' as u32).contains(&cp) {
        Ll
    } else {
        Po
    };
    let value = if cat == Nd {
        (cp - b'0' as u32) as i32
    } else if cat == Lu {
        32
    } else if cat == Ll {
        -32
    } else {
        0
    };
    (cat as u32) | (((value as u32) & 0xFFF) << VALUE_SHIFT)
}

/// The loaded character-properties store (§3.2, §4.3). All operations are
/// read-only and safe to call from multiple threads at once once loaded
/// (§5): every query is a pure function of the code point and the
/// already-published tries and tables.
pub struct PropertiesStore {
    trie: CodePointTrie,
    exceptions: ExceptionsTable,
    additional_trie: Option<CodePointTrie>,
    additional_rows: Vec<AdditionalRow>,
}

static DEGRADED: OnceStore<()> = OnceStore::new();

impl PropertiesStore {
    pub fn from_parts(
        trie: CodePointTrie,
        exceptions: ExceptionsTable,
        additional_trie: Option<CodePointTrie>,
        additional_rows: Vec<AdditionalRow>,
    ) -> Self {
        PropertiesStore {
            trie,
            exceptions,
            additional_trie,
            additional_rows,
        }
    }

    /// Load from a serialized image per §6.1's `UPro` file layout: header,
    /// then the trie, then the exceptions array length-prefixed, then
    /// (optionally) the additional-properties trie and row table.
    pub fn open(source: &DataSource) -> Result<Self> {
        let bytes = match source {
            DataSource::Path(p) => std::fs::read(p)
                .map_err(|_| Error::invalid_format("could not read properties data file"))?,
            DataSource::Bytes(b) => b.to_vec(),
        };
        Self::deserialize(&bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let (_header, rest) = DataHeader::read(bytes, FORMAT_PROPERTIES)?;
        let mut pos = 0usize;
        let trie_len = read_u32(rest, &mut pos)?;
        let trie = CodePointTrie::deserialize(&rest[pos..pos + trie_len as usize], 0, 0)?;
        pos += trie_len as usize;

        let exc_count = read_u32(rest, &mut pos)? as usize;
        let mut exceptions = Vec::with_capacity(exc_count);
        for _ in 0..exc_count {
            exceptions.push(read_u32(rest, &mut pos)?);
        }

        let has_additional = read_u32(rest, &mut pos)? != 0;
        let (additional_trie, additional_rows) = if has_additional {
            let add_trie_len = read_u32(rest, &mut pos)?;
            let add_trie = CodePointTrie::deserialize(&rest[pos..pos + add_trie_len as usize], 0, 0)?;
            pos += add_trie_len as usize;
            let row_count = read_u32(rest, &mut pos)? as usize;
            let mut rows = Vec::with_capacity(row_count);
            for _ in 0..row_count {
                let script = read_u32(rest, &mut pos)? as u16;
                let binary_props = read_u32(rest, &mut pos)?;
                let eaw = read_u32(rest, &mut pos)? as u8;
                rows.push(AdditionalRow {
                    script,
                    binary_props,
                    east_asian_width: eaw,
                });
            }
            (Some(add_trie), rows)
        } else {
            (None, Vec::new())
        };

        Ok(PropertiesStore::from_parts(
            trie,
            ExceptionsTable::new(exceptions),
            additional_trie,
            additional_rows,
        ))
    }

    fn word(&self, cp: u32) -> u32 {
        self.trie.get(cp)
    }

    pub fn general_category(&self, cp: u32) -> GeneralCategory {
        GeneralCategory::from_u8((self.word(cp) & CATEGORY_MASK) as u8)
    }

    pub fn bidi_class(&self, cp: u32) -> BidiClass {
        BidiClass::from_u8(((self.word(cp) & BIDI_MASK) >> BIDI_SHIFT) as u8)
    }

    pub fn is_mirrored(&self, cp: u32) -> bool {
        self.word(cp) & MIRROR_BIT != 0
    }

    pub fn has_exception(&self, cp: u32) -> bool {
        self.word(cp) & EXCEPTION_BIT != 0
    }

    pub fn is_lower(&self, cp: u32) -> bool {
        self.general_category(cp) == GeneralCategory::Ll
    }

    pub fn is_upper(&self, cp: u32) -> bool {
        self.general_category(cp) == GeneralCategory::Lu
    }

    pub fn is_title(&self, cp: u32) -> bool {
        self.general_category(cp) == GeneralCategory::Lt
    }

    pub fn is_alpha(&self, cp: u32) -> bool {
        self.general_category(cp).is_letter()
    }

    pub fn is_alnum(&self, cp: u32) -> bool {
        self.is_alpha(cp) || self.general_category(cp) == GeneralCategory::Nd
    }

    pub fn is_cntrl(&self, cp: u32) -> bool {
        self.general_category(cp) == GeneralCategory::Cc
    }

    pub fn is_space(&self, cp: u32) -> bool {
        self.general_category(cp).is_separator() || matches!(cp, 0x9..=0xD | 0x1C..=0x1F)
    }

    pub fn is_printable(&self, cp: u32) -> bool {
        let cat = self.general_category(cp);
        !matches!(
            cat,
            GeneralCategory::Cc | GeneralCategory::Cf | GeneralCategory::Co | GeneralCategory::Cs | GeneralCategory::Cn
        )
    }

    /// Mirror mapping (§4.3): `cp` itself when not mirrored, else `cp` plus
    /// the signed delta when there is no exception, else the exception's
    /// mirror slot.
    pub fn mirror(&self, cp: u32) -> u32 {
        if !self.is_mirrored(cp) {
            return cp;
        }
        let word = self.word(cp);
        if word & EXCEPTION_BIT == 0 {
            (cp as i64 + signed_value(word) as i64) as u32
        } else {
            self.exceptions
                .slot(exception_index(word), ExceptionSlot::Mirror)
                .unwrap_or(cp)
        }
    }

    /// Decimal digit value from the Nd record when present.
    fn decimal_digit_value(&self, cp: u32) -> Option<u32> {
        if self.general_category(cp) != GeneralCategory::Nd {
            return None;
        }
        let word = self.word(cp);
        if word & EXCEPTION_BIT == 0 {
            Some(signed_value(word) as u32)
        } else {
            self.exceptions
                .slot(exception_index(word), ExceptionSlot::Digit)
        }
    }

    const HAN_NUMERALS: [(u32, u32); 10] = [
        (0x3007, 0),
        (0x4E00, 1),
        (0x4E8C, 2),
        (0x4E09, 3),
        (0x56D8, 4),
        (0x4E94, 5),
        (0x516D, 6),
        (0x4E03, 7),
        (0x516B, 8),
        (0x4E5D, 9),
    ];

    /// `digit_value(cp, radix)` (§4.3): decimal digit, then Han numerals,
    /// then ASCII `a..z`/`A..Z` as `10..35`.
    pub fn digit_value(&self, cp: u32, radix: u32) -> Option<u32> {
        if !(2..=36).contains(&radix) {
            return None;
        }
        let v = self
            .decimal_digit_value(cp)
            .or_else(|| Self::HAN_NUMERALS.iter().find(|&&(c, _)| c == cp).map(|&(_, v)| v))
            .or_else(|| match cp {
                0x30..=0x39 => Some(cp - 0x30),
                0x41..=0x5A => Some(cp - 0x41 + 10),
                0x61..=0x7A => Some(cp - 0x61 + 10),
                _ => None,
            })?;
        if v < radix {
            Some(v)
        } else {
            None
        }
    }

    /// `forDigit(value, radix)` (§4.3).
    pub fn for_digit(value: u32, radix: u32) -> u32 {
        if value >= radix || radix < 2 || radix > 36 {
            return 0;
        }
        if value < 10 {
            b'0' as u32 + value
        } else {
            b'a' as u32 + (value - 10)
        }
    }

    /// Combining class (§4.4): bits 20..=27 of the Mn record when there is
    /// no exception, else bits 16..=23 of the exception's flag word, else 0.
    pub fn combining_class(&self, cp: u32) -> u8 {
        let word = self.word(cp);
        if word & EXCEPTION_BIT != 0 {
            self.exceptions.combining_class(exception_index(word))
        } else if self.general_category(cp) == GeneralCategory::Mn {
            (signed_value(word) & 0xFF) as u8
        } else {
            0
        }
    }

    pub fn exception_slot(&self, cp: u32, slot: ExceptionSlot) -> Option<u32> {
        let word = self.word(cp);
        if word & EXCEPTION_BIT == 0 {
            None
        } else {
            self.exceptions.slot(exception_index(word), slot)
        }
    }

    pub fn exception_index_of(&self, cp: u32) -> Option<usize> {
        let word = self.word(cp);
        (word & EXCEPTION_BIT != 0).then(|| exception_index(word))
    }

    /// Look up a slot directly by exception-table index, for callers ([`case`])
    /// that already resolved `exception_index_of`.
    pub fn exception_slot_at(&self, index: usize, slot: ExceptionSlot) -> Option<u32> {
        self.exceptions.slot(index, slot)
    }

    /// The inline signed-delta case mapping (§4.4): Lu/Lt use `cp - lowercase`
    /// in reverse (so `cp + delta` yields the lowercase form) and Ll uses
    /// `cp - uppercase`; both directions read the same stored delta.
    pub fn simple_case_delta(&self, cp: u32) -> u32 {
        let word = self.word(cp);
        (cp as i64 - signed_value(word) as i64) as u32
    }

    pub fn additional_row(&self, cp: u32) -> Option<AdditionalRow> {
        let trie = self.additional_trie.as_ref()?;
        let idx = trie.get(cp) as usize;
        self.additional_rows.get(idx).copied()
    }

    pub fn is_binary_property(&self, cp: u32, prop: u32) -> bool {
        self.additional_row(cp).map(|r| r.binary_props & prop != 0).unwrap_or(false)
    }

    /// Enumerate maximal contiguous ranges sharing the same general
    /// category (§4.3 "enumerate-ranges").
    pub fn enumerate_category_ranges(&self, f: impl FnMut(u32, u32, GeneralCategory)) {
        let mut f = f;
        self.trie.enumerate_ranges(
            |word| (word & CATEGORY_MASK) as u32,
            |start, limit, cat| f(start, limit, GeneralCategory::from_u8(cat as u8)),
        );
    }

    /// A degraded-mode lookup using only the ASCII fallback table, for
    /// callers that want `UsingDefault` semantics explicitly rather than via
    /// a loaded (possibly tiny) store. Returns `Unassigned`/`Cn` outside
    /// `0x00..=0x9F`, per §4.3.
    pub fn degraded_general_category(cp: u32) -> (GeneralCategory, crate::error::ErrorKind) {
        DEGRADED.get_or_load(&DataSource::Bytes(&[]), |_| Ok(())).ok();
        tracing::warn!(cp, "falling back to the ASCII properties table: no data loaded");
        if cp < ASCII_FALLBACK_LEN as u32 {
            (
                GeneralCategory::from_u8((ascii_fallback_word(cp) & CATEGORY_MASK) as u8),
                crate::error::ErrorKind::UsingDefault,
            )
        } else {
            (GeneralCategory::Cn, crate::error::ErrorKind::UsingDefault)
        }
    }
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    if *pos + 4 > bytes.len() {
        return Err(Error::invalid_format("truncated properties data file"));
    }
    let v = u32::from_le_bytes(bytes[*pos..*pos + 4].try_into().unwrap());
    *pos += 4;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::TrieBuilder;

    fn store_with(words: Vec<(u32, u32)>, exceptions: Vec<u32>) -> PropertiesStore {
        let mut builder = TrieBuilder::open(GeneralCategory::Cn as u32, 0, 1 << 16, false).unwrap();
        for (cp, w) in words {
            builder.set(cp, w);
        }
        let trie = builder.build(|_| 0).unwrap();
        PropertiesStore::from_parts(trie, ExceptionsTable::new(exceptions), None, Vec::new())
    }

    #[test]
    fn decodes_category_and_bidi() {
        let word = (GeneralCategory::Lu as u32) | ((BidiClass::L as u32) << BIDI_SHIFT);
        let store = store_with(vec![(b'A' as u32, word)], vec![]);
        assert_eq!(store.general_category(b'A' as u32), GeneralCategory::Lu);
        assert_eq!(store.bidi_class(b'A' as u32), BidiClass::L);
    }

    #[test]
    fn simple_mirror_uses_signed_delta() {
        let delta: i32 = 1; // '(' -> ')' is +1
        let word = (GeneralCategory::Ps as u32) | MIRROR_BIT | (((delta as u32) & 0xFFF) << VALUE_SHIFT);
        let store = store_with(vec![(b'(' as u32, word)], vec![]);
        assert!(store.is_mirrored(b'(' as u32));
        assert_eq!(store.mirror(b'(' as u32), b')' as u32);
    }

    #[test]
    fn exception_slot_popcount_offset() {
        // flags: Lowercase (bit1) + Mirror (bit6) present, ccc=5 in bits 16..23
        let flags = (1 << 1) | (1 << 6) | (5u32 << 16);
        let exceptions = vec![flags, 0x1000, 0x2000];
        let word = (GeneralCategory::Lu as u32) | EXCEPTION_BIT | (0u32 << VALUE_SHIFT);
        let store = store_with(vec![(100, word)], exceptions);
        assert_eq!(store.combining_class(100), 5);
        assert_eq!(store.exception_slot(100, ExceptionSlot::Lowercase), Some(0x1000));
        assert_eq!(store.exception_slot(100, ExceptionSlot::Mirror), Some(0x2000));
        assert_eq!(store.exception_slot(100, ExceptionSlot::Uppercase), None);
    }

    #[test]
    fn digit_value_tries_decimal_then_han_then_ascii() {
        let word_nd = GeneralCategory::Nd as u32 | ((3u32 & 0xFFF) << VALUE_SHIFT);
        let store = store_with(vec![(b'3' as u32, word_nd)], vec![]);
        assert_eq!(store.digit_value(b'3' as u32, 10), Some(3));
        assert_eq!(store.digit_value(0x4E8C, 10), Some(2)); // Han "two"
        assert_eq!(store.digit_value(b'a' as u32, 16), Some(10));
        assert_eq!(store.digit_value(b'g' as u32, 16), None);
    }

    #[test]
    fn for_digit_round_trips_with_digit_value() {
        assert_eq!(PropertiesStore::for_digit(5, 10), b'5' as u32);
        assert_eq!(PropertiesStore::for_digit(10, 16), b'a' as u32);
        assert_eq!(PropertiesStore::for_digit(99, 10), 0);
    }

    #[test]
    fn degraded_mode_uses_ascii_fallback() {
        let (cat, kind) = PropertiesStore::degraded_general_category(b'A' as u32);
        assert_eq!(cat, GeneralCategory::Lu);
        assert_eq!(kind, crate::error::ErrorKind::UsingDefault);
        let (cat, _) = PropertiesStore::degraded_general_category(0x300);
        assert_eq!(cat, GeneralCategory::Cn);
    }
}
