//! Input record shapes for the offline builders (§4.6): one record per code
//! point, in the shape an UnicodeData-style source line would parse into.
//! Grounded on the field list `gennorm/store.c`'s `addRecord`-equivalent
//! ingestion expects, re-expressed as a plain Rust struct instead of a
//! fixed-width C line parser.

use crate::properties::{BidiClass, GeneralCategory};

/// Canonical vs. compatibility decomposition (§4.6 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionType {
    Canonical,
    Compatibility,
}

/// One code point's worth of UnicodeData-equivalent input (§4.6).
#[derive(Debug, Clone)]
pub struct UnicodeRecord {
    pub code_point: u32,
    pub category: GeneralCategory,
    pub combining_class: u8,
    pub bidi_class: BidiClass,
    pub mirrored: bool,
    pub decomposition: Option<(DecompositionType, Vec<u32>)>,
    pub digit_value: Option<u32>,
    pub numeric_value: Option<(i64, i64)>,
    pub uppercase: Vec<u32>,
    pub lowercase: Vec<u32>,
    pub titlecase: Vec<u32>,
    pub case_folding: Vec<u32>,
}

impl UnicodeRecord {
    pub fn new(code_point: u32, category: GeneralCategory) -> Self {
        UnicodeRecord {
            code_point,
            category,
            combining_class: 0,
            bidi_class: BidiClass::On,
            mirrored: false,
            decomposition: None,
            digit_value: None,
            numeric_value: None,
            uppercase: Vec::new(),
            lowercase: Vec::new(),
            titlecase: Vec::new(),
            case_folding: Vec::new(),
        }
    }

    pub fn with_combining_class(mut self, ccc: u8) -> Self {
        self.combining_class = ccc;
        self
    }

    pub fn with_canonical_decomposition(mut self, decomp: Vec<u32>) -> Self {
        self.decomposition = Some((DecompositionType::Canonical, decomp));
        self
    }

    pub fn with_compatibility_decomposition(mut self, decomp: Vec<u32>) -> Self {
        self.decomposition = Some((DecompositionType::Compatibility, decomp));
        self
    }

    pub fn with_case(mut self, upper: u32, lower: u32) -> Self {
        self.uppercase = vec![upper];
        self.lowercase = vec![lower];
        self
    }

    pub fn with_digit_value(mut self, v: u32) -> Self {
        self.digit_value = Some(v);
        self
    }
}

/// An explicit composition-exclusion entry (§4.6 step 3: "not a composition
/// exclusion").
pub type CompositionExclusions = std::collections::HashSet<u32>;
