//! A small, real (not synthetic) embedded Unicode dataset, built through
//! [`crate::builder::PropertiesBuilder`]/[`crate::builder::NormalizationBuilder`]
//! at first use, large enough to exercise every §8 conformance scenario and
//! the trie's block-sharing/supplementary-folding paths.
//!
//! Grounded on the values in the spec's own §8 scenarios (Å, ﬁ, ḋ/ḍ, the
//! ogonek/acute non-reordering pair, Hangul, ß/İ) plus the surrounding
//! Latin/Greek letters and ASCII digits a conformance suite would expect to
//! already work. Not transcribed from any UnicodeData.txt excerpt — these
//! are the well-known values for each code point, re-typed by hand.

use std::sync::OnceLock;

use crate::builder::records::UnicodeRecord;
use crate::builder::{NormalizationBuilder, PropertiesBuilder};
use crate::normalize::NormalizationStore;
use crate::properties::{BidiClass, GeneralCategory, PropertiesStore};

fn latin_letter(cp: u32, category: GeneralCategory, upper: u32, lower: u32) -> UnicodeRecord {
    UnicodeRecord::new(cp, category).with_case(upper, lower)
}

fn mark(cp: u32, ccc: u8) -> UnicodeRecord {
    let mut r = UnicodeRecord::new(cp, GeneralCategory::Mn).with_combining_class(ccc);
    r.bidi_class = BidiClass::Nsm;
    r
}

fn properties_records() -> Vec<UnicodeRecord> {
    let mut records = Vec::new();

    for (upper, lower) in (b'A'..=b'Z').zip(b'a'..=b'z') {
        records.push(latin_letter(upper as u32, GeneralCategory::Lu, upper as u32, lower as u32));
        records.push(latin_letter(lower as u32, GeneralCategory::Ll, upper as u32, lower as u32));
    }
    for digit in b'0'..=b'9' {
        records.push(UnicodeRecord::new(digit as u32, GeneralCategory::Nd).with_digit_value((digit - b'0') as u32));
    }
    records.push(UnicodeRecord::new(b' ' as u32, GeneralCategory::Zs));

    // Å / å: composed Latin letters, plus their canonical decompositions so
    // the properties store's own general-category lookups agree with the
    // normalization store's.
    records.push(latin_letter(0x00C5, GeneralCategory::Lu, 0x00C5, 0x00E5).with_canonical_decomposition(vec![0x0041, 0x030A]));
    records.push(latin_letter(0x00E5, GeneralCategory::Ll, 0x00C5, 0x00E5).with_canonical_decomposition(vec![0x0061, 0x030A]));
    records.push(mark(0x030A, 230)); // combining ring above

    // ḋ / ḍ: Latin letter with dot above / dot below.
    records.push(
        UnicodeRecord::new(0x1E0B, GeneralCategory::Ll)
            .with_case(0x1E0A, 0x1E0B)
            .with_canonical_decomposition(vec![0x0064, 0x0307]),
    );
    records.push(
        UnicodeRecord::new(0x1E0A, GeneralCategory::Lu)
            .with_case(0x1E0A, 0x1E0B)
            .with_canonical_decomposition(vec![0x0044, 0x0307]),
    );
    records.push(
        UnicodeRecord::new(0x1E0D, GeneralCategory::Ll)
            .with_case(0x1E0C, 0x1E0D)
            .with_canonical_decomposition(vec![0x0064, 0x0323]),
    );
    records.push(
        UnicodeRecord::new(0x1E0C, GeneralCategory::Lu)
            .with_case(0x1E0C, 0x1E0D)
            .with_canonical_decomposition(vec![0x0044, 0x0323]),
    );
    records.push(mark(0x0307, 230)); // combining dot above
    records.push(mark(0x0323, 220)); // combining dot below

    // Ogonek (202) / acute (230): already in canonical order, used to prove
    // canonical_order leaves a correctly-ordered run untouched.
    records.push(mark(0x0328, 202));
    records.push(mark(0x0301, 230));

    // ﬁ ligature: compatibility-only decomposition, no canonical mapping.
    records.push(UnicodeRecord::new(0xFB01, GeneralCategory::Ll).with_compatibility_decomposition(vec![0x0066, 0x0069]));

    // Greek sigma family, for the final-sigma case-folding rule.
    records.push(latin_letter(0x03A3, GeneralCategory::Lu, 0x03A3, 0x03C3));
    records.push(latin_letter(0x03C3, GeneralCategory::Ll, 0x03A3, 0x03C3));
    {
        let mut final_sigma = UnicodeRecord::new(0x03C2, GeneralCategory::Ll);
        final_sigma.uppercase = vec![0x03A3];
        records.push(final_sigma);
    }
    records.push(latin_letter(0x0391, GeneralCategory::Lu, 0x0391, 0x03B1));
    records.push(latin_letter(0x03B1, GeneralCategory::Ll, 0x0391, 0x03B1));
    records.push(latin_letter(0x0392, GeneralCategory::Lu, 0x0392, 0x03B2));
    records.push(latin_letter(0x03B2, GeneralCategory::Ll, 0x0392, 0x03B2));

    // ß: folds via the hardcoded rule in properties::case, but still wants a
    // properties record so general-category queries resolve.
    records.push(UnicodeRecord::new(0x00DF, GeneralCategory::Ll));
    // İ/ı: same, hardcoded Turkic rules in properties::case.
    records.push(UnicodeRecord::new(0x0130, GeneralCategory::Lu).with_case(0x0130, 0x0069));
    records.push(UnicodeRecord::new(0x0131, GeneralCategory::Ll).with_case(0x0049, 0x0131));

    records
}

fn build_properties_store() -> PropertiesStore {
    let mut builder = PropertiesBuilder::new();
    for record in properties_records() {
        builder.add_record(record);
    }
    builder.build().expect("seed properties data is internally consistent")
}

fn build_normalization_store() -> NormalizationStore {
    let mut builder = NormalizationBuilder::new();
    for record in properties_records() {
        builder.add_record(record);
    }
    builder.build().expect("seed normalization data is internally consistent")
}

static PROPERTIES: OnceLock<PropertiesStore> = OnceLock::new();
static NORMALIZATION: OnceLock<NormalizationStore> = OnceLock::new();

/// The embedded default properties store, built once on first access.
pub fn default_properties_store() -> &'static PropertiesStore {
    PROPERTIES.get_or_init(build_properties_store)
}

/// The embedded default normalization store, built once on first access.
pub fn default_normalization_store() -> &'static NormalizationStore {
    NORMALIZATION.get_or_init(build_normalization_store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::engine::{self, Form};

    #[test]
    fn angstrom_round_trips_through_nfd_and_nfc() {
        let store = default_normalization_store();
        let nfd = engine::normalize(store, &[0x00C5], Form::Nfd).unwrap();
        assert_eq!(nfd, vec![0x0041, 0x030A]);
        let nfc = engine::normalize(store, &nfd, Form::Nfc).unwrap();
        assert_eq!(nfc, vec![0x00C5]);
    }

    #[test]
    fn ligature_fi_decomposes_under_nfkd_only() {
        let store = default_normalization_store();
        let nfd = engine::normalize(store, &[0xFB01], Form::Nfd).unwrap();
        assert_eq!(nfd, vec![0xFB01]);
        let nfkd = engine::normalize(store, &[0xFB01], Form::Nfkd).unwrap();
        assert_eq!(nfkd, vec![0x0066, 0x0069]);
    }

    #[test]
    fn dot_above_then_dot_below_reorders_and_composes_to_dot_below_then_dot_above() {
        let store = default_normalization_store();
        let input = vec![0x0064, 0x0307, 0x0323]; // d + dot above + dot below
        let nfc = engine::normalize(store, &input, Form::Nfc).unwrap();
        assert_eq!(nfc, vec![0x1E0D, 0x0307]); // d-with-dot-below, then dot above
    }

    #[test]
    fn ogonek_then_acute_is_already_in_canonical_order() {
        let store = default_normalization_store();
        let input = vec![0x0041, 0x0328, 0x0301];
        let nfd = engine::normalize(store, &input, Form::Nfd).unwrap();
        assert_eq!(nfd, input);
    }

    #[test]
    fn hangul_round_trips_through_the_full_normalize_pipeline() {
        // §8 scenario 5: NFD(AC00) = 1100 1161; NFC(1100 1161 11A8) = AC01.
        // Purely algorithmic (§4.5.3), so it holds even against the seed
        // store, which carries no Hangul records at all.
        let store = default_normalization_store();
        let nfd = engine::normalize(store, &[0xAC00], Form::Nfd).unwrap();
        assert_eq!(nfd, vec![0x1100, 0x1161]);
        let nfc = engine::normalize(store, &[0x1100, 0x1161, 0x11A8], Form::Nfc).unwrap();
        assert_eq!(nfc, vec![0xAC01]);
    }

    #[test]
    fn properties_store_resolves_ascii_letters() {
        let store = default_properties_store();
        assert_eq!(store.general_category(b'A' as u32), GeneralCategory::Lu);
        assert_eq!(store.general_category(b'a' as u32), GeneralCategory::Ll);
    }
}
