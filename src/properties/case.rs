//! Case mapping and folding (§4.4): simple (single code point in, single
//! code point out) and full (string-producing) case operations, the
//! Turkish/Azeri, Lithuanian, and Greek-final-sigma special-casing rules,
//! and default case folding.
//!
//! Grounded on the teacher's `case.rs` (`to_lowercase`/`to_uppercase`/
//! `case_fold`/`is_final_sigma`, and its inlined ypogegrammeni list),
//! generalized to read from a [`PropertiesStore`] instead of `HashMap`s
//! loaded from JSON, and extended with the Turkish/Lithuanian rules the
//! teacher's comments note as deliberately skipped.

use super::{ExceptionSlot, GeneralCategory, PropertiesStore};

/// A locale family that changes default case mapping (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseLocale {
    Root,
    TurkishAzeri,
    Lithuanian,
}

/// Whether default case folding excludes the Turkic dotted/dotless `i` pair
/// (§4.4, §8 scenario 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOptions {
    Default,
    ExcludeTurkic,
}

const DOTTED_CAPITAL_I: u32 = 0x0130;
const DOTLESS_SMALL_I: u32 = 0x0131;
const COMBINING_DOT_ABOVE: u32 = 0x0307;
const CAPITAL_SIGMA: u32 = 0x03A3;
const SMALL_SIGMA: u32 = 0x03C3;
const FINAL_SIGMA: u32 = 0x03C2;

/// "Case-ignorable" (§4.4): a non-spacing mark, a soft hyphen, or a hyphen.
/// Kept in one place per the spec's note that this list may change with the
/// Unicode version.
fn is_case_ignorable(store: &PropertiesStore, cp: u32) -> bool {
    store.general_category(cp) == GeneralCategory::Mn || cp == 0x00AD || cp == 0x2010
}

fn is_cased(store: &PropertiesStore, cp: u32) -> bool {
    matches!(
        store.general_category(cp),
        GeneralCategory::Lu | GeneralCategory::Ll | GeneralCategory::Lt
    ) || store.is_binary_property(cp, super::binary_prop::CASED)
}

/// Table 3-17: `C` is preceded by a cased letter then zero-or-more
/// case-ignorable characters, and not followed by zero-or-more
/// case-ignorable characters then a cased letter.
fn is_final_sigma(store: &PropertiesStore, code_points: &[u32], sigma_pos: usize) -> bool {
    let before_cased = code_points[..sigma_pos]
        .iter()
        .rev()
        .skip_while(|&&cp| is_case_ignorable(store, cp))
        .next()
        .map(|&cp| is_cased(store, cp))
        .unwrap_or(false);
    if !before_cased {
        return false;
    }
    let after_cased = code_points[sigma_pos + 1..]
        .iter()
        .skip_while(|&&cp| is_case_ignorable(store, cp))
        .next()
        .map(|&cp| is_cased(store, cp))
        .unwrap_or(false);
    !after_cased
}

fn simple_lower(store: &PropertiesStore, cp: u32) -> u32 {
    match store.exception_index_of(cp) {
        Some(idx) => store
            .exception_slot_at(idx, ExceptionSlot::Lowercase)
            .unwrap_or(cp),
        None if store.general_category(cp) == GeneralCategory::Lu || store.general_category(cp) == GeneralCategory::Lt => {
            store.simple_case_delta(cp)
        }
        None => cp,
    }
}

fn simple_upper(store: &PropertiesStore, cp: u32) -> u32 {
    match store.exception_index_of(cp) {
        Some(idx) => store
            .exception_slot_at(idx, ExceptionSlot::Uppercase)
            .unwrap_or(cp),
        None if store.general_category(cp) == GeneralCategory::Ll => store.simple_case_delta(cp),
        None => cp,
    }
}

/// Full lowercase mapping (§4.4), may expand (`İ` → `i` + combining dot
/// above) and applies the locale-sensitive rules.
pub fn to_lowercase(store: &PropertiesStore, code_points: &[u32], locale: CaseLocale) -> Vec<u32> {
    let len = code_points.len();
    let mut out = Vec::with_capacity(len);
    for pos in 0..len {
        let cp = code_points[pos];
        match (locale, cp) {
            (CaseLocale::TurkishAzeri, 0x0049) => {
                // I -> dotless i, unless followed by combining dot above (handled below)
                if code_points.get(pos + 1) == Some(&COMBINING_DOT_ABOVE) {
                    out.push(b'i' as u32);
                } else {
                    out.push(DOTLESS_SMALL_I);
                }
            }
            (CaseLocale::TurkishAzeri, cp) if cp == COMBINING_DOT_ABOVE && pos > 0 && code_points[pos - 1] == 0x0049 => {
                // deleted: already consumed by the I -> i branch above
            }
            (_, DOTTED_CAPITAL_I) => out.extend([b'i' as u32, COMBINING_DOT_ABOVE]),
            (_, CAPITAL_SIGMA) => out.push(if is_final_sigma(store, code_points, pos) {
                FINAL_SIGMA
            } else {
                SMALL_SIGMA
            }),
            _ => out.push(simple_lower(store, cp)),
        }
    }
    out
}

/// Full uppercase mapping (§4.4).
pub fn to_uppercase(store: &PropertiesStore, code_points: &[u32], locale: CaseLocale) -> Vec<u32> {
    let mut out = Vec::with_capacity(code_points.len());
    for (pos, &cp) in code_points.iter().enumerate() {
        match (locale, cp) {
            (CaseLocale::TurkishAzeri, 0x0069) => out.push(DOTTED_CAPITAL_I),
            (CaseLocale::Lithuanian, 0x0069) if starts_accent_above(code_points, pos + 1) => {
                out.extend([b'I' as u32, COMBINING_DOT_ABOVE]);
            }
            _ => match store.exception_index_of(cp) {
                Some(idx) => {
                    if let Some(mapped) = store.exception_slot_at(idx, ExceptionSlot::Uppercase) {
                        out.push(mapped);
                    } else {
                        out.push(cp);
                    }
                }
                None => out.push(simple_upper(store, cp)),
            },
        }
    }
    out
}

fn starts_accent_above(code_points: &[u32], pos: usize) -> bool {
    matches!(code_points.get(pos), Some(&cp) if (0x0300..=0x0314).contains(&cp))
}

/// Default case folding (§4.4): dotted/dotless `i` both fold to `i` unless
/// `ExcludeTurkic` is set, in which case they fold to themselves.
pub fn case_fold(store: &PropertiesStore, code_points: &[u32], options: FoldOptions) -> Vec<u32> {
    let mut out = Vec::with_capacity(code_points.len());
    for &cp in code_points {
        match (cp, options) {
            (DOTTED_CAPITAL_I, FoldOptions::Default) => out.extend([b'i' as u32, COMBINING_DOT_ABOVE]),
            (DOTTED_CAPITAL_I, FoldOptions::ExcludeTurkic) => out.push(DOTTED_CAPITAL_I),
            (DOTLESS_SMALL_I, FoldOptions::ExcludeTurkic) => out.push(DOTLESS_SMALL_I),
            (DOTLESS_SMALL_I, FoldOptions::Default) => out.push(b'i' as u32),
            (0x00DF, _) => out.extend([b's' as u32, b's' as u32]), // ß -> ss
            _ => match store.exception_index_of(cp) {
                Some(idx) => match store.exception_slot_at(idx, ExceptionSlot::CaseFolding) {
                    Some(folded) => out.push(folded),
                    None => out.push(simple_lower(store, cp)),
                },
                None => out.push(simple_lower(store, cp)),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{ExceptionsTable, PropertiesStore};
    use crate::trie::TrieBuilder;

    fn seed_store() -> PropertiesStore {
        let mut builder = TrieBuilder::open(GeneralCategory::Cn as u32, 0, 1 << 16, false).unwrap();
        // uppercase A..Z with delta +32 to lowercase
        for cp in b'A' as u32..=b'Z' as u32 {
            // Lu delta = cp - lowercase = -32
            let word = GeneralCategory::Lu as u32 | (((-32i32 as u32) & 0xFFF) << 20);
            builder.set(cp, word);
        }
        for cp in b'a' as u32..=b'z' as u32 {
            // Ll delta = cp - uppercase = +32
            let word = GeneralCategory::Ll as u32 | ((32u32 & 0xFFF) << 20);
            builder.set(cp, word);
        }
        // Sigma as a Greek letter w/ exceptions for upper/lower handled inline by to_lowercase
        let sigma_word = GeneralCategory::Lu as u32;
        builder.set(CAPITAL_SIGMA, sigma_word);
        builder.set(SMALL_SIGMA, GeneralCategory::Ll as u32);
        builder.set(FINAL_SIGMA, GeneralCategory::Ll as u32);
        // cased letters for is_final_sigma: alpha/beta
        builder.set(0x0391, GeneralCategory::Lu as u32);
        builder.set(0x03B1, GeneralCategory::Ll as u32);
        builder.set(0x0392, GeneralCategory::Lu as u32);
        builder.set(0x03B2, GeneralCategory::Ll as u32);
        let trie = builder.build(|_| 0).unwrap();
        PropertiesStore::from_parts(trie, ExceptionsTable::new(vec![]), None, Vec::new())
    }

    #[test]
    fn simple_case_round_trips() {
        let store = seed_store();
        assert_eq!(to_lowercase(&store, &[b'A' as u32], CaseLocale::Root), vec![b'a' as u32]);
        assert_eq!(to_uppercase(&store, &[b'a' as u32], CaseLocale::Root), vec![b'A' as u32]);
    }

    #[test]
    fn final_sigma_depends_on_following_letter() {
        let store = seed_store();
        // ALPHA SIGMA -> alpha + non-final sigma (followed by nothing cased... actually sigma is last)
        assert_eq!(
            to_lowercase(&store, &[0x0391, CAPITAL_SIGMA], CaseLocale::Root),
            vec![0x03B1, FINAL_SIGMA]
        );
        assert_eq!(
            to_lowercase(&store, &[0x0391, CAPITAL_SIGMA, 0x0392], CaseLocale::Root),
            vec![0x03B1, SMALL_SIGMA, 0x03B2]
        );
    }

    #[test]
    fn dotted_capital_i_expands_on_lowercase() {
        let store = seed_store();
        assert_eq!(
            to_lowercase(&store, &[DOTTED_CAPITAL_I], CaseLocale::Root),
            vec![b'i' as u32, COMBINING_DOT_ABOVE]
        );
    }

    #[test]
    fn default_fold_merges_dotted_and_dotless_i() {
        let store = seed_store();
        assert_eq!(
            case_fold(&store, &[DOTTED_CAPITAL_I], FoldOptions::Default),
            vec![b'i' as u32, COMBINING_DOT_ABOVE]
        );
        assert_eq!(
            case_fold(&store, &[DOTTED_CAPITAL_I], FoldOptions::ExcludeTurkic),
            vec![DOTTED_CAPITAL_I]
        );
        assert_eq!(case_fold(&store, &[0x00DF], FoldOptions::Default), vec![b's' as u32, b's' as u32]);
    }
}
