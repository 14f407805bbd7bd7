//! The offline builders (§4.6): given UnicodeData-equivalent input records,
//! derive the runtime [`crate::normalize::NormalizationStore`] and
//! [`crate::properties::PropertiesStore`] images. Neither builder runs at
//! library-use time (§2): they are separate, single-threaded, offline tools
//! that own all the memory they allocate (§5).
//!
//! Grounded on `gennorm/store.c` end to end: `haveSeenFlags`/the closure
//! loop → [`close_decompositions`], `combiningCPs`/`combiningIndexes` →
//! [`assign_combining_indexes`], the triple sort and per-lead composition
//! table emission → [`NormalizationBuilder::build`], and `canonStartSets`'s
//! derivation → the canonical-starter-set loop in the same function.

pub mod records;

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::normalize::{
    encode_norm_word, encode_tag, write_composition_span, write_extra_entry, Decomposition, ExtraEntry,
    NormalizationStore, QuickCheck, SpecialTag,
};
use crate::properties::{AdditionalRow, ExceptionSlot, ExceptionsTable, GeneralCategory, PropertiesStore};
use crate::trie::TrieBuilder;
use records::{CompositionExclusions, DecompositionType, UnicodeRecord};

const HANGUL_S_BASE: u32 = 0xAC00;
const HANGUL_S_COUNT: u32 = 11172;

fn is_hangul(cp: u32) -> bool {
    (HANGUL_S_BASE..HANGUL_S_BASE + HANGUL_S_COUNT).contains(&cp)
}

/// Accumulates input records and produces a [`NormalizationStore`] (§4.6).
pub struct NormalizationBuilder {
    records: HashMap<u32, UnicodeRecord>,
    exclusions: CompositionExclusions,
    fc_nfkc_closure: HashMap<u32, Vec<u32>>,
}

impl NormalizationBuilder {
    pub fn new() -> Self {
        NormalizationBuilder {
            records: HashMap::new(),
            exclusions: HashSet::new(),
            fc_nfkc_closure: HashMap::new(),
        }
    }

    pub fn add_record(&mut self, record: UnicodeRecord) -> &mut Self {
        self.records.insert(record.code_point, record);
        self
    }

    pub fn set_composition_exclusions(&mut self, exclusions: CompositionExclusions) -> &mut Self {
        self.exclusions = exclusions;
        self
    }

    pub fn set_fc_nfkc_closure(&mut self, cp: u32, closure: Vec<u32>) -> &mut Self {
        self.fc_nfkc_closure.insert(cp, closure);
        self
    }

    /// Step 2: decompose every element recursively until fixed point,
    /// following canonical mappings only (`use_compat = false`) or both
    /// canonical and compatibility mappings (`use_compat = true`). Detects
    /// cycles via an explicit "currently expanding" set rather than the
    /// source's have-seen bit array, since this builder isn't bounded to a
    /// fixed code-point table size.
    fn close_decompositions(&self, use_compat: bool) -> Result<HashMap<u32, Vec<u32>>> {
        let mut memo: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut visiting: HashSet<u32> = HashSet::new();

        fn expand(
            cp: u32,
            records: &HashMap<u32, UnicodeRecord>,
            use_compat: bool,
            memo: &mut HashMap<u32, Vec<u32>>,
            visiting: &mut HashSet<u32>,
        ) -> Result<Vec<u32>> {
            if let Some(cached) = memo.get(&cp) {
                return Ok(cached.clone());
            }
            if is_hangul(cp) {
                let out = crate::normalize::engine::decompose_hangul(cp);
                memo.insert(cp, out.clone());
                return Ok(out);
            }
            let raw = match records.get(&cp).and_then(|r| r.decomposition.as_ref()) {
                Some((ty, d)) if use_compat || *ty == DecompositionType::Canonical => d.clone(),
                _ => {
                    memo.insert(cp, vec![cp]);
                    return Ok(vec![cp]);
                }
            };
            if !visiting.insert(cp) {
                return Err(Error::invalid_format("cyclic decomposition detected"));
            }
            let mut out = Vec::new();
            for sub in raw {
                out.extend(expand(sub, records, use_compat, memo, visiting)?);
            }
            visiting.remove(&cp);
            memo.insert(cp, out.clone());
            Ok(out)
        }

        let mut result = HashMap::new();
        for &cp in self.records.keys() {
            let has_applicable = self.records[&cp]
                .decomposition
                .as_ref()
                .map(|(ty, _)| use_compat || *ty == DecompositionType::Canonical)
                .unwrap_or(false);
            if has_applicable {
                let closed = expand(cp, &self.records, use_compat, &mut memo, &mut visiting)?;
                result.insert(cp, closed);
            }
        }
        Ok(result)
    }

    /// Steps 3-5: derive `(lead, trail, composed)` triples from the *raw*
    /// (not transitively closed) length-2 canonical decompositions, assign
    /// combining indexes (forward-only, then both, then backward-only), and
    /// lay out the composition table.
    fn build_composition(
        &self,
        forward: &mut HashSet<u32>,
        backward: &mut HashSet<u32>,
    ) -> Result<(HashMap<u32, u16>, Vec<u16>, HashMap<u16, u32>)> {
        let mut triples: Vec<(u32, u32, u32)> = Vec::new();
        for record in self.records.values() {
            if let Some((DecompositionType::Canonical, decomp)) = &record.decomposition {
                if decomp.len() == 2 && !self.exclusions.contains(&record.code_point) {
                    triples.push((decomp[0], decomp[1], record.code_point));
                }
            }
        }
        for &(lead, trail, _) in &triples {
            forward.insert(lead);
            backward.insert(trail);
        }

        let both: HashSet<u32> = forward.intersection(backward).copied().collect();
        let fwd_only: Vec<u32> = {
            let mut v: Vec<u32> = forward.difference(&both).copied().collect();
            v.sort_unstable();
            v
        };
        let mut both_sorted: Vec<u32> = both.iter().copied().collect();
        both_sorted.sort_unstable();
        let back_only: Vec<u32> = {
            let mut v: Vec<u32> = backward.difference(&both).copied().collect();
            v.sort_unstable();
            v
        };

        let mut indexes: HashMap<u32, u16> = HashMap::new();
        let mut next_index: u16 = 1; // 0 means "no combining index"
        for cp in fwd_only.iter().chain(both_sorted.iter()).chain(back_only.iter()) {
            indexes.insert(*cp, next_index);
            next_index += 1;
        }

        let mut by_lead: HashMap<u32, Vec<(u16, u32)>> = HashMap::new();
        for &(lead, trail, composed) in &triples {
            let trail_index = indexes[&trail];
            by_lead.entry(lead).or_default().push((trail_index, composed));
        }

        let mut composition = vec![0u16]; // reserve offset 0 as "no span"
        // Keyed by the lead's own combining-index id (not its code point), to
        // match what `NormalizationStore::compose` looks up at runtime.
        let mut lead_offsets: HashMap<u16, u32> = HashMap::new();
        let mut leads: Vec<u32> = by_lead.keys().copied().collect();
        leads.sort_unstable();
        for lead in leads {
            let mut pairs = by_lead.remove(&lead).unwrap();
            pairs.sort_by_key(|&(trail_index, _)| trail_index);
            let offset = write_composition_span(&mut composition, &pairs);
            lead_offsets.insert(indexes[&lead], offset);
        }

        Ok((indexes, composition, lead_offsets))
    }

    /// Step 7: for every `c` whose canonical decomposition begins with
    /// starter `s`, add `c` to `s`'s set; mark every non-leading code point
    /// in any canonical decomposition as an unsafe starter.
    fn canonical_starters(&self, canonical: &HashMap<u32, Vec<u32>>) -> (HashMap<u32, Vec<u32>>, HashSet<u32>) {
        let mut sets: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut unsafe_starters: HashSet<u32> = HashSet::new();
        for (&c, decomp) in canonical {
            if let Some(&starter) = decomp.first() {
                sets.entry(starter).or_default().push(c);
            }
            for &trailing in decomp.iter().skip(1) {
                unsafe_starters.insert(trailing);
            }
        }
        for set in sets.values_mut() {
            set.sort_unstable();
        }
        (sets, unsafe_starters)
    }

    /// Step 6: the §3.4 invariant that a starter's canonical decomposition
    /// always begins with a starter (never with a combining mark), plus the
    /// §4.6 validation error "a combining code point with a non-zero
    /// UnicodeData combining class marked as combining-forward".
    fn validate(&self, canonical: &HashMap<u32, Vec<u32>>, forward: &HashSet<u32>) -> Result<()> {
        for (&cp, decomp) in canonical {
            let Some(&first) = decomp.first() else { continue };
            let record = match self.records.get(&cp) {
                Some(r) => r,
                None => continue,
            };
            let is_starter = record.combining_class == 0;
            if !is_starter {
                continue;
            }
            let first_is_starter = is_hangul(first) || self.records.get(&first).map(|r| r.combining_class == 0).unwrap_or(true);
            if !first_is_starter {
                return Err(Error::invalid_format("starter's canonical decomposition must begin with a starter"));
            }
        }
        for &cp in forward {
            if self.exclusions.contains(&cp) {
                continue;
            }
            if let Some(record) = self.records.get(&cp) {
                if record.combining_class != 0 {
                    return Err(Error::invalid_format(
                        "a combining mark (non-zero combining class) cannot be marked combines-forward",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Step 8: build the normalization trie, extra array, FCD trie, and
    /// auxiliary trie, producing a [`NormalizationStore`].
    pub fn build(&self) -> Result<NormalizationStore> {
        let canonical_closed = self.close_decompositions(false)?;
        let compat_closed = self.close_decompositions(true)?;

        let mut forward: HashSet<u32> = HashSet::new();
        let mut backward: HashSet<u32> = HashSet::new();
        let (combining_indexes, composition, lead_offsets) = self.build_composition(&mut forward, &mut backward)?;
        self.validate(&canonical_closed, &forward)?;

        let (starter_sets, unsafe_starters) = self.canonical_starters(&canonical_closed);

        let mut norm_builder = TrieBuilder::open(0, 0, 1 << 20, false)?;
        let mut fcd_builder = TrieBuilder::open(0, 0, 1 << 18, false)?;
        let mut aux_builder = TrieBuilder::open(0, 0, 1 << 18, false)?;
        let mut extra: Vec<u16> = vec![0]; // offset 0 reserved for "none"

        let mut fc_nfkc_table: Vec<(u32, u8)> = Vec::new();
        let mut fc_nfkc_data: Vec<u32> = Vec::new();

        let all_cps: HashSet<u32> = self
            .records
            .keys()
            .copied()
            .chain(combining_indexes.keys().copied())
            .chain(canonical_closed.keys().copied())
            .chain(compat_closed.keys().copied())
            .collect();

        for &cp in &all_cps {
            if is_hangul(cp) {
                let word = encode_norm_word(
                    QuickCheck::No,
                    QuickCheck::No,
                    true,
                    true,
                    false,
                    false,
                    0,
                    encode_tag(SpecialTag::HangulSyllable),
                );
                norm_builder.set(cp, word);
                continue;
            }

            let record = self.records.get(&cp);
            let ccc = record.map(|r| r.combining_class).unwrap_or(0);
            let canon = canonical_closed.get(&cp);
            let compat = compat_closed.get(&cp);
            let is_compat_record = matches!(
                record.and_then(|r| r.decomposition.as_ref()),
                Some((DecompositionType::Compatibility, _))
            );

            let has_canon_decomp = canon.map(|d| d.len() != 1 || d[0] != cp).unwrap_or(false);
            let nfd_no = has_canon_decomp;
            let nfkd_no = has_canon_decomp
                || (is_compat_record && compat.map(|d| d.len() != 1 || d[0] != cp).unwrap_or(false));

            let combines_forward = forward.contains(&cp) && !self.exclusions.contains(&cp);
            let combines_backward = backward.contains(&cp);
            let combining_index = combining_indexes.get(&cp).copied().unwrap_or(0);

            let needs_extra = has_canon_decomp || (is_compat_record && nfkd_no) || combining_index != 0;
            let tag_or_offset = if needs_extra {
                let canon_entry = if has_canon_decomp {
                    let d = canon.unwrap().clone();
                    let leading = self.records.get(&d[0]).map(|r| r.combining_class).unwrap_or(0);
                    let trailing = self.records.get(d.last().unwrap()).map(|r| r.combining_class).unwrap_or(0);
                    Some(Decomposition {
                        code_points: d,
                        leading_cc: leading,
                        trailing_cc: trailing,
                    })
                } else {
                    None
                };
                let compat_entry = if is_compat_record && nfkd_no {
                    let d = compat.cloned().unwrap_or_else(|| vec![cp]);
                    let leading = self.records.get(&d[0]).map(|r| r.combining_class).unwrap_or(0);
                    let trailing = self.records.get(d.last().unwrap()).map(|r| r.combining_class).unwrap_or(0);
                    Some(Decomposition {
                        code_points: d,
                        leading_cc: leading,
                        trailing_cc: trailing,
                    })
                } else {
                    None
                };
                let entry = ExtraEntry {
                    combining_index,
                    canonical: canon_entry,
                    compatibility: compat_entry,
                };
                write_extra_entry(&mut extra, &entry)
            } else {
                0
            };

            // §3.4: a composition exclusion never combines forward even if it
            // has a length-2 canonical decomposition.
            let nfc_qc = if nfd_no && combines_backward {
                QuickCheck::Maybe
            } else if nfd_no {
                QuickCheck::No
            } else {
                QuickCheck::Yes
            };
            let nfkc_qc = if nfkd_no && combines_backward {
                QuickCheck::Maybe
            } else if nfkd_no {
                QuickCheck::No
            } else {
                QuickCheck::Yes
            };

            let word = encode_norm_word(
                nfc_qc,
                nfkc_qc,
                nfd_no,
                nfkd_no,
                combines_forward,
                combines_backward,
                ccc,
                tag_or_offset,
            );
            norm_builder.set(cp, word);

            let leading = canon
                .map(|d| self.records.get(&d[0]).map(|r| r.combining_class).unwrap_or(0))
                .unwrap_or(ccc);
            let trailing = canon
                .map(|d| self.records.get(d.last().unwrap()).map(|r| r.combining_class).unwrap_or(0))
                .unwrap_or(ccc);
            fcd_builder.set(cp, ((leading as u32) << 8) | trailing as u32);

            let unsafe_bit = unsafe_starters.contains(&cp) as u32;
            let fc_id = if let Some(closure) = self.fc_nfkc_closure.get(&cp) {
                let offset = fc_nfkc_data.len() as u32;
                fc_nfkc_data.extend_from_slice(closure);
                let id = fc_nfkc_table.len() as u32;
                fc_nfkc_table.push((offset, closure.len() as u8));
                id
            } else {
                0
            };
            aux_builder.set(cp, unsafe_bit | (fc_id << 1));
        }

        let norm_trie = norm_builder.build(|_| 0)?;
        let fcd_trie = fcd_builder.build(|_| 0)?;
        let aux_trie = aux_builder.build(|_| 0)?;

        Ok(NormalizationStore::from_parts(
            norm_trie,
            extra,
            composition,
            fcd_trie,
            aux_trie,
            fc_nfkc_table,
            fc_nfkc_data,
            starter_sets,
            lead_offsets,
        ))
    }
}

/// Accumulates input records and produces a [`PropertiesStore`] (§4.3).
pub struct PropertiesBuilder {
    records: Vec<UnicodeRecord>,
}

impl PropertiesBuilder {
    pub fn new() -> Self {
        PropertiesBuilder { records: Vec::new() }
    }

    pub fn add_record(&mut self, record: UnicodeRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn build(&self) -> Result<PropertiesStore> {
        let mut builder = TrieBuilder::open(GeneralCategory::Cn as u32, 0, 1 << 20, true)?;
        let mut exceptions: Vec<u32> = Vec::new();

        for record in &self.records {
            let needs_exception = !record.uppercase.is_empty() && record.uppercase.len() > 1
                || !record.lowercase.is_empty() && record.lowercase.len() > 1
                || !record.titlecase.is_empty()
                || record.numeric_value.is_some()
                || !record.case_folding.is_empty() && record.case_folding.len() > 1;

            let word = if needs_exception {
                let index = exceptions.len();
                let mut flags = 0u32;
                let mut slots: Vec<u32> = Vec::new();
                let mut add_slot = |bit: ExceptionSlot, value: Option<u32>, flags: &mut u32, slots: &mut Vec<u32>| {
                    if let Some(v) = value {
                        *flags |= 1 << (bit as u32);
                        slots.push(v);
                    }
                };
                add_slot(ExceptionSlot::Uppercase, record.uppercase.first().copied(), &mut flags, &mut slots);
                add_slot(ExceptionSlot::Lowercase, record.lowercase.first().copied(), &mut flags, &mut slots);
                add_slot(ExceptionSlot::Titlecase, record.titlecase.first().copied(), &mut flags, &mut slots);
                add_slot(ExceptionSlot::Digit, record.digit_value, &mut flags, &mut slots);
                add_slot(
                    ExceptionSlot::Numeric,
                    record.numeric_value.map(|(n, _)| n as u32),
                    &mut flags,
                    &mut slots,
                );
                add_slot(
                    ExceptionSlot::CaseFolding,
                    record.case_folding.first().copied(),
                    &mut flags,
                    &mut slots,
                );
                flags |= (record.combining_class as u32) << 16;
                exceptions.push(flags);
                exceptions.extend(slots);
                (record.category as u32) | (1 << 5) | ((index as u32) << 20)
            } else {
                let value: i32 = match record.category {
                    GeneralCategory::Lu | GeneralCategory::Lt => {
                        record.lowercase.first().map(|&lc| record.code_point as i32 - lc as i32).unwrap_or(0)
                    }
                    GeneralCategory::Ll => {
                        record.uppercase.first().map(|&uc| record.code_point as i32 - uc as i32).unwrap_or(0)
                    }
                    GeneralCategory::Nd => record.digit_value.map(|v| v as i32).unwrap_or(0),
                    GeneralCategory::Mn => record.combining_class as i32,
                    _ => 0,
                };
                (record.category as u32) | (((value as u32) & 0xFFF) << 20)
            };
            let word = word | ((record.bidi_class as u32) << 6) | if record.mirrored { 1 << 11 } else { 0 };
            builder.set(record.code_point, word);
        }

        let trie = builder.build(|_| 0)?;
        Ok(PropertiesStore::from_parts(trie, ExceptionsTable::new(exceptions), None, Vec::<AdditionalRow>::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::BidiClass;

    fn rec(cp: u32, cat: GeneralCategory) -> UnicodeRecord {
        UnicodeRecord::new(cp, cat)
    }

    #[test]
    fn closes_a_three_level_decomposition_chain() {
        let mut b = NormalizationBuilder::new();
        // C decomposes to B, B decomposes to A A (contrived, just to exercise closure)
        b.add_record(rec(0x43, GeneralCategory::Lu).with_canonical_decomposition(vec![0x42]));
        b.add_record(rec(0x42, GeneralCategory::Lu).with_canonical_decomposition(vec![0x41, 0x41]));
        b.add_record(rec(0x41, GeneralCategory::Lu));
        let closed = b.close_decompositions(false).unwrap();
        assert_eq!(closed[&0x43], vec![0x41, 0x41]);
    }

    #[test]
    fn detects_cyclic_decomposition() {
        let mut b = NormalizationBuilder::new();
        b.add_record(rec(0x43, GeneralCategory::Lu).with_canonical_decomposition(vec![0x44]));
        b.add_record(rec(0x44, GeneralCategory::Lu).with_canonical_decomposition(vec![0x43]));
        assert!(b.close_decompositions(false).is_err());
    }

    #[test]
    fn rejects_a_combining_mark_marked_as_combines_forward() {
        // §4.6 validation errors: the lead of a 2-length canonical
        // decomposition must be a starter (ccc == 0), never a combining mark
        // itself. U+0344 (ccc 230) decomposing to [0x0308, 0x0301] is a real
        // case of exactly this shape.
        let mut b = NormalizationBuilder::new();
        b.add_record(rec(0x0344, GeneralCategory::Mn).with_combining_class(230).with_canonical_decomposition(vec![0x0308, 0x0301]));
        b.add_record(rec(0x0308, GeneralCategory::Mn).with_combining_class(230));
        b.add_record(rec(0x0301, GeneralCategory::Mn).with_combining_class(230));
        assert!(b.build().is_err());
    }

    #[test]
    fn builds_a_store_that_decomposes_and_recomposes_angstrom() {
        let mut b = NormalizationBuilder::new();
        b.add_record(rec(0x00C5, GeneralCategory::Lu).with_canonical_decomposition(vec![0x0041, 0x030A]));
        b.add_record(rec(0x0041, GeneralCategory::Lu));
        b.add_record(rec(0x030A, GeneralCategory::Mn).with_combining_class(0));
        let store = b.build().unwrap();
        let rec_a = store.record(0x0041);
        assert!(rec_a.combines_forward);
        let rec_ring = store.record(0x030A);
        assert!(rec_ring.combines_backward);
        let rec_c5 = store.record(0x00C5);
        assert!(rec_c5.nfd_no);
    }

    #[test]
    fn properties_builder_computes_simple_case_delta() {
        let mut b = PropertiesBuilder::new();
        b.add_record(rec(0x41, GeneralCategory::Lu).with_case(0x41, 0x61));
        let store = b.build().unwrap();
        assert_eq!(store.general_category(0x41), GeneralCategory::Lu);
        assert_eq!(store.simple_case_delta(0x41), 0x61);
    }

    #[test]
    fn properties_builder_uses_exception_for_multi_codepoint_case() {
        let mut b = PropertiesBuilder::new();
        let mut r = rec(0x00DF, GeneralCategory::Ll);
        r.case_folding = vec![0x73, 0x73]; // ß folds to "ss" conceptually flagged via exception path
        b.add_record(r);
        let store = b.build().unwrap();
        assert!(store.has_exception(0x00DF));
    }
}
