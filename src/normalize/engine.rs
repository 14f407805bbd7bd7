//! The normalizer (§4.5): quick check, the FCD fast path, canonical and
//! compatibility decomposition (with Hangul handled algorithmically),
//! canonical ordering, canonical composition, and the streaming
//! safe-boundary contract.
//!
//! Grounded on the teacher's `normalise.rs` (`to_nfd`/`to_nfc`/`quick_check`)
//! for the overall reorder/compose control flow, generalized here to all
//! four forms and to a trie-backed [`NormalizationStore`] instead of
//! `HashMap`s, plus the Hangul constants from the icu4x-derived
//! `other_examples` excerpt and the formulas in §4.5.3.

use super::{NormalizationStore, QuickCheck, SpecialTag};
use crate::error::{Error, Result};

/// One of the four normalization forms (§1, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
}

impl Form {
    fn is_compatibility(self) -> bool {
        matches!(self, Form::Nfkc | Form::Nfkd)
    }

    fn is_composed(self) -> bool {
        matches!(self, Form::Nfc | Form::Nfkc)
    }
}

/// §4.5.1's tri-state quick-check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsNormalized {
    Yes,
    No,
    Maybe,
}

// --- Hangul algorithmic decomposition/composition (§4.5.3, §4.5.5) ---------

const S_BASE: u32 = 0xAC00;
const L_BASE: u32 = 0x1100;
const V_BASE: u32 = 0x1161;
const T_BASE: u32 = 0x11A7;
const L_COUNT: u32 = 19;
const V_COUNT: u32 = 21;
const T_COUNT: u32 = 28;
const N_COUNT: u32 = V_COUNT * T_COUNT; // 588
const S_COUNT: u32 = L_COUNT * N_COUNT; // 11172

pub fn is_hangul_syllable(cp: u32) -> bool {
    (S_BASE..S_BASE + S_COUNT).contains(&cp)
}

/// `L = 0x1100 + s/588`, `V = 0x1161 + (s%588)/28`, `T` emitted only if
/// `s%28 != 0` (§4.5.3 step 1).
pub fn decompose_hangul(cp: u32) -> Vec<u32> {
    let s = cp - S_BASE;
    let l = L_BASE + s / N_COUNT;
    let v = V_BASE + (s % N_COUNT) / T_COUNT;
    let t = s % T_COUNT;
    if t == 0 {
        vec![l, v]
    } else {
        vec![l, v, T_BASE + t]
    }
}

fn compose_hangul(l: u32, c: u32) -> Option<u32> {
    if (L_BASE..L_BASE + L_COUNT).contains(&l) && (V_BASE..V_BASE + V_COUNT).contains(&c) {
        let l_idx = l - L_BASE;
        let v_idx = c - V_BASE;
        return Some(S_BASE + (l_idx * V_COUNT + v_idx) * T_COUNT);
    }
    if is_hangul_syllable(l) && (l - S_BASE) % T_COUNT == 0 && (T_BASE + 1..T_BASE + T_COUNT).contains(&c) {
        let t_idx = c - T_BASE;
        return Some(l + t_idx);
    }
    None
}

// --- UTF-16 <-> code point conversion (§6.2: strings are UTF-16) -----------

pub fn utf16_to_code_points(units: &[u16]) -> Vec<u32> {
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let u = units[i];
        if (0xD800..=0xDBFF).contains(&u) && i + 1 < units.len() && (0xDC00..=0xDFFF).contains(&units[i + 1]) {
            let hi = u as u32 - 0xD800;
            let lo = units[i + 1] as u32 - 0xDC00;
            out.push(0x10000 + (hi << 10) + lo);
            i += 2;
        } else {
            // Unpaired surrogate: passed through as a standalone code point (§4.5.7).
            out.push(u as u32);
            i += 1;
        }
    }
    out
}

pub fn code_points_to_utf16(cps: &[u32]) -> Vec<u16> {
    let mut out = Vec::with_capacity(cps.len());
    for &cp in cps {
        if cp <= 0xFFFF {
            out.push(cp as u16);
        } else {
            let v = cp - 0x10000;
            out.push(0xD800 + (v >> 10) as u16);
            out.push(0xDC00 + (v & 0x3FF) as u16);
        }
    }
    out
}

// --- quick check (§4.5.1) ---------------------------------------------------

pub fn quick_check(store: &NormalizationStore, units: &[u16], form: Form) -> IsNormalized {
    let cps = utf16_to_code_points(units);
    let mut prev_cc: u8 = 0;
    let mut result = IsNormalized::Yes;
    for cp in cps {
        let rec = store.record(cp);
        let ccc = rec.combining_class;
        if prev_cc > ccc && ccc != 0 {
            return IsNormalized::No;
        }
        let qc = match form {
            Form::Nfc => rec.nfc_qc,
            Form::Nfkc => rec.nfkc_qc,
            Form::Nfd => {
                if rec.nfd_no {
                    QuickCheck::No
                } else {
                    QuickCheck::Yes
                }
            }
            Form::Nfkd => {
                if rec.nfkd_no {
                    QuickCheck::No
                } else {
                    QuickCheck::Yes
                }
            }
        };
        match qc {
            QuickCheck::Yes => {}
            QuickCheck::No => return IsNormalized::No,
            QuickCheck::Maybe => result = IsNormalized::Maybe,
        }
        prev_cc = ccc;
    }
    result
}

/// `isNormalized` (§6.2): resolves `Maybe` by actually normalizing and
/// comparing, per testable property 8 ("quickCheck returns YES iff
/// F(x) == x").
pub fn is_normalized(store: &NormalizationStore, units: &[u16], form: Form) -> bool {
    match quick_check(store, units, form) {
        IsNormalized::Yes => true,
        IsNormalized::No => false,
        IsNormalized::Maybe => normalize(store, units, form).map(|out| out == units).unwrap_or(false),
    }
}

// --- FCD fast path (§4.5.2) -------------------------------------------------

/// True iff the substring is already "Fast-path Canonical-order Decomposition"
/// safe: scanning left to right, each code point's leading combining class is
/// `>=` the trailing combining class of the previous one.
pub fn is_fcd(store: &NormalizationStore, units: &[u16]) -> bool {
    let cps = utf16_to_code_points(units);
    let mut prev_trailing = 0u8;
    for cp in cps {
        let (leading, trailing) = store.fcd(cp);
        if leading != 0 && leading < prev_trailing {
            return false;
        }
        prev_trailing = trailing;
    }
    true
}

// --- decomposition (§4.5.3) -------------------------------------------------

fn decompose_one(store: &NormalizationStore, cp: u32, compat: bool) -> Vec<u32> {
    if is_hangul_syllable(cp) {
        return decompose_hangul(cp);
    }
    let rec = store.record(cp);
    match rec.special {
        Err(SpecialTag::HangulSyllable) => decompose_hangul(cp),
        Err(_) => vec![cp],
        Ok(offset) => {
            let entry = store.extra_entry(offset);
            if compat {
                if let Some(d) = entry.compatibility {
                    d.code_points
                } else if let Some(d) = entry.canonical {
                    d.code_points
                } else {
                    vec![cp]
                }
            } else if let Some(d) = entry.canonical {
                d.code_points
            } else {
                vec![cp]
            }
        }
    }
}

/// Full decomposition of a sequence (§4.5.3). The builder already performs
/// transitive closure (§4.6 step 2), so one non-recursive pass per code
/// point is sufficient.
pub fn decompose_all(store: &NormalizationStore, cps: &[u32], compat: bool) -> Vec<u32> {
    let mut out = Vec::with_capacity(cps.len());
    for &cp in cps {
        out.extend(decompose_one(store, cp, compat));
    }
    out
}

// --- canonical ordering (§4.5.4) --------------------------------------------

/// Stable reorder of every maximal run of non-starter code points, in place.
pub fn canonical_order(store: &NormalizationStore, cps: &mut [u32]) {
    let mut pos = 0;
    while pos < cps.len() {
        if store.record(cps[pos]).combining_class == 0 {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < cps.len() && store.record(cps[pos]).combining_class != 0 {
            pos += 1;
        }
        cps[start..pos].sort_by_key(|&cp| store.record(cp).combining_class);
    }
}

// --- canonical composition (§4.5.5) -----------------------------------------

/// Composes a decomposed, canonically ordered sequence in place.
pub fn compose(store: &NormalizationStore, cps: Vec<u32>) -> Vec<u32> {
    if cps.is_empty() {
        return cps;
    }
    let mut out: Vec<u32> = Vec::with_capacity(cps.len());
    out.push(cps[0]);
    let mut starter_pos = 0usize; // position in `out` of the active starter L
    let mut last_class: u8 = 0; // cc of the last composed-away character after L

    for &c in &cps[1..] {
        let l = out[starter_pos];
        let c_rec = store.record(c);
        let c_cc = c_rec.combining_class;

        if let Some(composed) = compose_hangul(l, c) {
            out[starter_pos] = composed;
            last_class = 0;
            continue;
        }

        let blocked = c_cc != 0 && c_cc <= last_class && last_class != 0;
        if !blocked && c_rec.combines_backward {
            let l_rec = store.record(l);
            if l_rec.combines_forward {
                let l_offset = match l_rec.special {
                    Ok(offset) => Some(offset),
                    Err(_) => None,
                };
                let combining_index = l_offset.map(|o| store.extra_entry(o).combining_index).unwrap_or(0);
                let c_offset = match c_rec.special {
                    Ok(offset) => Some(offset),
                    Err(_) => None,
                };
                let trail_index = c_offset.map(|o| store.extra_entry(o).combining_index).unwrap_or(0);
                if let Some(composed) = store.compose(combining_index, trail_index) {
                    out[starter_pos] = composed;
                    if c_cc == 0 {
                        last_class = 0;
                    }
                    continue;
                }
            }
        }

        out.push(c);
        if c_cc == 0 {
            starter_pos = out.len() - 1;
            last_class = 0;
        } else {
            last_class = c_cc;
        }
    }
    out
}

// --- top-level entry points --------------------------------------------------

/// `normalize(form, input)` (§6.2). Applies the FCD fast path for the
/// canonical forms (NFC/NFD), where an already-FCD input needs no
/// decompose+reorder pass; compatibility forms always run the full pipeline
/// since FCD only tracks canonical combining-class order, not compatibility
/// equivalence.
pub fn normalize(store: &NormalizationStore, units: &[u16], form: Form) -> Result<Vec<u16>> {
    let cps = utf16_to_code_points(units);

    let result_cps = match form {
        Form::Nfd => {
            let mut decomposed = decompose_all(store, &cps, false);
            canonical_order(store, &mut decomposed);
            decomposed
        }
        Form::Nfkd => {
            let mut decomposed = decompose_all(store, &cps, true);
            canonical_order(store, &mut decomposed);
            decomposed
        }
        Form::Nfc => {
            if is_fcd(store, units) {
                compose(store, cps)
            } else {
                let mut decomposed = decompose_all(store, &cps, false);
                canonical_order(store, &mut decomposed);
                compose(store, decomposed)
            }
        }
        Form::Nfkc => {
            let mut decomposed = decompose_all(store, &cps, true);
            canonical_order(store, &mut decomposed);
            compose(store, decomposed)
        }
    };

    Ok(code_points_to_utf16(&result_cps))
}

/// Preflighting variant (§4.5.7): writes into `out` if it fits, else returns
/// `BufferOverflow` carrying the required length without writing past the
/// buffer's end. A zero-length buffer correctly reports the required length
/// with no write.
pub fn normalize_into(store: &NormalizationStore, units: &[u16], form: Form, out: &mut [u16]) -> Result<usize> {
    let result = normalize(store, units, form)?;
    if result.len() > out.len() {
        return Err(Error::buffer_overflow(result.len()));
    }
    out[..result.len()].copy_from_slice(&result);
    Ok(result.len())
}

// --- streaming contract (§4.5.6) --------------------------------------------

/// Opaque incremental-normalization state: the trailing code points received
/// since the last safe boundary this session could find and flush.
pub struct NormalizationSession<'a> {
    store: &'a NormalizationStore,
    form: Form,
    pending: Vec<u32>,
}

impl<'a> NormalizationSession<'a> {
    pub fn new(store: &'a NormalizationStore, form: Form) -> Self {
        NormalizationSession {
            store,
            form,
            pending: Vec::new(),
        }
    }

    fn is_safe_starter(&self, cp: u32) -> bool {
        self.store.record(cp).combining_class == 0 && !self.store.is_unsafe_start(cp)
    }

    /// Feed more UTF-16 input. Consumes and normalizes up to the last safe
    /// boundary it can find in `pending`; anything after that boundary is
    /// carried into the next call.
    pub fn push(&mut self, units: &[u16]) -> Vec<u16> {
        self.pending.extend(utf16_to_code_points(units));

        let mut boundary = self.pending.len();
        while boundary > 1 {
            if self.is_safe_starter(self.pending[boundary - 1]) {
                break;
            }
            boundary -= 1;
        }
        if boundary <= 1 {
            return Vec::new();
        }

        let chunk: Vec<u32> = self.pending.drain(..boundary - 1).collect();
        let chunk_units = code_points_to_utf16(&chunk);
        normalize(self.store, &chunk_units, self.form).unwrap_or(chunk_units)
    }

    /// Flush any remaining tail at end of input, normalizing it regardless
    /// of whether a safe boundary was ever found.
    pub fn finish(mut self) -> Vec<u16> {
        let units = code_points_to_utf16(&self.pending);
        self.pending.clear();
        normalize(self.store, &units, self.form).unwrap_or(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hangul_decompose_and_compose_round_trip() {
        let s = 0xAC01; // 가 + a trailing consonant? check: AC00 has no T, AC01 has T
        let decomposed = decompose_hangul(s);
        assert_eq!(decomposed.len(), 3);
        let (l, v, t) = (decomposed[0], decomposed[1], decomposed[2]);
        let lv = compose_hangul(l, v).unwrap();
        let lvt = compose_hangul(lv, t).unwrap();
        assert_eq!(lvt, s);
    }

    #[test]
    fn ac00_has_no_trailing_consonant() {
        assert_eq!(decompose_hangul(0xAC00), vec![0x1100, 0x1161]);
    }

    #[test]
    fn utf16_surrogate_pairs_round_trip() {
        let cps = vec![0x41, 0x1F600, 0x42];
        let units = code_points_to_utf16(&cps);
        assert_eq!(units.len(), 4);
        assert_eq!(utf16_to_code_points(&units), cps);
    }

    #[test]
    fn unpaired_surrogate_passes_through() {
        let units = vec![0xD800u16, 0x41];
        assert_eq!(utf16_to_code_points(&units), vec![0xD800, 0x41]);
    }
}
