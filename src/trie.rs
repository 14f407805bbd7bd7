//! The folded two-stage code-point trie (§3.1, §4.1, §4.2, §6.1).
//!
//! A [`CodePointTrie`] is the read-only, constant-time-lookup side: every
//! scalar value in `0..=0x10FFFF` maps to a 32-bit value word in O(1) with no
//! branching beyond a BMP/supplementary split. A [`TrieBuilder`] is the
//! mutable, offline side: it accepts `set`/`set_range` writes and then folds
//! and compacts itself into the runtime shape.
//!
//! Grounded on `icu4c/source/common/utrie.c` (`utrie_open`, `utrie_set32`,
//! `utrie_setRange32`, `utrie_fold`, `utrie_compact`, `utrie_serialize`,
//! `utrie_unserialize`). The supplementary-folding addressing here is a
//! deliberately simplified equivalent of ICU's lead-surrogate trick (see
//! DESIGN.md) rather than a byte-exact port, since §1 explicitly does not
//! require binary compatibility with ICU's own trie format.

use crate::error::{Error, Result};

pub const DATA_BLOCK_SHIFT: u32 = 6;
pub const DATA_BLOCK_LENGTH: u32 = 1 << DATA_BLOCK_SHIFT;
pub const DATA_BLOCK_MASK: u32 = DATA_BLOCK_LENGTH - 1;
pub const INDEX_SHIFT: u32 = 2;
pub const BMP_INDEX_LENGTH: u32 = 0x10000 >> DATA_BLOCK_SHIFT;
pub const SUPP_CP_COUNT: u32 = 0x110000 - 0x10000;
pub const SUPP_INDEX_LENGTH: u32 = SUPP_CP_COUNT >> DATA_BLOCK_SHIFT;
/// Code points per lead surrogate (one "fold stride", §4.2 step 1).
pub const FOLD_STRIDE: u32 = 0x400;
/// Index blocks covered by one fold stride.
pub const BLOCKS_PER_STRIDE: u32 = FOLD_STRIDE >> DATA_BLOCK_SHIFT;
pub const LEAD_SURROGATE_COUNT: u32 = 1024;

const TRIE_SIGNATURE: u32 = 0x54726965; // "Trie"
const OPT_LATIN1_LINEAR: u32 = 1 << 9;
const OPT_DATA_32_BIT: u32 = 1 << 8;

fn cp_in_range(cp: u32) -> bool {
    cp <= 0x10FFFF
}

/// The read-only, memory-mappable trie (§4.1). Holds the index (stage 1) and
/// data (stage 2) arrays produced by [`TrieBuilder::build`] or
/// [`CodePointTrie::deserialize`].
#[derive(Debug, Clone)]
pub struct CodePointTrie {
    /// BMP index (`BMP_INDEX_LENGTH` entries) followed by the appended
    /// supplementary index blocks folding produced.
    index: Vec<u16>,
    /// One entry per lead surrogate (`0xD800..=0xDBFF`, 1024 entries). Zero
    /// means "no supplementary data for this lead surrogate"; otherwise the
    /// value is the position in `index` where that lead surrogate's 16
    /// supplementary index blocks begin.
    lead_folding: Vec<u32>,
    data: Vec<u32>,
    initial_value: u32,
    error_value: u32,
    linear_latin1: bool,
}

impl CodePointTrie {
    /// O(1) lookup, total over `0..=0x10FFFF` and the error value outside it
    /// (§4.1, testable property 1).
    #[inline]
    pub fn get(&self, cp: u32) -> u32 {
        if !cp_in_range(cp) {
            return self.error_value;
        }
        if cp <= 0xFFFF {
            let block = self.index[(cp >> DATA_BLOCK_SHIFT) as usize] as u32;
            self.data[((block << INDEX_SHIFT) + (cp & DATA_BLOCK_MASK)) as usize]
        } else {
            let lead_offset = (cp >> 10) - 0x40;
            let fold = self.lead_folding[lead_offset as usize];
            if fold == 0 {
                return self.initial_value;
            }
            let block_pos = fold + ((cp >> DATA_BLOCK_SHIFT) & (BLOCKS_PER_STRIDE - 1));
            let block = self.index[block_pos as usize] as u32;
            self.data[((block << INDEX_SHIFT) + (cp & DATA_BLOCK_MASK)) as usize]
        }
    }

    /// Direct Latin-1 access without going through the index, when the
    /// builder was opened with `linear_latin1`. Falls back to `get` otherwise.
    #[inline]
    pub fn get_latin1(&self, cp: u8) -> u32 {
        if self.linear_latin1 {
            self.data[(DATA_BLOCK_LENGTH + cp as u32) as usize]
        } else {
            self.get(cp as u32)
        }
    }

    pub fn initial_value(&self) -> u32 {
        self.initial_value
    }

    pub fn error_value(&self) -> u32 {
        self.error_value
    }

    /// Enumerate maximal contiguous ranges sharing the same transformed
    /// value (§4.3 `enumerate-ranges`).
    pub fn enumerate_ranges<F: FnMut(u32, u32, u32)>(&self, mut transform: impl FnMut(u32) -> u32, mut f: F) {
        let mut range_start = 0u32;
        let mut range_value = transform(self.get(0));
        let mut cp = 1u32;
        while cp <= 0x10FFFF {
            let value = transform(self.get(cp));
            if value != range_value {
                f(range_start, cp, range_value);
                range_start = cp;
                range_value = value;
            }
            cp += 1;
        }
        f(range_start, 0x110000, range_value);
    }

    /// Serialize to the wire format described in §6.1.
    pub fn serialize(&self, reduce_to_16_bits: bool) -> Result<Vec<u8>> {
        let index_length = self.index.len() as u32;
        let data_length = self.data.len() as u32;
        if reduce_to_16_bits && self.data.iter().any(|&v| v > u16::MAX as u32) {
            return Err(Error::index_out_of_bounds(
                "data values do not fit in 16 bits for reduceTo16Bits serialization",
            ));
        }

        let mut options = DATA_BLOCK_SHIFT | (INDEX_SHIFT << 4);
        if !reduce_to_16_bits {
            options |= OPT_DATA_32_BIT;
        }
        if self.linear_latin1 {
            options |= OPT_LATIN1_LINEAR;
        }

        let mut out = Vec::with_capacity(20 + 2 * index_length as usize + 4 * data_length as usize);
        out.extend_from_slice(&TRIE_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&options.to_le_bytes());
        out.extend_from_slice(&index_length.to_le_bytes());
        out.extend_from_slice(&data_length.to_le_bytes());
        out.extend_from_slice(&(self.lead_folding.len() as u32).to_le_bytes());

        for &v in &self.index {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for &v in &self.lead_folding {
            out.extend_from_slice(&v.to_le_bytes());
        }
        if reduce_to_16_bits {
            for &v in &self.data {
                out.extend_from_slice(&(v as u16).to_le_bytes());
            }
        } else {
            for &v in &self.data {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Ok(out)
    }

    /// Read a trie image previously produced by [`CodePointTrie::serialize`].
    /// Copies the bytes into owned arrays rather than aliasing them in
    /// place; callers wanting zero-copy `mmap` behavior can wrap the byte
    /// slice and keep it alive themselves — this core does not depend on
    /// that for correctness.
    pub fn deserialize(bytes: &[u8], initial_value: u32, error_value: u32) -> Result<Self> {
        if bytes.len() < 20 {
            return Err(Error::invalid_format("trie image shorter than the header"));
        }
        let signature = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if signature != TRIE_SIGNATURE {
            return Err(Error::invalid_format("bad trie signature"));
        }
        let options = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let index_length = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let data_length = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        let lead_folding_length = u32::from_le_bytes(bytes[16..20].try_into().unwrap()) as usize;

        let shift = options & 0xF;
        let index_shift = (options >> 4) & 0xF;
        if shift != DATA_BLOCK_SHIFT || index_shift != INDEX_SHIFT {
            return Err(Error::invalid_format("trie shift constants do not match this build"));
        }
        let is_32_bit = options & OPT_DATA_32_BIT != 0;
        let linear_latin1 = options & OPT_LATIN1_LINEAR != 0;

        let mut pos = 20usize;
        let index_bytes = 2 * index_length;
        if bytes.len() < pos + index_bytes {
            return Err(Error::invalid_format("truncated index array"));
        }
        let mut index = Vec::with_capacity(index_length);
        for i in 0..index_length {
            let off = pos + 2 * i;
            index.push(u16::from_le_bytes(bytes[off..off + 2].try_into().unwrap()));
        }
        pos += index_bytes;

        let fold_bytes = 4 * lead_folding_length;
        if bytes.len() < pos + fold_bytes {
            return Err(Error::invalid_format("truncated lead-surrogate folding array"));
        }
        let mut lead_folding = Vec::with_capacity(lead_folding_length);
        for i in 0..lead_folding_length {
            let off = pos + 4 * i;
            lead_folding.push(u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap()));
        }
        pos += fold_bytes;

        let data = if is_32_bit {
            let data_bytes = 4 * data_length;
            if bytes.len() < pos + data_bytes {
                return Err(Error::invalid_format("truncated data array"));
            }
            (0..data_length)
                .map(|i| {
                    let off = pos + 4 * i;
                    u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
                })
                .collect()
        } else {
            let data_bytes = 2 * data_length;
            if bytes.len() < pos + data_bytes {
                return Err(Error::invalid_format("truncated data array"));
            }
            (0..data_length)
                .map(|i| {
                    let off = pos + 2 * i;
                    u16::from_le_bytes(bytes[off..off + 2].try_into().unwrap()) as u32
                })
                .collect()
        };

        Ok(CodePointTrie {
            index,
            lead_folding,
            data,
            initial_value,
            error_value,
            linear_latin1,
        })
    }
}

/// One entry in the BMP/supplementary build-time index: unallocated, an
/// allocated block start, or a "repeat block" marker used for copy-on-write
/// (§4.2, mirroring `utrie_getDataBlock`'s negative encoding, expressed here
/// as a tagged enum rather than a sign bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unallocated,
    Block(u32),
    Repeat(u32),
}

impl Slot {
    fn block_for_read(self) -> u32 {
        match self {
            Slot::Unallocated => 0,
            Slot::Block(b) => b,
            Slot::Repeat(b) => b,
        }
    }
}

/// The mutable, build-time trie (§4.2).
pub struct TrieBuilder {
    bmp: Vec<Slot>,
    supp: Vec<Slot>,
    data: Vec<u32>,
    data_capacity: usize,
    initial_value: u32,
    error_value: u32,
    linear_latin1: bool,
}

impl TrieBuilder {
    /// `open(initial, error, max_data_length)` (§4.2).
    pub fn open(initial_value: u32, error_value: u32, max_data_length: usize, linear_latin1: bool) -> Result<Self> {
        if max_data_length < DATA_BLOCK_LENGTH as usize || (linear_latin1 && max_data_length < 1024) {
            return Err(Error::invalid_argument("max_data_length too small"));
        }
        let mut data = Vec::with_capacity(max_data_length);
        data.resize(DATA_BLOCK_LENGTH as usize, initial_value);
        let mut builder = TrieBuilder {
            bmp: vec![Slot::Unallocated; BMP_INDEX_LENGTH as usize],
            supp: vec![Slot::Unallocated; SUPP_INDEX_LENGTH as usize],
            data,
            data_capacity: max_data_length,
            initial_value,
            error_value,
            linear_latin1,
        };
        if linear_latin1 {
            let base = builder.data.len() as u32;
            builder.data.resize(base as usize + 256, initial_value);
            for i in 0..(256 / DATA_BLOCK_LENGTH as usize) {
                builder.bmp[i] = Slot::Block(base + (i as u32) * DATA_BLOCK_LENGTH);
            }
        }
        Ok(builder)
    }

    fn slot_mut(&mut self, cp: u32) -> &mut Slot {
        if cp <= 0xFFFF {
            &mut self.bmp[(cp >> DATA_BLOCK_SHIFT) as usize]
        } else {
            &mut self.supp[((cp - 0x10000) >> DATA_BLOCK_SHIFT) as usize]
        }
    }

    fn slot(&self, cp: u32) -> Slot {
        if cp <= 0xFFFF {
            self.bmp[(cp >> DATA_BLOCK_SHIFT) as usize]
        } else {
            self.supp[((cp - 0x10000) >> DATA_BLOCK_SHIFT) as usize]
        }
    }

    /// Allocate (or reuse) the data block backing `cp`, copying an existing
    /// repeat block on first write (`utrie_getDataBlock`'s copy-on-write).
    fn get_data_block(&mut self, cp: u32) -> Option<u32> {
        match self.slot(cp) {
            Slot::Block(b) => Some(b),
            Slot::Repeat(b) => {
                let new_block = self.data.len() as u32;
                let new_top = new_block + DATA_BLOCK_LENGTH;
                if new_top as usize > self.data_capacity {
                    return None;
                }
                let src: Vec<u32> = self.data[b as usize..(b + DATA_BLOCK_LENGTH) as usize].to_vec();
                self.data.extend_from_slice(&src);
                *self.slot_mut(cp) = Slot::Block(new_block);
                Some(new_block)
            }
            Slot::Unallocated => {
                let new_block = self.data.len() as u32;
                let new_top = new_block + DATA_BLOCK_LENGTH;
                if new_top as usize > self.data_capacity {
                    return None;
                }
                self.data.resize(new_top as usize, self.initial_value);
                *self.slot_mut(cp) = Slot::Block(new_block);
                Some(new_block)
            }
        }
    }

    /// `set(cp, value)` — a single code point (§4.2).
    pub fn set(&mut self, cp: u32, value: u32) -> bool {
        if !cp_in_range(cp) {
            return false;
        }
        match self.get_data_block(cp) {
            Some(block) => {
                self.data[(block + (cp & DATA_BLOCK_MASK)) as usize] = value;
                true
            }
            None => false,
        }
    }

    fn fill_block(&mut self, block: u32, start: u32, limit: u32, value: u32, overwrite: bool) {
        for i in start..limit {
            let idx = (block + i) as usize;
            if overwrite || self.data[idx] == self.initial_value {
                self.data[idx] = value;
            }
        }
    }

    /// `set_range(start, limit, value, overwrite)` (§4.2), mirroring
    /// `utrie_setRange32`'s partial-block/whole-block/partial-tail handling.
    pub fn set_range(&mut self, start: u32, limit: u32, value: u32, overwrite: bool) -> bool {
        if start > limit || !cp_in_range(start) || limit > 0x110000 {
            return false;
        }
        if start == limit {
            return true;
        }
        let mut start = start;
        if start & DATA_BLOCK_MASK != 0 {
            let block = match self.get_data_block(start) {
                Some(b) => b,
                None => return false,
            };
            let next_start = (start + DATA_BLOCK_LENGTH) & !DATA_BLOCK_MASK;
            if next_start <= limit {
                self.fill_block(block, start & DATA_BLOCK_MASK, DATA_BLOCK_LENGTH, value, overwrite);
                start = next_start;
            } else {
                self.fill_block(block, start & DATA_BLOCK_MASK, limit & DATA_BLOCK_MASK, value, overwrite);
                return true;
            }
        }

        let rest = limit & DATA_BLOCK_MASK;
        let aligned_limit = limit & !DATA_BLOCK_MASK;

        let mut repeat_block: Option<u32> = None;
        let mut cp = start;
        while cp < aligned_limit {
            match self.slot(cp) {
                Slot::Block(b) => {
                    self.fill_block(b, 0, DATA_BLOCK_LENGTH, value, overwrite);
                }
                Slot::Repeat(b) if self.data[b as usize] == value => {
                    // Already a repeat block holding exactly this value; nothing to do.
                }
                Slot::Unallocated | Slot::Repeat(_) => {
                    let can_replace = matches!(self.slot(cp), Slot::Unallocated) || overwrite;
                    if !can_replace {
                        cp += DATA_BLOCK_LENGTH;
                        continue;
                    }
                    if let Some(rb) = repeat_block {
                        *self.slot_mut(cp) = Slot::Repeat(rb);
                    } else {
                        let rb = match self.get_data_block(cp) {
                            Some(b) => b,
                            None => return false,
                        };
                        self.fill_block(rb, 0, DATA_BLOCK_LENGTH, value, true);
                        *self.slot_mut(cp) = Slot::Repeat(rb);
                        repeat_block = Some(rb);
                    }
                }
            }
            cp += DATA_BLOCK_LENGTH;
        }

        if rest > 0 {
            let block = match self.get_data_block(cp) {
                Some(b) => b,
                None => return false,
            };
            self.fill_block(block, 0, rest, value, overwrite);
        }

        true
    }

    /// Single code-point read-back while still in build form (used by the
    /// builder itself and by the normalization builder's closure loop).
    pub fn get(&self, cp: u32) -> u32 {
        if !cp_in_range(cp) {
            return self.error_value;
        }
        let block = self.slot(cp).block_for_read();
        self.data[(block + (cp & DATA_BLOCK_MASK)) as usize]
    }

    /// Fold the supplementary region into a compact index area addressed via
    /// lead surrogates, then compact blocks, producing the runtime trie
    /// (§4.2 steps 1-4). `fold_fn` derives a representative value for a
    /// 0x400-code-point stride, stored at the lead surrogate's own BMP
    /// position so a lone lead surrogate still resolves to something
    /// meaningful.
    pub fn build(&mut self, mut fold_fn: impl FnMut(&[u32]) -> u32) -> Result<CodePointTrie> {
        // Step 1: fold supplementary strides.
        let mut appended_index: Vec<u32> = Vec::new();
        let mut lead_folding = vec![0u32; LEAD_SURROGATE_COUNT as usize];
        let mut seen_strides: Vec<(Vec<u32>, u32)> = Vec::new();

        for lead_idx in 0..LEAD_SURROGATE_COUNT {
            let cp_base = 0x10000 + lead_idx * FOLD_STRIDE;
            let supp_block_base = (cp_base - 0x10000) >> DATA_BLOCK_SHIFT;
            let blocks: Vec<u32> = (0..BLOCKS_PER_STRIDE)
                .map(|b| self.supp[(supp_block_base + b) as usize].block_for_read())
                .collect();
            if blocks.iter().all(|&b| b == 0) {
                continue;
            }

            let mut values = Vec::with_capacity(FOLD_STRIDE as usize);
            for &block in &blocks {
                values.extend_from_slice(&self.data[block as usize..(block + DATA_BLOCK_LENGTH) as usize]);
            }
            let folded = fold_fn(&values);
            if folded != 0 {
                self.set(0xD800 + lead_idx, folded);
            }

            let position = seen_strides.iter().find(|(existing, _)| existing == &blocks).map(|(_, pos)| *pos);
            let position = match position {
                Some(p) => p,
                None => {
                    let pos = BMP_INDEX_LENGTH + appended_index.len() as u32;
                    appended_index.extend_from_slice(&blocks);
                    seen_strides.push((blocks, pos));
                    pos
                }
            };
            lead_folding[lead_idx as usize] = position;
        }

        let mut combined_index: Vec<u32> = (0..BMP_INDEX_LENGTH).map(|i| self.bmp[i as usize].block_for_read()).collect();
        combined_index.extend_from_slice(&appended_index);

        // Step 2-3: compact blocks and remap the combined index.
        let (new_data, remap) = compact_blocks(&self.data, self.linear_latin1);
        // `remap` holds raw (un-shifted) data offsets; the index stores
        // `offset >> INDEX_SHIFT` so 16 bits can address `new_data` out to
        // `u16::MAX << INDEX_SHIFT` elements. `compact_blocks` guarantees every
        // offset it hands back is a multiple of `1 << INDEX_SHIFT`, so this
        // shift loses no bits.
        let final_index: Vec<u16> = combined_index
            .iter()
            .map(|&block| (remap[(block >> DATA_BLOCK_SHIFT) as usize] >> INDEX_SHIFT) as u16)
            .collect();

        Ok(CodePointTrie {
            index: final_index,
            lead_folding,
            data: new_data,
            initial_value: self.initial_value,
            error_value: self.error_value,
            linear_latin1: self.linear_latin1,
        })
    }

    /// `serialize(fold_fn, reduce_to_16_bits)` (§4.2/§6.1): build then
    /// serialize to bytes in one step.
    pub fn serialize(&mut self, fold_fn: impl FnMut(&[u32]) -> u32, reduce_to_16_bits: bool) -> Result<Vec<u8>> {
        self.build(fold_fn)?.serialize(reduce_to_16_bits)
    }
}

/// Block-level deduplication and overlap compaction (§4.2 step 2), mirroring
/// `utrie_compact`: all-initial blocks share offset 0, repeated whole-value
/// blocks share one copy, and adjacent blocks overlap where their
/// boundaries match. Returns the compacted data array and a block-index
/// remap table (indexed by `old_block_start >> DATA_BLOCK_SHIFT`), every
/// entry of which is a multiple of `1 << INDEX_SHIFT` so `build` can turn it
/// into an exact `offset >> INDEX_SHIFT` index value (§6.1).
fn compact_blocks(data: &[u32], linear_latin1: bool) -> (Vec<u32>, Vec<u32>) {
    let block_len = DATA_BLOCK_LENGTH as usize;
    let granularity = 1usize << INDEX_SHIFT;
    let block_count = data.len() / block_len;
    let mut remap = vec![0u32; block_count];
    let mut new_data = data[0..block_len].to_vec();
    remap[0] = 0;

    let mut whole_block_values: Vec<(u32, u32)> = vec![(data[0], 0)];
    let overlap_start = if linear_latin1 { block_len + 256 } else { block_len };

    let mut start = block_len;
    while start < data.len() {
        let block = &data[start..start + block_len];
        let x = block[0];
        let is_whole = block.iter().all(|&v| v == x);

        if is_whole && start >= overlap_start {
            if let Some(&(_, existing_pos)) = whole_block_values.iter().find(|&&(v, _)| v == x) {
                remap[start / block_len] = existing_pos;
                start += block_len;
                continue;
            }
        }

        let prev_len = new_data.len();
        let overlap = if start >= overlap_start && prev_len > 0 && new_data[prev_len - 1] == x {
            let mut i = 0usize;
            while i < block_len && i < prev_len && block[i] == x && new_data[prev_len - 1 - i] == x {
                i += 1;
            }
            // Block starts must land on an `offset >> INDEX_SHIFT` boundary
            // (§6.1), so an overlap that would leave `new_data.len() - i` off
            // that grid is rounded down to the nearest one that doesn't.
            i - (i % granularity)
        } else {
            0
        };

        let new_start = new_data.len() - overlap;
        remap[start / block_len] = new_start as u32;
        new_data.extend_from_slice(&block[overlap..]);

        if is_whole {
            whole_block_values.push((x, new_start as u32));
        }

        start += block_len;
    }

    (new_data, remap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_fold(_values: &[u32]) -> u32 {
        0
    }

    #[test]
    fn total_lookup_covers_full_range() {
        let mut builder = TrieBuilder::open(0, 0xFFFF_FFFF, 1 << 16, false).unwrap();
        builder.set(0, 1);
        builder.set(0x10FFFF, 2);
        let trie = builder.build(simple_fold).unwrap();
        assert_eq!(trie.get(0), 1);
        assert_eq!(trie.get(0x10FFFF), 2);
        assert_eq!(trie.get(0x110000), 0xFFFF_FFFF);
        assert_eq!(trie.get(5), 0);
    }

    #[test]
    fn set_range_respects_overwrite() {
        let mut builder = TrieBuilder::open(0, 0, 1 << 14, false).unwrap();
        builder.set(100, 9);
        builder.set_range(90, 110, 5, false);
        let trie = builder.build(simple_fold).unwrap();
        assert_eq!(trie.get(100), 9); // preserved, overwrite=false
        assert_eq!(trie.get(95), 5);
        assert_eq!(trie.get(90), 5);
        assert_eq!(trie.get(109), 5);
        assert_eq!(trie.get(110), 0);
    }

    #[test]
    fn set_range_overwrite_true_replaces_everything() {
        let mut builder = TrieBuilder::open(0, 0, 1 << 14, false).unwrap();
        builder.set(100, 9);
        builder.set_range(90, 110, 5, true);
        let trie = builder.build(simple_fold).unwrap();
        assert_eq!(trie.get(100), 5);
    }

    #[test]
    fn supplementary_round_trip_through_fold_and_compact() {
        let mut builder = TrieBuilder::open(0, 0, 1 << 17, false).unwrap();
        builder.set(0x1F600, 42); // an emoji-range code point
        builder.set(0x10000, 7);
        builder.set(0x10FFFF, 99);
        let trie = builder.build(simple_fold).unwrap();
        assert_eq!(trie.get(0x1F600), 42);
        assert_eq!(trie.get(0x10000), 7);
        assert_eq!(trie.get(0x10FFFF), 99);
        assert_eq!(trie.get(0x1F601), 0);
    }

    #[test]
    fn serialize_round_trip_32_bit() {
        let mut builder = TrieBuilder::open(0, 0, 1 << 16, false).unwrap();
        builder.set_range(0x41, 0x5B, 100, false);
        builder.set(0x1F600, 12345);
        let trie = builder.build(simple_fold).unwrap();
        let bytes = trie.serialize(false).unwrap();
        let restored = CodePointTrie::deserialize(&bytes, 0, 0).unwrap();
        for cp in 0x41..0x5B {
            assert_eq!(restored.get(cp), 100);
        }
        assert_eq!(restored.get(0x1F600), 12345);
        assert_eq!(restored.get(0), 0);
    }

    #[test]
    fn block_sharing_preserves_mapping() {
        let mut builder = TrieBuilder::open(0, 0, 1 << 16, false).unwrap();
        // Two distinct ranges that end up filled with the same value should
        // compact to shared storage without changing any lookup result.
        builder.set_range(0x100, 0x140, 7, true);
        builder.set_range(0x300, 0x340, 7, true);
        builder.set(0x310, 8);
        let pre: Vec<u32> = (0x0..0x400).map(|cp| builder.get(cp)).collect();
        let trie = builder.build(simple_fold).unwrap();
        for cp in 0..0x400u32 {
            assert_eq!(trie.get(cp), pre[cp as usize], "mismatch at U+{cp:04X}");
        }
    }
}
