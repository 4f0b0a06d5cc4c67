use super::{MAX_MATCH_LEN, MIN_MATCH_LEN};

/// Sliding window size; also the maximum back-reference distance.
pub(crate) const DICT_SIZE: usize = 32768;
pub(crate) const DICT_SIZE_MASK: usize = DICT_SIZE - 1;

/// Tail mirror length: bytes stored at positions < TAIL_MIRROR_LEN are
/// duplicated at `DICT_SIZE + pos` so a match compare starting anywhere in
/// the window can read `MAX_MATCH_LEN` bytes without wrapping.
const TAIL_MIRROR_LEN: usize = MAX_MATCH_LEN - 1;

pub(crate) const HASH_BITS: usize = 12;
pub(crate) const HASH_SIZE: usize = 1 << HASH_BITS;

/// Empty chain slot. Real positions are always < `DICT_SIZE`.
const NIL: u16 = 0xFFFF;

/// 32 KiB circular dictionary with hash chains over byte triplets.
///
/// `hash_head[h]` holds the most recent position whose triplet hashed to
/// `h`; `next[pos]` links each position to the previous one in the same
/// bucket. Chains are pruned opportunistically during search.
pub(crate) struct Dictionary {
    bytes: [u8; DICT_SIZE + TAIL_MIRROR_LEN],
    hash_head: [u16; HASH_SIZE],
    next: [u16; DICT_SIZE],
}

impl Dictionary {
    pub(crate) fn new() -> Self {
        Self {
            bytes: [0; DICT_SIZE + TAIL_MIRROR_LEN],
            hash_head: [NIL; HASH_SIZE],
            next: [NIL; DICT_SIZE],
        }
    }

    /// Forget all chain state (window bytes may stay; they are unreachable
    /// without a chain entry pointing at them).
    pub(crate) fn reset_chains(&mut self) {
        self.hash_head.fill(NIL);
        self.next.fill(NIL);
    }

    #[inline]
    pub(crate) fn byte(&self, pos: usize) -> u8 {
        self.bytes[pos]
    }

    /// Store `c` at `pos`, mirroring the head of the window into the tail
    /// region.
    #[inline]
    pub(crate) fn store(&mut self, pos: usize, c: u8) {
        self.bytes[pos] = c;
        if pos < TAIL_MIRROR_LEN {
            self.bytes[DICT_SIZE + pos] = c;
        }
    }

    /// Prepend `ins_pos` to the chain for `hash`.
    #[inline]
    pub(crate) fn insert(&mut self, ins_pos: usize, hash: usize) {
        self.next[ins_pos] = self.hash_head[hash];
        self.hash_head[hash] = ins_pos as u16;
    }

    /// Search the chain rooted at `pos` for the longest match, bounded by
    /// `max_probes` candidate visits.
    ///
    /// `match_dist`/`match_len` come in seeded with the best already known
    /// (`match_len` at least `MIN_MATCH_LEN - 1`) and are overwritten only
    /// when a strictly longer match turns up. Distances along a live chain
    /// increase monotonically; a candidate breaking that order marks a stale
    /// link, which is cut (`next = NIL`) before giving up. The probe budget
    /// prunes the same way so repeated searches of a dead-end chain get
    /// cheaper over time.
    pub(crate) fn find_match(
        &mut self,
        pos: usize,
        max_dist: usize,
        max_match_len: usize,
        match_dist: &mut usize,
        match_len: &mut usize,
        max_probes: u32,
    ) {
        debug_assert!(max_match_len <= MAX_MATCH_LEN);
        debug_assert!(*match_len >= MIN_MATCH_LEN - 1);
        if max_match_len <= *match_len {
            return;
        }

        let mut probes_left = max_probes;
        let mut probe_pos = pos;
        let mut prev_dist = 0usize;
        // Candidates that cannot beat the current best are skimmed off by
        // comparing the two bytes just past it before the full compare.
        let mut c0 = self.bytes[pos + *match_len];
        let mut c1 = self.bytes[pos + *match_len - 1];

        loop {
            loop {
                if probes_left <= 1 {
                    self.next[probe_pos] = NIL;
                    return;
                }
                probes_left -= 1;

                let link = self.next[probe_pos];
                if link == NIL {
                    return;
                }
                let next_probe_pos = link as usize;

                let dist = pos.wrapping_sub(next_probe_pos) & DICT_SIZE_MASK;
                if dist > max_dist || dist <= prev_dist {
                    self.next[probe_pos] = NIL;
                    return;
                }
                prev_dist = dist;
                probe_pos = next_probe_pos;

                if self.bytes[probe_pos + *match_len] == c0
                    && self.bytes[probe_pos + *match_len - 1] == c1
                {
                    break;
                }
            }

            let mut probe_len = 0;
            while probe_len < max_match_len
                && self.bytes[pos + probe_len] == self.bytes[probe_pos + probe_len]
            {
                probe_len += 1;
            }

            if probe_len > *match_len {
                *match_dist = prev_dist;
                *match_len = probe_len;
                if probe_len == max_match_len {
                    return;
                }
                c0 = self.bytes[pos + *match_len];
                c1 = self.bytes[pos + *match_len - 1];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hash of the triplet (b0, b1, b2), as maintained by the compressor's
    /// dictionary update loops.
    fn hash3(b0: u8, b1: u8, b2: u8) -> usize {
        (((b0 as usize) << 8) ^ ((b1 as usize) << 4) ^ b2 as usize) & (HASH_SIZE - 1)
    }

    /// Store `data` from position 0 and insert every complete triplet.
    fn fill(dict: &mut Dictionary, data: &[u8]) {
        for (i, &c) in data.iter().enumerate() {
            dict.store(i, c);
            if i >= 2 {
                dict.insert(i - 2, hash3(data[i - 2], data[i - 1], c));
            }
        }
    }

    #[test]
    fn test_tail_mirror() {
        let mut dict = Dictionary::new();
        dict.store(0, 0xAA);
        dict.store(200, 0xBB);
        dict.store(300, 0xCC);
        assert_eq!(dict.byte(DICT_SIZE), 0xAA);
        assert_eq!(dict.byte(DICT_SIZE + 200), 0xBB);
        // Positions past the mirror span are not duplicated
        assert_eq!(dict.byte(300), 0xCC);
    }

    #[test]
    fn test_find_simple_match() {
        let mut dict = Dictionary::new();
        let data = b"abcdefabcdef";
        fill(&mut dict, data);

        let pos = 6; // second "abcdef"
        let mut dist = 0;
        let mut len = MIN_MATCH_LEN - 1;
        dict.find_match(pos, pos, 6, &mut dist, &mut len, 16);
        assert_eq!(dist, 6);
        assert_eq!(len, 6);
    }

    #[test]
    fn test_no_match_without_history() {
        let mut dict = Dictionary::new();
        fill(&mut dict, b"abcdefgh");

        let mut dist = 0;
        let mut len = MIN_MATCH_LEN - 1;
        dict.find_match(3, 3, 5, &mut dist, &mut len, 16);
        assert_eq!(dist, 0);
        assert_eq!(len, MIN_MATCH_LEN - 1);
    }

    #[test]
    fn test_prefers_longer_over_closer() {
        let mut dict = Dictionary::new();
        // "abcd" at 0, "abcx" at 8, then "abcd" again at 16: the closer
        // candidate (dist 8) only matches 3 bytes, the farther one 4.
        let data = b"abcd....abcx....abcd";
        fill(&mut dict, data);

        let mut dist = 0;
        let mut len = MIN_MATCH_LEN - 1;
        dict.find_match(16, 16, 4, &mut dist, &mut len, 32);
        assert_eq!(len, 4);
        assert_eq!(dist, 16);
    }

    #[test]
    fn test_seed_is_kept_when_not_beaten() {
        let mut dict = Dictionary::new();
        let data = b"abcabc";
        fill(&mut dict, data);

        // Seeded with a length-3 lower bound, the equal-length candidate at
        // distance 3 must not replace it.
        let mut dist = 7777;
        let mut len = 3;
        dict.find_match(3, 3, 3, &mut dist, &mut len, 16);
        assert_eq!(dist, 7777);
        assert_eq!(len, 3);
    }

    #[test]
    fn test_probe_budget_of_one_skips_search() {
        let mut dict = Dictionary::new();
        let data = b"abcabcabc";
        fill(&mut dict, data);

        let mut dist = 0;
        let mut len = MIN_MATCH_LEN - 1;
        dict.find_match(6, 6, 3, &mut dist, &mut len, 1);
        assert_eq!(dist, 0);
    }

    #[test]
    fn test_max_dist_limits_candidates() {
        let mut dict = Dictionary::new();
        let data = b"xyzXYZxyz";
        fill(&mut dict, data);

        // The only "xyz" candidate sits 6 back; with max_dist 4 it is out of
        // range and the chain gets pruned instead.
        let mut dist = 0;
        let mut len = MIN_MATCH_LEN - 1;
        dict.find_match(6, 4, 3, &mut dist, &mut len, 16);
        assert_eq!(dist, 0);
    }
}
