//! RDS block and group synchronization

use arraydeque::ArrayDeque;

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;

use crate::group::Group;
use crate::syndrome::{self, BLOCK_BITS, BLOCK_MASK, GROUP_BITS};

/// Most syndrome matches remembered per candidate alignment
pub(crate) const MAX_HISTORY: usize = 8;

/// Output of the synchronizer, one per input bit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOut {
    /// Nothing to report
    Searching,

    /// Synchronization acquired at the given block index
    Acquired(usize),

    /// A complete group, while synchronized
    Group(Group),

    /// Synchronization lost
    ///
    /// Carries the last group received, which is entirely
    /// invalid.
    Lost(Group),
}

/// Bit synchronizer
///
/// The `BitSynchronizer` accepts one bit at a time with
/// [`input()`](BitSynchronizer::input) and frames the
/// bitstream into groups of four 26-bit blocks.
///
/// While *searching*, every bit shifts the 26-bit window
/// along by one. If the window's syndrome matches the offset
/// word of any block position, the match is remembered
/// against its bit alignment and the group alignment it
/// implies. Matches older than the confirmation window are
/// forgotten. Once more than `threshold` matches agree on
/// one alignment, the synchronizer locks.
///
/// While *locked*, the synchronizer checks each block
/// against the two syndromes of its expected position and
/// emits a [`Group`] every four blocks. Invalid blocks read
/// as `None`. After `loss_groups` consecutive groups with no
/// valid block at all, the lock is dropped and searching
/// begins anew.
#[derive(Clone, Debug)]
pub struct BitSynchronizer {
    // shift register of the last 26 bits
    block: u32,

    // lifetime bit counter
    bit_time: u64,

    // locked?
    synced: bool,

    // bits accumulated in the current block, when locked
    bit_count: u32,

    // index of the block being accumulated
    block_count: usize,

    // valid blocks in the current group
    nb_ok: usize,

    // consecutive groups with no valid blocks
    nb_unsync: u32,

    // group being assembled
    group: [Option<u16>; 4],

    // bit times of syndrome matches, by bit offset and block alignment
    history: [[ArrayDeque<u64, MAX_HISTORY, arraydeque::Wrapping>; 4]; BLOCK_BITS as usize],

    threshold: usize,
    confirm_bits: u64,
    loss_groups: u32,
}

impl BitSynchronizer {
    /// New synchronizer
    ///
    /// Locks once more than `threshold` syndrome matches agree
    /// within the last `confirm_groups` groups' worth of
    /// bits. Unlocks after `loss_groups` consecutive groups
    /// with no valid block.
    ///
    /// `threshold` must be smaller than the number of matches
    /// which are remembered (8), or the synchronizer will never
    /// lock.
    pub fn new(threshold: usize, confirm_groups: u32, loss_groups: u32) -> Self {
        Self {
            block: 0,
            bit_time: 0,
            synced: false,
            bit_count: 0,
            block_count: 0,
            nb_ok: 0,
            nb_unsync: 0,
            group: [None; 4],
            history: std::array::from_fn(|_| std::array::from_fn(|_| ArrayDeque::new())),
            threshold,
            confirm_bits: confirm_groups as u64 * GROUP_BITS as u64,
            loss_groups: loss_groups.max(1),
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.block = 0;
        self.bit_time = 0;
        self.unlock();
    }

    /// Lifetime count of bits received
    pub fn bit_time(&self) -> u64 {
        self.bit_time
    }

    /// True if locked to the group structure
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Accept one bit
    ///
    /// Bits must be given in order of reception. The bits of
    /// each block are transmitted most-significant first.
    pub fn input(&mut self, bit: bool) -> SyncOut {
        self.bit_time += 1;
        self.block = ((self.block << 1) | bit as u32) & BLOCK_MASK;

        if self.synced {
            self.input_synced()
        } else {
            self.input_searching()
        }
    }

    fn input_searching(&mut self) -> SyncOut {
        let syn = syndrome::syndrome(self.block);
        for i in 0..4 {
            if !syndrome::matches_index(syn, i) {
                continue;
            }

            let offset = (self.bit_time % BLOCK_BITS as u64) as usize;
            let pseudo = ((self.bit_time / BLOCK_BITS as u64 + 4 - i as u64) % 4) as usize;
            let oldest = self.bit_time.saturating_sub(self.confirm_bits);

            let bucket = &mut self.history[offset][pseudo];
            bucket.push_back(self.bit_time);
            while matches!(bucket.front(), Some(&t) if t < oldest) {
                bucket.pop_front();
            }

            if bucket.len() > self.threshold {
                self.lock(i);
                return SyncOut::Acquired(i);
            }
        }
        SyncOut::Searching
    }

    fn input_synced(&mut self) -> SyncOut {
        self.bit_count += 1;
        if self.bit_count < BLOCK_BITS {
            return SyncOut::Searching;
        }
        self.bit_count = 0;

        let syn = syndrome::syndrome(self.block);
        if syndrome::matches_index(syn, self.block_count) {
            self.group[self.block_count] = Some(((self.block >> 10) & 0xffff) as u16);
            self.nb_ok += 1;
        } else {
            self.group[self.block_count] = None;
        }

        self.block_count = (self.block_count + 1) % 4;
        if self.block_count != 0 {
            return SyncOut::Searching;
        }

        if self.nb_ok > 0 {
            self.nb_unsync = 0;
        } else {
            self.nb_unsync += 1;
        }

        let group = Group::new(self.group, self.bit_time);
        debug!("sync: [{:<14}] {}", self.bit_time, group);
        self.nb_ok = 0;
        self.group = [None; 4];

        if self.nb_unsync >= self.loss_groups {
            info!(
                "sync: lost after {} invalid groups at bit {}",
                self.nb_unsync, self.bit_time
            );
            self.unlock();
            SyncOut::Lost(group)
        } else {
            SyncOut::Group(group)
        }
    }

    fn lock(&mut self, index: usize) {
        info!(
            "sync: acquired on block {} at bit {}",
            ['A', 'B', 'C', 'D'][index],
            self.bit_time
        );
        self.synced = true;
        self.block_count = (index + 1) % 4;
        self.bit_count = 0;
        self.nb_ok = 1;
        self.nb_unsync = 0;
        self.group = [None; 4];
        self.group[index] = Some(((self.block >> 10) & 0xffff) as u16);
        self.clear_history();
    }

    fn unlock(&mut self) {
        self.synced = false;
        self.bit_count = 0;
        self.block_count = 0;
        self.nb_ok = 0;
        self.nb_unsync = 0;
        self.group = [None; 4];
        self.clear_history();
    }

    fn clear_history(&mut self) {
        self.history
            .iter_mut()
            .flat_map(|row| row.iter_mut())
            .for_each(|bucket| bucket.clear());
    }
}

impl Default for BitSynchronizer {
    fn default() -> Self {
        Self::new(2, 5, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::syndrome::BlockPosition;

    // bits of one error-free group, MSB first
    fn group_bits(words: [u16; 4]) -> Vec<bool> {
        let positions = [
            BlockPosition::A,
            BlockPosition::B,
            BlockPosition::C,
            BlockPosition::D,
        ];
        words
            .iter()
            .zip(positions.iter())
            .flat_map(|(w, pos)| {
                let block = syndrome::encode(*w, *pos);
                (0..BLOCK_BITS).rev().map(move |b| (block >> b) & 1 == 1)
            })
            .collect()
    }

    fn test_groups() -> Vec<bool> {
        [
            [0xf202, 0x0408, 0x5c66, 0x2043],
            [0xf202, 0x0409, 0x5c62, 0x554c],
            [0xf202, 0x040a, 0x1e5c, 0x5455],
            [0xf202, 0x040f, 0x1c5c, 0x5245],
        ]
        .iter()
        .flat_map(|g| group_bits(*g))
        .collect()
    }

    #[test]
    fn test_acquire() {
        let mut sync = BitSynchronizer::default();
        let mut acquired_at = None;
        let mut groups = vec![];

        // start a few bits off alignment
        let mut bits = vec![false, true, true];
        bits.extend(test_groups());
        bits.extend(test_groups());

        for bit in bits {
            match sync.input(bit) {
                SyncOut::Acquired(_) => acquired_at = Some(sync.bit_time()),
                SyncOut::Group(g) => groups.push(g),
                SyncOut::Lost(_) => unreachable!(),
                SyncOut::Searching => {}
            }
        }

        let acquired_at = acquired_at.expect("never synchronized");
        assert!(acquired_at <= 3 + 2 * GROUP_BITS as u64);
        assert!(sync.is_synced());

        // every complete group after acquisition is fully valid
        assert!(groups.len() >= 5);
        for g in groups.iter().skip(1) {
            assert_eq!(4, g.valid_count());
            assert_eq!(Some(0xf202), g.pi());
        }
        assert_eq!(
            "F202 040F 1C5C 5245",
            groups.last().expect("group").to_string()
        );
    }

    #[test]
    fn test_no_sync_on_noise() {
        let mut sync = BitSynchronizer::default();
        for _ in 0..(20 * GROUP_BITS) {
            assert_eq!(SyncOut::Searching, sync.input(false));
        }
        assert!(!sync.is_synced());
    }

    #[test]
    fn test_loss() {
        let mut sync = BitSynchronizer::new(2, 5, 10);
        for bit in test_groups() {
            sync.input(bit);
        }
        assert!(sync.is_synced());

        let mut invalid_groups = 0;
        let mut lost = false;
        for _ in 0..(12 * GROUP_BITS) {
            match sync.input(false) {
                SyncOut::Group(g) if g.valid_count() == 0 => invalid_groups += 1,
                SyncOut::Lost(g) => {
                    assert_eq!(0, g.valid_count());
                    lost = true;
                    break;
                }
                _ => {}
            }
        }

        assert!(lost);
        assert_eq!(9, invalid_groups);
        assert!(!sync.is_synced());
    }

    #[test]
    fn test_one_bad_block_keeps_lock() {
        let mut sync = BitSynchronizer::default();
        let mut bits = test_groups();
        bits.extend(test_groups());

        // corrupt block C of the last group
        let flip = bits.len() - 2 * BLOCK_BITS as usize + 3;
        bits[flip] = !bits[flip];

        let mut last = None;
        for bit in bits {
            if let SyncOut::Group(g) = sync.input(bit) {
                last = Some(g);
            }
        }
        let last = last.expect("no groups");
        assert_eq!("F202 040F ---- 5245", last.to_string());
        assert!(sync.is_synced());
    }
}
