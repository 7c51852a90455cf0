//! In-memory allocation table plus the derived free/occupied bitmap.
//!
//! The table is the ground truth; the bitmap is rebuilt from it on load and
//! updated by every `set`, so the two never disagree.

use log::{debug, warn};

use crate::error::{FsError, Result};
use crate::layout::*;

// ─── Table entries ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableEntry {
    Free,
    EndOfChain,
    ReservedBoot,
    ReservedTable,
    Next(u16),
}

impl TableEntry {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            FAT_FREE           => TableEntry::Free,
            FAT_END_OF_CHAIN   => TableEntry::EndOfChain,
            FAT_RESERVED_BOOT  => TableEntry::ReservedBoot,
            FAT_RESERVED_TABLE => TableEntry::ReservedTable,
            next               => TableEntry::Next(next),
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            TableEntry::Free          => FAT_FREE,
            TableEntry::EndOfChain    => FAT_END_OF_CHAIN,
            TableEntry::ReservedBoot  => FAT_RESERVED_BOOT,
            TableEntry::ReservedTable => FAT_RESERVED_TABLE,
            TableEntry::Next(next)    => next,
        }
    }
}

// ─── Occupancy bitmap ──────────────────────────────────────────────────────────

const WORDS: usize = NUM_CLUSTERS / 64;

#[derive(Clone, PartialEq, Eq)]
struct Bitmap([u64; WORDS]);

impl Bitmap {
    fn get(&self, i: usize) -> bool { self.0[i / 64] & (1u64 << (i % 64)) != 0 }

    fn put(&mut self, i: usize, occupied: bool) {
        if occupied { self.0[i / 64] |= 1u64 << (i % 64); }
        else        { self.0[i / 64] &= !(1u64 << (i % 64)); }
    }

    fn count(&self) -> usize { self.0.iter().map(|w| w.count_ones() as usize).sum() }
}

// ─── Allocation table ──────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq)]
pub struct AllocTable {
    entries:  Box<[u16; NUM_CLUSTERS]>,
    occupied: Bitmap,
}

impl AllocTable {
    /// Table of a freshly formatted volume: boot and table clusters reserved,
    /// root directory a one-cluster chain, everything else free.
    pub fn formatted() -> Self {
        let mut entries = Box::new([FAT_FREE; NUM_CLUSTERS]);
        entries[BOOT_CLUSTER as usize] = FAT_RESERVED_BOOT;
        for i in 0..TABLE_CLUSTERS {
            entries[TABLE_FIRST_CLUSTER as usize + i] = FAT_RESERVED_TABLE;
        }
        entries[ROOT_CLUSTER as usize] = FAT_END_OF_CHAIN;
        Self::from_entries(entries)
    }

    pub fn from_bytes(bytes: &[u8; TABLE_BYTES]) -> Self {
        let mut entries = Box::new([FAT_FREE; NUM_CLUSTERS]);
        for (e, pair) in entries.iter_mut().zip(bytes.chunks_exact(2)) {
            *e = u16::from_le_bytes([pair[0], pair[1]]);
        }
        Self::from_entries(entries)
    }

    fn from_entries(entries: Box<[u16; NUM_CLUSTERS]>) -> Self {
        let mut occupied = Bitmap([0; WORDS]);
        for (i, &e) in entries.iter().enumerate() {
            occupied.put(i, e != FAT_FREE);
        }
        Self { entries, occupied }
    }

    pub fn to_bytes(&self) -> Box<[u8; TABLE_BYTES]> {
        let mut out = Box::new([0u8; TABLE_BYTES]);
        for (pair, e) in out.chunks_exact_mut(2).zip(self.entries.iter()) {
            pair.copy_from_slice(&e.to_le_bytes());
        }
        out
    }

    pub fn get(&self, cluster: u16) -> TableEntry {
        TableEntry::from_raw(self.entries[cluster as usize])
    }

    pub fn set(&mut self, cluster: u16, entry: TableEntry) {
        let raw = entry.raw();
        self.entries[cluster as usize] = raw;
        self.occupied.put(cluster as usize, raw != FAT_FREE);
    }

    pub fn is_free(&self, cluster: u16) -> bool { !self.occupied.get(cluster as usize) }

    /// Occupied clusters in the data region.
    pub fn used_data_clusters(&self) -> usize {
        let system = (0..DATA_START).filter(|&c| !self.is_free(c)).count();
        self.occupied.count() - system
    }

    pub fn free_data_clusters(&self) -> usize { DATA_CLUSTERS - self.used_data_clusters() }

    // ─── Allocator ─────────────────────────────────────────────────────────────

    /// Reserve the lowest free data cluster, marking it end-of-chain.
    /// The caller persists the table.
    pub fn find_free(&mut self) -> Option<u16> {
        let cluster = (DATA_START..NUM_CLUSTERS as u16).find(|&c| self.is_free(c))?;
        self.set(cluster, TableEntry::EndOfChain);
        debug!("allocated cluster {cluster}");
        Some(cluster)
    }

    pub fn free(&mut self, cluster: u16) {
        self.set(cluster, TableEntry::Free);
    }

    /// Every cluster of the chain starting at `head`, in order.
    ///
    /// Fails with `CorruptChain` on a free, reserved, out-of-range or repeated
    /// link instead of following it.
    pub fn chain(&self, head: u16) -> Result<Vec<u16>> {
        if !is_data_cluster(head) {
            return Err(FsError::InvalidCluster(head));
        }
        let mut seen = Bitmap([0; WORDS]);
        let mut out = Vec::new();
        let mut cur = head;
        loop {
            if seen.get(cur as usize) {
                warn!("chain from {head} loops back to {cur}");
                return Err(FsError::CorruptChain { cluster: cur });
            }
            seen.put(cur as usize, true);
            out.push(cur);
            match self.get(cur) {
                TableEntry::EndOfChain => return Ok(out),
                TableEntry::Next(next) if is_data_cluster(next) => cur = next,
                other => {
                    warn!("chain from {head} hits {other:?} at cluster {cur}");
                    return Err(FsError::CorruptChain { cluster: cur });
                }
            }
        }
    }

    /// Free every cluster of the chain starting at `head`. The chain is
    /// validated first, so a corrupt chain is left untouched.
    pub fn free_chain(&mut self, head: u16) -> Result<usize> {
        let chain = self.chain(head)?;
        for &c in &chain {
            self.free(c);
        }
        debug!("freed {} clusters from chain {head}", chain.len());
        Ok(chain.len())
    }

    /// Free the chain hanging off `tail` and make `tail` the end of its chain.
    pub fn truncate_after(&mut self, tail: u16) -> Result<()> {
        if let TableEntry::Next(next) = self.get(tail) {
            self.free_chain(next)?;
        }
        self.set(tail, TableEntry::EndOfChain);
        Ok(())
    }

    /// Allocate `count` clusters and link them after `tail`.
    ///
    /// On exhaustion everything allocated here is released, `tail` is
    /// restored as the end of the chain and `DiskFull` is returned.
    pub fn extend(&mut self, tail: u16, count: usize) -> Result<Vec<u16>> {
        let mut added = Vec::with_capacity(count);
        let mut cur = tail;
        for _ in 0..count {
            match self.find_free() {
                Some(next) => {
                    self.set(cur, TableEntry::Next(next));
                    added.push(next);
                    cur = next;
                }
                None => {
                    warn!("disk full after {} of {count} clusters, rolling back", added.len());
                    for &c in &added {
                        self.free(c);
                    }
                    self.set(tail, TableEntry::EndOfChain);
                    return Err(FsError::DiskFull);
                }
            }
        }
        Ok(added)
    }
}

impl core::fmt::Debug for AllocTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AllocTable")
            .field("used_data_clusters", &self.used_data_clusters())
            .finish()
    }
}
