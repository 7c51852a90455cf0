//! Directory records, directory clusters and path resolution.
//!
//! A directory is exactly one cluster holding 32 records. Live records form
//! a prefix of the array: the first record with `size == 0` ends the list.

use log::info;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use volume_api_types::ListEntry;

use crate::disk::Disk;
use crate::error::{FsError, Result};
use crate::layout::*;
use crate::store::VolumeStore;
use crate::table::TableEntry;

// ─── Directory entry (32 bytes) ────────────────────────────────────────────────

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum EntryKind {
    File      = 0,
    Directory = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name:        [u8; NAME_FIELD_LEN],
    /// Raw kind byte; see `kind()`.
    pub attributes:  u8,
    pub reserved:    [u8; 7],
    pub first_block: u16,
    pub size:        u32,
}

impl DirEntry {
    pub const EMPTY: Self = Self {
        name: [0; NAME_FIELD_LEN], attributes: 0, reserved: [0; 7], first_block: 0, size: 0,
    };

    pub fn new(name: &str, kind: EntryKind, first_block: u16, size: u32) -> Self {
        let mut field = [0u8; NAME_FIELD_LEN];
        field[..name.len()].copy_from_slice(name.as_bytes());
        Self { name: field, attributes: kind.into(), reserved: [0; 7], first_block, size }
    }

    pub fn parse(raw: &[u8]) -> Self {
        let mut name = [0u8; NAME_FIELD_LEN];
        name.copy_from_slice(&raw[0..18]);
        let mut reserved = [0u8; 7];
        reserved.copy_from_slice(&raw[19..26]);
        Self {
            name,
            attributes: raw[18],
            reserved,
            first_block: u16::from_le_bytes([raw[26], raw[27]]),
            size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    pub fn encode(&self, out: &mut [u8]) {
        out[0..18].copy_from_slice(&self.name);
        out[18] = self.attributes;
        out[19..26].copy_from_slice(&self.reserved);
        out[26..28].copy_from_slice(&self.first_block.to_le_bytes());
        out[28..32].copy_from_slice(&self.size.to_le_bytes());
    }

    /// A zero size marks an unused slot and the end of the live list.
    pub fn is_end(&self) -> bool { self.size == 0 }

    /// Anything that is not a directory is handled as a file.
    pub fn kind(&self) -> EntryKind {
        EntryKind::try_from(self.attributes).unwrap_or(EntryKind::File)
    }

    pub fn is_dir(&self) -> bool { self.kind() == EntryKind::Directory }

    pub fn name_bytes(&self) -> &[u8] {
        &self.name[..text_len(&self.name[..MAX_NAME_LEN])]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn to_list_entry(&self) -> ListEntry {
        let mut out = ListEntry::EMPTY;
        let name = self.name_bytes();
        out.name[..name.len()].copy_from_slice(name);
        out.name_len = name.len() as u8;
        out.is_dir = self.is_dir() as u8;
        out.size = self.size;
        out
    }
}

/// Checks a single path component for use as a record name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.bytes().any(|b| b == b'/' || b == 0) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ─── Directory cluster ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirBlock {
    entries: [DirEntry; ENTRIES_PER_CLUSTER],
}

impl DirBlock {
    pub fn empty() -> Self { Self { entries: [DirEntry::EMPTY; ENTRIES_PER_CLUSTER] } }

    pub fn from_cluster(c: &Cluster) -> Self {
        let mut entries = [DirEntry::EMPTY; ENTRIES_PER_CLUSTER];
        for (e, raw) in entries.iter_mut().zip(c.chunks_exact(DIR_ENTRY_SIZE)) {
            *e = DirEntry::parse(raw);
        }
        Self { entries }
    }

    pub fn to_cluster(&self) -> Cluster {
        let mut c = ZERO_CLUSTER;
        for (e, raw) in self.entries.iter().zip(c.chunks_exact_mut(DIR_ENTRY_SIZE)) {
            e.encode(raw);
        }
        c
    }

    /// Live records, up to the first end-of-list slot.
    pub fn live(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.entries.iter().take_while(|e| !e.is_end())
    }

    pub fn live_count(&self) -> usize { self.live().count() }

    pub fn is_empty(&self) -> bool { self.entries[0].is_end() }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.live().position(|e| e.name_bytes() == name.as_bytes())
    }

    pub fn get(&self, slot: usize) -> &DirEntry { &self.entries[slot] }

    pub fn get_mut(&mut self, slot: usize) -> &mut DirEntry { &mut self.entries[slot] }

    /// Live subdirectory named `name`.
    pub fn find_dir(&self, name: &str) -> Option<&DirEntry> {
        self.live().find(|e| e.is_dir() && e.name_bytes() == name.as_bytes())
    }

    /// First end-of-list slot, `None` when all 32 slots are live.
    pub fn first_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.is_end())
    }

    /// Drop the record in `slot`, shift later live records down one place
    /// and zero the slot that frees up, keeping the live list contiguous.
    pub fn remove_slot(&mut self, slot: usize) {
        let live = self.live_count();
        self.entries.copy_within(slot + 1..live, slot);
        self.entries[live - 1] = DirEntry::EMPTY;
    }
}

// ─── Listing ───────────────────────────────────────────────────────────────────

/// Snapshot of one directory's live records; `iter` can be restarted.
#[derive(Clone, Debug)]
pub struct Listing {
    block: DirBlock,
}

impl Listing {
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> + '_ { self.block.live() }

    pub fn len(&self) -> usize { self.block.live_count() }

    pub fn is_empty(&self) -> bool { self.block.is_empty() }

    pub fn names(&self) -> Vec<String> { self.iter().map(DirEntry::name).collect() }

    pub fn to_list_entries(&self) -> Vec<ListEntry> {
        self.iter().map(DirEntry::to_list_entry).collect()
    }
}

// ─── Directory manager ─────────────────────────────────────────────────────────

/// Outcome of walking all but the last path component.
#[derive(Debug)]
pub struct Resolved<'p> {
    pub parent:  u16,
    pub block:   DirBlock,
    pub last:    Option<&'p str>,
}

pub fn load_dir<D: Disk>(store: &mut VolumeStore<D>, cluster: u16) -> Result<DirBlock> {
    Ok(DirBlock::from_cluster(&store.read_cluster(cluster)?))
}

/// Walk every component except the last, starting at `root`.
pub fn resolve<'p, D: Disk>(
    store: &mut VolumeStore<D>,
    root: u16,
    path: &[&'p str],
) -> Result<Resolved<'p>> {
    let mut cluster = root;
    let mut block = load_dir(store, cluster)?;
    let Some((&last, walk)) = path.split_last() else {
        return Ok(Resolved { parent: cluster, block, last: None });
    };
    for &segment in walk {
        let next = block.find_dir(segment)
            .ok_or_else(|| FsError::NotFound(segment.to_string()))?
            .first_block;
        cluster = next;
        block = load_dir(store, cluster)?;
    }
    Ok(Resolved { parent: cluster, block, last: Some(last) })
}

/// Walk every component, each of which must be a directory.
pub fn resolve_dir<D: Disk>(store: &mut VolumeStore<D>, root: u16, path: &[&str]) -> Result<(u16, DirBlock)> {
    let resolved = resolve(store, root, path)?;
    let Some(last) = resolved.last else {
        return Ok((resolved.parent, resolved.block));
    };
    let slot = resolved.block.position(last).ok_or_else(|| FsError::NotFound(last.to_string()))?;
    let entry = *resolved.block.get(slot);
    if !entry.is_dir() {
        return Err(FsError::NotADirectory(last.to_string()));
    }
    Ok((entry.first_block, load_dir(store, entry.first_block)?))
}

/// Add a record named `name` to the directory at `parent`, backed by one
/// freshly allocated, zeroed cluster.
pub fn create_entry<D: Disk>(
    store: &mut VolumeStore<D>,
    parent: u16,
    mut block: DirBlock,
    name: &str,
    kind: EntryKind,
) -> Result<DirEntry> {
    validate_name(name)?;
    if block.position(name).is_some() {
        return Err(FsError::NameInUse(name.to_string()));
    }
    let slot = block.first_free_slot().ok_or(FsError::DirectoryFull)?;
    let cluster = store.table_mut().find_free().ok_or(FsError::DiskFull)?;

    let entry = DirEntry::new(name, kind, cluster, CLUSTER_SIZE as u32);
    *block.get_mut(slot) = entry;

    let written = store.write_cluster(parent, &block.to_cluster())
        .and_then(|_| store.write_cluster(cluster, &ZERO_CLUSTER))
        .and_then(|_| store.write_table());
    if let Err(e) = written {
        store.table_mut().free(cluster);
        return Err(e);
    }
    info!("created {kind:?} \"{name}\" at cluster {cluster}");
    Ok(entry)
}

pub fn list<D: Disk>(store: &mut VolumeStore<D>, cluster: u16) -> Result<Listing> {
    Ok(Listing { block: load_dir(store, cluster)? })
}

/// Remove the record named `name` from the directory at `parent`, releasing
/// everything it owns.
pub fn remove_entry<D: Disk>(
    store: &mut VolumeStore<D>,
    parent: u16,
    mut block: DirBlock,
    name: &str,
) -> Result<()> {
    let slot = block.position(name).ok_or_else(|| FsError::NotFound(name.to_string()))?;
    let entry = *block.get(slot);

    match entry.kind() {
        EntryKind::File => {
            store.table_mut().free_chain(entry.first_block)?;
        }
        EntryKind::Directory => {
            if !load_dir(store, entry.first_block)?.is_empty() {
                return Err(FsError::DirectoryNotEmpty(name.to_string()));
            }
            if store.table().get(entry.first_block) != TableEntry::EndOfChain {
                return Err(FsError::CorruptChain { cluster: entry.first_block });
            }
            store.table_mut().free(entry.first_block);
        }
    }

    block.remove_slot(slot);
    store.write_table()?;
    store.write_cluster(parent, &block.to_cluster())?;
    info!("removed {:?} \"{name}\"", entry.kind());
    Ok(())
}
