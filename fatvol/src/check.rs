//! Consistency walk over the directory tree and the allocation table.

use log::{debug, warn};

use crate::dir::load_dir;
use crate::disk::Disk;
use crate::error::{FsError, Result};
use crate::layout::*;
use crate::store::VolumeStore;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub files:         usize,
    pub directories:   usize,
    /// Occupied data clusters according to the table.
    pub used_clusters: usize,
    /// Occupied data clusters that no record owns.
    pub leaked:        Vec<u16>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool { self.leaked.is_empty() }
}

/// Walk every record reachable from the root and check its chain against
/// the table. Stops at the first malformed or doubly owned chain.
pub fn check<D: Disk>(store: &mut VolumeStore<D>) -> Result<CheckReport> {
    let mut owned = vec![false; NUM_CLUSTERS];
    let mut report = CheckReport::default();
    let mut pending = vec![ROOT_CLUSTER];

    while let Some(cluster) = pending.pop() {
        let block = load_dir(store, cluster)?;
        for entry in block.live() {
            let chain = store.table().chain(entry.first_block)?;
            for &c in &chain {
                if owned[c as usize] {
                    warn!("cluster {c} is claimed twice, second owner \"{}\"", entry.name());
                    return Err(FsError::CrossLinked { cluster: c });
                }
                owned[c as usize] = true;
            }

            if entry.is_dir() {
                if chain.len() != 1 || entry.size as usize != CLUSTER_SIZE {
                    warn!("directory \"{}\" spans {} clusters, size {}", entry.name(), chain.len(), entry.size);
                    return Err(FsError::CorruptChain { cluster: entry.first_block });
                }
                report.directories += 1;
                pending.push(entry.first_block);
            } else {
                if entry.size as usize != chain.len() * CLUSTER_SIZE {
                    warn!("file \"{}\" declares {} bytes over {} clusters", entry.name(), entry.size, chain.len());
                    return Err(FsError::CorruptChain { cluster: chain[chain.len() - 1] });
                }
                report.files += 1;
            }
        }
    }

    let table = store.table();
    report.used_clusters = table.used_data_clusters();
    report.leaked = (DATA_START..NUM_CLUSTERS as u16)
        .filter(|&c| !table.is_free(c) && !owned[c as usize])
        .collect();
    debug!(
        "check: {} files, {} directories, {} clusters used, {} leaked",
        report.files, report.directories, report.used_clusters, report.leaked.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::{DirBlock, DirEntry, EntryKind, create_entry};
    use crate::disk::MemDisk;
    use crate::file::overwrite;
    use crate::table::TableEntry;

    fn fresh() -> VolumeStore<MemDisk> {
        VolumeStore::format(MemDisk::new()).unwrap()
    }

    fn add(s: &mut VolumeStore<MemDisk>, parent: u16, name: &str, kind: EntryKind) -> DirEntry {
        let block = load_dir(s, parent).unwrap();
        create_entry(s, parent, block, name, kind).unwrap()
    }

    #[test]
    fn empty_volume_is_clean() {
        let mut s = fresh();
        let report = check(&mut s).unwrap();
        assert_eq!(report, CheckReport::default());
        assert!(report.is_clean());
    }

    #[test]
    fn counts_nested_tree() {
        let mut s = fresh();
        let d = add(&mut s, ROOT_CLUSTER, "d", EntryKind::Directory);
        add(&mut s, d.first_block, "inner", EntryKind::Directory);
        add(&mut s, d.first_block, "f", EntryKind::File);
        add(&mut s, ROOT_CLUSTER, "g", EntryKind::File);
        let report = check(&mut s).unwrap();
        assert_eq!(report.directories, 2);
        assert_eq!(report.files, 2);
        assert_eq!(report.used_clusters, 4);
        assert!(report.is_clean());
    }

    #[test]
    fn reports_leaked_clusters() {
        let mut s = fresh();
        s.table_mut().set(500, TableEntry::EndOfChain);
        let report = check(&mut s).unwrap();
        assert_eq!(report.leaked, vec![500]);
        assert!(!report.is_clean());
    }

    #[test]
    fn detects_cross_linked_files() {
        let mut s = fresh();
        let a = add(&mut s, ROOT_CLUSTER, "a", EntryKind::File);
        let mut block = load_dir(&mut s, ROOT_CLUSTER).unwrap();
        let slot = block.first_free_slot().unwrap();
        *block.get_mut(slot) = DirEntry::new("b", EntryKind::File, a.first_block, 1024);
        s.write_cluster(ROOT_CLUSTER, &block.to_cluster()).unwrap();
        assert!(matches!(check(&mut s), Err(FsError::CrossLinked { cluster }) if cluster == a.first_block));
    }

    #[test]
    fn detects_size_mismatch() {
        let mut s = fresh();
        let f = add(&mut s, ROOT_CLUSTER, "f", EntryKind::File);
        overwrite(&mut s, f.first_block, &[b'x'; 3000]).unwrap();
        assert!(matches!(check(&mut s), Err(FsError::CorruptChain { .. })));
    }

    #[test]
    fn detects_multi_cluster_directory() {
        let mut s = fresh();
        let d = add(&mut s, ROOT_CLUSTER, "d", EntryKind::Directory);
        s.table_mut().extend(d.first_block, 1).unwrap();
        assert!(matches!(check(&mut s), Err(FsError::CorruptChain { cluster }) if cluster == d.first_block));
    }

    #[test]
    fn detects_broken_chain() {
        let mut s = fresh();
        let mut block = DirBlock::empty();
        *block.get_mut(0) = DirEntry::new("ghost", EntryKind::File, 700, 1024);
        s.write_cluster(ROOT_CLUSTER, &block.to_cluster()).unwrap();
        assert!(matches!(check(&mut s), Err(FsError::CorruptChain { .. })));
    }
}
