//! The volume facade: every externally invoked operation.
//!
//! Paths are slices of components below the root, e.g. `["docs", "a.txt"]`.
//! Each operation first reloads the table and root directory from the image,
//! so two `Volume`s over the same file see each other's completed work.

use log::warn;

use crate::check::{self, CheckReport};
use crate::dir::{self, DirBlock, DirEntry, EntryKind, Listing};
use crate::disk::Disk;
use crate::error::{FsError, Result};
use crate::file;
use crate::layout::*;
use crate::store::VolumeStore;

/// Split a `/`-separated path into components, ignoring empty segments.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// A file record located in its parent directory.
struct Located {
    parent: u16,
    block:  DirBlock,
    slot:   usize,
    entry:  DirEntry,
}

impl Located {
    /// Record a new declared size and persist the parent directory.
    fn set_size<D: Disk>(&mut self, store: &mut VolumeStore<D>, size: u32) -> Result<()> {
        if self.entry.size == size { return Ok(()); }
        self.entry.size = size;
        self.block.get_mut(self.slot).size = size;
        store.write_cluster(self.parent, &self.block.to_cluster())
    }
}

pub struct Volume<D> {
    store: VolumeStore<D>,
}

impl<D: Disk> Volume<D> {
    /// Attach to an already formatted image.
    pub fn open(disk: D) -> Result<Self> {
        Ok(Self { store: VolumeStore::load(disk)? })
    }

    /// Format `disk` and attach to it.
    pub fn create(disk: D) -> Result<Self> {
        Ok(Self { store: VolumeStore::format(disk)? })
    }

    pub fn into_disk(self) -> D { self.store.into_disk() }

    pub fn format(&mut self) -> Result<()> {
        self.store.reformat()
    }

    pub fn reload(&mut self) -> Result<()> {
        self.store.reload()
    }

    pub fn make_directory(&mut self, path: &[&str]) -> Result<DirEntry> {
        self.create_entry(path, EntryKind::Directory)
    }

    pub fn create_file(&mut self, path: &[&str]) -> Result<DirEntry> {
        self.create_entry(path, EntryKind::File)
    }

    fn create_entry(&mut self, path: &[&str], kind: EntryKind) -> Result<DirEntry> {
        self.store.reload()?;
        let resolved = dir::resolve(&mut self.store, ROOT_CLUSTER, path)?;
        let name = resolved.last.ok_or_else(|| FsError::InvalidName("/".into()))?;
        dir::create_entry(&mut self.store, resolved.parent, resolved.block, name, kind)
    }

    /// Remove a file, or an empty directory.
    pub fn remove(&mut self, path: &[&str]) -> Result<()> {
        self.store.reload()?;
        let resolved = dir::resolve(&mut self.store, ROOT_CLUSTER, path)?;
        let name = resolved.last.ok_or_else(|| FsError::InvalidName("/".into()))?;
        dir::remove_entry(&mut self.store, resolved.parent, resolved.block, name)
    }

    /// Live records of the directory at `path`; the empty path lists the root.
    pub fn list(&mut self, path: &[&str]) -> Result<Listing> {
        self.store.reload()?;
        let (cluster, _) = dir::resolve_dir(&mut self.store, ROOT_CLUSTER, path)?;
        dir::list(&mut self.store, cluster)
    }

    /// Look up the record at `path`. The root has no record of its own, so
    /// the empty path yields a synthetic directory entry for it.
    pub fn stat(&mut self, path: &[&str]) -> Result<DirEntry> {
        self.store.reload()?;
        let resolved = dir::resolve(&mut self.store, ROOT_CLUSTER, path)?;
        let Some(name) = resolved.last else {
            return Ok(DirEntry::new("", EntryKind::Directory, ROOT_CLUSTER, CLUSTER_SIZE as u32));
        };
        let slot = resolved.block.position(name).ok_or_else(|| FsError::NotFound(name.into()))?;
        Ok(*resolved.block.get(slot))
    }

    fn locate_file(&mut self, path: &[&str]) -> Result<Located> {
        let resolved = dir::resolve(&mut self.store, ROOT_CLUSTER, path)?;
        let name = resolved.last.ok_or_else(|| FsError::NotAFile("/".into()))?;
        let slot = resolved.block.position(name).ok_or_else(|| FsError::NotFound(name.into()))?;
        let entry = *resolved.block.get(slot);
        if entry.is_dir() {
            return Err(FsError::NotAFile(name.into()));
        }
        Ok(Located { parent: resolved.parent, block: resolved.block, slot, entry })
    }

    /// Replace the file's content. Returns the new declared size.
    ///
    /// On `DiskFull` the file is left as a single zeroed cluster and its
    /// record says so before the error is returned.
    pub fn overwrite_file(&mut self, path: &[&str], payload: &[u8]) -> Result<u32> {
        self.store.reload()?;
        let mut located = self.locate_file(path)?;
        match file::overwrite(&mut self.store, located.entry.first_block, payload) {
            Ok(size) => {
                located.set_size(&mut self.store, size)?;
                Ok(size)
            }
            Err(FsError::DiskFull) => {
                warn!("overwrite rolled back to one cluster");
                located.set_size(&mut self.store, CLUSTER_SIZE as u32)?;
                Err(FsError::DiskFull)
            }
            Err(e) => Err(e),
        }
    }

    /// The file's text, up to the first NUL.
    pub fn read_file(&mut self, path: &[&str]) -> Result<Vec<u8>> {
        self.store.reload()?;
        let located = self.locate_file(path)?;
        file::read_text(&mut self.store, located.entry.first_block, located.entry.size)
    }

    /// Append to the file's text. Returns the new declared size.
    pub fn append_file(&mut self, path: &[&str], payload: &[u8]) -> Result<u32> {
        self.store.reload()?;
        let mut located = self.locate_file(path)?;
        let size = file::append(
            &mut self.store,
            located.entry.first_block,
            located.entry.size,
            payload,
        )?;
        located.set_size(&mut self.store, size)?;
        Ok(size)
    }

    pub fn free_clusters(&mut self) -> Result<usize> {
        self.store.reload()?;
        Ok(self.store.table().free_data_clusters())
    }

    pub fn used_clusters(&mut self) -> Result<usize> {
        self.store.reload()?;
        Ok(self.store.table().used_data_clusters())
    }

    /// Walk the whole tree and verify it against the allocation table.
    pub fn check(&mut self) -> Result<CheckReport> {
        self.store.reload()?;
        check::check(&mut self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn fresh() -> Volume<MemDisk> {
        Volume::create(MemDisk::new()).unwrap()
    }

    #[test]
    fn components_skip_empty_segments() {
        assert_eq!(components("/docs//a.txt/"), vec!["docs", "a.txt"]);
        assert!(components("/").is_empty());
    }

    #[test]
    fn walkthrough_scenario() {
        let mut v = fresh();
        assert!(matches!(v.create_file(&["docs", "a.txt"]), Err(FsError::NotFound(_))));

        let before = v.used_clusters().unwrap();
        v.make_directory(&["docs"]).unwrap();
        assert_eq!(v.used_clusters().unwrap(), before + 1);

        v.create_file(&["docs", "a.txt"]).unwrap();
        assert_eq!(v.overwrite_file(&["docs", "a.txt"], b"hello").unwrap(), 1024);
        assert_eq!(v.read_file(&["docs", "a.txt"]).unwrap(), b"hello");
        assert_eq!(v.append_file(&["docs", "a.txt"], b"!").unwrap(), 1024);
        assert_eq!(v.read_file(&["docs", "a.txt"]).unwrap(), b"hello!");
        assert_eq!(v.stat(&["docs", "a.txt"]).unwrap().size, 1024);
    }

    #[test]
    fn exhaustion_scenario() {
        let mut v = fresh();
        v.create_file(&["big"]).unwrap();
        v.create_file(&["filler"]).unwrap();
        v.overwrite_file(&["big"], b"x").unwrap();

        let free = v.free_clusters().unwrap();
        let filler = vec![b'f'; free * CLUSTER_SIZE + CLUSTER_SIZE];
        assert_eq!(v.overwrite_file(&["filler"], &filler).unwrap() as usize, filler.len());
        assert_eq!(v.free_clusters().unwrap(), 0);

        let err = v.overwrite_file(&["big"], &vec![b'b'; 3000]).unwrap_err();
        assert!(matches!(err, FsError::DiskFull));
        assert_eq!(v.stat(&["big"]).unwrap().size, 1024);
        assert_eq!(v.read_file(&["big"]).unwrap(), b"");
        assert_eq!(v.free_clusters().unwrap(), 0);
        assert!(v.check().unwrap().leaked.is_empty());
    }

    #[test]
    fn size_grows_with_content() {
        let mut v = fresh();
        v.create_file(&["f"]).unwrap();
        v.overwrite_file(&["f"], &vec![b'a'; 1000]).unwrap();
        assert_eq!(v.append_file(&["f"], &vec![b'b'; 100]).unwrap(), 2048);
        assert_eq!(v.stat(&["f"]).unwrap().size, 2048);
        assert_eq!(v.read_file(&["f"]).unwrap().len(), 1100);
    }

    #[test]
    fn appends_match_single_overwrite() {
        let mut v = fresh();
        v.create_file(&["a"]).unwrap();
        v.create_file(&["b"]).unwrap();
        let p1 = vec![b'1'; 1500];
        let p2 = vec![b'2'; 900];
        v.overwrite_file(&["a"], b"").unwrap();
        v.append_file(&["a"], &p1).unwrap();
        v.append_file(&["a"], &p2).unwrap();
        let joined = [p1, p2].concat();
        v.overwrite_file(&["b"], &joined).unwrap();
        assert_eq!(v.read_file(&["a"]).unwrap(), v.read_file(&["b"]).unwrap());
        assert_eq!(v.stat(&["a"]).unwrap().size, v.stat(&["b"]).unwrap().size);
    }

    #[test]
    fn removing_a_file_frees_its_chain() {
        let mut v = fresh();
        let before = v.free_clusters().unwrap();
        v.create_file(&["f"]).unwrap();
        v.overwrite_file(&["f"], &vec![b'z'; 5000]).unwrap();
        assert_eq!(v.free_clusters().unwrap(), before - 5);
        v.remove(&["f"]).unwrap();
        assert_eq!(v.free_clusters().unwrap(), before);
        assert!(matches!(v.stat(&["f"]), Err(FsError::NotFound(_))));
        assert!(v.list(&[]).unwrap().is_empty());
    }

    #[test]
    fn removed_name_can_be_reused() {
        let mut v = fresh();
        v.create_file(&["f"]).unwrap();
        v.remove(&["f"]).unwrap();
        v.make_directory(&["f"]).unwrap();
        assert!(v.stat(&["f"]).unwrap().is_dir());
    }

    #[test]
    fn non_empty_directory_stays() {
        let mut v = fresh();
        v.make_directory(&["d"]).unwrap();
        v.create_file(&["d", "x"]).unwrap();
        let used = v.used_clusters().unwrap();
        assert!(matches!(v.remove(&["d"]), Err(FsError::DirectoryNotEmpty(_))));
        assert_eq!(v.used_clusters().unwrap(), used);
        v.remove(&["d", "x"]).unwrap();
        v.remove(&["d"]).unwrap();
        assert_eq!(v.used_clusters().unwrap(), 0);
    }

    #[test]
    fn root_cannot_be_created_or_removed() {
        let mut v = fresh();
        assert!(matches!(v.make_directory(&[]), Err(FsError::InvalidName(_))));
        assert!(matches!(v.remove(&[]), Err(FsError::InvalidName(_))));
    }

    #[test]
    fn content_operations_reject_directories() {
        let mut v = fresh();
        v.make_directory(&["d"]).unwrap();
        assert!(matches!(v.read_file(&["d"]), Err(FsError::NotAFile(_))));
        assert!(matches!(v.overwrite_file(&["d"], b"x"), Err(FsError::NotAFile(_))));
        assert!(matches!(v.append_file(&[], b"x"), Err(FsError::NotAFile(_))));
    }

    #[test]
    fn list_through_a_file_fails() {
        let mut v = fresh();
        v.create_file(&["f"]).unwrap();
        assert!(matches!(v.list(&["f"]), Err(FsError::NotADirectory(_))));
        assert!(matches!(v.list(&["nope"]), Err(FsError::NotFound(_))));
    }

    #[test]
    fn stat_root_is_synthetic_directory() {
        let mut v = fresh();
        let root = v.stat(&[]).unwrap();
        assert!(root.is_dir());
        assert_eq!(root.first_block, ROOT_CLUSTER);
    }

    #[test]
    fn format_clears_everything() {
        let mut v = fresh();
        v.make_directory(&["d"]).unwrap();
        v.format().unwrap();
        assert!(v.list(&[]).unwrap().is_empty());
        assert_eq!(v.used_clusters().unwrap(), 0);
    }

    #[test]
    fn operations_see_changes_made_through_another_handle() {
        let mut a = fresh();
        a.make_directory(&["shared"]).unwrap();
        let mut b = Volume::open(a.into_disk()).unwrap();
        b.create_file(&["shared", "f"]).unwrap();
        assert_eq!(b.list(&["shared"]).unwrap().names(), vec!["f"]);
    }
}
