//! Fixed-offset access to the image: boot marker, allocation table, root
//! directory and data clusters.
//!
//! The table and the root directory are kept resident and written through on
//! every change; every other cluster goes straight to the disk.

use log::{debug, info};

use crate::disk::Disk;
use crate::error::{FsError, Result};
use crate::layout::*;
use crate::table::AllocTable;

pub struct VolumeStore<D> {
    disk:  D,
    table: AllocTable,
    root:  Box<Cluster>,
}

impl<D: Disk> VolumeStore<D> {
    /// Load the table and root directory of an already formatted image.
    pub fn load(disk: D) -> Result<Self> {
        let mut store = Self {
            disk,
            table: AllocTable::formatted(),
            root:  Box::new(ZERO_CLUSTER),
        };
        store.reload()?;
        Ok(store)
    }

    /// Write a fresh volume over `disk` and load it.
    pub fn format(mut disk: D) -> Result<Self> {
        write_layout(&mut disk)?;
        Self::load(disk)
    }

    /// Re-format the image this store is attached to.
    pub fn reformat(&mut self) -> Result<()> {
        write_layout(&mut self.disk)?;
        self.reload()
    }

    /// Refresh the resident table and root directory from the image.
    pub fn reload(&mut self) -> Result<()> {
        if self.disk.len()? < VOLUME_BYTES {
            return Err(FsError::NotFormatted);
        }
        let mut boot = ZERO_CLUSTER;
        self.disk.read_at(cluster_offset(BOOT_CLUSTER), &mut boot)?;
        if boot.iter().any(|&b| b != BOOT_SENTINEL) {
            return Err(FsError::NotFormatted);
        }

        let mut raw = Box::new([0u8; TABLE_BYTES]);
        self.disk.read_at(cluster_offset(TABLE_FIRST_CLUSTER), &mut raw[..])?;
        self.table = AllocTable::from_bytes(&raw);

        self.disk.read_at(cluster_offset(ROOT_CLUSTER), &mut self.root[..])?;
        debug!("loaded volume, {} data clusters in use", self.table.used_data_clusters());
        Ok(())
    }

    pub fn table(&self) -> &AllocTable { &self.table }

    pub fn table_mut(&mut self) -> &mut AllocTable { &mut self.table }

    pub fn disk(&self) -> &D { &self.disk }

    pub fn into_disk(self) -> D { self.disk }

    /// Persist the resident table.
    pub fn write_table(&mut self) -> Result<()> {
        let bytes = self.table.to_bytes();
        self.disk.write_at(cluster_offset(TABLE_FIRST_CLUSTER), &bytes[..])?;
        Ok(())
    }

    pub fn read_cluster(&mut self, index: u16) -> Result<Cluster> {
        if index == ROOT_CLUSTER {
            return Ok(*self.root);
        }
        check_data_cluster(index)?;
        let mut buf = ZERO_CLUSTER;
        self.disk.read_at(cluster_offset(index), &mut buf)?;
        Ok(buf)
    }

    pub fn write_cluster(&mut self, index: u16, data: &Cluster) -> Result<()> {
        if index != ROOT_CLUSTER {
            check_data_cluster(index)?;
        }
        self.disk.write_at(cluster_offset(index), data)?;
        if index == ROOT_CLUSTER {
            *self.root = *data;
        }
        Ok(())
    }

    /// Write `bytes` at `offset` inside a data cluster, leaving the rest of
    /// the cluster as it is.
    pub fn write_within(&mut self, index: u16, offset: usize, bytes: &[u8]) -> Result<()> {
        check_data_cluster(index)?;
        if offset + bytes.len() > CLUSTER_SIZE {
            return Err(FsError::InvalidCluster(index));
        }
        self.disk.write_at(cluster_offset(index) + offset as u64, bytes)?;
        Ok(())
    }
}

fn check_data_cluster(index: u16) -> Result<()> {
    if is_data_cluster(index) { Ok(()) } else { Err(FsError::InvalidCluster(index)) }
}

/// Lay out an empty volume: sentinel boot cluster, formatted table, zeroed
/// root directory and data region.
fn write_layout<D: Disk>(disk: &mut D) -> Result<()> {
    disk.reset(VOLUME_BYTES)?;
    disk.write_at(cluster_offset(BOOT_CLUSTER), &[BOOT_SENTINEL; CLUSTER_SIZE])?;
    disk.write_at(cluster_offset(TABLE_FIRST_CLUSTER), &AllocTable::formatted().to_bytes()[..])?;
    info!("formatted volume: {NUM_CLUSTERS} clusters of {CLUSTER_SIZE} bytes");
    Ok(())
}
