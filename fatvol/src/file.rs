//! File content over a cluster chain.
//!
//! Content is null-terminated text. A file's declared size is the capacity of
//! its chain (clusters × 1024); the logical length is the offset of the first
//! NUL within that capacity.

use log::{debug, warn};

use crate::disk::Disk;
use crate::error::{FsError, Result};
use crate::layout::*;
use crate::store::VolumeStore;

/// Bytes of `payload` that make up its text: everything before the first NUL.
fn text(payload: &[u8]) -> &[u8] {
    &payload[..text_len(payload)]
}

/// Write `data` across `clusters`, zero-padding the last one.
fn write_chain<D: Disk>(store: &mut VolumeStore<D>, clusters: &[u16], data: &[u8]) -> Result<()> {
    let mut chunks = data.chunks(CLUSTER_SIZE);
    for &c in clusters {
        let mut buf = ZERO_CLUSTER;
        if let Some(chunk) = chunks.next() {
            buf[..chunk.len()].copy_from_slice(chunk);
        }
        store.write_cluster(c, &buf)?;
    }
    Ok(())
}

/// Replace the content of the chain headed by `first` with `payload`.
///
/// The head index is kept; every other cluster of the old chain is released
/// before the new chain is allocated. Returns the new declared size.
pub fn overwrite<D: Disk>(store: &mut VolumeStore<D>, first: u16, payload: &[u8]) -> Result<u32> {
    let payload = text(payload);
    let needed = clusters_for(payload.len()).max(1);

    store.table().chain(first)?;
    store.table_mut().truncate_after(first)?;

    let added = match store.table_mut().extend(first, needed - 1) {
        Ok(added) => added,
        Err(FsError::DiskFull) => {
            warn!("overwrite of chain {first} needs {needed} clusters, disk full");
            store.write_cluster(first, &ZERO_CLUSTER)?;
            store.write_table()?;
            return Err(FsError::DiskFull);
        }
        Err(e) => return Err(e),
    };

    let mut clusters = Vec::with_capacity(needed);
    clusters.push(first);
    clusters.extend(added);
    write_chain(store, &clusters, payload)?;
    store.write_table()?;
    debug!("wrote {} bytes over {needed} clusters from {first}", payload.len());
    Ok((needed * CLUSTER_SIZE) as u32)
}

/// Raw content of the first `declared / 1024` clusters of the chain,
/// zero padding included.
pub fn read<D: Disk>(store: &mut VolumeStore<D>, first: u16, declared: u32) -> Result<Vec<u8>> {
    let count = declared as usize / CLUSTER_SIZE;
    let chain = store.table().chain(first)?;
    if chain.len() < count {
        warn!("chain {first} holds {} clusters, record declares {count}", chain.len());
        return Err(FsError::CorruptChain { cluster: chain[chain.len() - 1] });
    }
    let mut out = Vec::with_capacity(count * CLUSTER_SIZE);
    for &c in &chain[..count] {
        out.extend_from_slice(&store.read_cluster(c)?);
    }
    Ok(out)
}

/// Logical text of the chain: `read` cut at the first NUL.
pub fn read_text<D: Disk>(store: &mut VolumeStore<D>, first: u16, declared: u32) -> Result<Vec<u8>> {
    let mut out = read(store, first, declared)?;
    out.truncate(text_len(&out));
    Ok(out)
}

/// Append `payload` after the current text of the chain headed by `first`.
/// Returns the new declared size, unchanged when the tail slack absorbs it.
pub fn append<D: Disk>(
    store: &mut VolumeStore<D>,
    first: u16,
    declared: u32,
    payload: &[u8],
) -> Result<u32> {
    let mut payload = text(payload);
    if payload.is_empty() {
        return Ok(declared);
    }

    let chain = store.table().chain(first)?;
    let last = chain[chain.len() - 1];
    let tail = store.read_cluster(last)?;
    let len_final = text_len(&tail);

    let new_blocks = if len_final == CLUSTER_SIZE {
        clusters_for(payload.len())
    } else {
        clusters_for(payload.len() + len_final) - 1
    };

    let added = match store.table_mut().extend(last, new_blocks) {
        Ok(added) => added,
        Err(FsError::DiskFull) => {
            warn!("append to chain {first} needs {new_blocks} clusters, disk full");
            return Err(FsError::DiskFull);
        }
        Err(e) => return Err(e),
    };

    if len_final < CLUSTER_SIZE {
        let room = CLUSTER_SIZE - len_final;
        let (head, rest) = payload.split_at(payload.len().min(room));
        store.write_within(last, len_final, head)?;
        payload = rest;
        if payload.is_empty() && added.is_empty() {
            debug!("appended {} bytes into slack of cluster {last}", head.len());
            return Ok(declared);
        }
    }

    write_chain(store, &added, payload)?;
    store.write_table()?;
    debug!("appended over {new_blocks} new clusters after {last}");
    Ok(declared + (new_blocks * CLUSTER_SIZE) as u32)
}
