// Fixed geometry of the volume image. Every offset in the image is derived
// from these values; nothing is read from a header.

pub const SECTOR_SIZE:         usize = 512;
pub const CLUSTER_SIZE:        usize = 2 * SECTOR_SIZE;
pub const NUM_CLUSTERS:        usize = 4096;

pub const DIR_ENTRY_SIZE:      usize = 32;
pub const ENTRIES_PER_CLUSTER: usize = CLUSTER_SIZE / DIR_ENTRY_SIZE;
pub const NAME_FIELD_LEN:      usize = 18;
pub const MAX_NAME_LEN:        usize = NAME_FIELD_LEN - 1;

pub const BOOT_CLUSTER:        u16 = 0;
pub const TABLE_FIRST_CLUSTER: u16 = 1;
pub const TABLE_CLUSTERS:      usize = 8;
pub const ROOT_CLUSTER:        u16 = 9;
pub const DATA_START:          u16 = 10;
pub const DATA_CLUSTERS:       usize = NUM_CLUSTERS - DATA_START as usize;

/// Byte every position of the boot cluster is filled with.
pub const BOOT_SENTINEL:       u8 = 0xBB;

// Raw allocation-table markers.
pub const FAT_FREE:            u16 = 0x0000;
pub const FAT_RESERVED_BOOT:   u16 = 0xFFFD;
pub const FAT_RESERVED_TABLE:  u16 = 0xFFFE;
pub const FAT_END_OF_CHAIN:    u16 = 0xFFFF;

pub const TABLE_BYTES:         usize = NUM_CLUSTERS * 2;
pub const VOLUME_BYTES:        u64 = (NUM_CLUSTERS * CLUSTER_SIZE) as u64;

pub type Cluster = [u8; CLUSTER_SIZE];

pub const ZERO_CLUSTER: Cluster = [0u8; CLUSTER_SIZE];

pub fn cluster_offset(index: u16) -> u64 {
    index as u64 * CLUSTER_SIZE as u64
}

pub fn is_data_cluster(index: u16) -> bool {
    index >= DATA_START && (index as usize) < NUM_CLUSTERS
}

/// Number of clusters needed to hold `len` bytes.
pub fn clusters_for(len: usize) -> usize {
    len.div_ceil(CLUSTER_SIZE)
}

/// Length of the null-terminated prefix of `bytes` (the whole slice if no NUL).
pub fn text_len(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_fills_its_clusters_exactly() {
        assert_eq!(TABLE_BYTES, TABLE_CLUSTERS * CLUSTER_SIZE);
        assert_eq!(TABLE_FIRST_CLUSTER as usize + TABLE_CLUSTERS, ROOT_CLUSTER as usize);
    }

    #[test]
    fn root_and_data_offsets() {
        assert_eq!(cluster_offset(ROOT_CLUSTER), 9216);
        assert_eq!(cluster_offset(DATA_START), 10240);
        assert_eq!(DATA_CLUSTERS, 4086);
        assert_eq!(ENTRIES_PER_CLUSTER, 32);
    }

    #[test]
    fn clusters_for_rounds_up() {
        assert_eq!(clusters_for(0), 0);
        assert_eq!(clusters_for(1), 1);
        assert_eq!(clusters_for(1024), 1);
        assert_eq!(clusters_for(1025), 2);
    }

    #[test]
    fn text_len_stops_at_nul() {
        assert_eq!(text_len(b"abc\0def"), 3);
        assert_eq!(text_len(b"abc"), 3);
        assert_eq!(text_len(b"\0"), 0);
    }

    #[test]
    fn data_region_bounds() {
        assert!(!is_data_cluster(ROOT_CLUSTER));
        assert!(is_data_cluster(DATA_START));
        assert!(is_data_cluster(4095));
        assert!(!is_data_cluster(4096));
    }
}
