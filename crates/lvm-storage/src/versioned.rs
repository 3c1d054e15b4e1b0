//! Versioned commit adapter
//!
//! Tree versions normally run one ahead of block height. At
//! [`STUTTER_HEIGHT`] the chain saved [`STUTTER_BY`] extra versions, and every
//! replay must do the same to land on identical version numbers.

use lvm_primitives::{BlockHeight, Word256};
use tracing::info;

use crate::error::StorageResult;

/// Height at which extra saves are performed
pub const STUTTER_HEIGHT: BlockHeight = 480_000;

/// Number of extra saves at [`STUTTER_HEIGHT`]
pub const STUTTER_BY: u64 = 2;

/// Version of the tree after committing height 0
pub const VERSION_OFFSET: u64 = 1;

/// A tree that can persist its working state as a new numbered version
pub trait VersionedTree: Send + Sync {
    /// Persist the working state, returning the root hash and new version
    fn save(&self) -> StorageResult<(Word256, u64)>;

    /// Latest saved version
    fn version(&self) -> u64;
}

/// Save `tree` for the block at `height`, repeating at the stutter height
pub fn stutter_save(tree: &dyn VersionedTree, height: BlockHeight) -> StorageResult<(Word256, u64)> {
    let saves = if height == STUTTER_HEIGHT { 1 + STUTTER_BY } else { 1 };
    if saves > 1 {
        info!(height, saves, "realigning tree version at stutter height");
    }
    let mut last = tree.save()?;
    for _ in 1..saves {
        last = tree.save()?;
    }
    Ok(last)
}

/// Expected tree version once the block at `height` is committed
pub fn version_at_height(height: BlockHeight) -> u64 {
    let version = height.saturating_add(VERSION_OFFSET);
    if height >= STUTTER_HEIGHT {
        version.saturating_add(STUTTER_BY)
    } else {
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKvStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_version_at_height_around_stutter() {
        assert_eq!(version_at_height(0), VERSION_OFFSET);
        assert_eq!(version_at_height(479_999), 479_999 + VERSION_OFFSET);
        assert_eq!(version_at_height(480_000), 480_000 + VERSION_OFFSET + 2);
        assert_eq!(version_at_height(500_000), 500_000 + VERSION_OFFSET + 2);
    }

    #[test]
    fn test_version_at_height_saturates() {
        assert_eq!(version_at_height(u64::MAX), u64::MAX);
        assert_eq!(version_at_height(u64::MAX - 2), u64::MAX);
    }

    #[test]
    fn test_stutter_save_once_below_threshold() {
        let tree = MemoryKvStore::new();
        let (_, version) = stutter_save(&tree, 479_999).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_stutter_save_repeats_at_threshold_only() {
        let tree = MemoryKvStore::new();
        let (_, version) = stutter_save(&tree, STUTTER_HEIGHT).unwrap();
        assert_eq!(version, 3);
        let (_, version) = stutter_save(&tree, STUTTER_HEIGHT + 1).unwrap();
        assert_eq!(version, 4);
    }

    struct CountingTree(AtomicU64);

    impl VersionedTree for CountingTree {
        fn save(&self) -> StorageResult<(Word256, u64)> {
            let v = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((Word256::from_u64(v), v))
        }

        fn version(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_replay_matches_version_at_height() {
        let first = STUTTER_HEIGHT - 3;
        let tree = CountingTree(AtomicU64::new(version_at_height(first - 1)));
        for height in first..STUTTER_HEIGHT + 3 {
            let (_, version) = stutter_save(&tree, height).unwrap();
            assert_eq!(version, version_at_height(height), "height {}", height);
            assert_eq!(tree.version(), version);
        }
    }
}
