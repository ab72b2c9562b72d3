use crate::frozen::FrozenStore;
use crate::garbage::GarbageSet;
use crate::gid::Lid;
use crate::ptr::GenerationPtr;
use crate::sync::{Arc, AtomicUsize, Mutex};
use std::vec::Vec;

/// Generation number of a published snapshot.
///
/// Starts at `0` for the empty store and advances by one on every commit.
///
/// 已发布快照的代数。空存储从 `0` 开始，每次提交加一。
pub type Generation = usize;

/// Default threshold for automatic reclamation (count of retired snapshots).
pub(crate) const AUTO_RECLAIM_THRESHOLD: usize = 64;

/// Default interval for cleaning up slots of dropped readers (in collection cycles).
pub(crate) const DEFAULT_CLEANUP_INTERVAL: usize = 16;

/// Default lag (in generations) after which a pinned reader is reported as stale.
pub(crate) const DEFAULT_STALE_READER_LAG: usize = 1024;

/// Default number of LID slots per metadata segment.
pub(crate) const DEFAULT_SEGMENT_SIZE: usize = 256;

/// Default number of GID index buckets.
pub(crate) const DEFAULT_BUCKET_COUNT: usize = 64;

/// Default highest assignable LID. One below `Lid::MAX` so `lid + 1` never overflows.
pub(crate) const DEFAULT_MAX_LID: Lid = Lid::MAX - 1;

/// Marks a reader that is not currently pinned to any generation.
pub(crate) const INACTIVE_GENERATION: usize = usize::MAX;

/// A slot allocated for a reader thread to record its pinned generation.
///
/// Cache-aligned to prevent false sharing between readers.
///
/// 为读者线程分配的槽，用于记录其钉住的代数。
/// 缓存对齐以防止读者之间的伪共享。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct ReaderSlot {
    /// The generation the reader is pinned to, or `INACTIVE_GENERATION`.
    pub(crate) active_generation: AtomicUsize,
}

/// State shared by the writer, the store handles and every registered reader.
///
/// The published root and the retired snapshots live here rather than in the
/// writer, so they outlive the writer for as long as any reader exists.
///
/// 写入者、存储句柄和所有读者共享的状态。
/// 已发布的根和已退休的快照存放在这里，只要还有读者存在就不会被释放。
#[repr(align(64))]
pub(crate) struct SharedState {
    /// Generation of the most recently published snapshot. Only the writer advances it.
    pub(crate) generation: AtomicUsize,
    /// Minimum generation pinned by any reader at the last collection.
    pub(crate) min_active_generation: AtomicUsize,
    /// All registered reader slots.
    pub(crate) readers: Mutex<Vec<Arc<ReaderSlot>>>,
    /// The currently published snapshot.
    pub(crate) root: GenerationPtr<FrozenStore>,
    /// Snapshots replaced by a commit, waiting for their readers to unpin.
    pub(crate) garbage: Mutex<GarbageSet<FrozenStore>>,
}

impl SharedState {
    pub(crate) fn new(root: FrozenStore) -> Self {
        Self {
            generation: AtomicUsize::new(root.generation()),
            min_active_generation: AtomicUsize::new(0),
            readers: Mutex::new(Vec::new()),
            root: GenerationPtr::new(root),
            garbage: Mutex::new(GarbageSet::new()),
        }
    }
}
