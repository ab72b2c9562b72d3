use crate::frozen::FrozenStore;
use crate::gid::{Lid, NO_LID};
use crate::lid::LidAllocator;
use crate::reader::MetaStoreReader;
use crate::state::{
    AUTO_RECLAIM_THRESHOLD, DEFAULT_BUCKET_COUNT, DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_LID,
    DEFAULT_SEGMENT_SIZE, DEFAULT_STALE_READER_LAG, Generation, SharedState,
};
use crate::sync::{Arc, Ordering};
use crate::writer::MetaStoreWriter;

/// Builder for configuring a `DocumentMetaStore`.
///
/// Use this builder to customize reclamation and storage layout:
/// - `auto_reclaim_threshold`: retired snapshot count that triggers collection on commit
/// - `cleanup_interval`: how often to drop slots of dropped readers
/// - `stale_reader_lag`: generations a reader may lag before it is reported
/// - `segment_size`: LID slots per metadata segment
/// - `bucket_count`: shards of the GID index
/// - `max_lid`: highest LID `put` accepts and `insert` hands out
///
/// # Example
/// ```
/// use gidmap::DocumentMetaStore;
///
/// let (writer, store) = DocumentMetaStore::builder()
///     .auto_reclaim_threshold(128)
///     .cleanup_interval(32)
///     .segment_size(1024)
///     .build();
/// ```
///
/// 用于配置 `DocumentMetaStore` 的构建器。
#[derive(Debug, Clone)]
pub struct DocumentMetaStoreBuilder {
    auto_reclaim_threshold: Option<usize>,
    cleanup_interval: usize,
    stale_reader_lag: Option<usize>,
    segment_size: usize,
    bucket_count: usize,
    max_lid: Lid,
}

impl DocumentMetaStoreBuilder {
    /// Create a new builder with default settings.
    /// 创建一个带有默认设置的新构建器。
    #[inline]
    pub fn new() -> Self {
        Self {
            auto_reclaim_threshold: Some(AUTO_RECLAIM_THRESHOLD),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            stale_reader_lag: Some(DEFAULT_STALE_READER_LAG),
            segment_size: DEFAULT_SEGMENT_SIZE,
            bucket_count: DEFAULT_BUCKET_COUNT,
            max_lid: DEFAULT_MAX_LID,
        }
    }

    /// Set the automatic reclamation threshold.
    ///
    /// When the number of retired snapshots exceeds this threshold after a
    /// commit, `collect()` is called automatically.
    /// Pass `None` to disable automatic reclamation.
    ///
    /// Default: `Some(64)`
    ///
    /// 设置自动回收阈值。传递 `None` 可禁用自动回收。
    #[inline]
    pub fn auto_reclaim_threshold(mut self, threshold: impl Into<Option<usize>>) -> Self {
        self.auto_reclaim_threshold = threshold.into();
        self
    }

    /// Set the cleanup interval for slots of dropped readers.
    ///
    /// Set to `0` to disable periodic cleanup (not recommended).
    ///
    /// Default: `16`
    #[inline]
    pub fn cleanup_interval(mut self, interval: usize) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Warn when a pinned reader lags the current generation by more than
    /// `lag` generations. Pass `None` to disable.
    ///
    /// Default: `Some(1024)`
    #[inline]
    pub fn stale_reader_lag(mut self, lag: impl Into<Option<usize>>) -> Self {
        self.stale_reader_lag = lag.into();
        self
    }

    /// Number of LID slots per metadata segment, the copy-on-write unit of
    /// the reverse index. Clamped to at least 1.
    ///
    /// Default: `256`
    #[inline]
    pub fn segment_size(mut self, size: usize) -> Self {
        self.segment_size = size.max(1);
        self
    }

    /// Number of GID index buckets, the copy-on-write unit of the forward
    /// index. Clamped to at least 1.
    ///
    /// Default: `64`
    #[inline]
    pub fn bucket_count(mut self, count: usize) -> Self {
        self.bucket_count = count.max(1);
        self
    }

    /// Highest LID the writer may assign. `put` above it fails with
    /// `LidOutOfRange`; `insert` reports `LidSpaceExhausted` once every LID up
    /// to it is live. Clamped to `1..=Lid::MAX - 1`.
    ///
    /// Default: `Lid::MAX - 1`
    #[inline]
    pub fn max_lid(mut self, max_lid: Lid) -> Self {
        self.max_lid = max_lid.clamp(NO_LID + 1, DEFAULT_MAX_LID);
        self
    }

    /// Build the store with the configured settings.
    ///
    /// Returns both the unique `MetaStoreWriter` and the `DocumentMetaStore`.
    ///
    /// 使用配置的设置构建存储。返回唯一的 `MetaStoreWriter` 和 `DocumentMetaStore`。
    pub fn build(self) -> (MetaStoreWriter, DocumentMetaStore) {
        let empty = FrozenStore::new(self.segment_size, self.bucket_count);
        let shared = Arc::new(SharedState::new(empty.clone()));

        let writer = MetaStoreWriter {
            shared: shared.clone(),
            working: empty,
            lids: LidAllocator::new(self.max_lid),
            pending_changes: false,
            auto_reclaim_threshold: self.auto_reclaim_threshold,
            collection_counter: 0,
            cleanup_interval: self.cleanup_interval,
            stale_reader_lag: self.stale_reader_lag,
        };

        (writer, DocumentMetaStore { shared })
    }
}

impl Default for DocumentMetaStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A document meta store holding the GID/LID association of one document set.
///
/// `DocumentMetaStore` is the reader-facing side of the store. It manages:
/// - The published snapshot and its generation.
/// - Registration of reader threads.
///
/// The single writer is created together with it, so the type system enforces
/// one `MetaStoreWriter` per store.
///
/// `DocumentMetaStore` is `Clone` and can be shared across threads; each
/// thread registers its own [`MetaStoreReader`].
///
/// **Typical Usage**:
/// ```
/// use gidmap::{DocumentMetaStore, GlobalId};
///
/// // Writer thread: create the store and keep the writer
/// let (mut writer, store) = DocumentMetaStore::new();
/// let lid = writer.insert(GlobalId::new([1; 12])).unwrap();
/// writer.commit();
///
/// // Reader threads: register, then pin snapshots
/// let reader = store.register_reader();
/// let mapper = reader.gid_to_lid_mapper();
/// assert_eq!(mapper.map_gid_to_lid(&GlobalId::new([1; 12])), lid);
/// ```
///
/// 文档元数据存储，保存一个文档集合的 GID/LID 关联。
/// `DocumentMetaStore` 是存储面向读者的一侧，是 `Clone` 的，可以在线程间共享；
/// 每个线程注册自己的 `MetaStoreReader`。
#[derive(Clone)]
pub struct DocumentMetaStore {
    shared: Arc<SharedState>,
}

impl DocumentMetaStore {
    /// Create an empty store with default settings.
    /// Returns both the MetaStoreWriter and the DocumentMetaStore.
    /// 创建一个带有默认设置的空存储。
    #[inline]
    pub fn new() -> (MetaStoreWriter, Self) {
        Self::builder().build()
    }

    /// Create a builder for configuring the store.
    #[inline]
    pub fn builder() -> DocumentMetaStoreBuilder {
        DocumentMetaStoreBuilder::new()
    }

    /// Register a new reader for the current thread.
    ///
    /// The caller is responsible for ensuring that each `MetaStoreReader` is
    /// used by only one thread.
    ///
    /// 为当前线程注册一个新的读者。
    #[inline]
    pub fn register_reader(&self) -> MetaStoreReader {
        MetaStoreReader::new(self.shared.clone())
    }

    /// Generation of the most recently published snapshot.
    #[inline]
    pub fn current_generation(&self) -> Generation {
        self.shared.generation.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for DocumentMetaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentMetaStore")
            .field("current_generation", &self.current_generation())
            .finish_non_exhaustive()
    }
}
