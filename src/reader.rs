use crate::frozen::{FrozenStore, LiveLids, RawMetaData};
use crate::gid::{GlobalId, Lid};
use crate::mapper::GidToLidMapper;
use crate::state::{Generation, INACTIVE_GENERATION, ReaderSlot, SharedState};
use crate::sync::{Arc, AtomicUsize, Cell, Ordering};

/// A reader thread's handle on the document meta store.
///
/// Each reader thread should create exactly one `MetaStoreReader` via
/// `DocumentMetaStore::register_reader()`. It is `!Sync` (due to `Cell`) and
/// must be stored per-thread.
///
/// The reader is used to:
/// - Pin the current snapshot via [`acquire_guard`](MetaStoreReader::acquire_guard).
/// - Build a [`GidToLidMapper`] over a freshly pinned snapshot.
///
/// 读者线程对文档元数据存储的句柄。
/// 每个读者线程应该通过 `DocumentMetaStore::register_reader()` 创建恰好一个 `MetaStoreReader`。
/// 它是 `!Sync` 的（因为 `Cell`），必须在每个线程中存储。
pub struct MetaStoreReader {
    slot: Arc<ReaderSlot>,
    shared: Arc<SharedState>,
    pin_count: Cell<usize>,
}

impl MetaStoreReader {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        let slot = Arc::new(ReaderSlot {
            active_generation: AtomicUsize::new(INACTIVE_GENERATION),
        });

        shared.readers.lock().push(Arc::clone(&slot));

        MetaStoreReader {
            slot,
            shared,
            pin_count: Cell::new(0),
        }
    }

    /// Pin the current generation and capture its snapshot.
    ///
    /// Never fails and never waits for the writer. The returned guard sees
    /// every commit that completed before this call and nothing committed
    /// after it.
    ///
    /// **Reentrancy**: nested calls and [`ReadGuard::clone`] share one pin.
    /// The reader stays pinned at the generation of the first guard until
    /// every guard is dropped; later guards still capture the newest snapshot.
    ///
    /// 钉住当前代数并捕获其快照。永远不会失败，也不会等待写入者。
    /// **可重入性**：嵌套调用和 `ReadGuard::clone` 共享一个钉住，
    /// 读者在所有守卫被 drop 之前保持钉住在第一个守卫的代数。
    pub fn acquire_guard(&self) -> ReadGuard<'_> {
        let pin_count = self.pin_count.get();

        if pin_count == 0 {
            loop {
                let current = self.shared.generation.load(Ordering::SeqCst);
                self.slot
                    .active_generation
                    .store(current, Ordering::SeqCst);

                // A collection that scanned before our store may already have
                // published a newer minimum; re-pin at a newer generation.
                let min_active = self.shared.min_active_generation.load(Ordering::SeqCst);
                if current >= min_active {
                    break;
                }
                std::hint::spin_loop();
            }
        }

        self.pin_count.set(pin_count + 1);

        // SAFETY: the slot is published above (or by an outer guard) and this
        // guard keeps it pinned for as long as `frozen` is reachable.
        let frozen = unsafe { self.shared.root.load_pinned() };

        ReadGuard {
            reader: self,
            frozen,
        }
    }

    /// Pin the current snapshot and wrap it in a mapper.
    #[inline]
    pub fn gid_to_lid_mapper(&self) -> GidToLidMapper<'_> {
        GidToLidMapper::new(self.acquire_guard())
    }

    /// Whether any guard from this reader is alive.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count.get() > 0
    }
}

impl std::fmt::Debug for MetaStoreReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaStoreReader")
            .field("pin_count", &self.pin_count.get())
            .finish_non_exhaustive()
    }
}

/// A guard pinning one snapshot of the document meta store.
///
/// `ReadGuard` is obtained from [`MetaStoreReader::acquire_guard`]. It is
/// `!Send` and `!Sync` because it references a `!Sync` reader, and its
/// lifetime is bound to that reader.
///
/// While a guard is held, the writer retains the snapshot it captured and any
/// LID freed after it, however many commits follow. The guard also exposes
/// the read interface of that snapshot.
///
/// Clones share the reader's pin count and the captured snapshot; the reader
/// is unpinned when the last one is dropped.
///
/// 钉住文档元数据存储某个快照的守卫。
/// 它是 `!Send` 和 `!Sync` 的，生命周期被绑定到其读者。
/// 持有守卫期间，写入者会保留它捕获的快照以及之后释放的所有 LID。
/// 克隆共享读者的 pin 计数和捕获的快照；最后一个被 drop 时读者解除钉住。
#[must_use]
pub struct ReadGuard<'a> {
    reader: &'a MetaStoreReader,
    // Only handed out re-borrowed through `&self`.
    frozen: &'a FrozenStore,
}

impl ReadGuard<'_> {
    /// Generation of the captured snapshot.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.frozen.generation()
    }

    /// LID of `gid` in the captured snapshot.
    #[inline]
    pub fn lookup(&self, gid: &GlobalId) -> Option<Lid> {
        self.frozen.lookup(gid)
    }

    /// Metadata of `lid` in the captured snapshot (reverse lookup).
    #[inline]
    pub fn raw_meta_data(&self, lid: Lid) -> Option<&RawMetaData> {
        self.frozen.raw_meta_data(lid)
    }

    /// Live LIDs of the captured snapshot, ascending.
    #[inline]
    pub fn frozen_lids(&self) -> LiveLids<'_> {
        self.frozen.live_lids()
    }

    /// Number of live LIDs in the captured snapshot.
    #[inline]
    pub fn num_live(&self) -> usize {
        self.frozen.num_live()
    }
}

impl Clone for ReadGuard<'_> {
    #[inline]
    fn clone(&self) -> Self {
        let pin_count = self.reader.pin_count.get();

        assert!(
            pin_count > 0,
            "BUG: Cloning a ReadGuard in an unpinned state (pin_count = 0). \
             This indicates incorrect API usage or a library bug."
        );

        self.reader.pin_count.set(pin_count + 1);

        ReadGuard {
            reader: self.reader,
            frozen: self.frozen,
        }
    }
}

impl Drop for ReadGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        let pin_count = self.reader.pin_count.get();

        assert!(
            pin_count > 0,
            "BUG: Dropping a ReadGuard in an unpinned state (pin_count = 0). \
             This indicates incorrect API usage or a library bug."
        );

        if pin_count == 1 {
            self.reader
                .slot
                .active_generation
                .store(INACTIVE_GENERATION, Ordering::Release);
        }

        self.reader.pin_count.set(pin_count - 1);
    }
}

impl std::fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadGuard")
            .field("generation", &self.generation())
            .field("num_live", &self.num_live())
            .finish()
    }
}
