use crate::error::MetaStoreError;
use crate::frozen::FrozenStore;
use crate::gid::{GlobalId, Lid, NO_LID};
use crate::lid::LidAllocator;
use crate::state::{Generation, INACTIVE_GENERATION, SharedState};
use crate::sync::{Arc, Ordering};

/// The unique writer of a document meta store.
///
/// There is exactly one `MetaStoreWriter` per `DocumentMetaStore`, owned by the
/// writer thread. It is responsible for:
/// - Applying mutations to a private working copy.
/// - Publishing the working copy as the next generation on `commit()`.
/// - Scanning active readers and reclaiming snapshots and LIDs they can no longer see.
///
/// Mutations are invisible to readers until `commit()`. Published snapshots are
/// never modified in place: the working copy shares storage with them and
/// copies a segment or bucket the first time a batch touches it.
///
/// **Thread Safety**: `MetaStoreWriter` is not `Clone` and must be owned by a single thread.
///
/// 文档元数据存储的唯一写入者。
/// 每个 `DocumentMetaStore` 恰好有一个 `MetaStoreWriter`，由写入者线程持有。它负责：
/// - 将修改应用到私有工作副本。
/// - 在 `commit()` 时将工作副本发布为下一代。
/// - 扫描活跃读者并回收它们不再能看到的快照和 LID。
/// 修改在 `commit()` 之前对读者不可见。已发布的快照永远不会被原地修改。
pub struct MetaStoreWriter {
    pub(crate) shared: Arc<SharedState>,
    pub(crate) working: FrozenStore,
    pub(crate) lids: LidAllocator,
    pub(crate) pending_changes: bool,
    pub(crate) auto_reclaim_threshold: Option<usize>,
    pub(crate) collection_counter: usize,
    pub(crate) cleanup_interval: usize,
    pub(crate) stale_reader_lag: Option<usize>,
}

impl MetaStoreWriter {
    /// Map `gid` to the given `lid` in the working copy.
    ///
    /// Re-putting an identical mapping is a no-op. The LID may be one removed
    /// earlier in the same batch, or one still held for pinned readers.
    ///
    /// # Errors
    /// - [`MetaStoreError::InvalidLid`] for `NO_LID`.
    /// - [`MetaStoreError::LidOutOfRange`] above the configured `max_lid`.
    /// - [`MetaStoreError::GidAlreadyMapped`] if `gid` maps to another LID.
    /// - [`MetaStoreError::LidInUse`] if `lid` holds another GID.
    pub fn put(&mut self, gid: GlobalId, lid: Lid) -> Result<(), MetaStoreError> {
        if lid == NO_LID {
            return Err(MetaStoreError::InvalidLid { lid });
        }
        let max_lid = self.lids.max_lid();
        if lid > max_lid {
            return Err(MetaStoreError::LidOutOfRange { lid, max_lid });
        }
        if let Some(existing) = self.working.lookup(&gid) {
            if existing == lid {
                return Ok(());
            }
            return Err(MetaStoreError::GidAlreadyMapped { gid, existing });
        }
        if let Some(meta) = self.working.raw_meta_data(lid) {
            return Err(MetaStoreError::LidInUse {
                lid,
                existing: *meta.gid(),
            });
        }

        self.lids.claim(lid);
        self.working.insert(gid, lid);
        self.pending_changes = true;
        tracing::trace!(target: "gidmap.writer", %gid, lid, "put");
        Ok(())
    }

    /// Map `gid` to a newly allocated LID, or return its existing LID.
    ///
    /// Allocation picks the lowest free LID; LIDs still held for pinned
    /// readers are skipped.
    ///
    /// # Errors
    /// [`MetaStoreError::LidSpaceExhausted`] when no LID is left.
    pub fn insert(&mut self, gid: GlobalId) -> Result<Lid, MetaStoreError> {
        if let Some(lid) = self.working.lookup(&gid) {
            return Ok(lid);
        }

        let lid = self.lids.alloc()?;
        self.working.insert(gid, lid);
        self.pending_changes = true;
        tracing::trace!(target: "gidmap.writer", %gid, lid, "insert");
        Ok(lid)
    }

    /// Remove the mapping of `gid`, returning the LID it held.
    ///
    /// The LID is held until no reader can see the generation it was removed from.
    pub fn remove(&mut self, gid: &GlobalId) -> Option<Lid> {
        let lid = self.working.lookup(gid)?;
        self.remove_lid(lid);
        Some(lid)
    }

    /// Remove the mapping held by `lid`, returning its GID.
    pub fn remove_lid(&mut self, lid: Lid) -> Option<GlobalId> {
        let meta = self.working.remove(lid)?;
        self.lids.release(lid);
        self.pending_changes = true;
        tracing::trace!(target: "gidmap.writer", gid = %meta.gid(), lid, "remove");
        Some(*meta.gid())
    }

    /// LID of `gid` in the working copy, including uncommitted changes.
    #[inline]
    pub fn lookup(&self, gid: &GlobalId) -> Option<Lid> {
        self.working.lookup(gid)
    }

    /// Number of live LIDs in the working copy.
    #[inline]
    pub fn num_live(&self) -> usize {
        self.working.num_live()
    }

    /// Whether the working copy differs from the published snapshot.
    #[inline]
    pub fn has_pending_changes(&self) -> bool {
        self.pending_changes
    }

    /// Generation of the most recently published snapshot.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.shared.generation.load(Ordering::Relaxed)
    }

    /// Number of retired snapshots not yet reclaimed.
    #[inline]
    pub fn retired_count(&self) -> usize {
        self.shared.garbage.lock().len()
    }

    /// Number of removed LIDs not yet reusable by `insert`.
    #[inline]
    pub fn held_lid_count(&self) -> usize {
        self.lids.held_count()
    }

    /// One past the highest LID ever handed out since the last compaction.
    #[inline]
    pub fn lid_limit(&self) -> Lid {
        self.lids.next_lid()
    }

    /// Publish the working copy as the next generation.
    ///
    /// The previous snapshot is retired, not freed: readers pinned to it keep
    /// reading it until they drop their guards. LIDs removed in this batch go
    /// on the hold list.
    ///
    /// **Automatic Reclamation**: if the retired snapshot count exceeds the
    /// configured threshold afterwards, `collect()` runs.
    ///
    /// Returns the new generation.
    ///
    /// 将工作副本发布为下一代。旧快照被退休而不是释放：钉住它的读者在 drop 守卫前继续读取它。
    pub fn commit(&mut self) -> Generation {
        let retired_at = self.shared.generation.load(Ordering::Relaxed);
        let next = retired_at + 1;
        self.working.set_generation(next);

        let retired = {
            let mut garbage = self.shared.garbage.lock();
            self.shared
                .root
                .store(self.working.clone(), &mut garbage, retired_at);
            garbage.len()
        };
        self.lids.hold_pending(retired_at);

        // Advance only after the new root is reachable, so a reader pinned at
        // `next` can never load an older root.
        self.shared.generation.store(next, Ordering::SeqCst);
        self.pending_changes = false;

        tracing::debug!(
            target: "gidmap.commit",
            generation = next,
            live = self.working.num_live(),
            retired,
            "commit"
        );

        if let Some(threshold) = self.auto_reclaim_threshold {
            if retired > threshold {
                self.collect();
            }
        }

        next
    }

    /// Perform a reclamation cycle.
    ///
    /// This method:
    /// 1. Scans all readers to find the minimum pinned generation.
    /// 2. Publishes it so readers pinning concurrently re-pin at a newer one.
    /// 3. Frees retired snapshots and releases held LIDs from older generations.
    ///
    /// With no pinned reader every retired snapshot and held LID is released.
    /// Safe to call at any time, even with nothing to reclaim.
    ///
    /// 执行一个回收周期：扫描所有读者找到最小钉住代数，发布它，
    /// 然后释放更旧代数的已退休快照和被持有的 LID。
    pub fn collect(&mut self) {
        let current = self.shared.generation.load(Ordering::SeqCst);
        let mut min_active = current;
        let mut stale_readers = 0usize;
        self.collection_counter += 1;

        let should_cleanup =
            self.cleanup_interval > 0 && self.collection_counter % self.cleanup_interval == 0;

        let mut shared_readers = self.shared.readers.lock();
        let mut dead_count = 0;

        for slot in shared_readers.iter() {
            let pinned = slot.active_generation.load(Ordering::SeqCst);
            if pinned != INACTIVE_GENERATION {
                min_active = min_active.min(pinned);
                if let Some(lag) = self.stale_reader_lag {
                    if current.saturating_sub(pinned) > lag {
                        stale_readers += 1;
                    }
                }
            } else if should_cleanup && Arc::strong_count(slot) == 1 {
                // Only this Vec holds a reference, the MetaStoreReader was dropped
                dead_count += 1;
            }
        }

        if should_cleanup && dead_count > 0 {
            shared_readers.retain(|slot| Arc::strong_count(slot) > 1);
        }
        let registered = shared_readers.len();
        drop(shared_readers);

        self.shared
            .min_active_generation
            .store(min_active, Ordering::SeqCst);

        let (reclaimed, retained, oldest_retained) = {
            let mut garbage = self.shared.garbage.lock();
            let reclaimed = garbage.collect(min_active);
            (reclaimed, garbage.len(), garbage.oldest_generation())
        };
        let freed_lids = self.lids.reclaim(min_active);

        if stale_readers > 0 {
            tracing::warn!(
                target: "gidmap.collect",
                stale_readers,
                min_active,
                current,
                ?oldest_retained,
                "readers pinned far behind the current generation are retaining snapshots"
            );
        }
        tracing::debug!(
            target: "gidmap.collect",
            min_active,
            current,
            reclaimed,
            retained,
            freed_lids,
            registered,
            dead_readers = dead_count,
            "collect"
        );
    }

    /// Shrink the working copy's LID space to just past its highest live LID.
    ///
    /// Free and held LIDs above the new limit are forgotten and metadata
    /// segments above it are dropped. Published snapshots keep their own
    /// segments, so readers pinned to them are unaffected. Takes effect for
    /// readers on the next `commit()`; a compaction that changes nothing
    /// leaves `has_pending_changes()` as it was.
    ///
    /// Returns the new LID limit.
    pub fn compact_lid_space(&mut self) -> Lid {
        let lid_limit = self
            .working
            .highest_live_lid()
            .map_or(NO_LID + 1, |lid| lid.saturating_add(1));
        let capacity_before = self.working.capacity();
        let lid_limit_before = self.lids.next_lid();

        self.working.truncate(lid_limit);
        self.lids.shrink(lid_limit);

        let capacity_after = self.working.capacity();
        if lid_limit < lid_limit_before || capacity_after < capacity_before {
            self.pending_changes = true;
        }

        tracing::debug!(
            target: "gidmap.compact",
            lid_limit,
            capacity_before,
            capacity_after,
            "compact lid space"
        );
        lid_limit
    }
}

impl std::fmt::Debug for MetaStoreWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaStoreWriter")
            .field("generation", &self.generation())
            .field("num_live", &self.num_live())
            .field("pending_changes", &self.pending_changes)
            .finish_non_exhaustive()
    }
}
