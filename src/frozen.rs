//! Copy-on-write snapshot storage for the document meta store.
//!
//! A [`FrozenStore`] holds both directions of the GID/LID association:
//!
//! - a GID index sharded into buckets (`BTreeMap<GlobalId, Lid>`),
//! - per-LID metadata in fixed-size segments, keyed by segment index so an
//!   unused stretch of the LID space costs nothing.
//!
//! Buckets and segments are reference counted. The writer mutates its working
//! copy through `Arc::make_mut`, so a commit only copies what the batch
//! touched, and every published snapshot keeps the segments it was built from.

use crate::gid::{GlobalId, Lid, NO_LID};
use crate::state::Generation;
use std::collections::BTreeMap;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Metadata recorded for a live LID.
///
/// 为存活 LID 记录的元数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMetaData {
    gid: GlobalId,
}

impl RawMetaData {
    #[inline]
    pub(crate) fn new(gid: GlobalId) -> Self {
        Self { gid }
    }

    /// The GID the LID was assigned to.
    #[inline]
    pub fn gid(&self) -> &GlobalId {
        &self.gid
    }
}

type GidBucket = BTreeMap<GlobalId, Lid>;
type MetaSegment = Vec<Option<RawMetaData>>;

#[derive(Debug, Clone)]
pub(crate) struct FrozenStore {
    generation: Generation,
    segment_size: usize,
    buckets: Vec<Arc<GidBucket>>,
    segments: BTreeMap<usize, Arc<MetaSegment>>,
    num_live: usize,
}

impl FrozenStore {
    /// An empty store at generation 0. Both sizes must be non-zero.
    pub(crate) fn new(segment_size: usize, bucket_count: usize) -> Self {
        debug_assert!(segment_size > 0 && bucket_count > 0);
        Self {
            generation: 0,
            segment_size,
            buckets: (0..bucket_count).map(|_| Arc::default()).collect(),
            segments: BTreeMap::new(),
            num_live: 0,
        }
    }

    #[inline]
    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub(crate) fn set_generation(&mut self, generation: Generation) {
        self.generation = generation;
    }

    #[inline]
    pub(crate) fn num_live(&self) -> usize {
        self.num_live
    }

    #[inline]
    fn bucket_index(&self, gid: &GlobalId) -> usize {
        gid.bucket_hash() as usize % self.buckets.len()
    }

    #[inline]
    fn position(&self, lid: Lid) -> (usize, usize) {
        let lid = lid as usize;
        (lid / self.segment_size, lid % self.segment_size)
    }

    pub(crate) fn lookup(&self, gid: &GlobalId) -> Option<Lid> {
        self.buckets[self.bucket_index(gid)].get(gid).copied()
    }

    pub(crate) fn raw_meta_data(&self, lid: Lid) -> Option<&RawMetaData> {
        if lid == NO_LID {
            return None;
        }
        let (segment, offset) = self.position(lid);
        self.segments.get(&segment)?.get(offset)?.as_ref()
    }

    /// Live LIDs in ascending order.
    #[inline]
    pub(crate) fn live_lids(&self) -> LiveLids<'_> {
        LiveLids {
            store: self,
            next: 0,
        }
    }

    /// Highest live LID, scanning segments from the back.
    pub(crate) fn highest_live_lid(&self) -> Option<Lid> {
        self.segments
            .iter()
            .rev()
            .find_map(|(index, segment)| {
                let offset = segment.iter().rposition(Option::is_some)?;
                Some((index * self.segment_size + offset) as Lid)
            })
    }

    /// Number of LID slots backed by segments.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.segments.len() * self.segment_size
    }

    /// Record `gid -> lid`. The caller guarantees neither side is in use.
    pub(crate) fn insert(&mut self, gid: GlobalId, lid: Lid) {
        debug_assert_ne!(lid, NO_LID);
        let bucket = self.bucket_index(&gid);
        Arc::make_mut(&mut self.buckets[bucket]).insert(gid, lid);

        let (segment, offset) = self.position(lid);
        let segment_size = self.segment_size;
        let segment = self
            .segments
            .entry(segment)
            .or_insert_with(|| Arc::new(vec![None; segment_size]));
        let slot = &mut Arc::make_mut(segment)[offset];
        debug_assert!(slot.is_none());
        *slot = Some(RawMetaData::new(gid));
        self.num_live += 1;
    }

    /// Forget the mapping held by `lid`, returning its metadata.
    pub(crate) fn remove(&mut self, lid: Lid) -> Option<RawMetaData> {
        let (segment, offset) = self.position(lid);
        let segment = self.segments.get_mut(&segment)?;
        segment.get(offset)?.as_ref()?;

        let meta = Arc::make_mut(segment)[offset].take()?;
        let bucket = self.bucket_index(meta.gid());
        Arc::make_mut(&mut self.buckets[bucket]).remove(meta.gid());
        self.num_live -= 1;
        Some(meta)
    }

    /// Drop segments that lie entirely at or above `lid_limit`.
    ///
    /// Slots at or above the limit must already be empty.
    pub(crate) fn truncate(&mut self, lid_limit: Lid) {
        let keep = (lid_limit as usize).div_ceil(self.segment_size);
        self.segments.split_off(&keep);
    }
}

/// Ascending iterator over the live LIDs of one snapshot.
///
/// 按升序遍历一个快照中存活 LID 的迭代器。
#[derive(Debug, Clone)]
pub struct LiveLids<'a> {
    store: &'a FrozenStore,
    next: usize,
}

impl Iterator for LiveLids<'_> {
    type Item = Lid;

    fn next(&mut self) -> Option<Lid> {
        let size = self.store.segment_size;
        for (index, segment) in self.store.segments.range(self.next / size..) {
            let start = index * size;
            let offset = self.next.saturating_sub(start);
            if let Some(found) = segment[offset..].iter().position(Option::is_some) {
                let lid = start + offset + found;
                self.next = lid + 1;
                return Some(lid as Lid);
            }
        }
        self.next = usize::MAX;
        None
    }
}

impl FusedIterator for LiveLids<'_> {}
