use crate::frozen::LiveLids;
use crate::gid::{GlobalId, Lid, NO_LID};
use crate::reader::ReadGuard;
use crate::state::Generation;
use std::iter::FusedIterator;

/// Resolves GIDs to LIDs against one pinned snapshot of the meta store.
///
/// The mapper owns a [`ReadGuard`], so every call on it answers from the same
/// generation no matter how many commits the writer publishes meanwhile.
/// Dropping the mapper releases the guard.
///
/// The mapper never mutates the store. Enumeration borrows the mapper, and
/// the snapshot it walks is immutable.
///
/// **Typical Usage**:
/// ```
/// use gidmap::{DocumentMetaStore, GlobalId, NO_LID};
///
/// let (mut writer, store) = DocumentMetaStore::new();
/// let gid = GlobalId::new([7; 12]);
/// writer.put(gid, 3).unwrap();
/// writer.commit();
///
/// let reader = store.register_reader();
/// let mapper = reader.gid_to_lid_mapper();
///
/// writer.remove(&gid);
/// writer.commit();
///
/// // Still the snapshot pinned above.
/// assert_eq!(mapper.map_gid_to_lid(&gid), 3);
/// assert_eq!(mapper.iter().collect::<Vec<_>>(), vec![(gid, 3)]);
/// drop(mapper);
///
/// assert_eq!(reader.gid_to_lid_mapper().map_gid_to_lid(&gid), NO_LID);
/// ```
///
/// 在元数据存储的一个被钉住的快照上将 GID 解析为 LID。
/// 映射器拥有一个 `ReadGuard`，因此无论写入者期间发布多少次提交，
/// 它的每次调用都来自同一个代数。drop 映射器会释放守卫。
#[must_use]
pub struct GidToLidMapper<'a> {
    guard: ReadGuard<'a>,
}

impl<'a> GidToLidMapper<'a> {
    /// Take ownership of `guard`; the store it was acquired from is the one
    /// the mapper reads.
    #[inline]
    pub fn new(guard: ReadGuard<'a>) -> Self {
        Self { guard }
    }

    /// Generation of the pinned snapshot.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.guard.generation()
    }

    /// LID assigned to `gid` in the pinned snapshot, or [`NO_LID`].
    ///
    /// `NO_LID` covers both a GID that never existed and one removed before
    /// the snapshot was published.
    #[inline]
    pub fn map_gid_to_lid(&self, gid: &GlobalId) -> Lid {
        self.guard.lookup(gid).unwrap_or(NO_LID)
    }

    /// Every live `(gid, lid)` pair of the pinned snapshot, in ascending LID order.
    ///
    /// The GID is the one recorded in the LID's metadata. Each call starts a
    /// fresh pass over the same snapshot and yields the same sequence.
    #[inline]
    pub fn iter(&self) -> GidLidIter<'_> {
        GidLidIter {
            guard: &self.guard,
            lids: self.guard.frozen_lids(),
        }
    }

    /// Call `visitor` once per live `(gid, lid)` pair, in [`iter`](Self::iter) order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&GlobalId, Lid),
    {
        for (gid, lid) in self.iter() {
            visitor(&gid, lid);
        }
    }

    /// Number of live pairs in the pinned snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.guard.num_live()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The guard this mapper holds.
    #[inline]
    pub fn guard(&self) -> &ReadGuard<'a> {
        &self.guard
    }
}

impl<'m> IntoIterator for &'m GidToLidMapper<'_> {
    type Item = (GlobalId, Lid);
    type IntoIter = GidLidIter<'m>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for GidToLidMapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GidToLidMapper")
            .field("guard", &self.guard)
            .finish()
    }
}

/// Lazy sequence of `(gid, lid)` pairs over a mapper's snapshot.
///
/// Walks the frozen LID set and reverse-looks-up each LID's GID.
///
/// 映射器快照上 `(gid, lid)` 对的惰性序列。
#[derive(Debug, Clone)]
pub struct GidLidIter<'m> {
    guard: &'m ReadGuard<'m>,
    lids: LiveLids<'m>,
}

impl Iterator for GidLidIter<'_> {
    type Item = (GlobalId, Lid);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let guard = self.guard;
        self.lids
            .by_ref()
            .find_map(|lid| guard.raw_meta_data(lid).map(|meta| (*meta.gid(), lid)))
    }
}

impl FusedIterator for GidLidIter<'_> {}
