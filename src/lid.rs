use crate::error::MetaStoreError;
use crate::gid::{Lid, NO_LID};
use crate::state::Generation;
use std::collections::{BTreeMap, VecDeque};

/// Hands out LIDs to the writer.
///
/// A LID freed by a removal is not reusable straight away: readers pinned to
/// the generation it was removed from may still resolve it. Freed LIDs first
/// collect in `pending`, move to `hold` tagged with the retiring generation on
/// commit, and reach `free` once collection proves no reader can see them.
///
/// LID 分配器。被删除释放的 LID 不会立即复用：钉住在删除前代数的读者仍可能解析到它。
/// 释放的 LID 先进入 `pending`，提交时带着退休代数移到 `hold`，
/// 在回收证明没有读者能看到后才进入 `free`。
#[derive(Debug)]
pub(crate) struct LidAllocator {
    /// First LID never handed out.
    next_lid: Lid,
    /// Highest LID that may be handed out or claimed.
    max_lid: Lid,
    free: FreeRanges,
    hold: VecDeque<(Generation, Lid)>,
    pending: Vec<Lid>,
}

impl LidAllocator {
    pub(crate) fn new(max_lid: Lid) -> Self {
        Self {
            next_lid: NO_LID + 1,
            max_lid,
            free: FreeRanges::default(),
            hold: VecDeque::new(),
            pending: Vec::new(),
        }
    }

    /// Lowest reusable LID, or a fresh one past the end.
    pub(crate) fn alloc(&mut self) -> Result<Lid, MetaStoreError> {
        if let Some(lid) = self.free.take_first() {
            return Ok(lid);
        }
        if self.next_lid > self.max_lid {
            return Err(MetaStoreError::LidSpaceExhausted);
        }
        let lid = self.next_lid;
        self.next_lid += 1;
        Ok(lid)
    }

    /// Take `lid` for an explicit assignment, wherever it currently sits.
    ///
    /// LIDs skipped over when `lid` lies past the end become free as one range.
    /// The caller has checked `lid <= max_lid`.
    pub(crate) fn claim(&mut self, lid: Lid) {
        debug_assert!(lid != NO_LID && lid <= self.max_lid);
        if lid >= self.next_lid {
            self.free.insert(self.next_lid, lid);
            self.next_lid = lid + 1;
            return;
        }
        if self.free.take(lid) {
            return;
        }
        if let Some(index) = self.pending.iter().position(|l| *l == lid) {
            self.pending.swap_remove(index);
            return;
        }
        self.hold.retain(|(_, held)| *held != lid);
    }

    /// `lid` was removed in the uncommitted batch.
    #[inline]
    pub(crate) fn release(&mut self, lid: Lid) {
        self.pending.push(lid);
    }

    /// Move the batch's freed LIDs onto the hold list, tagged with the
    /// generation they were last visible in.
    pub(crate) fn hold_pending(&mut self, generation: Generation) {
        self.hold
            .extend(self.pending.drain(..).map(|lid| (generation, lid)));
    }

    /// Free held LIDs no reader can see any more. Returns how many were freed.
    pub(crate) fn reclaim(&mut self, min_active_generation: Generation) -> usize {
        let mut freed = 0;
        while let Some((generation, lid)) = self.hold.front().copied() {
            if generation >= min_active_generation {
                break;
            }
            self.hold.pop_front();
            self.free.insert(lid, lid + 1);
            freed += 1;
        }
        freed
    }

    /// Forget every LID at or above `lid_limit`.
    pub(crate) fn shrink(&mut self, lid_limit: Lid) {
        let lid_limit = lid_limit.max(NO_LID + 1);
        if lid_limit >= self.next_lid {
            return;
        }
        self.next_lid = lid_limit;
        self.free.truncate(lid_limit);
        self.hold.retain(|(_, lid)| *lid < lid_limit);
        self.pending.retain(|lid| *lid < lid_limit);
    }

    #[inline]
    pub(crate) fn held_count(&self) -> usize {
        self.hold.len() + self.pending.len()
    }

    #[cfg(test)]
    fn free_count(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub(crate) fn next_lid(&self) -> Lid {
        self.next_lid
    }

    #[inline]
    pub(crate) fn max_lid(&self) -> Lid {
        self.max_lid
    }
}

/// Free LIDs as disjoint, non-adjacent half-open ranges keyed by start.
#[derive(Debug, Default)]
struct FreeRanges {
    ranges: BTreeMap<Lid, Lid>,
}

impl FreeRanges {
    /// Add `start..end`, merging with touching neighbours.
    fn insert(&mut self, mut start: Lid, mut end: Lid) {
        if start >= end {
            return;
        }
        if let Some((&prev_start, &prev_end)) = self.ranges.range(..start).next_back() {
            debug_assert!(prev_end <= start);
            if prev_end == start {
                self.ranges.remove(&prev_start);
                start = prev_start;
            }
        }
        if let Some(next_end) = self.ranges.remove(&end) {
            end = next_end;
        }
        self.ranges.insert(start, end);
    }

    fn take_first(&mut self) -> Option<Lid> {
        let (start, end) = self.ranges.pop_first()?;
        if start + 1 < end {
            self.ranges.insert(start + 1, end);
        }
        Some(start)
    }

    /// Remove `lid` if it is free.
    fn take(&mut self, lid: Lid) -> bool {
        let Some((&start, &end)) = self.ranges.range(..=lid).next_back() else {
            return false;
        };
        if lid >= end {
            return false;
        }
        self.ranges.remove(&start);
        if start < lid {
            self.ranges.insert(start, lid);
        }
        if lid + 1 < end {
            self.ranges.insert(lid + 1, end);
        }
        true
    }

    /// Drop everything at or above `limit`.
    fn truncate(&mut self, limit: Lid) {
        self.ranges.split_off(&limit);
        if let Some(mut last) = self.ranges.last_entry() {
            let end = last.get_mut();
            *end = (*end).min(limit);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|(start, end)| (end - start) as usize)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_dense_from_one() {
        let mut lids = LidAllocator::new(Lid::MAX - 1);
        assert_eq!(lids.alloc(), Ok(1));
        assert_eq!(lids.alloc(), Ok(2));
        assert_eq!(lids.alloc(), Ok(3));
    }

    #[test]
    fn test_released_lid_waits_for_reclaim() {
        let mut lids = LidAllocator::new(Lid::MAX - 1);
        let a = lids.alloc().unwrap();
        lids.release(a);
        lids.hold_pending(4);
        assert_eq!(lids.alloc(), Ok(2));

        assert_eq!(lids.reclaim(4), 0);
        assert_eq!(lids.reclaim(5), 1);
        assert_eq!(lids.alloc(), Ok(a));
    }

    #[test]
    fn test_claim_past_end_frees_gap() {
        let mut lids = LidAllocator::new(Lid::MAX - 1);
        lids.claim(4);
        assert_eq!(lids.next_lid(), 5);
        assert_eq!(lids.free_count(), 3);
        assert_eq!(lids.alloc(), Ok(1));
    }

    #[test]
    fn test_claim_takes_pending_and_held() {
        let mut lids = LidAllocator::new(Lid::MAX - 1);
        lids.claim(7);
        lids.claim(9);
        lids.release(7);
        lids.claim(7);
        assert_eq!(lids.held_count(), 0);

        lids.release(9);
        lids.hold_pending(1);
        lids.claim(9);
        assert_eq!(lids.held_count(), 0);
        assert_eq!(lids.reclaim(usize::MAX), 0);
    }

    #[test]
    fn test_shrink_drops_lids_above_limit() {
        let mut lids = LidAllocator::new(Lid::MAX - 1);
        lids.claim(10);
        lids.release(10);
        lids.hold_pending(0);
        lids.shrink(3);
        assert_eq!(lids.next_lid(), 3);
        assert_eq!(lids.held_count(), 0);
        assert_eq!(lids.free_count(), 2);
    }

    #[test]
    fn test_claim_near_max_keeps_gap_as_one_range() {
        let mut lids = LidAllocator::new(Lid::MAX - 1);
        lids.claim(Lid::MAX - 1);
        assert_eq!(lids.free.ranges.len(), 1);
        assert_eq!(lids.free_count(), (Lid::MAX - 2) as usize);
        assert_eq!(lids.alloc(), Ok(1));
        assert_eq!(lids.alloc(), Ok(2));
        assert_eq!(lids.next_lid(), Lid::MAX);
    }

    #[test]
    fn test_free_ranges_split_and_merge() {
        let mut lids = LidAllocator::new(100);
        lids.claim(10);
        lids.claim(5);
        assert_eq!(lids.free.ranges.len(), 2);
        assert_eq!(lids.free_count(), 8);

        lids.release(5);
        lids.hold_pending(0);
        lids.reclaim(1);
        assert_eq!(lids.free.ranges.len(), 1);
        assert_eq!(lids.free_count(), 9);

        lids.shrink(4);
        assert_eq!(lids.free_count(), 3);
        assert_eq!(lids.alloc(), Ok(1));
        assert_eq!(lids.alloc(), Ok(2));
        assert_eq!(lids.alloc(), Ok(3));
        assert_eq!(lids.alloc(), Ok(4));
    }

    #[test]
    fn test_alloc_stops_at_max_lid() {
        let mut lids = LidAllocator::new(2);
        assert_eq!(lids.alloc(), Ok(1));
        assert_eq!(lids.alloc(), Ok(2));
        assert_eq!(lids.alloc(), Err(MetaStoreError::LidSpaceExhausted));
    }
}
