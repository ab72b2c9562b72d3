use crate::state::Generation;
use std::boxed::Box;
use std::collections::VecDeque;
use std::ptr::NonNull;

/// An object that has been retired (unlinked from the root) but not yet deleted.
///
/// Readers pinned before the retirement may still hold references into it,
/// so it is kept as a raw pointer and only turned back into a `Box` when dropped.
///
/// 一个已被退休（从根上摘下）但尚未删除的对象。
/// 退休之前钉住的读者可能仍持有指向它的引用，因此以原始指针保存，
/// 只有在 drop 时才转换回 `Box`。
struct RetiredObject<T> {
    ptr: NonNull<T>,
}

// SAFETY: a retired object is exclusively owned by the garbage set; it is
// dropped on whichever thread runs the collection, which only requires `T: Send`.
unsafe impl<T: Send> Send for RetiredObject<T> {}

impl<T> Drop for RetiredObject<T> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `Box::into_raw` and is dropped exactly once,
        // after no reader can reach it any more.
        unsafe {
            drop(Box::from_raw(self.ptr.as_ptr()));
        }
    }
}

/// Retired snapshots waiting for every reader that might see them to unpin.
///
/// Entries are queued in the order they were retired, which is also ascending
/// generation order, so reclamation only ever pops from the front.
///
/// 等待所有可能看到它们的读者解除钉住的已退休快照。
/// 条目按退休顺序（即代数升序）排队，因此回收只从队首弹出。
pub(crate) struct GarbageSet<T> {
    queue: VecDeque<(Generation, RetiredObject<T>)>,
}

impl<T> GarbageSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Number of retired objects not yet reclaimed.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Queue `ptr` for deletion. `generation` is the last generation in which
    /// it was reachable from the root.
    ///
    /// # Safety
    /// `ptr` must come from `Box::into_raw`, be non-null, and no longer be
    /// reachable from the published root.
    #[inline]
    pub(crate) unsafe fn retire(&mut self, ptr: *mut T, generation: Generation) {
        if let Some(ptr) = NonNull::new(ptr) {
            debug_assert!(
                self.queue.back().is_none_or(|(last, _)| *last <= generation),
                "retirements must arrive in generation order"
            );
            self.queue.push_back((generation, RetiredObject { ptr }));
        }
    }

    /// Drop every object retired at a generation older than `min_active_generation`.
    ///
    /// A reader pinned at generation `g` may have loaded any snapshot retired
    /// at `g` or later, so only strictly older entries are safe.
    ///
    /// Returns the number of reclaimed objects.
    pub(crate) fn collect(&mut self, min_active_generation: Generation) -> usize {
        let mut reclaimed = 0;
        while let Some((generation, _)) = self.queue.front() {
            if *generation >= min_active_generation {
                break;
            }
            self.queue.pop_front();
            reclaimed += 1;
        }
        reclaimed
    }

    /// Generation of the oldest retained object.
    #[inline]
    pub(crate) fn oldest_generation(&self) -> Option<Generation> {
        self.queue.front().map(|(generation, _)| *generation)
    }
}
