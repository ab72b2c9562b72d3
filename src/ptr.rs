use crate::garbage::GarbageSet;
use crate::state::Generation;
use crate::sync::{AtomicPtr, Ordering};
use std::boxed::Box;
use std::marker::PhantomData;

/// A generation-protected root pointer.
///
/// The writer replaces the pointee with [`store`](GenerationPtr::store), which
/// hands the previous value to a [`GarbageSet`] instead of freeing it. Readers
/// load the pointee while pinned; the pin keeps the writer from reclaiming it.
///
/// 一个受代数保护的根指针。
/// 写入者通过 `store` 替换指向的值，旧值交给 `GarbageSet` 而不是立即释放。
/// 读者在被钉住时 load，钉住保证写入者不会回收它。
pub(crate) struct GenerationPtr<T> {
    ptr: AtomicPtr<T>,
    _owns: PhantomData<Box<T>>,
}

impl<T> GenerationPtr<T> {
    #[inline]
    pub(crate) fn new(data: T) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::into_raw(Box::new(data))),
            _owns: PhantomData,
        }
    }

    /// Load the current value.
    ///
    /// # Safety
    /// The calling thread must be pinned (its reader slot published with a
    /// generation no newer than the current one) before calling, and must stay
    /// pinned for as long as the returned reference is used. The lifetime `'a`
    /// is only bounded by `self`, not by the pin.
    #[inline]
    pub(crate) unsafe fn load_pinned<'a>(&'a self) -> &'a T {
        let ptr = self.ptr.load(Ordering::SeqCst);
        // SAFETY: the root is never null, and the caller's pin keeps the
        // writer from reclaiming it while the reference is in use.
        unsafe { &*ptr }
    }

    /// Publish `data` and retire the previous value at `retired_at`.
    ///
    /// Only the single writer calls this.
    #[inline]
    pub(crate) fn store(&self, data: T, garbage: &mut GarbageSet<T>, retired_at: Generation) {
        let new_ptr = Box::into_raw(Box::new(data));
        let old_ptr = self.ptr.swap(new_ptr, Ordering::SeqCst);

        // SAFETY: `old_ptr` was produced by `Box::into_raw` and the swap above
        // unlinked it from the root.
        unsafe {
            garbage.retire(old_ptr, retired_at);
        }
    }
}

impl<T> std::fmt::Debug for GenerationPtr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ptr = self.ptr.load(Ordering::Relaxed);
        f.debug_tuple("GenerationPtr").field(&ptr).finish()
    }
}

impl<T> Drop for GenerationPtr<T> {
    /// Frees the current value.
    ///
    /// The pointer lives in state shared by every reader, so by the time it is
    /// dropped no guard can exist.
    #[inline]
    fn drop(&mut self) {
        let ptr = self.ptr.load(Ordering::Relaxed);
        if !ptr.is_null() {
            unsafe {
                drop(Box::from_raw(ptr));
            }
        }
    }
}
