use core::{
    hash::{Hash, Hasher},
    mem::ManuallyDrop,
    ops::Deref,
    ptr,
};
use crate::{PoolAllocator, PoolHandle, RecyclablePool};
use std::{fmt, sync::Arc};

/// A guard over an instance acquired from a [`RecyclablePool`].
///
/// The instance goes back to the pool when the guard is dropped. Untracked
/// instances handed out under
/// [`FullBehavior::Destroy`](crate::FullBehavior::Destroy) are discarded
/// instead.
pub struct PoolGuard<'a, T: PoolHandle, P: PoolAllocator<T>> {
    obj: ManuallyDrop<T>,
    pooled: bool,
    pool: &'a RecyclablePool<T, P>,
}

impl<'a, T: PoolHandle, P: PoolAllocator<T>> PoolGuard<'a, T, P> {
    pub(crate) fn new(obj: T, pooled: bool, pool: &'a RecyclablePool<T, P>) -> Self {
        PoolGuard {
            obj: ManuallyDrop::new(obj),
            pooled,
            pool,
        }
    }

    /// Returns `true` if the pool tracks the instance.
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    /// Consumes the guard and returns the instance without releasing it.
    ///
    /// The pool still counts the instance as active; hand it back with
    /// [`RecyclablePool::release`] when done.
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);
        // `this` is never dropped, so the instance is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.obj) }
    }
}

impl<'a, T: PoolHandle, P: PoolAllocator<T>> Deref for PoolGuard<'a, T, P> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl<'a, T: PoolHandle, P: PoolAllocator<T>> Drop for PoolGuard<'a, T, P> {
    fn drop(&mut self) {
        let obj = unsafe { ManuallyDrop::take(&mut self.obj) };
        if self.pooled {
            self.pool.release(obj);
        } else {
            self.pool.discard(obj);
        }
    }
}

impl<'a, T: PoolHandle, P: PoolAllocator<T>> Hash for PoolGuard<'a, T, P> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}
impl<'a, T: PoolHandle, P: PoolAllocator<T>> fmt::Debug for PoolGuard<'a, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
impl<'a, T: PoolHandle, P: PoolAllocator<T>> PartialEq for PoolGuard<'a, T, P> {
    #[inline]
    fn eq(&self, other: &PoolGuard<'a, T, P>) -> bool {
        self.deref().eq(other)
    }
}
impl<'a, T: PoolHandle, P: PoolAllocator<T>> Eq for PoolGuard<'a, T, P> {}
impl<'a, T: PoolHandle, P: PoolAllocator<T>> core::borrow::Borrow<T> for PoolGuard<'a, T, P> {
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}
impl<'a, T: PoolHandle, P: PoolAllocator<T>> AsRef<T> for PoolGuard<'a, T, P> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}

/// A guard that holds an arc reference to its pool.
///
/// It can be sent to a worker thread; dropping it there defers the release
/// to the pool's owning thread.
pub struct RcPoolGuard<T: PoolHandle, P: PoolAllocator<T>> {
    obj: ManuallyDrop<T>,
    pooled: bool,
    pool: Arc<RecyclablePool<T, P>>,
}

impl<T: PoolHandle, P: PoolAllocator<T>> RcPoolGuard<T, P> {
    pub(crate) fn new(obj: T, pooled: bool, pool: &Arc<RecyclablePool<T, P>>) -> Self {
        RcPoolGuard {
            obj: ManuallyDrop::new(obj),
            pooled,
            pool: pool.clone(),
        }
    }

    /// Returns `true` if the pool tracks the instance.
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    /// Consumes the guard and returns the instance without releasing it.
    ///
    /// The pool still counts the instance as active.
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);
        let obj = unsafe { ManuallyDrop::take(&mut this.obj) };
        // Drop the arc reference
        unsafe { ptr::drop_in_place(&mut this.pool) }
        obj
    }
}

impl<T: PoolHandle, P: PoolAllocator<T>> Deref for RcPoolGuard<T, P> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl<T: PoolHandle, P: PoolAllocator<T>> Drop for RcPoolGuard<T, P> {
    fn drop(&mut self) {
        let obj = unsafe { ManuallyDrop::take(&mut self.obj) };
        if self.pooled {
            self.pool.release(obj);
        } else {
            self.pool.discard(obj);
        }
    }
}

impl<T: PoolHandle, P: PoolAllocator<T>> Hash for RcPoolGuard<T, P> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}
impl<T: PoolHandle, P: PoolAllocator<T>> fmt::Debug for RcPoolGuard<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
impl<T: PoolHandle, P: PoolAllocator<T>> PartialEq for RcPoolGuard<T, P> {
    #[inline]
    fn eq(&self, other: &RcPoolGuard<T, P>) -> bool {
        self.deref().eq(other)
    }
}
impl<T: PoolHandle, P: PoolAllocator<T>> Eq for RcPoolGuard<T, P> {}
impl<T: PoolHandle, P: PoolAllocator<T>> core::borrow::Borrow<T> for RcPoolGuard<T, P> {
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}
impl<T: PoolHandle, P: PoolAllocator<T>> AsRef<T> for RcPoolGuard<T, P> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}
