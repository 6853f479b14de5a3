use crate::{
    OwnerContext, PoolAllocator, PoolConfig, PoolGuard, PoolHandle, PoolStats, Poolable,
    RecyclablePool, Result,
};

/// A [`RecyclablePool`] that always fires [`Poolable`] hooks.
#[derive(Debug)]
pub struct PoolablePool<T, P> {
    pool: RecyclablePool<T, P>,
}

impl<T: Poolable + PoolHandle, P: PoolAllocator<T>> PoolablePool<T, P> {
    /// Creates a pool owned by the calling thread.
    pub fn new(allocator: P, config: PoolConfig) -> Result<Self> {
        Self::with_owner(allocator, config, OwnerContext::current())
    }

    /// Creates a pool owned by `owner`.
    pub fn with_owner(allocator: P, config: PoolConfig, owner: OwnerContext) -> Result<Self> {
        let pool = RecyclablePool::<T, P>::builder()
            .allocator(allocator)
            .config(config)
            .owner(owner)
            .with_callbacks()
            .build()?;
        Ok(PoolablePool { pool })
    }

    /// See [`RecyclablePool::acquire`].
    pub fn acquire(&self) -> Result<Option<T>> {
        self.pool.acquire()
    }

    /// See [`RecyclablePool::acquire_guard`].
    pub fn acquire_guard(&self) -> Result<Option<PoolGuard<'_, T, P>>> {
        self.pool.acquire_guard()
    }

    /// See [`RecyclablePool::release`].
    pub fn release(&self, obj: T) {
        self.pool.release(obj)
    }

    /// See [`RecyclablePool::discard`].
    pub fn discard(&self, obj: T) {
        self.pool.discard(obj)
    }

    /// See [`RecyclablePool::clear`].
    pub fn clear(&self, destroy_active: bool) {
        self.pool.clear(destroy_active)
    }

    /// See [`RecyclablePool::warmup`].
    pub fn warmup(&self, count: usize) -> Result<usize> {
        self.pool.warmup(count)
    }

    /// See [`RecyclablePool::process_pending_operations`].
    pub fn process_pending_operations(&self) -> Result<usize> {
        self.pool.process_pending_operations()
    }

    /// See [`RecyclablePool::active_snapshot`].
    pub fn active_snapshot(&self, out: &mut Vec<T>) {
        self.pool.active_snapshot(out)
    }
}

impl<T, P> PoolablePool<T, P> {
    /// The wrapped pool.
    pub fn inner(&self) -> &RecyclablePool<T, P> {
        &self.pool
    }

    /// See [`RecyclablePool::count_active`].
    pub fn count_active(&self) -> usize {
        self.pool.count_active()
    }

    /// See [`RecyclablePool::count_inactive`].
    pub fn count_inactive(&self) -> usize {
        self.pool.count_inactive()
    }

    /// See [`RecyclablePool::count_all`].
    pub fn count_all(&self) -> usize {
        self.pool.count_all()
    }

    /// See [`RecyclablePool::max_capacity`].
    pub fn max_capacity(&self) -> usize {
        self.pool.max_capacity()
    }

    /// See [`RecyclablePool::has_pending_operations`].
    pub fn has_pending_operations(&self) -> bool {
        self.pool.has_pending_operations()
    }

    /// See [`RecyclablePool::stats`].
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
