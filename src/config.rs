/// What `acquire` does when the pool is at capacity and has no free instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FullBehavior {
    /// Log a warning and return no instance.
    #[default]
    ReturnNull,
    /// Hand out a temporary instance the pool does not track. The caller
    /// disposes of it with [`RecyclablePool::discard`](crate::RecyclablePool::discard).
    Destroy,
    /// Tear down an arbitrary active instance to make room. The victim is
    /// not chosen by age.
    DestroyOldest,
}

/// Tunables of a [`RecyclablePool`](crate::RecyclablePool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Instances created eagerly when the pool is built.
    pub default_size: usize,
    /// Upper bound on active plus inactive instances. 0 means unbounded.
    pub max_capacity: usize,
    /// Warn about releases of instances the pool does not track.
    pub collection_checks: bool,
    /// Overflow policy.
    pub full_behavior: FullBehavior,
}

impl PoolConfig {
    /// Returns `true` if `max_capacity` bounds the pool.
    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.max_capacity > 0
    }

    /// Number of instances that may still be created when `count_all`
    /// already exist.
    pub(crate) fn room_for(&self, count_all: usize, wanted: usize) -> usize {
        if self.is_bounded() {
            wanted.min(self.max_capacity.saturating_sub(count_all))
        } else {
            wanted
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            default_size: 10,
            max_capacity: 0,
            collection_checks: true,
            full_behavior: FullBehavior::ReturnNull,
        }
    }
}
