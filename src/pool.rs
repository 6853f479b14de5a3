use crate::{
    guard::{PoolGuard, RcPoolGuard},
    poolable::Hooks,
    FullBehavior, OwnerContext, PoolAllocator, PoolConfig, PoolError, PoolHandle, Poolable,
    PoolingStrategy, Result,
};
use core::{
    any::Any,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::{
    collections::{HashSet, VecDeque},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{debug, error, trace, warn};

/// Maintenance requested off the owning thread.
enum PendingAction<T> {
    Clear { destroy_active: bool },
    Discard(T),
}

/// Collections only the owning thread mutates.
struct State<T> {
    free: VecDeque<T>,
    active: HashSet<T>,
}

/// Where a handle sits relative to the pool.
enum Slot {
    Active,
    Free,
    Untracked,
}

/// An instance handed out by `acquire`, and whether the pool tracks it.
pub(crate) struct Acquired<T> {
    pub(crate) obj: T,
    pub(crate) pooled: bool,
}

/// A point-in-time view of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances currently handed out.
    pub active: usize,
    /// Instances waiting on the free list.
    pub inactive: usize,
    /// Capacity bound, 0 when unbounded.
    pub max_capacity: usize,
    /// Acquires that found the pool at capacity with nothing free.
    pub capacity_exhausted: usize,
    /// Whether deferred releases or actions are waiting.
    pub has_pending_operations: bool,
}

impl PoolStats {
    /// Active plus inactive instances.
    pub fn all(&self) -> usize {
        self.active + self.inactive
    }
}

/// A thread-aware recycling pool.
///
/// Instances are created by the allocator `P` and cycle between a free list
/// and an active set. Only the thread named by the pool's [`OwnerContext`]
/// may acquire, warm up, or apply deferred work; any thread may release,
/// and releases from other threads are queued until the owner next calls
/// [`Self::acquire`] or [`Self::process_pending_operations`].
pub struct RecyclablePool<T, P> {
    allocator: P,
    config: PoolConfig,
    owner: OwnerContext,
    hooks: Option<Hooks<T>>,
    state: Mutex<State<T>>,
    count_inactive: AtomicUsize,
    count_active: AtomicUsize,
    capacity_exhausted: AtomicUsize,
    pending_release: SegQueue<T>,
    pending_actions: SegQueue<PendingAction<T>>,
}

impl<T, P> RecyclablePool<T, P> {
    /// Starts configuring a pool owned by the calling thread.
    pub fn builder() -> PoolBuilder<T, P> {
        PoolBuilder::new()
    }

    /// Wraps the pool with an atomic reference counter, enabling the use of
    /// [`Self::acquire_rc`] to obtain guards that can move between threads
    /// independently of the pool's lifetime.
    pub fn into_rc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of instances currently handed out.
    #[inline]
    pub fn count_active(&self) -> usize {
        self.count_active.load(Ordering::Acquire)
    }

    /// Number of instances on the free list.
    #[inline]
    pub fn count_inactive(&self) -> usize {
        self.count_inactive.load(Ordering::Acquire)
    }

    /// Active plus inactive instances.
    #[inline]
    pub fn count_all(&self) -> usize {
        self.count_active() + self.count_inactive()
    }

    /// Capacity bound, 0 when unbounded.
    pub fn max_capacity(&self) -> usize {
        self.config.max_capacity
    }

    /// Acquires that found the pool at capacity with nothing free.
    pub fn capacity_exhausted(&self) -> usize {
        self.capacity_exhausted.load(Ordering::Relaxed)
    }

    /// Returns `true` if deferred releases or actions are waiting for the
    /// owning thread.
    pub fn has_pending_operations(&self) -> bool {
        !self.pending_release.is_empty() || !self.pending_actions.is_empty()
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The pool's owning thread context.
    pub fn owner(&self) -> OwnerContext {
        self.owner
    }

    /// Whether the pool fires [`Poolable`] hooks.
    pub fn strategy(&self) -> PoolingStrategy {
        match self.hooks {
            Some(_) => PoolingStrategy::WithCallbacks,
            None => PoolingStrategy::None,
        }
    }

    /// Snapshot of all counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.count_active(),
            inactive: self.count_inactive(),
            max_capacity: self.config.max_capacity,
            capacity_exhausted: self.capacity_exhausted(),
            has_pending_operations: self.has_pending_operations(),
        }
    }
}

impl<T: PoolHandle, P: PoolAllocator<T>> RecyclablePool<T, P> {
    /// Creates a pool owned by the calling thread, without lifecycle hooks,
    /// and warms it to `config.default_size`.
    pub fn new(allocator: P, config: PoolConfig) -> Result<Self> {
        Self::builder().allocator(allocator).config(config).build()
    }

    /// Creates up to `count` inactive instances, never exceeding
    /// `max_capacity` when the pool is bounded. Returns how many were
    /// created.
    pub fn warmup(&self, count: usize) -> Result<usize> {
        self.owner.ensure("warmup")?;

        let count = self.config.room_for(self.count_all(), count);
        let fresh: Vec<T> = (0..count).map(|_| self.construct()).collect();
        {
            let mut state = self.state.lock();
            state.free.extend(fresh);
            self.count_inactive.fetch_add(count, Ordering::AcqRel);
        }
        debug!(created = count, total = self.count_all(), "warmed up pool");
        Ok(count)
    }

    /// Gets an instance from the pool.
    ///
    /// Pending cross-thread releases are applied first. If nothing is free
    /// and the pool is full, the configured [`FullBehavior`] decides the
    /// outcome; `Ok(None)` means no instance could be produced.
    pub fn acquire(&self) -> Result<Option<T>> {
        Ok(self.acquire_inner("acquire")?.map(|acquired| acquired.obj))
    }

    /// Like [`Self::acquire`], but the instance is returned to the pool when
    /// the guard is dropped.
    pub fn acquire_guard(&self) -> Result<Option<PoolGuard<'_, T, P>>> {
        Ok(self
            .acquire_inner("acquire_guard")?
            .map(|acquired| PoolGuard::new(acquired.obj, acquired.pooled, self)))
    }

    /// Like [`Self::acquire_guard`], but the guard holds an arc reference to
    /// the pool, so it can be sent to another thread and dropped there.
    pub fn acquire_rc(self: Arc<Self>) -> Result<Option<RcPoolGuard<T, P>>> {
        Ok(self
            .acquire_inner("acquire_rc")?
            .map(|acquired| RcPoolGuard::new(acquired.obj, acquired.pooled, &self)))
    }

    /// Returns an instance to the pool.
    ///
    /// On the owning thread the release happens immediately. From any other
    /// thread it is queued and applied by the owner later.
    pub fn release(&self, obj: T) {
        if self.owner.is_owner() {
            self.release_now(obj);
        } else {
            trace!(instance = ?obj, "deferring release to the owning thread");
            self.pending_release.push(obj);
        }
    }

    /// Tears an instance down for good, whether it is active, free, or an
    /// untracked instance handed out under [`FullBehavior::Destroy`].
    /// Deferred when called off the owning thread.
    pub fn discard(&self, obj: T) {
        if self.owner.is_owner() {
            self.discard_now(obj);
        } else {
            trace!(instance = ?obj, "deferring discard to the owning thread");
            self.pending_actions.push(PendingAction::Discard(obj));
        }
    }

    /// Destroys every free instance. With `destroy_active`, active instances
    /// are deactivated and destroyed too; otherwise they are abandoned and
    /// must not be released to this pool again. Deferred when called off the
    /// owning thread.
    pub fn clear(&self, destroy_active: bool) {
        if self.owner.is_owner() {
            self.clear_now(destroy_active);
        } else {
            trace!(destroy_active, "deferring clear to the owning thread");
            self.pending_actions.push(PendingAction::Clear { destroy_active });
        }
    }

    /// Applies queued cross-thread releases, then queued actions in the
    /// order they were requested. Returns how many operations were applied.
    ///
    /// Call this periodically from the owner's loop when other threads
    /// release instances.
    pub fn process_pending_operations(&self) -> Result<usize> {
        self.owner.ensure("process_pending_operations")?;

        let mut applied = self.drain_pending_releases();
        for _ in 0..self.pending_actions.len() {
            let Some(action) = self.pending_actions.pop() else {
                break;
            };
            match action {
                PendingAction::Clear { destroy_active } => self.clear_now(destroy_active),
                PendingAction::Discard(obj) => self.discard_now(obj),
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Copies the active set into `out`. Takes the pool lock; meant for
    /// diagnostics.
    pub fn active_snapshot(&self, out: &mut Vec<T>) {
        out.clear();
        let state = self.state.lock();
        out.extend(state.active.iter().cloned());
    }

    /// Returns `true` if `obj` is currently handed out by this pool.
    pub fn is_tracked(&self, obj: &T) -> bool {
        self.state.lock().active.contains(obj)
    }

    pub(crate) fn acquire_inner(&self, operation: &'static str) -> Result<Option<Acquired<T>>> {
        self.owner.ensure(operation)?;
        self.drain_pending_releases();

        if let Some(obj) = self.pop_free() {
            return Ok(Some(self.spawn_tracked(obj)));
        }
        if self.has_room() {
            let obj = self.construct();
            return Ok(Some(self.spawn_tracked(obj)));
        }

        self.capacity_exhausted.fetch_add(1, Ordering::Relaxed);
        let max_capacity = self.config.max_capacity;
        match self.config.full_behavior {
            FullBehavior::ReturnNull => {
                warn!(max_capacity, "pool is at capacity, returning no instance");
                Ok(None)
            }
            FullBehavior::Destroy => {
                debug!(max_capacity, "pool is at capacity, handing out an untracked instance");
                let obj = self.construct();
                self.spawn(&obj);
                Ok(Some(Acquired { obj, pooled: false }))
            }
            FullBehavior::DestroyOldest => {
                if self.destroy_oldest_active() {
                    let obj = self.construct();
                    Ok(Some(self.spawn_tracked(obj)))
                } else {
                    warn!(max_capacity, "pool is at capacity with no active instance to evict");
                    Ok(None)
                }
            }
        }
    }

    fn has_room(&self) -> bool {
        !self.config.is_bounded() || self.count_all() < self.config.max_capacity
    }

    fn construct(&self) -> T {
        let obj = self.allocator.allocate();
        deactivate(&obj);
        obj
    }

    fn pop_free(&self) -> Option<T> {
        let mut state = self.state.lock();
        let obj = state.free.pop_front()?;
        self.count_inactive.fetch_sub(1, Ordering::AcqRel);
        Some(obj)
    }

    /// Evicts whichever active instance the hash set yields first. This is
    /// not LRU.
    fn destroy_oldest_active(&self) -> bool {
        let victim = {
            let mut state = self.state.lock();
            let victim = state.active.iter().next().cloned();
            if let Some(victim) = &victim {
                state.active.remove(victim);
                self.count_active.fetch_sub(1, Ordering::AcqRel);
            }
            victim
        };
        match victim {
            Some(victim) => {
                debug!(instance = ?victim, "pool is at capacity, evicting an active instance");
                self.retire(&victim);
                self.destroy(victim);
                true
            }
            None => false,
        }
    }

    fn spawn_tracked(&self, obj: T) -> Acquired<T> {
        {
            let mut state = self.state.lock();
            if state.active.insert(obj.clone()) {
                self.count_active.fetch_add(1, Ordering::AcqRel);
            } else {
                warn!(instance = ?obj, "allocator produced a handle that is already active");
            }
        }
        self.spawn(&obj);
        Acquired { obj, pooled: true }
    }

    fn spawn(&self, obj: &T) {
        isolate("activate", obj, || obj.activate());
        if let Some(hooks) = self.hooks {
            isolate("on_spawn", obj, || (hooks.spawn)(obj));
        }
    }

    /// Recycle hook then deactivation, for an instance already removed from
    /// the active set.
    fn retire(&self, obj: &T) {
        if let Some(hooks) = self.hooks {
            if self.config.collection_checks
                && isolate("is_active", obj, || (hooks.is_active)(obj)) == Some(false)
            {
                warn!(instance = ?obj, "active instance reports itself inactive");
            }
            isolate("on_recycle", obj, || (hooks.recycle)(obj));
        }
        deactivate(obj);
    }

    /// Tears an instance down unless it is already disposed.
    fn destroy(&self, obj: T) {
        if !self.allocator.is_valid(&obj) {
            warn!(instance = ?obj, "instance is already disposed, skipping teardown");
            return;
        }
        let handle = obj.clone();
        isolate("destroy", &handle, || self.allocator.destroy(obj));
    }

    fn release_now(&self, obj: T) {
        if !self.take_active(&obj) {
            self.report_untracked(&obj, "release");
            return;
        }

        self.retire(&obj);
        if !self.allocator.is_valid(&obj) {
            warn!(instance = ?obj, "released instance is no longer valid, dropping it");
            return;
        }

        let rejected = {
            let mut state = self.state.lock();
            if self.config.is_bounded() && self.count_inactive() >= self.config.max_capacity {
                Some(obj)
            } else {
                state.free.push_back(obj);
                self.count_inactive.fetch_add(1, Ordering::AcqRel);
                None
            }
        };
        if let Some(obj) = rejected {
            debug!(instance = ?obj, "free list is full, destroying released instance");
            self.destroy(obj);
        }
    }

    fn discard_now(&self, obj: T) {
        match self.locate(&obj) {
            Slot::Active => self.retire(&obj),
            Slot::Free => {}
            Slot::Untracked => deactivate(&obj),
        }
        self.destroy(obj);
    }

    fn clear_now(&self, destroy_active: bool) {
        let (free, active) = {
            let mut state = self.state.lock();
            let free = core::mem::take(&mut state.free);
            let active = core::mem::take(&mut state.active);
            self.count_inactive.store(0, Ordering::Release);
            self.count_active.store(0, Ordering::Release);
            (free, active)
        };

        let mut dropped = 0;
        while self.pending_release.pop().is_some() {
            dropped += 1;
        }

        let destroyed = free.len();
        for obj in free {
            self.destroy(obj);
        }

        if destroy_active {
            let destroyed_active = active.len();
            for obj in active {
                deactivate(&obj);
                self.destroy(obj);
            }
            debug!(
                destroyed,
                destroyed_active, dropped, "cleared pool including active instances"
            );
        } else {
            if !active.is_empty() {
                warn!(
                    abandoned = active.len(),
                    "clear abandoned active instances, they are no longer tracked"
                );
            }
            debug!(destroyed, dropped, "cleared pool");
        }
    }

    fn drain_pending_releases(&self) -> usize {
        let mut applied = 0;
        for _ in 0..self.pending_release.len() {
            let Some(obj) = self.pending_release.pop() else {
                break;
            };
            self.release_now(obj);
            applied += 1;
        }
        if applied > 0 {
            trace!(applied, "applied deferred releases");
        }
        applied
    }

    fn take_active(&self, obj: &T) -> bool {
        let mut state = self.state.lock();
        let removed = state.active.remove(obj);
        if removed {
            self.count_active.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    fn locate(&self, obj: &T) -> Slot {
        let mut state = self.state.lock();
        if state.active.remove(obj) {
            self.count_active.fetch_sub(1, Ordering::AcqRel);
            return Slot::Active;
        }
        match state.free.iter().position(|free| free == obj) {
            Some(index) => {
                state.free.remove(index);
                self.count_inactive.fetch_sub(1, Ordering::AcqRel);
                Slot::Free
            }
            None => Slot::Untracked,
        }
    }

    fn report_untracked(&self, obj: &T, operation: &'static str) {
        if self.config.collection_checks {
            warn!(instance = ?obj, operation, "instance is not active in this pool, ignoring");
        } else {
            trace!(instance = ?obj, operation, "instance is not active in this pool, ignoring");
        }
    }
}

impl<T, P> fmt::Debug for RecyclablePool<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclablePool")
            .field("config", &self.config)
            .field("owner", &self.owner)
            .field("strategy", &self.strategy())
            .field("count_active", &self.count_active())
            .field("count_inactive", &self.count_inactive())
            .field("has_pending_operations", &self.has_pending_operations())
            .finish()
    }
}

/// Runs a user hook, logging instead of propagating a panic. Returns `None`
/// if the hook panicked.
fn isolate<T: fmt::Debug, R>(hook: &'static str, obj: &T, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!(
                hook,
                instance = ?obj,
                reason = panic_message(payload.as_ref()),
                "pool hook panicked, continuing"
            );
            None
        }
    }
}

fn deactivate<T: PoolHandle>(obj: &T) {
    isolate("deactivate", obj, || obj.deactivate());
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Configures and builds a [`RecyclablePool`].
pub struct PoolBuilder<T, P> {
    allocator: Option<P>,
    config: PoolConfig,
    owner: OwnerContext,
    hooks: Option<Hooks<T>>,
}

impl<T, P> PoolBuilder<T, P> {
    /// A builder with the default configuration, owned by the calling thread.
    pub fn new() -> Self {
        PoolBuilder {
            allocator: None,
            config: PoolConfig::default(),
            owner: OwnerContext::current(),
            hooks: None,
        }
    }

    /// Sets the allocator that creates and destroys instances.
    pub fn allocator(mut self, allocator: P) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Instances created eagerly by [`Self::build`].
    pub fn default_size(mut self, default_size: usize) -> Self {
        self.config.default_size = default_size;
        self
    }

    /// Upper bound on active plus inactive instances, 0 for unbounded.
    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.config.max_capacity = max_capacity;
        self
    }

    /// Warn about releases of untracked instances.
    pub fn collection_checks(mut self, enabled: bool) -> Self {
        self.config.collection_checks = enabled;
        self
    }

    /// Overflow policy.
    pub fn full_behavior(mut self, behavior: FullBehavior) -> Self {
        self.config.full_behavior = behavior;
        self
    }

    /// Sets the owning thread context.
    pub fn owner(mut self, owner: OwnerContext) -> Self {
        self.owner = owner;
        self
    }
}

impl<T: Poolable, P> PoolBuilder<T, P> {
    /// Fire [`Poolable`] hooks on spawn and recycle.
    pub fn with_callbacks(self) -> Self {
        self.strategy(PoolingStrategy::WithCallbacks)
    }

    /// Selects the pooling strategy.
    pub fn strategy(mut self, strategy: PoolingStrategy) -> Self {
        self.hooks = match strategy {
            PoolingStrategy::None => None,
            PoolingStrategy::WithCallbacks => Some(Hooks::of()),
        };
        self
    }
}

impl<T: PoolHandle, P: PoolAllocator<T>> PoolBuilder<T, P> {
    /// Builds the pool and warms it to the configured default size.
    ///
    /// Fails with [`PoolError::Configuration`] when no allocator was given,
    /// and with [`PoolError::ThreadViolation`] when the owner is another
    /// thread and a warmup is requested.
    pub fn build(self) -> Result<RecyclablePool<T, P>> {
        let allocator = self
            .allocator
            .ok_or_else(|| PoolError::configuration("a pool needs an allocator"))?;
        if !self.owner.is_bound() {
            warn!("pool built with an unbound owner, thread checks are disabled");
        }

        let pool = RecyclablePool {
            allocator,
            config: self.config,
            owner: self.owner,
            hooks: self.hooks,
            state: Mutex::new(State {
                free: VecDeque::new(),
                active: HashSet::new(),
            }),
            count_inactive: AtomicUsize::new(0),
            count_active: AtomicUsize::new(0),
            capacity_exhausted: AtomicUsize::new(0),
            pending_release: SegQueue::new(),
            pending_actions: SegQueue::new(),
        };
        if pool.config.default_size > 0 {
            pool.warmup(pool.config.default_size)?;
        }
        Ok(pool)
    }
}

impl<T, P> Default for PoolBuilder<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> fmt::Debug for PoolBuilder<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("has_allocator", &self.allocator.is_some())
            .field("config", &self.config)
            .field("owner", &self.owner)
            .field("with_callbacks", &self.hooks.is_some())
            .finish()
    }
}
