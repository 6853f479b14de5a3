/// A trait defining the factory side of a recycling pool.
///
/// The pool calls these methods on its owning thread only: `allocate` when
/// it needs a fresh instance, `destroy` when an instance leaves the pool
/// for good, and `is_valid` before an instance is put back on the free
/// list.
pub trait PoolAllocator<T> {
    /// Creates a new object of type T.
    fn allocate(&self) -> T;

    /// Tears down an object permanently.
    ///
    /// By default, this method just drops the object. Override this method
    /// to release engine-side resources.
    #[inline(always)]
    fn destroy(&self, obj: T) {
        drop(obj);
    }

    /// validates that an object is still alive and may be stored back in
    /// the pool.
    ///
    /// By default, this method always returns true. Return false for
    /// objects that were torn down behind the pool's back.
    #[inline(always)]
    fn is_valid(&self, _obj: &T) -> bool {
        true
    }
}
