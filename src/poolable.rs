use core::{fmt, hash::Hash};

/// Toggles the externally visible presence of a pooled object.
///
/// The pool activates an instance right before handing it out and
/// deactivates it when it comes back or is constructed. Implementations
/// should be idempotent.
pub trait Activatable {
    /// Enables the object.
    fn activate(&self);

    /// Disables the object.
    fn deactivate(&self);
}

/// Lifecycle hooks of an object that knows it is being pooled.
pub trait Poolable: Activatable {
    /// Called after activation, before the object is returned to the caller.
    fn on_spawn(&self);

    /// Called on release, before deactivation.
    fn on_recycle(&self);

    /// Whether the object currently considers itself active.
    fn is_active(&self) -> bool;
}

/// Requirements on a pooled object.
///
/// A handle is cheap to clone, and clones compare equal exactly when they
/// refer to the same underlying object. The pool keeps one clone in its
/// active set and hands another to the caller.
pub trait PoolHandle: Activatable + Clone + Eq + Hash + fmt::Debug {}

impl<T: Activatable + Clone + Eq + Hash + fmt::Debug> PoolHandle for T {}

/// Selects whether the pool fires [`Poolable`] hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PoolingStrategy {
    /// Only toggle activation.
    #[default]
    None,
    /// Fire `on_spawn`/`on_recycle` around activation.
    WithCallbacks,
}

/// Hooks resolved once when the pool is built.
pub(crate) struct Hooks<T> {
    pub(crate) spawn: fn(&T),
    pub(crate) recycle: fn(&T),
    pub(crate) is_active: fn(&T) -> bool,
}

impl<T: Poolable> Hooks<T> {
    pub(crate) fn of() -> Self {
        Hooks {
            spawn: T::on_spawn,
            recycle: T::on_recycle,
            is_active: T::is_active,
        }
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Hooks<T> {}
