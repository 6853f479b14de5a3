use crate::{PoolError, Result};
use std::thread::{self, ThreadId};

/// Identifies the thread allowed to mutate a pool.
///
/// Each pool receives its own context, so pools driven by different loops
/// can have different owners. A context is either bound to one thread or
/// unbound; an unbound context treats every thread as the owner, which
/// turns deferred release into immediate release and disables thread
/// checks entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerContext {
    thread: Option<ThreadId>,
}

impl OwnerContext {
    /// Binds the context to the calling thread.
    pub fn current() -> Self {
        Self::for_thread(thread::current().id())
    }

    /// Binds the context to an arbitrary thread.
    pub fn for_thread(id: ThreadId) -> Self {
        OwnerContext { thread: Some(id) }
    }

    /// A permissive context where any thread counts as the owner.
    pub fn unbound() -> Self {
        OwnerContext { thread: None }
    }

    /// Returns the owning thread, if bound.
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread
    }

    /// Returns `true` if the context is bound to a thread.
    pub fn is_bound(&self) -> bool {
        self.thread.is_some()
    }

    /// Returns `true` if the calling thread is the owner.
    #[inline]
    pub fn is_owner(&self) -> bool {
        match self.thread {
            Some(id) => thread::current().id() == id,
            None => true,
        }
    }

    pub(crate) fn ensure(&self, operation: &'static str) -> Result<()> {
        match self.thread {
            Some(owner) => {
                let current = thread::current().id();
                if current == owner {
                    Ok(())
                } else {
                    Err(PoolError::ThreadViolation {
                        operation,
                        owner,
                        current,
                    })
                }
            }
            None => Ok(()),
        }
    }
}

impl Default for OwnerContext {
    fn default() -> Self {
        Self::current()
    }
}
