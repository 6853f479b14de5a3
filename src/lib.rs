#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod config;
mod error;
mod guard;
mod owner;
mod pool;
mod pool_allocator;
mod poolable;
mod poolable_pool;

pub use config::*;
pub use error::*;
pub use guard::*;
pub use owner::*;
pub use pool::*;
pub use pool_allocator::*;
pub use poolable::{Activatable, PoolHandle, Poolable, PoolingStrategy};
pub use poolable_pool::*;
