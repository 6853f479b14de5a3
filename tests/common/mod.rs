#![allow(dead_code)]

use parking_lot::Mutex;
use recpool::{
    Activatable, FullBehavior, PoolAllocator, PoolConfig, Poolable, RecyclablePool,
};
use std::{
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Spawn(usize),
    Recycle(usize),
    Destroy(usize),
}

pub type Journal = Arc<Mutex<Vec<Event>>>;

/// Which token callbacks panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub spawn: bool,
    pub recycle: bool,
    pub is_active: bool,
    pub deactivate: bool,
    pub destroy: bool,
}

#[derive(Debug)]
pub struct TokenState {
    id: usize,
    enabled: AtomicBool,
    torn: AtomicBool,
    faults: Faults,
    journal: Journal,
}

/// A handle with identity equality that records its lifecycle.
#[derive(Debug, Clone)]
pub struct Token(Arc<TokenState>);

impl Token {
    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn enabled(&self) -> bool {
        self.0.enabled.load(Ordering::SeqCst)
    }

    /// Marks the token as torn down behind the pool's back.
    pub fn tear(&self) {
        self.0.torn.store(true, Ordering::SeqCst);
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Activatable for Token {
    fn activate(&self) {
        self.0.enabled.store(true, Ordering::SeqCst);
    }

    fn deactivate(&self) {
        if self.0.faults.deactivate {
            panic!("deactivate failed for token {}", self.0.id);
        }
        self.0.enabled.store(false, Ordering::SeqCst);
    }
}

impl Poolable for Token {
    fn on_spawn(&self) {
        self.0.journal.lock().push(Event::Spawn(self.0.id));
        if self.0.faults.spawn {
            panic!("spawn hook failed for token {}", self.0.id);
        }
    }

    fn on_recycle(&self) {
        self.0.journal.lock().push(Event::Recycle(self.0.id));
        if self.0.faults.recycle {
            panic!("recycle hook failed for token {}", self.0.id);
        }
    }

    fn is_active(&self) -> bool {
        if self.0.faults.is_active {
            panic!("is_active failed for token {}", self.0.id);
        }
        self.enabled()
    }
}

#[derive(Debug, Default)]
pub struct TokenAllocator {
    next: AtomicUsize,
    journal: Journal,
    faults: Faults,
}

impl TokenAllocator {
    pub fn new(journal: &Journal) -> Self {
        TokenAllocator {
            journal: journal.clone(),
            ..Default::default()
        }
    }

    pub fn with_faults(journal: &Journal, faults: Faults) -> Self {
        TokenAllocator {
            faults,
            ..Self::new(journal)
        }
    }

    pub fn panicking_spawn(journal: &Journal) -> Self {
        Self::with_faults(
            journal,
            Faults {
                spawn: true,
                ..Faults::default()
            },
        )
    }

    pub fn panicking_destroy(journal: &Journal) -> Self {
        Self::with_faults(
            journal,
            Faults {
                destroy: true,
                ..Faults::default()
            },
        )
    }
}

impl PoolAllocator<Token> for TokenAllocator {
    fn allocate(&self) -> Token {
        Token(Arc::new(TokenState {
            id: self.next.fetch_add(1, Ordering::SeqCst),
            enabled: AtomicBool::new(true),
            torn: AtomicBool::new(false),
            faults: self.faults,
            journal: self.journal.clone(),
        }))
    }

    fn destroy(&self, obj: Token) {
        self.journal.lock().push(Event::Destroy(obj.id()));
        obj.tear();
        if self.faults.destroy {
            panic!("teardown failed for token {}", obj.id());
        }
    }

    fn is_valid(&self, obj: &Token) -> bool {
        !obj.0.torn.load(Ordering::SeqCst)
    }
}

pub type TokenPool = RecyclablePool<Token, TokenAllocator>;

pub fn config(default_size: usize, max_capacity: usize, full_behavior: FullBehavior) -> PoolConfig {
    PoolConfig {
        default_size,
        max_capacity,
        full_behavior,
        ..PoolConfig::default()
    }
}

pub fn events(journal: &Journal) -> Vec<Event> {
    journal.lock().clone()
}

pub fn assert_invariants(pool: &TokenPool) {
    let stats = pool.stats();
    assert_eq!(stats.active + stats.inactive, pool.count_all());
    if pool.max_capacity() > 0 {
        assert!(pool.count_all() <= pool.max_capacity());
    }
    let mut active = Vec::new();
    pool.active_snapshot(&mut active);
    assert_eq!(active.len(), pool.count_active());
}
