//! Reusable scratch buffers.
//!
//! Building and querying an index need scratch space: a stack for bucketing, a frontier for
//! the nearest-neighbor search and the node array itself. Pools hand these buffers out by
//! move and take them back afterwards, so steady-state use allocates nothing.

use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::r#type::IndexableNum;
use crate::rtree::node::Node;
use crate::rtree::search::Frontier;

/// A bounded free list that is safe to share between threads.
///
/// Checking out never blocks on an empty pool: callers build a fresh item instead. Items given
/// back while `max_idle` items are already waiting are dropped.
#[derive(Debug)]
pub struct ScratchPool<T> {
    free: Mutex<Vec<T>>,
    max_idle: usize,
}

impl<T> ScratchPool<T> {
    /// Create an empty pool that keeps at most `max_idle` items around.
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    /// Take an idle item out of the pool, if any.
    pub fn take(&self) -> Option<T> {
        self.free.lock().pop()
    }

    /// Return an item to the pool.
    pub fn give_back(&self, item: T) {
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(item);
        }
    }

    /// Borrow an item for the lifetime of the returned guard, creating one with `make` if the
    /// pool is empty. The item goes back to the pool when the guard is dropped.
    pub fn checkout(&self, make: impl FnOnce() -> T) -> Pooled<'_, T>
    where
        T: Default,
    {
        let item = self.take().unwrap_or_else(|| {
            log::trace!("scratch pool exhausted, allocating a fresh buffer");
            make()
        });
        Pooled { pool: self, item }
    }

    /// The number of items currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// The maximum number of items this pool keeps.
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}

/// An item checked out of a [`ScratchPool`].
#[derive(Debug)]
pub struct Pooled<'a, T: Default> {
    pool: &'a ScratchPool<T>,
    item: T,
}

impl<T: Default> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Default> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Default> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.item));
    }
}

/// The buffers an index leaves behind when it is dropped.
#[derive(Debug)]
pub(crate) struct RecycledBuffers<N: IndexableNum> {
    pub(crate) selection: Vec<usize>,
    pub(crate) nodes: Vec<Node<N>>,
    pub(crate) frontier: Option<Frontier<N>>,
}

/// The default number of recycled buffer sets kept by a [`SharedPool`].
pub const DEFAULT_SHARED_POOL_SIZE: usize = 4;

/// A pool of index buffers shared between indexes.
///
/// When an index configured with a shared pool is dropped (or [destroyed][destroy]), its node
/// array and scratch buffers are given back here. The next index built with the same pool on
/// a similar number of points reuses them instead of allocating.
///
/// ```
/// use nearest_index::{IndexOptions, NearestIndex, SharedPool};
///
/// let pool = SharedPool::<f64>::new();
/// let options = IndexOptions::default().with_shared_pool(pool.clone());
///
/// let mut first = NearestIndex::with_options(options.clone()).unwrap();
/// first.load(vec![0., 0., 1., 1.]).unwrap();
/// first.destroy();
/// assert_eq!(pool.idle(), 1);
///
/// let mut second = NearestIndex::with_options(options).unwrap();
/// second.load(vec![2., 2., 3., 3.]).unwrap();
/// assert_eq!(pool.idle(), 0);
/// ```
///
/// [destroy]: crate::NearestIndex::destroy
pub struct SharedPool<N: IndexableNum> {
    inner: Arc<ScratchPool<RecycledBuffers<N>>>,
}

impl<N: IndexableNum> SharedPool<N> {
    /// Create a pool keeping up to [`DEFAULT_SHARED_POOL_SIZE`] buffer sets.
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_SHARED_POOL_SIZE)
    }

    /// Create a pool keeping up to `max_idle` buffer sets.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            inner: Arc::new(ScratchPool::new(max_idle)),
        }
    }

    /// The number of buffer sets waiting to be reused.
    pub fn idle(&self) -> usize {
        self.inner.idle()
    }

    pub(crate) fn take(&self) -> Option<RecycledBuffers<N>> {
        self.inner.take()
    }

    pub(crate) fn give_back(&self, buffers: RecycledBuffers<N>) {
        self.inner.give_back(buffers)
    }
}

impl<N: IndexableNum> Default for SharedPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: IndexableNum> Clone for SharedPool<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: IndexableNum> Debug for SharedPool<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.inner.max_idle())
            .finish()
    }
}

/// Two pools are equal when they share the same storage.
impl<N: IndexableNum> PartialEq for SharedPool<N> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
