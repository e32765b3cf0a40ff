use std::mem;

use log::debug;
use parking_lot::Mutex;

use crate::error::{NearestIndexError, Result};
use crate::points::FlatPoints;
use crate::pool::{RecycledBuffers, ScratchPool, SharedPool};
use crate::r#type::IndexableNum;
use crate::rtree::builder::StrBuilder;
use crate::rtree::node::Node;
use crate::rtree::search::Frontier;
use crate::rtree::util::{check_num_points, compute_height, frontier_capacity, node_capacity};

/// The default maximum number of children per node used by [`NearestIndex::new`].
pub const DEFAULT_MAX_FANOUT: usize = 9;

/// The largest supported number of children per node.
pub const MAX_FANOUT: usize = 9;

/// The smallest supported number of children per node.
pub const MIN_FANOUT: usize = 2;

/// How queries obtain their scratch frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScratchMode {
    /// Every query checks a frontier out of a pool owned by the index. Concurrent queries each
    /// get their own.
    #[default]
    Pooled,
    /// The index keeps a single frontier that queries reuse directly, skipping the pool. Meant
    /// for indexes queried from one thread at a time: a query that finds the frontier in use
    /// falls back to a temporary allocation.
    Exclusive,
}

/// Options for building a [`NearestIndex`].
///
/// ```
/// use nearest_index::{IndexOptions, NearestIndex, ScratchMode};
///
/// let options = IndexOptions::<f64>::default()
///     .with_max_fanout(4)
///     .with_scratch_mode(ScratchMode::Exclusive);
/// let index = NearestIndex::with_options(options).unwrap();
/// assert_eq!(index.max_fanout(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOptions<N: IndexableNum> {
    pub(crate) max_fanout: usize,
    pub(crate) scratch_mode: ScratchMode,
    pub(crate) shared_pool: Option<SharedPool<N>>,
}

impl<N: IndexableNum> IndexOptions<N> {
    /// Set the maximum number of children per node, between [`MIN_FANOUT`] and [`MAX_FANOUT`].
    pub fn with_max_fanout(mut self, max_fanout: usize) -> Self {
        self.max_fanout = max_fanout;
        self
    }

    pub fn with_scratch_mode(mut self, scratch_mode: ScratchMode) -> Self {
        self.scratch_mode = scratch_mode;
        self
    }

    /// Recycle buffers through `pool`: they are taken from it on load and given back when the
    /// index is dropped.
    pub fn with_shared_pool(mut self, pool: SharedPool<N>) -> Self {
        self.shared_pool = Some(pool);
        self
    }

    pub fn max_fanout(&self) -> usize {
        self.max_fanout
    }

    pub fn scratch_mode(&self) -> ScratchMode {
        self.scratch_mode
    }

    pub fn shared_pool(&self) -> Option<&SharedPool<N>> {
        self.shared_pool.as_ref()
    }
}

impl<N: IndexableNum> Default for IndexOptions<N> {
    fn default() -> Self {
        Self {
            max_fanout: DEFAULT_MAX_FANOUT,
            scratch_mode: ScratchMode::default(),
            shared_pool: None,
        }
    }
}

/// A static index answering nearest-point queries over a set of 2D points.
///
/// The index is built once with [`load`][Self::load], after which it is immutable and can be
/// queried from many threads at once.
///
/// ```
/// use nearest_index::NearestIndex;
///
/// let mut index = NearestIndex::new();
/// index.load(vec![0., 0., 1., 1., 0., 1.]).unwrap();
///
/// let nearest = index.find_nearest_point(3., 3.).unwrap();
/// assert_eq!((nearest.x, nearest.y), (1., 1.));
/// assert!(index.load(vec![2., 2.]).is_err());
/// ```
#[derive(Debug)]
pub struct NearestIndex<N: IndexableNum = f64> {
    pub(crate) options: IndexOptions<N>,
    pub(crate) points: FlatPoints<N>,
    pub(crate) nodes: Vec<Node<N>>,
    pub(crate) height: usize,
    built: bool,
    /// Bucketing stack used while building.
    selection: Vec<usize>,
    pub(crate) frontiers: ScratchPool<Frontier<N>>,
    pub(crate) exclusive: Mutex<Frontier<N>>,
}

impl<N: IndexableNum> NearestIndex<N> {
    /// Create an empty index with the default options.
    pub fn new() -> Self {
        Self::from_valid_options(IndexOptions::default())
    }

    /// Create an empty index, validating `options`.
    pub fn with_options(options: IndexOptions<N>) -> Result<Self> {
        if !(MIN_FANOUT..=MAX_FANOUT).contains(&options.max_fanout) {
            return Err(NearestIndexError::InvalidFanout(options.max_fanout));
        }
        Ok(Self::from_valid_options(options))
    }

    fn from_valid_options(options: IndexOptions<N>) -> Self {
        let max_idle_frontiers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        Self {
            options,
            points: FlatPoints::default(),
            nodes: Vec::new(),
            height: 0,
            built: false,
            selection: Vec::new(),
            frontiers: ScratchPool::new(max_idle_frontiers),
            exclusive: Mutex::new(Frontier::default()),
        }
    }

    /// Build an index over a flat `[x0, y0, x1, y1, ...]` buffer with the default options.
    pub fn from_points(coords: Vec<N>) -> Result<Self> {
        let mut index = Self::new();
        index.load(coords)?;
        Ok(index)
    }

    /// Build an index over points already ordered lexicographically by `(x, y)`.
    pub fn from_sorted_points(coords: Vec<N>) -> Result<Self> {
        let mut index = Self::new();
        index.load_sorted(coords)?;
        Ok(index)
    }

    /// Build the tree over a flat `[x0, y0, x1, y1, ...]` buffer.
    ///
    /// The index takes ownership of the buffer and reorders its points. Loading an empty buffer
    /// produces a built index that finds nothing. An index can only be loaded once.
    pub fn load(&mut self, coords: Vec<N>) -> Result<()> {
        self.build(coords, false)
    }

    /// Like [`load`][Self::load], for points already ordered lexicographically by `(x, y)`.
    /// The first partition by `x` is skipped.
    pub fn load_sorted(&mut self, coords: Vec<N>) -> Result<()> {
        self.build(coords, true)
    }

    fn build(&mut self, coords: Vec<N>, sorted: bool) -> Result<()> {
        if self.built {
            return Err(NearestIndexError::AlreadyBuilt);
        }

        let mut points = FlatPoints::try_new(coords)?;
        debug_assert!(!sorted || points.is_sorted_lexicographically());
        let num_points = points.len();
        check_num_points(num_points)?;

        let max_fanout = self.options.max_fanout;
        let height = compute_height(num_points, max_fanout);

        let recycled = self
            .options
            .shared_pool
            .as_ref()
            .and_then(|pool| pool.take());
        let reused = recycled.is_some();
        let mut nodes = Vec::new();
        let mut frontier = None;
        if let Some(buffers) = recycled {
            self.selection = buffers.selection;
            nodes = buffers.nodes;
            frontier = buffers.frontier;
        }

        nodes.clear();
        nodes.reserve(node_capacity(num_points, max_fanout));
        self.selection.clear();
        self.selection.reserve(max_fanout + 1);

        // Only fails when the node array outgrows `u32` offsets
        let built = StrBuilder::new(
            points.as_pairs_mut(),
            &mut nodes,
            &mut self.selection,
            max_fanout,
        )
        .build(height, sorted);
        if let Err(err) = built {
            if let Some(pool) = &self.options.shared_pool {
                nodes.clear();
                pool.give_back(RecycledBuffers {
                    selection: mem::take(&mut self.selection),
                    nodes,
                    frontier,
                });
            }
            return Err(err);
        }

        // Leave one frontier ready so the first query does not allocate
        let capacity = frontier_capacity(height, max_fanout);
        let frontier = frontier
            .filter(|frontier| frontier.capacity() >= capacity)
            .unwrap_or_else(|| Frontier::with_capacity(capacity));
        match self.options.scratch_mode {
            ScratchMode::Pooled => self.frontiers.give_back(frontier),
            ScratchMode::Exclusive => *self.exclusive.get_mut() = frontier,
        }

        debug!(
            "built nearest index over {} points: {} nodes, height {}, recycled buffers: {}",
            num_points,
            nodes.len(),
            height,
            reused
        );

        self.points = points;
        self.nodes = nodes;
        self.height = height;
        self.built = true;
        Ok(())
    }

    /// Drop the index, giving its buffers back to the shared pool if one was configured.
    pub fn destroy(self) {
        drop(self)
    }

    /// Returns `true` once the index has been loaded.
    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The number of levels below the root. `0` for an index of at most one point.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_fanout(&self) -> usize {
        self.options.max_fanout
    }

    pub fn options(&self) -> &IndexOptions<N> {
        &self.options
    }

    /// The indexed points as a flat buffer, in the order the tree laid them out.
    pub fn points(&self) -> &[N] {
        self.points.as_slice()
    }

    /// Consume the index and return its reordered point buffer.
    pub fn into_points(mut self) -> Vec<N> {
        mem::take(&mut self.points).into_inner()
    }
}

impl<N: IndexableNum> Default for NearestIndex<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: IndexableNum> Drop for NearestIndex<N> {
    fn drop(&mut self) {
        let Some(pool) = &self.options.shared_pool else {
            return;
        };
        if self.nodes.capacity() == 0 {
            return;
        }

        let frontier = match self.options.scratch_mode {
            ScratchMode::Pooled => self.frontiers.take(),
            ScratchMode::Exclusive => Some(mem::take(self.exclusive.get_mut())),
        };
        pool.give_back(RecycledBuffers {
            selection: mem::take(&mut self.selection),
            nodes: mem::take(&mut self.nodes),
            frontier,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::random_points;

    #[test]
    fn rejects_invalid_fanout() {
        for max_fanout in [0, 1, 10, 64] {
            let options = IndexOptions::<f64>::default().with_max_fanout(max_fanout);
            assert_eq!(
                NearestIndex::with_options(options).unwrap_err(),
                NearestIndexError::InvalidFanout(max_fanout)
            );
        }
        assert_eq!(
            NearestIndexError::InvalidFanout(1).to_string(),
            "Node fanout must be between 2 and 9, got 1."
        );
        for max_fanout in MIN_FANOUT..=MAX_FANOUT {
            let options = IndexOptions::<f64>::default().with_max_fanout(max_fanout);
            assert!(NearestIndex::with_options(options).is_ok());
        }
    }

    #[test]
    fn loads_once() {
        let mut index = NearestIndex::new();
        assert!(!index.is_built());
        index.load(vec![0., 0., 1., 1.]).unwrap();
        assert!(index.is_built());
        assert_eq!(index.load(vec![2., 2.]), Err(NearestIndexError::AlreadyBuilt));
        assert_eq!(
            index.load_sorted(vec![2., 2.]),
            Err(NearestIndexError::AlreadyBuilt)
        );
        assert_eq!(index.num_points(), 2);
    }

    #[test]
    fn empty_load() {
        let mut index = NearestIndex::<f64>::new();
        index.load(vec![]).unwrap();
        assert!(index.is_built());
        assert_eq!(index.num_points(), 0);
        assert_eq!(index.num_nodes(), 0);
        assert_eq!(index.load(vec![]), Err(NearestIndexError::AlreadyBuilt));
    }

    #[test]
    fn invalid_buffers() {
        assert_eq!(
            NearestIndex::from_points(vec![0., 0., 1.]).unwrap_err(),
            NearestIndexError::OddCoordinateCount(3)
        );
        assert_eq!(
            NearestIndex::from_points(vec![0., 0., 1., f64::NAN]).unwrap_err(),
            NearestIndexError::NonFiniteCoordinate { index: 1 }
        );

        // A failed load leaves the index unbuilt
        let mut index = NearestIndex::new();
        assert!(index.load(vec![f64::INFINITY, 0.]).is_err());
        assert!(!index.is_built());
        assert!(index.load(vec![0., 0.]).is_ok());
    }

    #[test]
    fn keeps_every_point() {
        let coords = random_points(1_000, 21);
        let index = NearestIndex::from_points(coords.clone()).unwrap();
        assert_eq!(index.num_points(), 1_000);
        assert_eq!(index.height(), 4);

        let mut expected = coords.chunks_exact(2).map(|p| (p[0], p[1])).collect::<Vec<_>>();
        let mut actual = index
            .into_points()
            .chunks_exact(2)
            .map(|p| (p[0], p[1]))
            .collect::<Vec<_>>();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        actual.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(actual, expected);
    }

    #[test]
    fn sorted_load() {
        let mut pairs = random_points(2_000, 22)
            .chunks_exact(2)
            .map(|p| [p[0], p[1]])
            .collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let coords = pairs.into_iter().flatten().collect::<Vec<_>>();

        let sorted = NearestIndex::from_sorted_points(coords.clone()).unwrap();
        let unsorted = NearestIndex::from_points(coords).unwrap();
        assert_eq!(sorted.height(), unsorted.height());
        for (x, y) in [(0.1, 0.9), (0.5, 0.5), (-1., 3.), (0.77, 0.01)] {
            assert_eq!(
                sorted.find_nearest_point(x, y).unwrap().dist_squared,
                unsorted.find_nearest_point(x, y).unwrap().dist_squared
            );
        }
    }

    #[test]
    fn prewarms_frontier() {
        let index = NearestIndex::from_points(random_points(500, 23)).unwrap();
        assert_eq!(index.frontiers.idle(), 1);
        index.find_nearest_point(0.5, 0.5).unwrap();
        assert_eq!(index.frontiers.idle(), 1);
    }

    #[test]
    fn recycles_through_shared_pool() {
        let pool = SharedPool::<f64>::with_max_idle(2);
        let options = IndexOptions::default().with_shared_pool(pool.clone());

        let mut first = NearestIndex::with_options(options.clone()).unwrap();
        first.load(random_points(1_000, 24)).unwrap();
        let node_capacity = first.nodes.capacity();
        first.destroy();
        assert_eq!(pool.idle(), 1);

        let mut second = NearestIndex::with_options(options.clone()).unwrap();
        second.load(random_points(1_000, 25)).unwrap();
        assert_eq!(pool.idle(), 0);
        assert!(second.nodes.capacity() >= node_capacity);

        // Invalid input fails before any recycled buffers are taken
        let mut failed = NearestIndex::with_options(options.clone()).unwrap();
        assert!(failed.load(vec![0., 0., f64::NAN, 1.]).is_err());
        assert!(failed.load(vec![0., 0., 1.]).is_err());
        assert_eq!(pool.idle(), 0);
        drop(second);
        assert_eq!(pool.idle(), 1);
        assert!(failed.load(vec![0., f64::INFINITY]).is_err());
        assert_eq!(pool.idle(), 1);
        failed.load(vec![0., 0.]).unwrap();
        assert_eq!(pool.idle(), 0);
        drop(failed);
        assert_eq!(pool.idle(), 1);

        // Unloaded indexes have nothing to give back
        drop(NearestIndex::with_options(options).unwrap());
        assert_eq!(pool.idle(), 1);
    }
}
