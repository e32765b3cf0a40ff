use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NearestIndexError {
    /// The requested node fanout is outside of `MIN_FANOUT..=MAX_FANOUT`.
    ///
    /// A fanout of 1 is rejected too: a node with a single child holds as many points as the
    /// node itself, so partitioning would never reach a leaf group.
    #[error("Node fanout must be between 2 and 9, got {0}.")]
    InvalidFanout(usize),

    /// The point count does not fit the `u32` offsets stored in each node.
    #[error("Exceeded maximum possible number of points: got {0}.")]
    TooManyPoints(usize),

    /// A flat coordinate buffer must hold `x, y` pairs.
    #[error("Flat coordinate buffer has odd length {0}.")]
    OddCoordinateCount(usize),

    /// Coordinates must be finite for distances and ordering to be meaningful.
    #[error("Point {index} has a non-finite coordinate.")]
    NonFiniteCoordinate {
        /// Position of the offending point in the input buffer.
        index: usize,
    },

    /// `load` was called on an index that already holds a tree.
    #[error("Index is immutable once built, cannot load twice.")]
    AlreadyBuilt,
}

pub type Result<T> = std::result::Result<T, NearestIndexError>;
