//! A static R-tree over points, bulk loaded with sort-tile-recursive partitioning.

mod builder;
pub mod index;
pub(crate) mod node;
pub mod search;
pub mod traversal;
mod util;

pub use index::{
    IndexOptions, NearestIndex, ScratchMode, DEFAULT_MAX_FANOUT, MAX_FANOUT, MIN_FANOUT,
};
pub use search::Neighbor;
pub use traversal::NodeRef;
