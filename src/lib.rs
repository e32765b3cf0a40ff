#![doc = include_str!("../README.md")]

pub mod bbox;
mod error;
pub mod points;
pub mod pool;
pub mod rtree;
pub mod select;
mod r#type;

pub use error::NearestIndexError;
pub use pool::SharedPool;
pub use r#type::{Coord, IndexableNum};
pub use rtree::{IndexOptions, NearestIndex, Neighbor, ScratchMode};

#[cfg(test)]
pub(crate) mod test;
