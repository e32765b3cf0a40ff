//! Utilities to traverse the tree structure, e.g. to export node boxes for debugging.

use geo_traits::RectTrait;

use crate::bbox::{impl_rect_geometry, BBox};
use crate::r#type::{Coord, IndexableNum};
use crate::rtree::index::NearestIndex;
use crate::rtree::node::{Node, NodeKind};

/// A reference to a node of a [`NearestIndex`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a, N: IndexableNum> {
    index: &'a NearestIndex<N>,
    /// Position of this node in the node array.
    pos: usize,
}

impl<'a, N: IndexableNum> NodeRef<'a, N> {
    fn node(&self) -> &'a Node<N> {
        &self.index.nodes[self.pos]
    }

    /// The bounding box of every point below this node.
    pub fn bbox(&self) -> BBox<N> {
        self.node().bbox
    }

    /// Returns `true` if the children of this node are points rather than nodes.
    pub fn is_leaf_group(&self) -> bool {
        self.node().kind == NodeKind::LeafGroup
    }

    /// The number of direct children.
    pub fn len(&self) -> usize {
        self.node().num_children as usize
    }

    /// Nodes always have at least one child.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the child nodes of this node. Empty for leaf groups.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, N>> + 'a {
        let index = self.index;
        let children = if self.is_leaf_group() {
            0..0
        } else {
            self.node().children()
        };
        children.map(move |pos| NodeRef { index, pos })
    }

    /// Returns an iterator over the points of this node. Empty unless this is a leaf group.
    pub fn points(&self) -> impl Iterator<Item = Coord<N>> + 'a {
        let points: &'a [[N; 2]] = if self.is_leaf_group() {
            &self.index.points.as_pairs()[self.node().children()]
        } else {
            &[]
        };
        points.iter().map(|&[x, y]| Coord { x, y })
    }
}

impl_rect_geometry!(NodeRef<'a, N>, 'a, N: IndexableNum);

impl<N: IndexableNum> RectTrait for NodeRef<'_, N> {
    type CoordType<'a>
        = Coord<N>
    where
        Self: 'a;

    fn min(&self) -> Self::CoordType<'_> {
        let bbox = self.bbox();
        Coord {
            x: bbox.min_x,
            y: bbox.min_y,
        }
    }

    fn max(&self) -> Self::CoordType<'_> {
        let bbox = self.bbox();
        Coord {
            x: bbox.max_x,
            y: bbox.max_y,
        }
    }
}

impl<N: IndexableNum> NearestIndex<N> {
    /// Access the root node for manual traversal. `None` when the index holds no points.
    pub fn root(&self) -> Option<NodeRef<'_, N>> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeRef {
                index: self,
                pos: 0,
            })
        }
    }
}
