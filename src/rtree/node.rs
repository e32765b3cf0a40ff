use std::ops::Range;

use crate::bbox::BBox;
use crate::r#type::IndexableNum;

/// What the children of a node are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum NodeKind {
    /// Children are nodes in the node array.
    #[default]
    Internal,
    /// Children are points in the point buffer.
    LeafGroup,
}

/// One entry of the flat node array.
///
/// The children of a node are always contiguous, either in the node array or in the point
/// buffer, so a start offset and a count describe them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Node<N: IndexableNum> {
    pub(crate) kind: NodeKind,
    pub(crate) num_children: u8,
    pub(crate) first_child: u32,
    pub(crate) bbox: BBox<N>,
}

impl<N: IndexableNum> Node<N> {
    pub(crate) fn internal(first_child: u32, num_children: u8, bbox: BBox<N>) -> Self {
        Self {
            kind: NodeKind::Internal,
            num_children,
            first_child,
            bbox,
        }
    }

    pub(crate) fn leaf_group(first_point: u32, num_points: u8, bbox: BBox<N>) -> Self {
        Self {
            kind: NodeKind::LeafGroup,
            num_children: num_points,
            first_child: first_point,
            bbox,
        }
    }

    /// The range of children, indexing the node array or the point buffer depending on
    /// [`NodeKind`].
    #[inline]
    pub(crate) fn children(&self) -> Range<usize> {
        let start = self.first_child as usize;
        start..start + self.num_children as usize
    }
}
