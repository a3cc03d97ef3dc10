//! Reshape descriptor types.

use crate::plan::Box3;

/// One non-empty intersection between a source box and a destination box.
///
/// `region` is the intersection in global lattice coordinates; `src` and
/// `dst` are the two boxes it connects. Packed data always travels in the
/// source box's axis order, so the receiving side can replay the same
/// sequence while writing through the destination box's strides; the
/// transposition happens on the write side.
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    /// Rank owning the other side of the tile.
    pub peer: usize,

    /// Intersection in global coordinates.
    pub region: Box3,

    /// Box the data is read from; its order is the packing order.
    pub src: Box3,

    /// Box the data lands in.
    pub dst: Box3,

    /// Element count of the tile.
    pub len: usize,
}
