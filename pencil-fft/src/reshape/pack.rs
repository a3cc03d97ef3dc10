//! Strided copies between box layouts and packed tile buffers.
//!
//! A tile's region is always walked in the source box's axis order, so
//! the packed stream is identical on both sides of the wire. The fastest
//! source axis has unit stride by construction, which keeps the pack loop
//! on `copy_from_slice` rows; the unpack side writes through the
//! destination strides and absorbs any transposition.

use crate::reshape::types::Tile;

/// Copy a tile's region out of the source buffer into a packed slot.
pub fn pack<T: Copy>(src: &[T], tile: &Tile, out: &mut [T]) {
    let ord = tile.src.order;
    let strides = tile.src.strides();
    let n_fast = tile.region.size(ord[0]);
    let n_mid = tile.region.size(ord[1]);
    let n_slow = tile.region.size(ord[2]);
    let s_mid = strides[ord[1]];
    let s_slow = strides[ord[2]];
    let base = tile.src.index_of(tile.region.low);

    let mut k = 0;
    for i_slow in 0..n_slow {
        for i_mid in 0..n_mid {
            let row = base + i_slow * s_slow + i_mid * s_mid;
            out[k..k + n_fast].copy_from_slice(&src[row..row + n_fast]);
            k += n_fast;
        }
    }
}

/// Copy a packed slot into the destination buffer, transposing into the
/// destination box's axis order.
pub fn unpack<T: Copy>(packed: &[T], tile: &Tile, dst: &mut [T]) {
    let ord = tile.src.order;
    let strides = tile.dst.strides();
    let n_fast = tile.region.size(ord[0]);
    let n_mid = tile.region.size(ord[1]);
    let n_slow = tile.region.size(ord[2]);
    let d_fast = strides[ord[0]];
    let d_mid = strides[ord[1]];
    let d_slow = strides[ord[2]];
    let base = tile.dst.index_of(tile.region.low);

    let mut k = 0;
    for i_slow in 0..n_slow {
        for i_mid in 0..n_mid {
            let row = base + i_slow * d_slow + i_mid * d_mid;
            if d_fast == 1 {
                dst[row..row + n_fast].copy_from_slice(&packed[k..k + n_fast]);
                k += n_fast;
            } else {
                for i_fast in 0..n_fast {
                    dst[row + i_fast * d_fast] = packed[k];
                    k += 1;
                }
            }
        }
    }
}

/// Move a self-tile straight from source to destination layout, never
/// touching the transport.
pub fn copy_local<T: Copy>(src: &[T], tile: &Tile, dst: &mut [T]) {
    let ord = tile.src.order;
    let s = tile.src.strides();
    let d = tile.dst.strides();
    let n_fast = tile.region.size(ord[0]);
    let n_mid = tile.region.size(ord[1]);
    let n_slow = tile.region.size(ord[2]);
    let src_base = tile.src.index_of(tile.region.low);
    let dst_base = tile.dst.index_of(tile.region.low);
    let d_fast = d[ord[0]];

    for i_slow in 0..n_slow {
        for i_mid in 0..n_mid {
            let src_row = src_base + i_slow * s[ord[2]] + i_mid * s[ord[1]];
            let dst_row = dst_base + i_slow * d[ord[2]] + i_mid * d[ord[1]];
            if d_fast == 1 {
                dst[dst_row..dst_row + n_fast].copy_from_slice(&src[src_row..src_row + n_fast]);
            } else {
                for i_fast in 0..n_fast {
                    dst[dst_row + i_fast * d_fast] = src[src_row + i_fast];
                }
            }
        }
    }
}
