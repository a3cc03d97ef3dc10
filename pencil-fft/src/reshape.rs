//! Redistribution of box-partitioned data between two layouts.
pub mod operator;
pub mod pack;
pub mod types;

pub use operator::{build_reshape, Reshape};
pub use types::Tile;
