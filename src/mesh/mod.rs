//! Mesh bookkeeping shared by both terrains: batches, the accumulating buffer and the patch builders.

mod buffer;
mod grid;

pub use buffer::{MeshBatch, MeshBuffer, carve};
pub use grid::{Footprint, cell_count};
