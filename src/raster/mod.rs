//! Raster inputs for mask-based collision detection.
//!
//! Continental masks are scalar fields over longitude/latitude, one per
//! reconstruction time, sampled with nearest-neighbour lookup.

mod grid;
mod loader;

pub use grid::MaskGrid;
pub use loader::{EquirectMaskLoader, FnRasterLoader, RasterError, RasterLoader};
