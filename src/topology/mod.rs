//! Plate topology system.
//!
//! This module covers the plate-boundary side of reconstruction:
//! - Resolved plate polygons tagged with plate IDs and boundary feature types
//! - The resolver interface queried once per time step
//! - Point-in-polygon location of point batches

mod locator;
mod resolved;
mod set;

pub use locator::{PointLocator, PolygonPartitioner};
pub use resolved::{BoundarySubSegment, FeatureType, ResolvedTopology, TopologyError, TopologyResolver};
pub use set::{TopologyFeature, TopologySet};
