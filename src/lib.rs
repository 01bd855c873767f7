//! Point reconstruction through dynamically resolved plate topologies.
//!
//! This crate tracks points on a sphere as they are carried by rigid
//! tectonic plates whose boundaries change through time, deactivating
//! points that are subducted or consumed at plate boundaries.

pub mod geometry;
pub mod kinematics;
pub mod topology;
pub mod raster;
pub mod collision;
pub mod reconstruction;
pub mod scenario;

pub use geometry::{BoundaryPolygon, FiniteRotation, Polyline};
pub use kinematics::{EulerPole, EulerPoleModel, PlateId, RotationModel, RotationTable};
pub use topology::{PointLocator, PolygonPartitioner, ResolvedTopology, TopologyResolver, TopologySet};
pub use raster::{EquirectMaskLoader, MaskGrid, RasterLoader};
pub use collision::{CollisionParameters, CollisionPolicy, ContinentCollision, KinematicCollision};
pub use reconstruction::{
    reconstruct_points, CollisionDetection, ReconstructByTopologies, ReconstructOptions, ReconstructionError, TimeSpan,
};
pub use scenario::Scenario;
