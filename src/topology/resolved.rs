//! Resolved plate topologies and the resolver interface.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{BoundaryPolygon, Polyline};
use crate::kinematics::PlateId;

/// Feature type of a boundary sub-segment, e.g. `"SubductionZone"` or
/// `"MidOceanRidge"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureType(String);

impl FeatureType {
    /// Creates a feature type from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the feature type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One piece of a resolved plate boundary, contributed by a single feature.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundarySubSegment {
    /// Type of the feature this piece came from.
    pub feature_type: FeatureType,
    /// Geometry of the piece at the resolved time.
    pub geometry: Polyline,
}

/// A plate polygon valid at one reconstruction time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTopology {
    /// Plate carrying everything inside the polygon.
    pub plate_id: PlateId,
    /// Full boundary outline.
    pub boundary: BoundaryPolygon,
    /// Boundary pieces tagged with their feature types.
    pub sub_segments: Vec<BoundarySubSegment>,
}

impl ResolvedTopology {
    /// Creates a topology without sub-segment information.
    pub fn new(plate_id: PlateId, boundary: BoundaryPolygon) -> Self {
        Self {
            plate_id,
            boundary,
            sub_segments: Vec::new(),
        }
    }

    /// Attaches a boundary sub-segment.
    pub fn with_sub_segment(mut self, feature_type: impl Into<FeatureType>, geometry: Polyline) -> Self {
        self.sub_segments.push(BoundarySubSegment {
            feature_type: feature_type.into(),
            geometry,
        });
        self
    }

    /// Tests whether the polygon contains a point.
    pub fn contains(&self, point: glam::DVec3) -> bool {
        self.boundary.contains(point)
    }
}

/// Errors raised when plate topologies cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Topologies cannot be resolved at {time} Ma: {reason}")]
    Unresolvable { time: f64, reason: String },
}

/// Source of plate polygons through geological time.
pub trait TopologyResolver: Send + Sync {
    /// Returns every plate polygon valid at `time`.
    ///
    /// An empty result is legal; points then fall back to their own plate IDs.
    fn resolve(&self, time: f64) -> Result<Vec<Arc<ResolvedTopology>>, TopologyError>;
}

impl<T: TopologyResolver + ?Sized> TopologyResolver for Arc<T> {
    fn resolve(&self, time: f64) -> Result<Vec<Arc<ResolvedTopology>>, TopologyError> {
        (**self).resolve(time)
    }
}
