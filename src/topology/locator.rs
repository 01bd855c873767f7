//! Point-in-polygon partitioning of point batches.

use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;

use super::resolved::ResolvedTopology;

/// Finds, for each point, the polygon containing it.
pub trait PointLocator: Send + Sync {
    /// Returns, per point, the index into `topologies` of the containing
    /// polygon, or `None` if the point falls outside all of them.
    fn locate(&self, points: &[DVec3], topologies: &[Arc<ResolvedTopology>]) -> Vec<Option<usize>>;
}

/// Brute-force locator that tests every polygon in order.
///
/// When polygons overlap the first one listed wins. Points are tested in
/// parallel.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonPartitioner;

impl PolygonPartitioner {
    /// Locates a single point.
    pub fn locate_point(point: DVec3, topologies: &[Arc<ResolvedTopology>]) -> Option<usize> {
        topologies.iter().position(|topology| topology.contains(point))
    }
}

impl PointLocator for PolygonPartitioner {
    fn locate(&self, points: &[DVec3], topologies: &[Arc<ResolvedTopology>]) -> Vec<Option<usize>> {
        if topologies.is_empty() {
            return vec![None; points.len()];
        }
        points
            .par_iter()
            .map(|&point| Self::locate_point(point, topologies))
            .collect()
    }
}
