//! Collision policy interface.

use glam::DVec3;

use crate::kinematics::{PlateId, RotationModel};
use crate::reconstruction::ReconstructionError;
use crate::topology::ResolvedTopology;

/// Why a point was removed by a collision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// Subducted at a trench (forward in time) or consumed by a ridge
    /// (backward in time).
    Boundary,
    /// Landed inside a continental mask.
    Continent,
}

/// Everything a policy may inspect for one point over one time step.
///
/// `prev_*` describe the start of the step, `curr_*` the end. A point with
/// no resolved topology fell outside every plate polygon.
#[derive(Clone, Copy)]
pub struct CollisionContext<'a> {
    /// Rotation model driving the reconstruction.
    pub rotation_model: &'a dyn RotationModel,
    /// Time (Ma) at the end of the step.
    pub time: f64,
    /// Magnitude of the step (Myr).
    pub time_interval: f64,
    /// Position at the start of the step.
    pub prev_point: DVec3,
    /// Position at the end of the step.
    pub curr_point: DVec3,
    /// Topology containing the point at the start of the step.
    pub prev_topology: Option<&'a ResolvedTopology>,
    /// Topology containing the point at the end of the step.
    pub curr_topology: Option<&'a ResolvedTopology>,
}

impl CollisionContext<'_> {
    /// Plate ID of the topology containing the previous position.
    pub fn prev_plate_id(&self) -> Option<PlateId> {
        self.prev_topology.map(|t| t.plate_id)
    }

    /// Plate ID of the topology containing the current position.
    pub fn curr_plate_id(&self) -> Option<PlateId> {
        self.curr_topology.map(|t| t.plate_id)
    }
}

/// Strategy deciding whether a point is deactivated at the end of a step.
///
/// Policies may keep caches between calls, hence `&mut self`.
pub trait CollisionPolicy: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns `Some(kind)` if the point collided during the step.
    fn evaluate(&mut self, ctx: &CollisionContext<'_>) -> Result<Option<CollisionKind>, ReconstructionError>;

    /// Points removed by this policy for the most recent time evaluated,
    /// or `None` if the policy keeps no count.
    fn deletion_count(&self) -> Option<usize> {
        None
    }
}

impl<P: CollisionPolicy + ?Sized> CollisionPolicy for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(&mut self, ctx: &CollisionContext<'_>) -> Result<Option<CollisionKind>, ReconstructionError> {
        (**self).evaluate(ctx)
    }

    fn deletion_count(&self) -> Option<usize> {
        (**self).deletion_count()
    }
}
