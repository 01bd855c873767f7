//! Kinematic collision detection from plate velocities and boundary proximity.

use std::collections::HashMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::policy::{CollisionContext, CollisionKind, CollisionPolicy};
use crate::geometry::EARTH_RADIUS_KM;
use crate::kinematics::{PlateId, StageRotationCache};
use crate::reconstruction::ReconstructionError;
use crate::topology::FeatureType;

/// Thresholds controlling when a plate transition counts as a collision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionParameters {
    /// Minimum change in velocity (km/Myr) between the two plates for the
    /// point to be consumed. Slower transitions are treated as plate splits
    /// or merges.
    pub velocity_threshold: f64,
    /// Distance (km per Myr of step) added to the relative velocity when
    /// computing how close to the old boundary the point must have been.
    pub distance_threshold_per_time: f64,
}

impl Default for CollisionParameters {
    fn default() -> Self {
        Self {
            velocity_threshold: 7.0,
            distance_threshold_per_time: 10.0,
        }
    }
}

impl CollisionParameters {
    /// Creates a parameter pair.
    pub fn new(velocity_threshold: f64, distance_threshold_per_time: f64) -> Self {
        Self {
            velocity_threshold,
            distance_threshold_per_time,
        }
    }

    /// Angular distance threshold (radians) for a transition at
    /// `relative_velocity`, or `None` if the velocity change is too small to
    /// be a collision.
    pub fn distance_threshold(&self, relative_velocity: f64, time_interval: f64, radius_km: f64) -> Option<f64> {
        if relative_velocity <= self.velocity_threshold {
            return None;
        }
        // The offset covers boundaries that are redrawn between steps, the
        // velocity term covers points that would tunnel through the boundary
        Some((self.distance_threshold_per_time + relative_velocity) * time_interval / radius_km)
    }
}

/// Default collision policy.
///
/// A point that changes plate ID is consumed when the velocity jump between
/// the two plates is large and its *previous* position lay close to the
/// *previous* plate boundary. Using the previous state ignores boundaries
/// that only appear at the current time, and still catches boundaries that
/// vanish at the current time.
#[derive(Debug, Clone)]
pub struct KinematicCollision {
    global: CollisionParameters,
    feature_specific: HashMap<FeatureType, CollisionParameters>,
    radius_km: f64,
    velocity_rotations: Option<StageRotationCache>,
}

impl Default for KinematicCollision {
    fn default() -> Self {
        Self::new(CollisionParameters::default())
    }
}

impl KinematicCollision {
    /// Creates a policy using the same thresholds for every boundary.
    pub fn new(global: CollisionParameters) -> Self {
        Self {
            global,
            feature_specific: HashMap::new(),
            radius_km: EARTH_RADIUS_KM,
            velocity_rotations: None,
        }
    }

    /// Overrides the thresholds for boundary sub-segments of one feature type.
    ///
    /// Once any override exists, proximity is tested per sub-segment.
    pub fn with_feature_parameters(
        mut self,
        feature_type: impl Into<FeatureType>,
        parameters: CollisionParameters,
    ) -> Self {
        self.feature_specific.insert(feature_type.into(), parameters);
        self
    }

    /// Returns the global thresholds.
    pub fn global_parameters(&self) -> CollisionParameters {
        self.global
    }

    /// Returns the thresholds used for a feature type.
    pub fn parameters_for(&self, feature_type: &FeatureType) -> CollisionParameters {
        self.feature_specific
            .get(feature_type)
            .copied()
            .unwrap_or(self.global)
    }

    /// Velocity stage rotations for the step ending at `time`.
    fn velocity_cache(&mut self, time: f64) -> &mut StageRotationCache {
        let times = (time + 1.0, time);
        if self.velocity_rotations.as_ref().map(StageRotationCache::times) != Some(times) {
            self.velocity_rotations = None;
        }
        self.velocity_rotations
            .get_or_insert_with(|| StageRotationCache::new(times.0, times.1))
    }

    /// Magnitude (km/Myr) of the velocity difference between the two plates
    /// at the current point.
    fn relative_velocity(&mut self, ctx: &CollisionContext<'_>, prev_plate: PlateId, curr_plate: PlateId) -> Result<f64, ReconstructionError> {
        let radius = self.radius_km;
        let cache = self.velocity_cache(ctx.time);
        let prev_rotation = cache.fetch(ctx.rotation_model, prev_plate)?;
        let curr_rotation = cache.fetch(ctx.rotation_model, curr_plate)?;

        // Both velocities are taken at the current point so they are comparable
        let point: DVec3 = ctx.curr_point;
        let prev_velocity = prev_rotation.velocity_at(point, 1.0, radius);
        let curr_velocity = curr_rotation.velocity_at(point, 1.0, radius);
        Ok((curr_velocity - prev_velocity).length())
    }
}

impl CollisionPolicy for KinematicCollision {
    fn name(&self) -> &str {
        "kinematic"
    }

    fn evaluate(&mut self, ctx: &CollisionContext<'_>) -> Result<Option<CollisionKind>, ReconstructionError> {
        let (Some(prev_topology), Some(curr_topology)) = (ctx.prev_topology, ctx.curr_topology) else {
            return Ok(None);
        };
        if prev_topology.plate_id == curr_topology.plate_id {
            return Ok(None);
        }

        let relative_velocity = self.relative_velocity(ctx, prev_topology.plate_id, curr_topology.plate_id)?;
        let prev_point = ctx.prev_point;

        let collided = if self.feature_specific.is_empty() || prev_topology.sub_segments.is_empty() {
            self.global
                .distance_threshold(relative_velocity, ctx.time_interval, self.radius_km)
                .and_then(|threshold| prev_topology.boundary.distance_within(prev_point, threshold))
                .is_some()
        } else {
            prev_topology.sub_segments.iter().any(|segment| {
                self.parameters_for(&segment.feature_type)
                    .distance_threshold(relative_velocity, ctx.time_interval, self.radius_km)
                    .and_then(|threshold| segment.geometry.distance_within(prev_point, threshold))
                    .is_some()
            })
        };

        Ok(collided.then_some(CollisionKind::Boundary))
    }
}
