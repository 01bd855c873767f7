//! Per-plate stage rotation cache for a single time pair.

use std::collections::HashMap;

use tracing::trace;

use super::model::{PlateId, RotationError, RotationModel};
use crate::geometry::FiniteRotation;

/// Stage rotations keyed by plate ID, all between the same two times.
///
/// A plate ID maps to a different rotation for every time pair, so a cache
/// is built for one pair and dropped (or reset) when the pair changes.
#[derive(Debug, Clone)]
pub struct StageRotationCache {
    from_time: f64,
    to_time: f64,
    rotations: HashMap<PlateId, FiniteRotation>,
}

impl StageRotationCache {
    /// Creates an empty cache for rotations from `from_time` to `to_time`.
    pub fn new(from_time: f64, to_time: f64) -> Self {
        Self {
            from_time,
            to_time,
            rotations: HashMap::new(),
        }
    }

    /// Returns the `(from_time, to_time)` pair this cache serves.
    pub fn times(&self) -> (f64, f64) {
        (self.from_time, self.to_time)
    }

    /// Returns a cached rotation without querying the model.
    pub fn get(&self, plate_id: PlateId) -> Option<&FiniteRotation> {
        self.rotations.get(&plate_id)
    }

    /// Returns the rotation for a plate, querying the model on a miss.
    pub fn fetch(
        &mut self,
        model: &dyn RotationModel,
        plate_id: PlateId,
    ) -> Result<FiniteRotation, RotationError> {
        if let Some(rotation) = self.rotations.get(&plate_id) {
            return Ok(*rotation);
        }
        trace!(plate_id, from = self.from_time, to = self.to_time, "stage rotation cache miss");
        let rotation = model.stage_rotation(plate_id, self.from_time, self.to_time)?;
        self.rotations.insert(plate_id, rotation);
        Ok(rotation)
    }

    /// Number of cached plates.
    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }
}
