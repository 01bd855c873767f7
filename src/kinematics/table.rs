//! Total-rotation table with interpolation between sampled times.

use std::collections::HashMap;

use super::model::{PlateId, RotationError, RotationModel, ANCHOR_PLATE_ID};
use crate::geometry::FiniteRotation;

const TIME_TOLERANCE: f64 = 1e-9;

/// Rotation model built from total rotations sampled at discrete times.
///
/// Each sample maps a plate's present-day position to its position at the
/// sample time. Rotations between samples are interpolated along the
/// shortest path.
#[derive(Debug, Clone, Default)]
pub struct RotationTable {
    sequences: HashMap<PlateId, Vec<(f64, FiniteRotation)>>,
}

impl RotationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a total rotation sample, replacing any sample at the same time.
    pub fn insert(&mut self, plate_id: PlateId, time: f64, rotation: FiniteRotation) {
        let samples = self.sequences.entry(plate_id).or_default();
        match samples.binary_search_by(|(t, _)| t.total_cmp(&time)) {
            Ok(idx) => samples[idx].1 = rotation,
            Err(idx) => samples.insert(idx, (time, rotation)),
        }
    }

    /// Adds a total rotation sample, builder style.
    pub fn with_sample(mut self, plate_id: PlateId, time: f64, rotation: FiniteRotation) -> Self {
        self.insert(plate_id, time, rotation);
        self
    }

    /// Returns the sampled time range of a plate.
    pub fn time_range(&self, plate_id: PlateId) -> Option<(f64, f64)> {
        let samples = self.sequences.get(&plate_id)?;
        Some((samples.first()?.0, samples.last()?.0))
    }

    /// Returns the total rotation of a plate at `time`.
    pub fn total_rotation(&self, plate_id: PlateId, time: f64) -> Result<FiniteRotation, RotationError> {
        let Some(samples) = self.sequences.get(&plate_id) else {
            if plate_id == ANCHOR_PLATE_ID {
                return Ok(FiniteRotation::IDENTITY);
            }
            return Err(RotationError::UnknownPlate { plate_id });
        };

        let out_of_range = || RotationError::TimeOutOfRange { plate_id, time };
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(RotationError::UnknownPlate { plate_id }),
        };
        if time < first.0 - TIME_TOLERANCE || time > last.0 + TIME_TOLERANCE {
            return Err(out_of_range());
        }

        // Index of the first sample at or older than `time`
        let upper = samples.partition_point(|(t, _)| *t < time);
        if upper == 0 {
            return Ok(first.1);
        }
        if upper == samples.len() {
            return Ok(last.1);
        }

        let (t0, r0) = samples[upper - 1];
        let (t1, r1) = samples[upper];
        if (t1 - time).abs() <= TIME_TOLERANCE {
            return Ok(r1);
        }
        let fraction = (time - t0) / (t1 - t0);
        Ok(r0.slerp(&r1, fraction))
    }
}

impl RotationModel for RotationTable {
    fn stage_rotation(
        &self,
        plate_id: PlateId,
        from_time: f64,
        to_time: f64,
    ) -> Result<FiniteRotation, RotationError> {
        let from = self.total_rotation(plate_id, from_time)?;
        let to = self.total_rotation(plate_id, to_time)?;
        Ok(to * from.inverse())
    }
}
