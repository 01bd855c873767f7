//! Constant-rate Euler pole rotation model.

use std::collections::HashMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::model::{PlateId, RotationError, RotationModel, ANCHOR_PLATE_ID};
use crate::geometry::{lat_lon_to_unit, FiniteRotation};

/// Motion of one plate relative to the anchor plate.
///
/// The plate turns about `pole` at `rate` degrees per Myr, positive
/// counter-clockwise looking down on the pole, going forward in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerPole {
    /// Pole latitude in degrees.
    pub lat: f64,
    /// Pole longitude in degrees.
    pub lon: f64,
    /// Angular rate in degrees per Myr.
    pub rate: f64,
}

impl EulerPole {
    /// Creates a pole from latitude/longitude (degrees) and rate (degrees/Myr).
    pub fn new(lat: f64, lon: f64, rate: f64) -> Self {
        Self { lat, lon, rate }
    }

    /// Returns the pole as a unit vector.
    pub fn axis(&self) -> DVec3 {
        lat_lon_to_unit(self.lat, self.lon)
    }
}

/// Rotation model where every plate moves about a fixed Euler pole.
///
/// Useful for synthetic scenarios and tests. The anchor plate never moves.
#[derive(Debug, Clone, Default)]
pub struct EulerPoleModel {
    poles: HashMap<PlateId, EulerPole>,
}

impl EulerPoleModel {
    /// Creates an empty model containing only the anchor plate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the pole of a plate.
    pub fn with_plate(mut self, plate_id: PlateId, pole: EulerPole) -> Self {
        self.insert(plate_id, pole);
        self
    }

    /// Adds or replaces the pole of a plate.
    pub fn insert(&mut self, plate_id: PlateId, pole: EulerPole) {
        self.poles.insert(plate_id, pole);
    }

    /// Returns the pole of a plate, if known.
    pub fn pole(&self, plate_id: PlateId) -> Option<&EulerPole> {
        self.poles.get(&plate_id)
    }

    /// Returns the number of plates with explicit poles.
    pub fn num_plates(&self) -> usize {
        self.poles.len()
    }
}

impl RotationModel for EulerPoleModel {
    fn stage_rotation(
        &self,
        plate_id: PlateId,
        from_time: f64,
        to_time: f64,
    ) -> Result<FiniteRotation, RotationError> {
        let Some(pole) = self.poles.get(&plate_id) else {
            if plate_id == ANCHOR_PLATE_ID {
                return Ok(FiniteRotation::IDENTITY);
            }
            return Err(RotationError::UnknownPlate { plate_id });
        };

        // Going forward in time (decreasing age) turns the plate by +rate
        let angle = (pole.rate * (from_time - to_time)).to_radians();
        Ok(FiniteRotation::from_axis_angle(pole.axis(), angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::unit_to_lat_lon;

    fn model() -> EulerPoleModel {
        EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0))
    }

    #[test]
    fn test_forward_in_time_rotates_positive() {
        let rot = model().stage_rotation(101, 10.0, 0.0).unwrap();
        let (lat, lon) = unit_to_lat_lon(rot * lat_lon_to_unit(0.0, 0.0));
        assert!(lat.abs() < 1e-9);
        assert!((lon - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_backward_is_inverse_of_forward() {
        let m = model();
        let forward = m.stage_rotation(101, 10.0, 5.0).unwrap();
        let backward = m.stage_rotation(101, 5.0, 10.0).unwrap();
        let p = lat_lon_to_unit(30.0, 45.0);
        assert!((backward * (forward * p) - p).length() < 1e-12);
    }

    #[test]
    fn test_anchor_plate_is_fixed() {
        let rot = model().stage_rotation(ANCHOR_PLATE_ID, 100.0, 0.0).unwrap();
        assert_eq!(rot, FiniteRotation::IDENTITY);
    }

    #[test]
    fn test_unknown_plate() {
        let err = model().stage_rotation(202, 1.0, 0.0).unwrap_err();
        assert_eq!(err, RotationError::UnknownPlate { plate_id: 202 });
    }

    #[test]
    fn test_stage_rotations_compose() {
        let m = model();
        let a = m.stage_rotation(101, 10.0, 7.0).unwrap();
        let b = m.stage_rotation(101, 7.0, 0.0).unwrap();
        let whole = m.stage_rotation(101, 10.0, 0.0).unwrap();
        let p = lat_lon_to_unit(-20.0, 100.0);
        assert!(((b * a) * p - whole * p).length() < 1e-12);
    }
}
