//! Rotation model interface.

use std::sync::Arc;

use thiserror::Error;

use crate::geometry::FiniteRotation;

/// Integer identifier of a rigid plate.
pub type PlateId = u32;

/// The plate held fixed when measuring absolute motion.
pub const ANCHOR_PLATE_ID: PlateId = 0;

/// Errors raised when rotation data cannot answer a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RotationError {
    #[error("No rotation data for plate {plate_id}")]
    UnknownPlate { plate_id: PlateId },
    #[error("Rotation data for plate {plate_id} does not cover {time} Ma")]
    TimeOutOfRange { plate_id: PlateId, time: f64 },
}

/// Source of plate rotations through geological time.
///
/// Times are ages (Ma): larger values are further in the past.
pub trait RotationModel: Send + Sync {
    /// Returns the rotation that moves a point fixed to `plate_id` from its
    /// position at `from_time` to its position at `to_time`.
    fn stage_rotation(
        &self,
        plate_id: PlateId,
        from_time: f64,
        to_time: f64,
    ) -> Result<FiniteRotation, RotationError>;
}

impl<M: RotationModel + ?Sized> RotationModel for Arc<M> {
    fn stage_rotation(
        &self,
        plate_id: PlateId,
        from_time: f64,
        to_time: f64,
    ) -> Result<FiniteRotation, RotationError> {
        (**self).stage_rotation(plate_id, from_time, to_time)
    }
}

impl<M: RotationModel + ?Sized> RotationModel for &M {
    fn stage_rotation(
        &self,
        plate_id: PlateId,
        from_time: f64,
        to_time: f64,
    ) -> Result<FiniteRotation, RotationError> {
        (**self).stage_rotation(plate_id, from_time, to_time)
    }
}
