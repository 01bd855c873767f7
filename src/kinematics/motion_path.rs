//! Motion paths and flowlines of seed points.

use glam::DVec3;

use super::model::{PlateId, RotationError, RotationModel, ANCHOR_PLATE_ID};
use crate::geometry::{great_circle_distance, FiniteRotation};

/// Reconstructs a seed point through a sequence of times on one plate.
///
/// The seed is the point's position at `times[0]`; the returned vector has
/// one position per entry in `times`.
///
/// # Arguments
/// * `model` - Rotation model providing stage rotations
/// * `seed` - Position at the first time
/// * `plate_id` - Plate carrying the point
/// * `times` - Times (Ma) to sample, in any order
pub fn motion_path(
    model: &dyn RotationModel,
    seed: DVec3,
    plate_id: PlateId,
    times: &[f64],
) -> Result<Vec<DVec3>, RotationError> {
    relative_motion_path(model, seed, plate_id, ANCHOR_PLATE_ID, times)
}

/// Like [`motion_path`], but tracks the point as seen from
/// `relative_plate_id` held fixed at its position at `times[0]`.
pub fn relative_motion_path(
    model: &dyn RotationModel,
    seed: DVec3,
    plate_id: PlateId,
    relative_plate_id: PlateId,
    times: &[f64],
) -> Result<Vec<DVec3>, RotationError> {
    let Some(&origin) = times.first() else {
        return Ok(Vec::new());
    };

    times
        .iter()
        .map(|&time| Ok(relative_rotation(model, plate_id, relative_plate_id, origin, time)?.apply(seed)))
        .collect()
}

/// Left and right flowlines of a seed point on a spreading ridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Flowline {
    /// Crust now on the left plate, one position per sample time.
    pub left: Vec<DVec3>,
    /// Crust now on the right plate, one position per sample time.
    pub right: Vec<DVec3>,
}

/// Traces the crust that formed at a ridge between `left_plate_id` and
/// `right_plate_id` assuming symmetric spreading.
///
/// The seed is a ridge position at `times[0]`. Entry `k` of each flowline is
/// where the crust formed at `times[k]` sits at `times[0]`. The ridge moves
/// against the left plate by half of each stage rotation of the right plate
/// relative to the left plate.
pub fn flowline(
    model: &dyn RotationModel,
    seed: DVec3,
    left_plate_id: PlateId,
    right_plate_id: PlateId,
    times: &[f64],
) -> Result<Flowline, RotationError> {
    let Some(&origin) = times.first() else {
        return Ok(Flowline {
            left: Vec::new(),
            right: Vec::new(),
        });
    };

    let mut left = Vec::with_capacity(times.len());
    let mut right = Vec::with_capacity(times.len());
    let mut ridge = seed;
    let mut previous = FiniteRotation::IDENTITY;

    for &time in times {
        let total = relative_rotation(model, right_plate_id, left_plate_id, origin, time)?;
        let stage = total.compose(&previous.inverse());
        ridge = FiniteRotation::IDENTITY.slerp(&stage, 0.5).apply(ridge);

        left.push(ridge);
        right.push(total.inverse().apply(ridge));
        previous = total;
    }

    Ok(Flowline { left, right })
}

/// Rotation carrying a point fixed to `plate_id` from `from_time` to
/// `to_time`, in the frame of `relative_plate_id` at `from_time`.
fn relative_rotation(
    model: &dyn RotationModel,
    plate_id: PlateId,
    relative_plate_id: PlateId,
    from_time: f64,
    to_time: f64,
) -> Result<FiniteRotation, RotationError> {
    let moving = model.stage_rotation(plate_id, from_time, to_time)?;
    if relative_plate_id == ANCHOR_PLATE_ID {
        return Ok(moving);
    }
    let fixed = model.stage_rotation(relative_plate_id, to_time, from_time)?;
    Ok(fixed.compose(&moving))
}

/// Total angular distance (radians) travelled along a path.
pub fn path_length(path: &[DVec3]) -> f64 {
    path.windows(2).map(|w| great_circle_distance(w[0], w[1])).sum()
}
