//! Finite rotations on the sphere.

use std::ops::Mul;

use glam::{DQuat, DVec3};

use super::sphere::lat_lon_to_unit;

/// A finite rotation about an Euler pole.
///
/// Plate motion between two times is always a rigid rotation about an axis
/// through the sphere's centre, so a unit quaternion is enough to carry it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteRotation {
    quat: DQuat,
}

impl Default for FiniteRotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FiniteRotation {
    /// The rotation that leaves every point in place.
    pub const IDENTITY: Self = Self {
        quat: DQuat::IDENTITY,
    };

    /// Creates a rotation of `angle` radians about `axis` (right-hand rule).
    ///
    /// A zero-length axis yields the identity.
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        let len = axis.length();
        if len < 1e-15 || angle == 0.0 {
            return Self::IDENTITY;
        }
        Self {
            quat: DQuat::from_axis_angle(axis / len, angle),
        }
    }

    /// Creates a rotation from an Euler pole in degrees and an angle in degrees.
    pub fn from_euler_pole(pole_lat_deg: f64, pole_lon_deg: f64, angle_deg: f64) -> Self {
        Self::from_axis_angle(lat_lon_to_unit(pole_lat_deg, pole_lon_deg), angle_deg.to_radians())
    }

    /// Wraps a quaternion; it is normalized first.
    pub fn from_quat(quat: DQuat) -> Self {
        Self {
            quat: quat.normalize(),
        }
    }

    /// Returns the underlying unit quaternion.
    pub fn quat(&self) -> DQuat {
        self.quat
    }

    /// Rotates a point.
    #[inline]
    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.quat * point
    }

    /// Returns the rotation that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            quat: self.quat.inverse(),
        }
    }

    /// Returns the rotation equivalent to applying `first` and then `self`.
    pub fn compose(&self, first: &FiniteRotation) -> Self {
        Self {
            quat: (self.quat * first.quat).normalize(),
        }
    }

    /// Returns the Euler pole and the rotation angle in `[0, π]` radians.
    pub fn axis_angle(&self) -> (DVec3, f64) {
        // q and -q are the same rotation; pick the one with the short angle
        let q = if self.quat.w < 0.0 { -self.quat } else { self.quat };
        q.to_axis_angle()
    }

    /// Returns the rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.axis_angle().1
    }

    /// Interpolates between two rotations along the shortest path.
    pub fn slerp(&self, other: &FiniteRotation, t: f64) -> Self {
        Self {
            quat: self.quat.slerp(other.quat, t).normalize(),
        }
    }

    /// Angular velocity vector (radians per unit time) if this rotation
    /// happens over `delta_time`.
    pub fn angular_velocity(&self, delta_time: f64) -> DVec3 {
        let (axis, angle) = self.axis_angle();
        if delta_time == 0.0 {
            return DVec3::ZERO;
        }
        axis * (angle / delta_time)
    }

    /// Linear velocity at `point` (in units of `radius` per unit time) if
    /// this rotation happens over `delta_time`.
    ///
    /// For a rigid rotation the velocity is `ω × r`.
    pub fn velocity_at(&self, point: DVec3, delta_time: f64, radius: f64) -> DVec3 {
        self.angular_velocity(delta_time).cross(point.normalize()) * radius
    }
}

impl Mul<DVec3> for FiniteRotation {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> DVec3 {
        self.apply(rhs)
    }
}

impl Mul<FiniteRotation> for FiniteRotation {
    type Output = FiniteRotation;

    fn mul(self, rhs: FiniteRotation) -> FiniteRotation {
        self.compose(&rhs)
    }
}
