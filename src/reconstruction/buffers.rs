//! Per-point state and the previous/current/next triple buffer.

use std::sync::Arc;

use glam::DVec3;

use crate::kinematics::PlateId;
use crate::topology::ResolvedTopology;

/// The resolved plate containing an active point.
#[derive(Debug, Clone)]
pub struct Membership {
    pub topology: Arc<ResolvedTopology>,
}

impl Membership {
    pub fn plate_id(&self) -> PlateId {
        self.topology.plate_id
    }
}

/// State of one point at one time slot.
///
/// Membership can only exist alongside a position. An active point with no
/// membership fell outside every resolved polygon.
#[derive(Debug, Clone, Default)]
pub enum PointState {
    #[default]
    Inactive,
    Active {
        position: DVec3,
        membership: Option<Membership>,
    },
}

impl PointState {
    /// An active point whose membership is not yet resolved.
    pub fn active(position: DVec3) -> Self {
        Self::Active {
            position,
            membership: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn position(&self) -> Option<DVec3> {
        match self {
            Self::Active { position, .. } => Some(*position),
            Self::Inactive => None,
        }
    }

    pub fn membership(&self) -> Option<&Membership> {
        match self {
            Self::Active { membership, .. } => membership.as_ref(),
            Self::Inactive => None,
        }
    }

    pub fn topology(&self) -> Option<&ResolvedTopology> {
        self.membership().map(|m| m.topology.as_ref())
    }

    pub fn plate_id(&self) -> Option<PlateId> {
        self.membership().map(Membership::plate_id)
    }

    /// Sets the membership of an active point; inactive points are left as is.
    pub fn set_membership(&mut self, new_membership: Option<Membership>) {
        if let Self::Active { membership, .. } = self {
            *membership = new_membership;
        }
    }
}

/// Role of a buffer relative to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Previous = 0,
    Current = 1,
    Next = 2,
}

/// Three point-state buffers addressed by role.
///
/// Rotating reassigns roles to storage without moving any state. The
/// storage that held the previous states becomes the next buffer and is
/// overwritten before it is read again.
#[derive(Debug, Clone)]
pub struct TemporalBuffers {
    storage: [Vec<PointState>; 3],
    /// Storage index for each role, indexed by `Slot as usize`.
    roles: [usize; 3],
}

impl TemporalBuffers {
    /// Creates buffers with every point inactive in every slot.
    pub fn new(num_points: usize) -> Self {
        Self {
            storage: [
                vec![PointState::Inactive; num_points],
                vec![PointState::Inactive; num_points],
                vec![PointState::Inactive; num_points],
            ],
            roles: [0, 1, 2],
        }
    }

    pub fn num_points(&self) -> usize {
        self.storage[0].len()
    }

    /// Marks every point inactive in every slot.
    pub fn reset(&mut self) {
        for buffer in &mut self.storage {
            buffer.fill(PointState::Inactive);
        }
        self.roles = [0, 1, 2];
    }

    pub fn get(&self, slot: Slot) -> &[PointState] {
        &self.storage[self.roles[slot as usize]]
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut [PointState] {
        &mut self.storage[self.roles[slot as usize]]
    }

    /// Borrows one slot for reading and a different slot for writing.
    ///
    /// # Panics
    ///
    /// Panics if both roles are the same.
    pub fn split(&mut self, read: Slot, write: Slot) -> (&[PointState], &mut [PointState]) {
        let r = self.roles[read as usize];
        let w = self.roles[write as usize];
        assert_ne!(r, w, "cannot borrow {read:?} and {write:?} together");
        if r < w {
            let (low, high) = self.storage.split_at_mut(w);
            (&low[r], &mut high[0])
        } else {
            let (low, high) = self.storage.split_at_mut(r);
            (&high[0], &mut low[w])
        }
    }

    /// Previous takes the old current, current takes the old next, and
    /// next reuses the old previous storage.
    pub fn rotate(&mut self) {
        let [previous, current, next] = self.roles;
        self.roles = [current, next, previous];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundaryPolygon;

    #[test]
    fn test_inactive_has_no_membership() {
        let mut state = PointState::Inactive;
        state.set_membership(Some(Membership {
            topology: Arc::new(ResolvedTopology::new(
                3,
                BoundaryPolygon::from_lat_lon(&[(0.0, 0.0), (0.0, 10.0), (10.0, 5.0)]).unwrap(),
            )),
        }));
        assert!(state.membership().is_none());
        assert_eq!(state.plate_id(), None);
        assert_eq!(state.position(), None);
    }

    #[test]
    fn test_active_membership() {
        let topology = Arc::new(ResolvedTopology::new(
            7,
            BoundaryPolygon::from_lat_lon(&[(0.0, 0.0), (0.0, 10.0), (10.0, 5.0)]).unwrap(),
        ));
        let mut state = PointState::active(DVec3::X);
        assert_eq!(state.plate_id(), None);
        state.set_membership(Some(Membership { topology }));
        assert_eq!(state.plate_id(), Some(7));
        assert_eq!(state.position(), Some(DVec3::X));
    }

    #[test]
    fn test_rotate_reassigns_roles() {
        let mut buffers = TemporalBuffers::new(1);
        buffers.get_mut(Slot::Previous)[0] = PointState::active(DVec3::X);
        buffers.get_mut(Slot::Current)[0] = PointState::active(DVec3::Y);
        buffers.get_mut(Slot::Next)[0] = PointState::active(DVec3::Z);

        buffers.rotate();
        assert_eq!(buffers.get(Slot::Previous)[0].position(), Some(DVec3::Y));
        assert_eq!(buffers.get(Slot::Current)[0].position(), Some(DVec3::Z));
        assert_eq!(buffers.get(Slot::Next)[0].position(), Some(DVec3::X));

        buffers.rotate();
        buffers.rotate();
        assert_eq!(buffers.get(Slot::Current)[0].position(), Some(DVec3::Y));
    }

    #[test]
    fn test_split_borrows_distinct_slots() {
        let mut buffers = TemporalBuffers::new(2);
        buffers.get_mut(Slot::Current)[1] = PointState::active(DVec3::Z);
        buffers.rotate();

        for (read, write) in [(Slot::Previous, Slot::Current), (Slot::Current, Slot::Next), (Slot::Next, Slot::Previous)] {
            let (src, dst) = buffers.split(read, write);
            dst.clone_from_slice(src);
        }
        assert_eq!(buffers.get(Slot::Previous)[1].position(), Some(DVec3::Z));
    }

    #[test]
    fn test_reset() {
        let mut buffers = TemporalBuffers::new(3);
        buffers.get_mut(Slot::Current)[2] = PointState::active(DVec3::X);
        buffers.rotate();
        buffers.reset();
        assert!(buffers.get(Slot::Previous).iter().all(|s| !s.is_active()));
        assert_eq!(buffers.num_points(), 3);
    }

    #[test]
    #[should_panic]
    fn test_split_same_slot_panics() {
        let mut buffers = TemporalBuffers::new(1);
        let _ = buffers.split(Slot::Current, Slot::Current);
    }
}
