//! Point reconstruction by dynamic plate topologies.
//!
//! The engine keeps three point-state buffers (previous, current, next) and
//! advances them one time step at a time:
//! 1. Rotate every active point with the plate containing it
//! 2. Rotate buffer roles and advance the clock
//! 3. Activate or deactivate points by their activation windows
//! 4. Resolve plate membership at the new time
//! 5. Ask the collision policy about points active at both ends of the step

mod buffers;
mod clock;
mod engine;
mod error;

pub use buffers::{Membership, PointState, Slot, TemporalBuffers};
pub use clock::{SimulationClock, TimeSpan};
pub use engine::{
    reconstruct_points, ActivationWindow, CollisionDetection, ConsumedPoint, ReconstructByTopologies,
    ReconstructOptions, ReconstructionBuilder,
};
pub use error::ReconstructionError;
