//! Collision detection policies.
//!
//! After each step the engine asks a policy whether a point that was active
//! at both ends of the step should be deactivated:
//! - [`KinematicCollision`] consumes points crossing fast-converging or
//!   fast-diverging plate boundaries
//! - [`ContinentCollision`] consumes points landing on a continental mask,
//!   then defers to a chained policy

mod continental;
mod kinematic;
mod policy;

pub use continental::{ContinentCollision, CONTINENT_THRESHOLD};
pub use kinematic::{CollisionParameters, KinematicCollision};
pub use policy::{CollisionContext, CollisionKind, CollisionPolicy};
