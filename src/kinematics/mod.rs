//! Plate kinematics.
//!
//! Defines the rotation model interface consumed by the reconstruction
//! engine, plus two self-contained models:
//! - Constant-rate Euler poles per plate
//! - Sampled total rotations with interpolation
//!
//! Motion paths and ridge flowlines are derived from any rotation model.

mod cache;
mod euler;
mod model;
mod motion_path;
mod table;

pub use cache::StageRotationCache;
pub use euler::{EulerPole, EulerPoleModel};
pub use model::{PlateId, RotationError, RotationModel, ANCHOR_PLATE_ID};
pub use motion_path::{flowline, motion_path, path_length, relative_motion_path, Flowline};
pub use table::RotationTable;
