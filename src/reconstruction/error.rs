//! Reconstruction error taxonomy.

use thiserror::Error;

use crate::kinematics::RotationError;
use crate::raster::RasterError;
use crate::topology::TopologyError;

/// Errors that can occur while configuring or running a reconstruction.
#[derive(Error, Debug)]
pub enum ReconstructionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Missing rotation data: {0}")]
    Rotation(#[from] RotationError),
    #[error("Missing topology data: {0}")]
    Topology(#[from] TopologyError),
    #[error("Raster unavailable: {0}")]
    RasterUnavailable(#[from] RasterError),
}

impl ReconstructionError {
    /// Whether the error came from a collaborator lacking data for a plate
    /// or time, rather than from bad configuration.
    pub fn is_missing_collaborator_data(&self) -> bool {
        matches!(self, Self::Rotation(_) | Self::Topology(_))
    }
}
