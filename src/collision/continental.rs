//! Continental collision detection against time-dependent mask rasters.

use tracing::info;

use super::kinematic::KinematicCollision;
use super::policy::{CollisionContext, CollisionKind, CollisionPolicy};
use crate::geometry::unit_to_lat_lon;
use crate::raster::{MaskGrid, RasterLoader};
use crate::reconstruction::ReconstructionError;

/// Mask values strictly above this are continental.
pub const CONTINENT_THRESHOLD: f32 = 0.5;

/// Deactivates points that land inside a continental mask.
///
/// The mask for each time is obtained from a [`RasterLoader`] and kept until
/// the time changes. Points outside the mask are handed to the chained
/// policy, which is [`KinematicCollision`] unless replaced or removed.
pub struct ContinentCollision<L> {
    loader: L,
    chain: Option<Box<dyn CollisionPolicy>>,
    grid: Option<(f64, MaskGrid)>,
    deletion_count: usize,
}

impl<L: RasterLoader> ContinentCollision<L> {
    /// Creates a policy chained to the default kinematic policy.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            chain: Some(Box::new(KinematicCollision::default())),
            grid: None,
            deletion_count: 0,
        }
    }

    /// Replaces the policy consulted for points outside the mask.
    pub fn chained_with(mut self, policy: impl CollisionPolicy + 'static) -> Self {
        self.chain = Some(Box::new(policy));
        self
    }

    /// Drops the chained policy so only the mask is tested.
    pub fn without_chain(mut self) -> Self {
        self.chain = None;
        self
    }

    /// Time of the currently loaded mask, if any.
    pub fn grid_time(&self) -> Option<f64> {
        self.grid.as_ref().map(|(time, _)| *time)
    }

    fn grid_at(&mut self, time: f64) -> Result<&MaskGrid, ReconstructionError> {
        // A stale grid is dropped before loading so a failed load is retried
        let grid = match self.grid.take() {
            Some((grid_time, grid)) if grid_time == time => grid,
            previous => {
                if let Some((previous_time, _)) = previous {
                    info!(time = previous_time, deleted = self.deletion_count, "continental collisions");
                }
                let grid = self.loader.load(time)?;
                info!(time, rows = grid.lats().len(), cols = grid.lons().len(), "loaded continent mask");
                self.deletion_count = 0;
                grid
            }
        };
        Ok(&self.grid.insert((time, grid)).1)
    }
}

impl<L: RasterLoader> CollisionPolicy for ContinentCollision<L> {
    fn name(&self) -> &str {
        "continental"
    }

    fn evaluate(&mut self, ctx: &CollisionContext<'_>) -> Result<Option<CollisionKind>, ReconstructionError> {
        let (lat, lon) = unit_to_lat_lon(ctx.curr_point);
        let value = self.grid_at(ctx.time)?.sample_nearest(lon, lat);
        if value > CONTINENT_THRESHOLD {
            self.deletion_count += 1;
            return Ok(Some(CollisionKind::Continent));
        }

        match &mut self.chain {
            Some(chain) => chain.evaluate(ctx),
            None => Ok(None),
        }
    }

    /// Points inside the mask loaded for the most recent time. Removals
    /// made by the chained policy are added when it keeps a count.
    fn deletion_count(&self) -> Option<usize> {
        let chained = self.chain.as_ref().and_then(|chain| chain.deletion_count());
        Some(self.deletion_count + chained.unwrap_or(0))
    }
}
