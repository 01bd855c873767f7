//! Regular longitude/latitude scalar grids with nearest-neighbour sampling.

use super::RasterError;

/// A scalar field on a regular longitude/latitude grid.
///
/// Values are stored row-major: one row per latitude, one column per
/// longitude. Both coordinate axes are in degrees and strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGrid {
    values: Vec<f32>,
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl MaskGrid {
    /// Creates a grid, validating its shape and axes.
    pub fn new(values: Vec<f32>, lons: Vec<f64>, lats: Vec<f64>) -> Result<Self, RasterError> {
        if lons.is_empty() || lats.is_empty() {
            return Err(RasterError::InvalidGrid("empty coordinate axis".to_string()));
        }
        if values.len() != lons.len() * lats.len() {
            return Err(RasterError::InvalidGrid(format!(
                "expected {}x{} values, got {}",
                lats.len(),
                lons.len(),
                values.len()
            )));
        }
        if !is_increasing(&lons) || !is_increasing(&lats) {
            return Err(RasterError::InvalidGrid("coordinate axes must be strictly increasing".to_string()));
        }
        Ok(Self { values, lons, lats })
    }

    /// Creates a grid covering the globe at pixel-centre coordinates.
    ///
    /// `values` has `height` rows from south to north, `width` columns from
    /// west to east.
    pub fn global(values: Vec<f32>, width: usize, height: usize) -> Result<Self, RasterError> {
        let lons = (0..width)
            .map(|x| -180.0 + (x as f64 + 0.5) * 360.0 / width as f64)
            .collect();
        let lats = (0..height)
            .map(|y| -90.0 + (y as f64 + 0.5) * 180.0 / height as f64)
            .collect();
        Self::new(values, lons, lats)
    }

    /// Returns the longitude axis.
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Returns the latitude axis.
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Returns the value at a grid node.
    pub fn value(&self, lat_index: usize, lon_index: usize) -> f32 {
        self.values[lat_index * self.lons.len() + lon_index]
    }

    /// Samples the value at the node nearest to `(lon, lat)` in degrees.
    ///
    /// Coordinates beyond the grid edges take the edge value.
    pub fn sample_nearest(&self, lon: f64, lat: f64) -> f32 {
        let i = nearest_index(&self.lats, lat);
        let j = nearest_index(&self.lons, lon);
        self.value(i, j)
    }
}

fn is_increasing(axis: &[f64]) -> bool {
    axis.iter().all(|v| v.is_finite()) && axis.windows(2).all(|w| w[0] < w[1])
}

fn nearest_index(axis: &[f64], coord: f64) -> usize {
    let upper = axis.partition_point(|&v| v < coord);
    if upper == 0 {
        return 0;
    }
    if upper == axis.len() {
        return axis.len() - 1;
    }
    // Ties go to the lower node
    if coord - axis[upper - 1] <= axis[upper] - coord {
        upper - 1
    } else {
        upper
    }
}
