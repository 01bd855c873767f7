//! Time-indexed raster loading.

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use super::grid::MaskGrid;

/// Errors that can occur while loading a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Failed to load raster '{path}' for {time} Ma: {source}")]
    Load {
        path: PathBuf,
        time: f64,
        #[source]
        source: image::ImageError,
    },
    #[error("No raster available for {0} Ma")]
    Missing(f64),
    #[error("Invalid raster grid: {0}")]
    InvalidGrid(String),
}

/// Supplies the raster valid at a given time.
pub trait RasterLoader: Send {
    /// Loads the raster for `time` (Ma).
    fn load(&mut self, time: f64) -> Result<MaskGrid, RasterError>;
}

/// Loads grayscale equirectangular images from a path template.
///
/// Every `{time}` in the template is replaced by the time, formatted without
/// a trailing `.0` for whole numbers (`masks/mask_{time}.png` becomes
/// `masks/mask_10.png` at 10 Ma). Pixel values are normalized to `0..=1`.
/// The image spans longitudes -180..180 left to right and latitudes 90..-90
/// top to bottom.
#[derive(Debug, Clone)]
pub struct EquirectMaskLoader {
    template: String,
}

impl EquirectMaskLoader {
    /// Creates a loader from a path template containing `{time}`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Returns the path the loader reads for `time`.
    pub fn path_for(&self, time: f64) -> PathBuf {
        PathBuf::from(self.template.replace("{time}", &time.to_string()))
    }
}

impl RasterLoader for EquirectMaskLoader {
    fn load(&mut self, time: f64) -> Result<MaskGrid, RasterError> {
        let path = self.path_for(time);
        let image = image::open(&path).map_err(|source| RasterError::Load {
            path: path.clone(),
            time,
            source,
        })?;

        let luma = image.to_luma32f();
        let (width, height) = luma.dimensions();
        let (width, height) = (width as usize, height as usize);
        debug!(path = %path.display(), width, height, "loaded mask raster");

        // Image rows run north to south; grid rows run south to north
        let pixels = luma.into_raw();
        let values = pixels
            .chunks_exact(width.max(1))
            .rev()
            .flatten()
            .copied()
            .collect();

        MaskGrid::global(values, width, height)
    }
}

/// Raster loader backed by a closure.
pub struct FnRasterLoader<F> {
    load: F,
}

impl<F> FnRasterLoader<F>
where
    F: FnMut(f64) -> Result<MaskGrid, RasterError> + Send,
{
    /// Wraps a closure mapping a time to its raster.
    pub fn new(load: F) -> Self {
        Self { load }
    }
}

impl<F> RasterLoader for FnRasterLoader<F>
where
    F: FnMut(f64) -> Result<MaskGrid, RasterError> + Send,
{
    fn load(&mut self, time: f64) -> Result<MaskGrid, RasterError> {
        (self.load)(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use tempfile::tempdir;

    #[test]
    fn test_path_template() {
        let loader = EquirectMaskLoader::new("grids/mask_{time}Ma.png");
        assert_eq!(loader.path_for(10.0), PathBuf::from("grids/mask_10Ma.png"));
        assert_eq!(loader.path_for(2.5), PathBuf::from("grids/mask_2.5Ma.png"));
    }

    #[test]
    fn test_load_png_mask() {
        let dir = tempdir().unwrap();
        // 4x2 image: top row (north) has continent in the east half
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_fn(4, 2, |x, y| {
            if y == 0 && x >= 2 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        img.save(dir.path().join("mask_5.png")).unwrap();

        let template = dir.path().join("mask_{time}.png").to_string_lossy().into_owned();
        let mut loader = EquirectMaskLoader::new(template);
        let grid = loader.load(5.0).unwrap();

        assert_eq!(grid.lats(), &[-45.0, 45.0]);
        assert!(grid.sample_nearest(100.0, 45.0) > 0.99);
        assert!(grid.sample_nearest(-100.0, 45.0) < 0.01);
        assert!(grid.sample_nearest(100.0, -45.0) < 0.01);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("absent_{time}.png").to_string_lossy().into_owned();
        let err = EquirectMaskLoader::new(template).load(1.0).unwrap_err();
        assert!(matches!(err, RasterError::Load { time, .. } if time == 1.0));
    }

    #[test]
    fn test_closure_loader() {
        let mut calls = 0;
        let mut loader = FnRasterLoader::new(move |time| {
            calls += 1;
            if time > 100.0 {
                return Err(RasterError::Missing(time));
            }
            MaskGrid::global(vec![calls as f32; 4], 2, 2)
        });
        assert_eq!(loader.load(1.0).unwrap().value(0, 0), 1.0);
        assert_eq!(loader.load(2.0).unwrap().value(0, 0), 2.0);
        assert!(matches!(loader.load(200.0), Err(RasterError::Missing(_))));
    }
}
