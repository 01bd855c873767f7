//! JSON scenario description.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::{CollisionParameters, ContinentCollision, KinematicCollision};
use crate::geometry::{
    fibonacci_points, lat_lon_to_unit, random_points, unit_to_lat_lon, BoundaryPolygon, GeometryError, Polyline,
};
use crate::kinematics::{EulerPole, EulerPoleModel, PlateId, ANCHOR_PLATE_ID};
use crate::raster::EquirectMaskLoader;
use crate::reconstruction::{ReconstructByTopologies, ReconstructionError, TimeSpan};
use crate::topology::{ResolvedTopology, TopologyFeature, TopologySet};

/// Errors that can occur while loading or building a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid geometry in topology {index}: {source}")]
    Geometry {
        index: usize,
        #[source]
        source: GeometryError,
    },
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
}

/// One plate of the Euler pole rotation model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateConfig {
    pub plate_id: PlateId,
    pub pole: EulerPole,
}

/// A named piece of a plate boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSegmentConfig {
    pub feature_type: String,
    /// `[lat, lon]` vertices in degrees.
    pub vertices: Vec<(f64, f64)>,
}

/// A plate polygon and the time range it exists in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub plate_id: PlateId,
    /// `[lat, lon]` ring vertices in degrees.
    pub boundary: Vec<(f64, f64)>,
    /// A `[lat, lon]` point inside the polygon. Needed for polygons spanning
    /// a hemisphere or more; defaults to the vertex centroid.
    #[serde(default)]
    pub interior: Option<(f64, f64)>,
    #[serde(default)]
    pub sub_segments: Vec<SubSegmentConfig>,
    #[serde(default = "infinitely_old")]
    pub begin_time: f64,
    #[serde(default = "infinitely_young")]
    pub end_time: f64,
}

/// A seed point with its optional activation window and fallback plate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointConfig {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "infinitely_old")]
    pub begin_time: f64,
    #[serde(default = "infinitely_young")]
    pub end_time: f64,
    #[serde(default)]
    pub plate_id: PlateId,
}

/// Where the seed points come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointSource {
    /// Explicitly listed points.
    Explicit { points: Vec<PointConfig> },
    /// Evenly spread points on a Fibonacci spiral.
    Fibonacci { count: usize },
    /// Uniformly random points from a seed.
    Random { count: usize, seed: u64 },
}

impl Default for PointSource {
    fn default() -> Self {
        Self::Fibonacci { count: 1000 }
    }
}

/// Kinematic thresholds: global plus per boundary feature type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicConfig {
    #[serde(default)]
    pub parameters: CollisionParameters,
    #[serde(default)]
    pub feature_parameters: HashMap<String, CollisionParameters>,
}

impl KinematicConfig {
    fn to_policy(&self) -> KinematicCollision {
        self.feature_parameters
            .iter()
            .fold(KinematicCollision::new(self.parameters), |policy, (feature_type, params)| {
                policy.with_feature_parameters(feature_type.as_str(), *params)
            })
    }
}

/// Policy consulted for points outside the continental mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainConfig {
    Kinematic(KinematicConfig),
    /// The mask alone decides.
    None,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::Kinematic(KinematicConfig::default())
    }
}

/// Collision detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionConfig {
    /// No collision detection.
    None,
    /// Boundary proximity and velocity thresholds.
    Kinematic(KinematicConfig),
    /// Continental mask images followed by a chained policy.
    Continental {
        /// Path with `{time}` replaced by the time in Ma. Relative paths are
        /// resolved against the scenario file's directory.
        mask_template: String,
        /// Defaults to kinematic detection with default parameters.
        #[serde(default)]
        chain: ChainConfig,
    },
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::Kinematic(KinematicConfig::default())
    }
}

/// A complete, self-contained reconstruction setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub time_span: TimeSpan,
    /// Plates not listed here (other than the anchor plate) are unknown to
    /// the rotation model.
    #[serde(default)]
    pub plates: Vec<PlateConfig>,
    #[serde(default)]
    pub topologies: Vec<TopologyConfig>,
    #[serde(default)]
    pub points: PointSource,
    #[serde(default)]
    pub collision: CollisionConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn infinitely_old() -> f64 {
    f64::INFINITY
}

fn infinitely_young() -> f64 {
    f64::NEG_INFINITY
}

impl Scenario {
    /// Parses a scenario from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a scenario file. Relative mask paths resolve against its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut scenario: Self = serde_json::from_reader(BufReader::new(file))?;
        scenario.base_dir = path.parent().map(Path::to_path_buf);
        Ok(scenario)
    }

    /// Euler pole rotation model for the listed plates.
    pub fn rotation_model(&self) -> EulerPoleModel {
        self.plates
            .iter()
            .fold(EulerPoleModel::new(), |model, plate| model.with_plate(plate.plate_id, plate.pole))
    }

    /// Topology set for the listed polygons.
    pub fn topology_set(&self) -> Result<TopologySet, ScenarioError> {
        let mut set = TopologySet::new();
        for (index, config) in self.topologies.iter().enumerate() {
            let topology = build_topology(config).map_err(|source| ScenarioError::Geometry { index, source })?;
            set.push(TopologyFeature::between(topology, config.begin_time, config.end_time));
        }
        Ok(set)
    }

    /// Seed points with their activation windows and fallback plate IDs.
    pub fn seed_points(&self) -> Vec<PointConfig> {
        let generated = |points: Vec<DVec3>| -> Vec<PointConfig> {
            points
                .into_iter()
                .map(|p| {
                    let (lat, lon) = unit_to_lat_lon(p);
                    PointConfig {
                        lat,
                        lon,
                        begin_time: f64::INFINITY,
                        end_time: f64::NEG_INFINITY,
                        plate_id: ANCHOR_PLATE_ID,
                    }
                })
                .collect()
        };
        match &self.points {
            PointSource::Explicit { points } => points.clone(),
            PointSource::Fibonacci { count } => generated(fibonacci_points(*count)),
            PointSource::Random { count, seed } => generated(random_points(*count, *seed)),
        }
    }

    /// Path template for continental masks, resolved against the base directory.
    pub fn mask_template(&self) -> Option<String> {
        let CollisionConfig::Continental { mask_template, .. } = &self.collision else {
            return None;
        };
        match &self.base_dir {
            Some(dir) if Path::new(mask_template).is_relative() => {
                Some(dir.join(mask_template).to_string_lossy().into_owned())
            }
            _ => Some(mask_template.clone()),
        }
    }

    /// Creates an engine ready to reconstruct.
    pub fn build(&self) -> Result<ReconstructByTopologies, ScenarioError> {
        let seeds = self.seed_points();
        let points = seeds.iter().map(|p| lat_lon_to_unit(p.lat, p.lon)).collect();

        let builder = ReconstructByTopologies::builder(
            Arc::new(self.rotation_model()),
            Arc::new(self.topology_set()?),
            self.time_span,
            points,
        )
        .point_begin_times(seeds.iter().map(|p| p.begin_time).collect())
        .point_end_times(seeds.iter().map(|p| p.end_time).collect())
        .point_plate_ids(seeds.iter().map(|p| p.plate_id).collect());

        let builder = match &self.collision {
            CollisionConfig::None => builder.no_collision_detection(),
            CollisionConfig::Kinematic(config) => builder.collision_policy(config.to_policy()),
            CollisionConfig::Continental { chain, .. } => {
                let template = self.mask_template().unwrap_or_default();
                let policy = ContinentCollision::new(EquirectMaskLoader::new(template));
                let policy = match chain {
                    ChainConfig::Kinematic(config) => policy.chained_with(config.to_policy()),
                    ChainConfig::None => policy.without_chain(),
                };
                builder.collision_policy(policy)
            }
        };

        Ok(builder.build()?)
    }

    /// Number of seed points the scenario produces.
    pub fn num_points(&self) -> usize {
        match &self.points {
            PointSource::Explicit { points } => points.len(),
            PointSource::Fibonacci { count } | PointSource::Random { count, .. } => *count,
        }
    }
}

fn build_topology(config: &TopologyConfig) -> Result<ResolvedTopology, GeometryError> {
    let vertices = config.boundary.iter().map(|&(lat, lon)| lat_lon_to_unit(lat, lon)).collect();
    let boundary = match config.interior {
        Some((lat, lon)) => BoundaryPolygon::with_interior(vertices, lat_lon_to_unit(lat, lon))?,
        None => BoundaryPolygon::new(vertices)?,
    };

    config.sub_segments.iter().try_fold(
        ResolvedTopology::new(config.plate_id, boundary),
        |topology, segment| {
            let geometry = Polyline::from_lat_lon(&segment.vertices)?;
            Ok(topology.with_sub_segment(segment.feature_type.as_str(), geometry))
        },
    )
}
