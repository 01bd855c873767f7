//! Time-windowed collection of plate polygons.

use std::sync::Arc;

use super::resolved::{ResolvedTopology, TopologyError, TopologyResolver};

/// A plate polygon together with the time range in which it exists.
#[derive(Debug, Clone)]
pub struct TopologyFeature {
    /// The polygon, already positioned for its valid time range.
    pub topology: Arc<ResolvedTopology>,
    /// Oldest time (Ma) at which the polygon exists.
    pub begin_time: f64,
    /// Youngest time (Ma) at which the polygon exists.
    pub end_time: f64,
}

impl TopologyFeature {
    /// Creates a feature valid for all time.
    pub fn always(topology: ResolvedTopology) -> Self {
        Self {
            topology: Arc::new(topology),
            begin_time: f64::INFINITY,
            end_time: f64::NEG_INFINITY,
        }
    }

    /// Creates a feature valid from `begin_time` (older) to `end_time` (younger).
    pub fn between(topology: ResolvedTopology, begin_time: f64, end_time: f64) -> Self {
        Self {
            topology: Arc::new(topology),
            begin_time,
            end_time,
        }
    }

    /// Whether the feature exists at `time`.
    pub fn is_valid_at(&self, time: f64) -> bool {
        self.end_time <= time && time <= self.begin_time
    }
}

/// Resolves topologies by selecting the features valid at each time.
///
/// Features are returned in insertion order, so earlier features win when
/// polygons overlap.
#[derive(Debug, Clone, Default)]
pub struct TopologySet {
    features: Vec<TopologyFeature>,
    coverage: Option<(f64, f64)>,
}

impl TopologySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a feature.
    pub fn with_feature(mut self, feature: TopologyFeature) -> Self {
        self.features.push(feature);
        self
    }

    /// Adds a feature.
    pub fn push(&mut self, feature: TopologyFeature) {
        self.features.push(feature);
    }

    /// Restricts the set to times between `begin_time` (older) and `end_time`.
    ///
    /// Resolving outside this range fails instead of returning no polygons.
    pub fn with_coverage(mut self, begin_time: f64, end_time: f64) -> Self {
        self.coverage = Some((begin_time, end_time));
        self
    }

    /// Returns all features.
    pub fn features(&self) -> &[TopologyFeature] {
        &self.features
    }

    /// Returns the number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the set has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl TopologyResolver for TopologySet {
    fn resolve(&self, time: f64) -> Result<Vec<Arc<ResolvedTopology>>, TopologyError> {
        if let Some((begin, end)) = self.coverage {
            if time > begin || time < end {
                return Err(TopologyError::Unresolvable {
                    time,
                    reason: format!("outside topology coverage {begin}-{end} Ma"),
                });
            }
        }

        Ok(self
            .features
            .iter()
            .filter(|feature| feature.is_valid_at(time))
            .map(|feature| Arc::clone(&feature.topology))
            .collect())
    }
}
