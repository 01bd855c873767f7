//! Time-stepped reconstruction of points through dynamic plate topologies.

use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::buffers::{Membership, PointState, Slot, TemporalBuffers};
use super::clock::{SimulationClock, TimeSpan};
use super::error::ReconstructionError;
use crate::collision::{CollisionContext, CollisionKind, CollisionPolicy, KinematicCollision};
use crate::geometry::FiniteRotation;
use crate::kinematics::{PlateId, RotationModel, StageRotationCache, ANCHOR_PLATE_ID};
use crate::topology::{PointLocator, PolygonPartitioner, TopologyResolver};

/// Time range (Ma) during which a point exists.
///
/// `begin_time` is the oldest time and `end_time` the youngest. The default
/// window is unbounded at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationWindow {
    pub begin_time: f64,
    pub end_time: f64,
}

impl Default for ActivationWindow {
    fn default() -> Self {
        Self {
            begin_time: f64::INFINITY,
            end_time: f64::NEG_INFINITY,
        }
    }
}

impl ActivationWindow {
    pub fn new(begin_time: f64, end_time: f64) -> Self {
        Self { begin_time, end_time }
    }

    pub fn contains(&self, time: f64) -> bool {
        self.end_time <= time && time <= self.begin_time
    }
}

/// A point deactivated by the collision policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumedPoint {
    pub index: usize,
    /// Time (Ma) at the end of the step in which the collision was detected.
    pub time: f64,
    pub kind: CollisionKind,
}

/// Which collision policy an engine runs.
#[derive(Default)]
pub enum CollisionDetection {
    /// [`KinematicCollision`] with its default parameters.
    #[default]
    Default,
    Custom(Box<dyn CollisionPolicy>),
    Disabled,
}

/// Configures a [`ReconstructByTopologies`].
pub struct ReconstructionBuilder {
    rotation_model: Arc<dyn RotationModel>,
    topology_resolver: Arc<dyn TopologyResolver>,
    span: TimeSpan,
    points: Vec<DVec3>,
    begin_times: Option<Vec<f64>>,
    end_times: Option<Vec<f64>>,
    plate_ids: Option<Vec<PlateId>>,
    collision: CollisionDetection,
    point_locator: Box<dyn PointLocator>,
}

impl ReconstructionBuilder {
    /// Oldest time each point may exist (defaults to unbounded).
    pub fn point_begin_times(mut self, begin_times: Vec<f64>) -> Self {
        self.begin_times = Some(begin_times);
        self
    }

    /// Youngest time each point may exist (defaults to unbounded).
    pub fn point_end_times(mut self, end_times: Vec<f64>) -> Self {
        self.end_times = Some(end_times);
        self
    }

    /// Plate IDs used for points outside every resolved polygon
    /// (defaults to the anchor plate).
    pub fn point_plate_ids(mut self, plate_ids: Vec<PlateId>) -> Self {
        self.plate_ids = Some(plate_ids);
        self
    }

    /// Replaces the default [`KinematicCollision`] policy.
    pub fn collision_policy(mut self, policy: impl CollisionPolicy + 'static) -> Self {
        self.collision = CollisionDetection::Custom(Box::new(policy));
        self
    }

    /// Turns collision detection off.
    pub fn no_collision_detection(mut self) -> Self {
        self.collision = CollisionDetection::Disabled;
        self
    }

    pub fn collision_detection(mut self, collision: CollisionDetection) -> Self {
        self.collision = collision;
        self
    }

    /// Replaces the default [`PolygonPartitioner`].
    pub fn point_locator(mut self, locator: impl PointLocator + 'static) -> Self {
        self.point_locator = Box::new(locator);
        self
    }

    /// Validates the configuration and creates the engine.
    pub fn build(self) -> Result<ReconstructByTopologies, ReconstructionError> {
        let clock = SimulationClock::new(&self.span)?;

        let num_points = self.points.len();
        if num_points == 0 {
            return Err(ReconstructionError::InvalidConfiguration(
                "at least one point is required".to_string(),
            ));
        }
        check_len("point begin times", self.begin_times.as_deref(), num_points)?;
        check_len("point end times", self.end_times.as_deref(), num_points)?;
        check_len("point plate IDs", self.plate_ids.as_deref(), num_points)?;
        if let Some(index) = self.points.iter().position(|p| !p.is_finite() || p.length() < 1e-12) {
            return Err(ReconstructionError::InvalidConfiguration(format!(
                "point {index} is not a valid position on the sphere"
            )));
        }

        let windows = (0..num_points)
            .map(|i| {
                let default = ActivationWindow::default();
                ActivationWindow::new(
                    self.begin_times.as_ref().map_or(default.begin_time, |t| t[i]),
                    self.end_times.as_ref().map_or(default.end_time, |t| t[i]),
                )
            })
            .collect();

        let collision_policy: Option<Box<dyn CollisionPolicy>> = match self.collision {
            CollisionDetection::Default => Some(Box::new(KinematicCollision::default())),
            CollisionDetection::Custom(policy) => Some(policy),
            CollisionDetection::Disabled => None,
        };

        Ok(ReconstructByTopologies {
            rotation_model: self.rotation_model,
            topology_resolver: self.topology_resolver,
            point_locator: self.point_locator,
            collision_policy,
            clock,
            points: self.points.into_iter().map(DVec3::normalize).collect(),
            windows,
            plate_ids: self.plate_ids.unwrap_or_else(|| vec![ANCHOR_PLATE_ID; num_points]),
            buffers: TemporalBuffers::new(num_points),
            has_been_activated: vec![false; num_points],
            num_activated_points: 0,
            consumed: Vec::new(),
            in_continent_indices: Vec::new(),
            in_continent_points: Vec::new(),
            started: false,
        })
    }
}

fn check_len<T>(name: &str, values: Option<&[T]>, expected: usize) -> Result<(), ReconstructionError> {
    match values {
        Some(values) if values.len() != expected => Err(ReconstructionError::InvalidConfiguration(format!(
            "length mismatch: {} {name} for {expected} points",
            values.len()
        ))),
        _ => Ok(()),
    }
}

/// Reconstructs points forward or backward in time using dynamic plate
/// topologies.
///
/// At each step every active point is assigned to the resolved plate polygon
/// containing it, rotated with that plate to the next time, then handed to
/// the collision policy. Points that collide are deactivated for the rest of
/// the run. Points outside every polygon move with their fallback plate ID.
pub struct ReconstructByTopologies {
    rotation_model: Arc<dyn RotationModel>,
    topology_resolver: Arc<dyn TopologyResolver>,
    point_locator: Box<dyn PointLocator>,
    collision_policy: Option<Box<dyn CollisionPolicy>>,
    clock: SimulationClock,
    points: Vec<DVec3>,
    windows: Vec<ActivationWindow>,
    plate_ids: Vec<PlateId>,
    buffers: TemporalBuffers,
    /// A point can only be activated once.
    has_been_activated: Vec<bool>,
    num_activated_points: usize,
    consumed: Vec<ConsumedPoint>,
    in_continent_indices: Vec<usize>,
    in_continent_points: Vec<DVec3>,
    started: bool,
}

impl ReconstructByTopologies {
    /// Starts configuring an engine over `span` for the given seed points.
    pub fn builder(
        rotation_model: Arc<dyn RotationModel>,
        topology_resolver: Arc<dyn TopologyResolver>,
        span: TimeSpan,
        points: Vec<DVec3>,
    ) -> ReconstructionBuilder {
        ReconstructionBuilder {
            rotation_model,
            topology_resolver,
            span,
            points,
            begin_times: None,
            end_times: None,
            plate_ids: None,
            collision: CollisionDetection::Default,
            point_locator: Box::new(PolygonPartitioner),
        }
    }

    /// Runs the whole span and returns the active points at the end time,
    /// in point order.
    pub fn reconstruct(&mut self) -> Result<Vec<DVec3>, ReconstructionError> {
        self.begin_reconstruction()?;
        while self.reconstruct_to_next_time()? {}

        info!(
            time = self.current_time(),
            active = self.buffers.get(Slot::Current).iter().filter(|s| s.is_active()).count(),
            consumed = self.consumed.len(),
            "reconstruction finished"
        );
        Ok(self.active_current_points())
    }

    /// Resets all state to the begin time, activating points whose window
    /// contains it.
    pub fn begin_reconstruction(&mut self) -> Result<(), ReconstructionError> {
        info!(
            begin = self.clock.begin_time(),
            end = self.clock.end_time(),
            times = self.clock.num_times(),
            points = self.points.len(),
            collisions = self.collision_policy.as_ref().map_or("none", |p| p.name()),
            "starting reconstruction"
        );

        self.clock.reset();
        self.buffers.reset();
        self.has_been_activated.fill(false);
        self.num_activated_points = 0;
        self.consumed.clear();
        self.in_continent_indices.clear();
        self.in_continent_points.clear();
        self.started = true;

        self.activate_deactivate_points();
        self.resolve_memberships()
    }

    /// Advances every point one time step.
    ///
    /// Returns `Ok(false)` without changing state once the end time is
    /// reached, or once every point has been activated and none remain
    /// active. Starts the reconstruction first if needed.
    pub fn reconstruct_to_next_time(&mut self) -> Result<bool, ReconstructionError> {
        if !self.started {
            self.begin_reconstruction()?;
        }
        if self.clock.is_last() {
            return Ok(false);
        }
        if self.num_activated_points == self.points.len()
            && !self.buffers.get(Slot::Current).iter().any(PointState::is_active)
        {
            return Ok(false);
        }

        let rotations = self.stage_rotations()?;
        let (current, next) = self.buffers.split(Slot::Current, Slot::Next);
        next.par_iter_mut()
            .zip(current.par_iter())
            .zip(rotations.par_iter())
            .for_each(|((next, current), rotation)| {
                *next = match (current.position(), rotation) {
                    (Some(position), Some(rotation)) => PointState::active(rotation.apply(position)),
                    _ => PointState::Inactive,
                };
            });

        self.buffers.rotate();
        self.clock.advance();

        self.activate_deactivate_points();
        self.resolve_memberships()?;
        let consumed = self.detect_collisions()?;

        debug!(
            time = self.current_time(),
            active = self.buffers.get(Slot::Current).iter().filter(|s| s.is_active()).count(),
            consumed,
            "reconstructed to next time"
        );
        Ok(true)
    }

    /// Stage rotation from the current to the next time for every active
    /// point, by topology plate ID or else fallback plate ID.
    ///
    /// The cache lives for this step only since its plate keys map to
    /// different rotations at every time pair.
    fn stage_rotations(&self) -> Result<Vec<Option<FiniteRotation>>, ReconstructionError> {
        let mut cache = StageRotationCache::new(self.clock.current_time(), self.clock.next_time());
        let model = self.rotation_model.as_ref();

        self.buffers
            .get(Slot::Current)
            .iter()
            .zip(&self.plate_ids)
            .map(|(state, &fallback)| {
                if !state.is_active() {
                    return Ok(None);
                }
                let plate_id = state.plate_id().unwrap_or(fallback);
                Ok(Some(cache.fetch(model, plate_id)?))
            })
            .collect()
    }

    fn activate_deactivate_points(&mut self) {
        let time = self.clock.current_time();
        let current = self.buffers.get_mut(Slot::Current);

        for (index, state) in current.iter_mut().enumerate() {
            let in_window = self.windows[index].contains(time);
            if state.is_active() {
                if !in_window {
                    *state = PointState::Inactive;
                }
            } else if !self.has_been_activated[index] && in_window {
                // The seed position is taken to be the position at the
                // activation time
                *state = PointState::active(self.points[index]);
                self.has_been_activated[index] = true;
                self.num_activated_points += 1;
            }
        }
    }

    fn resolve_memberships(&mut self) -> Result<(), ReconstructionError> {
        let time = self.clock.current_time();
        let topologies = self.topology_resolver.resolve(time)?;
        let current = self.buffers.get_mut(Slot::Current);

        let positions: Vec<DVec3> = current.iter().filter_map(PointState::position).collect();
        let located = self.point_locator.locate(&positions, &topologies);

        let mut located = located.into_iter();
        for state in current.iter_mut().filter(|s| s.is_active()) {
            let membership = located
                .next()
                .flatten()
                .and_then(|k| topologies.get(k))
                .map(|topology| Membership {
                    topology: Arc::clone(topology),
                });
            state.set_membership(membership);
        }
        Ok(())
    }

    /// Deactivates points the policy reports as collided; returns how many.
    fn detect_collisions(&mut self) -> Result<usize, ReconstructionError> {
        let Some(policy) = self.collision_policy.as_mut() else {
            return Ok(0);
        };
        let time = self.clock.current_time();
        let time_interval = self.clock.time_interval();
        let rotation_model = self.rotation_model.as_ref();
        let (previous, current) = self.buffers.split(Slot::Previous, Slot::Current);

        let mut count = 0;
        for (index, (prev, curr)) in previous.iter().zip(current.iter_mut()).enumerate() {
            // Points that just left their window or just appeared are skipped
            let (Some(prev_point), Some(curr_point)) = (prev.position(), curr.position()) else {
                continue;
            };
            let ctx = CollisionContext {
                rotation_model,
                time,
                time_interval,
                prev_point,
                curr_point,
                prev_topology: prev.topology(),
                curr_topology: curr.topology(),
            };
            let Some(kind) = policy.evaluate(&ctx)? else {
                continue;
            };

            *curr = PointState::Inactive;
            self.consumed.push(ConsumedPoint { index, time, kind });
            if kind == CollisionKind::Continent {
                self.in_continent_indices.push(index);
                self.in_continent_points.push(curr_point);
            }
            count += 1;
        }
        Ok(count)
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of points activated so far in this run.
    pub fn num_activated_points(&self) -> usize {
        self.num_activated_points
    }

    /// Current positions of all points, `None` where inactive.
    pub fn all_current_points(&self) -> Vec<Option<DVec3>> {
        self.buffers.get(Slot::Current).iter().map(PointState::position).collect()
    }

    /// Current positions of active points, in point order.
    pub fn active_current_points(&self) -> Vec<DVec3> {
        self.buffers
            .get(Slot::Current)
            .iter()
            .filter_map(PointState::position)
            .collect()
    }

    /// Current state of every point, including its plate membership.
    pub fn current_states(&self) -> &[PointState] {
        self.buffers.get(Slot::Current)
    }

    /// Indices and positions of points removed by a continental mask, in
    /// the order they were removed.
    pub fn in_continent_points(&self) -> (&[usize], &[DVec3]) {
        (&self.in_continent_indices, &self.in_continent_points)
    }

    /// Every collision so far, in the order detected.
    pub fn consumed_points(&self) -> &[ConsumedPoint] {
        &self.consumed
    }

    /// Activation window of each point.
    pub fn activation_windows(&self) -> &[ActivationWindow] {
        &self.windows
    }

    /// The configured collision policy, if detection is enabled.
    pub fn collision_policy(&self) -> Option<&dyn CollisionPolicy> {
        self.collision_policy.as_deref()
    }
}

/// Optional per-point settings and collision policy for [`reconstruct_points`].
#[derive(Default)]
pub struct ReconstructOptions {
    pub point_begin_times: Option<Vec<f64>>,
    pub point_end_times: Option<Vec<f64>>,
    pub point_plate_ids: Option<Vec<PlateId>>,
    pub collision_detection: CollisionDetection,
}

/// Reconstructs `points` over `span`, returning the points still active at
/// the end time.
pub fn reconstruct_points(
    rotation_model: Arc<dyn RotationModel>,
    topology_resolver: Arc<dyn TopologyResolver>,
    span: TimeSpan,
    points: Vec<DVec3>,
    options: ReconstructOptions,
) -> Result<Vec<DVec3>, ReconstructionError> {
    let mut builder = ReconstructByTopologies::builder(rotation_model, topology_resolver, span, points)
        .collision_detection(options.collision_detection);
    if let Some(begin_times) = options.point_begin_times {
        builder = builder.point_begin_times(begin_times);
    }
    if let Some(end_times) = options.point_end_times {
        builder = builder.point_end_times(end_times);
    }
    if let Some(plate_ids) = options.point_plate_ids {
        builder = builder.point_plate_ids(plate_ids);
    }
    builder.build()?.reconstruct()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionParameters, ContinentCollision};
    use crate::geometry::{fibonacci_points, lat_lon_to_unit, random_points, BoundaryPolygon};
    use crate::kinematics::{EulerPole, EulerPoleModel};
    use crate::raster::{FnRasterLoader, MaskGrid};
    use crate::topology::{ResolvedTopology, TopologyFeature, TopologySet};

    const TOLERANCE: f64 = 1e-9;

    /// Ring of vertices at a fixed latitude, offset from the meridians used
    /// by test points.
    fn ring(lat: f64) -> Vec<DVec3> {
        (0..8).map(|k| lat_lon_to_unit(lat, 22.5 + 45.0 * k as f64)).collect()
    }

    /// Two overlapping caps with the same plate ID covering the whole sphere.
    fn whole_sphere(plate_id: PlateId) -> TopologySet {
        let north = BoundaryPolygon::with_interior(ring(-10.0), DVec3::Z).unwrap();
        let south = BoundaryPolygon::with_interior(ring(10.0), DVec3::NEG_Z).unwrap();
        TopologySet::new()
            .with_feature(TopologyFeature::always(ResolvedTopology::new(plate_id, north)))
            .with_feature(TopologyFeature::always(ResolvedTopology::new(plate_id, south)))
    }

    /// Plate 1 is the fixed northern hemisphere. Plate 2 is the southern
    /// hemisphere, turning 0.5 deg/Myr about (0N, 0E) so that near 90E it
    /// moves north across the equator at ~56 km/Myr.
    fn hemispheres() -> (EulerPoleModel, TopologySet) {
        let model = EulerPoleModel::new()
            .with_plate(1, EulerPole::new(90.0, 0.0, 0.0))
            .with_plate(2, EulerPole::new(0.0, 0.0, 0.5));
        let north = BoundaryPolygon::with_interior(ring(0.0), DVec3::Z).unwrap();
        let south = BoundaryPolygon::with_interior(ring(0.0), DVec3::NEG_Z).unwrap();
        let set = TopologySet::new()
            .with_feature(TopologyFeature::always(ResolvedTopology::new(1, north)))
            .with_feature(TopologyFeature::always(ResolvedTopology::new(2, south)));
        (model, set)
    }

    fn span() -> TimeSpan {
        TimeSpan::new(10.0, 0.0, 1.0)
    }

    fn assert_close(a: DVec3, b: DVec3) {
        assert!(a.distance(b) < TOLERANCE, "{a} != {b}");
    }

    #[test]
    fn test_whole_sphere_plate_without_collisions() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(30.0, 40.0, 1.5)));
        let points = vec![lat_lon_to_unit(0.0, 0.0), lat_lon_to_unit(45.0, 120.0)];

        let mut engine =
            ReconstructByTopologies::builder(model.clone(), Arc::new(whole_sphere(101)), span(), points.clone())
                .no_collision_detection()
                .build()
                .unwrap();
        let result = engine.reconstruct().unwrap();

        let total = model.stage_rotation(101, 10.0, 0.0).unwrap();
        assert_eq!(result.len(), 2);
        assert_close(result[0], total * points[0]);
        assert_close(result[1], total * points[1]);
        assert_eq!(engine.current_time(), 0.0);
        assert!(engine.current_states().iter().all(|s| s.plate_id() == Some(101)));
    }

    #[test]
    fn test_backward_reconstruction() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(-20.0, 70.0, 2.0)));
        let point = lat_lon_to_unit(12.0, -33.0);

        let result = ReconstructByTopologies::builder(
            model.clone(),
            Arc::new(whole_sphere(101)),
            TimeSpan::new(0.0, 10.0, 1.0),
            vec![point],
        )
        .build()
        .unwrap()
        .reconstruct()
        .unwrap();

        let total = model.stage_rotation(101, 0.0, 10.0).unwrap();
        assert_close(result[0], total * point);
    }

    #[test]
    fn test_reconstruction_is_deterministic() {
        let (model, set) = hemispheres();
        let (model, set) = (Arc::new(model), Arc::new(set));
        let points = random_points(200, 7);

        let run = || {
            let mut engine =
                ReconstructByTopologies::builder(model.clone(), set.clone(), span(), points.clone()).build().unwrap();
            let result = engine.reconstruct().unwrap();
            (result, engine.all_current_points(), engine.consumed_points().to_vec())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_engine_can_rerun() {
        let (model, set) = hemispheres();
        let points = vec![lat_lon_to_unit(-0.75, 90.0), lat_lon_to_unit(-30.0, -90.0)];
        let mut engine = ReconstructByTopologies::builder(Arc::new(model), Arc::new(set), span(), points)
            .build()
            .unwrap();

        let first = engine.reconstruct().unwrap();
        let consumed = engine.consumed_points().to_vec();
        let second = engine.reconstruct().unwrap();
        assert_eq!(first, second);
        assert_eq!(consumed, engine.consumed_points());
    }

    #[test]
    fn test_crossing_fast_boundary_is_consumed() {
        let (model, set) = hemispheres();
        // First point crosses the equator between 9 and 8 Ma, second stays south
        let points = vec![lat_lon_to_unit(-0.75, 90.0), lat_lon_to_unit(-30.0, -90.0)];
        let mut engine = ReconstructByTopologies::builder(Arc::new(model), Arc::new(set), span(), points)
            .build()
            .unwrap();

        let result = engine.reconstruct().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            engine.consumed_points(),
            &[ConsumedPoint {
                index: 0,
                time: 8.0,
                kind: CollisionKind::Boundary,
            }]
        );
        assert_eq!(engine.all_current_points()[0], None);
        assert_eq!(engine.current_states()[1].plate_id(), Some(2));
        assert!(engine.in_continent_points().0.is_empty());
    }

    #[test]
    fn test_unreachable_velocity_threshold_never_collides() {
        let (model, set) = hemispheres();
        let points = vec![lat_lon_to_unit(-0.75, 90.0), lat_lon_to_unit(-30.0, -90.0)];
        let policy = KinematicCollision::new(CollisionParameters::new(100.0, 1e6));
        let mut engine = ReconstructByTopologies::builder(Arc::new(model), Arc::new(set), span(), points)
            .collision_policy(policy)
            .build()
            .unwrap();

        let result = engine.reconstruct().unwrap();
        assert_eq!(result.len(), 2);
        assert!(engine.consumed_points().is_empty());
        // Carried onto the fixed northern plate
        assert_eq!(engine.current_states()[0].plate_id(), Some(1));
    }

    #[test]
    fn test_stable_membership_never_collides() {
        let (model, set) = hemispheres();
        let points = fibonacci_points(100)
            .into_iter()
            .filter(|p| p.z < -0.2 && p.y < 0.0)
            .collect::<Vec<_>>();
        assert!(!points.is_empty());

        for params in [CollisionParameters::new(0.0, 1e9), CollisionParameters::default()] {
            let mut engine =
                ReconstructByTopologies::builder(Arc::new(model.clone()), Arc::new(set.clone()), span(), points.clone())
                    .collision_policy(KinematicCollision::new(params))
                    .build()
                    .unwrap();
            let result = engine.reconstruct().unwrap();
            assert_eq!(result.len(), points.len());
            assert!(engine.consumed_points().is_empty());
        }
    }

    #[test]
    fn test_collisions_are_terminal() {
        let (model, set) = hemispheres();
        let points = fibonacci_points(400);
        let mut engine = ReconstructByTopologies::builder(Arc::new(model), Arc::new(set), span(), points)
            .build()
            .unwrap();

        engine.begin_reconstruction().unwrap();
        let mut consumed: Vec<usize> = Vec::new();
        while engine.reconstruct_to_next_time().unwrap() {
            let current = engine.all_current_points();
            assert!(consumed.iter().all(|&i| current[i].is_none()));
            consumed = engine.consumed_points().iter().map(|c| c.index).collect();
        }
        assert!(!consumed.is_empty());
    }

    #[test]
    fn test_activation_windows() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(0.0, 90.0, 1.0)));
        let windows = [(8.0, 3.0), (20.0, 6.0), (4.0, -5.0), (f64::INFINITY, f64::NEG_INFINITY)];
        let points = vec![lat_lon_to_unit(10.0, 10.0); windows.len()];

        let mut engine = ReconstructByTopologies::builder(model, Arc::new(whole_sphere(101)), span(), points)
            .point_begin_times(windows.iter().map(|w| w.0).collect())
            .point_end_times(windows.iter().map(|w| w.1).collect())
            .build()
            .unwrap();

        engine.begin_reconstruction().unwrap();
        loop {
            let time = engine.current_time();
            for (i, (begin, end)) in windows.iter().enumerate() {
                let expected = *end <= time && time <= *begin;
                assert_eq!(engine.all_current_points()[i].is_some(), expected, "point {i} at {time} Ma");
            }
            if !engine.reconstruct_to_next_time().unwrap() {
                break;
            }
        }
        assert_eq!(engine.current_time(), 0.0);
        assert_eq!(engine.num_activated_points(), 4);
    }

    #[test]
    fn test_single_instant_window() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(0.0, 90.0, 1.0)));
        let mut engine =
            ReconstructByTopologies::builder(model, Arc::new(whole_sphere(101)), span(), vec![DVec3::X])
                .point_begin_times(vec![5.0])
                .point_end_times(vec![5.0])
                .build()
                .unwrap();

        engine.begin_reconstruction().unwrap();
        let mut active_times = Vec::new();
        loop {
            if engine.all_current_points()[0].is_some() {
                active_times.push(engine.current_time());
            }
            if !engine.reconstruct_to_next_time().unwrap() {
                break;
            }
        }
        assert_eq!(active_times, vec![5.0]);
        // Every point activated and none active: stops early
        assert_eq!(engine.current_time(), 4.0);
        assert!(engine.active_current_points().is_empty());
    }

    #[test]
    fn test_activated_point_starts_from_seed() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0)));
        let seed = lat_lon_to_unit(0.0, 0.0);
        let mut engine =
            ReconstructByTopologies::builder(model.clone(), Arc::new(whole_sphere(101)), span(), vec![seed])
                .point_begin_times(vec![4.0])
                .build()
                .unwrap();

        let result = engine.reconstruct().unwrap();
        let total = model.stage_rotation(101, 4.0, 0.0).unwrap();
        assert_close(result[0], total * seed);
    }

    #[test]
    fn test_outside_polygons_uses_fallback_plate() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0)));
        let points = vec![lat_lon_to_unit(0.0, 0.0), lat_lon_to_unit(0.0, 0.0)];
        let mut engine = ReconstructByTopologies::builder(model.clone(), Arc::new(TopologySet::new()), span(), points.clone())
            .point_plate_ids(vec![101, ANCHOR_PLATE_ID])
            .build()
            .unwrap();

        let result = engine.reconstruct().unwrap();
        assert_close(result[0], model.stage_rotation(101, 10.0, 0.0).unwrap() * points[0]);
        assert_close(result[1], points[1]);
        assert!(engine.consumed_points().is_empty());
        assert!(engine.current_states().iter().all(|s| s.plate_id().is_none()));
    }

    #[test]
    fn test_continental_mask_consumes_points() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0)));
        // Continent east of 0E, ocean to the west
        let loader = FnRasterLoader::new(|_time| {
            MaskGrid::new(vec![0.0, 1.0, 0.0, 1.0], vec![-90.0, 90.0], vec![-45.0, 45.0])
        });
        let points = vec![lat_lon_to_unit(0.0, -120.0), lat_lon_to_unit(20.0, 100.0)];
        let mut engine = ReconstructByTopologies::builder(model, Arc::new(whole_sphere(101)), span(), points)
            .collision_policy(ContinentCollision::new(loader))
            .build()
            .unwrap();

        let result = engine.reconstruct().unwrap();
        assert_eq!(result.len(), 1);
        let (indices, positions) = engine.in_continent_points();
        assert_eq!(indices, &[1]);
        assert_eq!(positions.len(), 1);
        assert_eq!(engine.consumed_points()[0].time, 9.0);
        assert_eq!(engine.consumed_points()[0].kind, CollisionKind::Continent);
    }

    #[test]
    fn test_missing_rotation_propagates() {
        let model = Arc::new(EulerPoleModel::new());
        let mut engine =
            ReconstructByTopologies::builder(model, Arc::new(whole_sphere(404)), span(), vec![DVec3::X])
                .build()
                .unwrap();
        let err = engine.reconstruct().unwrap_err();
        assert!(matches!(err, ReconstructionError::Rotation(_)));
        assert!(err.is_missing_collaborator_data());
    }

    #[test]
    fn test_missing_topology_propagates() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0)));
        let set = whole_sphere(101).with_coverage(10.0, 5.0);
        let mut engine = ReconstructByTopologies::builder(model, Arc::new(set), span(), vec![DVec3::X])
            .build()
            .unwrap();
        let err = engine.reconstruct().unwrap_err();
        assert!(matches!(err, ReconstructionError::Topology(_)));
        assert_eq!(engine.current_time(), 4.0);
    }

    #[test]
    fn test_invalid_configuration() {
        let model: Arc<dyn RotationModel> = Arc::new(EulerPoleModel::new());
        let set: Arc<dyn TopologyResolver> = Arc::new(TopologySet::new());
        let builder = |span: TimeSpan, points: Vec<DVec3>| {
            ReconstructByTopologies::builder(model.clone(), set.clone(), span, points)
        };
        let is_invalid = |result: Result<ReconstructByTopologies, ReconstructionError>| {
            matches!(result, Err(ReconstructionError::InvalidConfiguration(_)))
        };

        assert!(is_invalid(builder(TimeSpan::new(10.0, 0.0, 0.0), vec![DVec3::X]).build()));
        assert!(is_invalid(builder(span(), Vec::new()).build()));
        assert!(is_invalid(builder(span(), vec![DVec3::X, DVec3::Y]).point_begin_times(vec![1.0]).build()));
        assert!(is_invalid(builder(span(), vec![DVec3::X]).point_end_times(vec![1.0, 2.0]).build()));
        assert!(is_invalid(builder(span(), vec![DVec3::X]).point_plate_ids(vec![]).build()));
        assert!(builder(span(), vec![DVec3::X]).point_plate_ids(vec![7]).build().is_ok());
    }

    #[test]
    fn test_reconstruct_points() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0)));
        let result = reconstruct_points(
            model,
            Arc::new(whole_sphere(101)),
            span(),
            vec![lat_lon_to_unit(0.0, 0.0)],
            ReconstructOptions::default(),
        )
        .unwrap();
        let (lat, lon) = crate::geometry::unit_to_lat_lon(result[0]);
        assert!(lat.abs() < 1e-9);
        assert!((lon - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_reconstruct_points_with_options() {
        let (model, set) = hemispheres();
        let (model, set) = (Arc::new(model), Arc::new(set));
        // The first point crosses the fast boundary at 8 Ma and the second
        // leaves its window at 5 Ma
        let points = vec![
            lat_lon_to_unit(-0.75, 90.0),
            lat_lon_to_unit(-30.0, 90.0),
            lat_lon_to_unit(-30.0, -90.0),
        ];
        let options = |collision_detection| ReconstructOptions {
            point_begin_times: Some(vec![f64::INFINITY, 20.0, f64::INFINITY]),
            point_end_times: Some(vec![f64::NEG_INFINITY, 5.0, f64::NEG_INFINITY]),
            point_plate_ids: None,
            collision_detection,
        };

        let result =
            reconstruct_points(model.clone(), set.clone(), span(), points.clone(), options(CollisionDetection::Disabled))
                .unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].z > 0.0);
        assert_close(result[1], model.stage_rotation(2, 10.0, 0.0).unwrap() * points[2]);

        let result = reconstruct_points(model.clone(), set, span(), points.clone(), options(CollisionDetection::Default))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_close(result[0], model.stage_rotation(2, 10.0, 0.0).unwrap() * points[2]);

        // Outside every polygon the fallback plate IDs apply
        let seed = lat_lon_to_unit(0.0, 90.0);
        let result = reconstruct_points(
            model.clone(),
            Arc::new(TopologySet::new()),
            span(),
            vec![seed],
            ReconstructOptions {
                point_plate_ids: Some(vec![2]),
                ..ReconstructOptions::default()
            },
        )
        .unwrap();
        assert_close(result[0], model.stage_rotation(2, 10.0, 0.0).unwrap() * seed);
    }

    #[test]
    fn test_degenerate_seed_point_rejected() {
        let model = Arc::new(EulerPoleModel::new());
        for point in [DVec3::ZERO, DVec3::new(f64::NAN, 0.0, 1.0), DVec3::new(f64::INFINITY, 0.0, 0.0)] {
            let result = ReconstructByTopologies::builder(
                model.clone(),
                Arc::new(whole_sphere(101)),
                span(),
                vec![DVec3::X, point],
            )
            .build();
            assert!(matches!(result, Err(ReconstructionError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_policy_deletion_count_after_reconstruct() {
        let model = Arc::new(EulerPoleModel::new().with_plate(101, EulerPole::new(90.0, 0.0, 1.0)));
        // Continent east of 0E; the point drifts east and crosses 0E in the
        // last step
        let loader = FnRasterLoader::new(|_time| {
            MaskGrid::new(vec![0.0, 1.0, 0.0, 1.0], vec![-90.0, 90.0], vec![-45.0, 45.0])
        });
        let mut engine =
            ReconstructByTopologies::builder(model, Arc::new(whole_sphere(101)), span(), vec![lat_lon_to_unit(0.0, -9.5)])
                .collision_policy(ContinentCollision::new(loader))
                .build()
                .unwrap();

        assert!(engine.reconstruct().unwrap().is_empty());
        assert_eq!(engine.consumed_points()[0].time, 0.0);
        assert_eq!(engine.collision_policy().and_then(|p| p.deletion_count()), Some(1));
    }
}
