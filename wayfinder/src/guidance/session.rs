//! Navigation session: progress along one route.
//!
//! The session is pure bookkeeping. It never announces, never spawns and
//! never reads a clock itself; the engine passes `now` in and acts on the
//! returned [`StepProgress`].

use tokio::time::Instant;

use super::events::{GuidanceProjection, NavigationState};
use super::GuidanceConfig;
use crate::error::{NavError, Result};
use crate::geo::{cardinal_direction, distance_meters, initial_bearing_degrees, Coordinate};
use crate::route::{format_distance, format_duration, Route, RouteStep};

/// What a position update did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum StepProgress {
    /// The current step was completed; `to` is the new current step.
    Advanced { from: usize, to: usize },
    /// The last step was completed within the arrival threshold.
    Arrived,
    /// Still on the same step.
    Progress(GuidanceProjection),
    /// The current step's end is not a usable coordinate.
    InvalidStepEnd { step: usize },
}

/// Progress of an active navigation along a route.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    route: Route,
    current_step_index: usize,
    last_known_position: Option<Coordinate>,
    last_announcement_at: Option<Instant>,
    step_entered_at: Instant,
    started_at: Instant,
}

impl NavigationSession {
    /// Start a session at step 0.
    ///
    /// # Errors
    ///
    /// [`NavError::EmptyRoute`] if the route has no steps.
    pub fn new(route: Route, now: Instant) -> Result<Self> {
        if route.is_empty() {
            return Err(NavError::EmptyRoute);
        }
        Ok(Self {
            route,
            current_step_index: 0,
            last_known_position: None,
            last_announcement_at: None,
            step_entered_at: now,
            started_at: now,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> &RouteStep {
        // Index is kept in [0, len) and the route is never empty
        &self.route.steps[self.current_step_index]
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step_index + 1 == self.route.step_count()
    }

    pub fn last_known_position(&self) -> Option<Coordinate> {
        self.last_known_position
    }

    pub fn last_announcement_at(&self) -> Option<Instant> {
        self.last_announcement_at
    }

    pub fn step_entered_at(&self) -> Instant {
        self.step_entered_at
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Record that the current instruction was spoken.
    pub fn mark_announced(&mut self, now: Instant) {
        self.last_announcement_at = Some(now);
    }

    /// Apply a position fix.
    ///
    /// Advances at most one step per call. Near the end of an intermediate
    /// step the session advances; only the last step can arrive.
    pub fn apply_position(
        &mut self,
        position: Coordinate,
        config: &GuidanceConfig,
        now: Instant,
    ) -> StepProgress {
        self.last_known_position = Some(position);

        let step_index = self.current_step_index;
        let step_end = self.current_step().end;
        if !step_end.is_valid() {
            return StepProgress::InvalidStepEnd { step: step_index };
        }

        let distance_m = distance_meters(position, step_end);
        if distance_m < config.step_advance_threshold_m {
            if !self.is_last_step() {
                self.current_step_index += 1;
                self.step_entered_at = now;
                return StepProgress::Advanced {
                    from: step_index,
                    to: self.current_step_index,
                };
            }

            let to_destination = self
                .route
                .destination()
                .map(|destination| distance_meters(position, destination))
                .unwrap_or(distance_m);
            if to_destination < config.arrival_threshold_m {
                return StepProgress::Arrived;
            }
        }

        StepProgress::Progress(self.projection(config))
    }

    /// Snapshot of the current progress.
    ///
    /// Without a position fix, distances cover the whole current step and
    /// the direction is unknown.
    pub fn projection(&self, config: &GuidanceConfig) -> GuidanceProjection {
        let step = self.current_step();
        let index = self.current_step_index;

        let fix = self
            .last_known_position
            .filter(|p| p.is_valid() && step.end.is_valid());
        let to_step_end = fix.map(|p| distance_meters(p, step.end));
        let bearing = fix.map(|p| initial_bearing_degrees(p, step.end));

        let step_remaining_m = to_step_end.unwrap_or(step.distance_m);
        let remaining_m = step_remaining_m + self.route.distance_after_step(index);
        let eta_s = self.step_time_remaining(step, step_remaining_m, config)
            + self.route.duration_after_step(index);

        GuidanceProjection {
            state: NavigationState::Active,
            step_index: Some(index),
            step_count: Some(self.route.step_count()),
            instruction: Some(step.instruction.clone()),
            distance_to_step_end_m: to_step_end,
            remaining_distance_m: Some(remaining_m),
            remaining_distance_text: Some(format_distance(remaining_m)),
            eta_seconds: Some(eta_s),
            eta_text: Some(format_duration(eta_s)),
            bearing_degrees: bearing,
            direction: bearing.map(cardinal_direction),
        }
    }

    /// Time left on `step`, scaling its duration by the remaining fraction.
    fn step_time_remaining(
        &self,
        step: &RouteStep,
        remaining_m: f64,
        config: &GuidanceConfig,
    ) -> f64 {
        if step.distance_m > 0.0 && step.duration_s > 0.0 {
            step.duration_s * (remaining_m / step.distance_m).clamp(0.0, 1.0)
        } else if config.walking_speed_mps > 0.0 {
            remaining_m / config.walking_speed_mps
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CardinalDirection;
    use crate::route::{RouteSource, RouteStep};
    use proptest::prelude::*;

    fn step(start: (f64, f64), end: (f64, f64), instruction: &str) -> RouteStep {
        let start: Coordinate = start.into();
        let end: Coordinate = end.into();
        let distance_m = distance_meters(start, end);
        RouteStep {
            start,
            end,
            instruction: instruction.to_string(),
            distance_m,
            distance_text: format_distance(distance_m),
            duration_s: distance_m / 1.4,
            duration_text: format_duration(distance_m / 1.4),
            maneuver: None,
        }
    }

    /// Three steps heading east, north, east; roughly 111 m each.
    fn three_step_route() -> Route {
        Route {
            steps: vec![
                step((0.0, 0.0), (0.0, 0.001), "Head east"),
                step((0.0, 0.001), (0.001, 0.001), "Turn left"),
                step((0.001, 0.001), (0.001, 0.002), "Turn right"),
            ],
            polyline: Vec::new(),
            total_distance_text: "330 m".to_string(),
            total_duration_text: "4 mins".to_string(),
            traffic_duration_text: None,
            bounding_box: None,
            summary: None,
            source: RouteSource::ProviderRoute,
        }
    }

    fn session() -> NavigationSession {
        NavigationSession::new(three_step_route(), Instant::now()).unwrap()
    }

    #[test]
    fn test_empty_route_rejected() {
        let mut route = three_step_route();
        route.steps.clear();
        let result = NavigationSession::new(route, Instant::now());
        assert!(matches!(result, Err(NavError::EmptyRoute)));
    }

    #[test]
    fn test_starts_at_first_step() {
        let session = session();
        assert_eq!(session.current_step_index(), 0);
        assert_eq!(session.current_step().instruction, "Head east");
        assert!(session.last_known_position().is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step advancement
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_far_position_reports_progress() {
        let mut session = session();
        let config = GuidanceConfig::default();

        let outcome = session.apply_position(Coordinate::new(0.0, 0.0003), &config, Instant::now());

        let StepProgress::Progress(projection) = outcome else {
            panic!("expected progress, got {:?}", outcome);
        };
        assert_eq!(projection.step_index, Some(0));
        assert_eq!(projection.direction, Some(CardinalDirection::East));
        let to_end = projection.distance_to_step_end_m.unwrap();
        assert!((to_end - 77.8).abs() < 1.0, "to_end = {}", to_end);
        assert_eq!(session.current_step_index(), 0);
    }

    #[test]
    fn test_near_intermediate_step_end_advances() {
        let mut session = session();
        let config = GuidanceConfig::default();

        // ~11 m short of step 0's end, well inside the arrival radius too
        let outcome =
            session.apply_position(Coordinate::new(0.0, 0.0009), &config, Instant::now());

        assert_eq!(outcome, StepProgress::Advanced { from: 0, to: 1 });
        assert_eq!(session.current_step().instruction, "Turn left");
    }

    #[test]
    fn test_arrival_only_on_last_step() {
        let mut session = session();
        let config = GuidanceConfig::default();
        let now = Instant::now();

        assert!(matches!(
            session.apply_position(Coordinate::new(0.0, 0.001), &config, now),
            StepProgress::Advanced { to: 1, .. }
        ));
        assert!(matches!(
            session.apply_position(Coordinate::new(0.001, 0.001), &config, now),
            StepProgress::Advanced { to: 2, .. }
        ));
        assert_eq!(
            session.apply_position(Coordinate::new(0.001, 0.00195), &config, now),
            StepProgress::Arrived
        );
    }

    #[test]
    fn test_last_step_outside_arrival_threshold_is_progress() {
        let mut route = three_step_route();
        route.steps.truncate(1);
        let mut session = NavigationSession::new(route, Instant::now()).unwrap();
        let config = GuidanceConfig {
            arrival_threshold_m: 5.0,
            ..GuidanceConfig::default()
        };

        // ~11 m away: inside step threshold, outside arrival threshold
        let outcome =
            session.apply_position(Coordinate::new(0.0, 0.0009), &config, Instant::now());

        assert!(matches!(outcome, StepProgress::Progress(_)));
    }

    #[test]
    fn test_invalid_step_end_reported() {
        let mut route = three_step_route();
        route.steps[0].end = Coordinate::new(f64::NAN, f64::NAN);
        let mut session = NavigationSession::new(route, Instant::now()).unwrap();

        let outcome = session.apply_position(
            Coordinate::new(0.0, 0.0),
            &GuidanceConfig::default(),
            Instant::now(),
        );

        assert_eq!(outcome, StepProgress::InvalidStepEnd { step: 0 });
        assert_eq!(session.current_step_index(), 0);
    }

    #[test]
    fn test_advance_resets_step_entered_at() {
        let start = Instant::now();
        let mut session = NavigationSession::new(three_step_route(), start).unwrap();
        let later = start + std::time::Duration::from_secs(40);

        session.apply_position(Coordinate::new(0.0, 0.001), &GuidanceConfig::default(), later);

        assert_eq!(session.step_entered_at(), later);
        assert_eq!(session.started_at(), start);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Projection
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_projection_without_fix_covers_whole_route() {
        let session = session();
        let projection = session.projection(&GuidanceConfig::default());

        let total = session.route().total_distance_m();
        assert!((projection.remaining_distance_m.unwrap() - total).abs() < 1e-6);
        assert!((projection.eta_seconds.unwrap() - total / 1.4).abs() < 1e-6);
        assert!(projection.direction.is_none());
        assert_eq!(projection.instruction.as_deref(), Some("Head east"));
    }

    #[test]
    fn test_projection_eta_scales_current_step() {
        let mut session = session();
        let config = GuidanceConfig::default();
        // Halfway along step 0
        session.apply_position(Coordinate::new(0.0, 0.0005), &config, Instant::now());

        let projection = session.projection(&config);
        let step0 = &session.route().steps[0];
        let expected = step0.duration_s * 0.5 + session.route().duration_after_step(0);
        assert!((projection.eta_seconds.unwrap() - expected).abs() < 1.0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Property tests
    // ─────────────────────────────────────────────────────────────────────────

    mod property_tests {
        use super::*;

        proptest! {
            /// Walking the step ends in order advances exactly N-1 times.
            #[test]
            fn prop_walk_in_order_advances_n_minus_one(n in 1usize..12) {
                let steps: Vec<RouteStep> = (0..n)
                    .map(|i| {
                        let lon = i as f64 * 0.001;
                        step((0.0, lon), (0.0, lon + 0.001), "Continue")
                    })
                    .collect();
                let route = Route { steps, ..three_step_route() };
                let mut session = NavigationSession::new(route.clone(), Instant::now()).unwrap();
                let config = GuidanceConfig::default();

                let mut advances = 0;
                let mut last_index = 0;
                let mut arrived = false;
                for s in &route.steps {
                    match session.apply_position(s.end, &config, Instant::now()) {
                        StepProgress::Advanced { .. } => advances += 1,
                        StepProgress::Arrived => arrived = true,
                        other => prop_assert!(false, "unexpected {:?}", other),
                    }
                    prop_assert!(session.current_step_index() >= last_index);
                    last_index = session.current_step_index();
                }

                prop_assert_eq!(advances, n - 1);
                prop_assert!(arrived);
            }

            /// The step index never decreases, whatever the positions.
            #[test]
            fn prop_step_index_monotonic(
                positions in prop::collection::vec((-0.01f64..0.01, -0.01f64..0.01), 1..40)
            ) {
                let mut session = session();
                let config = GuidanceConfig::default();
                let mut last_index = 0;
                for (lat, lon) in positions {
                    let outcome = session.apply_position(Coordinate::new(lat, lon), &config, Instant::now());
                    prop_assert!(session.current_step_index() >= last_index);
                    last_index = session.current_step_index();
                    if outcome == StepProgress::Arrived {
                        break;
                    }
                }
            }
        }
    }
}
