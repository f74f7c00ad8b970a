//! Route acquisition with straight-line fallback.
//!
//! [`RouteAcquirer`] asks the directions provider for a route and converts
//! the answer into a [`Route`]. When the provider fails in any way (transport
//! error, non-OK status, no steps) it builds a single-step straight-line
//! route instead, so callers always get something to guide along.
//!
//! ```text
//! acquire_route ──► validate ──► provider ──► OK + steps ──► normalize ──► ProviderRoute
//!                      │                          │
//!                      ▼                          └─ anything else ──► straight line ──► FallbackStraightLine
//!               InvalidCoordinate
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::model::{ManeuverKind, Route, RouteSource, RouteStep};
use super::text::{clean_instruction, format_distance, format_duration};
use crate::error::Result;
use crate::geo::{
    bounding_box, cardinal_direction, distance_meters, initial_bearing_degrees, polyline,
    Coordinate,
};
use crate::provider::{
    DirectionsProvider, DirectionsRequest, DirectionsRoute, DirectionsStep, TextValue, TravelMode,
};

/// Average walking speed used to estimate fallback durations (m/s).
pub const AVERAGE_WALKING_SPEED_MPS: f64 = 1.4;

/// Placeholder for step endpoints the provider omitted. Fails validation.
const UNKNOWN_LOCATION: Coordinate = Coordinate::new(f64::NAN, f64::NAN);

/// Configuration for route acquisition.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Speed used to estimate fallback route durations.
    pub walking_speed_mps: f64,
    /// Whether to ask the provider for alternative routes.
    pub request_alternatives: bool,
    /// Default travel mode for navigation requests.
    pub travel_mode: TravelMode,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            walking_speed_mps: AVERAGE_WALKING_SPEED_MPS,
            request_alternatives: true,
            travel_mode: TravelMode::Walking,
        }
    }
}

/// The primary route plus any alternatives the provider offered.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOptions {
    pub primary: Route,
    pub alternatives: Vec<Route>,
}

/// Fetches routes from a directions provider.
pub struct RouteAcquirer {
    directions: Arc<dyn DirectionsProvider>,
    config: RouteConfig,
}

impl RouteAcquirer {
    /// Create an acquirer backed by the given provider.
    pub fn new(directions: Arc<dyn DirectionsProvider>, config: RouteConfig) -> Self {
        Self { directions, config }
    }

    /// Acquisition settings.
    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Acquire the primary route from `origin` to `destination`.
    ///
    /// Provider failures never surface here; they yield a fallback route.
    ///
    /// # Errors
    ///
    /// [`NavError::InvalidCoordinate`](crate::NavError::InvalidCoordinate) if
    /// either endpoint is not a valid coordinate. The provider is not called.
    pub async fn acquire_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<Route> {
        Ok(self.acquire_routes(origin, destination, mode).await?.primary)
    }

    /// Acquire the primary route and any alternatives.
    ///
    /// Alternatives are only ever provider routes; a fallback has none.
    pub async fn acquire_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteOptions> {
        let origin = origin.validate()?;
        let destination = destination.validate()?;

        let request = DirectionsRequest {
            origin,
            destination,
            mode,
            alternatives: self.config.request_alternatives,
        };

        debug!(
            provider = self.directions.name(),
            %origin,
            %destination,
            mode = %mode,
            "Requesting directions"
        );

        let response = match self.directions.get_route(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Directions request failed, using straight-line route");
                return Ok(self.fallback(origin, destination));
            }
        };

        if !response.is_ok() {
            warn!(
                status = %response.status,
                message = response.error_message.as_deref().unwrap_or(""),
                "Directions provider returned non-OK status, using straight-line route"
            );
            return Ok(self.fallback(origin, destination));
        }

        let mut candidates = response.routes.iter();
        let primary = match candidates.next().and_then(normalize_route) {
            Some(route) => route,
            None => {
                warn!("Directions response has no steps, using straight-line route");
                return Ok(self.fallback(origin, destination));
            }
        };
        let alternatives: Vec<Route> = candidates.filter_map(normalize_route).collect();

        info!(
            steps = primary.step_count(),
            distance = %primary.total_distance_text,
            alternatives = alternatives.len(),
            "Route acquired"
        );

        Ok(RouteOptions {
            primary,
            alternatives,
        })
    }

    fn fallback(&self, origin: Coordinate, destination: Coordinate) -> RouteOptions {
        RouteOptions {
            primary: build_straight_line_route(origin, destination, self.config.walking_speed_mps),
            alternatives: Vec::new(),
        }
    }
}

/// Build a one-step route straight from `origin` to `destination`.
///
/// Duration is estimated as distance divided by `walking_speed_mps`.
pub fn build_straight_line_route(
    origin: Coordinate,
    destination: Coordinate,
    walking_speed_mps: f64,
) -> Route {
    let distance_m = distance_meters(origin, destination);
    let duration_s = if walking_speed_mps > 0.0 {
        distance_m / walking_speed_mps
    } else {
        0.0
    };
    let heading = cardinal_direction(initial_bearing_degrees(origin, destination));
    let distance_text = format_distance(distance_m);
    let duration_text = format_duration(duration_s);

    let step = RouteStep {
        start: origin,
        end: destination,
        instruction: format!(
            "Head {} toward your destination, {} away",
            heading, distance_text
        ),
        distance_m,
        distance_text: distance_text.clone(),
        duration_s,
        duration_text: duration_text.clone(),
        maneuver: Some(ManeuverKind::Straight),
    };

    let polyline = vec![origin, destination];
    let bbox = bounding_box(&polyline).ok();

    Route {
        steps: vec![step],
        polyline,
        total_distance_text: distance_text,
        total_duration_text: duration_text,
        traffic_duration_text: None,
        bounding_box: bbox,
        summary: None,
        source: RouteSource::FallbackStraightLine,
    }
}

/// Convert one provider route. Returns `None` when it has no steps.
fn normalize_route(raw: &DirectionsRoute) -> Option<Route> {
    let steps: Vec<RouteStep> = raw
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter())
        .map(normalize_step)
        .collect();

    if steps.is_empty() {
        return None;
    }

    let polyline = decode_geometry(&raw.overview_polyline.points, &steps);
    let bbox = raw
        .bounds
        .map(Into::into)
        .or_else(|| bounding_box(&polyline).ok());

    let total_distance_text = summed_text(raw.legs.iter().map(|l| l.distance.as_ref()))
        .unwrap_or_else(|| format_distance(steps.iter().map(|s| s.distance_m).sum()));
    let total_duration_text = summed_duration_text(raw.legs.iter().map(|l| l.duration.as_ref()))
        .unwrap_or_else(|| format_duration(steps.iter().map(|s| s.duration_s).sum()));
    let traffic_duration_text =
        summed_duration_text(raw.legs.iter().map(|l| l.duration_in_traffic.as_ref()));

    let summary = Some(raw.summary.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(Route {
        steps,
        polyline,
        total_distance_text,
        total_duration_text,
        traffic_duration_text,
        bounding_box: bbox,
        summary,
        source: RouteSource::ProviderRoute,
    })
}

fn normalize_step(raw: &DirectionsStep) -> RouteStep {
    let distance_m = raw.distance.value.max(0.0);
    let duration_s = raw.duration.value.max(0.0);

    RouteStep {
        start: raw.start_location.map(Into::into).unwrap_or(UNKNOWN_LOCATION),
        end: raw.end_location.map(Into::into).unwrap_or(UNKNOWN_LOCATION),
        instruction: clean_instruction(&raw.html_instructions),
        distance_m,
        distance_text: non_empty_or(&raw.distance.text, || format_distance(distance_m)),
        duration_s,
        duration_text: non_empty_or(&raw.duration.text, || format_duration(duration_s)),
        maneuver: raw
            .maneuver
            .as_deref()
            .and_then(ManeuverKind::from_provider_tag),
    }
}

/// Decode the overview polyline, falling back to step endpoints.
fn decode_geometry(encoded: &str, steps: &[RouteStep]) -> Vec<Coordinate> {
    match polyline::decode(encoded) {
        Ok(points) if !points.is_empty() => return points,
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Ignoring undecodable route polyline"),
    }

    let mut points: Vec<Coordinate> = steps.iter().map(|s| s.start).collect();
    if let Some(last) = steps.last() {
        points.push(last.end);
    }
    points.retain(Coordinate::is_valid);
    points
}

/// Provider text for a single leg; `None` when legs are missing values.
fn summed_text<'a>(values: impl Iterator<Item = Option<&'a TextValue>>) -> Option<String> {
    let values: Vec<&TextValue> = values.collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        [] => None,
        [single] if !single.text.is_empty() => Some(single.text.clone()),
        many => Some(format_distance(many.iter().map(|v| v.value).sum())),
    }
}

fn summed_duration_text<'a>(
    values: impl Iterator<Item = Option<&'a TextValue>>,
) -> Option<String> {
    let values: Vec<&TextValue> = values.collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        [] => None,
        [single] if !single.text.is_empty() => Some(single.text.clone()),
        many => Some(format_duration(many.iter().map(|v| v.value).sum())),
    }
}

fn non_empty_or(text: &str, fallback: impl FnOnce() -> String) -> String {
    if text.trim().is_empty() {
        fallback()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NavError;
    use crate::provider::{
        BoxFuture, DirectionsLeg, DirectionsResponse, EncodedPolyline, LatLng, ProviderError,
    };
    use parking_lot::Mutex;

    /// Directions provider that replays a canned result and counts calls.
    struct ScriptedDirections {
        result: std::result::Result<DirectionsResponse, ProviderError>,
        calls: Mutex<Vec<DirectionsRequest>>,
    }

    impl ScriptedDirections {
        fn new(result: std::result::Result<DirectionsResponse, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl DirectionsProvider for ScriptedDirections {
        fn get_route<'a>(
            &'a self,
            request: &'a DirectionsRequest,
        ) -> BoxFuture<'a, std::result::Result<DirectionsResponse, ProviderError>> {
            self.calls.lock().push(*request);
            let result = self.result.clone();
            Box::pin(async move { result })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn latlng(lat: f64, lng: f64) -> Option<LatLng> {
        Some(LatLng { lat, lng })
    }

    fn text_value(text: &str, value: f64) -> TextValue {
        TextValue {
            text: text.to_string(),
            value,
        }
    }

    fn raw_step(start: (f64, f64), end: (f64, f64), html: &str, meters: f64) -> DirectionsStep {
        DirectionsStep {
            start_location: latlng(start.0, start.1),
            end_location: latlng(end.0, end.1),
            html_instructions: html.to_string(),
            distance: text_value(&format!("{} m", meters), meters),
            duration: text_value("1 min", meters / 1.4),
            maneuver: None,
        }
    }

    fn ok_response(routes: Vec<DirectionsRoute>) -> DirectionsResponse {
        DirectionsResponse {
            status: "OK".to_string(),
            routes,
            error_message: None,
        }
    }

    fn three_step_route() -> DirectionsRoute {
        DirectionsRoute {
            summary: "Main St".to_string(),
            legs: vec![DirectionsLeg {
                steps: vec![
                    raw_step((0.0, 0.0), (0.0, 0.001), "Head <b>east</b>", 111.0),
                    DirectionsStep {
                        maneuver: Some("turn-left".to_string()),
                        ..raw_step((0.0, 0.001), (0.001, 0.001), "Turn <b>left</b>", 111.0)
                    },
                    raw_step(
                        (0.001, 0.001),
                        (0.002, 0.001),
                        "Continue<div>Destination on the right</div>",
                        111.0,
                    ),
                ],
                distance: Some(text_value("0.3 km", 333.0)),
                duration: Some(text_value("4 mins", 238.0)),
                duration_in_traffic: None,
            }],
            overview_polyline: EncodedPolyline::default(),
            bounds: None,
        }
    }

    const ORIGIN: Coordinate = Coordinate::new(0.0, 0.0);
    const DESTINATION: Coordinate = Coordinate::new(0.0, 0.009);

    // ─────────────────────────────────────────────────────────────────────────
    // Provider routes
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_provider_route_normalized() {
        let directions = ScriptedDirections::new(Ok(ok_response(vec![three_step_route()])));
        let acquirer = RouteAcquirer::new(directions.clone(), RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_eq!(route.source, RouteSource::ProviderRoute);
        assert_eq!(route.step_count(), 3);
        assert_eq!(route.steps[0].instruction, "Head east");
        assert_eq!(route.steps[1].maneuver, Some(ManeuverKind::TurnLeft));
        assert_eq!(
            route.steps[2].instruction,
            "Continue Destination on the right"
        );
        assert_eq!(route.total_distance_text, "0.3 km");
        assert_eq!(route.total_duration_text, "4 mins");
        assert_eq!(route.summary.as_deref(), Some("Main St"));
        // No encoded polyline: geometry comes from step endpoints
        assert_eq!(route.polyline.len(), 4);
        assert!(route.bounding_box.is_some());

        let calls = directions.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].alternatives);
        assert_eq!(calls[0].mode, TravelMode::Walking);
    }

    #[tokio::test]
    async fn test_provider_polyline_decoded() {
        let mut raw = three_step_route();
        raw.overview_polyline.points = "_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string();
        let directions = ScriptedDirections::new(Ok(ok_response(vec![raw])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_eq!(route.polyline.len(), 3);
        assert_eq!(route.polyline[0], Coordinate::new(38.5, -120.2));
    }

    #[tokio::test]
    async fn test_overflowing_polyline_uses_step_points() {
        let mut raw = three_step_route();
        raw.overview_polyline.points = "}~~~~~~~~~~~F".repeat(6);
        let directions = ScriptedDirections::new(Ok(ok_response(vec![raw])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_eq!(route.source, RouteSource::ProviderRoute);
        assert_eq!(
            route.polyline,
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(0.0, 0.001),
                Coordinate::new(0.001, 0.001),
                Coordinate::new(0.002, 0.001),
            ]
        );
    }

    #[tokio::test]
    async fn test_alternatives_kept() {
        let mut alternative = three_step_route();
        alternative.summary = "Side St".to_string();
        let empty_alternative = DirectionsRoute::default();
        let directions = ScriptedDirections::new(Ok(ok_response(vec![
            three_step_route(),
            alternative,
            empty_alternative,
        ])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let options = acquirer
            .acquire_routes(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_eq!(options.primary.summary.as_deref(), Some("Main St"));
        assert_eq!(options.alternatives.len(), 1);
        assert_eq!(options.alternatives[0].summary.as_deref(), Some("Side St"));
    }

    #[tokio::test]
    async fn test_missing_step_end_becomes_invalid() {
        let mut raw = three_step_route();
        raw.legs[0].steps[1].end_location = None;
        let directions = ScriptedDirections::new(Ok(ok_response(vec![raw])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert!(!route.steps[1].has_valid_end());
        assert!(route.polyline.iter().all(Coordinate::is_valid));
    }

    #[tokio::test]
    async fn test_multi_leg_totals_are_summed() {
        let mut raw = three_step_route();
        let second_leg = raw.legs[0].clone();
        raw.legs.push(second_leg);
        let directions = ScriptedDirections::new(Ok(ok_response(vec![raw])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_eq!(route.step_count(), 6);
        assert_eq!(route.total_distance_text, "670 m");
        assert_eq!(route.total_duration_text, "8 mins");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fallback
    // ─────────────────────────────────────────────────────────────────────────

    fn assert_fallback(route: &Route) {
        assert_eq!(route.source, RouteSource::FallbackStraightLine);
        assert_eq!(route.step_count(), 1);

        let step = &route.steps[0];
        assert!(
            (step.distance_m - 1000.0).abs() < 50.0,
            "distance {} not within 5% of 1000 m",
            step.distance_m
        );
        assert!(
            (step.duration_s - 1000.0 / 1.4).abs() < 1000.0 / 1.4 * 0.05,
            "duration {} not near 714 s",
            step.duration_s
        );
        assert_eq!(route.destination(), Some(DESTINATION));
    }

    #[tokio::test]
    async fn test_fallback_on_transport_error() {
        let directions =
            ScriptedDirections::new(Err(ProviderError::Http("connection refused".into())));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_fallback(&route);
        assert!(route.steps[0].instruction.starts_with("Head east"));
    }

    #[tokio::test]
    async fn test_fallback_on_non_ok_status() {
        let response = DirectionsResponse {
            status: "OVER_QUERY_LIMIT".to_string(),
            routes: vec![three_step_route()],
            error_message: Some("quota".to_string()),
        };
        let directions = ScriptedDirections::new(Ok(response));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_fallback(&route);
    }

    #[tokio::test]
    async fn test_fallback_on_empty_steps() {
        let directions = ScriptedDirections::new(Ok(ok_response(vec![DirectionsRoute::default()])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let options = acquirer
            .acquire_routes(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_fallback(&options.primary);
        assert!(options.alternatives.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_on_no_routes() {
        let directions = ScriptedDirections::new(Ok(ok_response(vec![])));
        let acquirer = RouteAcquirer::new(directions, RouteConfig::default());

        let route = acquirer
            .acquire_route(ORIGIN, DESTINATION, TravelMode::Walking)
            .await
            .unwrap();

        assert_fallback(&route);
    }

    #[test]
    fn test_straight_line_route_texts() {
        let route = build_straight_line_route(ORIGIN, DESTINATION, AVERAGE_WALKING_SPEED_MPS);
        assert_eq!(route.total_distance_text, "1.0 km");
        assert_eq!(route.total_duration_text, "12 mins");
        assert_eq!(route.polyline, vec![ORIGIN, DESTINATION]);
        assert_eq!(
            route.steps[0].instruction,
            "Head east toward your destination, 1.0 km away"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Input validation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_invalid_origin_rejected_before_provider_call() {
        let directions = ScriptedDirections::new(Ok(ok_response(vec![three_step_route()])));
        let acquirer = RouteAcquirer::new(directions.clone(), RouteConfig::default());

        let result = acquirer
            .acquire_route(
                Coordinate::new(f64::NAN, 0.0),
                DESTINATION,
                TravelMode::Walking,
            )
            .await;

        assert!(matches!(result, Err(NavError::InvalidCoordinate(_))));
        assert!(directions.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_destination_rejected() {
        let directions = ScriptedDirections::new(Ok(ok_response(vec![])));
        let acquirer = RouteAcquirer::new(directions.clone(), RouteConfig::default());

        let result = acquirer
            .acquire_route(ORIGIN, Coordinate::new(0.0, 500.0), TravelMode::Walking)
            .await;

        assert!(matches!(result, Err(NavError::InvalidCoordinate(_))));
        assert!(directions.calls.lock().is_empty());
    }
}
