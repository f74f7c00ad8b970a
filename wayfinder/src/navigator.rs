//! Navigation facade.
//!
//! [`Navigator`] wires the collaborators to the route acquirer, the guidance
//! engine and the announcement scheduler, and exposes the operations the
//! app screens use: navigate somewhere, listen for a spoken destination,
//! describe what is nearby, stop.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::NavigationConfig;
use crate::error::{NavError, Result};
use crate::geo::{cardinal_direction, distance_meters, initial_bearing_degrees, Coordinate};
use crate::guidance::{GuidanceEngine, GuidanceEvent, GuidanceProjection, NavigationState};
use crate::provider::{
    DirectionsProvider, GeolocationProvider, NearbyPlace, PlacesProvider, SpeechSink,
    TravelMode, VoiceInputProvider,
};
use crate::route::{format_distance, Route, RouteAcquirer};
use crate::speech::{AnnouncementScheduler, AudioFocus, FocusState, Priority};

/// Spoken before the first instruction of a straight-line fallback route.
pub const FALLBACK_NOTICE: &str = "Directions are unavailable. Using a basic route.";

/// Maximum number of places read out by [`Navigator::describe_nearby`].
const MAX_SPOKEN_PLACES: usize = 3;

/// External services the navigator depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub directions: Arc<dyn DirectionsProvider>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub speech: Arc<dyn SpeechSink>,
    pub places: Arc<dyn PlacesProvider>,
    pub voice_input: Arc<dyn VoiceInputProvider>,
}

/// Entry point for spoken navigation.
pub struct Navigator {
    acquirer: RouteAcquirer,
    geolocation: Arc<dyn GeolocationProvider>,
    places: Arc<dyn PlacesProvider>,
    voice_input: Arc<dyn VoiceInputProvider>,
    announcer: Arc<AnnouncementScheduler>,
    focus: AudioFocus,
    engine: GuidanceEngine,
    default_mode: TravelMode,
    /// Number of the newest route request.
    latest_route_request: Mutex<u64>,
    alternatives: Mutex<Vec<Route>>,
}

impl Navigator {
    /// Build a navigator. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`NavError::Config`] if the configuration does not validate.
    pub fn new(config: NavigationConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let focus = AudioFocus::new();
        let announcer = Arc::new(AnnouncementScheduler::spawn(
            collaborators.speech,
            focus.clone(),
        ));
        let engine = GuidanceEngine::new(
            config.guidance.clone(),
            Arc::clone(&collaborators.geolocation),
            Arc::clone(&announcer),
        );
        let default_mode = config.route.travel_mode;

        Ok(Self {
            acquirer: RouteAcquirer::new(collaborators.directions, config.route),
            geolocation: collaborators.geolocation,
            places: collaborators.places,
            voice_input: collaborators.voice_input,
            announcer,
            focus,
            engine,
            default_mode,
            latest_route_request: Mutex::new(0),
            alternatives: Mutex::new(Vec::new()),
        })
    }

    /// Route from the current position to `destination` and start guidance.
    ///
    /// Returns the route being followed, or `None` if a newer request was
    /// made while this one was in flight, whether this one succeeded or not. Provider failures produce a
    /// straight-line route announced with [`FALLBACK_NOTICE`].
    ///
    /// # Errors
    ///
    /// - [`NavError::InvalidCoordinate`] for an invalid destination or fix
    /// - [`NavError::Provider`] if the current position is unavailable
    pub async fn navigate_to(
        &self,
        destination: Coordinate,
        mode: Option<TravelMode>,
    ) -> Result<Option<Route>> {
        let destination = destination.validate()?;
        let mode = mode.unwrap_or(self.default_mode);

        let request = {
            let mut latest = self.latest_route_request.lock();
            *latest += 1;
            *latest
        };

        let acquired = match self.geolocation.current_position().await {
            Ok(origin) => self.acquirer.acquire_routes(origin, destination, mode).await,
            Err(e) => Err(e.into()),
        };
        let options = match acquired {
            Ok(options) => options,
            Err(e) if self.is_superseded(request) => {
                debug!(request, error = %e, "Ignoring failure of superseded route request");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let latest = self.latest_route_request.lock();
        if *latest != request {
            debug!(request, latest = *latest, "Discarding superseded route");
            return Ok(None);
        }

        if options.primary.is_fallback() {
            self.announcer.announce(FALLBACK_NOTICE, Priority::Immediate);
        }
        *self.alternatives.lock() = options.alternatives;
        self.engine.start(options.primary.clone())?;
        drop(latest);

        info!(
            request,
            source = %options.primary.source,
            steps = options.primary.step_count(),
            "Navigation started"
        );
        Ok(Some(options.primary))
    }

    fn is_superseded(&self, request: u64) -> bool {
        *self.latest_route_request.lock() != request
    }

    /// Alternative routes offered with the last navigation request.
    pub fn alternatives(&self) -> Vec<Route> {
        self.alternatives.lock().clone()
    }

    /// Restart guidance on alternative `index`. Progress is discarded.
    ///
    /// Returns `Ok(false)` if there is no such alternative.
    pub fn switch_to_alternative(&self, index: usize) -> Result<bool> {
        let route = match self.alternatives.lock().get(index) {
            Some(route) => route.clone(),
            None => return Ok(false),
        };
        info!(index, summary = ?route.summary, "Switching to alternative route");
        self.engine.start(route)?;
        Ok(true)
    }

    /// Record a spoken destination query.
    ///
    /// Holds the listening focus while the voice input provider runs, so
    /// reminders are dropped and instructions wait until it finishes.
    ///
    /// # Errors
    ///
    /// [`NavError::AudioBusy`] while speech output is in flight.
    pub async fn listen_for_destination(&self) -> Result<String> {
        if self.announcer.is_busy() {
            return Err(NavError::AudioBusy);
        }
        let _focus = self
            .focus
            .try_acquire(FocusState::Listening)
            .ok_or(NavError::AudioBusy)?;

        let query = self.voice_input.listen().await?;
        debug!(query = %query, "Destination query received");
        Ok(query.trim().to_string())
    }

    /// Announce up to three places of `category` near the current position.
    ///
    /// Returns every valid place found, nearest first.
    pub async fn describe_nearby(&self, category: &str, radius_m: f64) -> Result<Vec<NearbyPlace>> {
        let here = self.geolocation.current_position().await?.validate()?;
        let mut places = self.places.search_nearby(here, category, radius_m).await?;

        let found = places.len();
        places.retain(|p| p.location.is_valid());
        if places.len() != found {
            warn!(dropped = found - places.len(), "Ignoring places without a valid location");
        }
        places.sort_by(|a, b| {
            distance_meters(here, a.location).total_cmp(&distance_meters(here, b.location))
        });

        let text = describe_places(here, category, &places);
        self.announcer.announce(&text, Priority::Immediate);
        Ok(places)
    }

    /// Stop guidance. No-op unless navigating.
    pub fn stop(&self) {
        self.engine.stop();
    }

    /// Pause or resume guidance timers.
    pub fn set_backgrounded(&self, backgrounded: bool) {
        self.engine.set_backgrounded(backgrounded);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GuidanceEvent> {
        self.engine.subscribe()
    }

    pub fn projection(&self) -> GuidanceProjection {
        self.engine.projection()
    }

    pub fn state(&self) -> NavigationState {
        self.engine.state()
    }

    pub fn engine(&self) -> &GuidanceEngine {
        &self.engine
    }

    pub fn announcer(&self) -> &AnnouncementScheduler {
        &self.announcer
    }

    /// Stop guidance and the announcement worker.
    pub async fn shutdown(&self) {
        self.engine.stop();
        self.announcer.shutdown().await;
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("engine", &self.engine)
            .field("announcer", &self.announcer)
            .field("focus", &self.focus)
            .finish()
    }
}

/// "Nearby: Cafe Luna, 120 m north; Bean Bar, 300 m east".
fn describe_places(here: Coordinate, category: &str, places: &[NearbyPlace]) -> String {
    if places.is_empty() {
        return format!("No {} found nearby", category);
    }

    let described: Vec<String> = places
        .iter()
        .take(MAX_SPOKEN_PLACES)
        .map(|place| {
            let distance = distance_meters(here, place.location);
            let direction = cardinal_direction(initial_bearing_degrees(here, place.location));
            format!("{}, {} {}", place.name, format_distance(distance), direction)
        })
        .collect();

    format!("Nearby: {}", described.join("; "))
}
