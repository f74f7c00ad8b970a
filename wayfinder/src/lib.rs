//! Wayfinder - spoken turn-by-turn walking guidance
//!
//! This library turns routes from a directions provider into spoken maneuver
//! instructions for blind and low-vision pedestrians. It tracks the user's
//! position against the route, falls back to a straight-line route when the
//! provider is unavailable, and serializes speech so that instructions never
//! talk over each other.
//!
//! # Modules
//!
//! - [`geo`]: distance, bearing, compass sectors, polyline decoding
//! - [`route`]: route model and acquisition with fallback
//! - [`guidance`]: the navigation state machine and its timers
//! - [`speech`]: announcement scheduling and audio focus
//! - [`provider`]: collaborator traits and Google Maps Platform clients
//! - [`navigator`]: facade tying the parts together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wayfinder::config::NavigationConfig;
//! use wayfinder::navigator::{Collaborators, Navigator};
//!
//! let config = NavigationConfig::load(&path)?;
//! let _log_guard = wayfinder::logging::init(&config.logging)?;
//!
//! let navigator = Navigator::new(config, collaborators)?;
//! navigator.navigate_to(destination, None).await?;
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod guidance;
pub mod logging;
pub mod navigator;
pub mod provider;
pub mod route;
pub mod speech;

pub use error::{NavError, Result};
