//! Route model and acquisition
//!
//! A [`Route`] is an ordered list of [`RouteStep`]s plus overview geometry
//! and pre-formatted totals. Routes come from a directions provider through
//! [`RouteAcquirer`], which falls back to a straight-line route when the
//! provider cannot help.

mod acquisition;
mod model;
mod text;

pub use acquisition::{
    build_straight_line_route, RouteAcquirer, RouteConfig, RouteOptions,
    AVERAGE_WALKING_SPEED_MPS,
};
pub use model::{ManeuverKind, Route, RouteSource, RouteStep};
pub use text::{clean_instruction, format_distance, format_duration};
