//! Map and park synchronisation.
//!
//! [`MapSyncController`] decides when the visible region needs a fresh park
//! search; [`spawn_map_session`] runs it against a [`MapSurface`] and a
//! [`NearbySearch`](parkfinder_places::NearbySearch) implementation.

pub mod controller;
pub mod error;
pub mod session;
pub mod surface;
pub mod viewport;

pub use controller::{merge_parks, Animation, AnimationFlags, MapEffect, MapState, MapSyncController};
pub use error::SessionError;
pub use session::{forward_settles, spawn_map_session, MapNotification, MapSessionHandle};
pub use surface::{HeadlessMap, MapSurface, SurfaceCall, SurfaceLog};
pub use viewport::{requires_new_search, CameraTarget, MapViewport};
