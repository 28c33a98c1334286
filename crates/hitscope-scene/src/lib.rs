//! Hitscope Scene -- collision channels, profiles and line-trace queries.
//!
//! This crate defines the scene-query seam the tile renderer calls into
//! ([`SceneQuery`]) together with a reference implementation backed by
//! rapier3d ([`CollisionWorld`](world::CollisionWorld)).
//!
//! # Architecture
//!
//! - **`CollisionChannel`**: the 32 channels a trace can run on, one per
//!   interaction-group bit.
//! - **`CollisionProfile` / `ProfileRegistry`**: named presets combining an
//!   object channel with per-channel responses.
//! - **`CollisionWorld`**: static colliders plus a rapier query pipeline.
//! - **`SceneQuery`**: `raycast(origin, direction, max_distance, target,
//!   trace_complex)`; returns the surface normal and the fraction of
//!   `max_distance` travelled, or `None` on a miss.
//!
//! # Example
//!
//! ```
//! use hitscope_scene::prelude::*;
//!
//! let mut world = CollisionWorld::new();
//! world.add_collider(SceneCollider::cuboid(1.0, 10.0, 10.0).at(20.0, 0.0, 0.0));
//!
//! let hit = world
//!     .raycast(
//!         Point3::origin(),
//!         Vector3::x(),
//!         100.0,
//!         &QueryTarget::Channel(CollisionChannel::Visibility),
//!         false,
//!     )
//!     .unwrap();
//! assert!((hit.hit_fraction - 0.19).abs() < 1e-4);
//! ```

#![deny(unsafe_code)]

pub mod channel;
pub mod profile;
pub mod world;

use std::sync::{PoisonError, RwLock};

/// Re-export of the math library used by rapier.
pub use rapier3d::na;
pub use rapier3d::na::{Point3, UnitQuaternion, Vector3};

use channel::CollisionChannel;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while configuring a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A profile was referenced by a name that is not registered.
    #[error("collision profile '{name}' is not registered")]
    UnknownProfile {
        /// The name that failed to resolve.
        name: String,
    },

    /// A profile with this name already exists.
    #[error("collision profile '{name}' is already registered")]
    DuplicateProfile {
        /// The conflicting name.
        name: String,
    },

    /// A channel name list does not name every channel exactly once.
    #[error("expected {expected} channel names, got {actual}")]
    ChannelCount {
        /// Number of collision channels.
        expected: usize,
        /// Number of names supplied.
        actual: usize,
    },
}

// ---------------------------------------------------------------------------
// Query interface
// ---------------------------------------------------------------------------

/// What a line trace tests against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// Hit anything that blocks this channel.
    Channel(CollisionChannel),
    /// Hit anything that mutually blocks with the named profile.
    Profile(String),
}

/// Result of a blocking line trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Unit surface normal at the impact point.
    pub normal: Vector3<f32>,
    /// Distance travelled divided by the trace length, in `[0, 1]`.
    pub hit_fraction: f32,
}

/// A scene that can answer single-hit line traces.
///
/// Implementations must be shareable with the background tile job, hence
/// `Send + Sync`.
pub trait SceneQuery: Send + Sync {
    /// Trace from `origin` along `direction` (need not be normalized) up to
    /// `max_distance` world units. Returns the first blocking hit.
    fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        target: &QueryTarget,
        trace_complex: bool,
    ) -> Option<RayHit>;
}

/// A scene behind a lock can be edited by the host between tile jobs; the
/// job holds the read lock for one trace at a time.
impl<S: SceneQuery> SceneQuery for RwLock<S> {
    fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        target: &QueryTarget,
        trace_complex: bool,
    ) -> Option<RayHit> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .raycast(origin, direction, max_distance, target, trace_complex)
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for building and querying scenes.
pub mod prelude {
    pub use crate::channel::{
        ChannelNames, ChannelResponses, CollisionChannel, Response, CHANNEL_COUNT,
    };
    pub use crate::profile::{CollisionProfile, ProfileRegistry};
    pub use crate::world::{CollisionWorld, Representation, SceneCollider, ShapeDesc};
    pub use crate::{Point3, QueryTarget, RayHit, SceneError, SceneQuery, UnitQuaternion, Vector3};
}
