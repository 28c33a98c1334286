//! Hitscope Engine -- tiled raycast renderer for collision debugging.
//!
//! The engine paints a view of a scene's collision geometry into a display
//! surface, one square tile at a time. Each pixel casts a single ray from the
//! camera; a hit is encoded as `(normal.x, normal.y, normal.z, hit_fraction)`
//! and a miss as `(-1, -1, -1, -1)`.
//!
//! # Architecture
//!
//! - **`PixelBuffer`**: CPU-side image, `width * height` linear colors.
//! - **`TileCursor`**: row-major scan over the buffer with wraparound.
//! - **`render_tile`**: fills one tile by tracing against a
//!   [`SceneQuery`](hitscope_scene::SceneQuery).
//! - **`RenderContext`**: dedicated thread that performs every surface
//!   upload, in submission order.
//! - **`TileJob`**: the single background job (raycast, then upload).
//! - **`RunController`**: per-frame driver owning the
//!   `Idle -> Running -> StopRequested -> Idle` state machine.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use hitscope_engine::prelude::*;
//!
//! let mut world = CollisionWorld::new();
//! world.add_collider(SceneCollider::cuboid(1.0, 500.0, 500.0).at(100.0, 0.0, 0.0));
//!
//! let host = StaticHost::from_world(&world, Some(CameraPose::identity()));
//! let surface = Arc::new(MemorySurface::new(64, 64));
//! let provider = StaticSurfaceProvider::new(surface.clone());
//! let config = DebuggerConfig { tile_size: 32, ..Default::default() };
//!
//! let mut controller =
//!     RunController::new(config, Box::new(host), Box::new(provider), Arc::new(world)).unwrap();
//! controller.enable();
//! for _ in 0..64 {
//!     controller.tick(1.0 / 60.0);
//! }
//! controller.shutdown();
//! assert_eq!(controller.state(), RunState::Idle);
//! assert!(surface.upload_count() > 0);
//! ```

#![deny(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod host;
pub mod job;
pub mod pose;
pub mod raycast;
pub mod surface;
pub mod upload;

/// Re-export the scene crate for convenience.
pub use hitscope_scene;

use buffer::{TileBounds, TileRegion};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors reported by a surface upload. None of these stop a run.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The surface handle no longer refers to a live GPU resource.
    #[error("display surface is invalid or has been released")]
    InvalidSurface,

    /// The region does not fit inside the surface.
    #[error("upload region {region:?} exceeds surface of {width}x{height}")]
    RegionOutOfBounds {
        /// The rejected region.
        region: TileRegion,
        /// Surface width in pixels.
        width: u32,
        /// Surface height in pixels.
        height: u32,
    },

    /// The staged data is too short for the region and row pitch.
    #[error("upload data holds {actual} bytes but the region needs {expected}")]
    DataLength {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes supplied.
        actual: usize,
    },

    /// The render context shut down before the upload ran.
    #[error("render context is closed")]
    ContextClosed,
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Tiles must cover at least one pixel.
    #[error("tile size must be at least 1, got {tile_size}")]
    InvalidTileSize {
        /// The rejected size.
        tile_size: u32,
    },

    /// The field-of-view scale must be positive and finite.
    #[error("fov scale must be positive and finite, got {value}")]
    InvalidFovScale {
        /// The rejected value.
        value: f32,
    },

    /// The trace length must be positive and finite.
    #[error("max trace distance must be positive and finite, got {value}")]
    InvalidMaxDistance {
        /// The rejected value.
        value: f32,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from a background tile job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The worker thread could not be started.
    #[error("failed to spawn tile job thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The job panicked; its pixel buffer was lost.
    #[error("tile job for {tile:?} panicked")]
    Panicked {
        /// The tile the job was rendering.
        tile: TileBounds,
    },
}

/// Errors constructing a [`RunController`](controller::RunController).
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The supplied configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The render context thread could not be started.
    #[error("failed to start render context: {0}")]
    RenderContext(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use hitscope_scene::prelude::*;

    pub use crate::buffer::{LinearColor, PixelBuffer, TileBounds, TileRegion, BYTES_PER_PIXEL};
    pub use crate::config::{DebuggerConfig, RenderSettings, TestConfiguration, TestMode};
    pub use crate::controller::{RunController, RunDiagnostics, RunState};
    pub use crate::cursor::TileCursor;
    pub use crate::host::{HostEnvironment, StaticHost, StaticSurfaceProvider, SurfaceProvider};
    pub use crate::job::{JobOutput, TileJob, TileJobSpec};
    pub use crate::pose::CameraPose;
    pub use crate::raycast::{render_tile, TileOutcome, MISS_COLOR};
    pub use crate::surface::{DisplaySurface, MemorySurface};
    pub use crate::upload::{RenderContext, RenderQueue, UploadRequest, UploadTicket};
    pub use crate::{ConfigError, ControllerError, JobError, UploadError};

    #[cfg(feature = "renderer")]
    pub use crate::surface::WgpuSurface;
}
