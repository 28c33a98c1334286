//! Per-pixel ray construction and tile rendering.
//!
//! For pixel `(x, y)` of a `width` x `height` buffer:
//!
//! ```text
//! x_off = (x / width  - 0.5) *  2
//! y_off = (y / height - 0.5) * -2        (screen y grows downwards)
//! dir   = normalize(rotation * (1, x_off * k, y_off * k))
//! ```
//!
//! where `k` is [`DebuggerConfig::fov_scale`]. This is a framing
//! approximation, not a perspective projection: the leading `1` keeps the
//! camera's forward axis dominant and `k` sets how wide the view fans out.

use hitscope_scene::{RayHit, SceneQuery, Vector3};

use crate::buffer::{LinearColor, PixelBuffer, TileBounds};
use crate::config::{DebuggerConfig, TestConfiguration};
use crate::pose::CameraPose;

/// Color written for a ray that hit nothing. No real hit can produce it:
/// normals are unit length and hit fractions are non-negative.
pub const MISS_COLOR: LinearColor = LinearColor::splat(-1.0);

/// How a tile pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Every in-bounds pixel of the tile was written.
    Complete {
        /// Pixels traced and stored.
        pixels_written: usize,
    },
    /// A computed index fell outside the buffer; the rest of the tile was
    /// skipped.
    Aborted {
        /// Pixels traced and stored before the abort.
        pixels_written: usize,
        /// The offending linear index.
        index: usize,
    },
}

impl TileOutcome {
    pub fn pixels_written(&self) -> usize {
        match *self {
            TileOutcome::Complete { pixels_written } | TileOutcome::Aborted { pixels_written, .. } => {
                pixels_written
            }
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TileOutcome::Aborted { .. })
    }
}

/// Normalized device offsets of a pixel, before FOV scaling.
pub fn screen_offsets(x: u32, y: u32, width: u32, height: u32) -> (f32, f32) {
    let x_off = (x as f32 / width as f32 - 0.5) * 2.0;
    let y_off = (y as f32 / height as f32 - 0.5) * -2.0;
    (x_off, y_off)
}

/// World-space unit direction for the given screen offsets.
pub fn ray_direction(pose: &CameraPose, x_off: f32, y_off: f32, fov_scale: f32) -> Vector3<f32> {
    let local = Vector3::new(1.0, x_off * fov_scale, y_off * fov_scale);
    pose.transform_vector(local).normalize()
}

/// Encode a trace result as a pixel color.
///
/// A hit whose normal is not a finite, non-zero vector is stored facing back
/// along `direction`, and a NaN fraction is stored as `0`, so no texel ever
/// carries a NaN.
pub fn encode_hit(hit: Option<RayHit>, direction: Vector3<f32>) -> LinearColor {
    match hit {
        Some(hit) => {
            let normal = if hit.normal.iter().all(|c| c.is_finite()) {
                hit.normal.try_normalize(1.0e-6)
            } else {
                None
            }
            .unwrap_or(-direction);
            let fraction = if hit.hit_fraction.is_nan() {
                0.0
            } else {
                hit.hit_fraction.clamp(0.0, 1.0)
            };
            LinearColor::new(normal.x, normal.y, normal.z, fraction)
        }
        None => MISS_COLOR,
    }
}

/// Trace every pixel of `tile` and store the results in `buffer`.
///
/// The tile keeps its full declared size: pixels past the right or bottom
/// edge are skipped one by one. A linear index past the end of the buffer
/// aborts the remainder of the tile.
pub fn render_tile(
    buffer: &mut PixelBuffer,
    pose: &CameraPose,
    tile: TileBounds,
    test: &TestConfiguration,
    config: &DebuggerConfig,
    scene: &dyn SceneQuery,
) -> TileOutcome {
    let width = buffer.width();
    let height = buffer.height();
    let target = test.target();
    let mut pixels_written = 0;

    let end_y = tile.start_y.saturating_add(tile.size);
    let end_x = tile.start_x.saturating_add(tile.size);
    for y in tile.start_y..end_y {
        for x in tile.start_x..end_x {
            if x >= width || y >= height {
                continue;
            }

            let (x_off, y_off) = screen_offsets(x, y, width, height);
            let dir = ray_direction(pose, x_off, y_off, config.fov_scale);
            let hit = scene.raycast(
                pose.position,
                dir,
                config.max_distance,
                &target,
                test.trace_complex,
            );

            let index = buffer.index_of(x, y);
            if !buffer.set_index(index, encode_hit(hit, dir)) {
                return TileOutcome::Aborted {
                    pixels_written,
                    index,
                };
            }
            pixels_written += 1;
        }
    }

    TileOutcome::Complete { pixels_written }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
