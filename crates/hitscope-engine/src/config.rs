//! Renderer configuration and collision-test selection.
//!
//! Two layers live here:
//!
//! - [`DebuggerConfig`]: static knobs for a controller (tile size, the
//!   field-of-view scale and the trace length), loadable from JSON.
//! - [`TestConfiguration`]: which query every pixel runs. It is resolved
//!   from a user-facing [`RenderSettings`] request against the channel and
//!   profile names the host enumerates. Names that do not resolve fall back
//!   to `WorldStatic` (channel) or the first listed profile, so resolution
//!   never fails and always yields a complete configuration.

use hitscope_scene::channel::CollisionChannel;
use hitscope_scene::QueryTarget;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Profile used when the host lists no profiles at all.
pub const FALLBACK_PROFILE: &str = "BlockAll";

// ---------------------------------------------------------------------------
// DebuggerConfig
// ---------------------------------------------------------------------------

/// Static renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Edge length of the square tile rendered per job, in pixels.
    pub tile_size: u32,
    /// Scale applied to normalized screen offsets before building ray
    /// directions. Approximates a frustum without a projection matrix.
    pub fov_scale: f32,
    /// Trace length in world units; hit fractions are relative to this.
    pub max_distance: f32,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            fov_scale: 0.7,
            max_distance: 100_000.0,
        }
    }
}

impl DebuggerConfig {
    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::InvalidTileSize {
                tile_size: self.tile_size,
            });
        }
        if !(self.fov_scale > 0.0 && self.fov_scale.is_finite()) {
            return Err(ConfigError::InvalidFovScale {
                value: self.fov_scale,
            });
        }
        if !(self.max_distance > 0.0 && self.max_distance.is_finite()) {
            return Err(ConfigError::InvalidMaxDistance {
                value: self.max_distance,
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON, or a validation
    /// error for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// TestConfiguration
// ---------------------------------------------------------------------------

/// Whether pixels trace by channel or by named profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestMode {
    #[default]
    ChannelTest,
    ProfileTest,
}

/// A resolved, immutable description of the per-pixel query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub mode: TestMode,
    pub channel: CollisionChannel,
    pub profile_name: String,
    pub trace_complex: bool,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            mode: TestMode::ChannelTest,
            channel: CollisionChannel::WorldStatic,
            profile_name: String::new(),
            trace_complex: false,
        }
    }
}

impl TestConfiguration {
    /// Resolve a request against the host's enumerated names.
    ///
    /// `channels` is in channel index order, so a name's position selects
    /// the channel. `profiles` is in registry order.
    pub fn resolve(settings: &RenderSettings, channels: &[String], profiles: &[String]) -> Self {
        let mode = if settings.is_channel_test {
            TestMode::ChannelTest
        } else {
            TestMode::ProfileTest
        };

        let channel = channels
            .iter()
            .position(|name| *name == settings.channel_name)
            .and_then(CollisionChannel::from_index)
            .unwrap_or_else(|| {
                tracing::debug!(
                    requested = %settings.channel_name,
                    "channel not found, falling back to WorldStatic"
                );
                CollisionChannel::WorldStatic
            });

        let profile_name = if profiles.iter().any(|p| *p == settings.profile_name) {
            settings.profile_name.clone()
        } else {
            let fallback = profiles
                .first()
                .cloned()
                .unwrap_or_else(|| FALLBACK_PROFILE.to_owned());
            tracing::debug!(
                requested = %settings.profile_name,
                fallback = %fallback,
                "profile not found, falling back"
            );
            fallback
        };

        Self {
            mode,
            channel,
            profile_name,
            trace_complex: settings.trace_complex,
        }
    }

    /// The scene query target for this configuration.
    pub fn target(&self) -> QueryTarget {
        match self.mode {
            TestMode::ChannelTest => QueryTarget::Channel(self.channel),
            TestMode::ProfileTest => QueryTarget::Profile(self.profile_name.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

/// An unvalidated request for a new test configuration, as sent by a UI or
/// read from a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub is_channel_test: bool,
    pub trace_complex: bool,
    pub channel_name: String,
    pub profile_name: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            is_channel_test: true,
            trace_complex: false,
            channel_name: String::new(),
            profile_name: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
