//! The per-frame run controller.
//!
//! [`RunController`] drives the `Idle -> Running -> StopRequested -> Idle`
//! state machine from the host's frame tick. It owns the only job handle,
//! so at most one tile job exists at any time. On each tick it does exactly
//! one of two things: launch a job when none is in flight, or poll the
//! in-flight job and reap it once finished. Tile N+1 therefore never starts
//! before tile N (trace and upload) has been reaped.
//!
//! Stopping never cancels a job. A stop requested from [`RunController::tick`]
//! is completed by a later tick once the job has finished. Forced teardown
//! ([`RunController::shutdown`], [`RunController::on_session_end`], drop)
//! blocks until the in-flight job finishes.

use std::sync::Arc;
use std::time::Duration;

use hitscope_scene::SceneQuery;

use crate::buffer::{PixelBuffer, TileBounds};
use crate::config::{DebuggerConfig, RenderSettings, TestConfiguration, TestMode};
use crate::cursor::TileCursor;
use crate::host::{HostEnvironment, SurfaceProvider};
use crate::job::{TileJob, TileJobSpec};
use crate::surface::DisplaySurface;
use crate::upload::RenderContext;
use crate::{ConfigError, ControllerError};

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Lifecycle of a debug render run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    /// No run. No buffer or surface is held.
    #[default]
    Idle,
    /// Tiles are being launched.
    Running,
    /// No further launches; waiting for the in-flight job.
    StopRequested,
}

// ---------------------------------------------------------------------------
// RunDiagnostics
// ---------------------------------------------------------------------------

/// Counters accumulated over the controller's lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunDiagnostics {
    /// Jobs reaped with every in-bounds pixel written.
    pub tiles_rendered: u64,
    /// Jobs reaped after an index overrun.
    pub tiles_aborted: u64,
    /// Jobs whose upload reported an error.
    pub uploads_failed: u64,
    /// Jobs whose thread panicked.
    pub jobs_panicked: u64,
    /// Launches that failed because the job thread could not be spawned.
    pub spawn_failures: u64,
    /// Transitions from `Idle` to `Running`.
    pub runs_started: u64,
    /// Tile of the most recently reaped job.
    pub last_tile: Option<TileBounds>,
    /// Wall time of the most recently reaped job.
    pub last_job_time: Duration,
}

// ---------------------------------------------------------------------------
// RunController
// ---------------------------------------------------------------------------

/// Per-frame driver for the tiled collision view.
pub struct RunController {
    config: DebuggerConfig,
    host: Box<dyn HostEnvironment>,
    surfaces: Box<dyn SurfaceProvider>,
    scene: Arc<dyn SceneQuery>,
    test: TestConfiguration,
    enabled: bool,
    state: RunState,
    cursor: TileCursor,
    buffer: Option<PixelBuffer>,
    surface: Option<Arc<dyn DisplaySurface>>,
    job: Option<TileJob>,
    diagnostics: RunDiagnostics,
    // Declared last so it is dropped after `Drop::drop` has reaped the job.
    render_context: RenderContext,
}

impl RunController {
    /// Create an idle, disabled controller and start its render context.
    ///
    /// The initial test configuration is a channel test against
    /// `WorldStatic`, with the first profile the host lists.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Config`] for an invalid `config`, or
    /// [`ControllerError::RenderContext`] if the render thread cannot start.
    pub fn new(
        config: DebuggerConfig,
        host: Box<dyn HostEnvironment>,
        surfaces: Box<dyn SurfaceProvider>,
        scene: Arc<dyn SceneQuery>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let render_context = RenderContext::spawn().map_err(ControllerError::RenderContext)?;

        let channels = host.collision_channels();
        let initial = RenderSettings {
            channel_name: channels.first().cloned().unwrap_or_default(),
            ..RenderSettings::default()
        };
        let test = TestConfiguration::resolve(&initial, &channels, &host.collision_profiles());

        Ok(Self {
            config,
            host,
            surfaces,
            scene,
            test,
            enabled: false,
            state: RunState::Idle,
            cursor: TileCursor::new(),
            buffer: None,
            surface: None,
            job: None,
            diagnostics: RunDiagnostics::default(),
            render_context,
        })
    }

    // -- Enable signal ------------------------------------------------------

    pub fn enable(&mut self) {
        self.set_enabled(true);
    }

    pub fn disable(&mut self) {
        self.set_enabled(false);
    }

    /// Set the enable signal. It is read on the next tick.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // -- Frame tick -----------------------------------------------------------

    /// Advance the state machine by one frame and return the new state.
    pub fn tick(&mut self, delta_time: f32) -> RunState {
        tracing::trace!(delta_time, state = ?self.state, "controller tick");

        let runnable = self.host.is_runnable();
        match self.state {
            RunState::Idle if self.enabled && runnable => self.start_run(),
            RunState::Running if !self.enabled || !runnable => {
                self.request_stop(if runnable { "disabled" } else { "host not runnable" });
            }
            _ => {}
        }

        match self.job.take() {
            Some(job) if job.is_finished() => {
                self.reap(job);
                if self.state == RunState::StopRequested {
                    self.finish_stop();
                }
            }
            Some(job) => self.job = Some(job),
            None => match self.state {
                RunState::Running => self.launch(),
                RunState::StopRequested => self.finish_stop(),
                RunState::Idle => {}
            },
        }

        self.state
    }

    /// Stop the run, blocking until any in-flight job has finished, then
    /// release the buffer and surface. Does nothing while idle.
    pub fn shutdown(&mut self) {
        if self.state == RunState::Idle && self.job.is_none() {
            return;
        }
        self.request_stop("shutdown");
        if let Some(job) = self.job.take() {
            tracing::debug!(tile = ?job.tile(), "waiting for in-flight tile job");
            self.reap(job);
        }
        self.finish_stop();
    }

    /// Host session teardown. Same as [`RunController::shutdown`].
    pub fn on_session_end(&mut self) {
        tracing::info!("session ended");
        self.shutdown();
    }

    // -- Configuration --------------------------------------------------------

    /// Select the query every pixel runs. Unknown names fall back to
    /// `WorldStatic` and the first listed profile. The new configuration
    /// applies from the next launched tile.
    pub fn set_test_configuration(
        &mut self,
        mode: TestMode,
        channel_name: &str,
        profile_name: &str,
        trace_complex: bool,
    ) {
        self.apply_render_settings(&RenderSettings {
            is_channel_test: mode == TestMode::ChannelTest,
            trace_complex,
            channel_name: channel_name.to_owned(),
            profile_name: profile_name.to_owned(),
        });
    }

    /// Resolve and install a settings request.
    pub fn apply_render_settings(&mut self, settings: &RenderSettings) {
        let resolved = TestConfiguration::resolve(
            settings,
            &self.host.collision_channels(),
            &self.host.collision_profiles(),
        );
        tracing::debug!(test = ?resolved, "test configuration updated");
        self.test = resolved;
    }

    /// Replace the renderer settings. Applies from the next launched tile.
    ///
    /// # Errors
    ///
    /// Returns the validation error and keeps the old settings.
    pub fn set_config(&mut self, config: DebuggerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn available_channels(&self) -> Vec<String> {
        self.host.collision_channels()
    }

    pub fn available_profiles(&self) -> Vec<String> {
        self.host.collision_profiles()
    }

    // -- Accessors ------------------------------------------------------------

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn test_configuration(&self) -> &TestConfiguration {
        &self.test
    }

    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    pub fn job_in_flight(&self) -> bool {
        self.job.is_some()
    }

    /// The pixel buffer, when held by the controller. `None` while idle or
    /// while a job owns it.
    pub fn pixel_buffer(&self) -> Option<&PixelBuffer> {
        self.buffer.as_ref()
    }

    /// The surface of the current run.
    pub fn surface(&self) -> Option<&Arc<dyn DisplaySurface>> {
        self.surface.as_ref()
    }

    // -- Transitions ----------------------------------------------------------

    fn start_run(&mut self) {
        let Some(surface) = self.surfaces.acquire_surface() else {
            tracing::warn!("no display surface available, run not started");
            return;
        };

        let (width, height) = (surface.width(), surface.height());
        self.buffer = Some(PixelBuffer::new(width, height));
        self.surface = Some(surface);
        self.cursor.reset();
        self.state = RunState::Running;
        self.diagnostics.runs_started += 1;
        tracing::info!(width, height, tile_size = self.config.tile_size, test = ?self.test, "debug render run started");
    }

    fn request_stop(&mut self, reason: &str) {
        if self.state == RunState::Running {
            self.state = RunState::StopRequested;
            tracing::info!(reason, job_in_flight = self.job.is_some(), "stop requested");
        }
    }

    fn finish_stop(&mut self) {
        self.buffer = None;
        if let Some(surface) = self.surface.take() {
            self.surfaces.release_surface(surface);
        }
        self.state = RunState::Idle;
        tracing::info!("debug render run stopped");
    }

    fn launch(&mut self) {
        let Some(pose) = self
            .host
            .active_camera_pose()
            .or_else(|| self.host.fallback_view_pose())
        else {
            tracing::trace!("no camera pose, skipping launch");
            return;
        };
        let Some(surface) = self.surface.clone() else {
            return;
        };

        let (width, height) = (surface.width(), surface.height());
        let buffer = match self.buffer.take() {
            Some(buffer) if buffer.width() == width && buffer.height() == height => buffer,
            Some(buffer) => {
                tracing::warn!(
                    old_width = buffer.width(),
                    old_height = buffer.height(),
                    width,
                    height,
                    "surface size changed, reallocating pixel buffer"
                );
                self.cursor.reset();
                PixelBuffer::new(width, height)
            }
            None => PixelBuffer::new(width, height),
        };

        let spec = TileJobSpec {
            pose,
            tile: self.cursor.peek(self.config.tile_size),
            test: self.test.clone(),
            config: self.config.clone(),
        };
        let tile = spec.tile;

        match TileJob::launch(
            spec,
            buffer,
            self.scene.clone(),
            surface,
            self.render_context.queue(),
        ) {
            Ok(job) => {
                tracing::debug!(?tile, "tile job launched");
                self.cursor.advance(width, height, self.config.tile_size);
                self.job = Some(job);
            }
            Err(err) => {
                tracing::warn!(?tile, %err, "failed to launch tile job");
                self.diagnostics.spawn_failures += 1;
                self.buffer = Some(PixelBuffer::new(width, height));
            }
        }
    }

    /// Wait for `job` and take its buffer back.
    fn reap(&mut self, job: TileJob) {
        match job.wait() {
            Ok(output) => {
                if output.outcome.is_aborted() {
                    self.diagnostics.tiles_aborted += 1;
                } else {
                    self.diagnostics.tiles_rendered += 1;
                }
                if output.upload.is_err() {
                    self.diagnostics.uploads_failed += 1;
                }
                self.diagnostics.last_tile = Some(output.tile);
                self.diagnostics.last_job_time = output.elapsed;
                tracing::debug!(
                    tile = ?output.tile,
                    pixels = output.outcome.pixels_written(),
                    elapsed_us = output.elapsed.as_micros() as u64,
                    "tile job reaped"
                );
                self.buffer = Some(output.buffer);
            }
            Err(err) => {
                tracing::error!(%err, "tile job failed, pixel buffer reallocated");
                self.diagnostics.jobs_panicked += 1;
                self.buffer = self
                    .surface
                    .as_ref()
                    .map(|s| PixelBuffer::new(s.width(), s.height()));
            }
        }
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .field("config", &self.config)
            .field("test", &self.test)
            .field("cursor", &self.cursor)
            .field("job_in_flight", &self.job.is_some())
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
