//! The background tile job.
//!
//! A job owns the pixel buffer for its whole lifetime: the controller moves
//! the buffer in at launch and gets it back from [`TileJob::wait`]. While a
//! job runs nobody else can touch the buffer, and the job cannot outlive
//! the buffer. The job traces its tile, stages the visible part for upload,
//! and waits for the render context to perform it before finishing. A
//! finished job therefore has no upload left in flight.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use hitscope_scene::SceneQuery;

use crate::buffer::{PixelBuffer, TileBounds};
use crate::config::{DebuggerConfig, TestConfiguration};
use crate::pose::CameraPose;
use crate::raycast::{render_tile, TileOutcome};
use crate::surface::DisplaySurface;
use crate::upload::{RenderQueue, UploadRequest};
use crate::{JobError, UploadError};

/// Everything a job captures at launch. Later changes to the controller do
/// not affect a running job.
#[derive(Debug, Clone, PartialEq)]
pub struct TileJobSpec {
    pub pose: CameraPose,
    pub tile: TileBounds,
    pub test: TestConfiguration,
    pub config: DebuggerConfig,
}

/// What a finished job hands back.
#[derive(Debug)]
pub struct JobOutput {
    pub buffer: PixelBuffer,
    pub tile: TileBounds,
    pub outcome: TileOutcome,
    /// `Ok` also when nothing of the tile was visible on the surface.
    pub upload: Result<(), UploadError>,
    pub elapsed: Duration,
}

/// Handle to a running job.
#[derive(Debug)]
pub struct TileJob {
    tile: TileBounds,
    handle: JoinHandle<JobOutput>,
}

impl TileJob {
    /// Start a job on its own thread.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Spawn`] if the thread cannot be created. The
    /// buffer is lost in that case.
    pub fn launch(
        spec: TileJobSpec,
        buffer: PixelBuffer,
        scene: Arc<dyn SceneQuery>,
        surface: Arc<dyn DisplaySurface>,
        queue: RenderQueue,
    ) -> Result<Self, JobError> {
        let tile = spec.tile;
        let handle = thread::Builder::new()
            .name("hitscope-tile".into())
            .spawn(move || run(spec, buffer, scene.as_ref(), surface, &queue))
            .map_err(JobError::Spawn)?;
        Ok(Self { tile, handle })
    }

    pub fn tile(&self) -> TileBounds {
        self.tile
    }

    /// Non-blocking completion check.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job ends and take back its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Panicked`] if the job thread panicked.
    pub fn wait(self) -> Result<JobOutput, JobError> {
        let tile = self.tile;
        self.handle.join().map_err(|_| JobError::Panicked { tile })
    }
}

fn run(
    spec: TileJobSpec,
    mut buffer: PixelBuffer,
    scene: &dyn SceneQuery,
    surface: Arc<dyn DisplaySurface>,
    queue: &RenderQueue,
) -> JobOutput {
    let started = Instant::now();
    let outcome = render_tile(
        &mut buffer,
        &spec.pose,
        spec.tile,
        &spec.test,
        &spec.config,
        scene,
    );
    if let TileOutcome::Aborted { index, .. } = outcome {
        tracing::warn!(tile = ?spec.tile, index, len = buffer.len(), "pixel index out of range, tile aborted");
    }

    let upload = match UploadRequest::from_buffer(surface, &buffer, spec.tile) {
        Ok(Some(request)) => queue.upload(request),
        Ok(None) => Ok(()),
        Err(err) => Err(err),
    };

    JobOutput {
        buffer,
        tile: spec.tile,
        outcome,
        upload,
        elapsed: started.elapsed(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raycast::MISS_COLOR;
    use crate::surface::MemorySurface;
    use crate::upload::RenderContext;
    use hitscope_scene::{Point3, QueryTarget, RayHit, Vector3};

    struct AlwaysMiss;

    impl SceneQuery for AlwaysMiss {
        fn raycast(
            &self,
            _origin: Point3<f32>,
            _direction: Vector3<f32>,
            _max_distance: f32,
            _target: &QueryTarget,
            _trace_complex: bool,
        ) -> Option<RayHit> {
            None
        }
    }

    struct Explodes;

    impl SceneQuery for Explodes {
        fn raycast(
            &self,
            _origin: Point3<f32>,
            _direction: Vector3<f32>,
            _max_distance: f32,
            _target: &QueryTarget,
            _trace_complex: bool,
        ) -> Option<RayHit> {
            panic!("scene query failed");
        }
    }

    fn spec(tile: TileBounds) -> TileJobSpec {
        TileJobSpec {
            pose: CameraPose::identity(),
            tile,
            test: TestConfiguration::default(),
            config: DebuggerConfig::default(),
        }
    }

    #[test]
    fn job_renders_uploads_and_returns_buffer() {
        let context = RenderContext::spawn().unwrap();
        let surface = Arc::new(MemorySurface::new(32, 32));
        let job = TileJob::launch(
            spec(TileBounds::new(16, 0, 16)),
            PixelBuffer::new(32, 32),
            Arc::new(AlwaysMiss),
            surface.clone(),
            context.queue(),
        )
        .unwrap();
        assert_eq!(job.tile(), TileBounds::new(16, 0, 16));

        let output = job.wait().unwrap();
        assert_eq!(output.outcome, TileOutcome::Complete { pixels_written: 256 });
        output.upload.unwrap();
        assert_eq!(output.buffer.get(20, 4), Some(MISS_COLOR));
        assert_eq!(output.buffer.get(4, 4), Some(Default::default()));

        // The upload already happened when the job finished.
        assert_eq!(surface.upload_count(), 1);
        assert_eq!(surface.texel(20, 4), Some(MISS_COLOR));
    }

    #[test]
    fn invalid_surface_is_reported_not_fatal() {
        let context = RenderContext::spawn().unwrap();
        let surface = Arc::new(MemorySurface::new(16, 16));
        surface.invalidate();
        let output = TileJob::launch(
            spec(TileBounds::new(0, 0, 16)),
            PixelBuffer::new(16, 16),
            Arc::new(AlwaysMiss),
            surface,
            context.queue(),
        )
        .unwrap()
        .wait()
        .unwrap();
        assert!(matches!(output.upload, Err(UploadError::InvalidSurface)));
        assert!(!output.outcome.is_aborted());
    }

    #[test]
    fn panicking_job_reports_tile() {
        let context = RenderContext::spawn().unwrap();
        let tile = TileBounds::new(0, 0, 4);
        let result = TileJob::launch(
            spec(tile),
            PixelBuffer::new(4, 4),
            Arc::new(Explodes),
            Arc::new(MemorySurface::new(4, 4)),
            context.queue(),
        )
        .unwrap()
        .wait();
        assert!(matches!(result, Err(JobError::Panicked { tile: t }) if t == tile));
    }
}
