//! The render context: a dedicated thread that performs surface uploads.
//!
//! Tile jobs never touch a surface directly. They stage the finished tile
//! as an [`UploadRequest`], submit it through a cloneable [`RenderQueue`]
//! and block on the returned [`UploadTicket`] until the render thread has
//! written it. Requests run strictly in submission order.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::buffer::{PixelBuffer, TileBounds, TileRegion, BYTES_PER_PIXEL};
use crate::surface::DisplaySurface;
use crate::UploadError;

// ---------------------------------------------------------------------------
// UploadRequest
// ---------------------------------------------------------------------------

/// One staged region copy.
pub struct UploadRequest {
    pub surface: Arc<dyn DisplaySurface>,
    pub region: TileRegion,
    /// `region.height` rows of `bytes_per_row` bytes.
    pub data: Vec<u8>,
    pub bytes_per_row: usize,
}

impl UploadRequest {
    /// Stage the part of `tile` that lies inside both the buffer and the
    /// surface. Returns `Ok(None)` when nothing of the tile is visible.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::DataLength`] if the buffer storage is shorter
    /// than its dimensions claim.
    pub fn from_buffer(
        surface: Arc<dyn DisplaySurface>,
        buffer: &PixelBuffer,
        tile: TileBounds,
    ) -> Result<Option<Self>, UploadError> {
        let width = buffer.width().min(surface.width());
        let height = buffer.height().min(surface.height());
        let Some(region) = tile.clip(width, height) else {
            return Ok(None);
        };

        let data = PixelBuffer::copy_region(
            buffer.as_bytes(),
            &region,
            buffer.row_pitch(),
            BYTES_PER_PIXEL,
        )
        .ok_or(UploadError::DataLength {
            expected: buffer.width() as usize * buffer.height() as usize * BYTES_PER_PIXEL,
            actual: buffer.as_bytes().len(),
        })?;

        Ok(Some(Self {
            surface,
            bytes_per_row: region.width as usize * BYTES_PER_PIXEL,
            region,
            data,
        }))
    }
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("region", &self.region)
            .field("bytes", &self.data.len())
            .field("bytes_per_row", &self.bytes_per_row)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Queue and tickets
// ---------------------------------------------------------------------------

enum Command {
    Upload {
        request: UploadRequest,
        reply: mpsc::Sender<Result<(), UploadError>>,
    },
    Shutdown,
}

/// Handle for submitting uploads to a [`RenderContext`].
#[derive(Clone)]
pub struct RenderQueue {
    sender: mpsc::Sender<Command>,
}

impl RenderQueue {
    /// Enqueue a request. The returned ticket resolves once the render
    /// thread has performed it.
    pub fn submit(&self, request: UploadRequest) -> UploadTicket {
        let (reply, receiver) = mpsc::channel();
        if self.sender.send(Command::Upload { request, reply }).is_err() {
            tracing::warn!("upload submitted after render context shut down");
        }
        UploadTicket { receiver }
    }

    /// Submit and wait.
    ///
    /// # Errors
    ///
    /// Whatever the surface reported, or [`UploadError::ContextClosed`].
    pub fn upload(&self, request: UploadRequest) -> Result<(), UploadError> {
        self.submit(request).wait()
    }
}

/// Completion handle for one submitted upload.
#[must_use = "an upload is only known to be done once its ticket is waited on"]
pub struct UploadTicket {
    receiver: mpsc::Receiver<Result<(), UploadError>>,
}

impl UploadTicket {
    /// Block until the upload has run.
    ///
    /// # Errors
    ///
    /// The surface's error, or [`UploadError::ContextClosed`] if the render
    /// thread exited without performing the upload.
    pub fn wait(self) -> Result<(), UploadError> {
        self.receiver
            .recv()
            .unwrap_or(Err(UploadError::ContextClosed))
    }
}

// ---------------------------------------------------------------------------
// RenderContext
// ---------------------------------------------------------------------------

/// Owner of the render thread. Dropping it drains queued uploads and joins
/// the thread.
pub struct RenderContext {
    queue: RenderQueue,
    thread: Option<JoinHandle<()>>,
}

impl RenderContext {
    /// Start the render thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn() -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("hitscope-render".into())
            .spawn(move || run(receiver))?;
        tracing::debug!("render context started");
        Ok(Self {
            queue: RenderQueue { sender },
            thread: Some(thread),
        })
    }

    pub fn queue(&self) -> RenderQueue {
        self.queue.clone()
    }

    /// Perform every upload submitted so far, then stop the thread.
    /// Later submissions resolve to [`UploadError::ContextClosed`].
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.queue.sender.send(Command::Shutdown);
        if thread.join().is_err() {
            tracing::error!("render context thread panicked");
        }
        tracing::debug!("render context stopped");
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(receiver: mpsc::Receiver<Command>) {
    for command in receiver {
        match command {
            Command::Upload { request, reply } => {
                let result = perform(&request);
                // The submitter may have stopped waiting.
                let _ = reply.send(result);
            }
            Command::Shutdown => break,
        }
    }
}

fn perform(request: &UploadRequest) -> Result<(), UploadError> {
    if !request.surface.is_valid() {
        tracing::error!(region = ?request.region, "upload target surface is invalid, skipping");
        return Err(UploadError::InvalidSurface);
    }
    request
        .surface
        .write_region(&request.region, &request.data, request.bytes_per_row)
        .inspect_err(|err| tracing::warn!(region = ?request.region, %err, "surface upload failed"))?;
    tracing::trace!(region = ?request.region, "tile uploaded");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LinearColor;
    use crate::surface::MemorySurface;

    fn filled(width: u32, height: u32, color: LinearColor) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(width, height);
        for i in 0..buffer.len() {
            buffer.set_index(i, color);
        }
        buffer
    }

    #[test]
    fn request_is_clipped_to_surface() {
        let surface = Arc::new(MemorySurface::new(48, 40));
        let buffer = PixelBuffer::new(64, 64);
        let request = UploadRequest::from_buffer(surface, &buffer, TileBounds::new(32, 32, 32))
            .unwrap()
            .unwrap();
        assert_eq!(
            request.region,
            TileRegion {
                x: 32,
                y: 32,
                width: 16,
                height: 8
            }
        );
        assert_eq!(request.data.len(), 16 * 8 * BYTES_PER_PIXEL);
        assert_eq!(request.bytes_per_row, 16 * BYTES_PER_PIXEL);
    }

    #[test]
    fn tile_outside_surface_stages_nothing() {
        let surface = Arc::new(MemorySurface::new(16, 16));
        let buffer = PixelBuffer::new(64, 64);
        let request =
            UploadRequest::from_buffer(surface, &buffer, TileBounds::new(32, 0, 32)).unwrap();
        assert!(request.is_none());
    }

    #[test]
    fn uploads_reach_the_surface() {
        let context = RenderContext::spawn().unwrap();
        let surface = Arc::new(MemorySurface::new(8, 8));
        let buffer = filled(8, 8, LinearColor::splat(0.5));

        let request = UploadRequest::from_buffer(surface.clone(), &buffer, TileBounds::new(4, 4, 4))
            .unwrap()
            .unwrap();
        context.queue().upload(request).unwrap();

        assert_eq!(surface.upload_count(), 1);
        assert_eq!(surface.texel(5, 5), Some(LinearColor::splat(0.5)));
        assert_eq!(surface.texel(0, 0), Some(LinearColor::default()));
    }

    #[test]
    fn invalid_surface_reports_error() {
        let context = RenderContext::spawn().unwrap();
        let surface = Arc::new(MemorySurface::new(8, 8));
        surface.invalidate();
        let buffer = PixelBuffer::new(8, 8);
        let request = UploadRequest::from_buffer(surface.clone(), &buffer, TileBounds::new(0, 0, 8))
            .unwrap()
            .unwrap();
        assert!(matches!(
            context.queue().upload(request),
            Err(UploadError::InvalidSurface)
        ));
        assert_eq!(surface.upload_count(), 0);
    }

    #[test]
    fn shutdown_drains_then_closes() {
        let mut context = RenderContext::spawn().unwrap();
        let queue = context.queue();
        let surface = Arc::new(MemorySurface::new(8, 8));
        let buffer = PixelBuffer::new(8, 8);

        let tickets: Vec<_> = (0..4)
            .map(|i| {
                let request = UploadRequest::from_buffer(
                    surface.clone(),
                    &buffer,
                    TileBounds::new((i % 2) * 4, (i / 2) * 4, 4),
                )
                .unwrap()
                .unwrap();
                queue.submit(request)
            })
            .collect();
        context.shutdown();

        for ticket in tickets {
            ticket.wait().unwrap();
        }
        assert_eq!(surface.upload_count(), 4);

        let late = UploadRequest::from_buffer(surface.clone(), &buffer, TileBounds::new(0, 0, 4))
            .unwrap()
            .unwrap();
        assert!(matches!(queue.upload(late), Err(UploadError::ContextClosed)));
        assert_eq!(surface.upload_count(), 4);
    }
}
