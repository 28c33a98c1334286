//! Display surfaces the tile image is uploaded into.
//!
//! A [`DisplaySurface`] is provisioned by the host (see
//! [`SurfaceProvider`](crate::host::SurfaceProvider)) and handed to the
//! controller as a shared handle. Only the render context thread calls
//! [`DisplaySurface::write_region`]; every other caller reads dimensions.
//!
//! Two implementations ship with the engine:
//!
//! - [`MemorySurface`]: CPU-side texel storage, used headless and in tests.
//! - `WgpuSurface` (feature `renderer`): an `Rgba32Float` wgpu texture.

mod memory;

#[cfg(feature = "renderer")]
mod gpu;

pub use memory::MemorySurface;

#[cfg(feature = "renderer")]
pub use gpu::{WgpuSurface, SURFACE_FORMAT};

use crate::buffer::TileRegion;
use crate::UploadError;

/// A GPU-resident (or stand-in) texture with `Rgba32Float` texels.
pub trait DisplaySurface: Send + Sync {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Whether the handle still refers to a live resource.
    fn is_valid(&self) -> bool;

    /// Replace the texels of `region` with `data`, which holds
    /// `region.height` rows of `bytes_per_row` bytes each.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] if the surface is invalid, the region does
    /// not fit, or `data` is too short.
    fn write_region(
        &self,
        region: &TileRegion,
        data: &[u8],
        bytes_per_row: usize,
    ) -> Result<(), UploadError>;
}

/// Shared argument checks for [`DisplaySurface::write_region`]
/// implementations.
pub(crate) fn check_region(
    surface: &dyn DisplaySurface,
    region: &TileRegion,
    data: &[u8],
    bytes_per_row: usize,
) -> Result<(), UploadError> {
    if !surface.is_valid() {
        return Err(UploadError::InvalidSurface);
    }
    if !region.fits(surface.width(), surface.height()) {
        return Err(UploadError::RegionOutOfBounds {
            region: *region,
            width: surface.width(),
            height: surface.height(),
        });
    }
    let row_bytes = region.width as usize * crate::buffer::BYTES_PER_PIXEL;
    let expected = match region.height as usize {
        0 => 0,
        rows => (rows - 1) * bytes_per_row + row_bytes,
    };
    if bytes_per_row < row_bytes || data.len() < expected {
        return Err(UploadError::DataLength {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
