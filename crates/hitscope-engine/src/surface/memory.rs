//! CPU-side display surface.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{check_region, DisplaySurface};
use crate::buffer::{LinearColor, TileRegion, BYTES_PER_PIXEL};
use crate::UploadError;

/// A surface backed by a plain texel array.
///
/// Besides storing texels it records every region written, which makes it
/// the surface of choice for headless runs and tests.
pub struct MemorySurface {
    width: u32,
    height: u32,
    valid: AtomicBool,
    uploads: AtomicU64,
    texels: Mutex<Vec<LinearColor>>,
    regions: Mutex<Vec<TileRegion>>,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            valid: AtomicBool::new(true),
            uploads: AtomicU64::new(0),
            texels: Mutex::new(vec![LinearColor::default(); width as usize * height as usize]),
            regions: Mutex::new(Vec::new()),
        }
    }

    /// Mark the surface released. Later uploads fail with
    /// [`UploadError::InvalidSurface`].
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    /// Number of successful uploads.
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Regions written so far, in upload order.
    pub fn uploaded_regions(&self) -> Vec<TileRegion> {
        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<LinearColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let texels = self.texels.lock().unwrap_or_else(PoisonError::into_inner);
        texels.get(x as usize + y as usize * self.width as usize).copied()
    }

    /// Copy of every texel, row-major.
    pub fn snapshot(&self) -> Vec<LinearColor> {
        self.texels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DisplaySurface for MemorySurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn write_region(
        &self,
        region: &TileRegion,
        data: &[u8],
        bytes_per_row: usize,
    ) -> Result<(), UploadError> {
        check_region(self, region, data, bytes_per_row)?;

        let mut texels = self.texels.lock().unwrap_or_else(PoisonError::into_inner);
        for row in 0..region.height as usize {
            let src_row = &data[row * bytes_per_row..];
            let dst_start = region.x as usize + (region.y as usize + row) * self.width as usize;
            for col in 0..region.width as usize {
                let bytes = &src_row[col * BYTES_PER_PIXEL..(col + 1) * BYTES_PER_PIXEL];
                texels[dst_start + col] = bytemuck::pod_read_unaligned(bytes);
            }
        }
        drop(texels);

        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*region);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
