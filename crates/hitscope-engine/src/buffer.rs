//! CPU-side pixel storage and tile geometry.
//!
//! The [`PixelBuffer`] is a flat, row-major array of [`LinearColor`]s whose
//! length always equals `width * height`. Pixel `(x, y)` lives at index
//! `x + y * width`. Colors are `#[repr(C)]` and [`Pod`](bytemuck::Pod), so
//! the buffer can be viewed as raw bytes with a row pitch of
//! `width * BYTES_PER_PIXEL` for surface uploads.

use serde::{Deserialize, Serialize};

/// Size of one [`LinearColor`] in bytes (four `f32` channels).
pub const BYTES_PER_PIXEL: usize = std::mem::size_of::<LinearColor>();

// ---------------------------------------------------------------------------
// LinearColor
// ---------------------------------------------------------------------------

/// A four-channel float color, laid out to match an `Rgba32Float` texel.
#[repr(C)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    bytemuck_derive::Pod,
    bytemuck_derive::Zeroable,
)]
pub struct LinearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl LinearColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// All four channels set to `v`.
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

// ---------------------------------------------------------------------------
// Tile geometry
// ---------------------------------------------------------------------------

/// A square tile as issued by the cursor. It may extend past the buffer
/// edge; pixels outside the buffer are skipped, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileBounds {
    pub start_x: u32,
    pub start_y: u32,
    pub size: u32,
}

impl TileBounds {
    pub fn new(start_x: u32, start_y: u32, size: u32) -> Self {
        Self {
            start_x,
            start_y,
            size,
        }
    }

    /// The part of this tile inside a `width` x `height` surface, or `None`
    /// if the tile lies entirely outside it.
    pub fn clip(&self, width: u32, height: u32) -> Option<TileRegion> {
        if self.start_x >= width || self.start_y >= height || self.size == 0 {
            return None;
        }
        Some(TileRegion {
            x: self.start_x,
            y: self.start_y,
            width: self.size.min(width - self.start_x),
            height: self.size.min(height - self.start_y),
        })
    }
}

/// An axis-aligned rectangle fully inside a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRegion {
    /// Whether the region fits in a `width` x `height` surface.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

// ---------------------------------------------------------------------------
// PixelBuffer
// ---------------------------------------------------------------------------

/// Row-major image matching the display surface dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<LinearColor>,
}

impl PixelBuffer {
    /// A zero-filled buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![LinearColor::default(); width as usize * height as usize],
        }
    }

    /// A buffer whose storage disagrees with its dimensions.
    #[cfg(test)]
    pub(crate) fn with_storage_len(width: u32, height: u32, len: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![LinearColor::default(); len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Linear index of `(x, y)`. Not bounds-checked against the width, so a
    /// column past the edge aliases into the next row.
    pub fn index_of(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.width as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Option<LinearColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index_of(x, y)).copied()
    }

    /// Store `color` at a linear index. Returns `false` if the index is past
    /// the end of the buffer.
    pub fn set_index(&mut self, index: usize, color: LinearColor) -> bool {
        match self.pixels.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    pub fn pixels(&self) -> &[LinearColor] {
        &self.pixels
    }

    /// Bytes per buffer row.
    pub fn row_pitch(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// The whole buffer as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Copy a region out of a byte image with the given row pitch and
    /// bytes-per-pixel into a tightly packed staging vector.
    ///
    /// Returns `None` if the source is too short for the region.
    pub fn copy_region(
        src: &[u8],
        region: &TileRegion,
        src_pitch: usize,
        bytes_per_pixel: usize,
    ) -> Option<Vec<u8>> {
        let row_bytes = region.width as usize * bytes_per_pixel;
        let mut out = Vec::with_capacity(row_bytes * region.height as usize);
        for row in 0..region.height as usize {
            let start = (region.y as usize + row) * src_pitch + region.x as usize * bytes_per_pixel;
            out.extend_from_slice(src.get(start..start + row_bytes)?);
        }
        Some(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_sixteen_bytes() {
        assert_eq!(BYTES_PER_PIXEL, 16);
    }

    #[test]
    fn new_buffer_is_zero_filled_and_sized() {
        let buffer = PixelBuffer::new(300, 200);
        assert_eq!(buffer.len(), 60_000);
        assert!(buffer.pixels().iter().all(|p| *p == LinearColor::default()));
        assert_eq!(buffer.row_pitch(), 300 * 16);
        assert_eq!(buffer.as_bytes().len(), 60_000 * 16);
    }

    #[test]
    fn index_is_row_major() {
        let buffer = PixelBuffer::new(10, 4);
        assert_eq!(buffer.index_of(3, 2), 23);
        assert_eq!(buffer.get(10, 0), None);
        assert_eq!(buffer.get(0, 4), None);
    }

    #[test]
    fn set_index_rejects_overrun() {
        let mut buffer = PixelBuffer::new(2, 2);
        assert!(buffer.set_index(3, LinearColor::splat(1.0)));
        assert!(!buffer.set_index(4, LinearColor::splat(1.0)));
        assert_eq!(buffer.get(1, 1), Some(LinearColor::splat(1.0)));
    }

    #[test]
    fn clip_trims_to_surface() {
        let tile = TileBounds::new(256, 0, 256);
        assert_eq!(
            tile.clip(300, 100),
            Some(TileRegion {
                x: 256,
                y: 0,
                width: 44,
                height: 100
            })
        );
        assert_eq!(TileBounds::new(300, 0, 256).clip(300, 100), None);
        assert_eq!(TileBounds::new(0, 0, 0).clip(300, 100), None);
    }

    #[test]
    fn copy_region_follows_pitch() {
        let mut buffer = PixelBuffer::new(4, 3);
        for y in 0..3 {
            for x in 0..4 {
                let i = buffer.index_of(x, y);
                buffer.set_index(i, LinearColor::new(x as f32, y as f32, 0.0, 1.0));
            }
        }
        let region = TileRegion {
            x: 1,
            y: 1,
            width: 2,
            height: 2,
        };
        let bytes =
            PixelBuffer::copy_region(buffer.as_bytes(), &region, buffer.row_pitch(), BYTES_PER_PIXEL)
                .unwrap();
        assert_eq!(bytes.len(), 4 * BYTES_PER_PIXEL);

        let first: LinearColor = bytemuck::pod_read_unaligned(&bytes[..BYTES_PER_PIXEL]);
        assert_eq!(first, LinearColor::new(1.0, 1.0, 0.0, 1.0));
        let last: LinearColor = bytemuck::pod_read_unaligned(&bytes[3 * BYTES_PER_PIXEL..]);
        assert_eq!(last, LinearColor::new(2.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn copy_region_rejects_short_source() {
        let buffer = PixelBuffer::new(4, 3);
        let region = TileRegion {
            x: 0,
            y: 2,
            width: 4,
            height: 2,
        };
        assert!(PixelBuffer::copy_region(
            buffer.as_bytes(),
            &region,
            buffer.row_pitch(),
            BYTES_PER_PIXEL
        )
        .is_none());
    }
}
