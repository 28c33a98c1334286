//! Row-major tile scanning with wraparound.
//!
//! The cursor issues one tile per completed job. Starting at `(0, 0)` it
//! steps right by `tile_size`; stepping past the right edge returns to
//! column 0 of the next tile row, and stepping past the bottom edge returns
//! to the top. The resulting sequence is infinite and periodic, covering
//! every tile origin once per sweep.

use crate::buffer::TileBounds;

/// Scan position over a pixel buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCursor {
    x: u32,
    y: u32,
}

impl TileCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tile at the current position, without advancing.
    pub fn peek(&self, tile_size: u32) -> TileBounds {
        TileBounds::new(self.x, self.y, tile_size)
    }

    /// Step to the next tile origin.
    pub fn advance(&mut self, buffer_width: u32, buffer_height: u32, tile_size: u32) {
        self.x = self.x.saturating_add(tile_size);
        if self.x >= buffer_width {
            self.x = 0;
            self.y = self.y.saturating_add(tile_size);
        }
        if self.y >= buffer_height {
            self.y = 0;
        }
    }

    /// Return the current tile and advance past it.
    pub fn next(&mut self, buffer_width: u32, buffer_height: u32, tile_size: u32) -> TileBounds {
        let tile = self.peek(tile_size);
        self.advance(buffer_width, buffer_height, tile_size);
        tile
    }

    /// Return to the origin.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current `(x, y)` origin.
    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_origin() {
        let cursor = TileCursor::new();
        assert_eq!(cursor.position(), (0, 0));
        assert_eq!(cursor.peek(64), TileBounds::new(0, 0, 64));
    }

    #[test]
    fn scans_512_square_in_four_tiles() {
        let mut cursor = TileCursor::new();
        let origins: Vec<_> = (0..5)
            .map(|_| {
                let t = cursor.next(512, 512, 256);
                (t.start_x, t.start_y)
            })
            .collect();
        assert_eq!(
            origins,
            vec![(0, 0), (256, 0), (0, 256), (256, 256), (0, 0)]
        );
    }

    #[test]
    fn partial_last_column_and_row_are_visited() {
        let mut cursor = TileCursor::new();
        let origins: Vec<_> = (0..4)
            .map(|_| {
                let t = cursor.next(300, 200, 256);
                (t.start_x, t.start_y)
            })
            .collect();
        // 300x200 needs two columns and one row of 256-pixel tiles.
        assert_eq!(origins, vec![(0, 0), (256, 0), (0, 0), (256, 0)]);
    }

    #[test]
    fn reset_returns_to_origin() {
        let mut cursor = TileCursor::new();
        cursor.next(512, 512, 256);
        cursor.next(512, 512, 256);
        cursor.reset();
        assert_eq!(cursor.position(), (0, 0));
    }

    #[test]
    fn tile_larger_than_buffer_always_yields_origin() {
        let mut cursor = TileCursor::new();
        for _ in 0..3 {
            assert_eq!(cursor.next(100, 100, 256), TileBounds::new(0, 0, 256));
        }
    }
}
