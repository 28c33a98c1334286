//! Property tests for tile scanning and pixel encoding.

use std::collections::HashSet;

use hitscope_engine::prelude::*;
use hitscope_engine::raycast::encode_hit;
use proptest::prelude::*;

/// Tile origins of one sweep, in scan order.
fn grid_origins(width: u32, height: u32, tile: u32) -> Vec<(u32, u32)> {
    let mut origins = Vec::new();
    for y in (0..height).step_by(tile as usize) {
        for x in (0..width).step_by(tile as usize) {
            origins.push((x, y));
        }
    }
    origins
}

proptest! {
    #[test]
    fn one_sweep_visits_every_origin_exactly_once(
        width in 1u32..700,
        height in 1u32..700,
        tile in 8u32..300,
    ) {
        let expected = grid_origins(width, height, tile);
        let mut cursor = TileCursor::new();
        let sweep: Vec<_> = (0..expected.len())
            .map(|_| {
                let t = cursor.next(width, height, tile);
                (t.start_x, t.start_y)
            })
            .collect();

        prop_assert_eq!(&sweep, &expected);
        let unique: HashSet<_> = sweep.iter().copied().collect();
        prop_assert_eq!(unique.len(), sweep.len());
        // Back at the start after a full sweep.
        prop_assert_eq!(cursor.position(), (0, 0));
    }

    #[test]
    fn sequence_is_periodic(
        width in 1u32..400,
        height in 1u32..400,
        tile in 4u32..200,
        sweeps in 2usize..4,
    ) {
        let period = grid_origins(width, height, tile).len();
        let mut cursor = TileCursor::new();
        let sequence: Vec<_> = (0..period * sweeps)
            .map(|_| cursor.next(width, height, tile))
            .collect();
        for (i, tile_bounds) in sequence.iter().enumerate().skip(period) {
            prop_assert_eq!(*tile_bounds, sequence[i - period]);
        }
    }

    #[test]
    fn tiles_never_start_outside_the_buffer(
        width in 1u32..500,
        height in 1u32..500,
        tile in 1u32..600,
        steps in 1usize..64,
    ) {
        let mut cursor = TileCursor::new();
        for _ in 0..steps {
            let t = cursor.next(width, height, tile);
            prop_assert!(t.start_x < width);
            prop_assert!(t.start_y < height);
            prop_assert_eq!(t.size, tile);
        }
    }

    #[test]
    fn hit_encoding_keeps_unit_normal_and_clamps_fraction(
        x in -1.0f32..1.0,
        y in -1.0f32..1.0,
        z in -1.0f32..1.0,
        fraction in -0.5f32..1.5,
    ) {
        let normal = Vector3::new(x, y, z);
        prop_assume!(normal.norm() > 1e-3);
        let normal = normal.normalize();

        let color = encode_hit(Some(RayHit { normal, hit_fraction: fraction }), Vector3::x());
        prop_assert!((Vector3::new(color.r, color.g, color.b).norm() - 1.0).abs() < 1e-5);
        prop_assert!((0.0..=1.0).contains(&color.a));
        prop_assert_ne!(color, MISS_COLOR);
    }
}

#[test]
fn miss_is_always_the_sentinel() {
    assert_eq!(encode_hit(None, Vector3::x()), LinearColor::new(-1.0, -1.0, -1.0, -1.0));
    assert_eq!(MISS_COLOR.to_array(), [-1.0; 4]);
}
