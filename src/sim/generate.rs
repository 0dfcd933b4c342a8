//! Tile grid and instruction generation

use super::phase::VisualEffects;
use super::rng::RandomSource;
use super::state::{Tile, TileColor};
use crate::consts::GRID_SIZE;

/// Uniformly random color
pub fn random_color<R: RandomSource + ?Sized>(rng: &mut R) -> TileColor {
    TileColor::from_index(rng.below(TileColor::ALL.len()))
}

/// Fresh 4x4 grid with render hints drawn from the phase's effects
pub fn generate_tiles<R: RandomSource + ?Sized>(rng: &mut R, effects: &VisualEffects) -> Vec<Tile> {
    (0..GRID_SIZE as u8)
        .map(|id| {
            let mut tile = Tile::new(id, random_color(rng));
            apply_hints(&mut tile, rng, effects);
            tile
        })
        .collect()
}

/// Re-roll one random tile in place and make it shake (chaos phase)
pub fn mutate_random_tile<R: RandomSource + ?Sized>(
    tiles: &mut [Tile],
    rng: &mut R,
    effects: &VisualEffects,
) -> Option<u8> {
    if tiles.is_empty() {
        return None;
    }
    let idx = rng.below(tiles.len());
    let tile = &mut tiles[idx];
    tile.color = random_color(rng);
    tile.is_shaking = true;
    tile.drift = (
        rng.spread(effects.max_drift_px),
        rng.spread(effects.max_drift_px),
    );
    Some(tile.id)
}

fn apply_hints<R: RandomSource + ?Sized>(tile: &mut Tile, rng: &mut R, effects: &VisualEffects) {
    if effects == &VisualEffects::CALM {
        return;
    }
    tile.is_shaking = rng.chance(effects.shake_chance);
    tile.rotation = rng.spread(effects.max_rotation_deg);
    tile.drift = (
        rng.spread(effects.max_drift_px),
        rng.spread(effects.max_drift_px),
    );
}

/// Strip motion hints (reduced motion)
pub fn calm_tiles(tiles: &mut [Tile]) {
    for tile in tiles {
        tile.is_shaking = false;
        tile.rotation = 0.0;
        tile.drift = (0.0, 0.0);
    }
}
