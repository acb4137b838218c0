//! Thermal engine: stochastic neighbor heat exchange, ambient coupling,
//! and the phase-change check that rides on it (§4.10).
//!
//! Grounded on the teacher's `temperature.rs::update_temperature`/
//! `transform_particle` near line-for-line -- same constants (`0.02`
//! ambient coefficient, `0.5` negligible-diff threshold,
//! `conductivity/100 * 0.5` transfer rate). Two divergences: element
//! properties come from the compiled [`ContentRegistry`] instead of the
//! static `ELEMENT_DATA` table, and sleeping chunks are skipped outright
//! (spec's chunk model has no lazy-hydration virtual-temperature shortcut;
//! that's a teacher-only Phase-6 optimization, dropped here).

use crate::behaviors::xorshift32;
use crate::chunks::{ChunkGrid, CHUNK_SIZE};
use crate::content::ContentRegistry;
use crate::elements::{color_with_variation, ElementId, EL_EMPTY};
use crate::grid::Grid;

const AMBIENT_COEFF: f32 = 0.02;
const NEGLIGIBLE_DIFF: f32 = 0.5;
const EMPTY_CONDUCTIVITY: u8 = 5;

/// Runs the thermal pass over every non-sleeping chunk's cells (§4.10,
/// invoked every other tick by the caller -- see `world.rs`).
pub fn process_temperature(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    ambient_temp: f32,
    tick: u64,
    rng: &mut u32,
    phase_changes: &mut u32,
) {
    let (cx_count, cy_count) = chunks.dimensions();

    for cy in 0..cy_count {
        for cx in 0..cx_count {
            if chunks.is_sleeping(cx, cy) || chunks.is_empty_chunk(cx, cy) {
                continue;
            }

            let start_x = cx * CHUNK_SIZE;
            let start_y = cy * CHUNK_SIZE;
            let end_x = (start_x + CHUNK_SIZE).min(grid.width());
            let end_y = (start_y + CHUNK_SIZE).min(grid.height());

            for y in start_y..end_y {
                for x in start_x..end_x {
                    update_one_cell(grid, chunks, registry, x, y, ambient_temp, tick, rng, phase_changes);
                }
            }
        }
    }
}

fn update_one_cell(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    x: u32,
    y: u32,
    ambient_temp: f32,
    tick: u64,
    rng: &mut u32,
    phase_changes: &mut u32,
) {
    let xi = x as i32;
    let yi = y as i32;

    let my_temp = grid.get_temp(xi, yi);
    let element = grid.get_type(xi, yi);

    if element == EL_EMPTY {
        let diff = ambient_temp - my_temp;
        if diff.abs() > NEGLIGIBLE_DIFF {
            grid.set_temp(x, y, my_temp + diff * AMBIENT_COEFF);
        }
    }

    let conductivity = if element != EL_EMPTY {
        registry.props(element).map(|p| p.heat_conductivity).unwrap_or(EMPTY_CONDUCTIVITY)
    } else {
        EMPTY_CONDUCTIVITY
    };
    if conductivity == 0 { return; }

    let dir = xorshift32(rng) % 4;
    let (nx, ny) = match dir {
        0 => (xi, yi - 1),
        1 => (xi, yi + 1),
        2 => (xi - 1, yi),
        _ => (xi + 1, yi),
    };

    if !grid.in_bounds(nx, ny) {
        let diff = ambient_temp - my_temp;
        grid.set_temp(x, y, my_temp + diff * AMBIENT_COEFF);
        return;
    }

    let neighbor_temp = grid.get_temp(nx, ny);
    let diff = neighbor_temp - my_temp;
    if diff.abs() < NEGLIGIBLE_DIFF { return; }

    let transfer_rate = (conductivity as f32 / 100.0) * 0.5;
    let new_temp = my_temp + diff * transfer_rate;
    grid.set_temp(x, y, new_temp);
    grid.set_temp(nx as u32, ny as u32, neighbor_temp - diff * transfer_rate);

    if element != EL_EMPTY {
        if let Some(new_element) = registry.check_phase_change(element, new_temp) {
            transform_particle(grid, chunks, registry, x, y, new_element, new_temp, tick);
            *phase_changes += 1;
        }
    }
}

/// Transforms a particle in place, preserving its temperature, and marks
/// it updated so the sweep doesn't process it again this tick.
fn transform_particle(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    x: u32,
    y: u32,
    new_element: ElementId,
    temp: f32,
    tick: u64,
) {
    let seed = (x.wrapping_mul(7).wrapping_add(y.wrapping_mul(13)).wrapping_add(tick as u32) & 31) as u8;
    let base_color = registry.props(new_element).map(|p| p.color).unwrap_or(0xFF0A0A0A);
    let lifetime = registry.props(new_element).map(|p| p.lifetime).unwrap_or(0);

    grid.set_particle(x, y, new_element, color_with_variation(base_color, seed), lifetime, temp);
    grid.set_updated(x, y, true);
    chunks.mark_dirty(x, y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::baseline_packs;

    #[test]
    fn water_forced_above_boiling_point_becomes_steam() {
        let registry = ContentRegistry::compile_packs(&baseline_packs()).unwrap();
        let water = registry.id_by_key("base:water").unwrap();
        let steam = registry.id_by_key("base:steam").unwrap();

        let mut grid = Grid::new(4, 4);
        let mut chunks = ChunkGrid::new(4, 4);
        grid.set_type(1, 1, water);
        // Neighbors are empty cells at AMBIENT_DEFAULT; the thermal exchange
        // this starting temperature undergoes still lands above water's
        // 100 deg phase threshold (conductivity transfer_rate = 0.3).
        grid.set_temp(1, 1, 200.0);

        let mut rng = 1u32;
        let mut phase_changes = 0u32;
        update_one_cell(&mut grid, &mut chunks, &registry, 1, 1, 20.0, 0, &mut rng, &mut phase_changes);

        assert_eq!(grid.get_type_u(1, 1), steam);
        assert_eq!(phase_changes, 1);
        assert!((grid.get_temp(1, 1) - 146.0).abs() < 0.01);
    }

    #[test]
    fn water_at_ambient_does_not_change_phase() {
        let registry = ContentRegistry::compile_packs(&baseline_packs()).unwrap();
        let water = registry.id_by_key("base:water").unwrap();

        let mut grid = Grid::new(4, 4);
        let mut chunks = ChunkGrid::new(4, 4);
        grid.set_type(1, 1, water);
        grid.set_temp(1, 1, 20.0);

        let mut rng = 1u32;
        let mut phase_changes = 0u32;
        update_one_cell(&mut grid, &mut chunks, &registry, 1, 1, 20.0, 0, &mut rng, &mut phase_changes);

        assert_eq!(grid.get_type_u(1, 1), water);
        assert_eq!(phase_changes, 0);
    }
}
