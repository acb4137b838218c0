//! Authoring primitives: paint/erase brushes, line-stroke interpolation,
//! flood fill, and the rigid rectangle/disk stamp (§4.11).
//!
//! Grounded on the teacher's `world.rs::add_particles_in_radius`/
//! `remove_particles_in_radius` circle-predicate loop, kept almost
//! verbatim as the circle shape, generalized here to also take a square
//! predicate and to be driven by a `ContentRegistry` instead of the
//! static element table. The rigid stamp borrows the rasterization shape
//! of `systems/rigid_body_system/rasterize.rs` but, per spec, *overwrites*
//! occupied cells instead of skipping them.

use crate::chunks::ChunkGrid;
use crate::content::ContentRegistry;
use crate::elements::{color_with_variation, ElementId, EL_EMPTY};
use crate::grid::Grid;

/// Hard per-call cell budget for flood fill, so a runaway fill on a huge
/// grid can't stall a tick (§4.11, §5 resource policy).
pub const FLOOD_FILL_BUDGET: usize = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushShape {
    Circle,
    Square,
}

fn seed_for(x: u32, y: u32, tick: u64) -> u8 {
    (x.wrapping_mul(7).wrapping_add(y.wrapping_mul(13)).wrapping_add(tick as u32) & 31) as u8
}

fn in_shape(dx: i32, dy: i32, radius: i32, shape: BrushShape) -> bool {
    match shape {
        BrushShape::Circle => dx * dx + dy * dy <= radius * radius,
        BrushShape::Square => dx.abs() <= radius && dy.abs() <= radius,
    }
}

/// Adds a single particle, failing silently (returns `false`) on an
/// occupied or out-of-range cell, same contract as the teacher's
/// `add_particle`.
pub fn add_particle(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    x: u32,
    y: u32,
    element: ElementId,
    tick: u64,
) -> bool {
    if !grid.in_bounds(x as i32, y as i32) { return false; }
    if element == EL_EMPTY || !registry.is_valid_element_id(element) { return false; }
    if !grid.is_empty(x as i32, y as i32) { return false; }

    let Some(props) = registry.props(element) else { return false };
    let seed = seed_for(x, y, tick);
    grid.set_particle(x, y, element, color_with_variation(props.color, seed), props.lifetime, props.default_temp);
    chunks.add_particle(x, y);
    true
}

pub fn remove_particle(grid: &mut Grid, chunks: &mut ChunkGrid, x: u32, y: u32) -> bool {
    if !grid.in_bounds(x as i32, y as i32) { return false; }
    if grid.is_empty(x as i32, y as i32) { return false; }
    chunks.remove_particle(x, y);
    chunks.mark_dirty(x, y);
    grid.clear_cell(x, y);
    true
}

fn dab(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    cx: i32,
    cy: i32,
    radius: i32,
    element: ElementId,
    shape: BrushShape,
    add: bool,
    tick: u64,
) -> i32 {
    let mut delta = 0i32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if !in_shape(dx, dy, radius, shape) { continue; }
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 { continue; }
            if add {
                if add_particle(grid, chunks, registry, x as u32, y as u32, element, tick) {
                    delta += 1;
                }
            } else if remove_particle(grid, chunks, x as u32, y as u32) {
                delta -= 1;
            }
        }
    }
    delta
}

/// Adds particles in a disc or square footprint around `(cx, cy)`. Returns
/// the net change in live particle count (callers that don't need the
/// count can ignore it).
pub fn add_in_radius(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    cx: i32,
    cy: i32,
    radius: i32,
    element: ElementId,
    shape: BrushShape,
    tick: u64,
) -> i32 {
    dab(grid, chunks, registry, cx, cy, radius, element, shape, true, tick)
}

pub fn erase_in_radius(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    cx: i32,
    cy: i32,
    radius: i32,
    shape: BrushShape,
) -> i32 {
    let mut delta = 0i32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if !in_shape(dx, dy, radius, shape) { continue; }
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 { continue; }
            if remove_particle(grid, chunks, x as u32, y as u32) {
                delta -= 1;
            }
        }
    }
    delta
}

/// Bresenham line between two integer points, inclusive of both endpoints,
/// used to fill in the gap between two brush samples of the same stroke so
/// a fast cursor motion doesn't leave gaps.
fn bresenham_points(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let mut points = Vec::new();
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        points.push((x, y));
        if x == x1 && y == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}

/// Tracks a brush stroke's last cursor position so consecutive `stroke_to`
/// calls interpolate a continuous line instead of a dotted one, and resets
/// on an explicit end-of-stroke (§4.11, §5).
pub struct StrokeTracker {
    last: Option<(i32, i32)>,
}

impl StrokeTracker {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn end_stroke(&mut self) {
        self.last = None;
    }

    /// Paints or erases at `(x, y)`, interpolating from the last known
    /// cursor position via Bresenham when one is set. Returns the net
    /// change in live particle count.
    #[allow(clippy::too_many_arguments)]
    pub fn stroke_to(
        &mut self,
        grid: &mut Grid,
        chunks: &mut ChunkGrid,
        registry: &ContentRegistry,
        x: i32,
        y: i32,
        radius: i32,
        element: ElementId,
        shape: BrushShape,
        add: bool,
        tick: u64,
    ) -> i32 {
        let points = match self.last {
            None => vec![(x, y)],
            Some((lx, ly)) => bresenham_points(lx, ly, x, y),
        };

        let mut delta = 0i32;
        for (px, py) in points {
            delta += dab(grid, chunks, registry, px, py, radius, element, shape, add, tick);
        }

        self.last = Some((x, y));
        delta
    }
}

impl Default for StrokeTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn place_fill_cell(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    x: u32,
    y: u32,
    target: ElementId,
    source_was_empty: bool,
    tick: u64,
) {
    if target == EL_EMPTY {
        grid.clear_cell(x, y);
        if source_was_empty {
            chunks.mark_dirty(x, y);
        } else {
            chunks.remove_particle(x, y);
        }
        return;
    }

    if let Some(props) = registry.props(target) {
        let seed = seed_for(x, y, tick);
        grid.set_particle(x, y, target, color_with_variation(props.color, seed), props.lifetime, props.default_temp);
        if source_was_empty {
            chunks.add_particle(x, y);
        } else {
            chunks.mark_dirty(x, y);
        }
    }
}

/// 4-connected flood fill with an explicit stack and a reusable
/// monotonic visit-stamp array (§4.11), so repeated fills don't allocate
/// or re-zero a full-grid `bool` array each call.
pub struct FloodFiller {
    stamp: Vec<u32>,
    current: u32,
    stack: Vec<(u32, u32)>,
}

impl FloodFiller {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            stamp: vec![0; (width * height) as usize],
            current: 0,
            stack: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.stamp = vec![0; (width * height) as usize];
        self.current = 0;
    }

    /// Replaces every 4-connected cell matching the type at `(x, y)` with
    /// `target`, up to [`FLOOD_FILL_BUDGET`] cells. Returns the number of
    /// cells changed; the caller is responsible for the "same type is a
    /// no-op" short circuit (it needs the source type anyway to adjust its
    /// own particle count).
    pub fn fill(
        &mut self,
        grid: &mut Grid,
        chunks: &mut ChunkGrid,
        registry: &ContentRegistry,
        x: u32,
        y: u32,
        target: ElementId,
        tick: u64,
    ) -> usize {
        if !grid.in_bounds(x as i32, y as i32) { return 0; }

        let source = grid.get_type_u(x, y);
        let source_was_empty = source == EL_EMPTY;

        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            self.stamp.fill(0);
            self.current = 1;
        }
        let mark = self.current;

        self.stack.clear();
        self.stack.push((x, y));
        self.stamp[grid.index(x, y)] = mark;

        let mut changed = 0usize;
        while let Some((cx, cy)) = self.stack.pop() {
            if changed >= FLOOD_FILL_BUDGET { break; }

            place_fill_cell(grid, chunks, registry, cx, cy, target, source_was_empty, tick);
            changed += 1;

            for (dx, dy) in [(0i32, -1i32), (0, 1), (-1, 0), (1, 0)] {
                let nx = cx as i32 + dx;
                let ny = cy as i32 + dy;
                if !grid.in_bounds(nx, ny) { continue; }
                let (nxu, nyu) = (nx as u32, ny as u32);
                let nidx = grid.index(nxu, nyu);
                if self.stamp[nidx] == mark { continue; }
                if grid.get_type_u(nxu, nyu) != source { continue; }
                self.stamp[nidx] = mark;
                self.stack.push((nxu, nyu));
            }
        }
        changed
    }
}

/// Overwrites a single cell with `element` (or clears it, if `EL_EMPTY`)
/// regardless of prior occupancy. Returns the net particle-count change
/// (`+1`, `0`, or `-1`) so the caller can keep its own count exact.
fn place_overwrite(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    x: u32,
    y: u32,
    element: ElementId,
    tick: u64,
) -> i32 {
    let was_empty = grid.is_empty(x as i32, y as i32);

    if element == EL_EMPTY {
        if was_empty { return 0; }
        grid.clear_cell(x, y);
        chunks.remove_particle(x, y);
        chunks.mark_dirty(x, y);
        return -1;
    }

    let Some(props) = registry.props(element) else { return 0 };
    let seed = seed_for(x, y, tick);
    grid.set_particle(x, y, element, color_with_variation(props.color, seed), props.lifetime, props.default_temp);
    if was_empty {
        chunks.add_particle(x, y);
        1
    } else {
        chunks.mark_dirty(x, y);
        0
    }
}

/// Stamps a filled rectangle of `element`, overwriting whatever is
/// already there, and returns `(handle, particle_count_delta)`. The core
/// only records the stamp; no rigid-body integration happens here (§9).
#[allow(clippy::too_many_arguments)]
pub fn stamp_rect(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    element: ElementId,
    tick: u64,
    next_handle: &mut u32,
) -> (u32, i32) {
    let handle = *next_handle;
    *next_handle = next_handle.wrapping_add(1);

    let mut delta = 0i32;
    for dy in 0..h.max(0) {
        for dx in 0..w.max(0) {
            let px = x + dx;
            let py = y + dy;
            if grid.in_bounds(px, py) {
                delta += place_overwrite(grid, chunks, registry, px as u32, py as u32, element, tick);
            }
        }
    }
    (handle, delta)
}

/// Stamps a filled disc of `element`, overwriting whatever is already
/// there, and returns `(handle, particle_count_delta)`.
#[allow(clippy::too_many_arguments)]
pub fn stamp_disk(
    grid: &mut Grid,
    chunks: &mut ChunkGrid,
    registry: &ContentRegistry,
    cx: i32,
    cy: i32,
    radius: i32,
    element: ElementId,
    tick: u64,
    next_handle: &mut u32,
) -> (u32, i32) {
    let handle = *next_handle;
    *next_handle = next_handle.wrapping_add(1);

    let mut delta = 0i32;
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > r2 { continue; }
            let px = cx + dx;
            let py = cy + dy;
            if grid.in_bounds(px, py) {
                delta += place_overwrite(grid, chunks, registry, px as u32, py as u32, element, tick);
            }
        }
    }
    (handle, delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::baseline_packs;

    fn setup() -> (Grid, ChunkGrid, ContentRegistry) {
        let grid = Grid::new(16, 16);
        let chunks = ChunkGrid::new(16, 16);
        let registry = ContentRegistry::compile_packs(&baseline_packs()).unwrap();
        (grid, chunks, registry)
    }

    #[test]
    fn add_particle_fails_on_occupied_cell() {
        let (mut grid, mut chunks, registry) = setup();
        let sand = registry.id_by_key("base:sand").unwrap();
        assert!(add_particle(&mut grid, &mut chunks, &registry, 3, 3, sand, 0));
        assert!(!add_particle(&mut grid, &mut chunks, &registry, 3, 3, sand, 0));
    }

    #[test]
    fn erase_clears_radius() {
        let (mut grid, mut chunks, registry) = setup();
        let sand = registry.id_by_key("base:sand").unwrap();
        add_in_radius(&mut grid, &mut chunks, &registry, 8, 8, 2, sand, BrushShape::Circle, 0);
        assert!(!grid.is_empty(8, 8));
        erase_in_radius(&mut grid, &mut chunks, 8, 8, 2, BrushShape::Circle);
        assert!(grid.is_empty(8, 8));
    }

    #[test]
    fn stroke_interpolates_between_far_apart_points() {
        let (mut grid, mut chunks, registry) = setup();
        let stone = registry.id_by_key("base:stone").unwrap();
        let mut tracker = StrokeTracker::new();
        tracker.stroke_to(&mut grid, &mut chunks, &registry, 0, 0, 0, stone, BrushShape::Circle, true, 0);
        tracker.stroke_to(&mut grid, &mut chunks, &registry, 10, 0, 0, stone, BrushShape::Circle, true, 0);
        // The straight horizontal line between (0,0) and (10,0) should have
        // painted every cell in between, not just the two endpoints.
        assert!(!grid.is_empty(5, 0));
    }

    #[test]
    fn end_stroke_breaks_interpolation() {
        let (mut grid, mut chunks, registry) = setup();
        let stone = registry.id_by_key("base:stone").unwrap();
        let mut tracker = StrokeTracker::new();
        tracker.stroke_to(&mut grid, &mut chunks, &registry, 0, 0, 0, stone, BrushShape::Circle, true, 0);
        tracker.end_stroke();
        tracker.stroke_to(&mut grid, &mut chunks, &registry, 10, 10, 0, stone, BrushShape::Circle, true, 0);
        // No interpolation should have crossed from (0,0) toward (10,10).
        assert!(grid.is_empty(5, 5));
    }

    #[test]
    fn flood_fill_is_noop_on_same_type() {
        let (mut grid, mut chunks, registry) = setup();
        // Every cell starts empty; filling empty with empty must be a no-op
        // by the caller's contract (checked at the World layer), but the
        // filler itself should still just walk and report the count if
        // asked to (here we simulate the World-level short circuit).
        let source = grid.get_type_u(8, 8);
        assert_eq!(source, EL_EMPTY);
        let mut filler = FloodFiller::new(16, 16);
        // Call directly with target == source to confirm it still
        // terminates cleanly (no crash, count includes replaced cells).
        let changed = filler.fill(&mut grid, &mut chunks, &registry, 8, 8, EL_EMPTY, 0);
        assert!(changed > 0);
    }

    #[test]
    fn flood_fill_replaces_connected_region() {
        let (mut grid, mut chunks, registry) = setup();
        let water = registry.id_by_key("base:water").unwrap();
        let mut filler = FloodFiller::new(16, 16);
        let changed = filler.fill(&mut grid, &mut chunks, &registry, 0, 0, water, 0);
        assert_eq!(changed, 16 * 16);
        assert_eq!(grid.get_type_u(15, 15), water);
    }

    #[test]
    fn rigid_stamp_overwrites_occupied_cells() {
        let (mut grid, mut chunks, registry) = setup();
        let sand = registry.id_by_key("base:sand").unwrap();
        let stone = registry.id_by_key("base:stone").unwrap();
        grid.set_type(5, 5, sand);
        let mut next_handle = 0u32;
        let (handle, _delta) = stamp_rect(&mut grid, &mut chunks, &registry, 4, 4, 3, 3, stone, 0, &mut next_handle);
        assert_eq!(handle, 0);
        assert_eq!(grid.get_type_u(5, 5), stone);
        assert_eq!(next_handle, 1);
    }
}
