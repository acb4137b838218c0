//! World - owns the grid, chunk manager, content registry, and tick loop.
//!
//! Refactored for SOLID principles:
//! - Single Responsibility: World only orchestrates, delegates to
//!   behaviors/reactions/temperature/brush.
//! - Open/Closed: new behaviors or content packs plug in without touching
//!   this file.
//!
//! Grounded on the teacher's `world.rs`: same `PerfTimer` dual wasm/native
//! pattern, same wasm-bindgen struct/plain-impl split (constructor and
//! externally-facing methods in the `#[wasm_bindgen] impl` block; fallible
//! and test-only operations in a second plain `impl World`). The tick body
//! itself is new -- it drives `sweep::sweep_order`, `reactions::try_react`,
//! and `temperature::process_temperature` against a compiled
//! `ContentRegistry` instead of the teacher's static `ELEMENT_DATA` table
//! and hardcoded reaction `match`.

use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use js_sys;

use crate::behaviors::{cell_rng_seed, BehaviorRegistry, UpdateContext};
use crate::brush::{self, BrushShape, FloodFiller, StrokeTracker};
use crate::chunks::{ChunkGrid, CHUNK_SIZE};
use crate::content::{baseline_packs, ContentRegistry};
use crate::elements::{CategoryId, ElementId, CAT_SOLID, EL_EMPTY};
use crate::error::{EngineError, EngineResult};
use crate::grid::Grid;
use crate::reactions::try_react;
use crate::ring::{BrushEvent, InputRing};
use crate::sweep::sweep_order;
use crate::temperature::process_temperature;

const DEFAULT_RING_CAPACITY: usize = 1024;

/// Lightweight timer that works both in wasm and native.
#[derive(Clone, Copy)]
struct PerfTimer {
    #[cfg(target_arch = "wasm32")]
    start_ms: f64,
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
}

impl PerfTimer {
    fn start() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            PerfTimer { start_ms: js_sys::Date::now() }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            PerfTimer { start: std::time::Instant::now() }
        }
    }

    fn elapsed_ms(&self) -> f64 {
        #[cfg(target_arch = "wasm32")]
        {
            js_sys::Date::now() - self.start_ms
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_secs_f64() * 1000.0
        }
    }
}

/// Per-step diagnostics snapshot, filled only when perf metrics are
/// enabled (§10.5 -- a trimmed version of the teacher's much larger
/// `PerfStats`: tick time, live particle count, chunk activity, and
/// reaction count, since that's the operational surface this rework
/// actually needs).
#[wasm_bindgen]
#[derive(Clone, Default)]
pub struct PerfStats {
    tick_ms: f64,
    particle_count: u32,
    active_chunks: u32,
    sleeping_chunks: u32,
    reactions_applied: u32,
}

#[wasm_bindgen]
impl PerfStats {
    pub fn tick_ms(&self) -> f64 { self.tick_ms }
    pub fn particle_count(&self) -> u32 { self.particle_count }
    pub fn active_chunks(&self) -> u32 { self.active_chunks }
    pub fn sleeping_chunks(&self) -> u32 { self.sleeping_chunks }
    pub fn reactions_applied(&self) -> u32 { self.reactions_applied }
}

#[wasm_bindgen]
pub struct World {
    grid: Grid,
    chunks: ChunkGrid,
    registry: ContentRegistry,
    behaviors: BehaviorRegistry,

    ring: std::sync::Arc<InputRing>,
    stroke: StrokeTracker,
    flood: FloodFiller,
    next_stamp_handle: u32,

    gravity_x: f32,
    gravity_y: f32,
    ambient_temperature: f32,
    particle_count: u32,
    tick: u64,

    perf_enabled: bool,
    perf_stats: PerfStats,
}

#[wasm_bindgen]
impl World {
    /// Creates a new world with the built-in baseline content pack
    /// already compiled in, so a freshly created World is immediately
    /// usable without requiring `load_bundle` first.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Self {
        let registry = ContentRegistry::compile_packs(&baseline_packs())
            .expect("baseline content pack must always compile");

        Self {
            grid: Grid::new(width, height),
            chunks: ChunkGrid::new(width, height),
            registry,
            behaviors: BehaviorRegistry::new(),

            ring: std::sync::Arc::new(InputRing::new(DEFAULT_RING_CAPACITY)),
            stroke: StrokeTracker::new(),
            flood: FloodFiller::new(width, height),
            next_stamp_handle: 0,

            gravity_x: 0.0,
            gravity_y: 1.0,
            ambient_temperature: 20.0,
            particle_count: 0,
            tick: 0,

            perf_enabled: false,
            perf_stats: PerfStats::default(),
        }
    }

    pub fn width(&self) -> u32 { self.grid.width() }

    pub fn height(&self) -> u32 { self.grid.height() }

    pub fn particle_count(&self) -> u32 { self.particle_count }

    pub fn tick(&self) -> u64 { self.tick }

    /// Enable or disable per-step perf metrics (adds timing overhead when enabled).
    pub fn enable_perf_metrics(&mut self, enabled: bool) {
        self.perf_enabled = enabled;
    }

    /// Gets the last step's perf snapshot (zeros when perf is disabled).
    pub fn get_perf_stats(&self) -> PerfStats {
        self.perf_stats.clone()
    }

    pub fn set_gravity(&mut self, x: f32, y: f32) {
        self.gravity_x = x;
        self.gravity_y = y;
    }

    pub fn set_ambient_temperature(&mut self, temp: f32) {
        self.ambient_temperature = temp;
    }

    pub fn get_ambient_temperature(&self) -> f32 {
        self.ambient_temperature
    }

    /// Adds a single particle at `(x, y)`. Fails silently (returns
    /// `false`) on out-of-range coordinates, an unknown element, or an
    /// already-occupied cell.
    pub fn add_particle(&mut self, x: u32, y: u32, element: u8) -> bool {
        let added = brush::add_particle(&mut self.grid, &mut self.chunks, &self.registry, x, y, element, self.tick);
        if added { self.particle_count += 1; }
        added
    }

    /// Adds particles in a circular footprint (brush default shape).
    pub fn add_particles_in_radius(&mut self, cx: i32, cy: i32, radius: i32, element: u8) {
        let delta = brush::add_in_radius(&mut self.grid, &mut self.chunks, &self.registry, cx, cy, radius, element, BrushShape::Circle, self.tick);
        self.apply_particle_delta(delta);
    }

    pub fn remove_particle(&mut self, x: u32, y: u32) -> bool {
        let removed = brush::remove_particle(&mut self.grid, &mut self.chunks, x, y);
        if removed && self.particle_count > 0 { self.particle_count -= 1; }
        removed
    }

    pub fn remove_particles_in_radius(&mut self, cx: i32, cy: i32, radius: i32) {
        let delta = brush::erase_in_radius(&mut self.grid, &mut self.chunks, cx, cy, radius, BrushShape::Circle);
        self.apply_particle_delta(delta);
    }

    /// Paints or erases at `(x, y)` with line interpolation from the
    /// previous call in the same stroke (§4.11). `square` selects the
    /// square brush footprint instead of the default circle.
    pub fn brush_stroke(&mut self, x: i32, y: i32, radius: i32, element: u8, square: bool, add: bool) {
        let shape = if square { BrushShape::Square } else { BrushShape::Circle };
        let delta = self.stroke.stroke_to(&mut self.grid, &mut self.chunks, &self.registry, x, y, radius, element, shape, add, self.tick);
        self.apply_particle_delta(delta);
    }

    /// Ends the current brush stroke, so the next `brush_stroke` call
    /// starts a fresh dab instead of interpolating from the old position.
    pub fn end_stroke(&mut self) {
        self.stroke.end_stroke();
    }

    /// Flood-fills the 4-connected region at `(x, y)` with `element`.
    /// A no-op (returns 0, touches nothing) if `element` already matches
    /// the region's type.
    pub fn flood_fill(&mut self, x: u32, y: u32, element: u8) -> usize {
        if !self.grid.in_bounds(x as i32, y as i32) { return 0; }
        let source = self.grid.get_type_u(x, y);
        if source == element { return 0; }

        let changed = self.flood.fill(&mut self.grid, &mut self.chunks, &self.registry, x, y, element, self.tick);
        if changed > 0 {
            if source == EL_EMPTY {
                self.particle_count += changed as u32;
            } else if element == EL_EMPTY {
                self.particle_count = self.particle_count.saturating_sub(changed as u32);
            }
        }
        changed
    }

    /// Stamps a rectangular rigid shape into the grid, overwriting
    /// whatever is already there. Returns an opaque handle; no further
    /// rigid-body integration happens in the core (§9).
    pub fn spawn_rigid_body(&mut self, x: i32, y: i32, w: i32, h: i32, element_id: u8) -> u32 {
        let (handle, delta) = brush::stamp_rect(&mut self.grid, &mut self.chunks, &self.registry, x, y, w, h, element_id, self.tick, &mut self.next_stamp_handle);
        self.apply_particle_delta(delta);
        handle
    }

    /// Stamps a filled disc into the grid, overwriting whatever is
    /// already there.
    pub fn spawn_rigid_circle(&mut self, x: i32, y: i32, radius: i32, element_id: u8) -> u32 {
        let (handle, delta) = brush::stamp_disk(&mut self.grid, &mut self.chunks, &self.registry, x, y, radius, element_id, self.tick, &mut self.next_stamp_handle);
        self.apply_particle_delta(delta);
        handle
    }

    /// Clears every cell and chunk-tracking state, resetting the tick
    /// counter to zero.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.chunks.reset();
        self.particle_count = 0;
        self.tick = 0;
    }

    /// Advances the simulation by one tick (§2's control flow): drains
    /// the input ring, resets per-cell `updated` flags, sweeps every
    /// active chunk in gravity/parity order dispatching behaviors and
    /// reactions, runs the thermal pass on even ticks, then advances the
    /// tick counter.
    pub fn step(&mut self) {
        let perf_on = self.perf_enabled;
        let timer = if perf_on { Some(PerfTimer::start()) } else { None };

        self.drain_ring();

        self.grid.reset_updated();

        let order = sweep_order(self.gravity_y, self.tick);
        let (chunks_x, chunks_y) = self.chunks.dimensions();

        let mut reactions_applied = 0u32;

        for cy in order.row_range(chunks_y) {
            for cx in order.col_range(chunks_x) {
                if !self.chunks.should_process(cx, cy) { continue; }

                let mut had_movement = false;
                let start_x = cx * CHUNK_SIZE;
                let start_y = cy * CHUNK_SIZE;
                let end_x = (start_x + CHUNK_SIZE).min(self.grid.width());
                let end_y = (start_y + CHUNK_SIZE).min(self.grid.height());

                let row_iter: Box<dyn Iterator<Item = u32>> = match order.rows {
                    crate::sweep::RowDir::BottomToTop => Box::new((start_y..end_y).rev()),
                    crate::sweep::RowDir::TopToBottom => Box::new(start_y..end_y),
                };

                for y in row_iter {
                    let col_iter: Box<dyn Iterator<Item = u32>> = match order.cols {
                        crate::sweep::ColDir::LeftToRight => Box::new(start_x..end_x),
                        crate::sweep::ColDir::RightToLeft => Box::new((start_x..end_x).rev()),
                    };
                    for x in col_iter {
                        if self.process_cell(x, y, &mut reactions_applied) {
                            had_movement = true;
                        }
                    }
                }

                self.chunks.end_chunk_update(cx, cy, had_movement);
            }
        }

        if self.tick & 1 == 0 {
            let mut rng = cell_rng_seed(self.tick, 0, 0);
            let mut phase_changes = 0u32;
            process_temperature(&mut self.grid, &mut self.chunks, &self.registry, self.ambient_temperature, self.tick, &mut rng, &mut phase_changes);
        }

        self.tick += 1;

        if let Some(t) = timer {
            self.perf_stats = PerfStats {
                tick_ms: t.elapsed_ms(),
                particle_count: self.particle_count,
                active_chunks: self.chunks.active_chunk_count() as u32,
                sleeping_chunks: self.chunks.total_chunks() as u32 - self.chunks.active_chunk_count() as u32,
                reactions_applied,
            };
        }
    }

    pub fn types_ptr(&self) -> *const u8 { self.grid.types_ptr() }
    pub fn colors_ptr(&self) -> *const u32 { self.grid.colors_ptr() }
    pub fn temperature_ptr(&self) -> *const f32 { self.grid.temperature_ptr() }
    pub fn framebuffer_len(&self) -> usize { self.grid.size() }

    /// Rebuilds the grid at a new size, preserving the overlapping
    /// sub-rectangle of cells. Any previously returned framebuffer
    /// pointers are invalidated by this call (§5, §9).
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.grid.resize(new_width, new_height);
        self.chunks = ChunkGrid::new(new_width, new_height);
        self.flood.resize(new_width, new_height);

        self.particle_count = 0;
        for y in 0..new_height {
            for x in 0..new_width {
                if !self.grid.is_empty(x as i32, y as i32) {
                    self.chunks.add_particle(x, y);
                    self.particle_count += 1;
                }
            }
        }

        log::info!("world resized to {}x{}", new_width, new_height);
    }

    /// A manifest listing of the currently compiled elements, for
    /// authoring-tool introspection (§10.5).
    pub fn manifest_json(&self) -> String {
        self.registry.manifest_json()
    }

    /// Packed `u8[width*height]` of cell types only -- colors, lifetimes,
    /// and temperatures are not part of a snapshot (§6).
    pub fn snapshot(&self) -> Vec<u8> {
        self.grid.types.clone()
    }

    /// JS-facing entry point for replacing the compiled content bundle
    /// (§6 `loadBundle`). Rust callers use [`World::load_bundle`] on the
    /// plain `impl` block below for an `EngineError` instead of a
    /// stringified `JsValue`.
    #[wasm_bindgen(js_name = loadBundle)]
    pub fn load_bundle_js(&mut self, json: &str) -> Result<(), JsValue> {
        self.load_bundle(json).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// JS-facing entry point for [`World::load_snapshot`] (§6 `loadSnapshot`).
    #[wasm_bindgen(js_name = loadSnapshot)]
    pub fn load_snapshot_js(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        self.load_snapshot(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl World {
    fn apply_particle_delta(&mut self, delta: i32) {
        if delta >= 0 {
            self.particle_count += delta as u32;
        } else {
            self.particle_count = self.particle_count.saturating_sub((-delta) as u32);
        }
    }

    /// Drains the shared input ring, clearing stroke-interpolation state
    /// first if an overflow occurred since the last tick (§5, §9).
    fn drain_ring(&mut self) {
        if self.ring.take_overflow() {
            log::warn!("input ring overflow; stroke interpolation reset");
            self.stroke.end_stroke();
        }

        for event in self.ring.drain() {
            match event {
                BrushEvent::EndStroke => self.stroke.end_stroke(),
                BrushEvent::Paint { x, y, element, radius } => {
                    let add = element != EL_EMPTY;
                    let delta = self.stroke.stroke_to(
                        &mut self.grid, &mut self.chunks, &self.registry,
                        x, y, radius as i32, element, BrushShape::Circle, add, self.tick,
                    );
                    self.apply_particle_delta(delta);
                }
            }
        }
    }

    /// A clonable handle onto this world's shared input ring, for a
    /// producer thread to push brush events into concurrently with the
    /// engine thread's `step` (§5's cross-thread seam).
    pub fn ring_handle(&self) -> std::sync::Arc<InputRing> {
        std::sync::Arc::clone(&self.ring)
    }

    /// Replaces the compiled content registry with one parsed from a
    /// bundle JSON string (§6 `loadBundle`). Loading is the one fallible
    /// entry point into an otherwise-infallible tick loop (§7).
    pub fn load_bundle(&mut self, json: &str) -> EngineResult<()> {
        match ContentRegistry::from_bundle_json(json) {
            Ok(registry) => {
                log::info!("loaded content bundle with {} elements", registry.element_count());
                self.registry = registry;
                Ok(())
            }
            Err(err) => {
                log::error!("content bundle load failed: {err}");
                Err(err)
            }
        }
    }

    /// Loads a type-only snapshot produced by `snapshot()`, rebuilding
    /// colors, lifetimes, and temperatures to each cell's element
    /// defaults. Fails if the byte length doesn't match `width*height`;
    /// the world is left unchanged on failure (§6, §7).
    pub fn load_snapshot(&mut self, bytes: &[u8]) -> EngineResult<()> {
        let expected = self.grid.size();
        if bytes.len() != expected {
            return Err(EngineError::SnapshotMismatch { expected, got: bytes.len() });
        }

        self.chunks.reset();
        self.particle_count = 0;

        for idx in 0..expected {
            let (x, y) = self.grid.coords(idx);
            let t: ElementId = bytes[idx];

            if t == EL_EMPTY || !self.registry.is_valid_element_id(t) {
                self.grid.clear_cell(x, y);
                continue;
            }

            let props = self.registry.props(t).expect("validated by is_valid_element_id above");
            self.grid.set_particle(x, y, t, props.color, props.lifetime, props.default_temp);
            self.chunks.add_particle(x, y);
            self.particle_count += 1;
        }

        Ok(())
    }

    /// Processes one cell in sweep order: lifetime decrement, behavior
    /// dispatch, then one reaction attempt (§4.3, §4.9). Returns whether
    /// the cell (or its destination, after a swap) changed this tick, so
    /// the caller can feed the chunk's sleep bookkeeping.
    fn process_cell(&mut self, x: u32, y: u32, reactions_applied: &mut u32) -> bool {
        let etype = self.grid.get_type_u(x, y);
        if etype == EL_EMPTY { return false; }
        if self.grid.is_updated(x, y) { return false; }

        self.grid.set_updated(x, y, true);

        let life = self.grid.get_life(x, y);
        if life > 0 {
            let remaining = life - 1;
            self.grid.set_life(x, y, remaining);
            if remaining == 0 {
                self.grid.clear_cell(x, y);
                self.chunks.remove_particle(x, y);
                self.chunks.mark_dirty(x, y);
                if self.particle_count > 0 { self.particle_count -= 1; }
                return true;
            }
        }

        let mut rng = cell_rng_seed(self.tick, x, y);
        let category: CategoryId = self.registry.props(etype).map(|p| p.category).unwrap_or(CAT_SOLID);

        let behavior_delta = {
            let mut ctx = UpdateContext {
                grid: &mut self.grid,
                chunks: &mut self.chunks,
                registry: &self.registry,
                x,
                y,
                tick: self.tick,
                gravity_x: self.gravity_x,
                gravity_y: self.gravity_y,
                ambient_temp: self.ambient_temperature,
                rng: &mut rng,
                particle_delta: 0,
            };
            self.behaviors.update(category, &mut ctx);
            ctx.particle_delta
        };
        self.apply_particle_delta(behavior_delta);

        let mut moved = self.grid.get_type_u(x, y) != etype;

        if self.grid.get_type_u(x, y) != EL_EMPTY {
            let mut reaction_delta = 0i32;
            if try_react(&mut self.grid, &mut self.chunks, &self.registry, x, y, self.tick, &mut rng, &mut reaction_delta) {
                *reactions_applied += 1;
                moved = true;
                self.apply_particle_delta(reaction_delta);
            }
        }

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshly_created_world_has_no_particles() {
        let world = World::new(16, 16);
        assert_eq!(world.particle_count(), 0);
        assert_eq!(world.width(), 16);
        assert_eq!(world.height(), 16);
    }

    #[test]
    fn add_particle_increments_count_and_step_advances_tick() {
        let mut world = World::new(8, 8);
        let sand = world.registry.id_by_key("base:sand").unwrap();
        assert!(world.add_particle(3, 0, sand));
        assert_eq!(world.particle_count(), 1);

        world.step();
        assert_eq!(world.tick(), 1);
        // Sand falls one row under positive gravity.
        assert_eq!(world.grid.get_type_u(3, 1), sand);
        assert!(world.grid.is_empty(3, 0));
    }

    #[test]
    fn snapshot_round_trips_types() {
        let mut world = World::new(8, 8);
        let stone = world.registry.id_by_key("base:stone").unwrap();
        world.add_particle(2, 2, stone);
        let snap = world.snapshot();

        let mut other = World::new(8, 8);
        other.load_snapshot(&snap).unwrap();
        assert_eq!(other.grid.get_type_u(2, 2), stone);
        assert_eq!(other.particle_count(), 1);
    }

    #[test]
    fn load_snapshot_rejects_wrong_length() {
        let mut world = World::new(8, 8);
        let err = world.load_snapshot(&[0u8; 10]).unwrap_err();
        matches!(err, EngineError::SnapshotMismatch { expected: 64, got: 10 });
    }

    #[test]
    fn resize_preserves_overlap_and_recomputes_particle_count() {
        let mut world = World::new(8, 8);
        let stone = world.registry.id_by_key("base:stone").unwrap();
        world.add_particle(1, 1, stone);
        world.resize(4, 4);
        assert_eq!(world.grid.get_type_u(1, 1), stone);
        assert_eq!(world.particle_count(), 1);
    }

    #[test]
    fn ring_events_are_applied_before_the_sweep() {
        let mut world = World::new(8, 8);
        let sand = world.registry.id_by_key("base:sand").unwrap();
        let ring = world.ring_handle();
        ring.push_paint(4, 4, sand, 0);

        world.step();
        assert_eq!(world.grid.get_type_u(4, 4), sand);
    }

    #[test]
    fn flood_fill_same_type_is_noop() {
        let mut world = World::new(8, 8);
        let before = world.particle_count();
        let changed = world.flood_fill(0, 0, EL_EMPTY);
        assert_eq!(changed, 0);
        assert_eq!(world.particle_count(), before);
    }

    /// Regression test: `particle_count()` must track actual grid
    /// occupancy exactly, including through reactions that destroy and
    /// spawn particles (acid+stone -> empty+empty+smoke, fire+water ->
    /// empty+steam) and bio growth (plant consumes water, grows a new
    /// plant cell). Previously only brush ops and lifetime death kept the
    /// counter in sync; reactions and create/destroy behaviors silently
    /// drifted it.
    #[test]
    fn particle_count_matches_actual_occupancy_through_reactions() {
        let mut world = World::new(16, 16);
        let acid = world.registry.id_by_key("base:acid").unwrap();
        let stone = world.registry.id_by_key("base:stone").unwrap();
        let fire = world.registry.id_by_key("base:fire").unwrap();
        let water = world.registry.id_by_key("base:water").unwrap();
        let plant = world.registry.id_by_key("base:plant").unwrap();
        let dirt = world.registry.id_by_key("base:dirt").unwrap();
        world.set_gravity(0.0, 0.0);

        // A grid of alternating reactive pairs, walled by stone so nothing
        // falls or disperses away -- the only thing that can happen here
        // is reactions and plant growth firing.
        for x in 0..16u32 {
            world.add_particle(x, 0, stone);
            world.add_particle(x, 15, stone);
        }
        for y in 0..16u32 {
            world.add_particle(0, y, stone);
            world.add_particle(15, y, stone);
        }
        world.add_particle(3, 3, acid);
        world.add_particle(3, 4, stone);
        world.add_particle(6, 3, fire);
        world.add_particle(6, 4, water);
        world.add_particle(9, 3, plant);
        world.add_particle(9, 5, dirt);
        world.add_particle(10, 4, water);

        for _ in 0..300 {
            world.step();
            let snap = world.snapshot();
            let actual = snap.iter().filter(|&&t| t != EL_EMPTY).count() as u32;
            assert_eq!(world.particle_count(), actual, "particle_count drifted from actual grid occupancy");
        }
    }
}
