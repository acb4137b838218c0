//! Behaviors - per-category particle update functions (§4.4-§4.8).
//!
//! Grounded on the teacher's `behaviors/mod.rs` almost verbatim: same
//! `UpdateContext`, same `Behavior` trait, same xorshift32/`get_random_dir`
//! helpers, same closed-set category dispatch (O(1), allocation-free, per
//! spec §9's design note). `BehaviorRegistry::update` now also dispatches
//! `CAT_UTILITY` -- the teacher's `world.rs::update_particle_chunked` skips
//! both solid and utility, but spec §4.8 requires Utility/Void and
//! Utility/Clone to run every tick; only solid has genuinely no behavior.

mod bio;
mod energy;
mod gas;
mod liquid;
mod powder;
mod utility;

pub use bio::BioBehavior;
pub use energy::EnergyBehavior;
pub use gas::GasBehavior;
pub use liquid::LiquidBehavior;
pub use powder::PowderBehavior;
pub use utility::UtilityBehavior;

use crate::chunks::ChunkGrid;
use crate::content::ContentRegistry;
use crate::elements::{CategoryId, CAT_BIO, CAT_ENERGY, CAT_GAS, CAT_LIQUID, CAT_POWDER, CAT_UTILITY};
use crate::grid::Grid;

pub struct UpdateContext<'a> {
    pub grid: &'a mut Grid,
    pub chunks: &'a mut ChunkGrid,
    pub registry: &'a ContentRegistry,
    pub x: u32,
    pub y: u32,
    pub tick: u64,
    pub gravity_x: f32,
    pub gravity_y: f32,
    pub ambient_temp: f32,
    pub rng: &'a mut u32,
    /// Net change in live-particle count caused by this cell's dispatch so
    /// far (germination/growth/clone add, void/plant-death remove). The
    /// caller in `world.rs` reads this once after dispatch and folds it
    /// into `World.particle_count` via `apply_particle_delta` -- mirroring
    /// the teacher's `add_particle`/`remove_particle` calls in
    /// `apply_reaction` (examples/EvgeniyGospk-SandBox/packages/engine/src/world.rs).
    pub particle_delta: i32,
}

impl<'a> UpdateContext<'a> {
    /// Swaps two cells and keeps the chunk manager's dirty/wake bookkeeping
    /// in sync -- every behavior move goes through this instead of calling
    /// `grid.swap` directly. A swap never changes occupancy, so the chunk
    /// particle counts and `particle_delta` are untouched.
    pub fn swap(&mut self, x1: u32, y1: u32, x2: u32, y2: u32) {
        self.grid.swap(x1, y1, x2, y2);
        self.chunks.mark_dirty(x1, y1);
        self.chunks.mark_dirty(x2, y2);
        self.chunks.wake_neighbors(x1, y1);
        self.chunks.wake_neighbors(x2, y2);
    }

    /// Clears a cell and keeps chunk/world particle accounting in sync
    /// (void, plant death by heat, water consumed by growth, ...). A no-op
    /// on an already-empty cell.
    pub fn clear_cell_dirty(&mut self, x: u32, y: u32) {
        let was_occupied = !self.grid.is_empty(x as i32, y as i32);
        self.grid.clear_cell(x, y);
        if was_occupied {
            self.chunks.remove_particle(x, y);
            self.particle_delta -= 1;
        }
        self.chunks.wake_neighbors(x, y);
    }

    /// Writes a particle into a cell and keeps chunk/world particle
    /// accounting in sync. Used both for placing into a previously-empty
    /// cell (clone, growth, seed->plant-elsewhere) and for transforming an
    /// already-occupied cell in place (seed->plant germination): only the
    /// former changes occupancy, so the chunk/world particle count is only
    /// bumped when the target started out empty.
    pub fn set_particle_dirty(&mut self, x: u32, y: u32, element: crate::elements::ElementId, color: u32, life: u16, temp: f32) {
        let was_empty = self.grid.is_empty(x as i32, y as i32);
        self.grid.set_particle(x, y, element, color, life, temp);
        if was_empty {
            self.chunks.add_particle(x, y);
            self.particle_delta += 1;
        } else {
            self.chunks.mark_dirty(x, y);
        }
        self.chunks.wake_neighbors(x, y);
    }
}

pub trait Behavior {
    fn update(&self, ctx: &mut UpdateContext);
}

/// `TS: const goLeft = (frame + x) & 1; dx1 = goLeft ? -1 : 1`
#[inline]
pub fn get_random_dir(tick: u64, x: u32) -> (i32, i32) {
    let go_left = ((tick as u32).wrapping_add(x) & 1) == 1;
    if go_left { (-1, 1) } else { (1, -1) }
}

#[inline]
pub fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Derives a fresh xorshift32 seed from `(tick, x, y)` so a cell's
/// randomness this tick is reproducible given the same grid history,
/// without threading a single rng across the whole sweep (§9 "Randomness").
#[inline]
pub fn cell_rng_seed(tick: u64, x: u32, y: u32) -> u32 {
    let mut h = (tick as u32)
        .wrapping_mul(0x9E37_79B1)
        .wrapping_add(x.wrapping_mul(0x85EB_CA77))
        .wrapping_add(y.wrapping_mul(0xC2B2_AE3D));
    h ^= h >> 15;
    h = h.wrapping_mul(0x2545_F491);
    h ^= h >> 13;
    if h == 0 { h = 0x9E37_79B1; }
    h
}

pub struct BehaviorRegistry {
    powder: PowderBehavior,
    liquid: LiquidBehavior,
    gas: GasBehavior,
    energy: EnergyBehavior,
    utility: UtilityBehavior,
    bio: BioBehavior,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            powder: PowderBehavior::new(),
            liquid: LiquidBehavior::new(),
            gas: GasBehavior::new(),
            energy: EnergyBehavior::new(),
            utility: UtilityBehavior::new(),
            bio: BioBehavior::new(),
        }
    }

    pub fn update(&self, category: CategoryId, ctx: &mut UpdateContext) {
        match category {
            CAT_POWDER => self.powder.update(ctx),
            CAT_LIQUID => self.liquid.update(ctx),
            CAT_GAS => self.gas.update(ctx),
            CAT_ENERGY => self.energy.update(ctx),
            CAT_UTILITY => self.utility.update(ctx),
            CAT_BIO => self.bio.update(ctx),
            _ => {} // Solid - no behavior.
        }
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
