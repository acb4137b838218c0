//! BioBehavior - Seed falls like a powder and germinates on contact with
//! dirt/sand + water; Plant grows stochastically toward a nearby water
//! cell it consumes, and dies in heat (§4.8).
//!
//! Grounded on the teacher's `behaviors/plant.rs` near-verbatim: same fixed
//! `SEED_DENSITY = 1100.0` constant (independent of any pack-declared
//! density, per the Open Question pinned in DESIGN.md), same 7x7
//! (`radius = 3`) water search window, same 0.6/0.2/0.2 grow-direction
//! weights, same temperature gates (`< 0` halts, `> 150` kills).
//!
//! "Dirt", "sand" and "water" are looked up by their base-pack key rather
//! than hardcoded IDs, since elements are pack-compiled now; a world built
//! from a bundle that omits `base:water` simply never germinates or grows
//! (no panic -- lookups return `None` and the behavior is a no-op).

use super::{get_random_dir, xorshift32, Behavior, UpdateContext};
use crate::elements::{BehaviorKind, CategoryId, ElementId, CAT_LIQUID, EL_EMPTY};

const SEED_DENSITY: f32 = 1100.0;
const GROW_OPTIONS: [(i32, i32, f32); 3] = [(0, -1, 0.6), (-1, -1, 0.2), (1, -1, 0.2)];

pub struct BioBehavior;

impl BioBehavior {
    pub fn new() -> Self {
        Self
    }

    fn water_id(&self, ctx: &UpdateContext) -> Option<ElementId> {
        ctx.registry.id_by_key("base:water")
    }

    fn is_germination_bed(&self, ctx: &UpdateContext, id: ElementId) -> bool {
        Some(id) == ctx.registry.id_by_key("base:dirt") || Some(id) == ctx.registry.id_by_key("base:sand")
    }

    fn can_seed_displace(&self, ctx: &UpdateContext, x: i32, y: i32) -> bool {
        if !ctx.grid.in_bounds(x, y) { return false; }
        let target_type = ctx.grid.get_type(x, y);
        if target_type == EL_EMPTY { return true; }

        let Some(props) = ctx.registry.props(target_type) else { return false };
        let target_cat: CategoryId = props.category;
        target_cat == CAT_LIQUID && SEED_DENSITY > props.density
    }

    fn find_water(&self, ctx: &UpdateContext, cx: i32, cy: i32, radius: i32) -> Option<(i32, i32)> {
        let water = self.water_id(ctx)?;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let nx = cx + dx;
                let ny = cy + dy;
                if ctx.grid.in_bounds(nx, ny) && ctx.grid.get_type(nx, ny) == water {
                    return Some((nx, ny));
                }
            }
        }
        None
    }

    fn transform_to_plant(&self, ctx: &mut UpdateContext, x: i32, y: i32, plant_id: ElementId) {
        let seed = ((x as u32).wrapping_mul(11).wrapping_add((y as u32).wrapping_mul(17)).wrapping_add(ctx.tick as u32) & 31) as u8;
        let Some(props) = ctx.registry.props(plant_id) else { return };
        let color = ctx.registry.color_with_variation(plant_id, seed).unwrap_or(props.color);
        ctx.set_particle_dirty(x as u32, y as u32, plant_id, color, props.lifetime, props.default_temp);
    }

    fn process_seed(&self, ctx: &mut UpdateContext, plant_id: ElementId) {
        let x = ctx.x;
        let y = ctx.y;
        let xi = x as i32;
        let yi = y as i32;

        if self.can_seed_displace(ctx, xi, yi + 1) {
            ctx.swap(x, y, x, y + 1);
            return;
        }

        let (dx1, dx2) = get_random_dir(ctx.tick, x);
        if self.can_seed_displace(ctx, xi + dx1, yi + 1) {
            ctx.swap(x, y, (xi + dx1) as u32, y + 1);
            return;
        }
        if self.can_seed_displace(ctx, xi + dx2, yi + 1) {
            ctx.swap(x, y, (xi + dx2) as u32, y + 1);
            return;
        }

        let below_type = ctx.grid.get_type(xi, yi + 1);
        if self.is_germination_bed(ctx, below_type) {
            let has_water = self.find_water(ctx, xi, yi, 1).is_some();
            if has_water {
                self.transform_to_plant(ctx, xi, yi, plant_id);
            }
        }
    }

    fn process_plant(&self, ctx: &mut UpdateContext) {
        let x = ctx.x;
        let y = ctx.y;
        let xi = x as i32;
        let yi = y as i32;
        let plant_id = ctx.grid.get_type(xi, yi);

        let temp = ctx.grid.get_temp(xi, yi);
        if temp < 0.0 { return; }
        if temp > 150.0 {
            ctx.clear_cell_dirty(x, y);
            return;
        }

        let rand = xorshift32(ctx.rng);
        if (rand % 100) >= 5 { return; }

        let can_grow_up = ctx.grid.is_empty(xi, yi - 1);
        if !can_grow_up {
            let rand2 = xorshift32(ctx.rng);
            if (rand2 % 100) >= 20 { return; }
        }

        if let Some((wx, wy)) = self.find_water(ctx, xi, yi, 3) {
            ctx.clear_cell_dirty(wx as u32, wy as u32);

            let rand3 = xorshift32(ctx.rng);
            let rand_f = (rand3 % 1000) as f32 / 1000.0;

            let mut cumulative = 0.0;
            let mut chosen = GROW_OPTIONS[0];
            for opt in GROW_OPTIONS.iter() {
                cumulative += opt.2;
                if rand_f < cumulative {
                    chosen = *opt;
                    break;
                }
            }

            let gx = xi + chosen.0;
            let gy = yi + chosen.1;
            if ctx.grid.is_empty(gx, gy) {
                self.transform_to_plant(ctx, gx, gy, plant_id);
            }
        }
    }
}

impl Default for BioBehavior {
    fn default() -> Self { Self::new() }
}

impl Behavior for BioBehavior {
    fn update(&self, ctx: &mut UpdateContext) {
        let element = ctx.grid.get_type(ctx.x as i32, ctx.y as i32);
        if element == EL_EMPTY { return; }

        match ctx.registry.behavior_kind(element) {
            BehaviorKind::BioSeed => {
                let Some(plant_id) = ctx.registry.id_by_key("base:plant") else { return };
                self.process_seed(ctx, plant_id);
            }
            BehaviorKind::BioPlant => self.process_plant(ctx),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::ChunkGrid;
    use crate::content::{baseline_packs, ContentRegistry};
    use crate::grid::Grid;

    /// Regression test: germination transforms a seed into a plant *in
    /// place* -- the cell was already occupied, so this must not be
    /// counted as a new particle. Double-counting it would mean a chunk
    /// that later genuinely empties out can never reach the `Empty` state
    /// the sleep scheduler relies on (spec §4.2).
    #[test]
    fn germination_transform_does_not_change_particle_counts() {
        let registry = ContentRegistry::compile_packs(&baseline_packs()).unwrap();
        let seed = registry.id_by_key("base:seed").unwrap();
        let dirt = registry.id_by_key("base:dirt").unwrap();
        let water = registry.id_by_key("base:water").unwrap();
        let plant = registry.id_by_key("base:plant").unwrap();
        let stone = registry.id_by_key("base:stone").unwrap();

        let mut grid = Grid::new(4, 4);
        let mut chunks = ChunkGrid::new(4, 4);

        // Seed at (1,1), dirt bed directly below at (1,2) (blocks falling
        // and satisfies the germination-bed check), stone walling off both
        // diagonal escapes at (0,2)/(2,2) so the seed can't roll away
        // instead, water at (0,1) within the 3x3 germination search window.
        grid.set_type(1, 1, seed);
        grid.set_type(1, 2, dirt);
        grid.set_type(0, 2, stone);
        grid.set_type(2, 2, stone);
        grid.set_type(0, 1, water);
        chunks.add_particle(1, 1);
        chunks.add_particle(1, 2);
        chunks.add_particle(0, 2);
        chunks.add_particle(2, 2);
        chunks.add_particle(0, 1);

        let count_before = chunks.particle_count_in(0, 0);

        let mut rng = 7u32;
        let mut ctx = UpdateContext {
            grid: &mut grid,
            chunks: &mut chunks,
            registry: &registry,
            x: 1,
            y: 1,
            tick: 0,
            gravity_x: 0.0,
            gravity_y: 1.0,
            ambient_temp: 20.0,
            rng: &mut rng,
            particle_delta: 0,
        };

        BioBehavior::new().process_seed(&mut ctx, plant);
        let delta = ctx.particle_delta;

        assert_eq!(grid.get_type_u(1, 1), plant, "seed should germinate in place");
        assert_eq!(delta, 0, "in-place transform must not change the particle count");
        assert_eq!(chunks.particle_count_in(0, 0), count_before, "chunk particle count must stay the same");
    }
}
