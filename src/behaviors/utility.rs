//! UtilityBehavior - Void destroys orthogonal neighbors, Clone replicates
//! one neighbor into one empty orthogonal cell per tick (§4.8).
//!
//! The teacher's flat `behaviors/` directory declares a `utility` module
//! that was filtered from the retrieved pack; grounded instead on the
//! newer-generation `systems/behaviors/utility.rs` (`process_void`/
//! `process_clone`, direction-cycling by `frame % 4`), adapted to this
//! crate's `UpdateContext` (`ctx.registry`, `swap`/`clear_cell_dirty`/
//! `set_particle_dirty` helpers instead of `ctx.content` + unchecked access).

use super::{Behavior, UpdateContext};
use crate::elements::{BehaviorKind, ElementId, CAT_UTILITY, EL_EMPTY};

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

pub struct UtilityBehavior;

impl UtilityBehavior {
    pub fn new() -> Self {
        Self
    }

    /// Destroys every non-utility orthogonal neighbor.
    fn process_void(&self, ctx: &mut UpdateContext) {
        let x = ctx.x as i32;
        let y = ctx.y as i32;

        for (dx, dy) in DIRECTIONS.iter() {
            let nx = x + dx;
            let ny = y + dy;
            if !ctx.grid.in_bounds(nx, ny) { continue; }

            let neighbor_type = ctx.grid.get_type(nx, ny);
            if neighbor_type == EL_EMPTY { continue; }

            let kind = ctx.registry.behavior_kind(neighbor_type);
            if kind != BehaviorKind::UtilityVoid && kind != BehaviorKind::UtilityClone {
                ctx.clear_cell_dirty(nx as u32, ny as u32);
            }
        }
    }

    /// Replicates one non-utility orthogonal neighbor into exactly one
    /// empty orthogonal cell, starting the search at direction `tick % 4`.
    fn process_clone(&self, ctx: &mut UpdateContext) {
        let x = ctx.x as i32;
        let y = ctx.y as i32;

        let mut source_type: ElementId = EL_EMPTY;
        for (dx, dy) in DIRECTIONS.iter() {
            let nx = x + dx;
            let ny = y + dy;
            if !ctx.grid.in_bounds(nx, ny) { continue; }

            let neighbor_type = ctx.grid.get_type(nx, ny);
            if neighbor_type == EL_EMPTY { continue; }

            let Some(props) = ctx.registry.props(neighbor_type) else { continue };
            if props.category != CAT_UTILITY {
                source_type = neighbor_type;
                break;
            }
        }

        if source_type == EL_EMPTY { return; }

        let start_dir = (ctx.tick % 4) as usize;
        for i in 0..4 {
            let (dx, dy) = DIRECTIONS[(start_dir + i) % 4];
            let nx = x + dx;
            let ny = y + dy;
            if !ctx.grid.in_bounds(nx, ny) { continue; }
            if !ctx.grid.is_empty(nx, ny) { continue; }

            let seed = ((nx as u32).wrapping_mul(7).wrapping_add((ny as u32).wrapping_mul(13)).wrapping_add(ctx.tick as u32) & 31) as u8;
            let Some(props) = ctx.registry.props(source_type) else { return };
            let color = ctx.registry.color_with_variation(source_type, seed).unwrap_or(props.color);

            ctx.set_particle_dirty(nx as u32, ny as u32, source_type, color, props.lifetime, props.default_temp);
            return;
        }
    }
}

impl Default for UtilityBehavior {
    fn default() -> Self { Self::new() }
}

impl Behavior for UtilityBehavior {
    fn update(&self, ctx: &mut UpdateContext) {
        let element = ctx.grid.get_type(ctx.x as i32, ctx.y as i32);
        if element == EL_EMPTY { return; }

        match ctx.registry.behavior_kind(element) {
            BehaviorKind::UtilityVoid => self.process_void(ctx),
            BehaviorKind::UtilityClone => self.process_clone(ctx),
            _ => {}
        }
    }
}
