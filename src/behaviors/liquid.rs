//! LiquidBehavior - fall, then disperse (§4.6).
//!
//! Grounded on the teacher's `behaviors/liquid.rs` `try_move`/`scan_line`
//! almost verbatim. The teacher couples dispersion to a separate velocity-
//! physics system (`moving_in_gravity_dir` early return); that system is
//! dropped here (out of scope per spec's Non-goals), so this behavior does
//! its own straight/diagonal fall before falling back to dispersion.

use super::{get_random_dir, xorshift32, Behavior, UpdateContext};
use crate::elements::{CategoryId, CAT_GAS, CAT_LIQUID, EL_EMPTY};

struct ScanResult {
    found: bool,
    x: i32,
    has_cliff: bool,
}

pub struct LiquidBehavior;

impl LiquidBehavior {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn try_fall(&mut self, ctx: &mut UpdateContext, from_x: u32, from_y: u32, to_x: i32, to_y: i32, my_density: f32) -> bool {
        if !ctx.grid.in_bounds(to_x, to_y) { return false; }

        let target_type = ctx.grid.get_type(to_x, to_y);
        if target_type == EL_EMPTY {
            ctx.swap(from_x, from_y, to_x as u32, to_y as u32);
            return true;
        }

        let Some(props) = ctx.registry.props(target_type) else { return false };
        let t_cat: CategoryId = props.category;
        if (t_cat == CAT_LIQUID || t_cat == CAT_GAS) && my_density > props.density {
            ctx.swap(from_x, from_y, to_x as u32, to_y as u32);
            return true;
        }

        false
    }

    #[inline]
    fn scan_line(&self, ctx: &UpdateContext, start_x: i32, y: i32, dir: i32, range: i32, gravity_y: i32, my_density: f32) -> ScanResult {
        let mut best_x = start_x;
        let mut found = false;
        let mut has_cliff = false;

        for i in 1..=range {
            let tx = start_x + (dir * i);
            if !ctx.grid.in_bounds(tx, y) { break; }

            let target_type = ctx.grid.get_type(tx, y);

            if target_type == EL_EMPTY {
                best_x = tx;
                found = true;

                let below_y = y + gravity_y;
                if ctx.grid.in_bounds(tx, below_y) && ctx.grid.get_type(tx, below_y) == EL_EMPTY {
                    has_cliff = true;
                    break;
                }
                continue;
            }

            let Some(props) = ctx.registry.props(target_type) else { break };
            let t_cat: CategoryId = props.category;
            if (t_cat == CAT_LIQUID || t_cat == CAT_GAS) && my_density > props.density {
                best_x = tx;
                found = true;
            }
            break;
        }

        ScanResult { found, x: best_x, has_cliff }
    }
}

impl Default for LiquidBehavior {
    fn default() -> Self { Self::new() }
}

impl Behavior for LiquidBehavior {
    fn update(&self, ctx: &mut UpdateContext) {
        let x = ctx.x;
        let y = ctx.y;
        let xi = x as i32;
        let yi = y as i32;

        let element = ctx.grid.get_type(xi, yi);
        let Some(props) = ctx.registry.props(element) else { return };
        let density = props.density;
        let range = if props.dispersion > 0 { props.dispersion as i32 } else { 5 };

        let gy = if ctx.gravity_y > 0.0 { 1 } else if ctx.gravity_y < 0.0 { -1 } else { 0 };
        let gy = if gy == 0 { 1 } else { gy };

        let mut this = LiquidBehavior;

        if this.try_fall(ctx, x, y, xi, yi + gy, density) { return; }

        let (dx1, dx2) = get_random_dir(ctx.tick, x);
        if this.try_fall(ctx, x, y, xi + dx1, yi + gy, density) { return; }
        if this.try_fall(ctx, x, y, xi + dx2, yi + gy, density) { return; }

        let left_target = this.scan_line(ctx, xi, yi, -1, range, gy, density);
        let right_target = this.scan_line(ctx, xi, yi, 1, range, gy, density);

        let target_x = if left_target.found && right_target.found {
            if left_target.has_cliff && !right_target.has_cliff {
                left_target.x
            } else if !left_target.has_cliff && right_target.has_cliff {
                right_target.x
            } else {
                let rand = xorshift32(ctx.rng);
                if rand & 1 == 0 { left_target.x } else { right_target.x }
            }
        } else if left_target.found {
            left_target.x
        } else if right_target.found {
            right_target.x
        } else {
            xi
        };

        if target_x != xi {
            ctx.swap(x, y, target_x as u32, y);
        }
    }
}
