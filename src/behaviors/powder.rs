//! PowderBehavior - straight fall, then diagonal roll when blocked (§4.5).
//!
//! Grounded on the teacher's `behaviors/powder.rs`, which only implements
//! the diagonal-roll half (vertical falling is delegated to a separate
//! velocity-based physics system there). That system is out of scope here
//! (spec's Non-goals exclude true rigid-body/Newtonian physics), so the
//! straight-fall case is folded back into this one behavior.

use super::{get_random_dir, Behavior, UpdateContext};
use crate::elements::{CategoryId, CAT_GAS, CAT_LIQUID};

pub struct PowderBehavior;

impl PowderBehavior {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn can_displace(&self, ctx: &UpdateContext, x: i32, y: i32, my_density: f32) -> bool {
        if !ctx.grid.in_bounds(x, y) { return false; }

        let target_type = ctx.grid.get_type(x, y);
        if ctx.registry.props(target_type).is_none() { return false; }
        if target_type == crate::elements::EL_EMPTY { return true; }

        let target_cat: CategoryId = ctx.registry.props(target_type).unwrap().category;
        if target_cat != CAT_LIQUID && target_cat != CAT_GAS { return false; }

        my_density > ctx.registry.props(target_type).unwrap().density
    }
}

impl Default for PowderBehavior {
    fn default() -> Self { Self::new() }
}

impl Behavior for PowderBehavior {
    fn update(&self, ctx: &mut UpdateContext) {
        let x = ctx.x;
        let y = ctx.y;
        let xi = x as i32;
        let yi = y as i32;

        let element = ctx.grid.get_type(xi, yi);
        let Some(props) = ctx.registry.props(element) else { return };
        let my_density = props.density;

        let gx = if ctx.gravity_x > 0.0 { 1 } else if ctx.gravity_x < 0.0 { -1 } else { 0 };
        let gy = if ctx.gravity_y > 0.0 { 1 } else if ctx.gravity_y < 0.0 { -1 } else { 0 };
        let gy = if gy == 0 { 1 } else { gy };
        let _ = gx;

        // Straight fall.
        let ty = yi + gy;
        if self.can_displace(ctx, xi, ty, my_density) {
            ctx.swap(x, y, xi as u32, ty as u32);
            return;
        }

        // Blocked below - roll diagonally.
        let (dx1, dx2) = get_random_dir(ctx.tick, x);

        let tx1 = xi + dx1;
        if self.can_displace(ctx, tx1, ty, my_density) {
            ctx.swap(x, y, tx1 as u32, ty as u32);
            return;
        }

        let tx2 = xi + dx2;
        if self.can_displace(ctx, tx2, ty, my_density) {
            ctx.swap(x, y, tx2 as u32, ty as u32);
        }
    }
}
