//! GasBehavior - inverted liquid: rise, then disperse along the ceiling,
//! looking for "chimneys" instead of waterfalls (§4.7).
//!
//! Grounded on the teacher's `behaviors/gas.rs` `try_rise`/`scan_ceiling`
//! almost verbatim, generalized to take the rise direction from the
//! world's gravity vector (the teacher hardcodes "up") and to read element
//! properties through the compiled [`crate::content::ContentRegistry`]
//! instead of the static `ELEMENT_DATA` table.

use super::{get_random_dir, xorshift32, Behavior, UpdateContext};
use crate::elements::{CategoryId, CAT_SOLID, EL_EMPTY};

struct ScanResult {
    found: bool,
    x: i32,
    has_chimney: bool,
}

pub struct GasBehavior;

impl GasBehavior {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn try_rise(&self, ctx: &mut UpdateContext, from_x: u32, from_y: u32, to_x: i32, to_y: i32, my_density: f32) -> bool {
        if !ctx.grid.in_bounds(to_x, to_y) { return false; }

        let target_type = ctx.grid.get_type(to_x, to_y);
        if target_type == EL_EMPTY {
            ctx.swap(from_x, from_y, to_x as u32, to_y as u32);
            return true;
        }

        let Some(props) = ctx.registry.props(target_type) else { return false };
        if props.category != CAT_SOLID && props.density > my_density {
            ctx.swap(from_x, from_y, to_x as u32, to_y as u32);
            return true;
        }

        false
    }

    #[inline]
    fn scan_ceiling(&self, ctx: &UpdateContext, start_x: i32, y: i32, dir: i32, range: i32, rise_y: i32, my_density: f32) -> ScanResult {
        let mut best_x = start_x;
        let mut found = false;
        let mut has_chimney = false;

        for i in 1..=range {
            let tx = start_x + (dir * i);
            if !ctx.grid.in_bounds(tx, y) { break; }

            let target_type = ctx.grid.get_type(tx, y);

            if target_type == EL_EMPTY {
                best_x = tx;
                found = true;

                let above_y = y + rise_y;
                if ctx.grid.in_bounds(tx, above_y) {
                    let above_type = ctx.grid.get_type(tx, above_y);
                    if above_type == EL_EMPTY {
                        has_chimney = true;
                        break;
                    }
                    if let Some(props) = ctx.registry.props(above_type) {
                        if props.density > my_density {
                            has_chimney = true;
                            break;
                        }
                    }
                }
                continue;
            }

            let Some(props) = ctx.registry.props(target_type) else { break };
            if props.category != CAT_SOLID && props.density > my_density {
                best_x = tx;
                found = true;
            }
            break;
        }

        ScanResult { found, x: best_x, has_chimney }
    }
}

impl Default for GasBehavior {
    fn default() -> Self { Self::new() }
}

impl Behavior for GasBehavior {
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
        let rise_y = -gy;

        let (dx1, dx2) = get_random_dir(ctx.tick, x);

        if self.try_rise(ctx, x, y, xi, yi + rise_y, density) { return; }
        if self.try_rise(ctx, x, y, xi + dx1, yi + rise_y, density) { return; }
        if self.try_rise(ctx, x, y, xi + dx2, yi + rise_y, density) { return; }

        let left_target = self.scan_ceiling(ctx, xi, yi, -1, range, rise_y, density);
        let right_target = self.scan_ceiling(ctx, xi, yi, 1, range, rise_y, density);

        let target_x = if left_target.found && right_target.found {
            if left_target.has_chimney && !right_target.has_chimney {
                left_target.x
            } else if !left_target.has_chimney && right_target.has_chimney {
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
