//! EnergyBehavior - fire jitter, spark/electricity no-ops (§4.8).
//!
//! Grounded on the teacher's `behaviors/energy.rs` `update_fire` (rise with
//! a handful of candidate directions, first empty one wins) simplified to
//! the spec's exact contract: pick randomly among up/up-left/up-right, one
//! attempt, no fallback scan. Spark and electricity never move -- they are
//! consumed purely by lifetime and by reactions with conductors/water.

use super::{xorshift32, Behavior, UpdateContext};
use crate::elements::{BehaviorKind, EL_EMPTY};

pub struct EnergyBehavior;

impl EnergyBehavior {
    pub fn new() -> Self {
        Self
    }

    fn update_fire(&self, ctx: &mut UpdateContext) {
        let x = ctx.x;
        let y = ctx.y;
        let xi = x as i32;
        let yi = y as i32;

        let candidates = [(0, -1), (-1, -1), (1, -1)];
        let pick = (xorshift32(ctx.rng) as usize) % candidates.len();
        let (dx, dy) = candidates[pick];

        let tx = xi + dx;
        let ty = yi + dy;
        if ctx.grid.is_empty(tx, ty) {
            ctx.swap(x, y, tx as u32, ty as u32);
        }
    }
}

impl Default for EnergyBehavior {
    fn default() -> Self { Self::new() }
}

impl Behavior for EnergyBehavior {
    fn update(&self, ctx: &mut UpdateContext) {
        let element = ctx.grid.get_type(ctx.x as i32, ctx.y as i32);
        if element == EL_EMPTY { return; }

        match ctx.registry.behavior_kind(element) {
            BehaviorKind::EnergyFire => self.update_fire(ctx),
            BehaviorKind::EnergySpark | BehaviorKind::EnergyElectricity => {}
            _ => {}
        }
    }
}
