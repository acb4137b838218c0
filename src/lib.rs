//! Particula Engine - falling-sand cellular-automaton physics engine.
//!
//! A single owning `World` wraps the SoA grid, chunk scheduler, compiled
//! content registry, and the tick loop (§2). Dependency order, leaves first:
//!
//! - `elements`    - the closed set of categories/flags/behavior kinds and
//!                   the runtime `ElementProps`/`Reaction` shapes.
//! - `content`     - pack JSON schema, deterministic multi-pack compiler,
//!                   the compiled `ContentRegistry` lookup surface.
//! - `grid`        - SoA cell storage, index math, swap, framebuffer pointers.
//! - `chunks`      - 32x32 dirty/sleep tracking that gates the sweep.
//! - `sweep`       - gravity-aware, tick-parity-alternating iteration order.
//! - `behaviors`   - per-category update functions (powder/liquid/gas/
//!                   energy/utility/bio).
//! - `reactions`   - post-movement bilateral reaction LUT lookup.
//! - `temperature` - stochastic neighbor heat exchange and phase changes.
//! - `brush`       - paint/erase brushes, flood fill, rigid stamps.
//! - `ring`        - lock-free SPSC input ring for the cross-thread seam.
//! - `error`       - the engine's `thiserror` error taxonomy.
//! - `world`       - orchestration: owns everything above, drives `step`.

mod behaviors;
mod brush;
mod chunks;
mod content;
mod elements;
mod error;
mod grid;
mod reactions;
mod ring;
mod sweep;
mod temperature;
mod world;

pub use content::{baseline_packs, compile, CompiledBundle, ContentRegistry, Pack, PackManifest};
pub use elements::{CategoryId, ElementId, EL_EMPTY};
pub use error::{EngineError, EngineResult};
pub use ring::{BrushEvent, InputRing};
pub use world::{PerfStats, World};

use wasm_bindgen::prelude::*;

/// Installs a panic hook that forwards Rust panics to the browser console
/// instead of an opaque "unreachable executed" trap. A host shell is
/// expected to call this once before creating any `World` (out of scope
/// here, same seam as the renderer -- §1).
#[wasm_bindgen]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Crate version, mirroring the teacher's wasm-facing `version()` helper.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
