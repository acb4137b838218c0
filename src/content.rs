//! Content compiler: pack manifests plus element/reaction definitions
//! (§6 of SPEC_FULL.md, JSON on the wire) merged deterministically into one
//! immutable runtime [`ContentRegistry`].
//!
//! Grounded on `domain/content.rs`'s single-bundle parser for the element/
//! reaction field shapes and the color-variation/chance-to-u8 helpers; the
//! multi-pack merge (ID allocation, override-by-key, reference resolution)
//! is new, since the teacher only ever loads one pre-merged bundle.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::elements::{
    color_with_variation, BehaviorKind, CategoryId, ElementFlags, ElementId, ElementProps,
    PhaseChange, Reaction, CAT_BIO, CAT_ENERGY, CAT_GAS, CAT_LIQUID, CAT_POWDER, CAT_SOLID,
    CAT_UTILITY, EL_EMPTY, FLAG_BIO, FLAG_COLD, FLAG_CONDUCTIVE, FLAG_CORROSIVE, FLAG_ENERGY,
    FLAG_FLAMMABLE, FLAG_GAS, FLAG_HOT, FLAG_IGNORE_GRAVITY, FLAG_LIQUID, FLAG_NONE, FLAG_POWDER,
    FLAG_RIGID, FLAG_SOLID, FLAG_UTILITY, REACTION_LUT_SIZE,
};
use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------
// Wire schema (source packs, §6)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackManifest {
    pub format_version: u32,
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DensityValue {
    Number(f64),
    Text(String),
}

impl DensityValue {
    fn resolve(&self) -> Result<f64, String> {
        match self {
            DensityValue::Number(n) => Ok(*n),
            DensityValue::Text(s) if s == "Infinity" => Ok(f64::INFINITY),
            DensityValue::Text(s) => Err(format!("invalid density string: {s}")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementFlagsSource {
    pub flammable: bool,
    pub conductive: bool,
    pub corrosive: bool,
    pub hot: bool,
    pub cold: bool,
    pub ignore_gravity: bool,
    pub rigid: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEndpointSource {
    pub temp: f64,
    pub to: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseChangeSource {
    pub high: Option<PhaseEndpointSource>,
    pub low: Option<PhaseEndpointSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSource {
    pub category: String,
    pub display_name: String,
    pub description: String,
    pub sort: i32,
    pub hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSource {
    #[serde(default)]
    pub id: Option<u8>,
    pub key: String,
    pub category: String,
    pub color: String,
    #[serde(default)]
    pub density: Option<DensityValue>,
    #[serde(default)]
    pub dispersion: u8,
    #[serde(default)]
    pub lifetime: u16,
    #[serde(default)]
    pub default_temp: f64,
    #[serde(default)]
    pub heat_conductivity: u8,
    #[serde(default)]
    pub bounce: f64,
    #[serde(default)]
    pub friction: f64,
    #[serde(default)]
    pub flags: ElementFlagsSource,
    #[serde(default)]
    pub behavior: Option<String>,
    #[serde(default)]
    pub phase_change: Option<PhaseChangeSource>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub ui: Option<UiSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSource {
    pub id: String,
    pub aggressor: String,
    pub victim: String,
    #[serde(default)]
    pub result_aggressor: Option<String>,
    #[serde(default)]
    pub result_victim: Option<String>,
    #[serde(default)]
    pub spawn: Option<String>,
    pub chance: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One pack: a manifest plus its element and reaction definitions, already
/// parsed from JSON (or constructed directly -- see [`baseline_packs`]).
#[derive(Debug, Clone)]
pub struct Pack {
    pub manifest: PackManifest,
    pub elements: Vec<ElementSource>,
    pub reactions: Vec<ReactionSource>,
}

fn parse_color(s: &str) -> Result<u32, String> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(hex, 16).map_err(|e| format!("invalid color {s}: {e}"))
}

fn category_from_str(s: &str) -> Result<(CategoryId, ElementFlags), String> {
    match s {
        "solid" => Ok((CAT_SOLID, FLAG_SOLID)),
        "powder" => Ok((CAT_POWDER, FLAG_POWDER)),
        "liquid" => Ok((CAT_LIQUID, FLAG_LIQUID)),
        "gas" => Ok((CAT_GAS, FLAG_GAS)),
        "energy" => Ok((CAT_ENERGY, FLAG_ENERGY)),
        "utility" => Ok((CAT_UTILITY, FLAG_UTILITY)),
        "bio" => Ok((CAT_BIO, FLAG_BIO)),
        other => Err(format!("unknown category: {other}")),
    }
}

fn behavior_kind_from_str(s: &str) -> Result<BehaviorKind, String> {
    match s {
        "energy_fire" => Ok(BehaviorKind::EnergyFire),
        "energy_spark" => Ok(BehaviorKind::EnergySpark),
        "energy_electricity" => Ok(BehaviorKind::EnergyElectricity),
        "utility_void" => Ok(BehaviorKind::UtilityVoid),
        "utility_clone" => Ok(BehaviorKind::UtilityClone),
        "bio_seed" => Ok(BehaviorKind::BioSeed),
        "bio_plant" => Ok(BehaviorKind::BioPlant),
        other => Err(format!("unknown behavior kind: {other}")),
    }
}

fn chance_to_u8(chance: f64) -> u8 {
    let v = (chance.clamp(0.0, 1.0) * 255.0).round();
    v as u8
}

/// Resolves a possibly-short element reference against the pack that
/// declared it (§4.12 step 3).
fn resolve_ref(declaring_pack: &str, reference: &str, key_to_id: &HashMap<String, ElementId>) -> Result<ElementId, String> {
    let qualified = if reference.contains(':') {
        reference.to_string()
    } else {
        format!("{declaring_pack}:{reference}")
    };
    key_to_id
        .get(&qualified)
        .copied()
        .ok_or_else(|| format!("unresolved element reference: {reference} (as {qualified})"))
}

// ---------------------------------------------------------------------
// Compiled bundle (the serialized, closed form)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleElement {
    pub id: ElementId,
    pub key: String,
    pub category: String,
    pub color: u32,
    pub density: f64,
    pub dispersion: u8,
    pub lifetime: u16,
    pub default_temp: f64,
    pub heat_conductivity: u8,
    pub bounce: f64,
    pub friction: f64,
    pub flags: ElementFlagsSource,
    pub behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_change: Option<PhaseChangeCompiled>,
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseChangeCompiled {
    pub high: Option<(f64, ElementId)>,
    pub low: Option<(f64, ElementId)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReaction {
    pub aggressor_id: ElementId,
    pub victim_id: ElementId,
    pub result_aggressor_id: Option<ElementId>,
    pub result_victim_id: ElementId,
    pub spawn_id: Option<ElementId>,
    pub chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledBundle {
    pub format_version: u32,
    pub packs: Vec<PackManifest>,
    pub elements: Vec<BundleElement>,
    /// A `BTreeMap`, not a `HashMap`: this field is part of the serialized
    /// bundle, and §4.12 step 5 requires byte-identical output for
    /// identical inputs -- a `HashMap`'s iteration order is not stable
    /// across process runs, which would silently break that guarantee.
    pub element_key_to_id: BTreeMap<String, ElementId>,
    pub reactions: Vec<BundleReaction>,
}

/// Merges an ordered list of packs into one deterministic [`CompiledBundle`]
/// (§4.12). Pack order is significant and is part of the input.
pub fn compile(packs: &[Pack]) -> EngineResult<CompiledBundle> {
    let mut key_to_id: HashMap<String, ElementId> = HashMap::new();
    let mut used_ids = [false; 256];
    used_ids[EL_EMPTY as usize] = true;

    // id -> (source element, declaring pack id), overwritten on override
    let mut by_id: Vec<Option<(ElementSource, String)>> = vec![None; 256];
    let mut max_id: usize = 0;

    let mut next_auto: u16 = 1;

    for pack in packs {
        for el in &pack.elements {
            let qualified = format!("{}:{}", pack.manifest.id, el.key);

            if let Some(&existing_id) = key_to_id.get(&qualified) {
                // Override: replace fields, keep id.
                by_id[existing_id as usize] = Some((el.clone(), pack.manifest.id.clone()));
                if existing_id as usize > max_id {
                    max_id = existing_id as usize;
                }
                continue;
            }

            let id = match el.id {
                Some(explicit) => {
                    if used_ids[explicit as usize] {
                        return Err(EngineError::compile(
                            &pack.manifest.id,
                            format!("id collision: {explicit} already claimed (key {qualified})"),
                        ));
                    }
                    explicit
                }
                None => {
                    while next_auto < 256 && used_ids[next_auto as usize] {
                        next_auto += 1;
                    }
                    if next_auto >= 256 {
                        return Err(EngineError::compile(&pack.manifest.id, "out of element ids (max 255)"));
                    }
                    next_auto as ElementId
                }
            };

            used_ids[id as usize] = true;
            key_to_id.insert(qualified.clone(), id);
            by_id[id as usize] = Some((el.clone(), pack.manifest.id.clone()));
            if id as usize > max_id {
                max_id = id as usize;
            }
        }
    }

    if by_id[EL_EMPTY as usize].is_none() {
        return Err(EngineError::compile("<merge>", "no pack defines element id 0 (empty)"));
    }

    // Gaps in the id range are allowed -- spec only reserves id 0 and
    // requires *claimed* ids to resolve; a pack may legitimately skip ids
    // to leave room for a future overlay. `ContentRegistry` pads unclaimed
    // ids with an inert placeholder so array-indexed lookups stay O(1).

    // Reactions: later pack wins for the same (aggressor, victim) pair.
    let mut reactions: HashMap<(ElementId, ElementId), (ElementSourceRefResolved, String)> = HashMap::new();

    for pack in packs {
        for r in &pack.reactions {
            let aggressor = resolve_ref(&pack.manifest.id, &r.aggressor, &key_to_id)
                .map_err(|e| EngineError::compile(&pack.manifest.id, e))?;
            let victim = resolve_ref(&pack.manifest.id, &r.victim, &key_to_id)
                .map_err(|e| EngineError::compile(&pack.manifest.id, e))?;

            let result_aggressor = r
                .result_aggressor
                .as_deref()
                .map(|s| resolve_ref(&pack.manifest.id, s, &key_to_id))
                .transpose()
                .map_err(|e| EngineError::compile(&pack.manifest.id, e))?;

            let result_victim = match r.result_victim.as_deref() {
                Some(s) => resolve_ref(&pack.manifest.id, s, &key_to_id).map_err(|e| EngineError::compile(&pack.manifest.id, e))?,
                None => EL_EMPTY,
            };

            let spawn = r
                .spawn
                .as_deref()
                .map(|s| resolve_ref(&pack.manifest.id, s, &key_to_id))
                .transpose()
                .map_err(|e| EngineError::compile(&pack.manifest.id, e))?;

            if !(0.0..=1.0).contains(&r.chance) {
                return Err(EngineError::compile(&pack.manifest.id, format!("reaction {} chance out of range", r.id)));
            }

            reactions.insert(
                (aggressor, victim),
                (
                    ElementSourceRefResolved {
                        result_aggressor,
                        result_victim,
                        spawn,
                        chance: r.chance,
                    },
                    pack.manifest.id.clone(),
                ),
            );
        }
    }

    // --- Build the sorted, deterministic bundle ---
    let mut elements = Vec::with_capacity(max_id + 1);
    let mut element_key_to_id = BTreeMap::new();

    for id in 0..=max_id as ElementId {
        let (el, pack_id) = match by_id[id as usize].as_ref() {
            Some(entry) => entry,
            None => continue, // unclaimed id -- not an error, just absent from the bundle.
        };
        let (category_id, _flag) = category_from_str(&el.category).map_err(|e| EngineError::compile(pack_id, e))?;

        let density = match &el.density {
            Some(d) => d.resolve().map_err(|e| EngineError::compile(pack_id, e))?,
            None => match category_id {
                CAT_UTILITY | CAT_ENERGY | CAT_BIO => 0.0,
                _ => {
                    return Err(EngineError::compile(
                        pack_id,
                        format!("element {} ({}) needs a density for category {}", id, el.key, el.category),
                    ))
                }
            },
        };

        let color = parse_color(&el.color).map_err(|e| EngineError::compile(pack_id, e))?;

        let phase_change = match &el.phase_change {
            None => None,
            Some(pc) => {
                let high = pc
                    .high
                    .as_ref()
                    .map(|h| resolve_ref(pack_id, &h.to, &key_to_id).map(|id| (h.temp, id)))
                    .transpose()
                    .map_err(|e| EngineError::compile(pack_id, e))?;
                let low = pc
                    .low
                    .as_ref()
                    .map(|l| resolve_ref(pack_id, &l.to, &key_to_id).map(|id| (l.temp, id)))
                    .transpose()
                    .map_err(|e| EngineError::compile(pack_id, e))?;
                Some(PhaseChangeCompiled { high, low })
            }
        };

        let qualified = format!("{pack_id}:{}", el.key);
        element_key_to_id.insert(qualified, id);

        elements.push(BundleElement {
            id,
            key: el.key.clone(),
            category: el.category.clone(),
            color,
            density,
            dispersion: el.dispersion,
            lifetime: el.lifetime,
            default_temp: el.default_temp,
            heat_conductivity: el.heat_conductivity,
            bounce: el.bounce,
            friction: el.friction,
            flags: el.flags.clone(),
            behavior: el.behavior.clone(),
            phase_change,
            hidden: el.hidden,
        });
    }

    let mut reaction_keys: Vec<(ElementId, ElementId)> = reactions.keys().copied().collect();
    reaction_keys.sort_unstable();

    let mut out_reactions = Vec::with_capacity(reaction_keys.len());
    for key in reaction_keys {
        let (resolved, _pack_id) = &reactions[&key];
        out_reactions.push(BundleReaction {
            aggressor_id: key.0,
            victim_id: key.1,
            result_aggressor_id: resolved.result_aggressor,
            result_victim_id: resolved.result_victim,
            spawn_id: resolved.spawn,
            chance: resolved.chance,
        });
    }

    Ok(CompiledBundle {
        format_version: 1,
        packs: packs.iter().map(|p| p.manifest.clone()).collect(),
        elements,
        element_key_to_id,
        reactions: out_reactions,
    })
}

struct ElementSourceRefResolved {
    result_aggressor: Option<ElementId>,
    result_victim: ElementId,
    spawn: Option<ElementId>,
    chance: f64,
}

// ---------------------------------------------------------------------
// Runtime registry: fast array-indexed lookups over a compiled bundle
// ---------------------------------------------------------------------

#[derive(Clone)]
pub struct ContentRegistry {
    elements: Vec<ElementProps>,
    valid_ids: Vec<bool>,
    behavior_kind_by_id: Vec<BehaviorKind>,
    phase_changes: Vec<PhaseChange>,
    reaction_lut: Vec<Option<Reaction>>,
    element_key_to_id: HashMap<String, ElementId>,
    element_manifest: Vec<BundleElement>,
}

impl ContentRegistry {
    /// Builds a dense, array-indexed lookup table sized `max(id)+1`. The
    /// bundle's element list may be sparse (ids are allowed to have gaps,
    /// §4.12) -- unclaimed ids are padded with [`ElementProps::empty`] and
    /// marked invalid in `valid_ids`, so `props`/`is_valid_element_id` stay
    /// O(1) array lookups regardless of gaps.
    pub fn from_bundle(bundle: CompiledBundle) -> EngineResult<Self> {
        let max_id = bundle.elements.iter().map(|e| e.id as usize).max().unwrap_or(0);
        let len = max_id + 1;

        let mut elements = vec![ElementProps::empty(); len];
        let mut valid_ids = vec![false; len];
        let mut behavior_kind_by_id = vec![BehaviorKind::None; len];
        let mut phase_changes = vec![PhaseChange::default(); len];

        for el in &bundle.elements {
            let (category, _flag) = category_from_str(&el.category).map_err(|e| EngineError::compile("<bundle>", e))?;

            let mut flags: ElementFlags = FLAG_NONE;
            flags |= _flag;
            if el.flags.flammable { flags |= FLAG_FLAMMABLE; }
            if el.flags.conductive { flags |= FLAG_CONDUCTIVE; }
            if el.flags.corrosive { flags |= FLAG_CORROSIVE; }
            if el.flags.hot { flags |= FLAG_HOT; }
            if el.flags.cold { flags |= FLAG_COLD; }
            if el.flags.ignore_gravity { flags |= FLAG_IGNORE_GRAVITY; }
            if el.flags.rigid { flags |= FLAG_RIGID; }

            let behavior_kind = match el.behavior.as_deref() {
                None => BehaviorKind::None,
                Some(s) => behavior_kind_from_str(s).map_err(|e| EngineError::compile("<bundle>", e))?,
            };

            let phase = match &el.phase_change {
                None => PhaseChange::default(),
                Some(pc) => PhaseChange {
                    high: pc.high.map(|(t, id)| (t as f32, id)),
                    low: pc.low.map(|(t, id)| (t as f32, id)),
                },
            };

            let idx = el.id as usize;
            elements[idx] = ElementProps {
                color: el.color,
                density: el.density as f32,
                category,
                flags,
                dispersion: el.dispersion,
                lifetime: el.lifetime,
                default_temp: el.default_temp as f32,
                heat_conductivity: el.heat_conductivity,
                bounce: el.bounce as f32,
                friction: el.friction as f32,
            };
            valid_ids[idx] = true;
            behavior_kind_by_id[idx] = behavior_kind;
            phase_changes[idx] = phase;
        }

        let mut reaction_lut: Vec<Option<Reaction>> = vec![None; REACTION_LUT_SIZE];
        for r in &bundle.reactions {
            let idx = ((r.aggressor_id as usize) << 8) | (r.victim_id as usize);
            reaction_lut[idx] = Some(Reaction {
                target_becomes: r.result_victim_id,
                source_becomes: r.result_aggressor_id.unwrap_or(Reaction::NO_CHANGE),
                chance: chance_to_u8(r.chance),
                spawn: r.spawn_id.unwrap_or(EL_EMPTY),
            });
        }

        Ok(Self {
            elements,
            valid_ids,
            behavior_kind_by_id,
            phase_changes,
            reaction_lut,
            element_key_to_id: bundle.element_key_to_id.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            element_manifest: bundle.elements.clone(),
        })
    }

    pub fn from_bundle_json(json: &str) -> EngineResult<Self> {
        let bundle: CompiledBundle = serde_json::from_str(json)
            .map_err(|e| EngineError::compile("<bundle>", e.to_string()))?;
        Self::from_bundle(bundle)
    }

    pub fn compile_packs(packs: &[Pack]) -> EngineResult<Self> {
        let bundle = compile(packs)?;
        Self::from_bundle(bundle)
    }

    pub fn element_count(&self) -> usize {
        self.element_manifest.len()
    }

    #[inline]
    pub fn is_valid_element_id(&self, id: ElementId) -> bool {
        self.valid_ids.get(id as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn props(&self, id: ElementId) -> Option<&ElementProps> {
        if !self.is_valid_element_id(id) { return None; }
        self.elements.get(id as usize)
    }

    #[inline]
    pub fn behavior_kind(&self, id: ElementId) -> BehaviorKind {
        self.behavior_kind_by_id.get(id as usize).copied().unwrap_or(BehaviorKind::None)
    }

    #[inline]
    pub fn phase_change(&self, id: ElementId) -> PhaseChange {
        self.phase_changes.get(id as usize).copied().unwrap_or_default()
    }

    pub fn check_phase_change(&self, id: ElementId, temp: f32) -> Option<ElementId> {
        let pc = self.phase_change(id);
        if let Some((threshold, new_el)) = pc.high {
            if temp > threshold {
                return Some(new_el);
            }
        }
        if let Some((threshold, new_el)) = pc.low {
            if temp < threshold {
                return Some(new_el);
            }
        }
        None
    }

    #[inline]
    pub fn reaction(&self, aggressor: ElementId, victim: ElementId) -> Option<&Reaction> {
        let idx = ((aggressor as usize) << 8) | (victim as usize);
        self.reaction_lut.get(idx)?.as_ref()
    }

    pub fn id_by_key(&self, key: &str) -> Option<ElementId> {
        self.element_key_to_id.get(key).copied()
    }

    pub fn color_with_variation(&self, id: ElementId, seed: u8) -> Option<u32> {
        let base = self.props(id)?.color;
        Some(color_with_variation(base, seed))
    }

    pub fn manifest_json(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Manifest<'a> {
            format_version: u32,
            elements: &'a [BundleElement],
        }
        serde_json::to_string(&Manifest { format_version: 1, elements: &self.element_manifest })
            .unwrap_or_else(|_| "{}".to_string())
    }
}

// ---------------------------------------------------------------------
// Baseline content: the engine's built-in "base" pack, constructed
// directly in Rust rather than round-tripped through JSON. The element
// roster and the reaction table are lifted from the teacher's
// `temperature.rs::PHASE_CHANGES` and `reactions.rs::get_reaction`.
// ---------------------------------------------------------------------

pub fn baseline_packs() -> Vec<Pack> {
    fn el(
        id: u8,
        key: &str,
        category: &str,
        color: &str,
        density: Option<f64>,
        dispersion: u8,
        lifetime: u16,
        default_temp: f64,
        heat_conductivity: u8,
        behavior: Option<&str>,
        phase_change: Option<PhaseChangeSource>,
        flags: ElementFlagsSource,
    ) -> ElementSource {
        ElementSource {
            id: Some(id),
            key: key.to_string(),
            category: category.to_string(),
            color: color.to_string(),
            density: density.map(DensityValue::Number),
            dispersion,
            lifetime,
            default_temp,
            heat_conductivity,
            bounce: 0.0,
            friction: 0.0,
            flags,
            behavior: behavior.map(|s| s.to_string()),
            phase_change,
            hidden: false,
            ui: None,
        }
    }

    fn endpoint(temp: f64, to: &str) -> PhaseEndpointSource {
        PhaseEndpointSource { temp, to: to.to_string() }
    }

    fn flags() -> ElementFlagsSource {
        ElementFlagsSource::default()
    }

    let elements = vec![
        el(0, "empty", "solid", "0x000A0A0A", Some(0.0), 0, 0, 20.0, 5, None, None, flags()),
        el(1, "stone", "solid", "0xFF808080", Some(2600.0), 0, 0, 20.0, 20, None,
            Some(PhaseChangeSource { high: Some(endpoint(900.0, "lava")), low: None }), flags()),
        el(2, "sand", "powder", "0xFFC2B280", Some(1600.0), 0, 0, 20.0, 10, None,
            Some(PhaseChangeSource { high: Some(endpoint(1700.0, "lava")), low: None }), flags()),
        el(3, "wood", "solid", "0xFF8B5A2B", Some(700.0), 0, 0, 20.0, 15,
            None, None, ElementFlagsSource { flammable: true, ..flags() }),
        el(4, "metal", "solid", "0xFFB0B0B8", Some(7800.0), 0, 0, 20.0, 80, None,
            Some(PhaseChangeSource { high: Some(endpoint(1500.0, "lava")), low: None }),
            ElementFlagsSource { conductive: true, ..flags() }),
        el(5, "ice", "solid", "0xFFD0F0FF", Some(920.0), 0, 0, -10.0, 20, None,
            Some(PhaseChangeSource { high: Some(endpoint(0.0, "water")), low: None }),
            ElementFlagsSource { cold: true, ..flags() }),
        el(6, "water", "liquid", "0xFF1E6FE0", Some(1000.0), 6, 0, 20.0, 60, None,
            Some(PhaseChangeSource { high: Some(endpoint(100.0, "steam")), low: Some(endpoint(0.0, "ice")) }),
            flags()),
        el(7, "oil", "liquid", "0xFF3A2A1A", Some(800.0), 4, 0, 20.0, 10,
            None, None, ElementFlagsSource { flammable: true, ..flags() }),
        el(8, "lava", "liquid", "0xFFE25822", Some(2500.0), 2, 0, 1200.0, 50, None,
            Some(PhaseChangeSource { high: None, low: Some(endpoint(700.0, "stone")) }),
            ElementFlagsSource { hot: true, ..flags() }),
        el(9, "acid", "liquid", "0xFF7FFF3F", Some(1100.0), 5, 0, 20.0, 10,
            None, None, ElementFlagsSource { corrosive: true, ..flags() }),
        el(10, "steam", "gas", "0xFFDDEEFF", Some(0.5), 5, 400, 110.0, 30, None,
            Some(PhaseChangeSource { high: None, low: Some(endpoint(90.0, "water")) }), flags()),
        el(11, "smoke", "gas", "0xFF555555", Some(0.8), 5, 200, 60.0, 5, None, None, flags()),
        el(12, "fire", "energy", "0xFFFF7A1A", None, 0, 30, 600.0, 30,
            Some("energy_fire"), None, ElementFlagsSource { hot: true, ..flags() }),
        el(13, "spark", "energy", "0xFFFFF07A", None, 0, 4, 400.0, 30,
            Some("energy_spark"), None, ElementFlagsSource { conductive: true, ..flags() }),
        el(14, "electricity", "energy", "0xFFAFE9FF", None, 0, 3, 20.0, 30,
            Some("energy_electricity"), None, ElementFlagsSource { conductive: true, ..flags() }),
        el(15, "gunpowder", "powder", "0xFF2E2E2E", Some(1000.0), 0, 0, 20.0, 10,
            None, None, ElementFlagsSource { flammable: true, ..flags() }),
        el(16, "clone", "utility", "0xFFFF4DD2", None, 0, 0, 20.0, 0,
            Some("utility_clone"), None, ElementFlagsSource { ignore_gravity: true, ..flags() }),
        el(17, "void", "utility", "0xFF1A001A", None, 0, 0, 20.0, 0,
            Some("utility_void"), None, ElementFlagsSource { ignore_gravity: true, ..flags() }),
        el(18, "dirt", "powder", "0xFF5A3A1E", Some(1400.0), 0, 0, 20.0, 12, None, None, flags()),
        el(19, "seed", "bio", "0xFF3F7F3F", None, 0, 0, 20.0, 10,
            Some("bio_seed"), None, flags()),
        el(20, "plant", "bio", "0xFF2FA02F", None, 0, 0, 20.0, 10,
            Some("bio_plant"), None, flags()),
    ];

    fn reaction(id: &str, aggressor: &str, victim: &str, result_aggressor: Option<&str>, result_victim: Option<&str>, spawn: Option<&str>, chance: f64) -> ReactionSource {
        ReactionSource {
            id: id.to_string(),
            aggressor: aggressor.to_string(),
            victim: victim.to_string(),
            result_aggressor: result_aggressor.map(|s| s.to_string()),
            result_victim: result_victim.map(|s| s.to_string()),
            spawn: spawn.map(|s| s.to_string()),
            chance,
            comment: None,
        }
    }

    let reactions = vec![
        reaction("fire_wood", "fire", "wood", Some("smoke"), Some("fire"), Some("smoke"), 0.10),
        reaction("fire_oil", "fire", "oil", Some("smoke"), Some("fire"), Some("smoke"), 0.20),
        reaction("fire_water", "fire", "water", Some("empty"), Some("steam"), None, 0.50),
        reaction("fire_ice", "fire", "ice", Some("empty"), Some("water"), Some("steam"), 0.30),
        reaction("fire_gunpowder", "fire", "gunpowder", Some("fire"), Some("fire"), Some("smoke"), 1.0),
        reaction("fire_plant", "fire", "plant", Some("smoke"), Some("fire"), Some("smoke"), 0.10),
        reaction("fire_seed", "fire", "seed", Some("smoke"), Some("fire"), None, 0.20),
        reaction("lava_water", "lava", "water", Some("stone"), Some("steam"), Some("steam"), 0.15),
        reaction("lava_wood", "lava", "wood", None, Some("fire"), Some("smoke"), 0.30),
        reaction("lava_oil", "lava", "oil", None, Some("fire"), Some("smoke"), 0.40),
        reaction("lava_ice", "lava", "ice", Some("stone"), Some("steam"), None, 0.30),
        reaction("lava_gunpowder", "lava", "gunpowder", None, Some("fire"), Some("smoke"), 1.0),
        reaction("lava_plant", "lava", "plant", None, Some("fire"), Some("smoke"), 0.50),
        reaction("lava_dirt", "lava", "dirt", None, Some("stone"), None, 0.05),
        reaction("acid_stone", "acid", "stone", Some("empty"), Some("empty"), Some("smoke"), 0.10),
        reaction("acid_metal", "acid", "metal", Some("empty"), Some("empty"), None, 0.05),
        reaction("acid_wood", "acid", "wood", Some("empty"), Some("empty"), None, 0.20),
        reaction("acid_ice", "acid", "ice", Some("empty"), Some("water"), None, 0.20),
        reaction("acid_plant", "acid", "plant", Some("empty"), Some("empty"), None, 0.15),
        reaction("acid_dirt", "acid", "dirt", Some("empty"), Some("empty"), None, 0.05),
        reaction("water_lava", "water", "lava", Some("steam"), Some("stone"), Some("steam"), 0.15),
        reaction("water_fire", "water", "fire", Some("steam"), Some("empty"), None, 0.30),
    ];

    vec![Pack {
        manifest: PackManifest {
            format_version: 1,
            id: "base".to_string(),
            title: "Base Elements".to_string(),
            version: "1.0.0".to_string(),
            dependencies: vec![],
        },
        elements,
        reactions,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str) -> PackManifest {
        PackManifest {
            format_version: 1,
            id: id.to_string(),
            title: id.to_string(),
            version: "1.0.0".to_string(),
            dependencies: vec![],
        }
    }

    fn element(id: Option<u8>, key: &str) -> ElementSource {
        ElementSource {
            id,
            key: key.to_string(),
            category: "solid".to_string(),
            color: "0xFF808080".to_string(),
            density: Some(DensityValue::Number(100.0)),
            dispersion: 0,
            lifetime: 0,
            default_temp: 20.0,
            heat_conductivity: 10,
            bounce: 0.0,
            friction: 0.0,
            flags: ElementFlagsSource::default(),
            behavior: None,
            phase_change: None,
            hidden: false,
            ui: None,
        }
    }

    fn base_pack() -> Pack {
        Pack {
            manifest: manifest("base"),
            elements: vec![element(Some(0), "empty"), element(Some(6), "water")],
            reactions: vec![],
        }
    }

    #[test]
    fn compile_is_deterministic() {
        let packs = vec![base_pack()];
        let a = serde_json::to_string(&compile(&packs).unwrap()).unwrap();
        let b = serde_json::to_string(&compile(&packs).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn overlay_gets_lowest_free_id_and_preserves_baseline_ids() {
        // S6: base defines water at id 6; overlay's draft:acid has no explicit id.
        let base = base_pack();
        let overlay = Pack {
            manifest: manifest("draft"),
            elements: vec![element(None, "acid")],
            reactions: vec![],
        };

        let baseline_only = compile(&[base.clone()]).unwrap();
        let merged = compile(&[base.clone(), overlay]).unwrap();

        assert_eq!(merged.element_key_to_id["base:water"], 6);
        assert_eq!(
            baseline_only.element_key_to_id["base:water"],
            merged.element_key_to_id["base:water"],
            "baseline id must be stable across compiles with an overlay (property #7)"
        );
        // ids 1..=5 are unclaimed gaps in this fixture's two-element base pack,
        // so the lowest free id for the overlay is 1, not 7.
        assert_eq!(merged.element_key_to_id["draft:acid"], 1);
    }

    #[test]
    fn later_pack_overrides_fields_but_keeps_id() {
        let base = base_pack();
        let mut overridden = element(None, "water");
        overridden.color = "0xFF00FF00".to_string();
        let overlay = Pack {
            manifest: manifest("base"),
            elements: vec![overridden],
            reactions: vec![],
        };

        let bundle = compile(&[base, overlay]).unwrap();
        let water = bundle.elements.iter().find(|e| e.key == "water").unwrap();
        assert_eq!(water.id, 6, "override must keep the original id");
        assert_eq!(water.color, 0xFF00FF00, "override must replace fields");
    }

    #[test]
    fn unresolved_reaction_reference_is_a_compile_error() {
        let base = base_pack();
        let mut pack = base;
        pack.reactions.push(ReactionSource {
            id: "bogus".to_string(),
            aggressor: "water".to_string(),
            victim: "nonexistent".to_string(),
            result_aggressor: None,
            result_victim: None,
            spawn: None,
            chance: 1.0,
        });

        assert!(compile(&[pack]).is_err());
    }

    #[test]
    fn duplicate_explicit_id_is_a_compile_error() {
        let base = base_pack();
        let overlay = Pack {
            manifest: manifest("draft"),
            elements: vec![element(Some(6), "draft_water")],
            reactions: vec![],
        };
        assert!(compile(&[base, overlay]).is_err());
    }

    #[test]
    fn infinity_density_string_resolves_to_float_infinity() {
        let mut el = element(Some(1), "rigid_wall");
        el.density = Some(DensityValue::Text("Infinity".to_string()));
        let pack = Pack {
            manifest: manifest("base"),
            elements: vec![element(Some(0), "empty"), el],
            reactions: vec![],
        };
        let bundle = compile(&[pack]).unwrap();
        let wall = bundle.elements.iter().find(|e| e.key == "rigid_wall").unwrap();
        assert!(wall.density.is_infinite());
    }

    #[test]
    fn registry_round_trips_through_bundle_json() {
        let registry = ContentRegistry::compile_packs(&baseline_packs()).unwrap();
        let json = registry.manifest_json();
        assert!(json.contains("\"water\""));
    }
}
