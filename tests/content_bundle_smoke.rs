//! Smoke test for the baseline content bundle: compiles `baseline_packs()`
//! the same way `World::new` does internally, then checks the resulting
//! `ContentRegistry` against the invariants SPEC_FULL.md §4.12 and §8
//! (testable property #6, scenario S6) call out -- non-empty element table,
//! a resolvable `empty` id, key lookup, and an addressable reaction LUT.

use particula_engine::{baseline_packs, compile, ContentRegistry, EL_EMPTY};

const WATER: u8 = 6;

#[test]
fn baseline_bundle_compiles_and_has_core_invariants() {
    let packs = baseline_packs();
    let bundle = compile(&packs).expect("baseline packs should compile");
    let registry = ContentRegistry::from_bundle(bundle).expect("bundle should load into a registry");

    assert!(registry.element_count() > 0);
    assert!(registry.is_valid_element_id(EL_EMPTY));
    assert!(registry.props(EL_EMPTY).is_some());

    // Ensure we have at least one real element besides empty.
    assert!(registry.is_valid_element_id(WATER));
    assert!(registry.props(WATER).is_some());

    // Basic key lookup should work for the base pack.
    assert_eq!(registry.id_by_key("base:empty"), Some(EL_EMPTY));

    // Reaction table should be addressable (may be None depending on pair).
    let _ = registry.reaction(WATER, WATER);
}

#[test]
fn baseline_bundle_round_trips_through_json() {
    let packs = baseline_packs();
    let bundle = compile(&packs).expect("baseline packs should compile");
    let registry = ContentRegistry::from_bundle(bundle).expect("bundle should load into a registry");

    let json = registry.manifest_json();
    assert!(json.contains("\"key\":\"empty\""));
}

#[test]
fn baseline_bundle_compiles_deterministically() {
    let first = compile(&baseline_packs()).expect("first compile should succeed");
    let second = compile(&baseline_packs()).expect("second compile should succeed");

    assert_eq!(first.element_key_to_id, second.element_key_to_id);
}
