//! Integration tests: store mutations → persisted blob → reload.
//!
//! Exercises the full `cm-core` pipeline: GraphStore + Codec + BlobStore.

use cm_core::id::{EntityId, SequentialIds};
use cm_core::model::*;
use cm_core::persist::{Codec, FileStore, MemoryStore};
use cm_core::{GraphStore, StoreConfig};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const KEY: &str = "companyMapState";

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open(blobs: &MemoryStore) -> GraphStore {
    open_with_config(blobs, StoreConfig::default())
}

fn open_with_config(blobs: &MemoryStore, config: StoreConfig) -> GraphStore {
    GraphStore::open_with(
        Box::new(blobs.clone()),
        config,
        Box::new(SequentialIds::new()),
        StdRng::seed_from_u64(42),
    )
}

fn seeded_names(store: &GraphStore) -> Vec<String> {
    store.companies().map(|c| c.name.clone()).collect()
}

// ─── Startup fallback ───────────────────────────────────────────────────

#[test]
fn corrupt_blob_falls_back_to_seed() {
    init_logs();
    for junk in [
        &b"{\"companies\": \"oops\"}"[..],
        &b"not json at all"[..],
        &b"[1, 2, 3]"[..],
        &b""[..],
    ] {
        let blobs = MemoryStore::new().with_blob(KEY, junk);
        let store = open(&blobs);
        assert_eq!(seeded_names(&store), vec!["DeepMind", "OpenAI", "Anthropic"]);
        assert_eq!(store.groups().len(), 0);
        assert_eq!(store.arrow_count(), 0);
        assert_eq!(store.transform(), Transform::IDENTITY);
    }
}

#[test]
fn structurally_valid_but_bad_color_falls_back() {
    let json = r##"{"companies":[],"groups":[{"id":"grp-1","name":"G","shape":"rect",
        "color":"not-a-color","x":0,"y":0,"width":300,"height":250}]}"##;
    let blobs = MemoryStore::new().with_blob(KEY, json);
    let store = open(&blobs);
    assert_eq!(store.company_count(), 3);
    assert!(store.groups().is_empty());
}

#[test]
fn original_localstorage_blob_loads() {
    let json = r##"{
        "companies": [
            {"id":"comp-1718000000001","name":"Nvidia","x":120.5,"y":80,
             "metrics":{"pe_12m_fw":"35","eps_2025":""},
             "quantitative":[{"id":"feat-1718000000002","name":"Employees","value":"29,600"}],
             "qualitative":[]},
            {"id":"comp-1718000000003","name":"TSMC","x":420,"y":310,
             "quantitative":[],"qualitative":[]}
        ],
        "groups": [{"id":"grp-1718000000004","name":"Chips","shape":"circle",
                    "color":"#10b981","x":50,"y":40,"width":400,"height":300}],
        "arrows": [{"id":"arrow-1718000000005","fromId":"comp-1718000000003",
                    "toId":"comp-1718000000001","label":"supplier"}],
        "transform": {"x": -20, "y": 15, "scale": 1}
    }"##;
    let blobs = MemoryStore::new().with_blob(KEY, json);
    let mut store = open(&blobs);

    assert_eq!(store.company_count(), 2);
    let nvidia = store.company(EntityId::intern("comp-1718000000001")).unwrap();
    assert_eq!(nvidia.metrics.get("pe_12m_fw"), Some("35"));
    // Missing catalog keys are back-filled.
    assert_eq!(nvidia.metrics.len(), cm_core::METRIC_CATALOG.len());

    let group = &store.groups()[0];
    assert_eq!(group.shape, GroupShape::Ellipse);
    assert_eq!(group.color, Color::rgb(0x10, 0xb9, 0x81));

    let arrow = store.arrows().next().unwrap();
    assert_eq!(arrow.label(), Some("supplier"));
    assert_eq!(store.transform().x, -20.0);

    // Fresh ids continue past the largest loaded suffix.
    let added = store.add_company("ASML");
    assert_eq!(added.id.as_str(), "comp-1718000000006");
}

#[test]
fn dangling_arrows_are_dropped_on_load() {
    let json = r#"{"companies":[{"id":"comp-1","name":"A","x":0,"y":0}],
        "arrows":[{"id":"arrow-9","fromId":"comp-1","toId":"comp-404","label":""}]}"#;
    let blobs = MemoryStore::new().with_blob(KEY, json);
    let store = open(&blobs);
    assert_eq!(store.company_count(), 1);
    assert_eq!(store.arrow_count(), 0);
}

#[test]
fn duplicate_arrow_ids_keep_the_first() {
    let json = r#"{"companies":[{"id":"comp-1","name":"A","x":0,"y":0},
        {"id":"comp-2","name":"B","x":100,"y":0}],
        "arrows":[{"id":"arrow-3","fromId":"comp-1","toId":"comp-2","label":"first"},
        {"id":"arrow-3","fromId":"comp-2","toId":"comp-1","label":"second"}]}"#;
    let blobs = MemoryStore::new().with_blob(KEY, json);
    let store = open(&blobs);
    assert_eq!(store.arrow_count(), 1);
    let arrow = store.arrow(EntityId::intern("arrow-3")).unwrap();
    assert_eq!(arrow.label(), Some("first"));
    assert_eq!(arrow.from, EntityId::intern("comp-1"));
}

#[test]
fn undersized_groups_are_grown_on_load() {
    let json = r##"{"companies":[],"groups":[{"id":"grp-1","name":"G","shape":"rect",
        "color":"#10b981","x":5,"y":6,"width":5,"height":300}]}"##;
    let blobs = MemoryStore::new().with_blob(KEY, json);
    let store = open(&blobs);
    let g = store.group(EntityId::intern("grp-1")).unwrap();
    assert_eq!((g.x, g.y, g.width, g.height), (5.0, 6.0, 100.0, 300.0));
}

#[test]
fn saturated_loaded_id_still_allows_adds() {
    let json = r#"{"companies":[{"id":"comp-18446744073709551615","name":"A","x":0,"y":0}]}"#;
    let blobs = MemoryStore::new().with_blob(KEY, json);
    let mut store = open(&blobs);
    let b = store.add_company("B");
    assert_ne!(b.id, EntityId::intern("comp-18446744073709551615"));
    assert_eq!(store.company_count(), 2);
}

// ─── Round-trip ─────────────────────────────────────────────────────────

fn populate(store: &mut GraphStore) {
    let a = store.add_company("Alpha").id;
    let b = store.add_company("Beta").id;
    let seed = EntityId::intern("comp-1");
    store.add_feature(a, FeatureKind::Quantitative, "Revenue", "$2B");
    store.add_feature(b, FeatureKind::Qualitative, "Moat", "Network effects");
    store.update_metric(a, "ebitda_margin", "27");
    store.update_metric(a, "not_in_catalog", "kept");
    store.add_arrow(a, b, "supplier");
    store.add_arrow(seed, a, "");
    let g = store.add_group("Europe", GroupShape::Ellipse, Color::rgba(1, 2, 3, 4)).id;
    store.update_group_position(g, -10.5, 22.25);
    store.update_group_size(g, 512.0, 90.0);
    store.set_transform(Transform {
        x: 13.0,
        y: -7.5,
        scale: 1.25,
    });
}

#[test]
fn reload_reproduces_every_entity() {
    for codec in [Codec::Json, Codec::MessagePack] {
        let config = StoreConfig {
            codec,
            ..StoreConfig::default()
        };
        let blobs = MemoryStore::new();
        let mut store = open_with_config(&blobs, config.clone());
        populate(&mut store);
        store.save();
        let before = store.snapshot();

        let reloaded = open_with_config(&blobs, config);
        assert_eq!(reloaded.snapshot(), before, "codec {codec:?}");
    }
}

#[test]
fn file_store_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let before = {
        let mut store = GraphStore::open(
            Box::new(FileStore::new(dir.path())),
            StoreConfig::default(),
        );
        populate(&mut store);
        store.snapshot()
    };
    let store = GraphStore::open(Box::new(FileStore::new(dir.path())), StoreConfig::default());
    assert_eq!(store.snapshot(), before);
}

#[test]
fn gesture_updates_without_save_are_not_persisted() {
    let blobs = MemoryStore::new();
    let mut store = open(&blobs);
    let id = EntityId::intern("comp-2");
    store.update_company_position(id, 1.0, 2.0);
    store.set_pan(cm_core::Vec2::new(50.0, 60.0));

    let bytes = blobs.get(KEY).unwrap();
    let on_disk = Codec::Json.decode(&bytes).unwrap();
    assert_eq!(on_disk.companies[1].x, 600.0);
    assert_eq!(on_disk.transform, Transform::IDENTITY);
}

// ─── Invariants under random sequences ──────────────────────────────────

#[test]
fn random_add_remove_keeps_ids_unique_and_arrows_consistent() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let blobs = MemoryStore::new();
    let mut store = open(&blobs);
    let mut live: Vec<EntityId> = store.companies().map(|c| c.id).collect();

    for step in 0..400 {
        match rng.gen_range(0..4) {
            0 | 1 => live.push(store.add_company(&format!("C{step}")).id),
            2 if live.len() >= 2 => {
                let from = live[rng.gen_range(0..live.len())];
                let to = live[rng.gen_range(0..live.len())];
                store.add_arrow(from, to, "rel");
            }
            _ if !live.is_empty() => {
                let victim = live.swap_remove(rng.gen_range(0..live.len()));
                assert!(store.remove_company(victim));
                assert!(
                    store.arrows().all(|a| !a.touches(victim)),
                    "arrow still references {victim}"
                );
            }
            _ => {}
        }

        let ids: Vec<EntityId> = store.companies().map(|c| c.id).collect();
        let unique: HashSet<EntityId> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len(), "duplicate company id at step {step}");
        assert!(
            store
                .arrows()
                .all(|a| store.company(a.from).is_some() && store.company(a.to).is_some())
        );
    }
}

#[test]
fn group_size_never_drops_below_minimum() {
    let blobs = MemoryStore::new();
    let mut store = open(&blobs);
    let id = store.add_group("Region", GroupShape::Rect, Color::BLUE).id;
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let w = rng.gen_range(-1_000.0..1_000.0);
        let h = rng.gen_range(-1_000.0..1_000.0);
        store.update_group_size(id, w, h);
        let g = store.group(id).unwrap();
        assert!(g.width >= 100.0, "width {} from {w}", g.width);
        assert!(g.height >= 80.0, "height {} from {h}", g.height);
    }
}
