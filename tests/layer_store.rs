use egui::{Rect, pos2, vec2};
use layer_composer::{
    Layer, LayerContent, LayerId, LayerPatch, LayerStore, ShapeType, StoreError, ZOrderMove,
};

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(x, y), vec2(w, h))
}

// Helper to create a store with three shapes stacked bottom to top
fn create_test_store() -> (LayerStore, [LayerId; 3]) {
    let mut store = LayerStore::new();
    let a = store.add(Layer::shape(ShapeType::Rectangle, rect(0.0, 0.0, 100.0, 100.0)).with_name("a"));
    let b = store.add(Layer::shape(ShapeType::Ellipse, rect(50.0, 50.0, 100.0, 100.0)).with_name("b"));
    let c = store.add(Layer::text("hello", rect(300.0, 300.0, 200.0, 60.0)).with_name("c"));
    (store, [a, b, c])
}

#[test]
fn test_update_applies_patch_and_bumps_revision() {
    let (mut store, [a, ..]) = create_test_store();
    let before = store.revision();

    assert!(store.update(a, &LayerPatch::rect(rect(10.0, 20.0, 30.0, 40.0))));
    assert_eq!(store.get(a).unwrap().rect(), rect(10.0, 20.0, 30.0, 40.0));
    assert!(store.revision() > before);
}

#[test]
fn test_update_clamps_values() {
    let (mut store, [a, ..]) = create_test_store();
    let patch = LayerPatch {
        width: Some(-5.0),
        opacity: Some(150.0),
        rotation: Some(270.0),
        ..LayerPatch::default()
    };
    store.update(a, &patch);

    let layer = store.get(a).unwrap();
    assert_eq!(layer.width, 0.0);
    assert_eq!(layer.opacity, 100.0);
    assert_eq!(layer.rotation, -90.0);
}

#[test]
fn test_update_of_missing_layer_is_a_no_op() {
    let (mut store, _) = create_test_store();
    let before = store.revision();

    assert!(!store.update(LayerId::new(), &LayerPatch::visibility(false)));
    assert_eq!(store.revision(), before);
}

#[test]
fn test_unchanged_patch_does_not_bump_revision() {
    let (mut store, [a, ..]) = create_test_store();
    let before = store.revision();

    assert!(!store.update(a, &LayerPatch::visibility(true)));
    assert_eq!(store.revision(), before);
}

#[test]
fn test_mismatched_content_is_ignored() {
    let (mut store, [a, ..]) = create_test_store();
    let patch = LayerPatch::content(LayerContent::Image { url: Some("x.png".to_owned()) });

    assert!(!store.update(a, &patch));
    assert_eq!(store.get(a).unwrap().kind(), "shape");
}

#[test]
fn test_reorder_accepts_permutations_only() {
    let (mut store, [a, b, c]) = create_test_store();

    store.reorder(&[c, a, b]).unwrap();
    assert_eq!(store.ids(), vec![c, a, b]);

    let revision = store.revision();
    assert_eq!(
        store.reorder(&[a, b]),
        Err(StoreError::ReorderLength { given: 2, expected: 3 })
    );
    assert_eq!(store.reorder(&[a, b, b]), Err(StoreError::DuplicateLayer(b)));
    let stranger = LayerId::new();
    assert_eq!(store.reorder(&[a, b, stranger]), Err(StoreError::UnknownLayer(stranger)));

    assert_eq!(store.ids(), vec![c, a, b]);
    assert_eq!(store.revision(), revision);
}

#[test]
fn test_z_order_moves() {
    let (mut store, [a, b, c]) = create_test_store();

    assert!(store.move_layers(&[a], ZOrderMove::Forward));
    assert_eq!(store.ids(), vec![b, a, c]);

    assert!(store.move_layers(&[a], ZOrderMove::ToFront));
    assert_eq!(store.ids(), vec![b, c, a]);

    assert!(!store.move_layers(&[a], ZOrderMove::ToFront), "already on top");

    assert!(store.move_layers(&[c, a], ZOrderMove::ToBack));
    assert_eq!(store.ids(), vec![c, a, b]);

    assert!(store.move_layers(&[b], ZOrderMove::Backward));
    assert_eq!(store.ids(), vec![c, b, a]);
}

#[test]
fn test_duplicate_is_deep_copy_above_original() {
    let (mut store, [a, b, _]) = create_test_store();

    let copy = store.duplicate(a, 10.0).unwrap();
    assert_ne!(copy, a);
    assert_eq!(store.index_of(copy), Some(1));
    assert_eq!(store.index_of(b), Some(2));

    let original = store.get(a).unwrap().clone();
    let duplicate = store.get(copy).unwrap().clone();
    assert_eq!(duplicate.position(), original.position() + vec2(10.0, 10.0));
    assert_eq!(duplicate.name, "a copy");
    assert_eq!(duplicate.content, original.content);

    store.update(copy, &LayerPatch::visibility(false));
    assert!(store.get(a).unwrap().is_visible);

    assert!(store.duplicate(LayerId::new(), 10.0).is_none());
}

#[test]
fn test_hit_test_returns_topmost_visible_unlocked_layer() {
    let (mut store, [a, b, _]) = create_test_store();
    let overlap = pos2(75.0, 75.0);

    assert_eq!(store.hit_test(overlap), Some(b));

    store.update(b, &LayerPatch::locked(true));
    assert_eq!(store.hit_test(overlap), Some(a));

    store.update(a, &LayerPatch::visibility(false));
    assert_eq!(store.hit_test(overlap), None);
    assert_eq!(store.hit_test(pos2(900.0, 900.0)), None);
}

#[test]
fn test_remove() {
    let (mut store, [a, b, c]) = create_test_store();

    let removed = store.remove(b).unwrap();
    assert_eq!(removed.name, "b");
    assert_eq!(store.ids(), vec![a, c]);
    assert!(store.remove(b).is_none());
}

#[test]
fn test_add_reassigns_colliding_id() {
    let (mut store, [a, ..]) = create_test_store();
    let clash = store.get(a).unwrap().clone();

    let id = store.add(clash);
    assert_ne!(id, a);
    assert_eq!(store.len(), 4);
}

#[test]
fn test_serialize_round_trip() {
    let (store, ids) = create_test_store();

    let restored = LayerStore::deserialize(store.serialize()).unwrap();
    assert_eq!(restored.ids(), ids.to_vec());
    assert_eq!(restored.layers(), store.layers());
}

#[test]
fn test_duplicate_ids_in_loaded_data_are_reassigned() {
    let layer = Layer::shape(ShapeType::Rectangle, rect(0.0, 0.0, 10.0, 10.0));
    let store = LayerStore::from_layers(vec![layer.clone(), layer.clone()]);

    let ids = store.ids();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], layer.id);
    assert_ne!(ids[1], layer.id);
}
