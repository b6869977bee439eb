use egui::{Rect, pos2, vec2};
use layer_composer::geometry::{
    Handle, axis_aligned_bounding_box, layers_in_marquee, resize_from_handle, rotate_around_center,
    rotated_corners,
};
use layer_composer::{Layer, ShapeType};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn square(x: f32, y: f32, size: f32) -> Layer {
    Layer::shape(ShapeType::Rectangle, Rect::from_min_size(pos2(x, y), vec2(size, size)))
}

#[test]
fn test_bounding_box_of_single_layer_keeps_rotation() {
    let mut layer = square(10.0, 20.0, 50.0);
    layer.rotation = 30.0;

    let bounds = axis_aligned_bounding_box([&layer]).unwrap();
    assert_eq!(bounds.rect, layer.rect());
    assert_eq!(bounds.rotation, 30.0);
}

#[test]
fn test_bounding_box_of_many_layers_is_tight_union() {
    let mut a = square(0.0, 0.0, 10.0);
    a.rotation = 45.0;
    let b = square(50.0, 40.0, 20.0);
    let c = square(-5.0, 30.0, 5.0);

    let bounds = axis_aligned_bounding_box([&a, &b, &c]).unwrap();
    assert_eq!(bounds.rect, Rect::from_min_max(pos2(-5.0, 0.0), pos2(70.0, 60.0)));
    assert_eq!(bounds.rotation, 0.0);

    assert!(axis_aligned_bounding_box(std::iter::empty::<&Layer>()).is_none());
}

#[test]
fn test_resize_never_goes_below_minimum() {
    let rect = Rect::from_min_size(pos2(100.0, 100.0), vec2(80.0, 40.0));
    let deltas = [
        vec2(0.0, 0.0),
        vec2(-500.0, -500.0),
        vec2(500.0, 500.0),
        vec2(-500.0, 500.0),
        vec2(500.0, -500.0),
        vec2(-79.0, 3.0),
    ];

    for rotation in [0.0, 30.0, -120.0, 180.0] {
        for handle in Handle::ALL {
            for delta in deltas {
                for constrain in [false, true] {
                    let out = resize_from_handle(rect, handle, rotation, delta, constrain, 1.0);
                    assert!(
                        out.width() >= 1.0 && out.height() >= 1.0,
                        "{:?} rot {} delta {:?} gave {:?}",
                        handle,
                        rotation,
                        delta,
                        out
                    );
                }
            }
        }
    }
}

#[test]
fn test_resize_keeps_opposite_corner_fixed_when_rotated() {
    let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 60.0));
    let rotation = 30.0;
    let top_left_before = rotated_corners(rect, rotation)[0];

    let out = resize_from_handle(rect, Handle::BottomRight, rotation, vec2(40.0, 25.0), false, 1.0);
    let top_left_after = rotated_corners(out, rotation)[0];

    assert!(approx(top_left_before.x, top_left_after.x));
    assert!(approx(top_left_before.y, top_left_after.y));
    assert!(out.width() > 100.0);
}

#[test]
fn test_edge_handle_only_changes_one_axis() {
    let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 60.0));
    let out = resize_from_handle(rect, Handle::Bottom, 0.0, vec2(35.0, 15.0), false, 1.0);
    assert_eq!(out.min, rect.min);
    assert!(approx(out.width(), 100.0));
    assert!(approx(out.height(), 75.0));
}

#[test]
fn test_rotation_follows_pointer_and_snaps() {
    let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
    let start = pos2(150.0, 50.0); // due east of the center
    let south = pos2(50.0, 150.0);

    assert!(approx(rotate_around_center(rect, 0.0, start, south, None), 90.0));

    let slightly_past = pos2(50.0 + 100.0 * 20f32.to_radians().cos(), 50.0 + 100.0 * 20f32.to_radians().sin());
    assert!(approx(rotate_around_center(rect, 0.0, start, slightly_past, Some(15.0)), 15.0));

    // Wraps into (-180, 180]
    assert!(approx(rotate_around_center(rect, 170.0, start, south, None), -100.0));
}

#[test]
fn test_rotated_layer_hit_testing() {
    let mut layer = square(0.0, 0.0, 100.0);
    assert!(layer.contains_point(pos2(2.0, 2.0)));

    layer.rotation = 45.0;
    assert!(!layer.contains_point(pos2(2.0, 2.0)), "corner is outside once rotated");
    assert!(layer.contains_point(pos2(50.0, -15.0)), "rotated corner pokes above the rect");
}

#[test]
fn test_marquee_uses_intersection_and_skips_hidden_and_locked() {
    let a = square(0.0, 0.0, 50.0);
    let b = square(100.0, 0.0, 50.0);
    let mut hidden = square(10.0, 10.0, 10.0);
    hidden.is_visible = false;
    let mut locked = square(20.0, 20.0, 10.0);
    locked.is_locked = true;
    let layers = vec![a.clone(), b.clone(), hidden, locked];

    let hits = layers_in_marquee(&layers, Rect::from_min_max(pos2(40.0, 40.0), pos2(60.0, 60.0)));
    assert_eq!(hits, vec![a.id]);

    let hits = layers_in_marquee(&layers, Rect::from_min_max(pos2(-10.0, -10.0), pos2(200.0, 10.0)));
    assert_eq!(hits, vec![a.id, b.id]);
}
