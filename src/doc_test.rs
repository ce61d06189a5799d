#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Constructors and defaults
// =============================================================

#[test]
fn new_ids_are_unique() {
    assert_ne!(new_id(), new_id());
}

#[test]
fn player_carries_team() {
    let el = Element::player(pt(100.0, 100.0), Team::Attacker);
    assert_eq!(el.kind, ElementKind::Player);
    assert_eq!(el.team, Some(Team::Attacker));
    assert_eq!(el.anchor(), pt(100.0, 100.0));
}

#[test]
fn circle_non_positive_radius_takes_default() {
    let el = Element::circle(pt(0.0, 0.0), 0.0);
    assert_eq!(el.kind, ElementKind::Circle { radius: 10.0 });
}

#[test]
fn rectangle_non_positive_sides_take_default() {
    let el = Element::rectangle(pt(0.0, 0.0), -1.0, 40.0);
    assert_eq!(el.kind, ElementKind::Rectangle { width: 20.0, height: 40.0 });
}

#[test]
fn line_requires_two_points() {
    assert!(Element::line(&[]).is_none());
    assert!(Element::line(&[pt(1.0, 1.0)]).is_none());
}

#[test]
fn line_anchor_is_first_point() {
    let el = Element::line(&[pt(3.0, 4.0), pt(5.0, 6.0)]).unwrap();
    assert_eq!(el.anchor(), pt(3.0, 4.0));
    assert_eq!(el.kind, ElementKind::Line { points: vec![3.0, 4.0, 5.0, 6.0] });
}

#[test]
fn element_type_tags() {
    assert_eq!(Element::player(pt(0.0, 0.0), Team::Defender).element_type(), ElementType::Player);
    assert_eq!(Element::gadget(pt(0.0, 0.0), "flashbang", Team::Defender).element_type(), ElementType::Gadget);
    assert_eq!(Element::text(pt(0.0, 0.0), "A").element_type(), ElementType::Text);
}

#[test]
fn default_table_values() {
    assert_eq!(ElementType::Circle.default_radius(), 10.0);
    assert_eq!(ElementType::Rectangle.default_size(), (20.0, 20.0));
    assert_eq!(ElementType::Player.default_radius(), 15.0);
}

#[test]
fn paint_prefers_explicit_color_then_team() {
    let el = Element::player(pt(0.0, 0.0), Team::Defender);
    assert_eq!(el.paint(), "#0000ff");
    let el = el.with_color("#abcdef");
    assert_eq!(el.paint(), "#abcdef");
    assert_eq!(Element::circle(pt(0.0, 0.0), 5.0).paint(), "#ff0000");
}

// =============================================================
// Patches
// =============================================================

#[test]
fn patch_position_moves_anchor() {
    let mut el = Element::player(pt(0.0, 0.0), Team::Attacker);
    assert!(el.apply_patch(&ElementPatch::position(pt(150.0, 120.0))));
    assert_eq!(el.anchor(), pt(150.0, 120.0));
}

#[test]
fn patch_position_translates_line_points() {
    let mut el = Element::line(&[pt(0.0, 0.0), pt(10.0, 5.0)]).unwrap();
    el.apply_patch(&ElementPatch::position(pt(100.0, 100.0)));
    assert_eq!(el.kind, ElementKind::Line { points: vec![100.0, 100.0, 110.0, 105.0] });
}

#[test]
fn patch_ignores_fields_for_other_kinds() {
    let mut el = Element::player(pt(0.0, 0.0), Team::Attacker);
    let patch = ElementPatch { radius: Some(50.0), width: Some(10.0), text: Some("x".into()), ..Default::default() };
    assert!(!el.apply_patch(&patch));
    assert_eq!(el.kind, ElementKind::Player);
}

#[test]
fn patch_rejects_non_positive_radius() {
    let mut el = Element::circle(pt(0.0, 0.0), 12.0);
    assert!(!el.apply_patch(&ElementPatch { radius: Some(0.0), ..Default::default() }));
    assert!(el.apply_patch(&ElementPatch { radius: Some(30.0), ..Default::default() }));
    assert_eq!(el.kind, ElementKind::Circle { radius: 30.0 });
}

#[test]
fn patch_points_resets_anchor() {
    let mut el = Element::line(&[pt(0.0, 0.0), pt(1.0, 1.0)]).unwrap();
    el.apply_patch(&ElementPatch { points: Some(vec![7.0, 8.0, 9.0, 10.0]), ..Default::default() });
    assert_eq!(el.anchor(), pt(7.0, 8.0));
}

#[test]
fn patch_points_ignores_short_buffers() {
    let mut el = Element::line(&[pt(0.0, 0.0), pt(1.0, 1.0)]).unwrap();
    assert!(!el.apply_patch(&ElementPatch { points: Some(vec![7.0, 8.0]), ..Default::default() }));
}

#[test]
fn patch_text_replaces_content() {
    let mut el = Element::text(pt(0.0, 0.0), "Rush");
    el.apply_patch(&ElementPatch { text: Some("Hold".into()), ..Default::default() });
    match &el.kind {
        ElementKind::Text { data } => assert_eq!(data.text, "Hold"),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn patch_never_changes_id_or_kind_tag() {
    let mut el = Element::rectangle(pt(0.0, 0.0), 10.0, 10.0);
    let id = el.id.clone();
    el.apply_patch(&ElementPatch { width: Some(99.0), team: Some(Team::Defender), ..Default::default() });
    assert_eq!(el.id, id);
    assert_eq!(el.element_type(), ElementType::Rectangle);
}

// =============================================================
// Bounds
// =============================================================

#[test]
fn constructed_elements_are_well_formed() {
    assert!(Element::player(pt(0.0, 0.0), Team::Defender).is_well_formed());
    assert!(Element::circle(pt(0.0, 0.0), -3.0).is_well_formed());
    assert!(Element::line(&[pt(0.0, 0.0), pt(1.0, 1.0)]).unwrap().is_well_formed());
    assert!(Element::text(pt(0.0, 0.0), "A").is_well_formed());
}

#[test]
fn unusable_geometry_is_not_well_formed() {
    let mut circle = Element::circle(pt(0.0, 0.0), 10.0);
    circle.kind = ElementKind::Circle { radius: -5.0 };
    assert!(!circle.is_well_formed());

    let mut rect = Element::rectangle(pt(0.0, 0.0), 10.0, 10.0);
    rect.kind = ElementKind::Rectangle { width: 10.0, height: 0.0 };
    assert!(!rect.is_well_formed());

    let mut line = Element::line(&[pt(0.0, 0.0), pt(1.0, 1.0)]).unwrap();
    line.kind = ElementKind::Line { points: vec![0.0, 0.0, 1.0] };
    assert!(!line.is_well_formed());

    let mut player = Element::player(pt(0.0, 0.0), Team::Attacker);
    player.x = f64::INFINITY;
    assert!(!player.is_well_formed());
}

#[test]
fn bounds_circle() {
    let el = Element::circle(pt(50.0, 50.0), 10.0);
    assert_eq!(el.bounds(), Rect::new(40.0, 40.0, 20.0, 20.0));
}

#[test]
fn bounds_rectangle_is_centered() {
    let el = Element::rectangle(pt(50.0, 50.0), 40.0, 20.0);
    assert_eq!(el.bounds(), Rect::new(30.0, 40.0, 40.0, 20.0));
}

#[test]
fn bounds_marker_uses_click_radius() {
    let el = Element::player(pt(0.0, 0.0), Team::Attacker);
    assert_eq!(el.bounds(), Rect::new(-15.0, -15.0, 30.0, 30.0));
}

#[test]
fn bounds_line_covers_points() {
    let el = Element::line(&[pt(10.0, 0.0), pt(-5.0, 20.0), pt(30.0, 5.0)]).unwrap();
    assert_eq!(el.bounds(), Rect::new(-5.0, 0.0, 35.0, 20.0));
}

#[test]
fn bounds_text_sits_above_baseline() {
    let el = Element::text(pt(100.0, 100.0), "ABCDE");
    let b = el.bounds();
    assert_eq!(b.x, 100.0);
    assert_eq!(b.y, 84.0);
    assert!((b.width - 48.0).abs() < 1e-9);
    assert_eq!(b.height, 20.0);
}

// =============================================================
// Serialization
// =============================================================

#[test]
fn serializes_with_type_tag_and_camel_case() {
    let mut el = Element::gadget(pt(1.0, 2.0), "smoke-grenade", Team::Defender);
    el.id = "g1".into();
    let value = serde_json::to_value(&el).unwrap();
    assert_eq!(
        value,
        json!({"id": "g1", "x": 1.0, "y": 2.0, "team": "defender", "type": "gadget", "gadgetId": "smoke-grenade"})
    );
}

#[test]
fn deserializes_text_with_data_block() {
    let el: Element = serde_json::from_value(json!({
        "id": "t1", "type": "text", "x": 5, "y": 6, "data": {"text": "Hold A", "fontSize": 20}
    }))
    .unwrap();
    match el.kind {
        ElementKind::Text { data } => {
            assert_eq!(data.text, "Hold A");
            assert_eq!(data.font_size(), 20.0);
            assert_eq!(data.font_family(), "Arial");
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn deserialize_rejects_unknown_type() {
    let result: Result<Element, _> = serde_json::from_value(json!({"id": "x", "type": "hexagon", "x": 0, "y": 0}));
    assert!(result.is_err());
}

#[test]
fn bounding_box_covers_all_elements() {
    let a = Element::circle(pt(0.0, 0.0), 10.0);
    let b = Element::rectangle(pt(100.0, 50.0), 20.0, 20.0);
    assert_eq!(bounding_box(&[a, b]), Some(Rect::new(-10.0, -10.0, 120.0, 70.0)));
}

#[test]
fn bounding_box_of_nothing_is_none() {
    assert_eq!(bounding_box(&Vec::<Element>::new()), None);
}
