#![allow(clippy::float_cmp)]

use chrono::TimeZone;

use super::*;
use crate::doc::ElementKind;
use crate::persist::MemoryStore;

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn store() -> BoardStore {
    BoardStore::new(Catalog::builtin(), BoardConfig::default(), Box::new(MemoryStore::new()))
}

fn store_with(records: &[(&str, &str)]) -> BoardStore {
    let memory: MemoryStore = records
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    BoardStore::new(Catalog::builtin(), BoardConfig::default(), Box::new(memory))
}

fn ids(store: &BoardStore) -> Vec<ElementId> {
    store.elements().iter().map(|e| e.id.clone()).collect()
}

/// Storage whose writes always fail.
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Write { key: key.to_owned(), message: "QuotaExceededError".into() })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::Write { key: key.to_owned(), message: "QuotaExceededError".into() })
    }
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_store_selects_first_map_and_is_empty() {
    let s = store();
    assert_eq!(s.selected_map().map(|m| m.id.as_str()), Some("hammer-fall"));
    assert!(s.elements().is_empty());
    assert!(s.selection().is_empty());
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.selected_tool(), Tool::Select);
    assert_eq!(s.selected_team(), Team::Attacker);
    assert!(s.show_callouts());
    assert!(!s.callout_management_mode());
}

#[test]
fn new_store_camera_uses_config_limits() {
    let config = BoardConfig { zoom_min: 0.5, zoom_max: 2.0, ..BoardConfig::default() };
    let mut s = BoardStore::new(Catalog::builtin(), config, Box::new(MemoryStore::new()));
    s.set_zoom(10.0);
    assert_eq!(s.camera().zoom(), 2.0);
}

#[test]
fn malformed_storage_hydrates_empty() {
    let s = store_with(&[(STRATEGIES_KEY, "not json"), (CALLOUTS_KEY, "[1,2")]);
    assert!(s.saved_strategies().is_empty());
    assert!(s.custom_callout_positions().is_empty());
}

#[test]
fn stored_callout_overrides_apply_to_initial_map() {
    let s = store_with(&[(CALLOUTS_KEY, r#"{"hammer-fall": {"a-site": {"x": 1.0, "y": 2.0}}}"#)]);
    let map = s.selected_map().unwrap();
    assert_eq!(map.callout("a-site").unwrap().position, pt(1.0, 2.0));
    assert_eq!(map.callout("b-site").unwrap().position, pt(600.0, 400.0));
}

// =============================================================
// Map and callouts
// =============================================================

#[test]
fn set_selected_map_switches_map() {
    let mut s = store();
    s.set_selected_map("cinderwatch").unwrap();
    assert_eq!(s.selected_map().unwrap().name, "Cinderwatch");
}

#[test]
fn set_selected_map_unknown_keeps_current() {
    let mut s = store();
    assert_eq!(s.set_selected_map("nuke"), Err(BoardError::UnknownMap("nuke".into())));
    assert_eq!(s.selected_map().unwrap().id, "hammer-fall");
}

#[test]
fn update_callout_position_persists_override() {
    let mut s = store();
    s.update_callout_position("a-site", pt(250.0, 175.0)).unwrap();
    assert_eq!(s.selected_map().unwrap().callout("a-site").unwrap().position, pt(250.0, 175.0));

    let raw = s.storage().get(CALLOUTS_KEY).unwrap();
    let reloaded = store_with(&[(CALLOUTS_KEY, raw.as_str())]);
    assert_eq!(
        reloaded.selected_map().unwrap().callout("a-site").unwrap().position,
        pt(250.0, 175.0)
    );
}

#[test]
fn update_callout_position_never_mutates_catalog() {
    let mut s = store();
    s.update_callout_position("b-site", pt(0.0, 0.0)).unwrap();
    let base = s.catalog().map("hammer-fall").unwrap();
    assert_eq!(base.callout("b-site").unwrap().position, pt(600.0, 400.0));
}

#[test]
fn update_unknown_callout_is_an_error() {
    let mut s = store();
    assert_eq!(
        s.update_callout_position("mid", pt(0.0, 0.0)),
        Err(BoardError::UnknownCallout("mid".into()))
    );
    assert!(s.custom_callout_positions().is_empty());
}

#[test]
fn overrides_follow_map_switches() {
    let mut s = store();
    s.update_callout_position("a-site", pt(1.0, 1.0)).unwrap();
    s.set_selected_map("skyline-10").unwrap();
    assert_eq!(s.selected_map().unwrap().callout("a-site").unwrap().position, pt(180.0, 120.0));
    s.set_selected_map("hammer-fall").unwrap();
    assert_eq!(s.selected_map().unwrap().callout("a-site").unwrap().position, pt(1.0, 1.0));
}

#[test]
fn toggle_callout_visibility_round_trips() {
    let mut s = store();
    s.toggle_callout_visibility("a-site");
    assert!(s.hidden_callouts().contains("a-site"));
    s.toggle_callout_visibility("a-site");
    assert!(s.hidden_callouts().is_empty());
}

#[test]
fn leaving_management_mode_ends_callout_edit() {
    let mut s = store();
    s.toggle_callout_management_mode();
    s.set_editing_callout(Some("a-site".into()));
    assert_eq!(s.editing_callout(), Some("a-site"));
    s.toggle_callout_management_mode();
    assert_eq!(s.editing_callout(), None);
}

#[test]
fn load_custom_callout_positions_rereads_storage() {
    let mut s = store();
    s.update_callout_position("a-site", pt(5.0, 5.0)).unwrap();
    s.load_custom_callout_positions();
    assert_eq!(s.selected_map().unwrap().callout("a-site").unwrap().position, pt(5.0, 5.0));
}

#[test]
fn failed_callout_write_keeps_in_memory_change() {
    let mut s = BoardStore::new(Catalog::builtin(), BoardConfig::default(), Box::new(ReadOnlyStore));
    s.update_callout_position("a-site", pt(9.0, 9.0)).unwrap();
    assert_eq!(s.selected_map().unwrap().callout("a-site").unwrap().position, pt(9.0, 9.0));
    assert!(s.save_custom_callout_positions().is_err());
}

// =============================================================
// Tools and view
// =============================================================

#[test]
fn set_selected_gadget_validates_catalog() {
    let mut s = store();
    s.set_selected_gadget(Some("flashbang")).unwrap();
    assert_eq!(s.selected_gadget(), Some("flashbang"));
    assert_eq!(s.set_selected_gadget(Some("c4")), Err(BoardError::UnknownGadget("c4".into())));
    assert_eq!(s.selected_gadget(), Some("flashbang"));
    s.set_selected_gadget(None).unwrap();
    assert_eq!(s.selected_gadget(), None);
}

#[test]
fn set_zoom_clamps() {
    let mut s = store();
    s.set_zoom(0.01);
    assert_eq!(s.camera().zoom(), 0.1);
    s.set_zoom(4.0);
    assert_eq!(s.camera().zoom(), 3.0);
}

#[test]
fn set_pan_replaces_pan() {
    let mut s = store();
    s.set_pan(pt(12.0, -8.0));
    assert_eq!(s.camera().pan, pt(12.0, -8.0));
}

// =============================================================
// Elements and selection
// =============================================================

#[test]
fn add_element_commits_snapshot() {
    let mut s = store();
    s.add_element(Element::circle(pt(0.0, 0.0), 10.0)).unwrap();
    assert_eq!(s.elements().len(), 1);
    assert_eq!(s.history().len(), 2);
}

#[test]
fn add_element_rejects_duplicate_id() {
    let mut s = store();
    let el = Element::circle(pt(0.0, 0.0), 10.0);
    s.add_element(el.clone()).unwrap();
    assert_eq!(s.add_element(el.clone()), Err(BoardError::DuplicateId(el.id)));
    assert_eq!(s.elements().len(), 1);
    assert_eq!(s.history().len(), 2);
}

#[test]
fn place_player_uses_selected_team() {
    let mut s = store();
    s.set_selected_team(Team::Defender);
    let id = s.place_player(pt(100.0, 100.0));
    assert_eq!(s.element(&id).unwrap().team, Some(Team::Defender));
}

#[test]
fn place_text_falls_back_to_default_content() {
    let mut s = store();
    let id = s.place_text(pt(0.0, 0.0), "   ");
    match &s.element(&id).unwrap().kind {
        crate::doc::ElementKind::Text { data } => assert_eq!(data.text, "Text"),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn update_element_commits_once_when_changed() {
    let mut s = store();
    let id = s.place_player(pt(0.0, 0.0));
    assert!(s.update_element(&id, &ElementPatch::position(pt(10.0, 10.0))));
    assert_eq!(s.history().len(), 3);
    assert!(!s.update_element(&id, &ElementPatch::position(pt(10.0, 10.0))));
    assert_eq!(s.history().len(), 3);
    assert!(!s.update_element("missing", &ElementPatch::position(pt(1.0, 1.0))));
}

#[test]
fn update_elements_is_one_snapshot() {
    let mut s = store();
    let a = s.place_player(pt(0.0, 0.0));
    let b = s.place_player(pt(50.0, 0.0));
    let len = s.history().len();
    assert!(s.update_elements(&[
        (a.clone(), ElementPatch::position(pt(5.0, 5.0))),
        (b.clone(), ElementPatch::position(pt(55.0, 5.0))),
    ]));
    assert_eq!(s.history().len(), len + 1);
    assert_eq!(s.element(&a).unwrap().anchor(), pt(5.0, 5.0));
    assert_eq!(s.element(&b).unwrap().anchor(), pt(55.0, 5.0));
}

#[test]
fn replace_elements_commits_only_changes() {
    let mut s = store();
    let id = s.place_player(pt(0.0, 0.0));
    let mut moved = s.element(&id).unwrap().clone();
    assert!(!s.replace_elements(vec![moved.clone()]));
    moved.translate(3.0, 4.0);
    assert!(s.replace_elements(vec![moved]));
    assert_eq!(s.element(&id).unwrap().anchor(), pt(3.0, 4.0));
}

#[test]
fn removing_selected_elements_prunes_selection() {
    let mut s = store();
    let a = s.place_player(pt(0.0, 0.0));
    let b = s.place_player(pt(50.0, 0.0));
    let c = s.place_player(pt(100.0, 0.0));
    s.select_elements(&[a.clone(), b.clone(), c.clone()]);
    assert!(s.remove_element(&b));
    assert_eq!(s.selection(), &[a.clone(), c.clone()]);
    assert_eq!(s.remove_elements(&[a, c, "missing".into()]), 2);
    assert!(s.selection().is_empty());
    assert!(s.elements().is_empty());
}

#[test]
fn removing_nothing_commits_nothing() {
    let mut s = store();
    s.place_player(pt(0.0, 0.0));
    let len = s.history().len();
    assert!(!s.remove_element("missing"));
    assert_eq!(s.history().len(), len);
}

#[test]
fn select_element_replaces_selection() {
    let mut s = store();
    let a = s.place_player(pt(0.0, 0.0));
    let b = s.place_player(pt(50.0, 0.0));
    s.select_element(&a);
    s.select_element(&b);
    assert_eq!(s.selection(), &[b]);
    s.select_element("missing");
    assert!(s.selection().is_empty());
}

#[test]
fn select_elements_drops_unknown_and_repeated_ids() {
    let mut s = store();
    let a = s.place_player(pt(0.0, 0.0));
    s.select_elements(&[a.clone(), "ghost".into(), a.clone()]);
    assert_eq!(s.selection(), &[a]);
}

#[test]
fn toggle_selection_adds_and_removes() {
    let mut s = store();
    let a = s.place_player(pt(0.0, 0.0));
    let b = s.place_player(pt(50.0, 0.0));
    s.toggle_selection(&a);
    s.toggle_selection(&b);
    assert_eq!(s.selection(), &[a.clone(), b.clone()]);
    s.toggle_selection(&a);
    assert_eq!(s.selection(), &[b]);
    assert!(!s.is_selected(&a));
}

// =============================================================
// Undo / redo
// =============================================================

#[test]
fn undo_redo_inverse_law() {
    let mut s = store();
    for i in 0..5 {
        s.place_player(pt(f64::from(i) * 10.0, 0.0));
    }
    let final_ids = ids(&s);
    for _ in 0..5 {
        assert!(s.undo());
    }
    assert!(s.elements().is_empty());
    assert!(!s.undo());
    for _ in 0..5 {
        assert!(s.redo());
    }
    assert_eq!(ids(&s), final_ids);
    assert!(!s.redo());
}

#[test]
fn undo_and_redo_clear_selection() {
    let mut s = store();
    let a = s.place_player(pt(0.0, 0.0));
    s.place_player(pt(50.0, 0.0));
    s.select_element(&a);
    s.undo();
    assert!(s.selection().is_empty());
    s.select_element(&a);
    s.redo();
    assert!(s.selection().is_empty());
}

#[test]
fn boundary_undo_keeps_selection() {
    let mut s = BoardStore::new(Catalog::builtin(), BoardConfig::default(), Box::new(MemoryStore::new()));
    let a = s.place_player(pt(0.0, 0.0));
    s.select_element(&a);
    assert!(!s.redo());
    assert_eq!(s.selection(), &[a]);
}

#[test]
fn default_history_undoes_every_commit() {
    let mut s = store();
    for i in 0..250 {
        s.place_player(pt(f64::from(i), 0.0));
    }
    let mut undos = 0;
    while s.undo() {
        undos += 1;
    }
    assert_eq!(undos, 250);
    assert!(s.elements().is_empty());
}

#[test]
fn history_limit_from_config() {
    let config = BoardConfig { history_limit: Some(3), ..BoardConfig::default() };
    let mut s = BoardStore::new(Catalog::builtin(), config, Box::new(MemoryStore::new()));
    for i in 0..6 {
        s.place_player(pt(f64::from(i), 0.0));
    }
    assert_eq!(s.history().len(), 3);
    assert_eq!(s.elements().len(), 6);
}

// =============================================================
// Gadget limits
// =============================================================

#[test]
fn gadget_limits_follow_config() {
    let s = store();
    assert_eq!(s.gadget_limit("smoke-grenade"), 10);
    assert_eq!(s.gadget_limit("flashbang"), 10);
    assert_eq!(s.gadget_limit("frag-grenade"), 2);
}

#[test]
fn place_gadget_enforces_limit() {
    let mut s = store();
    s.set_selected_gadget(Some("frag-grenade")).unwrap();
    s.place_gadget(pt(0.0, 0.0)).unwrap();
    s.place_gadget(pt(10.0, 0.0)).unwrap();
    assert!(!s.can_add_gadget("frag-grenade"));
    assert_eq!(
        s.place_gadget(pt(20.0, 0.0)),
        Err(BoardError::GadgetLimitReached { gadget_id: "frag-grenade".into(), count: 2, limit: 2 })
    );
    assert_eq!(s.gadget_count("frag-grenade"), 2);
}

#[test]
fn place_gadget_requires_selection() {
    let mut s = store();
    assert_eq!(s.place_gadget(pt(0.0, 0.0)), Err(BoardError::NoGadgetSelected));
    assert!(s.elements().is_empty());
}

#[test]
fn gadget_count_ignores_other_gadgets() {
    let mut s = store();
    s.set_selected_gadget(Some("flashbang")).unwrap();
    s.place_gadget(pt(0.0, 0.0)).unwrap();
    s.set_selected_gadget(Some("smoke-grenade")).unwrap();
    s.place_gadget(pt(0.0, 0.0)).unwrap();
    s.place_gadget(pt(0.0, 0.0)).unwrap();
    assert_eq!(s.gadget_count("flashbang"), 1);
    assert_eq!(s.gadget_count("smoke-grenade"), 2);
}

// =============================================================
// Strategies
// =============================================================

#[test]
fn save_and_load_round_trip() {
    let mut s = store();
    s.set_selected_map("skyline-10").unwrap();
    s.place_player(pt(100.0, 100.0));
    s.add_element(Element::circle(pt(40.0, 40.0), 25.0)).unwrap();
    let elements = s.elements().to_vec();

    let saved = s.save_strategy("Rush A", vec!["aggressive".into()]).unwrap();
    assert_eq!(saved.map, "skyline-10");
    assert_eq!(saved.side, Team::Attacker);
    assert_eq!(s.current_strategy().map(|c| c.id.as_str()), Some(saved.id.as_str()));

    s.reset();
    s.set_selected_map("cinderwatch").unwrap();
    s.set_selected_team(Team::Defender);
    s.load_strategy(&saved).unwrap();

    assert_eq!(s.selected_map().unwrap().id, "skyline-10");
    assert_eq!(s.elements(), elements.as_slice());
    assert_eq!(s.selected_team(), Team::Attacker);
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.history().current(), elements.as_slice());
    assert!(s.selection().is_empty());
}

#[test]
fn saved_strategies_persist_and_hydrate() {
    let mut s = store();
    s.place_player(pt(1.0, 2.0));
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let saved = s.save_strategy_at("Retake B", Vec::new(), now).unwrap();

    let raw = s.storage().get(STRATEGIES_KEY).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["createdAt"], "2024-05-01T12:00:00Z");
    assert_eq!(value[0]["elements"][0]["type"], "player");

    let reloaded = store_with(&[(STRATEGIES_KEY, raw.as_str())]);
    assert_eq!(reloaded.saved_strategies(), &[saved]);
}

#[test]
fn save_strategy_requires_map() {
    let catalog = Catalog { maps: Vec::new(), gadgets: Vec::new() };
    let mut s = BoardStore::new(catalog, BoardConfig::default(), Box::new(MemoryStore::new()));
    assert!(s.selected_map().is_none());
    assert_eq!(s.save_strategy("x", Vec::new()), Err(BoardError::NoMapSelected));
    assert!(s.saved_strategies().is_empty());
}

#[test]
fn load_strategy_with_unknown_map_is_noop() {
    let mut s = store();
    s.place_player(pt(0.0, 0.0));
    let mut strategy = s.save_strategy("x", Vec::new()).unwrap();
    strategy.map = "vertigo".into();
    strategy.elements.clear();
    let before = ids(&s);
    assert_eq!(s.load_strategy(&strategy), Err(BoardError::UnknownMap("vertigo".into())));
    assert_eq!(ids(&s), before);
}

fn strategy_with_bad_circle() -> Strategy {
    serde_json::from_value(serde_json::json!({
        "id": "s-bad",
        "name": "Broken",
        "map": "hammer-fall",
        "side": "defender",
        "elements": [
            { "id": "c1", "type": "circle", "x": 10.0, "y": 10.0, "radius": -5.0 },
            { "id": "p1", "type": "player", "x": 100.0, "y": 100.0, "team": "defender" },
        ],
        "createdAt": "2024-05-01T12:00:00Z",
        "updatedAt": "2024-05-01T12:00:00Z",
    }))
    .unwrap()
}

#[test]
fn load_strategy_drops_unusable_geometry() {
    let mut s = store();
    s.load_strategy(&strategy_with_bad_circle()).unwrap();
    assert_eq!(ids(&s), vec!["p1".to_owned()]);
    assert_eq!(s.history().current().len(), 1);
}

#[test]
fn hydration_drops_unusable_geometry() {
    let raw = serde_json::to_string(&vec![strategy_with_bad_circle()]).unwrap();
    let s = store_with(&[(STRATEGIES_KEY, raw.as_str())]);
    let elements = &s.saved_strategies()[0].elements;
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].id, "p1");
}

#[test]
fn add_element_rejects_unusable_geometry() {
    let mut s = store();
    let mut circle = Element::circle(pt(0.0, 0.0), 10.0);
    circle.kind = ElementKind::Circle { radius: f64::NAN };
    let id = circle.id.clone();
    assert_eq!(s.add_element(circle), Err(BoardError::MalformedElement(id)));
    assert!(s.elements().is_empty());
    assert_eq!(s.history().len(), 1);
}

#[test]
fn load_strategy_applies_callout_overrides() {
    let mut s = store();
    s.update_callout_position("a-site", pt(7.0, 7.0)).unwrap();
    let saved = s.save_strategy("x", Vec::new()).unwrap();
    s.set_selected_map("cinderwatch").unwrap();
    s.load_strategy(&saved).unwrap();
    assert_eq!(s.selected_map().unwrap().callout("a-site").unwrap().position, pt(7.0, 7.0));
}

#[test]
fn delete_strategy_persists() {
    let mut s = store();
    let a = s.save_strategy("a", Vec::new()).unwrap();
    let b = s.save_strategy("b", Vec::new()).unwrap();
    assert!(s.delete_strategy(&a.id));
    assert!(!s.delete_strategy(&a.id));
    assert_eq!(s.saved_strategies(), &[b.clone()]);
    assert_eq!(s.current_strategy(), Some(&b));

    let raw = s.storage().get(STRATEGIES_KEY).unwrap();
    let stored: Vec<Strategy> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, vec![b]);
}

#[test]
fn deleting_current_strategy_clears_it() {
    let mut s = store();
    let a = s.save_strategy("a", Vec::new()).unwrap();
    s.delete_strategy(&a.id);
    assert!(s.current_strategy().is_none());
}

#[test]
fn failed_strategy_write_keeps_saved_list() {
    let mut s = BoardStore::new(Catalog::builtin(), BoardConfig::default(), Box::new(ReadOnlyStore));
    s.save_strategy("kept", Vec::new()).unwrap();
    assert_eq!(s.saved_strategies().len(), 1);
}

#[test]
fn persisted_delete_reports_failed_write() {
    let mut s = BoardStore::new(Catalog::builtin(), BoardConfig::default(), Box::new(ReadOnlyStore));
    let saved = s.save_strategy("doomed", Vec::new()).unwrap();
    let err = s.delete_strategy_persisted(&saved.id).unwrap_err();
    assert!(matches!(err, StorageError::Write { ref key, .. } if key == STRATEGIES_KEY));
    assert!(s.saved_strategies().is_empty());
    assert!(matches!(s.delete_strategy_persisted(&saved.id), Ok(false)));
}

#[test]
fn strategy_without_tags_deserializes() {
    let raw = r#"{"id":"1","name":"n","map":"hammer-fall","side":"defender","elements":[],
        "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#;
    let strategy: Strategy = serde_json::from_str(raw).unwrap();
    assert!(strategy.tags.is_empty());
    assert_eq!(strategy.side, Team::Defender);
}

// =============================================================
// Reset
// =============================================================

#[test]
fn reset_clears_board_but_keeps_map_and_strategies() {
    let mut s = store();
    s.set_selected_map("k-zone-commons").unwrap();
    let a = s.place_player(pt(0.0, 0.0));
    s.select_element(&a);
    s.save_strategy("x", Vec::new()).unwrap();
    s.reset();
    assert!(s.elements().is_empty());
    assert!(s.selection().is_empty());
    assert!(s.current_strategy().is_none());
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.selected_map().unwrap().id, "k-zone-commons");
    assert_eq!(s.saved_strategies().len(), 1);
}
