#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::Team;
use crate::geom::Point;

fn player(x: f64) -> Element {
    Element::player(Point::new(x, 0.0), Team::Attacker)
}

fn xs(elements: &[Element]) -> Vec<f64> {
    elements.iter().map(|e| e.x).collect()
}

#[test]
fn new_history_has_one_empty_snapshot() {
    let h = History::default();
    assert_eq!(h.len(), 1);
    assert_eq!(h.cursor(), 0);
    assert!(h.current().is_empty());
    assert!(!h.can_undo());
    assert!(!h.can_redo());
}

#[test]
fn commit_advances_cursor() {
    let mut h = History::default();
    h.commit(vec![player(1.0)]);
    assert_eq!(h.len(), 2);
    assert_eq!(h.cursor(), 1);
    assert_eq!(xs(h.current()), vec![1.0]);
}

#[test]
fn undo_then_redo_restores_snapshot() {
    let mut h = History::default();
    h.commit(vec![player(1.0)]);
    h.commit(vec![player(1.0), player(2.0)]);
    let before = h.current().to_vec();
    assert!(h.undo());
    assert_eq!(xs(h.current()), vec![1.0]);
    assert!(h.redo());
    assert_eq!(h.current(), before.as_slice());
}

#[test]
fn undo_at_oldest_is_noop() {
    let mut h = History::default();
    assert!(!h.undo());
    assert_eq!(h.cursor(), 0);
}

#[test]
fn redo_at_newest_is_noop() {
    let mut h = History::default();
    h.commit(vec![player(1.0)]);
    assert!(!h.redo());
    assert_eq!(h.cursor(), 1);
}

#[test]
fn commit_after_undo_truncates_redo_branch() {
    let mut h = History::default();
    h.commit(vec![player(1.0)]);
    h.commit(vec![player(2.0)]);
    h.commit(vec![player(3.0)]);
    h.undo();
    h.undo();
    h.commit(vec![player(9.0)]);
    assert_eq!(h.len(), 3);
    assert!(!h.can_redo());
    assert_eq!(xs(h.current()), vec![9.0]);
    h.undo();
    assert_eq!(xs(h.current()), vec![1.0]);
}

#[test]
fn reset_leaves_single_snapshot() {
    let mut h = History::default();
    h.commit(vec![player(1.0)]);
    h.commit(vec![player(2.0)]);
    h.reset(vec![player(5.0)]);
    assert_eq!(h.len(), 1);
    assert_eq!(h.cursor(), 0);
    assert_eq!(xs(h.current()), vec![5.0]);
    assert!(!h.can_undo());
}

#[test]
fn limit_drops_oldest_snapshots() {
    let mut h = History::new(Some(3));
    for i in 1..=5 {
        h.commit(vec![player(f64::from(i))]);
    }
    assert_eq!(h.len(), 3);
    assert_eq!(h.cursor(), 2);
    assert_eq!(xs(h.current()), vec![5.0]);
    assert!(h.undo());
    assert!(h.undo());
    assert!(!h.undo());
    assert_eq!(xs(h.current()), vec![3.0]);
}

#[test]
fn limit_of_zero_keeps_one_snapshot() {
    let mut h = History::new(Some(0));
    h.commit(vec![player(1.0)]);
    assert_eq!(h.len(), 1);
    assert_eq!(xs(h.current()), vec![1.0]);
}

#[test]
fn undo_redo_inverse_at_every_position() {
    let mut h = History::default();
    for i in 1..=4 {
        h.commit(vec![player(f64::from(i))]);
    }
    for _ in 0..4 {
        let here = h.current().to_vec();
        assert!(h.undo());
        assert!(h.redo());
        assert_eq!(h.current(), here.as_slice());
        h.undo();
    }
}
