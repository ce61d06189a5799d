//! Board state store: the single owner of the board's mutable state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host UI shell and the gesture engine both mutate the board exclusively
//! through the action methods on [`BoardStore`]; the renderer reads it through
//! accessors. Every change to the element collection goes through
//! [`History::commit`], so the displayed elements are always the snapshot
//! under the history cursor.
//!
//! Persistence is best-effort: strategies and callout overrides are written
//! to the injected [`KeyValueStore`] after each change, and a failed write is
//! logged rather than undoing the in-memory change.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::catalog::{Catalog, Map};
use crate::config::BoardConfig;
use crate::consts::DEFAULT_TEXT;
use crate::doc::{Element, ElementId, ElementPatch, Team, new_id};
use crate::geom::Point;
use crate::history::History;
use crate::input::Tool;
use crate::persist::{CALLOUTS_KEY, CalloutOverrides, KeyValueStore, STRATEGIES_KEY, StorageError, load_json, save_json};

/// Error returned by store actions that reference something that does not exist
/// or violate a placement rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("unknown map: {0}")]
    UnknownMap(String),
    #[error("unknown gadget: {0}")]
    UnknownGadget(String),
    #[error("unknown callout: {0}")]
    UnknownCallout(String),
    #[error("no map selected")]
    NoMapSelected,
    #[error("no gadget selected")]
    NoGadgetSelected,
    #[error("element id already in use: {0}")]
    DuplicateId(ElementId),
    #[error("element {0} has unusable geometry")]
    MalformedElement(ElementId),
    #[error("gadget {gadget_id} limit reached ({count}/{limit})")]
    GadgetLimitReached { gadget_id: String, count: usize, limit: usize },
}

/// A named, persisted bundle of map, side and elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    /// Map id.
    pub map: String,
    pub side: Team,
    pub elements: Vec<Element>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct BoardStore {
    catalog: Catalog,
    config: BoardConfig,
    storage: Box<dyn KeyValueStore>,

    selected_map: Option<Map>,
    camera: Camera,
    show_callouts: bool,
    hidden_callouts: HashSet<String>,
    editing_callout: Option<String>,
    callout_management_mode: bool,
    custom_callouts: CalloutOverrides,

    selected_tool: Tool,
    selected_team: Team,
    selected_gadget: Option<String>,
    show_grid: bool,

    history: History,
    selection: Vec<ElementId>,

    current_strategy: Option<Strategy>,
    saved_strategies: Vec<Strategy>,
}

impl BoardStore {
    /// Build a store over `catalog`, hydrating saved strategies and callout
    /// overrides from `storage`. The first catalog map starts selected.
    #[must_use]
    pub fn new(catalog: Catalog, config: BoardConfig, storage: Box<dyn KeyValueStore>) -> Self {
        let custom_callouts: CalloutOverrides = load_json(storage.as_ref(), CALLOUTS_KEY).unwrap_or_default();
        let mut saved_strategies: Vec<Strategy> = load_json(storage.as_ref(), STRATEGIES_KEY).unwrap_or_default();
        for strategy in &mut saved_strategies {
            strategy.elements = well_formed(&strategy.id, std::mem::take(&mut strategy.elements));
        }
        tracing::debug!(
            strategies = saved_strategies.len(),
            callout_maps = custom_callouts.len(),
            "board store hydrated"
        );

        let mut store = Self {
            camera: Camera::with_limits(config.zoom_min, config.zoom_max),
            show_grid: config.show_grid,
            history: History::new(config.history_limit),
            catalog,
            config,
            storage,
            selected_map: None,
            show_callouts: true,
            hidden_callouts: HashSet::new(),
            editing_callout: None,
            callout_management_mode: false,
            custom_callouts,
            selected_tool: Tool::default(),
            selected_team: Team::default(),
            selected_gadget: None,
            selection: Vec::new(),
            current_strategy: None,
            saved_strategies,
        };
        store.selected_map = store
            .catalog
            .maps
            .first()
            .and_then(|m| store.map_with_custom_callouts(&m.id));
        store
    }

    // =============================================================
    // Accessors
    // =============================================================

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[must_use]
    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    /// The selected map with callout overrides applied.
    #[must_use]
    pub fn selected_map(&self) -> Option<&Map> {
        self.selected_map.as_ref()
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[must_use]
    pub fn show_callouts(&self) -> bool {
        self.show_callouts
    }

    #[must_use]
    pub fn hidden_callouts(&self) -> &HashSet<String> {
        &self.hidden_callouts
    }

    #[must_use]
    pub fn editing_callout(&self) -> Option<&str> {
        self.editing_callout.as_deref()
    }

    #[must_use]
    pub fn callout_management_mode(&self) -> bool {
        self.callout_management_mode
    }

    #[must_use]
    pub fn custom_callout_positions(&self) -> &CalloutOverrides {
        &self.custom_callouts
    }

    #[must_use]
    pub fn selected_tool(&self) -> Tool {
        self.selected_tool
    }

    #[must_use]
    pub fn selected_team(&self) -> Team {
        self.selected_team
    }

    #[must_use]
    pub fn selected_gadget(&self) -> Option<&str> {
        self.selected_gadget.as_deref()
    }

    #[must_use]
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    /// The displayed elements: the history snapshot under the cursor.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.history.current()
    }

    #[must_use]
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements().iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }

    /// Selected elements in selection order.
    pub fn selected_elements(&self) -> impl Iterator<Item = &Element> {
        self.selection.iter().filter_map(|id| self.element(id))
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn current_strategy(&self) -> Option<&Strategy> {
        self.current_strategy.as_ref()
    }

    #[must_use]
    pub fn saved_strategies(&self) -> &[Strategy] {
        &self.saved_strategies
    }

    // =============================================================
    // Map and callouts
    // =============================================================

    /// Select a catalog map, applying any stored callout overrides.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownMap`] if the catalog has no such map; the
    /// current selection is kept.
    pub fn set_selected_map(&mut self, map_id: &str) -> Result<(), BoardError> {
        let map = self
            .map_with_custom_callouts(map_id)
            .ok_or_else(|| BoardError::UnknownMap(map_id.to_owned()))?;
        tracing::debug!(map = %map.id, "map selected");
        self.selected_map = Some(map);
        self.editing_callout = None;
        Ok(())
    }

    /// A copy of the catalog map with callout overrides applied. The catalog
    /// itself is never modified.
    #[must_use]
    pub fn map_with_custom_callouts(&self, map_id: &str) -> Option<Map> {
        let mut map = self.catalog.map(map_id)?.clone();
        if let Some(overrides) = self.custom_callouts.get(map_id) {
            for callout in &mut map.callouts {
                if let Some(pos) = overrides.get(&callout.id) {
                    callout.position = *pos;
                }
            }
        }
        Some(map)
    }

    pub fn toggle_callouts(&mut self) {
        self.show_callouts = !self.show_callouts;
    }

    /// Hide a visible callout or show a hidden one.
    pub fn toggle_callout_visibility(&mut self, callout_id: &str) {
        if !self.hidden_callouts.remove(callout_id) {
            self.hidden_callouts.insert(callout_id.to_owned());
        }
    }

    /// Move a callout of the selected map and persist the override.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NoMapSelected`] without a selected map and
    /// [`BoardError::UnknownCallout`] if the map has no such callout.
    pub fn update_callout_position(&mut self, callout_id: &str, position: Point) -> Result<(), BoardError> {
        let map = self.selected_map.as_mut().ok_or(BoardError::NoMapSelected)?;
        let callout = map
            .callouts
            .iter_mut()
            .find(|c| c.id == callout_id)
            .ok_or_else(|| BoardError::UnknownCallout(callout_id.to_owned()))?;
        callout.position = position;
        self.custom_callouts
            .entry(map.id.clone())
            .or_default()
            .insert(callout_id.to_owned(), position);
        tracing::debug!(map = %map.id, callout = callout_id, x = position.x, y = position.y, "callout moved");
        self.persist_callouts();
        Ok(())
    }

    pub fn set_editing_callout(&mut self, callout_id: Option<String>) {
        self.editing_callout = callout_id;
    }

    /// Leaving management mode also ends any callout edit.
    pub fn toggle_callout_management_mode(&mut self) {
        self.callout_management_mode = !self.callout_management_mode;
        if !self.callout_management_mode {
            self.editing_callout = None;
        }
    }

    /// Re-read callout overrides from storage and reapply them to the
    /// selected map.
    pub fn load_custom_callout_positions(&mut self) {
        self.custom_callouts = load_json(self.storage.as_ref(), CALLOUTS_KEY).unwrap_or_default();
        if let Some(id) = self.selected_map.as_ref().map(|m| m.id.clone()) {
            self.selected_map = self.map_with_custom_callouts(&id);
        }
    }

    /// Write callout overrides to storage.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails.
    pub fn save_custom_callout_positions(&mut self) -> Result<(), StorageError> {
        save_json(self.storage.as_mut(), CALLOUTS_KEY, &self.custom_callouts)
    }

    fn persist_callouts(&mut self) {
        if let Err(err) = self.save_custom_callout_positions() {
            tracing::warn!(error = %err, "failed to save callout positions");
        }
    }

    // =============================================================
    // View and tools
    // =============================================================

    pub fn set_zoom(&mut self, zoom: f64) {
        self.camera.set_zoom(zoom);
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.camera.pan = pan;
    }

    /// Zoom by `factor` keeping the world point under `screen_anchor` fixed.
    pub fn zoom_at(&mut self, screen_anchor: Point, factor: f64) {
        self.camera.zoom_at(screen_anchor, factor);
    }

    pub fn set_selected_tool(&mut self, tool: Tool) {
        self.selected_tool = tool;
    }

    pub fn set_selected_team(&mut self, team: Team) {
        self.selected_team = team;
    }

    /// Choose the gadget placed by the gadget tool.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownGadget`] if the catalog has no such gadget.
    pub fn set_selected_gadget(&mut self, gadget_id: Option<&str>) -> Result<(), BoardError> {
        if let Some(id) = gadget_id
            && self.catalog.gadget(id).is_none()
        {
            return Err(BoardError::UnknownGadget(id.to_owned()));
        }
        self.selected_gadget = gadget_id.map(str::to_owned);
        Ok(())
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.show_grid = show;
    }

    // =============================================================
    // Elements
    // =============================================================

    /// Append an element and commit a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::DuplicateId`] if the id is already in use.
    pub fn add_element(&mut self, element: Element) -> Result<(), BoardError> {
        if self.element(&element.id).is_some() {
            return Err(BoardError::DuplicateId(element.id));
        }
        if !element.is_well_formed() {
            return Err(BoardError::MalformedElement(element.id));
        }
        tracing::debug!(id = %element.id, kind = ?element.element_type(), "element added");
        let mut next = self.elements().to_vec();
        next.push(element);
        self.commit(next);
        Ok(())
    }

    /// Place a player marker for the selected team.
    pub fn place_player(&mut self, at: Point) -> ElementId {
        let element = Element::player(at, self.selected_team);
        let id = element.id.clone();
        let mut next = self.elements().to_vec();
        next.push(element);
        self.commit(next);
        id
    }

    /// Place a text label.
    pub fn place_text(&mut self, at: Point, content: &str) -> ElementId {
        let content = if content.trim().is_empty() { DEFAULT_TEXT } else { content };
        let element = Element::text(at, content);
        let id = element.id.clone();
        let mut next = self.elements().to_vec();
        next.push(element);
        self.commit(next);
        id
    }

    /// Place the selected gadget for the selected team.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NoGadgetSelected`], [`BoardError::UnknownGadget`]
    /// or [`BoardError::GadgetLimitReached`]; nothing is placed.
    pub fn place_gadget(&mut self, at: Point) -> Result<ElementId, BoardError> {
        let gadget_id = self.selected_gadget.clone().ok_or(BoardError::NoGadgetSelected)?;
        if self.catalog.gadget(&gadget_id).is_none() {
            return Err(BoardError::UnknownGadget(gadget_id));
        }
        let count = self.gadget_count(&gadget_id);
        let limit = self.gadget_limit(&gadget_id);
        if count >= limit {
            tracing::debug!(gadget = %gadget_id, count, limit, "gadget limit reached");
            return Err(BoardError::GadgetLimitReached { gadget_id, count, limit });
        }
        let element = Element::gadget(at, gadget_id, self.selected_team);
        let id = element.id.clone();
        let mut next = self.elements().to_vec();
        next.push(element);
        self.commit(next);
        Ok(id)
    }

    /// Patch one element. Commits a snapshot only if something changed.
    pub fn update_element(&mut self, id: &str, patch: &ElementPatch) -> bool {
        self.update_elements(&[(id.to_owned(), patch.clone())])
    }

    /// Patch several elements under a single snapshot. Unknown ids are
    /// skipped. Returns whether anything changed.
    pub fn update_elements(&mut self, updates: &[(ElementId, ElementPatch)]) -> bool {
        let mut next = self.elements().to_vec();
        let mut changed = false;
        for (id, patch) in updates {
            if let Some(el) = next.iter_mut().find(|e| &e.id == id) {
                changed |= el.apply_patch(patch);
            }
        }
        if changed {
            tracing::debug!(count = updates.len(), "elements updated");
            self.commit(next);
        }
        changed
    }

    /// Replace elements wholesale by id under a single snapshot. Used to
    /// commit gesture previews.
    pub fn replace_elements(&mut self, replacements: Vec<Element>) -> bool {
        let mut next = self.elements().to_vec();
        let mut changed = false;
        for replacement in replacements {
            if let Some(slot) = next.iter_mut().find(|e| e.id == replacement.id)
                && *slot != replacement
            {
                *slot = replacement;
                changed = true;
            }
        }
        if changed {
            self.commit(next);
        }
        changed
    }

    pub fn remove_element(&mut self, id: &str) -> bool {
        self.remove_elements(&[id.to_owned()]) > 0
    }

    /// Remove every listed element under a single snapshot and drop them from
    /// the selection. Returns how many were removed.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> usize {
        let before = self.elements().len();
        let next: Vec<Element> = self
            .elements()
            .iter()
            .filter(|e| !ids.contains(&e.id))
            .cloned()
            .collect();
        let removed = before - next.len();
        if removed > 0 {
            tracing::debug!(removed, "elements removed");
            self.commit(next);
        }
        removed
    }

    fn commit(&mut self, elements: Vec<Element>) {
        self.history.commit(elements);
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        let live: HashSet<&str> = self.history.current().iter().map(|e| e.id.as_str()).collect();
        self.selection.retain(|id| live.contains(id.as_str()));
    }

    // =============================================================
    // Selection
    // =============================================================

    /// Replace the selection with a single element. Unknown ids clear it.
    pub fn select_element(&mut self, id: &str) {
        self.selection.clear();
        if self.element(id).is_some() {
            self.selection.push(id.to_owned());
        }
    }

    /// Replace the selection. Unknown and repeated ids are dropped.
    pub fn select_elements(&mut self, ids: &[ElementId]) {
        let mut selection: Vec<ElementId> = Vec::with_capacity(ids.len());
        for id in ids {
            if self.element(id).is_some() && !selection.contains(id) {
                selection.push(id.clone());
            }
        }
        self.selection = selection;
    }

    /// Add the element to the selection, or remove it if already selected.
    pub fn toggle_selection(&mut self, id: &str) {
        if let Some(pos) = self.selection.iter().position(|s| s == id) {
            self.selection.remove(pos);
        } else if self.element(id).is_some() {
            self.selection.push(id.to_owned());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // =============================================================
    // History
    // =============================================================

    /// Step back one snapshot. Clears the selection when the cursor moves.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.selection.clear();
        }
        moved
    }

    /// Step forward one snapshot. Clears the selection when the cursor moves.
    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.selection.clear();
        }
        moved
    }

    // =============================================================
    // Strategies
    // =============================================================

    /// Save the current board as a new strategy.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NoMapSelected`] without a selected map.
    pub fn save_strategy(&mut self, name: &str, tags: Vec<String>) -> Result<Strategy, BoardError> {
        self.save_strategy_at(name, tags, Utc::now())
    }

    /// [`Self::save_strategy`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NoMapSelected`] without a selected map.
    pub fn save_strategy_at(&mut self, name: &str, tags: Vec<String>, now: DateTime<Utc>) -> Result<Strategy, BoardError> {
        let map = self.selected_map.as_ref().ok_or(BoardError::NoMapSelected)?;
        let strategy = Strategy {
            id: new_id(),
            name: name.to_owned(),
            map: map.id.clone(),
            side: self.selected_team,
            elements: self.elements().to_vec(),
            created_at: now,
            updated_at: now,
            tags,
        };
        tracing::debug!(id = %strategy.id, name, map = %strategy.map, "strategy saved");
        self.saved_strategies.push(strategy.clone());
        self.current_strategy = Some(strategy.clone());
        self.persist_strategies();
        Ok(strategy)
    }

    /// Load a strategy: map, elements and side. History restarts from the
    /// loaded elements.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownMap`] if the strategy's map is not in the
    /// catalog; the board is left untouched.
    pub fn load_strategy(&mut self, strategy: &Strategy) -> Result<(), BoardError> {
        let Some(map) = self.map_with_custom_callouts(&strategy.map) else {
            tracing::warn!(id = %strategy.id, map = %strategy.map, "strategy references unknown map");
            return Err(BoardError::UnknownMap(strategy.map.clone()));
        };
        let elements = well_formed(&strategy.id, strategy.elements.clone());
        tracing::debug!(id = %strategy.id, elements = elements.len(), "strategy loaded");
        self.selected_map = Some(map);
        self.selected_team = strategy.side;
        self.history.reset(elements);
        self.selection.clear();
        self.editing_callout = None;
        self.current_strategy = Some(strategy.clone());
        Ok(())
    }

    /// Delete a saved strategy by id. Returns whether it existed. A failed
    /// write is logged; the strategy stays deleted in memory.
    pub fn delete_strategy(&mut self, id: &str) -> bool {
        match self.delete_strategy_persisted(id) {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(error = %err, "failed to save strategies");
                true
            }
        }
    }

    /// [`Self::delete_strategy`] that reports the storage write.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the updated list could not be written.
    /// The strategy is removed from memory either way.
    pub fn delete_strategy_persisted(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.saved_strategies.len();
        self.saved_strategies.retain(|s| s.id != id);
        if self.saved_strategies.len() == before {
            return Ok(false);
        }
        if self.current_strategy.as_ref().is_some_and(|s| s.id == id) {
            self.current_strategy = None;
        }
        save_json(self.storage.as_mut(), STRATEGIES_KEY, &self.saved_strategies)?;
        Ok(true)
    }

    fn persist_strategies(&mut self) {
        if let Err(err) = save_json(self.storage.as_mut(), STRATEGIES_KEY, &self.saved_strategies) {
            tracing::warn!(error = %err, "failed to save strategies");
        }
    }

    /// Clear elements, selection, history and the current strategy. Map,
    /// view and tool choices are kept.
    pub fn reset(&mut self) {
        self.history.reset(Vec::new());
        self.selection.clear();
        self.current_strategy = None;
    }

    // =============================================================
    // Gadget limits
    // =============================================================

    /// How many elements reference `gadget_id`.
    #[must_use]
    pub fn gadget_count(&self, gadget_id: &str) -> usize {
        self.elements()
            .iter()
            .filter(|e| e.gadget_id() == Some(gadget_id))
            .count()
    }

    #[must_use]
    pub fn gadget_limit(&self, gadget_id: &str) -> usize {
        self.config.gadget_limit(gadget_id)
    }

    #[must_use]
    pub fn can_add_gadget(&self, gadget_id: &str) -> bool {
        self.gadget_count(gadget_id) < self.gadget_limit(gadget_id)
    }
}

/// Drop elements whose geometry cannot be drawn.
fn well_formed(strategy_id: &str, elements: Vec<Element>) -> Vec<Element> {
    elements
        .into_iter()
        .filter(|el| {
            let ok = el.is_well_formed();
            if !ok {
                tracing::warn!(strategy = strategy_id, id = %el.id, "dropping element with unusable geometry");
            }
            ok
        })
        .collect()
}
