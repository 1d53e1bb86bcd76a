//! Marker shown at the edit position while an image input popup is open.
//!
//! The marker is a widget decoration owned by [`CursorPlaceholderPlugin`].
//! Commands never touch the decoration set directly: they attach a
//! [`PlaceholderAction`] to a transaction and the plugin interprets it when
//! the transaction is applied, after mapping the existing marker through the
//! transaction's edits.

use std::sync::{Arc, OnceLock};

use manos_plate_core::{
    Decoration, DecorationId, DecorationSet, EditorState, StatePlugin, Transaction,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace};

pub const PLACEHOLDER_KEY: &str = "cursor_placeholder";
pub const PLACEHOLDER_ID: DecorationId = DecorationId("cursor-placeholder");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlaceholderAction {
    Add { pos: usize },
    Remove,
}

impl PlaceholderAction {
    pub fn to_value(self) -> Value {
        match self {
            PlaceholderAction::Add { pos } => json!({ "kind": "add", "pos": pos }),
            PlaceholderAction::Remove => json!({ "kind": "remove" }),
        }
    }

    /// The action carried by `tr`, if any. Malformed metadata is ignored.
    pub fn from_transaction(tr: &Transaction) -> Option<Self> {
        let value = tr.meta(PLACEHOLDER_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(action) => Some(action),
            Err(err) => {
                debug!(?err, "ignoring malformed placeholder action");
                None
            }
        }
    }

    fn attach(self, tr: &mut Transaction) {
        tr.set_meta(PLACEHOLDER_KEY, self.to_value());
    }
}

#[derive(Debug, Default)]
pub struct CursorPlaceholderPlugin;

impl CursorPlaceholderPlugin {
    /// Creates a plugin and makes it the active one in `registry` unless
    /// another plugin got there first.
    pub fn install(registry: &PlaceholderRegistry) -> Arc<Self> {
        let plugin = Arc::new(CursorPlaceholderPlugin);
        registry.register(plugin.clone());
        plugin
    }
}

impl StatePlugin for CursorPlaceholderPlugin {
    fn key(&self) -> &'static str {
        PLACEHOLDER_KEY
    }

    fn apply(&self, tr: &Transaction, value: &DecorationSet) -> DecorationSet {
        let set = value.map(tr.mapping());
        match PlaceholderAction::from_transaction(tr) {
            Some(PlaceholderAction::Add { pos }) => {
                trace!(pos, "adding cursor placeholder");
                set.add([Decoration::widget(pos, PLACEHOLDER_ID)])
            }
            Some(PlaceholderAction::Remove) => {
                let found = set.find(|deco| deco.id == PLACEHOLDER_ID);
                trace!(count = found.len(), "removing cursor placeholder");
                set.remove(&found)
            }
            None => set,
        }
    }
}

/// Single slot holding the active placeholder plugin. The first plugin
/// registered stays active until it is unregistered or the slot is reset.
#[derive(Debug, Default)]
pub struct PlaceholderRegistry {
    active: Mutex<Option<Arc<CursorPlaceholderPlugin>>>,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used when a command is not given its own.
    pub fn global() -> Arc<PlaceholderRegistry> {
        static GLOBAL: OnceLock<Arc<PlaceholderRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(PlaceholderRegistry::new())).clone()
    }

    /// Returns whether `plugin` became the active one.
    pub fn register(&self, plugin: Arc<CursorPlaceholderPlugin>) -> bool {
        let mut active = self.active.lock();
        if active.is_some() {
            return false;
        }
        *active = Some(plugin);
        true
    }

    /// Clears the slot if `plugin` is the active one.
    pub fn unregister(&self, plugin: &Arc<CursorPlaceholderPlugin>) -> bool {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(current) if Arc::ptr_eq(current, plugin) => {
                *active = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<Arc<CursorPlaceholderPlugin>> {
        self.active.lock().clone()
    }

    pub fn reset(&self) {
        self.active.lock().take();
    }
}

/// Where the placeholder sits in `state`, if it is shown.
///
/// Position 0 reads as "not shown", so a placeholder at the very start of
/// the document cannot be found.
pub fn find_cursor_placeholder_pos(
    registry: &PlaceholderRegistry,
    state: &EditorState,
) -> Option<usize> {
    registry.current()?;
    let found = state
        .plugin_state(PLACEHOLDER_KEY)?
        .find(|deco| deco.id == PLACEHOLDER_ID);
    found.first().map(|deco| deco.from).filter(|&pos| pos != 0)
}

/// A transaction that shows the placeholder at the selection, deleting a
/// selected text range first. A selected node is kept. Unchanged when no plugin is active or the
/// placeholder is already shown.
pub fn show_cursor_placeholder(registry: &PlaceholderRegistry, state: &EditorState) -> Transaction {
    let mut tr = state.tr();
    if registry.current().is_none() {
        return tr;
    }
    if find_cursor_placeholder_pos(registry, state).is_some() {
        return tr;
    }

    if tr.selection().has_range()
        && !tr.selection().is_empty()
        && let Err(err) = tr.delete_selection()
    {
        debug!(?err, "could not clear selection for placeholder");
        return state.tr();
    }
    let pos = tr.selection().from();
    PlaceholderAction::Add { pos }.attach(&mut tr);
    tr
}

/// A transaction that removes the placeholder if it is shown.
pub fn hide_cursor_placeholder(registry: &PlaceholderRegistry, state: &EditorState) -> Transaction {
    let mut tr = state.tr();
    if registry.current().is_none() {
        return tr;
    }
    if find_cursor_placeholder_pos(registry, state).is_some() {
        PlaceholderAction::Remove.attach(&mut tr);
    }
    tr
}
