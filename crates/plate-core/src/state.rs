use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::Document;
use crate::decoration::{Decoration, DecorationSet};
use crate::ops::Transaction;
use crate::schema::Schema;
use crate::selection::Selection;

/// A plugin whose state is a decoration set recomputed on every applied
/// transaction.
pub trait StatePlugin: Send + Sync {
    fn key(&self) -> &'static str;

    fn init(&self, _doc: &Document) -> DecorationSet {
        DecorationSet::empty()
    }

    fn apply(&self, tr: &Transaction, value: &DecorationSet) -> DecorationSet;
}

#[derive(Clone)]
pub struct EditorState {
    doc: Document,
    selection: Selection,
    schema: Arc<Schema>,
    plugins: Vec<Arc<dyn StatePlugin>>,
    plugin_states: BTreeMap<&'static str, DecorationSet>,
}

impl EditorState {
    /// Plugins sharing a key keep only the first one.
    pub fn create(
        schema: Arc<Schema>,
        doc: Document,
        selection: Selection,
        plugins: impl IntoIterator<Item = Arc<dyn StatePlugin>>,
    ) -> Self {
        let mut installed: Vec<Arc<dyn StatePlugin>> = Vec::new();
        let mut plugin_states = BTreeMap::new();
        for plugin in plugins {
            if plugin_states.contains_key(plugin.key()) {
                tracing::warn!(key = plugin.key(), "duplicate state plugin key ignored");
                continue;
            }
            plugin_states.insert(plugin.key(), plugin.init(&doc));
            installed.push(plugin);
        }

        Self {
            doc,
            selection,
            schema,
            plugins: installed,
            plugin_states,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn tr(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection.clone())
    }

    pub fn apply(&self, tr: &Transaction) -> EditorState {
        let plugin_states = self
            .plugins
            .iter()
            .map(|plugin| {
                let previous = self
                    .plugin_states
                    .get(plugin.key())
                    .cloned()
                    .unwrap_or_default();
                (plugin.key(), plugin.apply(tr, &previous))
            })
            .collect();

        EditorState {
            doc: tr.doc().clone(),
            selection: tr.selection().clone(),
            schema: self.schema.clone(),
            plugins: self.plugins.clone(),
            plugin_states,
        }
    }

    pub fn plugin_state(&self, key: &str) -> Option<&DecorationSet> {
        self.plugin_states.get(key)
    }

    pub fn decorations(&self) -> impl Iterator<Item = &Decoration> {
        self.plugin_states.values().flat_map(DecorationSet::iter)
    }
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("plugins", &self.plugin_states.keys().collect::<Vec<_>>())
            .finish()
    }
}
