use std::fmt;
use std::sync::Arc;

use manos_plate_core::{EditorView, Node, NodeSpec, Schema, SchemaError, StatePlugin};

use crate::command::{ImageSourceCommand, PopupHost, TableFigureCommand, UiCommand};
use crate::config::FigureConfig;
use crate::figure_view::{FigureView, GetPos};
use crate::node_spec::{
    FIGURE, effective_schema, figure_body_node_spec, figure_caption_node_spec,
    figure_node_spec, figure_notes_node_spec, simple_image_node_spec,
};
use crate::placeholder::{CursorPlaceholderPlugin, PlaceholderRegistry};

/// A labelled toolbar entry.
#[derive(Clone)]
pub struct ButtonCommand {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub command: Arc<dyn UiCommand>,
}

impl ButtonCommand {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        command: Arc<dyn UiCommand>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            command,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Debug for ButtonCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonCommand")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Bundles the figure node types, the placeholder state plugin, the toolbar
/// commands and the figure node view.
pub struct TableFigurePlugin {
    config: FigureConfig,
    popups: Arc<dyn PopupHost>,
    placeholders: Arc<PlaceholderRegistry>,
}

impl TableFigurePlugin {
    pub fn new(popups: Arc<dyn PopupHost>) -> Self {
        Self {
            config: FigureConfig::default(),
            popups,
            placeholders: PlaceholderRegistry::global(),
        }
    }

    pub fn config(mut self, config: FigureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn placeholders(mut self, placeholders: Arc<PlaceholderRegistry>) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn id(&self) -> &'static str {
        "table_figure"
    }

    pub fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            figure_node_spec(),
            figure_body_node_spec(),
            figure_notes_node_spec(),
            figure_caption_node_spec(),
            simple_image_node_spec(),
        ]
    }

    pub fn effective_schema(&self, base: &Schema) -> Result<Schema, SchemaError> {
        effective_schema(base)
    }

    /// State plugins to install in the editor state. Registers a placeholder
    /// plugin unless one is already active.
    pub fn state_plugins(&self) -> Vec<Arc<dyn StatePlugin>> {
        let plugin: Arc<dyn StatePlugin> = match self.placeholders.current() {
            Some(active) => active,
            None => CursorPlaceholderPlugin::install(&self.placeholders),
        };
        vec![plugin]
    }

    pub fn button_commands(&self) -> Vec<ButtonCommand> {
        vec![
            ButtonCommand::new(
                "table_figure.insert_table",
                "Insert Table",
                Arc::new(TableFigureCommand::new(self.config.clone())),
            )
            .description("Insert a table figure with a caption"),
            ButtonCommand::new(
                "table_figure.insert_image_url",
                "Insert Image by URL",
                Arc::new(
                    ImageSourceCommand::from_url(self.popups.clone())
                        .with_placeholders(self.placeholders.clone()),
                ),
            ),
            ButtonCommand::new(
                "table_figure.upload_image",
                "Upload Image",
                Arc::new(
                    ImageSourceCommand::upload(self.popups.clone())
                        .with_placeholders(self.placeholders.clone()),
                ),
            ),
        ]
    }

    /// A view for `node` if it is a figure.
    pub fn node_view(
        &self,
        node: &Node,
        view: Arc<dyn EditorView>,
        get_pos: GetPos,
    ) -> Option<FigureView> {
        (node.kind() == FIGURE)
            .then(|| FigureView::new(node.clone(), view, get_pos, self.config.clone()))
    }
}

impl fmt::Debug for TableFigurePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFigurePlugin")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
