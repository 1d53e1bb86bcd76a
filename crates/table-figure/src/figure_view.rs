use std::fmt;
use std::sync::Arc;

use manos_plate_core::{DomElement, EditorView, Node, Selection, Transaction};
use uuid::Uuid;

use crate::config::FigureConfig;
use crate::figure::{add_notes, figure_has_notes, set_figure_maximized, set_figure_size};
use crate::node_spec::{FIGURE, FigureType, Orientation};

pub type GetPos = Box<dyn Fn() -> Option<usize> + Send + Sync>;

/// Headless node view for a figure: the state a renderer needs and the
/// actions its controls trigger.
pub struct FigureView {
    node: Node,
    view: Arc<dyn EditorView>,
    get_pos: GetPos,
    config: FigureConfig,
    dom_id: String,
    selected: bool,
}

impl FigureView {
    pub fn new(
        node: Node,
        view: Arc<dyn EditorView>,
        get_pos: GetPos,
        config: FigureConfig,
    ) -> Self {
        Self {
            node,
            view,
            get_pos,
            config,
            dom_id: Uuid::new_v4().to_string(),
            selected: false,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    fn orientation(&self) -> Orientation {
        self.node
            .attr_str("orientation")
            .and_then(Orientation::parse)
            .unwrap_or(Orientation::Portrait)
    }

    fn maximized(&self) -> bool {
        self.node
            .attr("maximized")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn dom(&self) -> DomElement {
        let mut class = String::from("table-figure has-hover-handle");
        if self.selected {
            class.push_str(" selected-node");
        }
        let mut el = DomElement::new("div")
            .attr("id", self.dom_id.as_str())
            .attr("class", class)
            .attr("data-type", "table-figure")
            .attr("data-id", self.node.attr_str("id").unwrap_or(""))
            .attr("data-figure-type", self.node.attr_str("figureType").unwrap_or("table"));
        if self.selected {
            el = el.attr("data-active", "true");
        }
        el
    }

    /// Width of the scrolling frame in pixels.
    pub fn frame_width(&self) -> u32 {
        if self.maximized() {
            self.config.maximized_max_width
        } else {
            self.config.portrait_width
        }
    }

    /// Width of the content inside the frame. `None` fills the frame.
    pub fn content_width(&self) -> Option<u32> {
        match self.orientation() {
            Orientation::Landscape => Some(self.config.landscape_width),
            Orientation::Portrait => None,
        }
    }

    /// The "add notes" control shows until the figure has notes.
    pub fn add_notes_visible(&self) -> bool {
        let known_type = self
            .node
            .attr_str("figureType")
            .and_then(FigureType::parse)
            .is_some();
        known_type && !figure_has_notes(&self.node)
    }

    fn dispatch_with(&self, edit: impl FnOnce(Transaction, usize) -> Transaction) {
        let Some(pos) = (self.get_pos)() else {
            tracing::debug!("figure view has no position");
            return;
        };
        let state = self.view.state();
        let tr = edit(state.tr(), pos);
        if tr.doc_changed() || tr.selection_set() {
            self.view.dispatch(tr);
        }
    }

    pub fn add_notes(&self) {
        let schema = self.view.state().schema().clone();
        self.dispatch_with(|tr, pos| add_notes(tr, &schema, pos));
    }

    /// Selects the whole figure, or drops back into its content when it is
    /// already selected.
    pub fn toggle_select(&self) {
        let state = self.view.state();
        self.dispatch_with(|mut tr, pos| {
            let already =
                matches!(state.selection(), Selection::Node { pos: at, .. } if *at == pos);
            let next = if already {
                Some(Selection::cursor(pos + 1))
            } else {
                Selection::node(state.doc(), pos)
            };
            if let Some(selection) = next {
                tr.set_selection(selection);
            }
            tr
        });
    }

    pub fn resize_end(&self, width: u32, height: u32) {
        self.dispatch_with(|tr, pos| set_figure_size(tr, pos, width, height));
    }

    pub fn toggle_maximized(&self) {
        let maximized = !self.maximized();
        self.dispatch_with(|tr, pos| set_figure_maximized(tr, pos, maximized));
    }

    /// Takes the new version of the node. A node of another kind cannot be
    /// shown by this view.
    pub fn update(&mut self, node: &Node) -> bool {
        if node.kind() != FIGURE {
            return false;
        }
        self.node = node.clone();
        true
    }

    pub fn select_node(&mut self) {
        self.selected = true;
    }

    pub fn deselect_node(&mut self) {
        self.selected = false;
    }
}

impl fmt::Debug for FigureView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FigureView")
            .field("node", &self.node)
            .field("dom_id", &self.dom_id)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}
