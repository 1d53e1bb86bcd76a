use std::sync::Arc;

use manos_plate_core::{Document, Editor, EditorState, EditorView, Node, Schema, Selection};
use manos_table_figure::{
    FIGURE_NOTES, FigureConfig, FigureView, TableFigurePlugin, insert_table_figure,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

mod support {
    use async_trait::async_trait;
    use manos_table_figure::{ImageProps, PopupHost, PopupProps};

    pub struct NoPopups;

    #[async_trait]
    impl PopupHost for NoPopups {
        async fn open(&self, _props: PopupProps) -> Option<ImageProps> {
            None
        }
    }
}

fn editor_with_figure() -> Arc<Editor> {
    let schema = Arc::new(manos_table_figure::effective_schema(&Schema::basic()).unwrap());
    let state =
        EditorState::create(schema.clone(), Document::default(), Selection::cursor(0), Vec::new());
    let tr = insert_table_figure(state.tr(), &schema);
    Arc::new(Editor::new(state.apply(&tr)))
}

fn figure(editor: &Editor) -> Node {
    editor.state().doc().children[0].clone()
}

fn view_at(editor: &Arc<Editor>, pos: Option<usize>) -> FigureView {
    let view: Arc<dyn EditorView> = editor.clone();
    FigureView::new(figure(editor), view, Box::new(move || pos), FigureConfig::default())
}

/// Reloads the figure into the view the way a renderer would after a dispatch.
fn refresh(view: &mut FigureView, editor: &Editor) {
    assert!(view.update(&figure(editor)));
}

#[test]
fn plugin_only_builds_views_for_figures() {
    let editor = editor_with_figure();
    let plugin = TableFigurePlugin::new(Arc::new(support::NoPopups));
    let view: Arc<dyn EditorView> = editor.clone();

    assert!(plugin.node_view(&figure(&editor), view.clone(), Box::new(|| Some(0))).is_some());
    let paragraph = editor.state().doc().children[1].clone();
    assert!(plugin.node_view(&paragraph, view, Box::new(|| Some(0))).is_none());
}

#[test]
fn notes_control_hides_once_notes_exist() {
    let editor = editor_with_figure();
    let mut view = view_at(&editor, Some(0));
    assert!(view.add_notes_visible());

    view.add_notes();
    refresh(&mut view, &editor);

    assert!(!view.add_notes_visible());
    assert_eq!(view.node().children()[1].kind(), FIGURE_NOTES);

    view.add_notes();
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn toggling_selection_alternates_node_and_cursor() {
    let editor = editor_with_figure();
    let view = view_at(&editor, Some(0));
    let size = figure(&editor).node_size();

    view.toggle_select();
    assert_eq!(editor.state().selection(), &Selection::Node { pos: 0, size });

    view.toggle_select();
    assert_eq!(editor.state().selection(), &Selection::cursor(1));
}

#[test]
fn resizing_stores_the_final_size() {
    let editor = editor_with_figure();
    let mut view = view_at(&editor, Some(0));

    view.resize_end(720, 410);
    refresh(&mut view, &editor);

    assert_eq!(view.node().attr("width"), Some(&Value::from(720)));
    assert_eq!(view.node().attr("height"), Some(&Value::from(410)));
}

#[test]
fn maximizing_widens_the_frame() {
    let editor = editor_with_figure();
    let mut view = view_at(&editor, Some(0));
    let config = FigureConfig::default();

    assert_eq!(view.frame_width(), config.portrait_width);
    assert_eq!(view.content_width(), Some(config.landscape_width));

    view.toggle_maximized();
    refresh(&mut view, &editor);
    assert_eq!(view.frame_width(), config.maximized_max_width);

    view.toggle_maximized();
    refresh(&mut view, &editor);
    assert_eq!(view.frame_width(), config.portrait_width);
}

#[test]
fn actions_without_a_position_do_nothing() {
    let editor = editor_with_figure();
    let view = view_at(&editor, None);

    view.add_notes();
    view.toggle_select();
    view.resize_end(10, 10);
    view.toggle_maximized();

    assert!(editor.history().is_empty());
}

#[test]
fn selection_shows_in_the_dom() {
    let editor = editor_with_figure();
    let mut view = view_at(&editor, Some(0));
    let id = figure(&editor).attr_str("id").unwrap_or_default().to_string();

    let dom = view.dom();
    assert_eq!(dom.get("data-id"), Some(id.as_str()));
    assert_eq!(dom.get("data-active"), None);

    view.select_node();
    let dom = view.dom();
    assert_eq!(dom.get("data-active"), Some("true"));
    assert!(dom.get("class").unwrap_or_default().contains("selected-node"));

    view.deselect_node();
    assert!(!view.is_selected());
}

#[test]
fn views_refuse_other_node_kinds() {
    let editor = editor_with_figure();
    let mut view = view_at(&editor, Some(0));
    assert!(!view.update(&Node::paragraph("x")));
}
