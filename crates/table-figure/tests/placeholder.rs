use std::sync::Arc;

use manos_plate_core::{Document, EditorState, Node, Schema, Selection, StatePlugin};
use manos_table_figure::{
    CursorPlaceholderPlugin, PLACEHOLDER_KEY, PlaceholderAction, PlaceholderRegistry,
    find_cursor_placeholder_pos, hide_cursor_placeholder, show_cursor_placeholder,
};

fn setup(selection: Selection) -> (Arc<PlaceholderRegistry>, EditorState) {
    let registry = Arc::new(PlaceholderRegistry::new());
    let plugin: Arc<dyn StatePlugin> = CursorPlaceholderPlugin::install(&registry);
    let state = EditorState::create(
        Arc::new(Schema::basic()),
        Document::new(vec![Node::paragraph("hello"), Node::paragraph("world")]),
        selection,
        vec![plugin],
    );
    (registry, state)
}

fn markers(state: &EditorState) -> usize {
    state.plugin_state(PLACEHOLDER_KEY).map_or(0, |set| set.len())
}

#[test]
fn show_marks_the_selection_start() {
    let (registry, state) = setup(Selection::cursor(3));
    let tr = show_cursor_placeholder(&registry, &state);
    assert_eq!(
        PlaceholderAction::from_transaction(&tr),
        Some(PlaceholderAction::Add { pos: 3 })
    );

    let state = state.apply(&tr);
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), Some(3));
}

#[test]
fn showing_twice_keeps_one_marker() {
    let (registry, state) = setup(Selection::cursor(3));
    let state = state.apply(&show_cursor_placeholder(&registry, &state));
    let tr = show_cursor_placeholder(&registry, &state);
    assert!(PlaceholderAction::from_transaction(&tr).is_none());

    let state = state.apply(&tr);
    assert_eq!(markers(&state), 1);
}

#[test]
fn hide_without_show_does_nothing() {
    let (registry, state) = setup(Selection::cursor(3));
    let tr = hide_cursor_placeholder(&registry, &state);
    assert!(tr.meta(PLACEHOLDER_KEY).is_none());
    assert!(!tr.doc_changed());
}

#[test]
fn hide_removes_the_marker() {
    let (registry, state) = setup(Selection::cursor(3));
    let state = state.apply(&show_cursor_placeholder(&registry, &state));
    let tr = hide_cursor_placeholder(&registry, &state);
    assert_eq!(
        PlaceholderAction::from_transaction(&tr),
        Some(PlaceholderAction::Remove)
    );

    let state = state.apply(&tr);
    assert_eq!(markers(&state), 0);
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), None);
}

#[test]
fn show_replaces_a_selected_range() {
    let (registry, state) = setup(Selection::text(2, 4));
    let state = state.apply(&show_cursor_placeholder(&registry, &state));

    assert_eq!(state.doc().children[0].text_content(), "hlo");
    assert_eq!(state.selection(), &Selection::cursor(2));
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), Some(2));
}

#[test]
fn show_keeps_a_selected_node() {
    let (registry, state) = setup(Selection::cursor(0));
    let selected = Selection::node(state.doc(), 7).unwrap();
    let mut tr = state.tr();
    tr.set_selection(selected.clone());
    let state = state.apply(&tr);

    let state = state.apply(&show_cursor_placeholder(&registry, &state));
    assert_eq!(state.doc().children[1].text_content(), "world");
    assert_eq!(state.selection(), &selected);
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), Some(7));
}

#[test]
fn marker_follows_edits_before_it() {
    let (registry, state) = setup(Selection::cursor(9));
    let state = state.apply(&show_cursor_placeholder(&registry, &state));

    let mut tr = state.tr();
    tr.insert(1, Node::text(">> ")).unwrap();
    let state = state.apply(&tr);
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), Some(12));

    let mut tr = state.tr();
    tr.delete(1, 4).unwrap();
    let state = state.apply(&tr);
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), Some(9));
}

#[test]
fn nothing_happens_without_an_active_plugin() {
    let (registry, state) = setup(Selection::text(2, 4));
    registry.reset();

    let tr = show_cursor_placeholder(&registry, &state);
    assert!(tr.meta(PLACEHOLDER_KEY).is_none());
    assert!(!tr.doc_changed());
    assert!(hide_cursor_placeholder(&registry, &state).meta(PLACEHOLDER_KEY).is_none());
}

#[test]
fn marker_at_document_start_reads_as_missing() {
    let (registry, state) = setup(Selection::cursor(0));
    let state = state.apply(&show_cursor_placeholder(&registry, &state));
    assert_eq!(markers(&state), 1);
    assert_eq!(find_cursor_placeholder_pos(&registry, &state), None);

    let state = state.apply(&show_cursor_placeholder(&registry, &state));
    assert_eq!(markers(&state), 2);
}
