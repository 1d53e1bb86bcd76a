use manos_plate_core::{Attrs, ChildConstraint, Node, Schema, Selection, StepError, Transaction};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::FigureConfig;
use crate::node_spec::{
    FIGURE, FIGURE_BODY, FIGURE_CAPTION, FIGURE_NOTES, FigureType, IMAGE, Orientation, PARAGRAPH,
    TABLE, TABLE_CELL, TABLE_ROW,
};

/// Text of a freshly added notes block. Keeps the block from collapsing.
const NOTES_PLACEHOLDER: &str = "\u{200B}";
/// Text of a blank caption.
const BLANK_CAPTION: &str = " ";

/// A `rows` x `cols` table whose cells each hold one empty paragraph.
/// `None` when the schema lacks any of the table node types.
pub fn create_table_grid(schema: &Schema, rows: usize, cols: usize) -> Option<Node> {
    let table = schema.node_type(TABLE)?;
    let row = schema.node_type(TABLE_ROW)?;
    let cell = schema.node_type(TABLE_CELL)?;
    let paragraph = schema.node_type(PARAGRAPH)?;

    let rows = (0..rows)
        .map(|_| {
            let cells = (0..cols)
                .map(|_| {
                    let paragraph = paragraph.create(Attrs::new(), Vec::new());
                    cell.create(Attrs::new(), vec![paragraph])
                })
                .collect();
            row.create(Attrs::new(), cells)
        })
        .collect();
    Some(table.create(Attrs::new(), rows))
}

/// Gives the leading cells of the first row the configured background.
fn highlight_header(table: Node, config: &FigureConfig) -> Node {
    let mut rows = table.children().to_vec();
    if let Some(first) = rows.first_mut() {
        let cells = first
            .children()
            .iter()
            .enumerate()
            .map(|(ix, cell)| {
                if ix >= config.highlighted_cells {
                    return cell.clone();
                }
                let mut attrs = cell.attrs().cloned().unwrap_or_default();
                attrs.insert("background".into(), Value::from(config.highlight.as_str()));
                cell.with_attrs(attrs)
            })
            .collect();
        *first = first.with_children(cells);
    }
    table.with_children(rows)
}

/// Assembles `[body(content), caption]` under a new figure node.
fn build_figure(
    schema: &Schema,
    figure_type: FigureType,
    content: Node,
    config: &FigureConfig,
) -> Option<Node> {
    let figure = schema.node_type(FIGURE)?;
    let body = schema.node_type(FIGURE_BODY)?;
    let caption = schema.node_type(FIGURE_CAPTION)?;

    let mut attrs = Attrs::new();
    attrs.insert("id".into(), Value::from(Uuid::new_v4().to_string()));
    attrs.insert("figureType".into(), Value::from(figure_type.as_str()));
    attrs.insert("orientation".into(), Value::from(Orientation::Landscape.as_str()));
    attrs.insert("width".into(), Value::from(config.width));
    attrs.insert("height".into(), Value::from(config.height));

    Some(figure.create(
        attrs,
        vec![
            body.create(Attrs::new(), vec![content]),
            caption.create(Attrs::new(), vec![schema.text(BLANK_CAPTION)]),
        ],
    ))
}

/// Where a new block goes for the current selection: at a collapsed cursor,
/// or right after a selected node. Ranges have no insertion point.
fn insertion_point(tr: &Transaction) -> Option<usize> {
    match tr.selection() {
        Selection::Node { pos, size } => Some(pos + size),
        selection if selection.is_empty() => Some(selection.from()),
        _ => None,
    }
}

/// Where a block can go for a cursor at `pos`. A cursor inside a textblock
/// moves before or after it, or splits it when sitting mid-text.
fn block_insert_pos(tr: &mut Transaction, schema: &Schema, pos: usize) -> Result<usize, StepError> {
    let resolved = tr.doc().resolve(pos)?;
    let Some((&ix, outer)) = resolved.parent_path.split_last() else {
        return Ok(pos);
    };
    let Some(parent) = tr.doc().children_at(outer).and_then(|siblings| siblings.get(ix)) else {
        return Ok(pos);
    };
    let textblock = schema
        .spec(parent.kind())
        .is_some_and(|spec| spec.children == ChildConstraint::InlineOnly);
    if !textblock {
        return Ok(pos);
    }

    let parent_start = resolved.content_start - 1;
    let content_size = parent.content_size();
    if resolved.parent_offset == 0 {
        return Ok(parent_start);
    }
    if resolved.parent_offset == content_size {
        return Ok(resolved.content_start + content_size + 1);
    }
    tr.split(pos)?;
    Ok(parent_start + resolved.parent_offset + 2)
}

/// Inserts `figure` at the block position nearest `from`, follows it with an
/// empty paragraph and puts the cursor inside that paragraph.
fn insert_figure(
    tr: &mut Transaction,
    schema: &Schema,
    from: usize,
    figure: Node,
) -> Result<(), StepError> {
    let at = block_insert_pos(tr, schema, from)?;
    let size = figure.node_size();
    tr.insert(at, figure)?;

    let paragraph = match schema.node_type(PARAGRAPH) {
        Some(paragraph) => paragraph.create_and_fill(),
        None => Node::paragraph(""),
    };
    let after = at + size;
    tr.insert(after, paragraph)?;
    tr.set_selection(Selection::cursor(after + 1));
    Ok(())
}

/// Runs `edit` on a copy of `tr`. Any step failure returns `tr` as it was.
fn try_edit(
    tr: Transaction,
    what: &'static str,
    edit: impl FnOnce(&mut Transaction) -> Result<(), StepError>,
) -> Transaction {
    let mut next = tr.clone();
    match edit(&mut next) {
        Ok(()) => next,
        Err(err) => {
            debug!(?err, what, "figure edit failed, keeping transaction unchanged");
            tr
        }
    }
}

/// Inserts a figure holding a default-sized table at a collapsed selection,
/// or after a selected node.
pub fn insert_table_figure(tr: Transaction, schema: &Schema) -> Transaction {
    insert_table_figure_with(tr, schema, &FigureConfig::default())
}

pub fn insert_table_figure_with(
    tr: Transaction,
    schema: &Schema,
    config: &FigureConfig,
) -> Transaction {
    let Some(from) = insertion_point(&tr) else {
        debug!("table figure needs a collapsed selection");
        return tr;
    };
    let Some(table) = create_table_grid(schema, config.table_rows, config.table_cols) else {
        debug!("schema has no table node types");
        return tr;
    };
    let content = highlight_header(table, config);
    let Some(figure) = build_figure(schema, FigureType::Table, content, config) else {
        debug!("schema has no figure node types");
        return tr;
    };
    try_edit(tr, "insert table figure", |tr| insert_figure(tr, schema, from, figure))
}

/// Inserts a figure holding a single image at a collapsed selection, or
/// after a selected node.
pub fn insert_image_figure(
    tr: Transaction,
    schema: &Schema,
    url: &str,
    alt: Option<&str>,
) -> Transaction {
    let Some(from) = insertion_point(&tr) else {
        debug!("image figure needs a collapsed selection");
        return tr;
    };
    let Some(image) = schema.node_type(IMAGE) else {
        debug!("schema has no image node type");
        return tr;
    };

    let mut attrs = Attrs::new();
    attrs.insert("src".into(), Value::from(url));
    attrs.insert("alt".into(), Value::from(alt.unwrap_or("")));
    attrs.insert("simpleImg".into(), Value::from("false"));
    attrs.insert("cropData".into(), Value::Null);
    let image = image.create(attrs, Vec::new());

    let config = FigureConfig::default();
    let Some(figure) = build_figure(schema, FigureType::Figure, image, &config) else {
        debug!("schema has no figure node types");
        return tr;
    };
    try_edit(tr, "insert image figure", |tr| insert_figure(tr, schema, from, figure))
}

pub fn figure_has_notes(figure: &Node) -> bool {
    figure.children().iter().any(|child| child.kind() == FIGURE_NOTES)
}

fn figure_at(tr: &Transaction, pos: usize) -> Option<Node> {
    tr.doc()
        .node_at(pos)
        .filter(|node| node.kind() == FIGURE)
        .cloned()
}

/// Adds a blank notes block right after the body of the figure at `pos`.
/// Does nothing when the figure already has notes.
pub fn add_notes(tr: Transaction, schema: &Schema, pos: usize) -> Transaction {
    let Some(figure) = figure_at(&tr, pos) else {
        debug!(pos, "no figure at position");
        return tr;
    };
    if figure_has_notes(&figure) {
        return tr;
    }
    let Some(notes) = schema.node_type(FIGURE_NOTES) else {
        debug!("schema has no notes node type");
        return tr;
    };

    let mut children = figure.children().to_vec();
    let at = children
        .iter()
        .position(|child| child.kind() == FIGURE_BODY)
        .map_or(0, |ix| ix + 1);
    children.insert(at, notes.create(Attrs::new(), vec![schema.text(NOTES_PLACEHOLDER)]));
    let rebuilt = figure.with_children(children);

    try_edit(tr, "add notes", |tr| {
        let node_selected =
            matches!(tr.selection(), Selection::Node { pos: selected, .. } if *selected == pos);
        let size = rebuilt.node_size();
        tr.replace_with(pos, pos + figure.node_size(), rebuilt)?;
        if node_selected {
            tr.set_selection(Selection::Node { pos, size });
        }
        Ok(())
    })
}

/// Replaces the attributes of the figure at `pos` with `update` applied to
/// a copy of them.
fn update_figure_attrs(
    tr: Transaction,
    pos: usize,
    what: &'static str,
    update: impl FnOnce(&mut Attrs),
) -> Transaction {
    let Some(figure) = figure_at(&tr, pos) else {
        debug!(pos, "no figure at position");
        return tr;
    };
    let mut attrs = figure.attrs().cloned().unwrap_or_default();
    update(&mut attrs);
    if figure.attrs() == Some(&attrs) {
        return tr;
    }
    try_edit(tr, what, |tr| tr.set_node_markup(pos, attrs).map(|_| ()))
}

pub fn set_figure_size(tr: Transaction, pos: usize, width: u32, height: u32) -> Transaction {
    update_figure_attrs(tr, pos, "resize figure", |attrs| {
        attrs.insert("width".into(), Value::from(width));
        attrs.insert("height".into(), Value::from(height));
    })
}

pub fn set_figure_maximized(tr: Transaction, pos: usize, maximized: bool) -> Transaction {
    update_figure_attrs(tr, pos, "maximize figure", |attrs| {
        attrs.insert("maximized".into(), Value::from(maximized));
    })
}

pub fn set_figure_orientation(
    tr: Transaction,
    pos: usize,
    orientation: Orientation,
) -> Transaction {
    update_figure_attrs(tr, pos, "orient figure", |attrs| {
        attrs.insert("orientation".into(), Value::from(orientation.as_str()));
    })
}
