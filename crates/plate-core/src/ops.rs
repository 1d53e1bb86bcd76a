use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Document, Node, TextNode, content_size};
use crate::error::StepError;
use crate::selection::Selection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Replaces the content between `from` and `to` with `nodes`. Both ends
    /// must sit in the same parent.
    Replace {
        from: usize,
        to: usize,
        #[serde(default)]
        nodes: Vec<Node>,
    },
    /// Swaps the attributes of the node starting at `pos`, keeping its
    /// content. Positions do not move.
    SetNodeAttrs { pos: usize, attrs: Attrs },
}

impl Step {
    fn apply(&self, doc: &mut Document) -> Result<StepMap, StepError> {
        match self {
            Step::Replace { from, to, nodes } => replace_in(doc, *from, *to, nodes.clone()),
            Step::SetNodeAttrs { pos, attrs } => set_attrs_in(doc, *pos, attrs.clone()),
        }
    }
}

/// How one step moved positions: `old_size` positions at `start` became
/// `new_size` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    pub deleted: bool,
}

impl StepMap {
    /// `assoc` picks the side a position sticks to when content is inserted
    /// exactly at it: negative keeps it before, otherwise it moves after.
    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let end = self.start + self.old_size;
        if pos < self.start {
            return MapResult {
                pos,
                deleted: false,
            };
        }
        if pos > end {
            return MapResult {
                pos: pos + self.new_size - self.old_size,
                deleted: false,
            };
        }

        let side = if self.old_size == 0 {
            assoc
        } else if pos == self.start {
            -1
        } else if pos == end {
            1
        } else {
            assoc
        };
        let mapped = self.start + if side < 0 { 0 } else { self.new_size };
        let deleted = if assoc < 0 {
            pos != self.start
        } else {
            pos != end
        };
        MapResult {
            pos: mapped,
            deleted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(default)]
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut result = MapResult {
            pos,
            deleted: false,
        };
        for map in &self.maps {
            let next = map.map_result(result.pos, assoc);
            result = MapResult {
                pos: next.pos,
                deleted: result.deleted || next.deleted,
            };
        }
        result
    }
}

/// A document edit in progress. Steps apply immediately to `doc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    doc: Document,
    #[serde(default)]
    steps: Vec<Step>,
    #[serde(default)]
    mapping: Mapping,
    selection: Selection,
    #[serde(default)]
    selection_set: bool,
    #[serde(default)]
    meta: BTreeMap<String, Value>,
}

impl Transaction {
    pub fn new(doc: Document, selection: Selection) -> Self {
        Self {
            doc,
            steps: Vec::new(),
            mapping: Mapping::default(),
            selection,
            selection_set: false,
            meta: BTreeMap::new(),
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Applies `step`. On error the transaction is left untouched.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, StepError> {
        let map = step.apply(&mut self.doc)?;
        self.steps.push(step);
        self.mapping.push(map);
        if !self.selection_set {
            let single = Mapping { maps: vec![map] };
            self.selection = self.selection.map(&single);
        }
        Ok(self)
    }

    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    ) -> Result<&mut Self, StepError> {
        if from == to && nodes.is_empty() {
            return Ok(self);
        }
        self.step(Step::Replace { from, to, nodes })
    }

    pub fn insert(&mut self, pos: usize, node: Node) -> Result<&mut Self, StepError> {
        self.replace(pos, pos, vec![node])
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        node: Node,
    ) -> Result<&mut Self, StepError> {
        self.replace(from, to, vec![node])
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        self.replace(from, to, Vec::new())
    }

    /// Splits the node whose content holds `pos` into two nodes of the same
    /// kind and attributes, cutting text at `pos`.
    pub fn split(&mut self, pos: usize) -> Result<&mut Self, StepError> {
        let resolved = self.doc.resolve(pos)?;
        let Some((&ix, outer)) = resolved.parent_path.split_last() else {
            return Err(StepError::InvalidPath("the document root cannot be split".into()));
        };
        let parent = self
            .doc
            .children_at(outer)
            .and_then(|siblings| siblings.get(ix))
            .ok_or_else(|| StepError::InvalidPath(format!("{:?}", resolved.parent_path)))?;

        let start = resolved.content_start - 1;
        let end = start + parent.node_size();
        let (left, right) = split_children(parent.children().to_vec(), resolved.parent_offset);
        let nodes = vec![parent.with_children(left), parent.with_children(right)];
        self.replace(start, end, nodes)
    }

    /// Rebuilds the node at `pos` with `attrs`.
    pub fn set_node_markup(&mut self, pos: usize, attrs: Attrs) -> Result<&mut Self, StepError> {
        self.step(Step::SetNodeAttrs { pos, attrs })
    }

    pub fn delete_selection(&mut self) -> Result<&mut Self, StepError> {
        if self.selection.is_empty() {
            return Ok(self);
        }
        let (from, to) = (self.selection.from(), self.selection.to());
        self.delete(from, to)?;
        self.selection = Selection::cursor(from);
        Ok(self)
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self.selection_set = true;
        self
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
}

fn replace_in(
    doc: &mut Document,
    from: usize,
    to: usize,
    nodes: Vec<Node>,
) -> Result<StepMap, StepError> {
    if from > to {
        return Err(StepError::InvertedRange { from, to });
    }
    let start = doc.resolve(from)?;
    let end = doc.resolve(to)?;
    if start.parent_path != end.parent_path {
        return Err(StepError::CrossesParents { from, to });
    }

    let new_size = content_size(&nodes);
    let children = doc
        .children_at_mut(&start.parent_path)
        .ok_or_else(|| StepError::InvalidPath(format!("{:?}", start.parent_path)))?;

    let (before, rest) = split_children(std::mem::take(children), start.parent_offset);
    let (_, after) = split_children(rest, end.parent_offset - start.parent_offset);

    let mut next = before;
    next.extend(nodes);
    next.extend(after);
    *children = join_text(next);

    Ok(StepMap {
        start: from,
        old_size: to - from,
        new_size,
    })
}

fn set_attrs_in(doc: &mut Document, pos: usize, attrs: Attrs) -> Result<StepMap, StepError> {
    let resolved = doc.resolve(pos)?;
    let children = doc
        .children_at_mut(&resolved.parent_path)
        .ok_or_else(|| StepError::InvalidPath(format!("{:?}", resolved.parent_path)))?;

    let mut offset = 0;
    for child in children.iter_mut() {
        if offset == resolved.parent_offset && !child.is_text() {
            *child = child.with_attrs(attrs);
            return Ok(StepMap {
                start: pos,
                old_size: 0,
                new_size: 0,
            });
        }
        if offset > resolved.parent_offset {
            break;
        }
        offset += child.node_size();
    }
    Err(StepError::NoNodeAt { pos })
}

/// Splits `children` at a content offset, cutting a text node in two when
/// the offset falls inside it.
fn split_children(children: Vec<Node>, at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left: Vec<Node> = Vec::new();
    let mut right: Vec<Node> = Vec::new();
    let mut offset = 0;

    for child in children {
        let size = child.node_size();
        if offset >= at {
            right.push(child);
        } else if offset + size <= at {
            left.push(child);
        } else {
            match child {
                Node::Text(TextNode { text }) => {
                    let cut = at - offset;
                    left.push(Node::text(text.chars().take(cut).collect::<String>()));
                    right.push(Node::text(text.chars().skip(cut).collect::<String>()));
                }
                other => right.push(other),
            }
        }
        offset += size;
    }

    (left, right)
}

/// Drops empty text leaves and merges adjacent ones.
fn join_text(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Text(t) if t.text.is_empty() => {}
            Node::Text(t) => match out.last_mut() {
                Some(Node::Text(prev)) => prev.text.push_str(&t.text),
                _ => out.push(Node::Text(t)),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(vec![Node::paragraph("hello")])
    }

    #[test]
    fn insert_splits_text_and_maps_selection() {
        let mut tr = Transaction::new(doc(), Selection::cursor(4));
        tr.insert(3, Node::text("XY")).unwrap();
        assert_eq!(tr.doc().children[0].text_content(), "heXYllo");
        assert_eq!(tr.doc().children[0].child_count(), 1);
        assert_eq!(tr.selection(), &Selection::cursor(6));
        assert!(tr.doc_changed());
    }

    #[test]
    fn delete_selection_collapses_to_start() {
        let mut tr = Transaction::new(doc(), Selection::text(2, 4));
        tr.delete_selection().unwrap();
        assert_eq!(tr.doc().children[0].text_content(), "hlo");
        assert_eq!(tr.selection(), &Selection::cursor(2));
    }

    #[test]
    fn cross_parent_replace_leaves_transaction_untouched() {
        let start = Document::new(vec![Node::paragraph("a"), Node::paragraph("b")]);
        let mut tr = Transaction::new(start.clone(), Selection::cursor(1));
        let err = tr.delete(1, 4).unwrap_err();
        assert_eq!(err, StepError::CrossesParents { from: 1, to: 4 });
        assert_eq!(tr.doc(), &start);
        assert!(!tr.doc_changed());
    }

    #[test]
    fn split_cuts_the_parent_in_two() {
        let mut tr = Transaction::new(doc(), Selection::cursor(3));
        tr.split(3).unwrap();
        assert_eq!(tr.doc().children.len(), 2);
        assert_eq!(tr.doc().children[0].text_content(), "he");
        assert_eq!(tr.doc().children[1].text_content(), "llo");
        assert_eq!(tr.doc().content_size(), 9);
        assert!(tr.split(0).is_err());
    }

    #[test]
    fn set_node_markup_keeps_content_and_positions() {
        let mut tr = Transaction::new(doc(), Selection::cursor(3));
        let mut attrs = Attrs::new();
        attrs.insert("align".into(), Value::from("center"));
        tr.set_node_markup(0, attrs.clone()).unwrap();
        assert_eq!(tr.doc().children[0].attrs(), Some(&attrs));
        assert_eq!(tr.doc().children[0].text_content(), "hello");
        assert_eq!(tr.selection(), &Selection::cursor(3));

        let err = tr.set_node_markup(2, Attrs::new()).unwrap_err();
        assert_eq!(err, StepError::NoNodeAt { pos: 2 });
    }

    #[test]
    fn mapping_shifts_positions_after_an_edit() {
        let mut tr = Transaction::new(doc(), Selection::cursor(1));
        tr.insert(0, Node::paragraph("")).unwrap();
        assert_eq!(tr.mapping().map(1, 1), 3);
        assert_eq!(tr.mapping().map(0, -1), 0);
        assert_eq!(tr.mapping().map(0, 1), 2);

        tr.delete(2, 9).unwrap();
        let result = tr.mapping().map_result(4, 1);
        assert!(result.deleted);
        assert_eq!(result.pos, 2);
    }
}
