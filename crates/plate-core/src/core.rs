use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StepError;

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

/// Root of the node tree. Positions count from the start of `children`, so
/// the document itself contributes no opening or closing token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
}

impl Node {
    pub fn element(kind: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            children,
        })
    }

    pub fn void(kind: impl Into<String>, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode { text: text.into() })
    }

    /// A paragraph holding `text`. Empty text yields an empty paragraph, never
    /// an empty text leaf.
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Node::element("paragraph", Attrs::default(), children)
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(el) => &el.kind,
            Node::Void(v) => &v.kind,
            Node::Text(_) => "text",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Void(v) => Some(&v.attrs),
            Node::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs().and_then(|attrs| attrs.get(key))
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(|v| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) | Node::Void(_) => &[],
        }
    }

    pub fn child(&self, ix: usize) -> Option<&Node> {
        self.children().get(ix)
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Size in positions: one per char of text, one for a void, and the
    /// content plus an opening and closing token for an element.
    pub fn node_size(&self) -> usize {
        match self {
            Node::Text(t) => t.text.chars().count(),
            Node::Void(_) => 1,
            Node::Element(el) => content_size(&el.children) + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        content_size(self.children())
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Void(_) => String::new(),
            Node::Element(el) => el.children.iter().map(Node::text_content).collect(),
        }
    }

    /// Same node with its attributes replaced wholesale. Text has no
    /// attributes and comes back unchanged.
    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        match self {
            Node::Element(el) => Node::Element(ElementNode {
                kind: el.kind.clone(),
                attrs,
                children: el.children.clone(),
            }),
            Node::Void(v) => Node::Void(VoidNode {
                kind: v.kind.clone(),
                attrs,
            }),
            Node::Text(_) => self.clone(),
        }
    }

    /// Same node with its children replaced wholesale.
    pub fn with_children(&self, children: Vec<Node>) -> Node {
        match self {
            Node::Element(el) => Node::Element(ElementNode {
                kind: el.kind.clone(),
                attrs: el.attrs.clone(),
                children,
            }),
            Node::Void(_) | Node::Text(_) => self.clone(),
        }
    }
}

pub fn content_size(children: &[Node]) -> usize {
    children.iter().map(Node::node_size).sum()
}

/// A position resolved against a document: which parent's content holds it
/// and how far into that content it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    pub parent_path: Vec<usize>,
    pub parent_offset: usize,
    pub content_start: usize,
}

impl ResolvedPos {
    pub fn depth(&self) -> usize {
        self.parent_path.len()
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn content_size(&self) -> usize {
        content_size(&self.children)
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, StepError> {
        let size = self.content_size();
        if pos > size {
            return Err(StepError::OutOfRange { pos, size });
        }

        let mut parent_path: Vec<usize> = Vec::new();
        let mut children: &[Node] = &self.children;
        let mut content_start = 0;

        'descend: loop {
            let mut offset = content_start;
            for (ix, child) in children.iter().enumerate() {
                let end = offset + child.node_size();
                if let Node::Element(el) = child
                    && pos > offset
                    && pos < end
                {
                    parent_path.push(ix);
                    children = &el.children;
                    content_start = offset + 1;
                    continue 'descend;
                }
                if end > pos {
                    break;
                }
                offset = end;
            }

            return Ok(ResolvedPos {
                pos,
                parent_offset: pos - content_start,
                parent_path,
                content_start,
            });
        }
    }

    /// The node starting at `pos`, or the text node `pos` falls inside.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let resolved = self.resolve(pos).ok()?;
        let children = self.children_at(&resolved.parent_path)?;

        let mut offset = 0;
        for child in children {
            if offset > resolved.parent_offset {
                break;
            }
            let end = offset + child.node_size();
            if offset == resolved.parent_offset
                || (child.is_text() && resolved.parent_offset < end)
            {
                return Some(child);
            }
            offset = end;
        }
        None
    }

    pub fn children_at(&self, parent_path: &[usize]) -> Option<&[Node]> {
        let mut children: &[Node] = &self.children;
        for &ix in parent_path {
            match children.get(ix)? {
                Node::Element(el) => children = &el.children,
                Node::Text(_) | Node::Void(_) => return None,
            }
        }
        Some(children)
    }

    pub(crate) fn children_at_mut(&mut self, parent_path: &[usize]) -> Option<&mut Vec<Node>> {
        let mut children = &mut self.children;
        for &ix in parent_path {
            match children.get_mut(ix)? {
                Node::Element(el) => children = &mut el.children,
                Node::Text(_) | Node::Void(_) => return None,
            }
        }
        Some(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        // 0 <p> 1 h 2 i 3 </p> 4 <p> 5 </p> 6
        Document::new(vec![Node::paragraph("hi"), Node::paragraph("")])
    }

    #[test]
    fn sizes_count_tokens_and_chars() {
        let doc = sample();
        assert_eq!(doc.content_size(), 6);
        assert_eq!(doc.children[0].node_size(), 4);
        assert_eq!(Node::void("image", Attrs::default()).node_size(), 1);
    }

    #[test]
    fn resolve_descends_into_element_content() {
        let doc = sample();
        let top = doc.resolve(0).unwrap();
        assert!(top.parent_path.is_empty());
        assert_eq!(top.parent_offset, 0);

        let inside = doc.resolve(2).unwrap();
        assert_eq!(inside.parent_path, vec![0]);
        assert_eq!(inside.parent_offset, 1);

        let between = doc.resolve(4).unwrap();
        assert!(between.parent_path.is_empty());
        assert_eq!(between.parent_offset, 4);

        assert!(doc.resolve(7).is_err());
    }

    #[test]
    fn node_at_finds_block_and_text() {
        let doc = sample();
        assert_eq!(doc.node_at(0).map(Node::kind), Some("paragraph"));
        assert_eq!(doc.node_at(2).map(Node::kind), Some("text"));
        assert_eq!(doc.node_at(4).map(Node::kind), Some("paragraph"));
        assert!(doc.node_at(6).is_none());
    }
}
