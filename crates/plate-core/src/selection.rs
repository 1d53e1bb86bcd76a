use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::ops::Mapping;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    /// A cursor or a text range between two positions.
    Text { anchor: usize, head: usize },
    /// A whole node selected as a unit. Has no text range to collapse.
    Node { pos: usize, size: usize },
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    /// Selects the node starting at `pos`. `None` when there is no node
    /// there or it is text.
    pub fn node(doc: &Document, pos: usize) -> Option<Self> {
        let node = doc.node_at(pos)?;
        if node.is_text() {
            return None;
        }
        Some(Selection::Node {
            pos,
            size: node.node_size(),
        })
    }

    pub fn from(&self) -> usize {
        match self {
            Selection::Text { anchor, head } => (*anchor).min(*head),
            Selection::Node { pos, .. } => *pos,
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Selection::Text { anchor, head } => (*anchor).max(*head),
            Selection::Node { pos, size } => pos + size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from() == self.to()
    }

    /// Only text selections span a range a command could collapse.
    pub fn has_range(&self) -> bool {
        matches!(self, Selection::Text { .. })
    }

    pub fn map(&self, mapping: &Mapping) -> Selection {
        match self {
            Selection::Text { anchor, head } => Selection::Text {
                anchor: mapping.map(*anchor, 1),
                head: mapping.map(*head, 1),
            },
            Selection::Node { pos, size } => {
                let result = mapping.map_result(*pos, 1);
                if result.deleted {
                    Selection::cursor(result.pos)
                } else {
                    Selection::Node {
                        pos: result.pos,
                        size: *size,
                    }
                }
            }
        }
    }
}
