use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tag and attributes of a rendered element, without children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomElement {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }
}

/// Output of a node's `to_dom`: the outer element and whether children
/// render inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomSpec {
    pub element: DomElement,
    pub content_hole: bool,
}

impl DomSpec {
    pub fn leaf(element: DomElement) -> Self {
        Self {
            element,
            content_hole: false,
        }
    }

    pub fn container(element: DomElement) -> Self {
        Self {
            element,
            content_hole: true,
        }
    }
}
