use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attrs, Node};
use crate::dom::{DomElement, DomSpec};
use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: String,
    pub default: Value,
}

pub type ToDomFn = fn(&Node) -> DomSpec;
pub type GetAttrsFn = fn(&DomElement) -> Option<Attrs>;

/// Matches an element by tag and exact attribute values, then extracts node
/// attributes from it. An extractor returning `None` rejects the element.
#[derive(Debug, Clone)]
pub struct ParseRule {
    pub tag: &'static str,
    pub required: Vec<(&'static str, &'static str)>,
    pub get_attrs: Option<GetAttrsFn>,
}

impl ParseRule {
    pub fn tag(tag: &'static str) -> Self {
        Self {
            tag,
            required: Vec::new(),
            get_attrs: None,
        }
    }

    pub fn require(mut self, key: &'static str, value: &'static str) -> Self {
        self.required.push((key, value));
        self
    }

    pub fn get_attrs(mut self, get_attrs: GetAttrsFn) -> Self {
        self.get_attrs = Some(get_attrs);
        self
    }

    fn matches(&self, element: &DomElement) -> Option<Attrs> {
        if element.tag != self.tag {
            return None;
        }
        if !self
            .required
            .iter()
            .all(|(key, value)| element.get(key) == Some(*value))
        {
            return None;
        }
        match self.get_attrs {
            Some(get_attrs) => get_attrs(element),
            None => Some(Attrs::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
    pub attrs: Vec<AttrSpec>,
    pub selectable: bool,
    pub isolating: bool,
    pub to_dom: Option<ToDomFn>,
    pub parse_dom: Vec<ParseRule>,
}

impl NodeSpec {
    pub fn new(kind: impl Into<String>, role: NodeRole, children: ChildConstraint) -> Self {
        Self {
            kind: kind.into(),
            role,
            is_void: false,
            children,
            attrs: Vec::new(),
            selectable: false,
            isolating: false,
            to_dom: None,
            parse_dom: Vec::new(),
        }
    }

    pub fn void(kind: impl Into<String>, role: NodeRole) -> Self {
        Self {
            is_void: true,
            ..Self::new(kind, role, ChildConstraint::None)
        }
    }

    pub fn attr(mut self, name: impl Into<String>, default: Value) -> Self {
        self.attrs.push(AttrSpec {
            name: name.into(),
            default,
        });
        self
    }

    pub fn selectable(mut self) -> Self {
        self.selectable = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn to_dom(mut self, to_dom: ToDomFn) -> Self {
        self.to_dom = Some(to_dom);
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse_dom.push(rule);
        self
    }

    pub fn default_attrs(&self) -> Attrs {
        self.attrs
            .iter()
            .map(|attr| (attr.name.clone(), attr.default.clone()))
            .collect()
    }
}

/// Registry of node types a document may contain.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: Vec<NodeSpec>,
}

impl Schema {
    pub fn new(specs: impl IntoIterator<Item = NodeSpec>) -> Result<Self, SchemaError> {
        Schema::default().extend(specs)
    }

    /// Paragraphs, tables and block images.
    pub fn basic() -> Self {
        Self {
            specs: vec![
                NodeSpec::new("paragraph", NodeRole::Block, ChildConstraint::InlineOnly)
                    .to_dom(|_| DomSpec::container(DomElement::new("p")))
                    .parse_rule(ParseRule::tag("p")),
                NodeSpec::new("table", NodeRole::Block, ChildConstraint::BlockOnly)
                    .to_dom(|_| DomSpec::container(DomElement::new("table")))
                    .parse_rule(ParseRule::tag("table")),
                NodeSpec::new("table_row", NodeRole::Block, ChildConstraint::BlockOnly)
                    .to_dom(|_| DomSpec::container(DomElement::new("tr")))
                    .parse_rule(ParseRule::tag("tr")),
                NodeSpec::new("table_cell", NodeRole::Block, ChildConstraint::BlockOnly)
                    .attr("background", Value::Null)
                    .to_dom(|node| {
                        let mut td = DomElement::new("td");
                        if let Some(bg) = node.attr_str("background") {
                            td = td.attr("style", format!("background:{bg}"));
                        }
                        DomSpec::container(td)
                    })
                    .parse_rule(ParseRule::tag("td")),
                NodeSpec::void("image", NodeRole::Block)
                    .attr("src", Value::Null)
                    .attr("alt", Value::from(""))
                    .to_dom(|node| {
                        let mut img = DomElement::new("img");
                        for key in ["src", "alt"] {
                            if let Some(value) = node.attr_str(key) {
                                img = img.attr(key, value);
                            }
                        }
                        DomSpec::leaf(img)
                    })
                    .parse_rule(ParseRule::tag("img").get_attrs(|el| {
                        let mut attrs = Attrs::new();
                        let src = el.get("src").map(Value::from).unwrap_or(Value::Null);
                        attrs.insert("src".into(), src);
                        attrs.insert("alt".into(), Value::from(el.get("alt").unwrap_or("")));
                        Some(attrs)
                    })),
            ],
        }
    }

    /// A new schema holding these specs followed by `specs`.
    pub fn extend(&self, specs: impl IntoIterator<Item = NodeSpec>) -> Result<Self, SchemaError> {
        let mut next = self.clone();
        for spec in specs {
            if next.spec(&spec.kind).is_some() {
                return Err(SchemaError::DuplicateKind(spec.kind));
            }
            next.specs.push(spec);
        }
        Ok(next)
    }

    pub fn specs(&self) -> &[NodeSpec] {
        &self.specs
    }

    pub fn spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.specs.iter().find(|spec| spec.kind == kind)
    }

    pub fn node_type(&self, kind: &str) -> Option<NodeType<'_>> {
        self.spec(kind).map(|spec| NodeType { schema: self, spec })
    }

    pub fn text(&self, text: impl Into<String>) -> Node {
        Node::text(text)
    }

    pub fn to_dom(&self, node: &Node) -> Option<DomSpec> {
        let to_dom = self.spec(node.kind())?.to_dom?;
        Some(to_dom(node))
    }

    /// Finds the first node type whose parse rule accepts `element` and
    /// returns its kind with the extracted attributes over the defaults.
    pub fn parse_dom(&self, element: &DomElement) -> Option<(String, Attrs)> {
        self.specs.iter().find_map(|spec| {
            spec.parse_dom.iter().find_map(|rule| {
                let parsed = rule.matches(element)?;
                let mut attrs = spec.default_attrs();
                attrs.extend(parsed);
                Some((spec.kind.clone(), attrs))
            })
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NodeType<'a> {
    schema: &'a Schema,
    spec: &'a NodeSpec,
}

impl<'a> NodeType<'a> {
    pub fn name(&self) -> &'a str {
        &self.spec.kind
    }

    pub fn spec(&self) -> &'a NodeSpec {
        self.spec
    }

    /// Builds a node, filling attributes the caller left out with their
    /// defaults. Content is dropped for void types.
    pub fn create(&self, attrs: Attrs, content: Vec<Node>) -> Node {
        let mut merged = self.spec.default_attrs();
        merged.extend(attrs);
        if self.spec.is_void {
            Node::void(self.spec.kind.clone(), merged)
        } else {
            Node::element(self.spec.kind.clone(), merged, content)
        }
    }

    /// Builds a node with default attributes and the least content that
    /// keeps it valid: block containers get one empty paragraph.
    pub fn create_and_fill(&self) -> Node {
        let content = match self.spec.children {
            ChildConstraint::BlockOnly => self
                .schema
                .node_type("paragraph")
                .map(|paragraph| vec![paragraph.create(Attrs::new(), Vec::new())])
                .unwrap_or_default(),
            ChildConstraint::None | ChildConstraint::InlineOnly | ChildConstraint::Any => {
                Vec::new()
            }
        };
        self.create(Attrs::new(), content)
    }
}
