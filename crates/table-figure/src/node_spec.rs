//! Node types of the composite figure: a figure holding a body, optional
//! notes and a caption, plus the simple image that can live in a body.
//!
//! Every attribute survives `to_dom` followed by `parse_dom`.

use manos_plate_core::{
    Attrs, ChildConstraint, DomElement, DomSpec, Node, NodeRole, NodeSpec, ParseRule, Schema,
    SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FIGURE: &str = "table_figure";
pub const FIGURE_BODY: &str = "table_figure_body";
pub const FIGURE_NOTES: &str = "table_figure_notes";
pub const FIGURE_CAPTION: &str = "table_figure_caption";
pub const IMAGE: &str = "image";
pub const PARAGRAPH: &str = "paragraph";
pub const TABLE: &str = "table";
pub const TABLE_ROW: &str = "table_row";
pub const TABLE_CELL: &str = "table_cell";

const FIGURE_DOM_TYPE: &str = "table-figure";
const BODY_DOM_TYPE: &str = "table-figure-body";
const NOTES_DOM_TYPE: &str = "table-figure-notes";
const CAPTION_DOM_TYPE: &str = "table-figure-caption";

pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureType {
    Table,
    Figure,
}

impl FigureType {
    pub fn as_str(self) -> &'static str {
        match self {
            FigureType::Table => "table",
            FigureType::Figure => "figure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "table" => Some(FigureType::Table),
            "figure" => Some(FigureType::Figure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionForm {
    Long,
    Short,
}

impl CaptionForm {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptionForm::Long => "long",
            CaptionForm::Short => "short",
        }
    }
}

/// Renders a scalar attribute the way it appears in the DOM.
fn attr_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Reads a numeric DOM attribute back, keeping integers integral.
fn number_attr(raw: Option<&str>) -> Option<Value> {
    let raw = raw?.trim().trim_end_matches("px");
    if let Ok(n) = raw.parse::<u64>() {
        return Some(Value::from(n));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::from(n));
    }
    raw.parse::<f64>().ok().map(Value::from)
}

fn figure_to_dom(node: &Node) -> DomSpec {
    let orientation = node.attr_str("orientation").unwrap_or("portrait");
    let maximized = node.attr("maximized").and_then(Value::as_bool).unwrap_or(false);

    let mut class = vec!["table-figure"];
    if orientation == "landscape" {
        class.push("landscape");
    }
    if maximized {
        class.push("maximized");
    }

    let mut el = DomElement::new("div")
        .attr("data-type", FIGURE_DOM_TYPE)
        .attr("data-id", node.attr_str("id").unwrap_or(""))
        .attr("data-figure-type", node.attr_str("figureType").unwrap_or("table"))
        .attr("data-orientation", orientation)
        .attr("data-maximized", if maximized { "true" } else { "false" })
        .attr("class", class.join(" "));
    for (key, dom_key) in [("width", "data-width"), ("height", "data-height")] {
        if let Some(text) = node.attr(key).and_then(attr_text) {
            el = el.attr(dom_key, text);
        }
    }
    DomSpec::container(el)
}

fn figure_from_dom(el: &DomElement) -> Option<Attrs> {
    let mut attrs = Attrs::new();
    attrs.insert("id".into(), Value::from(el.get("data-id").unwrap_or("")));
    attrs.insert(
        "figureType".into(),
        Value::from(el.get("data-figure-type").unwrap_or("table")),
    );
    attrs.insert(
        "orientation".into(),
        Value::from(el.get("data-orientation").unwrap_or("portrait")),
    );
    attrs.insert(
        "maximized".into(),
        Value::from(el.get("data-maximized") == Some("true")),
    );
    attrs.insert(
        "width".into(),
        number_attr(el.get("data-width")).unwrap_or(Value::from(DEFAULT_WIDTH)),
    );
    attrs.insert(
        "height".into(),
        number_attr(el.get("data-height")).unwrap_or(Value::from(DEFAULT_HEIGHT)),
    );
    Some(attrs)
}

fn notes_to_dom(node: &Node) -> DomSpec {
    DomSpec::container(
        DomElement::new("div")
            .attr("data-type", NOTES_DOM_TYPE)
            .attr("data-styleName", node.attr_str("styleName").unwrap_or("Normal"))
            .attr("class", "table-figure-notes"),
    )
}

fn notes_from_dom(el: &DomElement) -> Option<Attrs> {
    let mut attrs = Attrs::new();
    attrs.insert(
        "styleName".into(),
        Value::from(el.get("data-styleName").unwrap_or("Normal")),
    );
    Some(attrs)
}

fn caption_to_dom(node: &Node) -> DomSpec {
    let mut el = DomElement::new("div")
        .attr("data-type", CAPTION_DOM_TYPE)
        .attr("data-form", node.attr_str("form").unwrap_or("long"))
        .attr("class", "table-figure-caption");
    if let Some(capco) = node.attr("capco").and_then(attr_text) {
        el = el.attr("data-capco", capco);
    }
    if let Some(style) = node.attr_str("style").filter(|s| !s.is_empty()) {
        el = el.attr("style", style);
    }
    DomSpec::container(el)
}

fn caption_from_dom(el: &DomElement) -> Option<Attrs> {
    let mut attrs = Attrs::new();
    attrs.insert("form".into(), Value::from(el.get("data-form").unwrap_or("long")));
    attrs.insert(
        "capco".into(),
        el.get("data-capco").map(Value::from).unwrap_or(Value::Null),
    );
    attrs.insert("style".into(), Value::from(el.get("style").unwrap_or("")));
    Some(attrs)
}

fn image_to_dom(node: &Node) -> DomSpec {
    let mut el = DomElement::new("img");
    if let Some(attrs) = node.attrs() {
        for (key, value) in attrs {
            let text = match (key.as_str(), value) {
                (_, Value::Null) => None,
                ("cropData", value) => Some(value.to_string()),
                (_, value) => attr_text(value),
            };
            if let Some(text) = text {
                el = el.attr(key.clone(), text);
            }
        }
    }
    DomSpec::leaf(el)
}

fn style_value<'a>(el: &'a DomElement, prop: &str) -> Option<&'a str> {
    el.get("style")?.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim() == prop).then(|| value.trim())
    })
}

/// Accepts only images explicitly marked simple, reading size from either
/// the attribute or an inline style.
fn image_from_dom(el: &DomElement) -> Option<Attrs> {
    if !el.has("simple-img") && !el.has("simpleImg") {
        return None;
    }

    let dimension = |key: &str| {
        number_attr(style_value(el, key).or_else(|| el.get(key)))
            .and_then(|v| v.as_f64())
            .map(|v| Value::from(v as u64))
            .unwrap_or(Value::Null)
    };

    let mut attrs = Attrs::new();
    attrs.insert("src".into(), el.get("src").map(Value::from).unwrap_or(Value::Null));
    attrs.insert("alt".into(), Value::from(el.get("alt").unwrap_or("")));
    attrs.insert("title".into(), Value::from(el.get("title").unwrap_or("")));
    attrs.insert("width".into(), dimension("width"));
    attrs.insert("height".into(), dimension("height"));
    attrs.insert(
        "fitToParent".into(),
        Value::from(
            el.get("fitToParent")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0),
        ),
    );
    attrs.insert(
        "simpleImg".into(),
        Value::from(el.get("simpleImg").unwrap_or("false")),
    );
    attrs.insert(
        "cropData".into(),
        el.get("cropData")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null),
    );
    Some(attrs)
}

pub fn figure_node_spec() -> NodeSpec {
    NodeSpec::new(FIGURE, NodeRole::Block, ChildConstraint::BlockOnly)
        .attr("id", Value::from(""))
        .attr("figureType", Value::from(FigureType::Table.as_str()))
        .attr("orientation", Value::from(Orientation::Portrait.as_str()))
        .attr("maximized", Value::from(false))
        .attr("width", Value::from(DEFAULT_WIDTH))
        .attr("height", Value::from(DEFAULT_HEIGHT))
        .selectable()
        .isolating()
        .to_dom(figure_to_dom)
        .parse_rule(
            ParseRule::tag("div")
                .require("data-type", FIGURE_DOM_TYPE)
                .get_attrs(figure_from_dom),
        )
}

pub fn figure_body_node_spec() -> NodeSpec {
    NodeSpec::new(FIGURE_BODY, NodeRole::Block, ChildConstraint::BlockOnly)
        .to_dom(|_| {
            DomSpec::container(
                DomElement::new("div")
                    .attr("data-type", BODY_DOM_TYPE)
                    .attr("class", "table-figure-body"),
            )
        })
        .parse_rule(ParseRule::tag("div").require("data-type", BODY_DOM_TYPE))
}

pub fn figure_notes_node_spec() -> NodeSpec {
    NodeSpec::new(FIGURE_NOTES, NodeRole::Block, ChildConstraint::InlineOnly)
        .attr("styleName", Value::from("Normal"))
        .to_dom(notes_to_dom)
        .parse_rule(
            ParseRule::tag("div")
                .require("data-type", NOTES_DOM_TYPE)
                .get_attrs(notes_from_dom),
        )
}

pub fn figure_caption_node_spec() -> NodeSpec {
    NodeSpec::new(FIGURE_CAPTION, NodeRole::Block, ChildConstraint::InlineOnly)
        .attr("form", Value::from(CaptionForm::Long.as_str()))
        .attr("capco", Value::Null)
        .attr("style", Value::from(""))
        .to_dom(caption_to_dom)
        .parse_rule(
            ParseRule::tag("div")
                .require("data-type", CAPTION_DOM_TYPE)
                .get_attrs(caption_from_dom),
        )
}

pub fn simple_image_node_spec() -> NodeSpec {
    NodeSpec::void(IMAGE, NodeRole::Inline)
        .attr("alt", Value::from(""))
        .attr("height", Value::Null)
        .attr("src", Value::Null)
        .attr("title", Value::from(""))
        .attr("width", Value::Null)
        .attr("fitToParent", Value::from(0))
        .attr("simpleImg", Value::from("true"))
        .attr("cropData", Value::Null)
        .to_dom(image_to_dom)
        .parse_rule(ParseRule::tag("img").get_attrs(image_from_dom))
}

/// `base` plus the figure node types. A simple image type is added only when
/// the host schema has no image of its own.
pub fn effective_schema(base: &Schema) -> Result<Schema, SchemaError> {
    let mut specs = vec![
        figure_node_spec(),
        figure_body_node_spec(),
        figure_notes_node_spec(),
        figure_caption_node_spec(),
    ];
    if base.spec(IMAGE).is_none() {
        specs.push(simple_image_node_spec());
    }
    base.extend(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figure_dom_carries_classes_for_layout() {
        let schema = Schema::new([figure_node_spec()]).unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("orientation".into(), Value::from("landscape"));
        attrs.insert("maximized".into(), Value::from(true));
        let node = schema.node_type(FIGURE).unwrap().create(attrs, Vec::new());

        let dom = schema.to_dom(&node).unwrap();
        assert!(dom.content_hole);
        assert_eq!(dom.element.get("class"), Some("table-figure landscape maximized"));
        assert_eq!(dom.element.get("data-maximized"), Some("true"));
        assert_eq!(dom.element.get("data-width"), Some("600"));
    }

    #[test]
    fn numeric_attrs_keep_their_integer_kind() {
        assert_eq!(number_attr(Some("42")), Some(Value::from(42u64)));
        assert_eq!(number_attr(Some("-1")), Some(Value::from(-1i64)));
        assert_eq!(number_attr(Some("12.5px")), Some(Value::from(12.5)));
        assert_eq!(number_attr(Some("wide")), None);
        assert_eq!(number_attr(None), None);
    }

    #[test]
    fn negative_figure_size_round_trips_as_integer() {
        let schema = Schema::new([figure_node_spec()]).unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("width".into(), Value::from(-1));
        let node = schema.node_type(FIGURE).unwrap().create(attrs, Vec::new());

        let dom = schema.to_dom(&node).unwrap();
        let (_, parsed) = schema.parse_dom(&dom.element).unwrap();
        assert_eq!(parsed.get("width"), Some(&Value::from(-1i64)));
    }

    #[test]
    fn image_without_simple_marker_is_not_parsed() {
        let el = DomElement::new("img").attr("src", "a.png");
        assert!(image_from_dom(&el).is_none());
    }

    #[test]
    fn image_reads_size_from_style_first() {
        let el = DomElement::new("img")
            .attr("simpleImg", "false")
            .attr("style", "width: 150px; height: 75px")
            .attr("width", "20");
        let attrs = image_from_dom(&el).unwrap();
        assert_eq!(attrs.get("width"), Some(&Value::from(150u64)));
        assert_eq!(attrs.get("height"), Some(&Value::from(75u64)));
        assert_eq!(attrs.get("fitToParent"), Some(&Value::from(0)));
        assert_eq!(attrs.get("simpleImg"), Some(&Value::from("false")));
    }

    #[test]
    fn effective_schema_keeps_host_image() {
        let schema = effective_schema(&Schema::basic()).unwrap();
        for kind in [FIGURE, FIGURE_BODY, FIGURE_NOTES, FIGURE_CAPTION] {
            assert!(schema.spec(kind).is_some(), "{kind} missing");
        }
        assert!(schema.spec(IMAGE).unwrap().role == NodeRole::Block);

        let bare = effective_schema(&Schema::default()).unwrap();
        assert!(bare.spec(IMAGE).unwrap().role == NodeRole::Inline);
    }
}
