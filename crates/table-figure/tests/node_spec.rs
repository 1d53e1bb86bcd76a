use manos_plate_core::{Attrs, Node, Schema};
use manos_table_figure::{
    FIGURE, FIGURE_BODY, FIGURE_CAPTION, FIGURE_NOTES, IMAGE, effective_schema,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn attrs(value: Value) -> Attrs {
    serde_json::from_value(value).unwrap()
}

fn assert_round_trip(schema: &Schema, node: &Node) {
    let dom = schema.to_dom(node).unwrap();
    let (kind, parsed) = schema.parse_dom(&dom.element).unwrap();
    assert_eq!(kind, node.kind());
    assert_eq!(Some(&parsed), node.attrs());
}

#[test]
fn figure_attrs_survive_dom_round_trip() {
    let schema = effective_schema(&Schema::basic()).unwrap();
    let figure = schema.node_type(FIGURE).unwrap();

    assert_round_trip(&schema, &figure.create(Attrs::new(), Vec::new()));
    for figure_type in ["table", "figure"] {
        for orientation in ["portrait", "landscape"] {
            for maximized in [false, true] {
                let node = figure.create(
                    attrs(json!({
                        "id": "fig-1",
                        "figureType": figure_type,
                        "orientation": orientation,
                        "maximized": maximized,
                        "width": 480,
                        "height": 220,
                    })),
                    Vec::new(),
                );
                assert_round_trip(&schema, &node);
            }
        }
    }
}

#[test]
fn parts_survive_dom_round_trip() {
    let schema = effective_schema(&Schema::basic()).unwrap();

    let body = schema.node_type(FIGURE_BODY).unwrap();
    assert_round_trip(&schema, &body.create(Attrs::new(), Vec::new()));

    let notes = schema.node_type(FIGURE_NOTES).unwrap();
    assert_round_trip(&schema, &notes.create(Attrs::new(), Vec::new()));
    assert_round_trip(
        &schema,
        &notes.create(attrs(json!({ "styleName": "Heading 2" })), Vec::new()),
    );

    let caption = schema.node_type(FIGURE_CAPTION).unwrap();
    assert_round_trip(&schema, &caption.create(Attrs::new(), Vec::new()));
    assert_round_trip(
        &schema,
        &caption.create(
            attrs(json!({ "form": "short", "capco": "U", "style": "color: red" })),
            Vec::new(),
        ),
    );
}

#[test]
fn simple_image_survives_dom_round_trip() {
    let schema = effective_schema(&Schema::default()).unwrap();
    let image = schema.node_type(IMAGE).unwrap();

    assert_round_trip(&schema, &image.create(Attrs::new(), Vec::new()));
    assert_round_trip(
        &schema,
        &image.create(
            attrs(json!({
                "src": "https://example.com/a.png",
                "alt": "A",
                "title": "Diagram",
                "width": 200,
                "height": 100,
                "fitToParent": 1,
                "simpleImg": "false",
                "cropData": { "x": 1, "y": 2 },
            })),
            Vec::new(),
        ),
    );
}

#[test]
fn figure_parse_falls_back_to_defaults() {
    let schema = effective_schema(&Schema::basic()).unwrap();
    let element = manos_plate_core::DomElement::new("div").attr("data-type", "table-figure");
    let (kind, parsed) = schema.parse_dom(&element).unwrap();

    assert_eq!(kind, FIGURE);
    assert_eq!(
        parsed,
        attrs(json!({
            "id": "",
            "figureType": "table",
            "orientation": "portrait",
            "maximized": false,
            "width": 600,
            "height": 300,
        }))
    );
}
