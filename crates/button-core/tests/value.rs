use button_core::{ButtonValue, Document, Node};

#[test]
fn nodes_serialize_with_a_kind_tag() {
    assert_eq!(
        serde_json::to_value(Node::text("hi")).unwrap(),
        serde_json::json!({ "node": "text", "text": "hi" })
    );
    assert_eq!(
        serde_json::to_value(Node::button("go")).unwrap(),
        serde_json::json!({
            "node": "button",
            "children": [{ "node": "text", "text": "go" }],
        })
    );
    assert_eq!(
        serde_json::to_value(Node::paragraph("p")).unwrap(),
        serde_json::json!({
            "node": "paragraph",
            "children": [{ "node": "text", "text": "p" }],
        })
    );
}

#[test]
fn value_round_trips_through_json() {
    let value = ButtonValue::from_document(Document::sample());
    let json = value.to_json_pretty().unwrap();
    let parsed = ButtonValue::from_json_str(&json).unwrap();

    assert_eq!(parsed, value);
    assert_eq!(parsed.schema, "button-doc");
    assert_eq!(parsed.version, 1);
}

#[test]
fn missing_schema_fields_take_defaults() {
    let parsed = ButtonValue::from_json_str(
        r#"{ "document": { "children": [{ "node": "paragraph", "children": [] }] } }"#,
    )
    .unwrap();

    assert_eq!(parsed.schema, "button-doc");
    assert_eq!(parsed.version, 1);
    assert_eq!(parsed.document.children.len(), 1);
}

#[test]
fn document_deserializes_from_handwritten_json() {
    let doc: Document = serde_json::from_str(
        r#"{
            "children": [{
                "node": "paragraph",
                "children": [
                    { "node": "text", "text": "A" },
                    { "node": "button", "children": [{ "node": "text", "text": "B" }] },
                    { "node": "text", "text": "C" }
                ]
            }]
        }"#,
    )
    .unwrap();

    let projection = button_core::project(&doc);
    assert_eq!(projection.text, "ABC");
    assert_eq!(projection.marks.len(), 1);
}
