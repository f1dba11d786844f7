use button_core::{ButtonNode, Document, Node, ParagraphNode, project};

#[test]
fn flattening_records_button_spans_as_marks() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::text("A"), Node::button("B"), Node::text("C")],
        })],
    };

    let projection = project(&doc);
    assert_eq!(projection.text, "ABC");
    assert_eq!(projection.marks.len(), 1);
    assert_eq!(projection.marks[0].start, 1);
    assert_eq!(projection.marks[0].end, 2);
}

#[test]
fn empty_document_projects_to_nothing() {
    let projection = project(&Document::default());
    assert_eq!(projection.text, "");
    assert!(projection.marks.is_empty());
}

#[test]
fn paragraphs_flatten_in_document_order() {
    let doc = Document {
        children: vec![
            Node::paragraph("ab"),
            Node::Paragraph(ParagraphNode {
                children: vec![Node::button("cd"), Node::text("ef")],
            }),
        ],
    };

    let projection = project(&doc);
    assert_eq!(projection.text, "abcdef");
    assert_eq!(projection.marks.len(), 1);
    assert_eq!(projection.marks[0].start, 2);
    assert_eq!(projection.marks[0].end, 4);
}

#[test]
fn button_label_is_the_concatenation_of_its_text_children() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![
                Node::text("x"),
                Node::Button(ButtonNode {
                    children: vec![Node::text("ab"), Node::text("cd")],
                }),
            ],
        })],
    };

    let projection = project(&doc);
    assert_eq!(projection.text, "xabcd");
    assert_eq!(projection.marks[0].start, 1);
    assert_eq!(projection.marks[0].end, 5);
}

#[test]
fn empty_text_leaves_contribute_nothing() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::text(""), Node::button("b"), Node::text("")],
        })],
    };

    let projection = project(&doc);
    assert_eq!(projection.text, "b");
    assert_eq!(projection.marks[0].start, 0);
    assert_eq!(projection.marks[0].end, 1);
}

#[test]
fn projection_serializes_to_the_wire_shape() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::text("A"), Node::button("B"), Node::text("C")],
        })],
    };

    let projection = project(&doc);
    let value = serde_json::to_value(&projection).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "text": "ABC",
            "marks": [{ "start": 1, "end": 2 }],
        })
    );

    let pretty = projection.to_json_pretty().unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&pretty).unwrap(), value);
}

#[test]
fn projection_offsets_are_byte_based() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::text("héllo "), Node::button("wörld")],
        })],
    };

    let projection = project(&doc);
    assert_eq!(projection.text, "héllo wörld");
    assert_eq!(projection.marks[0].start, "héllo ".len());
    assert_eq!(projection.marks[0].end, "héllo wörld".len());
}
