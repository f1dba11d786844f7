use button_core::{ButtonNode, Document, Editor, Node, ParagraphNode, Point, Selection};

#[test]
fn empty_document_gains_an_empty_paragraph() {
    let editor = Editor::new(Document::default(), Selection::default());

    assert_eq!(editor.doc().children.len(), 1);
    let Node::Paragraph(p) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    assert!(matches!(&p.children[0], Node::Text(t) if t.text.is_empty()));
}

#[test]
fn buttons_get_text_siblings_on_both_sides() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::button("x")],
        })],
    };
    let editor = Editor::new(doc, Selection::default());

    let Node::Paragraph(p) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(p.children.len(), 3);
    assert!(matches!(&p.children[0], Node::Text(t) if t.text.is_empty()));
    assert!(p.children[1].is_inline_annotation());
    assert!(matches!(&p.children[2], Node::Text(t) if t.text.is_empty()));
}

#[test]
fn adjacent_text_leaves_merge() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::text("foo"), Node::text(" "), Node::text("bar")],
        })],
    };
    let editor = Editor::new(doc, Selection::default());

    let Node::Paragraph(p) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(p.children.len(), 1);
    assert!(matches!(&p.children[0], Node::Text(t) if t.text == "foo bar"));
}

#[test]
fn merging_keeps_an_open_selection_in_place() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::text("foo"), Node::text("bar")],
        })],
    };
    // Caret between "b" and "a" of the second leaf.
    let selection = Selection::collapsed(Point::new(vec![0, 1], 1));
    let editor = Editor::new(doc, selection);

    assert_eq!(editor.selection().focus.path, vec![0, 0]);
    assert_eq!(editor.selection().focus.offset, 4);
}

#[test]
fn nested_buttons_dissolve_into_text() {
    let doc = Document {
        children: vec![Node::Paragraph(ParagraphNode {
            children: vec![Node::Button(ButtonNode {
                children: vec![
                    Node::text("a"),
                    Node::Button(ButtonNode {
                        children: vec![Node::text("b")],
                    }),
                ],
            })],
        })],
    };
    let editor = Editor::new(doc, Selection::default());

    let Node::Paragraph(p) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    let buttons: Vec<&ButtonNode> = p
        .children
        .iter()
        .filter_map(|n| match n {
            Node::Button(b) => Some(b),
            _ => None,
        })
        .collect();
    assert_eq!(buttons.len(), 1);
    assert_eq!(buttons[0].label(), "ab");
    assert!(
        buttons[0]
            .children
            .iter()
            .all(|n| matches!(n, Node::Text(_)))
    );
}

#[test]
fn stale_selection_clamps_to_existing_text() {
    let doc = Document {
        children: vec![Node::paragraph("hi")],
    };
    let mut editor = Editor::new(doc, Selection::default());

    editor.set_selection(Selection {
        anchor: Point::new(vec![5, 9], 42),
        focus: Point::new(vec![0, 0], 99),
    });

    assert_eq!(editor.selection().anchor.path, vec![0, 0]);
    assert_eq!(editor.selection().anchor.offset, 2);
    assert_eq!(editor.selection().focus.path, vec![0, 0]);
    assert_eq!(editor.selection().focus.offset, 2);
}

#[test]
fn sample_document_normalizes_to_a_padded_button() {
    let editor = Editor::with_sample_document();

    let Node::Paragraph(p) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    // The two leading leaves merge; the button keeps text on both sides.
    assert_eq!(p.children.len(), 3);
    assert!(p.children[1].is_inline_annotation());

    let projection = editor.projection();
    assert!(projection.text.ends_with("editable button!"));
    assert_eq!(projection.marks.len(), 1);
    assert_eq!(
        &projection.text[projection.marks[0].start..projection.marks[0].end],
        "editable button"
    );
}
