use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::{Document, Node};

/// Half-open byte range `[start, end)` over the flattened text covered by one
/// button annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub start: usize,
    pub end: usize,
}

/// The flat view of a document: all text concatenated in document order plus
/// the annotation spans, JSON-compatible for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Projection {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Projection {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Flattens the tree with a work queue: paragraphs put their children back on
/// the front (one level of unwrapping, matching the two-level tree), buttons
/// contribute their label and record a mark, text leaves contribute text.
///
/// Depends only on tree content, never on selection state.
pub fn project(doc: &Document) -> Projection {
    let mut queue: VecDeque<&Node> = doc.children.iter().collect();
    let mut out = Projection::default();

    while let Some(node) = queue.pop_front() {
        match node {
            Node::Paragraph(p) => {
                for child in p.children.iter().rev() {
                    queue.push_front(child);
                }
            }
            Node::Button(b) => {
                let label = b.label();
                let start = out.text.len();
                out.text.push_str(&label);
                out.marks.push(Mark {
                    start,
                    end: start + label.len(),
                });
            }
            Node::Text(t) => {
                out.text.push_str(&t.text);
            }
        }
    }

    out
}
