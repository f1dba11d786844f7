use tracing::trace;

use crate::core::{Document, Node};
use crate::ops::{Op, Path};

/// One structural repair rule. Passes inspect the tree and emit ops whose
/// paths are valid against the tree they were computed from; the editor
/// re-runs `repair` until no pass has anything left to do.
trait NormalizePass {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

/// Returns the ops of the first pass that found something to fix, so each
/// batch applies against the exact tree it was computed from.
pub(crate) fn repair(doc: &Document) -> Vec<Op> {
    let passes: [&dyn NormalizePass; 5] = [
        &EnsureNonEmptyDocument,
        &KeepButtonChildrenTextOnly,
        &EnsureParagraphHasTextLeaf,
        &PadInlineBoundaries,
        &MergeAdjacentTextLeaves,
    ];

    for pass in passes {
        let ops = pass.run(doc);
        if !ops.is_empty() {
            trace!(pass = pass.id(), ops = ops.len(), "normalize pass");
            return ops;
        }
    }
    Vec::new()
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Buttons hold text leaves only. A nested button dissolves into its text
/// children; anything else inside a button is dropped. This is precondition
/// repair, not a feature: the public flow never builds such trees.
struct KeepButtonChildrenTextOnly;

impl NormalizePass for KeepButtonChildrenTextOnly {
    fn id(&self) -> &'static str {
        "core.keep_button_children_text_only"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        for (p_ix, node) in doc.children.iter().enumerate() {
            let Node::Paragraph(p) = node else { continue };
            for (b_ix, inline) in p.children.iter().enumerate() {
                let Node::Button(b) = inline else { continue };
                for (c_ix, child) in b.children.iter().enumerate() {
                    if matches!(child, Node::Text(_)) {
                        continue;
                    }

                    let mut ops = vec![Op::RemoveNode {
                        path: vec![p_ix, b_ix, c_ix],
                    }];
                    if let Node::Button(inner) = child {
                        for (k, lifted) in inner
                            .children
                            .iter()
                            .filter(|n| matches!(n, Node::Text(_)))
                            .enumerate()
                        {
                            ops.push(Op::InsertNode {
                                path: vec![p_ix, b_ix, c_ix + k],
                                node: lifted.clone(),
                            });
                        }
                    }
                    // One fix per run; later indices shift.
                    return ops;
                }
            }
        }
        Vec::new()
    }
}

struct EnsureParagraphHasTextLeaf;

impl NormalizePass for EnsureParagraphHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_paragraph_has_text_leaf"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        for (p_ix, node) in doc.children.iter().enumerate() {
            let Node::Paragraph(p) = node else { continue };
            let has_text = p.children.iter().any(|n| matches!(n, Node::Text(_)));
            if !has_text {
                ops.push(Op::InsertNode {
                    path: vec![p_ix, 0],
                    node: Node::text(""),
                });
            }
        }
        ops
    }
}

/// Every button gets a text sibling on both sides. The empty leaves this
/// inserts are what keep a caret position available directly before and
/// after an annotation (the renderer gives them a hairline width).
struct PadInlineBoundaries;

impl NormalizePass for PadInlineBoundaries {
    fn id(&self) -> &'static str {
        "core.pad_inline_boundaries"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        for (p_ix, node) in doc.children.iter().enumerate() {
            let Node::Paragraph(p) = node else { continue };
            // Descending order keeps earlier-emitted paths valid.
            for b_ix in (0..p.children.len()).rev() {
                if !p.children[b_ix].is_inline_annotation() {
                    continue;
                }
                let after_is_text = matches!(p.children.get(b_ix + 1), Some(Node::Text(_)));
                if !after_is_text {
                    ops.push(Op::InsertNode {
                        path: vec![p_ix, b_ix + 1],
                        node: Node::text(""),
                    });
                }
                let before_is_text =
                    b_ix > 0 && matches!(p.children.get(b_ix - 1), Some(Node::Text(_)));
                if !before_is_text {
                    ops.push(Op::InsertNode {
                        path: vec![p_ix, b_ix],
                        node: Node::text(""),
                    });
                }
            }
        }
        ops
    }
}

/// Adjacent sibling text leaves collapse into one, inside paragraphs and
/// inside buttons. This is why re-annotating sees merged boundaries instead
/// of the split points left behind by an earlier wrap.
struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        for (p_ix, node) in doc.children.iter().enumerate() {
            let Node::Paragraph(p) = node else { continue };

            let ops = merge_run_ops(&p.children, &[p_ix]);
            if !ops.is_empty() {
                return ops;
            }

            for (b_ix, inline) in p.children.iter().enumerate() {
                let Node::Button(b) = inline else { continue };
                let ops = merge_run_ops(&b.children, &[p_ix, b_ix]);
                if !ops.is_empty() {
                    return ops;
                }
            }
        }
        Vec::new()
    }
}

fn merge_run_ops(children: &[Node], base: &[usize]) -> Vec<Op> {
    if children.len() < 2 {
        return Vec::new();
    }

    let child_path = |ix: usize| -> Path {
        let mut path = base.to_vec();
        path.push(ix);
        path
    };

    let mut ops = Vec::new();
    let mut ix = children.len();
    while ix > 0 {
        ix -= 1;
        if !matches!(children[ix], Node::Text(_)) {
            continue;
        }

        let mut start = ix;
        while start > 0 && matches!(children[start - 1], Node::Text(_)) {
            start -= 1;
        }
        if start == ix {
            continue;
        }

        let Node::Text(first) = &children[start] else {
            continue;
        };
        let mut appended = String::new();
        for node in children.iter().take(ix + 1).skip(start + 1) {
            if let Node::Text(t) = node {
                appended.push_str(&t.text);
            }
        }

        if !appended.is_empty() {
            ops.push(Op::InsertText {
                path: child_path(start),
                offset: first.text.len(),
                text: appended,
            });
        }
        for remove_ix in (start + 1..=ix).rev() {
            ops.push(Op::RemoveNode {
                path: child_path(remove_ix),
            });
        }

        ix = start;
    }

    ops
}
