use std::cmp::Ordering;

use crate::core::{ButtonNode, Document, Node, Point, Selection, clamp_to_char_boundary};
use crate::ops::{Op, Transaction};

/// Shrinks a raw text selection so surrounding whitespace stays out of the
/// annotation label. The correction applies to the document-order start and
/// end of the range, whichever of anchor/focus those happen to be.
///
/// Returns `None` for collapsed selections and for raw text that is empty or
/// whitespace-only; those gestures must not produce an annotation.
pub fn trim_selection(selection: &Selection, raw: &str) -> Option<Selection> {
    if selection.is_collapsed() || raw.trim().is_empty() {
        return None;
    }

    let start_trim = raw.len() - raw.trim_start().len();
    let end_trim = raw.len() - raw.trim_end().len();

    let mut out = selection.clone();
    let (start, end) = match point_order(&out.anchor, &out.focus) {
        Ordering::Greater => (&mut out.focus, &mut out.anchor),
        _ => (&mut out.anchor, &mut out.focus),
    };
    start.offset += start_trim;
    end.offset = end.offset.saturating_sub(end_trim);

    Some(out)
}

/// Builds the unwrap-then-wrap transaction for a trimmed selection: every
/// button in the document is dissolved back into plain text, the selected
/// range is wrapped in a fresh button (splitting boundary text leaves), and
/// the selection collapses to just after the new button.
///
/// Returns `None` when the selection does not name a usable intra-paragraph
/// range in the current tree; the caller treats that as a no-op.
pub fn annotate_selection(doc: &Document, selection: &Selection) -> Option<Transaction> {
    let (start, end) = ordered_points(selection);

    let block_ix = *start.path.first()?;
    if *end.path.first()? != block_ix {
        // Selections in this model never span paragraphs.
        return None;
    }

    let mut ops: Vec<Op> = Vec::new();
    let mut caret: Option<Point> = None;

    for (ix, node) in doc.children.iter().enumerate() {
        let Node::Paragraph(p) = node else { continue };

        let has_button = p.children.iter().any(Node::is_inline_annotation);
        let is_target = ix == block_ix;
        if !has_button && !is_target {
            continue;
        }

        // Unwrapping leaves the flattened text untouched, so range offsets
        // computed against the original children stay valid afterwards.
        let unwrapped = unwrap_buttons(&p.children);

        let new_children = if is_target {
            let start_global = global_offset(&p.children, &start)?;
            let end_global = global_offset(&p.children, &end)?;
            if start_global >= end_global {
                return None;
            }
            let (children, caret_ix) = wrap_range(&unwrapped, start_global, end_global);
            caret = Some(Point::new(vec![ix, caret_ix], 0));
            children
        } else {
            unwrapped
        };

        for child_ix in (0..p.children.len()).rev() {
            ops.push(Op::RemoveNode {
                path: vec![ix, child_ix],
            });
        }
        for (child_ix, child) in new_children.into_iter().enumerate() {
            ops.push(Op::InsertNode {
                path: vec![ix, child_ix],
                node: child,
            });
        }
    }

    let caret = caret?;
    Some(
        Transaction::new(ops)
            .selection_after(Selection::collapsed(caret))
            .source("annotate.selection"),
    )
}

fn point_order(a: &Point, b: &Point) -> Ordering {
    a.path.cmp(&b.path).then(a.offset.cmp(&b.offset))
}

fn ordered_points(selection: &Selection) -> (Point, Point) {
    let mut start = selection.anchor.clone();
    let mut end = selection.focus.clone();
    if point_order(&start, &end) == Ordering::Greater {
        std::mem::swap(&mut start, &mut end);
    }
    (start, end)
}

fn inline_text_len(node: &Node) -> usize {
    match node {
        Node::Text(t) => t.text.len(),
        Node::Button(b) => b.label().len(),
        Node::Paragraph(_) => 0,
    }
}

/// Byte offset of a point within the flattened text of one paragraph's
/// children. The point may sit on a text leaf or inside a button's text.
/// Returns `None` for paths that do not resolve in the given children.
fn global_offset(children: &[Node], point: &Point) -> Option<usize> {
    let inline_ix = *point.path.get(1)?;
    if inline_ix >= children.len() {
        return None;
    }

    let mut acc = 0usize;
    for node in &children[..inline_ix] {
        acc += inline_text_len(node);
    }

    match &children[inline_ix] {
        Node::Text(t) => Some(acc + point.offset.min(t.text.len())),
        Node::Button(b) => {
            let text_ix = point.path.get(2).copied().unwrap_or(0);
            let mut inner = 0usize;
            for (i, child) in b.children.iter().enumerate() {
                let Node::Text(t) = child else { return None };
                if i == text_ix {
                    inner += point.offset.min(t.text.len());
                    break;
                }
                inner += t.text.len();
            }
            Some(acc + inner)
        }
        Node::Paragraph(_) => None,
    }
}

/// Dissolves every button into its text children, preserving order.
fn unwrap_buttons(children: &[Node]) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for node in children {
        match node {
            Node::Button(b) => {
                for child in &b.children {
                    if let Node::Text(_) = child {
                        out.push(child.clone());
                    }
                }
            }
            _ => out.push(node.clone()),
        }
    }
    out
}

/// Rebuilds a text-only child list with `[start, end)` wrapped in a button,
/// splitting the leaves at the range boundaries. The button always ends up
/// with a text sibling on both sides so the caret can land right after it.
/// Returns the new children and the index of that trailing text leaf.
fn wrap_range(children: &[Node], start: usize, end: usize) -> (Vec<Node>, usize) {
    let mut before: Vec<Node> = Vec::new();
    let mut label = String::new();
    let mut after: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else { continue };
        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if node_end <= start {
            before.push(node.clone());
            continue;
        }
        if node_start >= end {
            after.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, start.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(
            &t.text,
            end.saturating_sub(node_start).min(t.text.len()),
        );

        let prefix = &t.text[..sel_start];
        let middle = &t.text[sel_start..sel_end];
        let suffix = &t.text[sel_end..];

        if !prefix.is_empty() {
            before.push(Node::text(prefix));
        }
        label.push_str(middle);
        if !suffix.is_empty() {
            after.push(Node::text(suffix));
        }
    }

    let mut out = before;
    if out.is_empty() {
        out.push(Node::text(""));
    }
    out.push(Node::Button(ButtonNode {
        children: vec![Node::text(label)],
    }));
    let caret_ix = out.len();
    if after.is_empty() {
        out.push(Node::text(""));
    } else {
        out.extend(after);
    }

    (out, caret_ix)
}
