use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::annotate;
use crate::normalize;
use crate::ops::{Op, Path, Transaction};
use crate::project::{self, Projection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    /// The demo document: one paragraph with an inline "editable button".
    pub fn sample() -> Self {
        Self {
            children: vec![Node::Paragraph(ParagraphNode {
                children: vec![
                    Node::text(
                        "In addition to block nodes, you can create inline nodes. Here is a ",
                    ),
                    Node::text(", and here is a more unusual inline: an "),
                    Node::button("editable button"),
                    Node::text("!"),
                ],
            })],
        }
    }
}

/// Closed set of node kinds: paragraph blocks at the top level, button
/// annotations and text leaves below them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Paragraph(ParagraphNode),
    Button(ButtonNode),
    Text(TextNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Paragraph(ParagraphNode {
            children: vec![Node::text(text)],
        })
    }

    pub fn button(label: impl Into<String>) -> Self {
        Node::Button(ButtonNode {
            children: vec![Node::text(label)],
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode { text: text.into() })
    }

    /// Structural check for the inline annotation kind.
    pub fn is_inline_annotation(&self) -> bool {
        matches!(self, Node::Button(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParagraphNode {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ButtonNode {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ButtonNode {
    /// The flattened label text: concatenation of the text children.
    pub fn label(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                out.push_str(&t.text);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TextNode {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Anchor/focus selection over the tree. The anchor may sit before or after
/// the focus in document order; nothing here implies a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::collapsed(Point::new(vec![0, 0], 0))
    }
}

#[derive(Debug, Default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

/// The editing session: owns the current tree and the current selection,
/// nothing else. Undo/history is an external collaborator.
pub struct Editor {
    doc: Document,
    selection: Selection,
    config: EditorConfig,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection) -> Self {
        let config = EditorConfig::default().with_defaults();
        let mut editor = Self {
            doc,
            selection,
            config,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_sample_document() -> Self {
        Self::new(Document::sample(), Selection::default())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    /// Applies the transaction ops in order, installs `selection_after` if
    /// present, then repairs structural invariants and re-validates the
    /// selection against the resulting tree.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        debug!(
            ops = tx.ops.len(),
            source = tx.meta.source.as_deref().unwrap_or("unknown"),
            "applying transaction"
        );

        for op in tx.ops {
            apply_op_to(&mut self.doc, &mut self.selection, op)?;
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        self.normalize_to_fixed_point()?;
        self.normalize_selection_in_place();
        Ok(())
    }

    /// Entry point for a native selection-change event: `raw` is the selected
    /// substring as reported by the host, `selection` the structural range.
    ///
    /// Trims surrounding whitespace off the selection, unwraps every existing
    /// button in the document, and wraps the trimmed range in a fresh one.
    /// Every no-op path (collapsed, empty, or whitespace-only raw text, and a
    /// selection that no longer resolves to a usable range) returns
    /// `Ok(false)` with both the tree and the stored selection untouched.
    pub fn handle_select(&mut self, raw: &str, selection: Selection) -> Result<bool, ApplyError> {
        let Some(trimmed) = annotate::trim_selection(&selection, raw) else {
            trace!("selection skipped: collapsed or whitespace-only");
            return Ok(false);
        };

        let Some(tx) = annotate::annotate_selection(&self.doc, &trimmed) else {
            trace!("selection skipped: not annotatable against current tree");
            return Ok(false);
        };

        self.apply(tx)?;
        Ok(true)
    }

    /// Flat view of the current tree. Pure projection; safe to call on every
    /// tree change.
    pub fn projection(&self) -> Projection {
        project::project(&self.doc)
    }

    fn normalize_in_place(&mut self) {
        let _ = self.normalize_to_fixed_point();
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_to_fixed_point(&mut self) -> Result<(), ApplyError> {
        for _ in 0..self.config.max_normalize_iterations {
            let ops = normalize::repair(&self.doc);
            if ops.is_empty() {
                return Ok(());
            }
            for op in ops {
                apply_op_to(&mut self.doc, &mut self.selection, op)?;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }
}

#[derive(Debug)]
pub enum ApplyError {
    InvalidPath(String),
    NormalizeDidNotConverge,
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::InvalidPath(msg) => write!(f, "invalid path: {msg}"),
            ApplyError::NormalizeDidNotConverge => write!(f, "normalization did not converge"),
        }
    }
}

impl std::error::Error for ApplyError {}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PathError {}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
            Ok(())
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start >= end {
                return Ok(());
            }
            text_node.text.replace_range(start..end, "");
            transform_selection_remove_text(selection, &path, start..end);
            Ok(())
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
            Ok(())
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path, &removed, doc);
            Ok(())
        }
    }
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut Selection,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    // When a text leaf was merged into its left sibling (remove preceded by an
    // insert of the same text), map points inside it onto the merged leaf.
    let merge_prefix_len = match (removed, index.checked_sub(1)) {
        (Node::Text(removed_text), Some(left_index)) => {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            match node_at_path(doc_after_remove, &left_path) {
                Some(Node::Text(left_text)) if left_text.text.ends_with(&removed_text.text) => {
                    Some(left_text.text.len().saturating_sub(removed_text.text.len()))
                }
                _ => None,
            }
        }
        _ => None,
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        // Point was inside the removed subtree. Map it to a nearby point.
        if let (Some(prefix), Node::Text(removed_text)) = (merge_prefix_len, removed) {
            point.path.truncate(depth + 1);
            point.path[depth] = index - 1;
            point.offset = (prefix + point.offset).min(prefix + removed_text.text.len());
        } else {
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

pub(crate) fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    if path.is_empty() {
        return None;
    }

    let mut node = doc.children.get(path[0])?;
    for &ix in path.iter().skip(1) {
        node = match node {
            Node::Paragraph(p) => p.children.get(ix)?,
            Node::Button(b) => b.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

fn node_mut_in<'a>(children: &'a mut Vec<Node>, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (&ix, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let len = children.len();
    let node = children
        .get_mut(ix)
        .ok_or_else(|| PathError(format!("Path out of bounds: {ix} >= {len}")))?;
    if rest.is_empty() {
        return Ok(node);
    }
    match node {
        Node::Paragraph(p) => node_mut_in(&mut p.children, rest),
        Node::Button(b) => node_mut_in(&mut b.children, rest),
        Node::Text(_) => Err(PathError("Text node has no children".into())),
    }
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    node_mut_in(&mut doc.children, path)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn container_children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Paragraph(p) => Ok(&mut p.children),
        Node::Button(b) => Ok(&mut b.children),
        Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError("Empty insert path".into()));
    }

    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    let children = container_children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    if path.is_empty() {
        return Err(PathError("Empty remove path".into()));
    }

    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    let children = container_children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

/// Clamps both selection endpoints onto text leaves that exist in the given
/// tree. A point referencing a removed or reshaped path resolves to the
/// nearest surviving leaf instead of corrupting later edits.
pub(crate) fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = first_text_point(doc).unwrap_or(Point {
        path: vec![0],
        offset: 0,
    });

    let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus =
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}

fn first_text_point(doc: &Document) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point {
                        path: path.clone(),
                        offset: 0,
                    };
                    path.pop();
                    return Some(point);
                }
                Node::Paragraph(p) => {
                    if let Some(point) = walk(&p.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
                Node::Button(b) => {
                    if let Some(point) = walk(&b.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    walk(&doc.children, &mut Vec::new())
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    return Some(Point {
                        path: path.clone(),
                        offset: 0,
                    });
                }
                Node::Paragraph(p) => {
                    if let Some(point) = first_text_descendant(&p.children, path) {
                        return Some(point);
                    }
                }
                Node::Button(b) => {
                    if let Some(point) = first_text_descendant(&b.children, path) {
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Paragraph(p) => {
                children = &p.children;
            }
            Node::Button(b) => {
                children = &b.children;
            }
        }
    }

    match node_at_path(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Paragraph(p) => first_text_descendant(&p.children, &mut resolved_path),
        Node::Button(b) => first_text_descendant(&b.children, &mut resolved_path),
    }
}
