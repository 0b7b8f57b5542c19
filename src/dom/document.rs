//! Arena-backed page document
//!
//! Nodes are never freed: removing a node detaches it, and its id stays valid
//! for inspection. Every structural change on a connected parent is recorded
//! while observation is enabled, which is how the page reports insertions to
//! the mutation watcher.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use super::geometry::Rect;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} is not a text node")]
    NotText(NodeId),
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("node {0} is detached from the document")]
    Detached(NodeId),
}

/// Element payload
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub style: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    rect: Rect,
}

/// Child-list change observed on a connected node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    observing: bool,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            observing: false,
            records: Vec::new(),
        };
        doc.root = doc.push(NodeKind::Document);
        doc.body = doc.create_element("body");
        doc.nodes[doc.root.0].children.push(doc.body);
        doc.nodes[doc.body.0].parent = Some(doc.root);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
            rect: Rect::default(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&Element, DomError> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    // === Construction ===

    /// Create a detached element. Tag names are stored upper-cased.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element {
            tag: tag.to_ascii_uppercase(),
            ..Element::default()
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    // === Inspection ===

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(text) => {
                value.clone_into(text);
                Ok(())
            }
            _ => Err(DomError::NotText(id)),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest element, starting at `id` itself, that satisfies `pred`.
    pub fn closest<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) && pred(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Inherited `contenteditable` state of a node.
    pub fn is_content_editable(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Ok(el) = self.element(node) {
                match el.attributes.get("contenteditable").map(String::as_str) {
                    Some("" | "true" | "plaintext-only") => return true,
                    Some("false") => return false,
                    _ => {}
                }
            }
            current = self.parent(node);
        }
        false
    }

    /// All descendants of `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Connected elements carrying `class`, in document order.
    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.attribute(*id, "id") == Some(value))
    }

    // === Attributes, classes, style ===

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .ok()
            .and_then(|el| el.attributes.get(name))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let el = self.element_mut(id)?;
        if name == "class" {
            el.classes = value.split_whitespace().map(str::to_string).collect();
        } else {
            el.attributes.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|el| el.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let el = self.element_mut(id)?;
        if !el.classes.iter().any(|c| c == class) {
            el.classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.element_mut(id)?.classes.retain(|c| c != class);
        Ok(())
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)
            .ok()
            .and_then(|el| el.style.get(property))
            .map(String::as_str)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?
            .style
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.nodes.get(id.0).map(|node| node.rect).unwrap_or_default()
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<(), DomError> {
        self.node_mut(id)?.rect = rect;
        Ok(())
    }

    // === Tree mutation ===

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or at the end).
    ///
    /// A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child)?;
        }
        self.attach(parent, child, reference)?;
        self.record(parent, vec![child], Vec::new());
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.detach(parent, child)
    }

    /// Replace `node` with `replacements`, in order, as a single change.
    pub fn replace_with_nodes(
        &mut self,
        node: NodeId,
        replacements: &[NodeId],
    ) -> Result<(), DomError> {
        let parent = self.parent(node).ok_or(DomError::Detached(node))?;
        for child in replacements {
            self.check_insert(parent, *child)?;
            if *child == node {
                return Err(DomError::HierarchyRequest {
                    parent,
                    child: *child,
                });
            }
        }
        let observing = std::mem::replace(&mut self.observing, false);
        let result = replacements
            .iter()
            .try_for_each(|child| {
                if let Some(old_parent) = self.parent(*child) {
                    self.detach(old_parent, *child)?;
                }
                self.attach(parent, *child, Some(node))
            })
            .and_then(|()| self.detach(parent, node));
        self.observing = observing;
        result?;
        self.record(parent, replacements.to_vec(), vec![node]);
        Ok(())
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in &children {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = None;
            }
        }
        if !children.is_empty() {
            self.record(id, Vec::new(), children);
        }
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        let parent_accepts = !matches!(parent_node.kind, NodeKind::Text(_));
        let child_movable = !matches!(child_node.kind, NodeKind::Document);
        if !parent_accepts || !child_movable || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let index = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|id| *id == reference)
                .ok_or(DomError::NotAChild {
                    parent,
                    child: reference,
                })?,
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let index = self
            .children(parent)
            .iter()
            .position(|id| *id == child)
            .ok_or(DomError::NotAChild { parent, child })?;
        self.node_mut(parent)?.children.remove(index);
        self.node_mut(child)?.parent = None;
        self.record(parent, Vec::new(), vec![child]);
        Ok(())
    }

    // === Observation ===

    pub fn observe(&mut self, enabled: bool) {
        self.observing = enabled;
        if !enabled {
            self.records.clear();
        }
    }

    /// Drain queued mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.observing && self.is_connected(target) {
            self.records.push(MutationRecord {
                target,
                added,
                removed,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t).unwrap();
        doc.append_child(doc.body(), p).unwrap();
        (p, t)
    }

    #[test]
    fn test_insert_and_order() {
        let mut doc = Document::new();
        let (p, first) = paragraph(&mut doc, "b");
        let before = doc.create_text("a");
        doc.insert_before(p, before, Some(first)).unwrap();
        assert_eq!(doc.children(p), &[before, first]);
        assert_eq!(doc.text_content(p), "ab");
        assert!(doc.is_connected(before));
    }

    #[test]
    fn test_cannot_insert_into_own_subtree() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "x");
        assert!(matches!(
            doc.append_child(t, p),
            Err(DomError::HierarchyRequest { .. })
        ));
        let body = doc.body();
        assert!(matches!(
            doc.append_child(p, body),
            Err(DomError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_replace_with_nodes_keeps_position() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "abc");
        let tail = doc.create_text("!");
        doc.append_child(p, tail).unwrap();
        let a = doc.create_text("a");
        let b = doc.create_element("b");
        doc.replace_with_nodes(t, &[a, b]).unwrap();
        assert_eq!(doc.children(p), &[a, b, tail]);
        assert_eq!(doc.parent(t), None);
        assert!(!doc.is_connected(t));
    }

    #[test]
    fn test_replace_detached_node_fails() {
        let mut doc = Document::new();
        let t = doc.create_text("floating");
        let a = doc.create_text("a");
        assert_eq!(doc.replace_with_nodes(t, &[a]), Err(DomError::Detached(t)));
    }

    #[test]
    fn test_content_editable_inherits() {
        let mut doc = Document::new();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "true").unwrap();
        let locked = doc.create_element("span");
        doc.set_attribute(locked, "contenteditable", "false").unwrap();
        let inner = doc.create_text("x");
        let locked_text = doc.create_text("y");
        doc.append_child(editor, inner).unwrap();
        doc.append_child(editor, locked).unwrap();
        doc.append_child(locked, locked_text).unwrap();
        doc.append_child(doc.body(), editor).unwrap();
        assert!(doc.is_content_editable(inner));
        assert!(!doc.is_content_editable(locked_text));
    }

    #[test]
    fn test_records_only_while_observing_connected_nodes() {
        let mut doc = Document::new();
        let detached = doc.create_element("div");
        doc.observe(true);
        let t = doc.create_text("x");
        doc.append_child(detached, t).unwrap();
        assert!(doc.take_records().is_empty());

        doc.append_child(doc.body(), detached).unwrap();
        let records = doc.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, doc.body());
        assert_eq!(records[0].added, vec![detached]);
    }

    #[test]
    fn test_replace_records_one_change() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "abc");
        doc.observe(true);
        let a = doc.create_text("a");
        doc.replace_with_nodes(t, &[a]).unwrap();
        let records = doc.take_records();
        assert_eq!(
            records,
            vec![MutationRecord {
                target: p,
                added: vec![a],
                removed: vec![t],
            }]
        );
    }

    #[test]
    fn test_class_attribute_round_trips_into_class_list() {
        let mut doc = Document::new();
        let el = doc.create_element("span");
        doc.set_attribute(el, "class", "a  b").unwrap();
        assert!(doc.has_class(el, "a"));
        assert!(doc.has_class(el, "b"));
        doc.remove_class(el, "a").unwrap();
        assert!(!doc.has_class(el, "a"));
    }
}
