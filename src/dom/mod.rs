//! Structural document model
//!
//! The live report page is represented as an arena-backed tree of typed nodes
//! with attribute and inline-style maps. Canvas elements carry their pixel
//! backing store separately from their markup, which mirrors how a browser
//! clone drops canvas bitmaps: [`Document::clone_for_capture`] copies the
//! structure but leaves every canvas blank.

pub mod parse;
pub mod serialize;

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::{Error, Result};

/// The live document shared between the renderers and the capture pipeline.
pub type SharedDocument = Arc<tokio::sync::Mutex<Document>>;

/// Wrap a document for sharing across async tasks.
pub fn shared(doc: Document) -> SharedDocument {
    Arc::new(tokio::sync::Mutex::new(doc))
}

/// Stable handle to a node. Slots are recycled after removal, but the
/// generation makes a stale id resolve to nothing instead of the new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Ordered inline style declarations (`style="a: b; c: d"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    props: Vec<(String, String)>,
}

impl Style {
    pub fn parse(css: &str) -> Self {
        let mut style = Style::default();
        for decl in css.split(';') {
            if let Some((name, value)) = decl.split_once(':') {
                let name = name.trim();
                let value = value.trim();
                if !name.is_empty() {
                    style.set(name, value);
                }
            }
        }
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.props.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.props.push((name, value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.props.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.props.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_css(&self) -> String {
        self.props
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// An element node. The `style` attribute is kept parsed in [`Element::style`].
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    attrs: BTreeMap<String, String>,
    pub style: Style,
    /// Pixel backing store of a `<canvas>`; `None` means blank.
    pub bitmap: Option<RgbaImage>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            style: Style::default(),
            bitmap: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("style") {
            self.style = Style::parse(value);
        } else {
            self.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.remove(name)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.attrs.insert("class".to_string(), joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if let Some(existing) = self.attr("class") {
            let kept = existing
                .split_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
            self.attrs.insert("class".to_string(), kept);
        }
    }

    /// Canvas backing-store size from the `width`/`height` attributes
    /// (HTML defaults 300x150).
    pub fn canvas_size(&self) -> (u32, u32) {
        let dim = |name: &str, default: u32| {
            self.attr(name)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(default)
        };
        (dim("width", 300), dim("height", 150))
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Window scroll offset of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollPosition {
    pub x: i32,
    pub y: i32,
}

/// Compound selector of the form `tag#id.class1.class2` (each part optional).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl SimpleSelector {
    pub fn parse(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        if selector.is_empty() || selector.contains(char::is_whitespace) {
            return Err(Error::Other(format!("unsupported selector '{}'", selector)));
        }
        let mut out = SimpleSelector::default();
        let mut rest = selector;
        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        if tag_end > 0 {
            out.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let part = &body[..end];
            if part.is_empty() {
                return Err(Error::Other(format!("unsupported selector '{}'", selector)));
            }
            if marker == b'#' {
                out.id = Some(part.to_string());
            } else {
                out.classes.push(part.to_string());
            }
            rest = &body[end..];
        }
        Ok(out)
    }

    pub fn matches(&self, el: &Element) -> bool {
        self.tag.as_deref().map_or(true, |t| el.tag == t)
            && self.id.as_deref().map_or(true, |id| el.id() == Some(id))
            && self.classes.iter().all(|c| el.has_class(c))
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed document tree rooted at `<html>`.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    pub scroll: ScrollPosition,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut doc = Document::with_root("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, head);
        doc.append_child(doc.root, body);
        doc
    }

    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        parse::parse_document(html)
    }

    pub(crate) fn with_root(tag: &str) -> Self {
        let mut doc = Document {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            scroll: ScrollPosition::default(),
        };
        doc.root = doc.create_element(tag);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_by_tag(self.root, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_by_tag(self.root, "body")
    }

    fn child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.element(*c).map_or(false, |e| e.tag == tag))
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether the node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == self.root {
                return self.node(c).is_some();
            }
            cur = self.parent(c);
        }
        false
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Vacate the slot of `id`, returning its node.
    fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Number of slots currently holding a node, detached ones included.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self
            .parent(reference)
            .ok_or_else(|| Error::Other("reference node has no parent".into()))?;
        self.detach(node);
        let p = self
            .node_mut(parent)
            .ok_or_else(|| Error::Other("parent node was removed".into()))?;
        let pos = p.children.iter().position(|c| *c == reference).map_or(p.children.len(), |i| i + 1);
        p.children.insert(pos, node);
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }
        Ok(())
    }

    /// Remove a node and its subtree. Returns false if it was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root || self.node(id).is_none() {
            return false;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.release(cur) {
                stack.extend(node.children);
            }
        }
        true
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.children(cur).iter().rev().copied());
        }
        out
    }

    /// Every attached element in document order, root included.
    pub fn elements(&self) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|id| self.element(*id).is_some())
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|n| self.element(*n).and_then(|e| e.id()) == Some(id))
    }

    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| self.element(*n).map_or(false, |e| e.has_class(class)))
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| self.element(*n).map_or(false, |e| e.tag == tag))
            .collect()
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let sel = SimpleSelector::parse(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .filter(|n| self.element(*n).map_or(false, |e| sel.matches(e)))
            .collect())
    }

    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// Whether `id` is `ancestor` or lies inside it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            serialize::write_node(self, *child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, id, &mut out);
        out
    }

    /// Replace the children of `id` with the parsed `html` fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<()> {
        if self.element(id).is_none() {
            return Err(Error::ElementNotFound(format!("node {:?}", id)));
        }
        self.clear_children(id);
        parse::parse_fragment_into(self, id, html);
        Ok(())
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        format!("<!DOCTYPE html>{}", self.outer_html(self.root))
    }

    /// Structural copy as produced by DOM cloning: attributes, styles and
    /// text are copied, canvas pixel stores are not.
    pub fn clone_for_capture(&self) -> Document {
        let mut copy = self.clone();
        for node in copy.slots.iter_mut().filter_map(|s| s.node.as_mut()) {
            if let NodeData::Element(el) = &mut node.data {
                el.bitmap = None;
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_parse_set_and_serialize() {
        let mut s = Style::parse("display: none; Height:0px;;");
        assert_eq!(s.get("display"), Some("none"));
        assert_eq!(s.get("height"), Some("0px"));
        s.set("display", "block");
        s.set("position", "static");
        assert_eq!(s.to_css(), "display: block; height: 0px; position: static");
        assert_eq!(s.remove("height").as_deref(), Some("0px"));
        assert!(s.get("height").is_none());
    }

    #[test]
    fn selector_parsing_and_matching() {
        let sel = SimpleSelector::parse("div#main.report-section.wide").unwrap();
        assert_eq!(sel.tag.as_deref(), Some("div"));
        assert_eq!(sel.id.as_deref(), Some("main"));
        assert_eq!(sel.classes, vec!["report-section", "wide"]);

        let mut el = Element::new("DIV");
        el.set_attr("id", "main");
        el.set_attr("class", "wide report-section");
        assert!(sel.matches(&el));
        el.remove_class("wide");
        assert!(!sel.matches(&el));
        assert!(SimpleSelector::parse("div p").is_err());
    }

    #[test]
    fn tree_mutation_keeps_ids_stable() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let a = doc.create_element("div");
        let b = doc.create_element("p");
        let t = doc.create_text("hello");
        doc.append_child(body, a);
        doc.append_child(a, b);
        doc.append_child(b, t);
        assert!(doc.is_attached(t));
        assert_eq!(doc.text_content(a), "hello");

        let c = doc.create_element("span");
        doc.insert_after(a, c).unwrap();
        assert_eq!(doc.children(body), &[a, c]);

        assert!(doc.remove(a));
        assert!(!doc.is_attached(t));
        assert!(doc.element(b).is_none());
        assert!(!doc.remove(a));
        assert_eq!(doc.children(body), &[c]);
    }

    #[test]
    fn removed_slots_are_recycled_without_reviving_stale_ids() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let old = doc.create_element("div");
        doc.append_child(body, old);
        let before = doc.node_count();
        assert!(doc.remove(old));

        let fresh = doc.create_element("p");
        assert_ne!(fresh, old);
        assert!(doc.element(old).is_none());
        assert!(!doc.remove(old));
        assert_eq!(doc.element(fresh).unwrap().tag, "p");
        assert_eq!(doc.node_count(), before);
    }

    #[test]
    fn repeated_rewrites_do_not_grow_the_arena() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let panel = doc.create_element("div");
        doc.append_child(body, panel);
        doc.set_inner_html(panel, "<p>one <b>two</b></p>").unwrap();
        let settled = doc.node_count();
        for _ in 0..50 {
            doc.set_inner_html(panel, "<p>one <b>two</b></p>").unwrap();
        }
        assert_eq!(doc.node_count(), settled);
        assert_eq!(doc.clone_for_capture().node_count(), settled);
    }

    #[test]
    fn clone_for_capture_drops_canvas_pixels() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let canvas = doc.create_element("canvas");
        doc.append_child(body, canvas);
        doc.element_mut(canvas).unwrap().bitmap = Some(RgbaImage::new(4, 4));

        let copy = doc.clone_for_capture();
        assert!(copy.element(canvas).unwrap().bitmap.is_none());
        assert!(doc.element(canvas).unwrap().bitmap.is_some());
    }

    #[test]
    fn canvas_size_defaults() {
        let mut el = Element::new("canvas");
        assert_eq!(el.canvas_size(), (300, 150));
        el.set_attr("width", "640");
        assert_eq!(el.canvas_size(), (640, 150));
    }
}
