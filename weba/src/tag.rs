use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use weba_parser::selector::{self, Selector};

use crate::attribute::{attribute_name, is_multi_valued, AttrValue, ClassList, IntoAttrValue};
use crate::{Content, Error, Result};

/// The payload of a tree node.
#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Element {
        name: String,
        attrs: IndexMap<String, AttrValue>,
        /// Built by the XML parser: case-sensitive, no multi-valued attributes, `<x/>` when empty.
        xml: bool,
    },
    Text(String),
    Comment(String),
    Doctype(String),
    ProcessingInstruction(String),
    /// An invisible container that renders only its children.
    Fragment,
}

/// What kind of node a [`Tag`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An element such as `<div>`.
    Element,
    /// A run of text.
    Text,
    /// An HTML comment.
    Comment,
    /// A `<!DOCTYPE ...>` declaration.
    Doctype,
    /// An XML processing instruction.
    ProcessingInstruction,
    /// An invisible container holding several top-level nodes.
    Fragment,
}

pub(crate) struct Node {
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<Tag>>,
    data: RefCell<NodeData>,
}

/// A handle to one mutable tree node.
///
/// Cloning a `Tag` clones the handle, not the node; use [`Tag::copy`] for a deep
/// clone. Handles are compared with [`Tag::same_node`].
#[derive(Clone)]
pub struct Tag(Rc<Node>);

impl Tag {
    pub(crate) fn from_data(data: NodeData) -> Self {
        Tag(Rc::new(Node {
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            data: RefCell::new(data),
        }))
    }

    pub(crate) fn new_element(name: impl Into<String>, xml: bool) -> Self {
        Self::from_data(NodeData::Element {
            name: name.into(),
            attrs: IndexMap::new(),
            xml,
        })
    }

    /// A detached HTML element.
    pub fn element(name: impl Into<String>) -> Self {
        Self::new_element(name, false)
    }

    /// A detached XML element.
    pub fn xml_element(name: impl Into<String>) -> Self {
        Self::new_element(name, true)
    }

    /// A detached text node.
    pub fn new_text(text: impl Into<String>) -> Self {
        Self::from_data(NodeData::Text(text.into()))
    }

    /// A detached comment node; `text` is emitted between `<!--` and `-->` as is.
    pub fn new_comment(text: impl Into<String>) -> Self {
        Self::from_data(NodeData::Comment(text.into()))
    }

    /// A detached doctype, e.g. `Tag::doctype("html")` for `<!DOCTYPE html>`.
    pub fn doctype(text: impl Into<String>) -> Self {
        Self::from_data(NodeData::Doctype(text.into()))
    }

    /// A detached processing instruction, e.g. `xml version="1.0"`.
    pub fn processing_instruction(text: impl Into<String>) -> Self {
        Self::from_data(NodeData::ProcessingInstruction(text.into()))
    }

    /// An empty invisible container.
    pub fn fragment() -> Self {
        Self::from_data(NodeData::Fragment)
    }

    pub(crate) fn data(&self) -> Ref<'_, NodeData> {
        self.0.data.borrow()
    }

    pub(crate) fn children_ref(&self) -> Ref<'_, Vec<Tag>> {
        self.0.children.borrow()
    }

    /// Whether both handles point at the same node.
    pub fn same_node(&self, other: &Tag) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The kind of node this handle refers to.
    pub fn kind(&self) -> NodeKind {
        match &*self.data() {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Doctype(_) => NodeKind::Doctype,
            NodeData::ProcessingInstruction(_) => NodeKind::ProcessingInstruction,
            NodeData::Fragment => NodeKind::Fragment,
        }
    }

    /// Whether this is an element node.
    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Whether this is a text node.
    pub fn is_text(&self) -> bool {
        self.kind() == NodeKind::Text
    }

    /// Whether this is a comment node.
    pub fn is_comment(&self) -> bool {
        self.kind() == NodeKind::Comment
    }

    /// The tag name for elements, or the DOM node name (`#text`, `#comment`,
    /// `#doctype`, `#processing-instruction`, `#document-fragment`) otherwise.
    pub fn name(&self) -> String {
        match &*self.data() {
            NodeData::Element { name, .. } => name.clone(),
            NodeData::Text(_) => "#text".to_string(),
            NodeData::Comment(_) => "#comment".to_string(),
            NodeData::Doctype(_) => "#doctype".to_string(),
            NodeData::ProcessingInstruction(_) => "#processing-instruction".to_string(),
            NodeData::Fragment => "#document-fragment".to_string(),
        }
    }

    /// Rename an element, keeping its attributes and children. No effect on other nodes.
    pub fn set_name(&self, new_name: impl Into<String>) {
        if let NodeData::Element { name, .. } = &mut *self.0.data.borrow_mut() {
            *name = new_name.into();
        }
    }

    fn is_xml(&self) -> bool {
        matches!(&*self.data(), NodeData::Element { xml: true, .. })
    }

    // Attributes

    pub(crate) fn with_attrs_mut<R>(
        &self,
        f: impl FnOnce(&mut IndexMap<String, AttrValue>) -> R,
    ) -> Option<R> {
        match &mut *self.0.data.borrow_mut() {
            NodeData::Element { attrs, .. } => Some(f(attrs)),
            _ => None,
        }
    }

    fn with_attrs<R>(&self, f: impl FnOnce(&IndexMap<String, AttrValue>) -> R) -> Option<R> {
        match &*self.data() {
            NodeData::Element { attrs, .. } => Some(f(attrs)),
            _ => None,
        }
    }

    /// The stored value of attribute `name`.
    pub fn get_attr(&self, name: &str) -> Option<AttrValue> {
        self.with_attrs(|attrs| attrs.get(name).cloned()).flatten()
    }

    /// The value of attribute `name` as it appears in markup; flags read as `""`.
    pub fn attr_value(&self, name: &str) -> Option<String> {
        self.get_attr(name)
            .map(|value| value.to_markup_value().unwrap_or_default().into_owned())
    }

    /// Write attribute `name` exactly as spelled. A value converting to nothing
    /// (`false`, `None`) removes the attribute.
    pub fn set_attr(&self, name: &str, value: impl IntoAttrValue) {
        let multi_valued = !self.is_xml() && is_multi_valued(name);
        match value.into_attr_value(multi_valued) {
            Some(value) => {
                self.with_attrs_mut(|attrs| attrs.insert(name.to_string(), value));
            }
            None => {
                self.remove_attr(name);
            }
        }
    }

    /// Remove attribute `name`, keeping the order of the others.
    pub fn remove_attr(&self, name: &str) -> Option<AttrValue> {
        self.with_attrs_mut(|attrs| attrs.shift_remove(name))
            .flatten()
    }

    /// Whether attribute `name` is present.
    pub fn has_attr(&self, name: &str) -> bool {
        self.with_attrs(|attrs| attrs.contains_key(name))
            .unwrap_or(false)
    }

    /// A snapshot of every attribute in order.
    pub fn attributes(&self) -> IndexMap<String, AttrValue> {
        self.with_attrs(Clone::clone).unwrap_or_default()
    }

    /// Builder form of [`Tag::set_attr`] that also converts Rust-style keys:
    /// `class_` → `class`, `hx_post` → `hx-post`.
    pub fn attr(self, key: &str, value: impl IntoAttrValue) -> Self {
        self.set_attr(&attribute_name(key), value);
        self
    }

    /// Builder form of [`Tag::attr`] for several attributes at once.
    pub fn attrs<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: IntoAttrValue,
    {
        for (key, value) in pairs {
            self.set_attr(&attribute_name(key.as_ref()), value);
        }
        self
    }

    /// Store `value` as JSON text in attribute `name`.
    pub fn set_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.with_attrs_mut(|attrs| attrs.insert(name.to_string(), AttrValue::Text(encoded)));
        Ok(())
    }

    /// Decode the JSON stored in attribute `name`.
    pub fn attr_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.attr_value(name)
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Error::from)
    }

    /// A live handle on the `class` attribute.
    pub fn class_list(&self) -> ClassList {
        ClassList::new(self.clone())
    }

    // Content

    /// The sole text of this node.
    ///
    /// `Some` for a text node, or for a node with exactly one child whose own
    /// `string()` is `Some`. `None` for empty nodes, several children, and
    /// comments.
    pub fn string(&self) -> Option<String> {
        if let NodeData::Text(text) = &*self.data() {
            return Some(text.clone());
        }
        let children = self.children_ref();
        match children.as_slice() {
            [only] => only.string(),
            _ => None,
        }
    }

    /// Replace all children with a single text node. On a text node, replaces its text.
    pub fn set_string(&self, text: impl Into<String>) {
        if let NodeData::Text(current) = &mut *self.0.data.borrow_mut() {
            *current = text.into();
            return;
        }
        self.clear();
        self.adopt(Tag::new_text(text));
    }

    /// All descendant text concatenated in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &*self.data() {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } | NodeData::Fragment => {
                for child in self.children_ref().iter() {
                    child.collect_text(out);
                }
            }
            _ => {}
        }
    }

    // Navigation

    /// The parent node, if attached.
    pub fn parent(&self) -> Option<Tag> {
        self.0.parent.borrow().upgrade().map(Tag)
    }

    /// The direct children in order.
    pub fn children(&self) -> Vec<Tag> {
        self.children_ref().clone()
    }

    /// Number of direct children.
    pub fn contents_len(&self) -> usize {
        self.children_ref().len()
    }

    /// The position of this node among its parent's children.
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let index = parent
            .children_ref()
            .iter()
            .position(|child| child.same_node(self));
        index
    }

    /// The sibling right after this one.
    pub fn next_sibling(&self) -> Option<Tag> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        let sibling = parent.children_ref().get(index + 1).cloned();
        sibling
    }

    /// The sibling right before this one.
    pub fn previous_sibling(&self) -> Option<Tag> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?.checked_sub(1)?;
        let sibling = parent.children_ref().get(index).cloned();
        sibling
    }

    /// Every descendant in document order, not including `self`.
    pub fn descendants(&self) -> Vec<Tag> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<Tag>) {
        for child in self.children_ref().iter() {
            out.push(child.clone());
            child.collect_descendants(out);
        }
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub(crate) fn is_inclusive_ancestor_of(&self, other: &Tag) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.same_node(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    // Mutation

    /// Append `content` as the last children.
    pub fn append(&self, content: impl Content) -> Result<()> {
        let index = self.contents_len();
        self.insert_nodes(index, content.into_nodes())
    }

    /// Insert `content` at `index`; an index past the end appends.
    pub fn insert(&self, index: usize, content: impl Content) -> Result<()> {
        self.insert_nodes(index, content.into_nodes())
    }

    fn check_insertable(&self, nodes: &[Tag]) -> Result<()> {
        if nodes.iter().any(|node| node.is_inclusive_ancestor_of(self)) {
            return Err(Error::HierarchyRequest);
        }
        Ok(())
    }

    fn insert_nodes(&self, index: usize, nodes: Vec<Tag>) -> Result<()> {
        let nodes = flatten(nodes);
        self.check_insertable(&nodes)?;
        self.adopt_at(index, nodes);
        Ok(())
    }

    /// Append a node known not to contain `self`. Fragments are kept as nodes.
    pub(crate) fn adopt(&self, node: Tag) {
        let index = self.contents_len();
        self.adopt_at(index, vec![node]);
    }

    fn adopt_at(&self, mut index: usize, nodes: Vec<Tag>) {
        for node in nodes {
            if let Some(old_parent) = node.parent() {
                if old_parent.same_node(self) {
                    if let Some(old_index) = node.index_in_parent() {
                        if old_index < index {
                            index -= 1;
                        }
                    }
                }
                node.extract();
            }
            let mut children = self.0.children.borrow_mut();
            let at = index.min(children.len());
            *node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
            children.insert(at, node);
            index = at + 1;
        }
    }

    /// Detach this node from its parent and return it. Detached nodes are left alone.
    pub fn extract(&self) -> Tag {
        if let Some(parent) = self.parent() {
            parent
                .0
                .children
                .borrow_mut()
                .retain(|child| !child.same_node(self));
        }
        *self.0.parent.borrow_mut() = Weak::new();
        self.clone()
    }

    /// Put `content` where this node is and detach this node, which is returned.
    pub fn replace_with(&self, content: impl Content) -> Result<Tag> {
        self.splice(flatten(content.into_nodes()))
    }

    /// Like [`Tag::replace_with`], keeping a fragment `node` whole.
    pub(crate) fn replace_node(&self, node: &Tag) -> Result<Tag> {
        self.splice(vec![node.clone()])
    }

    fn splice(&self, nodes: Vec<Tag>) -> Result<Tag> {
        let parent = self.parent().ok_or(Error::DetachedTag {
            operation: "replace_with",
        })?;
        parent.check_insertable(&nodes)?;
        let index = self.index_in_parent().unwrap_or_else(|| parent.contents_len());
        self.extract();
        parent.adopt_at(index, nodes);
        Ok(self.clone())
    }

    /// A deep, detached clone sharing nothing with this node.
    pub fn copy(&self) -> Tag {
        let copy = Tag::from_data(self.data().clone());
        for child in self.children_ref().iter() {
            copy.adopt(child.copy());
        }
        copy
    }

    /// Detach every child.
    pub fn clear(&self) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    /// Detach this node and dismantle its subtree.
    pub fn decompose(&self) {
        self.extract();
        for child in self.children() {
            child.decompose();
        }
    }

    // Queries

    /// Descendant elements matching the CSS selector `css`, in document order.
    pub fn select(&self, css: &str) -> Result<Vec<Tag>> {
        let selector = parse_selector(css)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|node| node.is_element() && selector.matches(node))
            .collect())
    }

    /// Whether this element itself matches `css`.
    pub fn matches(&self, css: &str) -> Result<bool> {
        let selector = parse_selector(css)?;
        Ok(self.is_element() && selector.matches(self))
    }

    /// The first descendant element matching `css`.
    pub fn select_one(&self, css: &str) -> Result<Option<Tag>> {
        Ok(self.select(css)?.into_iter().next())
    }

    /// Elements marked by a comment whose text equals `selector`.
    ///
    /// `selector` may be bare (`#button`) or delimited (`<!-- #button -->`). For
    /// each matching comment the result holds the next sibling element, skipping
    /// other comments and whitespace-only text. A comment followed by real text,
    /// or by nothing, contributes no match.
    pub fn comment(&self, selector: &str) -> Result<Vec<Tag>> {
        let marker = comment_marker(selector)?;
        let mut matches = Vec::new();
        for node in self.descendants() {
            let is_marker = matches!(&*node.data(), NodeData::Comment(text) if text.trim() == marker);
            if !is_marker {
                continue;
            }
            let mut sibling = node.next_sibling();
            while let Some(candidate) = sibling {
                match &*candidate.data() {
                    NodeData::Comment(_) => {}
                    NodeData::Text(text) if text.trim().is_empty() => {}
                    NodeData::Element { .. } => {
                        matches.push(candidate.clone());
                        break;
                    }
                    _ => break,
                }
                sibling = candidate.next_sibling();
            }
        }
        Ok(matches)
    }

    /// The first element marked by a comment whose text equals `selector`.
    pub fn comment_one(&self, selector: &str) -> Result<Option<Tag>> {
        Ok(self.comment(selector)?.into_iter().next())
    }

    // Serialization

    /// The markup for this node and its subtree.
    pub fn to_html(&self) -> String {
        self.to_string()
    }

    /// Indented markup, two spaces per level. Inline elements and text runs
    /// stay on one line.
    pub fn prettify(&self) -> String {
        crate::render::prettify(self)
    }
}

/// Replace every fragment in `nodes` by its children, recursively.
pub(crate) fn flatten(nodes: Vec<Tag>) -> Vec<Tag> {
    let mut flat = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.kind() == NodeKind::Fragment {
            flat.extend(flatten(node.children()));
        } else {
            flat.push(node);
        }
    }
    flat
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| Error::InvalidSelector {
        selector: css.to_string(),
        reason: err.to_string(),
    })
}

/// Normalize a comment selector to the marker text it must equal.
pub(crate) fn comment_marker(selector: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = selector.trim();
    let inner = match trimmed.strip_prefix("<!--") {
        Some(rest) => rest
            .strip_suffix("-->")
            .ok_or_else(|| invalid("comment marker opens with `<!--` but never closes"))?,
        None if trimmed.ends_with("-->") => {
            return Err(invalid("comment marker closes with `-->` but never opens"))
        }
        None => trimmed,
    };
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(invalid("comment marker is empty"));
    }
    Ok(inner.to_string())
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::render::write_node(f, self)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.to_html()).finish()
    }
}

impl selector::Element for Tag {
    fn local_name(&self) -> String {
        self.name()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attr_value(name)
    }

    fn parent_element(&self) -> Option<Self> {
        let mut parent = self.parent();
        while let Some(node) = parent {
            if node.is_element() {
                return Some(node);
            }
            parent = node.parent();
        }
        None
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let mut sibling = self.previous_sibling();
        while let Some(node) = sibling {
            if node.is_element() {
                return Some(node);
            }
            sibling = node.previous_sibling();
        }
        None
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let mut sibling = self.next_sibling();
        while let Some(node) = sibling {
            if node.is_element() {
                return Some(node);
            }
            sibling = node.next_sibling();
        }
        None
    }

    fn has_no_content(&self) -> bool {
        self.children_ref()
            .iter()
            .all(|child| matches!(child.kind(), NodeKind::Comment | NodeKind::ProcessingInstruction))
    }

    fn has_class(&self, class: &str) -> bool {
        match self.get_attr("class") {
            Some(AttrValue::List(list)) => list.iter().any(|c| c == class),
            Some(AttrValue::Text(text)) => text.split_whitespace().any(|c| c == class),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list() -> (Tag, Tag, Tag) {
        let ul = Tag::element("ul");
        let first = Tag::element("li");
        first.set_string("one");
        let second = Tag::element("li");
        second.set_string("two");
        ul.append((&first, &second)).unwrap();
        (ul, first, second)
    }

    #[test]
    fn append_moves_existing_nodes() {
        let (ul, first, _) = list();
        let other = Tag::element("ol");
        other.append(&first).unwrap();
        assert_eq!(ul.to_html(), "<ul><li>two</li></ul>");
        assert_eq!(other.to_html(), "<ol><li>one</li></ol>");
        assert!(first.parent().unwrap().same_node(&other));
    }

    #[test]
    fn reinserting_within_the_same_parent() {
        let (ul, first, second) = list();
        ul.append(&first).unwrap();
        assert_eq!(ul.to_html(), "<ul><li>two</li><li>one</li></ul>");
        ul.insert(0, &first).unwrap();
        assert_eq!(ul.to_html(), "<ul><li>one</li><li>two</li></ul>");
        ul.insert(99, &first).unwrap();
        assert_eq!(ul.to_html(), "<ul><li>two</li><li>one</li></ul>");
        assert_eq!(second.index_in_parent(), Some(0));
    }

    #[test]
    fn insert_into_descendant_is_rejected() {
        let (ul, first, _) = list();
        assert!(matches!(first.append(&ul), Err(Error::HierarchyRequest)));
        assert!(matches!(ul.append(&ul), Err(Error::HierarchyRequest)));
        assert_eq!(ul.to_html(), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn extract_is_idempotent() {
        let (ul, first, _) = list();
        first.extract();
        first.extract();
        assert!(first.parent().is_none());
        assert_eq!(ul.contents_len(), 1);
    }

    #[test]
    fn replace_with_splices_in_order() {
        let (ul, first, _) = list();
        let a = Tag::element("li");
        a.set_string("a");
        let b = Tag::element("li");
        b.set_string("b");
        let old = first.replace_with((&a, &b)).unwrap();
        assert!(old.same_node(&first));
        assert!(first.parent().is_none());
        assert_eq!(
            ul.to_html(),
            "<ul><li>a</li><li>b</li><li>two</li></ul>"
        );
    }

    #[test]
    fn replace_with_requires_a_parent() {
        let (_, first, _) = list();
        first.extract();
        let err = first.replace_with(Tag::element("p")).unwrap_err();
        assert!(matches!(
            err,
            Error::DetachedTag {
                operation: "replace_with"
            }
        ));
    }

    #[test]
    fn fragments_splice_their_children() {
        let (ul, first, second) = list();
        let fragment = Tag::fragment();
        let a = Tag::element("li");
        let b = Tag::element("li");
        fragment.adopt(a.clone());
        fragment.adopt(b.clone());
        ul.insert(1, &fragment).unwrap();
        assert_eq!(ul.contents_len(), 4);
        assert_eq!(fragment.contents_len(), 0);
        assert_eq!(a.index_in_parent(), Some(1));
        assert_eq!(b.index_in_parent(), Some(2));
        assert_eq!(second.index_in_parent(), Some(3));

        let c = Tag::element("hr");
        fragment.adopt(c.clone());
        first.replace_with(&fragment).unwrap();
        assert!(c.parent().unwrap().same_node(&ul));
        assert_eq!(ul.to_html(), "<ul><hr><li></li><li></li><li>two</li></ul>");
    }

    #[test]
    fn copy_is_independent() {
        let (ul, first, _) = list();
        let copy = ul.copy();
        copy.class_list().add("copied");
        copy.children()[0].set_string("changed");
        assert_eq!(ul.to_html(), "<ul><li>one</li><li>two</li></ul>");
        assert_eq!(first.string().as_deref(), Some("one"));
        assert!(copy.parent().is_none());
    }

    #[test]
    fn string_semantics() {
        let (ul, first, _) = list();
        assert_eq!(first.string().as_deref(), Some("one"));
        assert_eq!(ul.string(), None);
        assert_eq!(Tag::element("p").string(), None);

        let wrapper = Tag::element("div");
        wrapper.append(&first).unwrap();
        assert_eq!(wrapper.string().as_deref(), Some("one"));

        let commented = Tag::element("div");
        commented.append(Tag::new_comment("note")).unwrap();
        assert_eq!(commented.string(), None);
    }

    #[test]
    fn text_concatenates_descendants() {
        let (ul, _, _) = list();
        ul.append(Tag::new_comment("hidden")).unwrap();
        assert_eq!(ul.text(), "onetwo");
    }

    #[test]
    fn rename_keeps_children_and_attributes() {
        let (ul, _, _) = list();
        ul.set_attr("id", "items");
        ul.set_name("ol");
        assert_eq!(
            ul.to_html(),
            r#"<ol id="items"><li>one</li><li>two</li></ol>"#
        );
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let tag = Tag::element("a")
            .attr("href", "/home")
            .attr("class_", "nav link")
            .attr("hx_boost", true)
            .attr("hidden", false);
        assert_eq!(
            tag.to_html(),
            r#"<a href="/home" class="nav link" hx-boost></a>"#
        );
        assert_eq!(
            tag.get_attr("class"),
            Some(AttrValue::List(vec!["nav".into(), "link".into()]))
        );
        tag.remove_attr("href");
        assert_eq!(tag.to_html(), r#"<a class="nav link" hx-boost></a>"#);
    }

    #[test]
    fn json_attributes_round_trip() {
        let tag = Tag::element("div");
        let value = serde_json::json!({"nested": {"list": [1, 2.5, "x"], "ok": false}});
        tag.set_attr("hx-vals", value.clone());
        let decoded: serde_json::Value = tag.attr_json("hx-vals").unwrap().unwrap();
        assert_eq!(decoded, value);

        tag.set_json("data-ids", &vec![1, 2, 3]).unwrap();
        let ids: Vec<u32> = tag.attr_json("data-ids").unwrap().unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tag.attr_json::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn class_list_is_live() {
        let tag = Tag::element("h1");
        let classes = tag.class_list();
        classes.add("highlight").add("text-xl");
        assert_eq!(tag.to_html(), r#"<h1 class="highlight text-xl"></h1>"#);
        assert!(classes.contains("highlight"));
        assert!(!classes.toggle("highlight"));
        assert!(classes.toggle("bold"));
        assert_eq!(classes.to_vec(), vec!["text-xl", "bold"]);
        classes.clear();
        assert!(classes.is_empty());
        assert_eq!(tag.to_html(), r#"<h1 class=""></h1>"#);
    }

    #[test]
    fn class_list_converts_plain_text_values() {
        let tag = Tag::element("p");
        tag.with_attrs_mut(|attrs| attrs.insert("class".into(), AttrValue::Text("a b".into())));
        tag.class_list().add("c");
        assert_eq!(tag.to_html(), r#"<p class="a b c"></p>"#);
    }

    #[test]
    fn comment_marker_forms() {
        assert_eq!(comment_marker("#button").unwrap(), "#button");
        assert_eq!(comment_marker("<!-- #button -->").unwrap(), "#button");
        assert_eq!(comment_marker("<!--#button-->").unwrap(), "#button");
        assert!(comment_marker("").is_err());
        assert!(comment_marker("<!--   -->").is_err());
        assert!(comment_marker("<!-- #button").is_err());
        assert!(comment_marker("#button -->").is_err());
    }

    #[test]
    fn comment_lookup_skips_whitespace_and_comments() {
        let root = Tag::element("div");
        root.append((
            Tag::new_comment(" #button "),
            Tag::new_text("\n  "),
            Tag::new_comment("other"),
            Tag::element("button"),
        ))
        .unwrap();
        let found = root.comment_one("<!-- #button -->").unwrap().unwrap();
        assert_eq!(found.name(), "button");
    }

    #[test]
    fn comment_lookup_stops_at_text() {
        let root = Tag::element("div");
        root.append((
            Tag::new_comment("#label"),
            Tag::new_text("words"),
            Tag::element("span"),
            Tag::new_comment("#trailing"),
        ))
        .unwrap();
        assert!(root.comment_one("#label").unwrap().is_none());
        assert!(root.comment_one("#trailing").unwrap().is_none());
        assert!(root.comment("#absent").unwrap().is_empty());
    }

    #[test]
    fn select_finds_descendants_in_order() {
        let (ul, first, second) = list();
        second.class_list().add("active");
        let items = ul.select("li").unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].same_node(&first));
        assert!(ul.select_one("li.active").unwrap().unwrap().same_node(&second));
        assert!(ul.select_one("ul").unwrap().is_none());
        assert!(matches!(
            ul.select("li[").unwrap_err(),
            Error::InvalidSelector { .. }
        ));
    }

    #[test]
    fn decompose_dismantles_the_subtree() {
        let (ul, first, _) = list();
        let wrapper = Tag::element("div");
        wrapper.append(&ul).unwrap();
        ul.decompose();
        assert_eq!(wrapper.to_html(), "<div></div>");
        assert!(first.parent().is_none());
        assert_eq!(first.contents_len(), 0);
    }
}
