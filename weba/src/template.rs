use weba_parser::{parse_fragment, AstNode, Markup, ParseError};

use crate::attribute::{is_multi_valued, AttrValue};
use crate::tag::{NodeData, Tag};

/// A parsed, immutable fragment that stamps out fresh trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<AstNode>,
    markup: Markup,
}

impl Template {
    /// Parse `source` with the rules for `markup`.
    pub fn parse(source: &str, markup: Markup) -> Result<Self, ParseError> {
        Ok(Self {
            nodes: parse_fragment(source, markup)?,
            markup,
        })
    }

    /// The parsed top-level nodes.
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    /// The markup this template was parsed as.
    pub fn markup(&self) -> Markup {
        self.markup
    }

    /// Build a new, detached tree from this template.
    ///
    /// Whitespace-only top-level text is dropped. A single remaining node is
    /// returned as is; several are wrapped in an invisible fragment; none gives an
    /// empty fragment.
    pub fn instantiate(&self) -> Tag {
        let roots: Vec<Tag> = self
            .nodes
            .iter()
            .filter(|node| !node.is_blank_text())
            .map(|node| build(node, self.markup))
            .collect();
        wrap_roots(roots).unwrap_or_else(Tag::fragment)
    }
}

/// One node as is, several inside a fragment, none as `None`.
fn wrap_roots(mut roots: Vec<Tag>) -> Option<Tag> {
    match roots.len() {
        0 => None,
        1 => roots.pop(),
        _ => {
            let fragment = Tag::fragment();
            for root in roots {
                fragment.adopt(root);
            }
            Some(fragment)
        }
    }
}

fn build(node: &AstNode, markup: Markup) -> Tag {
    match node {
        AstNode::Element {
            name,
            attributes,
            children,
            ..
        } => {
            let xml = markup == Markup::Xml;
            let tag = Tag::new_element(name.as_str(), xml);
            tag.with_attrs_mut(|attrs| {
                for attribute in attributes {
                    let value = match &attribute.value {
                        None => AttrValue::Flag,
                        Some(value) if !xml && is_multi_valued(&attribute.name) => AttrValue::List(
                            value.split_whitespace().map(str::to_string).collect(),
                        ),
                        Some(value) => AttrValue::Text(value.clone()),
                    };
                    attrs.insert(attribute.name.clone(), value);
                }
            });
            for child in children {
                tag.adopt(build(child, markup));
            }
            tag
        }
        AstNode::Text(text) => Tag::from_data(NodeData::Text(text.clone())),
        AstNode::Comment(text) => Tag::from_data(NodeData::Comment(text.clone())),
        AstNode::Doctype(text) => Tag::from_data(NodeData::Doctype(text.clone())),
        AstNode::ProcessingInstruction(text) => {
            Tag::from_data(NodeData::ProcessingInstruction(text.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_are_independent() {
        let template = Template::parse("<div class='card'><p>Body</p></div>", Markup::Html).unwrap();
        let first = template.instantiate();
        let second = template.instantiate();
        first.select_one("p").unwrap().unwrap().set_string("Changed");
        assert_eq!(first.to_html(), r#"<div class="card"><p>Changed</p></div>"#);
        assert_eq!(second.to_html(), r#"<div class="card"><p>Body</p></div>"#);
    }

    #[test]
    fn surrounding_whitespace_is_dropped() {
        let template = Template::parse("\n  <ul>\n    <li>Item</li>\n  </ul>\n", Markup::Html).unwrap();
        let root = template.instantiate();
        assert_eq!(root.name(), "ul");
        assert_eq!(root.select("li").unwrap().len(), 1);
    }

    #[test]
    fn several_roots_share_a_fragment() {
        let template = Template::parse("<li>a</li><li>b</li>", Markup::Html).unwrap();
        let root = template.instantiate();
        assert_eq!(root.kind(), crate::NodeKind::Fragment);
        assert_eq!(root.to_html(), "<li>a</li><li>b</li>");
    }

    #[test]
    fn empty_source_gives_empty_fragment() {
        let root = Template::parse("", Markup::Html).unwrap().instantiate();
        assert_eq!(root.kind(), crate::NodeKind::Fragment);
        assert_eq!(root.to_html(), "");
    }
}
