use std::fmt::{self, Write};

use weba_parser::{is_raw_text_element, is_void_element};

use crate::tag::{NodeData, Tag};

/// Write the markup for `tag` and its subtree without adding any whitespace.
pub(crate) fn write_node(writer: &mut impl Write, tag: &Tag) -> fmt::Result {
    let data = tag.data();
    match &*data {
        NodeData::Element { name, attrs, xml } => {
            write_start_tag(writer, name, attrs)?;
            let children = tag.children_ref();
            if children.is_empty() {
                if *xml {
                    return writer.write_str("/>");
                }
                writer.write_char('>')?;
                if is_void_element(name) {
                    return Ok(());
                }
            } else {
                writer.write_char('>')?;
            }
            let raw = !*xml && is_raw_text_element(name);
            for child in children.iter() {
                if raw {
                    if let NodeData::Text(text) = &*child.data() {
                        writer.write_str(text)?;
                        continue;
                    }
                }
                write_node(writer, child)?;
            }
            write!(writer, "</{name}>")
        }
        NodeData::Fragment => {
            for child in tag.children_ref().iter() {
                write_node(writer, child)?;
            }
            Ok(())
        }
        other => write_leaf(writer, other),
    }
}

fn write_start_tag(
    writer: &mut impl Write,
    name: &str,
    attrs: &indexmap::IndexMap<String, crate::AttrValue>,
) -> fmt::Result {
    write!(writer, "<{name}")?;
    for (key, value) in attrs {
        match value.to_markup_value() {
            // Values carrying double quotes (JSON, mostly) read better single-quoted
            Some(value) if value.contains('"') && !value.contains('\'') => write!(
                writer,
                " {key}='{}'",
                html_escape::encode_single_quoted_attribute(&value)
            )?,
            Some(value) => write!(
                writer,
                " {key}=\"{}\"",
                html_escape::encode_double_quoted_attribute(&value)
            )?,
            None => write!(writer, " {key}")?,
        }
    }
    Ok(())
}

fn write_leaf(writer: &mut impl Write, data: &NodeData) -> fmt::Result {
    match data {
        NodeData::Text(text) => writer.write_str(&html_escape::encode_text(text)),
        NodeData::Comment(text) => write!(writer, "<!--{text}-->"),
        NodeData::Doctype(text) => write!(writer, "<!DOCTYPE {text}>"),
        NodeData::ProcessingInstruction(text) => write!(writer, "<?{text}?>"),
        NodeData::Element { .. } | NodeData::Fragment => Ok(()),
    }
}

/// Indented markup for `tag`.
pub(crate) fn prettify(tag: &Tag) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail
    let _ = write_many_pretty(&mut output, &[tag.clone()], 0);
    output
}

/// Fragments are flattened and whitespace-only text is dropped; indentation replaces it.
fn visible_children(nodes: &[Tag]) -> Vec<Tag> {
    let mut result = Vec::new();
    for node in nodes {
        match &*node.data() {
            NodeData::Fragment => result.extend(visible_children(&node.children_ref())),
            NodeData::Text(text) if text.trim().is_empty() => {}
            _ => result.push(node.clone()),
        }
    }
    result
}

fn write_pretty(writer: &mut impl Write, tag: &Tag, depth: usize) -> fmt::Result {
    let data = tag.data();
    let NodeData::Element { name, attrs, xml } = &*data else {
        return write_leaf(writer, &data);
    };

    write_start_tag(writer, name, attrs)?;
    let children = tag.children_ref();
    if children.is_empty() {
        if *xml {
            return writer.write_str("/>");
        }
        writer.write_char('>')?;
        if is_void_element(name) {
            return Ok(());
        }
        return write!(writer, "</{name}>");
    }
    writer.write_char('>')?;

    if !*xml && is_raw_text_element(name) {
        for child in children.iter() {
            match &*child.data() {
                NodeData::Text(text) => writer.write_str(text)?,
                _ => write_node(writer, child)?,
            }
        }
        return write!(writer, "</{name}>");
    }

    let did_indent = write_many_pretty(writer, &visible_children(&children), depth + 1)?;

    // end tag
    if did_indent {
        writeln!(writer)?;
        for _ in 0..depth {
            write!(writer, "  ")?;
        }
    }
    write!(writer, "</{name}>")
}

/// Returns whether or not the result was indented.
fn write_many_pretty(writer: &mut impl Write, nodes: &[Tag], depth: usize) -> Result<bool, fmt::Error> {
    let nodes = visible_children(nodes);
    let mut did_indent = false;
    let mut encountered_text = false;
    for (index, node) in nodes.iter().enumerate() {
        encountered_text |= node.is_text();
        let indent_this_child = !encountered_text && !is_inline(node);
        if indent_this_child && depth > 0 {
            writeln!(writer)?;
            for _ in 0..depth {
                write!(writer, "  ")?;
            }
            did_indent = true;
        } else if indent_this_child && index > 0 {
            writeln!(writer)?;
        }
        write_pretty(writer, node, depth)?;
    }
    Ok(did_indent)
}

/// Returns `true` for elements that are laid out inline.
fn is_inline(tag: &Tag) -> bool {
    match &*tag.data() {
        NodeData::Element { name, .. } => [
            "a", "abbr", "acronym", "b", "bdo", "big", "br", "button", "cite", "code", "dfn", "em",
            "i", "img", "input", "kbd", "label", "map", "pre", "object", "output", "q", "samp",
            "script", "select", "small", "span", "strong", "sub", "sup", "textarea", "time", "tt",
            "var",
        ]
        .contains(&name.as_str()),
        _ => false,
    }
}
