/// Which set of parsing and serialization rules applies to a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Markup {
    /// Lenient HTML: lower-cased names, void elements, raw-text `script`/`style`.
    #[default]
    Html,
    /// Well-formed XML: case preserved, `<x/>` empty elements, balanced tags required.
    Xml,
}

impl Markup {
    /// The conventional parser name for this markup, as used in configuration.
    pub fn parser_name(self) -> &'static str {
        match self {
            Markup::Html => "html",
            Markup::Xml => "xml",
        }
    }
}

/// Represents an attribute in the AST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstAttribute {
    pub name: String,
    /// `None` for valueless attributes such as `disabled`
    pub value: Option<String>,
}

/// Represents a node in a parsed fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// An element with tag name, attributes, and children
    Element {
        name: String,
        attributes: Vec<AstAttribute>,
        children: Vec<AstNode>,
        void: bool,
    },
    /// Text content, with entities already decoded
    Text(String),
    /// The inside of `<!-- ... -->`, untrimmed
    Comment(String),
    /// The body of `<!DOCTYPE ...>`, e.g. `html`
    Doctype(String),
    /// The inside of `<? ... ?>`
    ProcessingInstruction(String),
}

impl AstNode {
    /// Get the element name if this is an element node
    pub fn element_name(&self) -> Option<&str> {
        match self {
            AstNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns `true` for text nodes that contain only whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, AstNode::Text(text) if text.trim().is_empty())
    }
}

/// HTML elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// HTML elements whose content is raw text: not parsed as markup, not escaped on output.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Returns `true` if `name` is an HTML void element.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Returns `true` if `name` is an HTML raw-text element.
pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}
