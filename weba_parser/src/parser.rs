use crate::ast::{is_raw_text_element, is_void_element, AstAttribute, AstNode, Markup};
use std::fmt;

/// Error type for parsing HTML and XML fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// Character offset into the input
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// An element whose end tag has not been seen yet
struct OpenElement {
    name: String,
    attributes: Vec<AstAttribute>,
    children: Vec<AstNode>,
}

/// Start tags that close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "menu", "nav", "ol", "p", "pre", "section", "table",
    "ul",
];

/// Open elements that hide anything outside them from implied closes.
const SCOPE_BOUNDARIES: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

/// Parser for HTML and XML fragments
pub struct Parser {
    input: Vec<char>,
    pos: usize,
    markup: Markup,
    open: Vec<OpenElement>,
    roots: Vec<AstNode>,
}

impl Parser {
    fn new(input: &str, markup: Markup) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            markup,
            open: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn starts_with_ignore_case(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)))
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn is_html(&self) -> bool {
        self.markup == Markup::Html
    }

    /// Consume input up to and including `terminator`, returning what came before it.
    fn read_until(
        &mut self,
        terminator: &str,
        what: &str,
        start: usize,
    ) -> Result<String, ParseError> {
        let mut value = String::new();
        loop {
            if self.starts_with(terminator) {
                self.pos += terminator.chars().count();
                return Ok(value);
            }
            match self.advance() {
                Some(c) => value.push(c),
                None => {
                    return Err(ParseError {
                        message: format!("Unterminated {what}"),
                        position: start,
                    })
                }
            }
        }
    }

    fn push_node(&mut self, node: AstNode) {
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        // Adjacent text runs are merged into one node
        if let AstNode::Text(text) = &node {
            if let Some(AstNode::Text(previous)) = siblings.last_mut() {
                previous.push_str(text);
                return;
            }
        }
        siblings.push(node);
    }

    fn decode(&self, raw: &str) -> String {
        html_escape::decode_html_entities(raw).into_owned()
    }

    fn normalize_name(&self, name: String) -> String {
        if self.is_html() {
            name.to_ascii_lowercase()
        } else {
            name
        }
    }

    fn parse_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.current() {
            if c.is_whitespace() || c == '/' || c == '>' || c == '=' {
                break;
            }
            name.push(c);
            self.advance();
        }
        name
    }

    fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        match self.current() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos;
                self.advance();
                let mut value = String::new();
                loop {
                    match self.advance() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => {
                            return Err(ParseError {
                                message: format!("Unclosed quote {quote} in attribute value"),
                                position: start,
                            })
                        }
                    }
                }
                Ok(self.decode(&value))
            }
            _ => {
                if !self.is_html() {
                    return Err(self.error("Attribute values must be quoted in XML"));
                }
                let mut value = String::new();
                while let Some(c) = self.current() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    value.push(c);
                    self.advance();
                }
                Ok(self.decode(&value))
            }
        }
    }

    fn parse_start_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.advance(); // consume '<'
        let name = self.parse_name();
        let name = self.normalize_name(name);

        let mut attributes: Vec<AstAttribute> = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            match self.current() {
                None => {
                    return Err(ParseError {
                        message: format!("Unterminated start tag <{name}>"),
                        position: start,
                    })
                }
                Some('>') => {
                    self.advance();
                    break false;
                }
                Some('/') if self.peek(1) == Some('>') => {
                    self.pos += 2;
                    break true;
                }
                Some('/') => {
                    self.advance();
                }
                Some(_) => {
                    let attr_name = self.parse_name();
                    if attr_name.is_empty() {
                        return Err(self.error(format!("Expected attribute name in <{name}>")));
                    }
                    let attr_name = self.normalize_name(attr_name);
                    self.skip_whitespace();
                    let value = if self.current() == Some('=') {
                        self.advance();
                        self.skip_whitespace();
                        Some(self.parse_attribute_value()?)
                    } else if self.is_html() {
                        None
                    } else {
                        return Err(self.error(format!(
                            "Attribute '{attr_name}' has no value, which XML does not allow"
                        )));
                    };
                    // Later duplicates overwrite earlier ones
                    if let Some(existing) = attributes.iter_mut().find(|a| a.name == attr_name) {
                        existing.value = value;
                    } else {
                        attributes.push(AstAttribute {
                            name: attr_name,
                            value,
                        });
                    }
                }
            }
        };

        if self.is_html() {
            self.close_implied(&name);
        }

        let void = self.is_html() && is_void_element(&name);
        if void || self_closing {
            self.push_node(AstNode::Element {
                name,
                attributes,
                children: vec![],
                void,
            });
            return Ok(());
        }

        if self.is_html() && is_raw_text_element(&name) {
            let mut content = String::new();
            let closing = format!("</{name}");
            while self.current().is_some() && !self.starts_with_ignore_case(&closing) {
                content.extend(self.advance());
            }
            if self.current().is_some() {
                let end = self.pos;
                self.pos += closing.chars().count();
                self.read_until(">", "end tag", end)?;
            }
            let children = if content.is_empty() {
                vec![]
            } else {
                vec![AstNode::Text(content)]
            };
            self.push_node(AstNode::Element {
                name,
                attributes,
                children,
                void: false,
            });
            return Ok(());
        }

        self.open.push(OpenElement {
            name,
            attributes,
            children: Vec::new(),
        });
        Ok(())
    }

    /// Close elements whose end tag is implied by a `<name>` start tag: an open
    /// `<li>` before another `<li>`, `<dd>`/`<dt>` before either, and an open
    /// `<p>` before a block-level element.
    fn close_implied(&mut self, name: &str) {
        let list_item = match name {
            "li" => Some((&["li"][..], &["ul", "ol", "menu"][..])),
            "dd" | "dt" => Some((&["dd", "dt"][..], &["dl"][..])),
            _ => None,
        };
        if let Some((targets, boundaries)) = list_item {
            if let Some(depth) = self.open_in_scope(targets, boundaries) {
                self.close_to(depth);
            }
        }
        if CLOSES_PARAGRAPH.contains(&name) {
            if let Some(depth) = self.open_in_scope(&["p"], &[]) {
                self.close_to(depth);
            }
        }
    }

    /// Depth of the innermost open element named in `targets`, unless a scope
    /// boundary or one of `boundaries` is open inside it.
    fn open_in_scope(&self, targets: &[&str], boundaries: &[&str]) -> Option<usize> {
        for (depth, element) in self.open.iter().enumerate().rev() {
            let name = element.name.as_str();
            if targets.contains(&name) {
                return Some(depth);
            }
            if SCOPE_BOUNDARIES.contains(&name) || boundaries.contains(&name) {
                return None;
            }
        }
        None
    }

    /// Close open elements until only `depth` remain.
    fn close_to(&mut self, depth: usize) {
        while self.open.len() > depth {
            self.close_innermost();
        }
    }

    /// Pop the innermost open element and attach it to its parent.
    fn close_innermost(&mut self) {
        if let Some(element) = self.open.pop() {
            self.push_node(AstNode::Element {
                name: element.name,
                attributes: element.attributes,
                children: element.children,
                void: false,
            });
        }
    }

    fn parse_end_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 2; // consume '</'
        let name = self.parse_name();
        let name = self.normalize_name(name);
        self.read_until(">", "end tag", start)?;

        let Some(depth) = self.open.iter().rposition(|e| e.name == name) else {
            if self.is_html() {
                // Stray end tags are ignored
                return Ok(());
            }
            return Err(ParseError {
                message: format!("Unexpected closing tag </{name}>"),
                position: start,
            });
        };

        if !self.is_html() && depth + 1 != self.open.len() {
            return Err(ParseError {
                message: format!(
                    "Mismatched closing tag: expected </{}>, found </{name}>",
                    self.open.last().map(|e| e.name.as_str()).unwrap_or_default()
                ),
                position: start,
            });
        }

        self.close_to(depth);
        Ok(())
    }

    fn parse_declaration(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        if self.starts_with("<!--") {
            self.pos += 4;
            let comment = self.read_until("-->", "comment", start)?;
            self.push_node(AstNode::Comment(comment));
        } else if self.starts_with("<![CDATA[") {
            self.pos += 9;
            let text = self.read_until("]]>", "CDATA section", start)?;
            self.push_node(AstNode::Text(text));
        } else if self.starts_with_ignore_case("<!DOCTYPE") {
            self.pos += 9;
            let body = self.read_until(">", "doctype", start)?;
            self.push_node(AstNode::Doctype(body.trim().to_string()));
        } else {
            // Any other `<!...>` is a bogus comment
            self.pos += 2;
            let body = self.read_until(">", "declaration", start)?;
            self.push_node(AstNode::Comment(body));
        }
        Ok(())
    }

    fn parse_text(&mut self) {
        let mut text = String::new();
        // A '<' that does not open markup is literal text
        if self.current() == Some('<') {
            text.push('<');
            self.advance();
        }
        while let Some(c) = self.current() {
            if c == '<' {
                break;
            }
            text.push(c);
            self.advance();
        }
        let text = self.decode(&text);
        self.push_node(AstNode::Text(text));
    }

    fn opens_element(&self) -> bool {
        match self.peek(1) {
            Some(c) if c.is_ascii_alphabetic() => true,
            Some('_' | ':') => !self.is_html(),
            _ => false,
        }
    }

    fn parse_nodes(mut self) -> Result<Vec<AstNode>, ParseError> {
        while self.current().is_some() {
            if self.starts_with("<!") {
                self.parse_declaration()?;
            } else if self.starts_with("<?") {
                let start = self.pos;
                self.pos += 2;
                let body = self.read_until("?>", "processing instruction", start)?;
                self.push_node(AstNode::ProcessingInstruction(body));
            } else if self.starts_with("</")
                && self.peek(2).is_some_and(|c| !c.is_whitespace() && c != '>')
            {
                self.parse_end_tag()?;
            } else if self.current() == Some('<') && self.opens_element() {
                self.parse_start_tag()?;
            } else {
                self.parse_text();
            }
        }

        if !self.is_html() {
            if let Some(element) = self.open.last() {
                return Err(self.error(format!(
                    "Unclosed tag: expected closing tag for '{}'",
                    element.name
                )));
            }
        }
        while !self.open.is_empty() {
            self.close_innermost();
        }

        Ok(self.roots)
    }
}

/// Parse a fragment into its top-level nodes using the rules for `markup`.
pub fn parse_fragment(input: &str, markup: Markup) -> Result<Vec<AstNode>, ParseError> {
    Parser::new(input, markup).parse_nodes()
}

/// Parse an HTML fragment into its top-level nodes.
pub fn parse_html(input: &str) -> Result<Vec<AstNode>, ParseError> {
    parse_fragment(input, Markup::Html)
}

/// Parse an XML fragment into its top-level nodes.
pub fn parse_xml(input: &str) -> Result<Vec<AstNode>, ParseError> {
    parse_fragment(input, Markup::Xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(html: &str) -> AstNode {
        let mut nodes = parse_html(html).unwrap();
        assert_eq!(nodes.len(), 1, "expected a single root in {html:?}");
        nodes.remove(0)
    }

    #[test]
    fn test_parse_simple_element() {
        let result = single(r#"<div class="container">Hello</div>"#);

        match result {
            AstNode::Element {
                name,
                attributes,
                children,
                ..
            } => {
                assert_eq!(name, "div");
                assert_eq!(attributes[0].name, "class");
                assert_eq!(attributes[0].value.as_deref(), Some("container"));
                assert_eq!(children, vec![AstNode::Text("Hello".to_string())]);
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_void_element() {
        let result = single(r#"<input type="text">"#);

        match result {
            AstNode::Element {
                name,
                void,
                attributes,
                children,
            } => {
                assert_eq!(name, "input");
                assert!(void);
                assert_eq!(attributes.len(), 1);
                assert!(children.is_empty());
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_single_quoted_and_unquoted_values() {
        let result = single("<button class='btn' data-id=7 disabled>Go</button>");

        match result {
            AstNode::Element { attributes, .. } => {
                assert_eq!(
                    attributes,
                    vec![
                        AstAttribute {
                            name: "class".to_string(),
                            value: Some("btn".to_string())
                        },
                        AstAttribute {
                            name: "data-id".to_string(),
                            value: Some("7".to_string())
                        },
                        AstAttribute {
                            name: "disabled".to_string(),
                            value: None
                        },
                    ]
                );
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_comment_then_sibling() {
        let result = single("<div><!-- #button --><button>Example</button></div>");

        match result {
            AstNode::Element { children, .. } => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], AstNode::Comment(" #button ".to_string()));
                assert_eq!(children[1].element_name(), Some("button"));
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_parse_multiple_roots_keeps_whitespace() {
        let nodes = parse_html("\n<li>One</li>\n<li>Two</li>\n").unwrap();
        assert_eq!(nodes.len(), 5);
        assert!(nodes[0].is_blank_text());
        assert_eq!(nodes[1].element_name(), Some("li"));
        assert_eq!(nodes[3].element_name(), Some("li"));
    }

    #[test]
    fn test_parse_doctype_and_document() {
        let nodes = parse_html("<!DOCTYPE html><html><body><p>Hi</p></body></html>").unwrap();
        assert_eq!(nodes[0], AstNode::Doctype("html".to_string()));
        assert_eq!(nodes[1].element_name(), Some("html"));
    }

    #[test]
    fn test_names_are_lowercased_in_html() {
        let result = single(r#"<DIV Data-X="1"></DIV>"#);
        match result {
            AstNode::Element {
                name, attributes, ..
            } => {
                assert_eq!(name, "div");
                assert_eq!(attributes[0].name, "data-x");
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_entities_are_decoded() {
        let result = single(r#"<p title="a &amp; b">1 &lt; 2</p>"#);
        match result {
            AstNode::Element {
                attributes,
                children,
                ..
            } => {
                assert_eq!(attributes[0].value.as_deref(), Some("a & b"));
                assert_eq!(children, vec![AstNode::Text("1 < 2".to_string())]);
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_script_content_is_raw() {
        let result = single("<script>if (a < b && c) { run(); }</script>");
        match result {
            AstNode::Element { children, .. } => {
                assert_eq!(
                    children,
                    vec![AstNode::Text("if (a < b && c) { run(); }".to_string())]
                );
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_unclosed_elements_are_closed_at_end() {
        let result = single("<div><span>one<b>two");
        match result {
            AstNode::Element { children, .. } => {
                assert_eq!(children.len(), 1);
                match &children[0] {
                    AstNode::Element { children, .. } => assert_eq!(children.len(), 2),
                    _ => panic!("Expected nested span"),
                }
            }
            _ => panic!("Expected element"),
        }
    }

    fn child_names(node: &AstNode) -> Vec<&str> {
        match node {
            AstNode::Element { children, .. } => children
                .iter()
                .filter_map(|child| match child {
                    AstNode::Element { name, .. } => Some(name.as_str()),
                    _ => None,
                })
                .collect(),
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_list_items_close_open_siblings() {
        let result = single("<ul><li>one<li>two<li>three</ul>");
        assert_eq!(child_names(&result), vec!["li", "li", "li"]);

        let nested = single("<ul><li>one<ul><li>inner</ul><li>two</ul>");
        assert_eq!(child_names(&nested), vec!["li", "li"]);

        let terms = single("<dl><dt>term<dd>one<dd>two</dl>");
        assert_eq!(child_names(&terms), vec!["dt", "dd", "dd"]);
    }

    #[test]
    fn test_block_elements_close_open_paragraphs() {
        let result = single("<div><p>one<p>two<div>block</div></div>");
        assert_eq!(child_names(&result), vec!["p", "p", "div"]);

        let inline = single("<div><p>one <span>two</span></p></div>");
        assert_eq!(child_names(&inline), vec!["p"]);

        let button = single("<p><button><p>inside</button></p>");
        assert_eq!(child_names(&button), vec!["button"]);
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let result = single("<div>text</span></div>");
        match result {
            AstNode::Element { children, .. } => {
                assert_eq!(children, vec![AstNode::Text("text".to_string())]);
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_literal_less_than_is_text() {
        let nodes = parse_html("a < b").unwrap();
        assert_eq!(nodes, vec![AstNode::Text("a < b".to_string())]);
    }

    #[test]
    fn test_unterminated_comment_error() {
        let result = parse_html("<div><!-- never closed</div>");
        let err = result.unwrap_err();
        assert!(err.message.contains("Unterminated comment"));
        assert_eq!(err.position, 5);
    }

    #[test]
    fn test_unclosed_quote_error() {
        let err = parse_html(r#"<div class="oops></div>"#).unwrap_err();
        assert!(err.message.contains("Unclosed quote"));
    }

    #[test]
    fn test_unterminated_start_tag_error() {
        let err = parse_html("<div class=x").unwrap_err();
        assert!(err.message.contains("Unterminated start tag"));
    }

    #[test]
    fn test_xml_preserves_case_and_empty_elements() {
        let nodes = parse_xml(r#"<?xml version="1.0"?><Feed><Item id="1"/></Feed>"#).unwrap();
        assert_eq!(
            nodes[0],
            AstNode::ProcessingInstruction(r#"xml version="1.0""#.to_string())
        );
        match &nodes[1] {
            AstNode::Element { name, children, .. } => {
                assert_eq!(name, "Feed");
                assert_eq!(children[0].element_name(), Some("Item"));
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn test_xml_mismatched_closing_tag_error() {
        let err = parse_xml("<a><b></a></b>").unwrap_err();
        assert!(err.message.contains("Mismatched closing tag"));
    }

    #[test]
    fn test_xml_unclosed_tag_error() {
        let err = parse_xml("<a><b></b>").unwrap_err();
        assert!(err.message.contains("Unclosed tag"));
    }

    #[test]
    fn test_xml_cdata_is_text() {
        let nodes = parse_xml("<a><![CDATA[<not markup>]]></a>").unwrap();
        match &nodes[0] {
            AstNode::Element { children, .. } => {
                assert_eq!(children, &vec![AstNode::Text("<not markup>".to_string())]);
            }
            _ => panic!("Expected element"),
        }
    }
}
