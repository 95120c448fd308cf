mod ast;
mod parser;
pub mod selector;

pub use ast::{
    is_raw_text_element, is_void_element, AstAttribute, AstNode, Markup, RAW_TEXT_ELEMENTS,
    VOID_ELEMENTS,
};
pub use parser::{parse_fragment, parse_html, parse_xml, ParseError};
pub use selector::{Selector, SelectorError};
