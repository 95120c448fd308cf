//! A CSS selector subset, matched against any tree that implements [`Element`].
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute selectors
//! (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`, with an optional `i` flag), the
//! structural pseudo-classes `:first-child`, `:last-child`, `:only-child`,
//! `:nth-child()`, `:nth-last-child()`, `:empty` and `:not()`, the four
//! combinators and comma-separated lists.

use std::fmt;
use std::str::FromStr;

/// The view of an element tree that selector matching needs.
pub trait Element: Clone {
    /// The element's tag name.
    fn local_name(&self) -> String;
    /// The value of attribute `name`. Valueless attributes yield an empty string.
    fn attribute(&self, name: &str) -> Option<String>;
    /// Closest ancestor element.
    fn parent_element(&self) -> Option<Self>;
    /// Closest preceding sibling element.
    fn prev_sibling_element(&self) -> Option<Self>;
    /// Closest following sibling element.
    fn next_sibling_element(&self) -> Option<Self>;
    /// `true` if the element has no element children and no text.
    fn has_no_content(&self) -> bool;

    /// Whether the whitespace-separated `class` attribute contains `class`.
    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }
}

/// Error produced for a selector that cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid selector at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        test: Option<(AttrOp, String, bool)>,
    },
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild { a: i32, b: i32, from_end: bool },
    Empty,
    Not(Selector),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    /// `None` is the universal selector.
    tag: Option<String>,
    simple: Vec<Simple>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list such as `div.card > a[href^="https"], #main`.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = SelectorParser {
            input: input.chars().collect(),
            pos: 0,
        };
        let selector = parser.parse_list(false)?;
        if parser.current().is_some() {
            return Err(parser.error("Unexpected character"));
        }
        Ok(selector)
    }

    /// Whether `element` matches any selector in the list.
    pub fn matches<E: Element>(&self, element: &E) -> bool {
        self.alternatives
            .iter()
            .any(|complex| matches_complex(complex, complex.compounds.len() - 1, element))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

fn matches_complex<E: Element>(complex: &Complex, index: usize, element: &E) -> bool {
    if !matches_compound(&complex.compounds[index], element) {
        return false;
    }
    if index == 0 {
        return true;
    }
    let previous = index - 1;
    match complex.combinators[previous] {
        Combinator::Descendant => {
            let mut ancestor = element.parent_element();
            while let Some(candidate) = ancestor {
                if matches_complex(complex, previous, &candidate) {
                    return true;
                }
                ancestor = candidate.parent_element();
            }
            false
        }
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| matches_complex(complex, previous, &parent)),
        Combinator::NextSibling => element
            .prev_sibling_element()
            .is_some_and(|sibling| matches_complex(complex, previous, &sibling)),
        Combinator::SubsequentSibling => {
            let mut sibling = element.prev_sibling_element();
            while let Some(candidate) = sibling {
                if matches_complex(complex, previous, &candidate) {
                    return true;
                }
                sibling = candidate.prev_sibling_element();
            }
            false
        }
    }
}

fn matches_compound<E: Element>(compound: &Compound, element: &E) -> bool {
    if let Some(tag) = &compound.tag {
        if !element.local_name().eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    compound
        .simple
        .iter()
        .all(|simple| matches_simple(simple, element))
}

fn matches_simple<E: Element>(simple: &Simple, element: &E) -> bool {
    match simple {
        Simple::Id(id) => element.attribute("id").is_some_and(|value| &value == id),
        Simple::Class(class) => element.has_class(class),
        Simple::Attribute { name, test } => {
            let Some(value) = element.attribute(name) else {
                return false;
            };
            let Some((op, expected, ignore_case)) = test else {
                return true;
            };
            let (value, expected) = if *ignore_case {
                (value.to_lowercase(), expected.to_lowercase())
            } else {
                (value, expected.clone())
            };
            match op {
                AttrOp::Equals => value == expected,
                AttrOp::Includes => value.split_whitespace().any(|word| word == expected),
                AttrOp::DashMatch => {
                    value == expected || value.starts_with(&format!("{expected}-"))
                }
                AttrOp::Prefix => !expected.is_empty() && value.starts_with(&expected),
                AttrOp::Suffix => !expected.is_empty() && value.ends_with(&expected),
                AttrOp::Substring => !expected.is_empty() && value.contains(&expected),
            }
        }
        Simple::FirstChild => element.prev_sibling_element().is_none(),
        Simple::LastChild => element.next_sibling_element().is_none(),
        Simple::OnlyChild => {
            element.prev_sibling_element().is_none() && element.next_sibling_element().is_none()
        }
        Simple::NthChild { a, b, from_end } => {
            let mut position = 1;
            let step = |e: &E| {
                if *from_end {
                    e.next_sibling_element()
                } else {
                    e.prev_sibling_element()
                }
            };
            let mut sibling = step(element);
            while let Some(candidate) = sibling {
                position += 1;
                sibling = step(&candidate);
            }
            nth_matches(*a, *b, position)
        }
        Simple::Empty => element.has_no_content(),
        Simple::Not(selector) => !selector.matches(element),
    }
}

/// Whether 1-based `position` is `a*n + b` for some `n >= 0`.
fn nth_matches(a: i32, b: i32, position: i32) -> bool {
    if a == 0 {
        return position == b;
    }
    let offset = position - b;
    offset % a == 0 && offset / a >= 0
}

/// Parse the argument of `:nth-child()`.
fn parse_nth(argument: &str) -> Option<(i32, i32)> {
    let compact: String = argument
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        "" => return None,
        _ => {}
    }
    match compact.find('n') {
        Some(n) => {
            let a = match &compact[..n] {
                "" | "+" => 1,
                "-" => -1,
                coefficient => coefficient.parse().ok()?,
            };
            let rest = &compact[n + 1..];
            let b = if rest.is_empty() {
                0
            } else if rest.starts_with(['+', '-']) {
                rest.parse().ok()?
            } else {
                return None;
            };
            Some((a, b))
        }
        None => Some((0, compact.parse().ok()?)),
    }
}

struct SelectorParser {
    input: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Returns `true` if any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.current().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn error(&self, message: impl Into<String>) -> SelectorError {
        SelectorError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        match self.current() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.error(format!("Expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("Expected '{expected}', found end of selector"))),
        }
    }

    fn is_ident_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.current() {
            if !Self::is_ident_char(c) {
                break;
            }
            self.advance();
            if c == '\\' {
                match self.advance() {
                    Some(escaped) => ident.push(escaped),
                    None => return Err(self.error("Dangling escape")),
                }
            } else {
                ident.push(c);
            }
        }
        if ident.is_empty() {
            return Err(self.error("Expected identifier"));
        }
        Ok(ident)
    }

    fn parse_list(&mut self, nested: bool) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.current() {
                Some(',') => {
                    self.advance();
                }
                Some(')') if nested => break,
                None => break,
                Some(c) => return Err(self.error(format!("Unexpected '{c}'"))),
            }
        }
        Ok(Selector { alternatives })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.current() {
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                None | Some(',') | Some(')') => break,
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("Unexpected '{c}'"))),
            };
            if combinator != Combinator::Descendant {
                self.advance();
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let tag = match self.current() {
            Some('*') => {
                self.advance();
                None
            }
            Some(c) if Self::is_ident_char(c) => Some(self.parse_ident()?),
            _ => None,
        };

        let mut simple = Vec::new();
        loop {
            match self.current() {
                Some('#') => {
                    self.advance();
                    simple.push(Simple::Id(self.parse_ident()?));
                }
                Some('.') => {
                    self.advance();
                    simple.push(Simple::Class(self.parse_ident()?));
                }
                Some('[') => simple.push(self.parse_attribute()?),
                Some(':') => simple.push(self.parse_pseudo()?),
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.error("Expected selector"));
        }
        Ok(Compound { tag, simple })
    }

    fn parse_attribute(&mut self) -> Result<Simple, SelectorError> {
        self.expect('[')?;
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.current() {
            Some(']') => {
                self.advance();
                return Ok(Simple::Attribute { name, test: None });
            }
            Some('=') => {
                self.advance();
                AttrOp::Equals
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.advance();
                self.expect('=')?;
                match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            Some(c) => return Err(self.error(format!("Unexpected '{c}' in attribute selector"))),
            None => return Err(self.error("Unterminated attribute selector")),
        };

        self.skip_whitespace();
        let value = match self.current() {
            Some(quote @ ('"' | '\'')) => {
                self.advance();
                let mut value = String::new();
                loop {
                    match self.advance() {
                        Some(c) if c == quote => break,
                        Some('\\') => value.extend(self.advance()),
                        Some(c) => value.push(c),
                        None => return Err(self.error("Unterminated string in selector")),
                    }
                }
                value
            }
            _ => self.parse_ident()?,
        };

        self.skip_whitespace();
        let ignore_case = matches!(self.current(), Some('i' | 'I'));
        if ignore_case {
            self.advance();
            self.skip_whitespace();
        }
        self.expect(']')?;
        Ok(Simple::Attribute {
            name,
            test: Some((op, value, ignore_case)),
        })
    }

    fn parse_pseudo(&mut self) -> Result<Simple, SelectorError> {
        self.expect(':')?;
        let start = self.pos;
        let name = self.parse_ident()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "first-child" => Simple::FirstChild,
            "last-child" => Simple::LastChild,
            "only-child" => Simple::OnlyChild,
            "empty" => Simple::Empty,
            "nth-child" | "nth-last-child" => {
                self.expect('(')?;
                let argument_start = self.pos;
                let mut argument = String::new();
                while let Some(c) = self.current() {
                    if c == ')' {
                        break;
                    }
                    argument.push(c);
                    self.advance();
                }
                self.expect(')')?;
                let (a, b) = parse_nth(&argument).ok_or_else(|| SelectorError {
                    message: format!("Invalid :{name}() argument '{}'", argument.trim()),
                    position: argument_start,
                })?;
                Simple::NthChild {
                    a,
                    b,
                    from_end: name == "nth-last-child",
                }
            }
            "not" => {
                self.expect('(')?;
                let inner = self.parse_list(true)?;
                self.expect(')')?;
                Simple::Not(inner)
            }
            _ => {
                return Err(SelectorError {
                    message: format!("Unsupported pseudo-class ':{name}'"),
                    position: start,
                })
            }
        };
        Ok(pseudo)
    }
}
