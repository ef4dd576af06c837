//! The CSS subset the in-memory document understands.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute selectors with
//! `=`, `*=`, `^=`, `$=`, `~=`, `|=`, descendant and child combinators, and selector lists.
//! Anything else is rejected the way `querySelectorAll` rejects it.

#[derive(Clone, Debug, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
    Word(String),
    DashPrefix(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

/// One complex selector, stored right-to-left: `parts[0]` is the subject.
#[derive(Clone, Debug, PartialEq)]
struct Complex {
    parts: Vec<(Compound, Option<Combinator>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectorList(Vec<Complex>);

/// What the matcher needs from a tree.
pub trait SelectorTree {
    fn tag(&self, node: usize) -> &str;
    fn attr(&self, node: usize, name: &str) -> Option<&str>;
    fn parent(&self, node: usize) -> Option<usize>;
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
        };
        let mut list = Vec::new();
        loop {
            list.push(parser.complex()?);
            parser.skip_ws();
            match parser.peek() {
                Some(',') => {
                    parser.pos += 1;
                }
                None => break,
                Some(c) => return Err(format!("unexpected '{c}' in selector '{input}'")),
            }
        }
        Ok(Self(list))
    }

    pub fn matches<T: SelectorTree + ?Sized>(&self, tree: &T, node: usize) -> bool {
        self.0.iter().any(|complex| complex.matches(tree, node, 0))
    }
}

impl Complex {
    fn matches<T: SelectorTree + ?Sized>(&self, tree: &T, node: usize, idx: usize) -> bool {
        let (compound, combinator) = &self.parts[idx];
        if !compound.matches(tree, node) {
            return false;
        }
        let Some(combinator) = combinator else {
            return true;
        };
        match combinator {
            Combinator::Child => tree
                .parent(node)
                .map(|parent| self.matches(tree, parent, idx + 1))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut cursor = tree.parent(node);
                while let Some(ancestor) = cursor {
                    if self.matches(tree, ancestor, idx + 1) {
                        return true;
                    }
                    cursor = tree.parent(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<T: SelectorTree + ?Sized>(&self, tree: &T, node: usize) -> bool {
        if let Some(tag) = &self.tag {
            if !tree.tag(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if tree.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class = tree.attr(node, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|wanted| class.split_whitespace().any(|c| c == wanted))
            {
                return false;
            }
        }
        self.attrs.iter().all(|(name, op)| {
            let Some(actual) = tree.attr(node, name) else {
                return false;
            };
            match op {
                AttrOp::Exists => true,
                AttrOp::Equals(v) => actual == v,
                AttrOp::Contains(v) => !v.is_empty() && actual.contains(v.as_str()),
                AttrOp::Prefix(v) => !v.is_empty() && actual.starts_with(v.as_str()),
                AttrOp::Suffix(v) => !v.is_empty() && actual.ends_with(v.as_str()),
                AttrOp::Word(v) => actual.split_whitespace().any(|w| w == v),
                AttrOp::DashPrefix(v) => actual == v || actual.starts_with(&format!("{v}-")),
            }
        })
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn complex(&mut self) -> Result<Complex, String> {
        self.skip_ws();
        let mut forward: Vec<(Combinator, Compound)> = Vec::new();
        let first = self.compound()?;
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(format!("unexpected '{c}'")),
            };
            forward.push((combinator, self.compound()?));
        }

        // Subject first; each part carries the combinator linking it to the part on its left.
        let mut parts: Vec<(Compound, Option<Combinator>)> = forward
            .into_iter()
            .rev()
            .map(|(combinator, compound)| (compound, Some(combinator)))
            .collect();
        parts.push((first, None));
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        let mut any = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                any = true;
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => return Err("pseudo-classes are not supported".to_string()),
                _ => break,
            }
            any = true;
        }

        if any {
            Ok(compound)
        } else {
            Err(match self.peek() {
                Some(c) => format!("expected selector, found '{c}'"),
                None => "empty selector".to_string(),
            })
        }
    }

    fn attribute(&mut self) -> Result<(String, AttrOp), String> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok((name, AttrOp::Exists));
            }
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(c @ ('*' | '^' | '$' | '~' | '|')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(format!("expected '=' after '{c}'"));
                }
                self.pos += 1;
                c
            }
            _ => return Err("malformed attribute selector".to_string()),
        };
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => self.quoted(q)?,
            Some(_) => self.ident()?,
            None => return Err("unterminated attribute selector".to_string()),
        };
        self.skip_ws();
        if self.peek() != Some(']') {
            return Err("expected ']'".to_string());
        }
        self.pos += 1;

        let op = match op {
            '=' => AttrOp::Equals(value),
            '*' => AttrOp::Contains(value),
            '^' => AttrOp::Prefix(value),
            '$' => AttrOp::Suffix(value),
            '~' => AttrOp::Word(value),
            _ => AttrOp::DashPrefix(value),
        };
        Ok((name, op))
    }

    fn quoted(&mut self, quote: char) -> Result<String, String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        out.push(c);
                        self.pos += 1;
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.pos += 1;
                }
            } else if c.is_alphanumeric() || c == '-' || c == '_' {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            Err("expected identifier".to_string())
        } else {
            Ok(out)
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-'
}
