//! Find the tags in a template, written `<TMPL_NAME ...>` or
//! `<!-- TMPL_NAME ... -->`, and pair them with their closing tags.
//!
//! Everything that does not start like a tag is text.  Tag and
//! attribute names are case-insensitive.
use super::tags::{Body, Escape, Tag};
use crate::engine::{Ids, Node};
use crate::parseresult::{parse_error, parse_error_at, PResult};
use crate::{Error, Result};
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{alpha1, char, multispace0, multispace1, satisfy};
use nom::combinator::{cut, map, not, opt, recognize, value};
use nom::error::context;
use nom::multi::{many0, many1};
use nom::sequence::{delimited, preceded, terminated};
use nom::{Offset, Parser};
use std::fmt;

/// Parse a complete template.
pub fn parse(source: &str) -> Result<Node<Tag>> {
    let mut parser = TreeParser {
        source,
        tokens: lex(source)?.into_iter(),
        ids: Ids::new(),
    };
    let (tree, _) = parser.nodes(&[])?;
    Ok(tree)
}

/// An attribute, `KEY=value` or just a value.
#[derive(Debug, PartialEq, Eq)]
struct Attribute {
    key: Option<String>,
    value: String,
}

/// A tag as written.
#[derive(Debug, PartialEq, Eq)]
struct Raw {
    closing: bool,
    name: String,
    attributes: Vec<Attribute>,
    at: usize,
}

impl Raw {
    /// True if this is `end`, where a closing tag is written `/NAME`.
    fn is(&self, end: &str) -> bool {
        match end.strip_prefix('/') {
            Some(name) => self.closing && self.name == name,
            None => !self.closing && self.name == end,
        }
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        let slash = if self.closing { "/" } else { "" };
        write!(out, "<{slash}TMPL_{}>", self.name)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Tag(Raw),
}

fn name(input: &str) -> PResult<&str> {
    recognize((
        satisfy(|c| c.is_alphabetic() || c == '_' || c == ':'),
        many0(alt((
            take_while1(|c: char| c.is_alphanumeric() || "_:.".contains(c)),
            terminated(tag("-"), not(tag("->"))),
        ))),
    ))
    .parse(input)
}

/// An unquoted attribute value, like a name but may start with a digit.
fn plain(input: &str) -> PResult<&str> {
    recognize(many1(alt((
        take_while1(|c: char| c.is_alphanumeric() || "_:.".contains(c)),
        terminated(tag("-"), not(tag("->"))),
    ))))
    .parse(input)
}

fn quoted(input: &str) -> PResult<&str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))
    .parse(input)
}

fn attribute(input: &str) -> PResult<Attribute> {
    alt((
        map(
            (
                name,
                multispace0,
                char('='),
                multispace0,
                cut(context("Expected attribute value", alt((quoted, plain)))),
            ),
            |(key, _, _, _, value)| Attribute {
                key: Some(key.to_ascii_uppercase()),
                value: value.to_string(),
            },
        ),
        map(alt((quoted, plain)), |value: &str| Attribute {
            key: None,
            value: value.to_string(),
        }),
    ))
    .parse(input)
}

/// The start of a tag, up to and including `TMPL_`.  Gives the
/// closing delimiter, and if this is a closing tag.
fn opening(input: &str) -> PResult<(&'static str, bool)> {
    let (input, end) = alt((value("-->", tag("<!--")), value(">", tag("<")))).parse(input)?;
    let (input, (_, slash, _, _)) =
        (multispace0, opt(char('/')), multispace0, tag_no_case("TMPL_")).parse(input)?;
    Ok((input, (end, slash.is_some())))
}

fn markup(input: &str) -> PResult<(bool, &str, Vec<Attribute>)> {
    let (input, (end, closing)) = opening(input)?;
    let (input, (name, attributes, _)) = cut((
        context("Expected tag name", alpha1),
        many0(preceded(multispace1, attribute)),
        context(
            "Expected end of tag",
            (multispace0, opt(char('/')), multispace0, tag(end)),
        ),
    ))
    .parse(input)?;
    Ok((input, (closing, name, attributes)))
}

fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut from = 0;
    while let Some(i) = rest[from..].find('<') {
        let start = from + i;
        let input = &rest[start..];
        match markup(input) {
            Ok((after, (closing, name, attributes))) => {
                if start > 0 {
                    tokens.push(Token::Text(&rest[..start]));
                }
                tokens.push(Token::Tag(Raw {
                    closing,
                    name: name.to_ascii_uppercase(),
                    attributes,
                    at: source.offset(input),
                }));
                rest = after;
                from = 0;
            }
            Err(nom::Err::Error(_)) => from = start + 1,
            Err(e) => return Err(parse_error(source, &e)),
        }
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

struct TreeParser<'a> {
    source: &'a str,
    tokens: std::vec::IntoIter<Token<'a>>,
    ids: Ids,
}

impl TreeParser<'_> {
    /// Parse nodes up to one of the tags in `ends`, or to the end of
    /// the template.
    fn nodes(&mut self, ends: &[&str]) -> Result<(Node<Tag>, Option<Raw>)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            let raw = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Tag(raw) => raw,
            };
            if ends.iter().any(|end| raw.is(end)) {
                return Ok((Node::Block(nodes), Some(raw)));
            }
            if raw.closing {
                return Err(self.error(&raw, &format!("Unexpected {raw}")));
            }
            let tag = match raw.name.as_str() {
                "COMMENT" => {
                    self.body(&raw, &["/COMMENT"])?;
                    Tag::Comment
                }
                "IF" | "UNLESS" => self.conditional(&raw)?,
                "INCLUDE" => Tag::Include(self.name_attribute(&raw)?),
                "LOOP" => Tag::Loop {
                    name: self.name_attribute(&raw)?,
                    body: self.body(&raw, &["/LOOP"])?.0,
                },
                "VAR" => self.var(&raw)?,
                "ELSE" => return Err(self.error(&raw, &format!("Unexpected {raw}"))),
                _ => return Err(self.error(&raw, &format!("Unknown tag {raw}"))),
            };
            nodes.push(Node::Tag(self.ids.next(), tag));
        }
        Ok((Node::Block(nodes), None))
    }

    fn body(&mut self, open: &Raw, ends: &[&str]) -> Result<(Body, Raw)> {
        match self.nodes(ends)? {
            (body, Some(end)) => {
                if let Some(attribute) = end.attributes.first() {
                    let message = format!("Unexpected attribute {:?} in {end}", attribute.value);
                    return Err(self.error(&end, &message));
                }
                Ok((Box::new(body), end))
            }
            (_, None) => Err(self.error(
                open,
                &format!("Missing </TMPL_{}> for {open}", open.name),
            )),
        }
    }

    fn conditional(&mut self, open: &Raw) -> Result<Tag> {
        let name = self.name_attribute(open)?;
        let close = if open.name == "IF" { "/IF" } else { "/UNLESS" };
        let (body, end) = self.body(open, &["ELSE", close])?;
        let otherwise = if end.is("ELSE") {
            Some(self.body(open, &[close])?.0)
        } else {
            None
        };
        Ok(if open.name == "IF" {
            Tag::If {
                name,
                body,
                otherwise,
            }
        } else {
            Tag::Unless {
                name,
                body,
                otherwise,
            }
        })
    }

    /// The optional single `NAME` attribute of most tags.
    fn name_attribute(&self, raw: &Raw) -> Result<Option<String>> {
        match raw.attributes.as_slice() {
            [] => Ok(None),
            [Attribute { key, value }] if matches!(key.as_deref(), None | Some("NAME")) => {
                Ok(Some(value.clone()))
            }
            [_, ..] => Err(self.error(raw, &format!("Expected only a NAME in {raw}"))),
        }
    }

    fn var(&self, raw: &Raw) -> Result<Tag> {
        let (mut name, mut default, mut escape) = (None, None, None);
        for Attribute { key, value } in &raw.attributes {
            let (slot, label) = match key.as_deref() {
                None | Some("NAME") => (&mut name, "NAME"),
                Some("DEFAULT") => (&mut default, "DEFAULT"),
                Some("ESCAPE") => (&mut escape, "ESCAPE"),
                Some(other) => {
                    return Err(self.error(raw, &format!("Unknown attribute {other} in {raw}")))
                }
            };
            if slot.replace(value.as_str()).is_some() {
                return Err(self.error(raw, &format!("Duplicate {label} in {raw}")));
            }
        }
        Ok(Tag::Var {
            name: name.map(String::from),
            default: default.map(String::from),
            escape: escape.map_or(Ok(Escape::None), Escape::parse)?,
        })
    }

    fn error(&self, raw: &Raw, message: &str) -> Error {
        parse_error_at(self.source, raw.at, message)
    }
}
