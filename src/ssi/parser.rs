//! Split a template into text and directives, and pair each `if`
//! with its `elif`, `else` and `endif`.
use super::directives::{Attribute, Body, Directive};
use crate::engine::{Ids, Node};
use crate::parseresult::{parse_error, parse_error_at, PResult};
use crate::Result;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, multispace0, multispace1, satisfy};
use nom::combinator::{cut, map, not, recognize};
use nom::error::context;
use nom::multi::many0;
use nom::sequence::{delimited, preceded, terminated};
use nom::{Offset, Parser};

const START: &str = "<!--#";
const END: &str = "-->";

/// Parse a complete template.
pub fn parse(source: &str) -> Result<Node<Directive>> {
    let mut parser = TreeParser {
        source,
        tokens: lex(source)?.into_iter(),
        ids: Ids::new(),
    };
    let (tree, _) = parser.nodes(&[])?;
    Ok(tree)
}

/// A directive as written, not yet paired with its closing directive.
#[derive(Debug, PartialEq, Eq)]
struct Raw<'a> {
    name: &'a str,
    attributes: Vec<Attribute>,
    at: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Directive(Raw<'a>),
}

/// An xml-like name.  A dash may not start the `-->` ending the
/// directive.
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

fn quoted(input: &str) -> PResult<&str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        delimited(char('`'), take_while(|c: char| c != '`'), char('`')),
    ))
    .parse(input)
}

fn attribute(input: &str) -> PResult<Attribute> {
    map(
        (
            name,
            multispace0,
            char('='),
            multispace0,
            cut(context("Expected quoted value", quoted)),
        ),
        |(name, _, _, _, value)| Attribute {
            name: name.to_string(),
            value: value.to_string(),
        },
    )
    .parse(input)
}

fn directive(input: &str) -> PResult<(&str, Vec<Attribute>)> {
    map(
        preceded(
            (tag(START), multispace0),
            cut((
                context("Expected directive name", name),
                many0(preceded(multispace1, attribute)),
                context("Expected \"-->\"", preceded(multispace0, tag(END))),
            )),
        ),
        |(name, attributes, _)| (name, attributes),
    )
    .parse(input)
}

fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find(START) {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let input = &rest[start..];
        let at = source.offset(input);
        let (after, (name, attributes)) =
            directive(input).map_err(|e| parse_error(source, &e))?;
        tokens.push(Token::Directive(Raw {
            name,
            attributes,
            at,
        }));
        rest = after;
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

impl<'a> TreeParser<'a> {
    /// Parse nodes up to one of the directives named in `ends`, or to
    /// the end of the template.
    fn nodes(&mut self, ends: &[&str]) -> Result<(Node<Directive>, Option<Raw<'a>>)> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            let raw = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Directive(raw) => raw,
            };
            if ends.contains(&raw.name) {
                return Ok((Node::Block(nodes), Some(raw)));
            }
            let directive = match raw.name {
                "config" => Directive::Config(raw.attributes),
                "echo" => Directive::Echo(raw.attributes),
                "exec" => Directive::Exec(raw.attributes),
                "flastmod" => Directive::Flastmod(raw.attributes),
                "fsize" => Directive::Fsize(raw.attributes),
                "if" => self.conditional(raw)?,
                "include" => Directive::Include(raw.attributes),
                "printenv" => Directive::Printenv(raw.attributes),
                "set" => Directive::Set(raw.attributes),
                "elif" | "else" | "endif" => return Err(self.unexpected(&raw)),
                name => {
                    return Err(parse_error_at(
                        self.source,
                        raw.at,
                        &format!("Unknown directive {name:?}"),
                    ))
                }
            };
            nodes.push(Node::Tag(self.ids.next(), directive));
        }
        Ok((Node::Block(nodes), None))
    }

    fn body(&mut self, at: usize, ends: &[&str]) -> Result<(Body, Raw<'a>)> {
        match self.nodes(ends)? {
            (body, Some(end)) => Ok((Box::new(body), end)),
            (_, None) => Err(parse_error_at(
                self.source,
                at,
                "Missing <!--#endif --> for <!--#if -->",
            )),
        }
    }

    fn conditional(&mut self, open: Raw<'a>) -> Result<Directive> {
        let at = open.at;
        let mut branches = Vec::new();
        let mut attributes = open.attributes;
        let mut otherwise = None;
        loop {
            let (body, end) = self.body(at, &["elif", "else", "endif"])?;
            branches.push((attributes, body));
            match end.name {
                "elif" => attributes = end.attributes,
                "else" => {
                    self.no_attributes(&end)?;
                    let (body, endif) = self.body(at, &["endif"])?;
                    self.no_attributes(&endif)?;
                    otherwise = Some(body);
                    break;
                }
                _ => {
                    self.no_attributes(&end)?;
                    break;
                }
            }
        }
        Ok(Directive::If {
            branches,
            otherwise,
        })
    }

    fn no_attributes(&self, raw: &Raw) -> Result<()> {
        match raw.attributes.first() {
            None => Ok(()),
            Some(attribute) => Err(parse_error_at(
                self.source,
                raw.at,
                &format!(
                    "Unexpected attribute {:?} in <!--#{} -->",
                    attribute.name, raw.name,
                ),
            )),
        }
    }

    fn unexpected(&self, raw: &Raw) -> crate::Error {
        parse_error_at(
            self.source,
            raw.at,
            &format!("Unexpected <!--#{} -->", raw.name),
        )
    }
}
