//! Split a template into text and markup.
//!
//! The contents of `{% verbatim %}` and `{% comment %}` blocks are
//! never lexed as markup.
use crate::parseresult::{parse_error, parse_error_at, PResult};
use crate::Result;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_until};
use nom::character::complete::one_of;
use nom::combinator::{cut, map, not, recognize};
use nom::error::context;
use nom::multi::many1;
use nom::sequence::{delimited, terminated};
use nom::{Offset, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    /// The inside of `{{ }}`, trimmed.
    Variable(&'a str),
    /// The inside of `{% %}`, trimmed.
    Tag(&'a str),
    Comment,
    /// The raw contents of a verbatim block.
    Verbatim(&'a str),
}

/// A token and its byte offset in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub token: Token<'a>,
    pub at: usize,
}

fn text(input: &str) -> PResult<&str> {
    recognize(many1(alt((
        is_not("{"),
        terminated(tag("{"), not(one_of("{%#"))),
    ))))
    .parse(input)
}

fn markup(input: &str) -> PResult<Token> {
    alt((
        map(
            delimited(
                tag("{{"),
                cut(context("Expected \"}}\"", take_until("}}"))),
                tag("}}"),
            ),
            |inner: &str| Token::Variable(inner.trim()),
        ),
        map(
            delimited(
                tag("{%"),
                cut(context("Expected \"%}\"", take_until("%}"))),
                tag("%}"),
            ),
            |inner: &str| Token::Tag(inner.trim()),
        ),
        map(
            delimited(
                tag("{#"),
                cut(context("Expected \"#}\"", take_until("#}"))),
                tag("#}"),
            ),
            |_| Token::Comment,
        ),
    ))
    .parse(input)
}

/// The first word of a tag, its name.
pub fn tag_name(inner: &str) -> &str {
    inner.split_whitespace().next().unwrap_or("")
}

pub fn lex(source: &str) -> Result<Vec<Lexeme>> {
    let mut lexemes = Vec::new();
    let mut input = source;
    while !input.is_empty() {
        let at = source.offset(input);
        let (rest, token) = match text(input) {
            Ok((rest, t)) => (rest, Token::Text(t)),
            Err(_) => markup(input).map_err(|e| parse_error(source, &e))?,
        };
        input = rest;
        if let Token::Tag(inner) = token {
            let name = tag_name(inner);
            if name == "verbatim" || name == "comment" {
                let (content, rest) = raw_block(source, input, name, at)?;
                input = rest;
                let token = match name {
                    "verbatim" => Token::Verbatim(content),
                    _ => Token::Comment,
                };
                lexemes.push(Lexeme { token, at });
                continue;
            }
        }
        lexemes.push(Lexeme { token, at });
    }
    Ok(lexemes)
}

/// Split `input` at the tag ending the raw block `name`.
fn raw_block<'a>(
    source: &str,
    input: &'a str,
    name: &str,
    at: usize,
) -> Result<(&'a str, &'a str)> {
    let end = format!("end{name}");
    let mut from = 0;
    while let Some(open) = input[from..].find("{%").map(|i| i + from) {
        let Some(close) = input[open..].find("%}").map(|i| i + open) else {
            break;
        };
        if tag_name(input[open + 2..close].trim()) == end {
            return Ok((&input[..open], &input[close + 2..]));
        }
        from = close + 2;
    }
    Err(parse_error_at(source, at, &format!("Missing {{% {end} %}}")))
}
