//! Conditions of `if` and `elif`.
//!
//! An operand is a quoted or bare string, true when not empty after
//! variable interpolation.  `!` binds tightest, then the comparisons,
//! then `&&`, then `||`.  Comparing with `/regex/` matches, and a
//! match sets the variables `0` to `9` to the captured groups.
use super::directives::{interpolate, State};
use crate::parseresult::{parse_error, PResult};
use crate::{Context, Result};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map, opt, value, verify};
use nom::multi::many0;
use nom::sequence::{delimited, preceded};
use nom::Parser;
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Text(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(String, Comparison, String),
    Matches {
        text: String,
        pattern: String,
        negated: bool,
    },
}

fn ws(input: &str) -> PResult<&str> {
    multispace0(input)
}

fn quoted(quote: char) -> impl FnMut(&str) -> PResult<&str> {
    move |input| {
        delimited(char(quote), take_while(|c: char| c != quote), char(quote)).parse(input)
    }
}

fn bare(input: &str) -> PResult<&str> {
    verify(
        take_while1(|c: char| !c.is_whitespace() && !"()!=<>&|'\"`".contains(c)),
        |s: &str| !s.starts_with('/'),
    )
    .parse(input)
}

/// A string operand, possibly empty.
fn operand(input: &str) -> PResult<String> {
    map(
        opt(alt((quoted('\''), quoted('"'), quoted('`'), bare))),
        |s: Option<&str>| s.unwrap_or_default().to_string(),
    )
    .parse(input)
}

fn pattern(input: &str) -> PResult<String> {
    map(
        delimited(char('/'), take_while(|c: char| c != '/'), char('/')),
        String::from,
    )
    .parse(input)
}

fn comparison_operator(input: &str) -> PResult<Comparison> {
    alt((
        value(Comparison::Equal, tag("==")),
        value(Comparison::NotEqual, tag("!=")),
        value(Comparison::LessOrEqual, tag("<=")),
        value(Comparison::GreaterOrEqual, tag(">=")),
        value(Comparison::Equal, tag("=")),
        value(Comparison::Less, tag("<")),
        value(Comparison::Greater, tag(">")),
    ))
    .parse(input)
}

enum Tail {
    Matches(String, bool),
    Compare(Comparison, String),
}

fn comparison(input: &str) -> PResult<Expr> {
    let (input, left) = operand(input)?;
    let (input, tail) = opt(alt((
        map(
            (delimited(ws, alt((tag("=="), tag("="))), ws), pattern),
            |(_, p)| Tail::Matches(p, false),
        ),
        map((delimited(ws, tag("!="), ws), pattern), |(_, p)| {
            Tail::Matches(p, true)
        }),
        map(
            (delimited(ws, comparison_operator, ws), operand),
            |(op, right)| Tail::Compare(op, right),
        ),
    )))
    .parse(input)?;
    let expr = match tail {
        None => Expr::Text(left),
        Some(Tail::Matches(pattern, negated)) => Expr::Matches {
            text: left,
            pattern,
            negated,
        },
        Some(Tail::Compare(op, right)) => Expr::Compare(left, op, right),
    };
    Ok((input, expr))
}

fn primary(input: &str) -> PResult<Expr> {
    alt((
        delimited((char('('), ws), expression, (ws, char(')'))),
        comparison,
    ))
    .parse(input)
}

fn unary(input: &str) -> PResult<Expr> {
    alt((
        map(preceded((char('!'), ws), unary), |e| Expr::Not(Box::new(e))),
        primary,
    ))
    .parse(input)
}

fn conjunction(input: &str) -> PResult<Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(preceded((ws, tag("&&"), ws), unary)).parse(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |a, b| Expr::And(Box::new(a), Box::new(b)));
    Ok((input, expr))
}

fn expression(input: &str) -> PResult<Expr> {
    let (input, first) = conjunction(input)?;
    let (input, rest) = many0(preceded((ws, tag("||"), ws), conjunction)).parse(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |a, b| Expr::Or(Box::new(a), Box::new(b)));
    Ok((input, expr))
}

impl Expr {
    pub fn parse(source: &str) -> Result<Expr> {
        let (_, expr) = all_consuming(delimited(ws, expression, ws))
            .parse(source)
            .map_err(|e| parse_error(source, &e))?;
        Ok(expr)
    }

    pub(crate) fn evaluate(&self, context: &mut Context, state: &State) -> Result<bool> {
        Ok(match self {
            Expr::Text(text) => !interpolate(text, context, state)?.is_empty(),
            Expr::Not(expr) => !expr.evaluate(context, state)?,
            Expr::And(a, b) => a.evaluate(context, state)? && b.evaluate(context, state)?,
            Expr::Or(a, b) => a.evaluate(context, state)? || b.evaluate(context, state)?,
            Expr::Compare(left, op, right) => {
                let left = interpolate(left, context, state)?;
                let right = interpolate(right, context, state)?;
                match op {
                    Comparison::Equal => left == right,
                    Comparison::NotEqual => left != right,
                    Comparison::Less => left < right,
                    Comparison::LessOrEqual => left <= right,
                    Comparison::Greater => left > right,
                    Comparison::GreaterOrEqual => left >= right,
                }
            }
            Expr::Matches {
                text,
                pattern,
                negated,
            } => {
                let text = interpolate(text, context, state)?;
                let captures = Regex::new(pattern)?.captures(&text).map(|captures| {
                    captures
                        .iter()
                        .take(10)
                        .map(|group| group.map_or("", |m| m.as_str()).to_string())
                        .collect::<Vec<_>>()
                });
                match captures {
                    Some(groups) => {
                        for (i, group) in groups.into_iter().enumerate() {
                            context.insert(i.to_string(), group);
                        }
                        !negated
                    }
                    None => *negated,
                }
            }
        })
    }
}
