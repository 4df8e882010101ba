//! Expressions inside `{{ }}` and tags: literals, attribute chains,
//! operators and filter pipelines.
//!
//! Operators have no precedence: `a and b or c` is evaluated strictly
//! left to right, each operator applied to the value so far and the
//! next operand.
use super::library::{Arguments, FilterFn};
use super::{filters, Options};
use crate::error::Recover;
use crate::nom_delimited_list::delimited_list;
use crate::parseresult::PResult;
use crate::{Context, Error, Result, Value};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, digit1, multispace0, one_of, satisfy};
use nom::combinator::{all_consuming, consumed, map, not, opt, recognize, value};
use nom::error::{context, ErrorKind, ParseError};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::Parser;
use std::collections::BTreeMap;

/// Words that can not name a variable.
const RESERVED: &[&str] = &[
    "and", "as", "by", "False", "from", "in", "None", "not", "only", "or",
    "parsed", "reversed", "silent", "True", "with",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    True,
    False,
    /// A number, with its source spelling as token.
    Number(Value),
    Text(String),
    List(Vec<Expression>),
    Variable(String),
    /// `block.super`, the parent's content of the enclosing block.
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// `.name` (or `.0`).
    Attribute(String),
    /// `[expression]`.
    Index(Expression),
}

/// A literal followed by attribute and subscript accesses.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub literal: Literal,
    pub accesses: Vec<Access>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Chain(Chain),
    Not(Box<Expression>),
    Binary(Box<Expression>, Vec<(Operator, Expression)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub argument: Option<Chain>,
}

/// An expression followed by filters, `value|f1:arg|f2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub expression: Expression,
    pub filters: Vec<Filter>,
    /// The source text of the whole pipeline.
    pub source: String,
}

/// A tag argument, positional or `name=value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Pipeline,
}

// Parsers

fn ws(input: &str) -> PResult<&str> {
    multispace0(input)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn raw_identifier(input: &str) -> PResult<&str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_word_char),
    ))
    .parse(input)
}

/// A name that is not one of the reserved words.
pub fn identifier(input: &str) -> PResult<&str> {
    let (rest, name) = raw_identifier(input)?;
    if RESERVED.contains(&name) {
        Err(nom::Err::Error(ParseError::from_error_kind(input, ErrorKind::Verify)))
    } else {
        Ok((rest, name))
    }
}

/// The reserved `word`, not followed by more word characters.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| terminated(tag(word), not(satisfy(is_word_char))).parse(input)
}

fn number(input: &str) -> PResult<Literal> {
    let (rest, text) = recognize((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;
    let parsed = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().map(Value::from).ok()
    } else {
        text.parse::<i64>().map(Value::from).ok()
    };
    match parsed {
        Some(v) => Ok((rest, Literal::Number(v.with_token(text)))),
        None => Err(nom::Err::Error(ParseError::from_error_kind(input, ErrorKind::Digit))),
    }
}

/// A single or double quoted string, without escapes.
pub fn string(input: &str) -> PResult<&str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))
    .parse(input)
}

fn list(input: &str) -> PResult<Literal> {
    map(
        delimited_list(
            terminated(char('['), ws),
            expression,
            (ws, char(','), ws),
            preceded(ws, char(']')),
        ),
        Literal::List,
    )
    .parse(input)
}

fn literal(input: &str) -> PResult<Literal> {
    context(
        "Expected a value",
        alt((
            value(Literal::None, keyword("None")),
            value(Literal::True, keyword("True")),
            value(Literal::False, keyword("False")),
            number,
            map(string, |s| Literal::Text(s.to_string())),
            list,
            map(identifier, |name| Literal::Variable(name.to_string())),
        )),
    )
    .parse(input)
}

fn access(input: &str) -> PResult<Access> {
    alt((
        preceded(
            char('.'),
            map(alt((raw_identifier, digit1)), |name| {
                Access::Attribute(name.to_string())
            }),
        ),
        map(
            delimited((char('['), ws), expression, (ws, char(']'))),
            Access::Index,
        ),
    ))
    .parse(input)
}

pub fn chain(input: &str) -> PResult<Chain> {
    let (rest, (literal, mut accesses)) = (literal, many0(access)).parse(input)?;
    let literal = match (&literal, accesses.first()) {
        (Literal::Variable(name), Some(Access::Attribute(attr)))
            if name == "block" && attr == "super" =>
        {
            accesses.remove(0);
            Literal::Super
        }
        _ => literal,
    };
    Ok((rest, Chain { literal, accesses }))
}

fn operator(input: &str) -> PResult<Operator> {
    alt((
        value(Operator::Eq, tag("==")),
        value(Operator::Ne, tag("!=")),
        value(Operator::Le, tag("<=")),
        value(Operator::Ge, tag(">=")),
        value(Operator::Lt, tag("<")),
        value(Operator::Gt, tag(">")),
        value(Operator::And, keyword("and")),
        value(Operator::Or, keyword("or")),
        value(Operator::NotIn, (keyword("not"), ws, keyword("in"))),
        value(Operator::In, keyword("in")),
    ))
    .parse(input)
}

fn negated(expression: Expression) -> Expression {
    Expression::Not(Box::new(expression))
}

fn operand(input: &str) -> PResult<Expression> {
    alt((
        map(preceded((keyword("not"), ws), operand), negated),
        delimited((char('('), ws), expression, (ws, char(')'))),
        map(chain, Expression::Chain),
    ))
    .parse(input)
}

fn binary(input: &str) -> PResult<Expression> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(delimited(ws, operator, ws), operand)).parse(input)?;
    let expression = if rest.is_empty() {
        first
    } else {
        Expression::Binary(Box::new(first), rest)
    };
    Ok((input, expression))
}

pub fn expression(input: &str) -> PResult<Expression> {
    alt((
        map(preceded((keyword("not"), ws), expression), negated),
        binary,
    ))
    .parse(input)
}

pub fn filter(input: &str) -> PResult<Filter> {
    map(
        pair(
            context("Expected filter name", identifier),
            opt(preceded(char(':'), chain)),
        ),
        |(name, argument)| Filter {
            name: name.to_string(),
            argument,
        },
    )
    .parse(input)
}

pub fn pipeline(input: &str) -> PResult<Pipeline> {
    map(
        consumed(pair(
            expression,
            many0(preceded((ws, char('|'), ws), filter)),
        )),
        |(source, (expression, filters))| Pipeline {
            expression,
            filters,
            source: source.to_string(),
        },
    )
    .parse(input)
}

pub fn argument(input: &str) -> PResult<Argument> {
    map(
        pair(
            opt(terminated(identifier, (char('='), not(char('='))))),
            pipeline,
        ),
        |(name, value)| Argument {
            name: name.map(str::to_string),
            value,
        },
    )
    .parse(input)
}

// Evaluation

/// What an expression can see while it is evaluated.
pub struct Env<'a> {
    pub context: &'a Context,
    pub options: &'a Options,
    /// Whether output is currently being autoescaped.
    pub autoescape: bool,
    pub(crate) filters: &'a BTreeMap<String, FilterFn>,
    /// The innermost block being rendered, for `block.super`.
    pub(crate) block: Option<&'a str>,
}

impl Env<'_> {
    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.context
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }
}

impl Literal {
    pub fn evaluate(&self, env: &Env) -> Result<Value> {
        Ok(match self {
            Literal::None => Value::unit().with_token("None"),
            Literal::True => Value::from(true).with_token("True"),
            Literal::False => Value::from(false).with_token("False"),
            Literal::Number(n) => n.clone(),
            Literal::Text(s) => Value::from(s.as_str()).with_token(s.as_str()),
            Literal::List(items) => Value::sequence(
                items
                    .iter()
                    .map(|item| item.evaluate(env))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Literal::Variable(name) => env.lookup(name)?,
            Literal::Super => match env.block {
                Some(block) => env
                    .lookup(&format!("{block}_super"))
                    .map_err(|_| Error::MissingVariable("block.super".into()))?,
                None => {
                    return Err(Error::Logic(
                        "block.super used outside of a block".into(),
                    ))
                }
            },
        })
    }
}

impl Chain {
    pub fn evaluate(&self, env: &Env) -> Result<Value> {
        let mut value = self.literal.evaluate(env)?;
        for access in &self.accesses {
            value = match access {
                Access::Attribute(name) => {
                    value.must_get_attribute(&Value::from(name.as_str()))?
                }
                Access::Index(key) => value.must_get_attribute(&key.evaluate(env)?)?,
            };
        }
        Ok(value)
    }
}

impl Expression {
    pub fn evaluate(&self, env: &Env) -> Result<Value> {
        match self {
            Expression::Chain(chain) => chain.evaluate(env),
            Expression::Not(inner) => Ok(Value::from(!inner.evaluate(env)?.to_boolean()?)),
            Expression::Binary(first, rest) => {
                let mut acc = first.evaluate(env)?;
                for (op, operand) in rest {
                    let rhs = || operand.evaluate(env);
                    acc = match op {
                        Operator::And if acc.to_boolean()? => rhs()?,
                        Operator::Or if !acc.to_boolean()? => rhs()?,
                        Operator::And | Operator::Or => acc,
                        Operator::Eq => Value::from(acc.equal(&rhs()?)),
                        Operator::Ne => Value::from(!acc.equal(&rhs()?)),
                        Operator::Lt => Value::from(acc.less(&rhs()?)),
                        Operator::Le => {
                            let rhs = rhs()?;
                            Value::from(acc.less(&rhs) || acc.equal(&rhs))
                        }
                        Operator::Gt => Value::from(rhs()?.less(&acc)),
                        Operator::Ge => {
                            let rhs = rhs()?;
                            Value::from(rhs.less(&acc) || acc.equal(&rhs))
                        }
                        Operator::In => Value::from(rhs()?.contains(&acc)?),
                        Operator::NotIn => Value::from(!rhs()?.contains(&acc)?),
                    };
                }
                Ok(acc)
            }
        }
    }
}

impl Pipeline {
    pub fn evaluate(&self, env: &Env) -> Result<Value> {
        let mut value = self.expression.evaluate(env)?;
        for filter in &self.filters {
            let args = match &filter.argument {
                Some(arg) => vec![arg.evaluate(env)?],
                None => Vec::new(),
            };
            value = filters::apply(env, &filter.name, value, &args)?;
        }
        Ok(value)
    }

    /// Evaluate, falling back to the default value if a variable or
    /// attribute is missing.
    pub fn resolve(&self, env: &Env) -> Result<Value> {
        Ok(self
            .evaluate(env)
            .recover()?
            .unwrap_or_else(|| env.options.default_value.clone()))
    }
}

/// Resolve all `args` into positional and keyword values.
pub fn evaluate_arguments(env: &Env, args: &[Argument]) -> Result<Arguments> {
    let mut result = Arguments::default();
    for arg in args {
        let value = arg.value.resolve(env)?;
        match &arg.name {
            Some(name) => {
                if result.keyword.insert(name.clone(), value).is_some() {
                    return Err(Error::DuplicateAttribute(name.clone()));
                }
            }
            None => result.positional.push(value),
        }
    }
    Ok(result)
}

/// Split a single argument like `"y,ies"` into several values.
///
/// Each piece is evaluated as a chain if it parses as one and names
/// something that exists, and is kept as literal text otherwise.  An
/// empty piece is none.
pub fn split_argument(env: &Env, value: &Value, delimiter: char) -> Result<Vec<Value>> {
    let source = match value.token() {
        Some(token) => token.to_string(),
        None => value.to_text()?,
    };
    source
        .split(delimiter)
        .map(|piece| {
            if piece.is_empty() {
                return Ok(Value::unit());
            }
            match all_consuming(chain).parse(piece) {
                Ok((_, chain)) => match chain.evaluate(env) {
                    Err(e) if e.is_lookup() => Ok(Value::from(piece).with_token(piece)),
                    other => other,
                },
                Err(_) => Ok(Value::from(piece).with_token(piece)),
            }
        })
        .collect()
}
