//! Build a node tree from the lexed template, parsing the head of each
//! tag and pairing it with its end tag.
use super::expression::{argument, filter, identifier, keyword, pipeline, string};
use super::lexer::{lex, tag_name, Lexeme, Token};
use super::tags::{Body, Tag};
use crate::engine::{Ids, Node};
use crate::parseresult::{parse_error, parse_error_at, PResult};
use crate::{Error, Result};
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{alpha1, char, multispace0, multispace1};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::multi::{many0, many1, separated_list1};
use nom::sequence::{pair, preceded, separated_pair, terminated};
use nom::Parser;
use nom_language::error::VerboseError;

/// Parse a complete template.
pub fn parse(source: &str) -> Result<Node<Tag>> {
    let mut parser = TreeParser {
        source,
        lexemes: lex(source)?,
        pos: 0,
        ids: Ids::new(),
    };
    let (tree, _) = parser.nodes(&[])?;
    Ok(tree)
}

/// A bare word, anything up to whitespace.
fn word(input: &str) -> PResult<&str> {
    take_while1(|c: char| !c.is_whitespace()).parse(input)
}

fn name(input: &str) -> PResult<&str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

fn is_closing(name: &str) -> bool {
    name.starts_with("end") || matches!(name, "elif" | "else" | "empty")
}

/// The tag that ended a body.
struct End<'a> {
    name: &'a str,
    inner: &'a str,
    at: usize,
}

impl<'a> End<'a> {
    fn args(&self) -> &'a str {
        &self.inner[self.name.len()..]
    }
}

struct TreeParser<'a> {
    source: &'a str,
    lexemes: Vec<Lexeme<'a>>,
    pos: usize,
    ids: Ids,
}

impl<'a> TreeParser<'a> {
    /// Parse nodes up to one of the tags named in `ends`, or to the
    /// end of the template.
    fn nodes(&mut self, ends: &[&str]) -> Result<(Node<Tag>, Option<End<'a>>)> {
        let mut nodes = Vec::new();
        while let Some(Lexeme { token, at }) = self.lexemes.get(self.pos).copied() {
            self.pos += 1;
            let tag = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Comment => Tag::Comment,
                Token::Verbatim(text) => Tag::Verbatim(text.to_string()),
                Token::Variable(inner) => Tag::Variable(self.head(inner, pipeline)?),
                Token::Tag(inner) => {
                    let name = tag_name(inner);
                    if ends.contains(&name) {
                        return Ok((Node::Block(nodes), Some(End { name, inner, at })));
                    }
                    self.tag(name, inner, at)?
                }
            };
            nodes.push(Node::Tag(self.ids.next(), tag));
        }
        Ok((Node::Block(nodes), None))
    }

    /// Parse the body of the tag `open` at `at`, which must be closed
    /// by one of `ends`.  The last of `ends` is the proper closing tag.
    fn body(&mut self, open: &str, at: usize, ends: &[&str]) -> Result<(Body, End<'a>)> {
        match self.nodes(ends)? {
            (body, Some(end)) => Ok((Box::new(body), end)),
            (_, None) => Err(parse_error_at(
                self.source,
                at,
                &format!(
                    "Missing {{% {} %}} for {{% {open} %}}",
                    ends.last().copied().unwrap_or("end"),
                ),
            )),
        }
    }

    /// The `else` part of a tag, if `end` is an else.
    fn otherwise(&mut self, open: &str, at: usize, end: &End, close: &str) -> Result<Option<Body>> {
        if end.name == "else" {
            Ok(Some(self.body(open, at, &[close])?.0))
        } else {
            Ok(None)
        }
    }

    /// Run `parser` on all of `input`, a part of the template source.
    fn head<O>(
        &self,
        input: &'a str,
        parser: impl Parser<&'a str, Output = O, Error = VerboseError<&'a str>>,
    ) -> Result<O> {
        all_consuming(terminated(parser, multispace0))
            .parse(input)
            .map(|(_, out)| out)
            .map_err(|e| parse_error(self.source, &e))
    }

    fn tag(&mut self, name: &'a str, inner: &'a str, at: usize) -> Result<Tag> {
        let args = &inner[name.len()..];
        Ok(match name {
            "autoescape" => {
                let on = match self.head(args, preceded(multispace1, alpha1))? {
                    "on" => true,
                    "off" => false,
                    other => return Err(Error::InvalidEscape(other.to_string())),
                };
                Tag::Autoescape(on, self.body(name, at, &["endautoescape"])?.0)
            }
            "block" => {
                let block = self.head(args, preceded(multispace1, self::name))?;
                let (body, end) = self.body(name, at, &["endblock"])?;
                let closing = end.args().trim();
                if !closing.is_empty() && closing != block {
                    return Err(parse_error_at(
                        self.source,
                        end.at,
                        &format!("Expected {{% endblock %}} or {{% endblock {block} %}}"),
                    ));
                }
                Tag::Block(block.to_string(), body)
            }
            "csrf_token" => {
                self.head(args, multispace0)?;
                Tag::CsrfToken
            }
            "cycle" => {
                let (values, named) = self.head(
                    args,
                    pair(
                        many1(preceded(multispace1, pipeline)),
                        opt(preceded(
                            (multispace1, keyword("as"), multispace1),
                            pair(identifier, opt((multispace1, keyword("silent")))),
                        )),
                    ),
                )?;
                let (name, silent) = match named {
                    Some((name, silent)) => (Some(name.to_string()), silent.is_some()),
                    None => (None, false),
                };
                Tag::Cycle {
                    values,
                    name,
                    silent,
                }
            }
            "debug" => {
                self.head(args, multispace0)?;
                Tag::Debug
            }
            "extends" => {
                let parent = self.head(args, preceded(multispace1, pipeline))?;
                let (body, _) = self.nodes(&[])?;
                Tag::Extends(parent, Box::new(body))
            }
            "filter" => {
                let chain = self.head(
                    args,
                    preceded(
                        multispace1,
                        separated_list1((multispace0, char('|'), multispace0), filter),
                    ),
                )?;
                Tag::Filter(chain, self.body(name, at, &["endfilter"])?.0)
            }
            "firstof" => Tag::Firstof(self.head(args, many1(preceded(multispace1, pipeline)))?),
            "for" => {
                let (names, sequence, reversed) = self.head(
                    args,
                    (
                        preceded(
                            multispace1,
                            separated_list1((multispace0, char(','), multispace0), identifier),
                        ),
                        preceded((multispace1, keyword("in"), multispace1), pipeline),
                        opt((multispace1, keyword("reversed"))),
                    ),
                )?;
                let (body, end) = self.body(name, at, &["empty", "endfor"])?;
                let empty = if end.name == "empty" {
                    Some(self.body(name, at, &["endfor"])?.0)
                } else {
                    None
                };
                Tag::For {
                    names: names.into_iter().map(String::from).collect(),
                    sequence,
                    reversed: reversed.is_some(),
                    body,
                    empty,
                }
            }
            "if" => {
                let mut condition = self.head(args, preceded(multispace1, pipeline))?;
                let mut branches = Vec::new();
                let mut otherwise = None;
                loop {
                    let (body, end) = self.body(name, at, &["elif", "else", "endif"])?;
                    branches.push((condition, body));
                    match end.name {
                        "elif" => {
                            condition = self.head(end.args(), preceded(multispace1, pipeline))?;
                        }
                        "else" => {
                            otherwise = Some(self.body(name, at, &["endif"])?.0);
                            break;
                        }
                        _ => break,
                    }
                }
                Tag::If {
                    branches,
                    otherwise,
                }
            }
            "ifchanged" => {
                let values = self.head(args, many0(preceded(multispace1, pipeline)))?;
                let (body, end) = self.body(name, at, &["else", "endifchanged"])?;
                let otherwise = self.otherwise(name, at, &end, "endifchanged")?;
                Tag::Ifchanged {
                    values,
                    body,
                    otherwise,
                }
            }
            "ifequal" | "ifnotequal" => {
                let (left, right) = self.head(
                    args,
                    pair(
                        preceded(multispace1, pipeline),
                        preceded(multispace1, pipeline),
                    ),
                )?;
                let close = if name == "ifequal" {
                    "endifequal"
                } else {
                    "endifnotequal"
                };
                let (body, end) = self.body(name, at, &["else", close])?;
                let otherwise = self.otherwise(name, at, &end, close)?;
                Tag::Ifequal {
                    expected: name == "ifequal",
                    left,
                    right,
                    body,
                    otherwise,
                }
            }
            "include" => {
                let (path, arguments, only) = self.head(
                    args,
                    (
                        preceded(multispace1, pipeline),
                        opt(preceded(
                            (multispace1, keyword("with")),
                            many1(preceded(multispace1, argument)),
                        )),
                        opt((multispace1, keyword("only"))),
                    ),
                )?;
                let arguments = arguments.unwrap_or_default();
                if let Some(arg) = arguments.iter().find(|arg| arg.name.is_none()) {
                    return Err(parse_error_at(
                        self.source,
                        at,
                        &format!("Expected name=value, found {:?}", arg.value.source),
                    ));
                }
                Tag::Include {
                    path,
                    arguments,
                    only: only.is_some(),
                }
            }
            "load" => {
                let words = self.head(args, many1(preceded(multispace1, word)))?;
                let owned = |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
                match words.as_slice() {
                    [names @ .., "from", library] if !names.is_empty() => Tag::Load {
                        libraries: vec![library.to_string()],
                        names: Some(owned(names)),
                    },
                    _ => Tag::Load {
                        libraries: owned(&words),
                        names: None,
                    },
                }
            }
            "now" => Tag::Now(self.head(args, preceded(multispace1, pipeline))?),
            "regroup" => {
                let (sequence, trail, name) = self.head(
                    args,
                    (
                        preceded(multispace1, pipeline),
                        preceded(
                            (multispace1, keyword("by"), multispace1),
                            recognize(separated_list1(char('.'), self::name)),
                        ),
                        preceded((multispace1, keyword("as"), multispace1), identifier),
                    ),
                )?;
                Tag::Regroup {
                    sequence,
                    trail: trail.to_string(),
                    name: name.to_string(),
                }
            }
            "spaceless" => {
                self.head(args, multispace0)?;
                Tag::Spaceless(self.body(name, at, &["endspaceless"])?.0)
            }
            "ssi" => {
                let (path, parsed) = self.head(
                    args,
                    pair(
                        preceded(multispace1, alt((string, word))),
                        opt((multispace1, keyword("parsed"))),
                    ),
                )?;
                Tag::Ssi {
                    path: path.to_string(),
                    parsed: parsed.is_some(),
                }
            }
            "templatetag" => {
                Tag::Templatetag(self.head(args, preceded(multispace1, word))?.to_string())
            }
            "url" => {
                let (view, arguments, name) = self.head(
                    args,
                    (
                        preceded(multispace1, pipeline),
                        many0(preceded(multispace1, argument)),
                        opt(preceded((multispace1, keyword("as"), multispace1), identifier)),
                    ),
                )?;
                Tag::Url {
                    view,
                    arguments,
                    name: name.map(String::from),
                }
            }
            "widthratio" => {
                let (value, limit, width) = self.head(
                    args,
                    (
                        preceded(multispace1, pipeline),
                        preceded(multispace1, pipeline),
                        preceded(multispace1, pipeline),
                    ),
                )?;
                Tag::Widthratio(value, limit, width)
            }
            "with" => {
                let bindings = self.head(
                    args,
                    preceded(
                        multispace1,
                        alt((
                            map(
                                (pipeline, multispace1, keyword("as"), multispace1, identifier),
                                |(value, _, _, _, name)| vec![(name.to_string(), value)],
                            ),
                            separated_list1(
                                multispace1,
                                map(separated_pair(identifier, char('='), pipeline), |(name, value)| {
                                    (name.to_string(), value)
                                }),
                            ),
                        )),
                    ),
                )?;
                Tag::With(bindings, self.body(name, at, &["endwith"])?.0)
            }
            "" => return Err(parse_error_at(self.source, at, "Expected a tag name")),
            _ if is_closing(name) => {
                return Err(parse_error_at(
                    self.source,
                    at,
                    &format!("Unexpected {{% {name} %}}"),
                ))
            }
            _ => Tag::Library {
                name: name.to_string(),
                arguments: self.head(args, many0(preceded(multispace1, argument)))?,
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tags(source: &str) -> Vec<Tag> {
        match parse(source).unwrap() {
            Node::Block(nodes) => nodes
                .into_iter()
                .filter_map(|node| match node {
                    Node::Tag(_, tag) => Some(tag),
                    _ => None,
                })
                .collect(),
            _ => panic!("expected a block"),
        }
    }

    fn parse_message(source: &str) -> String {
        match parse(source) {
            Err(Error::Parse { message }) => message,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn text_and_variables() {
        let tree = parse("a{{ b|upper }}c").unwrap();
        assert_eq!(tree.count(), 4);
    }

    #[test]
    fn nested_bodies() {
        let tree = parse("{% for x in xs %}{% if x %}{{ x }}{% else %}-{% endif %}{% endfor %}")
            .unwrap();
        // block, for, body, if, body, variable, else body, text
        assert_eq!(tree.count(), 8);
    }

    #[test]
    fn for_heads() {
        let parsed = tags("{% for k, v in pairs reversed %}{% empty %}none{% endfor %}");
        let [Tag::For {
            names, reversed, empty, ..
        }] = &parsed[..]
        else {
            panic!("expected a for tag");
        };
        assert_eq!(names, &["k", "v"]);
        assert!(*reversed);
        assert!(empty.is_some());
    }

    #[test]
    fn cycle_heads() {
        let parsed = tags("{% cycle 'a' b|upper as row silent %}");
        let [Tag::Cycle {
            values,
            name,
            silent,
        }] = &parsed[..]
        else {
            panic!("expected a cycle tag");
        };
        assert_eq!(values.len(), 2);
        assert_eq!(name.as_deref(), Some("row"));
        assert!(*silent);
    }

    #[test]
    fn load_from() {
        let parsed = tags("{% load x y from lib %}");
        let [Tag::Load { libraries, names }] = &parsed[..] else {
            panic!("expected a load tag");
        };
        assert_eq!(libraries, &["lib"]);
        assert_eq!(names.as_deref(), Some(&["x".to_string(), "y".to_string()][..]));
    }

    #[test]
    fn unknown_tags_are_library_tags() {
        let parsed = tags("{% xyz 42 a=b %}");
        let [Tag::Library { name, arguments }] = &parsed[..] else {
            panic!("expected a library tag");
        };
        assert_eq!(name, "xyz");
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[1].name.as_deref(), Some("a"));
    }

    #[test]
    fn with_forms() {
        let parsed = tags("{% with 'x' as y %}{% endwith %}{% with a=1 b=c %}{% endwith %}");
        let [Tag::With(a, _), Tag::With(b, _)] = &parsed[..] else {
            panic!("expected two with tags");
        };
        assert_eq!(a.len(), 1);
        assert_eq!(b.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn mismatched_endblock() {
        let message = parse_message("{% block a %}x{% endblock b %}");
        assert!(message.contains("endblock a"), "{message}");
        assert!(parse("{% block a %}x{% endblock a %}").is_ok());
    }

    #[test]
    fn missing_end() {
        let message = parse_message("x\n{% if y %}z");
        assert!(message.contains("Missing {% endif %}"), "{message}");
        assert!(message.contains("2:"), "{message}");
    }

    #[test]
    fn unexpected_end() {
        let message = parse_message("{% endfor %}");
        assert!(message.contains("Unexpected {% endfor %}"), "{message}");
    }

    #[test]
    fn bad_heads() {
        assert!(matches!(
            parse("{% autoescape maybe %}{% endautoescape %}"),
            Err(Error::InvalidEscape(_)),
        ));
        parse_message("{% for in x %}{% endfor %}");
        parse_message("{% include 'x' with 1 %}");
        parse_message("{{ }}");
    }
}
