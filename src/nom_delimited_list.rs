use nom::error::ParseError;
use nom::{IResult, Parser};

/// Alternates between two parsers, delimited by two outer parsers, to
/// produce a list of elements.
///
/// Similar to `delimited(pre, separated_list0(sep, item), term)`, but
/// handles errors differently: Since this parser knows what is
/// supposed to terminate the list, it can report errors from the item
/// parser rather than assuming that the list has ended when item
/// parsing fails.
///
/// The list is allowed to be empty, and a trailing separator (before
/// the terminator) is allowed but not required.
///
/// # Arguments
///
/// * `pre` The opening parser.
/// * `item` Parses the elements of the list.
/// * `sep` Parses the separator between list elements.
/// * `term` The list-terminating parser.
///
/// # Example
///
/// ```
/// use nom::bytes::complete::{is_a, tag};
/// use nom::error::{Error, ErrorKind};
/// use nom::Err;
/// use synth::nom_delimited_list::delimited_list;
///
/// let mut parser = delimited_list::<_, Error<&str>, _, _, _, _>(
///     tag("("),
///     is_a("abcde"),
///     tag(","),
///     tag(")"),
/// );
///
/// assert_eq!(parser("(a,b,c)"), Ok(("", vec!["a", "b", "c"])));
/// assert_eq!(parser("(a,b,c,)"), Ok(("", vec!["a", "b", "c"])));
/// assert_eq!(parser("()"), Ok(("", vec![])));
///
/// // This call returns the error from the terminator parser:
/// assert_eq!(parser("(a!)"), Err(Err::Error(Error::new("!)", ErrorKind::Tag))));
/// // This call returns the error from the item parser:
/// assert_eq!(parser("(a,!)"), Err(Err::Error(Error::new("!)", ErrorKind::IsA))));
/// ```
pub fn delimited_list<I, E, P, F, S, T>(
    mut pre: P,
    mut item: F,
    mut sep: S,
    mut term: T,
) -> impl FnMut(I) -> IResult<I, Vec<F::Output>, E>
where
    I: Clone,
    E: ParseError<I>,
    P: Parser<I, Error = E>,
    F: Parser<I, Error = E>,
    S: Parser<I, Error = E>,
    T: Parser<I, Error = E>,
{
    move |input: I| {
        let (mut input, _) = pre.parse(input)?;
        let mut list = Vec::new();
        loop {
            let (i, value) = match item.parse(input.clone()) {
                Ok((i, value)) => (i, value),
                Err(item_error) => match term.parse(input) {
                    Ok((i, _)) => return Ok((i, list)),
                    Err(_) => return Err(item_error),
                },
            };
            list.push(value);
            match sep.parse(i.clone()) {
                Ok((i, _)) => input = i,
                Err(_) => {
                    input = i;
                    break;
                }
            }
        }
        let (input, _) = term.parse(input)?;
        Ok((input, list))
    }
}
