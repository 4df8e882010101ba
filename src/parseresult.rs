use crate::Error;
use nom::{Err, IResult, Offset};
use nom_language::error::{VerboseError, VerboseErrorKind};
use std::fmt::Write;

/// Parser result, with verbose error.
pub type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Build an [`Error::Parse`] from a nom error.
///
/// `buf` is the complete template source; the error positions are
/// slices of it, so the report can show the right line even when
/// only a part of the template (a single tag) was being parsed.
pub fn parse_error(buf: &str, error: &Err<VerboseError<&str>>) -> Error {
    let mut message = String::new();
    show_errors(&mut message, buf, error, "");
    if message.is_empty() {
        show_error(&mut message, buf, 0, "Invalid template syntax", "");
    }
    Error::Parse { message }
}

/// Build an [`Error::Parse`] for a problem found at `pos` in `buf`.
pub fn parse_error_at(buf: &str, pos: usize, msg: &str) -> Error {
    let mut message = String::new();
    show_error(&mut message, buf, pos, msg, "");
    Error::Parse { message }
}

pub fn show_errors(
    out: &mut impl Write,
    buf: &str,
    error: &Err<VerboseError<&str>>,
    prefix: &str,
) {
    match error {
        Err::Failure(VerboseError { ref errors })
        | Err::Error(VerboseError { ref errors }) => {
            for (rest, err) in errors.iter().rev() {
                if let Some(message) = get_message(err) {
                    show_error(out, buf, position(buf, rest), &message, prefix);
                }
            }
        }
        Err::Incomplete(needed) => {
            let msg = format!("Incomplete: {needed:?}");
            show_error(out, buf, 0, &msg, prefix);
        }
    }
}

fn position(buf: &str, rest: &str) -> usize {
    let start = buf.as_ptr() as usize;
    let at = rest.as_ptr() as usize;
    if at >= start && at <= start + buf.len() {
        buf.offset(rest)
    } else {
        buf.len().saturating_sub(rest.len())
    }
}

fn get_message(err: &VerboseErrorKind) -> Option<String> {
    match err {
        VerboseErrorKind::Context(msg) => Some((*msg).into()),
        VerboseErrorKind::Char(ch) => Some(format!("Expected {ch:?}")),
        VerboseErrorKind::Nom(_err) => None,
    }
}

fn show_error(
    out: &mut impl Write,
    buf: &str,
    pos: usize,
    msg: &str,
    prefix: &str,
) {
    let pos = (0..=pos.min(buf.len()))
        .rev()
        .find(|p| buf.is_char_boundary(*p))
        .unwrap_or(0);
    let line_start = buf[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line = buf[line_start..].lines().next().unwrap_or("");
    let line_no = bytecount::count(&buf.as_bytes()[..line_start], b'\n') + 1;
    let pos_in_line = buf[line_start..pos].chars().count() + 1;
    let _ = writeln!(
        out,
        "{prefix}{line_no:>4}:{line}\n\
         {prefix}     {:>pos_in_line$} {msg}",
        "^",
    );
}
