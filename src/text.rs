//! Text helpers shared by all dialects: html escaping, url encoding,
//! quoting and human readable sizes.
use std::fmt::Write as _;
use std::io::{self, Write};

/// A writer that html-escapes everything written through it.
///
/// The five characters `< > & " '` are replaced by
/// `&lt; &gt; &amp; &quot; &apos;`; everything else passes through.
///
/// ```
/// use std::io::Write;
/// use synth::text::EscapingWriter;
/// let mut buf = Vec::new();
/// write!(EscapingWriter(&mut buf), "a < b & 'c'").unwrap();
/// assert_eq!(buf, b"a &lt; b &amp; &apos;c&apos;");
/// ```
pub struct EscapingWriter<'a>(pub &'a mut dyn Write);

impl Write for EscapingWriter<'_> {
    #[inline]
    // `write` need not consume everything; `write_all` calls again
    // with whatever is left.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = data.iter().take_while(|&&c| !needs_escape(c)).count();
        if n > 0 {
            self.0.write(&data[0..n])
        } else {
            Self::write_one_byte_escaped(&mut self.0, data)
        }
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl EscapingWriter<'_> {
    #[inline(never)]
    fn write_one_byte_escaped(
        out: &mut impl Write,
        data: &[u8],
    ) -> io::Result<usize> {
        out.write_all(match data.first() {
            Some(b'"') => b"&quot;",
            Some(b'&') => b"&amp;",
            Some(b'<') => b"&lt;",
            Some(b'>') => b"&gt;",
            Some(b'\'') => b"&apos;",
            Some(_) => return out.write(&data[..1]),
            None => return Ok(0),
        })?;
        Ok(1)
    }
}

#[inline]
fn needs_escape(c: u8) -> bool {
    matches!(c, b'"' | b'&' | b'\'' | b'<' | b'>')
}

/// Html-escape `s` into a new string.
pub fn escape_html(s: &str) -> String {
    if !s.bytes().any(needs_escape) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn percent_encode(s: &str, allowed: impl Fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if allowed(b) {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

/// Percent-encode everything but alphanumerics and `_ - . /`.
pub fn uri_encode(s: &str) -> String {
    percent_encode(s, |b| {
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/')
    })
}

/// Like [`uri_encode`], but keep the characters that are meaningful
/// in an iri.
pub fn iri_encode(s: &str) -> String {
    percent_encode(s, |b| {
        b.is_ascii_alphanumeric() || b"/#%[]=:;$&()+,!?".contains(&b)
    })
}

/// Replace control characters with `\xNN` escapes.
pub fn escape_controls(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if u32::from(c) < 32 {
            let _ = write!(out, "\\x{:02X}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

/// Surround `s` with `quotation`, backslash-escaping embedded quotes.
pub fn quote(s: &str, quotation: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quotation);
    for c in s.chars() {
        if c == quotation {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quotation);
    out
}

/// Strip one pair of matching quotes (`"`, `'` or backquote) from `s`.
///
/// Strings that are not quoted are returned unchanged.
pub fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(a @ (b'"' | b'\'' | b'`')), Some(b)) if s.len() >= 2 && a == b => {
            &s[1..s.len() - 1]
        }
        _ => s,
    }
}

/// Format a byte count with a binary unit, e.g. `117.7 MB`.
pub fn abbreviate_size(size: u64) -> String {
    const UNITS: [(i32, &str); 6] = [
        (60, "EB"),
        (50, "PB"),
        (40, "TB"),
        (30, "GB"),
        (20, "MB"),
        (10, "KB"),
    ];
    let size = size as f64;
    let (bucket, unit) = UNITS
        .iter()
        .map(|&(exp, unit)| (2f64.powi(exp), unit))
        .find(|&(bucket, _)| size > bucket)
        .unwrap_or((1.0, "bytes"));
    format!("{:.1} {}", size / bucket, unit)
}
