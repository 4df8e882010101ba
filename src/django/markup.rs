//! Text and html transformations behind the markup oriented filters
//! and the `spaceless` tag.
use crate::{Error, Result};
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

const ELLIPSIS: &str = "...";

/// Characters separating words, for counting and truncating.
const WORD_SEPARATORS: &[char] = &[' ', '\t', '\n', '.', ',', ';', ':', '!', '?', '\'', '"', '-'];

type Lazy = LazyLock<Result<Regex, regex::Error>>;

static HTML_TAG: Lazy = LazyLock::new(|| Regex::new(r"<(/?)([^\s>]+?)(?:\s+[^>]*?)?/?>"));
static ANY_TAG: Lazy = LazyLock::new(|| Regex::new(r"<[^>]*>"));
static GAP: Lazy = LazyLock::new(|| Regex::new(r">\s+<"));
static PARAGRAPHS: Lazy = LazyLock::new(|| Regex::new(r"\n{2,}"));
static URL: Lazy = LazyLock::new(|| {
    let safe = r"[[:alnum:]/&=:;#?+\-*%@]+";
    Regex::new(&format!(r"([[:alnum:]]+:)?{safe}(?:\.{safe})+"))
});

fn get(regex: &'static Lazy) -> Result<&'static Regex> {
    regex.as_ref().map_err(|e| Error::Regex(e.clone()))
}

/// The first `n` characters of `s`.
pub fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(WORD_SEPARATORS).filter(|w| !w.is_empty())
}

pub fn word_count(s: &str) -> usize {
    words(s).count()
}

pub fn strip_tags(s: &str) -> Result<String> {
    Ok(get(&ANY_TAG)?.replace_all(s, "").into_owned())
}

/// Remove the html tags (opening, closing or empty) named in `names`.
pub fn remove_tags(s: &str, names: &[&str]) -> Result<String> {
    let replaced = get(&HTML_TAG)?.replace_all(s, |c: &Captures| {
        if names.contains(&&c[2]) {
            String::new()
        } else {
            c[0].to_string()
        }
    });
    Ok(replaced.into_owned())
}

/// Collapse whitespace between a closing `>` and the next `<`.
pub fn spaceless(s: &str) -> Result<String> {
    Ok(get(&GAP)?.replace_all(s, "><").into_owned())
}

/// Escape every `&` that does not start an entity.
pub fn fix_ampersands(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c == '&' && !starts_entity(&s[i + 1..]) {
            out.push_str("&amp;");
        } else {
            out.push(c);
        }
    }
    out
}

fn starts_entity(s: &str) -> bool {
    let (body, rest) = match s.strip_prefix('#') {
        Some(numeric) => {
            let end = numeric.find(|c: char| !c.is_ascii_digit()).unwrap_or(numeric.len());
            (&numeric[..end], &numeric[end..])
        }
        None => {
            let end = s
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(s.len());
            (&s[..end], &s[end..])
        }
    };
    !body.is_empty() && rest.starts_with(';')
}

/// Paragraphs for each run of text separated by blank lines, with
/// `<br />` for the single newlines inside them.
pub fn linebreaks(s: &str, escape: impl Fn(&str) -> String) -> Result<String> {
    let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::new();
    for paragraph in get(&PARAGRAPHS)?.split(&normalized) {
        out.push_str("<p>");
        out.push_str(&escape(paragraph).replace('\n', "<br />"));
        out.push_str("</p>\n\n");
    }
    Ok(out)
}

/// Number each line, padding to the width of the largest number.
pub fn line_numbers(s: &str, escape: impl Fn(&str) -> String) -> String {
    let lines: Vec<&str> = s.split('\n').collect();
    let width = lines.len().to_string().len();
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        out.push_str(&format!("{:0width$}. {}\n", i + 1, escape(line)));
    }
    out
}

/// Cut to at most `limit` characters, ellipsis included.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    if limit == 0 {
        String::new()
    } else if s.chars().count() > limit {
        format!("{}{ELLIPSIS}", prefix(s, limit.saturating_sub(ELLIPSIS.len())))
    } else {
        s.to_string()
    }
}

/// Keep the first `limit` words, joined by single spaces.
pub fn truncate_words(s: &str, limit: usize) -> String {
    let mut words = words(s);
    let mut out = words.by_ref().take(limit).collect::<Vec<_>>().join(" ");
    if words.next().is_some() {
        out.push(' ');
        out.push_str(ELLIPSIS);
    }
    out
}

/// The tags still open after a prefix of an html document.
#[derive(Default)]
struct OpenTags(Vec<String>);

impl OpenTags {
    fn track(&mut self, tag: &str) {
        let name = tag[1..]
            .split(|c: char| c.is_whitespace() || c == '>')
            .next()
            .unwrap_or("");
        if let Some(closing) = name.strip_prefix('/') {
            if self.0.last().is_some_and(|open| open == closing) {
                self.0.pop();
            }
        } else {
            self.0.push(name.to_string());
        }
    }

    fn close(self, out: &mut String) {
        for name in self.0.into_iter().rev() {
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
    }
}

/// Like [`truncate_chars`], without counting markup, and closing the
/// tags left open by the cut.
pub fn truncate_chars_html(s: &str, limit: usize) -> Result<String> {
    if limit == 0 {
        return Ok(String::new());
    }
    let ellipsis = ELLIPSIS.len();
    let mut out = String::new();
    let mut open = OpenTags::default();
    let mut length = 0;
    let mut last = 0;
    for tag in get(&HTML_TAG)?.find_iter(s) {
        let text = &s[last..tag.start()];
        last = tag.end();
        let current = length;
        length += text.chars().count();
        if length > limit {
            let keep = limit.saturating_sub(current + ellipsis);
            out.push_str(prefix(text, keep));
            out.push_str(ELLIPSIS);
            break;
        }
        out.push_str(text);
        out.push_str(tag.as_str());
        open.track(tag.as_str());
    }
    if last < s.len() && length <= limit {
        let text = &s[last..];
        length += text.chars().count();
        if length > limit {
            out.push_str(prefix(text, limit.saturating_sub(ellipsis)));
            out.push_str(ELLIPSIS);
        } else {
            out.push_str(text);
        }
    }
    open.close(&mut out);
    Ok(out)
}

/// Like [`truncate_words`], keeping markup and the original spacing,
/// and closing the tags left open by the cut.
pub fn truncate_words_html(s: &str, limit: usize) -> Result<String> {
    if limit == 0 {
        return Ok(String::new());
    }
    let mut out = String::new();
    let mut open = OpenTags::default();
    let mut count = 0;
    let mut last = 0;
    for tag in get(&HTML_TAG)?.find_iter(s) {
        let text = &s[last..tag.start()];
        last = tag.end();
        if !spaced_words(&mut out, text, &mut count, limit) || count >= limit {
            break;
        }
        out.push_str(tag.as_str());
        open.track(tag.as_str());
    }
    if !spaced_words(&mut out, &s[last..], &mut count, limit) || count >= limit {
        open.close(&mut out);
    }
    Ok(out)
}

/// Byte ranges of the words in `s`.
fn word_spans(s: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices() {
        match (WORD_SEPARATORS.contains(&c), start) {
            (true, Some(from)) => {
                spans.push(from..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => (),
        }
    }
    if let Some(from) = start {
        spans.push(from..s.len());
    }
    spans
}

/// Write words of `text` while `count` is under `limit`, each with
/// the text leading up to it.  Returns false if words were left out.
fn spaced_words(out: &mut String, text: &str, count: &mut usize, limit: usize) -> bool {
    let mut spans = word_spans(text).into_iter();
    let mut at = 0;
    while *count < limit {
        let Some(span) = spans.next() else {
            break;
        };
        out.push_str(&text[at..span.end]);
        at = span.end;
        *count += 1;
    }
    let words_left = spans.next().is_some();
    if words_left {
        out.push(' ');
        out.push_str(ELLIPSIS);
    } else if *count < limit {
        out.push_str(&text[at..]);
    }
    !words_left
}

/// Turn things that look like urls into links, with the link text cut
/// to `limit` characters.
pub fn urlize(s: &str, limit: usize) -> Result<String> {
    let linked = get(&URL)?.replace_all(s, |c: &Captures| {
        let link = &c[0];
        let scheme = if c.get(1).is_some() { "" } else { "http://" };
        let text = prefix(link, limit);
        let more = if text.len() < link.len() { ELLIPSIS } else { "" };
        format!("<a href='{scheme}{link}'>{text}{more}</a>")
    });
    Ok(linked.into_owned())
}

/// Break lines so that they are about `width` characters long.
pub fn word_wrap(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word = String::new();
    let mut i = 0;
    let mut last = '\0';
    for c in s.chars() {
        i += 1;
        if i == width {
            let stripped = word.trim_start();
            out.push('\n');
            out.push_str(stripped);
            i = stripped.chars().count();
            word.clear();
        } else if c.is_whitespace() && !last.is_whitespace() {
            out.push_str(&word);
            word.clear();
        }
        word.push(c);
        last = c;
    }
    out.push_str(&word);
    out
}
