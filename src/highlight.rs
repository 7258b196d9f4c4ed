//! Query highlighting for HTML-bearing result fields.
//!
//! A [`Highlighter`] compiles one fuzzy matcher per query. The matcher keeps
//! only the word characters of the query and allows any run of non-word
//! characters or underscores between them, so "new york" matches
//! "New York", "New-York" and "newyork" alike.
//!
//! Matching runs against the text nodes of the parsed fragment, never the
//! raw markup. Each matched word run is wrapped in `<mark>`, separators
//! inside a match stay unwrapped, and the tree is serialized back to HTML.

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::SearchResult;

const SEPARATOR: &str = r"(?:\W|_)*";

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Compiled size budget of the matcher: the regex default, raised for
/// long queries.
const DEFAULT_SIZE_LIMIT: usize = 10 * (1 << 20);
const SIZE_PER_CHAR: usize = 1 << 17;

/// Elements whose text is not markup-escaped and never highlighted.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Fuzzy matcher built from a query.
#[derive(Debug, Clone)]
pub struct Highlighter {
    matcher: Option<Regex>,
}

impl Highlighter {
    /// Builds the matcher for `query`.
    ///
    /// A query without any word characters produces a highlighter that
    /// leaves its input untouched.
    pub fn new(query: &str) -> Self {
        let chars: Vec<String> = query
            .chars()
            .filter(|&c| !is_separator(c))
            .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
            .collect();

        if chars.is_empty() {
            return Self { matcher: None };
        }

        // Every separator expands to a full Unicode class, so the compiled
        // program grows linearly with the query.
        let size_limit = DEFAULT_SIZE_LIMIT.max(chars.len() * SIZE_PER_CHAR);
        let pattern = chars.join(SEPARATOR);
        let matcher = match RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(size_limit)
            .build()
        {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                debug!("Highlight pattern for {:?} rejected: {}", query, e);
                None
            }
        };
        Self { matcher }
    }

    /// Returns whether the highlighter will ever mark anything.
    pub fn is_active(&self) -> bool {
        self.matcher.is_some()
    }

    /// Highlights matches in an HTML fragment.
    pub fn highlight(&self, html: &str) -> String {
        let Some(matcher) = &self.matcher else {
            return html.to_string();
        };

        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len() + 32);
        write_children(fragment.root_element(), Some(matcher), &mut out);
        out
    }

    /// Highlights a result's title and, when present, its snippet.
    pub fn highlight_result(&self, result: &mut SearchResult) {
        if !self.is_active() {
            return;
        }
        result.title = self.highlight(&result.title);
        if let Some(snippet) = result.snippet.as_deref() {
            result.snippet = Some(self.highlight(snippet));
        }
    }
}

/// Characters the matcher skips over: anything but a word character, and
/// the underscore.
fn is_separator(c: char) -> bool {
    c == '_' || !c.is_alphanumeric()
}

fn write_children(element: ElementRef<'_>, matcher: Option<&Regex>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            write_element(child_element, matcher, out);
            continue;
        }
        match child.value() {
            Node::Text(text) => match matcher {
                Some(matcher) => mark_text(text, matcher, out),
                None => out.push_str(text),
            },
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, matcher: Option<&Regex>, out: &mut String) {
    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    let matcher = if RAW_TEXT_ELEMENTS.contains(&name) {
        None
    } else {
        matcher
    };
    write_children(element, matcher, out);

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn mark_text(text: &str, matcher: &Regex, out: &mut String) {
    let mut last = 0;
    for found in matcher.find_iter(text) {
        escape_text(&text[last..found.start()], out);
        mark_words(found.as_str(), out);
        last = found.end();
    }
    escape_text(&text[last..], out);
}

/// Wraps each word run of a match, leaving the separators between them bare.
fn mark_words(matched: &str, out: &mut String) {
    let mut rest = matched;
    while !rest.is_empty() {
        let separator_len = rest.find(|c: char| !is_separator(c)).unwrap_or(rest.len());
        escape_text(&rest[..separator_len], out);
        rest = &rest[separator_len..];

        let word_len = rest.find(is_separator).unwrap_or(rest.len());
        if word_len > 0 {
            out.push_str("<mark>");
            escape_text(&rest[..word_len], out);
            out.push_str("</mark>");
        }
        rest = &rest[word_len..];
    }
}

/// Escapes text content the way a browser serializes it.
pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
