//! Ordered extraction rules for scraped document metadata.
//!
//! Each field owns a small table of `(pattern, extractor)` rows. Rows are
//! evaluated top to bottom and the first row whose pattern matches and whose
//! extractor yields a value wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::{compile_static_regex, decode_html_entities};

/// Turns the first capture group of a match into a field value.
pub(crate) type Extractor<T> = fn(&str) -> Option<T>;

/// One row of a field extraction table.
pub(crate) struct FieldRule<T> {
    /// Short label used in trace logs and tests.
    pub(crate) label: &'static str,
    pub(crate) pattern: Regex,
    pub(crate) extract: Extractor<T>,
}

impl<T> FieldRule<T> {
    fn new(label: &'static str, pattern: &str, extract: Extractor<T>) -> Self {
        Self {
            label,
            pattern: compile_static_regex(pattern),
            extract,
        }
    }

    /// Applies this row to `html`.
    pub(crate) fn apply(&self, html: &str) -> Option<T> {
        let captured = self.pattern.captures(html)?.get(1)?.as_str();
        (self.extract)(captured)
    }
}

/// Evaluates `rules` in order and returns the first extracted value.
pub(crate) fn first_match<T>(html: &str, rules: &[FieldRule<T>]) -> Option<T> {
    rules.iter().find_map(|rule| {
        let value = rule.apply(html);
        if value.is_some() {
            tracing::trace!(rule = rule.label, "metadata rule matched");
        }
        value
    })
}

pub(crate) static TITLE_RULES: LazyLock<[FieldRule<String>; 3]> = LazyLock::new(|| {
    [
        FieldRule::new(
            "og:title",
            r#"(?i)<meta\s+property="og:title"\s+content="([^"]+)""#,
            clean_title,
        ),
        FieldRule::new("title", r"(?i)<title[^>]*>([^<]+)</title>", clean_title),
        FieldRule::new("h1", r"(?i)<h1[^>]*>([^<]+)</h1>", clean_title),
    ]
});

pub(crate) static PAGE_RULES: LazyLock<[FieldRule<u32>; 3]> = LazyLock::new(|| {
    [
        FieldRule::new("num_pages", r#""num_pages"\s*:\s*(\d+)"#, parse_count),
        FieldRule::new("page_count", r#""page_count"\s*:\s*(\d+)"#, parse_count),
        FieldRule::new("pages_phrase", r"(?i)(\d+)\s+pages?\b", parse_count),
    ]
});

pub(crate) static AUTHOR_RULES: LazyLock<[FieldRule<String>; 1]> = LazyLock::new(|| {
    [FieldRule::new(
        "meta_author",
        r#"(?i)<meta\s+name="author"\s+content="([^"]+)""#,
        clean_text,
    )]
});

pub(crate) static DESCRIPTION_RULES: LazyLock<[FieldRule<String>; 2]> = LazyLock::new(|| {
    [
        FieldRule::new(
            "og:description",
            r#"(?i)<meta\s+property="og:description"\s+content="([^"]+)""#,
            clean_text,
        ),
        FieldRule::new(
            "meta_description",
            r#"(?i)<meta\s+name="description"\s+content="([^"]+)""#,
            clean_text,
        ),
    ]
});

/// Keeps the part of a page title before the first `|`, then before the first `-`.
fn clean_title(raw: &str) -> Option<String> {
    let decoded = decode_html_entities(raw);
    let head = decoded.split('|').next().unwrap_or_default();
    let head = head.split('-').next().unwrap_or_default().trim();
    (!head.is_empty()).then(|| head.to_string())
}

fn clean_text(raw: &str) -> Option<String> {
    let decoded = decode_html_entities(raw.trim());
    (!decoded.is_empty()).then_some(decoded)
}

fn parse_count(raw: &str) -> Option<u32> {
    raw.parse().ok()
}
