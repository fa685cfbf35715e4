//! Translation tags in Django-style templates.
//!
//! Grammar handled here:
//!
//! ```text
//! tag       = "{%" ws* keyword ... "%}"
//! trans     = ("trans" | "translate") ws+ quoted [ ... "context" ws+ quoted ] ... "%}"
//! block     = "{%" ws* ("blocktrans" | "blocktranslate") [ ... "context" ws+ quoted ] ... "%}"
//!             text [ "{%" ws* "plural" ... "%}" text ]
//!             "{%" ws* ("endblocktrans" | "endblocktranslate") ... "%}"
//! quoted    = '"' [^"]* '"' | "'" [^']* "'"
//! ```
//!
//! Quoted strings have no escapes: they end at the next matching quote.

use anyhow::{Context, Result};
use glob::Pattern;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

use crate::fs::{display_path, matches_ignore_path};
use crate::logging;
use crate::unit::{format_position, TranslationUnit};

const TAG_OPEN: &str = "{%";
const TAG_CLOSE: &str = "%}";
const CONTEXT_KEYWORD: &str = "context";
const PLURAL_KEYWORD: &str = "plural";

/// Structural errors that abort scanning of a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("could not find end of tag starting at line {line}")]
    UnterminatedTag { line: usize },
    #[error("could not find end of string in tag at line {line}")]
    UnterminatedString { line: usize },
    #[error("could not find end of context string in tag at line {line}")]
    UnterminatedContext { line: usize },
    #[error("could not find {{% {end} %}} for block starting at line {line}")]
    UnterminatedBlock { line: usize, end: &'static str },
}

/// Message found in a template, before it gets a file position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMessage {
    /// 1-based line of the opening tag
    pub line: usize,
    pub singular: String,
    pub plural: String,
    pub context: String,
}

/// Result of scanning one tag: an optional message and the offset just past
/// the tag's closing delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScan {
    pub message: Option<TemplateMessage>,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Trans,
    Block { end: &'static str },
}

/// Keywords in match order; longer spellings first.
const KEYWORDS: [(&str, Keyword); 4] = [
    ("blocktranslate", Keyword::Block { end: "endblocktranslate" }),
    ("blocktrans", Keyword::Block { end: "endblocktrans" }),
    ("translate", Keyword::Trans),
    ("trans", Keyword::Trans),
];

enum Quoted<'a> {
    Missing,
    Unterminated,
    Found { value: &'a str, end: usize },
}

fn skip_whitespace(text: &str, mut pos: usize) -> usize {
    while let Some(ch) = text[pos..].chars().next() {
        if !ch.is_whitespace() {
            break;
        }
        pos += ch.len_utf8();
    }
    pos
}

fn find_from(text: &str, from: usize, needle: &str) -> Option<usize> {
    text[from..].find(needle).map(|idx| from + idx)
}

/// `word` at `pos`, followed by whitespace or the tag close.
fn word_at(text: &str, pos: usize, word: &str) -> bool {
    let rest = &text[pos..];
    if !rest.starts_with(word) {
        return false;
    }
    let after = &rest[word.len()..];
    after.starts_with(TAG_CLOSE) || after.chars().next().is_some_and(char::is_whitespace)
}

fn keyword_at(text: &str, pos: usize) -> Option<(Keyword, usize)> {
    KEYWORDS.iter().find_map(|(word, keyword)| {
        if !word_at(text, pos, word) {
            return None;
        }
        // An inline tag needs a space before its argument.
        if *keyword == Keyword::Trans && text[pos + word.len()..].starts_with(TAG_CLOSE) {
            return None;
        }
        Some((*keyword, pos + word.len()))
    })
}

/// Quoted string starting at `pos`; the closing quote must come before `limit`.
fn quoted_at(text: &str, pos: usize, limit: usize) -> Quoted<'_> {
    let Some(delimiter) = text[pos..limit].chars().next() else {
        return Quoted::Missing;
    };
    if delimiter != '"' && delimiter != '\'' {
        return Quoted::Missing;
    }
    let start = pos + 1;
    match text[start..limit].find(delimiter) {
        Some(len) => Quoted::Found {
            value: &text[start..start + len],
            end: start + len + 1,
        },
        None => Quoted::Unterminated,
    }
}

/// Optional `context "..."` clause inside `text[from..to]`.
fn context_clause(
    text: &str,
    from: usize,
    to: usize,
    line: usize,
) -> Result<Option<String>, TemplateError> {
    let mut search = from;
    while let Some(idx) = text[search..to].find(CONTEXT_KEYWORD) {
        let keyword = search + idx;
        let after = keyword + CONTEXT_KEYWORD.len();
        let preceded_by_space = text[..keyword]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        if !preceded_by_space || !word_at(text, keyword, CONTEXT_KEYWORD) {
            search = after;
            continue;
        }
        return match quoted_at(text, skip_whitespace(text, after).min(to), to) {
            Quoted::Found { value, .. } => Ok(Some(value.to_string())),
            Quoted::Unterminated => Err(TemplateError::UnterminatedContext { line }),
            Quoted::Missing => Ok(None),
        };
    }
    Ok(None)
}

/// Collapse padded placeholders (`{{ name }}` to `{{name}}`) until stable.
pub fn normalize_placeholders(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = current.replace("{{ ", "{{").replace(" }}", "}}");
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Scan an inline tag; `pos` points just past the keyword.
pub fn scan_trans(text: &str, pos: usize, line: usize) -> Result<TagScan, TemplateError> {
    // A tag ends at its first `%}`, even inside a quoted string.
    let close = find_from(text, pos, TAG_CLOSE).ok_or(TemplateError::UnterminatedTag { line })?;
    let start = skip_whitespace(text, pos).min(close);
    let (singular, after_string) = match quoted_at(text, start, close) {
        Quoted::Found { value, end } => (value, end),
        Quoted::Unterminated => return Err(TemplateError::UnterminatedString { line }),
        Quoted::Missing => {
            // Variables and filters are not extractable; skip the tag.
            return Ok(TagScan {
                message: None,
                end: close + TAG_CLOSE.len(),
            });
        }
    };

    let context = context_clause(text, after_string, close, line)?.unwrap_or_default();

    Ok(TagScan {
        message: Some(TemplateMessage {
            line,
            singular: singular.to_string(),
            plural: String::new(),
            context,
        }),
        end: close + TAG_CLOSE.len(),
    })
}

/// Scan a block tag through its end tag; `pos` points just past the keyword.
pub fn scan_block(
    text: &str,
    pos: usize,
    line: usize,
    end_keyword: &'static str,
) -> Result<TagScan, TemplateError> {
    let close = find_from(text, pos, TAG_CLOSE).ok_or(TemplateError::UnterminatedTag { line })?;
    let context = context_clause(text, pos, close, line)?.unwrap_or_default();

    let mut body_start = close + TAG_CLOSE.len();
    let mut singular: Option<&str> = None;
    let mut search = body_start;

    loop {
        let open = find_from(text, search, TAG_OPEN).ok_or(TemplateError::UnterminatedBlock {
            line,
            end: end_keyword,
        })?;
        let keyword = skip_whitespace(text, open + TAG_OPEN.len());

        if singular.is_none() && word_at(text, keyword, PLURAL_KEYWORD) {
            singular = Some(&text[body_start..open]);
            let plural_close = find_from(text, keyword, TAG_CLOSE)
                .ok_or(TemplateError::UnterminatedTag { line })?;
            body_start = plural_close + TAG_CLOSE.len();
            search = body_start;
        } else if word_at(text, keyword, end_keyword) {
            let end_close = find_from(text, keyword, TAG_CLOSE)
                .ok_or(TemplateError::UnterminatedTag { line })?;
            let segment = &text[body_start..open];
            let (singular, plural) = match singular {
                Some(singular) => (singular, segment),
                None => (segment, ""),
            };
            return Ok(TagScan {
                message: Some(TemplateMessage {
                    line,
                    singular: normalize_placeholders(singular),
                    plural: normalize_placeholders(plural),
                    context,
                }),
                end: end_close + TAG_CLOSE.len(),
            });
        } else {
            search = open + TAG_OPEN.len();
        }
    }
}

/// Lazy scanner over the translation tags of one template.
///
/// Yields messages in document order. After the first error it yields nothing.
pub struct TagScanner<'a> {
    text: &'a str,
    cursor: usize,
    /// Newlines before `cursor`
    newlines: usize,
    failed: bool,
}

impl<'a> TagScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            cursor: 0,
            newlines: 0,
            failed: false,
        }
    }

    fn advance_to(&mut self, pos: usize) {
        self.newlines += self.text[self.cursor..pos].matches('\n').count();
        self.cursor = pos;
    }
}

impl Iterator for TagScanner<'_> {
    type Item = Result<TemplateMessage, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let open = find_from(self.text, self.cursor, TAG_OPEN)?;
            self.advance_to(open);
            let line = self.newlines + 1;

            let keyword_pos = skip_whitespace(self.text, open + TAG_OPEN.len());
            let scanned = match keyword_at(self.text, keyword_pos) {
                Some((Keyword::Trans, after)) => scan_trans(self.text, after, line),
                Some((Keyword::Block { end }, after)) => scan_block(self.text, after, line, end),
                None => {
                    self.advance_to(open + TAG_OPEN.len());
                    continue;
                }
            };

            match scanned {
                Ok(scan) => {
                    self.advance_to(scan.end);
                    if let Some(message) = scan.message {
                        return Some(Ok(message));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Scan template text, attributing units to `path`.
pub fn extract_from_template(text: &str, path: &str) -> Result<Vec<TranslationUnit>> {
    let mut units = Vec::new();
    for message in TagScanner::new(text) {
        let message = message.with_context(|| format!("Failed to parse template {}", path))?;
        let position = format_position(path, message.line);
        logging::debug(&format!("{}: {}", position, message.singular));
        units.push(TranslationUnit {
            position,
            singular: message.singular,
            plural: message.plural,
            context: message.context,
            domain: String::new(),
        });
    }
    Ok(units)
}

/// Read and scan one template file.
pub fn extract_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<TranslationUnit>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template: {}", path.display()))?;
    extract_from_template(&content, &display_path(path))
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.') == ext)
}

/// Walk `root` and scan every regular file with one of `extensions`
/// (written with or without the leading dot).
pub fn extract_from_dir<P: AsRef<Path>>(
    root: P,
    extensions: &[String],
    ignore: &[Pattern],
) -> Result<Vec<TranslationUnit>> {
    let root = root.as_ref();
    let mut units = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Cannot walk template path: {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || !has_allowed_extension(path, extensions)
            || matches_ignore_path(path, ignore)
        {
            continue;
        }

        let found = extract_from_file(path)?;
        logging::debug(&format!(
            "{}: {} message(s)",
            display_path(path),
            found.len()
        ));
        units.extend(found);
    }

    Ok(units)
}
