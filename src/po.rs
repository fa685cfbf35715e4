//! Reading and writing gettext catalog text.

use std::fmt::Write as _;
use thiserror::Error;

/// Column past which `#:` reference lines are broken.
const REFERENCE_WIDTH: usize = 79;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("catalog syntax error at line {line}: {message}")]
pub struct PoError {
    pub line: usize,
    pub message: String,
}

impl PoError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One catalog entry. The header is the entry with an empty msgid and no context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Translator comments (`# ...`)
    pub comments: Vec<String>,
    /// Extracted comments (`#. ...`)
    pub extracted: Vec<String>,
    /// Source references (`#: file:line`)
    pub references: Vec<String>,
    /// Flags (`#, fuzzy, c-format`)
    pub flags: Vec<String>,
    /// Previous-message lines (`#| ...`), kept verbatim
    pub previous: Vec<String>,
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgid_plural: Option<String>,
    /// One slot for singular entries, one per plural form otherwise
    pub msgstr: Vec<String>,
    pub obsolete: bool,
}

impl Entry {
    pub fn is_header(&self) -> bool {
        self.msgid.is_empty() && self.msgctxt.is_none() && !self.obsolete
    }

    pub fn is_plural(&self) -> bool {
        self.msgid_plural.is_some()
    }

    pub fn is_translated(&self) -> bool {
        self.msgstr.iter().any(|s| !s.is_empty())
    }

    pub fn is_fuzzy(&self) -> bool {
        self.has_flag("fuzzy")
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn add_flag(&mut self, flag: &str) {
        if !self.has_flag(flag) {
            self.flags.push(flag.to_string());
        }
    }

    /// Identity used for deduplication and merging.
    pub fn key(&self) -> (Option<&str>, &str) {
        (self.msgctxt.as_deref(), self.msgid.as_str())
    }

    /// Translation for a singular entry (first slot otherwise).
    pub fn translation(&self) -> &str {
        self.msgstr.first().map(String::as_str).unwrap_or("")
    }
}

/// A parsed catalog: entries in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<Entry>,
}

impl Catalog {
    pub fn header(&self) -> Option<&Entry> {
        self.entries.iter().find(|e| e.is_header())
    }

    /// Non-header, non-obsolete entries.
    pub fn messages(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_header() && !e.obsolete)
    }

    pub fn find(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&Entry> {
        self.messages().find(|e| e.key() == (msgctxt, msgid))
    }

    /// Value of a `Name: value` field in the header.
    pub fn header_field(&self, name: &str) -> Option<&str> {
        let header = self.header()?;
        header_value(header.translation(), name)
    }
}

/// Value of a `Name: value` field in raw header text.
pub fn header_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.lines().find_map(|line| {
        let (field, value) = line.split_once(':')?;
        (field.trim() == name).then(|| value.trim())
    })
}

/// Replace (or append) a `Name: value` field in header text.
pub fn set_header_field(header: &str, name: &str, value: &str) -> String {
    let mut out = String::new();
    let mut replaced = false;
    for line in header.split_inclusive('\n') {
        let is_field = line
            .split_once(':')
            .is_some_and(|(field, _)| field.trim() == name);
        if is_field && !replaced {
            let _ = writeln!(out, "{}: {}", name, value);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }
    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "{}: {}", name, value);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    IdPlural,
    Str(usize),
}

#[derive(Default)]
struct EntryBuilder {
    entry: Entry,
    field: Option<Field>,
    seen_msgid: bool,
    seen_msgstr: bool,
}

impl EntryBuilder {
    fn finish(&mut self, entries: &mut Vec<Entry>) {
        let builder = std::mem::take(self);
        if builder.seen_msgid {
            let mut entry = builder.entry;
            if entry.msgstr.is_empty() {
                entry.msgstr.push(String::new());
            }
            entries.push(entry);
        }
    }

    fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Context => self.entry.msgctxt.get_or_insert_with(String::new),
            Field::Id => &mut self.entry.msgid,
            Field::IdPlural => self.entry.msgid_plural.get_or_insert_with(String::new),
            Field::Str(idx) => {
                if self.entry.msgstr.len() <= idx {
                    self.entry.msgstr.resize(idx + 1, String::new());
                }
                &mut self.entry.msgstr[idx]
            }
        }
    }
}

fn unquote(text: &str, line: usize) -> Result<String, PoError> {
    let text = text.trim();
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| PoError::new(line, format!("expected quoted string, found {}", text)))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => return Err(PoError::new(line, "dangling escape at end of string")),
        }
    }
    Ok(out)
}

fn parse_keyword(line: &str, number: usize) -> Result<(Field, &str), PoError> {
    if let Some(rest) = line.strip_prefix("msgctxt") {
        return Ok((Field::Context, rest));
    }
    if let Some(rest) = line.strip_prefix("msgid_plural") {
        return Ok((Field::IdPlural, rest));
    }
    if let Some(rest) = line.strip_prefix("msgid") {
        return Ok((Field::Id, rest));
    }
    if let Some(rest) = line.strip_prefix("msgstr[") {
        let (index, rest) = rest
            .split_once(']')
            .ok_or_else(|| PoError::new(number, "unterminated msgstr index"))?;
        let index = index
            .trim()
            .parse::<usize>()
            .map_err(|_| PoError::new(number, format!("invalid msgstr index '{}'", index)))?;
        return Ok((Field::Str(index), rest));
    }
    if let Some(rest) = line.strip_prefix("msgstr") {
        return Ok((Field::Str(0), rest));
    }
    Err(PoError::new(number, format!("unexpected line: {}", line)))
}

/// Parse catalog text.
pub fn parse(text: &str) -> Result<Catalog, PoError> {
    let mut entries = Vec::new();
    let mut current = EntryBuilder::default();

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let mut line = raw.trim();
        if line.is_empty() {
            current.finish(&mut entries);
            continue;
        }

        let mut obsolete = false;
        if let Some(rest) = line.strip_prefix("#~") {
            obsolete = true;
            line = rest.trim_start();
            if line.is_empty() {
                continue;
            }
        }

        if obsolete && line.starts_with('|') {
            current.entry.previous.push(line[1..].trim().to_string());
            continue;
        }

        if !obsolete && line.starts_with('#') {
            // A comment after a msgstr starts the next entry.
            if current.seen_msgstr {
                current.finish(&mut entries);
            }
            let body = &line[1..];
            match body.chars().next() {
                Some(':') => current
                    .entry
                    .references
                    .extend(body[1..].split_whitespace().map(str::to_string)),
                Some(',') => current.entry.flags.extend(
                    body[1..]
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string),
                ),
                Some('.') => current.entry.extracted.push(body[1..].trim().to_string()),
                Some('|') => current.entry.previous.push(body[1..].trim().to_string()),
                _ => current
                    .entry
                    .comments
                    .push(body.strip_prefix(' ').unwrap_or(body).to_string()),
            }
            continue;
        }

        if line.starts_with('"') {
            let field = current
                .field
                .ok_or_else(|| PoError::new(number, "string continuation without keyword"))?;
            let value = unquote(line, number)?;
            current.value_mut(field).push_str(&value);
            continue;
        }

        let (field, rest) = parse_keyword(line, number)?;
        let starts_entry = matches!(field, Field::Context | Field::Id);
        if starts_entry && current.seen_msgstr {
            current.finish(&mut entries);
        }
        if obsolete {
            current.entry.obsolete = true;
        }
        match field {
            Field::Id => current.seen_msgid = true,
            Field::Str(_) => current.seen_msgstr = true,
            _ => {}
        }
        current.field = Some(field);
        let value = unquote(rest, number)?;
        *current.value_mut(field) = value;
    }
    current.finish(&mut entries);

    Ok(Catalog { entries })
}

/// Escape a string for use between double quotes, newlines included.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_string(out: &mut String, prefix: &str, keyword: &str, value: &str) {
    let inner_newline = value
        .find('\n')
        .is_some_and(|idx| idx + 1 < value.len());
    if !inner_newline {
        let _ = writeln!(out, "{}{} \"{}\"", prefix, keyword, escape(value));
        return;
    }
    let _ = writeln!(out, "{}{} \"\"", prefix, keyword);
    for line in value.split_inclusive('\n') {
        let _ = writeln!(out, "{}\"{}\"", prefix, escape(line));
    }
}

fn write_references(out: &mut String, references: &[String]) {
    let mut line = String::new();
    for reference in references {
        if !line.is_empty() && line.len() + 1 + reference.len() > REFERENCE_WIDTH {
            let _ = writeln!(out, "{}", line);
            line.clear();
        }
        if line.is_empty() {
            line.push_str("#:");
        }
        line.push(' ');
        line.push_str(reference);
    }
    if !line.is_empty() {
        let _ = writeln!(out, "{}", line);
    }
}

fn write_entry(out: &mut String, entry: &Entry) {
    for comment in &entry.comments {
        if comment.is_empty() {
            out.push_str("#\n");
        } else {
            let _ = writeln!(out, "# {}", comment);
        }
    }
    for comment in &entry.extracted {
        let _ = writeln!(out, "#. {}", comment);
    }
    if !entry.obsolete {
        write_references(out, &entry.references);
    }
    if !entry.flags.is_empty() {
        let _ = writeln!(out, "#, {}", entry.flags.join(", "));
    }
    for previous in &entry.previous {
        let _ = writeln!(out, "#| {}", previous);
    }

    let prefix = if entry.obsolete { "#~ " } else { "" };
    if let Some(ctx) = &entry.msgctxt {
        write_string(out, prefix, "msgctxt", ctx);
    }
    write_string(out, prefix, "msgid", &entry.msgid);
    match &entry.msgid_plural {
        Some(plural) => {
            write_string(out, prefix, "msgid_plural", plural);
            for (idx, value) in entry.msgstr.iter().enumerate() {
                write_string(out, prefix, &format!("msgstr[{}]", idx), value);
            }
        }
        None => write_string(out, prefix, "msgstr", entry.translation()),
    }
}

/// Render a catalog in canonical form: header first, blank line between entries.
pub fn render(catalog: &Catalog) -> String {
    let mut out = String::new();
    let ordered = catalog
        .entries
        .iter()
        .filter(|e| e.is_header())
        .take(1)
        .chain(catalog.entries.iter().filter(|e| !e.is_header()));

    for (idx, entry) in ordered.enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        write_entry(&mut out, entry);
    }
    out
}
