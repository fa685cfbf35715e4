//! Normalize and merge capabilities for catalog files.
//!
//! `normalize` deduplicates a freshly written catalog in place. `merge` folds an
//! incoming catalog into an existing destination without losing translations.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

use crate::fs::atomic_write;
use crate::logging;
use crate::po::{self, Catalog, Entry};

pub trait CatalogBackend {
    /// Deduplicate and canonicalize the catalog at `path`, rewriting it in place.
    fn normalize(&self, path: &Path) -> Result<()>;

    /// Merge the catalog at `incoming` into `destination`, rewriting `destination`.
    fn merge(&self, destination: &Path, incoming: &Path) -> Result<()>;
}

/// Which backend the driver should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process implementation
    #[default]
    Embedded,
    /// GNU gettext's msguniq and msgmerge
    Gettext,
}

impl BackendKind {
    pub fn create(self) -> Box<dyn CatalogBackend> {
        match self {
            Self::Embedded => Box::new(EmbeddedBackend),
            Self::Gettext => Box::new(GettextTools::default()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not run command '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("command '{command}' failed with {status}\n{stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Runs the gettext command line tools.
#[derive(Debug, Clone)]
pub struct GettextTools {
    pub msguniq: String,
    pub msgmerge: String,
}

impl Default for GettextTools {
    fn default() -> Self {
        Self {
            msguniq: "msguniq".to_string(),
            msgmerge: "msgmerge".to_string(),
        }
    }
}

impl GettextTools {
    fn run(&self, program: &str, args: &[&str]) -> Result<(), BackendError> {
        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        logging::debug(&format!("running {}", command));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| BackendError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}

impl CatalogBackend for GettextTools {
    fn normalize(&self, path: &Path) -> Result<()> {
        let path = path_arg(path)?;
        self.run(&self.msguniq, &["--to-code=utf-8", "-o", path, path])?;
        Ok(())
    }

    fn merge(&self, destination: &Path, incoming: &Path) -> Result<()> {
        let destination = path_arg(destination)?;
        let incoming = path_arg(incoming)?;
        self.run(
            &self.msgmerge,
            &["-N", "-q", "--previous", "-o", destination, destination, incoming],
        )?;
        Ok(())
    }
}

/// In-process implementation built on [`crate::po`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedBackend;

fn read_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    po::parse(&content).with_context(|| format!("Failed to parse catalog: {}", path.display()))
}

impl CatalogBackend for EmbeddedBackend {
    fn normalize(&self, path: &Path) -> Result<()> {
        let catalog = normalize_catalog(read_catalog(path)?);
        atomic_write(path, po::render(&catalog).as_bytes())
    }

    fn merge(&self, destination: &Path, incoming: &Path) -> Result<()> {
        let existing = read_catalog(destination)?;
        let incoming = read_catalog(incoming)?;
        let merged = merge_catalogs(existing, incoming);
        atomic_write(destination, po::render(&merged).as_bytes())
    }
}

fn push_missing(target: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

/// `msgstr` resized for a singular entry or a plural entry with `forms` slots.
/// The first slot always survives.
fn reshape(msgstr: &[String], plural: bool, forms: usize) -> Vec<String> {
    if !plural {
        return vec![msgstr.first().cloned().unwrap_or_default()];
    }
    let mut out = msgstr.to_vec();
    if out.len() < forms {
        out.resize(forms, String::new());
    }
    out
}

fn absorb_duplicate(target: &mut Entry, duplicate: Entry) {
    push_missing(&mut target.references, &duplicate.references);
    push_missing(&mut target.extracted, &duplicate.extracted);
    push_missing(&mut target.comments, &duplicate.comments);
    for flag in &duplicate.flags {
        target.add_flag(flag);
    }

    if target.msgid_plural.is_none() && duplicate.msgid_plural.is_some() {
        target.msgid_plural = duplicate.msgid_plural.clone();
        target.msgstr = reshape(&target.msgstr, true, duplicate.msgstr.len().max(2));
    }
    if !target.is_translated() && duplicate.is_translated() {
        let forms = target.msgstr.len();
        target.msgstr = reshape(&duplicate.msgstr, target.is_plural(), forms);
    }
}

/// Merge entries sharing (msgctxt, msgid). The first occurrence keeps its
/// place; later ones contribute references, comments, flags, a plural form
/// and a translation when the first lacks them.
pub fn normalize_catalog(catalog: Catalog) -> Catalog {
    let mut entries: Vec<Entry> = Vec::with_capacity(catalog.entries.len());
    let mut index: HashMap<(bool, Option<String>, String), usize> = HashMap::new();
    let mut has_header = false;

    for entry in catalog.entries {
        if entry.is_header() {
            if !has_header {
                has_header = true;
                entries.push(entry);
            }
            continue;
        }

        let key = (entry.obsolete, entry.msgctxt.clone(), entry.msgid.clone());
        match index.get(&key) {
            Some(&idx) => absorb_duplicate(&mut entries[idx], entry),
            None => {
                index.insert(key, entries.len());
                entries.push(entry);
            }
        }
    }

    Catalog { entries }
}

fn merge_entry(old: &Entry, new: &Entry) -> Entry {
    let mut merged = new.clone();
    merged.obsolete = false;
    merged.comments = old.comments.clone();
    for flag in &old.flags {
        merged.add_flag(flag);
    }
    merged.previous = if old.is_fuzzy() {
        old.previous.clone()
    } else {
        Vec::new()
    };

    let forms = new.msgstr.len().max(2);
    merged.msgstr = reshape(&old.msgstr, new.is_plural(), forms);
    if old.is_plural() != new.is_plural() && old.is_translated() {
        merged.add_flag("fuzzy");
    }
    merged
}

/// Fold `incoming` into `existing`.
///
/// Output follows the incoming order. Entries already present keep their
/// translations, translator comments and flags; new entries arrive
/// untranslated; entries that disappeared are kept as obsolete at the end.
pub fn merge_catalogs(existing: Catalog, incoming: Catalog) -> Catalog {
    let mut lookup: HashMap<(Option<&str>, &str), usize> = HashMap::new();
    for (idx, entry) in existing.entries.iter().enumerate() {
        if entry.is_header() {
            continue;
        }
        let live_already = lookup
            .get(&entry.key())
            .is_some_and(|&other| !existing.entries[other].obsolete);
        if !live_already {
            lookup.insert(entry.key(), idx);
        }
    }

    let mut used = vec![false; existing.entries.len()];
    let mut entries = Vec::with_capacity(incoming.entries.len());

    let header = match (existing.header(), incoming.header()) {
        (Some(old), new) => {
            let mut header = old.clone();
            let created = new.and_then(|h| po::header_value(h.translation(), "POT-Creation-Date"));
            if let Some(created) = created {
                let text = po::set_header_field(header.translation(), "POT-Creation-Date", created);
                header.msgstr = vec![text];
            }
            Some(header)
        }
        (None, new) => new.cloned(),
    };
    entries.extend(header);

    for entry in incoming.entries.iter().filter(|e| !e.is_header() && !e.obsolete) {
        match lookup.get(&entry.key()) {
            Some(&idx) => {
                used[idx] = true;
                entries.push(merge_entry(&existing.entries[idx], entry));
            }
            None => entries.push(entry.clone()),
        }
    }

    for (idx, entry) in existing.entries.iter().enumerate() {
        if entry.is_header() || used[idx] {
            continue;
        }
        let mut obsolete = entry.clone();
        obsolete.obsolete = true;
        obsolete.references.clear();
        entries.push(obsolete);
    }

    Catalog { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(text: &str) -> Catalog {
        po::parse(text).unwrap()
    }

    const HEADER: &str = "msgid \"\"\nmsgstr \"\"\n\"POT-Creation-Date: 2024-01-01\\n\"\n\"Language: fr\\n\"\n\n";

    #[test]
    fn test_normalize_merges_duplicates() {
        let text = format!(
            "{}#: a.go:1\nmsgid \"Hello\"\nmsgstr \"\"\n\n#: b.html:2\nmsgid \"Hello\"\nmsgstr \"\"\n\n#: c.go:3\nmsgctxt \"x\"\nmsgid \"Hello\"\nmsgstr \"\"\n",
            HEADER
        );
        let normalized = normalize_catalog(catalog(&text));
        let messages: Vec<_> = normalized.messages().collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].references, vec!["a.go:1", "b.html:2"]);
        assert_eq!(messages[1].msgctxt.as_deref(), Some("x"));
    }

    #[test]
    fn test_normalize_adopts_plural() {
        let text = "msgid \"File\"\nmsgstr \"\"\n\nmsgid \"File\"\nmsgid_plural \"Files\"\nmsgstr[0] \"\"\nmsgstr[1] \"\"\n";
        let normalized = normalize_catalog(catalog(text));
        assert_eq!(normalized.entries.len(), 1);
        assert_eq!(normalized.entries[0].msgid_plural.as_deref(), Some("Files"));
        assert_eq!(normalized.entries[0].msgstr.len(), 2);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let text = format!(
            "{}#: a.go:1\nmsgid \"A\"\nmsgstr \"\"\n\n#: a.go:2\nmsgid \"A\"\nmsgstr \"\"\n",
            HEADER
        );
        let once = po::render(&normalize_catalog(catalog(&text)));
        let twice = po::render(&normalize_catalog(catalog(&once)));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_keeps_translations() {
        let existing = catalog(&format!(
            "{}#: old.go:1\nmsgid \"Hello\"\nmsgstr \"Bonjour\"\n",
            HEADER
        ));
        let incoming = catalog(&format!(
            "{}#: new.go:5\nmsgid \"Hello\"\nmsgstr \"\"\n\n#: new.go:6\nmsgid \"World\"\nmsgstr \"\"\n",
            HEADER.replace("2024-01-01", "2025-06-01")
        ));

        let merged = merge_catalogs(existing, incoming);
        let hello = merged.find(None, "Hello").unwrap();
        assert_eq!(hello.translation(), "Bonjour");
        assert_eq!(hello.references, vec!["new.go:5"]);

        let world = merged.find(None, "World").unwrap();
        assert!(!world.is_translated());

        assert_eq!(merged.header_field("POT-Creation-Date"), Some("2025-06-01"));
        assert_eq!(merged.header_field("Language"), Some("fr"));
    }

    #[test]
    fn test_merge_obsoletes_and_revives() {
        let existing = catalog(
            "msgid \"Gone\"\nmsgstr \"Parti\"\n\n#~ msgid \"Back\"\n#~ msgstr \"Retour\"\n",
        );
        let incoming = catalog("#: a.go:1\nmsgid \"Back\"\nmsgstr \"\"\n");

        let merged = merge_catalogs(existing, incoming);
        assert_eq!(merged.find(None, "Back").unwrap().translation(), "Retour");
        assert!(merged.find(None, "Gone").is_none());

        let gone = merged.entries.iter().find(|e| e.msgid == "Gone").unwrap();
        assert!(gone.obsolete);
        assert_eq!(gone.translation(), "Parti");
    }

    #[test]
    fn test_merge_shape_change_is_fuzzy() {
        let existing = catalog("msgid \"File\"\nmsgstr \"Fichier\"\n");
        let incoming =
            catalog("msgid \"File\"\nmsgid_plural \"Files\"\nmsgstr[0] \"\"\nmsgstr[1] \"\"\n");

        let merged = merge_catalogs(existing, incoming);
        let entry = merged.find(None, "File").unwrap();
        assert_eq!(entry.msgstr, vec!["Fichier", ""]);
        assert!(entry.is_fuzzy());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = catalog(&format!("{}msgid \"A\"\nmsgstr \"a\"\n", HEADER));
        let incoming = catalog(&format!(
            "{}msgid \"A\"\nmsgstr \"\"\n\nmsgid \"B\"\nmsgstr \"\"\n",
            HEADER
        ));
        let once = merge_catalogs(existing, incoming.clone());
        let twice = merge_catalogs(once.clone(), incoming);
        assert_eq!(po::render(&once), po::render(&twice));
    }

    #[test]
    fn test_embedded_backend_on_files() {
        let tmp = tempfile::tempdir().unwrap();
        let destination = tmp.path().join("default.po");
        let incoming = tmp.path().join("domain.pot");
        std::fs::write(&destination, "msgid \"A\"\nmsgstr \"a\"\n").unwrap();
        std::fs::write(&incoming, "msgid \"A\"\nmsgstr \"\"\n\nmsgid \"A\"\nmsgstr \"\"\n").unwrap();

        let backend = EmbeddedBackend;
        backend.normalize(&incoming).unwrap();
        backend.merge(&destination, &incoming).unwrap();

        let merged = po::parse(&std::fs::read_to_string(&destination).unwrap()).unwrap();
        assert_eq!(merged.entries.len(), 1);
        assert_eq!(merged.entries[0].translation(), "a");
    }

    #[test]
    fn test_gettext_missing_program_reports_command() {
        let tools = GettextTools {
            msguniq: "makemessages-no-such-msguniq".to_string(),
            msgmerge: "makemessages-no-such-msgmerge".to_string(),
        };
        let err = tools.normalize(Path::new("x.pot")).unwrap_err();
        assert!(err.to_string().contains("makemessages-no-such-msguniq --to-code=utf-8"));
    }
}
