//! Per-domain collection of translation units and canonical catalog rendering.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::fs::ensure_directory;
use crate::logging;
use crate::unit::TranslationUnit;
use crate::writer::{CatalogWriter, WriteOutcome};

pub const CATALOG_EXTENSION: &str = "po";

const HEADER: &str = r#"# SOME DESCRIPTIVE TITLE.
# Copyright (C) YEAR THE PACKAGE'S COPYRIGHT HOLDER
# This file is distributed under the same license as the PACKAGE package.
# FIRST AUTHOR <EMAIL@ADDRESS>, YEAR.
#
#, fuzzy
msgid ""
msgstr ""
"Project-Id-Version: PACKAGE VERSION\n"
"Report-Msgid-Bugs-To: \n"
"POT-Creation-Date: 2019-11-29 14:11+0000\n"
"PO-Revision-Date: YEAR-MO-DA HO:MI+ZONE\n"
"Last-Translator: FULL NAME <EMAIL@ADDRESS>\n"
"Language-Team: LANGUAGE <LL@li.org>\n"
"Language: {language}\n"
"MIME-Version: 1.0\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Content-Transfer-Encoding: 8bit\n"
"Plural-Forms: nplurals=2; plural=(n != 1);\n"
"#;

/// Fixed catalog header for `language`.
pub fn canonical_header(language: &str) -> String {
    HEADER.replace("{language}", &escape_row(language))
}

fn escape_row(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quoted rows for a message string. Every row but the last keeps its
/// newline as a trailing `\n`.
fn rows(text: &str) -> String {
    let rows: Vec<&str> = text.split('\n').collect();
    let mut out = String::new();
    for (idx, row) in rows.iter().enumerate() {
        let row = escape_row(row);
        if idx == rows.len() - 1 {
            let _ = writeln!(out, "\"{}\"", row);
        } else {
            let _ = writeln!(out, "\"{}\\n\"", row);
        }
    }
    out
}

/// One catalog written by [`CatalogStore::materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReport {
    pub language: String,
    pub domain: String,
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// Units grouped by domain, in discovery order.
#[derive(Debug, Default)]
pub struct CatalogStore {
    domains: BTreeMap<String, Vec<TranslationUnit>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: TranslationUnit) {
        self.domains
            .entry(unit.effective_domain().to_string())
            .or_default()
            .push(unit);
    }

    pub fn extend<I: IntoIterator<Item = TranslationUnit>>(&mut self, units: I) {
        for unit in units {
            self.add(unit);
        }
    }

    /// Domain names in sorted order.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    pub fn units(&self, domain: &str) -> &[TranslationUnit] {
        self.domains.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.domains.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical catalog text for one domain: header, then one block per
    /// unit sorted by (context, position). Units with an empty singular are
    /// left out.
    pub fn render_domain(&self, domain: &str, language: &str) -> String {
        let mut units: Vec<&TranslationUnit> = self.units(domain).iter().collect();
        units.sort_by(|a, b| {
            a.context
                .cmp(&b.context)
                .then_with(|| a.position.cmp(&b.position))
        });

        let mut out = canonical_header(language);
        for unit in units.into_iter().filter(|u| !u.singular.is_empty()) {
            let _ = write!(out, "\n#: {}\n", unit.position);
            if !unit.context.is_empty() {
                let _ = writeln!(out, "msgctxt \"{}\"", escape_row(&unit.context));
            }
            let _ = write!(out, "msgid {}", rows(&unit.singular));
            if unit.plural.is_empty() {
                out.push_str("msgstr \"\"\n");
            } else {
                let _ = write!(out, "msgid_plural {}", rows(&unit.plural));
                out.push_str("msgstr[0] \"\"\n");
                out.push_str("msgstr[1] \"\"\n");
            }
        }
        out
    }

    /// Write one catalog per language and domain below `output_dir`.
    pub fn materialize(
        &self,
        output_dir: &Path,
        languages: &[String],
        writer: &CatalogWriter,
    ) -> Result<Vec<CatalogReport>> {
        if languages.is_empty() {
            bail!("At least one language must be specified");
        }

        let mut reports = Vec::new();
        for language in languages {
            let language_dir = output_dir.join(language);
            ensure_directory(&language_dir)?;

            for domain in self.domains() {
                let path = language_dir.join(format!("{}.{}", domain, CATALOG_EXTENSION));
                let body = self.render_domain(domain, language);
                let outcome = writer.write_catalog(&path, &body)?;
                logging::debug(&format!("{} catalog {}", outcome.as_str(), path.display()));
                reports.push(CatalogReport {
                    language: language.clone(),
                    domain: domain.to_string(),
                    path,
                    outcome,
                });
            }
        }
        Ok(reports)
    }
}
