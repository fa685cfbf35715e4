//! Loading Go packages from disk and parsing them with tree-sitter.

use anyhow::{Context, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tree_sitter::{Parser, Tree};
use walkdir::WalkDir;

use crate::fs::{display_path, matches_ignore_path};
use crate::logging;

/// One parsed `.go` file.
pub struct GoFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

impl GoFile {
    pub fn parse(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Self::from_source(path.to_path_buf(), source)
    }

    pub fn from_source(path: PathBuf, source: String) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .context("Failed to load the Go grammar")?;
        let tree = parser
            .parse(&source, None)
            .with_context(|| format!("Failed to parse Go file: {}", path.display()))?;

        if tree.root_node().has_error() {
            logging::warn(&format!(
                "{} contains syntax errors, extraction may be incomplete",
                display_path(&path)
            ));
        }

        Ok(Self { path, source, tree })
    }
}

/// The non-test Go files of one directory.
pub struct GoPackage {
    pub dir: PathBuf,
    /// Import path derived from the enclosing module; empty outside a module.
    pub import_path: String,
    pub files: Vec<GoFile>,
}

impl GoPackage {
    /// Parse the package in `dir`, or `None` when it holds no Go files.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let mut paths = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?
                .path();
            if path.is_file() && is_go_source(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Ok(None);
        }
        paths.sort();

        let files = paths
            .iter()
            .map(|path| GoFile::parse(path))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self {
            dir: dir.to_path_buf(),
            import_path: import_path_for(dir)?.unwrap_or_default(),
            files,
        }))
    }
}

fn is_go_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go") && !name.starts_with('.')
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
}

/// `base` and, when `recursive`, every non-hidden directory below it.
/// Directories without Go files are skipped.
pub fn load_packages(base: &Path, recursive: bool, ignore: &[Pattern]) -> Result<Vec<GoPackage>> {
    let mut dirs = vec![base.to_path_buf()];
    if recursive {
        let walker = WalkDir::new(base)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path()) && !matches_ignore_path(e.path(), ignore));
        for entry in walker {
            let entry =
                entry.with_context(|| format!("Failed to walk directory: {}", base.display()))?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }
    }

    let mut packages = Vec::new();
    for dir in dirs {
        match GoPackage::load(&dir)? {
            Some(package) => packages.push(package),
            None => logging::debug(&format!("no Go files in {}", display_path(&dir))),
        }
    }
    Ok(packages)
}

/// Module path declared by a `go.mod` file.
pub fn parse_module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.split("//").next().unwrap_or("").trim();
        let module = rest.trim_matches(|c| c == '"' || c == '`');
        (!module.is_empty()).then(|| module.to_string())
    })
}

/// Import path of the package in `dir`, found through the nearest `go.mod`.
pub fn import_path_for(dir: &Path) -> Result<Option<String>> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Cannot get absolute path of {}", dir.display()))?;

    for root in dir.ancestors() {
        let go_mod = root.join("go.mod");
        if !go_mod.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&go_mod)
            .with_context(|| format!("Failed to read file: {}", go_mod.display()))?;
        let Some(module) = parse_module_path(&content) else {
            return Ok(None);
        };
        let relative = dir.strip_prefix(root).unwrap_or(Path::new(""));
        let relative = display_path(relative);
        return Ok(Some(if relative.is_empty() {
            module
        } else {
            format!("{}/{}", module, relative)
        }));
    }
    Ok(None)
}
