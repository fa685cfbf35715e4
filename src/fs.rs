use anyhow::{bail, Context, Result};
use glob::Pattern;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// State of a path we intend to write a file to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Missing,
    Regular,
}

/// Ensure `path` is a directory, creating it (and parents) when missing.
///
/// A path that exists but is not a directory is an error.
pub fn ensure_directory(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => bail!(
            "path {} already exists, but is not a directory",
            path.display()
        ),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::fs::create_dir_all(path)
            .with_context(|| format!("could not create folder '{}'", path.display())),
        Err(e) => {
            Err(e).with_context(|| format!("stat returned error for folder '{}'", path.display()))
        }
    }
}

/// Whether a regular file exists at `path`; anything else there is an error.
pub fn file_state(path: &Path) -> Result<FileState> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(FileState::Regular),
        Ok(_) => bail!("cannot update path {} - is not a file", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileState::Missing),
        Err(e) => Err(e).with_context(|| format!("stat returned error for '{}'", path.display())),
    }
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, so readers never observe a partially written file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in: {}", dir.display()))?;
    temp.write_all(contents)
        .with_context(|| format!("Failed to write temporary file for: {}", path.display()))?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace file: {}", path.display()))?;
    Ok(())
}

/// Path as shown in catalog references: `/` separators, no leading `./`.
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    match text.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// `path` relative to `base` when it lies below it, otherwise unchanged.
pub fn relative_display_path(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) => display_path(rel),
        Err(_) => display_path(path),
    }
}

pub fn compile_ignore_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    let mut compiled = Vec::new();
    for pattern in patterns {
        let matcher = Pattern::new(pattern)
            .with_context(|| format!("Invalid ignore glob pattern: {}", pattern))?;
        compiled.push(matcher);
    }
    Ok(compiled)
}

pub fn matches_ignore_path(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}
