use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::backend::CatalogBackend;
use crate::fs::{atomic_write, file_state, FileState};

/// How a catalog reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No catalog existed; the normalized body was written as is.
    Created,
    /// An existing catalog was merged with the normalized body.
    Merged,
}

impl WriteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Merged => "merged",
        }
    }
}

/// Normalizes a canonical catalog body and reconciles it with the destination.
pub struct CatalogWriter {
    backend: Box<dyn CatalogBackend>,
}

impl CatalogWriter {
    pub fn new(backend: Box<dyn CatalogBackend>) -> Self {
        Self { backend }
    }

    /// Write `body` to `destination`.
    ///
    /// The body goes to a temporary `domain.*.pot` file which is normalized
    /// first. The destination is only touched once that succeeded, either by
    /// a merge or by replacing it with the normalized file.
    pub fn write_catalog(&self, destination: &Path, body: &str) -> Result<WriteOutcome> {
        let state = file_state(destination)?;

        let mut temp = tempfile::Builder::new()
            .prefix("domain.")
            .suffix(".pot")
            .tempfile()
            .context("could not create temporary domain file")?;
        temp.write_all(body.as_bytes())
            .and_then(|_| temp.flush())
            .context("could not write temporary domain file")?;

        self.backend.normalize(temp.path())?;

        match state {
            FileState::Regular => {
                self.backend.merge(destination, temp.path())?;
                Ok(WriteOutcome::Merged)
            }
            FileState::Missing => {
                let normalized = std::fs::read(temp.path()).with_context(|| {
                    format!("Failed to read normalized catalog: {}", temp.path().display())
                })?;
                atomic_write(destination, &normalized)
                    .with_context(|| format!("could not create file '{}'", destination.display()))?;
                Ok(WriteOutcome::Created)
            }
        }
    }
}
