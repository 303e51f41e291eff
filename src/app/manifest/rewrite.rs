//! Local manifest rewriting
//!
//! After download, every segment and nested-manifest reference in a stored
//! manifest is reduced to its bare file name so a local player resolves it
//! against the directory the manifest sits in. Directives and comments pass
//! through untouched except for quoted segment references inside them.

use std::path::Path;

use crate::app::client::write_atomic;
use crate::errors::{ConfigResult, FetchError, ManifestError, ManifestResult};

use super::types::{local_file_name, LineClassifier, ManifestConfig, ManifestReference};

/// Rewrites stored manifests for local playback
#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    classifier: LineClassifier,
}

impl ManifestRewriter {
    /// Creates a rewriter sharing the resolver's line patterns
    pub fn new(classifier: LineClassifier) -> Self {
        Self { classifier }
    }

    /// Creates a rewriter for the given suffixes
    pub fn from_config(config: &ManifestConfig) -> ConfigResult<Self> {
        Ok(Self::new(LineClassifier::new(config)?))
    }

    /// Normalizes the manifest at `manifest_path` in place
    ///
    /// Applying it twice yields the same file as applying it once.
    pub async fn normalize(&self, manifest_path: &Path) -> ManifestResult<()> {
        let original = tokio::fs::read_to_string(manifest_path).await?;
        let normalized = self.normalize_text(&original);

        if normalized != original {
            write_atomic(manifest_path, normalized.as_bytes())
                .await
                .map_err(write_error)?;
            tracing::debug!("Normalized {}", manifest_path.display());
        }

        Ok(())
    }

    /// Returns `body` with transport query strings removed from references
    pub fn normalize_text(&self, body: &str) -> String {
        let mut output = body
            .lines()
            .map(|line| self.normalize_line(line))
            .collect::<Vec<_>>()
            .join("\n");

        if body.ends_with('\n') {
            output.push('\n');
        }
        output
    }

    fn normalize_line(&self, line: &str) -> String {
        let trimmed = line.trim();
        match self.classifier.classify(trimmed) {
            ManifestReference::Segment { ref uri, .. } if !trimmed.contains('"') => {
                local_file_name(uri)
            }
            ManifestReference::Segment { .. } => self.classifier.strip_quoted_segments(line),
            ManifestReference::SubManifest { ref uri, .. } => local_file_name(uri),
            ManifestReference::Opaque(_) => line.to_string(),
        }
    }
}

pub(crate) fn write_error(error: FetchError) -> ManifestError {
    match error {
        FetchError::Io(e) => ManifestError::Io(e),
        other => ManifestError::Io(std::io::Error::other(other.to_string())),
    }
}
