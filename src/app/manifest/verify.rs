//! Local completeness check for a downloaded manifest tree
//!
//! Walks a normalized manifest and any nested manifests stored beside it
//! and lists, in playback order, the referenced files that are not present
//! in the directory.

use std::collections::HashSet;
use std::path::Path;

use futures::future::{BoxFuture, FutureExt};

use crate::errors::ManifestResult;

use super::types::{LineClassifier, ManifestReference};

/// Returns the file names referenced by `manifest_path` that are missing
/// from `directory`
///
/// Nested manifests found in `directory` are followed; a nested manifest
/// that is itself missing is reported by name. Each nested manifest is
/// visited once.
pub async fn find_missing_segments(
    manifest_path: &Path,
    directory: &Path,
    classifier: &LineClassifier,
) -> ManifestResult<Vec<String>> {
    let mut visited = HashSet::new();
    if let Some(root_name) = manifest_path.file_name() {
        visited.insert(root_name.to_string_lossy().into_owned());
    }
    let mut missing = Vec::new();
    collect_missing(manifest_path, directory, classifier, &mut visited, &mut missing).await?;

    if missing.is_empty() {
        tracing::info!("All segments of {} are present", manifest_path.display());
    } else {
        tracing::warn!(
            "{} referenced files missing for {}",
            missing.len(),
            manifest_path.display()
        );
    }
    Ok(missing)
}

fn collect_missing<'a>(
    manifest_path: &'a Path,
    directory: &'a Path,
    classifier: &'a LineClassifier,
    visited: &'a mut HashSet<String>,
    missing: &'a mut Vec<String>,
) -> BoxFuture<'a, ManifestResult<()>> {
    async move {
        let body = tokio::fs::read_to_string(manifest_path).await?;

        for line in body.lines() {
            let reference = classifier.classify(line);
            let Some(name) = reference.local_name() else {
                continue;
            };

            match reference {
                ManifestReference::Segment { .. } => {
                    if !directory.join(&name).exists() {
                        missing.push(name);
                    }
                }
                ManifestReference::SubManifest { .. } => {
                    let nested = directory.join(&name);
                    if !nested.exists() {
                        missing.push(name);
                    } else if visited.insert(name) {
                        collect_missing(&nested, directory, classifier, visited, missing).await?;
                    }
                }
                ManifestReference::Opaque(_) => {}
            }
        }

        Ok(())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::manifest::types::ManifestConfig;
    use tempfile::tempdir;

    fn classifier() -> LineClassifier {
        LineClassifier::new(&ManifestConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_reports_missing_in_playback_order() {
        let dir = tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("root.m3u8"),
            "#EXTM3U\nseg1.ts\nseg2.ts\nchild.m3u8\nseg4.ts\n",
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("child.m3u8"), "#EXTM3U\nseg3.ts\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("seg2.ts"), b"x").await.unwrap();

        let missing = find_missing_segments(&dir.path().join("root.m3u8"), dir.path(), &classifier())
            .await
            .unwrap();

        assert_eq!(missing, vec!["seg1.ts", "seg3.ts", "seg4.ts"]);
    }

    #[tokio::test]
    async fn test_missing_nested_manifest_is_reported() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("root.m3u8"), "#EXTM3U\nchild.m3u8\n")
            .await
            .unwrap();

        let missing = find_missing_segments(&dir.path().join("root.m3u8"), dir.path(), &classifier())
            .await
            .unwrap();

        assert_eq!(missing, vec!["child.m3u8"]);
    }

    #[tokio::test]
    async fn test_self_referencing_local_manifest_terminates() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.m3u8"), "b.m3u8\n").await.unwrap();
        tokio::fs::write(dir.path().join("b.m3u8"), "a.m3u8\nseg1.ts\n")
            .await
            .unwrap();

        let missing = find_missing_segments(&dir.path().join("a.m3u8"), dir.path(), &classifier())
            .await
            .unwrap();

        assert_eq!(missing, vec!["seg1.ts"]);
    }
}
