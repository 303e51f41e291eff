//! Recursive manifest resolution
//!
//! [`ManifestResolver`] downloads a manifest, stores it in the destination
//! directory, and walks its lines. Segment references are collected in order;
//! nested manifest references are resolved against the URL of the manifest
//! that contains them and their segments are spliced in at the point of
//! reference. Every stored manifest is normalized with [`ManifestRewriter`]
//! once its own lines have been walked.
//!
//! # Module Organization
//!
//! - [`types`] - line classification, [`SegmentRef`], [`ManifestConfig`]
//! - [`rewrite`] - local manifest normalization
//! - [`verify`] - local completeness check
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use hls_fetcher::app::{HlsClient, ManifestConfig, ManifestResolver};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HlsClient::new()?);
//! let resolver = ManifestResolver::new(client, ManifestConfig::default())?;
//!
//! let root = Url::parse("https://cdn.example.com/live/master.m3u8?token=abc")?;
//! let segments = resolver.resolve(&root, Path::new("./out")).await?;
//! for segment in &segments {
//!     println!("{} <- {}", segment.file_name, segment.url);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};
use url::Url;

use crate::app::client::{file_name_from_url, write_atomic, HlsClient};
use crate::errors::{ConfigResult, ManifestError, ManifestResult};

pub mod rewrite;
pub mod types;
pub mod verify;

pub use rewrite::ManifestRewriter;
pub use types::{base_name, local_file_name, LineClassifier, ManifestConfig, ManifestReference, SegmentRef};
pub use verify::find_missing_segments;

use rewrite::write_error;
use types::{identity_of, is_uri_line};

/// Bookkeeping for one resolution
#[derive(Debug, Default)]
struct Walk {
    /// Identities of the manifests currently being resolved, root first
    chain: Vec<String>,
    /// Local file name to the identity of the manifest stored under it
    stored: HashMap<String, String>,
}

/// Resolves a manifest tree into its ordered leaf segments
#[derive(Debug)]
pub struct ManifestResolver {
    client: Arc<HlsClient>,
    classifier: LineClassifier,
    rewriter: ManifestRewriter,
    strict: bool,
}

impl ManifestResolver {
    /// Creates a resolver that fetches manifests through `client`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the manifest suffixes are invalid
    pub fn new(client: Arc<HlsClient>, config: ManifestConfig) -> ConfigResult<Self> {
        let classifier = LineClassifier::new(&config)?;
        Ok(Self {
            client,
            rewriter: ManifestRewriter::new(classifier.clone()),
            classifier,
            strict: config.strict,
        })
    }

    /// Line classifier shared with the rewriter and completeness check
    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    /// Resolves `manifest_url` into its leaf segments in playback order
    ///
    /// Each manifest in the tree is written to `destination_dir/<file name>`
    /// and normalized. The directory is created if absent.
    ///
    /// # Errors
    ///
    /// - `ManifestError::Unavailable` if any manifest in the tree cannot be
    ///   fetched; no partial result is returned
    /// - `ManifestError::Cyclic` if a nested reference points back into the
    ///   chain currently being resolved
    /// - `ManifestError::NameCollision` if two different manifests in the
    ///   tree would be stored under the same file name
    /// - `ManifestError::Malformed` for unclassifiable URI lines in strict mode
    pub async fn resolve(
        &self,
        manifest_url: &Url,
        destination_dir: &Path,
    ) -> ManifestResult<Vec<SegmentRef>> {
        tokio::fs::create_dir_all(destination_dir).await?;

        let mut walk = Walk::default();
        let segments = self
            .resolve_tree(manifest_url.clone(), destination_dir, &mut walk)
            .await?;

        info!("Resolved {} segments from {}", segments.len(), manifest_url);
        Ok(segments)
    }

    fn resolve_tree<'a>(
        &'a self,
        manifest_url: Url,
        destination_dir: &'a Path,
        walk: &'a mut Walk,
    ) -> BoxFuture<'a, ManifestResult<Vec<SegmentRef>>> {
        async move {
            let identity = identity_of(&manifest_url);
            if walk.chain.contains(&identity) {
                return Err(ManifestError::Cyclic {
                    url: manifest_url.to_string(),
                });
            }

            let file_name =
                file_name_from_url(&manifest_url).map_err(|e| ManifestError::InvalidUrl {
                    url: manifest_url.to_string(),
                    reason: e.to_string(),
                })?;

            // The same manifest reached twice may reuse its file; another may not
            match walk.stored.get(&file_name) {
                Some(first) if *first != identity => {
                    return Err(ManifestError::NameCollision {
                        file_name,
                        first: first.clone(),
                        second: manifest_url.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    walk.stored.insert(file_name.clone(), identity.clone());
                }
            }
            walk.chain.push(identity);

            let body = self
                .client
                .fetch_content(&manifest_url)
                .await
                .map_err(|source| ManifestError::Unavailable {
                    url: manifest_url.to_string(),
                    source,
                })?;

            let local_path = destination_dir.join(&file_name);
            write_atomic(&local_path, body.as_bytes())
                .await
                .map_err(write_error)?;
            debug!("Stored manifest {} as {}", manifest_url, local_path.display());

            let mut segments = Vec::new();
            for (index, line) in body.lines().enumerate() {
                match self.classifier.classify(line) {
                    reference @ ManifestReference::Segment { .. } => {
                        if let Some(target) = reference.target() {
                            segments.push(SegmentRef::resolve(&manifest_url, &target)?);
                        }
                    }
                    reference @ ManifestReference::SubManifest { .. } => {
                        let Some(target) = reference.target() else {
                            continue;
                        };
                        let nested_url =
                            manifest_url
                                .join(&target)
                                .map_err(|e| ManifestError::InvalidUrl {
                                    url: target.clone(),
                                    reason: e.to_string(),
                                })?;
                        debug!("Descending into nested manifest {}", nested_url);
                        let nested = self
                            .resolve_tree(nested_url, destination_dir, &mut *walk)
                            .await?;
                        segments.extend(nested);
                    }
                    ManifestReference::Opaque(content) => {
                        if self.strict && is_uri_line(&content) {
                            return Err(ManifestError::Malformed {
                                line: index + 1,
                                content,
                            });
                        }
                    }
                }
            }

            self.rewriter.normalize(&local_path).await?;
            walk.chain.pop();

            debug!("{} contributed {} segments", manifest_url, segments.len());
            Ok(segments)
        }
        .boxed()
    }
}

/// Normalizes a stored manifest using the default suffixes
///
/// Convenience wrapper over [`ManifestRewriter::normalize`].
pub async fn normalize(manifest_path: &Path) -> crate::errors::Result<()> {
    let rewriter = ManifestRewriter::from_config(&ManifestConfig::default())?;
    rewriter.normalize(manifest_path).await?;
    Ok(())
}
