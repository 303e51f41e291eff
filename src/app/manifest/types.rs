//! Manifest line model and classification
//!
//! Every trimmed manifest line becomes exactly one [`ManifestReference`].
//! Patterns are tried in a fixed order: a quoted segment reference embedded
//! in a directive, a bare segment line, a nested manifest line, and finally
//! the opaque fallback.

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::client::file_name_from_url;
use crate::constants::manifest;
use crate::errors::{ConfigError, ConfigResult, ManifestError, ManifestResult};

/// Manifest parsing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// File suffixes (without the dot) that mark a media segment
    pub segment_suffixes: Vec<String>,
    /// File suffix (without the dot) that marks a nested manifest
    pub manifest_suffix: String,
    /// Reject URI lines that are neither segments nor manifests
    pub strict: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            segment_suffixes: manifest::DEFAULT_SEGMENT_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            manifest_suffix: manifest::DEFAULT_MANIFEST_SUFFIX.to_string(),
            strict: false,
        }
    }
}

impl ManifestConfig {
    /// Validates the configured suffixes
    pub fn validate(&self) -> ConfigResult<()> {
        if self.segment_suffixes.is_empty() {
            return Err(ConfigError::invalid(
                "manifest.segment_suffixes",
                "[]",
                "At least one segment suffix is required",
            ));
        }

        for suffix in self.segment_suffixes.iter().chain([&self.manifest_suffix]) {
            if suffix.is_empty() || suffix.contains(['.', '?', '/']) {
                return Err(ConfigError::invalid(
                    "manifest suffix",
                    suffix,
                    "Suffixes are bare extensions such as \"ts\"",
                ));
            }
        }

        if self.segment_suffixes.contains(&self.manifest_suffix) {
            return Err(ConfigError::invalid(
                "manifest.manifest_suffix",
                &self.manifest_suffix,
                "Must differ from every segment suffix",
            ));
        }

        Ok(())
    }
}

/// One classified manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestReference {
    /// Downloadable media chunk
    Segment { uri: String, query: Option<String> },
    /// Another manifest to resolve recursively
    SubManifest { uri: String, query: Option<String> },
    /// Directive, comment, blank line or anything else
    Opaque(String),
}

impl ManifestReference {
    /// Reference as written, query string included
    pub fn target(&self) -> Option<String> {
        match self {
            ManifestReference::Segment { uri, query }
            | ManifestReference::SubManifest { uri, query } => Some(match query {
                Some(q) => format!("{}?{}", uri, q),
                None => uri.clone(),
            }),
            ManifestReference::Opaque(_) => None,
        }
    }

    /// Local file name the reference is stored under
    pub fn local_name(&self) -> Option<String> {
        match self {
            ManifestReference::Segment { uri, .. } | ManifestReference::SubManifest { uri, .. } => {
                Some(local_file_name(uri))
            }
            ManifestReference::Opaque(_) => None,
        }
    }
}

/// A leaf segment discovered while resolving a manifest tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentRef {
    /// Reference exactly as written in its manifest
    pub reference: String,
    /// Absolute URL, resolved against the manifest that contains it
    pub url: Url,
    /// Local file name: last path component as encoded in `url`
    pub file_name: String,
}

impl SegmentRef {
    /// Resolves `reference` against the URL of the manifest it appears in
    pub fn resolve(manifest_url: &Url, reference: &str) -> ManifestResult<Self> {
        let url = manifest_url
            .join(reference)
            .map_err(|e| ManifestError::InvalidUrl {
                url: reference.to_string(),
                reason: e.to_string(),
            })?;
        let file_name = file_name_from_url(&url).map_err(|e| ManifestError::InvalidUrl {
            url: reference.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            reference: reference.to_string(),
            url,
            file_name,
        })
    }

    /// URL without query or fragment, used to spot duplicates
    pub fn identity(&self) -> String {
        identity_of(&self.url)
    }
}

/// Strips query and fragment so tokens do not affect identity
pub(crate) fn identity_of(url: &Url) -> String {
    let mut bare = url.clone();
    bare.set_query(None);
    bare.set_fragment(None);
    bare.to_string()
}

/// Last path component of a URI with any query string removed
pub fn base_name(uri: &str) -> &str {
    let without_query = uri.split('?').next().unwrap_or(uri);
    without_query.rsplit('/').next().unwrap_or(without_query)
}

/// Local file name for a reference as written in a manifest
///
/// The last path component with the query dropped, percent-encoded the way
/// the URL parser encodes a resolved path. Matches [`file_name_from_url`] for
/// the URL the reference resolves to, and is stable when applied to its own
/// output.
pub fn local_file_name(uri: &str) -> String {
    let bare = base_name(uri);
    match Url::parse(manifest::LOCAL_NAME_BASE) {
        Ok(mut url) => {
            url.set_path(bare);
            base_name(url.path()).to_string()
        }
        Err(_) => bare.to_string(),
    }
}

/// Compiled line patterns for one [`ManifestConfig`]
#[derive(Debug, Clone)]
pub struct LineClassifier {
    quoted_segment: Regex,
    bare_segment: Regex,
    sub_manifest: Regex,
}

impl LineClassifier {
    /// Compiles the patterns for the configured suffixes
    pub fn new(config: &ManifestConfig) -> ConfigResult<Self> {
        config.validate()?;

        let segment_suffixes = config
            .segment_suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let manifest_suffix = regex::escape(&config.manifest_suffix);

        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| ConfigError::invalid("manifest pattern", &pattern, e.to_string()))
        };

        Ok(Self {
            quoted_segment: compile(format!(r#""([^"?]*\.(?:{}))(?:\?([^"]*))?""#, segment_suffixes))?,
            bare_segment: compile(format!(r"^([^#\s?][^?]*\.(?:{}))(?:\?(.*))?$", segment_suffixes))?,
            sub_manifest: compile(format!(r"^([^#\s?][^?]*\.{})(?:\?(.*))?$", manifest_suffix))?,
        })
    }

    /// Classifies one line; leading and trailing whitespace is ignored
    pub fn classify(&self, line: &str) -> ManifestReference {
        let line = line.trim();

        if let Some(caps) = self.quoted_segment.captures(line) {
            return ManifestReference::Segment {
                uri: caps[1].to_string(),
                query: caps.get(2).map(|m| m.as_str().to_string()),
            };
        }

        if let Some(caps) = self.bare_segment.captures(line) {
            return ManifestReference::Segment {
                uri: caps[1].to_string(),
                query: caps.get(2).map(|m| m.as_str().to_string()),
            };
        }

        if let Some(caps) = self.sub_manifest.captures(line) {
            return ManifestReference::SubManifest {
                uri: caps[1].to_string(),
                query: caps.get(2).map(|m| m.as_str().to_string()),
            };
        }

        ManifestReference::Opaque(line.to_string())
    }

    /// Classifies every line of a manifest body in order
    pub fn parse(&self, body: &str) -> Vec<ManifestReference> {
        body.lines().map(|line| self.classify(line)).collect()
    }

    /// Rewrites every quoted segment reference in `line` to its bare name
    pub(crate) fn strip_quoted_segments(&self, line: &str) -> String {
        self.quoted_segment
            .replace_all(line, |caps: &regex::Captures<'_>| format!("\"{}\"", local_file_name(&caps[1])))
            .into_owned()
    }
}

/// True for a line that names a resource rather than a directive or comment
pub(crate) fn is_uri_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with(manifest::DIRECTIVE_PREFIX)
}
