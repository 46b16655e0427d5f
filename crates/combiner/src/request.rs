//! Parsing and sanitizing the `{files}/{count}` part of a bundle URL

use crate::error::ValidationError;
use std::path::PathBuf;

/// Separator standing in for `/` inside a single file token
pub const PATH_SEPARATOR: char = '~';

/// A validated bundle request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    files: Vec<String>,
    count: usize,
}

impl BundleRequest {
    /// Parse the path remainder after the route prefix, e.g. `a.js,lib~b.js/2/`
    pub fn from_path(rest: &str) -> Result<Self, ValidationError> {
        let rest = rest.trim_end_matches('/');
        let (files, count) = rest.rsplit_once('/').unwrap_or(("", rest));
        Self::parse(files, count)
    }

    /// Parse a comma separated file list and its declared count
    ///
    /// The count is checked before any token is looked at, so a mismatched
    /// request is rejected without further work.
    pub fn parse(files: &str, count: &str) -> Result<Self, ValidationError> {
        let declared: usize = count
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidCount(count.to_string()))?;

        let tokens: Vec<&str> = if files.is_empty() {
            Vec::new()
        } else {
            files.split(',').collect()
        };

        if tokens.len() != declared {
            return Err(ValidationError::CountMismatch {
                declared,
                parsed: tokens.len(),
            });
        }

        let files = tokens
            .into_iter()
            .map(sanitize_token)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { files, count: declared })
    }

    /// Sanitized file tokens, in request order
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Key a bundle with the given ETag is cached under
    pub fn cache_key(&self, etag: &str) -> String {
        format!("{}_{}_{}", etag, self.files.join("_"), self.count)
    }

    /// Relative filesystem paths for the tokens
    pub fn relative_paths(&self) -> impl Iterator<Item = (&str, PathBuf)> {
        self.files
            .iter()
            .map(|token| (token.as_str(), token_path(token)))
    }
}

/// Relative filesystem path for a token
pub(crate) fn token_path(token: &str) -> PathBuf {
    token.split(PATH_SEPARATOR).collect()
}

/// Check a single token is a plain relative path
///
/// Tokens carry `~` in place of `/`. Real separators, empty, `.` and `..`
/// segments, and anything outside `[A-Za-z0-9._~-]` are rejected.
pub fn sanitize_token(token: &str) -> Result<String, ValidationError> {
    let unsafe_path = || ValidationError::UnsafePath(token.to_string());

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | PATH_SEPARATOR);
    if token.is_empty() || !token.chars().all(allowed) {
        return Err(unsafe_path());
    }

    for segment in token.split(PATH_SEPARATOR) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(unsafe_path());
        }
    }

    Ok(token.to_string())
}
