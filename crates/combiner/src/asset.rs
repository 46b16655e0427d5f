//! Asset types served by the combiner

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of asset a bundle is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    JavaScript,
    Css,
}

impl AssetType {
    /// Both asset types, in the order routes are mounted
    pub const ALL: [AssetType; 2] = [AssetType::JavaScript, AssetType::Css];

    /// File extension (without the dot) accepted for this type
    pub fn extension(&self) -> &'static str {
        match self {
            AssetType::JavaScript => "js",
            AssetType::Css => "css",
        }
    }

    /// `Content-Type` of a bundle of this type
    pub fn mime_type(&self) -> &'static str {
        match self {
            AssetType::JavaScript => "text/javascript",
            AssetType::Css => "text/css",
        }
    }

    /// Check whether `path` carries this type's extension (case-insensitive)
    pub fn matches(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(self.extension()))
            .unwrap_or(false)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::JavaScript => f.write_str("javascript"),
            AssetType::Css => f.write_str("css"),
        }
    }
}
