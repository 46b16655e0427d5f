//! Registry of asset files a page wants combined

use crate::asset::AssetType;
use crate::error::CombinerError;
use tracing::debug;

/// Ordered, deduplicated file lists per asset type
///
/// Paths are relative to the asset type's configured base directory.
/// A registry is a plain value: build one per rendered page, or build one
/// at startup and share it behind an `Arc` as a site-wide manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRegistry {
    javascript: Vec<String>,
    css: Vec<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single file
    ///
    /// Re-registering a known path is a no-op.
    pub fn register(&mut self, asset_type: AssetType, path: impl Into<String>) -> Result<(), CombinerError> {
        let path = path.into();
        Self::check(asset_type, &path)?;
        self.push(asset_type, path);
        Ok(())
    }

    /// Register several files at once
    ///
    /// Every path is checked before any is added, so a rejected batch leaves
    /// the registry untouched.
    pub fn register_many<I, S>(&mut self, asset_type: AssetType, paths: I) -> Result<(), CombinerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();

        for path in &paths {
            Self::check(asset_type, path)?;
        }

        for path in paths {
            self.push(asset_type, path);
        }

        Ok(())
    }

    /// Registered files for a type, in registration order
    pub fn files(&self, asset_type: AssetType) -> &[String] {
        match asset_type {
            AssetType::JavaScript => &self.javascript,
            AssetType::Css => &self.css,
        }
    }

    pub fn is_empty(&self, asset_type: AssetType) -> bool {
        self.files(asset_type).is_empty()
    }

    fn check(asset_type: AssetType, path: &str) -> Result<(), CombinerError> {
        if asset_type.matches(path) {
            Ok(())
        } else {
            Err(CombinerError::InvalidExtension {
                asset_type,
                path: path.to_string(),
            })
        }
    }

    fn push(&mut self, asset_type: AssetType, path: String) {
        let files = match asset_type {
            AssetType::JavaScript => &mut self.javascript,
            AssetType::Css => &mut self.css,
        };

        if files.contains(&path) {
            return;
        }

        debug!(%asset_type, %path, "registered asset");
        files.push(path);
    }
}
