// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::types::{PageRect, TierTable};

/// Settings shared by every document operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Base canvas in points before `default_scale` is applied (A4 portrait).
    pub base_canvas: PageRect,
    /// Factor applied to `base_canvas` to obtain the default page canvas.
    pub default_scale: f32,
    /// Scale/quality for each compression tier.
    pub tiers: TierTable,
    /// JPEG quality (0..=1) for pages split out as raster files.
    pub split_jpeg_quality: f32,
    /// Fail a whole document when any page cannot be rasterised, instead of
    /// writing the remaining pages and reporting the skipped ones.
    pub fail_on_skipped_page: bool,
    /// Upper bound on concurrently running page/document tasks (None = pool default).
    pub max_parallel_tasks: Option<usize>,
    /// Author written into document metadata when the caller passes none.
    pub default_author: String,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            base_canvas: PageRect::A4,
            default_scale: 0.8,
            tiers: TierTable::default(),
            split_jpeg_quality: 1.0,
            fail_on_skipped_page: false,
            max_parallel_tasks: None,
            default_author: String::new(),
        }
    }
}

impl FolioConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // Deserialisation bypasses PageRect::new, so re-check here.
        if PageRect::new(self.base_canvas.width(), self.base_canvas.height()).is_none() {
            return Err(FolioError::InvalidConfig(format!(
                "base canvas {:?} must have positive dimensions",
                self.base_canvas
            )));
        }
        if !(self.default_scale > 0.0 && self.default_scale.is_finite()) {
            return Err(FolioError::InvalidConfig(format!(
                "default scale {} must be positive",
                self.default_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.split_jpeg_quality) {
            return Err(FolioError::InvalidConfig(format!(
                "split JPEG quality {} outside [0, 1]",
                self.split_jpeg_quality
            )));
        }
        if self.max_parallel_tasks == Some(0) {
            return Err(FolioError::InvalidConfig(
                "max_parallel_tasks must be at least 1".into(),
            ));
        }
        self.tiers.validate()
    }

    /// The caller's author, or the configured default when it is blank.
    pub fn author_or_default<'a>(&'a self, author: &'a str) -> &'a str {
        if author.trim().is_empty() {
            &self.default_author
        } else {
            author
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FolioConfig::default();
        config.validate().expect("default config validates");
        assert_eq!(config.default_scale, 0.8);
        assert_eq!(config.base_canvas.width(), 595.0);
        assert_eq!(config.base_canvas.height(), 842.0);
    }

    #[test]
    fn save_and_load_preserves_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("folio.json");

        let mut config = FolioConfig::default();
        config.max_parallel_tasks = Some(4);
        config.default_author = "Archive Bot".into();
        config.save(&path).expect("save");

        let loaded = FolioConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: FolioConfig =
            serde_json::from_str(r#"{ "default_scale": 0.5 }"#).expect("parse");
        assert_eq!(config.default_scale, 0.5);
        assert_eq!(config.tiers, TierTable::default());
    }

    #[test]
    fn out_of_range_tier_is_rejected_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        let json = r#"{
            "tiers": {
                "none":   { "scale": 1.0, "quality": 1.0 },
                "low":    { "scale": 0.8, "quality": 0.8 },
                "medium": { "scale": 0.6, "quality": 0.8 },
                "high":   { "scale": 1.4, "quality": 0.8 }
            }
        }"#;
        std::fs::write(&path, json).expect("write");

        let err = FolioConfig::load(&path).expect_err("scale above 1 must fail");
        assert!(matches!(err, FolioError::InvalidConfig(_)));
    }

    #[test]
    fn blank_author_uses_default() {
        let config = FolioConfig {
            default_author: "Folio".into(),
            ..Default::default()
        };
        assert_eq!(config.author_or_default("  "), "Folio");
        assert_eq!(config.author_or_default("Ada"), "Ada");
    }
}
