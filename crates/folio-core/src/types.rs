// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio document pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Page or canvas size in PDF points (1/72 inch). The origin is always 0,0.
///
/// Only constructible with positive, finite dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    width: f32,
    height: f32,
}

impl PageRect {
    /// A4 portrait in points.
    pub const A4: PageRect = PageRect {
        width: 595.0,
        height: 842.0,
    };

    /// Returns `None` unless both dimensions are finite and greater than zero.
    pub fn new(width: f32, height: f32) -> Option<Self> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if valid(width) && valid(height) {
            Some(Self { width, height })
        } else {
            None
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Uniformly scale both sides. Non-positive factors leave the rect unchanged.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor).unwrap_or(*self)
    }
}

/// Named rasterisation fidelity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTier {
    None,
    Low,
    Medium,
    High,
}

impl CompressionTier {
    pub const ALL: [CompressionTier; 4] = [Self::None, Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionTier {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(FolioError::InvalidConfig(format!(
                "unknown compression tier '{other}'"
            ))),
        }
    }
}

/// Raster scale and JPEG quality used when rasterising a page.
///
/// `scale` lies in (0, 1] and `quality` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    scale: f32,
    quality: f32,
}

impl TierSettings {
    pub fn new(scale: f32, quality: f32) -> Result<Self> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(FolioError::InvalidConfig(format!(
                "tier scale {scale} outside (0, 1]"
            )));
        }
        if !(0.0..=1.0).contains(&quality) {
            return Err(FolioError::InvalidConfig(format!(
                "tier quality {quality} outside [0, 1]"
            )));
        }
        Ok(Self { scale, quality })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Re-check bounds, e.g. after deserialising from a config file.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.scale, self.quality).map(|_| ())
    }
}

/// Settings for every [`CompressionTier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub none: TierSettings,
    pub low: TierSettings,
    pub medium: TierSettings,
    pub high: TierSettings,
}

impl Default for TierTable {
    // Low, medium and high share one JPEG quality and differ only in scale.
    fn default() -> Self {
        Self {
            none: TierSettings { scale: 1.0, quality: 1.0 },
            low: TierSettings { scale: 0.8, quality: 0.8 },
            medium: TierSettings { scale: 0.6, quality: 0.8 },
            high: TierSettings { scale: 0.4, quality: 0.8 },
        }
    }
}

impl TierTable {
    pub fn get(&self, tier: CompressionTier) -> TierSettings {
        match tier {
            CompressionTier::None => self.none,
            CompressionTier::Low => self.low,
            CompressionTier::Medium => self.medium,
            CompressionTier::High => self.high,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for tier in CompressionTier::ALL {
            self.get(tier).validate().map_err(|err| {
                FolioError::InvalidConfig(format!("tier '{tier}': {err}"))
            })?;
        }
        Ok(())
    }
}

/// Per-page output format when splitting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Single-page PDF document.
    Pdf,
    /// JPEG raster.
    Jpg,
}

impl OutputFormat {
    /// Upper-case label, e.g. "PDF".
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Jpg => "JPG",
        }
    }

    /// File extension (lower-cased label).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpg => "jpg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            other => Err(FolioError::InvalidConfig(format!(
                "unknown output format '{other}'"
            ))),
        }
    }
}

/// The file operation an output name is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Compress,
    /// One output per page of the source.
    Split,
    /// Images converted into a PDF.
    Convert,
    Combine,
    Copy,
    Move,
    Archive,
    Save,
}

/// Everything the naming policy needs besides the source name itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    pub kind: OperationKind,
    /// Already zero-padded page label, only meaningful for [`OperationKind::Split`].
    pub page_number: Option<String>,
    pub format: OutputFormat,
    pub is_copy: bool,
}

impl NamingContext {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            page_number: None,
            format: OutputFormat::Pdf,
            is_copy: false,
        }
    }

    pub fn with_page(mut self, page_number: impl Into<String>) -> Self {
        self.page_number = Some(page_number.into());
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn as_copy(mut self, is_copy: bool) -> Self {
        self.is_copy = is_copy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_rect_rejects_degenerate_sizes() {
        assert!(PageRect::new(0.0, 10.0).is_none());
        assert!(PageRect::new(10.0, -1.0).is_none());
        assert!(PageRect::new(f32::NAN, 10.0).is_none());
        assert!(PageRect::new(595.0, 842.0).is_some());
    }

    #[test]
    fn default_tier_scales_are_monotonic() {
        let table = TierTable::default();
        let none = table.get(CompressionTier::None).scale();
        let low = table.get(CompressionTier::Low).scale();
        let medium = table.get(CompressionTier::Medium).scale();
        let high = table.get(CompressionTier::High).scale();
        assert!(high < medium && medium < low && low < none);
        assert_eq!(none, 1.0);
        assert_eq!(low, 0.8);
        assert_eq!(high, 0.4);
    }

    #[test]
    fn tier_settings_enforce_bounds() {
        assert!(TierSettings::new(0.0, 0.5).is_err());
        assert!(TierSettings::new(1.2, 0.5).is_err());
        assert!(TierSettings::new(0.5, 1.5).is_err());
        assert!(TierSettings::new(0.5, -0.1).is_err());
        assert!(TierSettings::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn tiers_and_formats_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<CompressionTier>().unwrap(), CompressionTier::High);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpg);
        assert!("ultra".parse::<CompressionTier>().is_err());
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&CompressionTier::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
