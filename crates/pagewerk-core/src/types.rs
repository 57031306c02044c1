// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk document pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document formats a job can consume or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Any raster image accepted by the image embedder (PNG / JPEG).
    Image,
}

impl DocumentFormat {
    /// MIME type used for the `Content-Type` of a delivered artifact.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Image => "image/png",
        }
    }

    /// File extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Image => "png",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Raster output format for page rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
        }
    }

    /// Ghostscript output device for this format.
    pub fn gs_device(&self) -> &'static str {
        match self {
            Self::Png => "png16m",
            Self::Jpg | Self::Jpeg => "jpeg",
        }
    }

    pub fn is_jpeg(&self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Standard paper sizes, used as the canvas when embedding images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (width, height), rounded to whole points.
    ///
    /// A4 comes out at 595 x 842.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        let to_pt = |mm: u32| (mm as f32 * 72.0 / 25.4).round();
        (to_pt(w), to_pt(h))
    }
}

/// A validated 1-indexed, inclusive page range.
///
/// Construction rejects rather than clamps: an inverted or out-of-bounds pair
/// yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Build a range, enforcing `1 <= start <= end <= total_pages`.
    pub fn new(start: u32, end: u32, total_pages: u32) -> Option<Self> {
        if start < 1 || end > total_pages || start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// A single page `(n, n)`.
    pub fn single(page: u32, total_pages: u32) -> Option<Self> {
        Self::new(page, page, total_pages)
    }

    /// 0-indexed, ascending page indices.
    pub fn indices(&self) -> Vec<usize> {
        (self.start as usize - 1..self.end as usize).collect()
    }
}

/// Quality tier for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionProfile {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionProfile {
    /// Target image resolution in DPI.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::Low => 72,
            Self::Medium => 150,
            Self::High => 300,
        }
    }

    /// Ghostscript `-dPDFSETTINGS` preset.
    pub fn gs_preset(&self) -> &'static str {
        match self {
            Self::Low => "/screen",
            Self::Medium => "/ebook",
            Self::High => "/printer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Optional behaviour toggles for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Downsample images and compact fonts (Ghostscript path).
    pub strip_images: bool,
    /// Clear document information fields.
    pub strip_metadata: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            strip_images: true,
            strip_metadata: false,
        }
    }
}

/// How a split job partitions its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// One output per range expression, e.g. `["1-3", "5"]`.
    Ranges(Vec<String>),
    /// One output per page.
    Individual,
    /// Contiguous chunks of `n` pages.
    EveryN(u32),
}

/// The single operation a job performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Merge,
    Split {
        strategy: SplitStrategy,
    },
    Compress {
        profile: CompressionProfile,
        options: CompressionOptions,
    },
    Convert {
        source: DocumentFormat,
        target: DocumentFormat,
    },
    Rasterize {
        image_format: ImageFormat,
        quality: u8,
    },
}

impl Operation {
    /// Short name used in logs and download filenames.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Split { .. } => "split",
            Self::Compress { .. } => "compress",
            Self::Convert { .. } => "convert",
            Self::Rasterize { .. } => "rasterize",
        }
    }
}

/// A file handed over by the upload boundary.
///
/// The core only ever looks at `source_path`; the rest is carried for logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub source_path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_range_rejects_inverted_and_out_of_bounds() {
        assert!(PageRange::new(3, 1, 10).is_none());
        assert!(PageRange::new(0, 2, 10).is_none());
        assert!(PageRange::new(2, 11, 10).is_none());
        assert_eq!(PageRange::new(2, 4, 10).unwrap().indices(), vec![1, 2, 3]);
    }

    #[test]
    fn a4_in_points() {
        assert_eq!(PaperSize::A4.dimensions_pt(), (595.0, 842.0));
    }

    #[test]
    fn compression_profile_tiers() {
        assert_eq!(CompressionProfile::Low.dpi(), 72);
        assert_eq!(CompressionProfile::Medium.gs_preset(), "/ebook");
        assert_eq!(CompressionProfile::parse("HIGH"), Some(CompressionProfile::High));
        assert_eq!(CompressionProfile::default(), CompressionProfile::Medium);
    }

    #[test]
    fn image_format_devices() {
        assert_eq!(ImageFormat::Png.gs_device(), "png16m");
        assert!(ImageFormat::parse("JPG").unwrap().is_jpeg());
        assert_eq!(ImageFormat::parse("gif"), None);
    }
}
