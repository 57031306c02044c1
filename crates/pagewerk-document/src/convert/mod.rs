// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format conversion through external tools: Ghostscript renders pages to
// images, LibreOffice converts between PDF and DOCX.

pub mod office;
pub mod raster;

pub use office::{OfficeConversion, OfficeConverter, discover_output};
pub use raster::Rasterizer;
