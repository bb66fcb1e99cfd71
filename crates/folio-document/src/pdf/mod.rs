// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page geometry, image assembly, and source page snapshots.

pub mod assembler;
pub mod geometry;
pub mod source;
pub mod xobject;

pub use assembler::{ImageAssembler, Placement};
pub use geometry::PageGeometryResolver;
pub use source::{MediaBox, SourceDocument, SourcePage};
