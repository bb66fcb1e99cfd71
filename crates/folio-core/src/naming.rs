// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output file naming.
//
// Every operation derives its output filename from the source file's stem and
// extension. The template depends only on the operation kind; a " (Copy)"
// suffix is inserted before the extension when the caller asked for a copy
// and the plain name is already taken.

use std::path::Path;

use crate::types::{NamingContext, OperationKind};

/// Suffix inserted before the extension for copies.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Pure filename policy. Holds no state; all inputs are explicit.
pub struct NamingPolicy;

impl NamingPolicy {
    /// Build the output filename for `base_name` / `extension` under `ctx`.
    pub fn file_name(base_name: &str, extension: &str, ctx: &NamingContext) -> String {
        let copy_suffix = if ctx.is_copy { COPY_SUFFIX } else { "" };
        match ctx.kind {
            OperationKind::Compress => {
                format!("Compressed_{base_name}{copy_suffix}.{extension}")
            }
            OperationKind::Split => {
                let page = ctx.page_number.as_deref().unwrap_or("1");
                format!(
                    "{base_name} {page}{copy_suffix}.{}",
                    ctx.format.label().to_lowercase()
                )
            }
            OperationKind::Convert => format!("{base_name}{copy_suffix}.pdf"),
            OperationKind::Combine => format!("NEW_PDF {base_name}{copy_suffix}.pdf"),
            OperationKind::Copy
            | OperationKind::Move
            | OperationKind::Archive
            | OperationKind::Save => format!("NEW_{base_name}{copy_suffix}.{extension}"),
        }
    }

    /// Base name and extension of `source`, empty when absent.
    pub fn stem_and_extension(source: &Path) -> (String, String) {
        let base_name = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = source
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        (base_name, extension)
    }

    /// Page label zero-padded to the digit width of `page_count`.
    ///
    /// `page_label(3, 12) == "03"`, `page_label(3, 9) == "3"`.
    pub fn page_label(page: u32, page_count: u32) -> String {
        let width = page_count.max(1).to_string().len();
        format!("{page:0width$}")
    }
}
